use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use git2::{BranchType, Delta, ErrorCode, ObjectType, Oid, Repository, Sort};
use tracing::debug;

use crate::core::{ParentIds, RevId};
use crate::error::{Error, Result};
use crate::source::{FileChange, FileLog, FileRev, History, RevSummary};

/// Git repository adapter.
///
/// Indexes every commit reachable from HEAD or a local branch into the
/// dense id space traversals work in, oldest first. The index is built
/// once at open time; per-branch reachability sets are computed lazily
/// the first time a branch filter asks for them.
pub struct GitHistory {
    repo: Repository,
    oids: Vec<Oid>,
    ids: HashMap<Oid, RevId>,
    parents: Vec<ParentIds>,
    reachable: RefCell<HashMap<String, HashSet<RevId>>>,
}

impl GitHistory {
    /// Opens the repository at `path` and indexes its commits.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::open(path.as_ref())?;
        Self::from_repo(repo)
    }

    pub fn from_repo(repo: Repository) -> Result<Self> {
        let newest_first = walk_all(&repo)?;
        let count = newest_first.len();

        let mut oids = vec![Oid::zero(); count];
        let mut ids = HashMap::with_capacity(count);
        for (pos, oid) in newest_first.into_iter().enumerate() {
            let rev = RevId((count - 1 - pos) as u32);
            oids[rev.index()] = oid;
            ids.insert(oid, rev);
        }

        let mut parents = vec![ParentIds::new(); count];
        for (idx, &oid) in oids.iter().enumerate() {
            let commit = repo.find_commit(oid)?;
            let mut list = ParentIds::new();
            for parent_oid in commit.parent_ids() {
                let Some(&parent) = ids.get(&parent_oid) else {
                    debug!(%oid, parent = %parent_oid, "parent outside the indexed set; edge dropped");
                    continue;
                };
                if list.len() == 2 {
                    debug!(%oid, "octopus merge capped at two parents");
                    break;
                }
                list.push(parent);
            }
            parents[idx] = list;
        }

        Ok(Self {
            repo,
            oids,
            ids,
            parents,
            reachable: RefCell::new(HashMap::new()),
        })
    }

    /// Object id backing a revision number.
    pub fn oid(&self, rev: RevId) -> Result<Oid> {
        self.oids
            .get(rev.index())
            .copied()
            .ok_or(Error::UnknownRevision(rev))
    }

    /// Revision number of an object id, if it was indexed.
    pub fn rev(&self, oid: Oid) -> Option<RevId> {
        self.ids.get(&oid).copied()
    }

    /// Revision HEAD points at.
    pub fn head_rev(&self) -> Option<RevId> {
        let head = self.repo.head().ok()?;
        self.rev(head.target()?)
    }

    /// HEAD's revision followed by its parents. The flat view of where
    /// the working copy sits; empty on an unborn HEAD.
    pub fn working_parents(&self) -> Vec<RevId> {
        let Some(head) = self.head_rev() else {
            return Vec::new();
        };
        let mut revs = vec![head];
        revs.extend(self.parents[head.index()].iter().copied());
        revs
    }

    /// Tip revision of a local branch.
    pub fn branch_tip(&self, name: &str) -> Result<RevId> {
        let branch = match self.repo.find_branch(name, BranchType::Local) {
            Ok(branch) => branch,
            Err(err) if err.code() == ErrorCode::NotFound => {
                return Err(Error::UnknownBranch(name.to_owned()));
            }
            Err(err) => return Err(err.into()),
        };
        branch
            .get()
            .target()
            .and_then(|oid| self.rev(oid))
            .ok_or_else(|| Error::UnknownBranch(name.to_owned()))
    }

    /// All local branches with their tip revisions.
    pub fn branch_tips(&self) -> Result<Vec<(String, RevId)>> {
        let mut tips = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            let Some(name) = branch.name()?.map(str::to_owned) else {
                continue;
            };
            if let Some(rev) = branch.get().target().and_then(|oid| self.rev(oid)) {
                tips.push((name, rev));
            }
        }
        Ok(tips)
    }

    /// Revisions any tag points at, newest first.
    pub fn tagged_revs(&self) -> Result<Vec<RevId>> {
        let mut targets = Vec::new();
        self.repo.tag_foreach(|oid, _name| {
            targets.push(oid);
            true
        })?;

        let mut revs = Vec::new();
        for oid in targets {
            // Annotated tags point at a tag object, possibly nested;
            // peel all the way down to the commit.
            let rev = match self.rev(oid) {
                Some(rev) => Some(rev),
                None => self
                    .repo
                    .find_object(oid, None)
                    .ok()
                    .and_then(|obj| obj.peel(ObjectType::Commit).ok())
                    .and_then(|commit| self.rev(commit.id())),
            };
            if let Some(rev) = rev {
                revs.push(rev);
            }
        }
        revs.sort_unstable_by(|a, b| b.cmp(a));
        revs.dedup();
        Ok(revs)
    }

    /// Display metadata for one revision.
    pub fn summary(&self, rev: RevId) -> Result<RevSummary> {
        let commit = self.repo.find_commit(self.oid(rev)?)?;
        let timestamp = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .ok_or(Error::InvalidTimestamp(rev))?;
        let author = commit.author().name().unwrap_or("Unknown").to_owned();
        Ok(RevSummary {
            id: commit.id().to_string(),
            summary: commit.summary().unwrap_or("").to_owned(),
            author,
            timestamp,
        })
    }

    /// Ancestry of a single file, newest first.
    ///
    /// Follows the first-parent line of the repository, recording every
    /// revision where the file's content changed. Renames are followed:
    /// older entries carry the name the file had back then. A deleted
    /// and later recreated file yields two disconnected runs.
    pub fn file_log(&self, path: &str) -> Result<FileLog> {
        let mut target = PathBuf::from(path);
        let Some(mut at) = self.newest_rev_with(&target)? else {
            return Err(Error::NoFileHistory(path.to_owned()));
        };

        let mut entries: Vec<FileRev> = Vec::new();
        loop {
            let blob = self.blob_at(at, &target)?;
            let first_parent = self.parents[at.index()].first().copied();
            let parent_blob = match first_parent {
                Some(parent) => self.blob_at(parent, &target)?,
                None => None,
            };

            let mut recreated = false;
            if blob != parent_blob {
                let (change, renamed_from) = if parent_blob.is_some() {
                    (FileChange::Modified, None)
                } else {
                    match self.rename_source(at, &target)? {
                        Some(old) => (FileChange::Renamed, Some(old)),
                        None => (FileChange::Added, None),
                    }
                };
                entries.push(FileRev {
                    rev: at,
                    path: target.to_string_lossy().into_owned(),
                    change,
                    parents: ParentIds::new(),
                    lane_parents: ParentIds::new(),
                    renamed_from: renamed_from
                        .as_ref()
                        .map(|old| old.to_string_lossy().into_owned()),
                });
                match (change, renamed_from) {
                    (FileChange::Renamed, Some(old)) => target = old,
                    (FileChange::Added, _) => recreated = true,
                    _ => {}
                }
            }

            let mut next = first_parent;
            if recreated {
                // The file may have lived and died before this addition;
                // skip the gap down to its previous incarnation, if any.
                while let Some(parent) = next {
                    if self.blob_at(parent, &target)?.is_some() {
                        break;
                    }
                    next = self.parents[parent.index()].first().copied();
                }
            }
            match next {
                Some(parent) => at = parent,
                None => break,
            }
        }

        link_entries(&mut entries);
        Ok(FileLog {
            path: path.to_owned(),
            entries,
        })
    }

    fn newest_rev_with(&self, path: &Path) -> Result<Option<RevId>> {
        for idx in (0..self.oids.len()).rev() {
            let rev = RevId(idx as u32);
            if self.blob_at(rev, path)?.is_some() {
                return Ok(Some(rev));
            }
        }
        Ok(None)
    }

    /// Blob id of `path` in the tree of `rev`, or None when absent.
    fn blob_at(&self, rev: RevId, path: &Path) -> Result<Option<Oid>> {
        let commit = self.repo.find_commit(self.oid(rev)?)?;
        let tree = commit.tree()?;
        match tree.get_path(path) {
            Ok(entry) => Ok(Some(entry.id())),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Old name of `path` if `rev` renamed or copied it into place.
    fn rename_source(&self, rev: RevId, path: &Path) -> Result<Option<PathBuf>> {
        let commit = self.repo.find_commit(self.oid(rev)?)?;
        if commit.parent_count() == 0 {
            return Ok(None);
        }
        let parent_tree = commit.parent(0)?.tree()?;
        let mut diff =
            self.repo
                .diff_tree_to_tree(Some(&parent_tree), Some(&commit.tree()?), None)?;
        diff.find_similar(None)?;
        for delta in diff.deltas() {
            if !matches!(delta.status(), Delta::Renamed | Delta::Copied) {
                continue;
            }
            if delta.new_file().path() == Some(path) {
                return Ok(delta.old_file().path().map(Path::to_path_buf));
            }
        }
        Ok(None)
    }
}

impl History for GitHistory {
    fn len(&self) -> usize {
        self.oids.len()
    }

    fn parents_of(&self, rev: RevId) -> Result<ParentIds> {
        self.parents
            .get(rev.index())
            .cloned()
            .ok_or(Error::UnknownRevision(rev))
    }

    fn on_branch(&self, rev: RevId, branch: &str) -> Result<bool> {
        let mut cache = self.reachable.borrow_mut();
        if let Some(set) = cache.get(branch) {
            return Ok(set.contains(&rev));
        }

        let tip = self.branch_tip(branch)?;
        let mut seen = HashSet::new();
        let mut stack = vec![tip];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            for &parent in &self.parents[current.index()] {
                stack.push(parent);
            }
        }
        let hit = seen.contains(&rev);
        cache.insert(branch.to_owned(), seen);
        Ok(hit)
    }
}

/// Commits reachable from HEAD and every local branch, newest first.
fn walk_all(repo: &Repository) -> Result<Vec<Oid>> {
    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    if repo.head().is_ok() {
        walk.push_head()?;
    }
    for branch in repo.branches(Some(BranchType::Local))? {
        let (branch, _) = branch?;
        if let Some(target) = branch.get().target() {
            walk.push(target)?;
        }
    }
    let mut oids = Vec::new();
    for oid in walk {
        oids.push(oid?);
    }
    Ok(oids)
}

/// Wires each entry's parent pointers to the next older entry. A
/// modification chains both lists, a rename keeps only the display
/// parent across the name change, and an addition links to nothing.
fn link_entries(entries: &mut [FileRev]) {
    for idx in 0..entries.len() {
        let Some(older) = entries.get(idx + 1).map(|entry| entry.rev) else {
            break;
        };
        match entries[idx].change {
            FileChange::Modified => {
                entries[idx].parents.push(older);
                entries[idx].lane_parents.push(older);
            }
            FileChange::Renamed => {
                entries[idx].parents.push(older);
            }
            FileChange::Added => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutGenerator;
    use crate::walk::RangeWalk;
    use git2::{Commit, Signature};
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        (dir, repo)
    }

    /// Commits a tree derived from the first parent's tree with the
    /// given blobs written and removed.
    fn commit_with(
        repo: &Repository,
        parents: &[Oid],
        writes: &[(&str, &str)],
        removes: &[&str],
        update_ref: Option<&str>,
        message: &str,
    ) -> Oid {
        let sig = Signature::now("Test User", "test@example.com").unwrap();
        let base = parents
            .first()
            .map(|&oid| repo.find_commit(oid).unwrap().tree().unwrap());
        let mut builder = repo.treebuilder(base.as_ref()).unwrap();
        for (name, content) in writes {
            let blob = repo.blob(content.as_bytes()).unwrap();
            builder.insert(*name, blob, 0o100644).unwrap();
        }
        for name in removes {
            builder.remove(*name).unwrap();
        }
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let parent_commits: Vec<Commit> = parents
            .iter()
            .map(|&oid| repo.find_commit(oid).unwrap())
            .collect();
        let parent_refs: Vec<&Commit> = parent_commits.iter().collect();
        repo.commit(update_ref, &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_ids_are_dense_and_oldest_first() {
        let (_dir, repo) = create_test_repo();
        let c1 = commit_with(&repo, &[], &[("a.txt", "one")], &[], Some("HEAD"), "one");
        let c2 = commit_with(&repo, &[c1], &[("a.txt", "two")], &[], Some("HEAD"), "two");
        let c3 = commit_with(
            &repo,
            &[c2],
            &[("a.txt", "three")],
            &[],
            Some("HEAD"),
            "three",
        );

        let history = GitHistory::from_repo(repo).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.rev(c1), Some(RevId(0)));
        assert_eq!(history.rev(c3), Some(RevId(2)));
        assert_eq!(history.tip(), Some(RevId(2)));
        assert_eq!(history.head_rev(), Some(RevId(2)));
        assert!(history.parents_of(RevId(0)).unwrap().is_empty());
        assert_eq!(
            history.parents_of(RevId(2)).unwrap().as_slice(),
            &[RevId(1)]
        );
        assert_eq!(history.oid(RevId(1)).unwrap(), c2);
    }

    #[test]
    fn test_merge_parents_and_branch_membership() {
        let (_dir, repo) = create_test_repo();
        let base = commit_with(&repo, &[], &[("a.txt", "base")], &[], Some("HEAD"), "base");
        let main = commit_with(&repo, &[base], &[("a.txt", "main")], &[], Some("HEAD"), "main");
        let side = commit_with(&repo, &[base], &[("b.txt", "side")], &[], None, "side");
        repo.branch("side", &repo.find_commit(side).unwrap(), false)
            .unwrap();
        let merge = commit_with(&repo, &[main, side], &[], &[], Some("HEAD"), "merge");

        let history = GitHistory::from_repo(repo).unwrap();
        assert_eq!(history.len(), 4);

        let merge_rev = history.rev(merge).unwrap();
        let main_rev = history.rev(main).unwrap();
        let side_rev = history.rev(side).unwrap();
        let base_rev = history.rev(base).unwrap();

        let parents = history.parents_of(merge_rev).unwrap();
        assert_eq!(parents.as_slice(), &[main_rev, side_rev]);

        assert!(history.on_branch(side_rev, "side").unwrap());
        assert!(history.on_branch(base_rev, "side").unwrap());
        assert!(!history.on_branch(main_rev, "side").unwrap());
        assert!(!history.on_branch(merge_rev, "side").unwrap());

        assert_eq!(history.branch_tip("side").unwrap(), side_rev);
        assert!(matches!(
            history.branch_tip("nope"),
            Err(Error::UnknownBranch(_))
        ));
        // A malformed name is a backend failure, not a missing branch.
        assert!(matches!(
            history.branch_tip("bad..name"),
            Err(Error::Backend(_))
        ));
        let tips = history.branch_tips().unwrap();
        assert!(tips.iter().any(|(name, rev)| name == "side" && *rev == side_rev));
    }

    #[test]
    fn test_working_parents_start_at_head() {
        let (_dir, repo) = create_test_repo();
        let base = commit_with(&repo, &[], &[("a.txt", "base")], &[], Some("HEAD"), "base");
        let main = commit_with(&repo, &[base], &[("a.txt", "main")], &[], Some("HEAD"), "main");
        let side = commit_with(&repo, &[base], &[("b.txt", "side")], &[], None, "side");
        let merge = commit_with(&repo, &[main, side], &[], &[], Some("HEAD"), "merge");

        let history = GitHistory::from_repo(repo).unwrap();
        let merge_rev = history.rev(merge).unwrap();
        let main_rev = history.rev(main).unwrap();
        let side_rev = history.rev(side).unwrap();
        assert_eq!(
            history.working_parents(),
            vec![merge_rev, main_rev, side_rev]
        );
    }

    #[test]
    fn test_layout_rows_from_a_real_repository() {
        let (_dir, repo) = create_test_repo();
        let base = commit_with(&repo, &[], &[("a.txt", "base")], &[], Some("HEAD"), "base");
        let main = commit_with(&repo, &[base], &[("a.txt", "main")], &[], Some("HEAD"), "main");
        let side = commit_with(&repo, &[base], &[("b.txt", "side")], &[], None, "side");
        repo.branch("side", &repo.find_commit(side).unwrap(), false)
            .unwrap();
        let merge = commit_with(&repo, &[main, side], &[], &[], Some("HEAD"), "merge");

        let history = GitHistory::from_repo(repo).unwrap();
        let mut gen = LayoutGenerator::new(RangeWalk::full(&history));
        let rows: Vec<_> = (&mut gen).collect::<Result<Vec<_>>>().unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].rev, history.rev(merge).unwrap());
        assert!(rows[0].is_merge());
        // The merge fans out into both parent lanes.
        assert_eq!(rows[0].segments.len(), 2);
        assert_eq!(rows[3].rev, history.rev(base).unwrap());
        assert!(rows[3].segments.is_empty());
        assert_eq!(gen.max_lanes(), 2);
        assert!(gen.frontier().is_empty());
    }

    #[test]
    fn test_tags_resolve_through_annotations() {
        let (_dir, repo) = create_test_repo();
        let c1 = commit_with(&repo, &[], &[("a.txt", "one")], &[], Some("HEAD"), "one");
        let c2 = commit_with(&repo, &[c1], &[("a.txt", "two")], &[], Some("HEAD"), "two");
        let c3 = commit_with(&repo, &[c2], &[("a.txt", "three")], &[], Some("HEAD"), "three");

        // Object handles borrow the repository until the block ends.
        {
            let sig = Signature::now("Test User", "test@example.com").unwrap();
            let target = repo.find_object(c1, None).unwrap();
            repo.tag("v1", &target, &sig, "first release", false)
                .unwrap();
            // A tag object wrapping another tag object. Only the outer
            // one gets a ref, so c2 is reachable through two peels and
            // nothing shorter.
            let inner = repo
                .tag_annotation_create(
                    "v2-rc",
                    &repo.find_object(c2, None).unwrap(),
                    &sig,
                    "candidate",
                )
                .unwrap();
            repo.tag(
                "v2",
                &repo.find_object(inner, None).unwrap(),
                &sig,
                "wrapped candidate",
                false,
            )
            .unwrap();
            repo.tag_lightweight("tip-tag", &repo.find_object(c3, None).unwrap(), false)
                .unwrap();
        }

        let history = GitHistory::from_repo(repo).unwrap();
        let tagged = history.tagged_revs().unwrap();
        assert_eq!(tagged, vec![RevId(2), RevId(1), RevId(0)]);
    }

    #[test]
    fn test_summary_reads_commit_metadata() {
        let (_dir, repo) = create_test_repo();
        let c1 = commit_with(
            &repo,
            &[],
            &[("a.txt", "one")],
            &[],
            Some("HEAD"),
            "initial import",
        );

        let history = GitHistory::from_repo(repo).unwrap();
        let summary = history.summary(RevId(0)).unwrap();
        assert_eq!(summary.id, c1.to_string());
        assert_eq!(summary.summary, "initial import");
        assert_eq!(summary.author, "Test User");
        assert!(summary.timestamp.timestamp() > 0);
    }

    #[test]
    fn test_file_log_follows_renames() {
        let (_dir, repo) = create_test_repo();
        let c1 = commit_with(
            &repo,
            &[],
            &[("a.txt", "alpha\nbeta\n")],
            &[],
            Some("HEAD"),
            "add a",
        );
        let c2 = commit_with(
            &repo,
            &[c1],
            &[("a.txt", "alpha\nbeta\ngamma\n")],
            &[],
            Some("HEAD"),
            "grow a",
        );
        let c3 = commit_with(
            &repo,
            &[c2],
            &[("b.txt", "alpha\nbeta\ngamma\n")],
            &["a.txt"],
            Some("HEAD"),
            "rename a to b",
        );
        let _c4 = commit_with(
            &repo,
            &[c3],
            &[("b.txt", "alpha\nbeta\ngamma\ndelta\n")],
            &[],
            Some("HEAD"),
            "grow b",
        );

        let history = GitHistory::from_repo(repo).unwrap();
        let log = history.file_log("b.txt").unwrap();
        assert_eq!(log.entries.len(), 4);

        let newest = &log.entries[0];
        assert_eq!((newest.rev, newest.change), (RevId(3), FileChange::Modified));
        assert_eq!(newest.lane_parents.as_slice(), &[RevId(2)]);

        let rename = &log.entries[1];
        assert_eq!((rename.rev, rename.change), (RevId(2), FileChange::Renamed));
        assert_eq!(rename.renamed_from.as_deref(), Some("a.txt"));
        // The pre-rename ancestor stays visible but gets no lane line.
        assert_eq!(rename.parents.as_slice(), &[RevId(1)]);
        assert!(rename.lane_parents.is_empty());

        let grown = &log.entries[2];
        assert_eq!((grown.rev, grown.change), (RevId(1), FileChange::Modified));
        assert_eq!(grown.path, "a.txt");

        let root = &log.entries[3];
        assert_eq!((root.rev, root.change), (RevId(0), FileChange::Added));
        assert!(root.parents.is_empty());
    }

    #[test]
    fn test_file_log_splits_on_delete_and_recreate() {
        let (_dir, repo) = create_test_repo();
        let c1 = commit_with(&repo, &[], &[("f.txt", "one")], &[], Some("HEAD"), "add f");
        let c2 = commit_with(&repo, &[c1], &[], &["f.txt"], Some("HEAD"), "drop f");
        let _c3 = commit_with(&repo, &[c2], &[("f.txt", "two")], &[], Some("HEAD"), "bring f back");

        let history = GitHistory::from_repo(repo).unwrap();
        let log = history.file_log("f.txt").unwrap();
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0].rev, RevId(2));
        assert_eq!(log.entries[0].change, FileChange::Added);
        assert!(log.entries[0].parents.is_empty());
        assert_eq!(log.entries[1].rev, RevId(0));
        assert_eq!(log.entries[1].change, FileChange::Added);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let (_dir, repo) = create_test_repo();
        commit_with(&repo, &[], &[("a.txt", "one")], &[], Some("HEAD"), "one");

        let history = GitHistory::from_repo(repo).unwrap();
        assert!(matches!(
            history.file_log("missing.txt"),
            Err(Error::NoFileHistory(_))
        ));
    }

    #[test]
    fn test_empty_repository_indexes_nothing() {
        let (_dir, repo) = create_test_repo();
        let history = GitHistory::from_repo(repo).unwrap();
        assert!(history.is_empty());
        assert!(history.tip().is_none());
        assert!(history.head_rev().is_none());
        assert!(history.working_parents().is_empty());
    }
}
