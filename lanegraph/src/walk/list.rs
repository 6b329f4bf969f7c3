use std::vec;

use crate::core::{RevId, WalkItem};
use crate::error::Result;
use crate::source::History;

/// Walks an explicit revision list with no lane lines between rows.
///
/// Display parents still come from the history, so a renderer can tell
/// merges apart, but `lane_parents` stays empty: the rows of a filtered
/// list are not generally adjacent in ancestry, and lines between them
/// would invent relationships the selection broke.
pub struct ListWalk<'h, H> {
    history: &'h H,
    revs: vec::IntoIter<RevId>,
}

impl<'h, H: History> ListWalk<'h, H> {
    /// Walks `revs` in the order given. Callers wanting the usual
    /// newest-first reading order sort before building the walk.
    pub fn new(history: &'h H, revs: Vec<RevId>) -> Self {
        Self {
            history,
            revs: revs.into_iter(),
        }
    }
}

impl<H> Clone for ListWalk<'_, H> {
    fn clone(&self) -> Self {
        Self {
            history: self.history,
            revs: self.revs.clone(),
        }
    }
}

impl<H: History> Iterator for ListWalk<'_, H> {
    type Item = Result<WalkItem>;

    fn next(&mut self) -> Option<Self::Item> {
        let rev = self.revs.next()?;
        Some(
            self.history
                .parents_of(rev)
                .map(|parents| WalkItem::flat(rev, parents)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::layout::LayoutGenerator;
    use crate::source::MemHistory;

    fn forked() -> MemHistory {
        let mut history = MemHistory::new();
        let root = history.add(&[]);
        let left = history.add(&[root]);
        let right = history.add(&[root]);
        history.add(&[left, right]);
        history
    }

    #[test]
    fn test_items_are_flat_but_keep_display_parents() {
        let history = forked();
        let items: Vec<WalkItem> = ListWalk::new(&history, vec![RevId(3), RevId(0)])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].parents.as_slice(), &[RevId(1), RevId(2)]);
        assert!(items[0].lane_parents.is_empty());
        assert!(items[1].parents.is_empty());
    }

    #[test]
    fn test_unknown_revision_surfaces_as_error() {
        let history = forked();
        let mut walk = ListWalk::new(&history, vec![RevId(0), RevId(42)]);
        assert!(matches!(walk.next(), Some(Ok(_))));
        assert!(matches!(
            walk.next(),
            Some(Err(Error::UnknownRevision(RevId(42))))
        ));
    }

    #[test]
    fn test_layout_keeps_every_row_in_the_first_lane() {
        let history = forked();
        let walk = ListWalk::new(&history, vec![RevId(3), RevId(2), RevId(0)]);
        let mut gen = LayoutGenerator::new(walk);
        let rows: Vec<_> = (&mut gen).collect::<Result<Vec<_>>>().unwrap();

        assert!(rows.iter().all(|row| row.lane == 0));
        assert!(rows.iter().all(|row| row.segments.is_empty()));
        // Each row opens and closes its own head, cycling colors.
        assert_eq!(rows[0].color, 0);
        assert_eq!(rows[1].color, 1);
        assert_eq!(rows[2].color, 2);
        assert_eq!(gen.max_lanes(), 1);
    }
}
