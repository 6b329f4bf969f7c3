use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use lanegraph::{
    FileLogWalk, GitHistory, History, LayoutRow, ListWalk, RangeWalk, RevId, RevSummary,
    RowBuffer, DEFAULT_PALETTE,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;

mod render;

use render::AsciiGraph;

/// Rows materialized per batch while streaming the graph out.
const DEFAULT_BATCH: usize = 500;

#[derive(Parser)]
#[command(name = "revlane")]
#[command(about = "Lane-graph history viewer for git repositories", long_about = None)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Lane colors to cycle through
    #[arg(long, global = true, default_value_t = DEFAULT_PALETTE)]
    palette: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the commit graph
    Log {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Show only this branch
        #[arg(short, long)]
        branch: Option<String>,
        /// Oldest revision number to include
        #[arg(long, default_value_t = 0)]
        stop: u32,
        /// Rows to materialize per batch
        #[arg(long, default_value_t = DEFAULT_BATCH)]
        batch: usize,
        /// Stop after this many rows
        #[arg(short, long)]
        limit: Option<usize>,
        /// Materialize every row before printing
        #[arg(long, conflicts_with = "limit")]
        all: bool,
    },
    /// Show the graph of a single file's ancestry
    FileLog {
        /// File path inside the repository
        file: String,
        /// Path to the repository
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Rows to materialize per batch
        #[arg(long, default_value_t = DEFAULT_BATCH)]
        batch: usize,
    },
    /// List selected revisions without graph lines
    List {
        /// Path to the repository
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Only branch heads
        #[arg(long)]
        heads: bool,
        /// Only tagged revisions
        #[arg(long)]
        tagged: bool,
        /// Only HEAD and its parents
        #[arg(long)]
        parents: bool,
        /// Only merge revisions
        #[arg(long, conflicts_with = "no_merges")]
        merges_only: bool,
        /// Skip merge revisions
        #[arg(long)]
        no_merges: bool,
        /// Explicit revision numbers
        #[arg(long, value_delimiter = ',')]
        revs: Vec<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let color = !cli.no_color;
    let palette = cli.palette;

    match cli.command {
        Commands::Log {
            path,
            branch,
            stop,
            batch,
            limit,
            all,
        } => {
            let history = GitHistory::open(&path)
                .with_context(|| format!("failed to open repository at {}", path.display()))?;
            let Some(tip) = history.tip() else {
                println!("repository has no commits");
                return Ok(());
            };
            let start = match branch.as_deref() {
                Some(name) => history.branch_tip(name)?,
                None => tip,
            };

            let mut walk = RangeWalk::range(&history, start, RevId(stop));
            if let Some(name) = branch {
                walk = walk.branch(name);
            }
            let mut buffer = RowBuffer::with_palette(walk, palette);
            let graph = AsciiGraph::new(color);
            if all {
                buffer.advance(None)?;
            }

            let mut printed = 0;
            loop {
                let step = match limit {
                    Some(cap) if buffer.len() >= cap => break,
                    Some(cap) => batch.min(cap - buffer.len()),
                    None => batch,
                };
                let exhausted = buffer.advance(Some(step))?;
                while printed < buffer.len() {
                    if let Some(row) = buffer.row_at(printed) {
                        let meta = history.summary(row.rev)?;
                        print_row(&graph, &meta, row, buffer.max_lanes(), "");
                    }
                    printed += 1;
                }
                if exhausted {
                    break;
                }
            }
            info!(
                rows = buffer.len(),
                lanes = buffer.max_lanes(),
                "graph printed"
            );
        }
        Commands::FileLog { file, repo, batch } => {
            let history = GitHistory::open(&repo)
                .with_context(|| format!("failed to open repository at {}", repo.display()))?;
            let log = history.file_log(&file)?;

            // Annotate renames and rows living under an older name.
            let mut notes: HashMap<RevId, String> = HashMap::new();
            for entry in &log.entries {
                if let Some(old) = &entry.renamed_from {
                    notes.insert(entry.rev, format!(" (was: {old})"));
                } else if entry.path != log.path {
                    notes.insert(entry.rev, format!(" (as: {})", entry.path));
                }
            }

            let mut buffer = RowBuffer::with_palette(FileLogWalk::new(log), palette);
            let graph = AsciiGraph::new(color);

            let mut printed = 0;
            loop {
                let exhausted = buffer.advance(Some(batch))?;
                while printed < buffer.len() {
                    if let Some(row) = buffer.row_at(printed) {
                        let meta = history.summary(row.rev)?;
                        let note = notes.get(&row.rev).map(String::as_str).unwrap_or("");
                        print_row(&graph, &meta, row, buffer.max_lanes(), note);
                    }
                    printed += 1;
                }
                if exhausted {
                    break;
                }
            }
        }
        Commands::List {
            path,
            heads,
            tagged,
            parents,
            merges_only,
            no_merges,
            revs,
        } => {
            let history = GitHistory::open(&path)
                .with_context(|| format!("failed to open repository at {}", path.display()))?;

            let mut selected: Vec<RevId> = if !revs.is_empty() {
                revs.into_iter().map(RevId).collect()
            } else if heads {
                history
                    .branch_tips()?
                    .into_iter()
                    .map(|(_, rev)| rev)
                    .collect()
            } else if tagged {
                history.tagged_revs()?
            } else if parents {
                history.working_parents()
            } else {
                (0..history.len() as u32).map(RevId).collect()
            };
            selected.sort_unstable_by(|a, b| b.cmp(a));
            selected.dedup();

            if merges_only || no_merges {
                let mut kept = Vec::with_capacity(selected.len());
                for rev in selected {
                    let is_merge = history.parents_of(rev)?.len() > 1;
                    if is_merge == merges_only {
                        kept.push(rev);
                    }
                }
                selected = kept;
            }

            let mut buffer = RowBuffer::with_palette(ListWalk::new(&history, selected), palette);
            buffer.advance(None)?;
            let graph = AsciiGraph::new(color);
            let width = buffer.max_lanes().max(1);
            for row in buffer.rows() {
                let meta = history.summary(row.rev)?;
                let note = if row.is_merge() { " (merge)" } else { "" };
                print_row(&graph, &meta, row, width, note);
            }
        }
    }

    Ok(())
}

fn print_row(graph: &AsciiGraph, meta: &RevSummary, row: &LayoutRow, width: usize, note: &str) {
    let stamp = meta.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    println!(
        "{} {} {} {} {}: {}{}",
        graph.node_line(row, width),
        row.rev,
        &meta.id[..8],
        stamp,
        meta.author,
        meta.summary,
        note
    );
    if let Some(bends) = graph.bend_line(row, width) {
        println!("{bends}");
    }
}
