use std::collections::HashMap;

use tracing::debug;

use crate::core::{RevId, WalkItem};
use crate::error::Result;
use crate::layout::{LayoutGenerator, LayoutRow, DEFAULT_PALETTE};

/// Rows pulled per step while seeking a revision.
const SEEK_BATCH: usize = 500;

/// Incrementally materialized row store over a layout stream.
///
/// A view asks for rows in batches; everything pulled so far stays
/// addressable by row index and by revision. A pristine clone of the
/// traversal is kept around so the whole layout can be rebuilt from
/// scratch when the underlying history changes.
pub struct RowBuffer<W> {
    seed: W,
    layout: LayoutGenerator<W>,
    palette: usize,
    rows: Vec<LayoutRow>,
    index: HashMap<RevId, usize>,
    exhausted: bool,
}

impl<W> RowBuffer<W>
where
    W: Iterator<Item = Result<WalkItem>> + Clone,
{
    pub fn new(walk: W) -> Self {
        Self::with_palette(walk, DEFAULT_PALETTE)
    }

    pub fn with_palette(walk: W, palette: usize) -> Self {
        let seed = walk.clone();
        Self {
            seed,
            layout: LayoutGenerator::with_palette(walk, palette),
            palette,
            rows: Vec::new(),
            index: HashMap::new(),
            exhausted: false,
        }
    }

    /// Pulls up to `limit` more rows, or everything left when `limit`
    /// is None. Returns true once the traversal has nothing further.
    ///
    /// A traversal error latches the buffer exhausted; rows
    /// materialized before the failure stay readable.
    pub fn advance(&mut self, limit: Option<usize>) -> Result<bool> {
        let mut remaining = limit;
        while !self.exhausted {
            if remaining == Some(0) {
                break;
            }
            match self.layout.next() {
                Some(Ok(row)) => {
                    self.index.insert(row.rev, self.rows.len());
                    self.rows.push(row);
                    if let Some(n) = remaining.as_mut() {
                        *n -= 1;
                    }
                }
                Some(Err(err)) => {
                    self.exhausted = true;
                    return Err(err);
                }
                None => {
                    self.exhausted = true;
                    debug!(rows = self.rows.len(), "history fully materialized");
                }
            }
        }
        Ok(self.exhausted)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_at(&self, index: usize) -> Option<&LayoutRow> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[LayoutRow] {
        &self.rows
    }

    /// Row index a revision was materialized at, if it has been.
    pub fn index_of(&self, rev: RevId) -> Option<usize> {
        self.index.get(&rev).copied()
    }

    /// Widest the graph has been over the rows pulled so far.
    pub fn max_lanes(&self) -> usize {
        self.layout.max_lanes()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Materializes rows until `rev` is addressable and returns its row
    /// index, or None when the traversal ends without yielding it.
    pub fn seek(&mut self, rev: RevId) -> Result<Option<usize>> {
        loop {
            if let Some(index) = self.index_of(rev) {
                return Ok(Some(index));
            }
            if self.advance(Some(SEEK_BATCH))? {
                return Ok(self.index_of(rev));
            }
        }
    }

    /// Drops every materialized row and restarts the traversal from its
    /// seed.
    pub fn reset(&mut self) {
        self.layout = LayoutGenerator::with_palette(self.seed.clone(), self.palette);
        self.rows.clear();
        self.index.clear();
        self.exhausted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::source::MemHistory;
    use crate::walk::{ListWalk, RangeWalk};

    fn braided() -> MemHistory {
        let mut history = MemHistory::new();
        let root = history.add(&[]);
        let left = history.add(&[root]);
        let right = history.add(&[root]);
        let merge = history.add(&[left, right]);
        history.add(&[merge]);
        history
    }

    #[test]
    fn test_batched_loading_keeps_rows_addressable() {
        let history = braided();
        let mut buffer = RowBuffer::new(RangeWalk::full(&history));

        // A zero-row pull is a no-op and claims nothing about the end.
        assert!(!buffer.advance(Some(0)).unwrap());
        assert!(buffer.is_empty());

        assert!(!buffer.advance(Some(2)).unwrap());
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.index_of(RevId(4)), Some(0));
        assert_eq!(buffer.index_of(RevId(0)), None);

        assert!(buffer.advance(None).unwrap());
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.index_of(RevId(0)), Some(4));
        assert!(buffer.is_exhausted());
        assert_eq!(buffer.max_lanes(), 2);

        // Advancing past the end stays exhausted and adds nothing.
        assert!(buffer.advance(Some(10)).unwrap());
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_batch_size_does_not_change_the_layout() {
        let history = braided();
        let mut batched = RowBuffer::new(RangeWalk::full(&history));
        while !batched.advance(Some(1)).unwrap() {}

        let mut whole = RowBuffer::new(RangeWalk::full(&history));
        whole.advance(None).unwrap();

        assert_eq!(batched.rows(), whole.rows());
        assert_eq!(batched.max_lanes(), whole.max_lanes());
    }

    #[test]
    fn test_seek_materializes_up_to_the_revision() {
        let history = braided();
        let mut buffer = RowBuffer::new(RangeWalk::full(&history));
        assert_eq!(buffer.seek(RevId(1)).unwrap(), Some(3));
        assert!(buffer.len() >= 4);
        assert_eq!(buffer.seek(RevId(42)).unwrap(), None);
        assert!(buffer.is_exhausted());
    }

    #[test]
    fn test_reset_rebuilds_from_the_seed() {
        let history = braided();
        let mut buffer = RowBuffer::new(RangeWalk::full(&history));
        buffer.advance(None).unwrap();
        let before = buffer.rows().to_vec();

        buffer.reset();
        assert!(buffer.is_empty());
        assert!(!buffer.is_exhausted());
        buffer.advance(None).unwrap();
        assert_eq!(buffer.rows(), before.as_slice());
    }

    #[test]
    fn test_traversal_error_latches_the_buffer() {
        let history = braided();
        let walk = ListWalk::new(&history, vec![RevId(4), RevId(42)]);
        let mut buffer = RowBuffer::new(walk);

        assert!(matches!(
            buffer.advance(None),
            Err(Error::UnknownRevision(RevId(42)))
        ));
        assert_eq!(buffer.len(), 1);
        assert!(buffer.is_exhausted());
        assert!(buffer.advance(None).unwrap());
    }
}
