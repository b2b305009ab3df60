//! Record cursors
//!
//! A `RecordCursor` streams a collection's records in storage order. Long
//! scans must not hold cursor state across a unit-of-work commit, so the
//! cursor is paused into an opaque `CursorToken` and resumed from it; there
//! is no implicit save/restore. `seek` repositions to an exact record, which
//! the copy loop uses to land back on the first record of a batch after an
//! optimistic-concurrency conflict.

use crate::catalog::Catalog;
use coral_core::collection::Record;
use coral_core::types::{CollectionId, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Start,
    After(RecordId),
    At(RecordId),
}

/// Opaque resume point of a paused cursor.
#[derive(Debug, Clone, Copy)]
pub struct CursorToken {
    collection: CollectionId,
    position: Position,
}

/// Streaming cursor over one collection's records, in storage order.
pub struct RecordCursor<'a> {
    catalog: &'a Catalog,
    collection: CollectionId,
    position: Position,
}

impl<'a> RecordCursor<'a> {
    /// Open a cursor positioned before the first record.
    pub fn new(catalog: &'a Catalog, collection: CollectionId) -> Self {
        RecordCursor {
            catalog,
            collection,
            position: Position::Start,
        }
    }

    /// The next record in storage order, advancing the cursor.
    ///
    /// Returns `None` at the end of the collection, or if the collection no
    /// longer exists.
    pub fn next(&mut self) -> Option<(RecordId, Record)> {
        let found = match self.position {
            Position::Start => self.catalog.next_record_after(self.collection, None),
            Position::After(pos) => self.catalog.next_record_after(self.collection, Some(pos)),
            Position::At(pos) => self
                .catalog
                .record_at(self.collection, pos)
                .map(|rec| (pos, rec)),
        };
        if let Some((rid, _)) = &found {
            self.position = Position::After(*rid);
        }
        found
    }

    /// Reposition so the next call to [`RecordCursor::next`] yields exactly
    /// the record at `pos`.
    pub fn seek(&mut self, pos: RecordId) {
        self.position = Position::At(pos);
    }

    /// Pause the cursor, consuming it. The scan is resumable only through
    /// the returned token.
    pub fn pause(self) -> CursorToken {
        CursorToken {
            collection: self.collection,
            position: self.position,
        }
    }

    /// Resume a scan from a pause token.
    pub fn resume(catalog: &'a Catalog, token: CursorToken) -> Self {
        RecordCursor {
            catalog,
            collection: token.collection,
            position: token.position,
        }
    }
}
