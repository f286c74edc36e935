//! Memory bag: the arena every parsed record lives in.
//!
//! A bag serves one record per allocation out of a fixed byte budget and
//! releases records only as a unit, either by being dropped or by rolling
//! back to a [`Snapshot`]. Callers take a snapshot before a parse, read or
//! copy what they need from the produced list, then roll back.

use tracing::trace;

/// Default byte budget of a bag (16 MiB).
pub const DEFAULT_LIMIT: usize = 16 * 1024 * 1024;

/// Handle to one record inside a [`Bag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

/// Opaque allocation mark returned by [`Bag::snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    len: usize,
    used: usize,
}

/// The bag could not serve an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted {
    pub requested: usize,
    pub available: usize,
}

/// Byte-budgeted, append-only record store.
///
/// Records are kept in allocation order. A single parse call holds the bag
/// mutably for its whole duration, so the records of one produced list are
/// contiguous and each record's forward link is simply the next slot.
#[derive(Debug)]
pub struct Bag<T> {
    records: Vec<T>,
    used: usize,
    limit: usize,
}

impl<T> Default for Bag<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bag<T> {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            used: 0,
            limit,
        }
    }

    /// Reserve `size` bytes and store the record built by `make`.
    ///
    /// `make` only runs once the budget check has passed; on exhaustion
    /// nothing is stored.
    pub fn alloc(&mut self, size: usize, make: impl FnOnce() -> T) -> Result<RecordId, Exhausted> {
        let available = self.limit.saturating_sub(self.used);
        if size > available {
            return Err(Exhausted {
                requested: size,
                available,
            });
        }
        self.used += size;
        self.records.push(make());
        Ok(RecordId(self.records.len() - 1))
    }

    pub fn get(&self, id: RecordId) -> Option<&T> {
        self.records.get(id.0)
    }

    /// Iterate `len` linked records starting at `head`.
    pub fn chain(&self, head: Option<RecordId>, len: usize) -> impl Iterator<Item = &T> {
        let records = match head {
            Some(RecordId(start)) => self.records.get(start..).unwrap_or(&[]),
            None => &[],
        };
        records.iter().take(len)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            len: self.records.len(),
            used: self.used,
        }
    }

    /// Release every record allocated after `snapshot` was taken.
    pub fn rollback(&mut self, snapshot: Snapshot) {
        if snapshot.len > self.records.len() {
            return;
        }
        trace!(
            released = self.records.len() - snapshot.len,
            bytes = self.used - snapshot.used,
            "Rolling back memory bag"
        );
        self.records.truncate(snapshot.len);
        self.used = snapshot.used;
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// The byte budget the bag was created with.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
