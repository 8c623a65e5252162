//! Sequential reads over a log

use crate::error::Result;
use crate::record::{Record, RecordCodec};

use super::Log;

/// Iterator over consecutive records starting at a given offset
///
/// Stops at the tail observed when each item is requested, so records
/// appended while iterating are picked up. Ends after yielding an error.
pub struct LogIter<'a, C: RecordCodec> {
    log: &'a Log<C>,
    next: u64,
    done: bool,
}

impl<'a, C: RecordCodec> LogIter<'a, C> {
    pub(super) fn new(log: &'a Log<C>, from: u64) -> Self {
        Self {
            log,
            next: from,
            done: false,
        }
    }

    /// Offset of the next record this iterator will yield
    pub fn position(&self) -> u64 {
        self.next
    }
}

impl<C: RecordCodec> Iterator for LogIter<'_, C> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let tail = match self.log.next_offset() {
            Ok(tail) => tail,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        if self.next >= tail {
            return None;
        }

        let item = self.log.read(self.next);
        match item {
            Ok(_) => self.next += 1,
            Err(_) => self.done = true,
        }
        Some(item)
    }
}
