//! Offset index
//!
//! Dense, in-memory map from logical offset to the byte position of the frame
//! holding it. Offsets are contiguous from `base_offset`, so a plain vector
//! indexed by `offset - base_offset` is enough.

/// Append-only offset → position index for one segment
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    /// First offset covered by the index
    base_offset: u64,
    /// Frame start positions, one per offset
    positions: Vec<u64>,
}

impl OffsetIndex {
    #[inline]
    pub fn new(base_offset: u64) -> Self {
        Self {
            base_offset,
            positions: Vec::new(),
        }
    }

    #[inline]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// The offset the next pushed position will be stored under
    #[inline]
    pub fn next_offset(&self) -> u64 {
        self.base_offset + self.positions.len() as u64
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Record the position of the frame for `next_offset()` and return that offset
    pub fn push(&mut self, position: u64) -> u64 {
        debug_assert!(
            self.positions.last().map_or(true, |&last| position > last),
            "frame positions must be strictly increasing, got {position} after {:?}",
            self.positions.last()
        );
        let offset = self.next_offset();
        self.positions.push(position);
        offset
    }

    /// Byte position of the frame holding `offset`
    pub fn position(&self, offset: u64) -> Option<u64> {
        let relative = offset.checked_sub(self.base_offset)?;
        let relative = usize::try_from(relative).ok()?;
        self.positions.get(relative).copied()
    }

    /// Whether `offset` lies in `[base_offset, next_offset)`
    #[inline]
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.base_offset && offset < self.next_offset()
    }
}
