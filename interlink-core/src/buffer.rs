//! Chain of fixed-capacity segments between backend reads and client writes
//!
//! Reads land in the tail segment, writes drain the head segment. A segment
//! never grows: when a read fills the tail, a fresh tail is appended right
//! away so there is always room for the next read. A head segment is freed
//! once it is full and fully written, and never while it is still the write
//! target.

use interlink_common::{BridgeError, Result};
use std::collections::VecDeque;

#[derive(Debug)]
struct Segment {
    data: Box<[u8]>,
    filled: usize,
    consumed: usize,
}

impl Segment {
    fn allocate(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).map_err(|e| {
            BridgeError::Resource(format!("cannot allocate {capacity}-byte segment: {e}"))
        })?;
        data.resize(capacity, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
            filled: 0,
            consumed: 0,
        })
    }

    fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    fn unconsumed(&self) -> &[u8] {
        &self.data[self.consumed..self.filled]
    }
}

#[derive(Debug)]
pub struct SegmentChain {
    segments: VecDeque<Segment>,
    capacity: usize,
    allocated: usize,
}

impl SegmentChain {
    /// Create a chain holding one empty segment of `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(BridgeError::Resource("segment capacity must be non-zero".into()));
        }
        let mut segments = VecDeque::with_capacity(4);
        segments.push_back(Segment::allocate(capacity)?);
        Ok(Self {
            segments,
            capacity,
            allocated: 1,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Segments allocated over the chain's lifetime.
    pub fn segments_allocated(&self) -> usize {
        self.allocated
    }

    /// Segments currently held.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Bytes read but not yet written.
    pub fn pending(&self) -> usize {
        self.segments.iter().map(|s| s.filled - s.consumed).sum()
    }

    /// Unwritten bytes of the head segment and free space of the tail
    /// segment, borrowed together so a read and a write can be in flight at
    /// the same time.
    pub fn split(&mut self) -> (&[u8], &mut [u8]) {
        let mut iter = self.segments.iter_mut();
        match (iter.next(), iter.next_back()) {
            (Some(head), Some(tail)) => {
                let pending = &head.data[head.consumed..head.filled];
                let spare = &mut tail.data[tail.filled..];
                (pending, spare)
            }
            (Some(only), None) => {
                let (front, back) = only.data.split_at_mut(only.filled);
                (&front[only.consumed..], back)
            }
            _ => (&[], &mut []),
        }
    }

    /// Unwritten bytes of the head segment.
    pub fn head(&self) -> &[u8] {
        self.segments.front().map_or(&[][..], Segment::unconsumed)
    }

    /// Record `n` bytes read into the tail's free space.
    ///
    /// Appends a new tail when this read filled the current one.
    pub fn commit_read(&mut self, n: usize) -> Result<()> {
        let Some(tail) = self.segments.back_mut() else {
            return Err(BridgeError::Resource("segment chain has no tail".into()));
        };
        debug_assert!(tail.filled + n <= tail.data.len());
        tail.filled = (tail.filled + n).min(tail.data.len());

        if tail.is_full() {
            self.segments.push_back(Segment::allocate(self.capacity)?);
            self.allocated += 1;
        }
        Ok(())
    }

    /// Record `n` bytes of the head written to the client.
    ///
    /// Returns true when the head was a full segment that is now drained and
    /// has been released, meaning the next segment may already hold data.
    pub fn commit_write(&mut self, n: usize) -> bool {
        let Some(head) = self.segments.front_mut() else {
            return false;
        };
        debug_assert!(head.consumed + n <= head.filled);
        head.consumed = (head.consumed + n).min(head.filled);

        if head.consumed == head.filled && head.is_full() && self.segments.len() > 1 {
            self.segments.pop_front();
            return true;
        }
        false
    }
}
