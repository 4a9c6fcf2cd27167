//! Sliding receive window
//!
//! A fixed-capacity arena of slots addressed by the offset of a packet's
//! sequence number from the window base. The window never grows: when a
//! packet lands beyond the upper bound, the oldest half is retired and the
//! newest half shifted down, advancing the base by half the capacity.

use crate::packet::PacketRecord;
use crate::sequence::SeqNumber;

/// Default number of slots
pub const DEFAULT_CAPACITY: usize = 200;

/// Receive window over the most recent packet arrivals
#[derive(Debug)]
pub struct ReceiveWindow {
    /// Slot storage, index = sequence offset from `base`
    slots: Vec<Option<PacketRecord>>,
    /// Sequence number of slot 0
    base: SeqNumber,
    /// Shift granularity (capacity / 2)
    half: usize,
}

impl ReceiveWindow {
    /// Create a new window whose slot 0 corresponds to `base`
    ///
    /// # Panics
    /// Panics if `capacity` is odd, smaller than 2, or larger than half the
    /// sequence space.
    pub fn new(capacity: usize, base: SeqNumber) -> Self {
        assert!(
            Self::is_valid_capacity(capacity),
            "window capacity {} must be even and within 2..=32768",
            capacity
        );

        ReceiveWindow {
            slots: vec![None; capacity],
            base,
            half: capacity / 2,
        }
    }

    /// Whether `capacity` can back a window: even, at least 2, and no more
    /// than half the sequence space
    pub fn is_valid_capacity(capacity: usize) -> bool {
        capacity >= 2 && capacity % 2 == 0 && capacity <= 0x8000
    }

    /// Number of slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Shift granularity
    #[inline]
    pub fn half_capacity(&self) -> usize {
        self.half
    }

    /// Sequence number of slot 0
    #[inline]
    pub fn base(&self) -> SeqNumber {
        self.base
    }

    /// Slot index for `seq`, if it currently falls inside the window
    pub fn slot_of(&self, seq: SeqNumber) -> Option<usize> {
        let offset = seq.offset_from(self.base) as usize;
        (offset < self.capacity()).then_some(offset)
    }

    /// Whether `seq` lies at or beyond the upper bound of the window
    pub fn needs_advance(&self, seq: SeqNumber) -> bool {
        !self.is_behind(seq) && seq.offset_from(self.base) as usize >= self.capacity()
    }

    /// Whether `seq` lies before slot 0 (already retired)
    #[inline]
    pub fn is_behind(&self, seq: SeqNumber) -> bool {
        seq.is_behind(self.base)
    }

    /// Get the record in a slot
    pub fn get(&self, index: usize) -> Option<&PacketRecord> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Whether the slot for `seq` is already occupied
    pub fn contains(&self, seq: SeqNumber) -> bool {
        self.slot_of(seq).and_then(|idx| self.get(idx)).is_some()
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Place a record at its slot, returning the previous occupant
    ///
    /// # Panics
    /// Panics if the record's sequence number falls outside the window. The
    /// caller advances the window before inserting.
    pub fn insert(&mut self, record: PacketRecord) -> Option<PacketRecord> {
        let Some(idx) = self.slot_of(record.sequence) else {
            panic!(
                "sequence {} outside window [{}, {})",
                record.sequence,
                self.base,
                self.base + self.capacity() as u16
            );
        };
        self.slots[idx].replace(record)
    }

    /// Adjacent slot pairs `(i, i + 1)` for every `i` in the retiring half
    pub fn retiring_pairs(
        &self,
    ) -> impl Iterator<Item = (Option<&PacketRecord>, Option<&PacketRecord>)> + '_ {
        (0..self.half).map(move |i| (self.slots[i].as_ref(), self.slots[i + 1].as_ref()))
    }

    /// Retire the lower half and shift the upper half down
    ///
    /// Records in the retired half are dropped. The base advances by half the
    /// capacity and the upper half is left empty.
    pub fn shift(&mut self) {
        for i in 0..self.half {
            self.slots[i] = self.slots[i + self.half].take();
        }
        self.base += self.half as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn record(seq: u16) -> PacketRecord {
        PacketRecord::new(SeqNumber::new(seq), seq as u32 * 160, Instant::now())
    }

    #[test]
    fn test_insert_at_offset() {
        let mut window = ReceiveWindow::new(DEFAULT_CAPACITY, SeqNumber::new(1000));
        assert!(window.insert(record(1005)).is_none());
        assert_eq!(window.get(5).unwrap().sequence, SeqNumber::new(1005));
        assert!(window.contains(SeqNumber::new(1005)));
        assert!(!window.contains(SeqNumber::new(1006)));
        assert_eq!(window.occupied(), 1);
    }

    #[test]
    fn test_insert_overwrites() {
        let mut window = ReceiveWindow::new(DEFAULT_CAPACITY, SeqNumber::new(0));
        window.insert(record(3));
        let previous = window.insert(record(3));
        assert_eq!(previous.unwrap().sequence, SeqNumber::new(3));
        assert_eq!(window.occupied(), 1);
    }

    #[test]
    fn test_bounds_across_wraparound() {
        let window = ReceiveWindow::new(DEFAULT_CAPACITY, SeqNumber::new(65500));
        assert_eq!(window.slot_of(SeqNumber::new(65500)), Some(0));
        assert_eq!(window.slot_of(SeqNumber::new(99)), Some(135));
        assert_eq!(window.slot_of(SeqNumber::new(163)), Some(199));
        assert_eq!(window.slot_of(SeqNumber::new(164)), None);
        assert!(window.needs_advance(SeqNumber::new(164)));
        assert!(!window.needs_advance(SeqNumber::new(163)));
        assert!(window.is_behind(SeqNumber::new(65499)));
        assert!(!window.needs_advance(SeqNumber::new(65499)));
    }

    #[test]
    #[should_panic]
    fn test_insert_out_of_window_panics() {
        let mut window = ReceiveWindow::new(DEFAULT_CAPACITY, SeqNumber::new(0));
        window.insert(record(200));
    }

    #[test]
    #[should_panic]
    fn test_odd_capacity_rejected() {
        ReceiveWindow::new(7, SeqNumber::new(0));
    }

    #[test]
    fn test_retiring_pairs() {
        let mut window = ReceiveWindow::new(4, SeqNumber::new(0));
        window.insert(record(0));
        window.insert(record(2));

        let pairs: Vec<_> = window
            .retiring_pairs()
            .map(|(a, b)| (a.map(|r| r.sequence.as_raw()), b.map(|r| r.sequence.as_raw())))
            .collect();
        assert_eq!(pairs, vec![(Some(0), None), (None, Some(2))]);
    }

    #[test]
    fn test_shift() {
        let mut window = ReceiveWindow::new(DEFAULT_CAPACITY, SeqNumber::new(65500));
        for seq in [65500u16, 63, 64, 163] {
            window.insert(record(seq));
        }

        window.shift();

        assert_eq!(window.base(), SeqNumber::new(64));
        assert_eq!(window.occupied(), 2);
        assert_eq!(window.get(0).unwrap().sequence, SeqNumber::new(64));
        assert_eq!(window.get(99).unwrap().sequence, SeqNumber::new(163));
        assert!(!window.contains(SeqNumber::new(63)));
        assert!(window.get(100).is_none());
        assert!(window.get(199).is_none());
    }
}
