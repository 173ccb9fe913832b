use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a conditional branch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Direction {
    NotTaken,
    Taken,
}

impl Direction {
    pub fn is_taken(self) -> bool {
        self == Direction::Taken
    }

    /// History bit shifted into history registers
    pub fn bit(self) -> u32 {
        self.is_taken() as u32
    }
}

impl From<bool> for Direction {
    fn from(taken: bool) -> Self {
        if taken {
            Direction::Taken
        } else {
            Direction::NotTaken
        }
    }
}

impl From<Direction> for bool {
    fn from(direction: Direction) -> Self {
        direction.is_taken()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::NotTaken => write!(f, "N"),
            Direction::Taken => write!(f, "T"),
        }
    }
}

/// 2-bit saturating counter
///
/// 0 = Strongly Not Taken, 1 = Weakly Not Taken,
/// 2 = Weakly Taken, 3 = Strongly Taken
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Counter(u8);

impl Counter {
    pub const SN: Counter = Counter(0);
    pub const WN: Counter = Counter(1);
    pub const WT: Counter = Counter(2);
    pub const ST: Counter = Counter(3);

    pub const MIN: u8 = 0;
    pub const MAX: u8 = 3;

    /// Values outside of the range are clamped
    pub fn new(value: u8) -> Self {
        Counter(value.min(Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Move one step toward `outcome`, saturating at both ends
    pub fn bump(self, outcome: Direction) -> Self {
        match outcome {
            Direction::Taken if self.0 < Self::MAX => Counter(self.0 + 1),
            Direction::NotTaken if self.0 > Self::MIN => Counter(self.0 - 1),
            _ => self,
        }
    }

    pub fn increment(self) -> Self {
        self.bump(Direction::Taken)
    }

    pub fn decrement(self) -> Self {
        self.bump(Direction::NotTaken)
    }

    /// Upper half of the range predicts taken
    pub fn direction(self) -> Direction {
        if self.0 >= Self::WT.0 {
            Direction::Taken
        } else {
            Direction::NotTaken
        }
    }

    /// For meta tables: whether the counter sits in the lower half
    pub fn is_low(self) -> bool {
        self.direction() == Direction::NotTaken
    }
}

/// A fixed-size table of counters, addressed with masked indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterTable {
    entries: Vec<Counter>,
    mask: u32,
}

impl CounterTable {
    /// `2^bits` entries, all set to `init`
    pub fn new(bits: u32, init: Counter) -> Self {
        let size = 1usize << bits;
        Self {
            entries: vec![init; size],
            mask: (size - 1) as u32,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn get(&self, index: u32) -> Counter {
        self.entries[(index & self.mask) as usize]
    }

    pub fn direction(&self, index: u32) -> Direction {
        self.get(index).direction()
    }

    pub fn bump(&mut self, index: u32, outcome: Direction) {
        let entry = &mut self.entries[(index & self.mask) as usize];
        *entry = entry.bump(outcome);
    }

    /// Meta tables move by correctness rather than by outcome
    pub fn increment(&mut self, index: u32) {
        self.bump(index, Direction::Taken);
    }

    pub fn decrement(&mut self, index: u32) {
        self.bump(index, Direction::NotTaken);
    }

    pub fn set(&mut self, index: u32, value: Counter) {
        self.entries[(index & self.mask) as usize] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = Counter> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturation_bounds() {
        let mut counter = Counter::SN;
        for _ in 0..10 {
            counter = counter.bump(Direction::Taken);
            assert!(counter.value() <= Counter::MAX);
        }
        assert_eq!(counter, Counter::ST);

        for _ in 0..10 {
            counter = counter.bump(Direction::NotTaken);
        }
        assert_eq!(counter, Counter::SN);
    }

    #[test]
    fn test_single_steps() {
        assert_eq!(Counter::WN.bump(Direction::Taken), Counter::WT);
        assert_eq!(Counter::WT.bump(Direction::NotTaken), Counter::WN);
        assert_eq!(Counter::ST.bump(Direction::Taken), Counter::ST);
        assert_eq!(Counter::SN.bump(Direction::NotTaken), Counter::SN);
        assert_eq!(Counter::new(200), Counter::ST);
    }

    #[test]
    fn test_direction() {
        assert_eq!(Counter::SN.direction(), Direction::NotTaken);
        assert_eq!(Counter::WN.direction(), Direction::NotTaken);
        assert_eq!(Counter::WT.direction(), Direction::Taken);
        assert_eq!(Counter::ST.direction(), Direction::Taken);
        assert!(Counter::WN.is_low());
        assert!(!Counter::WT.is_low());
    }

    #[test]
    fn test_table_masks_index() {
        let mut table = CounterTable::new(2, Counter::WN);
        assert_eq!(table.len(), 4);
        assert_eq!(table.mask(), 0b11);

        // 0b101 & 0b11 = 1
        table.bump(0b101, Direction::Taken);
        assert_eq!(table.get(1), Counter::WT);
        assert_eq!(table.direction(1), Direction::Taken);
        assert_eq!(table.iter().filter(|c| *c == Counter::WN).count(), 3);
    }
}
