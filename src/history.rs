use crate::Direction;

/// Shift register of recent outcomes, most recent at bit 0
///
/// The value is masked to `width` bits after every shift, so it never
/// depends on the native integer width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryRegister {
    bits: u32,
    width: u32,
}

impl HistoryRegister {
    pub fn new(width: u32) -> Self {
        Self { bits: 0, width }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn mask(&self) -> u32 {
        mask(self.width)
    }

    pub fn value(&self) -> u32 {
        self.bits
    }

    pub fn push(&mut self, outcome: Direction) {
        self.bits = shift_in(self.bits, outcome, self.width);
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }
}

/// Low `bits` bits set
pub fn mask(bits: u32) -> u32 {
    if bits >= u32::BITS {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

/// `(history << 1) | outcome`, masked to `width` bits
pub fn shift_in(history: u32, outcome: Direction, width: u32) -> u32 {
    ((history << 1) | outcome.bit()) & mask(width)
}
