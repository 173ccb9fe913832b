use crate::{ConditionalBranchPredictor, Counter, CounterTable, Direction, HistoryRegister};
use log::trace;

/// Global history xor PC into a single table of 2-bit counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gshare {
    history: HistoryRegister,
    pht: CounterTable,
}

impl Gshare {
    pub fn new(ghistory_bits: u32) -> Self {
        Self {
            history: HistoryRegister::new(ghistory_bits),
            // Initialize to Weakly Not Taken
            pht: CounterTable::new(ghistory_bits, Counter::WN),
        }
    }

    pub fn index(&self, pc: u32) -> u32 {
        (pc ^ self.history.value()) & self.pht.mask()
    }

    pub fn history(&self) -> &HistoryRegister {
        &self.history
    }

    pub fn table(&self) -> &CounterTable {
        &self.pht
    }
}

impl ConditionalBranchPredictor for Gshare {
    fn name(&self) -> &'static str {
        "Gshare"
    }

    fn predict(&mut self, pc: u32) -> Direction {
        self.pht.direction(self.index(pc))
    }

    fn train(&mut self, pc: u32, outcome: Direction) {
        // history is still the value predict() saw
        let idx = self.index(pc);
        self.pht.bump(idx, outcome);
        self.history.push(outcome);
        trace!(
            "gshare pc=0x{pc:08x} idx={idx} outcome={outcome} counter={}",
            self.pht.get(idx).value()
        );
    }
}
