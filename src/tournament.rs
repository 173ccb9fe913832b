use crate::{
    ConditionalBranchPredictor, Counter, CounterTable, Direction, HistoryRegister, mask, shift_in,
};
use log::{trace, warn};

/// Sub-predictions captured by `predict` and consumed by `train`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentPrediction {
    pub pc: u32,
    pub global: Direction,
    pub local: Direction,
}

/// Tournament predictor
///
/// - global: a pattern table indexed by global history
/// - local: a per-branch history table indexed by the low PC bits, whose
///   entries index a second pattern table
/// - chooser: indexed by global history, the lower half selects local
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tournament {
    history: HistoryRegister,
    global_pht: CounterTable,

    local_history_table: Vec<u32>,
    local_history_bits: u32,
    pc_mask: u32,
    local_pht: CounterTable,

    chooser: CounterTable,

    last: Option<TournamentPrediction>,
}

impl Tournament {
    pub fn new(ghistory_bits: u32, lhistory_bits: u32, pc_index_bits: u32) -> Self {
        Self {
            history: HistoryRegister::new(ghistory_bits),
            global_pht: CounterTable::new(ghistory_bits, Counter::WN),

            // local histories start empty
            local_history_table: vec![0; 1 << pc_index_bits],
            local_history_bits: lhistory_bits,
            pc_mask: mask(pc_index_bits),
            local_pht: CounterTable::new(lhistory_bits, Counter::WN),

            // choose global when starting
            chooser: CounterTable::new(ghistory_bits, Counter::ST),

            last: None,
        }
    }

    pub fn global_index(&self) -> u32 {
        self.history.value() & self.global_pht.mask()
    }

    pub fn local_index(&self, pc: u32) -> u32 {
        pc & self.pc_mask
    }

    /// Stored local history of the branch at `pc`
    pub fn local_history(&self, pc: u32) -> u32 {
        self.local_history_table[self.local_index(pc) as usize]
    }

    pub fn local_history_entries(&self) -> usize {
        self.local_history_table.len()
    }

    /// Both sub-predictions for `pc` against the current state
    pub fn lookup(&self, pc: u32) -> TournamentPrediction {
        TournamentPrediction {
            pc,
            global: self.global_pht.direction(self.global_index()),
            local: self.local_pht.direction(self.local_history(pc)),
        }
    }

    pub fn history(&self) -> &HistoryRegister {
        &self.history
    }

    pub fn global_table(&self) -> &CounterTable {
        &self.global_pht
    }

    pub fn local_table(&self) -> &CounterTable {
        &self.local_pht
    }

    pub fn chooser(&self) -> &CounterTable {
        &self.chooser
    }

    pub fn last_prediction(&self) -> Option<&TournamentPrediction> {
        self.last.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn chooser_mut(&mut self) -> &mut CounterTable {
        &mut self.chooser
    }

    #[cfg(test)]
    pub(crate) fn local_table_mut(&mut self) -> &mut CounterTable {
        &mut self.local_pht
    }

    #[cfg(test)]
    pub(crate) fn global_table_mut(&mut self) -> &mut CounterTable {
        &mut self.global_pht
    }
}

impl ConditionalBranchPredictor for Tournament {
    fn name(&self) -> &'static str {
        "Tournament"
    }

    fn predict(&mut self, pc: u32) -> Direction {
        let prediction = self.lookup(pc);
        self.last = Some(prediction);

        if self.chooser.get(self.global_index()).is_low() {
            prediction.local
        } else {
            prediction.global
        }
    }

    fn train(&mut self, pc: u32, outcome: Direction) {
        let prediction = match self.last.take() {
            Some(prediction) if prediction.pc == pc => prediction,
            _ => {
                warn!("tournament: train(0x{pc:08x}) without a matching predict, recomputing");
                self.lookup(pc)
            }
        };

        // global
        let g_idx = self.global_index();
        self.global_pht.bump(g_idx, outcome);

        // local
        let pc_idx = self.local_index(pc) as usize;
        let pattern = self.local_history_table[pc_idx];
        self.local_pht.bump(pattern, outcome);
        self.local_history_table[pc_idx] = shift_in(pattern, outcome, self.local_history_bits);

        // chooser, +1 toward global and -1 toward local
        let global_correct = prediction.global == outcome;
        let local_correct = prediction.local == outcome;
        if global_correct && !local_correct {
            self.chooser.increment(g_idx);
        } else if local_correct && !global_correct {
            self.chooser.decrement(g_idx);
        }

        self.history.push(outcome);
        trace!(
            "tournament pc=0x{pc:08x} g_idx={g_idx} global={} local={} outcome={outcome} chooser={}",
            prediction.global,
            prediction.local,
            self.chooser.get(g_idx).value()
        );
    }
}
