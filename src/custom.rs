use crate::{ConditionalBranchPredictor, Counter, CounterTable, Direction, HistoryRegister, mask};
use log::{trace, warn};
use serde::{Deserialize, Serialize};

/// Which of the two direction tables a prediction came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum Selected {
    First,
    Second,
}

impl Selected {
    pub fn other(self) -> Self {
        match self {
            Selected::First => Selected::Second,
            Selected::Second => Selected::First,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomPrediction {
    pub pc: u32,
    pub first: Direction,
    pub second: Direction,
    pub selected: Selected,
}

impl CustomPrediction {
    pub fn of(&self, table: Selected) -> Direction {
        match table {
            Selected::First => self.first,
            Selected::Second => self.second,
        }
    }

    pub fn direction(&self) -> Direction {
        self.of(self.selected)
    }
}

/// Two gshare-indexed direction tables and a PC-indexed choice table
///
/// Only the selected table is trained. The choice entry moves only when the
/// two tables disagree on correctness: toward `First` by decrementing,
/// toward `Second` by incrementing. Agreement leaves it unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Custom {
    history: HistoryRegister,
    first: CounterTable,
    second: CounterTable,
    choice: CounterTable,
    choice_mask: u32,
    last: Option<CustomPrediction>,
}

impl Custom {
    pub fn new(ghistory_bits: u32, choice_bits: u32) -> Self {
        Self {
            history: HistoryRegister::new(ghistory_bits),
            // opposite biases so the two tables start out distinct
            first: CounterTable::new(ghistory_bits, Counter::WN),
            second: CounterTable::new(ghistory_bits, Counter::WT),
            // weakly prefer the first table
            choice: CounterTable::new(choice_bits, Counter::WN),
            choice_mask: mask(choice_bits),
            last: None,
        }
    }

    pub fn direction_index(&self, pc: u32) -> u32 {
        (pc ^ self.history.value()) & self.first.mask()
    }

    pub fn choice_index(&self, pc: u32) -> u32 {
        pc & self.choice_mask
    }

    pub fn lookup(&self, pc: u32) -> CustomPrediction {
        let idx = self.direction_index(pc);
        let selected = if self.choice.get(self.choice_index(pc)).is_low() {
            Selected::First
        } else {
            Selected::Second
        };
        CustomPrediction {
            pc,
            first: self.first.direction(idx),
            second: self.second.direction(idx),
            selected,
        }
    }

    pub fn history(&self) -> &HistoryRegister {
        &self.history
    }

    pub fn table(&self, table: Selected) -> &CounterTable {
        match table {
            Selected::First => &self.first,
            Selected::Second => &self.second,
        }
    }

    pub fn choice(&self) -> &CounterTable {
        &self.choice
    }

    pub fn last_prediction(&self) -> Option<&CustomPrediction> {
        self.last.as_ref()
    }

    fn table_mut(&mut self, table: Selected) -> &mut CounterTable {
        match table {
            Selected::First => &mut self.first,
            Selected::Second => &mut self.second,
        }
    }

    #[cfg(test)]
    pub(crate) fn tables_mut(
        &mut self,
    ) -> (&mut CounterTable, &mut CounterTable, &mut CounterTable) {
        (&mut self.first, &mut self.second, &mut self.choice)
    }
}

impl ConditionalBranchPredictor for Custom {
    fn name(&self) -> &'static str {
        "Custom"
    }

    fn predict(&mut self, pc: u32) -> Direction {
        let prediction = self.lookup(pc);
        self.last = Some(prediction);
        prediction.direction()
    }

    fn train(&mut self, pc: u32, outcome: Direction) {
        let prediction = match self.last.take() {
            Some(prediction) if prediction.pc == pc => prediction,
            _ => {
                warn!("custom: train(0x{pc:08x}) without a matching predict, recomputing");
                self.lookup(pc)
            }
        };

        let idx = self.direction_index(pc);
        let selected = prediction.selected;
        self.table_mut(selected).bump(idx, outcome);

        let selected_correct = prediction.of(selected) == outcome;
        let other_correct = prediction.of(selected.other()) == outcome;
        if selected_correct != other_correct {
            let winner = if selected_correct {
                selected
            } else {
                selected.other()
            };
            let c_idx = self.choice_index(pc);
            match winner {
                Selected::First => self.choice.decrement(c_idx),
                Selected::Second => self.choice.increment(c_idx),
            }
        }

        self.history.push(outcome);
        trace!(
            "custom pc=0x{pc:08x} idx={idx} selected={selected:?} outcome={outcome} choice={}",
            self.choice.get(self.choice_index(pc)).value()
        );
    }
}
