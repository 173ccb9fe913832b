use crate::{BranchRecord, ConditionalBranchPredictor, Direction, PredictorConfig};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulateResultBranchInfo {
    /// branch address
    pub pc: u32,
    /// statistics
    pub execution_count: u64,
    pub taken_count: u64,
    pub mispred_count: u64,
}

impl SimulateResultBranchInfo {
    pub fn taken_rate(&self) -> f64 {
        percentage(self.taken_count, self.execution_count)
    }

    pub fn misprediction_rate(&self) -> f64 {
        percentage(self.mispred_count, self.execution_count)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulateResult {
    /// configuration
    pub trace_path: Option<PathBuf>,
    pub predictor: String,
    pub config: Option<PredictorConfig>,

    /// branches trained before accuracy is counted
    pub warmup: u64,

    /// branch statistics
    pub branch_info: Vec<SimulateResultBranchInfo>,

    /// overall statistics
    /// number of conditional branches counted
    pub total_branches: u64,
    /// number of mispredictions among them
    pub total_mispred_count: u64,
    /// misprediction rate (%)
    pub misprediction_rate: f64,
}

impl SimulateResult {
    /// Branches with the most mispredictions first
    pub fn top_mispredicted(&self, n: usize) -> Vec<&SimulateResultBranchInfo> {
        let mut items: Vec<&SimulateResultBranchInfo> = self.branch_info.iter().collect();
        items.sort_by(|a, b| b.mispred_count.cmp(&a.mispred_count).then(a.pc.cmp(&b.pc)));
        items.truncate(n);
        items
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_branches == 0 {
            0.0
        } else {
            100.0 - self.misprediction_rate
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BranchInfo {
    execution_count: u64,
    taken_count: u64,
    mispred_count: u64,
}

/// Runs records through a predictor and collects accuracy statistics
///
/// Every record is predicted and then trained; the first `warmup` records
/// only train.
#[derive(Debug, Default)]
pub struct Simulator {
    warmup: u64,
    seen: u64,
    total_branches: u64,
    total_mispred_count: u64,
    branch_infos: HashMap<u32, BranchInfo>,
}

impl Simulator {
    pub fn new(warmup: u64) -> Self {
        Self {
            warmup,
            ..Default::default()
        }
    }

    /// Predict, account and train one branch, returning the prediction
    pub fn step<P: ConditionalBranchPredictor + ?Sized>(
        &mut self,
        predictor: &mut P,
        record: &BranchRecord,
    ) -> Direction {
        let outcome = Direction::from(record.taken);
        let predict = predictor.predict(record.pc);

        self.seen += 1;
        if self.seen > self.warmup {
            let mispred = (predict != outcome) as u64;
            let info = self.branch_infos.entry(record.pc).or_default();
            info.execution_count += 1;
            info.taken_count += record.taken as u64;
            info.mispred_count += mispred;
            self.total_branches += 1;
            self.total_mispred_count += mispred;
        }

        predictor.train(record.pc, outcome);
        predict
    }

    pub fn total_branches(&self) -> u64 {
        self.total_branches
    }

    pub fn total_mispred_count(&self) -> u64 {
        self.total_mispred_count
    }

    pub fn finish(
        self,
        predictor: &str,
        config: Option<PredictorConfig>,
        trace_path: Option<PathBuf>,
    ) -> SimulateResult {
        let mut branch_info: Vec<SimulateResultBranchInfo> = self
            .branch_infos
            .into_iter()
            .map(|(pc, info)| SimulateResultBranchInfo {
                pc,
                execution_count: info.execution_count,
                taken_count: info.taken_count,
                mispred_count: info.mispred_count,
            })
            .collect();
        branch_info.sort_by_key(|info| info.pc);

        SimulateResult {
            trace_path,
            predictor: predictor.to_string(),
            config,
            warmup: self.warmup,
            branch_info,
            total_branches: self.total_branches,
            total_mispred_count: self.total_mispred_count,
            misprediction_rate: percentage(self.total_mispred_count, self.total_branches),
        }
    }
}

/// Simulate a whole trace in memory
pub fn simulate<P: ConditionalBranchPredictor + ?Sized>(
    predictor: &mut P,
    records: &[BranchRecord],
    warmup: u64,
) -> SimulateResult {
    let mut simulator = Simulator::new(warmup);
    for record in records {
        simulator.step(predictor, record);
    }
    simulator.finish(predictor.name(), None, None)
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}
