mod config;
mod counter;
mod custom;
mod engine;
mod gshare;
mod history;
mod simulate;
mod tournament;
mod trace;
mod utils;

pub use config::*;
pub use counter::*;
pub use custom::*;
pub use engine::*;
pub use gshare::*;
pub use history::*;
pub use simulate::*;
pub use tournament::*;
pub use trace::*;
pub use utils::*;

/// A conditional branch direction predictor
///
/// For every branch:
/// 1. call `predict` to get the predicted direction
/// 2. call `train` with the resolved outcome of the same branch
pub trait ConditionalBranchPredictor {
    fn name(&self) -> &'static str;
    fn predict(&mut self, pc: u32) -> Direction;
    fn train(&mut self, pc: u32, outcome: Direction);
}
