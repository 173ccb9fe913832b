use crate::{
    ConditionalBranchPredictor, ConfigError, Custom, Direction, Gshare, PredictorConfig, Scheme,
    Selected, Tournament,
};
use log::{debug, info};

/// Per-scheme state. Each variant owns only the tables its scheme uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PredictorState {
    /// No scheme configured, always predicts not taken
    #[default]
    Unconfigured,
    Static,
    Gshare(Gshare),
    Tournament(Tournament),
    Custom(Custom),
}

impl PredictorState {
    fn build(config: &PredictorConfig) -> Self {
        match config.scheme {
            Scheme::Static => PredictorState::Static,
            Scheme::Gshare => PredictorState::Gshare(Gshare::new(config.ghistory_bits)),
            Scheme::Tournament => PredictorState::Tournament(Tournament::new(
                config.ghistory_bits,
                config.lhistory_bits,
                config.pc_index_bits,
            )),
            Scheme::Custom => {
                PredictorState::Custom(Custom::new(config.ghistory_bits, config.choice_bits))
            }
        }
    }
}

/// The predictor engine: one configured scheme and all of its tables
///
/// For every branch, call [`ConditionalBranchPredictor::predict`] and then
/// [`ConditionalBranchPredictor::train`] with the resolved outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predictor {
    config: Option<PredictorConfig>,
    state: PredictorState,
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let predictor = Self {
            config: Some(config),
            state: PredictorState::build(&config),
        };
        info!(
            "Created {} predictor ({config}), {} bytes of predictor state",
            predictor.name(),
            predictor.storage_bytes()
        );
        Ok(predictor)
    }

    pub fn config(&self) -> Option<&PredictorConfig> {
        self.config.as_ref()
    }

    pub fn state(&self) -> &PredictorState {
        &self.state
    }

    /// Recreate every table with its initial value
    pub fn reset(&mut self) {
        if let Some(config) = &self.config {
            debug!("Resetting {} predictor ({config})", config.scheme);
            self.state = PredictorState::build(config);
        }
    }

    /// Replace the configuration, rebuilding all state from scratch.
    /// The current state is kept when `config` is rejected.
    pub fn reconfigure(&mut self, config: PredictorConfig) -> Result<(), ConfigError> {
        *self = Predictor::new(config)?;
        Ok(())
    }

    /// Table storage, one byte per counter and four per local history
    pub fn storage_bytes(&self) -> usize {
        match &self.state {
            PredictorState::Unconfigured | PredictorState::Static => 0,
            PredictorState::Gshare(gshare) => gshare.table().len(),
            PredictorState::Tournament(tournament) => {
                tournament.global_table().len()
                    + tournament.local_table().len()
                    + tournament.chooser().len()
                    + tournament.local_history_entries() * std::mem::size_of::<u32>()
            }
            PredictorState::Custom(custom) => {
                custom.table(Selected::First).len()
                    + custom.table(Selected::Second).len()
                    + custom.choice().len()
            }
        }
    }
}

impl ConditionalBranchPredictor for Predictor {
    fn name(&self) -> &'static str {
        match &self.state {
            PredictorState::Unconfigured => "Unconfigured",
            PredictorState::Static => Scheme::Static.name(),
            PredictorState::Gshare(gshare) => gshare.name(),
            PredictorState::Tournament(tournament) => tournament.name(),
            PredictorState::Custom(custom) => custom.name(),
        }
    }

    fn predict(&mut self, pc: u32) -> Direction {
        match &mut self.state {
            PredictorState::Unconfigured => Direction::NotTaken,
            PredictorState::Static => Direction::Taken,
            PredictorState::Gshare(gshare) => gshare.predict(pc),
            PredictorState::Tournament(tournament) => tournament.predict(pc),
            PredictorState::Custom(custom) => custom.predict(pc),
        }
    }

    fn train(&mut self, pc: u32, outcome: Direction) {
        match &mut self.state {
            PredictorState::Unconfigured | PredictorState::Static => {}
            PredictorState::Gshare(gshare) => gshare.train(pc, outcome),
            PredictorState::Tournament(tournament) => tournament.train(pc, outcome),
            PredictorState::Custom(custom) => custom.train(pc, outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Counter;

    fn run(predictor: &mut Predictor, trace: &[(u32, bool)]) -> usize {
        let mut mispred = 0;
        for &(pc, taken) in trace {
            let outcome = Direction::from(taken);
            if predictor.predict(pc) != outcome {
                mispred += 1;
            }
            predictor.train(pc, outcome);
        }
        mispred
    }

    fn sample_trace() -> Vec<(u32, bool)> {
        (0..300u32)
            .map(|i| (0x400 + (i % 5) * 4, i % 3 != 0))
            .collect()
    }

    #[test]
    fn test_static_always_taken() {
        let mut predictor = Predictor::new(PredictorConfig::static_taken()).unwrap();
        assert_eq!(predictor.name(), "Static");
        assert_eq!(predictor.storage_bytes(), 0);
        for (pc, taken) in sample_trace() {
            assert_eq!(predictor.predict(pc), Direction::Taken);
            predictor.train(pc, taken.into());
        }
        assert_eq!(predictor.state(), &PredictorState::Static);
    }

    #[test]
    fn test_unconfigured_predicts_not_taken() {
        let mut predictor = Predictor::default();
        assert_eq!(predictor.name(), "Unconfigured");
        assert_eq!(predictor.config(), None);
        for (pc, taken) in sample_trace() {
            assert_eq!(predictor.predict(pc), Direction::NotTaken);
            predictor.train(pc, taken.into());
        }
        predictor.reset();
        assert_eq!(predictor, Predictor::default());
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            Predictor::new(PredictorConfig::gshare(0)),
            Err(ConfigError::ZeroWidth { .. })
        ));
        assert!(matches!(
            Predictor::new(PredictorConfig::custom(13, 31)),
            Err(ConfigError::TooWide { bits: 31, .. })
        ));
    }

    #[test]
    fn test_dispatch() {
        let gshare = Predictor::new(PredictorConfig::gshare(4)).unwrap();
        assert!(matches!(gshare.state(), PredictorState::Gshare(_)));
        assert_eq!(gshare.name(), "Gshare");
        assert_eq!(gshare.storage_bytes(), 16);

        let tournament = Predictor::new(PredictorConfig::tournament(2, 3, 4)).unwrap();
        assert!(matches!(tournament.state(), PredictorState::Tournament(_)));
        assert_eq!(tournament.storage_bytes(), 4 + 8 + 4 + 16 * 4);

        let custom = Predictor::new(PredictorConfig::custom(3, 2)).unwrap();
        assert!(matches!(custom.state(), PredictorState::Custom(_)));
        assert_eq!(custom.name(), "Custom");
        assert_eq!(custom.storage_bytes(), 8 + 8 + 4);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        for config in [
            PredictorConfig::gshare(6),
            PredictorConfig::tournament(6, 5, 4),
            PredictorConfig::custom(6, 4),
        ] {
            let fresh = Predictor::new(config).unwrap();
            let mut predictor = fresh.clone();
            run(&mut predictor, &sample_trace());
            assert_ne!(predictor, fresh);
            predictor.reset();
            assert_eq!(predictor, fresh);
        }
    }

    #[test]
    fn test_reconfigure() {
        let mut predictor = Predictor::new(PredictorConfig::gshare(6)).unwrap();
        run(&mut predictor, &sample_trace());

        predictor.reconfigure(PredictorConfig::gshare(6)).unwrap();
        assert_eq!(predictor, Predictor::new(PredictorConfig::gshare(6)).unwrap());

        predictor
            .reconfigure(PredictorConfig::tournament(9, 10, 10))
            .unwrap();
        assert_eq!(predictor.name(), "Tournament");

        assert!(predictor.reconfigure(PredictorConfig::gshare(0)).is_err());
        assert_eq!(predictor.name(), "Tournament");
    }

    #[test]
    fn test_engines_are_isolated() {
        let config = PredictorConfig::gshare(4);
        let mut a = Predictor::new(config).unwrap();
        let b = Predictor::new(config).unwrap();
        run(&mut a, &sample_trace());
        assert_eq!(b, Predictor::new(config).unwrap());
    }

    #[test]
    fn test_predict_is_pure_between_trains() {
        for config in [
            PredictorConfig::gshare(5),
            PredictorConfig::tournament(5, 4, 3),
            PredictorConfig::custom(5, 3),
        ] {
            let mut predictor = Predictor::new(config).unwrap();
            run(&mut predictor, &sample_trace()[..50]);
            for pc in [0x0, 0x404, 0xdead_beef] {
                let first = predictor.predict(pc);
                assert_eq!(predictor.predict(pc), first);
            }
        }
    }

    #[test]
    fn test_history_low_bit_is_last_outcome() {
        let mut predictor = Predictor::new(PredictorConfig::gshare(4)).unwrap();
        for (pc, taken) in sample_trace().into_iter().take(20) {
            let before = match predictor.state() {
                PredictorState::Gshare(gshare) => gshare.history().value(),
                _ => unreachable!(),
            };
            predictor.predict(pc);
            predictor.train(pc, taken.into());
            let after = match predictor.state() {
                PredictorState::Gshare(gshare) => gshare.history().value(),
                _ => unreachable!(),
            };
            assert_eq!(after & 1, taken as u32);
            assert_eq!(after >> 1, before & 0b111);
        }
    }

    #[test]
    fn test_dynamic_schemes_beat_static() {
        let trace = sample_trace();
        let mut baseline = Predictor::new(PredictorConfig::static_taken()).unwrap();
        let static_mispred = run(&mut baseline, &trace);
        for config in [
            PredictorConfig::gshare(8),
            PredictorConfig::tournament(8, 6, 6),
            PredictorConfig::custom(8, 6),
        ] {
            let mut predictor = Predictor::new(config).unwrap();
            assert!(run(&mut predictor, &trace) < static_mispred, "{config}");
        }
    }

    #[test]
    fn test_counters_stay_in_range() {
        let mut predictor = Predictor::new(PredictorConfig::tournament(3, 3, 3)).unwrap();
        run(&mut predictor, &sample_trace());
        if let PredictorState::Tournament(tournament) = predictor.state() {
            let max = Counter::MAX;
            assert!(tournament.chooser().iter().all(|c| c.value() <= max));
            assert!(tournament.global_table().iter().all(|c| c.value() <= max));
            assert!(tournament.local_table().iter().all(|c| c.value() <= max));
        } else {
            unreachable!();
        }
    }
}
