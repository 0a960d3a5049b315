//! # League Engine
//!
//! A multi-objective evolutionary engine for proof-carrying agents.
//!
//! Each generation is evaluated by a caller-supplied [`Evaluator`], pushed
//! through a configurable [`ProofGate`] ("no mutation without proof"),
//! ranked by NSGA-II non-dominated sorting, and reproduced via consensus
//! crossover and bounded mutation. The engine is a pure library: no files,
//! no sockets, no environment access.
//!
//! ## Quick Start
//!
//! ```rust
//! use league_engine::{CancelFlag, EvolutionConfig, EvolutionEngine, ReferenceEvaluator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut config = EvolutionConfig::default();
//! config.population_size = 5;
//! config.generations = 2;
//! config.seed = Some(7);
//! config.gate.require_stability = false;
//!
//! let mut engine = EvolutionEngine::new(config).unwrap();
//! let result = engine
//!     .run(&ReferenceEvaluator, &CancelFlag::new())
//!     .await
//!     .unwrap();
//!
//! assert_eq!(result.snapshots.len(), 2);
//! assert!(result.final_population.iter().all(|a| a.proof.is_some()));
//! # }
//! ```

pub mod error;
pub mod evaluator;
pub mod evolution;
pub mod gate;
pub mod nsga2;

pub use error::EngineError;
pub use evaluator::{Evaluator, EvaluatorError, ReferenceEvaluator};
pub use evolution::{
    default_objectives, CancelFlag, EvolutionConfig, EvolutionEngine, GenerationSnapshot,
    RunResult,
};
pub use gate::{GateConfig, GateOutcome, ProofGate};
pub use nsga2::{
    crowding_distance, dominates, fast_non_dominated_sort, select_survivors, tournament_select,
    RankedGenome,
};
