//! # League Core
//!
//! Core types for the Meta-League evolution engine: proof-carrying agents
//! whose state lives in a finite-dimensional complex inner-product space.
//!
//! ## Key Types
//!
//! - [`Agent`] — the unit of evolution, with perception / reasoning /
//!   coordination sub-states and append-only audit trails
//! - [`hilbert`] — complex state-vector algebra (norms, consensus
//!   averaging, stability probing)
//! - [`ObjectiveAxis`] / [`ObjectiveSense`] — dominance semantics per
//!   scored axis
//! - [`ProofRecord`] — the verification artifact attached by the proof gate
//!
//! ## Quick Start
//!
//! ```rust
//! use league_core::{Agent, AgentKind, ToolSpec};
//! use league_core::hilbert::{norm, normalize, Complex};
//!
//! let mut agent = Agent::new("agent-gen0-0", AgentKind::Explorer, 2, 6);
//! agent.add_tool(ToolSpec::new("search", 1.0));
//!
//! let state = vec![Complex::new(3.0, 0.0), Complex::new(4.0, 0.0)];
//! assert!((norm(&state) - 5.0).abs() < 1e-9);
//!
//! agent.update_perception(normalize(&state), "observe").unwrap();
//! assert!((norm(&agent.perception.state) - 1.0).abs() < 1e-9);
//! ```

pub mod agent;
pub mod error;
pub mod hilbert;
pub mod objective;
pub mod proof;

pub use agent::{
    Agent, AgentKind, Coordination, Decision, KnowledgeItem, MemoryEntry, Perception, Reasoning,
    ToolSpec,
};
pub use error::CoreError;
pub use hilbert::Complex;
pub use objective::{Law, ObjectiveAxis, ObjectiveSense, ObjectiveVector};
pub use proof::{render_certificate, CheckResult, ProofDigest, ProofRecord};
