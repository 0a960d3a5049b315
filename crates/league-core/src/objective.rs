//! Objective algebra
//!
//! Declares the dominance semantics of each scored axis (maximise or
//! minimise), the scalar comparators the selector is built on, and the
//! threshold laws evaluated by the proof gate.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;

/// Direction of a scored axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    Maximize,
    Minimize,
}

impl ObjectiveSense {
    /// `a` is at least as good as `b`. Equal values are not worse.
    pub fn no_worse(&self, a: f64, b: f64) -> bool {
        match self {
            Self::Maximize => a >= b,
            Self::Minimize => a <= b,
        }
    }

    /// `a` beats `b` outright. Equal values are never strictly better.
    pub fn strictly_better(&self, a: f64, b: f64) -> bool {
        match self {
            Self::Maximize => a > b,
            Self::Minimize => a < b,
        }
    }
}

impl fmt::Display for ObjectiveSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maximize => write!(f, "max"),
            Self::Minimize => write!(f, "min"),
        }
    }
}

/// One scored dimension of the objective space.
///
/// The optional weight is reserved for caller-side scalarisation and
/// tie-breaking; the engine itself never reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveAxis {
    pub name: String,
    pub sense: ObjectiveSense,
    pub weight: Option<f64>,
}

impl ObjectiveAxis {
    pub fn maximize(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sense: ObjectiveSense::Maximize,
            weight: None,
        }
    }

    pub fn minimize(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sense: ObjectiveSense::Minimize,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// A scored objective vector and the instant it was produced.
///
/// The i-th value is interpreted under the i-th configured axis. The length
/// equals the configured axis count for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveVector {
    pub values: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ObjectiveVector {
    pub fn zeroed(axis_count: usize) -> Self {
        Self {
            values: vec![0.0; axis_count],
            timestamp: Utc::now(),
        }
    }

    /// Overwrite the scores and refresh the timestamp.
    pub fn record(&mut self, values: Vec<f64>) {
        self.values = values;
        self.timestamp = Utc::now();
    }
}

/// A threshold law the proof gate evaluates against each agent.
///
/// A `max` law is satisfied when the evaluated value is at least the
/// threshold; a `min` law when it is at most the threshold. A law without a
/// threshold is unconditionally satisfied.
#[derive(Clone)]
pub struct Law {
    pub name: String,
    pub sense: ObjectiveSense,
    pub threshold: Option<f64>,
    evaluator: Arc<dyn Fn(&Agent) -> f64 + Send + Sync>,
}

impl Law {
    pub fn new<F>(name: &str, sense: ObjectiveSense, threshold: Option<f64>, evaluator: F) -> Self
    where
        F: Fn(&Agent) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            sense,
            threshold,
            evaluator: Arc::new(evaluator),
        }
    }

    pub fn evaluate(&self, agent: &Agent) -> f64 {
        (self.evaluator)(agent)
    }

    pub fn satisfies(&self, value: f64) -> bool {
        match self.threshold {
            None => true,
            Some(threshold) => self.sense.no_worse(value, threshold),
        }
    }
}

impl fmt::Debug for Law {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Law")
            .field("name", &self.name)
            .field("sense", &self.sense)
            .field("threshold", &self.threshold)
            .finish()
    }
}
