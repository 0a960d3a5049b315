//! Fitness evaluation
//!
//! The engine never scores agents itself; it is parameterised by an
//! [`Evaluator`] that writes each agent's objective vector in place. The
//! driver fans evaluation out across the population and joins before the
//! gate runs, so implementations must tolerate concurrent invocation on
//! distinct agents.

use async_trait::async_trait;
use league_core::hilbert::norm;
use league_core::Agent;
use thiserror::Error;

/// Evaluation failure modes.
///
/// `Cancelled` is cooperative: the driver treats it like a generation in
/// which nobody passed the gate and halts gracefully. `Failed` aborts the
/// run with no retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluatorError {
    #[error("evaluation cancelled")]
    Cancelled,
    #[error("evaluation failed: {0}")]
    Failed(String),
}

/// Scores one agent by writing `agent.objectives` in place.
///
/// Implementations must write exactly as many values as the run has
/// configured axes and refresh the objective timestamp.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, agent: &mut Agent) -> Result<(), EvaluatorError>;
}

/// The built-in evaluator over the six default axes.
///
/// Derives all scores from the agent's own state and bookkeeping, so runs
/// need no external model. Note the gain term rewards deviation from unit
/// norm (`|1 - s|`); this mirrors the engine's historical scoring and is
/// kept as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceEvaluator;

#[async_trait]
impl Evaluator for ReferenceEvaluator {
    async fn evaluate(&self, agent: &mut Agent) -> Result<(), EvaluatorError> {
        let s = norm(&agent.perception.state);
        let c = agent.total_tool_cost();
        let k = agent.reasoning.knowledge.len() as f64;
        let decisions = agent.coordination.decisions.len() as f64;

        let gain = (0.2 + 0.1 * k + 0.2 * (1.0 - s).abs()).min(1.0);
        let latency = 50.0 + 10.0 * k + 5.0 * c;
        let engagement = (0.1 * decisions).min(1.0);
        let fairness = if c > 0.0 {
            (1.0 / (1.0 + (c - 1.0).abs())).min(1.0)
        } else {
            0.5
        };
        let privacy_loss = agent.perception.uncertainty;
        let cost = c + 0.1 * k;

        agent
            .objectives
            .record(vec![gain, latency, engagement, fairness, privacy_loss, cost]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_core::{AgentKind, KnowledgeItem, ToolSpec};

    #[tokio::test]
    async fn test_reference_scores_from_bookkeeping() {
        let mut agent = Agent::new("agent-gen0-0", AgentKind::Optimizer, 2, 6);
        agent.add_knowledge(KnowledgeItem::Fact {
            content: "alpha".to_string(),
        });
        agent.add_knowledge(KnowledgeItem::Fact {
            content: "beta".to_string(),
        });
        agent.add_tool(ToolSpec::new("search", 1.5));
        agent.record_decision("probe", None);
        agent.record_decision("commit", None);
        agent.record_decision("report", None);
        agent.set_uncertainty(0.25);

        ReferenceEvaluator.evaluate(&mut agent).await.unwrap();

        let values = &agent.objectives.values;
        assert_eq!(values.len(), 6);
        // Zero state: s = 0, so the gain term includes the full 0.2 bonus.
        assert!((values[0] - 0.6).abs() < 1e-12);
        assert!((values[1] - 77.5).abs() < 1e-12);
        assert!((values[2] - 0.3).abs() < 1e-12);
        assert!((values[3] - (1.0 / 1.5)).abs() < 1e-12);
        assert!((values[4] - 0.25).abs() < 1e-12);
        assert!((values[5] - 1.7).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_reference_fairness_without_tools() {
        let mut agent = Agent::new("agent-gen0-1", AgentKind::Explorer, 1, 6);
        ReferenceEvaluator.evaluate(&mut agent).await.unwrap();
        assert_eq!(agent.objectives.values[3], 0.5);
        assert_eq!(agent.objectives.values[5], 0.0);
    }
}
