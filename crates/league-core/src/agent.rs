//! The agent data model
//!
//! An [`Agent`] is the unit of evolution: a complex perception state, a
//! symbolic reasoning store, a coordination surface (tools, memory,
//! decisions, partners), a scored objective vector, and two append-only
//! audit trails (lineage and perception provenance).
//!
//! Agents are mutated only through the operations on this type; the engine
//! destroys an agent simply by not selecting it into the next generation.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::hilbert::{zero_state, Complex};
use crate::objective::ObjectiveVector;
use crate::proof::ProofRecord;

/// The closed set of agent roles in the league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Explorer,
    Optimizer,
    Coordinator,
    Verifier,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explorer => write!(f, "explorer"),
            Self::Optimizer => write!(f, "optimizer"),
            Self::Coordinator => write!(f, "coordinator"),
            Self::Verifier => write!(f, "verifier"),
        }
    }
}

/// Perception sub-state: the complex state vector plus its audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perception {
    pub state: Vec<Complex>,
    /// Scalar uncertainty in [0, 1]; doubles as the privacy-loss objective.
    pub uncertainty: f64,
    /// Append-only trail of short operation tags.
    pub provenance: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// A symbolic reasoning item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeItem {
    Fact { content: String },
    Rule { condition: String, action: String },
    Plan { goal: String, steps: Vec<String> },
}

/// Reasoning sub-state: ordered knowledge plus active goals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reasoning {
    pub knowledge: Vec<KnowledgeItem>,
    pub goals: Vec<String>,
}

/// A tool an agent can invoke, with a non-negative cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub cost: f64,
    pub precondition: Option<String>,
    pub postcondition: Option<String>,
}

impl ToolSpec {
    /// Create a tool; negative costs are clamped to zero.
    pub fn new(name: &str, cost: f64) -> Self {
        Self {
            name: name.to_string(),
            cost: cost.max(0.0),
            precondition: None,
            postcondition: None,
        }
    }

    pub fn with_conditions(mut self, precondition: &str, postcondition: &str) -> Self {
        self.precondition = Some(precondition.to_string());
        self.postcondition = Some(postcondition.to_string());
        self
    }
}

/// A keyed memory entry with an optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    pub fn new(key: &str, value: serde_json::Value) -> Self {
        Self {
            key: key.to_string(),
            value,
            stored_at: Utc::now(),
            expires_at: None,
        }
    }

    pub fn with_ttl(key: &str, value: serde_json::Value, ttl: Duration) -> Self {
        let mut entry = Self::new(key, value);
        entry.expires_at = Some(Utc::now() + ttl);
        entry
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |exp| Utc::now() > exp)
    }
}

/// One recorded decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action: String,
    pub rationale: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Coordination sub-state: tools, memory, decision history, partners.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coordination {
    pub tools: Vec<ToolSpec>,
    pub memory: Vec<MemoryEntry>,
    /// Append-only decision history.
    pub decisions: Vec<Decision>,
    pub partners: Vec<String>,
}

/// The unit of evolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Stable engine-assigned id, e.g. `agent-gen2-3`.
    pub id: String,
    pub kind: AgentKind,
    pub generation: u32,
    pub perception: Perception,
    pub reasoning: Reasoning,
    pub coordination: Coordination,
    pub objectives: ObjectiveVector,
    /// Verification record attached by the proof gate, if any.
    pub proof: Option<ProofRecord>,
    /// Append-only trail of reproductive events.
    pub lineage: Vec<String>,
    /// Opaque caller payload; the engine never interprets it.
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Create a genesis agent: zero state, empty stores, zeroed objectives.
    pub fn new(id: &str, kind: AgentKind, state_dimension: usize, axis_count: usize) -> Self {
        Self {
            id: id.to_string(),
            kind,
            generation: 0,
            perception: Perception {
                state: zero_state(state_dimension),
                uncertainty: 0.5,
                provenance: Vec::new(),
                updated_at: Utc::now(),
            },
            reasoning: Reasoning::default(),
            coordination: Coordination::default(),
            objectives: ObjectiveVector::zeroed(axis_count),
            proof: None,
            lineage: vec!["genesis".to_string()],
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Replace the perception state with one of the same dimension and
    /// append a provenance tag.
    pub fn update_perception(&mut self, state: Vec<Complex>, tag: &str) -> Result<(), CoreError> {
        if state.len() != self.perception.state.len() {
            return Err(CoreError::DimensionMismatch {
                left: self.perception.state.len(),
                right: state.len(),
            });
        }
        self.perception.state = state;
        self.perception.provenance.push(tag.to_string());
        self.perception.updated_at = Utc::now();
        Ok(())
    }

    /// Set the uncertainty, clamped into [0, 1].
    pub fn set_uncertainty(&mut self, uncertainty: f64) {
        self.perception.uncertainty = uncertainty.clamp(0.0, 1.0);
    }

    pub fn add_knowledge(&mut self, item: KnowledgeItem) {
        self.reasoning.knowledge.push(item);
    }

    pub fn add_goal(&mut self, goal: &str) {
        self.reasoning.goals.push(goal.to_string());
    }

    pub fn add_tool(&mut self, tool: ToolSpec) {
        self.coordination.tools.push(tool);
    }

    /// Store a memory entry, optionally with a TTL.
    pub fn remember(&mut self, key: &str, value: serde_json::Value, ttl: Option<Duration>) {
        let entry = match ttl {
            Some(ttl) => MemoryEntry::with_ttl(key, value, ttl),
            None => MemoryEntry::new(key, value),
        };
        self.coordination.memory.push(entry);
    }

    /// Drop expired memory entries; returns how many were removed.
    pub fn prune_expired_memory(&mut self) -> usize {
        let before = self.coordination.memory.len();
        self.coordination.memory.retain(|entry| !entry.is_expired());
        before - self.coordination.memory.len()
    }

    pub fn record_decision(&mut self, action: &str, rationale: Option<&str>) {
        self.coordination.decisions.push(Decision {
            action: action.to_string(),
            rationale: rationale.map(str::to_string),
            decided_at: Utc::now(),
        });
    }

    pub fn add_partner(&mut self, partner_id: &str) {
        self.coordination.partners.push(partner_id.to_string());
    }

    /// Sum of all tool costs. Never negative.
    pub fn total_tool_cost(&self) -> f64 {
        self.coordination.tools.iter().map(|t| t.cost).sum()
    }

    /// Attach the verification record produced by the proof gate.
    pub fn attach_proof(&mut self, record: ProofRecord) {
        self.proof = Some(record);
    }

    pub fn push_lineage(&mut self, tag: String) {
        self.lineage.push(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_genesis_defaults() {
        let agent = Agent::new("agent-gen0-0", AgentKind::Explorer, 4, 6);

        assert_eq!(agent.generation, 0);
        assert_eq!(agent.perception.state, zero_state(4));
        assert_eq!(agent.perception.uncertainty, 0.5);
        assert_eq!(agent.objectives.values, vec![0.0; 6]);
        assert_eq!(agent.lineage, vec!["genesis".to_string()]);
        assert!(agent.proof.is_none());
        assert!(agent.reasoning.knowledge.is_empty());
        assert!(agent.coordination.tools.is_empty());
    }

    #[test]
    fn test_update_perception_checks_dimension() {
        let mut agent = Agent::new("a", AgentKind::Optimizer, 2, 6);

        let ok = agent.update_perception(vec![Complex::new(1.0, 0.0); 2], "observe");
        assert!(ok.is_ok());
        assert_eq!(agent.perception.provenance, vec!["observe".to_string()]);

        let err = agent.update_perception(vec![Complex::zero(); 3], "bad");
        assert_eq!(err, Err(CoreError::DimensionMismatch { left: 2, right: 3 }));
        // Failed update leaves the trail untouched.
        assert_eq!(agent.perception.provenance.len(), 1);
    }

    #[test]
    fn test_tool_cost_clamped_and_summed() {
        let mut agent = Agent::new("a", AgentKind::Coordinator, 1, 6);
        agent.add_tool(ToolSpec::new("search", 1.5));
        agent.add_tool(ToolSpec::new("broken", -3.0));
        agent.add_tool(
            ToolSpec::new("plan", 0.5).with_conditions("has goal", "plan recorded"),
        );

        assert_eq!(agent.coordination.tools[1].cost, 0.0);
        assert!((agent.total_tool_cost() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_memory_ttl() {
        let mut agent = Agent::new("a", AgentKind::Verifier, 1, 6);
        agent.remember("fresh", json!({"v": 1}), Some(Duration::hours(1)));
        agent.remember("stale", json!(2), Some(Duration::seconds(-1)));
        agent.remember("forever", json!("x"), None);

        assert_eq!(agent.coordination.memory.len(), 3);
        let removed = agent.prune_expired_memory();
        assert_eq!(removed, 1);
        assert!(agent
            .coordination
            .memory
            .iter()
            .all(|entry| entry.key != "stale"));
    }

    #[test]
    fn test_trails_are_append_only_under_ops() {
        let mut agent = Agent::new("a", AgentKind::Explorer, 1, 6);

        agent.record_decision("explore", Some("uncharted region"));
        agent.record_decision("retreat", None);
        assert_eq!(agent.coordination.decisions.len(), 2);
        assert_eq!(agent.coordination.decisions[0].action, "explore");

        agent.push_lineage("clone-from:agent-gen0-1".to_string());
        assert_eq!(agent.lineage.len(), 2);
        assert_eq!(agent.lineage[0], "genesis");
    }

    #[test]
    fn test_uncertainty_clamped() {
        let mut agent = Agent::new("a", AgentKind::Explorer, 1, 6);
        agent.set_uncertainty(1.7);
        assert_eq!(agent.perception.uncertainty, 1.0);
        agent.set_uncertainty(-0.2);
        assert_eq!(agent.perception.uncertainty, 0.0);
    }

    #[test]
    fn test_agent_round_trips_through_json() {
        let mut agent = Agent::new("agent-gen0-2", AgentKind::Optimizer, 2, 6);
        agent.add_knowledge(KnowledgeItem::Rule {
            condition: "cost rising".to_string(),
            action: "drop slowest tool".to_string(),
        });
        agent.add_goal("reach unit norm");

        let json = serde_json::to_string(&agent).unwrap();
        let back: Agent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, agent.id);
        assert_eq!(back.reasoning.knowledge, agent.reasoning.knowledge);
        assert_eq!(back.perception.state.len(), 2);
    }
}
