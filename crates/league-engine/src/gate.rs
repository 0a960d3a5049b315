//! The proof gate
//!
//! "No mutation without proof": every individual must survive the gate to
//! be eligible for the next generation. Verification runs the configured
//! threshold laws, the privacy and cost bounds, an optional stability
//! probe, and the implicit tool-budget rule, and records the outcome as a
//! [`ProofRecord`]. Passing agents get the record attached; failing agents
//! are returned unmodified.

use std::collections::HashMap;

use league_core::hilbert::{is_stable, learning_energy};
use league_core::{Agent, CheckResult, Law, ProofRecord};
use rand::Rng;

/// Objective index read by the privacy-loss check.
const PRIVACY_AXIS: usize = 4;
/// Objective index read by the cost check.
const COST_AXIS: usize = 5;

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Threshold laws, checked in configured order.
    pub laws: Vec<Law>,
    /// Upper bound on the privacy-loss objective.
    pub max_privacy_loss: f64,
    /// Upper bound on the cost objective. The implicit tool budget is half
    /// of this bound.
    pub max_cost: f64,
    /// Probe the state for local stability. The probe is randomised and can
    /// reject a stable state; disable for hard determinism.
    pub require_stability: bool,
    pub stability_epsilon: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            laws: Vec::new(),
            max_privacy_loss: 1.0,
            max_cost: 10.0,
            require_stability: true,
            stability_epsilon: 0.1,
        }
    }
}

/// Result of gating a population.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub passed: Vec<Agent>,
    pub failed: Vec<Agent>,
    /// Verification record per agent id, for the whole population.
    pub records: HashMap<String, ProofRecord>,
}

/// The configurable verification pass.
#[derive(Debug, Clone)]
pub struct ProofGate {
    config: GateConfig,
}

impl ProofGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Verify one agent and produce its record.
    ///
    /// Checks appear in canonical order: declared laws, `privacy-loss`,
    /// `cost`, `stability` (only when required), `tool-budget`. The overall
    /// verdict is the conjunction of all checks. NaN objective values fail
    /// their numeric checks naturally.
    pub fn verify<R: Rng>(&self, agent: &Agent, rng: &mut R) -> ProofRecord {
        let mut checks = Vec::new();

        for law in &self.config.laws {
            let value = law.evaluate(agent);
            let passed = law.satisfies(value);
            checks.push(CheckResult {
                name: law.name.clone(),
                passed,
                value,
                threshold: law.threshold,
                message: match (law.threshold, passed) {
                    (None, _) => "no threshold configured".to_string(),
                    (Some(t), true) => format!("{value:.4} satisfies {} bound {t:.4}", law.sense),
                    (Some(t), false) => format!("{value:.4} violates {} bound {t:.4}", law.sense),
                },
            });
        }

        let privacy = objective_at(agent, PRIVACY_AXIS);
        checks.push(bound_check(
            "privacy-loss",
            privacy,
            self.config.max_privacy_loss,
        ));

        let cost = objective_at(agent, COST_AXIS);
        checks.push(bound_check("cost", cost, self.config.max_cost));

        if self.config.require_stability {
            let state = &agent.perception.state;
            let stable = is_stable(state, self.config.stability_epsilon, rng);
            checks.push(CheckResult {
                name: "stability".to_string(),
                passed: stable,
                value: learning_energy(state),
                threshold: None,
                message: if stable {
                    "no lower-energy state found in the probe ball".to_string()
                } else {
                    "probe found a lower-energy perturbation".to_string()
                },
            });
        }

        let tool_cost = agent.total_tool_cost();
        checks.push(bound_check(
            "tool-budget",
            tool_cost,
            self.config.max_cost / 2.0,
        ));

        let verified = checks.iter().all(|c| c.passed);
        let passed_count = checks.iter().filter(|c| c.passed).count();
        let summary = format!(
            "agent {} passed {passed_count}/{} verification checks",
            agent.id,
            checks.len()
        );
        ProofRecord::new(summary, checks, verified)
    }

    /// Gate a whole population.
    ///
    /// Partitions into passed and failed, attaches records to the passing
    /// agents only, and returns every record keyed by agent id.
    pub fn apply<R: Rng>(&self, population: Vec<Agent>, rng: &mut R) -> GateOutcome {
        let mut passed = Vec::new();
        let mut failed = Vec::new();
        let mut records = HashMap::new();

        for mut agent in population {
            let record = self.verify(&agent, rng);
            records.insert(agent.id.clone(), record.clone());
            if record.verified {
                agent.attach_proof(record);
                passed.push(agent);
            } else {
                failed.push(agent);
            }
        }

        GateOutcome {
            passed,
            failed,
            records,
        }
    }
}

fn objective_at(agent: &Agent, index: usize) -> f64 {
    agent.objectives.values.get(index).copied().unwrap_or(0.0)
}

fn bound_check(name: &str, value: f64, bound: f64) -> CheckResult {
    let passed = value <= bound;
    CheckResult {
        name: name.to_string(),
        passed,
        value,
        threshold: Some(bound),
        message: if passed {
            format!("{value:.4} within bound {bound:.4}")
        } else {
            format!("{value:.4} exceeds bound {bound:.4}")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_core::hilbert::Complex;
    use league_core::{AgentKind, ObjectiveSense};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gated_agent(objectives: Vec<f64>) -> Agent {
        let mut agent = Agent::new("agent-gen0-0", AgentKind::Explorer, 1, 6);
        agent
            .update_perception(vec![Complex::new(1.0, 0.0)], "observe")
            .unwrap();
        agent.objectives.record(objectives);
        agent
    }

    #[test]
    fn test_default_gate_passes_reasonable_agent() {
        let gate = ProofGate::new(GateConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let agent = gated_agent(vec![0.5, 50.0, 0.8, 0.9, 0.5, 5.0]);

        let outcome = gate.apply(vec![agent], &mut rng);
        assert_eq!(outcome.passed.len(), 1);
        assert!(outcome.failed.is_empty());

        let survivor = &outcome.passed[0];
        let proof = survivor.proof.as_ref().expect("record attached");
        assert!(proof.verified);
        assert!(proof.digest_matches());
        assert_eq!(outcome.records.len(), 1);
    }

    #[test]
    fn test_gate_rejects_excessive_cost() {
        let gate = ProofGate::new(GateConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let agent = gated_agent(vec![0.5, 50.0, 0.8, 0.9, 0.5, 15.0]);

        let outcome = gate.apply(vec![agent], &mut rng);
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        // Failing agents are not mutated.
        assert!(outcome.failed[0].proof.is_none());

        let record = &outcome.records["agent-gen0-0"];
        assert!(!record.verified);
        let cost = record.checks.iter().find(|c| c.name == "cost").unwrap();
        assert!(!cost.passed);
        assert_eq!(cost.value, 15.0);
        assert_eq!(cost.threshold, Some(10.0));
    }

    #[test]
    fn test_check_order_is_canonical() {
        let mut config = GateConfig::default();
        config.laws = vec![
            Law::new("floor", ObjectiveSense::Maximize, Some(0.1), |a| {
                a.objectives.values[0]
            }),
            Law::new("ceiling", ObjectiveSense::Minimize, Some(100.0), |a| {
                a.objectives.values[1]
            }),
        ];
        let gate = ProofGate::new(config);
        let mut rng = StdRng::seed_from_u64(3);

        let record = gate.verify(&gated_agent(vec![0.5, 50.0, 0.8, 0.9, 0.5, 5.0]), &mut rng);
        let names: Vec<&str> = record.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["floor", "ceiling", "privacy-loss", "cost", "stability", "tool-budget"]
        );
    }

    #[test]
    fn test_stability_check_omitted_when_disabled() {
        let config = GateConfig {
            require_stability: false,
            ..GateConfig::default()
        };
        let gate = ProofGate::new(config);
        let mut rng = StdRng::seed_from_u64(3);

        let record = gate.verify(&gated_agent(vec![0.5, 50.0, 0.8, 0.9, 0.5, 5.0]), &mut rng);
        assert!(record.checks.iter().all(|c| c.name != "stability"));
        assert!(record.verified);
    }

    #[test]
    fn test_nan_objective_fails_numeric_check() {
        let gate = ProofGate::new(GateConfig {
            require_stability: false,
            ..GateConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(3);

        let record = gate.verify(
            &gated_agent(vec![0.5, 50.0, 0.8, 0.9, f64::NAN, 5.0]),
            &mut rng,
        );
        let privacy = record
            .checks
            .iter()
            .find(|c| c.name == "privacy-loss")
            .unwrap();
        assert!(!privacy.passed);
        assert!(!record.verified);
    }

    #[test]
    fn test_tool_budget_is_half_max_cost() {
        let gate = ProofGate::new(GateConfig {
            require_stability: false,
            ..GateConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(3);

        let mut agent = gated_agent(vec![0.5, 50.0, 0.8, 0.9, 0.5, 5.0]);
        agent.add_tool(league_core::ToolSpec::new("heavy", 6.0));

        let record = gate.verify(&agent, &mut rng);
        let budget = record
            .checks
            .iter()
            .find(|c| c.name == "tool-budget")
            .unwrap();
        assert!(!budget.passed);
        assert_eq!(budget.threshold, Some(5.0));
        assert!(!record.verified);
    }

    #[test]
    fn test_unsatisfied_law_rejects() {
        let config = GateConfig {
            laws: vec![Law::new(
                "impossible",
                ObjectiveSense::Maximize,
                Some(2.0),
                |_| 1.0,
            )],
            require_stability: false,
            ..GateConfig::default()
        };
        let gate = ProofGate::new(config);
        let mut rng = StdRng::seed_from_u64(3);

        let outcome = gate.apply(
            vec![gated_agent(vec![0.5, 50.0, 0.8, 0.9, 0.5, 5.0])],
            &mut rng,
        );
        assert!(outcome.passed.is_empty());
        assert_eq!(outcome.failed.len(), 1);
    }
}
