//! The generational driver
//!
//! Sequences each generation as evaluate → gate → rank → snapshot →
//! reproduce, with deterministic bookkeeping throughout. Evaluation fans
//! out concurrently and joins before the gate runs; every other step is
//! sequential. All randomness flows through one seedable generator, so a
//! seeded run is reproducible end to end (stability probing aside, which
//! shares the same generator).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use league_core::hilbert::{normalize, perturb, spectral_sync};
use league_core::{Agent, AgentKind, KnowledgeItem, ObjectiveAxis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::evaluator::{Evaluator, EvaluatorError};
use crate::gate::{GateConfig, GateOutcome, ProofGate};
use crate::nsga2::{
    crowding_distance, fast_non_dominated_sort, select_survivors, tournament_select, RankedGenome,
};

/// Half-width of the uniform state perturbation applied by mutation.
const MUTATION_NOISE: f64 = 0.1;
/// Probability that mutation drops the last knowledge item.
const KNOWLEDGE_DROP_RATE: f64 = 0.3;
/// Probability that mutation appends a generation-tagged fact.
const KNOWLEDGE_APPEND_RATE: f64 = 0.3;

const KINDS: [AgentKind; 4] = [
    AgentKind::Explorer,
    AgentKind::Optimizer,
    AgentKind::Coordinator,
    AgentKind::Verifier,
];

/// The six built-in objective axes scored by the reference evaluator.
pub fn default_objectives() -> Vec<ObjectiveAxis> {
    vec![
        ObjectiveAxis::maximize("gain"),
        ObjectiveAxis::minimize("latency"),
        ObjectiveAxis::maximize("engagement"),
        ObjectiveAxis::maximize("fairness"),
        ObjectiveAxis::minimize("privacy-loss"),
        ObjectiveAxis::minimize("cost"),
    ]
}

/// Run configuration.
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub generations: usize,
    pub state_dimension: usize,
    /// Ordered axis list; its length fixes the objective-vector length.
    pub objectives: Vec<ObjectiveAxis>,
    pub gate: GateConfig,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    /// Seed for the engine's generator. Unseeded runs are not reproducible.
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 10,
            generations: 5,
            state_dimension: 4,
            objectives: default_objectives(),
            gate: GateConfig::default(),
            crossover_rate: 0.7,
            mutation_rate: 0.3,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.population_size < 3 {
            return Err(EngineError::InvalidConfig(format!(
                "population_size must be at least 3, got {}",
                self.population_size
            )));
        }
        if self.generations < 1 {
            return Err(EngineError::InvalidConfig(
                "generations must be at least 1".to_string(),
            ));
        }
        if self.state_dimension < 1 {
            return Err(EngineError::InvalidConfig(
                "state_dimension must be at least 1".to_string(),
            ));
        }
        if self.objectives.is_empty() {
            return Err(EngineError::InvalidConfig(
                "objective axis list must not be empty".to_string(),
            ));
        }
        for (name, rate) in [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// Caller-supplied cooperative cancellation signal, checked between
/// generations. Evaluators may observe it too and return
/// [`EvaluatorError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-generation statistics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSnapshot {
    pub generation: usize,
    /// Population size before gating.
    pub population_size: usize,
    pub pareto_front_size: usize,
    pub passed_gate: usize,
    pub failed_gate: usize,
    /// Per-axis arithmetic mean over the passed set (zeros when empty).
    pub avg_objectives: Vec<f64>,
    /// Objectives of the front-0 head, falling back to the first passed.
    pub best_objectives: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// The final gated population; every member carries a verified record.
    pub final_population: Vec<Agent>,
    pub pareto_front: Vec<Agent>,
    pub snapshots: Vec<GenerationSnapshot>,
    pub elapsed_ms: u64,
}

/// The meta-league evolution engine.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    gate: ProofGate,
    rng: StdRng,
}

impl EvolutionEngine {
    pub fn new(config: EvolutionConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let gate = ProofGate::new(config.gate.clone());
        Ok(Self { config, gate, rng })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Drive a full run: `generations` rounds of evaluate → gate → rank →
    /// snapshot → reproduce, then one final evaluate + gate over the last
    /// population.
    ///
    /// Population exhaustion (nobody passes the gate) and cancellation halt
    /// the loop gracefully and return the statistics gathered so far.
    /// Dimension mismatches and evaluator failures abort the run.
    pub async fn run(
        &mut self,
        evaluator: &dyn Evaluator,
        cancel: &CancelFlag,
    ) -> Result<RunResult, EngineError> {
        let started = Instant::now();
        let mut snapshots: Vec<GenerationSnapshot> = Vec::new();
        // The population carried into the next step; None once cancelled.
        let mut carry = Some(self.seed_population());

        for generation in 0..self.config.generations {
            if cancel.is_cancelled() {
                tracing::info!(generation, "run cancelled between generations");
                carry = None;
                break;
            }

            let population = carry.take().unwrap_or_default();
            let (evaluated, eval_cancelled) =
                Self::evaluate_population(evaluator, population).await?;
            self.check_objective_lengths(&evaluated)?;
            let before_gate = evaluated.len();

            let outcome = self.gate.apply(evaluated, &mut self.rng);
            metrics::counter!("league_proofs_issued_total")
                .increment(outcome.passed.len() as u64);

            let mut genomes = Self::genomes_of(&outcome.passed);
            let fronts = fast_non_dominated_sort(&mut genomes, &self.config.objectives)?;
            for front in &fronts {
                crowding_distance(&mut genomes, front, &self.config.objectives);
            }
            let pareto_front_size = fronts.first().map_or(0, Vec::len);

            snapshots.push(self.snapshot(generation, before_gate, pareto_front_size, &outcome, &fronts));
            metrics::counter!("league_generations_total").increment(1);
            tracing::info!(
                generation,
                passed = outcome.passed.len(),
                failed = outcome.failed.len(),
                pareto_front_size,
                "generation gated"
            );

            if outcome.passed.is_empty() || eval_cancelled {
                if eval_cancelled {
                    tracing::info!(generation, "evaluator reported cancellation");
                } else {
                    tracing::warn!(generation, "population exhausted at the proof gate");
                }
                let pareto_front = Self::collect_front(&outcome.passed, &fronts);
                return Ok(RunResult {
                    final_population: outcome.passed,
                    pareto_front,
                    snapshots,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }

            carry = Some(if generation + 1 < self.config.generations {
                self.reproduce(&outcome.passed, &genomes, generation)?
            } else {
                outcome.passed
            });
        }

        // One last evaluate + gate over the surviving population; skipped
        // when the run was cancelled before completing.
        let (final_population, pareto_front) = match carry {
            Some(population) => {
                let (evaluated, _) = Self::evaluate_population(evaluator, population).await?;
                self.check_objective_lengths(&evaluated)?;
                let outcome = self.gate.apply(evaluated, &mut self.rng);
                let mut genomes = Self::genomes_of(&outcome.passed);
                let fronts = fast_non_dominated_sort(&mut genomes, &self.config.objectives)?;
                let front = Self::collect_front(&outcome.passed, &fronts);
                (outcome.passed, front)
            }
            None => (Vec::new(), Vec::new()),
        };

        Ok(RunResult {
            final_population,
            pareto_front,
            snapshots,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn seed_population(&self) -> Vec<Agent> {
        (0..self.config.population_size)
            .map(|n| {
                Agent::new(
                    &format!("agent-gen0-{n}"),
                    KINDS[n % KINDS.len()],
                    self.config.state_dimension,
                    self.config.objectives.len(),
                )
            })
            .collect()
    }

    /// Evaluate the whole population concurrently and join.
    ///
    /// No other step observes partial results: this is the run's only
    /// barrier. Returns the evaluated agents in input order plus whether
    /// any evaluator observed cancellation.
    async fn evaluate_population(
        evaluator: &dyn Evaluator,
        population: Vec<Agent>,
    ) -> Result<(Vec<Agent>, bool), EngineError> {
        let evaluations = population.into_iter().map(|mut agent| async move {
            let outcome = evaluator.evaluate(&mut agent).await;
            (agent, outcome)
        });

        let mut agents = Vec::new();
        let mut cancelled = false;
        for (agent, outcome) in join_all(evaluations).await {
            match outcome {
                Ok(()) => {}
                Err(EvaluatorError::Cancelled) => cancelled = true,
                Err(EvaluatorError::Failed(message)) => {
                    return Err(EngineError::Evaluator(message))
                }
            }
            agents.push(agent);
        }
        Ok((agents, cancelled))
    }

    fn check_objective_lengths(&self, population: &[Agent]) -> Result<(), EngineError> {
        let expected = self.config.objectives.len();
        for agent in population {
            let actual = agent.objectives.values.len();
            if actual != expected {
                return Err(league_core::CoreError::ObjectiveLengthMismatch {
                    expected,
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    fn genomes_of(population: &[Agent]) -> Vec<RankedGenome> {
        population
            .iter()
            .map(|agent| RankedGenome::new(agent.id.clone(), agent.objectives.values.clone()))
            .collect()
    }

    /// Front-0 agents, relying on genome order matching population order.
    fn collect_front(passed: &[Agent], fronts: &[Vec<usize>]) -> Vec<Agent> {
        fronts
            .first()
            .map(|front| front.iter().map(|&i| passed[i].clone()).collect())
            .unwrap_or_default()
    }

    fn snapshot(
        &self,
        generation: usize,
        population_size: usize,
        pareto_front_size: usize,
        outcome: &GateOutcome,
        fronts: &[Vec<usize>],
    ) -> GenerationSnapshot {
        let axis_count = self.config.objectives.len();

        let mut avg_objectives = vec![0.0; axis_count];
        if !outcome.passed.is_empty() {
            for agent in &outcome.passed {
                for (slot, value) in avg_objectives.iter_mut().zip(&agent.objectives.values) {
                    *slot += value;
                }
            }
            for slot in &mut avg_objectives {
                *slot /= outcome.passed.len() as f64;
            }
        }

        let best_objectives = fronts
            .first()
            .and_then(|front| front.first())
            .map(|&i| outcome.passed[i].objectives.values.clone())
            .or_else(|| {
                outcome
                    .passed
                    .first()
                    .map(|agent| agent.objectives.values.clone())
            })
            .unwrap_or_else(|| vec![0.0; axis_count]);

        GenerationSnapshot {
            generation,
            population_size,
            pareto_front_size,
            passed_gate: outcome.passed.len(),
            failed_gate: outcome.failed.len(),
            avg_objectives,
            best_objectives,
            timestamp: Utc::now(),
        }
    }

    /// Build the next generation: elitism plus tournament reproduction.
    fn reproduce(
        &mut self,
        passed: &[Agent],
        genomes: &[RankedGenome],
        generation: usize,
    ) -> Result<Vec<Agent>, EngineError> {
        let elite_count = self.config.population_size / 2;
        let survivors = select_survivors(genomes.to_vec(), elite_count, &self.config.objectives)?;

        let by_id: HashMap<&str, &Agent> =
            passed.iter().map(|agent| (agent.id.as_str(), agent)).collect();
        let mut next: Vec<Agent> = survivors
            .iter()
            .filter_map(|genome| by_id.get(genome.id.as_str()).map(|&agent| agent.clone()))
            .collect();
        let elites = next.len();

        let mut serial = 0;
        while next.len() < self.config.population_size {
            let p1 = by_id[tournament_select(genomes, &mut self.rng).id.as_str()];
            let p2 = by_id[tournament_select(genomes, &mut self.rng).id.as_str()];
            let child_id = format!("agent-gen{}-{serial}", generation + 1);
            serial += 1;

            let mut child = if self.rng.gen_bool(self.config.crossover_rate) {
                Self::crossover(p1, p2, child_id)?
            } else {
                Self::clone_child(p1, child_id)
            };
            Self::mutate(&mut child, self.config.mutation_rate, &mut self.rng)?;
            next.push(child);
        }

        tracing::debug!(
            generation,
            elites,
            children = serial,
            "next generation assembled"
        );
        Ok(next)
    }

    /// Blend two parents: consensus-averaged state, throttled inheritance
    /// of knowledge (first two items each) and tools (first of each).
    fn crossover(p1: &Agent, p2: &Agent, child_id: String) -> Result<Agent, EngineError> {
        let mut child = p1.clone();
        child.id = child_id;
        child.generation = p1.generation.max(p2.generation) + 1;
        child.proof = None;

        let blended = spectral_sync(&[
            p1.perception.state.clone(),
            p2.perception.state.clone(),
        ])?;
        child.update_perception(blended, "crossover")?;

        child.reasoning.knowledge = p1
            .reasoning
            .knowledge
            .iter()
            .take(2)
            .chain(p2.reasoning.knowledge.iter().take(2))
            .cloned()
            .collect();
        child.coordination.tools = p1
            .coordination
            .tools
            .first()
            .into_iter()
            .chain(p2.coordination.tools.first())
            .cloned()
            .collect();

        child.push_lineage(format!("crossover:gen{}", child.generation));
        Ok(child)
    }

    /// Asexual fallback: structural clone one generation on.
    fn clone_child(parent: &Agent, child_id: String) -> Agent {
        let mut child = parent.clone();
        child.id = child_id;
        child.generation = parent.generation + 1;
        child.proof = None;
        child.push_lineage(format!("clone-from:{}", parent.id));
        child
    }

    /// With probability `rate`: perturb and renormalise the state, then
    /// independently drop the last knowledge item and/or append a
    /// generation-tagged fact.
    fn mutate<R: Rng>(agent: &mut Agent, rate: f64, rng: &mut R) -> Result<(), EngineError> {
        if !rng.gen_bool(rate) {
            return Ok(());
        }

        let perturbed = perturb(&agent.perception.state, MUTATION_NOISE, rng);
        agent.update_perception(normalize(&perturbed), "mutation")?;

        if rng.gen_bool(KNOWLEDGE_DROP_RATE) {
            agent.reasoning.knowledge.pop();
        }
        if rng.gen_bool(KNOWLEDGE_APPEND_RATE) {
            agent.add_knowledge(KnowledgeItem::Fact {
                content: format!("observed-at-gen-{}", agent.generation),
            });
        }

        agent.push_lineage(format!("mutation:gen{}", agent.generation));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_core::hilbert::{norm, Complex};
    use league_core::ToolSpec;

    fn parent(id: &str, generation: u32, re: f64, im: f64) -> Agent {
        let mut agent = Agent::new(id, AgentKind::Explorer, 2, 6);
        agent.generation = generation;
        agent
            .update_perception(vec![Complex::new(re, im), Complex::new(im, re)], "observe")
            .unwrap();
        agent
    }

    #[test]
    fn test_config_validation() {
        let ok = EvolutionConfig::default();
        assert!(ok.validate().is_ok());

        let mut too_small = EvolutionConfig::default();
        too_small.population_size = 2;
        assert!(matches!(
            too_small.validate(),
            Err(EngineError::InvalidConfig(_))
        ));

        let mut no_axes = EvolutionConfig::default();
        no_axes.objectives.clear();
        assert!(no_axes.validate().is_err());

        let mut bad_rate = EvolutionConfig::default();
        bad_rate.mutation_rate = 1.5;
        assert!(bad_rate.validate().is_err());

        bad_rate.mutation_rate = 0.3;
        bad_rate.generations = 0;
        assert!(bad_rate.validate().is_err());
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let mut config = EvolutionConfig::default();
        config.state_dimension = 0;
        assert!(EvolutionEngine::new(config).is_err());
    }

    #[test]
    fn test_crossover_blends_parents() {
        let mut p1 = parent("agent-gen1-0", 1, 1.0, 0.0);
        let p2 = parent("agent-gen2-1", 2, 3.0, 0.0);
        for i in 0..3 {
            p1.add_knowledge(KnowledgeItem::Fact {
                content: format!("fact-{i}"),
            });
        }
        p1.add_tool(ToolSpec::new("first", 1.0));
        p1.add_tool(ToolSpec::new("second", 2.0));

        let child =
            EvolutionEngine::crossover(&p1, &p2, "agent-gen3-0".to_string()).unwrap();

        assert_eq!(child.id, "agent-gen3-0");
        assert_eq!(child.generation, 3);
        assert!(child.proof.is_none());
        assert_eq!(child.perception.state.len(), 2);
        assert!((norm(&child.perception.state) - 1.0).abs() < 1e-9);
        // First two knowledge items of each parent; p2 has none.
        assert_eq!(child.reasoning.knowledge.len(), 2);
        // First tool of each parent; p2 has none.
        assert_eq!(child.coordination.tools.len(), 1);
        assert_eq!(child.coordination.tools[0].name, "first");
        assert_eq!(
            child.lineage.last().unwrap(),
            "crossover:gen3"
        );
        assert_eq!(
            child.perception.provenance.last().unwrap(),
            "crossover"
        );
    }

    #[test]
    fn test_clone_child_advances_generation() {
        let p1 = parent("agent-gen1-2", 1, 1.0, 2.0);
        let child = EvolutionEngine::clone_child(&p1, "agent-gen2-0".to_string());

        assert_eq!(child.generation, 2);
        assert_eq!(child.lineage.last().unwrap(), "clone-from:agent-gen1-2");
        assert_eq!(child.perception.state, p1.perception.state);
    }

    #[test]
    fn test_mutation_preserves_dimension_and_unit_norm() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut agent = parent("agent-gen1-0", 1, 0.6, 0.8);

        EvolutionEngine::mutate(&mut agent, 1.0, &mut rng).unwrap();

        assert_eq!(agent.perception.state.len(), 2);
        assert!((norm(&agent.perception.state) - 1.0).abs() < 1e-9);
        assert_eq!(agent.lineage.last().unwrap(), "mutation:gen1");
        assert!(agent
            .perception
            .provenance
            .iter()
            .any(|tag| tag == "mutation"));
    }

    #[test]
    fn test_mutation_zero_rate_is_noop() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut agent = parent("agent-gen1-0", 1, 0.6, 0.8);
        let before = agent.clone();

        EvolutionEngine::mutate(&mut agent, 0.0, &mut rng).unwrap();

        assert_eq!(agent.perception.state, before.perception.state);
        assert_eq!(agent.lineage, before.lineage);
    }

    #[test]
    fn test_seed_population_shape() {
        let mut config = EvolutionConfig::default();
        config.population_size = 5;
        config.seed = Some(1);
        let engine = EvolutionEngine::new(config).unwrap();

        let population = engine.seed_population();
        assert_eq!(population.len(), 5);
        assert_eq!(population[0].id, "agent-gen0-0");
        assert_eq!(population[4].id, "agent-gen0-4");
        assert!(population
            .iter()
            .all(|a| a.perception.state.len() == 4 && a.generation == 0));
        // Kinds cycle through the closed set.
        assert_eq!(population[0].kind, AgentKind::Explorer);
        assert_eq!(population[4].kind, AgentKind::Explorer);
    }
}
