use std::collections::BTreeMap;

use super::engine::compute_truth;
use super::generator::generate_problem;
use super::grader::grade;
use super::rng::derive_seed;
use super::types::{
    AnswerField, Difficulty, Grade, Method, Persona, Scenario, ScenarioError, Stats, Timing, Truth,
};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub base_seed: u32,
    pub difficulty: Difficulty,
    pub timing: Timing,
    pub method: Method,
}

/// One learner's practice run. Owns its scenario, truth and counters; nothing
/// here is shared with other sessions.
#[derive(Debug, Clone)]
pub struct Session {
    base_seed: u32,
    problem_index: u32,
    difficulty: Difficulty,
    timing: Timing,
    method: Method,
    scenario: Scenario,
    persona: Option<Persona>,
    truth: Truth,
    stats: Stats,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let problem = generate_problem(derive_seed(config.base_seed, 0), config.difficulty);
        let truth = compute_truth(&problem.scenario, config.timing);
        Self {
            base_seed: config.base_seed,
            problem_index: 0,
            difficulty: config.difficulty,
            timing: config.timing,
            method: config.method,
            scenario: problem.scenario,
            persona: Some(problem.persona),
            truth,
            stats: Stats::default(),
        }
    }

    pub fn base_seed(&self) -> u32 {
        self.base_seed
    }

    pub fn problem_index(&self) -> u32 {
        self.problem_index
    }

    pub fn current_seed(&self) -> u32 {
        derive_seed(self.base_seed, self.problem_index)
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// `None` once the scenario has been entered by hand.
    pub fn persona(&self) -> Option<&Persona> {
        self.persona.as_ref()
    }

    pub fn truth(&self) -> &Truth {
        &self.truth
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn next_problem(&mut self) {
        self.problem_index = self.problem_index.wrapping_add(1);
        self.regenerate();
    }

    /// Rebuilds the scenario for the current index, e.g. after a tier change.
    pub fn regenerate(&mut self) {
        let problem = generate_problem(self.current_seed(), self.difficulty);
        self.scenario = problem.scenario;
        self.persona = Some(problem.persona);
        self.refresh_truth();
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        if self.difficulty != difficulty {
            self.difficulty = difficulty;
            self.regenerate();
        }
    }

    pub fn set_timing(&mut self, timing: Timing) {
        self.timing = timing;
        self.refresh_truth();
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Free-entry or manual edit: the whole scenario is swapped and the
    /// truth recomputed.
    pub fn replace_scenario(&mut self, scenario: Scenario) -> Result<(), ScenarioError> {
        scenario.validate()?;
        self.scenario = scenario;
        self.persona = None;
        self.refresh_truth();
        Ok(())
    }

    pub fn submit(&mut self, answers: &BTreeMap<AnswerField, String>) -> Grade {
        let result = grade(self.method, answers, &self.truth);
        self.stats.record(&result);
        result
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    fn refresh_truth(&mut self) {
        self.truth = compute_truth(&self.scenario, self.timing);
    }
}
