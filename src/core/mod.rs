mod engine;
mod generator;
mod grader;
mod rng;
mod session;
mod types;

pub use engine::{
    RATE_FLOOR_BUMP, annual_savings, capital_annuity, coerce_above_inflation, compute_truth,
    need_today, real_rate,
};
pub use generator::{
    EASY_G_OPTIONS, EASY_R_OPTIONS, EASY_RANGES, EASY_WRR_OPTIONS, HARD_RANGES, NORMAL_RANGES,
    TierRanges, generate_problem, generate_scenario, ranges_for,
};
pub use grader::{ABSOLUTE_TOLERANCE, RELATIVE_TOLERANCE, grade, grade_value, parse_answer};
pub use rng::{Rng, derive_seed};
pub use session::{Session, SessionConfig};
pub use types::{
    AnswerField, Difficulty, FieldGrade, Grade, GeneratedProblem, Method, Persona, Scenario,
    ScenarioError, Stats, Timing, Truth, Verdict,
};
