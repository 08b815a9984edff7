use super::engine::{RATE_FLOOR_BUMP, compute_truth};
use super::rng::Rng;
use super::types::{Difficulty, GeneratedProblem, Persona, Scenario, Timing};

/// Inclusive sampling bounds for one difficulty tier.
#[derive(Debug, Clone, Copy)]
pub struct TierRanges {
    pub income: (i64, i64),
    pub wrr: (f64, f64),
    pub ss: (i64, i64),
    pub rwle: (i64, i64),
    pub rle: (i64, i64),
    pub g: (f64, f64),
    pub r: (f64, f64),
    pub pvcur: (i64, i64),
}

pub const EASY_RANGES: TierRanges = TierRanges {
    income: (50_000, 90_000),
    wrr: (0.70, 0.85),
    ss: (10_000, 20_000),
    rwle: (20, 35),
    rle: (20, 30),
    g: (0.020, 0.035),
    r: (0.060, 0.090),
    pvcur: (0, 0),
};

pub const NORMAL_RANGES: TierRanges = TierRanges {
    income: (40_000, 150_000),
    wrr: (0.60, 0.90),
    ss: (8_000, 30_000),
    rwle: (10, 40),
    rle: (15, 35),
    g: (0.015, 0.040),
    r: (0.040, 0.100),
    pvcur: (0, 250_000),
};

pub const HARD_RANGES: TierRanges = TierRanges {
    income: (60_000, 250_000),
    wrr: (0.60, 0.90),
    ss: (0, 40_000),
    rwle: (5, 40),
    rle: (20, 40),
    g: (0.020, 0.050),
    r: (0.030, 0.110),
    pvcur: (0, 600_000),
};

pub const EASY_WRR_OPTIONS: [f64; 4] = [0.70, 0.75, 0.80, 0.85];
pub const EASY_G_OPTIONS: [f64; 4] = [0.020, 0.025, 0.030, 0.035];
pub const EASY_R_OPTIONS: [f64; 4] = [0.060, 0.070, 0.080, 0.090];

// Larger than RATE_FLOOR_BUMP. Existing easy seeds depend on this value.
const EASY_RATE_BUMP: f64 = 0.005;
const RETIRE_RATE_SPREAD: f64 = 0.02;
const BEQUEST_FRACTION: (f64, f64) = (0.05, 0.25);

const FIRST_NAMES: [&str; 12] = [
    "Avery", "Blake", "Casey", "Dana", "Emerson", "Finley", "Harper", "Jordan", "Morgan",
    "Quinn", "Riley", "Sawyer",
];

const OCCUPATIONS: [&str; 10] = [
    "nurse",
    "civil engineer",
    "librarian",
    "electrician",
    "software developer",
    "pharmacist",
    "small-business owner",
    "accountant",
    "firefighter",
    "graphic designer",
];

pub fn ranges_for(difficulty: Difficulty) -> &'static TierRanges {
    match difficulty {
        Difficulty::Easy => &EASY_RANGES,
        Difficulty::Normal => &NORMAL_RANGES,
        Difficulty::Hard => &HARD_RANGES,
    }
}

pub fn generate_scenario(seed: u32, difficulty: Difficulty) -> Scenario {
    generate_problem(seed, difficulty).scenario
}

/// Draw order is part of the seed contract: reordering any draw below maps
/// every existing seed to a different scenario.
pub fn generate_problem(seed: u32, difficulty: Difficulty) -> GeneratedProblem {
    let mut rng = Rng::new(seed);
    let ranges = ranges_for(difficulty);

    let income = rng.rand_int(ranges.income.0, ranges.income.1) as f64;
    let wrr = rng.rand_float(ranges.wrr.0, ranges.wrr.1);
    let ss = rng.rand_int(ranges.ss.0, ranges.ss.1) as f64;
    let rwle = rng.rand_int(ranges.rwle.0, ranges.rwle.1) as u32;
    let rle = rng.rand_int(ranges.rle.0, ranges.rle.1) as u32;
    let g = rng.rand_float(ranges.g.0, ranges.g.1);
    let mut r = rng.rand_float(ranges.r.0, ranges.r.1);
    if r <= g {
        r = g + RATE_FLOOR_BUMP;
    }
    let pvcur = rng.rand_int(ranges.pvcur.0, ranges.pvcur.1) as f64;

    let mut scenario = Scenario {
        income,
        wrr,
        ss,
        rwle,
        rle,
        g,
        r,
        pvcur,
        r_retire: None,
        bequest: None,
    };

    if difficulty == Difficulty::Easy {
        apply_easy_override(&mut scenario, &mut rng);
    }
    if difficulty == Difficulty::Hard {
        apply_hard_additions(&mut scenario, &mut rng);
    }

    let persona = Persona {
        name: rng.pick(&FIRST_NAMES).to_string(),
        occupation: rng.pick(&OCCUPATIONS).to_string(),
    };

    GeneratedProblem {
        seed,
        difficulty,
        persona,
        scenario,
    }
}

fn apply_easy_override(scenario: &mut Scenario, rng: &mut Rng) {
    scenario.wrr = rng.pick(&EASY_WRR_OPTIONS);
    scenario.g = rng.pick(&EASY_G_OPTIONS);
    scenario.r = rng.pick(&EASY_R_OPTIONS);
    scenario.income = round_to(scenario.income, 1000.0);
    scenario.ss = round_to(scenario.ss, 1000.0);
    scenario.rwle = round_to(scenario.rwle as f64, 5.0) as u32;
    scenario.rle = round_to(scenario.rle as f64, 5.0) as u32;
    scenario.pvcur = 0.0;
    if scenario.r <= scenario.g {
        scenario.r = scenario.g + EASY_RATE_BUMP;
    }
}

fn apply_hard_additions(scenario: &mut Scenario, rng: &mut Rng) {
    let delta = rng.rand_float(-RETIRE_RATE_SPREAD, RETIRE_RATE_SPREAD);
    let mut r_retire = (scenario.r + delta).max(0.0);
    if r_retire <= scenario.g {
        r_retire = scenario.g + RATE_FLOOR_BUMP;
    }
    scenario.r_retire = Some(r_retire);

    let fraction = rng.rand_float(BEQUEST_FRACTION.0, BEQUEST_FRACTION.1);
    // Sized against the capital needed without any bequest.
    let estimated_capital = compute_truth(scenario, Timing::End).cap_a;
    scenario.bequest = Some(round_to(fraction * estimated_capital, 1000.0).max(0.0));
}

fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}
