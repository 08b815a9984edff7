use super::types::{Scenario, Timing, Truth};

const RATE_EPS: f64 = 1e-12;
/// Nudge applied when a nominal rate does not exceed inflation.
pub const RATE_FLOOR_BUMP: f64 = 0.0005;

pub fn real_rate(nominal: f64, inflation: f64) -> f64 {
    (1.0 + nominal) / (1.0 + inflation) - 1.0
}

/// `rate`, or `inflation + RATE_FLOOR_BUMP` when it does not beat inflation.
pub fn coerce_above_inflation(rate: f64, inflation: f64) -> f64 {
    if rate > inflation {
        rate
    } else {
        inflation + RATE_FLOOR_BUMP
    }
}

/// First-year shortfall in today's money; a surplus is clamped to zero.
pub fn need_today(income: f64, wrr: f64, ss: f64) -> f64 {
    (wrr * income - ss).max(0.0)
}

/// Present value at retirement of `years` level payments of `pmt1`, paid at
/// the start of each year and discounted at `r_real`.
pub fn capital_annuity(pmt1: f64, r_real: f64, years: u32) -> f64 {
    let n = years as f64;
    if r_real.abs() < RATE_EPS {
        return pmt1 * n;
    }
    pmt1 * ((1.0 - (1.0 + r_real).powf(-n)) / r_real) * (1.0 + r_real)
}

/// Level deposit that grows `pv_current` into `target` over `years` at `rate`.
/// Never negative: an already funded target needs no savings.
pub fn annual_savings(pv_current: f64, target: f64, rate: f64, years: u32, timing: Timing) -> f64 {
    let n = years as f64;
    let fv_existing = pv_current * (1.0 + rate).powf(n);
    let need = target - fv_existing;
    if need <= 0.0 {
        return 0.0;
    }

    let pmt_end = if rate.abs() < RATE_EPS {
        need / n
    } else {
        need / (((1.0 + rate).powf(n) - 1.0) / rate)
    };

    match timing {
        Timing::End => pmt_end,
        Timing::Begin => pmt_end / (1.0 + rate),
    }
}

pub fn compute_truth(scenario: &Scenario, timing: Timing) -> Truth {
    let g = scenario.g;
    let r = coerce_above_inflation(scenario.r, g);
    let r_during = scenario
        .r_retire
        .map(|rate| coerce_above_inflation(rate, g))
        .unwrap_or(r);
    let r_real = real_rate(r_during, g);
    let years_retired = scenario.rle as f64;

    let need_today = need_today(scenario.income, scenario.wrr, scenario.ss);
    let pmt1 = need_today * (1.0 + g).powf(scenario.rwle as f64);

    let bequest_pv = scenario
        .bequest
        .map(|bequest| bequest / (1.0 + r_real).powf(years_retired))
        .unwrap_or(0.0);
    let cap_a = capital_annuity(pmt1, r_real, scenario.rle) + bequest_pv;

    let keep_cpm = cap_a / (1.0 + r_during).powf(years_retired);
    let keep_pppm = cap_a / (1.0 + r_real).powf(years_retired);
    let total_cpm = cap_a + keep_cpm;
    let total_pppm = cap_a + keep_pppm;

    let savings = |target: f64| annual_savings(scenario.pvcur, target, r, scenario.rwle, timing);

    Truth {
        need_today,
        pmt1,
        r_real,
        cap_a,
        keep_cpm,
        total_cpm,
        keep_pppm,
        total_pppm,
        sv_a: savings(cap_a),
        sv_cpm: savings(total_cpm),
        sv_pppm: savings(total_pppm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_scenario() -> Scenario {
        Scenario {
            income: 100_000.0,
            wrr: 0.8,
            ss: 20_000.0,
            rwle: 20,
            rle: 25,
            g: 0.03,
            r: 0.07,
            pvcur: 50_000.0,
            r_retire: None,
            bequest: None,
        }
    }

    #[test]
    fn real_rate_matches_fisher_relation() {
        assert_approx(real_rate(0.07, 0.03), 1.07 / 1.03 - 1.0);
        assert_approx(real_rate(0.03, 0.03), 0.0);
    }

    #[test]
    fn coerce_bumps_rate_that_does_not_beat_inflation() {
        assert_approx(coerce_above_inflation(0.03, 0.03), 0.0305);
        assert_approx(coerce_above_inflation(0.01, 0.03), 0.0305);
        assert_approx(coerce_above_inflation(0.05, 0.03), 0.05);
    }

    #[test]
    fn need_today_clamps_surplus_to_zero() {
        assert_approx(need_today(50_000.0, 0.7, 40_000.0), 0.0);
        assert_approx(need_today(100_000.0, 0.8, 20_000.0), 60_000.0);
    }

    #[test]
    fn capital_annuity_zero_rate_is_exact_sum() {
        assert_eq!(capital_annuity(12_345.0, 0.0, 30), 12_345.0 * 30.0);
    }

    #[test]
    fn capital_annuity_matches_hand_calculation() {
        // Three payments of 1000 at the start of each year at 10%.
        let expected: f64 = 1000.0 + 1000.0 / 1.1 + 1000.0 / 1.21;
        assert_approx(capital_annuity(1000.0, 0.10, 3), expected);
    }

    #[test]
    fn annual_savings_zero_when_existing_balance_reaches_target() {
        let fv = 100_000.0 * 1.05_f64.powi(10);
        assert_eq!(annual_savings(100_000.0, 100_000.0, 0.05, 10, Timing::End), 0.0);
        assert_eq!(annual_savings(100_000.0, fv - 1.0, 0.05, 10, Timing::Begin), 0.0);
    }

    #[test]
    fn annual_savings_zero_rate_divides_evenly() {
        assert_approx(annual_savings(0.0, 100_000.0, 0.0, 20, Timing::End), 5_000.0);
        assert_approx(annual_savings(0.0, 100_000.0, 0.0, 20, Timing::Begin), 5_000.0);
    }

    #[test]
    fn annual_savings_begin_timing_discounts_one_period() {
        let end = annual_savings(10_000.0, 500_000.0, 0.06, 25, Timing::End);
        let begin = annual_savings(10_000.0, 500_000.0, 0.06, 25, Timing::Begin);
        assert_approx(begin, end / 1.06);

        // Ordinary annuity: 3 deposits of p at 10% reach p * 3.31.
        assert_approx(annual_savings(0.0, 3_310.0, 0.10, 3, Timing::End), 1_000.0);
    }

    #[test]
    fn compute_truth_matches_closed_forms() {
        let scenario = sample_scenario();
        let truth = compute_truth(&scenario, Timing::End);

        let r_real: f64 = 1.07 / 1.03 - 1.0;
        let pmt1 = 60_000.0 * 1.03_f64.powi(20);
        let cap_a = pmt1 * ((1.0 - (1.0 + r_real).powi(-25)) / r_real) * (1.0 + r_real);
        let keep_cpm = cap_a / 1.07_f64.powi(25);
        let keep_pppm = cap_a / (1.0 + r_real).powi(25);

        assert_approx(truth.need_today, 60_000.0);
        assert_approx_tol(truth.pmt1, pmt1, 1e-6);
        assert_approx(truth.r_real, r_real);
        assert_approx_tol(truth.cap_a, cap_a, 1e-4);
        assert_approx_tol(truth.keep_cpm, keep_cpm, 1e-4);
        assert_approx_tol(truth.total_cpm, cap_a + keep_cpm, 1e-4);
        assert_approx_tol(truth.keep_pppm, keep_pppm, 1e-4);
        assert_approx_tol(truth.total_pppm, cap_a + keep_pppm, 1e-4);

        let fv_existing = 50_000.0 * 1.07_f64.powi(20);
        let factor = (1.07_f64.powi(20) - 1.0) / 0.07;
        assert_approx_tol(truth.sv_a, (cap_a - fv_existing) / factor, 1e-4);
        assert!(truth.sv_cpm > truth.sv_a);
        assert!(truth.sv_pppm > truth.sv_a);
    }

    #[test]
    fn compute_truth_coerces_rate_not_above_inflation() {
        let mut scenario = sample_scenario();
        scenario.r = 0.02;
        let coerced = compute_truth(&scenario, Timing::End);
        scenario.r = 0.03 + RATE_FLOOR_BUMP;
        let explicit = compute_truth(&scenario, Timing::End);
        assert_eq!(coerced, explicit);
    }

    #[test]
    fn compute_truth_uses_retirement_rate_for_cpm_and_real_rate() {
        let mut scenario = sample_scenario();
        scenario.r_retire = Some(0.05);
        let truth = compute_truth(&scenario, Timing::End);
        let r_real: f64 = 1.05 / 1.03 - 1.0;
        assert_approx(truth.r_real, r_real);
        assert_approx_tol(truth.keep_cpm, truth.cap_a / 1.05_f64.powi(25), 1e-4);

        scenario.r_retire = Some(0.01);
        let bumped = compute_truth(&scenario, Timing::End);
        assert_approx(bumped.r_real, 1.0305 / 1.03 - 1.0);
    }

    #[test]
    fn compute_truth_adds_discounted_bequest() {
        let mut scenario = sample_scenario();
        let base = compute_truth(&scenario, Timing::End);
        scenario.bequest = Some(100_000.0);
        let with_bequest = compute_truth(&scenario, Timing::End);
        let expected = 100_000.0 / (1.0 + base.r_real).powi(25);
        assert_approx_tol(with_bequest.cap_a - base.cap_a, expected, 1e-4);
    }

    #[test]
    fn compute_truth_with_surplus_needs_nothing() {
        let mut scenario = sample_scenario();
        scenario.ss = 90_000.0;
        let truth = compute_truth(&scenario, Timing::Begin);
        assert_eq!(truth.need_today, 0.0);
        assert_eq!(truth.cap_a, 0.0);
        assert_eq!(truth.total_cpm, 0.0);
        assert_eq!(truth.sv_a, 0.0);
        assert_eq!(truth.sv_pppm, 0.0);
    }

    proptest! {
        #[test]
        fn prop_capital_annuity_is_continuous_near_zero_rate(
            pmt1 in 1.0f64..200_000.0,
            years in 1u32..60,
            exponent in 6i32..10
        ) {
            let tiny = 10f64.powi(-exponent);
            let flat = pmt1 * years as f64;
            for rate in [tiny, -tiny] {
                let value = capital_annuity(pmt1, rate, years);
                prop_assert!((value - flat).abs() <= flat * 1e-4);
            }
        }

        #[test]
        fn prop_annual_savings_is_never_negative(
            pv in 0.0f64..2_000_000.0,
            target in 0.0f64..5_000_000.0,
            rate in -0.05f64..0.15,
            years in 1u32..50,
            begin in proptest::bool::ANY
        ) {
            let timing = if begin { Timing::Begin } else { Timing::End };
            let savings = annual_savings(pv, target, rate, years, timing);
            prop_assert!(savings >= 0.0);
            if pv * (1.0 + rate).powf(years as f64) >= target {
                prop_assert!(savings == 0.0);
            }
        }

        #[test]
        fn prop_preservation_methods_exceed_annuity_capital(
            income in 30_000.0f64..250_000.0,
            wrr in 0.6f64..0.9,
            ss in 0.0f64..15_000.0,
            rwle in 1u32..40,
            rle in 1u32..40,
            g in 0.0f64..0.05,
            spread in 0.0005f64..0.08
        ) {
            let scenario = Scenario {
                income,
                wrr,
                ss,
                rwle,
                rle,
                g,
                r: g + spread,
                pvcur: 0.0,
                r_retire: None,
                bequest: None,
            };
            let truth = compute_truth(&scenario, Timing::End);
            prop_assert!(truth.need_today > 0.0);
            prop_assert!(truth.keep_cpm >= 0.0);
            prop_assert!(truth.keep_pppm >= 0.0);
            prop_assert!(truth.total_cpm > truth.cap_a);
            prop_assert!(truth.total_pppm > truth.cap_a);
        }

        #[test]
        fn prop_larger_bequest_increases_annuity_capital(
            bequest in 0.0f64..1_000_000.0,
            extra in 1_000.0f64..500_000.0,
            rle in 1u32..40
        ) {
            let mut scenario = sample_scenario();
            scenario.rle = rle;
            scenario.bequest = Some(bequest);
            let low = compute_truth(&scenario, Timing::End);
            scenario.bequest = Some(bequest + extra);
            let high = compute_truth(&scenario, Timing::End);
            prop_assert!(high.cap_a > low.cap_a);
        }
    }
}
