//! Property-based tests for the pair model
//!
//! These tests use proptest to check invariants of the filter, the threshold
//! search, the signal rules and the p-value surface across random inputs.

use kalmanpairs::cointegration::Trend;
use kalmanpairs::math::{mackinnon_p_value, FilterParameters, LocalLevelFilter};
use kalmanpairs::strategy::signal::next_state;
use kalmanpairs::strategy::threshold::{linspace, survival};
use kalmanpairs::strategy::{CointegratingVector, ExitRule, ThresholdOptimizer};
use kalmanpairs::types::PositionState;
use proptest::prelude::*;

fn filter(q: f64, r: f64, p0: f64) -> LocalLevelFilter {
    LocalLevelFilter::new(FilterParameters {
        transition_variance: q,
        observation_variance: r,
        initial_mean: 0.0,
        initial_covariance: p0,
    })
    .unwrap()
}

fn exit_rule() -> impl Strategy<Value = ExitRule> {
    prop_oneof![Just(ExitRule::Band), Just(ExitRule::ZeroCross)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_filter_covariance_bounded(
        q in 0.0f64..1.0,
        r in 1e-4f64..1.0,
        p0 in 0.0f64..10.0,
        obs in prop::collection::vec(-5.0f64..5.0, 1..200),
    ) {
        let f = filter(q, r, p0);
        let states = f.filter(&obs);
        prop_assert_eq!(states.len(), obs.len());
        for s in &states {
            prop_assert!(s.mean.is_finite());
            prop_assert!(s.covariance >= 0.0);
            // A correction never leaves more uncertainty than one observation
            prop_assert!(s.covariance <= r * (1.0 + 1e-12));
        }
        prop_assert_eq!(states, f.filter(&obs));
    }

    #[test]
    fn prop_replay_matches_sequential_updates(
        q in 1e-6f64..1.0,
        r in 1e-4f64..1.0,
        obs in prop::collection::vec(-5.0f64..5.0, 1..100),
    ) {
        let f = filter(q, r, 1.0);
        let start = f.prior();
        let (means, end) = f.replay_forward(&obs, start);

        let mut state = start;
        for (o, m) in obs.iter().zip(means.iter()) {
            state = f.update(state, *o);
            prop_assert_eq!(state.mean, *m);
        }
        prop_assert_eq!(state, end);
    }

    #[test]
    fn prop_threshold_within_observed_range(
        history in prop::collection::vec(-5.0f64..5.0, 2..300),
    ) {
        let max = history.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assume!(max > 1e-6);

        let theta = ThresholdOptimizer::default().optimize(&history).unwrap();
        prop_assert!(theta > 0.0);
        prop_assert!(theta <= max);
    }

    #[test]
    fn prop_survival_non_increasing(
        history in prop::collection::vec(-5.0f64..5.0, 1..300),
        top in 0.1f64..6.0,
    ) {
        let grid = linspace(0.0, top, 50);
        let f_bar = survival(&history, &grid);
        prop_assert_eq!(f_bar.len(), 50);
        for pair in f_bar.windows(2) {
            prop_assert!(pair[1] <= pair[0]);
        }
        prop_assert!(f_bar.iter().all(|f| (0.0..=1.0).contains(f)));
    }

    #[test]
    fn prop_trading_weights_gross_one(
        a in -10.0f64..10.0,
        b in -10.0f64..10.0,
    ) {
        prop_assume!(a.abs() + b.abs() > 1e-9);
        let weights = CointegratingVector::new([a, b]).unwrap().trading_weights();
        let [w0, w1] = weights.components();

        prop_assert!((weights.gross() - 1.0).abs() < 1e-12);
        prop_assert_eq!(w0.signum(), a.signum());
        prop_assert_eq!(w1.signum(), b.signum());
    }

    #[test]
    fn prop_position_never_reverses_in_one_step(
        zs in prop::collection::vec(-10.0f64..10.0, 1..200),
        theta in 0.01f64..5.0,
        rule in exit_rule(),
    ) {
        let mut state = PositionState::Flat;
        for z in zs {
            let next = next_state(state, z, theta, rule);
            prop_assert!(!(state == PositionState::Long && next == PositionState::Short));
            prop_assert!(!(state == PositionState::Short && next == PositionState::Long));
            if state.is_flat() && !next.is_flat() {
                prop_assert!(z.abs() > theta);
            }
            state = next;
        }
    }

    #[test]
    fn prop_zero_cross_holds_inside_band(
        frac in 0.0f64..1.0,
        theta in 0.01f64..5.0,
    ) {
        let z = -frac * theta;
        prop_assert_eq!(
            next_state(PositionState::Long, z, theta, ExitRule::ZeroCross),
            PositionState::Long
        );
        prop_assert_eq!(
            next_state(PositionState::Short, -z, theta, ExitRule::ZeroCross),
            PositionState::Short
        );
    }

    #[test]
    fn prop_p_value_monotone(
        a in -30.0f64..10.0,
        b in -30.0f64..10.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        for trend in [Trend::None, Trend::Constant, Trend::ConstantTrend] {
            let p_lo = mackinnon_p_value(lo, trend);
            let p_hi = mackinnon_p_value(hi, trend);
            prop_assert!((0.0..=1.0).contains(&p_lo));
            prop_assert!(p_lo <= p_hi + 1e-3);
        }
    }
}
