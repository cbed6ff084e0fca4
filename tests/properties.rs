//! Properties that must hold for any input, not just the hand-built
//! scenarios.

use flowgate::aggregator::{MultiPlatformAggregator, PlatformMap, PlatformMetrics};
use flowgate::flow::{BuySellRatio, FlowMetrics};
use flowgate::indicators::calculate_atr;
use flowgate::market_data::Candle;
use flowgate::signals::GradeCutoffs;
use flowgate::sizing::PositionSizer;
use flowgate::types::VolatilityTier;
use flowgate::EngineConfig;
use proptest::prelude::*;

fn tier_strategy() -> impl Strategy<Value = VolatilityTier> {
    prop_oneof![
        Just(VolatilityTier::Low),
        Just(VolatilityTier::Normal),
        Just(VolatilityTier::High),
    ]
}

fn platform(exchange: &str, net_flow: f64, ratio: f64) -> PlatformMetrics {
    PlatformMetrics {
        exchange: exchange.to_string(),
        as_of: 0,
        flow: FlowMetrics {
            net_flow,
            total_buy: 0.0,
            total_sell: 0.0,
            buy_sell_ratio: BuySellRatio::Value(ratio),
            current_price: 100.0 + net_flow.abs() % 7.0,
            support: 90.0,
            resistance: 110.0,
            atr: 1.0 + net_flow.abs() % 3.0,
        },
        events: Vec::new(),
    }
}

proptest! {
    /// The loss at the stop never exceeds the configured risk amount.
    #[test]
    fn size_never_risks_more_than_budget(
        balance in 1.0f64..1_000_000.0,
        risk_pct in 0.01f64..100.0,
        stop in 0.000_1f64..10_000.0,
        tier in tier_strategy(),
        open in 0u32..4,
    ) {
        let sizer = PositionSizer::default();
        let p = sizer.compute_size(balance, risk_pct, stop, tier, open).unwrap();
        prop_assert!(p.size >= 0.0);
        prop_assert!(p.size * stop <= p.risk_amount * (1.0 + 1e-9));
    }

    #[test]
    fn at_or_above_cap_size_is_zero(
        balance in 1.0f64..1_000_000.0,
        risk_pct in 0.01f64..100.0,
        stop in 0.000_1f64..10_000.0,
        open in 5u32..50,
    ) {
        let sizer = PositionSizer::default();
        let p = sizer.compute_size(balance, risk_pct, stop, VolatilityTier::Normal, open).unwrap();
        prop_assert_eq!(p.size, 0.0);
    }

    /// Consensus and signals do not depend on the order exchanges arrive in.
    #[test]
    fn consensus_is_order_independent(
        flows in prop::collection::vec((-1_000.0f64..1_000.0, 0.2f64..3.0), 0..6),
    ) {
        let aggregator = MultiPlatformAggregator::new(&EngineConfig::default());

        let mut forward = PlatformMap::new();
        for (i, (net, ratio)) in flows.iter().enumerate() {
            let name = format!("ex{i}");
            forward.insert(name.clone(), platform(&name, *net, *ratio));
        }
        let mut reversed = PlatformMap::new();
        for (i, (net, ratio)) in flows.iter().enumerate().rev() {
            let name = format!("ex{i}");
            reversed.insert(name.clone(), platform(&name, *net, *ratio));
        }

        prop_assert_eq!(
            aggregator.get_market_consensus(&forward),
            aggregator.get_market_consensus(&reversed)
        );
        prop_assert_eq!(
            aggregator.analyze_signals(&forward, "BTC/USDT", 0),
            aggregator.analyze_signals(&reversed, "BTC/USDT", 0)
        );
    }

    /// A higher score never maps to a lower grade.
    #[test]
    fn grade_is_monotonic_in_score(a in -100i32..200, b in -100i32..200) {
        let cutoffs = GradeCutoffs::DEFAULT;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(cutoffs.grade(lo) <= cutoffs.grade(hi));
    }

    #[test]
    fn atr_is_never_negative(
        bars in prop::collection::vec((1.0f64..1_000.0, 0.0f64..50.0, 0.0f64..50.0), 15..60),
    ) {
        let candles: Vec<Candle> = bars
            .iter()
            .enumerate()
            .map(|(i, (close, up, down))| Candle {
                timestamp: i as i64 * 60_000,
                open: *close,
                high: close + up,
                low: (close - down).max(0.0),
                close: *close,
                volume: 1.0,
                taker_buy_volume: 0.5,
            })
            .collect();
        let atr = calculate_atr(&candles, 14).unwrap();
        prop_assert!(atr >= 0.0);
    }
}
