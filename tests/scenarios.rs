mod common;

use approx::assert_relative_eq;
use chrono::Duration;
use common::*;
use flowgate::aggregator::ConsensusLabel;
use flowgate::indicators::calculate_atr;
use flowgate::{Grade, RegimeLabel, Side, SignalKind};

fn three_exchange_pump() -> Vec<flowgate::aggregator::ExchangeFrames> {
    ["binance", "okx", "bybit"]
        .iter()
        .map(|ex| frames(ex, pump_primary(), rising_quarters()))
        .collect()
}

// ---------------------------------------------------------------------------
// Scenario A: one exchange only, bullish flow is treated as a possible trap
// ---------------------------------------------------------------------------

#[test]
fn single_exchange_bullish_flow_is_downgraded() {
    let strategy = strategy();
    let aggregator = strategy.aggregator();

    let collected = aggregator.collect(
        "PEPE/USDT",
        vec![frames("binance", pump_primary(), rising_quarters())],
    );
    assert!(collected.failures.is_empty());

    let metrics = &collected.platforms["binance"];
    assert!(metrics.flow.net_flow > 0.0);
    assert!(metrics
        .events
        .iter()
        .any(|e| e.kind == SignalKind::EarlyPump));

    let consensus = aggregator.get_market_consensus(&collected.platforms);
    assert_eq!(consensus.label, ConsensusLabel::Neutral);
    assert!(consensus.trap_suspected);

    let signals = aggregator.analyze_signals(&collected.platforms, "PEPE/USDT", 0);
    assert!(signals.iter().all(|s| s.kind != SignalKind::Consensus));
    let pump = signals
        .iter()
        .find(|s| s.kind == SignalKind::EarlyPump)
        .expect("pump signal");
    assert!(pump.grade < Grade::A);
}

#[test]
fn single_exchange_pump_in_bull_market_is_not_traded() {
    let strategy = strategy();
    let rec = strategy.run_cycle(
        "PEPE/USDT",
        &bull_reference(),
        vec![frames("binance", pump_primary(), rising_quarters())],
        &account(0),
        now(),
    );

    assert_eq!(rec.side, Side::None);
    assert_eq!(rec.size, 0.0);
    assert_eq!(rec.rationale.suppressed.as_deref(), Some("low grade (C)"));
    assert!(rec.rationale.notes.iter().any(|n| n.contains("possible trap")));
}

// ---------------------------------------------------------------------------
// Scenario B: three exchanges agree, BULL regime, pump => A+ LONG
// ---------------------------------------------------------------------------

#[test]
fn strong_consensus_pump_in_bull_market_goes_long() {
    let strategy = strategy();
    let rec = strategy.run_cycle(
        "SOL/USDT",
        &bull_reference(),
        three_exchange_pump(),
        &account(0),
        now(),
    );

    assert_eq!(rec.side, Side::Long);
    assert_eq!(rec.rationale.regime, RegimeLabel::Bull);
    assert_eq!(rec.rationale.consensus, ConsensusLabel::StrongBullish);
    let signal = rec.rationale.signal.as_ref().expect("signal reference");
    assert_eq!(signal.kind, SignalKind::EarlyPump);
    assert_eq!(signal.grade, Grade::APlus);

    let entry = rec.entry_price.unwrap();
    assert_relative_eq!(entry, 103.0);
    let atr = calculate_atr(&pump_primary(), 14).unwrap();
    let distance = (atr * 1.5).clamp(entry * 0.01, entry * 0.03);
    assert_relative_eq!(rec.stop_price.unwrap(), entry - distance, epsilon = 1e-9);
    assert!(rec.target_price.unwrap() > entry);
    assert!(rec.size > 0.0);
    assert!(rec.size * distance <= 200.0 + 1e-9);
}

// ---------------------------------------------------------------------------
// Scenario C: panic dump is only actionable under a BEAR regime
// ---------------------------------------------------------------------------

#[test]
fn panic_dump_in_bear_market_goes_short() {
    let strategy = strategy();
    let rec = strategy.run_cycle(
        "DOGE/USDT",
        &bear_reference(),
        vec![frames("binance", dump_primary(), falling_quarters())],
        &account(0),
        now(),
    );

    assert_eq!(rec.side, Side::Short);
    let signal = rec.rationale.signal.as_ref().unwrap();
    assert_eq!(signal.kind, SignalKind::PanicDump);
    assert!(signal.grade >= Grade::BPlus);
    assert!(rec.stop_price.unwrap() > rec.entry_price.unwrap());
    assert!(rec.target_price.unwrap() < rec.entry_price.unwrap());
}

#[test]
fn panic_dump_in_bull_market_is_filtered() {
    let strategy = strategy();
    let rec = strategy.run_cycle(
        "DOGE/USDT",
        &bull_reference(),
        vec![frames("binance", dump_primary(), falling_quarters())],
        &account(0),
        now(),
    );

    assert_eq!(rec.side, Side::None);
    assert_eq!(rec.rationale.suppressed.as_deref(), Some("regime mismatch"));
}

// ---------------------------------------------------------------------------
// Scenario D: at the position cap nothing is opened
// ---------------------------------------------------------------------------

#[test]
fn position_cap_blocks_even_a_plus_signal() {
    let strategy = strategy();
    let rec = strategy.run_cycle(
        "SOL/USDT",
        &bull_reference(),
        three_exchange_pump(),
        &account(5),
        now(),
    );

    assert_eq!(rec.side, Side::None);
    assert_eq!(rec.size, 0.0);
    assert_eq!(
        rec.rationale.suppressed.as_deref(),
        Some("position cap reached")
    );
    assert_eq!(
        rec.rationale.signal.as_ref().map(|s| s.grade),
        Some(Grade::APlus)
    );
}

// ---------------------------------------------------------------------------
// Cross-cutting behaviour
// ---------------------------------------------------------------------------

#[test]
fn repeated_cycles_are_identical() {
    let strategy = strategy();
    let first = strategy.run_cycle(
        "SOL/USDT",
        &bull_reference(),
        three_exchange_pump(),
        &account(0),
        now(),
    );
    let second = strategy.run_cycle(
        "SOL/USDT",
        &bull_reference(),
        three_exchange_pump(),
        &account(0),
        now() + Duration::seconds(30),
    );
    assert_eq!(first, second);
    assert_eq!(strategy.regime_detector().version(), 1);
}

#[test]
fn regime_cache_expires_after_ttl() {
    let strategy = strategy();
    let detector = strategy.regime_detector();

    let first = detector.analyze_at(&bull_reference(), false, now());
    assert_eq!(first.label, RegimeLabel::Bull);

    let cached = detector.analyze_at(&bear_reference(), false, now() + Duration::seconds(299));
    assert_eq!(cached, first);

    let fresh = detector.analyze_at(&bear_reference(), false, now() + Duration::seconds(300));
    assert_eq!(fresh.label, RegimeLabel::Bear);
    assert_eq!(detector.version(), 2);
}

#[test]
fn malformed_exchange_does_not_block_others() {
    let strategy = strategy();
    let mut broken = pump_primary();
    broken[40].close = f64::NAN;

    let mut inputs = three_exchange_pump();
    inputs.push(frames("coinbase", broken, rising_quarters()));

    let rec = strategy.run_cycle("SOL/USDT", &bull_reference(), inputs, &account(0), now());
    assert_eq!(rec.side, Side::Long);
    assert!(rec
        .rationale
        .notes
        .iter()
        .any(|n| n.starts_with("coinbase dropped")));
}

#[test]
fn signals_are_independent_of_exchange_order() {
    let strategy = strategy();
    let aggregator = strategy.aggregator();

    let forward = aggregator.collect("SOL/USDT", three_exchange_pump());
    let mut reversed_frames = three_exchange_pump();
    reversed_frames.reverse();
    let reversed = aggregator.collect("SOL/USDT", reversed_frames);

    let a = aggregator.analyze_signals(&forward.platforms, "SOL/USDT", 42);
    let b = aggregator.analyze_signals(&reversed.platforms, "SOL/USDT", 42);
    assert_eq!(a, b);
    assert!(a.iter().all(|s| s.timestamp == 42));
}
