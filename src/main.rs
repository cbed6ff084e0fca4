// =============================================================================
// flowgate — Replay Entry Point
// =============================================================================
//
// Usage: flowgate <snapshot.json>
//
// Loads a candle snapshot, serves it through the in-memory candle source,
// runs one evaluation cycle for every symbol concurrently and prints each
// recommendation as JSON on stdout.
// =============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowgate::cycle::{CandleSource, EvaluationCycle, MemorySource};
use flowgate::market_data::{Candle, WindowKey};
use flowgate::{AccountState, EngineConfig, EntryExitStrategy, MarketRegimeDetector};

const DEFAULT_CONFIG_PATH: &str = "flowgate.json";

/// Candles recorded for one exchange.
#[derive(Debug, Deserialize)]
struct RecordedFrames {
    primary: Vec<Candle>,
    #[serde(default)]
    confirmation: Option<Vec<Candle>>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    /// Reference series for regime classification.
    reference: Vec<Candle>,
    /// symbol -> exchange -> frames
    symbols: BTreeMap<String, BTreeMap<String, RecordedFrames>>,
    account: AccountState,
    /// Evaluation time; wall clock when absent.
    #[serde(default)]
    now: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("FLOWGATE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = EngineConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, path = %config_path, "failed to load config, using defaults");
        EngineConfig::default()
    });

    // ── 2. Snapshot ──────────────────────────────────────────────────────
    let Some(snapshot_path) = std::env::args().nth(1) else {
        bail!("usage: flowgate <snapshot.json>");
    };
    let content = std::fs::read_to_string(&snapshot_path)
        .with_context(|| format!("failed to read snapshot {snapshot_path}"))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot {snapshot_path}"))?;

    // ── 3. In-memory candle source ───────────────────────────────────────
    let cycle_params = config.cycle.clone();
    let source = MemorySource::new();
    source.insert(
        WindowKey {
            exchange: cycle_params.reference_exchange.clone(),
            symbol: cycle_params.reference_symbol.clone(),
            timeframe: cycle_params.reference_timeframe.clone(),
        },
        snapshot.reference,
    );

    let mut exchanges: Vec<String> = Vec::new();
    for (symbol, per_exchange) in &snapshot.symbols {
        for (exchange, frames) in per_exchange {
            if !exchanges.contains(exchange) {
                exchanges.push(exchange.clone());
            }
            source.insert(
                WindowKey {
                    exchange: exchange.clone(),
                    symbol: symbol.clone(),
                    timeframe: cycle_params.primary_timeframe.clone(),
                },
                frames.primary.clone(),
            );
            if let Some(confirmation) = &frames.confirmation {
                source.insert(
                    WindowKey {
                        exchange: exchange.clone(),
                        symbol: symbol.clone(),
                        timeframe: cycle_params.confirmation_timeframe.clone(),
                    },
                    confirmation.clone(),
                );
            }
        }
    }
    exchanges.sort();

    info!(
        snapshot = %snapshot_path,
        symbols = snapshot.symbols.len(),
        exchanges = ?exchanges,
        series = source.len(),
        "snapshot loaded"
    );

    // ── 4. Run one cycle ─────────────────────────────────────────────────
    let mut cycle_params = cycle_params;
    cycle_params.exchanges = exchanges;

    let regime = Arc::new(MarketRegimeDetector::new(config.regime.clone()));
    let strategy = EntryExitStrategy::new(&config, regime);
    let source: Arc<dyn CandleSource> = Arc::new(source);
    let cycle = EvaluationCycle::new(source, strategy, cycle_params);

    let symbols: Vec<String> = snapshot.symbols.keys().cloned().collect();
    let now = snapshot.now.unwrap_or_else(Utc::now);
    let recommendations = cycle.run_all(&symbols, &snapshot.account, now).await;

    // ── 5. Output ────────────────────────────────────────────────────────
    for recommendation in &recommendations {
        let line =
            serde_json::to_string(recommendation).context("failed to serialise recommendation")?;
        println!("{line}");
    }

    Ok(())
}
