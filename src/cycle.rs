// =============================================================================
// Evaluation Cycle — concurrent candle fan-out feeding the strategy
// =============================================================================
//
// One cycle:
//   1. Fetch the reference series (regime input) once
//   2. Per symbol, fetch primary + confirmation candles from every exchange
//      concurrently (join_all), each fetch bounded by a timeout
//   3. Join, then hand the surviving frames to EntryExitStrategy::run_cycle
//
// A failed or timed-out primary fetch drops that exchange. A failed
// confirmation fetch only removes the confirmation window.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::aggregator::ExchangeFrames;
use crate::config::CycleParams;
use crate::market_data::{Candle, CandleWindow, WindowKey};
use crate::strategy::{AccountState, EntryExitStrategy, Recommendation};

// =============================================================================
// CandleSource
// =============================================================================

/// Anything that can serve normalized candles for one series.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch(
        &self,
        exchange: &str,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>>;
}

/// In-memory candle store, used for replays and tests.
#[derive(Default)]
pub struct MemorySource {
    series: RwLock<HashMap<WindowKey, Vec<Candle>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: WindowKey, candles: Vec<Candle>) {
        self.series.write().insert(key, candles);
    }

    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }
}

#[async_trait]
impl CandleSource for MemorySource {
    async fn fetch(
        &self,
        exchange: &str,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let key = WindowKey {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
        };
        let series = self.series.read();
        let candles = series
            .get(&key)
            .ok_or_else(|| anyhow!("no candles for {key}"))?;
        let start = candles.len().saturating_sub(limit);
        Ok(candles[start..].to_vec())
    }
}

// =============================================================================
// EvaluationCycle
// =============================================================================

pub struct EvaluationCycle {
    source: Arc<dyn CandleSource>,
    strategy: EntryExitStrategy,
    params: CycleParams,
}

impl EvaluationCycle {
    pub fn new(
        source: Arc<dyn CandleSource>,
        strategy: EntryExitStrategy,
        params: CycleParams,
    ) -> Self {
        Self {
            source,
            strategy,
            params,
        }
    }

    pub fn strategy(&self) -> &EntryExitStrategy {
        &self.strategy
    }

    /// Evaluate every symbol concurrently as of `now`.
    pub async fn run_all(
        &self,
        symbols: &[String],
        account: &AccountState,
        now: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        let reference = self.fetch_reference().await;

        let cycles = symbols
            .iter()
            .map(|symbol| self.run_symbol(symbol, &reference, account, now));
        let recommendations = join_all(cycles).await;

        info!(
            symbols = symbols.len(),
            actionable = recommendations.iter().filter(|r| r.is_actionable()).count(),
            "evaluation cycle complete"
        );

        recommendations
    }

    /// Evaluate a single symbol as of `now`.
    pub async fn run(
        &self,
        symbol: &str,
        account: &AccountState,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let reference = self.fetch_reference().await;
        self.run_symbol(symbol, &reference, account, now).await
    }

    async fn run_symbol(
        &self,
        symbol: &str,
        reference: &CandleWindow,
        account: &AccountState,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let frames = self.fetch_frames(symbol).await;
        self.strategy
            .run_cycle(symbol, reference, frames, account, now)
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Reference candles for the regime detector. Any failure yields an empty
    /// window, which classifies as NEUTRAL.
    async fn fetch_reference(&self) -> CandleWindow {
        let p = &self.params;
        let fetched = self
            .fetch_with_timeout(
                &p.reference_exchange,
                &p.reference_symbol,
                &p.reference_timeframe,
                p.reference_limit,
            )
            .await
            .and_then(|candles| CandleWindow::new(candles).map_err(anyhow::Error::from));

        match fetched {
            Ok(window) => window,
            Err(e) => {
                warn!(
                    exchange = %p.reference_exchange,
                    symbol = %p.reference_symbol,
                    error = %e,
                    "reference fetch failed, regime will be NEUTRAL"
                );
                CandleWindow::default()
            }
        }
    }

    /// Fan out to every configured exchange and join before returning.
    async fn fetch_frames(&self, symbol: &str) -> Vec<ExchangeFrames> {
        let fetches = self
            .params
            .exchanges
            .iter()
            .map(|exchange| self.fetch_exchange(exchange, symbol));

        let frames: Vec<ExchangeFrames> = join_all(fetches).await.into_iter().flatten().collect();

        debug!(
            symbol,
            requested = self.params.exchanges.len(),
            received = frames.len(),
            "exchange frames fetched"
        );

        frames
    }

    async fn fetch_exchange(&self, exchange: &str, symbol: &str) -> Option<ExchangeFrames> {
        let p = &self.params;
        let (primary, confirmation) = futures_util::join!(
            self.fetch_with_timeout(exchange, symbol, &p.primary_timeframe, p.primary_limit),
            self.fetch_with_timeout(
                exchange,
                symbol,
                &p.confirmation_timeframe,
                p.confirmation_limit
            ),
        );

        let primary = match primary {
            Ok(candles) => candles,
            Err(e) => {
                warn!(exchange, symbol, error = %e, "primary fetch failed, exchange dropped");
                return None;
            }
        };

        let confirmation = match confirmation {
            Ok(candles) => Some(candles),
            Err(e) => {
                debug!(exchange, symbol, error = %e, "confirmation fetch failed");
                None
            }
        };

        Some(ExchangeFrames {
            exchange: exchange.to_string(),
            primary,
            confirmation,
        })
    }

    async fn fetch_with_timeout(
        &self,
        exchange: &str,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let timeout = Duration::from_secs(self.params.fetch_timeout_secs);
        match tokio::time::timeout(timeout, self.source.fetch(exchange, symbol, timeframe, limit))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(anyhow!(
                "fetch {exchange}:{symbol}@{timeframe} timed out after {}s",
                timeout.as_secs()
            )),
        }
    }
}
