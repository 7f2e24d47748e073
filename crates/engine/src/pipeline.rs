//! One analysis cycle against the external collaborators
//!
//! The engine never fetches or delivers anything itself. These traits
//! describe the price source and notification sink it is wired to, and
//! `run_cycle` performs a single fetch → evaluate → deliver pass. The
//! repeating scheduler loop, retries, and provider fallback live with
//! the collaborators, outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::engine::SignalEngine;
use crate::types::{Bar, MarketSummary, Signal, SignalDecision};

/// Market-data boundary. Implementations do network I/O and are expected
/// to fail sometimes; an error or an empty batch skips the cycle.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Most recent window of bars, ordered oldest first
    async fn fetch_bars(&self) -> anyhow::Result<Vec<Bar>>;
}

/// Delivery boundary. The boolean is a delivery confirmation, used only
/// to decide whether the emission throttle advances.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_signal(&self, signal: &Signal) -> bool;
    async fn send_summary(&self, summary: &MarketSummary) -> bool;
}

/// What one analysis cycle ended up doing
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Signal delivered and the throttle advanced
    Delivered(Signal),
    /// The sink rejected the signal; the throttle was left untouched
    DeliveryFailed(Signal),
    /// Qualifying signal held back by the throttle
    Suppressed(Signal),
    /// Nothing qualified this cycle
    NoSignal,
    /// The price source produced no usable data
    SourceUnavailable,
}

async fn fetch_window(source: &dyn PriceSource) -> Option<Vec<Bar>> {
    match source.fetch_bars().await {
        Ok(bars) if !bars.is_empty() => Some(bars),
        Ok(_) => {
            warn!("price source returned an empty batch");
            None
        }
        Err(err) => {
            error!(error = %err, "failed to fetch market data");
            None
        }
    }
}

/// Run one fetch → evaluate → deliver cycle.
pub async fn run_cycle(
    engine: &mut SignalEngine,
    source: &dyn PriceSource,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> CycleOutcome {
    let Some(bars) = fetch_window(source).await else {
        return CycleOutcome::SourceUnavailable;
    };

    match engine.evaluate_bars(&bars, now) {
        SignalDecision::Eligible(signal) => {
            if sink.send_signal(&signal).await {
                engine.record_emission(now);
                info!(
                    direction = ?signal.direction,
                    confidence = signal.confidence,
                    "signal delivered"
                );
                CycleOutcome::Delivered(signal)
            } else {
                error!("notification sink rejected the signal");
                CycleOutcome::DeliveryFailed(signal)
            }
        }
        SignalDecision::Suppressed(signal) => CycleOutcome::Suppressed(signal),
        SignalDecision::NoSignal => CycleOutcome::NoSignal,
    }
}

/// Run one fetch → summarize → deliver pass for the periodic status
/// update path. Summaries are not throttled.
pub async fn run_summary_cycle(
    engine: &SignalEngine,
    source: &dyn PriceSource,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> Option<MarketSummary> {
    let bars = fetch_window(source).await?;
    let summary = engine.summarize(&bars, now)?;
    if !sink.send_summary(&summary).await {
        error!("notification sink rejected the summary");
    }
    Some(summary)
}
