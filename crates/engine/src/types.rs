//! Types for the signal engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single candlestick (OHLCV)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    /// Open time in epoch milliseconds; sequences are strictly increasing
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Directional call of an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Neutral,
}

/// Short-vs-long SMA trend classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendState {
    Uptrend,
    Downtrend,
    Sideways,
    Unknown,
}

impl Default for TrendState {
    fn default() -> Self {
        TrendState::Unknown
    }
}

/// MACD line, signal line, and their difference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Bollinger band triple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Every indicator the engine computes for one evaluation.
///
/// `None` means "unavailable": the series was too short (or contained
/// non-finite values) for that indicator. Scoring rules skip unavailable
/// indicators entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub bollinger: Option<BollingerBands>,
    pub atr: Option<f64>,
    pub volatility: Option<f64>,
    pub trend: TrendState,
}

/// Trading levels attached to a signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Levels {
    pub support: f64,
    pub resistance: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// A fully scored trading signal.
///
/// Built fresh on every evaluation cycle and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Winning-side share of the total score, in [0, 1]
    pub confidence: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub indicators: IndicatorSet,
    pub levels: Levels,
    /// Rule explanations in evaluation order
    pub reasons: Vec<String>,
    pub buy_score: f64,
    pub sell_score: f64,
}

/// Lightweight market snapshot for periodic status updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummary {
    pub current_price: f64,
    /// Percent change between the first and last close of the window
    pub price_change_pct: f64,
    pub sma_20: Option<f64>,
    pub rsi: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one engine evaluation.
///
/// `Suppressed` carries the computed signal so callers can observe
/// throttled evaluations separately from cycles that produced nothing.
#[derive(Debug, Clone)]
pub enum SignalDecision {
    /// Qualifying signal, ready for delivery
    Eligible(Signal),
    /// Qualifying signal held back by the throttle
    Suppressed(Signal),
    /// Insufficient data, or confidence below the configured threshold
    NoSignal,
}

impl SignalDecision {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            SignalDecision::Eligible(signal) | SignalDecision::Suppressed(signal) => Some(signal),
            SignalDecision::NoSignal => None,
        }
    }
}
