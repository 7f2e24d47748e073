//! Market Signal Engine — technical indicators and rule-based scoring
//!
//! Self-contained crate turning a rolling price series or a batch of
//! OHLCV bars into gated trading signals. Provides:
//! - Batch technical indicators (SMA, EMA, RSI, MACD, Bollinger, ATR)
//!   with explicit "unavailable" semantics for short series
//! - Two scoring rule sets behind one `ScoringStrategy` trait:
//!   fixed-weight scores and ratio-of-votes
//! - A `SignalEngine` owning the rolling close history and the emission
//!   throttle, with confidence and rate gates on every signal
//! - Async collaborator traits for the market-data source and the
//!   notification sink, plus a single-cycle pipeline runner

pub mod buffer;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod pipeline;
pub mod scoring;
pub mod throttle;
pub mod types;

// Re-exports for convenience
pub use buffer::RollingBuffer;
pub use engine::{EngineConfig, SignalEngine};
pub use error::EngineError;
pub use pipeline::{run_cycle, run_summary_cycle, CycleOutcome, NotificationSink, PriceSource};
pub use scoring::{ScoreTally, ScoringStrategy, Verdict, VoteRatio, WeightedScore};
pub use throttle::ThrottleState;
pub use types::*;
