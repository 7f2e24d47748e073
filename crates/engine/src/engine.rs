//! Signal evaluation engine
//!
//! Turns a price/bar series into a scored directional decision:
//! indicators → scoring rules → trading levels → emission gates. The
//! engine owns the rolling close history (streaming mode) and the
//! emission throttle; evaluation itself is a pure computation over one
//! series snapshot.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::buffer::RollingBuffer;
use crate::error::EngineError;
use crate::indicators::{
    self, ATR_PERIOD, BOLLINGER_K, BOLLINGER_PERIOD, RSI_PERIOD, VOLATILITY_PERIOD,
};
use crate::scoring::{ScoringStrategy, VoteRatio, WeightedScore};
use crate::throttle::ThrottleState;
use crate::types::{
    Bar, Direction, IndicatorSet, Levels, MarketSummary, Signal, SignalDecision,
};

/// Window used for support/resistance extraction
const LEVEL_WINDOW: usize = 20;
/// Fallback level offsets when the window is too short
const SUPPORT_FALLBACK_PCT: f64 = 0.98;
const RESISTANCE_FALLBACK_PCT: f64 = 1.02;
/// ATR multiples for the protective levels
const STOP_ATR_MULT: f64 = 2.0;
const TARGET_ATR_MULT: f64 = 3.0;
/// Bars required by the market summary
const SUMMARY_MIN_BARS: usize = 20;

/// Engine construction parameters
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum winning-side confidence required to emit, in [0, 1]
    pub confidence_threshold: f64,
    /// Minimum spacing between emitted signals, in seconds
    pub min_signal_interval_secs: i64,
    /// Rolling close-history capacity for streaming mode
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            min_signal_interval_secs: 1800,
            history_capacity: 100,
        }
    }
}

/// One immutable snapshot of the series under evaluation. Streaming mode
/// has closes only; batch mode carries highs/lows for ATR and levels.
struct SeriesView<'a> {
    closes: &'a [f64],
    highs: Option<&'a [f64]>,
    lows: Option<&'a [f64]>,
}

/// Signal engine: computes indicators, runs a scoring strategy, derives
/// trading levels, and gates emission on confidence and the throttle.
pub struct SignalEngine {
    strategy: Box<dyn ScoringStrategy>,
    config: EngineConfig,
    history: RollingBuffer,
    throttle: ThrottleState,
}

impl SignalEngine {
    pub fn new(
        strategy: Box<dyn ScoringStrategy>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        if !(0.0..=1.0).contains(&config.confidence_threshold) {
            return Err(EngineError::InvalidConfidenceThreshold(
                config.confidence_threshold,
            ));
        }
        if config.min_signal_interval_secs < 0 {
            return Err(EngineError::InvalidSignalInterval(
                config.min_signal_interval_secs,
            ));
        }
        if config.history_capacity == 0 {
            return Err(EngineError::InvalidHistoryCapacity);
        }

        let history = RollingBuffer::new(config.history_capacity);
        let throttle = ThrottleState::new(Duration::seconds(config.min_signal_interval_secs));

        Ok(Self {
            strategy,
            config,
            history,
            throttle,
        })
    }

    /// Engine with the fixed-weight multi-indicator rule set
    pub fn weighted(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(Box::new(WeightedScore), config)
    }

    /// Engine with the ratio-of-votes rule set
    pub fn vote_ratio(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(Box::new(VoteRatio), config)
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_signal_time(&self) -> Option<DateTime<Utc>> {
        self.throttle.last_signal_time()
    }

    /// Append one close to the rolling history without evaluating
    pub fn observe(&mut self, price: f64) {
        self.history.push(price);
    }

    /// Streaming evaluation: append `price`, then evaluate the rolling
    /// close history. Highs/lows are unknown here, so ATR stays
    /// unavailable and levels come from close extremes.
    pub fn evaluate_price(&mut self, price: f64, now: DateTime<Utc>) -> SignalDecision {
        self.observe(price);
        let view = SeriesView {
            closes: self.history.prices(),
            highs: None,
            lows: None,
        };
        let computed = compute_signal(&*self.strategy, &view, now);
        self.apply_gates(computed, now)
    }

    /// Batch evaluation over an externally supplied series of bars,
    /// ordered oldest first. Does not touch the rolling history.
    pub fn evaluate_bars(&self, bars: &[Bar], now: DateTime<Utc>) -> SignalDecision {
        let closes: Vec<f64> = bars.iter().map(|b| decimal_f64(b.close)).collect();
        let highs: Vec<f64> = bars.iter().map(|b| decimal_f64(b.high)).collect();
        let lows: Vec<f64> = bars.iter().map(|b| decimal_f64(b.low)).collect();
        let view = SeriesView {
            closes: &closes,
            highs: Some(&highs),
            lows: Some(&lows),
        };
        let computed = compute_signal(&*self.strategy, &view, now);
        self.apply_gates(computed, now)
    }

    /// Advance the throttle once a signal has actually been delivered.
    /// Kept separate from evaluation so that a failed delivery does not
    /// consume the emission window.
    pub fn record_emission(&mut self, at: DateTime<Utc>) {
        self.throttle.record_emission(at);
    }

    /// Lightweight market snapshot for periodic status updates: no
    /// scoring, no thresholding, no throttle interaction.
    pub fn summarize(&self, bars: &[Bar], now: DateTime<Utc>) -> Option<MarketSummary> {
        if bars.len() < SUMMARY_MIN_BARS {
            return None;
        }
        let closes: Vec<f64> = bars.iter().map(|b| decimal_f64(b.close)).collect();
        let first = *closes.first()?;
        let current_price = *closes.last()?;

        Some(MarketSummary {
            current_price,
            price_change_pct: (current_price - first) / first * 100.0,
            sma_20: indicators::sma(&closes, 20),
            rsi: indicators::rsi(&closes, RSI_PERIOD),
            timestamp: now,
        })
    }

    fn apply_gates(&self, computed: Option<Signal>, now: DateTime<Utc>) -> SignalDecision {
        let Some(signal) = computed else {
            return SignalDecision::NoSignal;
        };

        if signal.confidence < self.config.confidence_threshold {
            info!(
                strategy = self.strategy.name(),
                confidence = signal.confidence,
                threshold = self.config.confidence_threshold,
                "confidence below threshold, discarding signal"
            );
            return SignalDecision::NoSignal;
        }

        if !self.throttle.allows(now) {
            info!(
                direction = ?signal.direction,
                wait_secs = self.throttle.remaining(now).num_seconds(),
                "signal computed but suppressed by throttle"
            );
            return SignalDecision::Suppressed(signal);
        }

        info!(
            direction = ?signal.direction,
            confidence = signal.confidence,
            price = signal.price,
            "signal qualifies for emission"
        );
        SignalDecision::Eligible(signal)
    }
}

/// Pure evaluation over one series snapshot: indicator set, scoring,
/// levels. Returns `None` when the series is shorter than the strategy
/// requires; insufficient data is an expected state, not an error.
fn compute_signal(
    strategy: &dyn ScoringStrategy,
    view: &SeriesView<'_>,
    now: DateTime<Utc>,
) -> Option<Signal> {
    let closes = view.closes;
    if closes.len() < strategy.min_samples() {
        debug!(
            samples = closes.len(),
            required = strategy.min_samples(),
            "insufficient history, skipping evaluation"
        );
        return None;
    }
    let price = *closes.last()?;

    let atr = match (view.highs, view.lows) {
        (Some(highs), Some(lows)) => indicators::atr(highs, lows, closes, ATR_PERIOD),
        _ => None,
    };
    let indicators = IndicatorSet {
        sma_20: indicators::sma(closes, 20),
        sma_50: indicators::sma(closes, 50),
        ema_12: indicators::ema(closes, 12),
        ema_26: indicators::ema(closes, 26),
        rsi: indicators::rsi(closes, RSI_PERIOD),
        macd: indicators::macd(closes),
        bollinger: indicators::bollinger(closes, BOLLINGER_PERIOD, BOLLINGER_K),
        atr,
        volatility: indicators::volatility(closes, VOLATILITY_PERIOD),
        trend: indicators::detect_trend(closes),
    };

    let (support, resistance) = support_resistance(view, price);
    let tally = strategy.score(price, &indicators, Some((support, resistance)));
    let verdict = strategy.decide(&tally);
    let levels = protective_levels(verdict.direction, price, indicators.atr, support, resistance);

    Some(Signal {
        direction: verdict.direction,
        confidence: verdict.confidence,
        price,
        timestamp: now,
        indicators,
        levels,
        reasons: tally.reasons,
        buy_score: tally.buy_score,
        sell_score: tally.sell_score,
    })
}

/// Support and resistance from the extremes of the last 20 bars; close
/// extremes when highs/lows are unknown; fixed percentage offsets when
/// the window is too short to mean anything.
fn support_resistance(view: &SeriesView<'_>, price: f64) -> (f64, f64) {
    let closes = view.closes;
    if closes.len() < LEVEL_WINDOW {
        return (
            price * SUPPORT_FALLBACK_PCT,
            price * RESISTANCE_FALLBACK_PCT,
        );
    }

    let lows = match view.lows {
        Some(lows) if lows.len() == closes.len() => lows,
        _ => closes,
    };
    let highs = match view.highs {
        Some(highs) if highs.len() == closes.len() => highs,
        _ => closes,
    };

    let support = lows[lows.len() - LEVEL_WINDOW..]
        .iter()
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let resistance = highs[highs.len() - LEVEL_WINDOW..]
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    (support, resistance)
}

/// Stop-loss / take-profit: ATR multiples when volatility is known,
/// otherwise the raw levels themselves, both oriented by direction
/// (non-buy directions take the sell-side orientation).
fn protective_levels(
    direction: Direction,
    price: f64,
    atr: Option<f64>,
    support: f64,
    resistance: f64,
) -> Levels {
    let (stop_loss, take_profit) = match atr {
        Some(atr) => {
            if direction == Direction::Buy {
                (price - STOP_ATR_MULT * atr, price + TARGET_ATR_MULT * atr)
            } else {
                (price + STOP_ATR_MULT * atr, price - TARGET_ATR_MULT * atr)
            }
        }
        None => {
            if direction == Direction::Buy {
                (support, resistance)
            } else {
                (resistance, support)
            }
        }
    };

    Levels {
        support,
        resistance,
        stop_loss,
        take_profit,
    }
}

/// Decimal → f64 at the indicator boundary; unrepresentable values
/// become NaN and degrade to "unavailable" downstream.
fn decimal_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_bars(prices: &[f64]) -> Vec<Bar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let price = Decimal::from_str_exact(&format!("{:.2}", p)).unwrap();
                Bar {
                    timestamp: (i as i64) * 60000,
                    open: price,
                    high: price + dec!(1),
                    low: price - dec!(1),
                    close: price,
                    volume: dec!(100),
                }
            })
            .collect()
    }

    fn uptrend_bars(n: usize) -> Vec<Bar> {
        let prices: Vec<f64> = (0..n).map(|i| 2000.0 + i as f64 * 0.5).collect();
        make_bars(&prices)
    }

    /// Rising market built from alternating +2 / -1 steps. The pullbacks
    /// keep RSI out of both extreme zones (exactly 7 gains of 2 against
    /// 7 losses of 1 in any 14-delta window), so the bullish trend rules
    /// decide the direction on their own.
    fn zigzag_up_bars(n: usize) -> Vec<Bar> {
        let mut prices = Vec::with_capacity(n);
        let mut price = 2000.0;
        for i in 0..n {
            prices.push(price);
            price += if i % 2 == 0 { 2.0 } else { -1.0 };
        }
        make_bars(&prices)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn permissive_config() -> EngineConfig {
        EngineConfig {
            confidence_threshold: 0.0,
            min_signal_interval_secs: 600,
            history_capacity: 100,
        }
    }

    #[test]
    fn test_uptrend_never_reports_sell() {
        let engine = SignalEngine::weighted(permissive_config()).unwrap();
        let bars = uptrend_bars(100);

        let decision = engine.evaluate_bars(&bars[..61], at(0));
        let signal = decision.signal().expect("uptrend should produce a signal");

        assert_ne!(signal.direction, Direction::Sell);
        let sma_20 = signal.indicators.sma_20.unwrap();
        assert!(sma_20 < signal.price, "SMA(20) should trail a rising price");
    }

    #[test]
    fn test_zigzag_uptrend_emits_buy_at_default_threshold() {
        let engine = SignalEngine::weighted(EngineConfig::default()).unwrap();
        let bars = zigzag_up_bars(80);

        let decision = engine.evaluate_bars(&bars, at(0));
        let signal = match decision {
            SignalDecision::Eligible(signal) => signal,
            other => panic!("expected an eligible signal, got {other:?}"),
        };
        assert_eq!(signal.direction, Direction::Buy);
        assert!(signal.confidence >= 0.6);
        assert_eq!(signal.reasons[0], "Bullish trend: SMA(20) > SMA(50)");
        assert_eq!(signal.reasons[1], "Price above EMA(12)");
    }

    #[test]
    fn test_insufficient_history_is_no_signal() {
        let engine = SignalEngine::weighted(permissive_config()).unwrap();
        let bars = uptrend_bars(30);
        assert!(matches!(
            engine.evaluate_bars(&bars, at(0)),
            SignalDecision::NoSignal
        ));
    }

    /// Feed 25 rising closes into a vote-ratio engine. RSI pins
    /// overbought (sell), the price sits at the top of its range (sell),
    /// the 0.25% SMA gap reads sideways, and SMA(50)/EMA(26) are still
    /// unavailable: 2 sell votes out of 3 for a confidence of exactly 2/3.
    fn run_rising_stream(engine: &mut SignalEngine) -> SignalDecision {
        let mut decision = SignalDecision::NoSignal;
        for i in 0..25 {
            decision = engine.evaluate_price(2000.0 + i as f64 * 2.0, at(i));
        }
        decision
    }

    #[test]
    fn test_confidence_gate_discards_weak_signals() {
        let strict = EngineConfig {
            confidence_threshold: 0.7,
            ..EngineConfig::default()
        };
        let mut engine = SignalEngine::vote_ratio(strict).unwrap();
        // Confidence 2/3 is a real signal, just not a confident one
        assert!(matches!(
            run_rising_stream(&mut engine),
            SignalDecision::NoSignal
        ));

        let lenient = EngineConfig {
            confidence_threshold: 0.6,
            ..EngineConfig::default()
        };
        let mut engine = SignalEngine::vote_ratio(lenient).unwrap();
        let decision = run_rising_stream(&mut engine);
        let signal = decision.signal().expect("2/3 clears a 0.6 threshold");
        assert_eq!(signal.direction, Direction::Sell);
        assert!((signal.confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let engine = SignalEngine::weighted(permissive_config()).unwrap();
        let bars = uptrend_bars(80);

        let first = engine.evaluate_bars(&bars, at(42));
        let second = engine.evaluate_bars(&bars, at(42));

        let a = first.signal().unwrap();
        let b = second.signal().unwrap();
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.buy_score, b.buy_score);
        assert_eq!(a.sell_score, b.sell_score);
        assert_eq!(a.reasons, b.reasons);
    }

    #[test]
    fn test_throttle_suppresses_then_reopens() {
        let mut engine = SignalEngine::weighted(permissive_config()).unwrap();
        let bars = uptrend_bars(100);

        let first = engine.evaluate_bars(&bars, at(0));
        assert!(matches!(first, SignalDecision::Eligible(_)));
        engine.record_emission(at(0));

        // Inside the 600s window the signal is computed but suppressed
        let second = engine.evaluate_bars(&bars, at(599));
        assert!(matches!(second, SignalDecision::Suppressed(_)));
        assert!(second.signal().is_some());

        // At the boundary the window reopens
        let third = engine.evaluate_bars(&bars, at(600));
        assert!(matches!(third, SignalDecision::Eligible(_)));
    }

    #[test]
    fn test_atr_levels_in_batch_mode() {
        let engine = SignalEngine::weighted(permissive_config()).unwrap();
        let bars = zigzag_up_bars(80);

        let decision = engine.evaluate_bars(&bars, at(0));
        let signal = decision.signal().unwrap();

        // Bars carry high = close + 1 and low = close - 1, so the true
        // ranges alternate 3 (after a +2 step) and 2 (after a -1 step):
        // any 14 of them average to exactly 2.5
        let atr = signal.indicators.atr.unwrap();
        assert!((atr - 2.5).abs() < 1e-9);
        assert_eq!(signal.direction, Direction::Buy);
        assert!((signal.levels.stop_loss - (signal.price - 5.0)).abs() < 1e-9);
        assert!((signal.levels.take_profit - (signal.price + 7.5)).abs() < 1e-9);

        // Support/resistance from the extremes of the last 20 bars
        assert!((signal.levels.support - (signal.price - 12.0)).abs() < 1e-9);
        assert!((signal.levels.resistance - (signal.price + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_streaming_mode_falls_back_to_range_levels() {
        let mut engine = SignalEngine::vote_ratio(permissive_config()).unwrap();
        let mut decision = SignalDecision::NoSignal;
        for i in 0..25 {
            decision = engine.evaluate_price(2000.0 + i as f64 * 2.0, at(i));
        }

        let signal = decision.signal().expect("25 closes satisfy the vote gate");
        // No highs/lows in streaming mode: ATR unavailable, levels come
        // from close extremes, oriented by the non-buy direction
        assert!(signal.indicators.atr.is_none());
        assert_eq!(signal.levels.stop_loss, signal.levels.resistance);
        assert_eq!(signal.levels.take_profit, signal.levels.support);
    }

    #[test]
    fn test_streaming_history_is_bounded() {
        let config = EngineConfig {
            history_capacity: 10,
            ..permissive_config()
        };
        let mut engine = SignalEngine::vote_ratio(config).unwrap();
        for i in 0..37 {
            engine.observe(2000.0 + i as f64);
        }
        assert_eq!(engine.history_len(), 10);
    }

    #[test]
    fn test_summary_contents() {
        let engine = SignalEngine::weighted(EngineConfig::default()).unwrap();
        let bars = uptrend_bars(40);

        let summary = engine.summarize(&bars, at(7)).unwrap();
        assert!((summary.current_price - 2019.5).abs() < 1e-9);
        let expected_change = (2019.5 - 2000.0) / 2000.0 * 100.0;
        assert!((summary.price_change_pct - expected_change).abs() < 1e-9);
        assert!(summary.sma_20.is_some());
        assert!(summary.rsi.is_some());
        assert_eq!(summary.timestamp, at(7));

        assert!(engine.summarize(&bars[..19], at(7)).is_none());
    }

    #[test]
    fn test_short_window_levels_fall_back_to_percent_offsets() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let view = SeriesView {
            closes: &closes,
            highs: None,
            lows: None,
        };
        let (support, resistance) = support_resistance(&view, 109.0);
        assert!((support - 109.0 * 0.98).abs() < 1e-9);
        assert!((resistance - 109.0 * 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            SignalEngine::weighted(EngineConfig {
                confidence_threshold: 1.5,
                ..EngineConfig::default()
            }),
            Err(EngineError::InvalidConfidenceThreshold(_))
        ));
        assert!(matches!(
            SignalEngine::weighted(EngineConfig {
                min_signal_interval_secs: -1,
                ..EngineConfig::default()
            }),
            Err(EngineError::InvalidSignalInterval(_))
        ));
        assert!(matches!(
            SignalEngine::weighted(EngineConfig {
                history_capacity: 0,
                ..EngineConfig::default()
            }),
            Err(EngineError::InvalidHistoryCapacity)
        ));
    }
}
