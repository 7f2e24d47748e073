//! Technical indicator primitives
//!
//! Pure functions over a finite series of closes (highs/lows where true
//! range is involved). Every function returns `None` when the series is
//! shorter than the indicator's minimum sample requirement or when the
//! consulted window contains a non-finite value: "unavailable" is an
//! expected state, not an error. Zero periods are construction bugs and
//! panic.

use crate::types::{BollingerBands, Macd, TrendState};

/// MACD fast EMA period
pub const MACD_FAST: usize = 12;
/// MACD slow EMA period
pub const MACD_SLOW: usize = 26;
/// MACD signal-line EMA period
pub const MACD_SIGNAL: usize = 9;

/// Default RSI lookback
pub const RSI_PERIOD: usize = 14;
/// Default ATR lookback
pub const ATR_PERIOD: usize = 14;
/// Default Bollinger lookback
pub const BOLLINGER_PERIOD: usize = 20;
/// Default Bollinger band width in standard deviations
pub const BOLLINGER_K: f64 = 2.0;
/// Default volatility lookback
pub const VOLATILITY_PERIOD: usize = 20;

/// Trend detector SMA periods and percentage threshold
const TREND_SHORT: usize = 5;
const TREND_LONG: usize = 10;
const TREND_THRESHOLD_PCT: f64 = 0.5;

fn window_is_finite(window: &[f64]) -> bool {
    window.iter().all(|v| v.is_finite())
}

// ============================================================================
// Moving averages
// ============================================================================

/// Simple Moving Average: arithmetic mean of the last `period` closes
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    assert!(period > 0, "SMA period must be positive");
    if closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    if !window_is_finite(window) {
        return None;
    }
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential Moving Average over the last `period` closes.
///
/// Seeded with the oldest close of the window, then the standard
/// recurrence `ema = price * alpha + ema * (1 - alpha)` with
/// `alpha = 2 / (period + 1)` over the remaining points.
pub fn ema(closes: &[f64], period: usize) -> Option<f64> {
    assert!(period > 0, "EMA period must be positive");
    if closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    if !window_is_finite(window) {
        return None;
    }
    Some(ema_seeded(window, period))
}

/// EMA recurrence seeded at `window[0]`. The window may hold fewer points
/// than `period` while a derived series (the MACD line) is still warming up.
fn ema_seeded(window: &[f64], period: usize) -> f64 {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut value = window[0];
    for &price in &window[1..] {
        value = price * alpha + value * (1.0 - alpha);
    }
    value
}

// ============================================================================
// Oscillators
// ============================================================================

/// Relative Strength Index over the last `period` close-to-close deltas.
///
/// Uses simple averages of gains and absolute losses (zero-change bars
/// count into both denominators). A window with no losses clamps to 100.
/// Requires `period + 1` closes to form `period` deltas.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    assert!(period > 0, "RSI period must be positive");
    if closes.len() < period + 1 {
        return None;
    }
    let window = &closes[closes.len() - (period + 1)..];
    if !window_is_finite(window) {
        return None;
    }

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum += -change;
        }
    }

    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD(12, 26, 9).
///
/// The macd line is `ema(12) - ema(26)` evaluated for every prefix long
/// enough to carry both EMAs; the signal line is a 9-period EMA over those
/// macd points, seeded at the oldest available one while the line is
/// shorter than 9.
pub fn macd(closes: &[f64]) -> Option<Macd> {
    if closes.len() < MACD_SLOW {
        return None;
    }

    let mut line = Vec::with_capacity(closes.len() - MACD_SLOW + 1);
    for end in MACD_SLOW..=closes.len() {
        let prefix = &closes[..end];
        let fast = ema(prefix, MACD_FAST)?;
        let slow = ema(prefix, MACD_SLOW)?;
        line.push(fast - slow);
    }

    let macd_line = *line.last()?;
    let tail_start = line.len().saturating_sub(MACD_SIGNAL);
    let signal = ema_seeded(&line[tail_start..], MACD_SIGNAL);

    Some(Macd {
        macd: macd_line,
        signal,
        histogram: macd_line - signal,
    })
}

// ============================================================================
// Volatility
// ============================================================================

/// Bollinger bands: SMA middle, `k` sample standard deviations either side
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> Option<BollingerBands> {
    assert!(period > 0, "Bollinger period must be positive");
    if closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    if !window_is_finite(window) {
        return None;
    }

    let middle = window.iter().sum::<f64>() / period as f64;
    let band = k * sample_std_dev(window);

    Some(BollingerBands {
        upper: middle + band,
        middle,
        lower: middle - band,
    })
}

/// Average True Range: mean of the last `period` true ranges.
///
/// Needs `period + 1` bars since each true range consults the previous
/// close. Mismatched input lengths are treated as unavailable data.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    assert!(period > 0, "ATR period must be positive");
    let len = closes.len();
    if len < period + 1 || highs.len() != len || lows.len() != len {
        return None;
    }

    let start = len - (period + 1);
    if !window_is_finite(&highs[start..])
        || !window_is_finite(&lows[start..])
        || !window_is_finite(&closes[start..])
    {
        return None;
    }

    let mut tr_sum = 0.0;
    for i in start + 1..len {
        let tr = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());
        tr_sum += tr;
    }

    Some(tr_sum / period as f64)
}

/// Rolling price volatility: sample standard deviation of the last
/// `period` closes. A single-element window has no deviation and yields 0.
pub fn volatility(closes: &[f64], period: usize) -> Option<f64> {
    assert!(period > 0, "volatility period must be positive");
    if closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    if !window_is_finite(window) {
        return None;
    }
    Some(sample_std_dev(window))
}

fn sample_std_dev(window: &[f64]) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

// ============================================================================
// Trend detection
// ============================================================================

/// Classify the short-term trend by comparing SMA(5) against SMA(10):
/// a percentage gap beyond ±0.5% is a trend, anything inside is sideways.
pub fn detect_trend(closes: &[f64]) -> TrendState {
    if closes.len() < TREND_LONG {
        return TrendState::Unknown;
    }
    let (Some(short), Some(long)) = (sma(closes, TREND_SHORT), sma(closes, TREND_LONG)) else {
        return TrendState::Unknown;
    };

    let difference_pct = (short - long) / long * 100.0;
    if !difference_pct.is_finite() {
        return TrendState::Unknown;
    }

    if difference_pct > TREND_THRESHOLD_PCT {
        TrendState::Uptrend
    } else if difference_pct < -TREND_THRESHOLD_PCT {
        TrendState::Downtrend
    } else {
        TrendState::Sideways
    }
}
