//! Rule-based scoring strategies
//!
//! Provides a `ScoringStrategy` trait and the two rule sets the engine
//! ships with: `WeightedScore` (fixed per-rule weights over the full
//! indicator set) and `VoteRatio` (one vote per rule, ratio-of-votes
//! decision). The two deliberately keep their divergent confidence
//! semantics; callers pick one at engine construction.
//!
//! Every rule is independent and side-effect-free: it reads the
//! indicators, optionally adds to one side of the tally, and appends a
//! reason string. A rule whose indicator is unavailable is skipped
//! entirely and contributes to neither score nor the vote count.

use crate::types::{Direction, IndicatorSet, TrendState};

/// RSI extremes shared by both rule sets
const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
/// Weighted rule set only reports RSI inside this band as "neutral"
const RSI_NEUTRAL_LOW: f64 = 40.0;
const RSI_NEUTRAL_HIGH: f64 = 60.0;

/// Weighted rule set: per-rule contributions
const WEIGHT_SMA_TREND: f64 = 1.0;
const WEIGHT_PRICE_VS_EMA: f64 = 0.5;
const WEIGHT_RSI_EXTREME: f64 = 1.5;
const WEIGHT_MACD: f64 = 1.0;
const WEIGHT_BOLLINGER: f64 = 1.0;

/// Vote rule set: winning side must exceed this share of all votes
const VOTE_WIN_RATIO: f64 = 0.6;
/// Support/resistance proximity zones (position within the range)
const NEAR_SUPPORT: f64 = 0.3;
const NEAR_RESISTANCE: f64 = 0.7;

/// Accumulated buy/sell contributions and the reasons behind them.
///
/// `reasons` preserves evaluation order; `total_signals` counts every
/// rule that was evaluable, including ones that abstained (used by the
/// vote-ratio decision).
#[derive(Debug, Clone, Default)]
pub struct ScoreTally {
    pub buy_score: f64,
    pub sell_score: f64,
    pub total_signals: f64,
    pub reasons: Vec<String>,
}

impl ScoreTally {
    fn buy(&mut self, weight: f64, reason: impl Into<String>) {
        self.buy_score += weight;
        self.reasons.push(reason.into());
    }

    fn sell(&mut self, weight: f64, reason: impl Into<String>) {
        self.sell_score += weight;
        self.reasons.push(reason.into());
    }

    fn note(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    pub fn total_score(&self) -> f64 {
        self.buy_score + self.sell_score
    }
}

/// Outcome of a scoring pass
#[derive(Debug, Clone, Copy)]
pub struct Verdict {
    pub direction: Direction,
    pub confidence: f64,
}

/// A complete rule set: scores a snapshot, then turns the tally into a
/// directional verdict with a confidence value in [0, 1].
pub trait ScoringStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Series length required before this rule set will evaluate
    fn min_samples(&self) -> usize;

    /// Run the ordered rule list against one snapshot
    fn score(
        &self,
        price: f64,
        indicators: &IndicatorSet,
        support_resistance: Option<(f64, f64)>,
    ) -> ScoreTally;

    /// Derive direction and confidence from an accumulated tally
    fn decide(&self, tally: &ScoreTally) -> Verdict;
}

// ============================================================================
// WeightedScore — fixed per-rule weights, full indicator set
// ============================================================================

/// Fixed-weight rule set over SMA trend, EMA, RSI, MACD, and Bollinger
/// bands. Confidence is the winning side's share of the total score; a
/// tie or an empty tally is Neutral with confidence 0.
pub struct WeightedScore;

impl ScoringStrategy for WeightedScore {
    fn name(&self) -> &str {
        "WeightedScore"
    }

    fn min_samples(&self) -> usize {
        50
    }

    fn score(
        &self,
        price: f64,
        indicators: &IndicatorSet,
        _support_resistance: Option<(f64, f64)>,
    ) -> ScoreTally {
        let mut tally = ScoreTally::default();

        // Trend: whichever SMA is on top carries the vote
        if let (Some(sma_20), Some(sma_50)) = (indicators.sma_20, indicators.sma_50) {
            if sma_20 > sma_50 {
                tally.buy(WEIGHT_SMA_TREND, "Bullish trend: SMA(20) > SMA(50)");
            } else {
                tally.sell(WEIGHT_SMA_TREND, "Bearish trend: SMA(20) < SMA(50)");
            }
        }

        // Price relative to the fast EMA
        if let Some(ema_12) = indicators.ema_12 {
            if price > ema_12 {
                tally.buy(WEIGHT_PRICE_VS_EMA, "Price above EMA(12)");
            } else {
                tally.sell(WEIGHT_PRICE_VS_EMA, "Price below EMA(12)");
            }
        }

        // RSI extremes weigh heaviest; the 40-60 band is reported only
        if let Some(rsi) = indicators.rsi {
            if rsi < RSI_OVERSOLD {
                tally.buy(WEIGHT_RSI_EXTREME, format!("RSI oversold: {rsi:.2}"));
            } else if rsi > RSI_OVERBOUGHT {
                tally.sell(WEIGHT_RSI_EXTREME, format!("RSI overbought: {rsi:.2}"));
            } else if (RSI_NEUTRAL_LOW..=RSI_NEUTRAL_HIGH).contains(&rsi) {
                tally.note(format!("RSI neutral: {rsi:.2}"));
            }
        }

        // MACD crossover confirmed by the histogram sign
        if let Some(macd) = indicators.macd {
            if macd.macd > macd.signal && macd.histogram > 0.0 {
                tally.buy(WEIGHT_MACD, "MACD bullish crossover");
            } else if macd.macd < macd.signal && macd.histogram < 0.0 {
                tally.sell(WEIGHT_MACD, "MACD bearish crossover");
            }
        }

        // Band touches
        if let Some(bands) = indicators.bollinger {
            if price <= bands.lower {
                tally.buy(WEIGHT_BOLLINGER, "Price at lower Bollinger Band (oversold)");
            } else if price >= bands.upper {
                tally.sell(WEIGHT_BOLLINGER, "Price at upper Bollinger Band (overbought)");
            }
        }

        tally
    }

    fn decide(&self, tally: &ScoreTally) -> Verdict {
        let total = tally.total_score();
        if total == 0.0 {
            return Verdict {
                direction: Direction::Neutral,
                confidence: 0.0,
            };
        }
        if tally.buy_score > tally.sell_score {
            Verdict {
                direction: Direction::Buy,
                confidence: tally.buy_score / total,
            }
        } else if tally.sell_score > tally.buy_score {
            Verdict {
                direction: Direction::Sell,
                confidence: tally.sell_score / total,
            }
        } else {
            Verdict {
                direction: Direction::Neutral,
                confidence: 0.0,
            }
        }
    }
}

// ============================================================================
// VoteRatio — one vote per rule, ratio-of-votes decision
// ============================================================================

/// One-vote-per-rule set over RSI, SMA crossover, EMA(26), the trend
/// detector, and support/resistance proximity. Every evaluable rule
/// counts toward the vote total whether or not it picks a side; a side
/// wins only with more than 60% of all votes. With no evaluable rules
/// the verdict is Neutral at the no-information confidence 0.5;
/// otherwise an undecided verdict carries `1 - |buy_ratio - sell_ratio|`.
pub struct VoteRatio;

impl ScoringStrategy for VoteRatio {
    fn name(&self) -> &str {
        "VoteRatio"
    }

    fn min_samples(&self) -> usize {
        20
    }

    fn score(
        &self,
        price: f64,
        indicators: &IndicatorSet,
        support_resistance: Option<(f64, f64)>,
    ) -> ScoreTally {
        let mut tally = ScoreTally::default();

        if let Some(rsi) = indicators.rsi {
            tally.total_signals += 1.0;
            if rsi < RSI_OVERSOLD {
                tally.buy(1.0, format!("RSI oversold at {rsi:.1} (< 30)"));
            } else if rsi > RSI_OVERBOUGHT {
                tally.sell(1.0, format!("RSI overbought at {rsi:.1} (> 70)"));
            } else {
                tally.note(format!("RSI neutral at {rsi:.1}"));
            }
        }

        if let (Some(sma_20), Some(sma_50)) = (indicators.sma_20, indicators.sma_50) {
            tally.total_signals += 1.0;
            if sma_20 > sma_50 {
                tally.buy(1.0, "SMA20 > SMA50 (Bullish crossover)");
            } else {
                tally.sell(1.0, "SMA20 < SMA50 (Bearish crossover)");
            }
        }

        if let Some(ema_26) = indicators.ema_26 {
            tally.total_signals += 1.0;
            if price > ema_26 {
                tally.buy(1.0, format!("Price above EMA26 (${ema_26:.2})"));
            } else {
                tally.sell(1.0, format!("Price below EMA26 (${ema_26:.2})"));
            }
        }

        // The trend detector always reports, sideways included
        tally.total_signals += 1.0;
        match indicators.trend {
            TrendState::Uptrend => tally.buy(1.0, "Trend: Uptrend detected"),
            TrendState::Downtrend => tally.sell(1.0, "Trend: Downtrend detected"),
            TrendState::Sideways | TrendState::Unknown => {
                tally.note("Trend: Sideways/Consolidation");
            }
        }

        // Position inside the support/resistance range; a collapsed
        // range has no interior and the rule is skipped
        if let Some((support, resistance)) = support_resistance {
            if resistance > support {
                tally.total_signals += 1.0;
                let position = (price - support) / (resistance - support);
                if position < NEAR_SUPPORT {
                    tally.buy(1.0, format!("Price near support level (${support:.2})"));
                } else if position > NEAR_RESISTANCE {
                    tally.sell(1.0, format!("Price near resistance level (${resistance:.2})"));
                }
            }
        }

        tally
    }

    fn decide(&self, tally: &ScoreTally) -> Verdict {
        if tally.total_signals == 0.0 {
            return Verdict {
                direction: Direction::Neutral,
                confidence: 0.5,
            };
        }

        let buy_ratio = tally.buy_score / tally.total_signals;
        let sell_ratio = tally.sell_score / tally.total_signals;

        if buy_ratio > VOTE_WIN_RATIO {
            Verdict {
                direction: Direction::Buy,
                confidence: buy_ratio,
            }
        } else if sell_ratio > VOTE_WIN_RATIO {
            Verdict {
                direction: Direction::Sell,
                confidence: sell_ratio,
            }
        } else {
            Verdict {
                direction: Direction::Neutral,
                confidence: 1.0 - (buy_ratio - sell_ratio).abs(),
            }
        }
    }
}
