use crate::Analyzer;
use crate::error::AnalyzerError;
use crate::stats::{self, to_f64};
use configuration::TechnicalsParams;
use core_types::{Direction, PriceBar, Signal, SignalDetails, TechnicalDetails};
use ta::indicators::{
    BollingerBands, FastStochastic, MovingAverageConvergenceDivergence as Macd,
    RelativeStrengthIndex as Rsi, SimpleMovingAverage as Sma,
};
use ta::{Close, High, Low, Next as _};

const MAX_SCORE: i32 = 6;
const SIGNAL_THRESHOLD: f64 = 0.3;

/// Scores six classic indicators and turns the net vote into a signal.
///
/// Each indicator contributes -1, 0 or +1:
/// 1. SMA short/long crossover on the latest bar.
/// 2. MACD line crossing its signal line.
/// 3. RSI zone (oversold and neutral count as bullish, overbought as bearish).
/// 4. Stochastic %K below 20 or above 80.
/// 5. Close outside the Bollinger Bands.
/// 6. Trend strength: distance of the close from its short-window mean, in
///    standard deviations, beyond one sigma.
pub struct TechnicalsAnalyzer {
    params: TechnicalsParams,
}

/// Indicator readings for one bar.
#[derive(Debug, Clone, Copy, Default)]
struct Reading {
    close: f64,
    sma_short: f64,
    sma_long: f64,
    macd: f64,
    macd_signal: f64,
    rsi: f64,
    stoch_k: f64,
    bb_upper: f64,
    bb_lower: f64,
}

/// Adapter so `ta`'s stochastic can read a bar's range.
struct Hlc {
    high: f64,
    low: f64,
    close: f64,
}

impl High for Hlc {
    fn high(&self) -> f64 {
        self.high
    }
}

impl Low for Hlc {
    fn low(&self) -> f64 {
        self.low
    }
}

impl Close for Hlc {
    fn close(&self) -> f64 {
        self.close
    }
}

fn indicator_err<E: std::fmt::Debug>(name: &str) -> impl FnOnce(E) -> AnalyzerError + '_ {
    move |e| AnalyzerError::InvalidParameters(format!("Failed to initialize {name}: {e:?}"))
}

impl TechnicalsAnalyzer {
    pub const NAME: &'static str = "Technical Analysis";

    pub fn new(params: TechnicalsParams) -> Result<Self, AnalyzerError> {
        if params.short_window == 0
            || params.rsi_period == 0
            || params.bb_period == 0
            || params.stochastic_period == 0
        {
            return Err(AnalyzerError::InvalidParameters(
                "Indicator periods cannot be zero".to_string(),
            ));
        }
        if params.short_window >= params.long_window {
            return Err(AnalyzerError::InvalidParameters(
                "Short SMA window must be less than long SMA window".to_string(),
            ));
        }
        if params.macd_fast == 0 || params.macd_fast >= params.macd_slow || params.macd_signal == 0
        {
            return Err(AnalyzerError::InvalidParameters(
                "MACD periods must be positive with fast below slow".to_string(),
            ));
        }
        Ok(Self { params })
    }

    /// Replays the whole slice through fresh indicators and returns the
    /// readings for the previous and the latest bar.
    fn readings(&self, history: &[PriceBar]) -> Result<(Reading, Reading), AnalyzerError> {
        let p = &self.params;
        let mut sma_short = Sma::new(p.short_window).map_err(indicator_err("short SMA"))?;
        let mut sma_long = Sma::new(p.long_window).map_err(indicator_err("long SMA"))?;
        let mut macd = Macd::new(p.macd_fast, p.macd_slow, p.macd_signal)
            .map_err(indicator_err("MACD"))?;
        let mut rsi = Rsi::new(p.rsi_period).map_err(indicator_err("RSI"))?;
        let mut stoch =
            FastStochastic::new(p.stochastic_period).map_err(indicator_err("Stochastic"))?;
        let mut bb = BollingerBands::new(p.bb_period, p.bb_std_dev)
            .map_err(indicator_err("Bollinger Bands"))?;

        let mut prev = Reading::default();
        let mut current = Reading::default();
        for bar in history {
            let hlc = Hlc {
                high: to_f64(bar.high, "high")?,
                low: to_f64(bar.low, "low")?,
                close: to_f64(bar.close, "close")?,
            };
            let macd_out = macd.next(hlc.close);
            let bands = bb.next(hlc.close);
            prev = current;
            current = Reading {
                close: hlc.close,
                sma_short: sma_short.next(hlc.close),
                sma_long: sma_long.next(hlc.close),
                macd: macd_out.macd,
                macd_signal: macd_out.signal,
                rsi: rsi.next(hlc.close),
                stoch_k: stoch.next(&hlc),
                bb_upper: bands.upper,
                bb_lower: bands.lower,
            };
        }
        Ok((prev, current))
    }

    fn trend_strength(&self, closes: &[f64]) -> f64 {
        let window = &closes[closes.len().saturating_sub(self.params.short_window)..];
        let std = stats::sample_std(window);
        match closes.last() {
            Some(last) if std > 0.0 => (last - stats::mean(window)) / std,
            _ => 0.0,
        }
    }
}

impl Analyzer for TechnicalsAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, symbol: &str, history: &[PriceBar]) -> Result<Signal, AnalyzerError> {
        if history.len() < self.params.long_window {
            return Err(AnalyzerError::InsufficientData {
                symbol: symbol.to_string(),
                needed: self.params.long_window,
                available: history.len(),
            });
        }

        let (prev, cur) = self.readings(history)?;
        let closes = stats::closes(history)?;
        let mut score = 0;
        let mut reasons: Vec<String> = Vec::with_capacity(MAX_SCORE as usize);

        if cur.sma_short > cur.sma_long && prev.sma_short <= prev.sma_long {
            score += 1;
            reasons.push("Bullish SMA crossover".into());
        } else if cur.sma_short < cur.sma_long && prev.sma_short >= prev.sma_long {
            score -= 1;
            reasons.push("Bearish SMA crossover".into());
        } else {
            reasons.push("No significant MA signals".into());
        }

        if cur.macd > cur.macd_signal && prev.macd <= prev.macd_signal {
            score += 1;
            reasons.push("Bullish MACD crossover".into());
        } else if cur.macd < cur.macd_signal && prev.macd >= prev.macd_signal {
            score -= 1;
            reasons.push("Bearish MACD crossover".into());
        } else {
            reasons.push("No significant MACD signals".into());
        }

        if cur.rsi < 30.0 {
            score += 1;
            reasons.push(format!("Oversold RSI at {:.1}", cur.rsi));
        } else if cur.rsi <= 70.0 {
            score += 1;
            reasons.push(format!("RSI in neutral zone at {:.1}", cur.rsi));
        } else {
            score -= 1;
            reasons.push(format!("Overbought RSI at {:.1}", cur.rsi));
        }

        if cur.stoch_k < 20.0 {
            score += 1;
            reasons.push("Oversold stochastic".into());
        } else if cur.stoch_k > 80.0 {
            score -= 1;
            reasons.push("Overbought stochastic".into());
        } else {
            reasons.push("Neutral stochastic".into());
        }

        if cur.close < cur.bb_lower {
            score += 1;
            reasons.push("Price below lower Bollinger Band".into());
        } else if cur.close > cur.bb_upper {
            score -= 1;
            reasons.push("Price above upper Bollinger Band".into());
        } else {
            reasons.push("Price within Bollinger Bands".into());
        }

        let trend = self.trend_strength(&closes);
        if trend > 1.0 {
            score += 1;
            reasons.push("Strong upward trend".into());
        } else if trend < -1.0 {
            score -= 1;
            reasons.push("Strong downward trend".into());
        } else {
            reasons.push("Weak trend".into());
        }

        let normalized = f64::from(score) / f64::from(MAX_SCORE);
        let confidence = normalized.abs();
        let direction = if normalized > SIGNAL_THRESHOLD {
            Direction::Buy
        } else if normalized < -SIGNAL_THRESHOLD {
            Direction::Sell
        } else {
            Direction::Hold
        };

        let rationale = format!(
            "{direction} recommendation with {:.1}% confidence. {}",
            confidence * 100.0,
            reasons.join(" ")
        );
        tracing::debug!(analyzer = Self::NAME, symbol, %rationale, "Analyzer reasoning");

        let signal = Signal::new(direction, confidence, rationale)?.with_details(
            SignalDetails::Technical(TechnicalDetails {
                score,
                max_score: MAX_SCORE,
                rsi: cur.rsi,
                macd: cur.macd,
                macd_signal: cur.macd_signal,
                stoch_k: cur.stoch_k,
                sma_short: cur.sma_short,
                sma_long: cur.sma_long,
                bb_upper: cur.bb_upper,
                bb_lower: cur.bb_lower,
            }),
        );
        Ok(signal)
    }
}
