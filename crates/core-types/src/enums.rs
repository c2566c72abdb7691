use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The opinion an analyzer holds about a symbol.
///
/// The discriminants are part of the contract: the consensus math multiplies
/// them by confidence, so `Sell` must stay `-1` and `Buy` must stay `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Sell = -1,
    Hold = 0,
    Buy = 1,
}

impl Direction {
    /// The signed value used in weighted scalar calculations.
    pub fn value(self) -> f64 {
        self as i8 as f64
    }

    /// Maps a signed quantity onto a direction by its sign.
    pub fn from_sign(value: i64) -> Self {
        match value.signum() {
            1 => Direction::Buy,
            -1 => Direction::Sell,
            _ => Direction::Hold,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction::Sell => "SELL",
            Direction::Hold => "HOLD",
            Direction::Buy => "BUY",
        };
        f.write_str(label)
    }
}

/// The side of a concrete share movement in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Identifies one of the analyzers shipped with the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerId {
    Technicals,
    Risk,
    PriceTarget,
}

impl AnalyzerId {
    pub const ALL: [AnalyzerId; 3] = [AnalyzerId::Technicals, AnalyzerId::Risk, AnalyzerId::PriceTarget];

    /// The display name an analyzer reports, which is also its key in the weight table.
    pub fn display_name(self) -> &'static str {
        match self {
            AnalyzerId::Technicals => "Technical Analysis",
            AnalyzerId::Risk => "Risk Manager",
            AnalyzerId::PriceTarget => "Price Target Analysis",
        }
    }
}

impl FromStr for AnalyzerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "technicals" | "technical" => Ok(AnalyzerId::Technicals),
            "risk" => Ok(AnalyzerId::Risk),
            "price_target" => Ok(AnalyzerId::PriceTarget),
            other => Err(format!("unknown analyzer '{other}'")),
        }
    }
}

/// How the ledger values a held symbol that has no price on a snapshot date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnpricedValuation {
    /// The holding contributes nothing to that snapshot.
    #[default]
    Zero,
    /// The holding is valued at the most recent price a previous snapshot saw.
    LastKnown,
}
