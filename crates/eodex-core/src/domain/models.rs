use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, TradingDate, ValidationError};

/// Role an exchange plays during symbol resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeRole {
    /// The single canonical national-market umbrella venue.
    Composite,
    /// A regional venue consulted only when the composite tier misses.
    Constituent,
    /// Venue of last resort; its listings carry a validity window so a
    /// symbol can be reused across non-overlapping historical windows.
    CatchAll,
}

impl ExchangeRole {
    pub const ALL: [Self; 3] = [Self::Composite, Self::Constituent, Self::CatchAll];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Composite => "composite",
            Self::Constituent => "constituent",
            Self::CatchAll => "catch_all",
        }
    }
}

impl Display for ExchangeRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeRole {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "composite" => Ok(Self::Composite),
            "constituent" => Ok(Self::Constituent),
            "catch_all" => Ok(Self::CatchAll),
            other => Err(ValidationError::InvalidExchangeRole {
                value: other.to_owned(),
            }),
        }
    }
}

/// Registry identity of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId(i64);

impl ExchangeId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry identity of a security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityId(i64);

impl SecurityId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl Display for SecurityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable exchange reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: ExchangeId,
    pub label: String,
    pub role: ExchangeRole,
}

/// A listed security in the local registry.
///
/// `start_date`/`end_date` bound the listing's validity and are populated
/// only for catch-all listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    pub id: SecurityId,
    pub symbol: Symbol,
    pub exchange_id: ExchangeId,
    pub start_date: Option<TradingDate>,
    pub end_date: Option<TradingDate>,
}

impl Security {
    /// Whether the listing's validity window contains `date`, inclusive on
    /// both bounds. Listings without a window never match.
    pub fn valid_on(&self, date: TradingDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

/// One daily record as supplied by the vendor feed.
///
/// The adjusted fields are carried through parsing but read by nothing in
/// the engine; bars are persisted in unadjusted form only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorBar {
    pub date: TradingDate,
    pub unadjusted_open: f64,
    pub unadjusted_high: f64,
    pub unadjusted_low: f64,
    pub unadjusted_close: f64,
    pub unadjusted_volume: u64,
    /// Dollar amount of any cash dividend with ex-date on this day;
    /// `0.0` means no dividend.
    pub dividend: f64,
    /// New shares per old share for a split with ex-date on this day;
    /// `1.0` means no split.
    pub split_adjustment_factor: f64,
    pub adjusted_open: f64,
    pub adjusted_high: f64,
    pub adjusted_low: f64,
    pub adjusted_close: f64,
    pub adjusted_volume: f64,
}

/// Stored daily bar, unadjusted, keyed by (security, date). Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EodBar {
    pub security_id: SecurityId,
    pub date: TradingDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Corporate action derived from vendor adjustment factors.
///
/// The persistence schema also carries dividend amount, currency, and
/// declared-date columns; the feed does not supply them, so only the ratio
/// is ever populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorporateAction {
    Split {
        security_id: SecurityId,
        ex_date: TradingDate,
        /// Ratio of new shares to old shares.
        ratio: f64,
    },
    CashDividend {
        security_id: SecurityId,
        ex_date: TradingDate,
        /// Price-adjustment ratio `(close + dividend) / close`.
        adjustment_ratio: f64,
    },
}

impl CorporateAction {
    pub const fn security_id(&self) -> SecurityId {
        match self {
            Self::Split { security_id, .. } | Self::CashDividend { security_id, .. } => {
                *security_id
            }
        }
    }

    pub const fn ex_date(&self) -> TradingDate {
        match self {
            Self::Split { ex_date, .. } | Self::CashDividend { ex_date, .. } => *ex_date,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Split { .. } => "split",
            Self::CashDividend { .. } => "cash_dividend",
        }
    }
}
