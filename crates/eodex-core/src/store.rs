use std::fmt::{Display, Formatter};

use crate::{CorporateAction, EodBar, Exchange, ExchangeId, Security, SecurityId, Symbol, TradingDate};

/// Persistence error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Connection,
    Query,
    Corrupt,
}

/// Structured persistence error surfaced through the registry and bar-store
/// seams. Any store error aborts the run; per-symbol resolution failures are
/// a separate, non-fatal channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Connection,
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Query,
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self {
            kind: StoreErrorKind::Corrupt,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            StoreErrorKind::Connection => "store.connection",
            StoreErrorKind::Query => "store.query",
            StoreErrorKind::Corrupt => "store.corrupt",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for StoreError {}

/// Read-only registry queries consumed by the resolver.
pub trait SecurityRegistry {
    /// Full exchange listing; classified into tiers once per run.
    fn exchanges(&self) -> Result<Vec<Exchange>, StoreError>;

    /// Point lookup: the security listed under `symbol` on one exchange.
    fn security_on_exchange(
        &self,
        symbol: &Symbol,
        exchange: ExchangeId,
    ) -> Result<Option<Security>, StoreError>;

    /// Set lookup: every security listed under `symbol` across `exchanges`.
    fn securities_on_exchanges(
        &self,
        symbol: &Symbol,
        exchanges: &[ExchangeId],
    ) -> Result<Vec<Security>, StoreError>;

    /// Window-filtered lookup: securities listed under `symbol` across
    /// `exchanges` whose validity window contains `date`, inclusive on both
    /// bounds.
    fn securities_valid_on(
        &self,
        symbol: &Symbol,
        exchanges: &[ExchangeId],
        date: TradingDate,
    ) -> Result<Vec<Security>, StoreError>;
}

/// Append-only bar/action persistence consumed by the orchestrator.
pub trait BarStore {
    /// Date of the most recent stored bar for `security`, if any; seeds the
    /// incremental planner.
    fn latest_bar_date(&self, security: SecurityId) -> Result<Option<TradingDate>, StoreError>;

    /// Persist a bar and its derived actions as one atomic unit, so an
    /// interrupted run can never strand a bar without its actions.
    fn insert_bar(&self, bar: &EodBar, actions: &[CorporateAction]) -> Result<(), StoreError>;
}
