//! Core contracts for eodex.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The tiered security resolver and its run-scoped exchange classification
//! - The incremental bar planner and the corporate-action deriver
//! - The import orchestrator and its operator-facing report
//! - Trait seams for the two external collaborators: the vendor feed and
//!   the persistence layer

pub mod deriver;
pub mod domain;
pub mod error;
pub mod feed;
pub mod importer;
pub mod planner;
pub mod resolver;
pub mod store;

pub use deriver::{derive_bar, Derivation, DerivationFault};
pub use domain::{
    CorporateAction, EodBar, Exchange, ExchangeId, ExchangeRole, Security, SecurityId, Symbol,
    TradingDate, VendorBar,
};
pub use error::ValidationError;
pub use feed::{FeedError, FlatFileFeed, SymbolSeries, VendorFeed};
pub use importer::{ImportError, ImportReport, Importer, SymbolOutcome, SymbolStatus};
pub use planner::eligible_bars;
pub use resolver::{ContextError, Resolution, ResolutionContext, ResolutionFailure};
pub use store::{BarStore, SecurityRegistry, StoreError, StoreErrorKind};
