use serde::Serialize;
use thiserror::Error;

use crate::store::{SecurityRegistry, StoreError};
use crate::{Exchange, ExchangeId, ExchangeRole, Security, Symbol, TradingDate};

/// Exchange classification computed once per run and read-only thereafter.
///
/// The classification is never refreshed mid-run, so every resolution
/// decision inside one run sees the same tiers even if reference data
/// changes underneath.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    composite: Exchange,
    constituents: Vec<Exchange>,
    catch_all: Vec<Exchange>,
}

/// Faults while classifying exchanges into resolution tiers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("registry has no composite exchange")]
    MissingComposite,

    #[error("registry has {count} composite exchanges, expected exactly one")]
    MultipleComposites { count: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-symbol resolution outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Security),
    Unmatched(ResolutionFailure),
}

/// Non-fatal resolution failures: the symbol is reported and skipped, and
/// the run continues.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ResolutionFailure {
    #[error("symbol '{symbol}' not found on any exchange for {reference_date}")]
    SymbolNotFound {
        symbol: Symbol,
        reference_date: TradingDate,
    },

    #[error("symbol '{symbol}' is listed on multiple exchanges: {exchanges:?}")]
    AmbiguousListing {
        symbol: Symbol,
        reference_date: TradingDate,
        exchanges: Vec<String>,
    },
}

impl ResolutionContext {
    /// Classify the registry's exchanges. Called once per orchestrator run.
    pub fn load<R: SecurityRegistry>(registry: &R) -> Result<Self, ContextError> {
        Self::classify(registry.exchanges()?)
    }

    pub fn classify(exchanges: Vec<Exchange>) -> Result<Self, ContextError> {
        let mut composites = Vec::new();
        let mut constituents = Vec::new();
        let mut catch_all = Vec::new();

        for exchange in exchanges {
            match exchange.role {
                ExchangeRole::Composite => composites.push(exchange),
                ExchangeRole::Constituent => constituents.push(exchange),
                ExchangeRole::CatchAll => catch_all.push(exchange),
            }
        }

        let composite = match composites.len() {
            0 => return Err(ContextError::MissingComposite),
            1 => composites.remove(0),
            count => return Err(ContextError::MultipleComposites { count }),
        };

        Ok(Self {
            composite,
            constituents,
            catch_all,
        })
    }

    pub fn composite(&self) -> &Exchange {
        &self.composite
    }

    pub fn constituents(&self) -> &[Exchange] {
        &self.constituents
    }

    pub fn catch_all(&self) -> &[Exchange] {
        &self.catch_all
    }

    fn constituent_ids(&self) -> Vec<ExchangeId> {
        self.constituents.iter().map(|exchange| exchange.id).collect()
    }

    fn catch_all_ids(&self) -> Vec<ExchangeId> {
        self.catch_all.iter().map(|exchange| exchange.id).collect()
    }

    fn exchange_label(&self, id: ExchangeId) -> String {
        std::iter::once(&self.composite)
            .chain(&self.constituents)
            .chain(&self.catch_all)
            .find(|exchange| exchange.id == id)
            .map(|exchange| exchange.label.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn labels_of(&self, candidates: &[Security]) -> Vec<String> {
        candidates
            .iter()
            .map(|security| self.exchange_label(security.exchange_id))
            .collect()
    }

    /// Resolve a vendor symbol to at most one security.
    ///
    /// Tiers are consulted in order and the first tier with any candidate
    /// decides the outcome: composite, then constituents, then catch-all
    /// listings valid on `reference_date`. Two or more candidates within a
    /// tier are never tie-broken.
    pub fn resolve<R: SecurityRegistry>(
        &self,
        registry: &R,
        symbol: &Symbol,
        reference_date: TradingDate,
    ) -> Result<Resolution, StoreError> {
        if let Some(security) = registry.security_on_exchange(symbol, self.composite.id)? {
            return Ok(Resolution::Resolved(security));
        }

        let mut constituent_matches =
            registry.securities_on_exchanges(symbol, &self.constituent_ids())?;
        match constituent_matches.len() {
            0 => {}
            1 => return Ok(Resolution::Resolved(constituent_matches.remove(0))),
            _ => {
                return Ok(Resolution::Unmatched(ResolutionFailure::AmbiguousListing {
                    symbol: symbol.clone(),
                    reference_date,
                    exchanges: self.labels_of(&constituent_matches),
                }))
            }
        }

        let mut catch_all_matches =
            registry.securities_valid_on(symbol, &self.catch_all_ids(), reference_date)?;
        match catch_all_matches.len() {
            0 => Ok(Resolution::Unmatched(ResolutionFailure::SymbolNotFound {
                symbol: symbol.clone(),
                reference_date,
            })),
            1 => Ok(Resolution::Resolved(catch_all_matches.remove(0))),
            _ => Ok(Resolution::Unmatched(ResolutionFailure::AmbiguousListing {
                symbol: symbol.clone(),
                reference_date,
                exchanges: self.labels_of(&catch_all_matches),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SecurityId;

    struct FakeRegistry {
        exchanges: Vec<Exchange>,
        securities: Vec<Security>,
    }

    impl SecurityRegistry for FakeRegistry {
        fn exchanges(&self) -> Result<Vec<Exchange>, StoreError> {
            Ok(self.exchanges.clone())
        }

        fn security_on_exchange(
            &self,
            symbol: &Symbol,
            exchange: ExchangeId,
        ) -> Result<Option<Security>, StoreError> {
            Ok(self
                .securities
                .iter()
                .find(|security| security.symbol == *symbol && security.exchange_id == exchange)
                .cloned())
        }

        fn securities_on_exchanges(
            &self,
            symbol: &Symbol,
            exchanges: &[ExchangeId],
        ) -> Result<Vec<Security>, StoreError> {
            Ok(self
                .securities
                .iter()
                .filter(|security| {
                    security.symbol == *symbol && exchanges.contains(&security.exchange_id)
                })
                .cloned()
                .collect())
        }

        fn securities_valid_on(
            &self,
            symbol: &Symbol,
            exchanges: &[ExchangeId],
            date: TradingDate,
        ) -> Result<Vec<Security>, StoreError> {
            Ok(self
                .securities
                .iter()
                .filter(|security| {
                    security.symbol == *symbol
                        && exchanges.contains(&security.exchange_id)
                        && security.valid_on(date)
                })
                .cloned()
                .collect())
        }
    }

    fn exchange(id: i64, label: &str, role: ExchangeRole) -> Exchange {
        Exchange {
            id: ExchangeId::new(id),
            label: label.to_owned(),
            role,
        }
    }

    fn listing(id: i64, symbol: &str, exchange: i64) -> Security {
        Security {
            id: SecurityId::new(id),
            symbol: Symbol::parse(symbol).expect("symbol"),
            exchange_id: ExchangeId::new(exchange),
            start_date: None,
            end_date: None,
        }
    }

    fn windowed(id: i64, symbol: &str, exchange: i64, start: &str, end: &str) -> Security {
        Security {
            start_date: Some(TradingDate::parse(start).expect("date")),
            end_date: Some(TradingDate::parse(end).expect("date")),
            ..listing(id, symbol, exchange)
        }
    }

    fn registry(securities: Vec<Security>) -> FakeRegistry {
        FakeRegistry {
            exchanges: vec![
                exchange(1, "US Composite", ExchangeRole::Composite),
                exchange(2, "NYSE", ExchangeRole::Constituent),
                exchange(3, "NYSE MKT", ExchangeRole::Constituent),
                exchange(9, "US Catch-All", ExchangeRole::CatchAll),
            ],
            securities,
        }
    }

    fn resolve(registry: &FakeRegistry, symbol: &str, date: &str) -> Resolution {
        let context = ResolutionContext::load(registry).expect("context");
        context
            .resolve(
                registry,
                &Symbol::parse(symbol).expect("symbol"),
                TradingDate::parse(date).expect("date"),
            )
            .expect("resolve")
    }

    #[test]
    fn composite_listing_wins_over_constituents() {
        let registry = registry(vec![
            listing(10, "ACME", 1),
            listing(11, "ACME", 2),
        ]);

        let resolution = resolve(&registry, "ACME", "2020-01-02");
        assert_eq!(
            resolution,
            Resolution::Resolved(listing(10, "ACME", 1))
        );
    }

    #[test]
    fn single_constituent_listing_resolves() {
        let registry = registry(vec![listing(11, "ACME", 3)]);

        let resolution = resolve(&registry, "ACME", "2020-01-02");
        assert_eq!(resolution, Resolution::Resolved(listing(11, "ACME", 3)));
    }

    #[test]
    fn multiple_constituent_listings_are_ambiguous() {
        let registry = registry(vec![listing(11, "ACME", 2), listing(12, "ACME", 3)]);

        let resolution = resolve(&registry, "ACME", "2020-01-02");
        match resolution {
            Resolution::Unmatched(ResolutionFailure::AmbiguousListing { exchanges, .. }) => {
                assert_eq!(exchanges, vec!["NYSE".to_owned(), "NYSE MKT".to_owned()]);
            }
            other => panic!("expected ambiguous listing, got {other:?}"),
        }
    }

    #[test]
    fn catch_all_listing_resolves_inside_its_window() {
        let registry = registry(vec![windowed(
            20,
            "OLDCO",
            9,
            "2001-01-01",
            "2005-12-31",
        )]);

        let resolution = resolve(&registry, "OLDCO", "2003-06-01");
        assert!(matches!(resolution, Resolution::Resolved(_)));
    }

    #[test]
    fn catch_all_listing_misses_outside_its_window() {
        let registry = registry(vec![windowed(
            20,
            "OLDCO",
            9,
            "2001-01-01",
            "2005-12-31",
        )]);

        let resolution = resolve(&registry, "OLDCO", "2010-01-01");
        assert!(matches!(
            resolution,
            Resolution::Unmatched(ResolutionFailure::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn overlapping_catch_all_windows_are_ambiguous() {
        let registry = registry(vec![
            windowed(20, "OLDCO", 9, "2001-01-01", "2005-12-31"),
            windowed(21, "OLDCO", 9, "2004-01-01", "2008-12-31"),
        ]);

        let resolution = resolve(&registry, "OLDCO", "2004-06-01");
        assert!(matches!(
            resolution,
            Resolution::Unmatched(ResolutionFailure::AmbiguousListing { .. })
        ));
    }

    #[test]
    fn classification_requires_exactly_one_composite() {
        let err = ResolutionContext::classify(vec![exchange(
            2,
            "NYSE",
            ExchangeRole::Constituent,
        )])
        .expect_err("must fail");
        assert_eq!(err, ContextError::MissingComposite);

        let err = ResolutionContext::classify(vec![
            exchange(1, "US Composite", ExchangeRole::Composite),
            exchange(4, "Other Composite", ExchangeRole::Composite),
        ])
        .expect_err("must fail");
        assert_eq!(err, ContextError::MultipleComposites { count: 2 });
    }
}
