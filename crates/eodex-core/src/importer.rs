use serde::Serialize;
use thiserror::Error;

use crate::deriver::derive_bar;
use crate::feed::{FeedError, SymbolSeries, VendorFeed};
use crate::planner::eligible_bars;
use crate::resolver::{ContextError, Resolution, ResolutionContext, ResolutionFailure};
use crate::store::{BarStore, SecurityRegistry, StoreError};
use crate::{CorporateAction, Symbol};

/// Fatal faults that abort an import run. Per-symbol resolution failures are
/// reported, not raised.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome for one processed symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolOutcome {
    pub symbol: Symbol,
    #[serde(flatten)]
    pub status: SymbolStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolStatus {
    Imported {
        bars: u64,
        splits: u64,
        dividends: u64,
    },
    Unmatched {
        failure: ResolutionFailure,
    },
    Skipped {
        detail: String,
    },
}

/// Operator-facing run report: per-symbol outcomes plus run totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub symbols_processed: usize,
    pub symbols_imported: usize,
    pub symbols_unmatched: usize,
    pub symbols_skipped: usize,
    pub bars_imported: u64,
    pub splits_recorded: u64,
    pub dividends_recorded: u64,
    pub outcomes: Vec<SymbolOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Drives resolve → plan → derive → persist across a vendor feed, one
/// sequential pass over symbols and, within a symbol, one pass over bars.
pub struct Importer<'a, S> {
    store: &'a S,
    context: ResolutionContext,
}

impl<'a, S: SecurityRegistry + BarStore> Importer<'a, S> {
    /// Classify exchanges once; the classification is held for the whole
    /// run and never refreshed.
    pub fn new(store: &'a S) -> Result<Self, ImportError> {
        let context = ResolutionContext::load(store)?;
        Ok(Self { store, context })
    }

    pub const fn context(&self) -> &ResolutionContext {
        &self.context
    }

    pub fn run<F: VendorFeed>(&self, feed: &mut F) -> Result<ImportReport, ImportError> {
        let mut report = ImportReport::default();

        while let Some(series) = feed.next_series()? {
            report.symbols_processed += 1;
            self.import_series(series, &mut report)?;
        }

        Ok(report)
    }

    fn import_series(
        &self,
        series: SymbolSeries,
        report: &mut ImportReport,
    ) -> Result<(), ImportError> {
        let SymbolSeries { symbol, bars } = series;

        let Some(first) = bars.first() else {
            report.symbols_skipped += 1;
            report.outcomes.push(SymbolOutcome {
                symbol,
                status: SymbolStatus::Skipped {
                    detail: String::from("vendor supplied an empty series"),
                },
            });
            return Ok(());
        };

        // Catch-all lookups are scoped to the date of the first incoming bar.
        let reference_date = first.date;
        let security = match self.context.resolve(self.store, &symbol, reference_date)? {
            Resolution::Resolved(security) => security,
            Resolution::Unmatched(failure) => {
                report.symbols_unmatched += 1;
                report.warnings.push(failure.to_string());
                report.outcomes.push(SymbolOutcome {
                    symbol,
                    status: SymbolStatus::Unmatched { failure },
                });
                return Ok(());
            }
        };

        let latest_stored = self.store.latest_bar_date(security.id)?;
        let eligible = eligible_bars(latest_stored, bars);

        let mut bar_count = 0u64;
        let mut split_count = 0u64;
        let mut dividend_count = 0u64;

        for vendor_bar in &eligible {
            let derivation = derive_bar(security.id, vendor_bar);

            if let Some(fault) = &derivation.fault {
                report
                    .warnings
                    .push(format!("{symbol}: {fault}; dividend action skipped"));
            }

            for action in &derivation.actions {
                match action {
                    CorporateAction::Split { .. } => split_count += 1,
                    CorporateAction::CashDividend { .. } => dividend_count += 1,
                }
            }

            self.store.insert_bar(&derivation.bar, &derivation.actions)?;
            bar_count += 1;
        }

        report.symbols_imported += 1;
        report.bars_imported += bar_count;
        report.splits_recorded += split_count;
        report.dividends_recorded += dividend_count;
        report.outcomes.push(SymbolOutcome {
            symbol,
            status: SymbolStatus::Imported {
                bars: bar_count,
                splits: split_count,
                dividends: dividend_count,
            },
        });

        Ok(())
    }
}
