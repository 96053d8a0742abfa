use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::{Symbol, TradingDate, ValidationError, VendorBar};

/// Errors surfaced by vendor feed implementations.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed feed record: {0}")]
    Malformed(#[from] csv::Error),

    #[error("feed record rejected: {0}")]
    Validation(#[from] ValidationError),
}

/// All bars the vendor supplies for one symbol, in feed order.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSeries {
    pub symbol: Symbol,
    pub bars: Vec<VendorBar>,
}

/// Vendor data client seam: yields per-symbol daily bar sequences.
///
/// Implementations own ordering within a series; the engine filters bars but
/// never re-sorts them.
pub trait VendorFeed {
    fn next_series(&mut self) -> Result<Option<SymbolSeries>, FeedError>;
}

/// Raw row layout of the vendor's bulk EOD flat file.
///
/// Volume columns arrive as floats ("4556464.0"); the unadjusted volume is
/// narrowed to an integer on the way in. Adjusted columns must parse but are
/// read by nothing downstream.
#[derive(Debug, Deserialize)]
struct FlatFileRow {
    symbol: String,
    date: String,
    unadjusted_open: f64,
    unadjusted_high: f64,
    unadjusted_low: f64,
    unadjusted_close: f64,
    unadjusted_volume: f64,
    dividend: f64,
    split_adjustment_factor: f64,
    adjusted_open: f64,
    adjusted_high: f64,
    adjusted_low: f64,
    adjusted_close: f64,
    adjusted_volume: f64,
}

/// Vendor feed backed by a headerless CSV flat file.
///
/// The file is grouped by symbol: each contiguous run of rows for one symbol
/// becomes one series. Rows within a run are assumed date-ordered by the
/// vendor.
pub struct FlatFileFeed<R> {
    reader: csv::Reader<R>,
    pending: Option<(Symbol, VendorBar)>,
}

impl FlatFileFeed<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: Read> FlatFileFeed<R> {
    pub fn from_reader(input: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(input);
        Self {
            reader,
            pending: None,
        }
    }

    fn read_row(&mut self) -> Result<Option<(Symbol, VendorBar)>, FeedError> {
        let mut record = csv::StringRecord::new();
        if !self.reader.read_record(&mut record)? {
            return Ok(None);
        }

        let row: FlatFileRow = record.deserialize(None)?;
        let symbol = Symbol::parse(&row.symbol)?;
        let bar = VendorBar {
            date: TradingDate::parse(&row.date)?,
            unadjusted_open: row.unadjusted_open,
            unadjusted_high: row.unadjusted_high,
            unadjusted_low: row.unadjusted_low,
            unadjusted_close: row.unadjusted_close,
            unadjusted_volume: row.unadjusted_volume as u64,
            dividend: row.dividend,
            split_adjustment_factor: row.split_adjustment_factor,
            adjusted_open: row.adjusted_open,
            adjusted_high: row.adjusted_high,
            adjusted_low: row.adjusted_low,
            adjusted_close: row.adjusted_close,
            adjusted_volume: row.adjusted_volume,
        };

        Ok(Some((symbol, bar)))
    }
}

impl<R: Read> VendorFeed for FlatFileFeed<R> {
    fn next_series(&mut self) -> Result<Option<SymbolSeries>, FeedError> {
        let (symbol, first) = match self.pending.take() {
            Some(pending) => pending,
            None => match self.read_row()? {
                Some(row) => row,
                None => return Ok(None),
            },
        };

        let mut bars = vec![first];
        while let Some((next_symbol, bar)) = self.read_row()? {
            if next_symbol == symbol {
                bars.push(bar);
            } else {
                self.pending = Some((next_symbol, bar));
                break;
            }
        }

        Ok(Some(SymbolSeries { symbol, bars }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "\
AAPL,2020-03-10,100.0,105.0,99.0,103.0,4556464.0,0.0,1.0,50.0,52.5,49.5,51.5,9112928.0
AAPL,2020-03-11,103.0,106.0,101.0,104.0,3000000.0,0.77,1.0,51.5,53.0,50.5,52.0,6000000.0
MSFT,2020-03-10,150.0,152.0,149.0,151.0,2000000.0,0.0,2.0,75.0,76.0,74.5,75.5,4000000.0
";

    #[test]
    fn groups_contiguous_rows_by_symbol() {
        let mut feed = FlatFileFeed::from_reader(FEED.as_bytes());

        let first = feed
            .next_series()
            .expect("feed should read")
            .expect("series expected");
        assert_eq!(first.symbol.as_str(), "AAPL");
        assert_eq!(first.bars.len(), 2);
        assert_eq!(first.bars[0].unadjusted_volume, 4_556_464);
        assert_eq!(first.bars[1].dividend, 0.77);

        let second = feed
            .next_series()
            .expect("feed should read")
            .expect("series expected");
        assert_eq!(second.symbol.as_str(), "MSFT");
        assert_eq!(second.bars[0].split_adjustment_factor, 2.0);

        assert!(feed.next_series().expect("feed should read").is_none());
    }

    #[test]
    fn adjusted_columns_parse_without_being_consumed() {
        let mut feed = FlatFileFeed::from_reader(FEED.as_bytes());
        let series = feed
            .next_series()
            .expect("feed should read")
            .expect("series expected");

        let bar = &series.bars[0];
        assert_eq!(bar.adjusted_close, 51.5);
        assert_eq!(bar.unadjusted_close, 103.0);
    }

    #[test]
    fn rejects_short_rows() {
        let mut feed = FlatFileFeed::from_reader("AAPL,2020-03-10,100.0\n".as_bytes());
        let err = feed.next_series().expect_err("must fail");
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    #[test]
    fn rejects_bad_dates() {
        let row = "AAPL,03/10/2020,100.0,105.0,99.0,103.0,1.0,0.0,1.0,1.0,1.0,1.0,1.0,1.0\n";
        let mut feed = FlatFileFeed::from_reader(row.as_bytes());
        let err = feed.next_series().expect_err("must fail");
        assert!(matches!(err, FeedError::Validation(_)));
    }
}
