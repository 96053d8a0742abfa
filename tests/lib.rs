// Shared fixtures for eodex behavior tests
use std::path::Path;

pub use eodex_core::{
    FlatFileFeed, Importer, Resolution, ResolutionContext, ResolutionFailure, Symbol, TradingDate,
    VendorFeed,
};
pub use eodex_warehouse::{QueryGuardrails, SeedDocument, Warehouse, WarehouseConfig};

pub fn open_warehouse(dir: &Path) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        eodex_home: dir.to_path_buf(),
        db_path: dir.join("warehouse.duckdb"),
    })
    .expect("warehouse open")
}

/// Registry with every resolution tier populated:
/// - ACME listed on the composite AND one constituent exchange
/// - REGIO listed on exactly one constituent exchange
/// - DUAL listed on two constituent exchanges
/// - OLDCO listed in the catch-all pool for [2001-01-01, 2005-12-31]
/// - OLDCO relisted in the catch-all pool for [2006-06-01, 2009-12-31]
pub fn seed_full_registry(warehouse: &Warehouse) {
    let document: SeedDocument = serde_json::from_value(serde_json::json!({
        "exchanges": [
            { "label": "US Composite", "role": "composite" },
            { "label": "NYSE", "role": "constituent" },
            { "label": "NYSE MKT", "role": "constituent" },
            { "label": "US Catch-All", "role": "catch_all" }
        ],
        "securities": [
            { "symbol": "ACME", "exchange": "US Composite" },
            { "symbol": "ACME", "exchange": "NYSE" },
            { "symbol": "REGIO", "exchange": "NYSE MKT" },
            { "symbol": "DUAL", "exchange": "NYSE" },
            { "symbol": "DUAL", "exchange": "NYSE MKT" },
            {
                "symbol": "OLDCO",
                "exchange": "US Catch-All",
                "start_date": "2001-01-01",
                "end_date": "2005-12-31"
            },
            {
                "symbol": "OLDCO",
                "exchange": "US Catch-All",
                "start_date": "2006-06-01",
                "end_date": "2009-12-31"
            }
        ]
    }))
    .expect("seed document");

    warehouse.apply_seed(&document).expect("seed");
}

/// One vendor flat-file row: unadjusted prices derived from `close`,
/// adjusted columns deliberately halved so tests can prove they are never
/// persisted.
pub fn feed_row(symbol: &str, date: &str, close: f64, dividend: f64, split: f64) -> String {
    format!(
        "{symbol},{date},{open},{high},{low},{close},10000.0,{dividend},{split},{a_open},{a_high},{a_low},{a_close},20000.0\n",
        open = close - 1.0,
        high = close + 1.0,
        low = close - 2.0,
        a_open = (close - 1.0) / 2.0,
        a_high = (close + 1.0) / 2.0,
        a_low = (close - 2.0) / 2.0,
        a_close = close / 2.0,
    )
}

pub fn feed_from(contents: &str) -> FlatFileFeed<&[u8]> {
    FlatFileFeed::from_reader(contents.as_bytes())
}

pub fn count_rows(warehouse: &Warehouse, sql: &str) -> i64 {
    let result = warehouse
        .execute_query(sql, QueryGuardrails::default(), false)
        .expect("query");
    result.rows[0][0].as_i64().expect("count")
}
