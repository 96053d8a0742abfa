//! Securities registry and append-only series storage.
//!
//! Implements the `eodex-core` persistence seams on top of DuckDB, plus the
//! seed/list administration surface used by the CLI. Reference data is only
//! ever mutated through seeding; the import pipeline reads it and appends
//! bars, actions, and audit rows.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use eodex_core::{
    BarStore, CorporateAction, EodBar, Exchange, ExchangeId, ExchangeRole, ImportReport, Security,
    SecurityId, SecurityRegistry, StoreError, Symbol, SymbolStatus, TradingDate,
};

use crate::{escape_sql_string, finalize_transaction, Warehouse, WarehouseError};

/// Registry seed document: exchanges first, then securities referencing
/// exchanges by label.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub exchanges: Vec<SeedExchange>,
    #[serde(default)]
    pub securities: Vec<SeedSecurity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedExchange {
    pub label: String,
    pub role: ExchangeRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSecurity {
    pub symbol: Symbol,
    pub exchange: String,
    #[serde(default)]
    pub start_date: Option<TradingDate>,
    #[serde(default)]
    pub end_date: Option<TradingDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub exchanges_upserted: usize,
    pub securities_added: usize,
    pub securities_skipped: usize,
}

impl Warehouse {
    /// Load a seed document in one transaction. Re-seeding is idempotent:
    /// exchanges are matched by label and listings by their full identity.
    pub fn apply_seed(&self, document: &SeedDocument) -> Result<SeedReport, WarehouseError> {
        let connection = self.connection();
        connection.execute_batch("BEGIN TRANSACTION")?;

        let result = (|| -> Result<SeedReport, WarehouseError> {
            let mut report = SeedReport::default();

            for exchange in &document.exchanges {
                self.upsert_exchange(exchange.label.as_str(), exchange.role)?;
                report.exchanges_upserted += 1;
            }

            for security in &document.securities {
                let Some(exchange_id) = self.exchange_id_by_label(security.exchange.as_str())?
                else {
                    return Err(WarehouseError::SeedRejected(format!(
                        "security '{}' references unknown exchange '{}'",
                        security.symbol, security.exchange
                    )));
                };

                if self.listing_exists(security, exchange_id)? {
                    report.securities_skipped += 1;
                } else {
                    self.insert_security(security, exchange_id)?;
                    report.securities_added += 1;
                }
            }

            Ok(report)
        })();

        finalize_transaction(connection, result)
    }

    pub fn list_exchanges(&self) -> Result<Vec<Exchange>, WarehouseError> {
        let mut statement = self
            .connection()
            .prepare("SELECT id, label, role FROM exchanges ORDER BY id")?;
        let mut rows = statement.query([])?;

        let mut exchanges = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let label: String = row.get(1)?;
            let role: String = row.get(2)?;
            let role = ExchangeRole::from_str(role.as_str()).map_err(|error| {
                WarehouseError::Corrupt(format!("exchange {id} has invalid role: {error}"))
            })?;

            exchanges.push(Exchange {
                id: ExchangeId::new(id),
                label,
                role,
            });
        }

        Ok(exchanges)
    }

    pub fn list_securities(&self) -> Result<Vec<Security>, WarehouseError> {
        self.fetch_securities("TRUE")
    }

    /// Append one import_log row per symbol outcome, under one request id.
    pub fn log_report(
        &self,
        request_id: &str,
        report: &ImportReport,
    ) -> Result<(), WarehouseError> {
        let connection = self.connection();
        connection.execute_batch("BEGIN TRANSACTION")?;

        let result = (|| -> Result<(), WarehouseError> {
            for outcome in &report.outcomes {
                let (status, bar_count, detail) = match &outcome.status {
                    SymbolStatus::Imported { bars, .. } => ("imported", Some(*bars), None),
                    SymbolStatus::Unmatched { failure } => {
                        ("unmatched", None, Some(failure.to_string()))
                    }
                    SymbolStatus::Skipped { detail } => ("skipped", None, Some(detail.clone())),
                };

                let sql = format!(
                    "INSERT INTO import_log (request_id, symbol, status, bar_count, detail) \
                     VALUES ('{request_id}', '{symbol}', '{status}', {bar_count}, {detail})",
                    request_id = escape_sql_string(request_id),
                    symbol = escape_sql_string(outcome.symbol.as_str()),
                    status = status,
                    bar_count = sql_option_u64(bar_count),
                    detail = sql_option_text(detail.as_deref()),
                );
                connection.execute_batch(sql.as_str())?;
            }

            Ok(())
        })();

        finalize_transaction(connection, result)
    }

    fn upsert_exchange(&self, label: &str, role: ExchangeRole) -> Result<ExchangeId, WarehouseError> {
        if let Some(id) = self.exchange_id_by_label(label)? {
            let sql = format!(
                "UPDATE exchanges SET role = '{role}' WHERE id = {id}",
                role = role.as_str(),
            );
            self.connection().execute_batch(sql.as_str())?;
            return Ok(ExchangeId::new(id));
        }

        let id: i64 = self.connection().query_row(
            "SELECT COALESCE(MAX(id), 0) + 1 FROM exchanges",
            [],
            |row| row.get(0),
        )?;
        let sql = format!(
            "INSERT INTO exchanges (id, label, role) VALUES ({id}, '{label}', '{role}')",
            label = escape_sql_string(label),
            role = role.as_str(),
        );
        self.connection().execute_batch(sql.as_str())?;

        Ok(ExchangeId::new(id))
    }

    fn exchange_id_by_label(&self, label: &str) -> Result<Option<i64>, WarehouseError> {
        let sql = format!(
            "SELECT id FROM exchanges WHERE label = '{}'",
            escape_sql_string(label)
        );
        match self
            .connection()
            .query_row(sql.as_str(), [], |row| row.get::<_, i64>(0))
        {
            Ok(id) => Ok(Some(id)),
            Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn listing_exists(
        &self,
        security: &SeedSecurity,
        exchange_id: i64,
    ) -> Result<bool, WarehouseError> {
        let sql = format!(
            "SELECT COUNT(*) FROM securities \
             WHERE symbol = '{symbol}' AND exchange_id = {exchange_id} \
             AND start_date IS NOT DISTINCT FROM {start_date} \
             AND end_date IS NOT DISTINCT FROM {end_date}",
            symbol = escape_sql_string(security.symbol.as_str()),
            start_date = sql_option_date(security.start_date),
            end_date = sql_option_date(security.end_date),
        );
        let count: i64 = self
            .connection()
            .query_row(sql.as_str(), [], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn insert_security(
        &self,
        security: &SeedSecurity,
        exchange_id: i64,
    ) -> Result<(), WarehouseError> {
        let id: i64 = self.connection().query_row(
            "SELECT COALESCE(MAX(id), 0) + 1 FROM securities",
            [],
            |row| row.get(0),
        )?;
        let sql = format!(
            "INSERT INTO securities (id, symbol, exchange_id, start_date, end_date) \
             VALUES ({id}, '{symbol}', {exchange_id}, {start_date}, {end_date})",
            symbol = escape_sql_string(security.symbol.as_str()),
            start_date = sql_option_date(security.start_date),
            end_date = sql_option_date(security.end_date),
        );
        self.connection().execute_batch(sql.as_str())?;
        Ok(())
    }

    fn fetch_securities(&self, predicate: &str) -> Result<Vec<Security>, WarehouseError> {
        let sql = format!(
            "SELECT id, symbol, exchange_id, CAST(start_date AS VARCHAR), CAST(end_date AS VARCHAR) \
             FROM securities WHERE {predicate} ORDER BY id"
        );
        let mut statement = self.connection().prepare(sql.as_str())?;
        let mut rows = statement.query([])?;

        let mut securities = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let symbol: String = row.get(1)?;
            let exchange_id: i64 = row.get(2)?;
            let start_date: Option<String> = row.get(3)?;
            let end_date: Option<String> = row.get(4)?;

            securities.push(Security {
                id: SecurityId::new(id),
                symbol: Symbol::parse(symbol.as_str()).map_err(|error| {
                    WarehouseError::Corrupt(format!("security {id} has invalid symbol: {error}"))
                })?,
                exchange_id: ExchangeId::new(exchange_id),
                start_date: parse_stored_date(id, start_date)?,
                end_date: parse_stored_date(id, end_date)?,
            });
        }

        Ok(securities)
    }

    fn latest_bar_date_impl(
        &self,
        security: SecurityId,
    ) -> Result<Option<TradingDate>, WarehouseError> {
        let sql = format!(
            "SELECT CAST(MAX(date) AS VARCHAR) FROM eod_bars WHERE security_id = {}",
            security.get()
        );
        let latest: Option<String> = self
            .connection()
            .query_row(sql.as_str(), [], |row| row.get(0))?;

        parse_stored_date(security.get(), latest)
    }

    fn insert_bar_impl(
        &self,
        bar: &EodBar,
        actions: &[CorporateAction],
    ) -> Result<(), WarehouseError> {
        let connection = self.connection();
        connection.execute_batch("BEGIN TRANSACTION")?;

        let result = (|| -> Result<(), WarehouseError> {
            let sql = format!(
                "INSERT INTO eod_bars (security_id, date, open, high, low, close, volume) \
                 VALUES ({security_id}, {date}, {open}, {high}, {low}, {close}, {volume})",
                security_id = bar.security_id.get(),
                date = sql_date(bar.date),
                open = bar.open,
                high = bar.high,
                low = bar.low,
                close = bar.close,
                volume = bar.volume,
            );
            connection.execute_batch(sql.as_str())?;

            for action in actions {
                let ratio = match action {
                    CorporateAction::Split { ratio, .. } => *ratio,
                    CorporateAction::CashDividend {
                        adjustment_ratio, ..
                    } => *adjustment_ratio,
                };

                // Amount, currency, and declared date are not supplied by the
                // vendor feed; only the ratio is populated.
                let sql = format!(
                    "INSERT INTO corporate_actions \
                     (security_id, action_type, ex_date, ratio, amount, currency, declared_date) \
                     VALUES ({security_id}, '{action_type}', {ex_date}, {ratio}, NULL, NULL, NULL)",
                    security_id = action.security_id().get(),
                    action_type = action.kind(),
                    ex_date = sql_date(action.ex_date()),
                    ratio = ratio,
                );
                connection.execute_batch(sql.as_str())?;
            }

            Ok(())
        })();

        finalize_transaction(connection, result)
    }
}

impl SecurityRegistry for Warehouse {
    fn exchanges(&self) -> Result<Vec<Exchange>, StoreError> {
        self.list_exchanges().map_err(to_store_error)
    }

    fn security_on_exchange(
        &self,
        symbol: &Symbol,
        exchange: ExchangeId,
    ) -> Result<Option<Security>, StoreError> {
        let predicate = format!(
            "symbol = '{}' AND exchange_id = {}",
            escape_sql_string(symbol.as_str()),
            exchange.get()
        );
        let mut matches = self.fetch_securities(predicate.as_str()).map_err(to_store_error)?;
        if matches.is_empty() {
            Ok(None)
        } else {
            Ok(Some(matches.remove(0)))
        }
    }

    fn securities_on_exchanges(
        &self,
        symbol: &Symbol,
        exchanges: &[ExchangeId],
    ) -> Result<Vec<Security>, StoreError> {
        if exchanges.is_empty() {
            return Ok(Vec::new());
        }

        let predicate = format!(
            "symbol = '{}' AND exchange_id IN ({})",
            escape_sql_string(symbol.as_str()),
            id_list(exchanges)
        );
        self.fetch_securities(predicate.as_str()).map_err(to_store_error)
    }

    fn securities_valid_on(
        &self,
        symbol: &Symbol,
        exchanges: &[ExchangeId],
        date: TradingDate,
    ) -> Result<Vec<Security>, StoreError> {
        if exchanges.is_empty() {
            return Ok(Vec::new());
        }

        // NULL windows never match: an unbounded listing cannot be
        // date-scoped.
        let predicate = format!(
            "symbol = '{}' AND exchange_id IN ({}) \
             AND start_date <= {date} AND end_date >= {date}",
            escape_sql_string(symbol.as_str()),
            id_list(exchanges),
            date = sql_date(date),
        );
        self.fetch_securities(predicate.as_str()).map_err(to_store_error)
    }
}

impl BarStore for Warehouse {
    fn latest_bar_date(&self, security: SecurityId) -> Result<Option<TradingDate>, StoreError> {
        self.latest_bar_date_impl(security).map_err(to_store_error)
    }

    fn insert_bar(&self, bar: &EodBar, actions: &[CorporateAction]) -> Result<(), StoreError> {
        self.insert_bar_impl(bar, actions).map_err(to_store_error)
    }
}

fn to_store_error(error: WarehouseError) -> StoreError {
    match error {
        WarehouseError::Io(error) => StoreError::connection(error.to_string()),
        WarehouseError::Corrupt(message) => StoreError::corrupt(message),
        other => StoreError::query(other.to_string()),
    }
}

fn parse_stored_date(
    row_id: i64,
    value: Option<String>,
) -> Result<Option<TradingDate>, WarehouseError> {
    value
        .map(|text| {
            TradingDate::parse(text.as_str()).map_err(|error| {
                WarehouseError::Corrupt(format!("row {row_id} has invalid date: {error}"))
            })
        })
        .transpose()
}

fn id_list(ids: &[ExchangeId]) -> String {
    ids.iter()
        .map(|id| id.get().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn sql_date(date: TradingDate) -> String {
    format!("DATE '{}'", date.format_iso())
}

fn sql_option_date(date: Option<TradingDate>) -> String {
    match date {
        Some(date) => sql_date(date),
        None => String::from("NULL"),
    }
}

fn sql_option_u64(value: Option<u64>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => String::from("NULL"),
    }
}

fn sql_option_text(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("'{}'", escape_sql_string(value)),
        None => String::from("NULL"),
    }
}
