use ::duckdb::Connection;

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_registry_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS exchanges (
    id BIGINT PRIMARY KEY,
    label TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS securities (
    id BIGINT PRIMARY KEY,
    symbol TEXT NOT NULL,
    exchange_id BIGINT NOT NULL,
    start_date DATE,
    end_date DATE,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0002_series_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS eod_bars (
    security_id BIGINT NOT NULL,
    date DATE NOT NULL,
    open DOUBLE NOT NULL,
    high DOUBLE NOT NULL,
    low DOUBLE NOT NULL,
    close DOUBLE NOT NULL,
    volume BIGINT NOT NULL,
    PRIMARY KEY(security_id, date)
);

CREATE TABLE IF NOT EXISTS corporate_actions (
    security_id BIGINT NOT NULL,
    action_type TEXT NOT NULL,
    ex_date DATE NOT NULL,
    ratio DOUBLE NOT NULL,
    amount DOUBLE,
    currency TEXT,
    declared_date DATE,
    recorded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS import_log (
    request_id TEXT NOT NULL,
    symbol TEXT,
    status TEXT NOT NULL,
    bar_count BIGINT,
    detail TEXT,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    },
    Migration {
        version: "0003_indexes",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_securities_symbol_exchange ON securities(symbol, exchange_id);
CREATE INDEX IF NOT EXISTS idx_eod_bars_security_date ON eod_bars(security_id, date);
CREATE INDEX IF NOT EXISTS idx_corporate_actions_security_ex_date ON corporate_actions(security_id, ex_date);
CREATE INDEX IF NOT EXISTS idx_import_log_request ON import_log(request_id);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let query = format!(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = '{}'",
            escape_sql_string(migration.version)
        );
        let applied_count: i64 = connection.query_row(query.as_str(), [], |row| row.get(0))?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            let insert = format!(
                "INSERT INTO schema_migrations (version) VALUES ('{}')",
                escape_sql_string(migration.version)
            );
            connection.execute_batch(insert.as_str())?;
        }
    }

    Ok(())
}

fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
