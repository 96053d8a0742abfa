mod import;
mod registry;
mod sql;

use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

use eodex_warehouse::Warehouse;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::{Envelope, EnvelopeError, EnvelopeMeta};

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let warehouse = open_warehouse(cli)?;

    let command_result = match &cli.command {
        Command::Import(args) => import::run(args, &warehouse)?,
        Command::Registry(args) => registry::run(args, &warehouse)?,
        Command::Sql(args) => sql::run(args, &warehouse)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    let latency_ms = started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64;
    let meta = EnvelopeMeta::new(Uuid::new_v4().to_string(), latency_ms, warnings);

    Ok(Envelope {
        meta,
        data,
        errors,
    })
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let result = match &cli.db {
        Some(path) => Warehouse::open_path(path),
        None => Warehouse::open_default(),
    };

    result.map_err(|error| CliError::Command(format!("failed to open warehouse: {error}")))
}
