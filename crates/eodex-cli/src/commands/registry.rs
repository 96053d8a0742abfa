use std::fs::File;
use std::io::BufReader;

use serde::Serialize;

use eodex_core::{Exchange, Security};
use eodex_warehouse::{SeedDocument, Warehouse};

use crate::cli::{RegistryArgs, RegistryCommand};
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct RegistryListing {
    exchanges: Vec<Exchange>,
    securities: Vec<Security>,
}

pub fn run(args: &RegistryArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    match &args.command {
        RegistryCommand::Seed(seed_args) => {
            let file = File::open(&seed_args.file)?;
            let document: SeedDocument = serde_json::from_reader(BufReader::new(file))?;

            let report = warehouse
                .apply_seed(&document)
                .map_err(|error| CliError::Command(format!("seed failed: {error}")))?;

            let mut result = CommandResult::ok(serde_json::to_value(&report)?);
            if report.securities_skipped > 0 {
                result = result.with_warning(format!(
                    "{} listing(s) already present and skipped",
                    report.securities_skipped
                ));
            }
            Ok(result)
        }
        RegistryCommand::List => {
            let listing = RegistryListing {
                exchanges: warehouse
                    .list_exchanges()
                    .map_err(|error| CliError::Command(error.to_string()))?,
                securities: warehouse
                    .list_securities()
                    .map_err(|error| CliError::Command(error.to_string()))?,
            };

            Ok(CommandResult::ok(serde_json::to_value(&listing)?))
        }
    }
}
