use uuid::Uuid;

use eodex_core::{FlatFileFeed, Importer};
use eodex_warehouse::Warehouse;

use crate::cli::ImportArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &ImportArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let mut feed = FlatFileFeed::open(&args.feed)
        .map_err(|error| CliError::Command(format!("failed to open vendor feed: {error}")))?;

    let importer = Importer::new(warehouse)?;
    let report = importer.run(&mut feed)?;

    let request_id = format!("import:{}", Uuid::new_v4());
    warehouse
        .log_report(request_id.as_str(), &report)
        .map_err(|error| CliError::Command(format!("failed to record import log: {error}")))?;

    let warnings = report.warnings.clone();
    let mut result = CommandResult::ok(serde_json::to_value(&report)?).with_warnings(warnings);

    if report.symbols_unmatched > 0 {
        result = result.with_warning(format!(
            "{} symbol(s) could not be resolved; inspect outcomes",
            report.symbols_unmatched
        ));
    }

    Ok(result)
}
