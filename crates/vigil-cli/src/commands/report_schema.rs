use vigil_core::reports::ReportKind;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::ReportSchemaArgs;
use crate::commands::Outcome;
use crate::output::output;

/// Handle `vgl report-schema <kind>`.
pub fn handle(args: &ReportSchemaArgs, flags: &GlobalFlags) -> anyhow::Result<Outcome> {
    let schema = ReportKind::from(args.kind).json_schema();
    output(&schema, flags.format)?;
    Ok(Outcome::Passed)
}
