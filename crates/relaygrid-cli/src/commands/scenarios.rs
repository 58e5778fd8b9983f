use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, Result};
use relaygrid_cli::cli::OutputFormat;
use relaygrid_scenarios::{check_against_scheme, load_spec_from_path, resolve_scenarios};
use tabwriter::TabWriter;

use super::{load_network, load_scheme};

pub fn validate(spec: &Path, config: Option<&Path>, case: Option<&Path>) -> Result<()> {
    let set = load_spec_from_path(spec)?;
    let scenarios = resolve_scenarios(&set)?;
    if let Some(config) = config {
        let imported = load_network(case)?;
        let scheme = load_scheme(config, &imported.network)?;
        check_against_scheme(&scenarios, &scheme)?;
    }
    println!("Scenario spec validated successfully ({} scenarios)", scenarios.len());
    Ok(())
}

pub fn list(spec: &Path, format: OutputFormat) -> Result<()> {
    let set = load_spec_from_path(spec)?;
    let scenarios = resolve_scenarios(&set)?;
    match format {
        OutputFormat::Plain => {
            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "SCENARIO\tZONE\tSEVERITY\tMARGIN\tSCRIPTED\tTAGS")?;
            for scenario in &scenarios {
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    scenario.id,
                    scenario.zone,
                    scenario.severity,
                    scenario.margin.map_or("-".to_string(), |m| m.to_string()),
                    scenario.measurements.len(),
                    scenario.tags.join(","),
                )?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &scenarios)
                .map_err(|err| anyhow!("serializing scenarios to JSON: {err}"))?;
            println!();
        }
    }
    Ok(())
}
