use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use relaygrid_cli::cli::OutputFormat;
use relaygrid_core::{Amperes, Seconds};
use relaygrid_protection::{
    AttenuatingPropagation, CoordinationChecker, CoordinationReport, CoordinationResult,
    Telemetry, TracingTelemetry,
};
use relaygrid_scenarios::{check_against_scheme, load_spec_from_path, resolve_scenarios};
use tabwriter::TabWriter;
use tracing::info;

use super::{load_network, load_scheme};

pub struct CoordinateArgs<'a> {
    pub config: &'a Path,
    pub scenarios: &'a Path,
    pub case: Option<&'a Path>,
    pub margin: Option<f64>,
    pub base_current: f64,
    pub format: OutputFormat,
    pub strict: bool,
}

pub fn handle(args: &CoordinateArgs<'_>) -> Result<()> {
    let start = Instant::now();
    let imported = load_network(args.case)?;
    let scheme = load_scheme(args.config, &imported.network)?;
    let set = load_spec_from_path(args.scenarios)?;
    let scenarios = resolve_scenarios(&set)?;
    check_against_scheme(&scenarios, &scheme)?;

    let telemetry: Arc<dyn Telemetry> = Arc::new(TracingTelemetry);
    let mut checker = CoordinationChecker::new().with_telemetry(Arc::clone(&telemetry));
    if let Some(margin) = args.margin {
        if !margin.is_finite() || margin < 0.0 {
            bail!("--margin must be a non-negative number of seconds, got {margin}");
        }
        checker = checker.with_margin(Seconds(margin));
    }
    let propagation = AttenuatingPropagation::with_base_current(Amperes(args.base_current));
    let report = checker.check_all(&scheme, &imported.network, &scenarios, &propagation);
    telemetry.flush();
    let report = report?;
    info!(
        "checked {} scenarios on case {} in {:.1} ms",
        report.results.len(),
        imported.name,
        start.elapsed().as_secs_f64() * 1000.0
    );

    match args.format {
        OutputFormat::Plain => print_table(&report)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &report)
                .map_err(|err| anyhow!("serializing coordination report to JSON: {err}"))?;
            println!();
        }
    }

    if args.strict && report.passed() < report.results.len() {
        bail!(
            "{} of {} scenarios failed coordination",
            report.results.len() - report.passed(),
            report.results.len()
        );
    }
    Ok(())
}

fn print_table(report: &CoordinationReport) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(
        writer,
        "SCENARIO\tZONE\tOUTCOME\tPRIMARY\tBACKUP\tMARGIN\tREQUIRED\tOPENED"
    )?;
    for result in &report.results {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            result.scenario,
            result.zone,
            result.outcome,
            trip_label(result, true),
            trip_label(result, false),
            result.margin.map_or("-".to_string(), |m| m.to_string()),
            result.required_margin,
            joined(&result.opened_breakers),
        )?;
    }
    writer.flush()?;
    println!("{}", report.summary());
    Ok(())
}

fn trip_label(result: &CoordinationResult, primary: bool) -> String {
    let trip = if primary { &result.primary } else { &result.backup };
    match trip {
        Some(trip) => format!("{} @ {}", trip.device, trip.operating_time),
        None if !result.tied.is_empty() => format!("tie: {}", joined(&result.tied)),
        None => "-".to_string(),
    }
}

fn joined<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
