use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Result};
use relaygrid_cli::cli::{BreakerCommand, DecideReading, OutputFormat};
use relaygrid_protection::{DeviceKind, Measurement, ProtectionDevice};
use tabwriter::TabWriter;
use tracing::info;

use super::{load_network, load_scheme};

pub fn validate(config: &Path, case: Option<&Path>) -> Result<()> {
    let imported = load_network(case)?;
    let scheme = load_scheme(config, &imported.network)?;
    let diagnostics = scheme.audit(&imported.network);
    println!(
        "Scheme {}: {} devices, {} zones, margin {}",
        config.display(),
        scheme.devices().count(),
        scheme.zones().len(),
        scheme.margin()
    );
    print!("{diagnostics}");
    if diagnostics.has_errors() {
        bail!("scheme audit found {}", diagnostics.summary());
    }
    Ok(())
}

pub fn list(config: &Path, case: Option<&Path>, format: OutputFormat) -> Result<()> {
    let imported = load_network(case)?;
    let scheme = load_scheme(config, &imported.network)?;
    let devices: Vec<&ProtectionDevice> = scheme.devices().collect();
    match format {
        OutputFormat::Plain => {
            let mut writer = TabWriter::new(io::stdout());
            writeln!(writer, "ID\tKIND\tANSI\tELEMENT\tSETTING\tTIME\tTRIPS")?;
            for device in devices {
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    device.id(),
                    device.kind(),
                    device.kind().ansi_code(),
                    device.element(),
                    setting_label(device),
                    device.operating_time(),
                    device.trips().map_or("-".to_string(), |b| b.to_string()),
                )?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &devices)
                .map_err(|err| anyhow!("serializing devices to JSON: {err}"))?;
            println!();
        }
    }
    Ok(())
}

fn setting_label(device: &ProtectionDevice) -> String {
    let unit = match device.kind() {
        DeviceKind::Undervoltage | DeviceKind::Overvoltage => "pu",
        _ => "A",
    };
    match device.rule().setting() {
        Some(value) => format!("{value} {unit}"),
        None => "-".to_string(),
    }
}

pub fn decide(config: &Path, case: Option<&Path>, id: &str, reading: &DecideReading) -> Result<()> {
    let imported = load_network(case)?;
    let scheme = load_scheme(config, &imported.network)?;
    let measurement = measurement_from(reading)?;
    let trip = scheme.decide(id, &measurement)?;
    info!(device = id, trip, "decided on {measurement}");
    println!(
        "{id}: {} at {measurement}",
        if trip { "TRIP" } else { "no trip" }
    );
    Ok(())
}

fn measurement_from(reading: &DecideReading) -> Result<Measurement> {
    let measurement = match reading {
        DecideReading {
            current: Some(amps),
            direction: Some(direction),
            ..
        } => Measurement::directional(*amps, *direction),
        DecideReading {
            current: Some(amps),
            ..
        } => Measurement::current(*amps),
        DecideReading {
            primary: Some(primary),
            secondary: Some(secondary),
            ..
        } => Measurement::differential(*primary, *secondary),
        DecideReading {
            voltage: Some(pu), ..
        } => Measurement::voltage(*pu),
        DecideReading {
            command: Some(command),
            ..
        } => Measurement::command(*command == BreakerCommand::Open),
        _ => bail!("no reading given"),
    };
    Ok(measurement)
}
