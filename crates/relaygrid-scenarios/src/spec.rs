use anyhow::{anyhow, bail, Context, Result};
use relaygrid_core::Seconds;
use relaygrid_protection::{DeviceId, FaultScenario, FaultSeverity, Measurement, ProtectionScheme};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultScenarioSet {
    pub version: Option<u32>,
    #[serde(default)]
    pub defaults: ScenarioDefaults,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

/// Severity as a number in [0, 1] or one of `low`, `medium`, `high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeveritySpec {
    Value(f64),
    Label(String),
}

impl SeveritySpec {
    pub fn resolve(&self) -> Result<FaultSeverity> {
        let severity = match self {
            SeveritySpec::Value(value) => FaultSeverity::new(*value),
            SeveritySpec::Label(label) => FaultSeverity::from_label(label),
        };
        Ok(severity?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefaults {
    #[serde(default = "default_severity")]
    pub severity: SeveritySpec,
    /// Required primary/backup margin; the scheme margin applies when unset
    #[serde(default)]
    pub margin_s: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_severity() -> SeveritySpec {
    SeveritySpec::Value(0.5)
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            severity: default_severity(),
            margin_s: None,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub scenario_id: String,
    pub zone: String,
    pub description: Option<String>,
    pub severity: Option<SeveritySpec>,
    pub margin_s: Option<f64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Readings that replace the propagation model for the named devices
    #[serde(default)]
    pub measurements: Option<BTreeMap<String, Measurement>>,
}

pub fn load_spec_from_path(path: &Path) -> Result<FaultScenarioSet> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario spec"),
    }
}

/// Apply defaults and validate ids, severities and margins.
pub fn resolve_scenarios(set: &FaultScenarioSet) -> Result<Vec<FaultScenario>> {
    if set.scenarios.is_empty() {
        return Err(anyhow!("scenario set contains no scenarios"));
    }
    let defaults = &set.defaults;
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(set.scenarios.len());
    for spec in &set.scenarios {
        let id = spec.scenario_id.trim();
        if id.is_empty() {
            return Err(anyhow!("scenario_id cannot be empty"));
        }
        if !seen.insert(id) {
            return Err(anyhow!("duplicate scenario_id '{}' in spec", id));
        }
        if spec.zone.trim().is_empty() {
            return Err(anyhow!("scenario '{}' does not name a zone", id));
        }
        let severity = spec
            .severity
            .as_ref()
            .unwrap_or(&defaults.severity)
            .resolve()
            .with_context(|| format!("severity for scenario '{}'", id))?;

        let mut scenario = FaultScenario::new(id, spec.zone.trim(), severity)?;
        scenario.description = spec.description.clone();
        scenario.tags = spec
            .tags
            .as_ref()
            .cloned()
            .unwrap_or_else(|| defaults.tags.clone());
        if let Some(margin) = spec.margin_s.or(defaults.margin_s) {
            if !margin.is_finite() || margin < 0.0 {
                bail!("scenario '{}' has invalid margin_s {}", id, margin);
            }
            scenario.margin = Some(Seconds(margin));
        }
        scenario.measurements = spec
            .measurements
            .iter()
            .flatten()
            .map(|(device, measurement)| (DeviceId::new(device.as_str()), *measurement))
            .collect();
        resolved.push(scenario);
    }
    Ok(resolved)
}

pub fn validate(set: &FaultScenarioSet) -> Result<()> {
    resolve_scenarios(set).map(|_| ())
}

/// Check that every scenario faults a zone of `scheme` and scripts readings
/// only for devices that zone contains, of the kind each device reads.
pub fn check_against_scheme(scenarios: &[FaultScenario], scheme: &ProtectionScheme) -> Result<()> {
    for scenario in scenarios {
        let zone = scheme.zone(&scenario.zone).ok_or_else(|| {
            anyhow!(
                "scenario '{}' faults zone '{}', which the scheme does not define",
                scenario.id,
                scenario.zone
            )
        })?;
        let members = zone.members();
        if let Some(stray) = scenario
            .measurements
            .keys()
            .find(|device| !members.contains(device))
        {
            bail!(
                "scenario '{}' scripts a reading for '{}', which is not in zone '{}'",
                scenario.id,
                stray,
                scenario.zone
            );
        }
        for (id, measurement) in &scenario.measurements {
            let device = scheme.device(id.as_str()).ok_or_else(|| {
                anyhow!("scenario '{}' scripts unknown device '{}'", scenario.id, id)
            })?;
            if device.rule().evaluate(measurement).is_none() {
                bail!(
                    "scenario '{}' scripts a {} reading for '{}', which expects a {} measurement",
                    scenario.id,
                    measurement.kind(),
                    id,
                    device.rule().expected_measurement()
                );
            }
        }
    }
    Ok(())
}
