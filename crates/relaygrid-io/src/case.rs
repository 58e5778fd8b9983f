//! Plain-record case files.
//!
//! A case file lists buses, lines, transformers, generators and loads as flat
//! records keyed by integer ids. The same shape is accepted as JSON, YAML or
//! TOML; the format is chosen from the file extension.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use relaygrid_core::{
    Branch, BranchId, Bus, BusId, Diagnostics, Gen, GenId, GridError, GridResult, Kilovolts, Load,
    LoadId, Megavars, MegavoltAmperes, Megawatts, Network, Node, Transformer, TransformerId,
};
use serde::{Deserialize, Serialize};

/// On-disk encodings of a [`CaseFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Json,
    Yaml,
    Toml,
}

impl CaseFormat {
    pub const ALL: &'static [CaseFormat] = &[CaseFormat::Json, CaseFormat::Yaml, CaseFormat::Toml];

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            CaseFormat::Json => &["json"],
            CaseFormat::Yaml => &["yaml", "yml"],
            CaseFormat::Toml => &["toml"],
        }
    }

    /// Format implied by the file extension, if any.
    pub fn from_path(path: &Path) -> Option<CaseFormat> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn parse(&self, text: &str) -> GridResult<CaseFile> {
        match self {
            CaseFormat::Json => Ok(serde_json::from_str(text)?),
            CaseFormat::Yaml => serde_yaml::from_str(text)
                .map_err(|err| GridError::Parse(format!("case yaml: {err}"))),
            CaseFormat::Toml => {
                toml::from_str(text).map_err(|err| GridError::Parse(format!("case toml: {err}")))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusRecord {
    pub id: usize,
    #[serde(default)]
    pub name: Option<String>,
    pub base_kv: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub id: usize,
    #[serde(default)]
    pub name: Option<String>,
    pub from: usize,
    pub to: usize,
    #[serde(default)]
    pub r: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub rating_mva: Option<f64>,
    #[serde(default = "default_in_service")]
    pub in_service: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformerRecord {
    pub id: usize,
    #[serde(default)]
    pub name: Option<String>,
    pub from: usize,
    pub to: usize,
    #[serde(default = "default_ratio")]
    pub ratio: f64,
    #[serde(default)]
    pub rating_mva: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenRecord {
    pub id: usize,
    #[serde(default)]
    pub name: Option<String>,
    pub bus: usize,
    #[serde(default)]
    pub p_mw: f64,
    #[serde(default)]
    pub q_mvar: f64,
    #[serde(default)]
    pub mbase_mva: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRecord {
    pub id: usize,
    #[serde(default)]
    pub name: Option<String>,
    pub bus: usize,
    #[serde(default)]
    pub p_mw: f64,
    #[serde(default)]
    pub q_mvar: f64,
}

/// A whole case as plain records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseFile {
    #[serde(default)]
    pub name: String,
    pub buses: Vec<BusRecord>,
    #[serde(default)]
    pub branches: Vec<BranchRecord>,
    #[serde(default)]
    pub transformers: Vec<TransformerRecord>,
    #[serde(default)]
    pub generators: Vec<GenRecord>,
    #[serde(default)]
    pub loads: Vec<LoadRecord>,
}

fn default_in_service() -> bool {
    true
}

fn default_ratio() -> f64 {
    1.0
}

/// Network built from a case plus everything that was skipped on the way.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub name: String,
    pub network: Network,
    pub diagnostics: Diagnostics,
}

impl CaseFile {
    /// Build the network graph. Records that cannot be placed (duplicate
    /// ids, unknown buses) are skipped and reported as errors in the
    /// returned diagnostics; suspicious values are reported as warnings.
    pub fn build(&self) -> ImportResult {
        let mut network = Network::new();
        let mut diag = Diagnostics::new();

        let mut bus_ids = HashSet::new();
        for record in &self.buses {
            let id = BusId::new(record.id);
            if !bus_ids.insert(id) {
                diag.add_error_with_entity("import", "Duplicate bus record skipped", &id.to_string());
                continue;
            }
            if record.base_kv <= 0.0 {
                diag.add_warning_with_entity(
                    "import",
                    "Bus has non-positive base_kv",
                    &id.to_string(),
                );
            }
            network.add_bus(Bus {
                id,
                name: record
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Bus {}", record.id)),
                base_kv: Kilovolts(record.base_kv),
            });
        }

        let mut branch_ids = HashSet::new();
        for record in &self.branches {
            let id = BranchId::new(record.id);
            if !branch_ids.insert(id) {
                diag.add_error_with_entity(
                    "import",
                    "Duplicate branch record skipped",
                    &id.to_string(),
                );
                continue;
            }
            let mut branch = Branch::new(
                id,
                record
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Line {}-{}", record.from, record.to)),
                BusId::new(record.from),
                BusId::new(record.to),
                record.r,
                record.x,
            )
            .with_rating(record.rating_mva);
            branch.status = record.in_service;
            if let Err(err) = network.add_branch(branch) {
                diag.add_error_with_entity("import", &err.to_string(), &id.to_string());
            }
        }

        let mut transformer_ids = HashSet::new();
        for record in &self.transformers {
            let id = TransformerId::new(record.id);
            if !transformer_ids.insert(id) {
                diag.add_error_with_entity(
                    "import",
                    "Duplicate transformer record skipped",
                    &id.to_string(),
                );
                continue;
            }
            let transformer = Transformer {
                id,
                name: record
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Trafo {}-{}", record.from, record.to)),
                from_bus: BusId::new(record.from),
                to_bus: BusId::new(record.to),
                ratio: record.ratio,
                rating: record.rating_mva.map(MegavoltAmperes),
            };
            if let Err(err) = network.add_transformer(transformer) {
                diag.add_error_with_entity("import", &err.to_string(), &id.to_string());
            }
        }

        let mut gen_ids = HashSet::new();
        for record in &self.generators {
            let id = GenId::new(record.id);
            let bus = BusId::new(record.bus);
            if !gen_ids.insert(id) || !bus_ids.contains(&bus) {
                diag.add_error_with_entity(
                    "import",
                    &format!("Generator skipped (duplicate id or unknown {bus})"),
                    &id.to_string(),
                );
                continue;
            }
            let mut gen = Gen::new(
                id,
                record
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Gen {}", record.id)),
                bus,
            )
            .with_output(record.p_mw, record.q_mvar);
            gen.mbase = record.mbase_mva.map(MegavoltAmperes);
            network.graph.add_node(Node::Gen(gen));
        }

        let mut load_ids = HashSet::new();
        for record in &self.loads {
            let id = LoadId::new(record.id);
            let bus = BusId::new(record.bus);
            if !load_ids.insert(id) || !bus_ids.contains(&bus) {
                diag.add_error_with_entity(
                    "import",
                    &format!("Load skipped (duplicate id or unknown {bus})"),
                    &id.to_string(),
                );
                continue;
            }
            network.graph.add_node(Node::Load(Load {
                id,
                name: record
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Load {}", record.id)),
                bus,
                active_power: Megawatts(record.p_mw),
                reactive_power: Megavars(record.q_mvar),
            }));
        }

        ImportResult {
            name: self.name.clone(),
            network,
            diagnostics: diag,
        }
    }
}

/// Parse a case from text. Without an explicit format, YAML is tried first
/// (it also accepts JSON), then TOML.
pub fn parse_case(text: &str, format: Option<CaseFormat>) -> GridResult<CaseFile> {
    match format {
        Some(format) => format.parse(text),
        None => CaseFormat::Yaml
            .parse(text)
            .or_else(|_| CaseFormat::Toml.parse(text))
            .map_err(|_| GridError::Parse("case file is neither YAML, JSON nor TOML".into())),
    }
}

/// Read a case file and build its network.
pub fn load_case(path: &Path) -> GridResult<ImportResult> {
    let text = fs::read_to_string(path)?;
    let case = parse_case(&text, CaseFormat::from_path(path))
        .map_err(|err| GridError::Parse(format!("{}: {err}", path.display())))?;
    let mut result = case.build();
    if result.name.is_empty() {
        result.name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("case")
            .to_string();
    }
    Ok(result)
}
