use std::path::Path;

use anyhow::{Context, Result};
use rayon::ThreadPoolBuilder;
use relaygrid_core::Network;
use relaygrid_io::{ieee14, load_case, ImportResult};
use relaygrid_protection::{load_config_from_path, ProtectionScheme};
use tracing::{debug, warn};

pub mod case;
pub mod coordinate;
pub mod devices;
pub mod scenarios;

/// Load `path`, or the built-in IEEE 14-bus case when no path is given.
/// Import findings are logged as warnings.
pub fn load_network(path: Option<&Path>) -> Result<ImportResult> {
    let imported = match path {
        Some(path) => load_case(path).with_context(|| format!("loading case '{}'", path.display()))?,
        None => ieee14::case14_records().build(),
    };
    for issue in &imported.diagnostics.issues {
        warn!(case = %imported.name, "{issue}");
    }
    debug!(case = %imported.name, "{}", imported.network.stats());
    Ok(imported)
}

pub fn load_scheme(config: &Path, network: &Network) -> Result<ProtectionScheme> {
    let parsed = load_config_from_path(config)
        .with_context(|| format!("loading protection config '{}'", config.display()))?;
    let scheme = ProtectionScheme::build(&parsed, network)
        .with_context(|| format!("building scheme from '{}'", config.display()))?;
    Ok(scheme)
}

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| {
            warn!("invalid thread count '{spec}', using all cores");
            num_cpus::get()
        })
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}
