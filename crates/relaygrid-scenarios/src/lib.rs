//! Fault scenario sets: a file of faults with shared defaults, resolved into
//! [`relaygrid_protection::FaultScenario`]s for a coordination run.

pub mod spec;

pub use spec::{
    check_against_scheme, load_spec_from_path, resolve_scenarios, validate, FaultScenarioSet,
    ScenarioDefaults, ScenarioSpec, SeveritySpec,
};
