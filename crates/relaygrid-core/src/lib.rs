//! # relaygrid-core: Network Model for Protection Studies
//!
//! Provides the network topology that protection devices are attached to.
//!
//! ## Design
//!
//! Networks are modeled as **undirected multigraphs** where:
//! - **Nodes**: Buses, Generators, Loads
//! - **Edges**: Lines (branches) and transformers between buses
//!
//! Protection code never recomputes power flow from this model. It reads
//! identifiers (does element X exist, which buses does it join), nominal
//! voltages and equipment ratings, and hop distances between buses.
//!
//! ## Quick Start
//!
//! ```rust
//! use relaygrid_core::*;
//!
//! let mut network = Network::new();
//! network.add_bus(Bus {
//!     id: BusId::new(1),
//!     name: "Bus 1".to_string(),
//!     base_kv: Kilovolts(138.0),
//! });
//! network.add_bus(Bus {
//!     id: BusId::new(2),
//!     name: "Bus 2".to_string(),
//!     base_kv: Kilovolts(138.0),
//! });
//! network
//!     .add_branch(Branch::new(
//!         BranchId::new(1),
//!         "Line 1-2".to_string(),
//!         BusId::new(1),
//!         BusId::new(2),
//!         0.01938,
//!         0.05917,
//!     ))
//!     .unwrap();
//!
//! assert!(network.contains(ElementRef::Branch(BranchId::new(1))));
//! assert_eq!(
//!     network.connection_between(BusId::new(2), BusId::new(1)),
//!     Some(ElementRef::Branch(BranchId::new(1)))
//! );
//! ```
//!
//! ## Modules
//!
//! - [`diagnostics`] - Non-fatal validation findings
//! - [`topology`] - Connectivity, islands, hop distances
//! - [`units`] - Unit newtypes (A, s, pu, kV, MVA, ...)

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};

pub mod diagnostics;
pub mod error;
pub mod topology;
pub mod units;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GridError, GridResult};
pub use petgraph::graph::NodeIndex;
pub use units::{
    Amperes, Kilovolts, Megavars, MegavoltAmperes, Megawatts, PerUnit, Seconds,
};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformerId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(usize);

macro_rules! impl_id {
    ($type:ident, $label:literal) => {
        impl $type {
            #[inline]
            pub fn new(value: usize) -> Self {
                $type(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

impl_id!(BusId, "Bus");
impl_id!(BranchId, "Branch");
impl_id!(TransformerId, "Transformer");
impl_id!(GenId, "Gen");
impl_id!(LoadId, "Load");

#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    /// Nominal line-to-line voltage
    pub base_kv: Kilovolts,
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            id: BusId(0),
            name: String::new(),
            base_kv: Kilovolts(0.0),
        }
    }
}

/// A transmission or distribution line.
#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    /// Series resistance (per-unit)
    pub resistance: f64,
    /// Series reactance (per-unit)
    pub reactance: f64,
    /// Thermal rating
    pub rating: Option<MegavoltAmperes>,
    /// In-service flag
    pub status: bool,
}

impl Default for Branch {
    fn default() -> Self {
        Self {
            id: BranchId(0),
            name: String::new(),
            from_bus: BusId(0),
            to_bus: BusId(0),
            resistance: 0.0,
            reactance: 0.0,
            rating: None,
            status: true,
        }
    }
}

impl Branch {
    pub fn new(
        id: BranchId,
        name: String,
        from_bus: BusId,
        to_bus: BusId,
        resistance: f64,
        reactance: f64,
    ) -> Self {
        Self {
            id,
            name,
            from_bus,
            to_bus,
            resistance,
            reactance,
            ..Self::default()
        }
    }

    /// Attach a thermal rating in MVA.
    pub fn with_rating(mut self, rating_mva: Option<f64>) -> Self {
        self.rating = rating_mva.map(MegavoltAmperes);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Transformer {
    pub id: TransformerId,
    pub name: String,
    /// High-voltage side
    pub from_bus: BusId,
    /// Low-voltage side
    pub to_bus: BusId,
    pub ratio: f64,
    pub rating: Option<MegavoltAmperes>,
}

#[derive(Debug, Clone)]
pub struct Gen {
    pub id: GenId,
    pub name: String,
    pub bus: BusId,
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
    /// Machine MVA base
    pub mbase: Option<MegavoltAmperes>,
    pub status: bool,
}

impl Gen {
    pub fn new(id: GenId, name: String, bus: BusId) -> Self {
        Self {
            id,
            name,
            bus,
            active_power: Megawatts(0.0),
            reactive_power: Megavars(0.0),
            mbase: None,
            status: true,
        }
    }

    pub fn with_output(mut self, p_mw: f64, q_mvar: f64) -> Self {
        self.active_power = Megawatts(p_mw);
        self.reactive_power = Megavars(q_mvar);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    pub active_power: Megawatts,
    pub reactive_power: Megavars,
}

#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Gen),
    Load(Load),
}

#[derive(Debug, Clone)]
pub enum Edge {
    Branch(Branch),
    Transformer(Transformer),
}

impl Edge {
    pub fn label(&self) -> &str {
        match self {
            Edge::Branch(branch) => &branch.name,
            Edge::Transformer(tx) => &tx.name,
        }
    }

    /// The element this edge represents.
    pub fn element(&self) -> ElementRef {
        match self {
            Edge::Branch(branch) => ElementRef::Branch(branch.id),
            Edge::Transformer(tx) => ElementRef::Transformer(tx.id),
        }
    }

    fn endpoints(&self) -> (BusId, BusId) {
        match self {
            Edge::Branch(branch) => (branch.from_bus, branch.to_bus),
            Edge::Transformer(tx) => (tx.from_bus, tx.to_bus),
        }
    }
}

impl Node {
    pub fn label(&self) -> &str {
        match self {
            Node::Bus(bus) => &bus.name,
            Node::Gen(gen) => &gen.name,
            Node::Load(load) => &load.name,
        }
    }
}

/// Reference to a network element that a protection device can watch.
///
/// Serialized adjacently tagged, e.g. `{ "type": "bus", "id": 7 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ElementRef {
    Bus(BusId),
    Branch(BranchId),
    Transformer(TransformerId),
    Gen(GenId),
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementRef::Bus(id) => id.fmt(f),
            ElementRef::Branch(id) => id.fmt(f),
            ElementRef::Transformer(id) => id.fmt(f),
            ElementRef::Gen(id) => id.fmt(f),
        }
    }
}

/// The network graph
#[derive(Debug, Default, Clone)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
        }
    }

    pub fn add_bus(&mut self, bus: Bus) -> NodeIndex {
        self.graph.add_node(Node::Bus(bus))
    }

    /// Add a line between two buses that already exist.
    pub fn add_branch(&mut self, branch: Branch) -> GridResult<EdgeIndex> {
        self.add_edge(Edge::Branch(branch))
    }

    /// Add a transformer between two buses that already exist.
    pub fn add_transformer(&mut self, transformer: Transformer) -> GridResult<EdgeIndex> {
        self.add_edge(Edge::Transformer(transformer))
    }

    fn add_edge(&mut self, edge: Edge) -> GridResult<EdgeIndex> {
        let (from, to) = edge.endpoints();
        let from_idx = self.bus_index(from).ok_or_else(|| {
            GridError::Network(format!("{} references unknown {}", edge.element(), from))
        })?;
        let to_idx = self.bus_index(to).ok_or_else(|| {
            GridError::Network(format!("{} references unknown {}", edge.element(), to))
        })?;
        if from_idx == to_idx {
            return Err(GridError::Network(format!(
                "{} connects {} to itself",
                edge.element(),
                from
            )));
        }
        Ok(self.graph.add_edge(from_idx, to_idx, edge))
    }

    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();
        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => stats.num_buses += 1,
                Node::Gen(_) => stats.num_gens += 1,
                Node::Load(l) => {
                    stats.num_loads += 1;
                    stats.total_load_mw += l.active_power.value();
                }
            }
        }
        for edge in self.graph.edge_weights() {
            match edge {
                Edge::Branch(_) => stats.num_branches += 1,
                Edge::Transformer(_) => stats.num_transformers += 1,
            }
        }
        stats
    }

    /// Structural checks that would make protection studies meaningless.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();
        if stats.num_buses == 0 {
            diag.add_error("structure", "Network has no buses");
            return;
        }
        if stats.num_branches + stats.num_transformers == 0 && stats.num_buses > 1 {
            diag.add_error("structure", "Network has multiple buses but no branches");
        }

        let mut seen = std::collections::HashSet::new();
        for bus in self.buses() {
            if !seen.insert(bus.id) {
                diag.add_error_with_entity(
                    "structure",
                    "Duplicate bus id",
                    &bus.id.to_string(),
                );
            }
            if bus.base_kv.value() <= 0.0 {
                diag.add_warning_with_entity(
                    "structure",
                    "Bus has no nominal voltage; rated currents cannot be derived",
                    &bus.id.to_string(),
                );
            }
        }

        for gen in self.generators() {
            if self.bus(gen.bus).is_none() {
                diag.add_error_with_entity(
                    "structure",
                    &format!("Generator attached to unknown {}", gen.bus),
                    &gen.id.to_string(),
                );
            }
        }

        let islands = topology::find_islands(self);
        if islands.len() > 1 {
            diag.add_warning(
                "structure",
                &format!("Network splits into {} islands", islands.len()),
            );
        }
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.graph.node_weights().find_map(|n| match n {
            Node::Bus(b) if b.id == id => Some(b),
            _ => None,
        })
    }

    pub fn bus_index(&self, id: BusId) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|idx| matches!(&self.graph[*idx], Node::Bus(b) if b.id == id))
    }

    pub fn buses(&self) -> Vec<&Bus> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Bus(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn generators(&self) -> Vec<&Gen> {
        self.graph
            .node_weights()
            .filter_map(|n| match n {
                Node::Gen(g) => Some(g),
                _ => None,
            })
            .collect()
    }

    pub fn branches(&self) -> Vec<&Branch> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Branch(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn transformers(&self) -> Vec<&Transformer> {
        self.graph
            .edge_weights()
            .filter_map(|e| match e {
                Edge::Transformer(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Whether the referenced element is part of this network.
    pub fn contains(&self, element: ElementRef) -> bool {
        self.element_buses(element).is_some()
    }

    /// Buses an element touches: one for a bus or generator, two for a
    /// line or transformer. `None` when the element does not exist.
    pub fn element_buses(&self, element: ElementRef) -> Option<Vec<BusId>> {
        match element {
            ElementRef::Bus(id) => self.bus(id).map(|b| vec![b.id]),
            ElementRef::Gen(id) => self
                .generators()
                .into_iter()
                .find(|g| g.id == id)
                .map(|g| vec![g.bus]),
            ElementRef::Branch(_) | ElementRef::Transformer(_) => self
                .graph
                .edge_weights()
                .find(|e| e.element() == element)
                .map(|e| {
                    let (from, to) = e.endpoints();
                    vec![from, to]
                }),
        }
    }

    /// The line or transformer joining two buses, in either direction.
    /// Out-of-service lines do not count as a connection.
    pub fn connection_between(&self, a: BusId, b: BusId) -> Option<ElementRef> {
        if a == b {
            return None;
        }
        self.graph.edge_weights().find_map(|edge| {
            let (from, to) = edge.endpoints();
            let joins = (from == a && to == b) || (from == b && to == a);
            let in_service = match edge {
                Edge::Branch(branch) => branch.status,
                Edge::Transformer(_) => true,
            };
            (joins && in_service).then(|| edge.element())
        })
    }

    /// Rated current of a line or transformer, derived from its MVA rating at
    /// the nominal voltage of its from-side bus. Generators use their machine
    /// base. Buses have no rating.
    pub fn rated_current(&self, element: ElementRef) -> Option<Amperes> {
        let (rating, bus) = match element {
            ElementRef::Bus(_) => return None,
            ElementRef::Gen(id) => {
                let gen = self.generators().into_iter().find(|g| g.id == id)?;
                (gen.mbase?, gen.bus)
            }
            ElementRef::Branch(_) | ElementRef::Transformer(_) => {
                match self.graph.edge_weights().find(|e| e.element() == element)? {
                    Edge::Branch(b) => (b.rating?, b.from_bus),
                    Edge::Transformer(t) => (t.rating?, t.from_bus),
                }
            }
        };
        let base_kv = self.bus(bus)?.base_kv;
        (base_kv.value() > 0.0).then(|| rating.rated_current(base_kv))
    }
}

/// Statistics about a network's size
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_gens: usize,
    pub num_loads: usize,
    pub num_branches: usize,
    pub num_transformers: usize,
    pub total_load_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} lines, {} transformers, {} gens, {} loads ({:.1} MW)",
            self.num_buses,
            self.num_branches,
            self.num_transformers,
            self.num_gens,
            self.num_loads,
            self.total_load_mw
        )
    }
}
