//! The IEEE 14-bus test system.
//!
//! Impedances, transformer ratios and generator dispatch follow the
//! published case data. Buses 1-5 sit on the 138 kV side, bus 8 at the 18 kV
//! condenser terminal, the rest on the 13.8 kV side.
//!
//! Lines are numbered 1..=17 and transformers 1..=3 in case order:
//!
//! | id | element | id | element |
//! |----|---------|----|---------|
//! | L1 | 1-2 | L10 | 6-13 |
//! | L2 | 1-5 | L11 | 7-8 |
//! | L3 | 2-3 | L12 | 7-9 |
//! | L4 | 2-4 | L13 | 9-10 |
//! | L5 | 2-5 | L14 | 9-14 |
//! | L6 | 3-4 | L15 | 10-11 |
//! | L7 | 4-5 | L16 | 12-13 |
//! | L8 | 6-11 | L17 | 13-14 |
//! | L9 | 6-12 | T1, T2, T3 | 4-7, 4-9, 5-6 |

use relaygrid_core::Network;

use crate::case::{BranchRecord, BusRecord, CaseFile, GenRecord, LoadRecord, TransformerRecord};

const BUSES: [(usize, f64, f64, f64); 14] = [
    // (id, base_kv, Pd MW, Qd Mvar)
    (1, 138.0, 0.0, 0.0),
    (2, 138.0, 21.7, 12.7),
    (3, 138.0, 94.2, 19.0),
    (4, 138.0, 47.8, -3.9),
    (5, 138.0, 7.6, 1.6),
    (6, 13.8, 11.2, 7.5),
    (7, 13.8, 0.0, 0.0),
    (8, 18.0, 0.0, 0.0),
    (9, 13.8, 29.5, 16.6),
    (10, 13.8, 9.0, 5.8),
    (11, 13.8, 3.5, 1.8),
    (12, 13.8, 6.1, 1.6),
    (13, 13.8, 13.5, 5.8),
    (14, 13.8, 14.9, 5.0),
];

const LINES: [(usize, usize, f64, f64); 17] = [
    (1, 2, 0.01938, 0.05917),
    (1, 5, 0.05403, 0.22304),
    (2, 3, 0.04699, 0.19797),
    (2, 4, 0.05811, 0.17632),
    (2, 5, 0.05695, 0.17388),
    (3, 4, 0.06701, 0.17103),
    (4, 5, 0.01335, 0.04211),
    (6, 11, 0.09498, 0.19890),
    (6, 12, 0.12291, 0.25581),
    (6, 13, 0.06615, 0.13027),
    (7, 8, 0.0, 0.17615),
    (7, 9, 0.0, 0.11001),
    (9, 10, 0.03181, 0.08450),
    (9, 14, 0.12711, 0.27038),
    (10, 11, 0.08205, 0.19207),
    (12, 13, 0.22092, 0.19988),
    (13, 14, 0.17093, 0.34802),
];

const TRANSFORMERS: [(usize, usize, f64); 3] = [(4, 7, 0.978), (4, 9, 0.969), (5, 6, 0.932)];

const GENERATORS: [(usize, f64, f64); 5] = [
    (1, 232.4, -16.9),
    (2, 40.0, 42.4),
    (3, 0.0, 23.4),
    (6, 0.0, 12.2),
    (8, 0.0, 17.4),
];

/// Case records for IEEE 14, for callers that want to edit before building.
pub fn case14_records() -> CaseFile {
    CaseFile {
        name: "ieee14".to_string(),
        buses: BUSES
            .iter()
            .map(|&(id, base_kv, _, _)| BusRecord {
                id,
                name: Some(format!("Bus {id}")),
                base_kv,
            })
            .collect(),
        branches: LINES
            .iter()
            .enumerate()
            .map(|(idx, &(from, to, r, x))| BranchRecord {
                id: idx + 1,
                name: Some(format!("Line {from}-{to}")),
                from,
                to,
                r,
                x,
                rating_mva: None,
                in_service: true,
            })
            .collect(),
        transformers: TRANSFORMERS
            .iter()
            .enumerate()
            .map(|(idx, &(from, to, ratio))| TransformerRecord {
                id: idx + 1,
                name: Some(format!("Trafo {from}-{to}")),
                from,
                to,
                ratio,
                rating_mva: None,
            })
            .collect(),
        generators: GENERATORS
            .iter()
            .enumerate()
            .map(|(idx, &(bus, p_mw, q_mvar))| GenRecord {
                id: idx + 1,
                name: Some(format!("G{}", idx + 1)),
                bus,
                p_mw,
                q_mvar,
                mbase_mva: Some(100.0),
            })
            .collect(),
        loads: BUSES
            .iter()
            .filter(|&&(_, _, p, q)| p != 0.0 || q != 0.0)
            .enumerate()
            .map(|(idx, &(bus, _, p_mw, q_mvar))| LoadRecord {
                id: idx + 1,
                name: Some(format!("Load {bus}")),
                bus,
                p_mw,
                q_mvar,
            })
            .collect(),
    }
}

/// The IEEE 14-bus network.
pub fn case14() -> Network {
    case14_records().build().network
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaygrid_core::topology::{bus_distances, graph_stats};
    use relaygrid_core::{BranchId, BusId, ElementRef, TransformerId};

    #[test]
    fn case14_shape() {
        let result = case14_records().build();
        assert!(!result.diagnostics.has_issues(), "{}", result.diagnostics);

        let stats = result.network.stats();
        assert_eq!(stats.num_buses, 14);
        assert_eq!(stats.num_branches, 17);
        assert_eq!(stats.num_transformers, 3);
        assert_eq!(stats.num_gens, 5);
        assert_eq!(stats.num_loads, 11);
        assert!((stats.total_load_mw - 259.0).abs() < 1e-9);
    }

    #[test]
    fn case14_is_one_island() {
        assert_eq!(graph_stats(&case14()).connected_components, 1);
    }

    #[test]
    fn documented_element_numbering() {
        let network = case14();
        assert_eq!(
            network.connection_between(BusId::new(6), BusId::new(13)),
            Some(ElementRef::Branch(BranchId::new(10)))
        );
        assert_eq!(
            network.connection_between(BusId::new(9), BusId::new(4)),
            Some(ElementRef::Transformer(TransformerId::new(2)))
        );
        assert_eq!(network.connection_between(BusId::new(1), BusId::new(14)), None);
    }

    #[test]
    fn hop_distances_from_bus_one() {
        let d = bus_distances(&case14(), BusId::new(1));
        assert_eq!(d[&BusId::new(2)], 1);
        assert_eq!(d[&BusId::new(4)], 2);
        assert_eq!(d[&BusId::new(7)], 3);
        assert_eq!(d[&BusId::new(8)], 4);
    }
}
