use crate::{BusId, Network, Node};
use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet, VecDeque};

/// Summary statistics over the bus/branch graph (density, degree, components).
#[derive(Debug, Clone)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub density: f64,
}

/// Island summary: buses that stay connected to each other.
#[derive(Debug, Clone)]
pub struct Island {
    pub island_id: usize,
    pub buses: Vec<BusId>,
}

/// Graph-level statistics computed over buses only (gens and loads hang off
/// buses without edges and would otherwise count as isolated components).
pub fn graph_stats(network: &Network) -> GraphStats {
    let bus_nodes: Vec<NodeIndex> = bus_indices(network).collect();
    let node_count = bus_nodes.len();
    let edge_count = network.graph.edge_count();
    let degrees: Vec<usize> = bus_nodes
        .iter()
        .map(|idx| network.graph.neighbors(*idx).count())
        .collect();
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    let density = if node_count < 2 {
        0.0
    } else {
        2.0 * edge_count as f64 / (node_count as f64 * (node_count as f64 - 1.0))
    };
    let non_bus_nodes = network.graph.node_count() - node_count;
    let connected_components = connected_components(&network.graph) - non_bus_nodes;
    GraphStats {
        node_count,
        edge_count,
        connected_components,
        min_degree,
        avg_degree,
        max_degree,
        density,
    }
}

/// Labels connected bus groups with a breadth-first search.
pub fn find_islands(network: &Network) -> Vec<Island> {
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    for start in bus_indices(network) {
        if visited.contains(&start) {
            continue;
        }
        let mut buses = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            if let Node::Bus(bus) = &network.graph[node] {
                buses.push(bus.id);
            }
            queue.extend(
                network
                    .graph
                    .neighbors(node)
                    .filter(|n| !visited.contains(n)),
            );
        }
        buses.sort_by_key(|id| id.value());
        islands.push(Island {
            island_id: islands.len(),
            buses,
        });
    }
    islands
}

/// Hop distance from `origin` to every reachable bus, counting one hop per
/// line or transformer. The origin itself is at distance 0; unreachable
/// buses are absent from the map.
pub fn bus_distances(network: &Network, origin: BusId) -> HashMap<BusId, usize> {
    let mut distances = HashMap::new();
    let Some(start) = network.bus_index(origin) else {
        return distances;
    };
    let mut queue = VecDeque::from([(start, 0usize)]);
    let mut seen = HashSet::from([start]);
    while let Some((node, hops)) = queue.pop_front() {
        if let Node::Bus(bus) = &network.graph[node] {
            distances.insert(bus.id, hops);
        }
        for neighbor in network.graph.neighbors(node) {
            if seen.insert(neighbor) {
                queue.push_back((neighbor, hops + 1));
            }
        }
    }
    distances
}

/// Buses directly connected to `bus` by a line or transformer.
pub fn adjacent_buses(network: &Network, bus: BusId) -> Vec<BusId> {
    let Some(idx) = network.bus_index(bus) else {
        return Vec::new();
    };
    let mut neighbors: Vec<BusId> = network
        .graph
        .neighbors(idx)
        .filter_map(|n| match &network.graph[n] {
            Node::Bus(b) => Some(b.id),
            _ => None,
        })
        .collect();
    neighbors.sort_by_key(|id| id.value());
    neighbors.dedup();
    neighbors
}

fn bus_indices(network: &Network) -> impl Iterator<Item = NodeIndex> + '_ {
    network
        .graph
        .node_indices()
        .filter(|idx| matches!(network.graph[*idx], Node::Bus(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Branch, BranchId, Bus, Gen, GenId};

    /// 1 - 2 - 3 chain plus an isolated bus 4 and a generator on bus 1.
    fn chain() -> Network {
        let mut network = Network::new();
        for id in 1..=4 {
            network.add_bus(Bus {
                id: BusId::new(id),
                name: format!("Bus {id}"),
                ..Bus::default()
            });
        }
        network.graph.add_node(Node::Gen(Gen::new(
            GenId::new(1),
            "G1".into(),
            BusId::new(1),
        )));
        for (id, from, to) in [(1, 1, 2), (2, 2, 3)] {
            network
                .add_branch(Branch::new(
                    BranchId::new(id),
                    format!("Line {from}-{to}"),
                    BusId::new(from),
                    BusId::new(to),
                    0.01,
                    0.1,
                ))
                .unwrap();
        }
        network
    }

    #[test]
    fn stats_ignore_non_bus_nodes() {
        let stats = graph_stats(&chain());
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.connected_components, 2);
        assert_eq!(stats.min_degree, 0);
        assert_eq!(stats.max_degree, 2);
    }

    #[test]
    fn islands_group_connected_buses() {
        let islands = find_islands(&chain());
        assert_eq!(islands.len(), 2);
        assert_eq!(
            islands[0].buses,
            vec![BusId::new(1), BusId::new(2), BusId::new(3)]
        );
        assert_eq!(islands[1].buses, vec![BusId::new(4)]);
    }

    #[test]
    fn distances_count_hops() {
        let network = chain();
        let d = bus_distances(&network, BusId::new(1));
        assert_eq!(d[&BusId::new(1)], 0);
        assert_eq!(d[&BusId::new(2)], 1);
        assert_eq!(d[&BusId::new(3)], 2);
        assert!(!d.contains_key(&BusId::new(4)));
        assert!(bus_distances(&network, BusId::new(99)).is_empty());
    }

    #[test]
    fn adjacency_lists_neighbors() {
        let network = chain();
        assert_eq!(
            adjacent_buses(&network, BusId::new(2)),
            vec![BusId::new(1), BusId::new(3)]
        );
        assert!(adjacent_buses(&network, BusId::new(4)).is_empty());
    }
}
