use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use relaygrid_core::topology::{find_islands, graph_stats};
use tabwriter::TabWriter;

use super::load_network;

pub fn stats(case: Option<&Path>) -> Result<()> {
    let imported = load_network(case)?;
    let network = &imported.network;
    let stats = graph_stats(network);
    let islands = find_islands(network);

    println!("Case {}: {}", imported.name, network.stats());
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "  Buses\t{}", stats.node_count)?;
    writeln!(writer, "  Lines + transformers\t{}", stats.edge_count)?;
    writeln!(writer, "  Islands\t{}", islands.len())?;
    writeln!(
        writer,
        "  Degree [min/avg/max]\t{}/{:.2}/{}",
        stats.min_degree, stats.avg_degree, stats.max_degree
    )?;
    writeln!(writer, "  Density\t{:.4}", stats.density)?;
    writer.flush()?;
    if imported.diagnostics.has_issues() {
        print!("{}", imported.diagnostics);
    }
    Ok(())
}
