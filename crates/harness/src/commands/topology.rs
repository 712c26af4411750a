//! NUMA topology command

use crate::output::{self, OutputFormat};
use anyhow::Result;
use harness_lib::launcher::detect_numa_nodes;
use serde_json::json;
use std::path::Path;

pub fn show_topology(node_root: &Path, format: OutputFormat) -> Result<()> {
    let nodes = detect_numa_nodes(node_root)?;

    match format {
        OutputFormat::Json => output::print_json(&json!({
            "node_root": node_root.display().to_string(),
            "numa_nodes": nodes,
        })),
        OutputFormat::Table => {
            output::print_info(&format!("Detected {} NUMA nodes under {}", nodes, node_root.display()))
        }
    }

    Ok(())
}
