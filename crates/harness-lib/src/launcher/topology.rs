//! NUMA topology detection from sysfs

use crate::error::{HarnessError, Result};
use std::fs;
use std::path::Path;

/// Default location of the per-node sysfs entries
pub const NODE_ROOT: &str = "/sys/devices/system/node";

/// True for `node<digits>` entries
fn is_node_entry(name: &str) -> bool {
    name.strip_prefix("node")
        .map(|idx| !idx.is_empty() && idx.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

/// Count the NUMA nodes exposed under `root`
pub fn detect_numa_nodes(root: &Path) -> Result<usize> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HarnessError::Topology {
                root: root.to_path_buf(),
            })
        }
        Err(e) => return Err(HarnessError::io(root, e)),
    };

    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io(root, e))?;
        let name = entry.file_name();
        if is_node_entry(&name.to_string_lossy()) {
            count += 1;
        }
    }

    if count == 0 {
        return Err(HarnessError::Topology {
            root: root.to_path_buf(),
        });
    }

    tracing::debug!(root = %root.display(), nodes = count, "Detected NUMA topology");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_counts_only_node_entries() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["node0", "node1", "node12", "possible", "online", "nodeX", "node"] {
            fs::create_dir(temp_dir.path().join(name)).unwrap();
        }
        fs::write(temp_dir.path().join("has_cpu"), "0-7\n").unwrap();

        assert_eq!(detect_numa_nodes(temp_dir.path()).unwrap(), 3);
    }

    #[test]
    fn test_no_nodes_is_topology_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("possible")).unwrap();

        let err = detect_numa_nodes(temp_dir.path()).unwrap_err();
        assert!(matches!(err, HarnessError::Topology { .. }));
    }

    #[test]
    fn test_missing_root_is_topology_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = detect_numa_nodes(&temp_dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, HarnessError::Topology { .. }));
    }
}
