//! Memory placement policy handling
//!
//! Turns the user supplied policy list into a deterministic run → policy
//! assignment and derives filename-safe labels for batch output paths.

mod placement;

pub use placement::PlacementPolicy;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Policy used when the caller supplies nothing usable
pub const DEFAULT_POLICY: &str = "default";

/// Fallback label when sanitizing leaves nothing behind
const FALLBACK_LABEL: &str = "policy";

static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();

/// Round-robin assignment of policies to runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyCycle {
    policies: Vec<String>,
}

impl PolicyCycle {
    /// Flatten comma-joined entries, trim and drop empties
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policies: Vec<String> = raw
            .into_iter()
            .flat_map(|entry| {
                entry
                    .as_ref()
                    .split(',')
                    .map(|token| token.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|token| !token.is_empty())
            .collect();

        if policies.is_empty() {
            policies.push(DEFAULT_POLICY.to_string());
        }

        Self { policies }
    }

    pub fn policies(&self) -> &[String] {
        &self.policies
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policy for a 1-based run index; `(i - 1) mod n`, so run 0 wraps to the last policy
    pub fn policy_for_run(&self, run_index: u32) -> &str {
        let n = self.policies.len();
        let slot = (run_index as usize + n - 1) % n;
        &self.policies[slot]
    }

    /// Suffix that keeps independent batches from writing to the same files
    pub fn output_suffix(&self, start_run: u32) -> String {
        let label = self
            .policies
            .iter()
            .map(|p| sanitize_label(p))
            .collect::<Vec<_>>()
            .join("-");
        format!("_start_{}_policy_{}", start_run, label)
    }
}

/// Collapse every run of characters outside `[A-Za-z0-9_-]` into `_`
pub fn sanitize_label(value: &str) -> String {
    let re = UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("static regex"));
    let replaced = re.replace_all(value, "_");
    let trimmed = replaced.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Insert `suffix` before the full extension chain of `path`
pub fn append_suffix_to_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Leading dot belongs to the stem for hidden files
    let split_at = name
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '.')
        .map(|(i, _)| i)
        .unwrap_or(name.len());
    let (base, extensions) = name.split_at(split_at);

    path.with_file_name(format!("{}{}{}", base, suffix, extensions))
}
