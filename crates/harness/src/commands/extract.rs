//! Feature extraction command

use crate::output::{self, FeaturePreview, OutputFormat};
use anyhow::{Context, Result};
use harness_lib::features::{default_output_path, FeatureExtractor};
use std::path::{Path, PathBuf};

pub fn extract_features(
    input: &Path,
    output: Option<PathBuf>,
    run_column: Option<String>,
    preview: usize,
    format: OutputFormat,
) -> Result<()> {
    let extractor = match run_column {
        Some(column) => FeatureExtractor::with_run_column(column),
        None => FeatureExtractor::new(),
    };
    let output_path = output.unwrap_or_else(|| default_output_path(input));

    let features = extractor
        .extract_file(input, &output_path)
        .with_context(|| format!("Failed to extract features from {}", input.display()))?;

    let shown = &features.rows[..preview.min(features.rows.len())];
    match format {
        OutputFormat::Json => output::print_json(shown),
        OutputFormat::Table => {
            if !shown.is_empty() {
                let rows: Vec<FeaturePreview> = shown.iter().map(FeaturePreview::from).collect();
                output::print_table(&rows, format);
            }
            output::print_success(&format!(
                "Wrote {} feature rows keyed by {} to {}",
                features.rows.len(),
                features.run_column,
                output_path.display()
            ));
        }
    }

    Ok(())
}
