//! Build command: run the full build workflow.

use anyhow::Result;

use sitekit_assets::{BuildRunner, SiteConfig};

/// Run the build workflow. Any step failure propagates and sets a non-zero
/// exit code.
pub fn run(config: &SiteConfig) -> Result<()> {
    tracing::info!("Building distribution...");

    let report = BuildRunner::new(config).run()?;

    tracing::info!(
        "Built {} in {}ms ({} images)",
        report.output_dir.display(),
        report.duration_ms,
        report.images
    );

    Ok(())
}
