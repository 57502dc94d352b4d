//! Preflight checks run before any cloud call

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Read the application artifact.
///
/// Missing or empty artifacts fail the run here, before any control-plane
/// call is made. The content is returned verbatim for embedding in the boot
/// payload.
pub fn load_app_source(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("Application artifact not found: {}", path.display());
    }

    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read application artifact {}", path.display()))?;

    if source.trim().is_empty() {
        bail!("Application artifact {} is empty", path.display());
    }

    info!(
        path = %path.display(),
        bytes = source.len(),
        "Application artifact loaded"
    );

    Ok(source)
}
