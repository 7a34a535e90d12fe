//! Show, and optionally persist, the effective configuration.

use std::path::Path;

use anyhow::Context;
use shotdedup_common::{config_file_path, AppConfig};

/// Print `app` as JSON. With `write`, save it to `path` or the standard location.
pub fn run(app: &AppConfig, path: Option<&Path>, write: bool) -> anyhow::Result<()> {
    let target = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    println!("# {}", target.display());
    println!("{}", serde_json::to_string_pretty(app)?);

    if write {
        app.save_to(&target)
            .with_context(|| format!("Failed to write config to {}", target.display()))?;
        tracing::info!("config written to {}", target.display());
    }
    Ok(())
}
