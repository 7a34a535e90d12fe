//! Print deduplication statistics for an event file.

use std::path::PathBuf;

use shotdedup_common::AppConfig;
use shotdedup_core::{DedupDiagnostics, DedupPipeline};

use crate::BufferArgs;

pub fn run(app: &AppConfig, input: PathBuf, buffers: BufferArgs) -> anyhow::Result<()> {
    println!("Inspecting events in: {}", input.display());

    let loaded = super::load_events(&input, buffers.skip_invalid)?;
    let config = super::dedup_config(app, &buffers, true);
    println!(
        "  Buffers: {} m, {} min",
        config.spatial_buffer_m, config.temporal_buffer_min
    );
    if loaded.skipped > 0 {
        println!("  Skipped {} invalid row(s)", loaded.skipped);
    }

    let result = DedupPipeline::new(config).run_events(&loaded.events)?;
    let diagnostics = result.diagnostics.unwrap_or_default();
    print!("{}", render(&diagnostics));

    Ok(())
}

fn render(d: &DedupDiagnostics) -> String {
    let mut out = String::new();
    out.push_str(&format!("  Before deduplicating: {} events\n", d.input_count));
    out.push_str(&format!(
        "  Close in space and time to another event: {}\n",
        d.near_duplicate_count
    ));
    if d.component_sizes.is_empty() {
        out.push_str("  No connected components\n");
    } else {
        out.push_str("  Connected components by size:\n");
        for (size, count) in &d.component_sizes {
            out.push_str(&format!("    {size}\t{count}\n"));
        }
    }
    out.push_str(&format!(
        "  Retained events: {} ({} merged, {} unchanged, {} removed)\n",
        d.retained_count,
        d.merged_count,
        d.passthrough_count,
        d.removed_count()
    ));
    out
}
