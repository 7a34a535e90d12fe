//! Deduplicate a JSONL event file.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use shotdedup_common::AppConfig;
use shotdedup_core::DedupPipeline;
use shotdedup_event_model::serialize_jsonl;

use crate::BufferArgs;

pub fn run(
    app: &AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    buffers: BufferArgs,
    diagnostics: bool,
) -> anyhow::Result<()> {
    let loaded = super::load_events(&input, buffers.skip_invalid)?;
    let config = super::dedup_config(app, &buffers, diagnostics);
    tracing::info!(
        events = loaded.events.len(),
        skipped = loaded.skipped,
        spatial_buffer_m = config.spatial_buffer_m,
        temporal_buffer_min = config.temporal_buffer_min,
        "deduplicating {}",
        input.display()
    );

    let result = DedupPipeline::new(config).run_events(&loaded.events)?;
    let jsonl = serialize_jsonl(&result.rows()).context("Failed to serialize records")?;

    match output {
        Some(path) => {
            std::fs::write(&path, jsonl)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(records = result.len(), "records written to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(jsonl.as_bytes())?;
            lock.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotdedup_event_model::OutputRow;

    #[test]
    fn test_writes_merged_and_passthrough_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("events.jsonl");
        let output = dir.path().join("deduped.jsonl");
        std::fs::write(
            &input,
            "{\"event_id\":1,\"event_time\":\"2018-06-01T00:00:00Z\",\"x\":0,\"y\":0,\"rounds\":1}\n\
             {\"event_id\":2,\"event_time\":\"2018-06-01T00:01:00Z\",\"x\":10,\"y\":0,\"rounds\":3}\n\
             {\"event_id\":3,\"event_time\":\"2018-06-01T00:05:00Z\",\"x\":10,\"y\":0,\"rounds\":2}\n",
        )
        .unwrap();

        run(
            &AppConfig::default(),
            input,
            Some(output.clone()),
            BufferArgs::default(),
            false,
        )
        .unwrap();

        let rows: Vec<OutputRow> = std::fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event_id, 3);
        assert_eq!(rows[1].event_id, -1);
        assert_eq!(rows[1].total_rounds, 4.0);
        assert_eq!((rows[1].x, rows[1].y), (5.0, 0.0));
    }
}
