//! Subcommand implementations and shared input handling.

pub mod config;
pub mod dedup;
pub mod inspect;

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use shotdedup_common::AppConfig;
use shotdedup_core::DedupConfig;
use shotdedup_event_model::{ensure_unique_rows, parse_raw_events, validate_events, Event};

use crate::BufferArgs;

/// Events read from an input file.
pub(crate) struct LoadedEvents {
    pub events: Vec<Event>,
    pub skipped: usize,
}

/// Read a whole input file, or stdin for `-`.
pub(crate) fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read events from stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Events file not readable: {}", path.display()))
}

/// Parse and validate events. With `skip_invalid`, malformed rows are
/// dropped and logged; duplicate ids always fail.
pub(crate) fn load_events(path: &Path, skip_invalid: bool) -> anyhow::Result<LoadedEvents> {
    let content = read_input(path)?;
    let raw = parse_raw_events(&content)
        .with_context(|| format!("Failed to parse events in {}", path.display()))?;

    if !skip_invalid {
        let events = validate_events(&raw)?;
        return Ok(LoadedEvents { events, skipped: 0 });
    }

    let mut events = Vec::with_capacity(raw.len());
    let mut rows = Vec::with_capacity(raw.len());
    let mut skipped = 0;
    for (row, record) in raw.iter().enumerate() {
        match record.validate(row) {
            Ok(event) => {
                events.push(event);
                rows.push(row);
            }
            Err(e) => {
                tracing::warn!(row, error = %e, "skipping invalid row");
                skipped += 1;
            }
        }
    }
    // Duplicate errors name input rows, not positions among the kept events.
    ensure_unique_rows(rows.iter().copied().zip(&events))?;

    if skipped > 0 {
        tracing::warn!(skipped, kept = events.len(), "dropped invalid rows");
    }
    Ok(LoadedEvents { events, skipped })
}

/// Configured defaults with command-line overrides applied.
pub(crate) fn dedup_config(app: &AppConfig, buffers: &BufferArgs, diagnostics: bool) -> DedupConfig {
    let mut config = DedupConfig::from(&app.dedup);
    if let Some(spatial) = buffers.spatial_buffer {
        config.spatial_buffer_m = spatial;
    }
    if let Some(temporal) = buffers.temporal_buffer {
        config.temporal_buffer_min = temporal;
    }
    config.diagnostics |= diagnostics;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotdedup_common::DedupError;
    use std::io::Write;

    const ROWS: &str = "\
# detections exported 2018-06-02
{\"event_id\":1,\"event_time\":\"2018-06-01T00:00:00Z\",\"x\":0.0,\"y\":0.0,\"rounds\":1}
{\"event_id\":2,\"event_time\":\"2018-06-01T00:01:00Z\",\"x\":10.0,\"y\":0.0,\"rounds\":3}
{\"event_id\":3,\"event_time\":\"2018-06-01T00:05:00Z\",\"x\":\"n/a\",\"y\":0.0,\"rounds\":2}
";

    fn write_rows(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_strict_loading_fails_on_bad_row() {
        let file = write_rows(ROWS);
        let err = load_events(file.path(), false).err().unwrap();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_lenient_loading_counts_dropped_rows() {
        let file = write_rows(ROWS);
        let loaded = load_events(file.path(), true).unwrap();
        assert_eq!(loaded.events.len(), 2);
        assert_eq!(loaded.skipped, 1);
    }

    #[test]
    fn test_duplicate_ids_fail_even_when_lenient() {
        let rows = format!(
            "{ROWS}{{\"event_id\":1,\"event_time\":\"2018-06-01T01:00:00Z\",\"x\":0,\"y\":0,\"rounds\":1}}\n"
        );
        let file = write_rows(&rows);
        assert!(load_events(file.path(), true).is_err());
    }

    #[test]
    fn test_duplicate_after_skipped_row_names_input_rows() {
        let rows = format!(
            "{ROWS}{{\"event_id\":2,\"event_time\":\"2018-06-01T01:00:00Z\",\"x\":0,\"y\":0,\"rounds\":1}}\n"
        );
        let file = write_rows(&rows);
        let err = load_events(file.path(), true).err().unwrap();
        match err.downcast_ref::<DedupError>() {
            Some(DedupError::DuplicateEventId {
                event_id,
                first_row,
                second_row,
            }) => {
                assert_eq!(*event_id, 2);
                assert_eq!((*first_row, *second_row), (1, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let app = AppConfig::default();
        let buffers = BufferArgs {
            spatial_buffer: Some(25.0),
            temporal_buffer: None,
            skip_invalid: false,
        };
        let config = dedup_config(&app, &buffers, true);
        assert_eq!(config.spatial_buffer_m, 25.0);
        assert_eq!(config.temporal_buffer_min, 2.0);
        assert!(config.diagnostics);
    }
}
