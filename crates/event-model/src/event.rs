//! Detection event types and the JSONL input codec.
//!
//! Input rows arrive as [`RawEvent`]s with every field optional, exactly as
//! an upstream export produced them. [`RawEvent::validate`] turns a row into
//! a typed [`Event`] or rejects it with the offending field; nothing is
//! coerced to zero.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use shotdedup_common::{DedupError, DedupResult, EventField};

use crate::point::Point2D;

/// Caller-assigned event identifier.
pub type EventId = i64;

/// Naive timestamp layouts accepted in addition to RFC 3339. Interpreted as UTC.
const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Largest accepted coordinate magnitude (meters). Grid cell indices stay
/// exact well past this, and projected coordinates never come close.
pub const MAX_COORDINATE_M: f64 = 1.0e9;

/// A single validated detection report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Unique, non-negative identifier.
    pub id: EventId,

    /// Time the detection was reported.
    pub time: DateTime<Utc>,

    /// Planar location (meters).
    pub location: Point2D,

    /// Number of rounds detected. Non-negative.
    pub rounds: f64,
}

impl Event {
    /// Build an event, applying the same field rules as row validation.
    pub fn new(
        id: EventId,
        time: DateTime<Utc>,
        location: Point2D,
        rounds: f64,
    ) -> DedupResult<Self> {
        let event = Self {
            id,
            time,
            location,
            rounds,
        };
        event.check(0)?;
        Ok(event)
    }

    /// Re-apply the row validation rules to an event at position `row`.
    ///
    /// Fields are public, so events built by hand go through this before
    /// they reach the pipeline.
    pub fn check(&self, row: usize) -> DedupResult<()> {
        check_id(row, self.id)?;
        check_coordinate(row, self.id, EventField::X, self.location.x)?;
        check_coordinate(row, self.id, EventField::Y, self.location.y)?;
        check_rounds(row, self.id, self.rounds)
    }
}

/// A loosely-typed field value from an input row.
///
/// Exports frequently quote numbers, so numeric fields accept numeric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl RawValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && v.abs() < 9.007_199_254_740_992e15 => {
                Some(*v as i64)
            }
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// An unvalidated input row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub event_id: Option<RawValue>,
    #[serde(default)]
    pub event_time: Option<RawValue>,
    #[serde(default)]
    pub x: Option<RawValue>,
    #[serde(default)]
    pub y: Option<RawValue>,
    #[serde(default)]
    pub rounds: Option<RawValue>,
}

impl RawEvent {
    /// Convenience constructor for well-formed rows.
    pub fn new(id: EventId, time: &str, x: f64, y: f64, rounds: f64) -> Self {
        Self {
            event_id: Some(id.into()),
            event_time: Some(time.into()),
            x: Some(x.into()),
            y: Some(y.into()),
            rounds: Some(rounds.into()),
        }
    }

    /// Validate this row. `row` is its 0-based position in the input sequence.
    pub fn validate(&self, row: usize) -> DedupResult<Event> {
        let id = self.parse_id(row)?;
        let time = self.parse_time(row, id)?;
        let x = parse_number(row, id, EventField::X, self.x.as_ref())?;
        check_coordinate(row, id, EventField::X, x)?;
        let y = parse_number(row, id, EventField::Y, self.y.as_ref())?;
        check_coordinate(row, id, EventField::Y, y)?;
        let rounds = parse_number(row, id, EventField::Rounds, self.rounds.as_ref())?;
        check_rounds(row, id, rounds)?;

        Ok(Event {
            id,
            time,
            location: Point2D::new(x, y),
            rounds,
        })
    }

    fn parse_id(&self, row: usize) -> DedupResult<EventId> {
        let value = self
            .event_id
            .as_ref()
            .ok_or_else(|| DedupError::invalid_event(row, None, EventField::EventId, "is missing"))?;
        let id = value.as_i64().ok_or_else(|| {
            DedupError::invalid_event(
                row,
                None,
                EventField::EventId,
                format!("is not an integer: {value:?}"),
            )
        })?;
        check_id(row, id)?;
        Ok(id)
    }

    fn parse_time(&self, row: usize, id: EventId) -> DedupResult<DateTime<Utc>> {
        let field = EventField::EventTime;
        match self.event_time.as_ref() {
            None => Err(DedupError::invalid_event(row, Some(id), field, "is missing")),
            Some(RawValue::Text(text)) => parse_timestamp(text).ok_or_else(|| {
                DedupError::invalid_event(
                    row,
                    Some(id),
                    field,
                    format!("is not an ISO-8601 timestamp: {text:?}"),
                )
            }),
            Some(other) => Err(DedupError::invalid_event(
                row,
                Some(id),
                field,
                format!("is not a timestamp string: {other:?}"),
            )),
        }
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 timestamp taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_number(
    row: usize,
    id: EventId,
    field: EventField,
    value: Option<&RawValue>,
) -> DedupResult<f64> {
    let value = value.ok_or_else(|| DedupError::invalid_event(row, Some(id), field, "is missing"))?;
    value.as_f64().ok_or_else(|| {
        DedupError::invalid_event(row, Some(id), field, format!("is not numeric: {value:?}"))
    })
}

fn check_id(row: usize, id: EventId) -> DedupResult<()> {
    // Negative ids are reserved for merged groups in flat output rows.
    if id < 0 {
        return Err(DedupError::invalid_event(
            row,
            Some(id),
            EventField::EventId,
            "must be non-negative",
        ));
    }
    Ok(())
}

fn check_coordinate(row: usize, id: EventId, field: EventField, value: f64) -> DedupResult<()> {
    if !value.is_finite() {
        return Err(DedupError::invalid_event(
            row,
            Some(id),
            field,
            format!("must be finite, got {value}"),
        ));
    }
    if value.abs() > MAX_COORDINATE_M {
        return Err(DedupError::invalid_event(
            row,
            Some(id),
            field,
            format!("must be at most {MAX_COORDINATE_M:e} m in magnitude, got {value}"),
        ));
    }
    Ok(())
}

fn check_rounds(row: usize, id: EventId, rounds: f64) -> DedupResult<()> {
    if !rounds.is_finite() || rounds < 0.0 {
        return Err(DedupError::invalid_event(
            row,
            Some(id),
            EventField::Rounds,
            format!("must be a finite non-negative number, got {rounds}"),
        ));
    }
    Ok(())
}

/// Validate every row, then check that ids are unique.
///
/// Fails on the first malformed row; no partial result is returned.
pub fn validate_events(raw: &[RawEvent]) -> DedupResult<Vec<Event>> {
    let events = raw
        .iter()
        .enumerate()
        .map(|(row, r)| r.validate(row))
        .collect::<DedupResult<Vec<_>>>()?;
    ensure_unique_ids(&events)?;
    Ok(events)
}

/// Check already-typed events: field rules for each, then unique ids.
pub fn check_events(events: &[Event]) -> DedupResult<()> {
    for (row, event) in events.iter().enumerate() {
        event.check(row)?;
    }
    ensure_unique_ids(events)
}

/// Reject collections where two records share an id.
pub fn ensure_unique_ids(events: &[Event]) -> DedupResult<()> {
    ensure_unique_rows(events.iter().enumerate())
}

/// Like [`ensure_unique_ids`], for events paired with their input row.
pub fn ensure_unique_rows<'a>(
    rows: impl IntoIterator<Item = (usize, &'a Event)>,
) -> DedupResult<()> {
    let mut seen: HashMap<EventId, usize> = HashMap::new();
    for (row, event) in rows {
        if let Some(&first_row) = seen.get(&event.id) {
            return Err(DedupError::DuplicateEventId {
                event_id: event.id,
                first_row,
                second_row: row,
            });
        }
        seen.insert(event.id, row);
    }
    Ok(())
}

/// Parse raw rows from JSONL content (one JSON object per line).
///
/// Blank lines and lines starting with `#` are skipped. Errors carry the
/// 1-based line number.
pub fn parse_raw_events(jsonl: &str) -> DedupResult<Vec<RawEvent>> {
    jsonl
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            serde_json::from_str(line).map_err(|e| DedupError::Parse {
                line: line_no,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Serialize values to JSONL format.
pub fn serialize_jsonl<T: Serialize>(items: &[T]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for item in items {
        output.push_str(&serde_json::to_string(item)?);
        output.push('\n');
    }
    Ok(output)
}
