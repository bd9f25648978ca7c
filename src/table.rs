use crate::error::{HistoryError, Result};
use crate::model::{
    self, ALBUM_FIELD, ARTIST_FIELD, INCOGNITO_FIELD, MS_PLAYED_FIELD, PLATFORM_FIELD, PlayEvent,
    SortColumn, TRACK_FIELD, TS_FIELD,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use time::OffsetDateTime;

/// The loaded listening history. Never mutated after construction; every
/// filter or sort hands back a new table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryTable {
    events: Vec<PlayEvent>,
}

impl HistoryTable {
    pub fn from_events(events: Vec<PlayEvent>) -> Self {
        Self { events }
    }

    pub fn from_records(records: Vec<Value>) -> Result<Self> {
        let events = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| build_event(index, record))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(rows = events.len(), "built history table");
        Ok(Self { events })
    }

    pub fn events(&self) -> &[PlayEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<OffsetDateTime> {
        self.events.iter().map(|event| event.timestamp).min()
    }

    pub fn last_timestamp(&self) -> Option<OffsetDateTime> {
        self.events.iter().map(|event| event.timestamp).max()
    }

    pub fn total_ms_played(&self) -> u64 {
        self.events
            .iter()
            .fold(0_u64, |total, event| total.saturating_add(event.ms_played))
    }

    pub fn total_listening_time(&self) -> Duration {
        Duration::from_millis(self.total_ms_played())
    }

    /// Stable sort; rows that compare equal keep their file order.
    pub fn sorted_by(&self, column: SortColumn) -> Self {
        let mut events = self.events.clone();
        events.sort_by(|a, b| column.compare(a, b));
        Self { events }
    }

    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&PlayEvent) -> bool,
    {
        Self {
            events: self
                .events
                .iter()
                .filter(|event| keep(event))
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a HistoryTable {
    type Item = &'a PlayEvent;
    type IntoIter = std::slice::Iter<'a, PlayEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Flattens nested objects into dotted column names. Arrays and scalars are
/// leaves.
pub fn flatten_record(record: Map<String, Value>) -> BTreeMap<String, Value> {
    let mut columns = BTreeMap::new();
    flatten_into(&mut columns, None, record);
    columns
}

fn flatten_into(
    columns: &mut BTreeMap<String, Value>,
    prefix: Option<&str>,
    map: Map<String, Value>,
) {
    for (key, value) in map {
        let name = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                flatten_into(columns, Some(&name), nested);
            }
            other => {
                columns.insert(name, other);
            }
        }
    }
}

fn build_event(index: usize, record: Value) -> Result<PlayEvent> {
    let map = match record {
        Value::Object(map) => map,
        other => {
            return Err(HistoryError::InvalidField {
                index,
                field: "record",
                value: other.to_string(),
            });
        }
    };
    let mut columns = flatten_record(map);

    let timestamp = match columns.remove(TS_FIELD) {
        Some(Value::String(text)) => {
            model::parse_timestamp(&text).map_err(|source| HistoryError::TimestampParse {
                index,
                value: text.clone(),
                source,
            })?
        }
        None | Some(Value::Null) => {
            return Err(HistoryError::MissingField {
                index,
                field: TS_FIELD,
            });
        }
        Some(other) => {
            return Err(HistoryError::InvalidField {
                index,
                field: TS_FIELD,
                value: other.to_string(),
            });
        }
    };

    let ms_played = match columns.remove(MS_PLAYED_FIELD) {
        None | Some(Value::Null) => 0,
        Some(value) => value.as_u64().ok_or_else(|| HistoryError::InvalidField {
            index,
            field: MS_PLAYED_FIELD,
            value: value.to_string(),
        })?,
    };

    let track_name = take_text(&mut columns, TRACK_FIELD);
    let album_name = take_text(&mut columns, ALBUM_FIELD);
    let artist_name = take_text(&mut columns, ARTIST_FIELD);
    let platform = take_text(&mut columns, PLATFORM_FIELD).unwrap_or_default();
    let incognito_mode = matches!(columns.remove(INCOGNITO_FIELD), Some(Value::Bool(true)));

    Ok(PlayEvent {
        timestamp,
        ms_played,
        track_name,
        album_name,
        artist_name,
        platform,
        incognito_mode,
        columns,
    })
}

fn take_text(columns: &mut BTreeMap<String, Value>, field: &str) -> Option<String> {
    match columns.remove(field) {
        Some(Value::String(text)) => Some(text),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}
