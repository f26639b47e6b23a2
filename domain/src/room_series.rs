//! Per-room time series built from flat reading rows.
//!
//! `group` pivots the row-oriented fetch result into one column-oriented
//! `RoomSeries` per room, and `slice` cuts every room down to a subscriber's
//! depth. Both are pure: neither mutates its input, and every output owns its
//! own storage.

use crate::{Reading, RoomId};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// One room's readings as three index-aligned columns, newest-first.
///
/// Position `i` of every column comes from the same source row, so the
/// columns always have equal length. Fields are private to keep it that way;
/// the only constructors are `group` and `truncated`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoomSeries {
    #[serde(rename = "roomId")]
    room_id: RoomId,
    #[serde(rename = "roomType")]
    room_type: String,
    temperature_c: Vec<Option<f64>>,
    humidity_pct: Vec<Option<f64>>,
    differential_pressure_pa: Vec<Option<f64>>,
}

impl RoomSeries {
    fn first_seen(reading: &Reading) -> Self {
        let mut series = Self {
            room_id: reading.room_id,
            room_type: reading.room_type.clone(),
            temperature_c: Vec::new(),
            humidity_pct: Vec::new(),
            differential_pressure_pa: Vec::new(),
        };
        series.push(reading);
        series
    }

    // All three columns grow together.
    fn push(&mut self, reading: &Reading) {
        self.temperature_c.push(reading.temperature_c);
        self.humidity_pct.push(reading.humidity_pct);
        self.differential_pressure_pa
            .push(reading.differential_pressure_pa);
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn room_type(&self) -> &str {
        &self.room_type
    }

    pub fn temperature_c(&self) -> &[Option<f64>] {
        &self.temperature_c
    }

    pub fn humidity_pct(&self) -> &[Option<f64>] {
        &self.humidity_pct
    }

    pub fn differential_pressure_pa(&self) -> &[Option<f64>] {
        &self.differential_pressure_pa
    }

    /// Number of readings held for this room.
    pub fn len(&self) -> usize {
        self.temperature_c.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperature_c.is_empty()
    }

    /// Returns a copy holding at most the first `depth` readings of each column.
    pub fn truncated(&self, depth: usize) -> RoomSeries {
        let keep = depth.min(self.len());
        RoomSeries {
            room_id: self.room_id,
            room_type: self.room_type.clone(),
            temperature_c: self.temperature_c[..keep].to_vec(),
            humidity_pct: self.humidity_pct[..keep].to_vec(),
            differential_pressure_pa: self.differential_pressure_pa[..keep].to_vec(),
        }
    }
}

/// Groups readings by room.
///
/// Rooms appear in the order they are first seen, and each room's columns keep
/// the input order of its readings. The room type of a room is taken from its
/// first reading.
pub fn group(readings: &[Reading]) -> Vec<RoomSeries> {
    let mut positions: HashMap<RoomId, usize> = HashMap::new();
    let mut grouped: Vec<RoomSeries> = Vec::new();

    for reading in readings {
        match positions.entry(reading.room_id) {
            Entry::Occupied(entry) => grouped[*entry.get()].push(reading),
            Entry::Vacant(entry) => {
                entry.insert(grouped.len());
                grouped.push(RoomSeries::first_seen(reading));
            }
        }
    }

    grouped
}

/// Truncates every room to its first `depth` readings.
///
/// Rooms are never dropped, so a `depth` of zero yields every room with empty
/// columns.
pub fn slice(grouped: &[RoomSeries], depth: usize) -> Vec<RoomSeries> {
    grouped
        .iter()
        .map(|series| series.truncated(depth))
        .collect()
}
