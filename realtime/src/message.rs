use domain::room_series::RoomSeries;
use serde::{Deserialize, Deserializer, Serialize};

/// Trait for getting the wire event name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Messages pushed from the server to a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum Event {
    /// The latest readings per room, cut to the receiving connection's depth.
    #[serde(rename = "table:topN")]
    TableTopN { rows: Vec<RoomSeries>, limit: u32 },
}

impl EventType for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::TableTopN { .. } => "table:topN",
        }
    }
}

/// Messages a connection sends to the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// Requested history depth. Clamped on receipt, never rejected.
    #[serde(rename = "set-row-limit")]
    SetRowLimit(#[serde(deserialize_with = "saturating_limit")] i64),
}

/// Accepts any JSON number as a requested depth. Values outside `i64`
/// saturate and fractions truncate toward zero, so the clamp downstream
/// decides the final depth.
fn saturating_limit<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(value) = number.as_i64() {
        return Ok(value);
    }
    if number.as_u64().is_some() {
        return Ok(i64::MAX);
    }
    // `as` saturates at the i64 bounds; JSON has no NaN or infinities.
    Ok(number.as_f64().map_or(0, |value| value as i64))
}
