//! Table Status Model
//!
//! The four-valued status of a tournament table and the row shape stored in
//! the hosted backend.
//!
//! Status cycles in a fixed order:
//!
//! ```text
//! unknown ──► playing ──► covered ──► done
//!                ▲                      │
//!                └──────────────────────┘
//! ```
//!
//! `unknown` is only ever the initial value; cycling never re-enters it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Table number, unique within a tournament
pub type TableNumber = u32;

/// Display state of a tournament table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not yet observed (white)
    #[default]
    Unknown,
    /// Game in progress (red)
    Playing,
    /// Table covered by a floor person (yellow)
    Covered,
    /// Game finished (green)
    Done,
}

impl Status {
    /// Every status value, initial value first
    pub const ALL: [Status; 4] = [
        Status::Unknown,
        Status::Playing,
        Status::Covered,
        Status::Done,
    ];

    /// The repeating part of the lifecycle
    pub const CYCLE: [Status; 3] = [Status::Playing, Status::Covered, Status::Done];

    /// Next status in the cycle.
    ///
    /// Total over all four values. `Unknown` sits before `Playing`, and
    /// `Done` wraps back to `Playing`.
    pub fn next(self) -> Status {
        match self.cycle_position() {
            Some(pos) => Self::CYCLE[(pos + 1) % Self::CYCLE.len()],
            None => Status::Playing,
        }
    }

    fn cycle_position(self) -> Option<usize> {
        Self::CYCLE.iter().position(|s| *s == self)
    }

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Playing => "playing",
            Status::Covered => "covered",
            Status::Done => "done",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::Playing => "Playing",
            Status::Covered => "Covered",
            Status::Done => "Done",
        }
    }

    /// Color name shown for this status
    pub fn color(&self) -> &'static str {
        match self {
            Status::Unknown => "white",
            Status::Playing => "red",
            Status::Covered => "yellow",
            Status::Done => "green",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a status string outside the four valid values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid table status '{0}' (expected unknown, playing, covered or done)")]
pub struct ParseStatusError(pub String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unknown" => Ok(Status::Unknown),
            "playing" => Ok(Status::Playing),
            "covered" => Ok(Status::Covered),
            "done" => Ok(Status::Done),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

/// One row of the `table_status` relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStatus {
    pub table_number: TableNumber,
    pub tournament_id: String,
    pub status: Status,
}

impl TableStatus {
    pub fn new(
        tournament_id: impl Into<String>,
        table_number: TableNumber,
        status: Status,
    ) -> Self {
        Self {
            table_number,
            tournament_id: tournament_id.into(),
            status,
        }
    }

    /// A freshly observed table
    pub fn unknown(tournament_id: impl Into<String>, table_number: TableNumber) -> Self {
        Self::new(tournament_id, table_number, Status::Unknown)
    }

    /// Copy of this row moved one step along the cycle
    pub fn advanced(&self) -> Self {
        Self {
            status: self.status.next(),
            ..self.clone()
        }
    }

    /// Upsert key of this row
    pub fn key(&self) -> TableKey {
        TableKey {
            tournament_id: self.tournament_id.clone(),
            table_number: self.table_number,
        }
    }
}

/// `(tournamentId, tableNumber)` pair identifying a row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub tournament_id: String,
    pub table_number: TableNumber,
}

impl TableKey {
    pub fn new(tournament_id: impl Into<String>, table_number: TableNumber) -> Self {
        Self {
            tournament_id: tournament_id.into(),
            table_number,
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tournament_id, self.table_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_goes_to_playing() {
        assert_eq!(Status::Unknown.next(), Status::Playing);
    }

    #[test]
    fn test_cycle_order() {
        assert_eq!(Status::Playing.next(), Status::Covered);
        assert_eq!(Status::Covered.next(), Status::Done);
        assert_eq!(Status::Done.next(), Status::Playing);
    }

    #[test]
    fn test_cycle_length_is_three() {
        for s in Status::CYCLE {
            assert_eq!(s.next().next().next(), s);
            assert_ne!(s.next(), s);
        }
    }

    #[test]
    fn test_unknown_never_reentered() {
        for s in Status::ALL {
            let mut current = s;
            for _ in 0..10 {
                current = current.next();
                assert_ne!(current, Status::Unknown);
            }
        }
    }

    #[test]
    fn test_parse_and_display() {
        for s in Status::ALL {
            assert_eq!(s.to_string().parse::<Status>().unwrap(), s);
        }
        assert_eq!(" Covered ".parse::<Status>().unwrap(), Status::Covered);
        assert!("finished".parse::<Status>().is_err());
    }

    #[test]
    fn test_row_wire_format() {
        let row = TableStatus::new("spring-open", 12, Status::Covered);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"tableNumber": 12, "tournamentId": "spring-open", "status": "covered"})
        );
    }

    #[test]
    fn test_row_rejects_invalid_status() {
        let json = r#"{"tableNumber": 3, "tournamentId": "t1", "status": "paused"}"#;
        assert!(serde_json::from_str::<TableStatus>(json).is_err());
    }

    #[test]
    fn test_advanced_keeps_key() {
        let row = TableStatus::unknown("t1", 4);
        let next = row.advanced();
        assert_eq!(next.status, Status::Playing);
        assert_eq!(next.key(), row.key());
        assert_eq!(row.key().to_string(), "t1#4");
    }
}
