//! Game trace navigation and final standings
//!
//! A trace is `game[round_key][turn_key]["end_turn"]["victory_points"][seat]`.
//! Round and turn keys end in a numeric suffix after the last `_`
//! (`round_12`, `turn_P3`); ordering uses that number, never the string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TraceError;

/// Number of seats in a match
pub const SEATS: usize = 4;

/// Seat identifier for a 0-based position
pub fn seat_id(position: usize) -> String {
    format!("J{}", position)
}

/// Match trace returned by an engine
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameTrace {
    /// Rounds keyed by round key, each holding turns keyed by turn key
    pub game: BTreeMap<String, BTreeMap<String, Value>>,
}

impl GameTrace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the end-of-turn victory points for one turn
    pub fn record_victory_points<I, S>(&mut self, round: u32, turn: u32, points: I)
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let victory_points: Map<String, Value> = points
            .into_iter()
            .map(|(seat, vp)| (seat.into(), Value::from(vp)))
            .collect();

        let mut end_turn = Map::new();
        end_turn.insert("victory_points".to_string(), Value::Object(victory_points));
        let mut turn_record = Map::new();
        turn_record.insert("end_turn".to_string(), Value::Object(end_turn));

        self.game
            .entry(format!("round_{}", round))
            .or_default()
            .insert(format!("turn_P{}", turn), Value::Object(turn_record));
    }

    /// Victory points at the end of the last turn of the last round
    pub fn final_standings(&self) -> Result<Standings, TraceError> {
        let (round_key, turns) = last_by_suffix(self.game.iter())?.ok_or(TraceError::NoRounds)?;
        let (turn_key, turn) = last_by_suffix(turns.iter())?.ok_or_else(|| TraceError::NoTurns {
            round: round_key.clone(),
        })?;

        let victory_points = turn
            .get("end_turn")
            .and_then(|end_turn| end_turn.get("victory_points"))
            .and_then(Value::as_object)
            .ok_or_else(|| TraceError::MissingField {
                path: format!("game.{}.{}.end_turn.victory_points", round_key, turn_key),
            })?;

        let seats = victory_points
            .iter()
            .map(|(seat, value)| coerce_points(seat, value).map(|vp| (seat.clone(), vp)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Standings { seats })
    }
}

/// Final per-seat victory points, in the order the engine reported them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standings {
    seats: Vec<(String, i64)>,
}

impl Standings {
    pub fn new(seats: Vec<(String, i64)>) -> Self {
        Self { seats }
    }

    pub fn seats(&self) -> &[(String, i64)] {
        &self.seats
    }

    /// Victory points for a seat
    pub fn points_of(&self, seat: &str) -> Result<i64, TraceError> {
        self.seats
            .iter()
            .find(|(id, _)| id == seat)
            .map(|(_, vp)| *vp)
            .ok_or_else(|| TraceError::MissingSeat {
                seat: seat.to_string(),
            })
    }

    /// First seat holding the maximum points
    pub fn leader(&self) -> Option<&str> {
        let mut best: Option<&(String, i64)> = None;
        for entry in &self.seats {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(id, _)| id.as_str())
    }

    /// 1-based placement after a stable descending sort by points
    pub fn rank_of(&self, seat: &str) -> Option<usize> {
        let mut ordered: Vec<&(String, i64)> = self.seats.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        ordered.iter().position(|(id, _)| id == seat).map(|idx| idx + 1)
    }

    /// Seat has the maximum points but another seat was listed first
    pub fn shares_lead_without_credit(&self, seat: &str) -> bool {
        let Some(leader) = self.leader() else {
            return false;
        };
        if leader == seat {
            return false;
        }
        match (self.points_of(seat), self.points_of(leader)) {
            (Ok(mine), Ok(top)) => mine == top,
            _ => false,
        }
    }
}

/// Numeric suffix of a round or turn key
pub fn key_index(key: &str) -> Result<u64, TraceError> {
    key.rsplit('_')
        .next()
        .map(|suffix| suffix.trim_start_matches('P'))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| TraceError::BadKey {
            key: key.to_string(),
        })
}

fn last_by_suffix<'a, V: 'a>(
    entries: impl Iterator<Item = (&'a String, &'a V)>,
) -> Result<Option<(&'a String, &'a V)>, TraceError> {
    let mut best: Option<(u64, (&'a String, &'a V))> = None;
    for (key, value) in entries {
        let index = key_index(key)?;
        if best.as_ref().map_or(true, |(b, _)| index > *b) {
            best = Some((index, (key, value)));
        }
    }
    Ok(best.map(|(_, entry)| entry))
}

/// Integer coercion for "integer-like" scores: ints, floats, numeric strings
fn coerce_points(seat: &str, value: &Value) -> Result<i64, TraceError> {
    let coerced = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    coerced.ok_or_else(|| TraceError::BadPoints {
        seat: seat.to_string(),
        value: value.to_string(),
    })
}
