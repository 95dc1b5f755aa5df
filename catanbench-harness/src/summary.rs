//! Summary reporting - per-key records, CSV artifact and console report
//!
//! Level 2 - Phase-level implementation

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use catanbench_core::SEATS;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::AggregateCounters;
use crate::error::Result;

/// Column headers of the CSV artifact
pub const CSV_HEADER: [&str; 7] = [
    "Agente",
    "Victorias",
    "Puntos",
    "Partidas",
    "Ratio Victorias",
    "Media Puntos",
    "Puesto Medio",
];

/// Final statistics for one evaluated entry
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub key: String,
    pub wins: u64,
    pub points: u64,
    /// Expected matches for this entry (the ratio denominator)
    pub total: u64,
    pub ratio: f64,
    pub mean_points: f64,
    pub mean_rank: f64,
    pub wins_by_position: [u64; SEATS],
    pub shared_lead: u64,
}

impl SummaryRecord {
    fn from_counters(key: &str, counters: &AggregateCounters, expected: u64) -> Self {
        let per_match = |value: u64| {
            if expected == 0 {
                0.0
            } else {
                value as f64 / expected as f64
            }
        };

        Self {
            key: key.to_string(),
            wins: counters.wins,
            points: counters.points_sum,
            total: expected,
            ratio: per_match(counters.wins),
            mean_points: per_match(counters.points_sum),
            mean_rank: per_match(counters.rank_sum),
            wins_by_position: counters.wins_by_position,
            shared_lead: counters.shared_lead,
        }
    }

    /// CSV row: ratio to 4 decimals, means to 2
    pub fn csv_row(&self) -> [String; 7] {
        [
            self.key.clone(),
            self.wins.to_string(),
            self.points.to_string(),
            self.total.to_string(),
            format!("{:.4}", self.ratio),
            format!("{:.2}", self.mean_points),
            format!("{:.2}", self.mean_rank),
        ]
    }
}

/// An entry whose completed count differs from what the plan expected
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    pub key: String,
    pub expected: u64,
    pub completed: u64,
}

/// Build records sorted by descending win ratio, plus any coverage violations
pub fn summarize(
    keys: &[String],
    counters: &[AggregateCounters],
    expected_per_entry: u64,
) -> (Vec<SummaryRecord>, Vec<InvariantViolation>) {
    let mut records = Vec::with_capacity(keys.len());
    let mut violations = Vec::new();

    for (key, counters) in keys.iter().zip(counters) {
        if counters.matches_completed != expected_per_entry {
            violations.push(InvariantViolation {
                key: key.clone(),
                expected: expected_per_entry,
                completed: counters.matches_completed,
            });
        }
        records.push(SummaryRecord::from_counters(key, counters, expected_per_entry));
    }

    // Stable: equal ratios keep configuration order
    records.sort_by(|a, b| b.ratio.total_cmp(&a.ratio));
    (records, violations)
}

/// Everything a finished run reports
#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkSummary {
    pub records: Vec<SummaryRecord>,
    pub violations: Vec<InvariantViolation>,
    pub total_matches: u64,
    pub matches_per_entry: u64,
    pub workers: usize,
    pub elapsed_secs: f64,
    pub finished_at: DateTime<Utc>,
}

impl BenchmarkSummary {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs.max(0.0))
    }

    pub fn is_complete(&self) -> bool {
        self.violations.is_empty()
    }

    /// Write the CSV artifact to a file
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        self.write_rows(&mut writer)
    }

    /// Write the CSV artifact to any writer
    pub fn write_csv_to<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);
        self.write_rows(&mut writer)
    }

    fn write_rows<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        writer.write_record(CSV_HEADER)?;
        for record in &self.records {
            writer.write_record(record.csv_row())?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable report, best ratio first
    pub fn render(&self) -> String {
        let mut out = String::new();
        let per_position = self.matches_per_entry / SEATS as u64;

        let _ = writeln!(out, "Results sorted by win ratio:");
        for r in &self.records {
            let _ = writeln!(
                out,
                "{}: {} wins, {} points in {} matches - ratio {:.2}%, mean points {:.2}, mean rank {:.2}",
                r.key,
                r.wins,
                r.points,
                r.total,
                r.ratio * 100.0,
                r.mean_points,
                r.mean_rank
            );
            for (position, wins) in r.wins_by_position.iter().enumerate() {
                let share = if per_position == 0 {
                    0.0
                } else {
                    *wins as f64 * 100.0 / per_position as f64
                };
                let _ = writeln!(
                    out,
                    "  - position {}: {} wins of {} matches ({:.2}%)",
                    position + 1,
                    wins,
                    per_position,
                    share
                );
            }
            if r.shared_lead > 0 {
                let _ = writeln!(out, "  - tied for the lead without the win: {}", r.shared_lead);
            }
        }

        for v in &self.violations {
            let _ = writeln!(
                out,
                "WARNING: {} completed {} of {} expected matches",
                v.key, v.completed, v.expected
            );
        }

        let _ = writeln!(out, "Total time: {}", format_hms(self.elapsed()));
        out
    }
}

/// Elapsed time as `{h}h {m}m {s}s`
pub fn format_hms(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
