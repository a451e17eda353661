//! Core types for the Mouse Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw sheet matrices, long-form records, and merged output records.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// Minutes in one recording day
pub const MINUTES_PER_DAY: u32 = 1440;

/// Day offset of the first estrus day in the 4-day cycle
const ESTRUS_OFFSET_DAYS: i64 = 2;

/// Length of the estrus cycle in days
const ESTRUS_CYCLE_DAYS: i64 = 4;

/// Timestamp format used in the output records (no timezone suffix)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Start of the relative time axis (2023-01-01T00:00:00).
///
/// Not a real recording date; time steps are offsets from this instant.
pub fn reference_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Sex of the subjects recorded on a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurement stored on a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Activity,
    Temp,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Activity => "activity",
            Metric::Temp => "temp",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four sheets in the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetKind {
    pub gender: Gender,
    pub metric: Metric,
}

impl SheetKind {
    pub const MALE_ACTIVITY: SheetKind = SheetKind::new(Gender::Male, Metric::Activity);
    pub const FEMALE_ACTIVITY: SheetKind = SheetKind::new(Gender::Female, Metric::Activity);
    pub const MALE_TEMP: SheetKind = SheetKind::new(Gender::Male, Metric::Temp);
    pub const FEMALE_TEMP: SheetKind = SheetKind::new(Gender::Female, Metric::Temp);

    /// All sheets in processing order
    pub const ALL: [SheetKind; 4] = [
        SheetKind::MALE_ACTIVITY,
        SheetKind::MALE_TEMP,
        SheetKind::FEMALE_ACTIVITY,
        SheetKind::FEMALE_TEMP,
    ];

    pub const fn new(gender: Gender, metric: Metric) -> Self {
        Self { gender, metric }
    }

    /// Whether records from this sheet carry the estrus flag
    pub fn tracks_estrus(&self) -> bool {
        self.gender == Gender::Female && self.metric == Metric::Temp
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.metric, self.gender)
    }
}

/// A single sheet cell, as read from the workbook
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
    /// Cell of a type that can never hold a metric (bool, date, error value)
    Invalid(String),
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Time-by-subject matrix loaded from one sheet
///
/// Row `i` is time step `i` (minutes since the start of the recording),
/// column `j` belongs to subject `subjects[j]`. Every row holds exactly one
/// cell per subject.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatrix {
    subjects: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawMatrix {
    /// Build a matrix, padding short rows with [`Cell::Empty`].
    ///
    /// Returns the index of the first row that is wider than the header on failure.
    pub fn new(subjects: Vec<String>, mut rows: Vec<Vec<Cell>>) -> Result<Self, usize> {
        let width = subjects.len();
        for (index, row) in rows.iter_mut().enumerate() {
            if row.len() > width {
                return Err(index);
            }
            row.resize(width, Cell::Empty);
        }
        Ok(Self { subjects, rows })
    }

    /// A matrix with no subjects and no time steps
    pub fn empty() -> Self {
        Self {
            subjects: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of time steps (rows)
    pub fn time_steps(&self) -> usize {
        self.rows.len()
    }

    /// Number of cells in the matrix
    pub fn cell_count(&self) -> usize {
        self.rows.len() * self.subjects.len()
    }

    pub fn cell(&self, time_step: usize, column: usize) -> Option<&Cell> {
        self.rows.get(time_step).and_then(|row| row.get(column))
    }
}

/// Composite join key: (time step, subject id)
pub type JoinKey = (u32, String);

/// One (time step, subject) observation of a single metric
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    /// Minutes since the start of the recording
    pub time_step: u32,
    pub subject_id: String,
    pub gender: Gender,
    pub metric: Metric,
    /// Metric value, `None` when the cell was empty
    pub value: Option<f64>,
    pub timestamp: NaiveDateTime,
    /// Always in `0..MINUTES_PER_DAY`
    pub minute_of_day: u32,
    /// Only set for female temperature records
    pub estrus: Option<bool>,
}

impl LongRecord {
    pub fn key(&self) -> JoinKey {
        (self.time_step, self.subject_id.clone())
    }
}

/// Time-derived fields shared by every record at a given time step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub timestamp: NaiveDateTime,
    pub minute_of_day: u32,
    pub day: u32,
}

impl TimeFields {
    pub fn at(time_step: u32) -> Self {
        Self {
            timestamp: reference_epoch() + Duration::minutes(i64::from(time_step)),
            minute_of_day: time_step % MINUTES_PER_DAY,
            day: time_step / MINUTES_PER_DAY,
        }
    }

    /// Hypothesized estrus day: `(day - 2) mod 4 == 0` with a non-negative modulus
    pub fn is_estrus_day(&self) -> bool {
        (i64::from(self.day) - ESTRUS_OFFSET_DAYS).rem_euclid(ESTRUS_CYCLE_DAYS) == 0
    }
}

/// Combined activity + temperature record for one subject at one time step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    #[serde(rename = "Time")]
    pub time_step: u32,
    #[serde(rename = "mouseId")]
    pub subject_id: String,
    pub activity: Option<f64>,
    pub gender: Gender,
    #[serde(rename = "time", serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "minute")]
    pub minute_of_day: u32,
    pub temp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estrus: Option<bool>,
}

impl MergedRecord {
    /// Empty record for a key, with the time-derived fields filled in
    pub fn for_key(time_step: u32, subject_id: String, gender: Gender) -> Self {
        let time = TimeFields::at(time_step);
        Self {
            time_step,
            subject_id,
            activity: None,
            gender,
            timestamp: time.timestamp,
            minute_of_day: time.minute_of_day,
            temp: None,
            estrus: None,
        }
    }
}

fn serialize_timestamp<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&timestamp.format(TIMESTAMP_FORMAT))
}
