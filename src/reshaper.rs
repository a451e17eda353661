//! Wide-to-long reshaping
//!
//! This module turns one time-by-subject sheet matrix into a sequence of
//! long-form records and attaches the derived fields:
//! - Absolute timestamp (reference epoch + time step minutes)
//! - Minute of day
//! - Estrus flag (female temperature sheets only)

use crate::error::{ComputeError, Stage};
use crate::types::{Cell, LongRecord, RawMatrix, SheetKind, TimeFields};

/// Reshaper for converting sheet matrices into long-form records
pub struct Reshaper;

impl Reshaper {
    /// Reshape a matrix into one record per (time step, subject) cell.
    ///
    /// Records are emitted subject-major: every time step of the first
    /// subject, then every time step of the next. Empty cells produce records
    /// with no value rather than being skipped.
    pub fn reshape(matrix: &RawMatrix, kind: SheetKind) -> Result<Vec<LongRecord>, ComputeError> {
        let mut records = Vec::with_capacity(matrix.cell_count());

        // Time fields are identical for every subject at a given step
        let time_fields: Vec<(u32, TimeFields)> = (0..matrix.time_steps())
            .map(|step| time_step_index(step, kind).map(|t| (t, TimeFields::at(t))))
            .collect::<Result<_, _>>()?;

        for (column, subject_id) in matrix.subjects().iter().enumerate() {
            for (step, row) in matrix.rows().iter().enumerate() {
                let (time_step, time) = time_fields[step];
                let value = parse_cell(&row[column], kind, step, subject_id)?;

                records.push(LongRecord {
                    time_step,
                    subject_id: subject_id.clone(),
                    gender: kind.gender,
                    metric: kind.metric,
                    value,
                    timestamp: time.timestamp,
                    minute_of_day: time.minute_of_day,
                    estrus: kind.tracks_estrus().then(|| time.is_estrus_day()),
                });
            }
        }

        tracing::debug!(
            sheet = %kind,
            subjects = matrix.subjects().len(),
            time_steps = matrix.time_steps(),
            records = records.len(),
            "reshaped sheet"
        );

        Ok(records)
    }
}

fn time_step_index(step: usize, kind: SheetKind) -> Result<u32, ComputeError> {
    u32::try_from(step).map_err(|_| {
        ComputeError::data_format(
            Stage::Reshape,
            format!("{kind} sheet has more time steps than supported ({step})"),
        )
    })
}

/// Interpret a cell as a metric value. Missing and non-finite values become `None`.
fn parse_cell(
    cell: &Cell,
    kind: SheetKind,
    step: usize,
    subject_id: &str,
) -> Result<Option<f64>, ComputeError> {
    let invalid = |found: &str| {
        ComputeError::data_format(
            Stage::Reshape,
            format!(
                "{kind} sheet, row {step}, subject '{subject_id}': expected a number, found {found}"
            ),
        )
    };

    match cell {
        Cell::Number(v) if !v.is_finite() => Ok(None),
        Cell::Number(v) => Ok(Some(*v)),
        Cell::Empty => Ok(None),
        Cell::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(v) if !v.is_finite() => Ok(None),
                Ok(v) => Ok(Some(v)),
                Err(_) => Err(invalid(&format!("'{trimmed}'"))),
            }
        }
        Cell::Invalid(description) => Err(invalid(description)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Gender, Metric, MINUTES_PER_DAY};
    use pretty_assertions::assert_eq;

    fn matrix(subjects: &[&str], rows: Vec<Vec<Cell>>) -> RawMatrix {
        RawMatrix::new(subjects.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    fn numeric_matrix(subjects: usize, steps: usize) -> RawMatrix {
        let names: Vec<String> = (0..subjects).map(|i| format!("m{i}")).collect();
        let rows = (0..steps)
            .map(|step| (0..subjects).map(|s| Cell::Number((step * 10 + s) as f64)).collect())
            .collect();
        RawMatrix::new(names, rows).unwrap()
    }

    #[test]
    fn test_one_record_per_cell() {
        let matrix = numeric_matrix(3, 7);
        let records = Reshaper::reshape(&matrix, SheetKind::MALE_ACTIVITY).unwrap();

        assert_eq!(records.len(), 21);
        assert!(records.iter().all(|r| r.gender == Gender::Male));
        assert!(records.iter().all(|r| r.metric == Metric::Activity));
    }

    #[test]
    fn test_subject_major_order() {
        let matrix = numeric_matrix(2, 2);
        let records = Reshaper::reshape(&matrix, SheetKind::MALE_TEMP).unwrap();

        let keys: Vec<(u32, &str, Option<f64>)> = records
            .iter()
            .map(|r| (r.time_step, r.subject_id.as_str(), r.value))
            .collect();
        assert_eq!(
            keys,
            vec![
                (0, "m0", Some(0.0)),
                (1, "m0", Some(10.0)),
                (0, "m1", Some(1.0)),
                (1, "m1", Some(11.0)),
            ]
        );
    }

    #[test]
    fn test_missing_cells_become_null_records() {
        let matrix = matrix(
            &["m1"],
            vec![
                vec![Cell::Empty],
                vec![Cell::Number(f64::NAN)],
                vec![Cell::Text("  ".into())],
                vec![Cell::Text("36.6".into())],
            ],
        );
        let records = Reshaper::reshape(&matrix, SheetKind::FEMALE_TEMP).unwrap();

        let values: Vec<Option<f64>> = records.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![None, None, None, Some(36.6)]);
    }

    #[test]
    fn test_infinite_values_become_null_records() {
        let matrix = matrix(
            &["m1"],
            vec![
                vec![Cell::Number(f64::INFINITY)],
                vec![Cell::Number(f64::NEG_INFINITY)],
                vec![Cell::Text("inf".into())],
                vec![Cell::Text("-Infinity".into())],
                vec![Cell::Number(4.0)],
            ],
        );
        let records = Reshaper::reshape(&matrix, SheetKind::MALE_ACTIVITY).unwrap();

        let values: Vec<Option<f64>> = records.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![None, None, None, None, Some(4.0)]);
    }

    #[test]
    fn test_zero_columns_yield_zero_records() {
        let matrix = RawMatrix::new(Vec::new(), vec![vec![], vec![]]).unwrap();
        let records = Reshaper::reshape(&matrix, SheetKind::FEMALE_ACTIVITY).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_minute_of_day_wraps() {
        let steps = (MINUTES_PER_DAY + 5) as usize;
        let matrix = numeric_matrix(1, steps);
        let records = Reshaper::reshape(&matrix, SheetKind::MALE_ACTIVITY).unwrap();

        for record in &records {
            assert!(record.minute_of_day < MINUTES_PER_DAY);
            assert_eq!(record.minute_of_day, record.time_step % MINUTES_PER_DAY);
        }
        let last = records.last().unwrap();
        assert_eq!(last.minute_of_day, 4);
        assert_eq!(last.timestamp.to_string(), "2023-01-02 00:04:00");
    }

    #[test]
    fn test_estrus_only_on_female_temp() {
        let matrix = numeric_matrix(1, 3);

        for kind in SheetKind::ALL {
            let records = Reshaper::reshape(&matrix, kind).unwrap();
            let has_estrus = records.iter().all(|r| r.estrus.is_some());
            let lacks_estrus = records.iter().all(|r| r.estrus.is_none());

            if kind == SheetKind::FEMALE_TEMP {
                assert!(has_estrus, "{kind} should carry estrus");
            } else {
                assert!(lacks_estrus, "{kind} should not carry estrus");
            }
        }
    }

    #[test]
    fn test_estrus_follows_day_index() {
        let steps = (4 * MINUTES_PER_DAY) as usize;
        let matrix = matrix(&["f1"], vec![vec![Cell::Empty]; steps]);
        let records = Reshaper::reshape(&matrix, SheetKind::FEMALE_TEMP).unwrap();

        let day = |n: u32| &records[(n * MINUTES_PER_DAY) as usize];
        assert_eq!(day(0).estrus, Some(false));
        assert_eq!(day(1).estrus, Some(false));
        assert_eq!(day(2).estrus, Some(true));
        assert_eq!(day(3).estrus, Some(false));
    }

    #[test]
    fn test_unparseable_text_names_row_and_subject() {
        let matrix = matrix(
            &["m1", "m2"],
            vec![
                vec![Cell::Number(1.0), Cell::Number(2.0)],
                vec![Cell::Number(1.0), Cell::Text("n/a".into())],
            ],
        );

        let err = Reshaper::reshape(&matrix, SheetKind::MALE_ACTIVITY).unwrap_err();
        assert_eq!(err.stage(), Stage::Reshape);
        let message = err.to_string();
        assert!(message.contains("row 1"), "{message}");
        assert!(message.contains("'m2'"), "{message}");
        assert!(message.contains("activity-male"), "{message}");
    }

    #[test]
    fn test_invalid_cell_is_rejected() {
        let matrix = matrix(&["m1"], vec![vec![Cell::Invalid("Bool(true)".into())]]);
        let result = Reshaper::reshape(&matrix, SheetKind::MALE_TEMP);
        assert!(matches!(result, Err(ComputeError::DataFormat { .. })));
    }
}
