//! Pipeline orchestration
//!
//! This module provides the public API for Mouse Flux.
//! It orchestrates the full pipeline from workbook sheets to compressed records.

use crate::aggregator::Aggregator;
use crate::config::{PipelineConfig, SheetNames};
use crate::encoder::RecordEncoder;
use crate::error::ComputeError;
use crate::loader::{SheetSource, XlsxWorkbook};
use crate::merger::Merger;
use crate::reshaper::Reshaper;
use crate::types::{Gender, MergedRecord, Metric, RawMatrix, SheetKind};
use std::path::{Path, PathBuf};

/// Record counts from a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub male_records: usize,
    pub female_records: usize,
    pub total_records: usize,
    pub output: PathBuf,
}

/// Read a workbook and produce the merged record set.
///
/// # Arguments
/// * `path` - Workbook file
/// * `sheets` - Names of the four sheets
///
/// # Example
/// ```ignore
/// let records = process_workbook("Mouse_Data_Student_Copy.xlsx", &SheetNames::default())?;
/// ```
pub fn process_workbook(
    path: impl AsRef<Path>,
    sheets: &SheetNames,
) -> Result<Vec<MergedRecord>, ComputeError> {
    let mut workbook = XlsxWorkbook::open(path)?;
    process_source(&mut workbook, sheets)
}

/// Process the four sheets of a source through the full pipeline.
///
/// Pipeline stages:
/// 1. SheetSource - Load all four sheets
/// 2. Reshaper - Wide matrix to long records, one call per sheet
/// 3. Merger - Outer join activity and temperature, one call per gender
/// 4. Aggregator - Male records followed by female records
pub fn process_source(
    source: &mut dyn SheetSource,
    sheets: &SheetNames,
) -> Result<Vec<MergedRecord>, ComputeError> {
    let (male, female) = process_by_gender(source, sheets)?;
    Ok(Aggregator::concat(male, female))
}

fn process_by_gender(
    source: &mut dyn SheetSource,
    sheets: &SheetNames,
) -> Result<(Vec<MergedRecord>, Vec<MergedRecord>), ComputeError> {
    // Stage 1: everything is loaded before any reshaping starts
    let loaded = SheetKind::ALL
        .into_iter()
        .map(|kind| -> Result<(SheetKind, RawMatrix), ComputeError> {
            let name = sheets.name_for(kind);
            let matrix = source.read_sheet(name)?;
            tracing::info!(
                sheet = name,
                subjects = matrix.subjects().len(),
                time_steps = matrix.time_steps(),
                "loaded sheet"
            );
            Ok((kind, matrix))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let male = merge_gender(&loaded, sheets, Gender::Male)?;
    let female = merge_gender(&loaded, sheets, Gender::Female)?;
    Ok((male, female))
}

fn merge_gender(
    loaded: &[(SheetKind, RawMatrix)],
    sheets: &SheetNames,
    gender: Gender,
) -> Result<Vec<MergedRecord>, ComputeError> {
    let matrix_for = |kind: SheetKind| {
        loaded
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, matrix)| matrix)
            .ok_or_else(|| ComputeError::InputNotFound(sheets.name_for(kind).to_string()))
    };

    // Stage 2: reshape
    let activity = SheetKind::new(gender, Metric::Activity);
    let temp = SheetKind::new(gender, Metric::Temp);
    let activity_records = Reshaper::reshape(matrix_for(activity)?, activity)?;
    let temp_records = Reshaper::reshape(matrix_for(temp)?, temp)?;

    // Stage 3: merge
    let merged = Merger::merge(gender, &activity_records, &temp_records)?;
    if let Some(first) = merged.first() {
        tracing::debug!(?first, "first merged record");
    }
    tracing::info!(%gender, records = merged.len(), "merged gender");
    Ok(merged)
}

/// Run the pipeline end to end: read the workbook, process, write the output.
///
/// No output file is created unless every stage succeeds.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, ComputeError> {
    MousePipeline::with_config(config.clone())?.run()
}

/// Pipeline bound to a configuration.
///
/// Use this when the sheets come from somewhere other than the configured
/// workbook file.
pub struct MousePipeline {
    config: PipelineConfig,
    encoder: RecordEncoder,
}

impl Default for MousePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl MousePipeline {
    /// Create a pipeline with default settings
    pub fn new() -> Self {
        let config = PipelineConfig::default();
        Self {
            encoder: RecordEncoder::new(config.compression_level),
            config,
        }
    }

    /// Create a pipeline from a validated configuration
    pub fn with_config(config: PipelineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            encoder: RecordEncoder::new(config.compression_level),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Produce the merged record set from any sheet source
    pub fn process(&self, source: &mut dyn SheetSource) -> Result<Vec<MergedRecord>, ComputeError> {
        process_source(source, &self.config.sheets)
    }

    /// Process a sheet source and write the compressed output file
    pub fn process_and_write(
        &self,
        source: &mut dyn SheetSource,
    ) -> Result<RunSummary, ComputeError> {
        let (male, female) = process_by_gender(source, &self.config.sheets)?;
        let male_records = male.len();
        let female_records = female.len();

        // Stage 4: aggregate
        let records = Aggregator::concat(male, female);

        // Stage 5: encode and write
        self.encoder.write_file(&records, &self.config.output)?;

        Ok(RunSummary {
            male_records,
            female_records,
            total_records: records.len(),
            output: self.config.output.clone(),
        })
    }

    /// Read the configured workbook and write the configured output
    pub fn run(&self) -> Result<RunSummary, ComputeError> {
        tracing::info!(input = %self.config.input.display(), "processing workbook");
        let mut workbook = XlsxWorkbook::open(&self.config.input)?;
        self.process_and_write(&mut workbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::loader::InMemoryWorkbook;
    use crate::types::Cell;
    use pretty_assertions::assert_eq;

    fn matrix(subjects: &[&str], rows: Vec<Vec<f64>>) -> RawMatrix {
        RawMatrix::new(
            subjects.iter().map(|s| s.to_string()).collect(),
            rows.into_iter()
                .map(|row| row.into_iter().map(Cell::Number).collect())
                .collect(),
        )
        .unwrap()
    }

    fn workbook() -> InMemoryWorkbook {
        InMemoryWorkbook::new()
            .with_sheet("Male Act", matrix(&["m1", "m2"], vec![vec![1.0, 2.0], vec![3.0, 4.0]]))
            .with_sheet("Male Temp", matrix(&["m1", "m2"], vec![vec![36.0, 36.5], vec![36.1, 36.6]]))
            .with_sheet("Fem Act", matrix(&["m1"], vec![vec![5.0]]))
            .with_sheet("Fem Temp", matrix(&["m1"], vec![vec![37.0]]))
    }

    #[test]
    fn test_single_female_cell() {
        let records = process_source(&mut workbook(), &SheetNames::default()).unwrap();

        let female: Vec<&MergedRecord> =
            records.iter().filter(|r| r.gender == Gender::Female).collect();
        assert_eq!(female.len(), 1);

        let record = female[0];
        assert_eq!(record.time_step, 0);
        assert_eq!(record.subject_id, "m1");
        assert_eq!(record.activity, Some(5.0));
        assert_eq!(record.temp, Some(37.0));
        assert_eq!(record.minute_of_day, 0);
        // Day 0: (0 - 2) mod 4 == 2
        assert_eq!(record.estrus, Some(false));
    }

    #[test]
    fn test_male_records_come_first() {
        let records = process_source(&mut workbook(), &SheetNames::default()).unwrap();

        assert_eq!(records.len(), 5);
        let genders: Vec<Gender> = records.iter().map(|r| r.gender).collect();
        assert_eq!(
            genders,
            vec![Gender::Male, Gender::Male, Gender::Male, Gender::Male, Gender::Female]
        );
        assert!(records[..4].iter().all(|r| r.estrus.is_none()));
    }

    #[test]
    fn test_missing_sheet_fails_before_processing() {
        let mut source = InMemoryWorkbook::new()
            .with_sheet("Male Act", matrix(&["m1"], vec![vec![1.0]]))
            .with_sheet("Male Temp", matrix(&["m1"], vec![vec![36.0]]));

        let err = process_source(&mut source, &SheetNames::default()).unwrap_err();
        assert!(matches!(err, ComputeError::InputNotFound(ref name) if name.contains("Fem Act")));
        assert_eq!(err.stage(), Stage::Load);
    }

    #[test]
    fn test_process_and_write_leaves_no_output_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output: dir.path().join("out.json.gz"),
            ..PipelineConfig::default()
        };
        let pipeline = MousePipeline::with_config(config).unwrap();

        let mut source = workbook().with_sheet(
            "Fem Temp",
            RawMatrix::new(vec!["m1".to_string()], vec![vec![Cell::Text("hot".into())]]).unwrap(),
        );

        let err = pipeline.process_and_write(&mut source).unwrap_err();
        assert_eq!(err.stage(), Stage::Reshape);
        assert!(!pipeline.config().output.exists());
    }

    #[test]
    fn test_process_and_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output: dir.path().join("out.json.gz"),
            ..PipelineConfig::default()
        };
        let pipeline = MousePipeline::with_config(config).unwrap();

        let summary = pipeline.process_and_write(&mut workbook()).unwrap();
        assert_eq!(summary.male_records, 4);
        assert_eq!(summary.female_records, 1);
        assert_eq!(summary.total_records, 5);
        assert!(summary.output.exists());
    }

    #[test]
    fn test_run_with_missing_workbook() {
        let config = PipelineConfig {
            input: PathBuf::from("no-such-workbook.xlsx"),
            ..PipelineConfig::default()
        };

        let result = run(&config);
        assert!(matches!(result, Err(ComputeError::InputNotFound(_))));
    }
}
