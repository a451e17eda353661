//! Mouse Flux - Reshape mouse biometric workbooks into flat, time-indexed records
//!
//! Flux turns a four-sheet workbook of per-minute activity and body temperature
//! readings (one sheet per sex and metric, time steps as rows, subjects as
//! columns) into one long record set through a deterministic pipeline:
//! sheet loading → reshaping → per-sex outer join → concatenation → gzip JSON.
//!
//! ## Modules
//!
//! - **Loader**: Read named sheets into time-by-subject matrices
//! - **Reshaper / Merger / Aggregator**: The reshape-and-merge core
//! - **Encoder**: Compressed JSON output

pub mod aggregator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod loader;
pub mod merger;
pub mod pipeline;
pub mod reshaper;
pub mod types;

pub use config::{PipelineConfig, SheetNames};
pub use error::{ComputeError, Stage};
pub use loader::{InMemoryWorkbook, SheetSource, XlsxWorkbook};
pub use pipeline::{process_source, process_workbook, run, MousePipeline, RunSummary};
pub use types::{Gender, MergedRecord, Metric, SheetKind};

/// Flux version
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");
