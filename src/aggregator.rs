//! Per-gender concatenation

use crate::types::MergedRecord;

/// Aggregator for combining the per-gender merged tables
pub struct Aggregator;

impl Aggregator {
    /// All male records followed by all female records, each in merge order.
    ///
    /// No deduplication or re-sorting happens here; `(time step, subject, gender)`
    /// stays unique because each input is keyed on `(time step, subject)` and
    /// the two inputs carry different genders.
    pub fn concat(male: Vec<MergedRecord>, female: Vec<MergedRecord>) -> Vec<MergedRecord> {
        let mut records = male;
        records.reserve(female.len());
        records.extend(female);
        records
    }
}
