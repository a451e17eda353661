//! Activity/temperature outer join
//!
//! This module joins the long-form activity and temperature streams of one
//! gender on `(time step, subject id)`. Every key present in either stream
//! appears exactly once in the output; the metric from the side lacking the
//! key is left empty.

use crate::error::{ComputeError, Stage};
use crate::types::{Gender, JoinKey, LongRecord, MergedRecord, Metric};
use std::collections::HashMap;

/// Merger for joining activity and temperature records
pub struct Merger;

/// Internal accumulator for one join key
struct Slot {
    record: MergedRecord,
    has_activity: bool,
    has_temp: bool,
}

impl Merger {
    /// Outer-join the activity and temperature streams of one gender.
    ///
    /// Output order: keys in activity order, then keys only present in the
    /// temperature stream, in temperature order. Both streams are subject-major,
    /// so the output is not sorted by time step.
    pub fn merge(
        gender: Gender,
        activity: &[LongRecord],
        temp: &[LongRecord],
    ) -> Result<Vec<MergedRecord>, ComputeError> {
        let mut index: HashMap<JoinKey, usize> = HashMap::with_capacity(activity.len());
        let mut slots: Vec<Slot> = Vec::with_capacity(activity.len().max(temp.len()));

        for record in activity {
            check_label(record, gender, Metric::Activity)?;
            let slot = slot_for(&mut index, &mut slots, record, gender);
            if slot.has_activity {
                return Err(duplicate_key(record));
            }
            slot.has_activity = true;
            slot.record.activity = record.value;
        }

        for record in temp {
            check_label(record, gender, Metric::Temp)?;
            let slot = slot_for(&mut index, &mut slots, record, gender);
            if slot.has_temp {
                return Err(duplicate_key(record));
            }
            slot.has_temp = true;
            slot.record.temp = record.value;
            slot.record.estrus = record.estrus;
        }

        let activity_only = slots.iter().filter(|s| !s.has_temp).count();
        let temp_only = slots.iter().filter(|s| !s.has_activity).count();
        tracing::debug!(
            %gender,
            merged = slots.len(),
            activity_only,
            temp_only,
            "merged activity and temperature"
        );

        Ok(slots.into_iter().map(|slot| slot.record).collect())
    }
}

fn slot_for<'a>(
    index: &mut HashMap<JoinKey, usize>,
    slots: &'a mut Vec<Slot>,
    record: &LongRecord,
    gender: Gender,
) -> &'a mut Slot {
    let position = *index.entry(record.key()).or_insert_with(|| {
        slots.push(Slot {
            record: MergedRecord::for_key(record.time_step, record.subject_id.clone(), gender),
            has_activity: false,
            has_temp: false,
        });
        slots.len() - 1
    });
    &mut slots[position]
}

fn check_label(record: &LongRecord, gender: Gender, metric: Metric) -> Result<(), ComputeError> {
    if record.gender != gender || record.metric != metric {
        return Err(ComputeError::data_format(
            Stage::Merge,
            format!(
                "expected {metric}-{gender} record, found {}-{} for subject '{}' at time step {}",
                record.metric, record.gender, record.subject_id, record.time_step
            ),
        ));
    }
    Ok(())
}

fn duplicate_key(record: &LongRecord) -> ComputeError {
    ComputeError::data_format(
        Stage::Merge,
        format!(
            "duplicate {} record for subject '{}' at time step {} ({})",
            record.metric, record.subject_id, record.time_step, record.gender
        ),
    )
}
