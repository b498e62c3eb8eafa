use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::core::cancel::CancelToken;
use crate::core::error::{CoreError, ReferenceError, ValidationError};
use crate::core::slot::{self, SLOTS_PER_DAY};
use crate::models::meal_type::{MealType, MealTypeCode};
use crate::models::preference::DEFAULT_SLEEP_GOAL_HOURS;
use crate::models::sleep_record::{RecordKind, SleepRecord};
use crate::models::sleep_state::{SleepState, SleepStateCode};

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    /// Nightly sleep goal feeding the day score.
    pub goal_hours: f64,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        AggregateOptions {
            goal_hours: f64::from(DEFAULT_SLEEP_GOAL_HOURS),
        }
    }
}

/// One half-hour cell of the day grid. The state occupies the cell
/// exclusively; events and meals are overlays and may coexist with it.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SlotCell {
    pub state: Option<SleepStateCode>,
    pub events: Vec<SleepStateCode>,
    pub meal: Option<MealTypeCode>,
}

impl SlotCell {
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.events.is_empty() && self.meal.is_none()
    }
}

/// Derived per-day rollup. Never persisted; computed on demand from the
/// records of one calendar day.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    /// Always exactly 48 cells, index 0 = 00:00–00:29.
    pub slots: Vec<SlotCell>,
    pub bed_time: Option<NaiveTime>,
    pub wake_time: Option<NaiveTime>,
    pub sleep_duration_hours: f64,
    pub sleep_runs: u32,
    pub score: Option<u8>,
}

impl DaySummary {
    /// Days without a single SLEEPING slot carry no score and are
    /// excluded from distributions and averages downstream.
    pub fn has_sleep_data(&self) -> bool {
        self.score.is_some()
    }
}

/// Groups records by calendar day and builds one `DaySummary` per day.
///
/// Conflict rule: when two STATE records target the same slot, the one
/// with the later `(updated_at, id)` wins, regardless of input order.
/// MEAL overlays resolve the same way; EVENT overlays accumulate in that
/// order. Deleted records are skipped. The token is polled between days;
/// once cancelled the whole computation is abandoned, never returned
/// partially.
pub fn aggregate(
    records: &[SleepRecord],
    states: &HashMap<i64, SleepState>,
    meal_types: &HashMap<i64, MealType>,
    options: AggregateOptions,
    cancel: &CancelToken,
) -> Result<BTreeMap<NaiveDate, DaySummary>, CoreError> {
    let mut by_day: BTreeMap<NaiveDate, Vec<&SleepRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| r.status().is_active()) {
        by_day.entry(record.record_date).or_default().push(record);
    }

    let mut summaries = BTreeMap::new();
    for (date, mut day_records) in by_day {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        // Apply oldest first so the last write is the latest (updated_at, id).
        day_records.sort_by_key(|r| (r.updated_at, r.id));

        let mut slots = vec![SlotCell::default(); SLOTS_PER_DAY];
        for record in day_records {
            let idx = slot::slot_index(record.time_slot).map_err(CoreError::Validation)?;
            let cell = &mut slots[idx];
            match record.kind {
                RecordKind::State => {
                    cell.state = Some(state_code(record, states)?);
                }
                RecordKind::Event => {
                    cell.events.push(state_code(record, states)?);
                }
                RecordKind::Meal => {
                    if let Some(id) = record.meal_type_id {
                        let meal = meal_types
                            .get(&id)
                            .ok_or(ReferenceError::UnknownMealType(id))?;
                        cell.meal = Some(meal.type_code);
                    }
                }
            }
        }

        summaries.insert(date, summarize_day(date, slots, options.goal_hours));
    }

    Ok(summaries)
}

fn state_code(
    record: &SleepRecord,
    states: &HashMap<i64, SleepState>,
) -> Result<SleepStateCode, CoreError> {
    let id = record
        .sleep_state_id
        .ok_or(CoreError::Validation(ValidationError::InvalidSleepState))?;
    let state = states.get(&id).ok_or(ReferenceError::UnknownState(id))?;
    Ok(state.state_code)
}

fn summarize_day(date: NaiveDate, slots: Vec<SlotCell>, goal_hours: f64) -> DaySummary {
    let mask: Vec<bool> = slots
        .iter()
        .map(|c| c.state == Some(SleepStateCode::Sleeping))
        .collect();
    let runs = sleeping_runs(&mask);
    let sleeping_slots: usize = runs.iter().map(|r| r.len).sum();
    let duration = sleeping_slots as f64 * 0.5;

    let (bed_time, wake_time, score) = match runs.first() {
        None => (None, None, None),
        Some(first) => (
            Some(slot::slot_start(first.start)),
            Some(slot::slot_start(first.start + first.len)),
            Some(compute_score(duration, goal_hours, runs.len())),
        ),
    };

    DaySummary {
        date,
        slots,
        bed_time,
        wake_time,
        sleep_duration_hours: duration,
        sleep_runs: runs.len() as u32,
        score,
    }
}

struct Run {
    start: usize,
    len: usize,
}

/// Maximal runs of SLEEPING slots, computed circularly: a run crossing
/// the 47→0 boundary is a single run. The list is ordered by the slot at
/// which a run is first encountered scanning from index 0; a wrapping run
/// is encountered at slot 0 and reports its pre-midnight start.
fn sleeping_runs(mask: &[bool]) -> Vec<Run> {
    let n = mask.len();
    if mask.iter().all(|&m| m) {
        return if n == 0 {
            Vec::new()
        } else {
            vec![Run { start: 0, len: n }]
        };
    }

    let mut runs = Vec::new();
    let mut i = 0;
    while i < n {
        if mask[i] {
            let start = i;
            while i < n && mask[i] {
                i += 1;
            }
            runs.push(Run {
                start,
                len: i - start,
            });
        } else {
            i += 1;
        }
    }

    let wraps = runs.len() >= 2
        && runs[0].start == 0
        && runs.last().is_some_and(|last| last.start + last.len == n);
    if wraps {
        if let Some(last) = runs.pop() {
            runs[0].start = last.start;
            runs[0].len += last.len;
        }
    }

    runs
}

/// Score policy: goal attainment capped at 100%, minus 5 points per
/// fragmentation break, clamped into [0, 100].
fn compute_score(duration_hours: f64, goal_hours: f64, runs: usize) -> u8 {
    let goal = if goal_hours > 0.0 {
        goal_hours
    } else {
        f64::from(DEFAULT_SLEEP_GOAL_HOURS)
    };
    let ratio = (duration_hours / goal).min(1.0);
    let base = (100.0 * ratio).round() as i64;
    let penalty = 5 * (runs as i64 - 1);
    (base - penalty).clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap()
    }

    fn record(
        seq: u128,
        kind: RecordKind,
        slot_time: NaiveTime,
        state_id: Option<i64>,
        meal_id: Option<i64>,
        updated_offset_secs: i64,
    ) -> SleepRecord {
        SleepRecord {
            id: Uuid::from_u128(seq),
            diary_id: Uuid::from_u128(7),
            user_id: Uuid::from_u128(9),
            record_date: date(),
            time_slot: slot_time,
            kind,
            sleep_state_id: state_id,
            meal_type_id: meal_id,
            note: None,
            created_at: base_time(),
            updated_at: base_time() + Duration::seconds(updated_offset_secs),
            deleted_at: None,
        }
    }

    fn sleeping(seq: u128, slot_time: NaiveTime) -> SleepRecord {
        record(seq, RecordKind::State, slot_time, Some(1), None, 0)
    }

    fn states() -> HashMap<i64, SleepState> {
        SleepState::defaults().into_iter().map(|s| (s.id, s)).collect()
    }

    fn meals() -> HashMap<i64, MealType> {
        MealType::defaults().into_iter().map(|m| (m.id, m)).collect()
    }

    fn run(records: &[SleepRecord]) -> BTreeMap<NaiveDate, DaySummary> {
        aggregate(
            records,
            &states(),
            &meals(),
            AggregateOptions::default(),
            &CancelToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_input_yields_empty_map() {
        assert!(run(&[]).is_empty());
    }

    #[test]
    fn test_midnight_wrap_run() {
        // SLEEPING at 23:00, 23:30, 00:00, 00:30 of the same day grid
        let records = vec![
            sleeping(1, at(23, 0)),
            sleeping(2, at(23, 30)),
            sleeping(3, at(0, 0)),
            sleeping(4, at(0, 30)),
        ];
        let summaries = run(&records);
        let day = &summaries[&date()];
        assert_eq!(day.bed_time, Some(at(23, 0)));
        assert_eq!(day.wake_time, Some(at(1, 0)));
        assert_eq!(day.sleep_duration_hours, 2.0);
        assert_eq!(day.sleep_runs, 1);
        // 2h of an 8h goal, single run
        assert_eq!(day.score, Some(25));
    }

    #[test]
    fn test_day_without_sleep_has_no_bed_or_score() {
        let records = vec![record(1, RecordKind::State, at(12, 0), Some(3), None, 0)];
        let summaries = run(&records);
        let day = &summaries[&date()];
        assert_eq!(day.bed_time, None);
        assert_eq!(day.wake_time, None);
        assert_eq!(day.score, None);
        assert_eq!(day.sleep_duration_hours, 0.0);
        assert!(!day.has_sleep_data());
    }

    #[test]
    fn test_last_write_wins_regardless_of_input_order() {
        let older = record(1, RecordKind::State, at(2, 0), Some(1), None, 0);
        let newer = record(2, RecordKind::State, at(2, 0), Some(3), None, 60);

        let forward = run(&[older.clone(), newer.clone()]);
        let reversed = run(&[newer, older]);

        assert_eq!(forward, reversed);
        let cell = &forward[&date()].slots[4];
        assert_eq!(cell.state, Some(SleepStateCode::Awake));
    }

    #[test]
    fn test_last_write_ties_break_on_id() {
        let a = record(1, RecordKind::State, at(2, 0), Some(1), None, 0);
        let b = record(2, RecordKind::State, at(2, 0), Some(3), None, 0);

        let forward = run(&[a.clone(), b.clone()]);
        let reversed = run(&[b, a]);
        assert_eq!(forward, reversed);
        assert_eq!(
            forward[&date()].slots[4].state,
            Some(SleepStateCode::Awake)
        );
    }

    #[test]
    fn test_events_and_meals_do_not_displace_state() {
        let records = vec![
            sleeping(1, at(22, 0)),
            record(2, RecordKind::Event, at(22, 0), Some(5), None, 30),
            record(3, RecordKind::Meal, at(22, 0), None, Some(4), 60),
        ];
        let summaries = run(&records);
        let cell = &summaries[&date()].slots[44];
        assert_eq!(cell.state, Some(SleepStateCode::Sleeping));
        assert_eq!(cell.events, vec![SleepStateCode::Medication]);
        assert_eq!(cell.meal, Some(MealTypeCode::Snack));
    }

    #[test]
    fn test_fragmentation_penalty() {
        // two separate runs of 8 slots each: 8h total, goal met, one break
        let mut records = Vec::new();
        let mut seq = 1u128;
        for idx in 0..8usize {
            records.push(sleeping(seq, slot::slot_start(idx)));
            seq += 1;
        }
        for idx in 20..28usize {
            records.push(sleeping(seq, slot::slot_start(idx)));
            seq += 1;
        }
        let summaries = run(&records);
        let day = &summaries[&date()];
        assert_eq!(day.sleep_duration_hours, 8.0);
        assert_eq!(day.sleep_runs, 2);
        assert_eq!(day.score, Some(95));
        // first run scanning from slot 0 starts at midnight
        assert_eq!(day.bed_time, Some(at(0, 0)));
        assert_eq!(day.wake_time, Some(at(4, 0)));
    }

    #[test]
    fn test_every_slot_sleeping_is_one_full_day_run() {
        let records: Vec<SleepRecord> = (0..SLOTS_PER_DAY)
            .map(|idx| sleeping(idx as u128 + 1, slot::slot_start(idx)))
            .collect();
        let summaries = run(&records);
        let day = &summaries[&date()];
        assert_eq!(day.sleep_duration_hours, 24.0);
        assert_eq!(day.sleep_runs, 1);
        assert_eq!(day.bed_time, Some(at(0, 0)));
        assert_eq!(day.wake_time, Some(at(0, 0)));
        assert_eq!(day.score, Some(100));
    }

    #[test]
    fn test_deleted_records_are_skipped() {
        let mut tombstoned = sleeping(1, at(23, 0));
        tombstoned.deleted_at = Some(base_time());
        assert!(run(&[tombstoned]).is_empty());
    }

    #[test]
    fn test_unknown_state_reference_is_reported() {
        let bad = record(1, RecordKind::State, at(23, 0), Some(404), None, 0);
        let err = aggregate(
            &[bad],
            &states(),
            &meals(),
            AggregateOptions::default(),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            CoreError::Reference(ReferenceError::UnknownState(404))
        );
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = aggregate(
            &[sleeping(1, at(23, 0))],
            &states(),
            &meals(),
            AggregateOptions::default(),
            &cancel,
        )
        .unwrap_err();
        assert_eq!(err, CoreError::Cancelled);
    }

    #[test]
    fn test_duration_bounds() {
        for count in [0usize, 1, 16, SLOTS_PER_DAY] {
            let records: Vec<SleepRecord> = (0..count)
                .map(|idx| sleeping(idx as u128 + 1, slot::slot_start(idx)))
                .collect();
            let summaries = run(&records);
            if count == 0 {
                assert!(summaries.is_empty());
            } else {
                let day = &summaries[&date()];
                assert_eq!(day.sleep_duration_hours, count as f64 * 0.5);
                assert!(day.sleep_duration_hours >= 0.0);
                assert!(day.sleep_duration_hours <= 24.0);
            }
        }
    }
}
