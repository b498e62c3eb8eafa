use std::f64::consts::TAU;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use crate::core::aggregate::DaySummary;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Day counts per fixed score bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ScoreDistribution {
    /// 90–100
    pub excellent: u32,
    /// 80–89
    pub good: u32,
    /// 70–79
    pub fair: u32,
    /// 60–69
    pub poor: u32,
    /// 0–59
    pub bad: u32,
}

impl ScoreDistribution {
    fn record(&mut self, score: u8) {
        match score {
            90..=100 => self.excellent += 1,
            80..=89 => self.good += 1,
            70..=79 => self.fair += 1,
            60..=69 => self.poor += 1,
            _ => self.bad += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.excellent + self.good + self.fair + self.poor + self.bad
    }
}

/// Averages for one ISO weekday across the period. Only weekdays with at
/// least one data day appear.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekdayAverage {
    pub weekday: String,
    pub iso_weekday: u8,
    pub days: u32,
    pub average_duration_hours: f64,
    pub average_score: f64,
}

/// Period rollup. All averages are `None` when the period holds no day
/// with sleep data; change fields are `None` when no baseline was
/// supplied or the baseline itself holds no data.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: i64,
    pub days_with_data: u32,
    pub average_duration_hours: Option<f64>,
    pub average_score: Option<f64>,
    pub average_bed_time: Option<NaiveTime>,
    pub average_wake_time: Option<NaiveTime>,
    /// Share (0–100) of data days whose duration met the goal.
    pub target_achievement_rate: Option<f64>,
    pub duration_change_hours: Option<f64>,
    pub score_change: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodStatistics {
    pub score_distribution: ScoreDistribution,
    pub weekday_averages: Vec<WeekdayAverage>,
    pub summary: PeriodSummary,
}

/// Rolls per-day summaries up into period statistics.
///
/// `baseline` is the immediately preceding period of identical length,
/// fetched by the caller; pass `None` when no baseline is wanted. Days
/// without sleep data never count as zero — they are excluded from the
/// distribution and every average.
pub fn compute_statistics(
    summaries: &[DaySummary],
    baseline: Option<&[DaySummary]>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    goal_hours: f64,
) -> PeriodStatistics {
    let days: Vec<&DaySummary> = summaries
        .iter()
        .filter(|d| d.date >= start_date && d.date <= end_date && d.has_sleep_data())
        .collect();

    let mut distribution = ScoreDistribution::default();
    let mut weekday_acc = [(0u32, 0f64, 0f64); 7];
    let mut durations = Vec::with_capacity(days.len());
    let mut scores = Vec::with_capacity(days.len());
    let mut bed_times = Vec::with_capacity(days.len());
    let mut wake_times = Vec::with_capacity(days.len());
    let mut goal_met = 0u32;

    for day in &days {
        let score = day.score.unwrap_or(0);
        distribution.record(score);

        let slot = day.date.weekday().num_days_from_monday() as usize;
        weekday_acc[slot].0 += 1;
        weekday_acc[slot].1 += day.sleep_duration_hours;
        weekday_acc[slot].2 += f64::from(score);

        durations.push(day.sleep_duration_hours);
        scores.push(f64::from(score));
        if let Some(t) = day.bed_time {
            bed_times.push(t);
        }
        if let Some(t) = day.wake_time {
            wake_times.push(t);
        }
        if day.sleep_duration_hours >= goal_hours {
            goal_met += 1;
        }
    }

    let weekday_averages = weekday_acc
        .iter()
        .enumerate()
        .filter(|(_, (count, _, _))| *count > 0)
        .map(|(idx, (count, dur_sum, score_sum))| WeekdayAverage {
            weekday: DAY_NAMES[idx].to_string(),
            iso_weekday: idx as u8 + 1,
            days: *count,
            average_duration_hours: dur_sum / f64::from(*count),
            average_score: score_sum / f64::from(*count),
        })
        .collect();

    let average_duration_hours = mean(&durations);
    let average_score = mean(&scores);

    let baseline_days: Vec<&DaySummary> = baseline
        .unwrap_or(&[])
        .iter()
        .filter(|d| d.has_sleep_data())
        .collect();
    let baseline_duration = mean(
        &baseline_days
            .iter()
            .map(|d| d.sleep_duration_hours)
            .collect::<Vec<_>>(),
    );
    let baseline_score = mean(
        &baseline_days
            .iter()
            .map(|d| f64::from(d.score.unwrap_or(0)))
            .collect::<Vec<_>>(),
    );

    let summary = PeriodSummary {
        start_date,
        end_date,
        total_days: (end_date - start_date).num_days() + 1,
        days_with_data: days.len() as u32,
        average_duration_hours,
        average_score,
        average_bed_time: circular_mean_time(&bed_times),
        average_wake_time: circular_mean_time(&wake_times),
        target_achievement_rate: if days.is_empty() {
            None
        } else {
            Some(f64::from(goal_met) / days.len() as f64 * 100.0)
        },
        duration_change_hours: match (average_duration_hours, baseline_duration) {
            (Some(cur), Some(prev)) => Some(cur - prev),
            _ => None,
        },
        score_change: match (average_score, baseline_score) {
            (Some(cur), Some(prev)) => Some(cur - prev),
            _ => None,
        },
    };

    PeriodStatistics {
        score_distribution: distribution,
        weekday_averages,
        summary,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean time-of-day on the 24h circle, so times straddling midnight do
/// not get pulled toward noon: {23:30, 00:30} averages to 00:00. The
/// result is rounded to the nearest minute. Antipodal inputs cancel out
/// and have no meaningful mean.
pub fn circular_mean_time(times: &[NaiveTime]) -> Option<NaiveTime> {
    if times.is_empty() {
        return None;
    }

    let mut x = 0f64;
    let mut y = 0f64;
    for t in times {
        let theta = f64::from(t.num_seconds_from_midnight()) / SECONDS_PER_DAY * TAU;
        x += theta.cos();
        y += theta.sin();
    }

    if x.hypot(y) < 1e-9 {
        return None;
    }

    let mut theta = y.atan2(x);
    if theta < 0.0 {
        theta += TAU;
    }
    let seconds = (theta / TAU * SECONDS_PER_DAY).round() as u32;
    let minutes = (seconds + 30) / 60 % (24 * 60);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
}
