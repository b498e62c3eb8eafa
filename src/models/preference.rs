use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_SLEEP_GOAL_HOURS: i32 = 8;

/// Per-user sleep preferences: target bed/wake window and the nightly
/// goal that feeds day scoring.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SleepPreference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub preferred_bedtime: NaiveTime,
    pub preferred_wakeup_time: NaiveTime,
    pub sleep_goal_hours: i32,
    pub reminder_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SleepPreference {
    /// The defaults a user gets before they have saved anything.
    pub fn default_for(user_id: Uuid) -> Self {
        let now = Utc::now();
        SleepPreference {
            id: Uuid::new_v4(),
            user_id,
            preferred_bedtime: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            preferred_wakeup_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            sleep_goal_hours: DEFAULT_SLEEP_GOAL_HOURS,
            reminder_enabled: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when `t` lies inside the preferred sleep window. The window
    /// is circular: a bedtime after the wake time means it wraps past
    /// midnight, so 23:30 is inside a 23:00→07:00 window and 12:00 is not.
    pub fn is_within_target_window(&self, t: NaiveTime) -> bool {
        let bed = self.preferred_bedtime;
        let wake = self.preferred_wakeup_time;
        if bed <= wake {
            t >= bed && t <= wake
        } else {
            t >= bed || t <= wake
        }
    }

    pub fn goal_hours(&self) -> f64 {
        if self.sleep_goal_hours > 0 {
            f64::from(self.sleep_goal_hours)
        } else {
            f64::from(DEFAULT_SLEEP_GOAL_HOURS)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertSleepPreferenceRequest {
    pub preferred_bedtime: Option<NaiveTime>,
    pub preferred_wakeup_time: Option<NaiveTime>,
    pub sleep_goal_hours: Option<i32>,
    pub reminder_enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pref(bed: (u32, u32), wake: (u32, u32)) -> SleepPreference {
        let mut p = SleepPreference::default_for(Uuid::new_v4());
        p.preferred_bedtime = NaiveTime::from_hms_opt(bed.0, bed.1, 0).unwrap();
        p.preferred_wakeup_time = NaiveTime::from_hms_opt(wake.0, wake.1, 0).unwrap();
        p
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_window_wrapping_midnight() {
        let p = pref((23, 0), (7, 0));
        assert!(p.is_within_target_window(at(23, 30)));
        assert!(p.is_within_target_window(at(0, 30)));
        assert!(p.is_within_target_window(at(7, 0)));
        assert!(!p.is_within_target_window(at(12, 0)));
        assert!(!p.is_within_target_window(at(22, 59)));
    }

    #[test]
    fn test_window_within_one_day() {
        let p = pref((13, 0), (15, 0));
        assert!(p.is_within_target_window(at(14, 0)));
        assert!(!p.is_within_target_window(at(12, 0)));
        assert!(!p.is_within_target_window(at(23, 0)));
    }

    #[test]
    fn test_goal_hours_guards_nonpositive_values() {
        let mut p = SleepPreference::default_for(Uuid::new_v4());
        p.sleep_goal_hours = 0;
        assert_eq!(p.goal_hours(), 8.0);
        p.sleep_goal_hours = 7;
        assert_eq!(p.goal_hours(), 7.0);
    }
}
