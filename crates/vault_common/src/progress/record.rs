//! Row of the simulated `user_progress` table.

use super::levels::{level_progress_percent, XpGain};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: String,
    pub user_id: String,
    pub level: u32,
    pub xp: u32,
    pub lessons_completed: u32,
    pub total_lessons: u32,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Fresh record with the column defaults of `user_progress`
    pub fn new(user_id: &str, total_lessons: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            level: 1,
            xp: 0,
            lessons_completed: 0,
            total_lessons,
            last_activity: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn course_complete(&self) -> bool {
        self.lessons_completed >= self.total_lessons
    }

    pub fn level_progress_percent(&self) -> u8 {
        level_progress_percent(self.xp)
    }

    /// Completed lessons as a percentage of the course (0-100)
    pub fn lessons_percent(&self) -> u8 {
        if self.total_lessons == 0 {
            return 100;
        }
        ((self.lessons_completed.min(self.total_lessons) * 100) / self.total_lessons) as u8
    }

    fn touched(mut self) -> Self {
        let now = Utc::now();
        self.last_activity = now;
        self.updated_at = now;
        self
    }

    /// Copy with `gain` applied
    pub fn with_gain(&self, gain: &XpGain) -> Self {
        Self {
            level: gain.new_level,
            xp: gain.new_xp,
            ..self.clone()
        }
        .touched()
    }

    /// Copy with one more lesson and the lesson bonus applied
    pub fn with_lesson(&self, gain: &XpGain) -> Self {
        Self {
            lessons_completed: self.lessons_completed + 1,
            ..self.with_gain(gain)
        }
    }

    /// Copy back at level 1 with nothing completed
    pub fn reset(&self) -> Self {
        Self {
            level: 1,
            xp: 0,
            lessons_completed: 0,
            ..self.clone()
        }
        .touched()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = ProgressRecord::new("user-1", 10);
        assert_eq!(record.level, 1);
        assert_eq!(record.xp, 0);
        assert_eq!(record.lessons_completed, 0);
        assert_eq!(record.total_lessons, 10);
        assert_eq!(record.created_at, record.updated_at);
        assert!(!record.course_complete());
    }

    #[test]
    fn test_with_lesson_keeps_identity() {
        let record = ProgressRecord::new("user-1", 10);
        let gain = XpGain::apply(record.level, record.xp, 25);
        let next = record.with_lesson(&gain);
        assert_eq!(next.id, record.id);
        assert_eq!(next.user_id, record.user_id);
        assert_eq!(next.lessons_completed, 1);
        assert_eq!(next.xp, 25);
        assert_eq!(next.created_at, record.created_at);
        assert!(next.updated_at >= record.updated_at);
    }

    #[test]
    fn test_reset() {
        let mut record = ProgressRecord::new("user-1", 10);
        record.level = 7;
        record.xp = 42;
        record.lessons_completed = 9;
        let reset = record.reset();
        assert_eq!((reset.level, reset.xp, reset.lessons_completed), (1, 0, 0));
        assert_eq!(reset.total_lessons, 10);
    }

    #[test]
    fn test_percentages() {
        let mut record = ProgressRecord::new("user-1", 10);
        record.xp = 35;
        record.lessons_completed = 4;
        assert_eq!(record.level_progress_percent(), 35);
        assert_eq!(record.lessons_percent(), 40);

        record.lessons_completed = 10;
        assert_eq!(record.lessons_percent(), 100);
        assert!(record.course_complete());
    }

    #[test]
    fn test_serialized_field_names() {
        let record = ProgressRecord::new("user-1", 10);
        let json = serde_json::to_value(&record).unwrap();
        for field in [
            "id",
            "user_id",
            "level",
            "xp",
            "lessons_completed",
            "total_lessons",
            "last_activity",
            "created_at",
            "updated_at",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }
}
