//! Domain DTOs for the tutoring API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch schema drift between the two crates. All entities
//! are server-owned: this layer only carries them between the wire and the
//! caller.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type TeacherId = i64;
pub type CategoryId = i64;
pub type ScheduleTimeId = i64;
pub type LessonId = i64;

/// Login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Account creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub surname: String,
    pub birthdate: NaiveDate,
}

/// Returned by login and sign-up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub birthdate: NaiveDate,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Merge patch for a `UserProfile`.
///
/// Only fields that are `Some` are sent; the server keeps its current value
/// for every omitted field. `avatar` is either an existing avatar id or a
/// base64-encoded image.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthdate: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The profile that results from applying this patch to `current`.
    pub fn apply_to(&self, current: &UserProfile) -> UserProfile {
        UserProfile {
            email: self.email.clone().unwrap_or_else(|| current.email.clone()),
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            surname: self.surname.clone().unwrap_or_else(|| current.surname.clone()),
            birthdate: self.birthdate.unwrap_or(current.birthdate),
            avatar: self.avatar.clone().or_else(|| current.avatar.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeacherSkill {
    pub skill_id: i64,
    pub category_id: CategoryId,
    pub category_name: String,
    pub about: String,
    #[serde(default)]
    pub video_card_link: Option<String>,
    /// 0.0 to 5.0, computed by the server.
    pub rate: f64,
}

/// Payload for registering a teaching skill for the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSkill {
    pub category_id: CategoryId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_card_link: Option<String>,
    pub about: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeacherProfile {
    pub teacher_id: TeacherId,
    pub user_id: i64,
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub finished_lessons: u32,
    pub skills: Vec<TeacherSkill>,
}

impl TeacherProfile {
    /// The skill booking flows default to.
    pub fn primary_skill(&self) -> Option<&TeacherSkill> {
        self.skills.first()
    }

    pub fn skill_for_category(&self, category_id: CategoryId) -> Option<&TeacherSkill> {
        self.skills.iter().find(|s| s.category_id == category_id)
    }
}

/// A bookable time window declared by a teacher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub schedule_time_id: ScheduleTimeId,
    pub datetime: DateTime<Utc>,
    pub is_available: bool,
}

/// Payload for opening a new schedule slot for the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScheduleSlot {
    pub datetime: DateTime<Utc>,
}

/// Available slots in ascending datetime order. Slots with equal datetimes
/// keep the order the server returned them in.
pub fn available_slots(slots: &[ScheduleSlot]) -> Vec<ScheduleSlot> {
    let mut open: Vec<ScheduleSlot> = slots.iter().filter(|s| s.is_available).cloned().collect();
    open.sort_by_key(|s| s.datetime);
    open
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonRequest {
    pub teacher_id: TeacherId,
    pub category_id: CategoryId,
    pub schedule_time_id: ScheduleTimeId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LessonStatus {
    Requested,
    Finished,
}

/// Returned by lesson booking and lesson completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonConfirmation {
    pub lesson_id: LessonId,
    pub teacher_id: TeacherId,
    pub category_id: CategoryId,
    pub schedule_time_id: ScheduleTimeId,
    pub status: LessonStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub student_name: String,
    pub student_surname: String,
    #[serde(default)]
    pub student_avatar: Option<String>,
    pub rate: f64,
    pub comment: String,
}

/// Raw avatar image. Encoding it for display is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            email: "a@b.com".to_string(),
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            avatar: Some("av-1".to_string()),
        }
    }

    fn slot(id: i64, hour: u32, is_available: bool) -> ScheduleSlot {
        ScheduleSlot {
            schedule_time_id: id,
            datetime: Utc.with_ymd_and_hms(2026, 11, 2, hour, 0, 0).unwrap(),
            is_available,
        }
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = ProfilePatch {
            name: Some("Grace".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Grace" }));
    }

    #[test]
    fn patch_keeps_omitted_fields() {
        let patch = ProfilePatch {
            surname: Some("Hopper".to_string()),
            ..Default::default()
        };
        let merged = patch.apply_to(&profile());
        assert_eq!(merged.surname, "Hopper");
        assert_eq!(merged.name, "Ada");
        assert_eq!(merged.avatar.as_deref(), Some("av-1"));
        assert!(ProfilePatch::default().is_empty());
        assert!(!patch.is_empty());
    }

    #[test]
    fn profile_avatar_is_optional_on_the_wire() {
        let p: UserProfile = serde_json::from_str(
            r#"{"email":"a@b.com","name":"A","surname":"B","birthdate":"2000-01-31"}"#,
        )
        .unwrap();
        assert!(p.avatar.is_none());
        assert_eq!(p.birthdate, NaiveDate::from_ymd_opt(2000, 1, 31).unwrap());
    }

    #[test]
    fn available_slots_sorted_and_stable() {
        let slots = vec![slot(3, 12, true), slot(1, 9, true), slot(2, 10, false), slot(4, 9, true)];
        let ids: Vec<i64> = available_slots(&slots)
            .iter()
            .map(|s| s.schedule_time_id)
            .collect();
        assert_eq!(ids, vec![1, 4, 3]);
    }

    #[test]
    fn lesson_status_is_lowercase() {
        assert_eq!(
            serde_json::to_value(LessonStatus::Finished).unwrap(),
            serde_json::json!("finished")
        );
    }

    #[test]
    fn primary_skill_is_first() {
        let teacher: TeacherProfile = serde_json::from_str(
            r#"{"teacher_id":1,"user_id":7,"name":"T","surname":"S","finished_lessons":0,
                "skills":[{"skill_id":5,"category_id":2,"category_name":"physics","about":"x","rate":4.5},
                          {"skill_id":6,"category_id":1,"category_name":"math","about":"y","rate":0.0}]}"#,
        )
        .unwrap();
        assert_eq!(teacher.primary_skill().map(|s| s.skill_id), Some(5));
        assert_eq!(teacher.skill_for_category(1).map(|s| s.skill_id), Some(6));
        assert!(teacher.skill_for_category(9).is_none());
    }
}
