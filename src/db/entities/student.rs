use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::web::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub total: u32,
    pub attended: u32,
    pub rate: f64,
}

impl Attendance {
    pub fn new(total: u32, attended: u32) -> Self {
        let mut attendance = Attendance {
            total,
            attended,
            rate: 0.0,
        };
        attendance.recompute();
        attendance
    }

    /// Keeps `rate == attended / total * 100`, rounded to one decimal.
    pub fn recompute(&mut self) {
        self.attended = self.attended.min(self.total);
        self.rate = if self.total == 0 {
            0.0
        } else {
            let raw = self.attended as f64 / self.total as f64 * 100.0;
            (raw * 10.0).round() / 10.0
        };
    }
}

/// An attendance edit. Absolute values are applied first, then `present`
/// records one more class (attended or missed).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUpdate {
    pub total: Option<u32>,
    pub attended: Option<u32>,
    pub present: Option<bool>,
}

impl AttendanceUpdate {
    pub fn is_empty(&self) -> bool {
        self.total.is_none() && self.attended.is_none() && self.present.is_none()
    }
}

impl Attendance {
    /// Leaves `self` untouched when the edit is rejected.
    pub fn apply(&mut self, update: AttendanceUpdate) -> Result<(), AppError> {
        let mut next = *self;
        if let Some(total) = update.total {
            next.total = total;
        }
        if let Some(attended) = update.attended {
            next.attended = attended;
        }
        if let Some(present) = update.present {
            next.total = next.total.checked_add(1).ok_or_else(counter_overflow)?;
            if present {
                next.attended = next.attended.checked_add(1).ok_or_else(counter_overflow)?;
            }
        }
        next.recompute();
        *self = next;
        Ok(())
    }
}

fn counter_overflow() -> AppError {
    AppError::InvalidInput("출석 횟수가 허용 범위를 벗어났습니다.".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    pub course_id: String,
    /// Copied from the course at enrolment time.
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub birth_year: Option<i32>,
    pub school: Option<String>,
    pub parent_name: String,
    pub parent_phone: String,
    pub parent_user_id: Option<String>,
    #[serde(default)]
    pub courses: Vec<EnrolledCourse>,
    #[serde(default)]
    pub attendance: Attendance,
    pub memo: Option<String>,
    #[serde(with = "crate::db::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::db::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn is_enrolled_in_any(&self, course_ids: &[String]) -> bool {
        self.courses
            .iter()
            .any(|c| course_ids.iter().any(|id| id == &c.course_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_rate() {
        assert_eq!(Attendance::new(0, 0).rate, 0.0);
        assert_eq!(Attendance::new(4, 3).rate, 75.0);
        assert_eq!(Attendance::new(3, 1).rate, 33.3);
        assert_eq!(Attendance::new(3, 2).rate, 66.7);
    }

    #[test]
    fn test_attended_is_clamped_to_total() {
        let attendance = Attendance::new(5, 9);
        assert_eq!(attendance.attended, 5);
        assert_eq!(attendance.rate, 100.0);
    }

    #[test]
    fn test_apply_update() {
        let mut attendance = Attendance::new(9, 9);
        attendance
            .apply(AttendanceUpdate {
                present: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!((attendance.total, attendance.attended), (10, 9));
        assert_eq!(attendance.rate, 90.0);

        attendance
            .apply(AttendanceUpdate {
                total: Some(20),
                attended: Some(10),
                present: Some(true),
            })
            .unwrap();
        assert_eq!((attendance.total, attendance.attended), (21, 11));
        assert_eq!(attendance.rate, 52.4);
        assert!(AttendanceUpdate::default().is_empty());
    }

    #[test]
    fn test_apply_rejects_counter_overflow() {
        let mut attendance = Attendance::new(10, 8);
        let result = attendance.apply(AttendanceUpdate {
            total: Some(u32::MAX),
            attended: Some(u32::MAX),
            present: Some(true),
        });
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(attendance, Attendance::new(10, 8));

        // At the ceiling, absolute values alone are still accepted.
        attendance
            .apply(AttendanceUpdate {
                total: Some(u32::MAX),
                attended: Some(u32::MAX),
                present: None,
            })
            .unwrap();
        assert_eq!(attendance.attended, u32::MAX);
        assert_eq!(attendance.rate, 100.0);
    }

    #[test]
    fn test_enrolment_lookup() {
        let student = Student {
            id: "s1".to_string(),
            name: "김민준".to_string(),
            birth_year: Some(2015),
            school: None,
            parent_name: "김부모".to_string(),
            parent_phone: "010-1234-5678".to_string(),
            parent_user_id: None,
            courses: vec![EnrolledCourse {
                course_id: "c1".to_string(),
                title: "레고 로보틱스".to_string(),
            }],
            attendance: Attendance::default(),
            memo: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(student.is_enrolled_in_any(&["c0".to_string(), "c1".to_string()]));
        assert!(!student.is_enrolled_in_any(&["c2".to_string()]));
        assert!(!student.is_enrolled_in_any(&[]));
    }
}
