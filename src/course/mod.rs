/// Course and enrollment management
///
/// Courses belong to a department and a single owning teacher. Enrollment is
/// implicit departmental membership made explicit as rows: students are
/// enrolled in every course whose department matches theirs, either at
/// registration time or lazily via `ensure_enrolled` on listing.

mod manager;

pub use manager::CourseManager;

use crate::db::models::Course;
use serde::{Deserialize, Serialize};

/// Course listing entry for students; `enrolled` is always true after the
/// ensure-enrolled pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCourse {
    #[serde(flatten)]
    pub course: Course,
    pub enrolled: bool,
}
