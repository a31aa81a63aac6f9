use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct EnrollmentPayload {
    #[serde(default)]
    pub(crate) module: Option<i64>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0, message = "Ensure this value is between 0.0 and 100.0."))]
    pub(crate) progress: Option<f64>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentResponse {
    pub(crate) id: i64,
    pub(crate) student: i64,
    pub(crate) module: i64,
    pub(crate) enrolled_at: String,
    pub(crate) progress: f64,
    pub(crate) status: EnrollmentStatus,
}

impl EnrollmentResponse {
    pub(crate) fn from_db(enrollment: Enrollment) -> Self {
        Self {
            id: enrollment.id,
            student: enrollment.student_id,
            module: enrollment.module_id,
            enrolled_at: format_primitive(enrollment.enrolled_at),
            progress: enrollment.progress,
            status: enrollment.status,
        }
    }
}
