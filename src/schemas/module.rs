use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::EducationalModule;

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ModulePayload {
    #[serde(default)]
    #[validate(range(
        min = 1,
        max = 2_147_483_647,
        message = "Ensure this value is between 1 and 2147483647."
    ))]
    pub(crate) order_number: Option<i64>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) course: Option<i64>,
    #[serde(default)]
    pub(crate) materials: Option<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ModuleListQuery {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) author: Option<String>,
    #[serde(default)]
    pub(crate) course: Option<String>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) ordering: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModuleResponse {
    pub(crate) id: i64,
    pub(crate) order_number: i32,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) course: i64,
    pub(crate) author: i64,
    pub(crate) materials: Vec<i64>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ModuleResponse {
    pub(crate) fn from_db(module: EducationalModule) -> Self {
        Self {
            id: module.id,
            order_number: module.order_number,
            title: module.title,
            description: module.description,
            course: module.course_id,
            author: module.author_id,
            materials: module.materials,
            created_at: format_primitive(module.created_at),
            updated_at: format_primitive(module.updated_at),
        }
    }
}
