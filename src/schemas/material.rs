use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Material;
use crate::db::types::MaterialType;

/// Text fields of a material write; the optional upload travels beside it.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct MaterialPayload {
    #[serde(default)]
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) material_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MaterialResponse {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) file: Option<String>,
    #[serde(rename = "type")]
    pub(crate) material_type: MaterialType,
    pub(crate) uploaded_by: i64,
    pub(crate) uploaded_at: String,
}

impl MaterialResponse {
    /// `file_url` maps the stored relative path to its public URL.
    pub(crate) fn from_db(material: Material, file_url: impl Fn(&str) -> String) -> Self {
        Self {
            id: material.id,
            title: material.title,
            content: material.content,
            file: material.file_path.as_deref().map(file_url),
            material_type: material.material_type,
            uploaded_by: material.uploaded_by,
            uploaded_at: format_primitive(material.uploaded_at),
        }
    }
}
