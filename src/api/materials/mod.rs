mod form;
mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::core::state::AppState;

/// Multipart framing and text fields on top of the file itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub(crate) fn router(max_upload_bytes: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(handlers::list_materials).post(handlers::create_material))
        .route("/create", post(handlers::create_material))
        .route(
            "/:material_id",
            get(handlers::get_material)
                .put(handlers::replace_material)
                .patch(handlers::patch_material)
                .delete(handlers::delete_material),
        )
        .route(
            "/:material_id/update",
            put(handlers::replace_material).patch(handlers::patch_material),
        )
        .route("/:material_id/delete", delete(handlers::delete_material))
        .layer(DefaultBodyLimit::max(body_limit))
}
