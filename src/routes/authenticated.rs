use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any user who has passed the authentication
/// layer: the self-service account surface (profile, preferences, deletion),
/// the viewer planner, and the image upload pipeline.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above it, so each handler receives a
/// resolved identity with its role already decoded. Handlers that need a
/// specific tier (the planner) perform that check themselves.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The caller's own account record.
        // DELETE /me
        // Self-service account deletion from the settings page. This path has no
        // superuser restriction; the administrative deletion path is separate.
        .route(
            "/me",
            get(handlers::get_me).delete(handlers::delete_own_account),
        )
        // PUT /me/profile
        // Username/email update; an included password is delegated to the
        // identity provider, never handled locally.
        .route("/me/profile", put(handlers::update_profile))
        // GET/PUT /me/preferences
        // The persisted per-user preference record (defaults when never saved).
        .route(
            "/me/preferences",
            get(handlers::get_my_preferences).put(handlers::update_my_preferences),
        )
        // GET /planner
        // The weekly planner page data. Viewer-tier exclusive; other roles get
        // an explicit denial.
        .route("/planner", get(handlers::week_planner))
        // POST /upload/presigned
        // Initiates the image upload pipeline: a short-lived presigned URL lets
        // the client push the image directly to the object store.
        .route("/upload/presigned", post(handlers::get_presigned_url))
}
