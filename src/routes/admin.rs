use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Admin Router Module
///
/// Defines the staff dashboard routes, nested under '/admin'. Moderation
/// endpoints admit editors and admins; account administration admits admins
/// only.
///
/// Access Control:
/// The router is wrapped in the authentication layer, so every request carries
/// a resolved identity. The capability check (`can_moderate` /
/// `can_administer_users`) is then performed inside each handler; a failed
/// check recovers with a redirect to home, except the role management route
/// which surfaces an explicit denial.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Moderation (editor/admin) ---
        // GET /admin/dashboard
        // Post counts by status for the dashboard tiles. Fresh reads, no cache.
        .route("/dashboard", get(handlers::get_dashboard))
        // GET /admin/posts?search=&status=&sort=&page=
        // The full moderation listing with filters and clamped pagination.
        // POST /admin/posts/bulk
        // One action (delete / publish / pending / draft) applied to an explicit
        // id selection. Empty selections are rejected.
        .route("/posts", get(handlers::get_manage_posts))
        .route("/posts/bulk", post(handlers::bulk_post_action))
        // GET /admin/posts/pending
        // The pending review queue, newest first.
        .route("/posts/pending", get(handlers::get_pending_posts))
        // GET/PUT/DELETE /admin/posts/{id}
        // Single-post moderation: edit form data, partial edit, deletion.
        .route(
            "/posts/{id}",
            get(handlers::get_manage_post)
                .put(handlers::edit_post)
                .delete(handlers::delete_post),
        )
        // PUT /admin/posts/{id}/status
        // Single-post status transition; any status reachable from any other.
        .route("/posts/{id}/status", put(handlers::update_post_status))
        // --- Account administration (admin only) ---
        // GET /admin/users?q=&order=&direction=&page=&page_size=
        // The account management listing.
        // POST /admin/users
        // Account creation with an explicitly chosen role.
        .route(
            "/users",
            get(handlers::get_admin_users).post(handlers::create_user),
        )
        // GET/PUT/DELETE /admin/users/{id}
        // Detail view, edit, and deletion with the self/superuser protections.
        .route(
            "/users/{id}",
            get(handlers::get_user_details)
                .put(handlers::edit_user)
                .delete(handlers::delete_user),
        )
        // PUT /admin/users/{id}/role
        // Role management. Failed role checks here surface an explicit denial
        // rather than the redirect used by the other routes.
        .route("/users/{id}/role", put(handlers::change_role))
        // GET /admin/analytics
        // Combined post and account aggregates.
        .route("/analytics", get(handlers::get_analytics))
}
