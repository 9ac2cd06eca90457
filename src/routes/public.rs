use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in): the published feed, signup, the contact form, and
/// post submission.
///
/// Security Mandate:
/// All post retrieval handlers in this module enforce `status = 'published'` at
/// the Repository level, so drafts and pending posts never leak to readers.
/// Post submission is deliberately open to anonymous callers; the submission
/// guard enforces the per-address quota before anything is inserted.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // New account signup. Creates the identity at the external provider, then
        // the local viewer-tier account record under the same id.
        .route("/register", post(handlers::register))
        // GET /posts?sort=...
        // The reader feed: published posts only, newest first by default.
        // POST /posts
        // Post submission for authenticated and anonymous callers. Anonymous
        // submissions pass through the quota guard and carry the origin address.
        .route(
            "/posts",
            get(handlers::get_public_posts).post(handlers::submit_post),
        )
        // GET /posts/{id}
        // Detail view of a single published post.
        .route("/posts/{id}", get(handlers::get_post_details))
        // POST /contact
        // Contact form. Dispatches to the mail collaborator fire-and-forget.
        .route("/contact", post(handlers::contact))
}
