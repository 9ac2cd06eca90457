use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod identity;
pub mod mailer;
pub mod models;
pub mod repository;
pub mod roles;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point (main.rs).
pub use config::AppConfig;
pub use identity::{HttpIdentityClient, IdentityState, MockIdentity};
pub use mailer::{HttpMailClient, MailerState, MockMailer};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the application.
/// It aggregates all API paths and data schemas decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    // List all public handler functions here for documentation generation.
    paths(
        handlers::register, handlers::get_public_posts, handlers::get_post_details,
        handlers::submit_post, handlers::contact, handlers::get_me,
        handlers::update_profile, handlers::get_my_preferences,
        handlers::update_my_preferences, handlers::delete_own_account,
        handlers::week_planner, handlers::get_presigned_url,
        handlers::get_manage_posts, handlers::bulk_post_action,
        handlers::get_manage_post, handlers::edit_post, handlers::delete_post,
        handlers::update_post_status, handlers::get_dashboard,
        handlers::get_pending_posts, handlers::get_admin_users,
        handlers::create_user, handlers::get_user_details, handlers::edit_user,
        handlers::delete_user, handlers::change_role, handlers::get_analytics
    ),
    // List all models (schemas) used in the request/response bodies.
    components(
        schemas(
            models::User, models::Post, models::PostStatus, models::PostSort,
            models::CreatePostRequest, models::UpdatePostRequest, models::PostPage,
            models::BulkAction, models::BulkPostActionRequest, models::BulkActionOutcome,
            models::PostStatusCounts, models::RoleCounts, models::AnalyticsReport,
            models::RegisterRequest, models::CreateUserRequest, models::EditUserRequest,
            models::ChangeRoleRequest, models::UpdateProfileRequest, models::UserOrder,
            models::SortDirection, models::UserPage, models::Preferences,
            models::ContactRequest, models::PresignedUrlRequest,
            models::PresignedUrlResponse, models::MessageResponse,
            models::PlannerResponse, roles::Role,
        )
    ),
    tags(
        (name = "blog-portal", description = "Blog Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all essential
/// application services and configuration, shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Identity Layer: the external credential-holding provider.
    pub identity: IdentityState,
    /// Mail Layer: the outbound mail collaborator for the contact workflow.
    pub mailer: MailerState,
    /// Storage Layer: object store access for post image uploads.
    pub storage: StorageState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations let handlers and extractors pull individual components
// from the shared AppState, keeping the layer boundaries explicit.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the protected route groups.
///
/// *Mechanism*: It attempts to extract `AuthUser` from the request. Since
/// `AuthUser` implements `FromRequestParts`, a failed resolution (bad token,
/// deleted account) rejects the request with 401 Unauthorized before the
/// handler runs. On success the request proceeds and the handler re-extracts
/// the resolved identity.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no middleware applied. Post submission resolves the
        // caller itself (authenticated or anonymous) via MaybeUser.
        .merge(public::public_routes())
        // Authenticated Routes: protected by the `auth_middleware`.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Staff Routes: nested under '/admin', behind the same authentication
        // layer. The capability check (moderation vs. account administration)
        // happens inside the handlers after authentication.
        .nest(
            "/admin",
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID for every request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in a
                // span carrying the generated request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer (applied last).
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes the tracing span created by `TraceLayer`: includes the
/// `x-request-id` header (if present) alongside the HTTP method and URI, so
/// every log line of a single request correlates on one id.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
