use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::roles::Role;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record stored in the `users` table. The `role` column is
/// the source of truth for privileges; `is_staff` and `is_superuser` are derived
/// from it on every role write and persisted alongside it so administrative
/// tooling can read them directly.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    // Unique login handle.
    pub username: String,
    pub email: String,
    // Stored as lowercase text; unknown labels decode to the lowest tier.
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PostStatus
///
/// Lifecycle label on a post, controlling visibility and moderation state.
/// Drafts and pending posts are only visible on moderation surfaces; published
/// posts appear on the public listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostStatus {
    #[default]
    Draft,
    Pending,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Published => "published",
        }
    }

    /// Decodes a stored status label. An unknown label is treated as an
    /// unmoderated draft and logged as a data inconsistency.
    pub fn parse_lossy(value: &str) -> PostStatus {
        match value {
            "draft" => PostStatus::Draft,
            "pending" => PostStatus::Pending,
            "published" => PostStatus::Published,
            other => {
                tracing::warn!(status = %other, "unknown post status in storage, treating as draft");
                PostStatus::Draft
            }
        }
    }
}

impl TryFrom<String> for PostStatus {
    type Error = std::convert::Infallible;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(PostStatus::parse_lossy(&value))
    }
}

/// Post
///
/// A blog post record from the `posts` table. Exactly one of `author_id` and
/// `ip_address` is set: authenticated submissions carry the author, anonymous
/// submissions carry the resolved origin address used by the submission quota.
/// `created_at` is server-assigned and never changes after the insert.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    // Object-store key of the optional header image.
    pub image: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: PostStatus,
    pub author_id: Option<Uuid>,
    pub ip_address: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PostOrigin
///
/// Where a new post comes from. The sum type makes the author/address exclusivity
/// structural: a submission is either owned by an authenticated user or tracked
/// by its origin address, never both.
#[derive(Debug, Clone)]
pub enum PostOrigin {
    Author(Uuid),
    Anonymous(String),
}

// --- Request Payloads (Input Schemas) ---

/// CreatePostRequest
///
/// Input payload for submitting a new post (POST /posts). The image key is the
/// result of the presigned upload flow. Status defaults to `draft` when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub status: Option<PostStatus>,
}

/// UpdatePostRequest
///
/// Partial update payload for editing an existing post (PUT /admin/posts/{id}).
/// Only provided fields are written; `created_at` is never touched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
}

/// PostSort
///
/// Creation-time ordering for listings. Newest first is the default everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
}

/// PostFilter
///
/// Accepted query parameters for the moderation listing (GET /admin/posts).
/// `search` is a case-insensitive containment match on the title; `status` is an
/// exact match; out-of-range pages clamp to the nearest valid page.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct PostFilter {
    pub search: Option<String>,
    pub status: Option<PostStatus>,
    pub sort: Option<PostSort>,
    pub page: Option<i64>,
}

/// PostPage
///
/// One page of a post listing, with enough envelope data for the pager controls.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub page: i64,
    pub total_pages: i64,
    pub total: i64,
}

/// BulkAction
///
/// The administrative operations applicable to a caller-supplied set of post ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BulkAction {
    Delete,
    Publish,
    Pending,
    Draft,
}

/// BulkPostActionRequest
///
/// Input payload for POST /admin/posts/bulk. An empty id set is rejected with a
/// validation error rather than succeeding silently.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BulkPostActionRequest {
    pub action: BulkAction,
    pub ids: Vec<Uuid>,
}

/// BulkActionOutcome
///
/// Result envelope for a bulk action: how many rows were actually touched
/// (concurrently deleted ids are skipped, not errors) and a user-facing message.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BulkActionOutcome {
    pub affected: u64,
    pub message: String,
}

// --- Dashboard & Analytics Schemas (Output) ---

/// PostStatusCounts
///
/// Output schema for the moderation dashboard (GET /admin/dashboard).
/// Computed as fresh aggregate queries on every request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostStatusCounts {
    pub posts_count: i64,
    pub published: i64,
    pub drafts: i64,
    pub pending: i64,
}

/// RoleCounts
///
/// Account totals per role tier, for the analytics view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RoleCounts {
    pub total_users: i64,
    pub admins: i64,
    pub editors: i64,
    pub viewers: i64,
}

/// AnalyticsReport
///
/// Output schema for the admin analytics endpoint, combining post and account
/// aggregates in a single response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AnalyticsReport {
    pub posts: PostStatusCounts,
    pub users: RoleCounts,
}

// --- Account Schemas ---

/// RegisterRequest
///
/// Input payload for public signup (POST /register). The password is passed
/// through to the external identity provider and never persisted or logged here.
/// New signups always start as viewers.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// NewUser
///
/// Repository input for inserting a local account record. The privilege flags are
/// derived from `role` inside the repository, in the same insert statement.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// CreateUserRequest
///
/// Input payload for admin account creation (POST /admin/users), with an
/// explicitly chosen role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// EditUserRequest
///
/// Input payload for admin account editing (PUT /admin/users/{id}). A role change
/// here resynchronizes the derived flags exactly like the dedicated role route.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EditUserRequest {
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// ChangeRoleRequest
///
/// Input payload for the role management route (PUT /admin/users/{id}/role).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// UpdateProfileRequest
///
/// Self-service profile update (PUT /me/profile). A present password is delegated
/// to the identity provider; this service never hashes or stores credentials.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// UserOrder
///
/// Sort key for the account listing. `joined` orders by account creation time,
/// matching the default ordering of the management table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum UserOrder {
    Username,
    Email,
    #[default]
    Joined,
}

/// SortDirection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// UserFilter
///
/// Accepted query parameters for the account listing (GET /admin/users). The
/// page size is caller-supplied but clamped to a sane range; `q` searches
/// username and email.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct UserFilter {
    pub q: Option<String>,
    pub order: Option<UserOrder>,
    pub direction: Option<SortDirection>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// UserPage
///
/// One page of the account listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserPage {
    pub users: Vec<User>,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total: i64,
}

// --- Preferences ---

/// Preferences
///
/// Per-user preference record. Stored in its own table with one row per user;
/// a missing row reads as the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Preferences {
    pub notifications: bool,
    pub auto_backup: bool,
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            auto_backup: false,
            dark_mode: false,
        }
    }
}

// --- Contact Workflow ---

/// ContactRequest
///
/// Input payload for the contact form (POST /contact). Dispatched to the mail
/// collaborator fire-and-forget; the caller gets an immediate acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

// --- Upload Pipeline ---

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for a post image
/// (POST /upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "header.jpg")]
    pub filename: String,
    /// The MIME type, constrained to image types by the storage layer.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
///
/// Output schema containing the temporary URL for the direct-to-storage upload
/// and the object key to reference from the post record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    pub upload_url: String,
    pub resource_key: String,
}

// --- Misc Output ---

/// MessageResponse
///
/// Small acknowledgement envelope for operations whose only output is a
/// user-facing message (deletions, contact submission, preference saves).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// PlannerResponse
///
/// Data backing the viewer week-planner page: the seven day labels the client
/// lays the planning grid over.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PlannerResponse {
    pub days: Vec<String>,
}
