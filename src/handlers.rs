use crate::{
    AppState,
    auth::{AuthUser, ClientAddr, MaybeUser},
    error::{ApiError, ApiResult, FieldError},
    guard::{self, Admission},
    models::{
        AnalyticsReport, BulkAction, BulkActionOutcome, BulkPostActionRequest, ChangeRoleRequest,
        ContactRequest, CreatePostRequest, CreateUserRequest, EditUserRequest, MessageResponse,
        NewUser, Post, PostFilter, PostOrigin, PostPage, PostSort, PostStatus, PostStatusCounts,
        Preferences, PresignedUrlRequest, PresignedUrlResponse, RegisterRequest,
        UpdatePostRequest, UpdateProfileRequest, User, UserFilter, UserPage, PlannerResponse,
    },
    roles::{Capability, Role},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// PublicFeedQuery
///
/// Accepted query parameters for the public post feed (GET /posts).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct PublicFeedQuery {
    /// Creation-time ordering; newest first when omitted.
    pub sort: Option<PostSort>,
}

// --- Validation Helpers ---

/// Collects field-level errors for blank required fields and returns them as a
/// single validation failure.
fn require_fields(pairs: &[(&str, &str)]) -> ApiResult<()> {
    let errors: Vec<FieldError> = pairs
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| FieldError::new(field, "This field is required."))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Minimal shape check on an email address; full verification belongs to the
/// identity provider.
fn require_email(field: &str, value: &str) -> ApiResult<()> {
    if value.contains('@') && !value.trim().is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(vec![FieldError::new(
            field,
            "Enter a valid email address.",
        )]))
    }
}

// --- Public Handlers ---

/// register
///
/// [Public Route] Signup for new accounts. New signups always start as viewers;
/// only an admin can assign a higher tier afterwards.
///
/// *Flow*: Duplicate-username check, then identity creation at the external
/// provider, then the local account record under the provider's canonical UUID.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = User),
        (status = 409, description = "Username taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<User>> {
    require_fields(&[
        ("username", &payload.username),
        ("password", &payload.password),
    ])?;
    require_email("email", &payload.email)?;

    if state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .is_some()
    {
        return Err(ApiError::DuplicateUsername(format!(
            "Username '{}' already exists.",
            payload.username
        )));
    }

    // Step 1: create the credential-holding identity at the provider.
    let identity_id = state
        .identity
        .signup(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(ApiError::Internal)?;

    // Step 2: mirror the account locally under the provider's id.
    let created = state
        .repo
        .create_user(NewUser {
            id: identity_id,
            username: payload.username.clone(),
            email: payload.email,
            role: Role::Viewer,
        })
        .await
        // A lost race on the unique constraint lands here.
        .ok_or_else(|| {
            ApiError::DuplicateUsername(format!(
                "Username '{}' already exists.",
                payload.username
            ))
        })?;

    Ok(Json(created))
}

/// get_public_posts
///
/// [Public Route] The reader-facing feed. Only published posts are returned;
/// drafts and pending posts are invisible outside the moderation surfaces.
#[utoipa::path(
    get,
    path = "/posts",
    params(PublicFeedQuery),
    responses((status = 200, description = "Published posts", body = [Post]))
)]
pub async fn get_public_posts(
    State(state): State<AppState>,
    Query(query): Query<PublicFeedQuery>,
) -> Json<Vec<Post>> {
    let posts = state
        .repo
        .list_published_posts(query.sort.unwrap_or_default())
        .await;
    Json(posts)
}

/// get_post_details
///
/// [Public Route] Single published post by id. Unpublished posts answer with a
/// generic not-found, indistinguishable from an absent id.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Post>> {
    match state.repo.get_published_post(id).await {
        Some(post) => Ok(Json(post)),
        None => Err(ApiError::NotFound("Post not found.".to_string())),
    }
}

/// submit_post
///
/// [Public Route, optional auth] Post submission for authenticated and anonymous
/// callers alike. An authenticated submission is stored under its author; an
/// anonymous one carries the resolved origin address and passes through the
/// submission guard first.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Created", body = Post),
        (status = 303, description = "Anonymous limit reached, redirected to login")
    )
)]
pub async fn submit_post(
    MaybeUser(user): MaybeUser,
    ClientAddr(address): ClientAddr,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<Json<Post>> {
    require_fields(&[("title", &payload.title), ("content", &payload.content)])?;

    let admission = guard::check_and_admit(
        &state.repo,
        &address,
        user.is_some(),
        state.config.anon_post_limit,
    )
    .await;
    if let Admission::Denied { .. } = admission {
        return Err(ApiError::QuotaExceeded);
    }

    let origin = match &user {
        Some(u) => PostOrigin::Author(u.id),
        None => PostOrigin::Anonymous(address),
    };

    let post = state
        .repo
        .create_post(payload, origin)
        .await
        .ok_or_else(|| ApiError::Internal("post insert failed".to_string()))?;

    Ok(Json(post))
}

/// contact
///
/// [Public Route] Contact-form submission. The message is handed to the mail
/// collaborator fire-and-forget; the caller gets an immediate acknowledgement
/// regardless of eventual delivery.
#[utoipa::path(
    post,
    path = "/contact",
    request_body = ContactRequest,
    responses((status = 200, description = "Accepted", body = MessageResponse))
)]
pub async fn contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> ApiResult<Json<MessageResponse>> {
    require_fields(&[
        ("name", &payload.name),
        ("subject", &payload.subject),
        ("message", &payload.message),
    ])?;
    require_email("email", &payload.email)?;

    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_contact_message(&payload).await {
            tracing::warn!("contact message dispatch failed: {}", e);
        }
    });

    Ok(Json(MessageResponse::new(
        "Your message has been sent successfully!",
    )))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's own account record.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<User>> {
    state
        .repo
        .get_user(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Account not found.".to_string()))
}

/// update_profile
///
/// [Authenticated Route] Self-service profile update. The role is never touched
/// here; a present password is delegated to the identity provider.
#[utoipa::path(
    put,
    path = "/me/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 409, description = "Username taken")
    )
)]
pub async fn update_profile(
    AuthUser { id, role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    require_fields(&[("username", &payload.username)])?;
    require_email("email", &payload.email)?;

    // The username must stay unique across other accounts.
    if let Some(existing) = state.repo.get_user_by_username(&payload.username).await {
        if existing.id != id {
            return Err(ApiError::DuplicateUsername(format!(
                "Username '{}' already exists.",
                payload.username
            )));
        }
    }

    if let Some(password) = payload.password.as_deref() {
        state
            .identity
            .set_password(id, password)
            .await
            .map_err(ApiError::Internal)?;
    }

    let updated = state
        .repo
        .update_user(id, &payload.username, &payload.email, role)
        .await
        .ok_or_else(|| ApiError::NotFound("Account not found.".to_string()))?;

    Ok(Json(updated))
}

/// get_my_preferences
///
/// [Authenticated Route] The caller's preference record, defaults when unset.
#[utoipa::path(
    get,
    path = "/me/preferences",
    responses((status = 200, description = "Preferences", body = Preferences))
)]
pub async fn get_my_preferences(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Preferences> {
    Json(state.repo.get_preferences(id).await)
}

/// update_my_preferences
///
/// [Authenticated Route] Saves the caller's preference toggles.
#[utoipa::path(
    put,
    path = "/me/preferences",
    request_body = Preferences,
    responses((status = 200, description = "Saved", body = Preferences))
)]
pub async fn update_my_preferences(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<Preferences>,
) -> Json<Preferences> {
    Json(state.repo.set_preferences(id, payload).await)
}

/// delete_own_account
///
/// [Authenticated Route] Self-service account deletion from the settings page.
/// Distinct from the administrative path: it applies to the caller only and has
/// no superuser restriction.
#[utoipa::path(
    delete,
    path = "/me",
    responses((status = 200, description = "Deleted", body = MessageResponse))
)]
pub async fn delete_own_account(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<MessageResponse>> {
    if let Err(e) = state.identity.delete_identity(id).await {
        // The local record still goes; the orphaned identity is logged for cleanup.
        tracing::warn!(user_id = %id, "identity deletion failed: {}", e);
    }

    if state.repo.delete_user(id).await {
        Ok(Json(MessageResponse::new("Your account has been deleted.")))
    } else {
        Err(ApiError::NotFound("Account not found.".to_string()))
    }
}

/// week_planner
///
/// [Authenticated Route] The weekly study planner page data. This surface is
/// exclusive to the viewer tier; any other caller receives an explicit denial
/// rather than a redirect.
#[utoipa::path(
    get,
    path = "/planner",
    responses(
        (status = 200, description = "Planner", body = PlannerResponse),
        (status = 403, description = "Viewers only")
    )
)]
pub async fn week_planner(AuthUser { role, .. }: AuthUser) -> ApiResult<Json<PlannerResponse>> {
    if role != Role::Viewer {
        return Err(ApiError::AccessDenied(
            "You do not have permission to view this page.".to_string(),
        ));
    }
    Ok(Json(PlannerResponse {
        days: ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"]
            .iter()
            .map(|d| d.to_string())
            .collect(),
    }))
}

/// get_presigned_url
///
/// [Authenticated Route] Generates a temporary, secure URL for uploading a post
/// image directly to the object store. The URL is short-lived, constrained to
/// the declared image type, and keyed under a unique object name.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses((status = 200, description = "URL", body = PresignedUrlResponse))
)]
pub async fn get_presigned_url(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> impl IntoResponse {
    // Unique, structured object key: 'post_images/UUID.ext'.
    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let object_key = format!("post_images/{}.{}", Uuid::new_v4(), extension);

    match state
        .storage
        .presigned_image_upload_url(&object_key, &payload.file_type)
        .await
    {
        Ok(url) => {
            let response = PresignedUrlResponse {
                upload_url: url,
                resource_key: object_key,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::warn!("presigned upload rejected: {}", e);
            (StatusCode::BAD_REQUEST, "Unsupported upload").into_response()
        }
    }
}

// --- Moderation Handlers ---

/// get_manage_posts
///
/// [Moderation Route] The full post listing for editors and admins, with title
/// search, status filter, sort order and clamped pagination.
#[utoipa::path(
    get,
    path = "/admin/posts",
    params(PostFilter),
    responses((status = 200, description = "Posts page", body = PostPage))
)]
pub async fn get_manage_posts(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> ApiResult<Json<PostPage>> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    Ok(Json(state.repo.list_posts(filter).await))
}

/// bulk_post_action
///
/// [Moderation Route] Applies one action to a caller-supplied set of post ids.
/// An empty selection is rejected rather than silently succeeding; ids deleted
/// concurrently by another actor are skipped.
#[utoipa::path(
    post,
    path = "/admin/posts/bulk",
    request_body = BulkPostActionRequest,
    responses(
        (status = 200, description = "Applied", body = BulkActionOutcome),
        (status = 422, description = "Nothing selected")
    )
)]
pub async fn bulk_post_action(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<BulkPostActionRequest>,
) -> ApiResult<Json<BulkActionOutcome>> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    if payload.ids.is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "ids",
            "No posts selected.",
        )]));
    }

    let (affected, message) = match payload.action {
        BulkAction::Delete => (
            state.repo.delete_posts(&payload.ids).await,
            "Selected posts deleted.",
        ),
        BulkAction::Publish => (
            state
                .repo
                .set_posts_status(&payload.ids, PostStatus::Published)
                .await,
            "Posts published.",
        ),
        BulkAction::Pending => (
            state
                .repo
                .set_posts_status(&payload.ids, PostStatus::Pending)
                .await,
            "Posts marked pending.",
        ),
        BulkAction::Draft => (
            state
                .repo
                .set_posts_status(&payload.ids, PostStatus::Draft)
                .await,
            "Posts marked draft.",
        ),
    };

    Ok(Json(BulkActionOutcome {
        affected,
        message: message.to_string(),
    }))
}

/// get_manage_post
///
/// [Moderation Route] Single post by id regardless of status, for the edit form.
#[utoipa::path(
    get,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses((status = 200, description = "Found", body = Post))
)]
pub async fn get_manage_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Post>> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    state
        .repo
        .get_post(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Post not found.".to_string()))
}

/// edit_post
///
/// [Moderation Route] Partial edit of any post. The creation timestamp is
/// immutable; the modification timestamp is restamped by the repository.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}",
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 404, description = "Not Found")
    )
)]
pub async fn edit_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    state
        .repo
        .update_post(id, payload)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Post not found.".to_string()))
}

/// delete_post
///
/// [Moderation Route] Single-post deletion.
#[utoipa::path(
    delete,
    path = "/admin/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    if state.repo.delete_post(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Post not found.".to_string()))
    }
}

/// update_post_status
///
/// [Moderation Route] Single-post status transition. Any status is reachable
/// from any other; the write has no side effects beyond the status itself.
#[utoipa::path(
    put,
    path = "/admin/posts/{id}/status",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = PostStatus,
    responses((status = 200, description = "Updated", body = Post))
)]
pub async fn update_post_status(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(status): Json<PostStatus>,
) -> ApiResult<Json<Post>> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    state
        .repo
        .set_post_status(id, status)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Post not found.".to_string()))
}

/// get_dashboard
///
/// [Moderation Route] Post counts by status for the dashboard tiles. Always a
/// fresh aggregate read, never cached.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses((status = 200, description = "Counts", body = PostStatusCounts))
)]
pub async fn get_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<PostStatusCounts>> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    Ok(Json(state.repo.count_posts_by_status().await))
}

/// get_pending_posts
///
/// [Moderation Route] The review queue: pending posts, newest first.
#[utoipa::path(
    get,
    path = "/admin/posts/pending",
    responses((status = 200, description = "Pending posts", body = [Post]))
)]
pub async fn get_pending_posts(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Post>>> {
    if !Capability::of(Some(&user)).can_moderate() {
        return Err(ApiError::PermissionDenied);
    }
    Ok(Json(state.repo.list_pending_posts().await))
}

// --- Account Administration Handlers ---

/// get_admin_users
///
/// [Admin Route] The account management listing with search, ordering and a
/// caller-supplied (clamped) page size.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserFilter),
    responses((status = 200, description = "Users page", body = UserPage))
)]
pub async fn get_admin_users(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<UserPage>> {
    if !Capability::of(Some(&user)).can_administer_users() {
        return Err(ApiError::PermissionDenied);
    }
    Ok(Json(state.repo.list_users(filter).await))
}

/// create_user
///
/// [Admin Route] Account creation with an explicitly chosen role. The privilege
/// flags are derived from the role inside the repository insert, so the new
/// record is consistent from its first moment.
#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Created", body = User),
        (status = 409, description = "Username taken")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<Json<User>> {
    if !Capability::of(Some(&user)).can_administer_users() {
        return Err(ApiError::PermissionDenied);
    }
    require_fields(&[
        ("username", &payload.username),
        ("password", &payload.password),
    ])?;
    require_email("email", &payload.email)?;

    if state
        .repo
        .get_user_by_username(&payload.username)
        .await
        .is_some()
    {
        return Err(ApiError::DuplicateUsername(format!(
            "Username '{}' already exists.",
            payload.username
        )));
    }

    let identity_id = state
        .identity
        .signup(&payload.username, &payload.email, &payload.password)
        .await
        .map_err(ApiError::Internal)?;

    let created = state
        .repo
        .create_user(NewUser {
            id: identity_id,
            username: payload.username.clone(),
            email: payload.email,
            role: payload.role,
        })
        .await
        .ok_or_else(|| {
            ApiError::DuplicateUsername(format!(
                "Username '{}' already exists.",
                payload.username
            ))
        })?;

    Ok(Json(created))
}

/// get_user_details
///
/// [Admin Route] A single account record for the detail view.
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Found", body = User))
)]
pub async fn get_user_details(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    if !Capability::of(Some(&user)).can_administer_users() {
        return Err(ApiError::PermissionDenied);
    }
    state
        .repo
        .get_user(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))
}

/// edit_user
///
/// [Admin Route] Edits username, email and role together. A role change here
/// resynchronizes the derived flags exactly like the dedicated role route.
#[utoipa::path(
    put,
    path = "/admin/users/{id}",
    request_body = EditUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 404, description = "Not Found")
    )
)]
pub async fn edit_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditUserRequest>,
) -> ApiResult<Json<User>> {
    if !Capability::of(Some(&user)).can_administer_users() {
        return Err(ApiError::PermissionDenied);
    }
    require_fields(&[("username", &payload.username)])?;
    require_email("email", &payload.email)?;

    if state.repo.get_user(id).await.is_none() {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }
    if let Some(existing) = state.repo.get_user_by_username(&payload.username).await {
        if existing.id != id {
            return Err(ApiError::DuplicateUsername(format!(
                "Username '{}' already exists.",
                payload.username
            )));
        }
    }

    let updated = state
        .repo
        .update_user(id, &payload.username, &payload.email, payload.role)
        .await
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    Ok(Json(updated))
}

/// delete_user
///
/// [Admin Route] Account deletion with the two boundary protections: an admin
/// can neither delete their own account through this path nor remove a
/// superuser account. Self-deletion goes through the settings flow instead.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Protected account")
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if !Capability::of(Some(&user)).can_administer_users() {
        return Err(ApiError::PermissionDenied);
    }

    let target = state
        .repo
        .get_user(id)
        .await
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if target.id == user.id {
        return Err(ApiError::AccessDenied(
            "You cannot delete your own account.".to_string(),
        ));
    }
    if target.is_superuser {
        return Err(ApiError::AccessDenied(
            "You cannot delete a superuser.".to_string(),
        ));
    }

    if let Err(e) = state.identity.delete_identity(target.id).await {
        tracing::warn!(user_id = %target.id, "identity deletion failed: {}", e);
    }

    if state.repo.delete_user(target.id).await {
        Ok(Json(MessageResponse::new("User deleted.")))
    } else {
        Err(ApiError::NotFound("User not found.".to_string()))
    }
}

/// change_role
///
/// [Admin Route, sensitive tier] Role reassignment. Unlike the other
/// administrative routes this one answers a failed role check with an explicit
/// denial instead of a redirect. The repository writes the role and both
/// derived flags in a single statement.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 403, description = "Admins only")
    )
)]
pub async fn change_role(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<Json<User>> {
    if !Capability::of(Some(&user)).can_administer_users() {
        return Err(ApiError::AccessDenied(
            "Access Denied: Admins only.".to_string(),
        ));
    }
    state
        .repo
        .set_role(id, payload.role)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))
}

/// get_analytics
///
/// [Admin Route] Post totals by status and account totals by role, combined
/// into one report. Both halves are fresh aggregate reads.
#[utoipa::path(
    get,
    path = "/admin/analytics",
    responses((status = 200, description = "Report", body = AnalyticsReport))
)]
pub async fn get_analytics(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<AnalyticsReport>> {
    if !Capability::of(Some(&user)).can_administer_users() {
        return Err(ApiError::PermissionDenied);
    }
    let posts = state.repo.count_posts_by_status().await;
    let users = state.repo.count_users_by_role().await;
    Ok(Json(AnalyticsReport { posts, users }))
}
