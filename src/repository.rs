use crate::models::{
    NewUser, Post, PostFilter, PostOrigin, PostPage, PostSort, PostStatus, PostStatusCounts,
    Preferences, RoleCounts, SortDirection, UpdatePostRequest, User, UserFilter, UserOrder,
    UserPage,
};
use crate::roles::Role;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Fixed page size for post listings. Out-of-range page numbers clamp to the
/// nearest valid page instead of erroring.
pub const POSTS_PAGE_SIZE: i64 = 10;

/// Default and maximum page sizes for the account listing, where the caller may
/// request a size of their own.
pub const USERS_DEFAULT_PAGE_SIZE: i64 = 10;
pub const USERS_MAX_PAGE_SIZE: i64 = 100;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. Handlers interact
/// with the data layer through this trait only, which keeps them testable against
/// an in-memory mock and independent of the concrete store.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Post Retrieval ---
    // Public listing: published posts only, ordered by creation time.
    async fn list_published_posts(&self, sort: PostSort) -> Vec<Post>;
    // Public detail: resolves only when the post is published.
    async fn get_published_post(&self, id: Uuid) -> Option<Post>;
    // Moderation access: any post by id, regardless of status.
    async fn get_post(&self, id: Uuid) -> Option<Post>;
    // Moderation listing with title search, status filter, sort and clamped pagination.
    async fn list_posts(&self, filter: PostFilter) -> PostPage;
    // The pending review queue, newest first.
    async fn list_pending_posts(&self) -> Vec<Post>;

    // --- Post Mutation ---
    // Server stamps both timestamps; status defaults to draft unless the caller set one.
    async fn create_post(&self, req: crate::models::CreatePostRequest, origin: PostOrigin)
    -> Option<Post>;
    // Partial update. The creation timestamp is immutable; updated_at is restamped.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Option<Post>;
    async fn delete_post(&self, id: Uuid) -> bool;
    async fn set_post_status(&self, id: Uuid, status: PostStatus) -> Option<Post>;
    // Bulk operations over an explicit id set. Missing ids are silently skipped;
    // the returned count reflects the rows actually touched.
    async fn delete_posts(&self, ids: &[Uuid]) -> u64;
    async fn set_posts_status(&self, ids: &[Uuid], status: PostStatus) -> u64;

    // --- Aggregates ---
    // Fresh counts for the dashboard; no caching.
    async fn count_posts_by_status(&self) -> PostStatusCounts;
    // The submission quota read: existing anonymous posts from one address.
    async fn count_anonymous_posts(&self, address: &str) -> i64;
    async fn count_users_by_role(&self) -> RoleCounts;

    // --- Accounts ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    // Inserts the account with privilege flags derived from the role in the same
    // statement. Returns None on conflict or storage failure.
    async fn create_user(&self, user: NewUser) -> Option<User>;
    async fn list_users(&self, filter: UserFilter) -> UserPage;
    // Full edit: username, email and role. Flags are resynchronized with the role.
    async fn update_user(&self, id: Uuid, username: &str, email: &str, role: Role)
    -> Option<User>;
    // Role reassignment. The role and both derived flags land in one UPDATE so a
    // partially applied write (role changed, flags stale) cannot be observed.
    async fn set_role(&self, id: Uuid, role: Role) -> Option<User>;
    async fn delete_user(&self, id: Uuid) -> bool;

    // --- Preferences ---
    // A missing row reads as the defaults.
    async fn get_preferences(&self, user_id: Uuid) -> Preferences;
    async fn set_preferences(&self, user_id: Uuid, prefs: Preferences) -> Preferences;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Columns selected for every post-returning query.
const POST_COLUMNS: &str =
    "id, title, content, image, status, author_id, ip_address, created_at, updated_at";

// Columns selected for every user-returning query.
const USER_COLUMNS: &str =
    "id, username, email, role, is_staff, is_superuser, created_at, updated_at";

/// Clamps a requested page into the valid range for the given total, mirroring
/// the classic paginator behavior: page 999 of a 5-page set yields page 5, page 0
/// or a negative page yields page 1. Returns `(page, total_pages)`.
fn clamp_page(total: i64, page_size: i64, requested: i64) -> (i64, i64) {
    let total_pages = ((total + page_size - 1) / page_size).max(1);
    let page = requested.clamp(1, total_pages);
    (page, total_pages)
}

fn user_order_column(order: UserOrder) -> &'static str {
    match order {
        UserOrder::Username => "username",
        UserOrder::Email => "email",
        UserOrder::Joined => "created_at",
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_published_posts
    ///
    /// The public feed. Strictly enforces `status = 'published'` in the query so
    /// drafts and pending posts never leak to anonymous readers.
    async fn list_published_posts(&self, sort: PostSort) -> Vec<Post> {
        let order = match sort {
            PostSort::Newest => "DESC",
            PostSort::Oldest => "ASC",
        };
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE status = 'published' ORDER BY created_at {order}"
        );
        match sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("list_published_posts error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_published_post
    ///
    /// Retrieves a post only when it is published. Used by the public detail handler.
    async fn get_published_post(&self, id: Uuid) -> Option<Post> {
        let sql =
            format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1 AND status = 'published'");
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_published_post error: {:?}", e);
                None
            })
    }

    /// get_post
    ///
    /// Retrieval of any post by id, no status restriction. For moderation surfaces
    /// where the caller's capability has already been verified.
    async fn get_post(&self, id: Uuid) -> Option<Post> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_post error: {:?}", e);
                None
            })
    }

    /// list_posts
    ///
    /// Implements the moderation listing using QueryBuilder for safe
    /// parameterization of the dynamic filters. The total is counted with the
    /// same predicates first, the requested page is clamped against it, and only
    /// then is the page fetched.
    async fn list_posts(&self, filter: PostFilter) -> PostPage {
        let search_pattern = filter
            .search
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        // Count with the same predicates as the page query.
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts WHERE 1=1");
        if let Some(ref pattern) = search_pattern {
            count_builder.push(" AND title ILIKE ");
            count_builder.push_bind(pattern.clone());
        }
        if let Some(status) = filter.status {
            count_builder.push(" AND status = ");
            count_builder.push_bind(status.as_str());
        }
        let total: i64 = match count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("list_posts count error: {:?}", e);
                0
            }
        };

        let (page, total_pages) = clamp_page(total, POSTS_PAGE_SIZE, filter.page.unwrap_or(1));

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE 1=1"
        ));
        if let Some(ref pattern) = search_pattern {
            builder.push(" AND title ILIKE ");
            builder.push_bind(pattern.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        match filter.sort.unwrap_or_default() {
            PostSort::Newest => builder.push(" ORDER BY created_at DESC"),
            PostSort::Oldest => builder.push(" ORDER BY created_at ASC"),
        };
        builder.push(" LIMIT ");
        builder.push_bind(POSTS_PAGE_SIZE);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1) * POSTS_PAGE_SIZE);

        let posts = match builder.build_query_as::<Post>().fetch_all(&self.pool).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("list_posts error: {:?}", e);
                vec![]
            }
        };

        PostPage {
            posts,
            page,
            total_pages,
            total,
        }
    }

    /// list_pending_posts
    ///
    /// The moderation review queue, newest first.
    async fn list_pending_posts(&self) -> Vec<Post> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE status = 'pending' ORDER BY created_at DESC"
        );
        match sqlx::query_as::<_, Post>(&sql).fetch_all(&self.pool).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("list_pending_posts error: {:?}", e);
                vec![]
            }
        }
    }

    /// create_post
    ///
    /// Inserts a new post. Both timestamps are server-assigned here; the status
    /// falls back to draft when the submission did not choose one. The origin
    /// decides which of `author_id` / `ip_address` is set, never both.
    async fn create_post(
        &self,
        req: crate::models::CreatePostRequest,
        origin: PostOrigin,
    ) -> Option<Post> {
        let (author_id, ip_address) = match origin {
            PostOrigin::Author(id) => (Some(id), None),
            PostOrigin::Anonymous(addr) => (None, Some(addr)),
        };
        let status = req.status.unwrap_or_default();
        let sql = format!(
            "INSERT INTO posts (id, title, content, image, status, author_id, ip_address, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.title)
            .bind(req.content)
            .bind(req.image)
            .bind(status.as_str())
            .bind(author_id)
            .bind(ip_address)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_post error: {:?}", e);
                None
            })
    }

    /// update_post
    ///
    /// Partial update using COALESCE so only provided fields are written.
    /// `created_at` is deliberately absent from the SET list.
    async fn update_post(&self, id: Uuid, req: UpdatePostRequest) -> Option<Post> {
        let sql = format!(
            "UPDATE posts \
             SET title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 image = COALESCE($4, image), \
                 status = COALESCE($5, status), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.content)
            .bind(req.image)
            .bind(req.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_post error: {:?}", e);
                None
            })
    }

    /// delete_post
    ///
    /// Single-record delete. Returns whether a row was removed.
    async fn delete_post(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_post error: {:?}", e);
                false
            }
        }
    }

    /// set_post_status
    ///
    /// Single-record status transition. Any status is reachable from any other;
    /// there are no side effects beyond the status write.
    async fn set_post_status(&self, id: Uuid, status: PostStatus) -> Option<Post> {
        let sql = format!(
            "UPDATE posts SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("set_post_status error: {:?}", e);
                None
            })
    }

    /// delete_posts
    ///
    /// Bulk delete over an explicit id set. Ids that no longer exist are skipped;
    /// the rows-affected count is reported back to the caller.
    async fn delete_posts(&self, ids: &[Uuid]) -> u64 {
        if ids.is_empty() {
            return 0;
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("DELETE FROM posts WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        builder.push(")");
        match builder.build().execute(&self.pool).await {
            Ok(res) => res.rows_affected(),
            Err(e) => {
                tracing::error!("delete_posts error: {:?}", e);
                0
            }
        }
    }

    /// set_posts_status
    ///
    /// Bulk status transition over an explicit id set, same skipping semantics as
    /// `delete_posts`.
    async fn set_posts_status(&self, ids: &[Uuid], status: PostStatus) -> u64 {
        if ids.is_empty() {
            return 0;
        }
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE posts SET status = ");
        builder.push_bind(status.as_str());
        builder.push(", updated_at = NOW() WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        builder.push(")");
        match builder.build().execute(&self.pool).await {
            Ok(res) => res.rows_affected(),
            Err(e) => {
                tracing::error!("set_posts_status error: {:?}", e);
                0
            }
        }
    }

    /// count_posts_by_status
    ///
    /// Compiles the dashboard counters in a single call. Always a fresh read.
    async fn count_posts_by_status(&self) -> PostStatusCounts {
        let count = |sql: &'static str| {
            let pool = self.pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_one(&pool)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!("count_posts_by_status error: {:?}", e);
                        0
                    })
            }
        };
        PostStatusCounts {
            posts_count: count("SELECT COUNT(*) FROM posts").await,
            published: count("SELECT COUNT(*) FROM posts WHERE status = 'published'").await,
            drafts: count("SELECT COUNT(*) FROM posts WHERE status = 'draft'").await,
            pending: count("SELECT COUNT(*) FROM posts WHERE status = 'pending'").await,
        }
    }

    /// count_anonymous_posts
    ///
    /// The quota read: posts with no author from the given address. Recomputed on
    /// demand, never kept as a persisted counter.
    async fn count_anonymous_posts(&self, address: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE author_id IS NULL AND ip_address = $1",
        )
        .bind(address)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("count_anonymous_posts error: {:?}", e);
            0
        })
    }

    /// count_users_by_role
    ///
    /// Account totals per tier for the analytics view.
    async fn count_users_by_role(&self) -> RoleCounts {
        let count = |sql: &'static str| {
            let pool = self.pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(sql)
                    .fetch_one(&pool)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!("count_users_by_role error: {:?}", e);
                        0
                    })
            }
        };
        RoleCounts {
            total_users: count("SELECT COUNT(*) FROM users").await,
            admins: count("SELECT COUNT(*) FROM users WHERE role = 'admin'").await,
            editors: count("SELECT COUNT(*) FROM users WHERE role = 'editor'").await,
            viewers: count("SELECT COUNT(*) FROM users WHERE role = 'viewer'").await,
        }
    }

    /// get_user
    ///
    /// Account lookup by id, needed by authentication and administration.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    /// get_user_by_username
    ///
    /// Used for the duplicate-username check before account creation.
    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user_by_username error: {:?}", e);
                None
            })
    }

    /// create_user
    ///
    /// Inserts the local account record. The privilege flags are derived from the
    /// role and written in the same statement, so the record can never be observed
    /// with a role/flag mismatch. A unique-constraint conflict surfaces as None.
    async fn create_user(&self, user: NewUser) -> Option<User> {
        let (is_staff, is_superuser) = user.role.staff_flags();
        let sql = format!(
            "INSERT INTO users (id, username, email, role, is_staff, is_superuser, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             ON CONFLICT (username) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.username)
            .bind(user.email)
            .bind(user.role.as_str())
            .bind(is_staff)
            .bind(is_superuser)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("create_user error: {:?}", e);
                None
            })
    }

    /// list_users
    ///
    /// The account management listing: search over username and email, a
    /// whitelisted order column, caller-supplied (clamped) page size, and the same
    /// page clamping as the post listing.
    async fn list_users(&self, filter: UserFilter) -> UserPage {
        let page_size = filter
            .page_size
            .unwrap_or(USERS_DEFAULT_PAGE_SIZE)
            .clamp(1, USERS_MAX_PAGE_SIZE);
        let search_pattern = filter
            .q
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM users WHERE 1=1");
        if let Some(ref pattern) = search_pattern {
            count_builder.push(" AND (username ILIKE ");
            count_builder.push_bind(pattern.clone());
            count_builder.push(" OR email ILIKE ");
            count_builder.push_bind(pattern.clone());
            count_builder.push(")");
        }
        let total: i64 = match count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("list_users count error: {:?}", e);
                0
            }
        };

        let (page, total_pages) = clamp_page(total, page_size, filter.page.unwrap_or(1));

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE 1=1"
        ));
        if let Some(ref pattern) = search_pattern {
            builder.push(" AND (username ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR email ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(")");
        }
        // The order column comes from a fixed whitelist, never from raw input.
        let column = user_order_column(filter.order.unwrap_or_default());
        let direction = match filter.direction.unwrap_or_default() {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        builder.push(format!(" ORDER BY {column} {direction}"));
        builder.push(" LIMIT ");
        builder.push_bind(page_size);
        builder.push(" OFFSET ");
        builder.push_bind((page - 1) * page_size);

        let users = match builder.build_query_as::<User>().fetch_all(&self.pool).await {
            Ok(u) => u,
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        };

        UserPage {
            users,
            page,
            page_size,
            total_pages,
            total,
        }
    }

    /// update_user
    ///
    /// Administrative edit of username, email and role. The flags travel with the
    /// role in the same UPDATE.
    async fn update_user(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        role: Role,
    ) -> Option<User> {
        let (is_staff, is_superuser) = role.staff_flags();
        let sql = format!(
            "UPDATE users \
             SET username = $2, email = $3, role = $4, is_staff = $5, is_superuser = $6, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(role.as_str())
            .bind(is_staff)
            .bind(is_superuser)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("update_user error: {:?}", e);
                None
            })
    }

    /// set_role
    ///
    /// Role reassignment. A single UPDATE writes the role and both derived flags,
    /// so no reader can observe the role without its matching flags.
    async fn set_role(&self, id: Uuid, role: Role) -> Option<User> {
        let (is_staff, is_superuser) = role.staff_flags();
        let sql = format!(
            "UPDATE users \
             SET role = $2, is_staff = $3, is_superuser = $4, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(role.as_str())
            .bind(is_staff)
            .bind(is_superuser)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("set_role error: {:?}", e);
                None
            })
    }

    /// delete_user
    ///
    /// Removes the account record. Owned anonymous posts are unaffected; authored
    /// posts cascade with the account per the schema.
    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    /// get_preferences
    ///
    /// Reads the per-user preference record, falling back to the defaults when the
    /// user has never saved one.
    async fn get_preferences(&self, user_id: Uuid) -> Preferences {
        sqlx::query_as::<_, Preferences>(
            "SELECT notifications, auto_backup, dark_mode FROM preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_preferences error: {:?}", e);
            None
        })
        .unwrap_or_default()
    }

    /// set_preferences
    ///
    /// Upserts the preference record and returns the stored values.
    async fn set_preferences(&self, user_id: Uuid, prefs: Preferences) -> Preferences {
        sqlx::query_as::<_, Preferences>(
            "INSERT INTO preferences (user_id, notifications, auto_backup, dark_mode) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE \
             SET notifications = EXCLUDED.notifications, \
                 auto_backup = EXCLUDED.auto_backup, \
                 dark_mode = EXCLUDED.dark_mode \
             RETURNING notifications, auto_backup, dark_mode",
        )
        .bind(user_id)
        .bind(prefs.notifications)
        .bind(prefs.auto_backup)
        .bind(prefs.dark_mode)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_preferences error: {:?}", e);
            None
        })
        .unwrap_or(prefs)
    }
}
