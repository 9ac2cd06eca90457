use blog_portal::{
    models::{CreatePostRequest, NewUser, Post, PostFilter, PostOrigin, PostSort, PostStatus,
        Preferences, UpdatePostRequest},
    repository::{PostgresRepository, Repository},
    roles::Role,
};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// A simple structure holding the database pool for testing.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Creates an account with a run-unique username so tests tolerate a shared database.
async fn create_test_user(repo: &PostgresRepository, role: Role) -> blog_portal::models::User {
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("{}_{}", role.as_str(), &suffix[..8]);
    repo.create_user(NewUser {
        id: Uuid::new_v4(),
        username: username.clone(),
        email: format!("{}@test.com", username),
        role,
    })
    .await
    .expect("Failed to create test user")
}

fn post_request(title: &str, status: Option<PostStatus>) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        content: "Integration test content".to_string(),
        image: None,
        status,
    }
}

async fn create_test_post(
    repo: &PostgresRepository,
    title: &str,
    status: PostStatus,
    origin: PostOrigin,
) -> Post {
    repo.create_post(post_request(title, Some(status)), origin)
        .await
        .expect("Failed to create test post")
}

// --- Tests ---

#[test]
async fn test_create_post_defaults_and_origin() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo, Role::Viewer).await;

    // Authenticated submission: author set, address unset, draft by default.
    let authored = repo
        .create_post(post_request("Authored", None), PostOrigin::Author(author.id))
        .await
        .expect("insert should succeed");
    assert_eq!(authored.author_id, Some(author.id));
    assert!(authored.ip_address.is_none());
    assert_eq!(authored.status, PostStatus::Draft);
    assert_eq!(authored.created_at, authored.updated_at);

    // Anonymous submission: the reverse.
    let anonymous = repo
        .create_post(
            post_request("Anonymous", None),
            PostOrigin::Anonymous("203.0.113.50".to_string()),
        )
        .await
        .expect("insert should succeed");
    assert!(anonymous.author_id.is_none());
    assert_eq!(anonymous.ip_address.as_deref(), Some("203.0.113.50"));
}

#[test]
async fn test_update_post_preserves_creation_time() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo, Role::Editor).await;
    let post =
        create_test_post(&repo, "Before edit", PostStatus::Draft, PostOrigin::Author(author.id))
            .await;

    let updated = repo
        .update_post(
            post.id,
            UpdatePostRequest {
                title: Some("After edit".to_string()),
                content: None,
                image: None,
                status: Some(PostStatus::Pending),
            },
        )
        .await
        .expect("update should resolve");

    assert_eq!(updated.title, "After edit");
    // Partial update: untouched fields survive.
    assert_eq!(updated.content, post.content);
    assert_eq!(updated.status, PostStatus::Pending);
    // The creation timestamp is immutable; the modification timestamp moves.
    assert_eq!(updated.created_at, post.created_at);
    assert!(updated.updated_at >= post.updated_at);
}

#[test]
async fn test_list_posts_filter_sort_and_page_clamp() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo, Role::Editor).await;

    // A run-unique marker keeps this test isolated on a shared database.
    let marker = format!("mk{}", &Uuid::new_v4().simple().to_string()[..10]);
    for i in 0..12 {
        let status = if i % 2 == 0 {
            PostStatus::Published
        } else {
            PostStatus::Draft
        };
        create_test_post(
            &repo,
            &format!("{} item {:02}", marker, i),
            status,
            PostOrigin::Author(author.id),
        )
        .await;
    }

    // Title search finds all twelve, paginated at ten per page.
    let page1 = repo
        .list_posts(PostFilter {
            search: Some(marker.clone()),
            status: None,
            sort: None,
            page: Some(1),
        })
        .await;
    assert_eq!(page1.total, 12);
    assert_eq!(page1.total_pages, 2);
    assert_eq!(page1.posts.len(), 10);

    // Out-of-range page numbers clamp to the last valid page instead of erroring.
    let clamped = repo
        .list_posts(PostFilter {
            search: Some(marker.clone()),
            status: None,
            sort: None,
            page: Some(999),
        })
        .await;
    assert_eq!(clamped.page, 2);
    assert_eq!(clamped.posts.len(), 2);

    // Exact status filter combined with oldest-first ordering.
    let published_oldest = repo
        .list_posts(PostFilter {
            search: Some(marker.clone()),
            status: Some(PostStatus::Published),
            sort: Some(PostSort::Oldest),
            page: Some(1),
        })
        .await;
    assert_eq!(published_oldest.total, 6);
    assert!(
        published_oldest
            .posts
            .iter()
            .all(|p| p.status == PostStatus::Published)
    );
    let times: Vec<_> = published_oldest.posts.iter().map(|p| p.created_at).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted, "oldest-first must ascend by creation time");
}

#[test]
async fn test_bulk_operations_skip_missing_ids() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo, Role::Editor).await;

    let a = create_test_post(&repo, "Bulk A", PostStatus::Draft, PostOrigin::Author(author.id))
        .await;
    let c = create_test_post(&repo, "Bulk C", PostStatus::Draft, PostOrigin::Author(author.id))
        .await;
    let missing = Uuid::new_v4();

    // Status transition over {A, missing, C}: A and C transition, no failure.
    let affected = repo
        .set_posts_status(&[a.id, missing, c.id], PostStatus::Published)
        .await;
    assert_eq!(affected, 2);
    assert_eq!(
        repo.get_post(a.id).await.unwrap().status,
        PostStatus::Published
    );
    assert_eq!(
        repo.get_post(c.id).await.unwrap().status,
        PostStatus::Published
    );

    // Same skipping semantics for bulk delete.
    let deleted = repo.delete_posts(&[a.id, missing, c.id]).await;
    assert_eq!(deleted, 2);
    assert!(repo.get_post(a.id).await.is_none());
}

#[test]
async fn test_anonymous_quota_counts_per_address() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let addr = format!("203.0.113.{}", rand_octet());
    let other = "198.51.100.77";

    for i in 0..3 {
        create_test_post(
            &repo,
            &format!("Quota {}", i),
            PostStatus::Draft,
            PostOrigin::Anonymous(addr.clone()),
        )
        .await;
    }

    assert_eq!(repo.count_anonymous_posts(&addr).await, 3);
    assert_eq!(repo.count_anonymous_posts(other).await, 0);

    // Authored posts never count toward any address quota.
    let author = create_test_user(&repo, Role::Viewer).await;
    create_test_post(&repo, "Authored", PostStatus::Draft, PostOrigin::Author(author.id)).await;
    assert_eq!(repo.count_anonymous_posts(&addr).await, 3);
}

// Derives a pseudo-unique octet from a fresh UUID so parallel test runs do not
// share a quota address.
fn rand_octet() -> u8 {
    Uuid::new_v4().as_bytes()[0]
}

#[test]
async fn test_published_listing_hides_unpublished() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&repo, Role::Editor).await;

    let draft =
        create_test_post(&repo, "Hidden draft", PostStatus::Draft, PostOrigin::Author(author.id))
            .await;
    let published = create_test_post(
        &repo,
        "Visible post",
        PostStatus::Published,
        PostOrigin::Author(author.id),
    )
    .await;

    let feed = repo.list_published_posts(PostSort::Newest).await;
    assert!(feed.iter().all(|p| p.id != draft.id));
    assert!(feed.iter().any(|p| p.id == published.id));

    assert!(repo.get_published_post(draft.id).await.is_none());
    assert!(repo.get_published_post(published.id).await.is_some());
}

#[test]
async fn test_role_writes_synchronize_flags() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    // Created as viewer: both flags off.
    let user = create_test_user(&repo, Role::Viewer).await;
    assert!(!user.is_staff);
    assert!(!user.is_superuser);

    // Editor: staff without superuser.
    let editor = repo.set_role(user.id, Role::Editor).await.unwrap();
    assert_eq!(editor.role, Role::Editor);
    assert!(editor.is_staff);
    assert!(!editor.is_superuser);

    // Admin: both flags on.
    let admin = repo.set_role(user.id, Role::Admin).await.unwrap();
    assert!(admin.is_staff);
    assert!(admin.is_superuser);

    // A full edit resynchronizes too.
    let demoted = repo
        .update_user(user.id, &admin.username, &admin.email, Role::Viewer)
        .await
        .unwrap();
    assert_eq!(demoted.role, Role::Viewer);
    assert!(!demoted.is_staff);
    assert!(!demoted.is_superuser);
}

#[test]
async fn test_duplicate_username_insert_returns_none() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let first = create_test_user(&repo, Role::Viewer).await;

    let second = repo
        .create_user(NewUser {
            id: Uuid::new_v4(),
            username: first.username.clone(),
            email: "someone_else@test.com".to_string(),
            role: Role::Viewer,
        })
        .await;
    assert!(second.is_none(), "duplicate username must not insert");
}

#[test]
async fn test_preferences_defaults_and_upsert() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::Viewer).await;

    // No saved row reads as the defaults.
    let defaults = repo.get_preferences(user.id).await;
    assert!(defaults.notifications);
    assert!(!defaults.auto_backup);
    assert!(!defaults.dark_mode);

    // Upsert and read back.
    let saved = repo
        .set_preferences(
            user.id,
            Preferences {
                notifications: false,
                auto_backup: true,
                dark_mode: true,
            },
        )
        .await;
    assert!(saved.dark_mode);

    let reloaded = repo.get_preferences(user.id).await;
    assert!(!reloaded.notifications);
    assert!(reloaded.auto_backup);
    assert!(reloaded.dark_mode);
}

#[test]
async fn test_delete_user_and_missing_lookups() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::Viewer).await;

    assert!(repo.delete_user(user.id).await);
    assert!(repo.get_user(user.id).await.is_none());
    // A second delete affects nothing.
    assert!(!repo.delete_user(user.id).await);
}
