use blog_portal::{
    AppConfig, AppState, MockIdentity, MockMailer, MockStorageService, create_router,
    models::{NewUser, Post, User},
    repository::{PostgresRepository, Repository, RepositoryState},
    roles::Role,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub pool: sqlx::PgPool,
}

async fn spawn_app() -> TestApp {
    dotenv::dotenv().ok();

    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run API tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool.clone())) as RepositoryState;
    let config = AppConfig {
        db_url: db_url.clone(),
        ..AppConfig::default()
    };

    let state = AppState {
        repo,
        identity: Arc::new(MockIdentity::new()),
        mailer: Arc::new(MockMailer::new()),
        storage: Arc::new(MockStorageService::new()),
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        // Connect-info backs the ClientAddr extractor, as in the real server.
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp { address, pool }
}

/// Seeds an account directly through the repository, bypassing the identity
/// provider, so the `x-user-id` local bypass can authenticate as it.
async fn seed_user(pool: &sqlx::PgPool, role: Role) -> User {
    let repo = PostgresRepository::new(pool.clone());
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("api_{}_{}", role.as_str(), &suffix[..8]);
    repo.create_user(NewUser {
        id: Uuid::new_v4(),
        username: username.clone(),
        email: format!("{}@test.com", username),
        role,
    })
    .await
    .expect("Failed to seed user")
}

/// Client that does not follow redirects, so the soft-denial responses stay
/// observable.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = client()
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_anonymous_submission_quota_end_to_end() {
    let app = spawn_app().await;
    let client = client();
    // A run-unique forwarded address keys the quota.
    let addr = format!("203.0.113.{}", Uuid::new_v4().as_bytes()[0]);

    // Three anonymous submissions pass.
    for i in 0..3 {
        let response = client
            .post(format!("{}/posts", app.address))
            .header("x-forwarded-for", &addr)
            .json(&serde_json::json!({
                "title": format!("Anon {}", i),
                "content": "Body"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "submission {} should pass", i);

        let post: Post = response.json().await.unwrap();
        assert_eq!(post.ip_address.as_deref(), Some(addr.as_str()));
        assert!(post.author_id.is_none());
    }

    // The fourth is turned away toward authentication.
    let response = client
        .post(format!("{}/posts", app.address))
        .header("x-forwarded-for", &addr)
        .json(&serde_json::json!({ "title": "Anon 3", "content": "Body" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers().get("location").unwrap(), "/login");

    // An authenticated caller from the same address is unaffected.
    let viewer = seed_user(&app.pool, Role::Viewer).await;
    let response = client
        .post(format!("{}/posts", app.address))
        .header("x-forwarded-for", &addr)
        .header("x-user-id", viewer.id.to_string())
        .json(&serde_json::json!({ "title": "Logged in", "content": "Body" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let post: Post = response.json().await.unwrap();
    assert_eq!(post.author_id, Some(viewer.id));
    assert!(post.ip_address.is_none());
}

#[tokio::test]
async fn test_moderation_publishes_into_public_feed() {
    let app = spawn_app().await;
    let client = client();
    let editor = seed_user(&app.pool, Role::Editor).await;

    // Submit a draft as the editor.
    let response = client
        .post(format!("{}/posts", app.address))
        .header("x-user-id", editor.id.to_string())
        .json(&serde_json::json!({ "title": "Pipeline post", "content": "Body" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let post: Post = response.json().await.unwrap();

    // Drafts stay out of the public feed.
    let feed: Vec<Post> = client
        .get(format!("{}/posts", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(feed.iter().all(|p| p.id != post.id));

    // Publish through the moderation route.
    let response = client
        .put(format!("{}/admin/posts/{}/status", app.address, post.id))
        .header("x-user-id", editor.id.to_string())
        .json(&serde_json::json!("published"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Now it is visible.
    let feed: Vec<Post> = client
        .get(format!("{}/posts", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(feed.iter().any(|p| p.id == post.id));
}

#[tokio::test]
async fn test_admin_routes_redirect_unprivileged_callers() {
    let app = spawn_app().await;
    let client = client();
    let viewer = seed_user(&app.pool, Role::Viewer).await;

    // A viewer on the account listing bounces home.
    let response = client
        .get(format!("{}/admin/users", app.address))
        .header("x-user-id", viewer.id.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(response.headers().get("location").unwrap(), "/");

    // An unauthenticated caller fails authentication outright.
    let response = client
        .get(format!("{}/admin/users", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_role_management_denial_is_explicit() {
    let app = spawn_app().await;
    let client = client();
    let editor = seed_user(&app.pool, Role::Editor).await;
    let target = seed_user(&app.pool, Role::Viewer).await;

    // The role route answers a failed check with 403, not a redirect.
    let response = client
        .put(format!("{}/admin/users/{}/role", app.address, target.id))
        .header("x-user-id", editor.id.to_string())
        .json(&serde_json::json!({ "role": "editor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_admin_changes_role_and_flags_follow() {
    let app = spawn_app().await;
    let client = client();
    let admin = seed_user(&app.pool, Role::Admin).await;
    let target = seed_user(&app.pool, Role::Viewer).await;

    let response = client
        .put(format!("{}/admin/users/{}/role", app.address, target.id))
        .header("x-user-id", admin.id.to_string())
        .json(&serde_json::json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: User = response.json().await.unwrap();
    assert_eq!(updated.role, Role::Admin);
    assert!(updated.is_staff);
    assert!(updated.is_superuser);

    // The flags landed in storage together with the role.
    let (is_staff, is_superuser): (bool, bool) = sqlx::query_as(
        "SELECT is_staff, is_superuser FROM users WHERE id = $1",
    )
    .bind(target.id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert!(is_staff);
    assert!(is_superuser);
}
