use crate::repository::RepositoryState;

/// Admission
///
/// Outcome of the anonymous submission guard. Denials carry the user-facing
/// reason so the handler can surface it without reconstructing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied { reason: String },
}

/// check_and_admit
///
/// Gates post submission for unauthenticated callers. Authenticated submissions
/// always pass; anonymous submissions are compared against the lifetime count of
/// existing author-less posts from the same address.
///
/// The count and the subsequent insert are separate statements, so concurrent
/// submissions from one address can briefly admit past the limit. The cap is a
/// best-effort limit, not a hard quota.
pub async fn check_and_admit(
    repo: &RepositoryState,
    address: &str,
    is_authenticated: bool,
    limit: i64,
) -> Admission {
    if is_authenticated {
        return Admission::Allowed;
    }

    let existing = repo.count_anonymous_posts(address).await;
    if existing >= limit {
        tracing::info!(address = %address, existing, limit, "anonymous submission denied");
        return Admission::Denied {
            reason: "Anonymous post limit reached. Log in to continue.".to_string(),
        };
    }

    Admission::Allowed
}
