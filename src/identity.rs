use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

// 1. IdentityProvider Contract

/// IdentityProvider
///
/// Defines the abstract contract for the external identity service that owns
/// credentials. This application never hashes or stores a password; signup,
/// password changes and identity removal are delegated through this trait.
/// The trait boundary lets tests substitute the in-memory Mock for the real
/// HTTP client.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates the credential-holding identity and returns its canonical UUID.
    /// The local account record is inserted afterwards under the same id.
    async fn signup(&self, username: &str, email: &str, password: &str)
    -> Result<Uuid, String>;

    /// Replaces the password for an existing identity.
    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), String>;

    /// Removes the identity. Called when the local account record is deleted.
    async fn delete_identity(&self, user_id: Uuid) -> Result<(), String>;
}

// 2. The Real Implementation (HTTP auth service)

/// HttpIdentityClient
///
/// The concrete implementation talking to the identity service's HTTP API with a
/// static API key. The service issues the JWTs that the AuthUser extractor later
/// validates against the shared secret.
#[derive(Clone)]
pub struct HttpIdentityClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// Minimal struct to deserialize the provider's signup response, capturing the
/// newly created identity's UUID.
#[derive(Deserialize)]
struct SignupResponse {
    id: Uuid,
}

impl HttpIdentityClient {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityClient {
    /// signup
    ///
    /// Calls the provider's signup endpoint and extracts the canonical user id
    /// from the response. The id keys both the credential record there and the
    /// account record here.
    async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Uuid, String> {
        let response = self
            .client
            .post(format!("{}/signup", self.endpoint))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            // Provider-side rejection (weak password, identity already exists).
            return Err(format!("identity signup rejected: {}", response.status()));
        }

        let created = response
            .json::<SignupResponse>()
            .await
            .map_err(|e| e.to_string())?;

        Ok(created.id)
    }

    async fn set_password(&self, user_id: Uuid, new_password: &str) -> Result<(), String> {
        let response = self
            .client
            .put(format!("{}/users/{}/password", self.endpoint, user_id))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("password change rejected: {}", response.status()));
        }
        Ok(())
    }

    async fn delete_identity(&self, user_id: Uuid) -> Result<(), String> {
        let response = self
            .client
            .delete(format!("{}/users/{}", self.endpoint, user_id))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("identity deletion rejected: {}", response.status()));
        }
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)

/// MockIdentity
///
/// Mock implementation of `IdentityProvider` used by unit and integration tests.
/// Hands out fresh UUIDs without any network traffic, or simulates provider
/// failures when configured to.
#[derive(Clone)]
pub struct MockIdentity {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn signup(
        &self,
        _username: &str,
        _email: &str,
        _password: &str,
    ) -> Result<Uuid, String> {
        if self.should_fail {
            return Err("Mock identity error: simulation requested".to_string());
        }
        Ok(Uuid::new_v4())
    }

    async fn set_password(&self, _user_id: Uuid, _new_password: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock identity error: simulation requested".to_string());
        }
        Ok(())
    }

    async fn delete_identity(&self, _user_id: Uuid) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock identity error: simulation requested".to_string());
        }
        Ok(())
    }
}

/// IdentityState
///
/// The concrete type used to share the identity provider across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;
