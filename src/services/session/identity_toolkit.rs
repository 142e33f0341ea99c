/// Identity Toolkit auth provider
///
/// API Flow:
/// 1. Email/password: accounts:signInWithPassword → id token + profile
/// 2. Sign-up: accounts:signUp → accounts:update to set the display name
/// 3. External provider: accounts:signInWithIdp with the provider's id token
///
/// Every successful sign-in schedules a sign-out when the id token expires.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;

use super::AuthProvider;
use crate::{
    error::{AppError, AppResult},
    models::{AuthState, Credentials, ExternalCredential, User},
};

/// Used when the response omits `expiresIn`
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);
/// Redirect URI reported for IdP sign-ins; only needs to be a valid URL
const IDP_REQUEST_URI: &str = "http://localhost";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    id_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

impl TokenResponse {
    fn user(&self) -> User {
        User {
            id: self.local_id.clone(),
            email: self.email.clone().unwrap_or_default(),
            display_name: self.display_name.clone().unwrap_or_default(),
        }
    }

    fn lifetime(&self) -> Duration {
        self.expires_in
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

/// Turns an Identity Toolkit error code into a message fit for the user
pub fn auth_error_message(code: &str) -> String {
    // codes may carry a detail suffix, e.g. "WEAK_PASSWORD : Password should be ..."
    let (code, detail) = match code.split_once(" : ") {
        Some((code, detail)) => (code.trim(), Some(detail.trim())),
        None => (code.trim(), None),
    };

    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password".to_string()
        }
        "EMAIL_EXISTS" => "An account with this email already exists".to_string(),
        "INVALID_EMAIL" => "Invalid email address".to_string(),
        "USER_DISABLED" => "This account has been disabled".to_string(),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later".to_string(),
        "WEAK_PASSWORD" => detail
            .unwrap_or("Password should be at least 6 characters")
            .to_string(),
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct IdentityToolkitAuth {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    state: Arc<watch::Sender<AuthState>>,
    /// Bumped on every sign-in and sign-out so stale expiry timers do nothing
    generation: Arc<AtomicU64>,
}

impl IdentityToolkitAuth {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self::with_client(HttpClient::new(), api_key, api_url)
    }

    pub fn with_client(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        let (state, _) = watch::channel(AuthState::SignedOut);
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// POSTs to an `accounts:*` method, mapping error payloads to auth errors
    async fn call<B, T>(&self, method: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/accounts:{}", self.api_url, method);
        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(error) => {
                    tracing::warn!(method = method, code = %error.error.message, "Identity request rejected");
                    Err(AppError::Auth(auth_error_message(&error.error.message)))
                }
                Err(_) => {
                    tracing::error!(method = method, status = %status, body = %text, "Identity request failed");
                    Err(AppError::Network(format!(
                        "Identity Toolkit returned status {}: {}",
                        status, text
                    )))
                }
            };
        }

        serde_json::from_str(&text).map_err(|e| {
            AppError::Network(format!("Failed to parse Identity Toolkit response: {}", e))
        })
    }

    /// Publishes the signed-in user and arms the token expiry timer
    fn signed_in(&self, token: &TokenResponse) -> User {
        let user = token.user();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(AuthState::SignedIn(user.clone()));

        let lifetime = token.lifetime();
        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let uid = user.id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            if current.load(Ordering::SeqCst) == generation {
                tracing::info!(uid = %uid, "Id token expired, signing out");
                state.send_replace(AuthState::SignedOut);
            }
        });

        tracing::info!(uid = %user.id, expires_in = ?lifetime, "Signed in");
        user
    }
}

#[async_trait::async_trait]
impl AuthProvider for IdentityToolkitAuth {
    async fn sign_in(&self, credentials: &Credentials) -> AppResult<User> {
        let token: TokenResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email: &credentials.email,
                    password: &credentials.password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.signed_in(&token))
    }

    async fn sign_up(&self, credentials: &Credentials, display_name: &str) -> AppResult<User> {
        let mut token: TokenResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email: &credentials.email,
                    password: &credentials.password,
                    return_secure_token: true,
                },
            )
            .await?;

        let profile: serde_json::Value = self
            .call(
                "update",
                &json!({
                    "idToken": token.id_token,
                    "displayName": display_name,
                    "returnSecureToken": false,
                }),
            )
            .await?;
        token.display_name = profile
            .get("displayName")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| Some(display_name.to_string()));

        Ok(self.signed_in(&token))
    }

    async fn sign_in_with_external_provider(
        &self,
        credential: &ExternalCredential,
    ) -> AppResult<User> {
        let post_body = format!(
            "id_token={}&providerId={}",
            credential.id_token, credential.provider_id
        );
        let token: TokenResponse = self
            .call(
                "signInWithIdp",
                &json!({
                    "postBody": post_body,
                    "requestUri": IDP_REQUEST_URI,
                    "returnSecureToken": true,
                    "returnIdpCredential": true,
                }),
            )
            .await?;
        Ok(self.signed_in(&token))
    }

    /// Id tokens are bearer tokens with no revocation call; dropping them
    /// locally is the whole sign-out
    async fn sign_out(&self) -> AppResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(AuthState::SignedOut);
        tracing::info!("Signed out");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn name(&self) -> &'static str {
        "identity_toolkit"
    }
}
