//! HTTP client for the Moments API
//!
//! Authenticated calls carry `Authorization: Bearer <token>` and every
//! response to one of them passes through [`Session::observe_status`], so
//! `401` and `403` are handled in one place.

use crate::error::{ClientError, ErrorEnvelope};
use crate::session::{Session, SessionTicket};
use moments_core::{Role, UserProfile};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct Registration<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    user: UserProfile,
}

/// Blog post as listed by the API
#[derive(Debug, Clone, Deserialize)]
pub struct BlogEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub is_published: bool,
    pub author: String,
    #[serde(default)]
    pub author_name: String,
}

#[derive(Debug, Deserialize)]
struct BlogList {
    blogs: Vec<BlogEntry>,
}

#[derive(Debug, Deserialize)]
struct BlogBody {
    blog: BlogEntry,
}

/// Admin dashboard counts
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardSummary {
    pub blogs: usize,
    pub comments: usize,
    pub drafts: usize,
    #[serde(default)]
    pub recent_blogs: Vec<BlogEntry>,
}

#[derive(Debug, Deserialize)]
struct DashboardBody {
    dashboard: DashboardSummary,
}

/// API client bound to one shared session
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self::with_client(Client::new(), base_url, session)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, session: Arc<Session>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Log in as the configured administrator
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        self.login_at("/api/admin/login", email, password).await
    }

    /// Log in with a registered account
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        self.login_at("/api/auth/login", email, password).await
    }

    async fn login_at(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, ClientError> {
        let request = self
            .http
            .post(self.url(path))
            .json(&Credentials { email, password });
        let body: TokenBody = send_public(request).await?.json().await?;
        self.sign_in(&body.token).await
    }

    /// Create an account and sign in with it
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<UserProfile, ClientError> {
        let request = self.http.post(self.url("/api/auth/register")).json(&Registration {
            name,
            email,
            password,
            role,
        });
        let body: TokenBody = send_public(request).await?.json().await?;
        self.sign_in(&body.token).await
    }

    /// Adopt `token`: store it, fetch the profile, mark the session
    /// authenticated
    ///
    /// Any failure discards the token and is returned to the caller.
    pub async fn sign_in(&self, token: &str) -> Result<UserProfile, ClientError> {
        let ticket = self.session.begin_login(token).await?;

        let fetched = async {
            let request = self
                .http
                .get(self.url("/api/auth/me"))
                .bearer_auth(ticket.token());
            let body: ProfileBody = send_public(request).await?.json().await?;
            Ok::<_, ClientError>(body.user)
        }
        .await;

        match fetched {
            Ok(profile) => {
                self.session.complete_login(&ticket, profile.clone()).await?;
                tracing::info!(email = %profile.email, role = %profile.role, "Signed in");
                Ok(profile)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Sign-in failed, discarding token");
                self.session.abort_login(&ticket).await?;
                Err(err)
            }
        }
    }

    /// Re-read the profile of the current session
    pub async fn refresh_profile(&self) -> Result<UserProfile, ClientError> {
        let ticket = self.ticket().await?;
        let response = self
            .send_authenticated(&ticket, self.http.get(self.url("/api/auth/me")))
            .await?;
        let body: ProfileBody = response.json().await?;
        self.session.set_profile(&ticket, body.user.clone()).await?;
        Ok(body.user)
    }

    /// Forget the session; no server call is needed
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.logout().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Published posts
    pub async fn published_blogs(&self) -> Result<Vec<BlogEntry>, ClientError> {
        let body: BlogList = send_public(self.http.get(self.url("/api/blog/all")))
            .await?
            .json()
            .await?;
        Ok(body.blogs)
    }

    /// Posts written by the signed-in admin or author
    pub async fn my_blogs(&self) -> Result<Vec<BlogEntry>, ClientError> {
        let ticket = self.ticket().await?;
        let body: BlogList = self
            .send_authenticated(&ticket, self.http.get(self.url("/api/blog/mine")))
            .await?
            .json()
            .await?;
        Ok(body.blogs)
    }

    pub async fn toggle_publish(&self, id: &str) -> Result<BlogEntry, ClientError> {
        let ticket = self.ticket().await?;
        let request = self
            .http
            .post(self.url("/api/blog/toggle-publish"))
            .json(&serde_json::json!({ "id": id }));
        let body: BlogBody = self
            .send_authenticated(&ticket, request)
            .await?
            .json()
            .await?;
        Ok(body.blog)
    }

    /// Admin dashboard counts
    pub async fn dashboard(&self) -> Result<DashboardSummary, ClientError> {
        let ticket = self.ticket().await?;
        let body: DashboardBody = self
            .send_authenticated(&ticket, self.http.get(self.url("/api/admin/dashboard")))
            .await?
            .json()
            .await?;
        Ok(body.dashboard)
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    async fn ticket(&self) -> Result<SessionTicket, ClientError> {
        self.session.ticket().await.ok_or(ClientError::NotSignedIn)
    }

    async fn send_authenticated(
        &self,
        ticket: &SessionTicket,
        request: RequestBuilder,
    ) -> Result<Response, ClientError> {
        let response = request.bearer_auth(ticket.token()).send().await?;
        self.session.observe_status(ticket, response.status()).await?;
        error_for_status(response).await
    }
}

async fn send_public(request: RequestBuilder) -> Result<Response, ClientError> {
    error_for_status(request.send().await?).await
}

/// Turn a non-2xx response into [`ClientError::Api`] using its envelope
async fn error_for_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let envelope = response.json::<ErrorEnvelope>().await.ok();
    let (code, message) = match envelope {
        Some(envelope) => (envelope.code, envelope.message),
        None => (None, None),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message: message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        }),
    })
}
