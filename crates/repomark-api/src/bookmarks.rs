// Client for the repomark backend's /api/repos routes
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Not authorized - check the configured token")]
    Unauthorized,

    #[error("Bookmark not found")]
    NotFound,

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Backend request failed: {0}")]
    RequestFailed(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Body of every non-2xx response the backend sends
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct CreateBody<'a, R> {
    repo: &'a R,
}

/// Fields of a bookmark annotation update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct BookmarkClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BookmarkClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/repos{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Save a repository snapshot as a new bookmark
    pub async fn create<R, B>(&self, repo: &R) -> Result<B>
    where
        R: Serialize,
        B: DeserializeOwned,
    {
        let request = self
            .client
            .post(self.url("/bookmark"))
            .json(&CreateBody { repo });
        let response = self.authorized(request).send().await?;
        parse(response).await
    }

    /// All bookmarks of the token's owner, most recent first
    pub async fn list<B: DeserializeOwned>(&self) -> Result<Vec<B>> {
        let request = self.client.get(self.url("/bookmarks"));
        let response = self.authorized(request).send().await?;
        parse(response).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = format!("/bookmark/{}", urlencoding::encode(id));
        let request = self.client.delete(self.url(&path));
        let response = self.authorized(request).send().await?;
        let _: serde_json::Value = parse(response).await?;
        Ok(())
    }

    pub async fn update_annotations<B: DeserializeOwned>(
        &self,
        id: &str,
        patch: &AnnotationPatch,
    ) -> Result<B> {
        let path = format!("/bookmark/{}", urlencoding::encode(id));
        let request = self.client.patch(self.url(&path)).json(patch);
        let response = self.authorized(request).send().await?;
        parse(response).await
    }
}

async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    debug!("backend responded {}", status);

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody { message, error: Some(detail) }) => format!("{}: {}", message, detail),
        Ok(ErrorBody { message, error: None }) => message,
        Err(_) => text,
    };

    Err(match status {
        reqwest::StatusCode::UNAUTHORIZED => BackendError::Unauthorized,
        reqwest::StatusCode::NOT_FOUND => BackendError::NotFound,
        s if s.is_client_error() => BackendError::Rejected(message),
        s => BackendError::RequestFailed(format!("Status {}: {}", s, message)),
    })
}
