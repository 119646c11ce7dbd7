use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GitHubError>;

/// Parameters for one page of `/search/repositories`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSearchParams<'a> {
    pub query: &'a str,
    /// `None` searches every language
    pub language: Option<&'a str>,
    /// `stars` or `updated`
    pub sort: &'a str,
    /// 1-based
    pub page: u32,
}

impl RepoSearchParams<'_> {
    /// The `q` parameter as GitHub expects it, qualifiers separated by spaces
    pub fn q(&self) -> String {
        match self.language {
            Some(lang) if !lang.is_empty() => format!("{} language:{}", self.query, lang),
            _ => self.query.to_string(),
        }
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    base_url: String,
}

impl GitHubClient {
    /// `base_url` is the API root; GitHub Enterprise hosts work too
    pub fn with_base_url(token: Option<String>, base_url: String) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("Repomark/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            token: token.filter(|t| !t.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch a single page of repository search results.
    ///
    /// Results come back in GitHub's own ranking; nothing is re-sorted here.
    pub async fn search_repositories(&self, params: &RepoSearchParams<'_>) -> Result<Vec<GitHubRepo>> {
        let url = format!("{}/search/repositories", self.base_url);
        let q = params.q();
        let page = params.page.max(1).to_string();

        debug!("GitHub search q={:?} sort={} page={}", q, params.sort, page);

        let mut request = self.client.get(&url).query(&[
            ("q", q.as_str()),
            ("sort", params.sort),
            ("order", "desc"),
            ("page", page.as_str()),
        ]);

        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GitHubError::RateLimitExceeded);
        }

        // GitHub reports an exhausted quota as 403 with x-ratelimit-remaining: 0
        if status == reqwest::StatusCode::FORBIDDEN
            && response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                == Some("0")
        {
            return Err(GitHubError::RateLimitExceeded);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::RequestFailed(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let page: SearchPage = serde_json::from_str(&body)?;
        Ok(page.items)
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    items: Vec<GitHubRepo>,
}

/// One item of a GitHub repository search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub open_issues_count: u32,
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q_omits_language_when_unset() {
        let params = RepoSearchParams {
            query: "tetris",
            language: None,
            sort: "stars",
            page: 1,
        };
        assert_eq!(params.q(), "tetris");
    }

    #[test]
    fn test_q_appends_language_qualifier() {
        let params = RepoSearchParams {
            query: "tetris",
            language: Some("Go"),
            sort: "updated",
            page: 3,
        };
        assert_eq!(params.q(), "tetris language:Go");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GitHubClient::with_base_url(None, "http://localhost:1234/".into()).unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
    }

    #[test]
    fn test_repo_tolerates_missing_counts() {
        let json = r#"{"id": 7, "name": "x", "description": null, "html_url": "https://github.com/a/x", "language": null}"#;
        let repo: GitHubRepo = serde_json::from_str(json).unwrap();
        assert_eq!(repo.stargazers_count, 0);
        assert_eq!(repo.full_name, "");
    }
}
