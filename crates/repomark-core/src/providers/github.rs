// GitHub provider implementation - bridges API client with SearchProvider trait
use async_trait::async_trait;
use repomark_api::{GitHubClient, GitHubRepo, RepoSearchParams};

use crate::{
    models::{Repository, SearchQuery},
    search::SearchProvider,
    Error, Result,
};

/// Wrapper around GitHubClient that implements SearchProvider
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(token: Option<String>, api_url: &str) -> Result<Self> {
        let client = GitHubClient::with_base_url(token, api_url.to_string())
            .map_err(|e| Error::ConfigError(format!("Failed to build GitHub client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchProvider for GitHubProvider {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Repository>> {
        let params = RepoSearchParams {
            query: query.query.trim(),
            language: query.language.qualifier(),
            sort: query.sort.as_str(),
            page: query.page,
        };

        let repos = self
            .client
            .search_repositories(&params)
            .await
            .map_err(|e| Error::UpstreamSearchError(e.to_string()))?;

        Ok(repos.into_iter().map(github_to_repo).collect())
    }
}

/// Convert GitHub API repo to our internal Repository model
fn github_to_repo(gh: GitHubRepo) -> Repository {
    Repository {
        id: gh.id,
        name: gh.name,
        full_name: gh.full_name,
        description: gh.description,
        url: gh.html_url,
        stars: gh.stargazers_count,
        forks: gh.forks_count,
        open_issues: gh.open_issues_count,
        language: gh.language,
    }
}
