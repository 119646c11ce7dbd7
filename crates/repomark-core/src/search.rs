use crate::{
    models::{Repository, SearchQuery},
    Result,
};
use tracing::{debug, warn};

/// Trait for search providers - the seam between query coordination and HTTP
///
/// GitHub is the only real implementation; tests plug in a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Repository>>;
}

/// What a search hands back to the UI
///
/// A failed search is not an error here: it is an empty page plus a warning
/// the caller may show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    pub repositories: Vec<Repository>,
    pub warning: Option<String>,
}

impl SearchOutcome {
    pub fn failed(&self) -> bool {
        self.warning.is_some()
    }
}

/// Runs one search at a time against a provider
pub struct RepositorySearch {
    provider: Box<dyn SearchProvider>,
}

impl RepositorySearch {
    pub fn new(provider: Box<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Search one page. Blank queries are skipped without touching the provider.
    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        if query.is_blank() {
            debug!("Blank query, skipping search");
            return SearchOutcome::default();
        }

        let mut query = query.clone();
        query.page = query.page.max(1);

        match self.provider.search(&query).await {
            Ok(repositories) => {
                debug!(
                    "Search '{}' page {} returned {} repositories",
                    query.query,
                    query.page,
                    repositories.len()
                );
                SearchOutcome {
                    repositories,
                    warning: None,
                }
            }
            Err(e) => {
                warn!("Search '{}' failed: {}", query.query, e);
                SearchOutcome {
                    repositories: Vec::new(),
                    warning: Some(e.to_string()),
                }
            }
        }
    }
}
