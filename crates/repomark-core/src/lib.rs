// Core business logic: bookmarks, search coordination, aggregation
pub mod analytics;
pub mod bookmarks;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod search;

pub use analytics::{summarize, LanguageBucket, RepoStats, StarredRecord};
pub use bookmarks::BookmarkService;
pub use config::Config;
pub use error::Error;
pub use models::{Bookmark, LanguageFilter, RepoSnapshot, Repository, SearchQuery, SortKey};
pub use repomark_api::AnnotationPatch;
pub use search::{RepositorySearch, SearchOutcome, SearchProvider};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
