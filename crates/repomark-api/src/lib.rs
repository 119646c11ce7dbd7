// HTTP clients: GitHub's search API and the repomark bookmark backend
pub mod bookmarks;
pub mod github;

// Re-export common types
pub use bookmarks::{AnnotationPatch, BackendError, BookmarkClient};
pub use github::{GitHubClient, GitHubError, GitHubRepo, RepoSearchParams};
