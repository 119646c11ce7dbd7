use std::sync::Arc;

use repomark_api::AnnotationPatch;
use repomark_store::BookmarkStore;
use tracing::{debug, info};

use crate::{
    models::{Bookmark, RepoSnapshot},
    Error, Result,
};

pub const MISSING_REPOSITORY: &str = "Repository data is required";
pub const BOOKMARK_NOT_FOUND: &str = "Bookmark not found";

/// Bookmark operations, always on behalf of one owner
///
/// SQLite calls block, so each one runs on tokio's blocking pool.
#[derive(Clone)]
pub struct BookmarkService {
    store: Arc<BookmarkStore>,
}

impl BookmarkService {
    pub fn new(store: Arc<BookmarkStore>) -> Self {
        Self { store }
    }

    async fn blocking<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&BookmarkStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| Error::TaskError(e.to_string()))?
    }

    /// The snapshot is stored as sent; nothing about it is checked beyond presence
    pub async fn create(&self, owner: &str, repo: Option<RepoSnapshot>) -> Result<Bookmark> {
        check_owner(owner)?;
        let repo = repo.ok_or_else(|| Error::ValidationError(MISSING_REPOSITORY.to_string()))?;
        let owner = owner.to_string();

        let bookmark = self
            .blocking(move |store| Ok(store.insert(&owner, &repo)?))
            .await?;

        info!(
            "Bookmarked {} ({}) for {}",
            bookmark.repo.view().full_name,
            bookmark.id,
            bookmark.user
        );
        Ok(bookmark)
    }

    /// Most recently bookmarked first; no bookmarks is an empty list
    pub async fn list_by_owner(&self, owner: &str) -> Result<Vec<Bookmark>> {
        check_owner(owner)?;
        let owner = owner.to_string();

        let bookmarks: Vec<Bookmark> = self
            .blocking(move |store| Ok(store.list_by_owner(&owner)?))
            .await?;

        debug!("Listed {} bookmarks", bookmarks.len());
        Ok(bookmarks)
    }

    /// Fails with NotFound both for unknown ids and for ids owned by someone else
    pub async fn delete_by_id(&self, owner: &str, id: &str) -> Result<()> {
        check_owner(owner)?;
        let (o, i) = (owner.to_string(), id.to_string());

        let deleted = self
            .blocking(move |store| Ok(store.delete(&o, &i)?))
            .await?;

        if !deleted {
            debug!("Delete of {} by {} matched nothing", id, owner);
            return Err(Error::NotFound(BOOKMARK_NOT_FOUND.to_string()));
        }

        info!("Deleted bookmark {} for {}", id, owner);
        Ok(())
    }

    /// Replace a bookmark's note and/or tags.
    ///
    /// A blank note clears it. Tags are trimmed and blank ones dropped.
    pub async fn update_annotations(
        &self,
        owner: &str,
        id: &str,
        patch: AnnotationPatch,
    ) -> Result<Bookmark> {
        check_owner(owner)?;
        if patch.note.is_none() && patch.tags.is_none() {
            return Err(Error::ValidationError(
                "Nothing to update: provide a note or tags".to_string(),
            ));
        }

        let note = patch.note.map(|n| {
            let trimmed = n.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        });
        let tags = patch.tags.map(normalize_tags);
        let (owner, id) = (owner.to_string(), id.to_string());

        let updated: Option<Bookmark> = self
            .blocking(move |store| {
                Ok(store.update_annotations(
                    &owner,
                    &id,
                    note.as_ref().map(|n| n.as_deref()),
                    tags.as_deref(),
                )?)
            })
            .await?;

        updated.ok_or_else(|| Error::NotFound(BOOKMARK_NOT_FOUND.to_string()))
    }
}

fn check_owner(owner: &str) -> Result<()> {
    if owner.trim().is_empty() {
        return Err(Error::ValidationError("Owner id is required".to_string()));
    }
    Ok(())
}

/// Trim each tag and drop the blank ones, keeping order
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Repository;
    use chrono::{SubsecRound, Utc};

    fn service() -> BookmarkService {
        BookmarkService::new(Arc::new(BookmarkStore::open_in_memory().unwrap()))
    }

    fn repo(id: u64, stars: u32) -> RepoSnapshot {
        RepoSnapshot::from(Repository {
            id,
            name: format!("repo-{}", id),
            full_name: format!("octo/repo-{}", id),
            stars,
            ..Repository::default()
        })
    }

    #[tokio::test]
    async fn test_create_then_list_contains_exactly_one() {
        let service = service();
        let before = Utc::now().trunc_subsecs(6);

        let created = service.create("alice", Some(repo(1, 10))).await.unwrap();
        let listed = service.list_by_owner("alice").await.unwrap();

        let matching: Vec<_> = listed.iter().filter(|b| b.id == created.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].repo, repo(1, 10));
        assert_eq!(matching[0].user, "alice");
        assert!(matching[0].last_seen >= before);
    }

    #[tokio::test]
    async fn test_create_without_repo_is_validation_error() {
        let service = service();
        let err = service.create("alice", None).await.unwrap_err();

        assert!(matches!(err, Error::ValidationError(_)));
        assert_eq!(err.to_string(), "Repository data is required");
    }

    #[tokio::test]
    async fn test_list_empty_is_ok() {
        let service = service();
        assert!(service.list_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_reverse_insertion_order() {
        let service = service();
        for id in 1..=4 {
            service.create("alice", Some(repo(id, 0))).await.unwrap();
        }

        let listed = service.list_by_owner("alice").await.unwrap();
        let ids: Vec<u64> = listed.iter().map(|b| b.repo.view().id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert!(listed.windows(2).all(|w| w[0].last_seen >= w[1].last_seen));
    }

    #[tokio::test]
    async fn test_delete_other_owner_is_not_found_and_keeps_row() {
        let service = service();
        let created = service.create("alice", Some(repo(1, 10))).await.unwrap();

        let err = service.delete_by_id("mallory", &created.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.to_string(), "Bookmark not found");
        assert_eq!(service.list_by_owner("alice").await.unwrap().len(), 1);

        service.delete_by_id("alice", &created.id).await.unwrap();
        assert!(service.list_by_owner("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let service = service();
        let err = service.delete_by_id("alice", "no-such-id").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_annotations_normalizes() {
        let service = service();
        let created = service.create("alice", Some(repo(1, 10))).await.unwrap();

        let updated = service
            .update_annotations(
                "alice",
                &created.id,
                AnnotationPatch {
                    note: Some("  look at the parser  ".into()),
                    tags: Some(vec![" AI ".into(), "".into(), "Frontend".into()]),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.note.as_deref(), Some("look at the parser"));
        assert_eq!(updated.tags, vec!["AI".to_string(), "Frontend".to_string()]);

        let listed = service.list_by_owner("alice").await.unwrap();
        assert_eq!(listed[0].tags, updated.tags);
    }

    #[tokio::test]
    async fn test_blank_note_clears() {
        let service = service();
        let created = service.create("alice", Some(repo(1, 10))).await.unwrap();
        service
            .update_annotations(
                "alice",
                &created.id,
                AnnotationPatch { note: Some("keep".into()), tags: None },
            )
            .await
            .unwrap();

        let cleared = service
            .update_annotations(
                "alice",
                &created.id,
                AnnotationPatch { note: Some("   ".into()), tags: None },
            )
            .await
            .unwrap();
        assert_eq!(cleared.note, None);
    }

    #[tokio::test]
    async fn test_update_requires_a_field_and_owner() {
        let service = service();
        let created = service.create("alice", Some(repo(1, 10))).await.unwrap();

        let err = service
            .update_annotations("alice", &created.id, AnnotationPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));

        let err = service
            .update_annotations(
                "mallory",
                &created.id,
                AnnotationPatch { note: Some("x".into()), tags: None },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec!["a".to_string(), "  ".to_string(), " b ".to_string()];
        assert_eq!(normalize_tags(tags), vec!["a".to_string(), "b".to_string()]);
    }
}
