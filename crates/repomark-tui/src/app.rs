// TUI application state and the transitions between states
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use ratatui::widgets::ListState;
use repomark_core::{
    analytics::{summarize, RepoStats},
    bookmarks::normalize_tags,
    models::LANGUAGE_CHOICES,
    AnnotationPatch, Bookmark, LanguageFilter, Repository, SearchOutcome, SearchQuery, SortKey,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Loading,
    Displayed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,        // Navigating panes
    Searching,     // Typing in search box
    EditingNote,   // Typing a bookmark note
    EditingTags,   // Typing comma separated tags
    FilteringTags, // Typing the bookmark tag filter
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Results,
    Bookmarks,
}

/// Background work the runner should start
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search { seq: u64, query: SearchQuery },
    LoadBookmarks,
    CreateBookmark(Repository),
    DeleteBookmark(String),
    SaveAnnotations { id: String, patch: AnnotationPatch },
}

/// Background work reporting back to the event loop
#[derive(Debug)]
pub enum AppEvent {
    SearchFinished {
        seq: u64,
        outcome: SearchOutcome,
    },
    BookmarksLoaded(Result<Vec<Bookmark>, String>),
    BookmarkCreated {
        repo_id: u64,
        result: Result<Bookmark, String>,
    },
    BookmarkDeleted {
        id: String,
        result: Result<(), String>,
    },
    AnnotationsSaved {
        id: String,
        result: Result<Bookmark, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
}

#[derive(Debug, Clone)]
struct PendingSave {
    patch: AnnotationPatch,
    due: Instant,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub pane: Pane,
    pub search_input: String,
    pub language_index: usize,
    pub sort: SortKey,
    pub page: u32,
    pub phase: SearchPhase,
    pub results: Vec<Repository>,
    pub results_state: ListState,
    pub bookmarks: Vec<Bookmark>,
    pub bookmarks_state: ListState,
    pub tag_filter: String,
    pub edit_buffer: String,
    pub status: Option<StatusMessage>,
    editing_id: Option<String>,
    latest_seq: u64,
    debounce: Duration,
    pending_saves: HashMap<String, PendingSave>,
    // Repo ids with a create request in flight
    pending_creates: HashSet<u64>,
}

impl App {
    pub fn new(debounce: Duration) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Searching,
            pane: Pane::Results,
            search_input: String::new(),
            language_index: 0,
            sort: SortKey::default(),
            page: 1,
            phase: SearchPhase::Idle,
            results: Vec::new(),
            results_state: ListState::default(),
            bookmarks: Vec::new(),
            bookmarks_state: ListState::default(),
            tag_filter: String::new(),
            edit_buffer: String::new(),
            status: None,
            editing_id: None,
            latest_seq: 0,
            debounce,
            pending_saves: HashMap::new(),
            pending_creates: HashSet::new(),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level: StatusLevel::Info,
        });
    }

    fn warn(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level: StatusLevel::Warning,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level: StatusLevel::Error,
        });
    }

    // ---- search -------------------------------------------------------

    pub fn language(&self) -> LanguageFilter {
        match LANGUAGE_CHOICES.get(self.language_index) {
            Some(lang) if self.language_index > 0 => LanguageFilter::Language(lang.to_string()),
            _ => LanguageFilter::All,
        }
    }

    pub fn current_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.search_input.clone(),
            language: self.language(),
            sort: self.sort,
            page: self.page,
        }
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Issue a search for the current controls, unless the query is blank
    fn begin_search(&mut self) -> Option<Command> {
        let query = self.current_query();
        if query.is_blank() {
            return None;
        }

        self.latest_seq += 1;
        self.phase = SearchPhase::Loading;
        debug!("Issuing search #{} for '{}'", self.latest_seq, query.query);
        Some(Command::Search {
            seq: self.latest_seq,
            query,
        })
    }

    /// Enter in the search box. A new query starts again from page one.
    pub fn submit_search(&mut self) -> Option<Command> {
        self.input_mode = InputMode::Normal;
        self.pane = Pane::Results;
        self.page = 1;
        self.begin_search()
    }

    pub fn next_page(&mut self) -> Option<Command> {
        self.page += 1;
        self.begin_search()
    }

    /// No-op on page one
    pub fn previous_page(&mut self) -> Option<Command> {
        if self.page <= 1 {
            return None;
        }
        self.page -= 1;
        self.begin_search()
    }

    pub fn can_go_back(&self) -> bool {
        self.page > 1
    }

    pub fn cycle_language(&mut self, forward: bool) -> Option<Command> {
        let len = LANGUAGE_CHOICES.len();
        self.language_index = if forward {
            (self.language_index + 1) % len
        } else {
            (self.language_index + len - 1) % len
        };
        self.begin_search()
    }

    pub fn toggle_sort(&mut self) -> Option<Command> {
        self.sort = self.sort.toggle();
        self.begin_search()
    }

    // ---- background results ------------------------------------------

    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::SearchFinished { seq, outcome } => self.finish_search(seq, outcome),
            AppEvent::BookmarksLoaded(Ok(mut bookmarks)) => {
                debug!("Loaded {} bookmarks", bookmarks.len());
                // Unsaved local edits win over what the server still has
                for bookmark in &mut bookmarks {
                    if let Some(pending) = self.pending_saves.get(&bookmark.id) {
                        apply_patch(bookmark, &pending.patch);
                    }
                }
                self.bookmarks = bookmarks;
                self.clamp_bookmark_selection();
            }
            AppEvent::BookmarksLoaded(Err(e)) => {
                self.error(format!("Failed to load bookmarks: {}", e));
            }
            AppEvent::BookmarkCreated { repo_id, result } => {
                self.pending_creates.remove(&repo_id);
                match result {
                    Ok(bookmark) => {
                        self.info(format!("Bookmarked {}", bookmark.repo.view().full_name));
                        self.bookmarks.insert(0, bookmark);
                        self.clamp_bookmark_selection();
                    }
                    Err(e) => self.error(format!("Failed to bookmark: {}", e)),
                }
            }
            AppEvent::BookmarkDeleted { id, result } => match result {
                Ok(()) => {
                    self.bookmarks.retain(|b| b.id != id);
                    self.pending_saves.remove(&id);
                    self.clamp_bookmark_selection();
                    self.info("Bookmark deleted");
                }
                Err(e) => self.error(format!("Failed to delete bookmark: {}", e)),
            },
            AppEvent::AnnotationsSaved { id, result } => match result {
                // A newer local edit is still waiting; keep it
                Ok(_) if self.pending_saves.contains_key(&id) => {}
                Ok(saved) => {
                    if let Some(bookmark) = self.bookmarks.iter_mut().find(|b| b.id == id) {
                        bookmark.note = saved.note;
                        bookmark.tags = saved.tags;
                    }
                }
                Err(e) => self.error(format!("Failed to save note/tags: {}", e)),
            },
        }
    }

    fn finish_search(&mut self, seq: u64, outcome: SearchOutcome) {
        if seq != self.latest_seq {
            debug!("Dropping stale search #{} (latest is #{})", seq, self.latest_seq);
            return;
        }

        match outcome.warning {
            Some(warning) => {
                self.phase = SearchPhase::Failed;
                self.results.clear();
                self.results_state.select(None);
                self.warn(format!("Search failed: {}", warning));
            }
            None => {
                self.phase = SearchPhase::Displayed;
                self.results = outcome.repositories;
                self.results_state
                    .select(if self.results.is_empty() { None } else { Some(0) });
                if matches!(self.status, Some(StatusMessage { level: StatusLevel::Warning, .. })) {
                    self.status = None;
                }
            }
        }
    }

    // ---- bookmarks ----------------------------------------------------

    pub fn is_bookmarked(&self, repo_id: u64) -> bool {
        self.bookmarks.iter().any(|b| b.repo.view().id == repo_id)
    }

    pub fn selected_repository(&self) -> Option<&Repository> {
        self.results.get(self.results_state.selected()?)
    }

    /// Bookmark the highlighted result. Already bookmarked is a no-op.
    pub fn bookmark_selected(&mut self) -> Option<Command> {
        let repo = self.selected_repository()?.clone();

        if self.is_bookmarked(repo.id) || self.pending_creates.contains(&repo.id) {
            self.info(format!("{} is already bookmarked", repo.full_name));
            return None;
        }

        self.pending_creates.insert(repo.id);
        Some(Command::CreateBookmark(repo))
    }

    /// Bookmarks passing the tag filter, in list order
    pub fn visible_bookmarks(&self) -> Vec<&Bookmark> {
        self.bookmarks
            .iter()
            .filter(|b| matches_tag_filter(b, &self.tag_filter))
            .collect()
    }

    pub fn selected_bookmark(&self) -> Option<&Bookmark> {
        let index = self.bookmarks_state.selected()?;
        self.visible_bookmarks().get(index).copied()
    }

    pub fn delete_selected_bookmark(&mut self) -> Option<Command> {
        let id = self.selected_bookmark()?.id.clone();
        Some(Command::DeleteBookmark(id))
    }

    fn clamp_bookmark_selection(&mut self) {
        let len = self.visible_bookmarks().len();
        let selected = match self.bookmarks_state.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.bookmarks_state.select(selected);
    }

    // ---- tag filter ---------------------------------------------------

    pub fn start_tag_filter(&mut self) {
        self.pane = Pane::Bookmarks;
        self.input_mode = InputMode::FilteringTags;
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.tag_filter.push(c);
        self.bookmarks_state.select(None);
        self.clamp_bookmark_selection();
    }

    pub fn pop_filter_char(&mut self) {
        self.tag_filter.pop();
        self.bookmarks_state.select(None);
        self.clamp_bookmark_selection();
    }

    // ---- note and tag editing ----------------------------------------

    pub fn start_note_edit(&mut self) {
        let Some((id, note)) = self
            .selected_bookmark()
            .map(|b| (b.id.clone(), b.note.clone().unwrap_or_default()))
        else {
            return;
        };
        self.edit_buffer = note;
        self.editing_id = Some(id);
        self.input_mode = InputMode::EditingNote;
    }

    pub fn start_tags_edit(&mut self) {
        let Some((id, tags)) = self
            .selected_bookmark()
            .map(|b| (b.id.clone(), b.tags.join(", ")))
        else {
            return;
        };
        self.edit_buffer = tags;
        self.editing_id = Some(id);
        self.input_mode = InputMode::EditingTags;
    }

    pub fn push_edit_char(&mut self, c: char, now: Instant) {
        self.edit_buffer.push(c);
        self.apply_edit(now);
    }

    pub fn pop_edit_char(&mut self, now: Instant) {
        if self.edit_buffer.pop().is_some() {
            self.apply_edit(now);
        }
    }

    pub fn finish_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.editing_id = None;
        self.edit_buffer.clear();
        self.clamp_bookmark_selection();
    }

    /// Show the edit right away, save it once typing pauses
    fn apply_edit(&mut self, now: Instant) {
        let Some(id) = self.editing_id.clone() else {
            return;
        };

        let patch = match self.input_mode {
            InputMode::EditingNote => AnnotationPatch {
                note: Some(self.edit_buffer.clone()),
                tags: None,
            },
            InputMode::EditingTags => AnnotationPatch {
                note: None,
                tags: Some(parse_tags(&self.edit_buffer)),
            },
            _ => return,
        };

        let Some(bookmark) = self.bookmarks.iter_mut().find(|b| b.id == id) else {
            return;
        };
        apply_patch(bookmark, &patch);

        self.schedule_save(id, patch, now);
    }

    fn schedule_save(&mut self, id: String, patch: AnnotationPatch, now: Instant) {
        let due = now + self.debounce;
        let pending = self.pending_saves.entry(id).or_insert_with(|| PendingSave {
            patch: AnnotationPatch::default(),
            due,
        });
        if patch.note.is_some() {
            pending.patch.note = patch.note;
        }
        if patch.tags.is_some() {
            pending.patch.tags = patch.tags;
        }
        pending.due = due;
    }

    pub fn has_pending_save(&self, id: &str) -> bool {
        self.pending_saves.contains_key(id)
    }

    /// Saves whose quiet period has passed
    pub fn take_due_saves(&mut self, now: Instant) -> Vec<Command> {
        let due: Vec<String> = self
            .pending_saves
            .iter()
            .filter(|(_, pending)| pending.due <= now)
            .map(|(id, _)| id.clone())
            .collect();

        due.into_iter()
            .filter_map(|id| {
                let pending = self.pending_saves.remove(&id)?;
                Some(Command::SaveAnnotations {
                    id,
                    patch: pending.patch,
                })
            })
            .collect()
    }

    /// Everything still waiting, regardless of the debounce. Used on exit.
    pub fn flush_saves(&mut self) -> Vec<Command> {
        self.pending_saves
            .drain()
            .map(|(id, pending)| Command::SaveAnnotations {
                id,
                patch: pending.patch,
            })
            .collect()
    }

    // ---- navigation ---------------------------------------------------

    pub fn switch_pane(&mut self) {
        self.pane = match self.pane {
            Pane::Results => Pane::Bookmarks,
            Pane::Bookmarks => Pane::Results,
        };
        if self.pane == Pane::Bookmarks {
            self.clamp_bookmark_selection();
        }
    }

    pub fn select_next(&mut self) {
        let (len, state) = self.focused_list();
        if len == 0 {
            return;
        }
        let next = state.selected().map_or(0, |i| (i + 1).min(len - 1));
        state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        let (len, state) = self.focused_list();
        if len == 0 {
            return;
        }
        let prev = state.selected().map_or(0, |i| i.saturating_sub(1));
        state.select(Some(prev));
    }

    fn focused_list(&mut self) -> (usize, &mut ListState) {
        match self.pane {
            Pane::Results => (self.results.len(), &mut self.results_state),
            Pane::Bookmarks => {
                let len = self.visible_bookmarks().len();
                (len, &mut self.bookmarks_state)
            }
        }
    }

    // ---- aggregation --------------------------------------------------

    pub fn results_stats(&self) -> RepoStats<'_, Repository> {
        summarize(&self.results)
    }

    pub fn bookmark_stats(&self) -> RepoStats<'_, Bookmark> {
        summarize(&self.bookmarks)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(Duration::from_millis(750))
    }
}

/// Case-insensitive substring match over the tags joined by ", "
pub fn matches_tag_filter(bookmark: &Bookmark, filter: &str) -> bool {
    if filter.is_empty() {
        return true;
    }
    bookmark
        .tags
        .join(", ")
        .to_lowercase()
        .contains(&filter.to_lowercase())
}

/// What the backend will store for `patch`, applied to the local copy
fn apply_patch(bookmark: &mut Bookmark, patch: &AnnotationPatch) {
    if let Some(note) = &patch.note {
        let trimmed = note.trim();
        bookmark.note = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }
    if let Some(tags) = &patch.tags {
        bookmark.tags = tags.clone();
    }
}

/// "ai, frontend,," -> ["ai", "frontend"]
pub fn parse_tags(input: &str) -> Vec<String> {
    normalize_tags(input.split(',').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use repomark_core::RepoSnapshot;

    fn repo(id: u64, stars: u32, language: Option<&str>) -> Repository {
        Repository {
            id,
            name: format!("repo-{}", id),
            full_name: format!("octo/repo-{}", id),
            stars,
            language: language.map(str::to_string),
            ..Repository::default()
        }
    }

    fn bookmark(id: &str, repo_id: u64, tags: &[&str]) -> Bookmark {
        Bookmark {
            id: id.to_string(),
            user: "alice".to_string(),
            repo: RepoSnapshot::from(repo(repo_id, 10, Some("Rust"))),
            last_seen: Utc::now(),
            note: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn displayed(repos: Vec<Repository>) -> SearchOutcome {
        SearchOutcome {
            repositories: repos,
            warning: None,
        }
    }

    fn app_with_query(query: &str) -> App {
        let mut app = App::default();
        app.search_input = query.to_string();
        app
    }

    #[test]
    fn test_blank_query_stays_idle() {
        let mut app = app_with_query("   ");
        assert_eq!(app.submit_search(), None);
        assert_eq!(app.phase, SearchPhase::Idle);
        assert_eq!(app.latest_seq(), 0);
    }

    #[test]
    fn test_search_lifecycle() {
        let mut app = app_with_query("tetris");
        let Some(Command::Search { seq, query }) = app.submit_search() else {
            panic!("expected a search");
        };
        assert_eq!(app.phase, SearchPhase::Loading);
        assert_eq!(query.page, 1);
        assert_eq!(query.language, LanguageFilter::All);

        app.apply(AppEvent::SearchFinished {
            seq,
            outcome: displayed(vec![repo(1, 5, None)]),
        });
        assert_eq!(app.phase, SearchPhase::Displayed);
        assert_eq!(app.selected_repository().map(|r| r.id), Some(1));
    }

    #[test]
    fn test_failed_search_is_empty_with_warning() {
        let mut app = app_with_query("tetris");
        app.submit_search();
        app.apply(AppEvent::SearchFinished {
            seq: app.latest_seq(),
            outcome: SearchOutcome {
                repositories: vec![],
                warning: Some("Status 502".into()),
            },
        });

        assert_eq!(app.phase, SearchPhase::Failed);
        assert!(app.results.is_empty());
        assert_eq!(app.status.as_ref().map(|s| s.level), Some(StatusLevel::Warning));
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let mut app = app_with_query("tetris");
        let first = match app.submit_search() {
            Some(Command::Search { seq, .. }) => seq,
            other => panic!("unexpected {:?}", other),
        };
        let second = match app.next_page() {
            Some(Command::Search { seq, .. }) => seq,
            other => panic!("unexpected {:?}", other),
        };
        assert!(second > first);

        app.apply(AppEvent::SearchFinished {
            seq: second,
            outcome: displayed(vec![repo(2, 1, None)]),
        });
        // The slower first page lands afterwards
        app.apply(AppEvent::SearchFinished {
            seq: first,
            outcome: displayed(vec![repo(1, 1, None)]),
        });

        let ids: Vec<u64> = app.results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(app.phase, SearchPhase::Displayed);
    }

    #[test]
    fn test_previous_page_disabled_on_first_page() {
        let mut app = app_with_query("tetris");
        app.submit_search();
        assert!(!app.can_go_back());
        assert_eq!(app.previous_page(), None);
        assert_eq!(app.page, 1);

        app.next_page();
        assert!(matches!(
            app.previous_page(),
            Some(Command::Search { ref query, .. }) if query.page == 1
        ));
    }

    #[test]
    fn test_language_and_sort_changes_search_again() {
        let mut app = app_with_query("tetris");
        match app.cycle_language(true) {
            Some(Command::Search { query, .. }) => {
                assert_eq!(query.language, LanguageFilter::Language("JavaScript".into()))
            }
            other => panic!("unexpected {:?}", other),
        }
        match app.cycle_language(false) {
            Some(Command::Search { query, .. }) => assert_eq!(query.language, LanguageFilter::All),
            other => panic!("unexpected {:?}", other),
        }
        match app.toggle_sort() {
            Some(Command::Search { query, .. }) => assert_eq!(query.sort, SortKey::Updated),
            other => panic!("unexpected {:?}", other),
        }

        let mut idle = App::default();
        assert_eq!(idle.toggle_sort(), None);
        assert_eq!(idle.sort, SortKey::Updated);
    }

    #[test]
    fn test_bookmarking_twice_is_a_no_op() {
        let mut app = app_with_query("tetris");
        app.submit_search();
        app.apply(AppEvent::SearchFinished {
            seq: app.latest_seq(),
            outcome: displayed(vec![repo(7, 5, None)]),
        });

        assert!(matches!(app.bookmark_selected(), Some(Command::CreateBookmark(ref r)) if r.id == 7));
        // still in flight
        assert_eq!(app.bookmark_selected(), None);

        app.apply(AppEvent::BookmarkCreated {
            repo_id: 7,
            result: Ok(bookmark("b1", 7, &[])),
        });
        assert!(app.is_bookmarked(7));
        assert_eq!(app.bookmark_selected(), None);
        assert!(app.status.unwrap().text.contains("already bookmarked"));
    }

    #[test]
    fn test_failed_create_allows_retry() {
        let mut app = app_with_query("tetris");
        app.submit_search();
        app.apply(AppEvent::SearchFinished {
            seq: app.latest_seq(),
            outcome: displayed(vec![repo(7, 5, None)]),
        });
        app.bookmark_selected();
        app.apply(AppEvent::BookmarkCreated {
            repo_id: 7,
            result: Err("offline".into()),
        });
        assert!(app.bookmark_selected().is_some());
    }

    #[test]
    fn test_tag_filter() {
        let mut app = App::default();
        app.apply(AppEvent::BookmarksLoaded(Ok(vec![
            bookmark("a", 1, &["AI", "Frontend"]),
            bookmark("b", 2, &["backend"]),
            bookmark("c", 3, &[]),
        ])));
        assert_eq!(app.visible_bookmarks().len(), 3);

        app.start_tag_filter();
        for c in "front".chars() {
            app.push_filter_char(c);
        }
        let ids: Vec<&str> = app.visible_bookmarks().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(app.selected_bookmark().map(|b| b.id.as_str()), Some("a"));

        // the joined form matches across the separator
        assert!(matches_tag_filter(&bookmark("d", 4, &["ai", "web"]), "I, W"));
    }

    #[test]
    fn test_note_edit_is_local_then_debounced() {
        let mut app = App::new(Duration::from_millis(750));
        app.apply(AppEvent::BookmarksLoaded(Ok(vec![bookmark("a", 1, &[])])));
        app.pane = Pane::Bookmarks;
        app.start_note_edit();
        assert_eq!(app.input_mode, InputMode::EditingNote);

        let t0 = Instant::now();
        app.push_edit_char('h', t0);
        app.push_edit_char('i', t0 + Duration::from_millis(500));

        assert_eq!(app.bookmarks[0].note.as_deref(), Some("hi"));
        assert!(app.take_due_saves(t0 + Duration::from_millis(1000)).is_empty());

        let saves = app.take_due_saves(t0 + Duration::from_millis(1300));
        assert_eq!(
            saves,
            vec![Command::SaveAnnotations {
                id: "a".into(),
                patch: AnnotationPatch {
                    note: Some("hi".into()),
                    tags: None
                },
            }]
        );
        assert!(!app.has_pending_save("a"));
    }

    #[test]
    fn test_note_and_tags_coalesce_into_one_save() {
        let mut app = App::default();
        app.apply(AppEvent::BookmarksLoaded(Ok(vec![bookmark("a", 1, &[])])));
        app.pane = Pane::Bookmarks;
        let now = Instant::now();

        app.start_note_edit();
        app.push_edit_char('x', now);
        app.finish_edit();
        app.start_tags_edit();
        for c in "ai, ,web".chars() {
            app.push_edit_char(c, now);
        }
        assert_eq!(app.bookmarks[0].tags, vec!["ai".to_string(), "web".to_string()]);

        let saves = app.flush_saves();
        assert_eq!(saves.len(), 1);
        match &saves[0] {
            Command::SaveAnnotations { patch, .. } => {
                assert_eq!(patch.note.as_deref(), Some("x"));
                assert_eq!(patch.tags.as_deref(), Some(&["ai".to_string(), "web".to_string()][..]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reload_keeps_unsaved_edits() {
        let mut app = App::default();
        app.apply(AppEvent::BookmarksLoaded(Ok(vec![bookmark("a", 1, &["old"])])));
        app.pane = Pane::Bookmarks;
        let now = Instant::now();

        app.start_tags_edit();
        app.edit_buffer.clear();
        for c in "new, tags".chars() {
            app.push_edit_char(c, now);
        }
        app.finish_edit();

        // the server still has the old tags while the save is pending
        app.apply(AppEvent::BookmarksLoaded(Ok(vec![
            bookmark("a", 1, &["old"]),
            bookmark("b", 2, &["other"]),
        ])));

        assert_eq!(app.bookmarks[0].tags, vec!["new".to_string(), "tags".to_string()]);
        assert_eq!(app.bookmarks[1].tags, vec!["other".to_string()]);
        assert!(app.has_pending_save("a"));
    }

    #[test]
    fn test_delete_removes_after_confirmation() {
        let mut app = App::default();
        app.apply(AppEvent::BookmarksLoaded(Ok(vec![
            bookmark("a", 1, &[]),
            bookmark("b", 2, &[]),
        ])));
        app.pane = Pane::Bookmarks;
        app.select_next();

        assert_eq!(app.delete_selected_bookmark(), Some(Command::DeleteBookmark("b".into())));
        assert_eq!(app.bookmarks.len(), 2);

        app.apply(AppEvent::BookmarkDeleted {
            id: "b".into(),
            result: Ok(()),
        });
        assert_eq!(app.bookmarks.len(), 1);
        assert_eq!(app.selected_bookmark().map(|b| b.id.as_str()), Some("a"));
    }

    #[test]
    fn test_stats_follow_state() {
        let mut app = app_with_query("x");
        app.submit_search();
        app.apply(AppEvent::SearchFinished {
            seq: app.latest_seq(),
            outcome: displayed(vec![
                repo(1, 10, Some("Go")),
                repo(2, 30, Some("Go")),
                repo(3, 5, None),
            ]),
        });

        let stats = app.results_stats();
        assert_eq!(stats.total_stars, 45);
        assert_eq!(stats.top_repository.map(|r| r.id), Some(2));
        assert_eq!(stats.percentage_of("Go"), Some(66.67));
        assert!(app.bookmark_stats().is_empty());
    }
}
