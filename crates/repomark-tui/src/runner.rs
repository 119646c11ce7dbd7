// TUI event loop and terminal management
use crate::app::{App, AppEvent, Command, InputMode, Pane};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use repomark_api::BookmarkClient;
use repomark_core::{Bookmark, Repository, RepositorySearch};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const TICK: Duration = Duration::from_millis(50);

/// What the front end talks to
#[derive(Clone)]
pub struct Services {
    pub search: Arc<RepositorySearch>,
    pub bookmarks: BookmarkClient,
}

pub async fn run_tui(mut app: App, services: Services) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    dispatch(&services, &tx, Command::LoadBookmarks);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &services, &tx, &mut rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Edits still inside their debounce window get saved before exit
    let saves: Vec<JoinHandle<()>> = app
        .flush_saves()
        .into_iter()
        .map(|command| dispatch(&services, &tx, command))
        .collect();
    if !saves.is_empty() {
        info!("Saving {} pending annotation edits", saves.len());
    }
    for handle in saves {
        if let Err(e) = handle.await {
            warn!("Annotation save did not finish: {}", e);
        }
    }

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    services: &Services,
    tx: &UnboundedSender<AppEvent>,
    rx: &mut UnboundedReceiver<AppEvent>,
) -> anyhow::Result<()> {
    loop {
        while let Ok(event) = rx.try_recv() {
            app.apply(event);
        }
        for command in app.take_due_saves(Instant::now()) {
            dispatch(services, tx, command);
        }

        terminal.draw(|f| crate::ui::render(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    for command in handle_key(app, key, Instant::now()) {
                        dispatch(services, tx, command);
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        // Let spawned work make progress on single-threaded runtimes too
        tokio::task::yield_now().await;
    }
}

/// Translate one key press into state changes plus any background work
pub fn handle_key(app: &mut App, key: KeyEvent, now: Instant) -> Vec<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return Vec::new();
    }

    let command = match app.input_mode {
        InputMode::Searching => match key.code {
            KeyCode::Enter => app.submit_search(),
            KeyCode::Char(c) => {
                app.search_input.push(c);
                None
            }
            KeyCode::Backspace => {
                app.search_input.pop();
                None
            }
            KeyCode::Esc => {
                app.input_mode = InputMode::Normal;
                None
            }
            _ => None,
        },
        InputMode::EditingNote | InputMode::EditingTags => {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => app.finish_edit(),
                KeyCode::Char(c) => app.push_edit_char(c, now),
                KeyCode::Backspace => app.pop_edit_char(now),
                _ => {}
            }
            None
        }
        InputMode::FilteringTags => {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => app.input_mode = InputMode::Normal,
                KeyCode::Char(c) => app.push_filter_char(c),
                KeyCode::Backspace => app.pop_filter_char(),
                _ => {}
            }
            None
        }
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => {
                app.quit();
                None
            }
            KeyCode::Char('/') => {
                app.input_mode = InputMode::Searching;
                None
            }
            KeyCode::Tab => {
                app.switch_pane();
                None
            }
            KeyCode::Char('j') | KeyCode::Down => {
                app.select_next();
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                app.select_previous();
                None
            }
            KeyCode::Char('n') | KeyCode::Right => app.next_page(),
            KeyCode::Char('p') | KeyCode::Left => app.previous_page(),
            KeyCode::Char('l') => app.cycle_language(true),
            KeyCode::Char('L') => app.cycle_language(false),
            KeyCode::Char('s') => app.toggle_sort(),
            KeyCode::Char('r') => {
                app.info("Reloading bookmarks");
                Some(Command::LoadBookmarks)
            }
            KeyCode::Char('b') if app.pane == Pane::Results => app.bookmark_selected(),
            KeyCode::Char('e') if app.pane == Pane::Bookmarks => {
                app.start_note_edit();
                None
            }
            KeyCode::Char('t') if app.pane == Pane::Bookmarks => {
                app.start_tags_edit();
                None
            }
            KeyCode::Char('f') if app.pane == Pane::Bookmarks => {
                app.start_tag_filter();
                None
            }
            KeyCode::Char('d') | KeyCode::Delete if app.pane == Pane::Bookmarks => {
                app.delete_selected_bookmark()
            }
            _ => None,
        },
    };

    command.into_iter().collect()
}

/// Run a command on the runtime; its result comes back through `tx`
fn dispatch(services: &Services, tx: &UnboundedSender<AppEvent>, command: Command) -> JoinHandle<()> {
    let tx = tx.clone();

    match command {
        Command::Search { seq, query } => {
            let search = Arc::clone(&services.search);
            tokio::spawn(async move {
                let outcome = search.search(&query).await;
                let _ = tx.send(AppEvent::SearchFinished { seq, outcome });
            })
        }
        Command::LoadBookmarks => {
            let client = services.bookmarks.clone();
            tokio::spawn(async move {
                let result = client.list::<Bookmark>().await.map_err(|e| {
                    warn!("Loading bookmarks failed: {}", e);
                    e.to_string()
                });
                let _ = tx.send(AppEvent::BookmarksLoaded(result));
            })
        }
        Command::CreateBookmark(repo) => {
            let client = services.bookmarks.clone();
            tokio::spawn(async move {
                let result = client
                    .create::<Repository, Bookmark>(&repo)
                    .await
                    .map_err(|e| {
                        warn!("Bookmarking {} failed: {}", repo.full_name, e);
                        e.to_string()
                    });
                let _ = tx.send(AppEvent::BookmarkCreated {
                    repo_id: repo.id,
                    result,
                });
            })
        }
        Command::DeleteBookmark(id) => {
            let client = services.bookmarks.clone();
            tokio::spawn(async move {
                let result = client.delete(&id).await.map_err(|e| {
                    warn!("Deleting bookmark {} failed: {}", id, e);
                    e.to_string()
                });
                let _ = tx.send(AppEvent::BookmarkDeleted { id, result });
            })
        }
        Command::SaveAnnotations { id, patch } => {
            let client = services.bookmarks.clone();
            tokio::spawn(async move {
                let result = client
                    .update_annotations::<Bookmark>(&id, &patch)
                    .await
                    .map_err(|e| {
                        warn!("Saving annotations for {} failed: {}", id, e);
                        e.to_string()
                    });
                let _ = tx.send(AppEvent::AnnotationsSaved { id, result });
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::SearchPhase;

    fn press(app: &mut App, code: KeyCode) -> Vec<Command> {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE), Instant::now())
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_typing_and_enter_issues_search() {
        let mut app = App::default();
        type_str(&mut app, "tetris");
        let commands = press(&mut app, KeyCode::Enter);

        assert_eq!(commands.len(), 1);
        assert!(matches!(&commands[0], Command::Search { query, .. } if query.query == "tetris"));
        assert_eq!(app.phase, SearchPhase::Loading);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_q_in_search_box_is_text() {
        let mut app = App::default();
        type_str(&mut app, "q");
        assert!(!app.should_quit);
        assert_eq!(app.search_input, "q");

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let mut app = App::default();
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_paging_keys() {
        let mut app = App::default();
        type_str(&mut app, "rust");
        press(&mut app, KeyCode::Enter);

        assert!(press(&mut app, KeyCode::Char('p')).is_empty());
        let next = press(&mut app, KeyCode::Char('n'));
        assert!(matches!(&next[0], Command::Search { query, .. } if query.page == 2));
    }

    #[test]
    fn test_bookmark_pane_keys_need_focus() {
        let mut app = App::default();
        press(&mut app, KeyCode::Esc);
        // 'd' on the results pane does nothing
        assert!(press(&mut app, KeyCode::Char('d')).is_empty());

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.input_mode, InputMode::FilteringTags);
        type_str(&mut app, "ai");
        assert_eq!(app.tag_filter, "ai");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_reload_bookmarks() {
        let mut app = App::default();
        press(&mut app, KeyCode::Esc);
        assert_eq!(press(&mut app, KeyCode::Char('r')), vec![Command::LoadBookmarks]);
    }
}
