// UI rendering logic
use crate::app::{App, InputMode, Pane, SearchPhase, StatusLevel};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use repomark_core::analytics::{bar_color, hex_to_rgb, pie_color, LanguageBucket};

const SELECTED_BG: Color = Color::Rgb(68, 71, 90);

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with search controls
            Constraint::Length(3), // Search input
            Constraint::Min(10),   // Panes
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_search_input(frame, app, chunks[1]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    // Adaptive split: narrow screens give the lists more room
    let list_pct = if frame.area().width < 100 { 60 } else { 55 };
    let columns = [
        Constraint::Percentage(list_pct),
        Constraint::Percentage(100 - list_pct),
    ];
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(columns)
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(columns)
        .split(rows[1]);

    render_results_list(frame, app, top[0]);
    render_language_chart(frame, app, top[1]);
    render_bookmarks_list(frame, app, bottom[0]);
    render_bookmark_analytics(frame, app, bottom[1]);

    render_status_bar(frame, app, chunks[3]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![Span::styled(
        "★ Repomark",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(logo, header_chunks[0]);

    let prev_style = if app.can_go_back() {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let controls = Line::from(vec![
        Span::styled(" [l] ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            app.language().label().to_string(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("[s] ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.sort.label(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled("[p] ◀ Prev", prev_style),
        Span::styled(
            format!("  Page {}  ", app.page),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled("Next ▶ [n]", Style::default().fg(Color::White)),
    ]);

    let controls_widget = Paragraph::new(controls)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    frame.render_widget(controls_widget, header_chunks[1]);
}

fn render_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let input_style = match app.input_mode {
        InputMode::Searching => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    };

    let input = Paragraph::new(app.search_input.as_str())
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Search GitHub repositories (/ to edit, ENTER to search)")
                .border_style(input_style),
        );

    frame.render_widget(input, area);

    if app.input_mode == InputMode::Searching {
        frame.set_cursor_position((
            area.x + app.search_input.chars().count() as u16 + 1,
            area.y + 1,
        ));
    }
}

fn pane_border(app: &App, pane: Pane) -> Style {
    if app.pane == pane {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn render_results_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = format!(" Results ({}) ", app.results.len());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(pane_border(app, Pane::Results));

    let placeholder = match app.phase {
        SearchPhase::Idle => Some(("Type a query and press ENTER", Color::DarkGray)),
        SearchPhase::Loading => Some(("Searching...", Color::Cyan)),
        SearchPhase::Failed => Some(("No results", Color::DarkGray)),
        SearchPhase::Displayed if app.results.is_empty() => Some(("No results", Color::DarkGray)),
        SearchPhase::Displayed => None,
    };
    if let Some((text, color)) = placeholder {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                text,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
        ])
        .block(block)
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let desc_max = area.width.saturating_sub(8) as usize;
    let items: Vec<ListItem> = app
        .results
        .iter()
        .map(|repo| {
            let marker = if app.is_bookmarked(repo.id) {
                Span::styled("★ ", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("☆ ")
            };

            let mut lines = vec![Line::from(vec![
                marker,
                Span::styled(
                    repo.full_name.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  ⭐ {}", format_number(repo.stars)),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    format!("  {}", repo.language_or_unknown()),
                    Style::default().fg(Color::Magenta),
                ),
            ])];

            if let Some(desc) = repo.description.as_deref().filter(|d| !d.is_empty()) {
                lines.push(Line::from(Span::styled(
                    format!("  {}", truncate(desc, desc_max)),
                    Style::default().fg(Color::Gray),
                )));
            }

            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut app.results_state);
}

fn render_language_chart(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.results_stats();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Languages (% of results) ");

    if stats.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "Search to see the language mix",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = stats
        .languages
        .iter()
        .enumerate()
        .map(|(i, bucket)| {
            let (r, g, b) = bar_color(i).to_rgb();
            Bar::default()
                .label(Line::from(bucket.language.clone()))
                // hundredths of a percent, so 33.33 stays distinguishable
                .value((bucket.percentage * 100.0).round() as u64)
                .text_value(format!("{:.2}%", bucket.percentage))
                .style(Style::default().fg(Color::Rgb(r, g, b)))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(100 * 100)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

fn render_bookmarks_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let visible = app.visible_bookmarks();
    let mut title = format!(" Bookmarks ({}/{}) ", visible.len(), app.bookmarks.len());
    if !app.tag_filter.is_empty() {
        title.push_str(&format!("[tag: {}] ", app.tag_filter));
    }

    let items: Vec<ListItem> = if app.bookmarks.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "No bookmarks found. Press 'b' on a result to add one.",
            Style::default().fg(Color::Gray),
        )))]
    } else {
        visible
            .iter()
            .map(|bookmark| {
                let mut lines = vec![Line::from(vec![
                    Span::styled(
                        bookmark.repo.view().full_name.clone(),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  ⭐ {}", format_number(bookmark.repo.view().stars)),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::styled(
                        format!("  {}", bookmark.last_seen.format("%Y-%m-%d %H:%M")),
                        Style::default().fg(Color::DarkGray),
                    ),
                ])];

                if !bookmark.tags.is_empty() {
                    let mut spans = vec![Span::raw("  ")];
                    for tag in &bookmark.tags {
                        spans.push(Span::styled(
                            format!(" {} ", tag),
                            Style::default().fg(Color::Black).bg(Color::Rgb(137, 180, 250)),
                        ));
                        spans.push(Span::raw(" "));
                    }
                    lines.push(Line::from(spans));
                }
                if let Some(note) = &bookmark.note {
                    lines.push(Line::from(Span::styled(
                        format!("  📝 {}", note),
                        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
                    )));
                }

                ListItem::new(lines)
            })
            .collect()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(pane_border(app, Pane::Bookmarks)),
        )
        .highlight_style(Style::default().bg(SELECTED_BG).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut app.bookmarks_state);
}

fn render_bookmark_analytics(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app.bookmark_stats();
    let mut lines = vec![
        Line::from(vec![
            Span::raw("Bookmarks:     "),
            Span::styled(
                stats.total_count.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw("Total stars:   "),
            Span::styled(
                format_number_u64(stats.total_stars),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    if let Some(top) = stats.top_repository {
        lines.push(Line::from(vec![
            Span::raw("Most starred:  "),
            Span::styled(top.repo.view().full_name.clone(), Style::default().fg(Color::Green)),
            Span::styled(
                format!(" (⭐ {})", format_number(top.repo.view().stars)),
                Style::default().fg(Color::Yellow),
            ),
        ]));
    }

    if !stats.languages.is_empty() {
        lines.push(Line::from(""));
        lines.extend(stats.languages.iter().enumerate().map(legend_line));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Bookmark analytics "))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn legend_line((index, bucket): (usize, &LanguageBucket)) -> Line<'static> {
    let color = hex_to_rgb(pie_color(index))
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::White);

    Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::raw(format!(
            "{}: {} ({:.2}%)",
            bucket.language, bucket.count, bucket.percentage
        )),
    ])
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let prompt = match app.input_mode {
        InputMode::EditingNote => Some("NOTE"),
        InputMode::EditingTags => Some("TAGS"),
        InputMode::FilteringTags => Some("FILTER"),
        _ => None,
    };

    if let Some(prompt) = prompt {
        let text = if app.input_mode == InputMode::FilteringTags {
            app.tag_filter.as_str()
        } else {
            app.edit_buffer.as_str()
        };
        let label = format!("{} > ", prompt);
        let cursor_x = area.x + (label.chars().count() + text.chars().count()) as u16;
        let line = Line::from(vec![
            Span::styled(label, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(text.to_string()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), area.y));
        return;
    }

    let span = match &app.status {
        Some(status) => {
            let color = match status.level {
                StatusLevel::Info => Color::Green,
                StatusLevel::Warning => Color::Yellow,
                StatusLevel::Error => Color::Red,
            };
            Span::styled(status.text.clone(), Style::default().fg(color))
        }
        None => match app.input_mode {
            InputMode::Searching => Span::styled(
                "SEARCH MODE | ENTER: search | ESC: normal mode",
                Style::default().fg(Color::Yellow),
            ),
            _ => match app.pane {
                Pane::Results => Span::raw(
                    "j/k: navigate | TAB: bookmarks | b: bookmark | l/L: language | s: sort | n/p: page | /: search | q: quit",
                ),
                Pane::Bookmarks => Span::raw(
                    "j/k: navigate | TAB: results | e: note | t: tags | f: filter tags | d: delete | q: quit",
                ),
            },
        },
    };

    frame.render_widget(Paragraph::new(Line::from(span)), area);
}

fn format_number(num: u32) -> String {
    format_number_u64(num as u64)
}

fn format_number_u64(num: u64) -> String {
    if num >= 1_000_000 {
        format!("{:.1}M", num as f64 / 1_000_000.0)
    } else if num >= 1_000 {
        format!("{:.1}k", num as f64 / 1_000.0)
    } else {
        num.to_string()
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
