use crate::app::{App, Focus};
use crate::github::{RepoSearch, Repository};
use crate::storage::{ActiveTopics, Topic};
use crate::util::{compact_count, format_timestamp, strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use super::status::spinner;

/// Render the repository list panel
pub fn render<S: RepoSearch>(f: &mut Frame, app: &App<S>, area: Rect) {
    let is_focused = app.focus == Focus::Repos;
    let state = app.feed.state();
    let width = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = if state.items.is_empty() {
        let msg = if state.loading {
            format!("{} Loading repositories...", spinner(app.spinner_frame))
        } else if app.feed.active().is_none() {
            "Select a topic to see repositories".to_string()
        } else {
            "No repositories".to_string()
        };
        vec![ListItem::new(msg)]
    } else {
        state
            .items
            .iter()
            .map(|repo| repo_item(repo, app.feed.saved_topics(), app.feed.active(), width))
            .collect()
    };

    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let title = match app.feed.active() {
        Some(active) => format!("Repositories - {}", active.label()),
        None => "Repositories".to_string(),
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut list_state = ListState::default();
    if !state.items.is_empty() {
        list_state.select(Some(app.selected_repo));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn repo_item<'a>(
    repo: &'a Repository,
    saved: &[Topic],
    active: Option<&ActiveTopics>,
    width: usize,
) -> ListItem<'a> {
    let dim = Style::default().fg(Color::DarkGray);

    let title = Line::from(vec![
        Span::styled(
            repo.name.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", repo.full_name), dim),
    ]);

    let description = repo
        .description
        .as_deref()
        .map(|d| truncate_to_width(&strip_control_chars(d), width).into_owned())
        .unwrap_or_default();

    let mut stats = vec![
        Span::styled(
            format!("★ {}", compact_count(repo.stars)),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(format!("  ⑂ {}", compact_count(repo.forks))),
        Span::styled(format!("  {}", repo.language), Style::default().fg(Color::Green)),
    ];
    if let Some(license) = &repo.license {
        stats.push(Span::styled(format!("  {}", license.name), dim));
    }
    stats.push(Span::styled(
        format!("  {}", format_timestamp(&repo.pushed_at)),
        dim,
    ));

    let chips: Vec<Span> = repo
        .topics
        .iter()
        .map(|tag| {
            let style = if active.is_some_and(|a| a.tags().iter().any(|t| t.as_str() == tag)) {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else if saved.iter().any(|t| t.as_str() == tag) {
                Style::default().fg(Color::Cyan)
            } else {
                dim
            };
            Span::styled(format!("#{tag} "), style)
        })
        .collect();

    ListItem::new(vec![
        title,
        Line::from(description),
        Line::from(stats),
        Line::from(chips),
    ])
}
