use crate::app::{App, Focus};
use crate::github::RepoSearch;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Render the saved-topic drawer.
///
/// Topics that currently drive the feed carry a `●` marker.
pub fn render<S: RepoSearch>(f: &mut Frame, app: &App<S>, area: Rect) {
    let is_focused = app.focus == Focus::Topics;
    let saved = app.feed.saved_topics();
    let active = app.feed.active();

    let items: Vec<ListItem> = if saved.is_empty() {
        vec![ListItem::new(Span::styled(
            "No topics. Press 'a' to add one",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        saved
            .iter()
            .map(|topic| {
                let is_active = active.is_some_and(|a| a.contains(topic));
                let (marker, style) = if is_active {
                    ("● ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                } else {
                    ("  ", Style::default())
                };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Cyan)),
                    Span::styled(topic.as_str().to_string(), style),
                ]))
            })
            .collect()
    };

    let border_style = if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(format!("Topics ({})", saved.len())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    if !saved.is_empty() {
        state.select(Some(app.selected_topic));
    }
    f.render_stateful_widget(list, area, &mut state);
}
