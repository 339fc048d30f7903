use crate::app::{App, Focus, View};
use crate::github::RepoSearch;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

pub(super) fn spinner(frame: usize) -> char {
    SPINNER[frame % SPINNER.len()]
}

/// Render the status bar
pub fn render<S: RepoSearch>(f: &mut Frame, app: &App<S>, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(&**msg)
    } else if app.topic_input.is_some() {
        Cow::Borrowed("Type a topic | ENTER save | ESC cancel")
    } else {
        match app.view {
            View::Browse => {
                let state = app.feed.state();
                let label = app
                    .feed
                    .active()
                    .map(|a| a.label())
                    .unwrap_or_else(|| "no topic selected".to_string());
                let loading = if state.loading {
                    format!(" {}", spinner(app.spinner_frame))
                } else {
                    String::new()
                };
                let hints = match app.focus {
                    Focus::Topics => "[Enter]select [space]toggle [a]dd [d]elete [?]help [q]uit",
                    Focus::Repos => "[Enter]open [o]browser [r]efresh [n]ext page [?]help [q]uit",
                };
                Cow::Owned(format!(
                    "{label} | page {} | {} repos{loading} | {hints}",
                    state.page,
                    state.items.len()
                ))
            }
            View::Detail => {
                Cow::Borrowed("[Esc]back [j/k]scroll [h/l]chip [s]ave topic [o]pen [q]uit")
            }
        }
    };

    let style = Style::default().bg(Color::DarkGray).fg(Color::White);
    f.render_widget(Paragraph::new(text).style(style), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_cycles() {
        assert_eq!(spinner(0), '|');
        assert_eq!(spinner(5), '/');
    }
}
