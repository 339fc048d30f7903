//! Help overlay listing the keybindings of each screen.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Row, Table},
    Frame,
};

const SECTIONS: [(&str, &[(&str, &str)]); 4] = [
    (
        "General",
        &[
            ("?", "Toggle this help"),
            ("q / Ctrl-c", "Quit"),
            ("Tab / h / l", "Switch panel"),
            ("j / k", "Move down / up"),
            ("g / G", "Jump to top / bottom"),
        ],
    ),
    (
        "Topics",
        &[
            ("Enter", "Show only this topic"),
            ("Space", "Add to / remove from the selection"),
            ("a", "Save a new topic"),
            ("d / Delete", "Remove saved topic"),
        ],
    ),
    (
        "Repositories",
        &[
            ("Enter", "Open repository"),
            ("o", "Open in browser"),
            ("r", "Refresh from page 1"),
            ("n", "Load next page"),
        ],
    ),
    (
        "Repository",
        &[
            ("Esc / q", "Back to list"),
            ("j / k / PgUp / PgDn", "Scroll README"),
            ("h / l", "Previous / next topic chip"),
            ("s / +", "Save highlighted topic"),
            ("o", "Open in browser"),
        ],
    ),
];

/// Render the help overlay on top of the current view.
pub fn render(f: &mut Frame) {
    let overlay = centered_rect(70, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let mut rows: Vec<Row> = Vec::new();
    for (i, (label, bindings)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            rows.push(Row::new(vec![String::new(), String::new()]));
        }
        rows.push(Row::new(vec![Line::from(Span::styled(
            format!("-- {label} --"),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))]));
        for (key, description) in bindings.iter() {
            rows.push(Row::new(vec![format!("  {key}"), description.to_string()]));
        }
    }

    let table = Table::new(rows, [Constraint::Length(22), Constraint::Min(20)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help (? to close) "),
    );
    f.render_widget(table, overlay);
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
