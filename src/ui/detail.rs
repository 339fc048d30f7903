use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::status::spinner;
use crate::app::App;
use crate::feed::ReadmeState;
use crate::github::RepoSearch;
use crate::util::{compact_count, format_timestamp, strip_control_chars};

/// Render the repository detail view: header, topic chips and README.
pub fn render<S: RepoSearch>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let Some(detail) = app.feed.detail() else {
        f.render_widget(
            Paragraph::new("No repository selected")
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };
    let repo = &detail.repo;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(area);

    // Header
    let dim = Style::default().fg(Color::DarkGray);
    let mut header = vec![
        Line::from(vec![
            Span::styled(
                repo.full_name.clone(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", repo.html_url), dim),
        ]),
        Line::from(
            repo.description
                .as_deref()
                .map(|d| strip_control_chars(d).into_owned())
                .unwrap_or_default(),
        ),
        Line::from(vec![
            Span::styled(format!("★ {}", compact_count(repo.stars)), Style::default().fg(Color::Yellow)),
            Span::raw(format!("   ⑂ {}", compact_count(repo.forks))),
            Span::raw(format!("   👁 {}", compact_count(repo.watchers))),
            Span::styled(format!("   {}", repo.language), Style::default().fg(Color::Green)),
            Span::styled(
                repo.license
                    .as_ref()
                    .map(|l| format!("   {}", l.name))
                    .unwrap_or_default(),
                dim,
            ),
        ]),
        Line::from(Span::styled(
            format!("Pushed {}", format_timestamp(&repo.pushed_at)),
            dim,
        )),
    ];

    let saved = app.feed.saved_topics();
    let active = app.feed.active();
    let chips: Vec<Span> = repo
        .topics
        .iter()
        .enumerate()
        .flat_map(|(i, tag)| {
            let mut style = Style::default();
            if saved.iter().any(|t| t.as_str() == tag) {
                style = style.fg(Color::Cyan);
            }
            if active.is_some_and(|a| a.tags().iter().any(|t| t.as_str() == tag)) {
                style = style.add_modifier(Modifier::BOLD);
            }
            if i == app.selected_chip {
                style = style.add_modifier(Modifier::REVERSED);
            }
            [Span::styled(format!("[{tag}]"), style), Span::raw(" ")]
        })
        .collect();
    header.push(Line::from(chips));

    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::TOP)),
        chunks[0],
    );

    // README
    let body: Vec<Line<'static>> = match (&detail.readme, &app.readme_lines) {
        (ReadmeState::Loaded(_), Some(lines)) => lines.clone(),
        (ReadmeState::Loaded(_), None) => Vec::new(),
        (ReadmeState::Loading, _) => vec![Line::from(format!(
            "{} Loading README...",
            spinner(app.spinner_frame)
        ))],
        (ReadmeState::Failed(error), _) => vec![Line::from(Span::styled(
            format!("README unavailable: {error}"),
            Style::default().fg(Color::Red),
        ))],
    };
    let show_error = detail.show_error;
    let error_text = match &detail.readme {
        ReadmeState::Failed(e) => e.clone(),
        _ => String::new(),
    };

    // Keep the scroll offset inside the document
    app.detail_scroll = app.detail_scroll.min(body.len().saturating_sub(1));
    const MAX_SCROLL: usize = u16::MAX as usize;
    let readme = Paragraph::new(Text::from(body))
        .block(Block::default().borders(Borders::ALL).title("README"))
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll.min(MAX_SCROLL) as u16, 0));
    f.render_widget(readme, chunks[1]);

    if show_error {
        render_error_dialog(f, area, &error_text);
    }
}

/// Dismissible dialog shown when the README could not be loaded.
fn render_error_dialog(f: &mut Frame, area: Rect, error: &str) {
    let width = area.width.saturating_sub(4).min(60);
    let height = 7.min(area.height);
    let dialog = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let text = vec![
        Line::from(Span::styled(
            "Could not load README",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(error.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "(Enter/Esc) Dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Clear, dialog);
    f.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Error")
                    .border_style(Style::default().fg(Color::Red)),
            ),
        dialog,
    );
}

/// Convert README markdown to styled lines for caching.
pub fn render_markdown(md: &str) -> Vec<Line<'static>> {
    let parser = Parser::new_ext(md, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(md.lines().count());
    let mut spans: Vec<Span<'static>> = Vec::new();

    let mut heading: Option<HeadingLevel> = None;
    let mut code_block = false;
    let mut emphasis = 0u8;
    let mut strong = 0u8;
    let mut quote = 0usize;
    let mut list_depth = 0usize;
    let mut link_url: Option<String> = None;

    let flush = |spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>| {
        if !spans.is_empty() {
            lines.push(Line::from(std::mem::take(spans)));
        }
    };

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush(&mut spans, &mut lines);
                heading = Some(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                flush(&mut spans, &mut lines);
                lines.push(Line::from(""));
                heading = None;
            }
            Event::Start(Tag::Paragraph) => {
                if quote > 0 {
                    spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
                }
            }
            Event::End(TagEnd::Paragraph) => {
                flush(&mut spans, &mut lines);
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::BlockQuote { .. }) => quote += 1,
            Event::End(TagEnd::BlockQuote { .. }) => quote = quote.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut spans, &mut lines);
                code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                code_block = false;
                lines.push(Line::from(""));
            }
            Event::Start(Tag::List(_)) => {
                flush(&mut spans, &mut lines);
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::Item) => {
                flush(&mut spans, &mut lines);
                spans.push(Span::raw(format!(
                    "{}• ",
                    "  ".repeat(list_depth.saturating_sub(1))
                )));
            }
            Event::End(TagEnd::Item) => flush(&mut spans, &mut lines),
            Event::Start(Tag::Emphasis) => emphasis += 1,
            Event::End(TagEnd::Emphasis) => emphasis = emphasis.saturating_sub(1),
            Event::Start(Tag::Strong) => strong += 1,
            Event::End(TagEnd::Strong) => strong = strong.saturating_sub(1),
            Event::Start(Tag::Link { dest_url, .. }) => link_url = Some(dest_url.into_string()),
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_url.take() {
                    spans.push(Span::styled(
                        format!(" <{url}>"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                spans.push(Span::styled(
                    format!("[image: {dest_url}]"),
                    Style::default().fg(Color::Blue),
                ));
            }
            Event::Text(text) if code_block => {
                let style = Style::default().fg(Color::Yellow);
                for line in text.lines() {
                    lines.push(Line::from(Span::styled(format!("    {line}"), style)));
                }
            }
            Event::Text(text) => {
                let mut style = Style::default();
                if let Some(level) = heading {
                    style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                    if level == HeadingLevel::H1 {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                }
                if strong > 0 {
                    style = style.add_modifier(Modifier::BOLD);
                }
                if emphasis > 0 {
                    style = style.add_modifier(Modifier::ITALIC);
                }
                if link_url.is_some() {
                    style = style.fg(Color::Blue);
                }
                spans.push(Span::styled(text.into_string(), style));
            }
            Event::Code(code) => {
                spans.push(Span::styled(
                    code.into_string(),
                    Style::default().fg(Color::Yellow),
                ));
            }
            Event::SoftBreak => spans.push(Span::raw(" ")),
            Event::HardBreak => flush(&mut spans, &mut lines),
            Event::Rule => {
                flush(&mut spans, &mut lines);
                lines.push(Line::from(Span::styled(
                    "─".repeat(40),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            Event::End(TagEnd::TableRow) | Event::End(TagEnd::TableHead) => {
                flush(&mut spans, &mut lines)
            }
            Event::End(TagEnd::TableCell) => spans.push(Span::raw(" │ ")),
            _ => {}
        }
    }
    flush(&mut spans, &mut lines);

    // No trailing blank lines
    while lines.last().is_some_and(|l| l.width() == 0) {
        lines.pop();
    }
    lines
}
