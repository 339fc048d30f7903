//! Keyboard input handling.
//!
//! Keys are dispatched by mode: the add-topic prompt and the help overlay
//! capture input first, then the active view gets it.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};

use super::loop_runner::Action;
use crate::app::{App, Focus, View};
use crate::feed::TopicError;
use crate::github::RepoSearch;
use crate::route::Route;
use crate::util::validate_url_for_open;

/// README lines moved per PageUp/PageDown.
const PAGE_SCROLL: usize = 10;

pub(super) async fn handle_input<S: RepoSearch>(
    app: &mut App<S>,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Result<Action> {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(Action::Quit);
    }

    if app.topic_input.is_some() {
        handle_prompt(app, code).await;
        return Ok(Action::Continue);
    }

    if app.show_help {
        if matches!(code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return Ok(Action::Continue);
    }

    match app.view {
        View::Browse => handle_browse(app, code).await,
        View::Detail => handle_detail(app, code).await,
    }
}

async fn handle_prompt<S: RepoSearch>(app: &mut App<S>, code: KeyCode) {
    let Some(input) = app.topic_input.as_mut() else {
        return;
    };
    match code {
        KeyCode::Char(c) => input.push(c),
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Esc => app.topic_input = None,
        KeyCode::Enter => {
            let raw = input.clone();
            match app.feed.add_topic(&raw).await {
                Ok(topic) => {
                    app.topic_input = None;
                    app.set_status(format!("Saved topic '{topic}'"));
                }
                // Keep the prompt open so the text can be fixed
                Err(
                    e @ (TopicError::Empty | TopicError::Duplicate(_) | TopicError::Invalid(_)),
                ) => app.set_status(e.to_string()),
                Err(e) => {
                    app.topic_input = None;
                    app.set_status(format!("Error: {e}"));
                }
            }
        }
        _ => {}
    }
}

async fn handle_browse<S: RepoSearch>(app: &mut App<S>, code: KeyCode) -> Result<Action> {
    match code {
        KeyCode::Char('q') => return Ok(Action::Quit),
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('l') | KeyCode::Left | KeyCode::Right => {
            app.toggle_focus()
        }
        KeyCode::Char('j') | KeyCode::Down => move_and_check(app, |a| a.move_selection(1)),
        KeyCode::Char('k') | KeyCode::Up => move_and_check(app, |a| a.move_selection(-1)),
        KeyCode::Char('g') | KeyCode::Home => move_and_check(app, |a| a.move_selection(isize::MIN)),
        KeyCode::Char('G') | KeyCode::End => move_and_check(app, |a| a.select_last()),
        KeyCode::Char('r') => {
            if app.feed.active().is_some() {
                app.feed.refresh();
                app.selected_repo = 0;
                app.set_status("Refreshing...");
            } else {
                app.set_status("No topic selected");
            }
        }
        KeyCode::Char('n') => app.feed.load_more(),
        KeyCode::Char('a') => app.topic_input = Some(String::new()),
        KeyCode::Char('o') => {
            if let Some(url) = app.selected_repository().map(|r| r.html_url.clone()) {
                open_in_browser(app, &url);
            }
        }
        KeyCode::Enter => match app.focus {
            Focus::Repos => {
                let route = match app.selected_repository() {
                    Some(repo) => Route::repo(repo)?,
                    None => return Ok(Action::Continue),
                };
                navigate(app, &route.path())?;
            }
            Focus::Topics => {
                if let Some(topic) = app.selected_saved_topic().cloned() {
                    app.feed.select_topic(&topic).await?;
                    app.selected_repo = 0;
                }
            }
        },
        KeyCode::Char(' ') if app.focus == Focus::Topics => {
            if let Some(topic) = app.selected_saved_topic().cloned() {
                app.feed.toggle_topic(&topic).await?;
                app.selected_repo = 0;
            }
        }
        KeyCode::Char('d') | KeyCode::Delete if app.focus == Focus::Topics => {
            if let Some(topic) = app.selected_saved_topic().cloned() {
                if app.feed.remove_topic(&topic).await? {
                    app.set_status(format!("Removed topic '{topic}'"));
                }
            }
        }
        _ => {}
    }
    Ok(Action::Continue)
}

async fn handle_detail<S: RepoSearch>(app: &mut App<S>, code: KeyCode) -> Result<Action> {
    if app.feed.detail().is_some_and(|d| d.show_error) {
        if matches!(
            code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Backspace
        ) {
            app.feed.dismiss_error();
        }
        return Ok(Action::Continue);
    }

    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => navigate(app, &Route::Topics.path())?,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('j') | KeyCode::Down => app.detail_scroll = app.detail_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => app.detail_scroll = app.detail_scroll.saturating_sub(1),
        KeyCode::PageDown | KeyCode::Char(' ') => {
            app.detail_scroll = app.detail_scroll.saturating_add(PAGE_SCROLL)
        }
        KeyCode::PageUp => app.detail_scroll = app.detail_scroll.saturating_sub(PAGE_SCROLL),
        KeyCode::Char('g') | KeyCode::Home => app.detail_scroll = 0,
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('[') => app.cycle_chip(-1),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Char(']') => app.cycle_chip(1),
        KeyCode::Char('s') | KeyCode::Char('+') => {
            if let Some(tag) = app.selected_chip_topic().map(str::to_owned) {
                match app.feed.add_topic(&tag).await {
                    Ok(topic) => app.set_status(format!("Saved topic '{topic}'")),
                    Err(e) => app.set_status(e.to_string()),
                }
            }
        }
        KeyCode::Char('o') => {
            if let Some(url) = app.feed.detail().map(|d| d.repo.html_url.clone()) {
                open_in_browser(app, &url);
            }
        }
        _ => {}
    }
    Ok(Action::Continue)
}

/// Switch screens by path. Opening a repository goes through its hand-off
/// token, so the detail view only ever sees the decoded text form.
fn navigate<S: RepoSearch>(app: &mut App<S>, path: &str) -> Result<()> {
    let route = Route::parse(path)?;
    tracing::debug!(route = %path, "Navigating");
    match route {
        Route::Topics => app.leave_detail(),
        Route::Repo { encoded } => {
            app.feed.open_detail(&encoded)?;
            app.enter_detail();
        }
    }
    Ok(())
}

fn move_and_check<S: RepoSearch>(app: &mut App<S>, mv: impl FnOnce(&mut App<S>)) {
    mv(app);
    if app.focus == Focus::Repos && app.check_load_more() {
        app.feed.load_more();
    }
}

fn open_in_browser<S: RepoSearch>(app: &mut App<S>, url: &str) {
    match validate_url_for_open(url) {
        Err(e) => app.set_status(e.to_string()),
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                app.set_status(format!("Failed to open browser: {e}"));
            }
        }
    }
}
