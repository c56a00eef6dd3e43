//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{
    can_add_email_char, can_add_form_char, can_add_password_char, App, AppState, FormFocus,
    LoginFocus, Tab,
};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle login overlay
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Handle complete confirmation
    if matches!(app.state, AppState::ConfirmingComplete) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.complete_workout(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    if matches!(app.state, AppState::PickingExercise) {
        handle_picker_input(app, key);
        return Ok(false);
    }

    // Text entry swallows every key until it is left
    if app.current_tab == Tab::Workout && app.editing_set {
        handle_set_edit_input(app, key);
        return Ok(false);
    }
    if app.current_tab == Tab::New && app.active_workout.is_none() && app.form.focus != FormFocus::Submit {
        handle_form_input(app, key);
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char('1') => app.switch_tab(Tab::Home),
        KeyCode::Char('2') => app.switch_tab(Tab::Logs),
        KeyCode::Char('3') => app.switch_tab(Tab::Workout),
        KeyCode::Char('4') => app.switch_tab(Tab::New),
        KeyCode::Tab => app.switch_tab(app.current_tab.next()),
        KeyCode::BackTab => app.switch_tab(app.current_tab.prev()),
        KeyCode::Left if app.current_tab != Tab::Logs => app.switch_tab(app.current_tab.prev()),
        KeyCode::Right if app.current_tab != Tab::Logs => app.switch_tab(app.current_tab.next()),
        KeyCode::Char('u') => app.refresh_current_tab(),
        KeyCode::Char('L') => app.logout(),
        _ => {
            // Tab-specific input
            match app.current_tab {
                Tab::Home => handle_home_input(app, key),
                Tab::Logs => handle_logs_input(app, key),
                Tab::Workout => handle_workout_input(app, key),
                Tab::New => handle_new_input(app, key),
            }
        }
    }

    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            // Move to next field
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            // Move to previous field
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                // On failure login_error is set and the overlay stays up
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_home_input(app: &mut App, key: KeyEvent) {
    let max_index = app.recent_workouts().len().saturating_sub(1);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.home_selection = app.home_selection.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.home_selection = (app.home_selection + 1).min(max_index);
        }
        KeyCode::Enter => {
            if let Some(id) = app.recent_workouts().get(app.home_selection).map(|w| w.id.clone()) {
                app.open_workout(&id);
            }
        }
        _ => {}
    }
}

fn handle_logs_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') => app.shift_day(-1),
        KeyCode::Right | KeyCode::Char('l') => app.shift_day(1),
        KeyCode::Up => app.shift_day(-7),
        KeyCode::Down => app.shift_day(7),
        KeyCode::Char('<') | KeyCode::Char(',') => app.shift_month(false),
        KeyCode::Char('>') | KeyCode::Char('.') => app.shift_month(true),
        KeyCode::Char('t') => app.select_day(Local::now().date_naive()),
        KeyCode::Char('j') => {
            let max_index = app.day_workouts().len().saturating_sub(1);
            app.day_selection = (app.day_selection + 1).min(max_index);
        }
        KeyCode::Char('k') => {
            app.day_selection = app.day_selection.saturating_sub(1);
        }
        KeyCode::Enter => {
            if let Some(id) = app.day_workouts().get(app.day_selection).map(|w| w.id.clone()) {
                app.open_workout(&id);
            }
        }
        _ => {}
    }
}

fn handle_workout_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_set_selection(false),
        KeyCode::Down | KeyCode::Char('j') => app.move_set_selection(true),
        KeyCode::Char('[') => {
            let index = app.exercise_selection.saturating_sub(1);
            app.select_exercise(index);
        }
        KeyCode::Char(']') => {
            let index = app.exercise_selection + 1;
            app.select_exercise(index);
        }
        KeyCode::Enter | KeyCode::Char('e') => app.begin_edit(),
        KeyCode::Char('a') => app.add_set(),
        KeyCode::Char('d') => app.duplicate_set(),
        KeyCode::Char('x') | KeyCode::Delete => app.remove_set(),
        KeyCode::Char(' ') => app.toggle_collapsed(),
        KeyCode::Char('+') => app.open_picker(),
        KeyCode::Char('r') => app.retry_save(),
        KeyCode::Char('c') => {
            if app.can_complete() {
                app.state = AppState::ConfirmingComplete;
            }
        }
        _ => {}
    }
}

fn handle_set_edit_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Enter => app.commit_edit(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => app.toggle_field(),
        KeyCode::Backspace => app.backspace(),
        KeyCode::Up | KeyCode::Down => {
            app.commit_edit();
            app.move_set_selection(key.code == KeyCode::Down);
            app.begin_edit();
        }
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => app.type_char(c),
        _ => {}
    }
}

fn handle_picker_input(app: &mut App, key: KeyEvent) {
    let max_index = app.picker_results().len().saturating_sub(1);
    match key.code {
        KeyCode::Esc => app.state = AppState::Normal,
        KeyCode::Enter => app.add_selected_exercise(),
        KeyCode::Up => app.picker_selection = app.picker_selection.saturating_sub(1),
        KeyCode::Down => app.picker_selection = (app.picker_selection + 1).min(max_index),
        KeyCode::Backspace => app.picker_pop(),
        KeyCode::Char(c) => app.picker_push(c),
        _ => {}
    }
}

/// New tab with the button focused or a workout already in progress
fn handle_new_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_new_workout(),
        KeyCode::Up => app.form.focus = app.form.focus.prev(),
        KeyCode::Down => app.form.focus = app.form.focus.next(),
        KeyCode::Esc => app.switch_tab(Tab::Home),
        _ => {}
    }
}

/// New tab with a text field focused
fn handle_form_input(app: &mut App, key: KeyEvent) {
    let form = &mut app.form;
    match key.code {
        KeyCode::Esc => form.focus = FormFocus::Submit,
        KeyCode::Tab | KeyCode::Down | KeyCode::Enter => form.focus = form.focus.next(),
        KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.prev(),
        KeyCode::Backspace => {
            if let Some(field) = form.focused_field() {
                field.pop();
            }
            form.error = None;
        }
        KeyCode::Char(c) => {
            let focus = form.focus;
            if let Some(field) = form.focused_field() {
                if can_add_form_char(focus, field.chars().count(), c) {
                    field.push(c);
                }
            }
            form.error = None;
        }
        _ => {}
    }
}
