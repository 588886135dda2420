use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode, Popup, Screen};
use crate::tui::AppEvent;
use docassist::input::TextInput;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('1') => {
            app.switch_screen(Screen::Upload);
            return;
        }
        KeyCode::Char('2') => {
            app.switch_screen(Screen::Chat);
            return;
        }
        KeyCode::Char('x') => {
            app.notifier.dismiss_all();
            return;
        }
        _ => {}
    }

    match app.screen {
        Screen::Upload => handle_upload_normal(app, key),
        Screen::Chat => handle_chat_normal(app, key),
    }
}

fn handle_upload_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('a') | KeyCode::Char('i') => app.open_add_files(),
        KeyCode::Char('j') | KeyCode::Down => app.files_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.files_nav_up(),
        KeyCode::Char('d') | KeyCode::Delete => app.remove_selected_file(),
        KeyCode::Char('C') => app.clear_files(),
        KeyCode::Char('u') | KeyCode::Enter => app.start_upload(),
        KeyCode::Tab => app.switch_screen(Screen::Chat),
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') => app.start_editing_chat(),
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Char('r') => app.open_chart_prompt(),
        KeyCode::Char('o') => app.open_chart_image(),
        KeyCode::Esc => app.switch_screen(Screen::Upload),
        _ => match app.focus {
            FocusPane::Suggestions => match key.code {
                KeyCode::Char('j') | KeyCode::Down => app.suggestions_nav_down(),
                KeyCode::Char('k') | KeyCode::Up => app.suggestions_nav_up(),
                KeyCode::Enter => app.apply_selected_suggestion(),
                _ => {}
            },
            _ => match key.code {
                KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(),
                KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(),
                KeyCode::Char('G') | KeyCode::End => app.follow_chat = true,
                KeyCode::Enter => app.start_editing_chat(),
                _ => {}
            },
        },
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.popup {
        Some(Popup::AddFiles) => match key.code {
            KeyCode::Esc => {
                app.path_input.clear();
                app.close_popup();
            }
            KeyCode::Enter => app.add_paths_from_input(),
            _ => edit_line(&mut app.path_input, key),
        },
        Some(Popup::ChartPrompt) => match key.code {
            KeyCode::Esc => app.close_popup(),
            KeyCode::Enter => app.start_regenerate(),
            _ => {
                // Prompt is read-only while a regenerate is in flight
                if !app.chart_viewer.is_regenerating() {
                    edit_line(&mut app.chart_viewer.prompt, key);
                }
            }
        },
        None => handle_chat_editing(app, key),
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.stop_editing_chat(),
        // Input is locked until the pending reply arrives
        _ if app.chat.is_waiting() => {}
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => app.chat.input.insert('\n'),
        KeyCode::Enter => app.send_message(),
        // Terminals without keyboard enhancement send Shift+Enter as a plain Enter
        KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => app.chat.input.insert('\n'),
        _ => edit_line(&mut app.chat.input, key),
    }
}

/// Cursor movement and character editing shared by every text box
fn edit_line(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Char(c) => input.insert(c),
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

/// Row inside a bordered list, accounting for the list's scroll offset
fn list_row(y: u16, rect: Rect, offset: usize) -> Option<usize> {
    let inner_top = rect.y + 1;
    if y < inner_top || y >= rect.y + rect.height.saturating_sub(1) {
        return None;
    }
    Some((y - inner_top) as usize + offset)
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.popup.is_some() {
        return;
    }
    let (x, y) = (mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if app.screen == Screen::Chat && app.chat_area.is_some_and(|r| point_in_rect(x, y, r)) {
                app.scroll_chat_down();
            } else if app.screen == Screen::Upload {
                app.files_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if app.screen == Screen::Chat && app.chat_area.is_some_and(|r| point_in_rect(x, y, r)) {
                app.scroll_chat_up();
            } else if app.screen == Screen::Upload {
                app.files_nav_up();
            }
        }
        MouseEventKind::Down(MouseButton::Left) => match app.screen {
            Screen::Upload => {
                if let Some(rect) = app.files_area.filter(|r| point_in_rect(x, y, *r)) {
                    if let Some(row) = list_row(y, rect, app.files_state.offset()) {
                        if row < app.upload.files().len() {
                            app.files_state.select(Some(row));
                        }
                    }
                }
            }
            Screen::Chat => {
                if let Some(rect) = app.suggestions_area.filter(|r| point_in_rect(x, y, *r)) {
                    // First inner row is the caption
                    if let Some(row) = list_row(y, rect, 0).and_then(|r| r.checked_sub(1)) {
                        app.suggestions_state.select(Some(row));
                        app.apply_suggestion(row);
                    }
                } else if app.input_area.is_some_and(|r| point_in_rect(x, y, r)) {
                    app.start_editing_chat();
                } else if app.chat_area.is_some_and(|r| point_in_rect(x, y, r)) {
                    app.stop_editing_chat();
                }
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use docassist::backend::Backend;
    use docassist::mock::MockBackend;
    use std::time::Duration;

    fn app() -> App {
        App::new(Backend::Mock(MockBackend::new(Duration::ZERO)))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_shift_enter_inserts_newline() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        handle_key(&mut app, press(KeyCode::Char('i')));
        type_text(&mut app, "line one");
        handle_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut app, "two");
        assert_eq!(app.chat.input.value(), "line one\ntwo");
        assert!(app.chat.messages().is_empty());
    }

    #[test]
    fn test_enhanced_shift_enter_and_ctrl_j_insert_newlines() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        handle_key(&mut app, press(KeyCode::Char('i')));
        type_text(&mut app, "a");
        // Shape of Shift+Enter once disambiguated escape codes are on
        handle_key(
            &mut app,
            KeyEvent::new_with_kind(KeyCode::Enter, KeyModifiers::SHIFT, KeyEventKind::Press),
        );
        type_text(&mut app, "b");
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL));
        type_text(&mut app, "c");
        assert_eq!(app.chat.input.value(), "a\nb\nc");
        assert!(app.chat_task.is_none());
    }

    #[tokio::test]
    async fn test_enter_sends_and_blank_does_not() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        handle_key(&mut app, press(KeyCode::Char('i')));
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.chat_task.is_none());

        type_text(&mut app, "hello");
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.chat_task.is_some());
        assert_eq!(app.chat.messages().len(), 1);
        assert!(app.chat.input.value().is_empty());
    }

    #[test]
    fn test_q_in_editing_mode_is_text() {
        let mut app = app();
        app.switch_screen(Screen::Chat);
        handle_key(&mut app, press(KeyCode::Char('i')));
        type_text(&mut app, "q");
        assert!(!app.should_quit);
        handle_key(&mut app, press(KeyCode::Esc));
        handle_key(&mut app, press(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_add_files_popup_cancel() {
        let mut app = app();
        handle_key(&mut app, press(KeyCode::Char('a')));
        assert_eq!(app.popup, Some(Popup::AddFiles));
        type_text(&mut app, "/tmp/x.pdf");
        handle_key(&mut app, press(KeyCode::Esc));
        assert!(app.popup.is_none());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.path_input.value().is_empty());
    }

    #[test]
    fn test_list_row_skips_borders() {
        let rect = Rect::new(0, 5, 20, 6);
        assert_eq!(list_row(5, rect, 0), None);
        assert_eq!(list_row(6, rect, 0), Some(0));
        assert_eq!(list_row(9, rect, 2), Some(5));
        assert_eq!(list_row(10, rect, 0), None);
    }
}
