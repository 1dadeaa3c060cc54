use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{AgentField, App, EditTarget, Field, Mode};
use super::keymap::{self, Action};

/// Work the run loop has to do because it needs the terminal.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
    /// Open `$EDITOR` on the target, starting from `initial`.
    Edit { target: EditTarget, initial: String },
    /// Write the create form's content in `$EDITOR`, then submit if asked.
    ComposeContent { submit: bool },
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    match app.mode {
        Mode::Normal => handle_normal(app, key),
        Mode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.mode = Mode::Normal;
            }
            KeyAction::Continue
        }
        Mode::Search => {
            match key.code {
                KeyCode::Esc => app.close_search(false),
                KeyCode::Enter => app.close_search(true),
                KeyCode::Backspace => app.search_pop(),
                KeyCode::Char(c) => app.search_push(c),
                _ => {}
            }
            KeyAction::Continue
        }
        Mode::TagPicker(_) => {
            match key.code {
                KeyCode::Esc => app.mode = Mode::Normal,
                KeyCode::Enter => app.apply_tag_picker(),
                KeyCode::Down | KeyCode::Char('j') => app.tag_picker_move(true),
                KeyCode::Up | KeyCode::Char('k') => app.tag_picker_move(false),
                KeyCode::Char(' ') => app.tag_picker_toggle(),
                _ => {}
            }
            KeyAction::Continue
        }
        Mode::Create(_) => handle_form(app, key),
        Mode::CreateAgent(_) => handle_agent_form(app, key),
        Mode::Tags(_) => handle_tags(app, key),
        Mode::ConfirmDelete(_) => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => app.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Esc => app.mode = Mode::Normal,
                _ => {}
            }
            KeyAction::Continue
        }
        Mode::Export { .. } => {
            match key.code {
                KeyCode::Esc => app.mode = Mode::Normal,
                KeyCode::Enter => app.run_export(),
                KeyCode::Backspace => {
                    if let Some(path) = app.export_path_mut() {
                        path.pop();
                    }
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if let Some(path) = app.export_path_mut() {
                        path.clear();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(path) = app.export_path_mut() {
                        path.push(c);
                    }
                }
                _ => {}
            }
            KeyAction::Continue
        }
    }
}

fn handle_normal(app: &mut App, key: KeyEvent) -> KeyAction {
    let Some(action) = keymap::lookup(key.code, app.state.view()) else {
        return KeyAction::Continue;
    };
    match action {
        Action::Quit => return KeyAction::Quit,
        Action::Edit => {
            if let Some((target, initial)) = app.begin_edit() {
                return KeyAction::Edit { target, initial };
            }
        }
        Action::MoveUp => app.move_up(),
        Action::MoveDown => app.move_down(),
        Action::Search => app.open_search(),
        Action::CycleTypeFilter => app.cycle_type_filter(),
        Action::TagFilter => app.open_tag_picker(),
        Action::ToggleSelect => app.toggle_select(),
        Action::SelectAll => app.select_all(),
        Action::DeselectAll => app.deselect_all(),
        Action::Create(item_type) => app.open_create(item_type),
        Action::CreateAgent => app.open_create_agent(),
        Action::ManageTags => app.open_tags(),
        Action::Delete => app.request_delete(),
        Action::CopyContent => app.copy_content(),
        Action::CopyCommand => app.copy_command(),
        Action::Export => app.open_export(),
        Action::CopyAgentJson => app.copy_agent_json(),
        Action::SwitchView => app.switch_view(),
        Action::Reload => app.refresh(),
        Action::Help => app.mode = Mode::Help,
        Action::Escape => app.escape(),
    }
    KeyAction::Continue
}

fn handle_form(app: &mut App, key: KeyEvent) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            app.cancel_create();
            return KeyAction::Continue;
        }
        KeyCode::Enter => {
            if app.form_needs_content() {
                return KeyAction::ComposeContent { submit: true };
            }
            app.submit_create();
            return KeyAction::Continue;
        }
        KeyCode::Char('e') if ctrl => return KeyAction::ComposeContent { submit: false },
        _ => {}
    }
    let Some(focused) = app.form_mut().map(|f| f.focused) else {
        return KeyAction::Continue;
    };
    if focused == Field::Tags {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => app.form_tag_move(true),
            KeyCode::Up | KeyCode::Char('k') => app.form_tag_move(false),
            KeyCode::Char(' ') => app.form_tag_toggle(),
            _ => {}
        }
    }
    let Some(form) = app.form_mut() else {
        return KeyAction::Continue;
    };
    match (focused, key.code) {
        (_, KeyCode::Tab) => form.next_field(),
        (_, KeyCode::BackTab) => form.prev_field(),
        (Field::Name, KeyCode::Char('u')) if ctrl => form.name.clear(),
        (Field::Name, KeyCode::Backspace) => {
            form.name.pop();
        }
        (Field::Name, KeyCode::Char(c)) if !ctrl => form.name.push(c),
        (Field::Type, KeyCode::Right | KeyCode::Char(' ') | KeyCode::Char('l')) => {
            form.cycle_type(true)
        }
        (Field::Type, KeyCode::Left | KeyCode::Char('h')) => form.cycle_type(false),
        _ => {}
    }
    KeyAction::Continue
}

fn handle_agent_form(app: &mut App, key: KeyEvent) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.mode = Mode::Normal,
        KeyCode::Enter => app.submit_agent(),
        _ => {
            let Some(form) = app.agent_form_mut() else {
                return KeyAction::Continue;
            };
            match (form.focused, key.code) {
                (_, KeyCode::Tab) => form.cycle_field(true),
                (_, KeyCode::BackTab) => form.cycle_field(false),
                (AgentField::Mode, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                    form.toggle_mode()
                }
                (AgentField::Name, KeyCode::Backspace) => {
                    form.name.pop();
                }
                (AgentField::Model, KeyCode::Backspace) => {
                    form.model.pop();
                }
                (AgentField::Name, KeyCode::Char(c)) if !ctrl => form.name.push(c),
                (AgentField::Model, KeyCode::Char(c)) if !ctrl => form.model.push(c),
                _ => {}
            }
        }
    }
    KeyAction::Continue
}

fn handle_tags(app: &mut App, key: KeyEvent) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if let Some(input) = app.tag_input_mut() {
        match key.code {
            KeyCode::Esc => app.tags_cancel_input(),
            KeyCode::Enter => app.tags_submit(),
            KeyCode::Tab | KeyCode::BackTab => input.toggle_field(),
            KeyCode::Backspace => {
                input.focused_text().pop();
            }
            KeyCode::Char('u') if ctrl => input.focused_text().clear(),
            KeyCode::Char(c) if !ctrl => input.focused_text().push(c),
            _ => {}
        }
        return KeyAction::Continue;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('T') => app.mode = Mode::Normal,
        KeyCode::Down | KeyCode::Char('j') => app.tags_move(true),
        KeyCode::Up | KeyCode::Char('k') => app.tags_move(false),
        KeyCode::Char('n') => app.tags_new(),
        KeyCode::Char('e') => app.tags_edit(),
        KeyCode::Char('d') => app.tags_delete(),
        _ => {}
    }
    KeyAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentMode, ItemType};
    use crate::state::View;
    use crate::tui::app::tests::{add_item, test_app};

    fn press(app: &mut App, code: KeyCode) -> KeyAction {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn quit_keys() {
        let (mut app, _) = test_app();
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyAction::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(&mut app, ctrl_c), KeyAction::Quit);
    }

    #[test]
    fn search_mode_captures_letters() {
        let (mut app, _) = test_app();
        add_item(&mut app, "quick", ItemType::Skill);
        add_item(&mut app, "other", ItemType::Skill);
        press(&mut app, KeyCode::Char('/'));
        // `q` is text here, not quit.
        assert_eq!(press(&mut app, KeyCode::Char('q')), KeyAction::Continue);
        assert_eq!(app.state.filter().query, "q");
        assert_eq!(app.state.filtered_items().len(), 1);
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.state.filter().query, "q");
    }

    #[test]
    fn create_flow_asks_for_content_first() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Char('W'));
        type_str(&mut app, "Deploy");
        assert_eq!(
            press(&mut app, KeyCode::Enter),
            KeyAction::ComposeContent { submit: true }
        );
        app.form_mut().unwrap().content = "Ship it.".into();
        press(&mut app, KeyCode::Enter);
        let item = app.current_item().unwrap();
        assert_eq!(item.name, "Deploy");
        assert_eq!(item.item_type, ItemType::Workflow);
    }

    #[test]
    fn form_type_field_cycles() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Char('S'));
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.form_mut().unwrap().item_type, ItemType::Rule);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.form_mut().unwrap().item_type, ItemType::Workflow);
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
        assert!(!app.state.is_creating());
    }

    #[test]
    fn delete_needs_confirmation() {
        let (mut app, _) = test_app();
        add_item(&mut app, "keep", ItemType::Rule);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.state.items().len(), 1);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert!(app.state.items().is_empty());
    }

    #[test]
    fn edit_key_hands_off_to_editor() {
        let (mut app, _) = test_app();
        let item = add_item(&mut app, "doc", ItemType::Skill);
        assert_eq!(
            press(&mut app, KeyCode::Char('e')),
            KeyAction::Edit {
                target: EditTarget::Item(item.id),
                initial: "doc body".into(),
            }
        );
    }

    #[test]
    fn space_selects_and_esc_clears() {
        let (mut app, _) = test_app();
        add_item(&mut app, "a", ItemType::Skill);
        add_item(&mut app, "b", ItemType::Skill);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.state.item_selection().len(), 2);
        press(&mut app, KeyCode::Esc);
        assert!(app.state.item_selection().is_empty());
    }

    #[test]
    fn tab_switches_view_and_scopes_keys() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.state.view(), View::Agents);
        press(&mut app, KeyCode::Char('/'));
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn tag_picker_applies_on_enter() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        let first = app.state.tags()[0].id.clone();
        assert!(app.state.filter().tag_ids.contains(&first));
    }

    #[test]
    fn help_toggles() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Char('?'));
        assert!(matches!(app.mode, Mode::Help));
        press(&mut app, KeyCode::Char('?'));
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn tag_manager_creates_with_name_and_color() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Char('T'));
        assert!(matches!(app.mode, Mode::Tags(_)));
        press(&mut app, KeyCode::Char('n'));
        type_str(&mut app, "review");
        press(&mut app, KeyCode::Tab);
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        type_str(&mut app, "#ff0000");
        press(&mut app, KeyCode::Enter);

        let tag = app.state.tags().iter().find(|t| t.name == "review").unwrap();
        assert_eq!(tag.color, "#ff0000");
        assert!(!tag.is_system);
        assert!(app.tag_input_mut().is_none());
        assert!(app.status.as_ref().is_some_and(|s| !s.is_error));
    }

    #[test]
    fn tag_manager_refuses_system_tag() {
        let (mut app, _) = test_app();
        let before = app.state.tags().len();
        assert!(app.state.tags()[0].is_system);
        press(&mut app, KeyCode::Char('T'));
        press(&mut app, KeyCode::Char('d'));

        assert_eq!(app.state.tags().len(), before);
        assert!(matches!(app.mode, Mode::Tags(_)));
        let status = app.status.as_ref().unwrap();
        assert!(status.is_error);
        assert!(status.text.contains("system"), "{}", status.text);
    }

    #[test]
    fn deleted_tag_leaves_the_filter() {
        let (mut app, _) = test_app();
        let tag = app.state.create_tag("scratch", "#123456").unwrap();
        app.state.set_tag_filter([tag.id.clone()]);
        press(&mut app, KeyCode::Char('T'));
        let pos = app.state.tags().iter().position(|t| t.id == tag.id).unwrap();
        for _ in 0..pos {
            press(&mut app, KeyCode::Char('j'));
        }
        press(&mut app, KeyCode::Char('d'));

        assert!(app.state.tags().iter().all(|t| t.id != tag.id));
        assert!(!app.state.filter().tag_ids.contains(&tag.id));
        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn agent_form_creates_agent() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('n'));
        assert!(matches!(app.mode, Mode::CreateAgent(_)));
        type_str(&mut app, "reviewer");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "provider/model-x");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let agent = app.current_agent().unwrap();
        assert_eq!(agent.name, "reviewer");
        assert_eq!(agent.mode, AgentMode::Primary);
        assert_eq!(agent.model.as_deref(), Some("provider/model-x"));
    }

    #[test]
    fn agent_form_keeps_invalid_name_open() {
        let (mut app, _) = test_app();
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Char('n'));
        type_str(&mut app, "My Agent");
        press(&mut app, KeyCode::Enter);

        assert!(app.state.agents().is_empty());
        let form = app.agent_form_mut().unwrap();
        assert!(form.error.as_ref().unwrap().contains("kebab-case"));
    }
}
