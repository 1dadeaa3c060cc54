use crossterm::event::KeyCode;

use crate::model::ItemType;
use crate::state::View;

/// Something the user can ask for from the main list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    Search,
    CycleTypeFilter,
    TagFilter,
    ToggleSelect,
    SelectAll,
    DeselectAll,
    /// `None` keeps the type chosen last time.
    Create(Option<ItemType>),
    CreateAgent,
    ManageTags,
    Edit,
    Delete,
    CopyContent,
    CopyCommand,
    Export,
    CopyAgentJson,
    SwitchView,
    Reload,
    Help,
    Quit,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    Items,
    Agents,
}

impl Scope {
    fn includes(self, view: View) -> bool {
        match self {
            Scope::Any => true,
            Scope::Items => view == View::Items,
            Scope::Agents => view == View::Agents,
        }
    }
}

pub struct Shortcut {
    pub code: KeyCode,
    pub label: &'static str,
    pub action: Action,
    pub scope: Scope,
    pub description: &'static str,
}

const fn key(
    code: KeyCode,
    label: &'static str,
    action: Action,
    scope: Scope,
    description: &'static str,
) -> Shortcut {
    Shortcut {
        code,
        label,
        action,
        scope,
        description,
    }
}

/// Every main-list binding. The help overlay renders this table as is.
pub const SHORTCUTS: &[Shortcut] = &[
    key(KeyCode::Char('j'), "j/Down", Action::MoveDown, Scope::Any, "Move down"),
    key(KeyCode::Down, "", Action::MoveDown, Scope::Any, ""),
    key(KeyCode::Char('k'), "k/Up", Action::MoveUp, Scope::Any, "Move up"),
    key(KeyCode::Up, "", Action::MoveUp, Scope::Any, ""),
    key(KeyCode::Char('/'), "/", Action::Search, Scope::Items, "Search name and content"),
    key(KeyCode::Char('t'), "t", Action::CycleTypeFilter, Scope::Items, "Cycle type filter"),
    key(KeyCode::Char('g'), "g", Action::TagFilter, Scope::Items, "Filter by tags"),
    key(KeyCode::Char(' '), "Space", Action::ToggleSelect, Scope::Any, "Toggle selection"),
    key(KeyCode::Char('a'), "a", Action::SelectAll, Scope::Any, "Select all"),
    key(KeyCode::Char('D'), "D", Action::DeselectAll, Scope::Any, "Deselect all"),
    key(KeyCode::Char('n'), "n", Action::Create(None), Scope::Items, "New item"),
    key(KeyCode::Char('S'), "S", Action::Create(Some(ItemType::Skill)), Scope::Items, "New skill"),
    key(KeyCode::Char('R'), "R", Action::Create(Some(ItemType::Rule)), Scope::Items, "New rule"),
    key(KeyCode::Char('W'), "W", Action::Create(Some(ItemType::Workflow)), Scope::Items, "New workflow"),
    key(KeyCode::Char('n'), "n", Action::CreateAgent, Scope::Agents, "New agent"),
    key(KeyCode::Char('T'), "T", Action::ManageTags, Scope::Any, "Manage tags"),
    key(KeyCode::Char('e'), "e", Action::Edit, Scope::Any, "Edit content or prompt in $EDITOR"),
    key(KeyCode::Char('d'), "d", Action::Delete, Scope::Any, "Delete"),
    key(KeyCode::Char('y'), "y", Action::CopyContent, Scope::Items, "Copy content"),
    key(KeyCode::Char('c'), "c", Action::CopyCommand, Scope::Any, "Copy sync command"),
    key(KeyCode::Char('x'), "x", Action::Export, Scope::Items, "Export to a directory"),
    key(KeyCode::Char('E'), "E", Action::CopyAgentJson, Scope::Agents, "Copy opencode.json agent block"),
    key(KeyCode::Tab, "Tab", Action::SwitchView, Scope::Any, "Switch items/agents"),
    key(KeyCode::Char('r'), "r", Action::Reload, Scope::Any, "Reload from database"),
    key(KeyCode::Char('?'), "?", Action::Help, Scope::Any, "Toggle help"),
    key(KeyCode::Char('q'), "q", Action::Quit, Scope::Any, "Quit"),
    key(KeyCode::Esc, "Esc", Action::Escape, Scope::Any, "Close dialog or deselect all"),
];

pub fn lookup(code: KeyCode, view: View) -> Option<Action> {
    SHORTCUTS
        .iter()
        .find(|s| s.code == code && s.scope.includes(view))
        .map(|s| s.action)
}

/// Rows shown in the help overlay: entries with a label.
pub fn help_rows() -> impl Iterator<Item = &'static Shortcut> {
    SHORTCUTS.iter().filter(|s| !s.label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_only_keys_ignored_in_agents_view() {
        assert_eq!(lookup(KeyCode::Char('/'), View::Items), Some(Action::Search));
        assert_eq!(lookup(KeyCode::Char('/'), View::Agents), None);
        assert_eq!(
            lookup(KeyCode::Char('E'), View::Agents),
            Some(Action::CopyAgentJson)
        );
        assert_eq!(lookup(KeyCode::Char('E'), View::Items), None);
    }

    #[test]
    fn create_keys_carry_type() {
        assert_eq!(
            lookup(KeyCode::Char('R'), View::Items),
            Some(Action::Create(Some(ItemType::Rule)))
        );
        assert_eq!(lookup(KeyCode::Char('n'), View::Items), Some(Action::Create(None)));
        assert_eq!(lookup(KeyCode::Char('n'), View::Agents), Some(Action::CreateAgent));
    }

    #[test]
    fn bindings_are_unique_per_view() {
        for view in [View::Items, View::Agents] {
            let codes: Vec<KeyCode> = SHORTCUTS
                .iter()
                .filter(|s| s.scope.includes(view))
                .map(|s| s.code)
                .collect();
            for (i, code) in codes.iter().enumerate() {
                assert!(!codes[i + 1..].contains(code), "{code:?} bound twice");
            }
        }
    }
}
