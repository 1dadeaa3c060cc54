use std::collections::BTreeSet;
use std::path::PathBuf;

use ratatui::widgets::ListState;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::clipboard::{self, Clipboard, SystemClipboard};
use crate::export;
use crate::model::{
    Agent, AgentDraft, AgentMode, AgentPatch, Item, ItemDraft, ItemPatch, ItemType,
    DEFAULT_TAG_COLOR,
};
use crate::state::{AppState, View};

/// Focusable fields of the create form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Type,
    Tags,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Name => Field::Type,
            Field::Type => Field::Tags,
            Field::Tags => Field::Name,
        }
    }

    fn prev(self) -> Self {
        match self {
            Field::Name => Field::Tags,
            Field::Type => Field::Name,
            Field::Tags => Field::Type,
        }
    }
}

pub struct CreateForm {
    pub name: String,
    pub item_type: ItemType,
    pub tag_ids: BTreeSet<String>,
    pub tag_cursor: usize,
    pub content: String,
    pub focused: Field,
    pub error: Option<String>,
}

impl CreateForm {
    fn new(item_type: ItemType) -> Self {
        Self {
            name: String::new(),
            item_type,
            tag_ids: BTreeSet::new(),
            tag_cursor: 0,
            content: String::new(),
            focused: Field::Name,
            error: None,
        }
    }

    pub fn next_field(&mut self) {
        self.focused = self.focused.next();
    }

    pub fn prev_field(&mut self) {
        self.focused = self.focused.prev();
    }

    pub fn cycle_type(&mut self, forward: bool) {
        let all = ItemType::ALL;
        let pos = all.iter().position(|t| *t == self.item_type).unwrap_or(0);
        let next = if forward {
            (pos + 1) % all.len()
        } else {
            (pos + all.len() - 1) % all.len()
        };
        self.item_type = all[next];
    }

    fn draft(&self) -> ItemDraft {
        ItemDraft {
            name: self.name.trim().to_string(),
            content: self.content.clone(),
            item_type: self.item_type,
            tag_ids: self.tag_ids.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Name,
    Color,
}

/// Name and color being typed in the tag manager. `editing` holds the id
/// of the tag being changed; `None` creates a new one.
pub struct TagInput {
    pub editing: Option<String>,
    pub name: String,
    pub color: String,
    pub focused: TagField,
}

impl TagInput {
    pub fn toggle_field(&mut self) {
        self.focused = match self.focused {
            TagField::Name => TagField::Color,
            TagField::Color => TagField::Name,
        };
    }

    pub fn focused_text(&mut self) -> &mut String {
        match self.focused {
            TagField::Name => &mut self.name,
            TagField::Color => &mut self.color,
        }
    }
}

pub struct TagManager {
    pub cursor: usize,
    pub input: Option<TagInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentField {
    Name,
    Mode,
    Model,
}

pub struct AgentForm {
    pub name: String,
    pub mode: AgentMode,
    pub model: String,
    pub focused: AgentField,
    pub error: Option<String>,
}

impl AgentForm {
    fn new() -> Self {
        Self {
            name: String::new(),
            mode: AgentMode::default(),
            model: String::new(),
            focused: AgentField::Name,
            error: None,
        }
    }

    pub fn cycle_field(&mut self, forward: bool) {
        const ORDER: [AgentField; 3] = [AgentField::Name, AgentField::Mode, AgentField::Model];
        let pos = ORDER.iter().position(|f| *f == self.focused).unwrap_or(0);
        let next = if forward { pos + 1 } else { pos + ORDER.len() - 1 };
        self.focused = ORDER[next % ORDER.len()];
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AgentMode::Primary => AgentMode::Subagent,
            AgentMode::Subagent => AgentMode::Primary,
        };
    }

    fn draft(&self) -> AgentDraft {
        let model = self.model.trim();
        AgentDraft {
            name: self.name.trim().to_string(),
            mode: self.mode,
            model: (!model.is_empty()).then(|| model.to_string()),
            ..AgentDraft::default()
        }
    }
}

pub struct TagPicker {
    pub cursor: usize,
    pub chosen: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Item { id: String, name: String },
    Agent { id: String, name: String },
}

impl DeleteTarget {
    pub fn describe(&self) -> String {
        match self {
            DeleteTarget::Item { name, .. } => format!("Delete item '{name}'?"),
            DeleteTarget::Agent { name, .. } => format!("Delete agent '{name}'?"),
        }
    }
}

/// What `e` asked to edit; the run loop opens the editor on `initial`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Item(String),
    Agent(String),
}

pub enum Mode {
    Normal,
    Help,
    Search,
    TagPicker(TagPicker),
    Create(CreateForm),
    CreateAgent(AgentForm),
    Tags(TagManager),
    ConfirmDelete(DeleteTarget),
    Export { path: String },
}

pub struct Status {
    pub text: String,
    pub is_error: bool,
}

pub struct App {
    pub state: AppState<Connection>,
    pub mode: Mode,
    pub items_list: ListState,
    pub agents_list: ListState,
    pub status: Option<Status>,
    clipboard: Option<Box<dyn Clipboard>>,
    export_dir: PathBuf,
}

impl App {
    pub fn new(
        state: AppState<Connection>,
        clipboard: Option<Box<dyn Clipboard>>,
        export_dir: PathBuf,
    ) -> Self {
        let mut app = Self {
            state,
            mode: Mode::Normal,
            items_list: ListState::default(),
            agents_list: ListState::default(),
            status: None,
            clipboard,
            export_dir,
        };
        app.clamp_cursors();
        app
    }

    // ── Status ────────────────────────────────────────────────────────

    pub fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            is_error: true,
        });
    }

    fn report<T, E: std::fmt::Display>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.error(e.to_string());
                None
            }
        }
    }

    // ── Loading ───────────────────────────────────────────────────────

    pub fn refresh(&mut self) {
        let result = self.state.load();
        self.report(result);
        self.clamp_cursors();
    }

    // ── Cursor ────────────────────────────────────────────────────────

    fn list_len(&self, view: View) -> usize {
        match view {
            View::Items => self.state.filtered_items().len(),
            View::Agents => self.state.agents().len(),
        }
    }

    fn list_state_mut(&mut self, view: View) -> &mut ListState {
        match view {
            View::Items => &mut self.items_list,
            View::Agents => &mut self.agents_list,
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        match self.state.view() {
            View::Items => self.items_list.selected(),
            View::Agents => self.agents_list.selected(),
        }
    }

    pub fn clamp_cursors(&mut self) {
        for view in [View::Items, View::Agents] {
            let len = self.list_len(view);
            let list = self.list_state_mut(view);
            match list.selected() {
                _ if len == 0 => list.select(None),
                Some(i) if i >= len => list.select(Some(len - 1)),
                None => list.select(Some(0)),
                Some(_) => {}
            }
        }
    }

    pub fn move_down(&mut self) {
        let view = self.state.view();
        let len = self.list_len(view);
        let list = self.list_state_mut(view);
        if let Some(i) = list.selected() {
            if i + 1 < len {
                list.select(Some(i + 1));
            }
        }
    }

    pub fn move_up(&mut self) {
        let list = self.list_state_mut(self.state.view());
        if let Some(i) = list.selected() {
            list.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.items_list
            .selected()
            .and_then(|i| self.state.filtered_items().get(i))
    }

    pub fn current_agent(&self) -> Option<&Agent> {
        self.agents_list
            .selected()
            .and_then(|i| self.state.agents().get(i))
    }

    /// Selected items, or the one under the cursor when nothing is selected.
    fn target_items(&self) -> Vec<&Item> {
        let selected = self.state.selected_items();
        if selected.is_empty() {
            self.current_item().into_iter().collect()
        } else {
            selected
        }
    }

    fn target_agents(&self) -> Vec<&Agent> {
        let selected = self.state.selected_agents();
        if selected.is_empty() {
            self.current_agent().into_iter().collect()
        } else {
            selected
        }
    }

    // ── View and selection ────────────────────────────────────────────

    pub fn switch_view(&mut self) {
        let next = match self.state.view() {
            View::Items => View::Agents,
            View::Agents => View::Items,
        };
        self.state.set_view(next);
    }

    pub fn toggle_select(&mut self) {
        match self.state.view() {
            View::Items => {
                if let Some(id) = self.current_item().map(|i| i.id.clone()) {
                    self.state.toggle_item(&id);
                    self.move_down();
                }
            }
            View::Agents => {
                if let Some(id) = self.current_agent().map(|a| a.id.clone()) {
                    self.state.toggle_agent(&id);
                    self.move_down();
                }
            }
        }
    }

    pub fn select_all(&mut self) {
        match self.state.view() {
            View::Items => self.state.select_all_items(),
            View::Agents => self.state.select_all_agents(),
        }
    }

    pub fn deselect_all(&mut self) {
        match self.state.view() {
            View::Items => self.state.deselect_all_items(),
            View::Agents => self.state.deselect_all_agents(),
        }
    }

    // ── Filters ───────────────────────────────────────────────────────

    /// All types, then each type in turn.
    pub fn cycle_type_filter(&mut self) {
        let next = match self.state.filter().item_type {
            None => Some(ItemType::Skill),
            Some(ItemType::Skill) => Some(ItemType::Rule),
            Some(ItemType::Rule) => Some(ItemType::Workflow),
            Some(ItemType::Workflow) => None,
        };
        self.state.set_type_filter(next);
        self.clamp_cursors();
    }

    pub fn open_search(&mut self) {
        self.mode = Mode::Search;
    }

    pub fn search_push(&mut self, c: char) {
        let mut query = self.state.filter().query.clone();
        query.push(c);
        self.state.set_search(&query);
        self.clamp_cursors();
    }

    pub fn search_pop(&mut self) {
        let mut query = self.state.filter().query.clone();
        query.pop();
        self.state.set_search(&query);
        self.clamp_cursors();
    }

    /// Leave the search bar, dropping the query unless `keep`.
    pub fn close_search(&mut self, keep: bool) {
        if !keep {
            self.state.set_search("");
            self.clamp_cursors();
        }
        self.mode = Mode::Normal;
    }

    pub fn open_tag_picker(&mut self) {
        self.mode = Mode::TagPicker(TagPicker {
            cursor: 0,
            chosen: self.state.filter().tag_ids.clone(),
        });
    }

    pub fn tag_picker_move(&mut self, down: bool) {
        let len = self.state.tags().len();
        if let Mode::TagPicker(picker) = &mut self.mode {
            picker.cursor = step(picker.cursor, len, down);
        }
    }

    pub fn tag_picker_toggle(&mut self) {
        let Mode::TagPicker(picker) = &mut self.mode else {
            return;
        };
        if let Some(tag) = self.state.tags().get(picker.cursor) {
            if !picker.chosen.remove(&tag.id) {
                picker.chosen.insert(tag.id.clone());
            }
        }
    }

    pub fn apply_tag_picker(&mut self) {
        if let Mode::TagPicker(picker) = std::mem::replace(&mut self.mode, Mode::Normal) {
            self.state.set_tag_filter(picker.chosen);
            self.clamp_cursors();
        }
    }

    // ── Create ────────────────────────────────────────────────────────

    pub fn open_create(&mut self, item_type: Option<ItemType>) {
        self.state.set_creating(true, item_type);
        self.mode = Mode::Create(CreateForm::new(self.state.create_type()));
    }

    pub fn cancel_create(&mut self) {
        self.state.set_creating(false, None);
        self.mode = Mode::Normal;
    }

    pub fn form_mut(&mut self) -> Option<&mut CreateForm> {
        match &mut self.mode {
            Mode::Create(form) => Some(form),
            _ => None,
        }
    }

    pub fn form_tag_move(&mut self, down: bool) {
        let len = self.state.tags().len();
        if let Some(form) = self.form_mut() {
            form.tag_cursor = step(form.tag_cursor, len, down);
        }
    }

    pub fn form_tag_toggle(&mut self) {
        let Mode::Create(form) = &mut self.mode else {
            return;
        };
        if let Some(tag) = self.state.tags().get(form.tag_cursor) {
            if !form.tag_ids.remove(&tag.id) {
                form.tag_ids.insert(tag.id.clone());
            }
        }
    }

    /// Whether the form still needs its content written in the editor.
    pub fn form_needs_content(&self) -> bool {
        matches!(&self.mode, Mode::Create(form) if form.content.trim().is_empty())
    }

    pub fn submit_create(&mut self) {
        let Mode::Create(form) = &self.mode else {
            return;
        };
        let draft = form.draft();
        match self.state.create_item(&draft) {
            Ok(item) => {
                self.state.set_creating(false, None);
                self.mode = Mode::Normal;
                self.clamp_cursors();
                if let Some(pos) = self
                    .state
                    .filtered_items()
                    .iter()
                    .position(|i| i.id == item.id)
                {
                    self.items_list.select(Some(pos));
                }
                info!(id = %item.id, "item created from tui");
                self.info(format!("Created {} '{}'", item.item_type, item.name));
            }
            Err(e) => {
                if let Some(form) = self.form_mut() {
                    form.error = Some(e.to_string());
                }
            }
        }
    }

    // ── Agent create ──────────────────────────────────────────────────

    pub fn open_create_agent(&mut self) {
        self.mode = Mode::CreateAgent(AgentForm::new());
    }

    pub fn agent_form_mut(&mut self) -> Option<&mut AgentForm> {
        match &mut self.mode {
            Mode::CreateAgent(form) => Some(form),
            _ => None,
        }
    }

    pub fn submit_agent(&mut self) {
        let Mode::CreateAgent(form) = &self.mode else {
            return;
        };
        let draft = form.draft();
        match self.state.create_agent(&draft) {
            Ok(agent) => {
                self.mode = Mode::Normal;
                self.clamp_cursors();
                if let Some(pos) = self.state.agents().iter().position(|a| a.id == agent.id) {
                    self.agents_list.select(Some(pos));
                }
                info!(id = %agent.id, "agent created from tui");
                self.info(format!("Created agent '{}'", agent.name));
            }
            Err(e) => {
                if let Some(form) = self.agent_form_mut() {
                    form.error = Some(e.to_string());
                }
            }
        }
    }

    // ── Tag manager ───────────────────────────────────────────────────

    pub fn open_tags(&mut self) {
        self.mode = Mode::Tags(TagManager {
            cursor: 0,
            input: None,
        });
    }

    fn tag_manager_mut(&mut self) -> Option<&mut TagManager> {
        match &mut self.mode {
            Mode::Tags(manager) => Some(manager),
            _ => None,
        }
    }

    pub fn tag_input_mut(&mut self) -> Option<&mut TagInput> {
        self.tag_manager_mut().and_then(|m| m.input.as_mut())
    }

    pub fn tags_move(&mut self, down: bool) {
        let len = self.state.tags().len();
        if let Some(manager) = self.tag_manager_mut() {
            manager.cursor = step(manager.cursor, len, down);
        }
    }

    fn tag_under_cursor(&self) -> Option<&crate::model::Tag> {
        match &self.mode {
            Mode::Tags(manager) => self.state.tags().get(manager.cursor),
            _ => None,
        }
    }

    pub fn tags_new(&mut self) {
        if let Some(manager) = self.tag_manager_mut() {
            manager.input = Some(TagInput {
                editing: None,
                name: String::new(),
                color: DEFAULT_TAG_COLOR.to_string(),
                focused: TagField::Name,
            });
        }
    }

    pub fn tags_edit(&mut self) {
        let Some(tag) = self.tag_under_cursor().cloned() else {
            return;
        };
        if let Some(manager) = self.tag_manager_mut() {
            manager.input = Some(TagInput {
                editing: Some(tag.id),
                name: tag.name,
                color: tag.color,
                focused: TagField::Name,
            });
        }
    }

    pub fn tags_cancel_input(&mut self) {
        if let Some(manager) = self.tag_manager_mut() {
            manager.input = None;
        }
    }

    /// Create or update from the input line. Errors go to the status line
    /// and keep the input open.
    pub fn tags_submit(&mut self) {
        let Some(input) = self.tag_input_mut() else {
            return;
        };
        let (editing, name, color) = (input.editing.clone(), input.name.clone(), input.color.clone());
        let result = match &editing {
            Some(id) => self.state.update_tag(id, &name, &color),
            None => self.state.create_tag(&name, &color),
        };
        let Some(tag) = self.report(result) else {
            return;
        };
        let verb = if editing.is_some() { "Updated" } else { "Created" };
        self.info(format!("{verb} tag '{}'", tag.name));
        let pos = self.state.tags().iter().position(|t| t.id == tag.id);
        if let Some(manager) = self.tag_manager_mut() {
            manager.input = None;
            if let Some(pos) = pos {
                manager.cursor = pos;
            }
        }
        self.clamp_cursors();
    }

    /// Delete the tag under the cursor. System tags are refused.
    pub fn tags_delete(&mut self) {
        let Some(tag) = self.tag_under_cursor().cloned() else {
            return;
        };
        let result = self.state.delete_tag(&tag.id);
        if self.report(result).is_none() {
            return;
        }
        self.info(format!("Deleted tag '{}'", tag.name));
        let len = self.state.tags().len();
        if let Some(manager) = self.tag_manager_mut() {
            manager.cursor = manager.cursor.min(len.saturating_sub(1));
        }
        self.clamp_cursors();
    }

    // ── Edit ──────────────────────────────────────────────────────────

    /// Pick what `e` edits and the text the editor starts with.
    pub fn begin_edit(&mut self) -> Option<(EditTarget, String)> {
        match self.state.view() {
            View::Items => {
                let item = self.current_item()?.clone();
                let request = (EditTarget::Item(item.id.clone()), item.content.clone());
                self.state.set_editing_item(Some(item));
                Some(request)
            }
            View::Agents => {
                let agent = self.current_agent()?.clone();
                let initial = agent.prompt_content.clone().unwrap_or_default();
                let request = (EditTarget::Agent(agent.id.clone()), initial);
                self.state.set_editing_agent(Some(agent));
                Some(request)
            }
        }
    }

    pub fn finish_edit(&mut self, target: &EditTarget, content: Option<String>) {
        match target {
            EditTarget::Item(id) => {
                let unchanged = self
                    .state
                    .editing_item()
                    .is_some_and(|i| Some(&i.content) == content.as_ref());
                if let Some(content) = content.filter(|_| !unchanged) {
                    let patch = ItemPatch {
                        content: Some(content),
                        ..ItemPatch::default()
                    };
                    let result = self.state.update_item(id, &patch);
                    if let Some(item) = self.report(result) {
                        self.info(format!("Saved '{}'", item.name));
                    }
                }
                self.state.set_editing_item(None);
            }
            EditTarget::Agent(id) => {
                let prompt = content.map(|c| if c.trim().is_empty() { None } else { Some(c) });
                let unchanged = self
                    .state
                    .editing_agent()
                    .is_some_and(|a| Some(&a.prompt_content) == prompt.as_ref());
                if let Some(prompt) = prompt.filter(|_| !unchanged) {
                    let patch = AgentPatch {
                        prompt_content: Some(prompt),
                        ..AgentPatch::default()
                    };
                    let result = self.state.update_agent(id, &patch);
                    if let Some(agent) = self.report(result) {
                        self.info(format!("Saved '{}'", agent.name));
                    }
                }
                self.state.set_editing_agent(None);
            }
        }
        self.clamp_cursors();
    }

    // ── Delete ────────────────────────────────────────────────────────

    pub fn request_delete(&mut self) {
        let target = match self.state.view() {
            View::Items => self.current_item().map(|i| DeleteTarget::Item {
                id: i.id.clone(),
                name: i.name.clone(),
            }),
            View::Agents => self.current_agent().map(|a| DeleteTarget::Agent {
                id: a.id.clone(),
                name: a.name.clone(),
            }),
        };
        if let Some(target) = target {
            self.mode = Mode::ConfirmDelete(target);
        }
    }

    pub fn confirm_delete(&mut self) {
        let Mode::ConfirmDelete(target) = std::mem::replace(&mut self.mode, Mode::Normal) else {
            return;
        };
        let (result, name) = match &target {
            DeleteTarget::Item { id, name } => (self.state.delete_item(id), name),
            DeleteTarget::Agent { id, name } => (self.state.delete_agent(id), name),
        };
        if self.report(result).is_some() {
            self.info(format!("Deleted '{name}'"));
        }
        self.clamp_cursors();
    }

    // ── Clipboard ─────────────────────────────────────────────────────

    fn with_clipboard(
        &mut self,
        copy: impl FnOnce(&mut dyn Clipboard, &Self) -> crate::error::Result<()>,
        done: &str,
    ) {
        let mut clip = match self.clipboard.take() {
            Some(c) => c,
            None => match SystemClipboard::new() {
                Ok(c) => Box::new(c),
                Err(e) => {
                    warn!(error = %e, "clipboard unavailable");
                    self.error(e.to_string());
                    return;
                }
            },
        };
        let result = copy(clip.as_mut(), self);
        self.clipboard = Some(clip);
        if self.report(result).is_some() {
            self.info(done);
        }
    }

    pub fn copy_content(&mut self) {
        if self.current_item().is_none() {
            return;
        }
        self.with_clipboard(
            |clip, app| match app.current_item() {
                Some(item) => clipboard::copy_content(clip, item),
                None => Ok(()),
            },
            "Copied content",
        );
    }

    pub fn copy_command(&mut self) {
        match self.state.view() {
            View::Items => self.with_clipboard(
                |clip, app| clipboard::copy_sync_command(clip, &app.target_items()),
                "Copied sync command",
            ),
            View::Agents => self.with_clipboard(
                |clip, app| clipboard::copy_sync_agents_command(clip, &app.target_agents()),
                "Copied sync-agents command",
            ),
        }
    }

    pub fn copy_agent_json(&mut self) {
        self.with_clipboard(
            |clip, app| {
                let agents: Vec<Agent> = app.target_agents().into_iter().cloned().collect();
                clipboard::copy_agent_json(clip, &agents)
            },
            "Copied agent JSON",
        );
    }

    // ── Export ────────────────────────────────────────────────────────

    pub fn open_export(&mut self) {
        if self.target_items().is_empty() {
            self.error("no items to export");
            return;
        }
        self.mode = Mode::Export {
            path: self.export_dir.display().to_string(),
        };
    }

    pub fn export_path_mut(&mut self) -> Option<&mut String> {
        match &mut self.mode {
            Mode::Export { path } => Some(path),
            _ => None,
        }
    }

    pub fn run_export(&mut self) {
        let Mode::Export { path } = std::mem::replace(&mut self.mode, Mode::Normal) else {
            return;
        };
        let root = PathBuf::from(path.trim());
        let items: Vec<Item> = self.target_items().into_iter().cloned().collect();
        let result = export::export_items(&items, &root);
        if let Some(written) = self.report(result) {
            self.info(format!("Exported {} file(s) to {}", written.len(), root.display()));
            self.export_dir = root;
        }
    }

    // ── Escape ────────────────────────────────────────────────────────

    pub fn escape(&mut self) {
        self.status = None;
        self.deselect_all();
    }
}

/// Move a cursor one step within `0..len`, stopping at the ends.
fn step(cursor: usize, len: usize, down: bool) -> usize {
    if down {
        if cursor + 1 < len {
            cursor + 1
        } else {
            cursor
        }
    } else {
        cursor.saturating_sub(1)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::db;
    use crate::model::AgentDraft;

    #[derive(Clone, Default)]
    pub(crate) struct SharedClipboard(pub(crate) Rc<RefCell<Option<String>>>);

    impl Clipboard for SharedClipboard {
        fn set_text(&mut self, text: &str) -> crate::error::Result<()> {
            *self.0.borrow_mut() = Some(text.to_string());
            Ok(())
        }
    }

    pub(crate) fn test_app() -> (App, SharedClipboard) {
        let conn = db::open_memory().unwrap();
        let mut state = AppState::new(conn);
        state.load().unwrap();
        let clip = SharedClipboard::default();
        let app = App::new(state, Some(Box::new(clip.clone())), PathBuf::from("."));
        (app, clip)
    }

    pub(crate) fn add_item(app: &mut App, name: &str, item_type: ItemType) -> Item {
        let item = app
            .state
            .create_item(&ItemDraft {
                name: name.into(),
                content: format!("{name} body"),
                item_type,
                tag_ids: vec![],
            })
            .unwrap();
        app.clamp_cursors();
        item
    }

    #[test]
    fn cursor_clamps_after_delete() {
        let (mut app, _) = test_app();
        add_item(&mut app, "one", ItemType::Skill);
        add_item(&mut app, "two", ItemType::Skill);
        app.move_down();
        assert_eq!(app.cursor(), Some(1));
        app.request_delete();
        app.confirm_delete();
        assert_eq!(app.state.items().len(), 1);
        assert_eq!(app.cursor(), Some(0));
    }

    #[test]
    fn type_filter_cycles_back_to_all() {
        let (mut app, _) = test_app();
        add_item(&mut app, "s", ItemType::Skill);
        add_item(&mut app, "r", ItemType::Rule);
        app.cycle_type_filter();
        assert_eq!(app.state.filtered_items().len(), 1);
        app.cycle_type_filter();
        app.cycle_type_filter();
        assert_eq!(app.state.filter().item_type, Some(ItemType::Workflow));
        assert_eq!(app.cursor(), None);
        app.cycle_type_filter();
        assert_eq!(app.state.filtered_items().len(), 2);
        assert_eq!(app.cursor(), Some(0));
    }

    #[test]
    fn create_form_requires_content() {
        let (mut app, _) = test_app();
        app.open_create(Some(ItemType::Rule));
        assert!(app.form_needs_content());
        let form = app.form_mut().unwrap();
        form.name = "Lint".into();
        app.submit_create();
        assert!(app.form_mut().unwrap().error.is_some());

        app.form_mut().unwrap().content = "Run clippy.".into();
        app.submit_create();
        assert!(matches!(app.mode, Mode::Normal));
        assert!(!app.state.is_creating());
        assert_eq!(app.current_item().unwrap().item_type, ItemType::Rule);
    }

    #[test]
    fn create_form_tags_toggle() {
        let (mut app, _) = test_app();
        app.open_create(None);
        app.form_tag_move(true);
        app.form_tag_toggle();
        let chosen = app.state.tags()[1].id.clone();
        assert!(app.form_mut().unwrap().tag_ids.contains(&chosen));
        app.form_tag_toggle();
        assert!(app.form_mut().unwrap().tag_ids.is_empty());
    }

    #[test]
    fn edit_updates_content_and_clears_editor() {
        let (mut app, _) = test_app();
        add_item(&mut app, "doc", ItemType::Skill);
        let (target, initial) = app.begin_edit().unwrap();
        assert_eq!(initial, "doc body");
        assert!(app.state.editing_item().is_some());
        app.finish_edit(&target, Some("new body".into()));
        assert_eq!(app.current_item().unwrap().content, "new body");
        assert!(app.state.editing_item().is_none());
    }

    #[test]
    fn unchanged_edit_skips_the_store() {
        let (mut app, _) = test_app();
        let item = app
            .state
            .create_item(&ItemDraft {
                name: "piped".into(),
                content: "Review carefully.\n".into(),
                item_type: ItemType::Rule,
                tag_ids: vec![],
            })
            .unwrap();
        app.clamp_cursors();
        let (target, initial) = app.begin_edit().unwrap();
        assert_eq!(initial, "Review carefully.\n");
        app.finish_edit(&target, Some(initial));
        let stored = crate::ops::get_item(app.state.store(), &item.id).unwrap();
        assert_eq!(stored.content, "Review carefully.\n");
        assert_eq!(stored.updated_at, item.updated_at);
        assert!(app.status.is_none());
    }

    #[test]
    fn copy_command_uses_selection_or_cursor() {
        let (mut app, clip) = test_app();
        let a = add_item(&mut app, "a", ItemType::Skill);
        let b = add_item(&mut app, "b", ItemType::Skill);
        app.copy_command();
        assert_eq!(
            clip.0.borrow().as_deref(),
            Some(format!("promption sync --ids={}", b.id).as_str())
        );
        app.select_all();
        app.copy_command();
        let text = clip.0.borrow().clone().unwrap();
        assert!(text.contains(&a.id) && text.contains(&b.id));
    }

    #[test]
    fn agent_view_copies_json() {
        let (mut app, clip) = test_app();
        app.state
            .create_agent(&AgentDraft {
                name: "reviewer".into(),
                ..AgentDraft::default()
            })
            .unwrap();
        app.clamp_cursors();
        app.switch_view();
        app.copy_agent_json();
        let text = clip.0.borrow().clone().unwrap();
        assert!(text.contains("\"reviewer\""));
        assert!(!app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn search_escape_clears_query() {
        let (mut app, _) = test_app();
        add_item(&mut app, "alpha", ItemType::Skill);
        add_item(&mut app, "beta", ItemType::Skill);
        app.open_search();
        app.search_push('a');
        app.search_push('l');
        assert_eq!(app.state.filtered_items().len(), 1);
        app.close_search(false);
        assert_eq!(app.state.filtered_items().len(), 2);
    }

    #[test]
    fn export_writes_current_item() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, _) = test_app();
        add_item(&mut app, "Flow", ItemType::Workflow);
        app.open_export();
        *app.export_path_mut().unwrap() = dir.path().display().to_string();
        app.run_export();
        assert!(dir.path().join("workflows/flow.md").exists());
        assert!(!app.status.as_ref().unwrap().is_error);
    }
}
