//! In-memory mirror of the store plus the UI-facing state derived from it.
//!
//! Every action calls the store first and only touches the mirror after the
//! call succeeded, so a failed action leaves the state exactly as it was.

use std::fmt;

use tracing::{debug, error};

use crate::error::Error;
use crate::filter::{filter_items, ItemFilter};
use crate::model::{Agent, AgentDraft, AgentPatch, Item, ItemDraft, ItemPatch, ItemType, Tag};
use crate::selection::Selection;
use crate::store::Store;
use crate::validate::{validate_agent_draft, validate_agent_patch, validate_item_draft, validate_item_patch};

/// A failed action, reduced to the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ActionError {}

impl From<Error> for ActionError {
    fn from(err: Error) -> Self {
        Self::new(err.to_string())
    }
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

fn failed(action: &str, err: Error) -> ActionError {
    error!(action, error = %err, "action failed");
    err.into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Items,
    Agents,
}

pub struct AppState<S: Store> {
    store: S,
    items: Vec<Item>,
    tags: Vec<Tag>,
    agents: Vec<Agent>,
    selected_items: Selection<String>,
    selected_agents: Selection<String>,
    filter: ItemFilter,
    filtered: Vec<Item>,
    loading: bool,
    editing_item: Option<Item>,
    editing_agent: Option<Agent>,
    creating: bool,
    create_type: ItemType,
    view: View,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            items: Vec::new(),
            tags: Vec::new(),
            agents: Vec::new(),
            selected_items: Selection::new(),
            selected_agents: Selection::new(),
            filter: ItemFilter::default(),
            filtered: Vec::new(),
            loading: false,
            editing_item: None,
            editing_agent: None,
            creating: false,
            create_type: ItemType::Skill,
            view: View::Items,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Items passing the active filters, in mirror order.
    pub fn filtered_items(&self) -> &[Item] {
        &self.filtered
    }

    pub fn filter(&self) -> &ItemFilter {
        &self.filter
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn editing_item(&self) -> Option<&Item> {
        self.editing_item.as_ref()
    }

    pub fn editing_agent(&self) -> Option<&Agent> {
        self.editing_agent.as_ref()
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub fn create_type(&self) -> ItemType {
        self.create_type
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn item_selection(&self) -> &Selection<String> {
        &self.selected_items
    }

    pub fn agent_selection(&self) -> &Selection<String> {
        &self.selected_agents
    }

    pub fn selected_items(&self) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|i| self.selected_items.contains(&i.id))
            .collect()
    }

    pub fn selected_agents(&self) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|a| self.selected_agents.contains(&a.id))
            .collect()
    }

    fn recompute(&mut self) {
        self.filtered = filter_items(&self.items, &self.filter);
    }

    // ── Loading ───────────────────────────────────────────────────────

    /// Replace the whole mirror with the store's contents.
    pub fn load(&mut self) -> ActionResult<()> {
        self.loading = true;
        let fetched = self.fetch_all();
        self.loading = false;
        let (items, tags, agents) = fetched.map_err(|e| failed("load", e))?;

        self.selected_items
            .retain(|id| items.iter().any(|i| &i.id == id));
        self.selected_agents
            .retain(|id| agents.iter().any(|a| &a.id == id));
        self.filter
            .tag_ids
            .retain(|id| tags.iter().any(|t| &t.id == id));
        self.editing_item = self
            .editing_item
            .take()
            .and_then(|e| items.iter().find(|i| i.id == e.id).cloned());
        self.editing_agent = self
            .editing_agent
            .take()
            .and_then(|e| agents.iter().find(|a| a.id == e.id).cloned());
        self.items = items;
        self.tags = tags;
        self.agents = agents;
        self.recompute();
        debug!(
            items = self.items.len(),
            tags = self.tags.len(),
            agents = self.agents.len(),
            "state loaded"
        );
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn fetch_all(&self) -> crate::error::Result<(Vec<Item>, Vec<Tag>, Vec<Agent>)> {
        let items = self.store.list_items()?;
        let tags = self.store.list_tags()?;
        let agents = self.store.list_agents()?;
        Ok((items, tags, agents))
    }

    // ── Items ─────────────────────────────────────────────────────────

    pub fn create_item(&mut self, draft: &ItemDraft) -> ActionResult<Item> {
        validate_item_draft(draft).map_err(|e| failed("create_item", e))?;
        let item = self
            .store
            .create_item(draft)
            .map_err(|e| failed("create_item", e))?;
        self.items.insert(0, item.clone());
        self.recompute();
        Ok(item)
    }

    pub fn update_item(&mut self, id: &str, patch: &ItemPatch) -> ActionResult<Item> {
        validate_item_patch(patch).map_err(|e| failed("update_item", e))?;
        let item = self
            .store
            .update_item(id, patch)
            .map_err(|e| failed("update_item", e))?;
        if let Some(slot) = self.items.iter_mut().find(|i| i.id == id) {
            *slot = item.clone();
        }
        if self.editing_item.as_ref().is_some_and(|e| e.id == id) {
            self.editing_item = Some(item.clone());
        }
        self.recompute();
        Ok(item)
    }

    pub fn delete_item(&mut self, id: &str) -> ActionResult<()> {
        self.store
            .delete_item(id)
            .map_err(|e| failed("delete_item", e))?;
        self.items.retain(|i| i.id != id);
        self.selected_items.remove(&id.to_string());
        if self.editing_item.as_ref().is_some_and(|e| e.id == id) {
            self.editing_item = None;
        }
        self.recompute();
        Ok(())
    }

    // ── Tags ──────────────────────────────────────────────────────────

    pub fn create_tag(&mut self, name: &str, color: &str) -> ActionResult<Tag> {
        let tag = self
            .store
            .create_tag(name, color)
            .map_err(|e| failed("create_tag", e))?;
        self.tags.push(tag.clone());
        Ok(tag)
    }

    pub fn update_tag(&mut self, id: &str, name: &str, color: &str) -> ActionResult<Tag> {
        let tag = self
            .store
            .update_tag(id, name, color)
            .map_err(|e| failed("update_tag", e))?;
        if let Some(slot) = self.tags.iter_mut().find(|t| t.id == id) {
            *slot = tag.clone();
        }
        let replace = |tags: &mut Vec<Tag>| {
            for t in tags.iter_mut().filter(|t| t.id == tag.id) {
                *t = tag.clone();
            }
        };
        for item in &mut self.items {
            replace(&mut item.tags);
        }
        if let Some(editing) = &mut self.editing_item {
            replace(&mut editing.tags);
        }
        self.recompute();
        Ok(tag)
    }

    pub fn delete_tag(&mut self, id: &str) -> ActionResult<()> {
        if let Some(tag) = self.tags.iter().find(|t| t.id == id && t.is_system) {
            return Err(failed("delete_tag", Error::SystemTag(tag.name.clone())));
        }
        self.store
            .delete_tag(id)
            .map_err(|e| failed("delete_tag", e))?;
        self.tags.retain(|t| t.id != id);
        for item in &mut self.items {
            item.tags.retain(|t| t.id != id);
        }
        if let Some(editing) = &mut self.editing_item {
            editing.tags.retain(|t| t.id != id);
        }
        self.filter.tag_ids.remove(id);
        self.recompute();
        Ok(())
    }

    // ── Agents ────────────────────────────────────────────────────────

    pub fn create_agent(&mut self, draft: &AgentDraft) -> ActionResult<Agent> {
        validate_agent_draft(draft).map_err(|e| failed("create_agent", e))?;
        let agent = self
            .store
            .create_agent(draft)
            .map_err(|e| failed("create_agent", e))?;
        self.agents.insert(0, agent.clone());
        Ok(agent)
    }

    pub fn update_agent(&mut self, id: &str, patch: &AgentPatch) -> ActionResult<Agent> {
        validate_agent_patch(patch).map_err(|e| failed("update_agent", e))?;
        let agent = self
            .store
            .update_agent(id, patch)
            .map_err(|e| failed("update_agent", e))?;
        if let Some(slot) = self.agents.iter_mut().find(|a| a.id == id) {
            *slot = agent.clone();
        }
        if self.editing_agent.as_ref().is_some_and(|e| e.id == id) {
            self.editing_agent = Some(agent.clone());
        }
        Ok(agent)
    }

    pub fn delete_agent(&mut self, id: &str) -> ActionResult<()> {
        self.store
            .delete_agent(id)
            .map_err(|e| failed("delete_agent", e))?;
        self.agents.retain(|a| a.id != id);
        self.selected_agents.remove(&id.to_string());
        if self.editing_agent.as_ref().is_some_and(|e| e.id == id) {
            self.editing_agent = None;
        }
        Ok(())
    }

    // ── Selection ─────────────────────────────────────────────────────

    pub fn toggle_item(&mut self, id: &str) -> bool {
        self.selected_items.toggle(&id.to_string())
    }

    /// Select every item in the filtered view.
    pub fn select_all_items(&mut self) {
        self.selected_items
            .select_all(self.filtered.iter().map(|i| &i.id));
    }

    pub fn deselect_all_items(&mut self) {
        self.selected_items.clear();
    }

    pub fn toggle_agent(&mut self, id: &str) -> bool {
        self.selected_agents.toggle(&id.to_string())
    }

    pub fn select_all_agents(&mut self) {
        self.selected_agents
            .select_all(self.agents.iter().map(|a| &a.id));
    }

    pub fn deselect_all_agents(&mut self) {
        self.selected_agents.clear();
    }

    // ── Filters ───────────────────────────────────────────────────────

    pub fn set_search(&mut self, query: &str) {
        self.filter.query = query.to_string();
        self.recompute();
    }

    pub fn set_type_filter(&mut self, item_type: Option<ItemType>) {
        self.filter.item_type = item_type;
        self.recompute();
    }

    pub fn set_tag_filter<I>(&mut self, tag_ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.filter.tag_ids = tag_ids.into_iter().collect();
        self.recompute();
    }

    // ── UI state ──────────────────────────────────────────────────────

    pub fn set_editing_item(&mut self, item: Option<Item>) {
        self.editing_item = item;
    }

    pub fn set_editing_agent(&mut self, agent: Option<Agent>) {
        self.editing_agent = agent;
    }

    /// Enter or leave create mode. `None` keeps the previous item type.
    pub fn set_creating(&mut self, creating: bool, item_type: Option<ItemType>) {
        self.creating = creating;
        if let Some(t) = item_type {
            self.create_type = t;
        }
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }
}
