use rusqlite::Connection;

use crate::error::Result;
use crate::model::{Agent, AgentDraft, AgentPatch, Item, ItemDraft, ItemPatch, Tag};
use crate::ops;

/// Persistent operations the application state needs.
pub trait Store {
    fn list_items(&self) -> Result<Vec<Item>>;
    fn create_item(&self, draft: &ItemDraft) -> Result<Item>;
    fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<Item>;
    fn delete_item(&self, id: &str) -> Result<()>;

    fn list_tags(&self) -> Result<Vec<Tag>>;
    fn create_tag(&self, name: &str, color: &str) -> Result<Tag>;
    fn update_tag(&self, id: &str, name: &str, color: &str) -> Result<Tag>;
    fn delete_tag(&self, id: &str) -> Result<()>;

    fn list_agents(&self) -> Result<Vec<Agent>>;
    fn create_agent(&self, draft: &AgentDraft) -> Result<Agent>;
    fn update_agent(&self, id: &str, patch: &AgentPatch) -> Result<Agent>;
    fn delete_agent(&self, id: &str) -> Result<()>;
}

impl Store for Connection {
    fn list_items(&self) -> Result<Vec<Item>> {
        ops::list_items(self)
    }

    fn create_item(&self, draft: &ItemDraft) -> Result<Item> {
        ops::create_item(self, draft)
    }

    fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<Item> {
        ops::update_item(self, id, patch)
    }

    fn delete_item(&self, id: &str) -> Result<()> {
        ops::delete_item(self, id)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        ops::list_tags(self)
    }

    fn create_tag(&self, name: &str, color: &str) -> Result<Tag> {
        ops::create_tag(self, name, color)
    }

    fn update_tag(&self, id: &str, name: &str, color: &str) -> Result<Tag> {
        ops::update_tag(self, id, name, color)
    }

    fn delete_tag(&self, id: &str) -> Result<()> {
        ops::delete_tag(self, id)
    }

    fn list_agents(&self) -> Result<Vec<Agent>> {
        ops::list_agents(self)
    }

    fn create_agent(&self, draft: &AgentDraft) -> Result<Agent> {
        ops::create_agent(self, draft)
    }

    fn update_agent(&self, id: &str, patch: &AgentPatch) -> Result<Agent> {
        ops::update_agent(self, id, patch)
    }

    fn delete_agent(&self, id: &str) -> Result<()> {
        ops::delete_agent(self, id)
    }
}
