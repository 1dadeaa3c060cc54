use std::collections::{BTreeMap, HashMap};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    Agent, AgentDraft, AgentMode, AgentPatch, Item, ItemDraft, ItemPatch, ItemType, Tag,
};
use crate::validate::{
    validate_agent_draft, validate_agent_patch, validate_item_draft, validate_item_patch,
    validate_tag_color, validate_tag_name,
};

impl FromSql for ItemType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        ItemType::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for ItemType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for AgentMode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        AgentMode::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for AgentMode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ── Items ──────────────────────────────────────────────────────────────

const ITEM_COLUMNS: &str = "id, name, content, item_type, created_at, updated_at";

const INSERT_ITEM: &str = "
INSERT INTO items (id, name, content, item_type)
VALUES (?1, ?2, ?3, ?4)
";

const UPDATE_ITEM: &str = "
UPDATE items
SET name = COALESCE(?1, name),
    content = COALESCE(?2, content),
    item_type = COALESCE(?3, item_type),
    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
WHERE id = ?4
";

const TAG_COLUMNS: &str = "id, name, color, is_system";

fn read_item_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        item_type: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        tags: Vec::new(),
    })
}

fn read_tag_row(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        is_system: row.get::<_, i64>(3)? != 0,
    })
}

fn item_exists(conn: &Connection, id: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn require_item(conn: &Connection, id: &str) -> Result<()> {
    if !item_exists(conn, id)? {
        return Err(Error::not_found("item", id));
    }
    Ok(())
}

fn tags_for_item(conn: &Connection, item_id: &str) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.name, t.color, t.is_system
         FROM tags t INNER JOIN item_tags it ON t.id = it.tag_id
         WHERE it.item_id = ?1
         ORDER BY t.name",
    )?;
    let rows = stmt.query_map([item_id], read_tag_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// All item → tags links, keyed by item id.
fn all_item_tags(conn: &Connection) -> Result<HashMap<String, Vec<Tag>>> {
    let mut stmt = conn.prepare(
        "SELECT it.item_id, t.id, t.name, t.color, t.is_system
         FROM item_tags it INNER JOIN tags t ON t.id = it.tag_id
         ORDER BY t.name",
    )?;
    let mut map: HashMap<String, Vec<Tag>> = HashMap::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let item_id: String = row.get(0)?;
        let tag = Tag {
            id: row.get(1)?,
            name: row.get(2)?,
            color: row.get(3)?,
            is_system: row.get::<_, i64>(4)? != 0,
        };
        map.entry(item_id).or_default().push(tag);
    }
    Ok(map)
}

fn link_tags(conn: &Connection, item_id: &str, tag_ids: &[String]) -> Result<()> {
    for tag_id in tag_ids {
        require_tag(conn, tag_id)?;
        conn.execute(
            "INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?1, ?2)",
            rusqlite::params![item_id, tag_id],
        )?;
    }
    Ok(())
}

pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ITEM_COLUMNS} FROM items ORDER BY updated_at DESC, rowid DESC"
    ))?;
    let mut items = stmt
        .query_map([], read_item_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut tags = all_item_tags(conn)?;
    for item in &mut items {
        item.tags = tags.remove(&item.id).unwrap_or_default();
    }
    debug!(count = items.len(), "loaded items");
    Ok(items)
}

pub fn get_item(conn: &Connection, id: &str) -> Result<Item> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1"),
            [id],
            read_item_row,
        )
        .optional()?;
    let mut item = item.ok_or_else(|| Error::not_found("item", id))?;
    item.tags = tags_for_item(conn, id)?;
    Ok(item)
}

/// Fetch items in the order requested. Unknown and repeated ids are skipped.
pub fn get_items_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<Item>> {
    let mut items: Vec<Item> = Vec::new();
    for id in ids {
        if items.iter().any(|i| &i.id == id) {
            continue;
        }
        match get_item(conn, id) {
            Ok(item) => items.push(item),
            Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(items)
}

pub fn create_item(conn: &Connection, draft: &ItemDraft) -> Result<Item> {
    validate_item_draft(draft)?;
    let id = new_id();
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        INSERT_ITEM,
        rusqlite::params![id, draft.name.trim(), draft.content, draft.item_type],
    )?;
    link_tags(&tx, &id, &draft.tag_ids)?;
    tx.commit()?;
    info!(%id, tags = draft.tag_ids.len(), "created item");
    get_item(conn, &id)
}

pub fn update_item(conn: &Connection, id: &str, patch: &ItemPatch) -> Result<Item> {
    require_item(conn, id)?;
    validate_item_patch(patch)?;
    if patch.is_empty() {
        return get_item(conn, id);
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        UPDATE_ITEM,
        rusqlite::params![
            patch.name.as_deref().map(str::trim),
            patch.content.as_deref(),
            patch.item_type,
            id
        ],
    )?;
    if let Some(tag_ids) = &patch.tag_ids {
        tx.execute("DELETE FROM item_tags WHERE item_id = ?1", [id])?;
        link_tags(&tx, id, tag_ids)?;
    }
    tx.commit()?;
    info!(%id, "updated item");
    get_item(conn, id)
}

pub fn delete_item(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM items WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(Error::not_found("item", id));
    }
    info!(%id, "deleted item");
    Ok(())
}

// ── Tags ───────────────────────────────────────────────────────────────

fn require_tag(conn: &Connection, id: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(Error::not_found("tag", id));
    }
    Ok(())
}

fn tag_name_taken(conn: &Connection, name: &str, except_id: Option<&str>) -> Result<bool> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE lower(name) = lower(?1) AND id IS NOT ?2)",
        rusqlite::params![name, except_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TAG_COLUMNS} FROM tags ORDER BY name COLLATE NOCASE"
    ))?;
    let tags = stmt
        .query_map([], read_tag_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(count = tags.len(), "loaded tags");
    Ok(tags)
}

pub fn get_tag(conn: &Connection, id: &str) -> Result<Tag> {
    conn.query_row(
        &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
        [id],
        read_tag_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("tag", id))
}

/// Look a tag up by id, falling back to a case-insensitive name match.
pub fn find_tag(conn: &Connection, id_or_name: &str) -> Result<Tag> {
    conn.query_row(
        &format!(
            "SELECT {TAG_COLUMNS} FROM tags
             WHERE id = ?1 OR lower(name) = lower(?1)
             ORDER BY id = ?1 DESC LIMIT 1"
        ),
        [id_or_name],
        read_tag_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("tag", id_or_name))
}

pub fn create_tag(conn: &Connection, name: &str, color: &str) -> Result<Tag> {
    let name = name.trim();
    validate_tag_name(name)?;
    validate_tag_color(color)?;
    if tag_name_taken(conn, name, None)? {
        return Err(Error::Conflict(format!("tag '{name}' already exists")));
    }
    let id = new_id();
    conn.execute(
        "INSERT INTO tags (id, name, color, is_system) VALUES (?1, ?2, ?3, 0)",
        rusqlite::params![id, name, color],
    )?;
    info!(%id, name, "created tag");
    get_tag(conn, &id)
}

pub fn update_tag(conn: &Connection, id: &str, name: &str, color: &str) -> Result<Tag> {
    let name = name.trim();
    validate_tag_name(name)?;
    validate_tag_color(color)?;
    require_tag(conn, id)?;
    if tag_name_taken(conn, name, Some(id))? {
        return Err(Error::Conflict(format!("tag '{name}' already exists")));
    }
    conn.execute(
        "UPDATE tags SET name = ?1, color = ?2 WHERE id = ?3",
        rusqlite::params![name, color, id],
    )?;
    info!(%id, name, "updated tag");
    get_tag(conn, id)
}

pub fn delete_tag(conn: &Connection, id: &str) -> Result<()> {
    let tag = get_tag(conn, id)?;
    if tag.is_system {
        return Err(Error::SystemTag(tag.name));
    }
    conn.execute("DELETE FROM tags WHERE id = ?1", [id])?;
    info!(%id, name = %tag.name, "deleted tag");
    Ok(())
}

// ── Agents ─────────────────────────────────────────────────────────────

const AGENT_COLUMNS: &str = "id, name, mode, model, prompt_content, tools_config, \
     permissions_config, created_at, updated_at";

const INSERT_AGENT: &str = "
INSERT INTO agents (id, name, mode, model, prompt_content, tools_config, permissions_config)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";

const UPDATE_AGENT: &str = "
UPDATE agents
SET name = ?1, mode = ?2, model = ?3, prompt_content = ?4,
    tools_config = ?5, permissions_config = ?6,
    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
WHERE id = ?7
";

fn json_column<T: DeserializeOwned>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let Some(text) = row.get::<_, Option<String>>(idx)? else {
        return Ok(None);
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Serialize a config map for storage. Empty maps are stored as NULL.
fn to_json_column<V: Serialize>(map: Option<&BTreeMap<String, V>>) -> Result<Option<String>> {
    match map {
        Some(m) if !m.is_empty() => Ok(Some(serde_json::to_string(m)?)),
        _ => Ok(None),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn read_agent_row(row: &rusqlite::Row) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        mode: row.get(2)?,
        model: row.get(3)?,
        prompt_content: row.get(4)?,
        tools_config: json_column(row, 5)?,
        permissions_config: json_column(row, 6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn agent_name_taken(conn: &Connection, name: &str, except_id: Option<&str>) -> Result<bool> {
    let taken = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM agents WHERE name = ?1 AND id IS NOT ?2)",
        rusqlite::params![name, except_id],
        |row| row.get(0),
    )?;
    Ok(taken)
}

pub fn list_agents(conn: &Connection) -> Result<Vec<Agent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {AGENT_COLUMNS} FROM agents ORDER BY updated_at DESC, rowid DESC"
    ))?;
    let agents = stmt
        .query_map([], read_agent_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(count = agents.len(), "loaded agents");
    Ok(agents)
}

pub fn get_agent(conn: &Connection, id: &str) -> Result<Agent> {
    conn.query_row(
        &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
        [id],
        read_agent_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("agent", id))
}

/// Look an agent up by id, falling back to its name.
pub fn find_agent(conn: &Connection, id_or_name: &str) -> Result<Agent> {
    conn.query_row(
        &format!(
            "SELECT {AGENT_COLUMNS} FROM agents
             WHERE id = ?1 OR name = ?1
             ORDER BY id = ?1 DESC LIMIT 1"
        ),
        [id_or_name],
        read_agent_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("agent", id_or_name))
}

/// Fetch agents by id or name in the order requested, skipping unknown ones.
pub fn get_agents_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<Agent>> {
    let mut agents: Vec<Agent> = Vec::new();
    for id in ids {
        match find_agent(conn, id) {
            Ok(agent) if !agents.iter().any(|a| a.id == agent.id) => agents.push(agent),
            Ok(_) | Err(Error::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(agents)
}

pub fn create_agent(conn: &Connection, draft: &AgentDraft) -> Result<Agent> {
    validate_agent_draft(draft)?;
    if agent_name_taken(conn, &draft.name, None)? {
        return Err(Error::Conflict(format!(
            "agent '{}' already exists",
            draft.name
        )));
    }
    let id = new_id();
    conn.execute(
        INSERT_AGENT,
        rusqlite::params![
            id,
            draft.name,
            draft.mode,
            non_empty(draft.model.as_deref()),
            non_empty(draft.prompt_content.as_deref()),
            to_json_column(draft.tools_config.as_ref())?,
            to_json_column(draft.permissions_config.as_ref())?,
        ],
    )?;
    info!(%id, name = %draft.name, "created agent");
    get_agent(conn, &id)
}

pub fn update_agent(conn: &Connection, id: &str, patch: &AgentPatch) -> Result<Agent> {
    let current = get_agent(conn, id)?;
    validate_agent_patch(patch)?;
    let name = patch.name.clone().unwrap_or(current.name);
    if agent_name_taken(conn, &name, Some(id))? {
        return Err(Error::Conflict(format!("agent '{name}' already exists")));
    }
    let mode = patch.mode.unwrap_or(current.mode);
    let model = patch.model.clone().unwrap_or(current.model);
    let prompt = patch.prompt_content.clone().unwrap_or(current.prompt_content);
    let tools = patch.tools_config.clone().unwrap_or(current.tools_config);
    let permissions = patch
        .permissions_config
        .clone()
        .unwrap_or(current.permissions_config);
    conn.execute(
        UPDATE_AGENT,
        rusqlite::params![
            name,
            mode,
            non_empty(model.as_deref()),
            non_empty(prompt.as_deref()),
            to_json_column(tools.as_ref())?,
            to_json_column(permissions.as_ref())?,
            id,
        ],
    )?;
    info!(%id, %name, "updated agent");
    get_agent(conn, id)
}

pub fn delete_agent(conn: &Connection, id: &str) -> Result<()> {
    let changed = conn.execute("DELETE FROM agents WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(Error::not_found("agent", id));
    }
    info!(%id, "deleted agent");
    Ok(())
}
