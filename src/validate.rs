use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{
    AgentDraft, AgentPatch, ItemDraft, ItemPatch, Permission, PermissionsConfig, ToolSetting,
    ToolsConfig,
};

pub const MAX_ITEM_NAME: usize = 255;
pub const MAX_CONTENT: usize = 1_000_000;
pub const MAX_TAG_NAME: usize = 50;
pub const MAX_AGENT_NAME: usize = 255;

fn invalid(msg: impl Into<String>) -> Error {
    Error::Validation(msg.into())
}

fn kebab_case() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("static regex"))
}

pub fn validate_item_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid("item name must not be empty"));
    }
    if name.chars().count() > MAX_ITEM_NAME {
        return Err(invalid(format!(
            "item name exceeds maximum length of {MAX_ITEM_NAME} characters"
        )));
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(invalid("item content must not be empty"));
    }
    if content.chars().count() > MAX_CONTENT {
        return Err(invalid(format!(
            "item content exceeds maximum length of {MAX_CONTENT} characters"
        )));
    }
    Ok(())
}

pub fn validate_tag_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(invalid("tag name must not be empty"));
    }
    if name.chars().count() > MAX_TAG_NAME {
        return Err(invalid(format!(
            "tag name exceeds maximum length of {MAX_TAG_NAME} characters"
        )));
    }
    Ok(())
}

/// Accepts `#RRGGBB` and `#RRGGBBAA`.
pub fn validate_tag_color(color: &str) -> Result<()> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| invalid(format!("tag color '{color}' must start with '#'")))?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(format!(
            "tag color '{color}' must be #RRGGBB or #RRGGBBAA"
        )));
    }
    Ok(())
}

pub fn validate_agent_name(name: &str) -> Result<()> {
    if !kebab_case().is_match(name) {
        return Err(invalid(format!(
            "agent name '{name}' must be kebab-case (lowercase letters, numbers, and hyphens only)"
        )));
    }
    if name.len() > MAX_AGENT_NAME {
        return Err(invalid(format!(
            "agent name exceeds maximum length of {MAX_AGENT_NAME} characters"
        )));
    }
    Ok(())
}

pub fn validate_item_draft(draft: &ItemDraft) -> Result<()> {
    validate_item_name(&draft.name)?;
    validate_content(&draft.content)
}

pub fn validate_item_patch(patch: &ItemPatch) -> Result<()> {
    if let Some(name) = &patch.name {
        validate_item_name(name)?;
    }
    if let Some(content) = &patch.content {
        validate_content(content)?;
    }
    Ok(())
}

pub fn validate_agent_draft(draft: &AgentDraft) -> Result<()> {
    validate_agent_name(&draft.name)
}

pub fn validate_agent_patch(patch: &AgentPatch) -> Result<()> {
    if let Some(name) = &patch.name {
        validate_agent_name(name)?;
    }
    Ok(())
}

/// Parse `name` (enabled) and `name=value` entries into a tools map.
/// Returns `None` for an empty list.
pub fn parse_tools(entries: &[String]) -> Result<Option<ToolsConfig>> {
    let mut tools = ToolsConfig::new();
    for entry in entries {
        let (name, setting) = match entry.split_once('=') {
            Some((name, "true")) => (name, ToolSetting::Enabled(true)),
            Some((name, "false")) => (name, ToolSetting::Enabled(false)),
            Some((name, value)) => (name, ToolSetting::Value(value.to_string())),
            None => (entry.as_str(), ToolSetting::Enabled(true)),
        };
        if name.trim().is_empty() {
            return Err(invalid(format!("invalid tool entry '{entry}'")));
        }
        tools.insert(name.trim().to_string(), setting);
    }
    Ok((!tools.is_empty()).then_some(tools))
}

/// Parse `name:ask|allow|deny` entries into a permissions map.
/// Returns `None` for an empty list.
pub fn parse_permissions(entries: &[String]) -> Result<Option<PermissionsConfig>> {
    let mut perms = PermissionsConfig::new();
    for entry in entries {
        let Some((name, value)) = entry.split_once(':') else {
            return Err(invalid(format!(
                "invalid permission '{entry}': use name:ask, name:allow, or name:deny"
            )));
        };
        if name.trim().is_empty() {
            return Err(invalid(format!("invalid permission '{entry}'")));
        }
        perms.insert(name.trim().to_string(), Permission::parse(value.trim())?);
    }
    Ok((!perms.is_empty()).then_some(perms))
}
