use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Skill,
    Rule,
    Workflow,
}

impl ItemType {
    pub const ALL: [ItemType; 3] = [Self::Skill, Self::Rule, Self::Workflow];

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "skill" => Ok(Self::Skill),
            "rule" => Ok(Self::Rule),
            "workflow" => Ok(Self::Workflow),
            _ => Err(Error::Validation(format!(
                "invalid item type '{s}': must be skill, rule, or workflow"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Rule => "rule",
            Self::Workflow => "workflow",
        }
    }

    /// Export subdirectory for this type.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Skill => "skills",
            Self::Rule => "rules",
            Self::Workflow => "workflows",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Color given to tags created without one.
pub const DEFAULT_TAG_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub is_system: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub content: String,
    pub item_type: ItemType,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<Tag>,
}

impl Item {
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Primary,
    #[default]
    Subagent,
}

impl AgentMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "primary" => Ok(Self::Primary),
            "subagent" => Ok(Self::Subagent),
            _ => Err(Error::Validation(format!(
                "invalid agent mode '{s}': must be primary or subagent"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Subagent => "subagent",
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AgentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Ask,
    Allow,
    Deny,
}

impl Permission {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ask" => Ok(Self::Ask),
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            _ => Err(Error::Validation(format!(
                "invalid permission value '{s}': must be ask, allow, or deny"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// A tool entry is either switched on/off or carries a free-form value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolSetting {
    Enabled(bool),
    Value(String),
}

pub type ToolsConfig = BTreeMap<String, ToolSetting>;
pub type PermissionsConfig = BTreeMap<String, Permission>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub mode: AgentMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools_config: Option<ToolsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions_config: Option<PermissionsConfig>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub content: String,
    pub item_type: ItemType,
    pub tag_ids: Vec<String>,
}

/// Changed fields of an item. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub content: Option<String>,
    pub item_type: Option<ItemType>,
    pub tag_ids: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.content.is_none()
            && self.item_type.is_none()
            && self.tag_ids.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentDraft {
    pub name: String,
    pub mode: AgentMode,
    pub model: Option<String>,
    pub prompt_content: Option<String>,
    pub tools_config: Option<ToolsConfig>,
    pub permissions_config: Option<PermissionsConfig>,
}

/// Changed fields of an agent. The inner `None` of the optional columns
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub mode: Option<AgentMode>,
    pub model: Option<Option<String>>,
    pub prompt_content: Option<Option<String>>,
    pub tools_config: Option<Option<ToolsConfig>>,
    pub permissions_config: Option<Option<PermissionsConfig>>,
}
