use std::path::PathBuf;

use clap::{Parser, Subcommand};
use promption::export::Target;
use promption::model::{AgentMode, ItemType, DEFAULT_TAG_COLOR};

#[derive(Parser)]
#[command(
    name = "promption",
    about = "Manage reusable prompts, rules, workflows and agent configs",
    version
)]
pub struct Cli {
    /// Path to the SQLite database [default: <config dir>/promption/promption.db]
    #[arg(long, env = "PROMPTION_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Launches the terminal UI when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List items
    List {
        /// Only items of this type (skill, rule, workflow)
        #[arg(short = 't', long = "type")]
        item_type: Option<ItemType>,
        /// Case-insensitive text to find in name or content
        #[arg(short, long)]
        search: Option<String>,
        /// Only items carrying any of these tags (id or name)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one item with its content
    Show {
        /// Item ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add an item. Content is read from stdin when --content is omitted
    Add {
        /// Item name
        name: String,
        /// Item type (skill, rule, workflow)
        #[arg(short = 't', long = "type", default_value = "skill")]
        item_type: ItemType,
        /// Item content
        #[arg(short, long)]
        content: Option<String>,
        /// Tag to attach (id or name); repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an item's fields
    Edit {
        /// Item ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New content
        #[arg(short, long)]
        content: Option<String>,
        /// New type
        #[arg(short = 't', long = "type")]
        item_type: Option<ItemType>,
        /// Replace the tags with these (id or name); repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an item
    Rm {
        /// Item ID
        id: String,
    },

    /// List tags
    Tags {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a tag
    #[command(name = "tag-add")]
    TagAdd {
        /// Tag name
        name: String,
        /// Color as #RRGGBB or #RRGGBBAA
        #[arg(long, default_value = DEFAULT_TAG_COLOR)]
        color: String,
    },

    /// Rename or recolor a tag
    #[command(name = "tag-edit")]
    TagEdit {
        /// Tag ID or name
        tag: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New color
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a tag (system tags cannot be deleted)
    #[command(name = "tag-rm")]
    TagRm {
        /// Tag ID or name
        tag: String,
    },

    /// List agents
    Agents {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an agent
    #[command(name = "agent-add")]
    AgentAdd {
        /// Agent name (kebab-case)
        name: String,
        /// primary or subagent
        #[arg(short, long, default_value = "subagent")]
        mode: AgentMode,
        /// Model identifier, e.g. anthropic/claude-sonnet-4
        #[arg(long)]
        model: Option<String>,
        /// System prompt text
        #[arg(short, long, conflicts_with = "prompt_file")]
        prompt: Option<String>,
        /// Read the system prompt from a file
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        /// Tool as NAME or NAME=VALUE; repeatable
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// Permission as NAME:ask|allow|deny; repeatable
        #[arg(long = "permission")]
        permissions: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one agent
    #[command(name = "agent-show")]
    AgentShow {
        /// Agent ID or name
        agent: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an agent's fields
    #[command(name = "agent-edit")]
    AgentEdit {
        /// Agent ID or name
        agent: String,
        /// New name (kebab-case)
        #[arg(long)]
        name: Option<String>,
        /// primary or subagent
        #[arg(short, long)]
        mode: Option<AgentMode>,
        /// New model
        #[arg(long, conflicts_with = "clear_model")]
        model: Option<String>,
        /// New system prompt text
        #[arg(short, long, conflicts_with_all = ["prompt_file", "clear_prompt"])]
        prompt: Option<String>,
        /// Read the new system prompt from a file
        #[arg(long, conflicts_with = "clear_prompt")]
        prompt_file: Option<PathBuf>,
        /// Replace tools with these; repeatable
        #[arg(long = "tool", conflicts_with = "clear_tools")]
        tools: Vec<String>,
        /// Replace permissions with these; repeatable
        #[arg(long = "permission", conflicts_with = "clear_permissions")]
        permissions: Vec<String>,
        /// Remove the model
        #[arg(long)]
        clear_model: bool,
        /// Remove the system prompt
        #[arg(long)]
        clear_prompt: bool,
        /// Remove all tools
        #[arg(long)]
        clear_tools: bool,
        /// Remove all permissions
        #[arg(long)]
        clear_permissions: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an agent
    #[command(name = "agent-rm")]
    AgentRm {
        /// Agent ID or name
        agent: String,
    },

    /// Print the opencode.json agent block
    #[command(name = "agent-config")]
    AgentConfig {
        /// Agent IDs or names, comma-separated [default: all agents]
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
    },

    /// Write agents into opencode.json and their prompts into .opencode/prompts
    #[command(name = "sync-agents")]
    SyncAgents {
        /// Agent IDs or names, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
        /// Project directory [default: current directory]
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Write items into a project in the layout a coding tool expects
    Sync {
        /// Item IDs, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
        /// antigravity, cursor, windsurf, opencode, cline or copilot [default: from config]
        #[arg(short, long)]
        target: Option<Target>,
        /// Project directory [default: current directory]
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Export items to skills/, rules/ and workflows/ under a directory
    Export {
        /// Item IDs, comma-separated [default: all items]
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
        /// Output directory [default: export_dir from config]
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Copy an item's content to the clipboard
    Copy {
        /// Item ID
        id: String,
    },

    /// Copy a `promption sync` command for these items to the clipboard
    #[command(name = "copy-command")]
    CopyCommand {
        /// Item IDs, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },

    /// Show settings, or write a default config file
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },

    /// Open the terminal UI
    Ui,
}
