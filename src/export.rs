use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Agent, Item, ItemType};

pub const OPENCODE_SCHEMA: &str = "https://opencode.ai/config.json";
pub const OPENCODE_CONFIG: &str = "opencode.json";
pub const PROMPTS_DIR: &str = ".opencode/prompts";

/// File-system safe name: lowercase ASCII letters and digits joined by
/// single hyphens. Falls back to `unnamed`.
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let slug = lower
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    debug!(path = %path.display(), "wrote file");
    Ok(())
}

/// Relative path of an item inside an export root.
fn item_path(item: &Item) -> PathBuf {
    let slug = slugify(&item.name);
    let dir = Path::new(item.item_type.dir_name());
    match item.item_type {
        ItemType::Skill => dir.join(&slug).join("SKILL.md"),
        ItemType::Rule | ItemType::Workflow => dir.join(format!("{slug}.md")),
    }
}

/// Write each item under `root` in the skills/rules/workflows layout.
/// Existing files are overwritten. Returns the written paths.
pub fn export_items(items: &[Item], root: &Path) -> Result<Vec<PathBuf>> {
    for t in ItemType::ALL {
        fs::create_dir_all(root.join(t.dir_name()))?;
    }
    let mut written = Vec::with_capacity(items.len());
    for item in items {
        let path = root.join(item_path(item));
        write_file(&path, &item.content)?;
        written.push(path);
    }
    info!(count = written.len(), root = %root.display(), "exported items");
    Ok(written)
}

/// Coding tools that `sync_items` knows how to lay files out for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Antigravity,
    Cursor,
    Windsurf,
    Opencode,
    Cline,
    Copilot,
}

impl Target {
    pub const ALL: [Target; 6] = [
        Self::Antigravity,
        Self::Cursor,
        Self::Windsurf,
        Self::Opencode,
        Self::Cline,
        Self::Copilot,
    ];

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                Error::Validation(format!(
                    "unknown target '{s}': expected one of {}",
                    names.join(", ")
                ))
            })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Antigravity => "antigravity",
            Self::Cursor => "cursor",
            Self::Windsurf => "windsurf",
            Self::Opencode => "opencode",
            Self::Cline => "cline",
            Self::Copilot => "copilot",
        }
    }

    /// (skills dir, rules dir) for tools that keep skills as SKILL.md folders.
    fn skill_layout(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Windsurf => Some((".windsurf/skills", ".windsurf/rules")),
            Self::Opencode => Some((".opencode/skills", ".opencode/rules")),
            Self::Cline => Some((".cline/skills", ".clinerules")),
            Self::Antigravity | Self::Cursor | Self::Copilot => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn skill_frontmatter(slug: &str, item: &Item) -> String {
    format!(
        "---\nname: {slug}\ndescription: {}\n---\n\n{}",
        item.name, item.content
    )
}

/// Lay `items` out in `project_dir` the way `target` expects.
/// Returns the paths touched.
pub fn sync_items(items: &[Item], target: Target, project_dir: &Path) -> Result<Vec<PathBuf>> {
    let written = match target {
        Target::Antigravity => export_items(items, &project_dir.join(".agent"))?,
        Target::Cursor => sync_cursor(items, project_dir)?,
        Target::Copilot => sync_copilot(items, project_dir)?,
        Target::Windsurf | Target::Opencode | Target::Cline => {
            sync_skill_folders(items, target, project_dir)?
        }
    };
    info!(target = %target, count = items.len(), "synced items");
    Ok(written)
}

fn sync_cursor(items: &[Item], project_dir: &Path) -> Result<Vec<PathBuf>> {
    let rules = project_dir.join(".cursor/rules");
    fs::create_dir_all(&rules)?;
    let mut written = Vec::new();
    for item in items {
        let slug = slugify(&item.name);
        let (path, contents) = if item.item_type == ItemType::Rule {
            let body = format!(
                "---\ndescription: {}\nglobs: *\n---\n\n{}",
                item.name, item.content
            );
            (rules.join(format!("{slug}.mdc")), body)
        } else {
            (rules.join(format!("{slug}.md")), item.content.clone())
        };
        write_file(&path, &contents)?;
        written.push(path);
    }
    Ok(written)
}

fn sync_skill_folders(items: &[Item], target: Target, project_dir: &Path) -> Result<Vec<PathBuf>> {
    let Some((skills_dir, rules_dir)) = target.skill_layout() else {
        return Ok(Vec::new());
    };
    let skills = project_dir.join(skills_dir);
    let rules = project_dir.join(rules_dir);
    fs::create_dir_all(&skills)?;
    fs::create_dir_all(&rules)?;
    let mut written = Vec::new();
    for item in items {
        let slug = slugify(&item.name);
        let path = match item.item_type {
            ItemType::Skill => {
                let path = skills.join(&slug).join("SKILL.md");
                write_file(&path, &skill_frontmatter(&slug, item))?;
                path
            }
            ItemType::Rule | ItemType::Workflow => {
                let path = rules.join(format!("{slug}.md"));
                write_file(&path, &item.content)?;
                path
            }
        };
        written.push(path);
    }
    Ok(written)
}

fn sync_copilot(items: &[Item], project_dir: &Path) -> Result<Vec<PathBuf>> {
    let github = project_dir.join(".github");
    fs::create_dir_all(&github)?;
    let path = github.join("copilot-instructions.md");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    for item in items {
        write!(file, "\n\n# {}\n{}\n", item.name, item.content)?;
    }
    Ok(vec![path])
}

fn prompt_path(agent: &Agent) -> String {
    format!("{PROMPTS_DIR}/{}.txt", agent.name)
}

fn agent_entry(agent: &Agent) -> Result<Value> {
    let mut entry = Map::new();
    entry.insert("mode".into(), json!(agent.mode));
    if let Some(model) = &agent.model {
        entry.insert("model".into(), json!(model));
    }
    if agent.prompt_content.is_some() {
        entry.insert("prompt".into(), json!(format!("{{file:{}}}", prompt_path(agent))));
    }
    if let Some(tools) = agent.tools_config.as_ref().filter(|t| !t.is_empty()) {
        entry.insert("tools".into(), serde_json::to_value(tools)?);
    }
    if let Some(perms) = agent.permissions_config.as_ref().filter(|p| !p.is_empty()) {
        entry.insert("permissions".into(), serde_json::to_value(perms)?);
    }
    Ok(Value::Object(entry))
}

/// `{"agent": {<name>: {...}}}` block for opencode.json.
pub fn agent_config(agents: &[Agent]) -> Result<Value> {
    let mut by_name = Map::new();
    for agent in agents {
        by_name.insert(agent.name.clone(), agent_entry(agent)?);
    }
    Ok(json!({ "agent": by_name }))
}

fn read_opencode_config(path: &Path) -> Result<Map<String, Value>> {
    let fresh = || {
        let mut m = Map::new();
        m.insert("$schema".into(), json!(OPENCODE_SCHEMA));
        m
    };
    if !path.exists() {
        return Ok(fresh());
    }
    let text = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) | Err(_) => {
            warn!(path = %path.display(), "replacing unreadable opencode config");
            Ok(fresh())
        }
    }
}

/// Merge agents into `opencode.json` under `project_dir` and write each
/// prompt to its own file. Agents already present under the same name are
/// replaced; other keys are kept.
pub fn sync_agents(agents: &[Agent], project_dir: &Path) -> Result<Vec<PathBuf>> {
    let config_path = project_dir.join(OPENCODE_CONFIG);
    let mut config = read_opencode_config(&config_path)?;
    let section = config
        .entry("agent")
        .or_insert_with(|| Value::Object(Map::new()));
    if !section.is_object() {
        *section = Value::Object(Map::new());
    }

    let mut written = Vec::new();
    for agent in agents {
        if let Some(prompt) = &agent.prompt_content {
            let path = project_dir.join(prompt_path(agent));
            write_file(&path, prompt)?;
            written.push(path);
        }
        if let Value::Object(map) = &mut *section {
            map.insert(agent.name.clone(), agent_entry(agent)?);
        }
    }

    let text = serde_json::to_string_pretty(&Value::Object(config))?;
    write_file(&config_path, &text)?;
    written.push(config_path);
    info!(count = agents.len(), "synced agents");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentMode, Permission, PermissionsConfig, ToolSetting, ToolsConfig};

    fn item(name: &str, content: &str, item_type: ItemType) -> Item {
        Item {
            id: slugify(name),
            name: name.into(),
            content: content.into(),
            item_type,
            created_at: String::new(),
            updated_at: String::new(),
            tags: Vec::new(),
        }
    }

    fn agent(name: &str) -> Agent {
        Agent {
            id: name.into(),
            name: name.into(),
            mode: AgentMode::Subagent,
            model: None,
            prompt_content: None,
            tools_config: None,
            permissions_config: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Code Review"), "code-review");
        assert_eq!(slugify("  API / Docs!! v2 "), "api-docs-v2");
        assert_eq!(slugify("a__b--c"), "a-b-c");
        assert_eq!(slugify("!!!"), "unnamed");
        assert_eq!(slugify(""), "unnamed");
        assert_eq!(slugify("Café"), "caf");
    }

    #[test]
    fn export_lays_out_by_type() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![
            item("Code Review", "Check every diff.", ItemType::Skill),
            item("No Force Push", "Never.", ItemType::Rule),
            item("Release", "1. tag\n2. push", ItemType::Workflow),
        ];
        let written = export_items(&items, dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        let skill = dir.path().join("skills/code-review/SKILL.md");
        assert_eq!(fs::read_to_string(skill).unwrap(), "Check every diff.");
        assert_eq!(
            fs::read_to_string(dir.path().join("rules/no-force-push.md")).unwrap(),
            "Never."
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("workflows/release.md")).unwrap(),
            "1. tag\n2. push"
        );
    }

    #[test]
    fn export_creates_empty_type_dirs_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        export_items(&[item("x", "old", ItemType::Rule)], dir.path()).unwrap();
        export_items(&[item("x", "new", ItemType::Rule)], dir.path()).unwrap();
        assert!(dir.path().join("skills").is_dir());
        assert!(dir.path().join("workflows").is_dir());
        assert_eq!(fs::read_to_string(dir.path().join("rules/x.md")).unwrap(), "new");
    }

    #[test]
    fn target_names() {
        for t in Target::ALL {
            assert_eq!(t.as_str().parse::<Target>().unwrap(), t);
        }
        assert!(Target::parse("vim").is_err());
    }

    #[test]
    fn antigravity_uses_agent_dir() {
        let dir = tempfile::tempdir().unwrap();
        sync_items(&[item("Lint", "run it", ItemType::Skill)], Target::Antigravity, dir.path())
            .unwrap();
        assert!(dir.path().join(".agent/skills/lint/SKILL.md").is_file());
    }

    #[test]
    fn cursor_rules_get_frontmatter() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![
            item("Style Guide", "Use tabs.", ItemType::Rule),
            item("Deploy", "steps", ItemType::Workflow),
        ];
        sync_items(&items, Target::Cursor, dir.path()).unwrap();
        let rule = fs::read_to_string(dir.path().join(".cursor/rules/style-guide.mdc")).unwrap();
        assert_eq!(rule, "---\ndescription: Style Guide\nglobs: *\n---\n\nUse tabs.");
        let other = fs::read_to_string(dir.path().join(".cursor/rules/deploy.md")).unwrap();
        assert_eq!(other, "steps");
    }

    #[test]
    fn skill_folder_targets() {
        let dir = tempfile::tempdir().unwrap();
        let items = vec![
            item("Code Review", "Look closely.", ItemType::Skill),
            item("Be Kind", "Always.", ItemType::Rule),
        ];
        sync_items(&items, Target::Cline, dir.path()).unwrap();
        let skill = fs::read_to_string(dir.path().join(".cline/skills/code-review/SKILL.md")).unwrap();
        assert_eq!(
            skill,
            "---\nname: code-review\ndescription: Code Review\n---\n\nLook closely."
        );
        assert!(dir.path().join(".clinerules/be-kind.md").is_file());

        sync_items(&items, Target::Windsurf, dir.path()).unwrap();
        assert!(dir.path().join(".windsurf/rules/be-kind.md").is_file());
        sync_items(&items, Target::Opencode, dir.path()).unwrap();
        assert!(dir.path().join(".opencode/skills/code-review/SKILL.md").is_file());
    }

    #[test]
    fn copilot_appends() {
        let dir = tempfile::tempdir().unwrap();
        sync_items(&[item("One", "first", ItemType::Rule)], Target::Copilot, dir.path()).unwrap();
        sync_items(&[item("Two", "second", ItemType::Rule)], Target::Copilot, dir.path()).unwrap();
        let text = fs::read_to_string(dir.path().join(".github/copilot-instructions.md")).unwrap();
        assert!(text.contains("# One\nfirst"));
        assert!(text.contains("# Two\nsecond"));
        assert!(text.find("# One").unwrap() < text.find("# Two").unwrap());
    }

    #[test]
    fn agent_config_shape() {
        let mut builder = agent("builder");
        builder.mode = AgentMode::Primary;
        builder.model = Some("anthropic/claude-sonnet".into());
        builder.prompt_content = Some("Build.".into());
        let mut tools = ToolsConfig::new();
        tools.insert("bash".into(), ToolSetting::Enabled(false));
        builder.tools_config = Some(tools);
        builder.permissions_config = Some(PermissionsConfig::new());

        let config = agent_config(&[builder, agent("helper")]).unwrap();
        assert_eq!(
            config,
            json!({
                "agent": {
                    "builder": {
                        "mode": "primary",
                        "model": "anthropic/claude-sonnet",
                        "prompt": "{file:.opencode/prompts/builder.txt}",
                        "tools": {"bash": false}
                    },
                    "helper": {"mode": "subagent"}
                }
            })
        );
    }

    #[test]
    fn sync_agents_merges_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(OPENCODE_CONFIG);
        fs::write(
            &config_path,
            r#"{"theme": "dark", "agent": {"old": {"mode": "primary"}}}"#,
        )
        .unwrap();
        let mut reviewer = agent("reviewer");
        reviewer.prompt_content = Some("Review it.".into());
        let mut perms = PermissionsConfig::new();
        perms.insert("edit".into(), Permission::Deny);
        reviewer.permissions_config = Some(perms);

        sync_agents(&[reviewer], dir.path()).unwrap();
        let config: Value = serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(config["theme"], "dark");
        assert_eq!(config["agent"]["old"]["mode"], "primary");
        assert_eq!(config["agent"]["reviewer"]["permissions"]["edit"], "deny");
        assert_eq!(
            fs::read_to_string(dir.path().join(".opencode/prompts/reviewer.txt")).unwrap(),
            "Review it."
        );
    }

    #[test]
    fn sync_agents_replaces_unparsable_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OPENCODE_CONFIG), "not json").unwrap();
        sync_agents(&[agent("helper")], dir.path()).unwrap();
        let config: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(OPENCODE_CONFIG)).unwrap())
                .unwrap();
        assert_eq!(config["$schema"], OPENCODE_SCHEMA);
        assert_eq!(config["agent"]["helper"]["mode"], "subagent");
    }
}
