use crate::model::{Agent, Item, Tag};

fn tag_names(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_item_list(items: &[Item]) -> String {
    let mut out = String::new();
    for item in items {
        let tags = if item.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", tag_names(&item.tags))
        };
        out.push_str(&format!(
            "{}  {:<8} {}{}\n",
            item.id, item.item_type, item.name, tags
        ));
    }
    out
}

pub fn format_item_detail(item: &Item) -> String {
    let mut out = String::new();
    out.push_str(&format!("ID:      {}\n", item.id));
    out.push_str(&format!("Name:    {}\n", item.name));
    out.push_str(&format!("Type:    {}\n", item.item_type));
    if !item.tags.is_empty() {
        out.push_str(&format!("Tags:    {}\n", tag_names(&item.tags)));
    }
    out.push_str(&format!("Created: {}\n", item.created_at));
    out.push_str(&format!("Updated: {}\n", item.updated_at));
    out.push('\n');
    out.push_str(&item.content);
    if !item.content.ends_with('\n') {
        out.push('\n');
    }
    out
}

pub fn format_tag_list(tags: &[Tag]) -> String {
    let mut out = String::new();
    for tag in tags {
        let system = if tag.is_system { "  (system)" } else { "" };
        out.push_str(&format!("{}  {}  {}{}\n", tag.id, tag.color, tag.name, system));
    }
    out
}

pub fn format_agent_list(agents: &[Agent]) -> String {
    let mut out = String::new();
    for agent in agents {
        let model = agent
            .model
            .as_ref()
            .map(|m| format!("  ({m})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}  {:<8} {}{}\n",
            agent.id, agent.mode, agent.name, model
        ));
    }
    out
}

pub fn format_agent_detail(agent: &Agent) -> String {
    let mut out = String::new();
    out.push_str(&format!("ID:          {}\n", agent.id));
    out.push_str(&format!("Name:        {}\n", agent.name));
    out.push_str(&format!("Mode:        {}\n", agent.mode));
    if let Some(model) = &agent.model {
        out.push_str(&format!("Model:       {model}\n"));
    }
    if let Some(tools) = agent.tools_config.as_ref().filter(|t| !t.is_empty()) {
        let entries: Vec<String> = tools
            .iter()
            .map(|(name, setting)| match setting {
                crate::model::ToolSetting::Enabled(true) => name.clone(),
                crate::model::ToolSetting::Enabled(false) => format!("{name}=false"),
                crate::model::ToolSetting::Value(v) => format!("{name}={v}"),
            })
            .collect();
        out.push_str(&format!("Tools:       {}\n", entries.join(", ")));
    }
    if let Some(perms) = agent.permissions_config.as_ref().filter(|p| !p.is_empty()) {
        let entries: Vec<String> = perms
            .iter()
            .map(|(name, p)| format!("{name}:{}", p.as_str()))
            .collect();
        out.push_str(&format!("Permissions: {}\n", entries.join(", ")));
    }
    out.push_str(&format!("Created:     {}\n", agent.created_at));
    out.push_str(&format!("Updated:     {}\n", agent.updated_at));
    if let Some(prompt) = &agent.prompt_content {
        out.push_str("\nPrompt:\n");
        out.push_str(prompt);
        if !prompt.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
