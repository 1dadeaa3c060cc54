use crate::error::{Error, Result};
use crate::export::agent_config;
use crate::model::{Agent, Item};

pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The desktop clipboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new()
            .map_err(|e| Error::Clipboard(format!("clipboard unavailable: {e}")))?;
        Ok(Self { inner })
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text.to_string())
            .map_err(|e| Error::Clipboard(e.to_string()))
    }
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    ids.into_iter().collect::<Vec<_>>().join(",")
}

/// Shell command that syncs the given items into the current project.
pub fn sync_command(items: &[&Item]) -> String {
    format!(
        "promption sync --ids={}",
        join_ids(items.iter().map(|i| i.id.as_str()))
    )
}

/// Shell command that writes the given agents into `opencode.json`.
pub fn sync_agents_command(agents: &[&Agent]) -> String {
    format!(
        "promption sync-agents --ids={}",
        join_ids(agents.iter().map(|a| a.id.as_str()))
    )
}

/// Pretty-printed `opencode.json` agent block.
pub fn agent_json(agents: &[Agent]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&agent_config(agents)?)?)
}

pub fn copy_content(clipboard: &mut dyn Clipboard, item: &Item) -> Result<()> {
    clipboard.set_text(&item.content)
}

pub fn copy_sync_command(clipboard: &mut dyn Clipboard, items: &[&Item]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::Validation("no items selected".into()));
    }
    clipboard.set_text(&sync_command(items))
}

pub fn copy_sync_agents_command(clipboard: &mut dyn Clipboard, agents: &[&Agent]) -> Result<()> {
    if agents.is_empty() {
        return Err(Error::Validation("no agents selected".into()));
    }
    clipboard.set_text(&sync_agents_command(agents))
}

pub fn copy_agent_json(clipboard: &mut dyn Clipboard, agents: &[Agent]) -> Result<()> {
    if agents.is_empty() {
        return Err(Error::Validation("no agents selected".into()));
    }
    clipboard.set_text(&agent_json(agents)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{AgentMode, ItemType};

    #[derive(Default)]
    pub(crate) struct MemoryClipboard {
        pub(crate) text: Option<String>,
    }

    impl Clipboard for MemoryClipboard {
        fn set_text(&mut self, text: &str) -> Result<()> {
            self.text = Some(text.to_string());
            Ok(())
        }
    }

    fn item(id: &str, content: &str) -> Item {
        Item {
            id: id.into(),
            name: id.into(),
            content: content.into(),
            item_type: ItemType::Rule,
            created_at: String::new(),
            updated_at: String::new(),
            tags: Vec::new(),
        }
    }

    fn agent(id: &str, name: &str) -> Agent {
        Agent {
            id: id.into(),
            name: name.into(),
            mode: AgentMode::Primary,
            model: None,
            prompt_content: None,
            tools_config: None,
            permissions_config: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn copies_raw_content() {
        let mut clip = MemoryClipboard::default();
        copy_content(&mut clip, &item("a", "line one\nline two")).unwrap();
        assert_eq!(clip.text.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn sync_command_joins_ids() {
        let a = item("id-1", "x");
        let b = item("id-2", "y");
        let mut clip = MemoryClipboard::default();
        copy_sync_command(&mut clip, &[&a, &b]).unwrap();
        assert_eq!(clip.text.as_deref(), Some("promption sync --ids=id-1,id-2"));
        assert!(copy_sync_command(&mut clip, &[]).is_err());
    }

    #[test]
    fn agent_payloads() {
        let a = agent("a1", "builder");
        assert_eq!(sync_agents_command(&[&a]), "promption sync-agents --ids=a1");
        let mut clip = MemoryClipboard::default();
        copy_agent_json(&mut clip, std::slice::from_ref(&a)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(clip.text.as_deref().unwrap()).unwrap();
        assert_eq!(value["agent"]["builder"]["mode"], "primary");
    }
}
