mod cli;

use std::io::{IsTerminal, Read as _};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::{Cli, Command};
use promption::clipboard::{self, SystemClipboard};
use promption::filter::{filter_items, ItemFilter};
use promption::model::{AgentDraft, AgentPatch, ItemDraft, ItemPatch};
use promption::settings::{self, Settings};
use promption::validate::{parse_permissions, parse_tools};
use promption::{db, export, logging, ops, output, tui};

fn resolve_db_path(cli_db: Option<PathBuf>, settings: &Settings) -> Result<PathBuf> {
    match cli_db {
        Some(p) => Ok(p),
        None => Ok(settings.db_path()?),
    }
}

fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn open_db(db_path: &Path) -> Result<Connection> {
    let path = db_path
        .to_str()
        .context("database path is not valid UTF-8")?;
    let conn = db::open(path)?;
    db::init(&conn)?;
    Ok(conn)
}

fn check_content(content: Option<String>, stdin_is_terminal: bool) -> Result<Option<String>> {
    match content {
        Some(c) => Ok(Some(c)),
        None if stdin_is_terminal => {
            bail!("no content provided (pass --content or pipe it via stdin)")
        }
        None => Ok(None),
    }
}

fn read_content(content: Option<String>) -> Result<String> {
    match check_content(content, std::io::stdin().is_terminal())? {
        Some(c) => Ok(c),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            if buf.is_empty() {
                bail!("no content provided");
            }
            Ok(buf)
        }
    }
}

fn read_prompt(prompt: Option<String>, prompt_file: Option<PathBuf>) -> Result<Option<String>> {
    match (prompt, prompt_file) {
        (Some(p), _) => Ok(Some(p)),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Some(text))
        }
        (None, None) => Ok(None),
    }
}

/// Resolve tag ids or names to ids. Unknown tags are an error.
fn resolve_tags(conn: &Connection, tags: &[String]) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(tags.len());
    for tag in tags {
        ids.push(ops::find_tag(conn, tag)?.id);
    }
    Ok(ids)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn warn_missing(kind: &str, requested: usize, found: usize) {
    if found < requested {
        eprintln!("warning: {} of {requested} {kind} not found", requested - found);
    }
}

fn print_written(paths: &[PathBuf]) {
    for path in paths {
        eprintln!("  + {}", path.display());
    }
}

/// Dispatch a single parsed command against an open database connection.
fn dispatch(conn: &Connection, settings: &Settings, command: Command) -> Result<()> {
    match command {
        Command::List {
            item_type,
            search,
            tags,
            json,
        } => {
            let filter = ItemFilter {
                query: search.unwrap_or_default(),
                item_type,
                tag_ids: resolve_tags(conn, &tags)?.into_iter().collect(),
            };
            let items = filter_items(&ops::list_items(conn)?, &filter);
            if json {
                print_json(&items)?;
            } else {
                print!("{}", output::format_item_list(&items));
            }
        }

        Command::Show { id, json } => {
            let item = ops::get_item(conn, &id)?;
            if json {
                print_json(&item)?;
            } else {
                print!("{}", output::format_item_detail(&item));
            }
        }

        Command::Add {
            name,
            item_type,
            content,
            tags,
            json,
        } => {
            let content = read_content(content)?;
            let draft = ItemDraft {
                name,
                content,
                item_type,
                tag_ids: resolve_tags(conn, &tags)?,
            };
            let item = ops::create_item(conn, &draft)?;
            if json {
                print_json(&item)?;
            } else {
                println!("{}", item.id);
            }
            eprintln!("Added {} '{}'", item.item_type, item.name);
        }

        Command::Edit {
            id,
            name,
            content,
            item_type,
            tags,
            clear_tags,
            json,
        } => {
            let tag_ids = if clear_tags {
                Some(Vec::new())
            } else if tags.is_empty() {
                None
            } else {
                Some(resolve_tags(conn, &tags)?)
            };
            let patch = ItemPatch {
                name,
                content,
                item_type,
                tag_ids,
            };
            if patch.is_empty() {
                bail!("nothing to change");
            }
            let item = ops::update_item(conn, &id, &patch)?;
            if json {
                print_json(&item)?;
            }
            eprintln!("Updated '{}'", item.name);
        }

        Command::Rm { id } => {
            let item = ops::get_item(conn, &id)?;
            ops::delete_item(conn, &id)?;
            eprintln!("Removed '{}'", item.name);
        }

        Command::Tags { json } => {
            let tags = ops::list_tags(conn)?;
            if json {
                print_json(&tags)?;
            } else {
                print!("{}", output::format_tag_list(&tags));
            }
        }

        Command::TagAdd { name, color } => {
            let tag = ops::create_tag(conn, &name, &color)?;
            println!("{}", tag.id);
            eprintln!("Added tag '{}'", tag.name);
        }

        Command::TagEdit { tag, name, color } => {
            let current = ops::find_tag(conn, &tag)?;
            if name.is_none() && color.is_none() {
                bail!("nothing to change");
            }
            let name = name.unwrap_or(current.name);
            let color = color.unwrap_or(current.color);
            let updated = ops::update_tag(conn, &current.id, &name, &color)?;
            eprintln!("Updated tag '{}'", updated.name);
        }

        Command::TagRm { tag } => {
            let current = ops::find_tag(conn, &tag)?;
            ops::delete_tag(conn, &current.id)?;
            eprintln!("Removed tag '{}'", current.name);
        }

        Command::Agents { json } => {
            let agents = ops::list_agents(conn)?;
            if json {
                print_json(&agents)?;
            } else {
                print!("{}", output::format_agent_list(&agents));
            }
        }

        Command::AgentAdd {
            name,
            mode,
            model,
            prompt,
            prompt_file,
            tools,
            permissions,
            json,
        } => {
            let draft = AgentDraft {
                name,
                mode,
                model,
                prompt_content: read_prompt(prompt, prompt_file)?,
                tools_config: parse_tools(&tools)?,
                permissions_config: parse_permissions(&permissions)?,
            };
            let agent = ops::create_agent(conn, &draft)?;
            if json {
                print_json(&agent)?;
            } else {
                println!("{}", agent.id);
            }
            eprintln!("Added agent '{}'", agent.name);
        }

        Command::AgentShow { agent, json } => {
            let agent = ops::find_agent(conn, &agent)?;
            if json {
                print_json(&agent)?;
            } else {
                print!("{}", output::format_agent_detail(&agent));
            }
        }

        Command::AgentEdit {
            agent,
            name,
            mode,
            model,
            prompt,
            prompt_file,
            tools,
            permissions,
            clear_model,
            clear_prompt,
            clear_tools,
            clear_permissions,
            json,
        } => {
            let current = ops::find_agent(conn, &agent)?;
            let prompt = read_prompt(prompt, prompt_file)?;
            let patch = AgentPatch {
                name,
                mode,
                model: if clear_model { Some(None) } else { model.map(Some) },
                prompt_content: if clear_prompt { Some(None) } else { prompt.map(Some) },
                tools_config: if clear_tools {
                    Some(None)
                } else {
                    parse_tools(&tools)?.map(Some)
                },
                permissions_config: if clear_permissions {
                    Some(None)
                } else {
                    parse_permissions(&permissions)?.map(Some)
                },
            };
            if patch == AgentPatch::default() {
                bail!("nothing to change");
            }
            let updated = ops::update_agent(conn, &current.id, &patch)?;
            if json {
                print_json(&updated)?;
            }
            eprintln!("Updated agent '{}'", updated.name);
        }

        Command::AgentRm { agent } => {
            let current = ops::find_agent(conn, &agent)?;
            ops::delete_agent(conn, &current.id)?;
            eprintln!("Removed agent '{}'", current.name);
        }

        Command::AgentConfig { ids } => {
            let agents = if ids.is_empty() {
                ops::list_agents(conn)?
            } else {
                let agents = ops::get_agents_by_ids(conn, &ids)?;
                warn_missing("agents", ids.len(), agents.len());
                agents
            };
            print_json(&export::agent_config(&agents)?)?;
        }

        Command::SyncAgents { ids, dir } => {
            let agents = ops::get_agents_by_ids(conn, &ids)?;
            warn_missing("agents", ids.len(), agents.len());
            if agents.is_empty() {
                bail!("no agents found");
            }
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let written = export::sync_agents(&agents, &dir)?;
            print_written(&written);
            eprintln!("Synced {} agent(s) to opencode.json", agents.len());
        }

        Command::Sync { ids, target, dir } => {
            let items = ops::get_items_by_ids(conn, &ids)?;
            warn_missing("items", ids.len(), items.len());
            if items.is_empty() {
                bail!("no items found");
            }
            let target = target.unwrap_or(settings.default_target);
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let written = export::sync_items(&items, target, &dir)?;
            print_written(&written);
            eprintln!("Synced {} item(s) for {target}", items.len());
        }

        Command::Export { ids, dir } => {
            let items = if ids.is_empty() {
                ops::list_items(conn)?
            } else {
                let items = ops::get_items_by_ids(conn, &ids)?;
                warn_missing("items", ids.len(), items.len());
                items
            };
            let dir = dir.unwrap_or_else(|| settings.export_dir());
            let written = export::export_items(&items, &dir)?;
            print_written(&written);
            eprintln!("Exported {} item(s) to {}", written.len(), dir.display());
        }

        Command::Copy { id } => {
            let item = ops::get_item(conn, &id)?;
            let mut clip = SystemClipboard::new()?;
            clipboard::copy_content(&mut clip, &item)?;
            eprintln!("Copied '{}' to clipboard", item.name);
        }

        Command::CopyCommand { ids } => {
            let items = ops::get_items_by_ids(conn, &ids)?;
            warn_missing("items", ids.len(), items.len());
            let refs: Vec<_> = items.iter().collect();
            let mut clip = SystemClipboard::new()?;
            clipboard::copy_sync_command(&mut clip, &refs)?;
            eprintln!("Copied sync command for {} item(s)", items.len());
        }

        Command::Config { .. } | Command::Ui => {
            bail!("command does not operate on a database connection")
        }
    }

    Ok(())
}

fn show_config(init: bool) -> Result<()> {
    let path = settings::config_path()?;
    if init {
        if Settings::init_at(&path)? {
            eprintln!("Wrote {}", path.display());
        } else {
            eprintln!("{} already exists", path.display());
        }
    }
    let settings = Settings::load_from(&path)?;
    println!("config: {}", path.display());
    println!("db: {}", settings.db_path()?.display());
    println!("default_target: {}", settings.default_target);
    println!("export_dir: {}", settings.export_dir().display());
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Command::Ui));
    logging::init(interactive)?;

    if let Some(Command::Config { init }) = cli.command {
        return show_config(init);
    }

    let settings = Settings::load().context("failed to load settings")?;
    let db_path = resolve_db_path(cli.db, &settings)?;
    ensure_db_dir(&db_path)?;
    let conn = open_db(&db_path)?;

    match cli.command {
        None | Some(Command::Ui) => tui::run(&db_path, conn, &settings)?,
        Some(other) => dispatch(&conn, &settings, other)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        db::open_memory().unwrap()
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["promption"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command.unwrap()
    }

    #[test]
    fn content_required_from_terminal() {
        assert!(check_content(None, true).is_err());
        assert_eq!(check_content(None, false).unwrap(), None);
        assert_eq!(
            check_content(Some("x".into()), true).unwrap().as_deref(),
            Some("x")
        );
    }

    #[test]
    fn tags_resolve_by_name() {
        let conn = test_conn();
        let ids = resolve_tags(&conn, &["rust".into(), "Docker".into()]).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(resolve_tags(&conn, &["nope".into()]).is_err());
    }

    #[test]
    fn add_then_edit_tags() {
        let conn = test_conn();
        let settings = Settings::default();
        dispatch(
            &conn,
            &settings,
            parse(&["add", "Lint", "-t", "rule", "-c", "Run clippy.", "--tag", "Rust"]),
        )
        .unwrap();
        let item = ops::list_items(&conn).unwrap().remove(0);
        assert_eq!(item.tags[0].name, "Rust");

        dispatch(&conn, &settings, parse(&["edit", &item.id, "--clear-tags"])).unwrap();
        assert!(ops::get_item(&conn, &item.id).unwrap().tags.is_empty());
        assert!(dispatch(&conn, &settings, parse(&["edit", &item.id])).is_err());
    }

    #[test]
    fn agent_edit_clears_fields() {
        let conn = test_conn();
        let settings = Settings::default();
        dispatch(
            &conn,
            &settings,
            parse(&[
                "agent-add",
                "reviewer",
                "--model",
                "m1",
                "--tool",
                "bash=false",
                "--permission",
                "edit:deny",
            ]),
        )
        .unwrap();
        dispatch(
            &conn,
            &settings,
            parse(&["agent-edit", "reviewer", "--clear-model", "--clear-tools"]),
        )
        .unwrap();
        let agent = ops::find_agent(&conn, "reviewer").unwrap();
        assert!(agent.model.is_none());
        assert!(agent.tools_config.is_none());
        assert!(agent.permissions_config.is_some());
    }

    #[test]
    fn system_tag_removal_fails() {
        let conn = test_conn();
        let settings = Settings::default();
        assert!(dispatch(&conn, &settings, parse(&["tag-rm", "Kubernetes"])).is_err());
        assert!(ops::find_tag(&conn, "kubernetes").is_ok());
    }

    #[test]
    fn sync_writes_into_dir() {
        let conn = test_conn();
        let settings = Settings::default();
        let dir = tempfile::tempdir().unwrap();
        let item = ops::create_item(
            &conn,
            &ItemDraft {
                name: "Code Review".into(),
                content: "Look.".into(),
                item_type: promption::model::ItemType::Skill,
                tag_ids: Vec::new(),
            },
        )
        .unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        dispatch(
            &conn,
            &settings,
            parse(&["sync", &format!("--ids={}", item.id), "--dir", dir_arg]),
        )
        .unwrap();
        assert!(dir.path().join(".agent/skills/code-review/SKILL.md").is_file());
        assert!(dispatch(&conn, &settings, parse(&["sync", "--ids=missing", "--dir", dir_arg])).is_err());
    }
}
