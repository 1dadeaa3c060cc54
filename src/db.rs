use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS items (
    id         TEXT PRIMARY KEY NOT NULL,
    name       TEXT NOT NULL CHECK(length(name) > 0),
    content    TEXT NOT NULL,
    item_type  TEXT NOT NULL CHECK(item_type IN ('skill', 'rule', 'workflow')),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS tags (
    id        TEXT PRIMARY KEY NOT NULL,
    name      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    color     TEXT NOT NULL DEFAULT '#6366f1',
    is_system INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS item_tags (
    item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    tag_id  TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (item_id, tag_id)
);

CREATE TABLE IF NOT EXISTS agents (
    id                 TEXT PRIMARY KEY NOT NULL,
    name               TEXT NOT NULL,
    mode               TEXT NOT NULL DEFAULT 'subagent' CHECK(mode IN ('primary', 'subagent')),
    model              TEXT,
    prompt_content     TEXT,
    tools_config       TEXT,
    permissions_config TEXT,
    created_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_items_type ON items(item_type);
CREATE INDEX IF NOT EXISTS idx_items_name ON items(name);
CREATE INDEX IF NOT EXISTS idx_agents_name ON agents(name);
";

/// Seeded technology tags: (name, brand color).
pub const SYSTEM_TAGS: &[(&str, &str)] = &[
    ("TypeScript", "#3178C6"),
    ("JavaScript", "#F7DF1E"),
    ("Python", "#3776AB"),
    ("React", "#61DAFB"),
    ("Next.js", "#000000"),
    ("Vue.js", "#4FC08D"),
    ("Node.js", "#5FA04E"),
    ("Express", "#000000"),
    ("Tailwind CSS", "#06B6D4"),
    ("Docker", "#2496ED"),
    ("Git", "#F05032"),
    ("PostgreSQL", "#4169E1"),
    ("MongoDB", "#47A248"),
    ("Redis", "#FF4438"),
    ("AWS", "#FF9900"),
    ("GraphQL", "#E10098"),
    ("Rust", "#000000"),
    ("Go", "#00ADD8"),
    ("Java", "#437291"),
    ("Kubernetes", "#326CE5"),
];

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    debug!(path, "opening database");
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

/// Create tables and seed system tags. Safe to run on every start.
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    seed_system_tags(conn)?;
    Ok(())
}

/// Insert any missing system tag. A tag whose name matches case-insensitively
/// counts as present, whether or not it is a system tag.
pub fn seed_system_tags(conn: &Connection) -> Result<usize> {
    let mut inserted = 0;
    for (name, color) in SYSTEM_TAGS {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE lower(name) = lower(?1))",
            [name],
            |row| row.get(0),
        )?;
        if exists {
            continue;
        }
        conn.execute(
            "INSERT INTO tags (id, name, color, is_system) VALUES (?1, ?2, ?3, 1)",
            rusqlite::params![uuid::Uuid::new_v4().to_string(), name, color],
        )?;
        inserted += 1;
    }
    if inserted > 0 {
        debug!(inserted, "seeded system tags");
    }
    Ok(inserted)
}

/// Fresh in-memory database with schema and seed applied.
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system_tag_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM tags WHERE is_system = 1", [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn init_seeds_all_system_tags() {
        let conn = open_memory().unwrap();
        assert_eq!(system_tag_count(&conn), SYSTEM_TAGS.len() as i64);
    }

    #[test]
    fn seeding_is_idempotent() {
        let conn = open_memory().unwrap();
        assert_eq!(seed_system_tags(&conn).unwrap(), 0);
        init(&conn).unwrap();
        assert_eq!(system_tag_count(&conn), 20);
    }

    #[test]
    fn user_tag_with_same_name_suppresses_seed() {
        let conn = Connection::open_in_memory().unwrap();
        set_pragmas(&conn).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO tags (id, name, color) VALUES ('mine', 'rust', '#123456')",
            [],
        )
        .unwrap();
        seed_system_tags(&conn).unwrap();
        assert_eq!(system_tag_count(&conn), 19);
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM tags WHERE lower(name) = 'rust'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn seed_colors_are_valid() {
        for (_, color) in SYSTEM_TAGS {
            crate::validate::validate_tag_color(color).unwrap();
        }
    }
}
