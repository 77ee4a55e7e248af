use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// `created_at` given to rows written before the column existed.
pub const LEGACY_CREATED_AT: &str = "1970-01-01 00:00:00";

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (point system schema)");
        // IF NOT EXISTS: the point tables may already have been populated by
        // an earlier deployment of the program.
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS adminuser (
                username    TEXT PRIMARY KEY,
                password    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pointuser (
                userid          TEXT PRIMARY KEY,
                username        TEXT NOT NULL,
                discord_name    TEXT NOT NULL DEFAULT '',
                points          INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS pointsystem (
                pid         TEXT PRIMARY KEY,
                userid      TEXT NOT NULL REFERENCES pointuser(userid),
                pamount     INTEGER NOT NULL,
                padded      INTEGER NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_pointsystem_user
                ON pointsystem(userid);

            CREATE TABLE id_sequences (
                name    TEXT PRIMARY KEY,
                value   INTEGER NOT NULL
            );

            -- Continue numbering after whatever IDs already exist
            INSERT INTO id_sequences (name, value)
                SELECT 'pointuser', COALESCE(MAX(CAST(SUBSTR(userid, 2) AS INTEGER)), 0)
                FROM pointuser;
            INSERT INTO id_sequences (name, value)
                SELECT 'pointsystem', COALESCE(MAX(CAST(SUBSTR(pid, 2) AS INTEGER)), 0)
                FROM pointsystem;
            ",
        )?;

        // Tables from the earlier deployment predate created_at. ADD COLUMN
        // only accepts a constant default; inserts stamp the real time.
        for table in ["pointuser", "pointsystem"] {
            if !has_column(&tx, table, "created_at")? {
                info!("Adding created_at to legacy table {}", table);
                tx.execute_batch(&format!(
                    "ALTER TABLE {table} ADD COLUMN created_at TEXT NOT NULL DEFAULT '{LEGACY_CREATED_AT}'"
                ))?;
            }
        }

        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}
