use crate::Database;
use crate::models::{AdminRow, DriftRow, LedgerRow, UserRow};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use tracing::warn;

const USER_COLUMNS: &str = "userid, username, discord_name, points, created_at";
const LEDGER_COLUMNS: &str = "pid, userid, pamount, padded, created_at";

/// A row in `id_sequences` and the key column it numbers.
struct IdSequence {
    name: &'static str,
    table: &'static str,
    column: &'static str,
    prefix: char,
}

const USER_IDS: IdSequence = IdSequence {
    name: "pointuser",
    table: "pointuser",
    column: "userid",
    prefix: 'u',
};

const LEDGER_IDS: IdSequence = IdSequence {
    name: "pointsystem",
    table: "pointsystem",
    column: "pid",
    prefix: 'p',
};

impl Database {
    // -- Admins --

    pub fn get_admin(&self, username: &str) -> Result<Option<AdminRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT username, password FROM adminuser WHERE username = ?1",
                    [username],
                    |row| {
                        Ok(AdminRow {
                            username: row.get(0)?,
                            password: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn create_admin(&self, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO adminuser (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            )?;
            Ok(())
        })
    }

    // -- Point users --

    /// All users, `u2` before `u10`.
    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM pointuser ORDER BY LENGTH(userid), userid"
            ))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_user(&self, userid: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, userid))
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM pointuser", [], |r| r.get(0))?)
        })
    }

    /// Allocate the next `u<n>` id and insert the user with zero points.
    pub fn create_user(&self, username: &str, discord_name: &str) -> Result<UserRow> {
        self.with_tx(|tx| {
            let userid = next_id(tx, &USER_IDS)?;
            tx.execute(
                "INSERT INTO pointuser (userid, username, discord_name, points, created_at)
                 VALUES (?1, ?2, ?3, 0, datetime('now'))",
                (&userid, username, discord_name),
            )?;
            query_user(tx, &userid)?.ok_or_else(|| anyhow!("User missing after insert: {}", userid))
        })
    }

    // -- Ledger --

    /// Change a balance and record the delta in one transaction.
    ///
    /// Returns `None` without writing anything when the user does not exist.
    pub fn apply_points(
        &self,
        userid: &str,
        amount: i64,
        padded: bool,
    ) -> Result<Option<(UserRow, LedgerRow)>> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                "UPDATE pointuser SET points = points + ?1 WHERE userid = ?2",
                (amount, userid),
            )?;
            if updated == 0 {
                return Ok(None);
            }

            let pid = next_id(tx, &LEDGER_IDS)?;
            tx.execute(
                "INSERT INTO pointsystem (pid, userid, pamount, padded, created_at)
                 VALUES (?1, ?2, ?3, ?4, datetime('now'))",
                (&pid, userid, amount, padded),
            )?;

            let user = query_user(tx, userid)?
                .ok_or_else(|| anyhow!("User missing after update: {}", userid))?;
            let entry = tx.query_row(
                &format!("SELECT {LEDGER_COLUMNS} FROM pointsystem WHERE pid = ?1"),
                [&pid],
                ledger_from_row,
            )?;
            Ok(Some((user, entry)))
        })
    }

    /// Full history, oldest first.
    pub fn ledger(&self) -> Result<Vec<LedgerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEDGER_COLUMNS} FROM pointsystem ORDER BY rowid"
            ))?;
            let rows = stmt
                .query_map([], ledger_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn ledger_for_user(&self, userid: &str) -> Result<Vec<LedgerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LEDGER_COLUMNS} FROM pointsystem WHERE userid = ?1 ORDER BY rowid"
            ))?;
            let rows = stmt
                .query_map([userid], ledger_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_ledger_entries(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM pointsystem", [], |r| r.get(0))?)
        })
    }

    /// Users whose stored balance differs from the sum of their ledger.
    pub fn reconcile(&self) -> Result<Vec<DriftRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.userid, u.points, COALESCE(SUM(l.pamount), 0) AS total
                 FROM pointuser u
                 LEFT JOIN pointsystem l ON l.userid = u.userid
                 GROUP BY u.userid, u.points
                 HAVING u.points <> total
                 ORDER BY LENGTH(u.userid), u.userid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(DriftRow {
                        userid: row.get(0)?,
                        points: row.get(1)?,
                        ledger_total: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// True when `err` came from a UNIQUE / PRIMARY KEY / FOREIGN KEY violation.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<rusqlite::Error>()
        .and_then(|e| e.sqlite_error_code())
        .is_some_and(|code| code == ErrorCode::ConstraintViolation)
}

/// Bump the sequence until it names a free key. Rows inserted behind the
/// service's back are skipped rather than failing every later insert.
fn next_id(conn: &Connection, seq: &IdSequence) -> Result<String> {
    let exists_sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
        seq.table, seq.column
    );
    loop {
        let value: i64 = conn.query_row(
            "UPDATE id_sequences SET value = value + 1 WHERE name = ?1 RETURNING value",
            [seq.name],
            |r| r.get(0),
        )?;
        let id = format!("{}{}", seq.prefix, value);

        let taken: bool = conn.query_row(&exists_sql, [&id], |r| r.get(0))?;
        if !taken {
            return Ok(id);
        }
        warn!("{} already exists in {}, skipping", id, seq.table);
    }
}

fn query_user(conn: &Connection, userid: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM pointuser WHERE userid = ?1"),
            [userid],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        userid: row.get(0)?,
        username: row.get(1)?,
        discord_name: row.get(2)?,
        points: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn ledger_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerRow> {
    Ok(LedgerRow {
        pid: row.get(0)?,
        userid: row.get(1)?,
        pamount: row.get(2)?,
        padded: row.get(3)?,
        created_at: row.get(4)?,
    })
}
