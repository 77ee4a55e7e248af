use chrono::{DateTime, Utc};
use tracing::warn;

use points_db::models::{DriftRow, LedgerRow, UserRow, parse_timestamp};
use points_types::models::{BalanceDrift, LedgerEntry, PointUser};

pub(crate) fn point_user(row: UserRow) -> PointUser {
    let created_at = timestamp(&row.created_at, &row.userid);
    PointUser {
        user_id: row.userid,
        username: row.username,
        discord_name: row.discord_name,
        points: row.points,
        created_at,
    }
}

pub(crate) fn ledger_entry(row: LedgerRow) -> LedgerEntry {
    let created_at = timestamp(&row.created_at, &row.pid);
    LedgerEntry {
        pid: row.pid,
        user_id: row.userid,
        amount: row.pamount,
        padded: row.padded,
        created_at,
    }
}

pub(crate) fn balance_drift(row: DriftRow) -> BalanceDrift {
    BalanceDrift {
        user_id: row.userid,
        points: row.points,
        ledger_total: row.ledger_total,
    }
}

fn timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on '{}'", raw, owner);
        DateTime::default()
    })
}
