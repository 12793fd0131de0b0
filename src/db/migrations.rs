use anyhow::Context;
use rusqlite::Connection;

/// Schema migrations, applied in order and recorded in `_migrations` so each
/// runs exactly once. Embedded at compile time so in-memory databases (tests)
/// and relocated binaries migrate without a migrations directory on disk.
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_users_listings.sql",
        include_str!("../../migrations/0001_users_listings.sql"),
    ),
    (
        "0002_bookings.sql",
        include_str!("../../migrations/0002_bookings.sql"),
    ),
    (
        "0003_reviews.sql",
        include_str!("../../migrations/0003_reviews.sql"),
    ),
];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for &(name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::init_db;

    #[test]
    fn test_migrations_apply_to_fresh_db() {
        let conn = init_db(":memory:").unwrap();
        for table in ["users", "listings", "bookings", "reviews"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {table} missing");
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = init_db(":memory:").unwrap();
        super::run_migrations(&conn).unwrap();

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied as usize, super::MIGRATIONS.len());
    }
}
