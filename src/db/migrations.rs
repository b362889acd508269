use rusqlite::{Connection, Result};
use std::collections::HashMap;

/// Current database schema version
const CURRENT_VERSION: u32 = 2;

/// Migration system for managing database schema versions
pub struct MigrationManager;

impl MigrationManager {
    /// Initialize the database with the current schema
    /// This creates the schema_version table and applies all migrations
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys=ON", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;

        let current_version: u32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for version in (current_version + 1)..=CURRENT_VERSION {
            Self::apply_migration(conn, version)?;
        }

        Ok(())
    }

    /// Apply a specific migration by version number
    fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
        let migrations = get_migrations();
        if let Some(migration) = migrations.get(&version) {
            log::debug!("applying schema migration v{}", version);
            let tx = conn.unchecked_transaction()?;
            migration(&tx)?;
            tx.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [version],
            )?;
            tx.commit()?;
            Ok(())
        } else {
            Err(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISUSE),
                Some(format!("No migration found for version {}", version)),
            ))
        }
    }

    /// Get the current schema version
    pub fn get_version(conn: &Connection) -> Result<u32> {
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
    }
}

/// Get all migrations indexed by version
fn get_migrations() -> HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> {
    let mut migrations: HashMap<u32, fn(&rusqlite::Transaction) -> Result<(), rusqlite::Error>> = HashMap::new();
    migrations.insert(1, migration_v1);
    migrations.insert(2, migration_v2);
    migrations
}

/// Migration v1: leads, properties and negotiations
fn migration_v1(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE leads (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            phone TEXT NULL,
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE properties (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            price_cents INTEGER NULL CHECK(price_cents IS NULL OR price_cents >= 0),
            created_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE negotiations (
            id INTEGER PRIMARY KEY,
            lead_id INTEGER NOT NULL REFERENCES leads(id),
            property_id INTEGER NULL REFERENCES properties(id),
            stage TEXT NOT NULL CHECK(stage IN (
                'NOVO_LEAD','PRIMEIRO_CONTATO','QUALIFICADO','VISITA_AGENDADA',
                'PROPOSTA_ENVIADA','FECHAMENTO','GANHO','PERDIDO'
            )),
            order_hint INTEGER NULL,
            created_ts INTEGER NOT NULL,
            updated_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX idx_negotiations_stage ON negotiations(stage, order_hint)",
        [],
    )?;

    Ok(())
}

/// Migration v2: stage transition ledger
fn migration_v2(tx: &rusqlite::Transaction) -> Result<(), rusqlite::Error> {
    tx.execute(
        "CREATE TABLE stage_history (
            id INTEGER PRIMARY KEY,
            negotiation_id INTEGER NOT NULL REFERENCES negotiations(id) ON DELETE CASCADE,
            from_stage TEXT NULL,
            to_stage TEXT NOT NULL,
            changed_ts INTEGER NOT NULL
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX idx_stage_history_negotiation ON stage_history(negotiation_id, changed_ts)",
        [],
    )?;

    // Backfill an entry for negotiations created before the ledger existed
    tx.execute(
        "INSERT INTO stage_history (negotiation_id, from_stage, to_stage, changed_ts)
         SELECT id, NULL, stage, created_ts FROM negotiations",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();
        assert_eq!(MigrationManager::get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();
        MigrationManager::initialize(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, CURRENT_VERSION as i64);
    }

    #[test]
    fn test_stage_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationManager::initialize(&conn).unwrap();
        conn.execute("INSERT INTO leads (name, created_ts) VALUES ('Ana', 0)", []).unwrap();
        let bad = conn.execute(
            "INSERT INTO negotiations (lead_id, stage, created_ts, updated_ts) VALUES (1, 'SOMEWHERE', 0, 0)",
            [],
        );
        assert!(bad.is_err());
    }
}
