use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::warn;

use crate::domain::{AgentRecord, AgentRegion, AgentStatus};
use crate::error::{AppError, AppResult, StoreError};
use crate::ports::{AgentRegistry, SaveOutcome};

use super::sqlite::{clamp_i64, sqlite_error};

const SELECT_AGENTS: &str =
    "SELECT id, ip, name, port, region, status, approved, version FROM agents";

/// Agent row as stored, before domain validation.
struct AgentRow {
    id: i64,
    ip: String,
    name: String,
    port: i64,
    region: String,
    status: String,
    approved: bool,
    version: i64,
}

impl AgentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ip: row.get(1)?,
            name: row.get(2)?,
            port: row.get(3)?,
            region: row.get(4)?,
            status: row.get(5)?,
            approved: row.get(6)?,
            version: row.get(7)?,
        })
    }

    fn into_record(self) -> AppResult<AgentRecord> {
        let port = u16::try_from(self.port).map_err(|_err| {
            AppError::store(StoreError::InvalidStoredValue {
                id: self.id,
                field: "port",
                value: self.port.to_string(),
            })
        })?;
        let status = self.status.parse::<AgentStatus>().map_err(|_err| {
            AppError::store(StoreError::InvalidStoredValue {
                id: self.id,
                field: "status",
                value: self.status.clone(),
            })
        })?;
        let version = u64::try_from(self.version).map_err(|_err| {
            AppError::store(StoreError::InvalidStoredValue {
                id: self.id,
                field: "version",
                value: self.version.to_string(),
            })
        })?;
        Ok(AgentRecord {
            id: Some(self.id),
            ip: self.ip,
            name: self.name,
            port,
            region: AgentRegion::parse(&self.region),
            status,
            approved: self.approved,
            version,
        })
    }
}

/// Decodes listed rows, skipping the ones this controller cannot read.
///
/// Skipped rows stay in the table untouched.
fn into_records(rows: Vec<AgentRow>) -> Vec<AgentRecord> {
    rows.into_iter()
        .filter_map(|row| match row.into_record() {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("Skipping unreadable agent row: {}", err);
                None
            }
        })
        .collect()
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Agent registry persisted in the shared SQLite database.
#[derive(Clone)]
pub struct SqliteAgentRegistry {
    conn: Connection,
}

impl SqliteAgentRegistry {
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AgentRegistry for SqliteAgentRegistry {
    async fn find_all(&self) -> AppResult<Vec<AgentRecord>> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_AGENTS))?;
                let rows = stmt
                    .query_map([], AgentRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(sqlite_error("load agents"))?;
        Ok(into_records(rows))
    }

    async fn find_by_region_prefix(&self, prefix: &str) -> AppResult<Vec<AgentRecord>> {
        let pattern = format!("{}%", escape_like(prefix));
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE region LIKE ?1 ESCAPE '\\' ORDER BY id",
                    SELECT_AGENTS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![pattern], AgentRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(sqlite_error("load agents by region"))?;
        Ok(into_records(rows))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<AgentRecord>> {
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!("{} WHERE id = ?1", SELECT_AGENTS),
                        rusqlite::params![id],
                        AgentRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(sqlite_error("load agent"))?;
        row.map(AgentRow::into_record).transpose()
    }

    async fn save(&self, records: Vec<AgentRecord>) -> AppResult<SaveOutcome> {
        if records.is_empty() {
            return Ok(SaveOutcome::default());
        }
        self.conn
            .call(move |conn| {
                let mut outcome = SaveOutcome::default();
                let tx = conn.transaction()?;
                {
                    let mut insert = tx.prepare(
                        "INSERT INTO agents (ip, name, port, region, status, approved, version)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
                         ON CONFLICT(ip, name) DO NOTHING",
                    )?;
                    let mut update = tx.prepare(
                        "UPDATE agents
                         SET port = ?1, region = ?2, status = ?3, approved = ?4,
                             version = version + 1
                         WHERE id = ?5 AND version = ?6",
                    )?;
                    for record in records {
                        let changed = match record.id {
                            None => insert.execute(rusqlite::params![
                                record.ip,
                                record.name,
                                i64::from(record.port),
                                record.region.to_string(),
                                record.status.as_str(),
                                record.approved,
                            ])?,
                            Some(id) => update.execute(rusqlite::params![
                                i64::from(record.port),
                                record.region.to_string(),
                                record.status.as_str(),
                                record.approved,
                                id,
                                clamp_i64(record.version),
                            ])?,
                        };
                        if changed == 0 {
                            outcome.conflicts.push(record.key());
                        } else {
                            outcome.saved = outcome.saved.saturating_add(changed);
                        }
                    }
                }
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(sqlite_error("save agents"))
    }

    async fn delete(&self, records: Vec<AgentRecord>) -> AppResult<usize> {
        let targets: Vec<(i64, i64)> = records
            .iter()
            .filter_map(|record| record.id.map(|id| (id, clamp_i64(record.version))))
            .collect();
        if targets.is_empty() {
            return Ok(0);
        }
        self.conn
            .call(move |conn| {
                let mut deleted = 0usize;
                let tx = conn.transaction()?;
                {
                    let mut stmt =
                        tx.prepare("DELETE FROM agents WHERE id = ?1 AND version = ?2")?;
                    for (id, version) in targets {
                        deleted = deleted.saturating_add(stmt.execute(rusqlite::params![id, version])?);
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(sqlite_error("delete agents"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::store::open_database;

    fn record(ip: &str, name: &str, region: &str) -> AgentRecord {
        AgentRecord {
            id: None,
            ip: ip.to_owned(),
            name: name.to_owned(),
            port: 4000,
            region: AgentRegion::parse(region),
            status: AgentStatus::Ready,
            approved: false,
            version: 0,
        }
    }

    async fn registry() -> AppResult<SqliteAgentRegistry> {
        Ok(SqliteAgentRegistry::new(open_database(":memory:").await?))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn insert_assigns_id_and_version() -> AppResult<()> {
        let registry = registry().await?;
        let outcome = registry
            .save(vec![record("10.0.0.1", "a", "east_owned_bob")])
            .await?;
        if outcome.saved != 1 || !outcome.conflicts.is_empty() {
            return Err(AppError::store(format!("Unexpected outcome: {:?}", outcome)));
        }
        let all = registry.find_all().await?;
        let Some(stored) = all.first() else {
            return Err(AppError::store("Expected stored record"));
        };
        if stored.id.is_none() || stored.version != 1 || !stored.region.is_owned_by("bob") {
            return Err(AppError::store(format!("Unexpected record: {:?}", stored)));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn stale_version_is_reported_as_conflict() -> AppResult<()> {
        let registry = registry().await?;
        registry.save(vec![record("10.0.0.1", "a", "east")]).await?;
        let Some(mut first) = registry.find_all().await?.into_iter().next() else {
            return Err(AppError::store("Expected stored record"));
        };
        let mut second = first.clone();

        first.status = AgentStatus::Inactive;
        let outcome = registry.save(vec![first]).await?;
        if outcome.saved != 1 {
            return Err(AppError::store("Expected first writer to win"));
        }

        second.status = AgentStatus::WrongRegion;
        let outcome = registry.save(vec![second.clone()]).await?;
        if outcome.saved != 0 || outcome.conflicts != vec![second.key()] {
            return Err(AppError::store(format!(
                "Expected stale writer to conflict: {:?}",
                outcome
            )));
        }
        if registry.delete(vec![second]).await? != 0 {
            return Err(AppError::store("Expected stale delete to be skipped"));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn duplicate_key_insert_conflicts() -> AppResult<()> {
        let registry = registry().await?;
        registry.save(vec![record("10.0.0.1", "a", "east")]).await?;
        let outcome = registry.save(vec![record("10.0.0.1", "a", "west")]).await?;
        if outcome.saved != 0 || outcome.conflicts.len() != 1 {
            return Err(AppError::store("Expected duplicate insert to conflict"));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn region_prefix_filter_escapes_wildcards() -> AppResult<()> {
        let registry = registry().await?;
        registry
            .save(vec![
                record("10.0.0.1", "a", "east"),
                record("10.0.0.2", "b", "east_owned_bob"),
                record("10.0.0.3", "c", "west"),
                record("10.0.0.4", "d", "eXst"),
            ])
            .await?;
        let east = registry.find_by_region_prefix("east").await?;
        if east.len() != 2 {
            return Err(AppError::store(format!("Unexpected east records: {:?}", east)));
        }
        let literal = registry.find_by_region_prefix("e_st").await?;
        if !literal.is_empty() {
            return Err(AppError::store("Expected '_' to match literally"));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn delete_removes_matching_versions() -> AppResult<()> {
        let registry = registry().await?;
        registry.save(vec![record("10.0.0.1", "a", "gone")]).await?;
        let all = registry.find_all().await?;
        if registry.delete(all).await? != 1 {
            return Err(AppError::store("Expected one record deleted"));
        }
        if !registry.find_all().await?.is_empty() {
            return Err(AppError::store("Expected empty registry"));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unreadable_rows_are_skipped_and_kept() -> AppResult<()> {
        let conn = open_database(":memory:").await?;
        let registry = SqliteAgentRegistry::new(conn.clone());
        registry.save(vec![record("10.0.0.1", "good", "east")]).await?;
        conn.call(|db| {
            db.execute_batch(
                "INSERT INTO agents (ip, name, port, region, status, approved, version)
                 VALUES ('10.0.0.2', 'legacy', 4000, 'east', 'STARTED', 1, 1);
                 INSERT INTO agents (ip, name, port, region, status, approved, version)
                 VALUES ('10.0.0.3', 'wide', 70000, 'east', 'READY', 1, 1);
                 INSERT INTO agents (ip, name, port, region, status, approved, version)
                 VALUES ('10.0.0.4', 'rewound', 4000, 'east', 'READY', 1, -1);",
            )?;
            Ok(())
        })
        .await
        .map_err(sqlite_error("seed agents"))?;

        let names = |records: Vec<AgentRecord>| -> Vec<String> {
            records.into_iter().map(|stored| stored.name).collect()
        };
        let all = names(registry.find_all().await?);
        if all != vec!["good".to_owned()] {
            return Err(AppError::store(format!("Unexpected listing: {:?}", all)));
        }
        let east = names(registry.find_by_region_prefix("east").await?);
        if east != vec!["good".to_owned()] {
            return Err(AppError::store(format!("Unexpected east listing: {:?}", east)));
        }

        let stored = conn
            .call(|db| {
                let count: i64 = db.query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))?;
                Ok(count)
            })
            .await
            .map_err(sqlite_error("count agents"))?;
        if stored != 4 {
            return Err(AppError::store(format!("Expected rows kept, found {}", stored)));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn find_by_id_returns_none_for_unknown() -> AppResult<()> {
        let registry = registry().await?;
        if registry.find_by_id(42).await?.is_some() {
            return Err(AppError::store("Expected no record"));
        }
        Ok(())
    }
}
