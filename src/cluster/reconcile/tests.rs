use std::sync::Arc;

use super::*;
use crate::cluster::test_support::{FakeControl, FakeDirectory, live, record};
use crate::domain::{AgentRegion, SystemSnapshot};
use crate::error::{AppError, AppResult};
use crate::store::{MemoryAgentRegistry, StaticRegions};

fn regions(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

#[test]
fn new_live_agent_creates_single_record() -> AppResult<()> {
    let plan = plan_reconciliation(
        "east",
        &regions(&["east", "west"]),
        vec![live("10.0.0.1", "a", 4001, "east")],
        vec![],
    );
    let [created] = plan.save.as_slice() else {
        return Err(AppError::validation(format!("Unexpected plan: {:?}", plan)));
    };
    if created.status != AgentStatus::Ready || created.approved || created.port != 4001 {
        return Err(AppError::validation(format!(
            "Unexpected created record: {:?}",
            created
        )));
    }
    if !plan.delete.is_empty() {
        return Err(AppError::validation("Expected no deletes"));
    }
    Ok(())
}

#[test]
fn new_live_agent_from_foreign_region_is_wrong_region() -> AppResult<()> {
    let plan = plan_reconciliation(
        "east",
        &regions(&["east", "west"]),
        vec![
            live("10.0.0.1", "a", 4001, "west"),
            live("10.0.0.2", "b", 4002, "east_owned_bob"),
        ],
        vec![],
    );
    let statuses: Vec<(String, AgentStatus)> = plan
        .save
        .iter()
        .map(|record| (record.name.clone(), record.status))
        .collect();
    let expected = vec![
        ("a".to_owned(), AgentStatus::WrongRegion),
        ("b".to_owned(), AgentStatus::Ready),
    ];
    if statuses != expected {
        return Err(AppError::validation(format!(
            "Unexpected statuses: {:?}",
            statuses
        )));
    }
    Ok(())
}

#[test]
fn local_record_takes_live_port_and_status() -> AppResult<()> {
    let mut stored = record("10.0.0.1", "a", 4001, "east");
    stored.id = Some(7);
    stored.approved = true;
    let mut agent = live("10.0.0.1", "a", 5001, "east");
    agent.status = AgentStatus::Busy;

    let plan = plan_reconciliation("east", &regions(&["east"]), vec![agent], vec![stored]);
    let [updated] = plan.save.as_slice() else {
        return Err(AppError::validation(format!("Unexpected plan: {:?}", plan)));
    };
    if updated.port != 5001 || updated.status != AgentStatus::Busy {
        return Err(AppError::validation("Expected live port/status to win"));
    }
    if !updated.approved || updated.id != Some(7) {
        return Err(AppError::validation("Expected registry to keep approval and id"));
    }
    Ok(())
}

#[test]
fn live_agent_with_foreign_record_is_flagged_once() -> AppResult<()> {
    let stored = record("10.0.0.1", "a", 4001, "west");
    let plan = plan_reconciliation(
        "east",
        &regions(&["east", "west"]),
        vec![live("10.0.0.1", "a", 4001, "east")],
        vec![stored.clone()],
    );
    if plan.save.len() != 1
        || plan
            .save
            .first()
            .is_none_or(|saved| saved.status != AgentStatus::WrongRegion)
    {
        return Err(AppError::validation("Expected record flagged WRONG_REGION"));
    }

    let mut flagged = stored;
    flagged.status = AgentStatus::WrongRegion;
    let plan = plan_reconciliation(
        "east",
        &regions(&["east", "west"]),
        vec![live("10.0.0.1", "a", 4001, "east")],
        vec![flagged],
    );
    if !plan.is_empty() {
        return Err(AppError::validation("Expected already flagged record untouched"));
    }
    Ok(())
}

#[test]
fn disconnected_local_agent_becomes_inactive() -> AppResult<()> {
    let plan = plan_reconciliation(
        "east",
        &regions(&["east"]),
        vec![],
        vec![record("10.0.0.1", "a", 4001, "east_owned_bob")],
    );
    if plan.save.first().map(|saved| saved.status) != Some(AgentStatus::Inactive) {
        return Err(AppError::validation("Expected INACTIVE"));
    }
    Ok(())
}

#[test]
fn unknown_region_records_are_deleted_and_foreign_ones_kept() -> AppResult<()> {
    let plan = plan_reconciliation(
        "east",
        &regions(&["east", "west"]),
        vec![],
        vec![
            record("10.0.0.1", "gone", 4001, "north"),
            record("10.0.0.2", "gone-owned", 4002, "north_owned_bob"),
            record("10.0.0.3", "foreign", 4003, "west"),
        ],
    );
    let deleted: Vec<&str> = plan.delete.iter().map(|r| r.name.as_str()).collect();
    if deleted != ["gone", "gone-owned"] {
        return Err(AppError::validation(format!(
            "Unexpected deletes: {:?}",
            deleted
        )));
    }
    if !plan.save.is_empty() {
        return Err(AppError::validation("Expected foreign record untouched"));
    }
    Ok(())
}

#[test]
fn unknown_region_record_with_live_agent_is_not_deleted() -> AppResult<()> {
    let plan = plan_reconciliation(
        "east",
        &regions(&["east"]),
        vec![live("10.0.0.1", "a", 4001, "east")],
        vec![record("10.0.0.1", "a", 4001, "north")],
    );
    if !plan.delete.is_empty() {
        return Err(AppError::validation("Expected attached agent to be kept"));
    }
    if plan.save.first().map(|saved| saved.status) != Some(AgentStatus::WrongRegion) {
        return Err(AppError::validation("Expected WRONG_REGION"));
    }
    Ok(())
}

fn reconciler(
    registry: &Arc<MemoryAgentRegistry>,
    directory: &Arc<FakeDirectory>,
) -> Reconciler {
    Reconciler::new(
        "east",
        registry.clone(),
        directory.clone(),
        Arc::new(StaticRegions::new(regions(&["east", "west"]))),
    )
}

#[tokio::test(flavor = "current_thread")]
async fn second_pass_without_changes_writes_nothing() -> AppResult<()> {
    let registry = Arc::new(MemoryAgentRegistry::new());
    let directory = Arc::new(FakeDirectory::default());
    let control = Arc::new(FakeControl::new(SystemSnapshot::default()));
    directory
        .attach(live("10.0.0.1", "a", 4001, "east"), control.clone())
        .await;
    directory
        .attach(live("10.0.0.2", "b", 4002, "west"), control)
        .await;
    registry
        .save(vec![
            record("10.0.0.3", "c", 4003, "east"),
            record("10.0.0.4", "d", 4004, "west"),
        ])
        .await?;

    let reconciler = reconciler(&registry, &directory);
    let first = reconciler.reconcile().await?;
    if first.saved != 3 || first.deleted != 0 {
        return Err(AppError::validation(format!(
            "Unexpected first pass: {:?}",
            first
        )));
    }
    let second = reconciler.reconcile().await?;
    if second != ReconcileOutcome::default() {
        return Err(AppError::validation(format!(
            "Expected idempotent second pass: {:?}",
            second
        )));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn reconnect_reuses_existing_record() -> AppResult<()> {
    let registry = Arc::new(MemoryAgentRegistry::new());
    let directory = Arc::new(FakeDirectory::default());
    let control = Arc::new(FakeControl::new(SystemSnapshot::default()));
    let reconciler = reconciler(&registry, &directory);

    directory
        .attach(live("10.0.0.1", "a", 4001, "east"), control.clone())
        .await;
    reconciler.reconcile().await?;
    directory.detach(&AgentKey::new("10.0.0.1", "a")).await;
    reconciler.reconcile().await?;
    directory
        .attach(live("10.0.0.1", "a", 4555, "east"), control)
        .await;
    reconciler.reconcile().await?;

    let all = registry.find_all().await?;
    let [only] = all.as_slice() else {
        return Err(AppError::validation(format!(
            "Expected one record per key: {:?}",
            all
        )));
    };
    if only.status != AgentStatus::Ready || only.port != 4555 {
        return Err(AppError::validation(format!("Unexpected record: {:?}", only)));
    }
    if only.region != AgentRegion::shared("east") {
        return Err(AppError::validation("Expected region unchanged"));
    }
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn unreadable_row_does_not_stall_reconciliation() -> AppResult<()> {
    let conn = crate::store::open_database(":memory:").await?;
    conn.call(|db| {
        db.execute(
            "INSERT INTO agents (ip, name, port, region, status, approved, version)
             VALUES ('10.0.0.9', 'legacy', 4000, 'gone', 'STARTED', 1, 1)",
            [],
        )?;
        Ok(())
    })
    .await
    .map_err(|err| AppError::validation(format!("seed failed: {}", err)))?;
    let registry = Arc::new(crate::store::SqliteAgentRegistry::new(conn.clone()));
    let directory = Arc::new(FakeDirectory::default());
    directory
        .attach(
            live("10.0.0.1", "a", 4001, "east"),
            Arc::new(FakeControl::new(SystemSnapshot::default())),
        )
        .await;
    let reconciler = Reconciler::new(
        "east",
        registry.clone(),
        directory,
        Arc::new(StaticRegions::new(regions(&["east", "west"]))),
    );

    let outcome = reconciler.reconcile().await?;
    if outcome.saved != 1 || outcome.deleted != 0 {
        return Err(AppError::validation(format!(
            "Unexpected outcome: {:?}",
            outcome
        )));
    }
    let legacy = conn
        .call(|db| {
            let count: i64 = db.query_row(
                "SELECT COUNT(*) FROM agents WHERE name = 'legacy'",
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(|err| AppError::validation(format!("count failed: {}", err)))?;
    if legacy != 1 {
        return Err(AppError::validation("Expected unreadable row to be left alone"));
    }
    Ok(())
}
