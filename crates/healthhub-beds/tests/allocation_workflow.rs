//! Allocate/discharge behaviour, including partial failures and races.

mod support;

use std::sync::Arc;

use healthhub_beds::{
    AllocationWorkflow, FailureKind, Operation, WorkflowError, WorkflowOutcome,
};
use healthhub_core::{AllocationStatus, BedStatus, Timestamp, now_utc};
use healthhub_db_memory::InMemoryStore;
use healthhub_storage::{DynStore, Filter, RecordStore, StorageError};
use serde_json::json;
use support::*;
use time::macros::datetime;

fn admission() -> Timestamp {
    Timestamp::new(datetime!(2024-03-01 09:30 UTC))
}

fn faulty() -> (Arc<InMemoryStore>, Arc<FaultyStore>, AllocationWorkflow) {
    let inner = Arc::new(InMemoryStore::new());
    let faulty = Arc::new(FaultyStore::new(inner.clone()));
    let workflow = AllocationWorkflow::new(faulty.clone());
    (inner, faulty, workflow)
}

#[tokio::test]
async fn allocate_then_discharge_frees_the_bed() {
    let store: DynStore = Arc::new(InMemoryStore::new());
    let bed_id = seed_bed(&*store, "A-101", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(store.clone());

    let allocation = match workflow.allocate(&bed_id, "p1", admission(), None).await {
        WorkflowOutcome::Success(allocation) => allocation,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(allocation.status, AllocationStatus::Active);
    assert_eq!(allocation.bed_id, bed_id);
    assert_eq!(allocation.admission_date, admission());

    let bed = read_bed(&*store, &bed_id).await;
    assert!(bed.is_bound_to(&allocation.id));
    assert_eq!(active_allocations_for(&*store, &bed_id).await.len(), 1);

    let discharged_at = Timestamp::new(datetime!(2024-03-05 16:00 UTC));
    let closed = workflow
        .discharge(&allocation.id, Some(discharged_at))
        .await
        .success()
        .expect("discharge succeeds");
    assert_eq!(closed.status, AllocationStatus::Discharged);
    assert_eq!(closed.discharge_date, Some(discharged_at));

    let bed = read_bed(&*store, &bed_id).await;
    assert_eq!(bed.status, BedStatus::Available);
    assert_eq!(bed.patient_id, None);
    assert_eq!(bed.allocation_id, None);

    let stored = read_allocation(&*store, &allocation.id).await;
    assert_eq!(stored.status, AllocationStatus::Discharged);
    assert_eq!(stored.discharge_date, Some(discharged_at));
    assert!(active_allocations_for(&*store, &bed_id).await.is_empty());
}

#[tokio::test]
async fn allocate_on_unavailable_bed_writes_nothing() {
    let (inner, faulty, workflow) = faulty();
    let occupied = seed_bed(&*inner, "A-102", BedStatus::Occupied).await;
    let maintenance = seed_bed(&*inner, "A-103", BedStatus::Maintenance).await;

    for bed_id in [&occupied, &maintenance] {
        let outcome = workflow.allocate(bed_id, "p1", admission(), None).await;
        match outcome {
            WorkflowOutcome::Failed(WorkflowError::InvalidState { expected, .. }) => {
                assert_eq!(expected, "available");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(faulty.writes(), 0);
    assert_eq!(inner.count_in(ALLOCATIONS), 0);
}

#[tokio::test]
async fn allocate_on_missing_bed_is_not_found() {
    let (inner, faulty, workflow) = faulty();

    let outcome = workflow.allocate("no-such-bed", "p1", admission(), None).await;
    assert_eq!(outcome.kind(), Some(FailureKind::NotFound));
    assert!(outcome.is_failed());
    assert_eq!(faulty.writes(), 0);
    assert!(inner.is_empty());
}

#[tokio::test]
async fn failed_allocation_insert_has_no_side_effects() {
    let (inner, faulty, workflow) = faulty();
    let bed_id = seed_bed(&*inner, "A-104", BedStatus::Available).await;
    faulty.fail_next(Op::Insert, ALLOCATIONS, timeout);

    let outcome = workflow.allocate(&bed_id, "p1", admission(), None).await;
    match outcome {
        WorkflowOutcome::Failed(WorkflowError::Store(err)) => {
            assert!(matches!(err, StorageError::Timeout { .. }));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(inner.count_in(ALLOCATIONS), 0);
    assert_eq!(read_bed(&*inner, &bed_id).await.status, BedStatus::Available);
}

#[tokio::test]
async fn failed_bed_update_after_allocation_is_partial() {
    let (inner, faulty, workflow) = faulty();
    let bed_id = seed_bed(&*inner, "A-105", BedStatus::Available).await;
    faulty.fail_next(Op::Update, BEDS, connection_reset);

    let partial = match workflow.allocate(&bed_id, "p1", admission(), Some("ER")).await {
        WorkflowOutcome::PartialFailure(partial) => partial,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(partial.operation, Operation::Allocate);
    assert_eq!(partial.kind, FailureKind::Store);
    assert_eq!(partial.bed_id, bed_id);
    assert_eq!(partial.artifact_id(), partial.allocation_id);

    // the allocation was committed and is identifiable
    let allocation = read_allocation(&*inner, partial.artifact_id()).await;
    assert!(allocation.is_active());
    assert_eq!(allocation.notes.as_deref(), Some("ER"));
    // the bed was not
    let bed = read_bed(&*inner, &bed_id).await;
    assert_eq!(bed.status, BedStatus::Available);
    assert_eq!(bed.allocation_id, None);
}

#[tokio::test]
async fn lost_bed_race_is_partial_conflict() {
    let (inner, faulty, workflow) = faulty();
    let bed_id = seed_bed(&*inner, "A-106", BedStatus::Available).await;
    faulty.fail_next(Op::Update, BEDS, |table| {
        StorageError::condition_failed(table, "raced")
    });

    let outcome = workflow.allocate(&bed_id, "p1", admission(), None).await;
    assert!(outcome.is_partial());
    assert_eq!(outcome.kind(), Some(FailureKind::Conflict));
}

#[tokio::test]
async fn discharge_twice_is_invalid_state_and_leaves_bed_alone() {
    let store: DynStore = Arc::new(InMemoryStore::new());
    let bed_id = seed_bed(&*store, "A-107", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(store.clone());

    let first = workflow
        .allocate(&bed_id, "p1", admission(), None)
        .await
        .success()
        .unwrap();
    assert!(workflow.discharge(&first.id, None).await.is_success());

    // the bed is taken by the next patient
    let second = workflow
        .allocate(&bed_id, "p2", now_utc(), None)
        .await
        .success()
        .unwrap();

    let outcome = workflow.discharge(&first.id, None).await;
    match outcome {
        WorkflowOutcome::Failed(WorkflowError::InvalidState { actual, .. }) => {
            assert_eq!(actual, "discharged");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let bed = read_bed(&*store, &bed_id).await;
    assert!(bed.is_bound_to(&second.id));
    assert_eq!(bed.patient_id.as_deref(), Some("p2"));
}

#[tokio::test]
async fn discharge_of_missing_allocation_is_not_found() {
    let (_inner, faulty, workflow) = faulty();
    let outcome = workflow.discharge("no-such-allocation", None).await;
    assert_eq!(outcome.kind(), Some(FailureKind::NotFound));
    assert_eq!(faulty.writes(), 0);
}

#[tokio::test]
async fn failed_bed_release_after_discharge_is_partial() {
    let (inner, faulty, workflow) = faulty();
    let bed_id = seed_bed(&*inner, "A-108", BedStatus::Available).await;
    let allocation = workflow
        .allocate(&bed_id, "p1", admission(), None)
        .await
        .success()
        .unwrap();
    faulty.fail_next(Op::Update, BEDS, timeout);

    let partial = match workflow.discharge(&allocation.id, None).await {
        WorkflowOutcome::PartialFailure(partial) => partial,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(partial.operation, Operation::Discharge);
    assert_eq!(partial.artifact_id(), bed_id);
    assert_eq!(partial.allocation_id, allocation.id);

    let stored = read_allocation(&*inner, &allocation.id).await;
    assert_eq!(stored.status, AllocationStatus::Discharged);
    assert!(stored.discharge_date.is_some());
    // still occupied: the window a reconcile closes
    assert!(read_bed(&*inner, &bed_id).await.is_bound_to(&allocation.id));
}

#[tokio::test]
async fn discharging_a_losing_stay_keeps_the_winners_bed() {
    let inner: DynStore = Arc::new(InMemoryStore::new());
    let bed_id = seed_bed(&*inner, "A-113", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(Arc::new(YieldingStore::new(inner.clone())));

    let (left, right) = tokio::join!(
        workflow.allocate(&bed_id, "p1", admission(), None),
        workflow.allocate(&bed_id, "p2", admission(), None),
    );
    let (winner, loser) = match (left, right) {
        (WorkflowOutcome::Success(winner), WorkflowOutcome::PartialFailure(loser))
        | (WorkflowOutcome::PartialFailure(loser), WorkflowOutcome::Success(winner)) => {
            (winner, loser)
        }
        other => panic!("unexpected outcomes: {other:?}"),
    };
    assert_eq!(loser.kind, FailureKind::Conflict);

    // the operator voids the leftover stay
    let voided = workflow
        .discharge(&loser.allocation_id, None)
        .await
        .success()
        .expect("discharge of the leftover succeeds");
    assert_eq!(voided.status, AllocationStatus::Discharged);

    let bed = read_bed(&*inner, &bed_id).await;
    assert!(bed.is_bound_to(&winner.id));
    assert_eq!(bed.patient_id.as_deref(), Some(winner.patient_id.as_str()));
    assert!(read_allocation(&*inner, &winner.id).await.is_active());
    let active = active_allocations_for(&*inner, &bed_id).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, winner.id);
}

#[tokio::test]
async fn discharge_releases_legacy_bed_by_patient() {
    let store: DynStore = Arc::new(InMemoryStore::new());
    let bed_id = seed_bed(&*store, "A-114", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(store.clone());
    let allocation = workflow
        .allocate(&bed_id, "p1", admission(), None)
        .await
        .success()
        .unwrap();
    // rows written before beds carried an allocation reference
    store
        .update_where(BEDS, &Filter::by_id(bed_id.as_str()), &json!({"allocation_id": null}))
        .await
        .unwrap();

    assert!(workflow.discharge(&allocation.id, None).await.is_success());
    let bed = read_bed(&*store, &bed_id).await;
    assert_eq!(bed.status, BedStatus::Available);
    assert_eq!(bed.patient_id, None);
}

#[tokio::test]
async fn discharge_leaves_bed_of_another_patient_alone() {
    let store: DynStore = Arc::new(InMemoryStore::new());
    let bed_id = seed_bed(&*store, "A-115", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(store.clone());
    let allocation = workflow
        .allocate(&bed_id, "p1", admission(), None)
        .await
        .success()
        .unwrap();
    store
        .update_where(
            BEDS,
            &Filter::by_id(bed_id.as_str()),
            &json!({"allocation_id": null, "patient_id": "p9"}),
        )
        .await
        .unwrap();

    assert!(workflow.discharge(&allocation.id, None).await.is_success());
    let bed = read_bed(&*store, &bed_id).await;
    assert_eq!(bed.status, BedStatus::Occupied);
    assert_eq!(bed.patient_id.as_deref(), Some("p9"));
    assert_eq!(
        read_allocation(&*store, &allocation.id).await.status,
        AllocationStatus::Discharged
    );
}

#[tokio::test]
async fn bed_rebound_before_release_is_partial_conflict() {
    let (inner, faulty, workflow) = faulty();
    let bed_id = seed_bed(&*inner, "A-116", BedStatus::Available).await;
    let allocation = workflow
        .allocate(&bed_id, "p1", admission(), None)
        .await
        .success()
        .unwrap();
    faulty.fail_next(Op::Update, BEDS, |table| {
        StorageError::condition_failed(table, "rebound")
    });

    let partial = match workflow.discharge(&allocation.id, None).await {
        WorkflowOutcome::PartialFailure(partial) => partial,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(partial.kind, FailureKind::Conflict);
    assert_eq!(partial.artifact_id(), bed_id);
    assert!(read_bed(&*inner, &bed_id).await.is_bound_to(&allocation.id));
}

#[tokio::test]
async fn discharge_after_bed_removal_closes_the_stay() {
    let (inner, faulty, workflow) = faulty();
    let bed_id = seed_bed(&*inner, "A-117", BedStatus::Available).await;
    let allocation = workflow
        .allocate(&bed_id, "p1", admission(), None)
        .await
        .success()
        .unwrap();
    inner
        .delete_where(BEDS, &Filter::by_id(bed_id.as_str()))
        .await
        .unwrap();

    let closed = workflow
        .discharge(&allocation.id, None)
        .await
        .success()
        .expect("discharge succeeds without a bed");
    assert_eq!(closed.status, AllocationStatus::Discharged);
    // only the allocation close was written
    assert_eq!(faulty.writes(), 3);
}

#[tokio::test]
async fn failed_allocation_close_is_a_clean_failure() {
    let (inner, faulty, workflow) = faulty();
    let bed_id = seed_bed(&*inner, "A-109", BedStatus::Available).await;
    let allocation = workflow
        .allocate(&bed_id, "p1", admission(), None)
        .await
        .success()
        .unwrap();
    faulty.fail_next(Op::Update, ALLOCATIONS, timeout);

    let outcome = workflow.discharge(&allocation.id, None).await;
    assert!(outcome.is_failed());
    assert_eq!(outcome.kind(), Some(FailureKind::Store));
    assert!(read_allocation(&*inner, &allocation.id).await.is_active());
    assert!(read_bed(&*inner, &bed_id).await.is_bound_to(&allocation.id));
}

#[tokio::test]
async fn concurrent_allocations_have_a_single_winner() {
    let inner: DynStore = Arc::new(InMemoryStore::new());
    let bed_id = seed_bed(&*inner, "A-110", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(Arc::new(YieldingStore::new(inner.clone())));

    let (left, right) = tokio::join!(
        workflow.allocate(&bed_id, "p1", admission(), None),
        workflow.allocate(&bed_id, "p2", admission(), None),
    );
    let outcomes = [left, right];

    let winners: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            WorkflowOutcome::Success(allocation) => Some(allocation.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);
    let loser = outcomes.iter().find(|o| !o.is_success()).unwrap();
    assert!(matches!(
        loser.kind(),
        Some(FailureKind::Conflict) | Some(FailureKind::InvalidState)
    ));

    let bed = read_bed(&*inner, &bed_id).await;
    assert!(bed.is_bound_to(&winners[0].id));
    assert_eq!(bed.patient_id.as_deref(), Some(winners[0].patient_id.as_str()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_allocations_on_one_bed() {
    let inner: DynStore = Arc::new(InMemoryStore::new());
    let bed_id = seed_bed(&*inner, "A-111", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(Arc::new(YieldingStore::new(inner.clone())));

    let tasks = (0..12).map(|n| {
        let workflow = workflow.clone();
        let bed_id = bed_id.clone();
        tokio::spawn(async move {
            workflow
                .allocate(&bed_id, &format!("p{n}"), now_utc(), None)
                .await
        })
    });
    let outcomes: Vec<_> = futures_util::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            WorkflowOutcome::Success(allocation) => Some(allocation.id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(winners.len(), 1);
    for outcome in outcomes.iter().filter(|o| !o.is_success()) {
        match outcome {
            WorkflowOutcome::PartialFailure(partial) => assert_eq!(partial.kind, FailureKind::Conflict),
            WorkflowOutcome::Failed(err) => assert_eq!(err.kind(), FailureKind::InvalidState),
            WorkflowOutcome::Success(_) => unreachable!(),
        }
    }
    assert!(read_bed(&*inner, &bed_id).await.is_bound_to(&winners[0]));
}

#[tokio::test]
async fn store_backend_is_injected() {
    let inner = Arc::new(InMemoryStore::new());
    let faulty = Arc::new(FaultyStore::new(inner.clone()));
    assert_eq!(faulty.backend_name(), "faulty");

    let bed_id = seed_bed(&*inner, "A-112", BedStatus::Available).await;
    let workflow = AllocationWorkflow::new(faulty.clone());
    assert!(workflow.allocate(&bed_id, "p1", admission(), None).await.is_success());
    // one insert and one bed update went through the injected store
    assert_eq!(faulty.writes(), 2);
}
