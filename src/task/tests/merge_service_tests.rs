//! Service tests for merge validation, cleanup and outcomes.

use super::faulty_store::{Fault, FaultyStore};
use super::harness::{Harness, WEB_MODULE, deadline};
use crate::changeset::{
    domain::{ChangesetDomainError, ChangesetState, Component, ReviewState},
    ports::ComponentRepository,
    services::CreateComponentRequest,
};
use crate::task::{
    domain::{Apply, Merge, MergeOutcome, MergeRejection, Plan, TaskRecord, TaskState},
    ports::{OperationKind, PlanStore},
    services::OrchestrationError,
};
use crate::versioning::ports::{VersionedStore, VersionedStoreError};
use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::Arc;

#[fixture]
fn harness() -> Harness {
    Harness::scripted()
}

async fn planned_web(harness: &Harness, changeset: &str) -> (Component, Plan) {
    let component = harness.changeset_with_web(changeset, WEB_MODULE).await;
    let plan = harness.plan(changeset, &component).await;
    assert_eq!(plan.state(), TaskState::Succeeded);
    (component, plan)
}

async fn merge_now(harness: &Harness, changeset: &str) -> (Merge, MergeOutcome) {
    let queued = harness
        .merges
        .create_merge(changeset)
        .await
        .expect("merge created");
    let outcome = harness
        .merges
        .run_merge(queued.id(), deadline())
        .await
        .expect("merge runs");
    let merge = harness.merges.get_merge(queued.id()).await.expect("readable");
    (merge, outcome)
}

async fn rejection_of(harness: &Harness, changeset: &str) -> MergeRejection {
    let (merge, outcome) = merge_now(harness, changeset).await;
    let MergeOutcome::Rejected(rejection) = outcome else {
        panic!("expected rejection, merge outcome was {outcome:?}");
    };
    assert_eq!(merge.state(), TaskState::Failed);
    assert_eq!(merge.rejection(), Some(&rejection));
    let owner = harness.changesets.get(changeset).await.expect("changeset");
    assert_eq!(owner.review_state(), ReviewState::Rejected);
    assert_eq!(owner.state(), ChangesetState::Open);
    rejection
}

/// Merges an `api` component through `c0`, advancing main.
async fn advance_main(harness: &Harness) {
    harness.changesets.create("c0").await.expect("c0 created");
    let api = harness
        .components
        .create("c0", CreateComponentRequest::new("api", WEB_MODULE))
        .await
        .expect("api created");
    harness.plan("c0", &api).await;
    let (_, outcome) = merge_now(harness, "c0").await;
    assert!(outcome.is_merged());
}

async fn rebase_now(harness: &Harness, changeset: &str) {
    let rebase = harness
        .rebases
        .create_rebase(changeset)
        .await
        .expect("rebase created");
    harness
        .rebases
        .run_rebase(rebase.id(), deadline())
        .await
        .expect("rebase runs");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn planned_changeset_merges_into_main(mut harness: Harness) {
    let (component, plan) = planned_web(&harness, "c1").await;

    let (merge, outcome) = merge_now(&harness, "c1").await;

    assert!(outcome.is_merged());
    assert_eq!(merge.state(), TaskState::Succeeded);
    let owner = harness.changesets.get("c1").await.expect("changeset");
    assert_eq!(owner.state(), ChangesetState::Merged);
    let on_main = harness.components.get("c1", component.id()).await.expect("on main");
    assert_eq!(on_main, component);
    let applies = harness.applies.list_applies("c1").await.expect("applies");
    assert_eq!(applies.len(), 1);
    assert_eq!(applies.first().map(Apply::plan_id), Some(plan.id()));
    assert_eq!(
        harness.intakes.applies.try_next(),
        applies.first().map(TaskRecord::id)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn commits_after_merge_request_reject_the_merge(harness: Harness) {
    let (component, _) = planned_web(&harness, "c1").await;
    let queued = harness.merges.create_merge("c1").await.expect("merge created");
    harness.set_variable("c1", &component, "size", json!(2)).await;

    let outcome = harness
        .merges
        .run_merge(queued.id(), deadline())
        .await
        .expect("merge runs");

    assert!(matches!(
        outcome,
        MergeOutcome::Rejected(MergeRejection::ChangesetMoved { .. })
    ));
    let owner = harness.changesets.get("c1").await.expect("changeset");
    assert_eq!(owner.review_state(), ReviewState::Rejected);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn moved_merge_base_rejects_the_merge(harness: Harness) {
    planned_web(&harness, "c1").await;
    let queued = harness.merges.create_merge("c1").await.expect("merge created");
    advance_main(&harness).await;
    rebase_now(&harness, "c1").await;

    let outcome = harness
        .merges
        .run_merge(queued.id(), deadline())
        .await
        .expect("merge runs");

    assert!(matches!(
        outcome,
        MergeOutcome::Rejected(MergeRejection::MergeBaseMoved { .. })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unplanned_component_rejects_the_merge(harness: Harness) {
    harness.changeset_with_web("c1", WEB_MODULE).await;

    let rejection = rejection_of(&harness, "c1").await;

    assert!(matches!(
        rejection,
        MergeRejection::PlanMissing { component } if component.as_str() == "web"
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_plan_rejects_the_merge(harness: Harness) {
    let component = harness.changeset_with_web("c1", "modules/missing").await;
    let plan = harness.plan("c1", &component).await;
    assert_eq!(plan.state(), TaskState::Failed);

    let rejection = rejection_of(&harness, "c1").await;

    assert_eq!(
        rejection,
        MergeRejection::PlanNotSucceeded {
            component: component.name().clone(),
            plan: plan.id(),
            state: TaskState::Failed,
        }
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn component_changed_on_main_rejects_the_merge(harness: Harness) {
    let (component, _) = planned_web(&harness, "c0").await;
    assert!(merge_now(&harness, "c0").await.1.is_merged());
    harness.changesets.create("c1").await.expect("c1");
    harness.changesets.create("c2").await.expect("c2");
    harness.set_variable("c1", &component, "size", json!(2)).await;
    harness.set_variable("c2", &component, "replicas", json!(3)).await;
    harness.plan("c1", &component).await;
    harness.plan("c2", &component).await;
    assert!(merge_now(&harness, "c1").await.1.is_merged());

    let rejection = rejection_of(&harness, "c2").await;

    assert!(matches!(
        rejection,
        MergeRejection::UpstreamChanged { component: name } if name == *component.name()
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn plans_taken_before_a_rebase_are_stale(harness: Harness) {
    let (_, plan) = planned_web(&harness, "c1").await;
    advance_main(&harness).await;
    rebase_now(&harness, "c1").await;

    let rejection = rejection_of(&harness, "c1").await;

    assert!(matches!(
        rejection,
        MergeRejection::PlanStale { plan: stale, .. } if stale == plan.id()
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn component_edited_after_planning_rejects_the_merge(harness: Harness) {
    let (component, plan) = planned_web(&harness, "c1").await;
    harness.set_variable("c1", &component, "size", json!(99)).await;

    let rejection = rejection_of(&harness, "c1").await;

    assert_eq!(
        rejection,
        MergeRejection::PlanOutdated {
            component: component.name().clone(),
            plan: plan.id(),
        }
    );
    let main = harness.store.checkout(harness.main()).await.expect("main");
    assert_eq!(main.data().find_component(component.id()).expect("read"), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replanning_an_edited_component_unblocks_the_merge(harness: Harness) {
    let (component, _) = planned_web(&harness, "c1").await;
    harness.set_variable("c1", &component, "size", json!(99)).await;
    let replanned = harness.plan("c1", &component).await;

    let (_, outcome) = merge_now(&harness, "c1").await;

    assert!(outcome.is_merged());
    let on_main = harness.components.get("c1", component.id()).await.expect("on main");
    assert_eq!(on_main.variables().get("size"), Some(&json!(99)));
    let plans = harness.plans.list_plans("c1").await.expect("plans");
    assert_eq!(plans.iter().map(TaskRecord::id).collect::<Vec<_>>(), vec![replanned.id()]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn commit_landing_after_validation_rejects_the_merge(harness: Harness) {
    planned_web(&harness, "c1").await;
    let queued = harness.merges.create_merge("c1").await.expect("merge created");
    let racing = FaultyStore::new((*harness.store).clone(), Fault::AdvanceSourceBeforeMerge);
    let (merges, _) = harness.merges_over(Arc::new(racing));
    let main_before = harness.store.branch_head(harness.main()).await.expect("head");

    let outcome = merges
        .run_merge(queued.id(), deadline())
        .await
        .expect("merge runs");

    assert!(matches!(
        outcome,
        MergeOutcome::Rejected(MergeRejection::ChangesetMoved { .. })
    ));
    let merge = harness.merges.get_merge(queued.id()).await.expect("readable");
    assert_eq!(merge.state(), TaskState::Failed);
    let main_after = harness.store.branch_head(harness.main()).await.expect("head");
    let main = harness.store.checkout(harness.main()).await.expect("main");
    assert!(main.data().rows("notes").next().is_none());
    assert_ne!(main_after, main_before, "only the rejection is recorded on main");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_to_record_success_marks_the_merge_failed(harness: Harness) {
    planned_web(&harness, "c1").await;
    let queued = harness.merges.create_merge("c1").await.expect("merge created");
    let faulty = FaultyStore::new(
        (*harness.store).clone(),
        Fault::FailCommits(|message| message.ends_with(" succeeded")),
    );
    let (merges, _) = harness.merges_over(Arc::new(faulty));

    let err = merges
        .run_merge(queued.id(), deadline())
        .await
        .expect_err("recording the outcome fails");

    assert!(matches!(
        err,
        OrchestrationError::Store(VersionedStoreError::Persistence(_))
    ));
    assert!(!err.is_user_error());
    let merge = harness.merges.get_merge(queued.id()).await.expect("readable");
    assert_eq!(merge.state(), TaskState::Failed);
    let owner = harness.changesets.get("c1").await.expect("changeset");
    assert_eq!(owner.state(), ChangesetState::Open);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_to_mark_the_merge_failed_reports_both_errors(harness: Harness) {
    planned_web(&harness, "c1").await;
    let queued = harness.merges.create_merge("c1").await.expect("merge created");
    let faulty = FaultyStore::new(
        (*harness.store).clone(),
        Fault::FailCommits(|message| message.ends_with(" succeeded") || message.ends_with(" failed")),
    );
    let (merges, _) = harness.merges_over(Arc::new(faulty));

    let err = merges
        .run_merge(queued.id(), deadline())
        .await
        .expect_err("recording the outcome fails");

    assert!(matches!(err, OrchestrationError::Compensation { .. }));
    let merge = harness.merges.get_merge(queued.id()).await.expect("readable");
    assert_eq!(merge.state(), TaskState::Started);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn apply_release_failure_keeps_the_merge_successful(harness: Harness) {
    planned_web(&harness, "c1").await;
    let queued = harness.merges.create_merge("c1").await.expect("merge created");
    let faulty = FaultyStore::new(
        (*harness.store).clone(),
        Fault::BreakReadsAfter(|message| message.ends_with(" succeeded")),
    );
    let (merges, mut released) = harness.merges_over(Arc::new(faulty));

    let outcome = merges
        .run_merge(queued.id(), deadline())
        .await
        .expect("merge succeeds despite the release failure");

    assert!(outcome.is_merged());
    assert_eq!(released.try_next(), None);
    let merge = harness.merges.get_merge(queued.id()).await.expect("readable");
    assert_eq!(merge.state(), TaskState::Succeeded);
    let owner = harness.changesets.get("c1").await.expect("changeset");
    assert_eq!(owner.state(), ChangesetState::Merged);
    let applies = harness.applies.list_applies("c1").await.expect("applies");
    assert!(applies.iter().all(|apply| apply.state() == TaskState::Queued));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn superseded_plans_are_removed_before_merging(harness: Harness) {
    let (component, superseded) = planned_web(&harness, "c1").await;
    let current = harness.plan("c1", &component).await;
    let superseded_apply = harness
        .applies
        .list_applies("c1")
        .await
        .expect("applies")
        .into_iter()
        .find(|apply| apply.plan_id() == superseded.id())
        .expect("superseded plan has an apply");

    let (_, outcome) = merge_now(&harness, "c1").await;

    assert!(outcome.is_merged());
    let plans: Vec<_> = harness
        .plans
        .list_plans("c1")
        .await
        .expect("plans")
        .iter()
        .map(TaskRecord::id)
        .collect();
    assert_eq!(plans, vec![current.id()]);
    let applies = harness.applies.list_applies("c1").await.expect("applies");
    assert!(applies.iter().all(|apply| apply.id() != superseded_apply.id()));
    assert!(!harness.plan_store.has_plan(superseded.id()).await.expect("query"));
    assert!(harness.plan_store.has_plan(current.id()).await.expect("query"));
    assert!(
        !harness
            .log_store
            .contains(OperationKind::Plan, superseded.id().into_inner())
            .expect("query")
    );
    assert!(
        harness
            .log_store
            .contains(OperationKind::Plan, current.id().into_inner())
            .expect("query")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conflicting_rows_reject_the_merge(harness: Harness) {
    harness.changesets.create("c1").await.expect("c1");
    for (branch, owner) in [(Harness::branch("c1"), "c1"), (harness.main().clone(), "main")] {
        let mut tx = harness.store.begin(&branch).await.expect("tx");
        tx.data_mut()
            .insert_row("notes", "release", json!({"owner": owner}));
        tx.commit("write release note").await.expect("commit");
    }

    let rejection = rejection_of(&harness, "c1").await;

    assert!(matches!(rejection, MergeRejection::Conflict { paths } if !paths.is_empty()));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_changeset_cannot_be_merged(harness: Harness) {
    harness.changesets.create("c1").await.expect("c1");
    harness.changesets.close("c1").await.expect("closed");

    let err = harness
        .merges
        .create_merge("c1")
        .await
        .expect_err("closed changesets cannot merge");

    assert!(matches!(
        err,
        OrchestrationError::Changeset(ChangesetDomainError::ChangesetNotOpen { .. })
    ));
    assert!(err.is_user_error());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn merged_changeset_rejects_a_second_merge(harness: Harness) {
    planned_web(&harness, "c1").await;
    assert!(merge_now(&harness, "c1").await.1.is_merged());

    let err = harness
        .merges
        .create_merge("c1")
        .await
        .expect_err("merged changesets are read-only");

    assert!(err.is_user_error());
}
