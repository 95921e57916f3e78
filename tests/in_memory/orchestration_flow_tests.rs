//! Plan, merge, apply and removal flows driven through the facade.

use super::helpers::{Deployment, WEB_MODULE, changeset_with_web, deployment, plan_now};
use changeyard::changeset::domain::{ChangesetState, ReviewState};
use changeyard::task::{
    domain::{MergeOutcome, MergeRejection, TaskRecord, TaskState},
    ports::{OperationKind, PlanStore},
};
use changeyard::versioning::{domain::BranchName, ports::VersionedStore};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn planned_changeset_merges_and_applies(deployment: Deployment) {
    let facade = &deployment.facade;
    let component = changeset_with_web(facade, "c1", WEB_MODULE)
        .await
        .expect("changeset with web");
    let plan = plan_now(facade, "c1", &component).await.expect("plan");
    assert_eq!(plan.state(), TaskState::Succeeded);

    let merge = facade.create_merge("c1").await.expect("merge queued");
    let outcome = facade.run_merge(merge.id()).await.expect("merge runs");

    assert!(outcome.is_merged());
    assert_eq!(
        facade.get_merge(merge.id()).await.expect("merge").state(),
        TaskState::Succeeded
    );
    assert_eq!(
        facade.get_changeset("c1").await.expect("changeset").state(),
        ChangesetState::Merged
    );
    let applies = facade.list_applies("c1").await.expect("applies");
    let apply = applies.first().expect("one apply per plan");
    let applied = facade.run_apply(apply.id()).await.expect("apply runs");
    assert_eq!(applied.state(), TaskState::Succeeded);
    let state = facade
        .applies()
        .component_state(component.id())
        .await
        .expect("query")
        .expect("state recorded");
    assert_eq!(state.apply_id(), applied.id());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_plan_rejects_the_merge(deployment: Deployment) {
    let facade = &deployment.facade;
    let component = changeset_with_web(facade, "c1", "modules/unknown")
        .await
        .expect("changeset with web");
    let plan = plan_now(facade, "c1", &component).await.expect("plan");
    assert_eq!(plan.state(), TaskState::Failed);

    let merge = facade.create_merge("c1").await.expect("merge queued");
    let outcome = facade.run_merge(merge.id()).await.expect("merge runs");

    assert!(matches!(
        outcome,
        MergeOutcome::Rejected(MergeRejection::PlanNotSucceeded { .. })
    ));
    let recorded = facade.get_merge(merge.id()).await.expect("merge");
    assert_eq!(recorded.state(), TaskState::Failed);
    assert!(recorded.rejection().is_some());
    let changeset = facade.get_changeset("c1").await.expect("changeset");
    assert_eq!(changeset.review_state(), ReviewState::Rejected);
    assert_eq!(changeset.state(), ChangesetState::Open);
    assert_eq!(facade.list_merges("c1").await.expect("merges"), vec![recorded]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn upstream_change_requires_rebase_and_replan(deployment: Deployment) {
    let facade = &deployment.facade;
    let component = changeset_with_web(facade, "c0", WEB_MODULE)
        .await
        .expect("changeset with web");
    plan_now(facade, "c0", &component).await.expect("plan");
    let first = facade.create_merge("c0").await.expect("merge queued");
    assert!(facade.run_merge(first.id()).await.expect("merge runs").is_merged());

    facade.create_changeset("c1").await.expect("c1");
    facade.create_changeset("c2").await.expect("c2");
    for (changeset, key) in [("c1", "size"), ("c2", "replicas")] {
        let mut variables = changeyard::changeset::domain::Variables::new();
        variables.insert(key.to_owned(), serde_json::json!(5));
        facade
            .update_component(changeset, component.id(), variables)
            .await
            .expect("updated");
        plan_now(facade, changeset, &component).await.expect("plan");
    }
    let c1_merge = facade.create_merge("c1").await.expect("merge queued");
    assert!(facade.run_merge(c1_merge.id()).await.expect("merge runs").is_merged());

    let blocked = facade.create_merge("c2").await.expect("merge queued");
    let outcome = facade.run_merge(blocked.id()).await.expect("merge runs");
    assert!(matches!(
        outcome,
        MergeOutcome::Rejected(MergeRejection::UpstreamChanged { .. })
    ));

    let rebase = facade.create_rebase("c2").await.expect("rebase queued");
    let rebased = facade.run_rebase(rebase.id()).await.expect("rebase runs");
    assert_eq!(rebased.state(), TaskState::Succeeded);
    assert_eq!(facade.list_rebases("c2").await.expect("rebases"), vec![rebased]);
    plan_now(facade, "c2", &component).await.expect("re-plan");
    let retried = facade.create_merge("c2").await.expect("merge queued");
    assert!(facade.run_merge(retried.id()).await.expect("merge runs").is_merged());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_changeset_removes_its_outputs(deployment: Deployment) {
    let facade = &deployment.facade;
    let component = changeset_with_web(facade, "c1", WEB_MODULE)
        .await
        .expect("changeset with web");
    let first = plan_now(facade, "c1", &component).await.expect("plan");
    let second = plan_now(facade, "c1", &component).await.expect("plan");

    let summary = facade.delete_changeset("c1").await.expect("deleted");

    assert_eq!(summary.plans, 2);
    for plan in [first, second] {
        assert!(!deployment.plan_store.has_plan(plan.id()).await.expect("query"));
        assert!(
            !deployment
                .log_store
                .contains(OperationKind::Plan, plan.id().into_inner())
                .expect("query")
        );
    }
    let branch = BranchName::new("c1").expect("valid name");
    assert!(!deployment.store.branch_exists(&branch).await.expect("query"));
    assert!(facade.get_changeset("c1").await.is_err());
}
