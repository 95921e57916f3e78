//! Flows driven by the background workers instead of direct runs.

use super::helpers::{Deployment, WEB_MODULE, changeset_with_web, deploy, deployment, eventually};
use changeyard::config::OrchestratorConfig;
use changeyard::task::{
    domain::{TaskRecord, TaskState},
    services::OrchestrationError,
};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn workers_plan_merge_and_apply_a_changeset(mut deployment: Deployment) {
    let shutdown = CancellationToken::new();
    let handles = deployment.facade.start(&shutdown).expect("workers start");
    let facade = &deployment.facade;
    let component = changeset_with_web(facade, "c1", WEB_MODULE)
        .await
        .expect("changeset with web");

    let plan = facade.create_plan("c1", component.id()).await.expect("plan queued");
    let plan_id = plan.id();
    eventually("plan to succeed", move || async move {
        let current = facade.get_plan("c1", plan_id).await?;
        Ok::<bool, eyre::Report>(current.state() == TaskState::Succeeded)
    })
    .await
    .expect("plan succeeded");

    let merge = facade.create_merge("c1").await.expect("merge queued");
    let merge_id = merge.id();
    eventually("merge to succeed", move || async move {
        let current = facade.get_merge(merge_id).await?;
        Ok::<bool, eyre::Report>(current.state() == TaskState::Succeeded)
    })
    .await
    .expect("merge succeeded");

    eventually("apply to succeed", move || async move {
        let applies = facade.list_applies("c1").await?;
        Ok::<bool, eyre::Report>(!applies.is_empty()
            && applies
                .iter()
                .all(|apply| apply.state() == TaskState::Succeeded))
    })
    .await
    .expect("apply succeeded");

    shutdown.cancel();
    for handle in handles {
        handle.await.expect("worker exits cleanly");
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn startup_sweep_runs_tasks_the_queue_dropped() {
    let config = OrchestratorConfig::default().with_queue_capacity(1);
    let mut deployment = deploy(&config).expect("deployment");
    let component = changeset_with_web(&deployment.facade, "c1", WEB_MODULE)
        .await
        .expect("changeset with web");
    for _ in 0..3 {
        deployment
            .facade
            .create_plan("c1", component.id())
            .await
            .expect("plan queued");
    }

    let shutdown = CancellationToken::new();
    let handles = deployment.facade.start(&shutdown).expect("workers start");
    let facade = &deployment.facade;
    eventually("every plan to succeed", move || async move {
        let listed = facade.list_plans("c1").await?;
        Ok::<bool, eyre::Report>(listed.len() == 3
            && listed
                .iter()
                .all(|plan| plan.state() == TaskState::Succeeded))
    })
    .await
    .expect("plans succeeded");

    shutdown.cancel();
    for handle in handles {
        handle.await.expect("worker exits cleanly");
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn workers_start_only_once(mut deployment: Deployment) {
    let shutdown = CancellationToken::new();
    let handles = deployment.facade.start(&shutdown).expect("workers start");
    assert_eq!(handles.len(), 4);

    let second = deployment.facade.start(&shutdown);

    assert!(matches!(second, Err(OrchestrationError::AlreadyStarted)));
    shutdown.cancel();
    for handle in handles {
        handle.await.expect("worker exits cleanly");
    }
}
