//! Changeset and component use cases through the facade.

use super::helpers::{Deployment, WEB_MODULE, changeset_with_web, deployment};
use changeyard::changeset::{
    domain::{ChangesetDomainError, ChangesetState, ReviewState, Variables},
    services::{ChangesetServiceError, CreateComponentRequest},
};
use changeyard::versioning::{domain::BranchName, ports::VersionedStore};
use rstest::rstest;
use serde_json::json;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn created_changesets_are_open_drafts_with_a_branch(deployment: Deployment) {
    let created = deployment
        .facade
        .create_changeset("c1")
        .await
        .expect("created");

    assert_eq!(created.state(), ChangesetState::Open);
    assert_eq!(created.review_state(), ReviewState::Draft);
    let branch = BranchName::new("c1").expect("valid name");
    assert!(deployment.store.branch_exists(&branch).await.expect("query"));
    let listed = deployment.facade.list_changesets().await.expect("list");
    assert_eq!(listed, vec![created]);
}

#[rstest]
#[case::duplicate("c1")]
#[case::main_branch("main")]
#[case::admin_branch("admin")]
#[tokio::test(flavor = "multi_thread")]
async fn unavailable_names_are_refused(deployment: Deployment, #[case] name: &str) {
    deployment
        .facade
        .create_changeset("c1")
        .await
        .expect("first changeset");

    let err = deployment
        .facade
        .create_changeset(name)
        .await
        .expect_err("name unavailable");

    assert!(matches!(
        err,
        ChangesetServiceError::Duplicate(_) | ChangesetServiceError::ReservedName(_)
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn review_state_follows_the_review_workflow(deployment: Deployment) {
    deployment.facade.create_changeset("c1").await.expect("created");

    let pending = deployment
        .facade
        .update_review_state("c1", ReviewState::Pending)
        .await
        .expect("submitted");
    let approved = deployment
        .facade
        .update_review_state("c1", ReviewState::Approved)
        .await
        .expect("approved");

    assert_eq!(pending.review_state(), ReviewState::Pending);
    assert_eq!(approved.review_state(), ReviewState::Approved);
    let err = deployment
        .facade
        .update_review_state("c1", ReviewState::Rejected)
        .await
        .expect_err("approved reviews go back through pending");
    assert!(matches!(
        err,
        ChangesetServiceError::Domain(ChangesetDomainError::InvalidReviewTransition { .. })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_changesets_refuse_component_writes(deployment: Deployment) {
    let component = changeset_with_web(&deployment.facade, "c1", WEB_MODULE)
        .await
        .expect("changeset with web");
    let closed = deployment.facade.close_changeset("c1").await.expect("closed");
    assert_eq!(closed.state(), ChangesetState::Closed);

    let mut variables = Variables::new();
    variables.insert("size".to_owned(), json!(2));
    let update = deployment
        .facade
        .update_component("c1", component.id(), variables)
        .await;
    let create = deployment
        .facade
        .create_component("c1", CreateComponentRequest::new("db", WEB_MODULE))
        .await;

    assert!(matches!(
        update,
        Err(ChangesetServiceError::Domain(ChangesetDomainError::ChangesetNotOpen { .. }))
    ));
    assert!(create.is_err());
    let unchanged = deployment
        .facade
        .get_component("c1", component.id())
        .await
        .expect("still readable");
    assert_eq!(unchanged, component);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn component_updates_merge_variables(deployment: Deployment) {
    let component = changeset_with_web(&deployment.facade, "c1", WEB_MODULE)
        .await
        .expect("changeset with web");
    let mut variables = Variables::new();
    variables.insert("size".to_owned(), serde_json::Value::Null);
    variables.insert("replicas".to_owned(), json!(3));

    let updated = deployment
        .facade
        .update_component("c1", component.id(), variables)
        .await
        .expect("updated");

    assert_eq!(updated.variables().get("size"), None);
    assert_eq!(updated.variables().get("replicas"), Some(&json!(3)));
    let listed = deployment.facade.list_components("c1").await.expect("list");
    assert_eq!(listed, vec![updated]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn component_names_are_unique_per_branch(deployment: Deployment) {
    changeset_with_web(&deployment.facade, "c1", WEB_MODULE)
        .await
        .expect("changeset with web");

    let err = deployment
        .facade
        .create_component("c1", CreateComponentRequest::new("web", WEB_MODULE))
        .await
        .expect_err("duplicate component");

    assert!(matches!(err, ChangesetServiceError::DuplicateComponent(_)));
}
