//! Tests for typed record access and the three-way merge.

use crate::versioning::domain::{BranchName, Dataset, Record, RecordError, VersioningDomainError};
use rstest::rstest;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Widget {
    id: String,
    size: u32,
}

impl Record for Widget {
    const TABLE: &'static str = "widgets";

    fn key(&self) -> String {
        self.id.clone()
    }
}

fn widget(id: &str, size: u32) -> Widget {
    Widget {
        id: id.to_owned(),
        size,
    }
}

fn dataset_with(rows: &[(&str, serde_json::Value)]) -> Dataset {
    let mut dataset = Dataset::new();
    for (key, value) in rows {
        dataset.insert_row("components", *key, value.clone());
    }
    dataset
}

#[rstest]
fn insert_rejects_duplicate_keys() {
    let mut dataset = Dataset::new();
    dataset.insert(&widget("a", 1)).expect("first insert succeeds");

    let result = dataset.insert(&widget("a", 2));

    assert!(matches!(
        result,
        Err(RecordError::Duplicate { table: "widgets", .. })
    ));
}

#[rstest]
fn update_requires_existing_row() {
    let mut dataset = Dataset::new();

    let result = dataset.update(&widget("missing", 1));

    assert!(matches!(result, Err(RecordError::NotFound { .. })));
}

#[rstest]
fn find_reports_codec_errors_for_malformed_rows() {
    let mut dataset = Dataset::new();
    dataset.insert_row("widgets", "a", json!({"id": "a", "size": "large"}));

    let result = dataset.find::<Widget>("a");

    assert!(matches!(result, Err(RecordError::Codec { .. })));
}

#[rstest]
fn deleting_the_last_row_keeps_datasets_comparable() {
    let mut dataset = Dataset::new();
    dataset.insert(&widget("a", 1)).expect("insert succeeds");

    assert!(dataset.delete::<Widget>("a"));
    assert_eq!(dataset, Dataset::new());
    assert!(dataset.is_empty());
}

#[rstest]
fn merge_combines_changes_to_different_fields_of_one_row() {
    let base = dataset_with(&[("web", json!({"variables": {"size": "small", "replicas": 1}}))]);
    let ours = dataset_with(&[("web", json!({"variables": {"size": "large", "replicas": 1}}))]);
    let theirs = dataset_with(&[("web", json!({"variables": {"size": "small", "replicas": 3}}))]);

    let merged = Dataset::three_way_merge(&base, &ours, &theirs).expect("merge is clean");

    assert_eq!(
        merged.row("components", "web"),
        Some(&json!({"variables": {"size": "large", "replicas": 3}}))
    );
}

#[rstest]
fn merge_reports_conflicting_leaf_paths() {
    let base = dataset_with(&[("web", json!({"variables": {"size": "small"}}))]);
    let ours = dataset_with(&[("web", json!({"variables": {"size": "large"}}))]);
    let theirs = dataset_with(&[("web", json!({"variables": {"size": "medium"}}))]);

    let conflicts = Dataset::three_way_merge(&base, &ours, &theirs).expect_err("merge conflicts");

    assert_eq!(conflicts.paths(), ["components/web.variables.size".to_owned()]);
}

#[rstest]
fn merge_treats_delete_against_modify_as_conflict() {
    let base = dataset_with(&[("web", json!({"size": 1}))]);
    let ours = Dataset::new();
    let theirs = dataset_with(&[("web", json!({"size": 2}))]);

    let result = Dataset::three_way_merge(&base, &ours, &theirs);

    assert!(result.is_err());
}

#[rstest]
fn merge_keeps_rows_added_on_either_side() {
    let base = Dataset::new();
    let ours = dataset_with(&[("api", json!({"size": 1}))]);
    let theirs = dataset_with(&[("web", json!({"size": 2}))]);

    let merged = Dataset::three_way_merge(&base, &ours, &theirs).expect("merge is clean");

    assert_eq!(merged.len("components"), 2);
}

#[rstest]
#[case("main", true)]
#[case("feature/login-form", true)]
#[case("release_1.2", true)]
#[case("", false)]
#[case("-leading", false)]
#[case("/leading", false)]
#[case("trailing/", false)]
#[case("double..dot", false)]
#[case("has space", false)]
fn branch_name_validation(#[case] value: &str, #[case] valid: bool) {
    assert_eq!(BranchName::new(value).is_ok(), valid);
}

#[rstest]
fn branch_name_rejects_empty_input_with_specific_error() {
    assert_eq!(
        BranchName::new("   "),
        Err(VersioningDomainError::EmptyBranchName)
    );
}
