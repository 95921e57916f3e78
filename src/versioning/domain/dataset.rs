//! Table-of-rows dataset and three-way structural merge.

use super::{MergeConflicts, RecordError, RecordResult};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A typed record stored as one row of a dataset table.
pub trait Record: Serialize + DeserializeOwned {
    /// Table the record is stored in.
    const TABLE: &'static str;

    /// Returns the row key of this record.
    fn key(&self) -> String;
}

/// All tables visible at one commit.
///
/// Empty tables are dropped so two datasets holding the same rows always
/// compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    tables: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Dataset {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw row stored under `key`, if any.
    #[must_use]
    pub fn row(&self, table: &str, key: &str) -> Option<&Value> {
        self.tables.get(table).and_then(|rows| rows.get(key))
    }

    /// Iterates over the raw rows of a table in key order.
    pub fn rows(&self, table: &str) -> impl Iterator<Item = (&str, &Value)> {
        self.tables
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.iter().map(|(key, value)| (key.as_str(), value)))
    }

    /// Stores a raw row, returning the previous value.
    pub fn insert_row(
        &mut self,
        table: &str,
        key: impl Into<String>,
        value: Value,
    ) -> Option<Value> {
        self.tables
            .entry(table.to_owned())
            .or_default()
            .insert(key.into(), value)
    }

    /// Removes a raw row, returning its value.
    pub fn remove_row(&mut self, table: &str, key: &str) -> Option<Value> {
        let rows = self.tables.get_mut(table)?;
        let removed = rows.remove(key);
        if rows.is_empty() {
            self.tables.remove(table);
        }
        removed
    }

    /// Returns the number of rows in a table.
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    /// Returns `true` when no table holds any row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Loads the record stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Codec`] when the row does not decode.
    pub fn find<R: Record>(&self, key: &str) -> RecordResult<Option<R>> {
        self.row(R::TABLE, key)
            .map(|value| decode::<R>(key, value))
            .transpose()
    }

    /// Loads every record of a table in key order.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Codec`] when any row does not decode.
    pub fn all<R: Record>(&self) -> RecordResult<Vec<R>> {
        self.rows(R::TABLE)
            .map(|(key, value)| decode::<R>(key, value))
            .collect()
    }

    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Duplicate`] when the key is taken, or
    /// [`RecordError::Codec`] when the record does not encode.
    pub fn insert<R: Record>(&mut self, record: &R) -> RecordResult<()> {
        let key = record.key();
        if self.row(R::TABLE, &key).is_some() {
            return Err(RecordError::Duplicate {
                table: R::TABLE,
                key,
            });
        }
        self.upsert(record)
    }

    /// Replaces an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] when no row exists for the key, or
    /// [`RecordError::Codec`] when the record does not encode.
    pub fn update<R: Record>(&mut self, record: &R) -> RecordResult<()> {
        let key = record.key();
        if self.row(R::TABLE, &key).is_none() {
            return Err(RecordError::NotFound {
                table: R::TABLE,
                key,
            });
        }
        self.upsert(record)
    }

    /// Stores a record, replacing any previous row with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Codec`] when the record does not encode.
    pub fn upsert<R: Record>(&mut self, record: &R) -> RecordResult<()> {
        let key = record.key();
        let value = serde_json::to_value(record).map_err(|err| RecordError::Codec {
            table: R::TABLE,
            key: key.clone(),
            message: err.to_string(),
        })?;
        self.insert_row(R::TABLE, key, value);
        Ok(())
    }

    /// Deletes the record stored under `key`.
    ///
    /// Returns `true` when a row was removed.
    pub fn delete<R: Record>(&mut self, key: &str) -> bool {
        self.remove_row(R::TABLE, key).is_some()
    }

    /// Merges `theirs` into `ours` relative to their common ancestor `base`.
    ///
    /// Rows and object fields changed on one side only are taken from that
    /// side. A value changed on both sides to different results is a
    /// conflict.
    ///
    /// # Errors
    ///
    /// Returns [`MergeConflicts`] listing every conflicting path.
    pub fn three_way_merge(base: &Self, ours: &Self, theirs: &Self) -> Result<Self, MergeConflicts> {
        let mut conflicts = Vec::new();
        let mut merged = Self::new();

        let table_names: BTreeSet<&String> = base
            .tables
            .keys()
            .chain(ours.tables.keys())
            .chain(theirs.tables.keys())
            .collect();

        for table in table_names {
            let base_rows = base.tables.get(table);
            let our_rows = ours.tables.get(table);
            let their_rows = theirs.tables.get(table);
            let keys: BTreeSet<&String> = [base_rows, our_rows, their_rows]
                .into_iter()
                .flatten()
                .flat_map(BTreeMap::keys)
                .collect();

            for key in keys {
                let path = format!("{table}/{key}");
                let value = merge_value(
                    &path,
                    base_rows.and_then(|rows| rows.get(key)),
                    our_rows.and_then(|rows| rows.get(key)),
                    their_rows.and_then(|rows| rows.get(key)),
                    &mut conflicts,
                );
                if let Some(row) = value {
                    merged.insert_row(table, key.clone(), row);
                }
            }
        }

        if conflicts.is_empty() {
            Ok(merged)
        } else {
            Err(MergeConflicts(conflicts))
        }
    }
}

fn decode<R: Record>(key: &str, value: &Value) -> RecordResult<R> {
    R::deserialize(value).map_err(|err| RecordError::Codec {
        table: R::TABLE,
        key: key.to_owned(),
        message: err.to_string(),
    })
}

fn merge_value(
    path: &str,
    base: Option<&Value>,
    ours: Option<&Value>,
    theirs: Option<&Value>,
    conflicts: &mut Vec<String>,
) -> Option<Value> {
    if ours == theirs || base == theirs {
        return ours.cloned();
    }
    if base == ours {
        return theirs.cloned();
    }

    if let (Some(Value::Object(base_fields)), Some(Value::Object(our_fields)), Some(Value::Object(their_fields))) =
        (base, ours, theirs)
    {
        return Some(Value::Object(merge_fields(
            path,
            base_fields,
            our_fields,
            their_fields,
            conflicts,
        )));
    }

    conflicts.push(path.to_owned());
    ours.cloned()
}

fn merge_fields(
    path: &str,
    base: &Map<String, Value>,
    ours: &Map<String, Value>,
    theirs: &Map<String, Value>,
    conflicts: &mut Vec<String>,
) -> Map<String, Value> {
    let fields: BTreeSet<&String> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();
    let mut merged = Map::new();
    for field in fields {
        let child_path = format!("{path}.{field}");
        if let Some(value) = merge_value(
            &child_path,
            base.get(field),
            ours.get(field),
            theirs.get(field),
            conflicts,
        ) {
            merged.insert(field.clone(), value);
        }
    }
    merged
}
