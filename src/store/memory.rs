//! In-process document store
//!
//! A single write lock spans match and mutation, which makes conditional
//! updates atomic in the same way a row lock does in PostgreSQL.

use axum::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::filter::compare_values;
use super::{DocumentStore, Filter, FindOptions, SortOrder, StoreError, Update, UNIQUE_FIELDS};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn unique_fields(collection: &str) -> impl Iterator<Item = &'static str> + '_ {
    UNIQUE_FIELDS
        .iter()
        .filter(move |(c, _)| *c == collection)
        .map(|(_, field)| *field)
}

/// Check `candidate` against every other document for unique-field clashes
fn check_unique(
    collection: &str,
    documents: &[Value],
    candidate: &Value,
    skip_index: Option<usize>,
) -> Result<(), StoreError> {
    for field in unique_fields(collection) {
        let value = match candidate.get(field) {
            Some(Value::Null) | None => continue,
            Some(value) => value,
        };
        let clash = documents
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip_index)
            .any(|(_, doc)| doc.get(field) == Some(value));
        if clash {
            return Err(StoreError::Duplicate(format!("{}.{}", collection, field)));
        }
    }
    Ok(())
}

/// Apply `update` to the document at `index`, rejecting unique-field clashes
fn apply_at(
    collection: &str,
    documents: &mut [Value],
    index: usize,
    update: &Update,
) -> Result<Value, StoreError> {
    let mut next = documents[index].clone();
    update.apply(&mut next);
    check_unique(collection, documents, &next, Some(index))?;
    documents[index] = next.clone();
    Ok(next)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        if !document.get("id").map(Value::is_string).unwrap_or(false) {
            return Err(StoreError::InvalidDocument(
                "document must carry a string id".to_string(),
            ));
        }

        let mut guard = self.collections.write().await;
        let documents = guard.entry(collection.to_string()).or_default();

        let id = &document["id"];
        if documents.iter().any(|doc| doc.get("id") == Some(id)) {
            return Err(StoreError::Duplicate(format!("{}.id", collection)));
        }
        check_unique(collection, documents, &document, None)?;

        documents.push(document);
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let guard = self.collections.read().await;
        let mut matched: Vec<Value> = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default();

        if let Some((field, order)) = &options.sort {
            matched.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(field).unwrap_or(&Value::Null),
                    b.get(field).unwrap_or(&Value::Null),
                );
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        let skipped = matched.into_iter().skip(options.skip as usize);
        Ok(match options.limit {
            Some(limit) => skipped.take(limit as usize).collect(),
            None => skipped.collect(),
        })
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
            .unwrap_or(0))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        Ok(self
            .find_one_and_update(collection, filter, update)
            .await?
            .map(|_| 1)
            .unwrap_or(0))
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(documents) = guard.get_mut(collection) else {
            return Ok(0);
        };

        let indexes: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(i, _)| i)
            .collect();

        for &index in &indexes {
            apply_at(collection, documents, index, update)?;
        }
        Ok(indexes.len() as u64)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Value>, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(documents) = guard.get_mut(collection) else {
            return Ok(None);
        };

        match documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => apply_at(collection, documents, index, update).map(Some),
            None => Ok(None),
        }
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(documents) = guard.get_mut(collection) else {
            return Ok(0);
        };

        match documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut guard = self.collections.write().await;
        let Some(documents) = guard.get_mut(collection) else {
            return Ok(0);
        };

        let before = documents.len();
        documents.retain(|doc| !filter.matches(doc));
        Ok((before - documents.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
