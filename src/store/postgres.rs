//! PostgreSQL-backed document store
//!
//! Documents live in one JSONB table keyed by `(namespace, collection, id)`.
//! Conditional updates lock the first matching row with `FOR UPDATE` and
//! re-check the filter on the locked version, so two concurrent callers
//! cannot both observe the pre-update state.

use axum::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Row};

use super::{Condition, DocumentStore, Filter, FindOptions, SortOrder, StoreError, Update};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    namespace: String,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// `WHERE namespace = .. AND collection = ..` plus the filter
    fn push_scope<'a>(&'a self, qb: &mut QueryBuilder<'a, Postgres>, collection: &'a str) {
        qb.push(" WHERE namespace = ")
            .push_bind(self.namespace.as_str())
            .push(" AND collection = ")
            .push_bind(collection);
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for condition in filter.conditions() {
        qb.push(" AND ");
        push_condition(qb, condition);
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, condition: &Condition) {
    match condition {
        Condition::Eq(field, value) => {
            qb.push("COALESCE(body -> ")
                .push_bind(field.clone())
                .push(", 'null'::jsonb) = ")
                .push_bind(Json(value.clone()));
        }
        Condition::Ne(field, value) => {
            qb.push("COALESCE(body -> ")
                .push_bind(field.clone())
                .push(", 'null'::jsonb) <> ")
                .push_bind(Json(value.clone()));
        }
        Condition::Gte(field, bound) => {
            qb.push("(body ->> ")
                .push_bind(field.clone())
                .push(")::double precision >= ")
                .push_bind(*bound);
        }
        Condition::In(field, values) => {
            qb.push("(")
                .push_bind(Json(Value::Array(values.clone())))
                .push(" @> jsonb_build_array(COALESCE(body -> ")
                .push_bind(field.clone())
                .push(", 'null'::jsonb)))");
        }
        Condition::Contains(field, needle) => {
            qb.push("COALESCE(body ->> ")
                .push_bind(field.clone())
                .push(", '') ILIKE ")
                .push_bind(escape_like(needle));
        }
        Condition::Lacks(field, value) => {
            qb.push("NOT (COALESCE(body -> ")
                .push_bind(field.clone())
                .push(", '[]'::jsonb) @> jsonb_build_array(")
                .push_bind(Json(value.clone()))
                .push("))");
        }
        Condition::AnyOf(alternatives) => {
            if alternatives.is_empty() {
                qb.push("FALSE");
                return;
            }
            qb.push("(");
            for (i, alternative) in alternatives.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("(TRUE");
                push_filter(qb, alternative);
                qb.push(")");
            }
            qb.push(")");
        }
    }
}

/// `SET body = <expr>` where every modification wraps the previous expression
fn push_update(qb: &mut QueryBuilder<'_, Postgres>, update: &Update) {
    let operations = usize::from(!update.set.is_empty())
        + usize::from(!update.unset.is_empty())
        + update.inc.len()
        + update.push.len()
        + update.pull.len();

    qb.push(" SET updated_at = NOW(), body = ");
    qb.push("(".repeat(operations));
    qb.push("body");

    if !update.set.is_empty() {
        let object: serde_json::Map<String, Value> = update.set.iter().cloned().collect();
        qb.push(" || ").push_bind(Json(Value::Object(object))).push(")");
    }
    if !update.unset.is_empty() {
        qb.push(" - ").push_bind(update.unset.clone()).push("::text[])");
    }
    for (field, delta) in &update.inc {
        qb.push(" || jsonb_build_object(")
            .push_bind(field.clone())
            .push("::text, COALESCE((body ->> ")
            .push_bind(field.clone())
            .push(")::numeric, 0) + ")
            .push_bind(*delta)
            .push("::numeric))");
    }
    for (field, value) in &update.push {
        qb.push(" || jsonb_build_object(")
            .push_bind(field.clone())
            .push("::text, COALESCE(body -> ")
            .push_bind(field.clone())
            .push(", '[]'::jsonb) || jsonb_build_array(")
            .push_bind(Json(value.clone()))
            .push(")))");
    }
    for (field, value) in &update.pull {
        qb.push(" || jsonb_build_object(")
            .push_bind(field.clone())
            .push("::text, COALESCE((SELECT jsonb_agg(e) FROM jsonb_array_elements(COALESCE(body -> ")
            .push_bind(field.clone())
            .push(", '[]'::jsonb)) AS e WHERE e <> ")
            .push_bind(Json(value.clone()))
            .push("), '[]'::jsonb)))");
    }
}

fn push_options(qb: &mut QueryBuilder<'_, Postgres>, options: &FindOptions) {
    match &options.sort {
        Some((field, order)) => {
            qb.push(" ORDER BY body -> ").push_bind(field.clone());
            qb.push(match order {
                SortOrder::Ascending => " ASC",
                SortOrder::Descending => " DESC",
            });
            qb.push(", created_at ASC");
        }
        None => {
            qb.push(" ORDER BY created_at ASC");
        }
    }
    if let Some(limit) = options.limit {
        qb.push(" LIMIT ").push_bind(limit as i64);
    }
    if options.skip > 0 {
        qb.push(" OFFSET ").push_bind(options.skip as i64);
    }
}

impl PgDocumentStore {
    /// `UPDATE .. WHERE id = (first match, locked) AND filter`
    fn conditional_update<'a>(
        &'a self,
        collection: &'a str,
        filter: &Filter,
        update: &Update,
        returning: bool,
    ) -> QueryBuilder<'a, Postgres> {
        let mut qb = QueryBuilder::new("UPDATE documents");
        push_update(&mut qb, update);
        self.push_scope(&mut qb, collection);
        qb.push(" AND id = (SELECT id FROM documents");
        self.push_scope(&mut qb, collection);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC LIMIT 1 FOR UPDATE)");
        push_filter(&mut qb, filter);
        if returning {
            qb.push(" RETURNING body");
        }
        qb
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::InvalidDocument("document must carry a string id".into()))?
            .to_string();

        sqlx::query(
            r#"
            INSERT INTO documents (namespace, collection, id, body)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&self.namespace)
        .bind(collection)
        .bind(id)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        let mut qb = QueryBuilder::new("SELECT body FROM documents");
        self.push_scope(&mut qb, collection);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC LIMIT 1");

        let row = qb.build().fetch_optional(&self.pool).await?;
        row.map(|r| r.try_get::<Json<Value>, _>("body").map(|j| j.0))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        let mut qb = QueryBuilder::new("SELECT body FROM documents");
        self.push_scope(&mut qb, collection);
        push_filter(&mut qb, filter);
        push_options(&mut qb, options);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|r| r.try_get::<Json<Value>, _>("body").map(|j| j.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) AS n FROM documents");
        self.push_scope(&mut qb, collection);
        push_filter(&mut qb, filter);

        let row = qb.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n.max(0) as u64)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        if update.is_empty() {
            return self.count(collection, filter).await.map(|n| n.min(1));
        }
        let mut qb = self.conditional_update(collection, filter, update, false);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        if update.is_empty() {
            return self.count(collection, filter).await;
        }
        let mut qb = QueryBuilder::new("UPDATE documents");
        push_update(&mut qb, update);
        self.push_scope(&mut qb, collection);
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Value>, StoreError> {
        if update.is_empty() {
            return self.find_one(collection, filter).await;
        }
        let mut qb = self.conditional_update(collection, filter, update, true);
        let row = qb.build().fetch_optional(&self.pool).await?;
        row.map(|r| r.try_get::<Json<Value>, _>("body").map(|j| j.0))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("DELETE FROM documents");
        self.push_scope(&mut qb, collection);
        qb.push(" AND id = (SELECT id FROM documents");
        self.push_scope(&mut qb, collection);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at ASC LIMIT 1)");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("DELETE FROM documents");
        self.push_scope(&mut qb, collection);
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
