//! In-memory document engine
//!
//! [`MemoryDatabase`] holds named collections in a `DashMap`. Each collection
//! keeps its documents in insertion order behind a tokio `RwLock`; every
//! write validates and mutates while holding the write lock, so a rejected
//! write leaves nothing behind. Locks are released before related documents
//! are resolved, so expansions may read any collection, including their own.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::RwLock;

use super::document::{get_path, set_path, Document, ID_FIELD};
use super::error::{RepositoryError, RepositoryOperation};
use super::expansion::Expansion;
use super::schema::{ImportMode, Schema, VERSION_FIELD};
use super::traits::{DocumentStore, RepositoryResult};
use crate::ids::DocumentId;
use crate::query::{Filter, Projection, QueryPlan};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug)]
struct Slot {
    schema: Arc<Schema>,
    docs: RwLock<Vec<Document>>,
}

/// A set of named collections shared across request tasks.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    collections: Arc<DashMap<String, Arc<Slot>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the collection described by `schema`. Registering a name that
    /// already exists returns the existing collection.
    pub fn register(&self, schema: Schema) -> MemoryCollection {
        let slot = self
            .collections
            .entry(schema.name().to_string())
            .or_insert_with(|| {
                Arc::new(Slot {
                    schema: Arc::new(schema),
                    docs: RwLock::new(Vec::new()),
                })
            })
            .clone();
        MemoryCollection {
            slot,
            db: self.clone(),
        }
    }

    /// A handle to a registered collection.
    pub fn collection(&self, name: &str) -> Option<MemoryCollection> {
        let slot = self.collections.get(name)?.clone();
        Some(MemoryCollection {
            slot,
            db: self.clone(),
        })
    }

    /// Registered collection names, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Remove every document from every collection.
    pub async fn clear(&self) {
        let slots: Vec<Arc<Slot>> = self.collections.iter().map(|entry| entry.value().clone()).collect();
        for slot in slots {
            slot.docs.write().await.clear();
        }
    }

    fn resolve<'a>(&'a self, doc: &'a mut Document, expansion: &'a Expansion) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let target = self.collection(expansion.collection()).ok_or_else(|| {
                RepositoryError::unknown_collection(expansion.collection())
                    .with_operation(RepositoryOperation::Expand)
            })?;

            match expansion {
                Expansion::Reference {
                    path,
                    projection,
                    filter,
                    nested,
                    ..
                } => {
                    let Some(current) = get_path(doc, path).cloned() else {
                        return Ok(());
                    };
                    let related = |id: &str| QueryPlan {
                        filter: Filter::by_id(id).and(filter.clone()),
                        projection: projection.clone(),
                        limit: Some(1),
                        expand: nested.clone(),
                        ..QueryPlan::default()
                    };
                    let resolved = match current {
                        Value::Array(ids) => {
                            let mut found = Vec::with_capacity(ids.len());
                            for id in ids.iter().filter_map(Value::as_str) {
                                found.extend(target.query(&related(id)).await?.into_iter().map(Value::Object));
                            }
                            Value::Array(found)
                        }
                        Value::String(id) => target
                            .query(&related(&id))
                            .await?
                            .into_iter()
                            .next()
                            .map_or(Value::Null, Value::Object),
                        other => other,
                    };
                    set_path(doc, path, resolved);
                }
                Expansion::Virtual {
                    name,
                    foreign_field,
                    local_field,
                    projection,
                    filter,
                    nested,
                    ..
                } => {
                    let related = match get_path(doc, local_field).cloned() {
                        Some(local) => {
                            let plan = QueryPlan {
                                filter: Filter::eq(foreign_field.clone(), local).and(filter.clone()),
                                projection: projection.clone(),
                                expand: nested.clone(),
                                ..QueryPlan::default()
                            };
                            target.query(&plan).await?
                        }
                        None => Vec::new(),
                    };
                    doc.insert(name.clone(), Value::Array(related.into_iter().map(Value::Object).collect()));
                }
            }
            Ok(())
        })
    }
}

/// One collection of a [`MemoryDatabase`].
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    slot: Arc<Slot>,
    db: MemoryDatabase,
}

impl MemoryCollection {
    pub fn schema(&self) -> &Schema {
        &self.slot.schema
    }

    /// The database this collection belongs to.
    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.slot.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Load seed documents, all or nothing. Documents keep their `_id`.
    pub async fn import(&self, docs: Vec<Document>, mode: ImportMode) -> RepositoryResult<usize> {
        let schema = &self.slot.schema;
        let mut stored = self.slot.docs.write().await;
        let mut staged: Vec<Document> = Vec::with_capacity(docs.len());

        for raw in docs {
            let mut doc = schema.prepare_import(raw, mode)?;
            if !doc.contains_key(ID_FIELD) {
                doc.insert(ID_FIELD.to_string(), Value::String(DocumentId::generate(schema.prefix()).into()));
            }
            doc.entry(VERSION_FIELD.to_string()).or_insert(Value::from(0));

            let existing: Vec<&Document> = stored.iter().chain(staged.iter()).collect();
            check_unique(schema, &existing, &doc, true)
                .map_err(|err| err.with_operation(RepositoryOperation::Import))?;
            staged.push(doc);
        }

        let count = staged.len();
        stored.extend(staged);
        Ok(count)
    }

    fn query<'a>(&'a self, plan: &'a QueryPlan) -> BoxFuture<'a, RepositoryResult<Vec<Document>>> {
        Box::pin(async move {
            let window: Vec<Document> = {
                let docs = self.slot.docs.read().await;
                let mut matched: Vec<&Document> = docs.iter().filter(|doc| plan.filter.matches(doc)).collect();
                matched.sort_by(|a, b| plan.sort.compare(a, b));
                let skip = usize::try_from(plan.skip).unwrap_or(usize::MAX);
                let limit = plan
                    .limit
                    .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
                matched.into_iter().skip(skip).take(limit).cloned().collect()
            };

            let mut out = Vec::with_capacity(window.len());
            for doc in window {
                out.push(self.present(doc, &plan.projection, &plan.expand).await?);
            }
            Ok(out)
        })
    }

    /// Shape a stored document for output: projection, hidden fields,
    /// virtuals, then expansions.
    async fn present(&self, doc: Document, projection: &Projection, expand: &[Expansion]) -> RepositoryResult<Document> {
        let schema = &self.slot.schema;
        let mut out = projection.apply(doc);
        for hidden in schema.hidden_fields() {
            if !projection.explicitly_includes(hidden) {
                out.remove(hidden);
            }
        }
        schema.apply_virtuals(&mut out);
        for expansion in expand {
            self.db.resolve(&mut out, expansion).await?;
        }
        Ok(out)
    }
}

impl DocumentStore for MemoryCollection {
    fn collection(&self) -> &str {
        self.slot.schema.name()
    }

    async fn find_many(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Document>> {
        self.query(plan).await
    }

    async fn count_matching(&self, filter: &Filter) -> RepositoryResult<u64> {
        let docs = self.slot.docs.read().await;
        Ok(docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn find_one(&self, filter: &Filter, expand: &[Expansion]) -> RepositoryResult<Option<Document>> {
        let plan = QueryPlan {
            filter: filter.clone(),
            limit: Some(1),
            expand: expand.to_vec(),
            ..QueryPlan::default()
        };
        Ok(self.query(&plan).await?.into_iter().next())
    }

    async fn create(&self, body: Document) -> RepositoryResult<Document> {
        let schema = &self.slot.schema;
        let created = {
            let mut docs = self.slot.docs.write().await;
            let mut doc = schema.prepare_new(body)?;
            doc.insert(ID_FIELD.to_string(), Value::String(DocumentId::generate(schema.prefix()).into()));
            doc.insert(VERSION_FIELD.to_string(), Value::from(0));

            let existing: Vec<&Document> = docs.iter().collect();
            check_unique(schema, &existing, &doc, false)?;
            docs.push(doc.clone());
            doc
        };
        self.present(created, &Projection::All, &[]).await
    }

    async fn update_one(&self, filter: &Filter, patch: Document) -> RepositoryResult<Option<Document>> {
        let schema = &self.slot.schema;
        let updated = {
            let mut docs = self.slot.docs.write().await;
            let Some(index) = docs.iter().position(|doc| filter.matches(doc)) else {
                return Ok(None);
            };
            let updated = schema.prepare_update(&docs[index], patch)?;

            let others: Vec<&Document> = docs
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, doc)| doc)
                .collect();
            check_unique(schema, &others, &updated, false)
                .map_err(|err| err.with_operation(RepositoryOperation::Update))?;
            docs[index] = updated.clone();
            updated
        };
        self.present(updated, &Projection::All, &[]).await.map(Some)
    }

    async fn delete_one(&self, filter: &Filter) -> RepositoryResult<Option<Document>> {
        let removed = {
            let mut docs = self.slot.docs.write().await;
            let Some(index) = docs.iter().position(|doc| filter.matches(doc)) else {
                return Ok(None);
            };
            docs.remove(index)
        };
        self.present(removed, &Projection::All, &[]).await.map(Some)
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn check_unique(schema: &Schema, existing: &[&Document], candidate: &Document, check_id: bool) -> RepositoryResult<()> {
    let taken = |field: &str, value: &Value| existing.iter().any(|doc| doc.get(field) == Some(value));

    if check_id {
        if let Some(id) = candidate.get(ID_FIELD) {
            if taken(ID_FIELD, id) {
                return Err(RepositoryError::duplicate_value(schema.name(), display(id)));
            }
        }
    }

    for field in schema.unique_fields() {
        if let Some(value) = candidate.get(field).filter(|value| !value.is_null()) {
            if taken(field, value) {
                return Err(RepositoryError::duplicate_value(schema.name(), display(value)));
            }
        }
    }

    for group in schema.unique_groups() {
        let Some(values) = group
            .fields
            .iter()
            .map(|field| candidate.get(field))
            .collect::<Option<Vec<&Value>>>()
        else {
            continue;
        };
        let clash = existing.iter().any(|doc| {
            group
                .fields
                .iter()
                .zip(&values)
                .all(|(field, value)| doc.get(field) == Some(*value))
        });
        if clash {
            return Err(RepositoryError::already_exists(schema.name(), group.message.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SortOrder;
    use crate::repository::{FieldRule, RepositoryErrorKind};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (MemoryDatabase, MemoryCollection, MemoryCollection, MemoryCollection) {
        let db = MemoryDatabase::new();
        let users = db.register(
            Schema::new("users", "user")
                .field(FieldRule::string("name").required("Please tell us your name"))
                .field(FieldRule::string("email").unique().lowercase())
                .field(FieldRule::string("password").hidden())
                .field(FieldRule::boolean("active").default_value(true).hidden()),
        );
        let tours = db.register(
            Schema::new("tours", "tour")
                .field(FieldRule::string("name").required("A tour must have a name").unique())
                .field(FieldRule::number("price"))
                .field(FieldRule::number("duration"))
                .field(FieldRule::array("guides", crate::repository::FieldType::Reference))
                .virtual_field("durationWeeks", |doc| {
                    let days = doc.get("duration")?.as_f64()?;
                    Some(json!(days / 7.0))
                }),
        );
        let reviews = db.register(
            Schema::new("reviews", "review")
                .field(FieldRule::string("review"))
                .field(FieldRule::reference("tour"))
                .field(FieldRule::reference("user"))
                .unique_together(["tour", "user"], "User has already posted a review on this tour"),
        );
        (db, users, tours, reviews)
    }

    #[tokio::test]
    async fn test_create_assigns_identity() {
        let (_db, _users, tours, _reviews) = setup();
        let created = tours
            .create(doc(json!({ "_id": "mine", "name": "The Forest Hiker", "price": 397, "duration": 14 })))
            .await
            .unwrap();

        let id = created["_id"].as_str().unwrap();
        assert!(id.starts_with("tour_"));
        assert_eq!(created["__v"], json!(0));
        assert_eq!(created["durationWeeks"], json!(2.0));
        assert_eq!(tours.find_by_id(id, &[]).await.unwrap().unwrap()["name"], json!("The Forest Hiker"));
    }

    #[tokio::test]
    async fn test_rejected_writes_leave_no_state() {
        let (_db, _users, tours, _reviews) = setup();
        tours.create(doc(json!({ "name": "The Sea Explorer" }))).await.unwrap();

        let err = tours.create(doc(json!({ "name": "The Sea Explorer" }))).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(err.message, "Duplicate field value : 'The Sea Explorer'. Please use another value.");

        let err = tours.create(doc(json!({ "price": 10 }))).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        assert_eq!(tours.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_absent_are_none() {
        let (_db, _users, tours, _reviews) = setup();
        assert!(tours.update_by_id("tour_missing", Document::new()).await.unwrap().is_none());
        assert!(tours.delete_by_id("tour_missing").await.unwrap().is_none());

        let created = tours.create(doc(json!({ "name": "The Wine Taster", "price": 1997 }))).await.unwrap();
        let id = created["_id"].as_str().unwrap();

        let updated = tours
            .update_by_id(id, doc(json!({ "price": "1500", "_id": "tour_other" })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["_id"], json!(id));
        assert_eq!(updated["price"], json!(1500));
        assert_eq!(updated["name"], json!("The Wine Taster"));

        assert!(tours.delete_by_id(id).await.unwrap().is_some());
        assert!(tours.find_by_id(id, &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hidden_fields_need_explicit_projection() {
        let (_db, users, _tours, _reviews) = setup();
        let created = users
            .create(doc(json!({ "name": "Ada", "email": "ADA@example.com", "password": "secret1" })))
            .await
            .unwrap();
        assert!(!created.contains_key("password"));
        assert!(!created.contains_key("active"));
        assert_eq!(created["email"], json!("ada@example.com"));

        let plan = QueryPlan {
            projection: Projection::include(["active"]),
            ..QueryPlan::default()
        };
        let found = users.find_many(&plan).await.unwrap();
        assert_eq!(found[0]["active"], json!(true));
    }

    #[tokio::test]
    async fn test_compound_uniqueness() {
        let (_db, _users, _tours, reviews) = setup();
        let body = json!({ "review": "Great", "tour": "tour_1", "user": "user_1" });
        reviews.create(doc(body.clone())).await.unwrap();
        let err = reviews.create(doc(body)).await.unwrap_err();
        assert_eq!(err.message, "User has already posted a review on this tour");

        reviews
            .create(doc(json!({ "review": "Again", "tour": "tour_2", "user": "user_1" })))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reference_and_virtual_expansions() {
        let (_db, users, tours, reviews) = setup();
        let guide = users
            .create(doc(json!({ "name": "Lourdes", "email": "l@example.com" })))
            .await
            .unwrap();
        let retired = users
            .create(doc(json!({ "name": "Gone", "email": "g@example.com", "active": false })))
            .await
            .unwrap();
        let tour = tours
            .create(doc(json!({ "name": "The Northern Lights", "guides": [guide["_id"], retired["_id"]] })))
            .await
            .unwrap();
        let tour_id = tour["_id"].as_str().unwrap();
        reviews
            .create(doc(json!({ "review": "Loved it", "tour": tour_id, "user": guide["_id"] })))
            .await
            .unwrap();

        let expand = vec![
            Expansion::reference("guides", "users")
                .select(Projection::exclude(["__v"]))
                .only(Filter::ne("active", false)),
            Expansion::virtual_field("reviews", "reviews", "tour")
                .then(Expansion::reference("user", "users").select(Projection::include(["name"]))),
        ];
        let found = tours.find_by_id(tour_id, &expand).await.unwrap().unwrap();

        let guides = found["guides"].as_array().unwrap();
        assert_eq!(guides.len(), 1);
        assert_eq!(guides[0]["name"], json!("Lourdes"));
        assert!(guides[0].get("__v").is_none());

        let reviews = found["reviews"].as_array().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0]["user"], json!({ "_id": guide["_id"], "name": "Lourdes" }));
    }

    #[tokio::test]
    async fn test_find_many_sorts_windows_and_counts() {
        let (_db, _users, tours, _reviews) = setup();
        for (name, price) in [("A", 300), ("B", 100), ("C", 200), ("D", 100)] {
            tours.create(doc(json!({ "name": name, "price": price }))).await.unwrap();
        }
        let plan = QueryPlan {
            filter: Filter::from_map(doc(json!({ "price": { "$lte": "200" } }))),
            sort: SortOrder::parse("price,-name"),
            projection: Projection::include(["name"]),
            skip: 1,
            limit: Some(2),
            expand: Vec::new(),
        };
        let names: Vec<Value> = tours
            .find_many(&plan)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("B"), json!("C")]);
        assert_eq!(tours.count_matching(&plan.filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let (db, _users, tours, _reviews) = setup();
        let err = tours
            .import(
                vec![
                    doc(json!({ "_id": "tour_a", "name": "One" })),
                    doc(json!({ "_id": "tour_b", "name": "One" })),
                ],
                ImportMode::Validate,
            )
            .await
            .unwrap_err();
        assert_eq!(err.operation, RepositoryOperation::Import);
        assert!(tours.is_empty().await);

        let count = tours
            .import(vec![doc(json!({ "_id": "tour_a", "name": "One" }))], ImportMode::Validate)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(tours.find_by_id("tour_a", &[]).await.unwrap().unwrap()["__v"], json!(0));

        assert_eq!(db.collection_names(), vec!["reviews", "tours", "users"]);
        db.clear().await;
        assert!(tours.is_empty().await);
    }
}
