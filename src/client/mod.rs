//! Document client
//!
//! A [`Client`] wraps exactly one driver session and exposes blocking CRUD,
//! query and aggregation calls. Every call resolves the collection it needs,
//! issues a single driver operation and waits for the answer. Failures are
//! logged once here and returned unchanged.
//!
//! Each client owns the tokio runtime it blocks on, so it must not be used
//! from inside another async runtime.

mod connection;

use crate::config::ClientConfig;
use crate::document::{Document, Value};
use crate::error::{Error, Result};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc},
    options::ReturnDocument,
    Collection,
};
use std::future::IntoFuture;
use std::sync::{PoisonError, RwLock};
use tokio::runtime::Runtime;
use tracing::{debug, error, info};

/// Filter/update pair for upserts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertModel {
    pub query: Document,
    pub update: Document,
}

impl UpsertModel {
    pub fn new(query: Document, update: Document) -> Self {
        Self { query, update }
    }

    /// Read a `{ query, update }` descriptor
    pub fn from_document(mut doc: Document) -> Result<Self> {
        let mut take = |key: &str| match doc.remove(key) {
            Some(Value::Document(d)) => Ok(d),
            Some(other) => Err(Error::InvalidArgument(format!(
                "upsert descriptor field '{}' must be an object, got {}",
                key,
                other.type_name()
            ))),
            None => Err(Error::InvalidArgument(format!(
                "upsert descriptor is missing '{}'",
                key
            ))),
        };
        let query = take("query")?;
        let update = take("update")?;
        Ok(Self { query, update })
    }
}

/// Blocking client bound to one session
pub struct Client {
    runtime: Runtime,
    session: RwLock<Option<mongodb::Client>>,
}

impl Client {
    /// Connect to `uri`, blocking until the session is usable or fails
    pub fn connect(uri: &str, config: &ClientConfig) -> Result<Self> {
        let runtime = connection::build_runtime(config)?;
        let client = runtime.block_on(connection::open(uri, config))?;

        Ok(Self {
            runtime,
            session: RwLock::new(Some(client)),
        })
    }

    /// Whether `disconnect` has not been called yet
    pub fn is_connected(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn collection(&self, database: &str, collection: &str) -> Result<Collection<bson::Document>> {
        let session = self.session.read().unwrap_or_else(PoisonError::into_inner);
        let client = session.as_ref().ok_or(Error::Disconnected)?;
        Ok(client.database(database).collection(collection))
    }

    fn block_on<T>(
        &self,
        message: &'static str,
        op: impl IntoFuture<Output = mongodb::error::Result<T>>,
    ) -> Result<T> {
        self.runtime.block_on(op.into_future()).map_err(|err| {
            error!(error = %err, "{}", message);
            Error::Store(err)
        })
    }

    pub fn insert(&self, database: &str, collection: &str, document: Document) -> Result<()> {
        let coll = self.collection(database, collection)?;
        let result = self.block_on(
            "Error while inserting document",
            coll.insert_one(bson::Document::from(document)),
        )?;
        debug!(database, collection, id = %result.inserted_id, "Document inserted successfully");
        Ok(())
    }

    /// Insert a batch. Documents written before a failure stay on the server.
    pub fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<()> {
        let coll = self.collection(database, collection)?;
        let docs: Vec<bson::Document> = documents.into_iter().map(Into::into).collect();
        let result = self.block_on(
            "Error while inserting multiple documents",
            coll.insert_many(docs),
        )?;
        debug!(database, collection, count = result.inserted_ids.len(), "Documents inserted");
        Ok(())
    }

    /// Update the first match, inserting a new document when nothing matches
    pub fn upsert(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<()> {
        let coll = self.collection(database, collection)?;
        let result = self.block_on(
            "Error while performing upsert",
            coll.update_one(filter.into(), bson::Document::from(update))
                .upsert(true),
        )?;
        debug!(
            database,
            collection,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "Upsert applied"
        );
        Ok(())
    }

    pub fn upsert_model(&self, database: &str, collection: &str, model: UpsertModel) -> Result<()> {
        self.upsert(database, collection, model.query, model.update)
    }

    /// Find matching documents. An empty `sort` means no sort, a `limit` of 0
    /// means no limit.
    pub fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        sort: Document,
        limit: i64,
    ) -> Result<Vec<Document>> {
        let coll = self.collection(database, collection)?;
        let mut action = coll.find(filter.into());
        if !sort.is_empty() {
            action = action.sort(bson::Document::from(sort));
        }
        if limit != 0 {
            action = action.limit(limit);
        }

        let docs: Vec<bson::Document> = self.block_on("Error while finding documents", async {
            action.await?.try_collect::<Vec<_>>().await
        })?;
        Ok(docs.into_iter().map(Document::from).collect())
    }

    /// Every document in the collection
    pub fn find_all(&self, database: &str, collection: &str) -> Result<Vec<Document>> {
        let coll = self.collection(database, collection)?;
        let docs: Vec<bson::Document> = self.block_on("Error while finding documents", async {
            coll.find(doc! {}).await?.try_collect::<Vec<_>>().await
        })?;
        Ok(docs.into_iter().map(Document::from).collect())
    }

    /// First match, or `NotFound`
    pub fn find_one(&self, database: &str, collection: &str, filter: Document) -> Result<Document> {
        let coll = self.collection(database, collection)?;
        let found = self.block_on(
            "Error while finding the document",
            coll.find_one(filter.into()),
        )?;
        match found {
            Some(doc) => Ok(doc.into()),
            None => {
                error!(database, collection, "Error while finding the document: no match");
                Err(Error::NotFound)
            }
        }
    }

    pub fn aggregate(
        &self,
        database: &str,
        collection: &str,
        pipeline: Vec<Document>,
    ) -> Result<Vec<Document>> {
        let coll = self.collection(database, collection)?;
        let stages: Vec<bson::Document> = pipeline.into_iter().map(Into::into).collect();
        let docs: Vec<bson::Document> = self.block_on("Error while aggregating", async {
            coll.aggregate(stages).await?.try_collect::<Vec<_>>().await
        })?;
        Ok(docs.into_iter().map(Document::from).collect())
    }

    /// Apply `update` to the first match. Zero matches is not an error.
    pub fn update_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<()> {
        let coll = self.collection(database, collection)?;
        let result = self.block_on(
            "Error while updating the document",
            coll.update_one(filter.into(), bson::Document::from(update)),
        )?;
        debug!(database, collection, matched = result.matched_count, "Document updated");
        Ok(())
    }

    /// Set `fields` on every match
    pub fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        fields: Document,
    ) -> Result<()> {
        let coll = self.collection(database, collection)?;
        let update = doc! { "$set": bson::Document::from(fields) };
        let result = self.block_on(
            "Error while updating the documents",
            coll.update_many(filter.into(), update),
        )?;
        debug!(
            database,
            collection,
            matched = result.matched_count,
            modified = result.modified_count,
            "Documents updated"
        );
        Ok(())
    }

    pub fn delete_one(&self, database: &str, collection: &str, filter: Document) -> Result<()> {
        let coll = self.collection(database, collection)?;
        let result = self.block_on(
            "Error while deleting the document",
            coll.delete_one(filter.into()),
        )?;
        debug!(database, collection, deleted = result.deleted_count, "Document deleted");
        Ok(())
    }

    pub fn delete_many(&self, database: &str, collection: &str, filter: Document) -> Result<()> {
        let coll = self.collection(database, collection)?;
        let result = self.block_on(
            "Error while deleting the documents",
            coll.delete_many(filter.into()),
        )?;
        debug!(database, collection, deleted = result.deleted_count, "Documents deleted");
        Ok(())
    }

    /// Distinct values of `field` among matching documents
    pub fn distinct(
        &self,
        database: &str,
        collection: &str,
        field: &str,
        filter: Document,
    ) -> Result<Vec<Value>> {
        let coll = self.collection(database, collection)?;
        let values = self.block_on(
            "Error while getting distinct values",
            coll.distinct(field, filter.into()),
        )?;
        Ok(values.into_iter().map(Value::from).collect())
    }

    pub fn drop_collection(&self, database: &str, collection: &str) -> Result<()> {
        let coll = self.collection(database, collection)?;
        self.block_on("Error while dropping the collection", coll.drop())?;
        debug!(database, collection, "Collection dropped");
        Ok(())
    }

    pub fn count_documents(&self, database: &str, collection: &str, filter: Document) -> Result<i64> {
        let coll = self.collection(database, collection)?;
        let count = self.block_on(
            "Error while counting documents",
            coll.count_documents(filter.into()),
        )?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    /// Apply `update` to the first match and return the document as it is
    /// after the update
    pub fn find_one_and_update(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<Document> {
        let coll = self.collection(database, collection)?;
        let updated = self.block_on(
            "Error while finding and updating document",
            coll.find_one_and_update(filter.into(), bson::Document::from(update))
                .return_document(ReturnDocument::After),
        )?;
        match updated {
            Some(doc) => Ok(doc.into()),
            None => {
                error!(database, collection, "Error while finding and updating document: no match");
                Err(Error::NotFound)
            }
        }
    }

    /// Close the session. The handle is unusable afterwards.
    pub fn disconnect(&self) -> Result<()> {
        let client = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(Error::Disconnected)?;

        self.runtime.block_on(async { client.shutdown().await });
        info!("Disconnected from the database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_client() -> Client {
        let config = ClientConfig {
            verify_connection: false,
            ..Default::default()
        };
        Client::connect("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200", &config).unwrap()
    }

    #[test]
    fn test_upsert_model_from_document() {
        let descriptor = Document::new()
            .with_field("query", Document::new().with_field("sku", "a-1"))
            .with_field("update", Document::new().with_field("$set", Document::new().with_field("qty", 2)));

        let model = UpsertModel::from_document(descriptor).unwrap();
        assert_eq!(model.query.get("sku").and_then(Value::as_str), Some("a-1"));
        assert!(model.update.contains_key("$set"));
    }

    #[test]
    fn test_upsert_model_requires_both_parts() {
        let descriptor = Document::new().with_field("query", Document::new());
        assert!(matches!(
            UpsertModel::from_document(descriptor),
            Err(Error::InvalidArgument(_))
        ));

        let descriptor = Document::new()
            .with_field("query", "sku")
            .with_field("update", Document::new());
        assert!(UpsertModel::from_document(descriptor).is_err());
    }

    #[test]
    fn test_connect_rejects_malformed_uri() {
        let result = Client::connect("not a uri", &ClientConfig::default());
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[test]
    fn test_calls_after_disconnect_fail() {
        let client = lazy_client();
        assert!(client.is_connected());

        client.disconnect().unwrap();
        assert!(!client.is_connected());
        assert!(matches!(
            client.find_all("db", "coll"),
            Err(Error::Disconnected)
        ));
        assert!(matches!(client.disconnect(), Err(Error::Disconnected)));
    }

    #[test]
    fn test_unreachable_server_surfaces_store_error() {
        let client = lazy_client();
        let result = client.count_documents("db", "coll", Document::new());
        assert!(matches!(result, Err(Error::Store(_))));
    }
}
