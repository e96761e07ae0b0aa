use async_trait::async_trait;
use bson::{Document, Uuid, de::deserialize_from_bson, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, ClientSession, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use serde::Deserialize;

use fairydm_core::{
    backend::{BatchWrite, StoreBackend, StoreBackendBuilder, WriteBatch},
    document::DocumentSnapshot,
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};

use crate::query::MongoQueryTranslator;

fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

fn commit_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Commit(err.to_string())
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn prepare_document(id: Uuid, document: Document) -> Document {
        let mut prepared = doc! { "_id": id };
        for (key, value) in document {
            if key != "_id" {
                prepared.insert(key, value);
            }
        }
        prepared
    }

    fn restore_document(mut document: Document) -> DocumentStoreResult<DocumentSnapshot> {
        let id = document
            .remove("_id")
            .ok_or_else(|| DocumentStoreError::InvalidDocument("stored document has no _id".into()))?;

        Ok(DocumentSnapshot::new(deserialize_from_bson::<Uuid>(id)?, document))
    }

    /// `$set` treats dotted keys as paths into embedded documents, and plain
    /// keys replace the whole top-level value.
    fn update_document(fields: Document) -> Document {
        doc! { "$set": fields }
    }

    async fn apply_batch(
        &self,
        session: &mut ClientSession,
        collection: &str,
        batch: WriteBatch,
    ) -> DocumentStoreResult<()> {
        let target = self.get_collection(collection);

        for write in batch {
            match write {
                BatchWrite::Delete(id) => {
                    target
                        .delete_one(doc! { "_id": id })
                        .session(&mut *session)
                        .await
                        .map_err(commit_error)?;
                }
                BatchWrite::Update(id, fields) => {
                    let matched = if fields.is_empty() {
                        target
                            .count_documents(doc! { "_id": id })
                            .session(&mut *session)
                            .await
                            .map_err(commit_error)?
                    } else {
                        target
                            .update_one(doc! { "_id": id }, Self::update_document(fields))
                            .session(&mut *session)
                            .await
                            .map_err(commit_error)?
                            .matched_count
                    };

                    if matched == 0 {
                        return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_document(&self, collection: &str, document: Document) -> DocumentStoreResult<Uuid> {
        let id = Uuid::new();

        self.get_collection(collection)
            .insert_one(Self::prepare_document(id, document))
            .await
            .map_err(backend_error)?;

        Ok(id)
    }

    async fn set_document(&self, collection: &str, id: Uuid, document: Document) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .replace_one(doc! { "_id": id }, Self::prepare_document(id, document))
            .upsert(true)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn get_document(&self, collection: &str, id: Uuid) -> DocumentStoreResult<Option<Document>> {
        Ok(self
            .get_collection(collection)
            .find_one(doc! { "_id": id })
            .await
            .map_err(backend_error)?
            .map(|mut document| {
                document.remove("_id");
                document
            }))
    }

    async fn delete_document(&self, collection: &str, id: Uuid) -> DocumentStoreResult<bool> {
        let result = self
            .get_collection(collection)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(backend_error)?;

        Ok(result.deleted_count > 0)
    }

    async fn query_documents(&self, query: &Query) -> DocumentStoreResult<Vec<DocumentSnapshot>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }

        self.get_collection(&query.collection)
            .find(MongoQueryTranslator.translate(query)?)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .map(Self::restore_document)
            .collect()
    }

    async fn commit_batch(&self, collection: &str, batch: WriteBatch) -> DocumentStoreResult<()> {
        let mut session = self.client.start_session().await.map_err(backend_error)?;
        session.start_transaction().await.map_err(commit_error)?;

        match self.apply_batch(&mut session, collection, batch).await {
            Ok(()) => session.commit_transaction().await.map_err(commit_error),
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    log::warn!("failed to abort transaction on {collection}: {abort_err}");
                }
                Err(err)
            }
        }
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Connection settings, typically loaded from the application's configuration.
///
/// ```ignore
/// let config: MongoDbConfig = serde_json::from_str(r#"{ "dsn": "mongodb://localhost:27017", "database": "app" }"#)?;
/// store.connect(MongoDbStoreBuilder::from_config(config)).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MongoDbConfig {
    pub dsn: String,
    pub database: String,
}

#[derive(Debug)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }

    pub fn from_config(config: MongoDbConfig) -> Self {
        Self {
            dsn: config.dsn,
            database: config.database,
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let client = Client::with_options(
            ClientOptions::parse(&self.dsn)
                .await
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
        )
        .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        log::info!("connected to MongoDB database {}", self.database);
        Ok(MongoDbStore::new(client, self.database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_documents_carry_the_identifier() {
        let id = Uuid::new();
        let prepared = MongoDbStore::prepare_document(id, doc! { "name": "Alice", "_id": "ignored" });

        assert_eq!(prepared, doc! { "_id": id, "name": "Alice" });

        let snapshot = MongoDbStore::restore_document(prepared).unwrap();
        assert_eq!(snapshot.id, id);
        assert_eq!(snapshot.data, doc! { "name": "Alice" });
    }

    #[test]
    fn updates_set_dotted_paths() {
        assert_eq!(
            MongoDbStore::update_document(doc! { "address.city": "B", "age": 40 }),
            doc! { "$set": { "address.city": "B", "age": 40 } }
        );
    }

    #[test]
    fn documents_without_identifier_are_rejected() {
        assert!(matches!(
            MongoDbStore::restore_document(doc! { "name": "Alice" }),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn config_deserializes() {
        let config: MongoDbConfig =
            serde_json::from_str(r#"{ "dsn": "mongodb://localhost:27017", "database": "app" }"#).unwrap();
        let builder = MongoDbStoreBuilder::from_config(config);

        assert_eq!(builder.dsn, "mongodb://localhost:27017");
        assert_eq!(builder.database, "app");
    }
}
