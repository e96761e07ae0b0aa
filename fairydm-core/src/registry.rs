//! Name-to-model registry.
//!
//! The application root owns one [`ModelRegistry`], built at startup around
//! its [`DocumentStore`]. Registering a name returns the canonical model for
//! it; registering the same name again returns that same model and ignores
//! the new schema.

use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

use crate::{
    document::Entity,
    model::{Model, ModelDefinition},
    schema::Schema,
    store::DocumentStore,
};

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    store: DocumentStore,
    definitions: Arc<RwLock<HashMap<String, Arc<ModelDefinition>>>>,
}

impl ModelRegistry {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            definitions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The store session handle shared by every registered model.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Returns the model registered under `name`, creating it from `schema` on first use.
    ///
    /// Later calls with the same name return the first definition unchanged.
    pub fn register<E: Entity>(&self, name: &str, schema: Schema) -> Model<E> {
        let definition = {
            let mut definitions = self.definitions.write();
            match definitions.get(name) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let definition = Arc::new(ModelDefinition::new(name, schema));
                    log::info!(
                        "registered model {name} on collection {}",
                        definition.collection_name()
                    );
                    definitions.insert(name.to_string(), Arc::clone(&definition));
                    definition
                }
            }
        };

        Model::new(definition, self.store.clone())
    }

    /// Looks up a previously registered model.
    pub fn model<E: Entity>(&self, name: &str) -> Option<Model<E>> {
        self.definitions
            .read()
            .get(name)
            .map(|definition| Model::new(Arc::clone(definition), self.store.clone()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// Names of every registered model.
    pub fn names(&self) -> Vec<String> {
        self.definitions.read().keys().cloned().collect()
    }
}
