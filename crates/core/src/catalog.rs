//! Function catalog contract and an in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::function::Function;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("function catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read access to deployed function definitions.
#[async_trait]
pub trait FunctionCatalog: Send + Sync {
    async fn functions(&self) -> Result<Vec<Function>, CatalogError>;

    /// Look up a single function by id.
    ///
    /// The default scans [`functions`](FunctionCatalog::functions);
    /// implementations with an index should override it.
    async fn function(&self, id: Uuid) -> Result<Option<Function>, CatalogError> {
        Ok(self.functions().await?.into_iter().find(|f| f.id == id))
    }
}

/// Catalog indexed by function id, used by the lightweight deployment.
#[derive(Default)]
pub struct InMemoryCatalog {
    functions: RwLock<HashMap<Uuid, Function>>,
}

impl InMemoryCatalog {
    pub fn new(functions: impl IntoIterator<Item = Function>) -> Self {
        Self {
            functions: RwLock::new(functions.into_iter().map(|f| (f.id, f)).collect()),
        }
    }

    /// Insert or replace a function definition.
    pub async fn upsert(&self, function: Function) {
        self.functions.write().await.insert(function.id, function);
    }

    pub async fn remove(&self, id: Uuid) -> Option<Function> {
        self.functions.write().await.remove(&id)
    }
}

#[async_trait]
impl FunctionCatalog for InMemoryCatalog {
    async fn functions(&self) -> Result<Vec<Function>, CatalogError> {
        Ok(self.functions.read().await.values().cloned().collect())
    }

    async fn function(&self, id: Uuid) -> Result<Option<Function>, CatalogError> {
        Ok(self.functions.read().await.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ListOnly(Vec<Function>);

    #[async_trait]
    impl FunctionCatalog for ListOnly {
        async fn functions(&self) -> Result<Vec<Function>, CatalogError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn default_lookup_scans_the_list() {
        let wanted = Function::new(Uuid::new_v4(), "wanted");
        let catalog = ListOnly(vec![Function::new(Uuid::new_v4(), "other"), wanted.clone()]);

        assert_eq!(catalog.function(wanted.id).await.unwrap(), Some(wanted));
        assert_eq!(catalog.function(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_catalog_indexes_by_id() {
        let f = Function::new(Uuid::new_v4(), "indexed");
        let catalog = InMemoryCatalog::new([f.clone()]);

        assert_eq!(catalog.function(f.id).await.unwrap(), Some(f.clone()));
        assert_eq!(catalog.functions().await.unwrap().len(), 1);

        catalog.remove(f.id).await;
        assert_eq!(catalog.function(f.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_definition() {
        let mut f = Function::new(Uuid::new_v4(), "versioned");
        let catalog = InMemoryCatalog::default();
        catalog.upsert(f.clone()).await;

        f.function_version = 2;
        catalog.upsert(f.clone()).await;

        let found = catalog.function(f.id).await.unwrap().unwrap();
        assert_eq!(found.function_version, 2);
    }
}
