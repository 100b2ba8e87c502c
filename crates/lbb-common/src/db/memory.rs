use std::collections::HashMap;

use async_trait::async_trait;

use super::offices::{OfficeStore, StoreError};
use crate::office::Office;

/// Office records kept in a map keyed by siret.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOfficeStore {
    offices: HashMap<String, Office>,
}

impl InMemoryOfficeStore {
    pub fn new(offices: impl IntoIterator<Item = Office>) -> Self {
        Self {
            offices: offices
                .into_iter()
                .map(|office| (office.siret.clone(), office))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.offices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offices.is_empty()
    }
}

#[async_trait]
impl OfficeStore for InMemoryOfficeStore {
    async fn offices_by_ids(&self, ids: &[String]) -> Result<Vec<Office>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.offices.get(id).cloned())
            .collect())
    }
}
