//! Simulated property database shared by the examples

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Building not found: {0}")]
    BuildingNotFound(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Building {
    pub id: String,
    pub name: String,
    pub organization_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Residence {
    pub id: String,
    pub building_id: String,
    pub unit: String,
}

/// Stand-in for the ORM: every call costs a round trip
#[derive(Default)]
pub struct PropertyStore {
    buildings: RwLock<HashMap<String, Building>>,
    residences: RwLock<Vec<Residence>>,
    queries: AtomicUsize,
}

impl PropertyStore {
    /// Number of round trips made so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    async fn round_trip(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    pub async fn building(&self, id: &str) -> Result<Building, StoreError> {
        self.round_trip().await;
        self.buildings
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::BuildingNotFound(id.to_string()))
    }

    pub async fn residences_of(&self, building_id: &str) -> Result<Vec<Residence>, StoreError> {
        self.round_trip().await;
        Ok(self
            .residences
            .read()
            .await
            .iter()
            .filter(|r| r.building_id == building_id)
            .cloned()
            .collect())
    }

    pub async fn rename_building(&self, id: &str, name: &str) -> Result<(), StoreError> {
        self.round_trip().await;
        let mut buildings = self.buildings.write().await;
        let building = buildings
            .get_mut(id)
            .ok_or_else(|| StoreError::BuildingNotFound(id.to_string()))?;
        building.name = name.to_string();
        Ok(())
    }
}

/// Two buildings of three residences each, owned by organization `o1`
pub async fn seed(store: &PropertyStore) {
    let mut buildings = store.buildings.write().await;
    let mut residences = store.residences.write().await;
    for (id, name) in [("b1", "Maple Court"), ("b2", "Harbour View")] {
        buildings.insert(
            id.to_string(),
            Building {
                id: id.to_string(),
                name: name.to_string(),
                organization_id: "o1".to_string(),
            },
        );
        for unit in ["101", "102", "201"] {
            residences.push(Residence {
                id: format!("{}-{}", id, unit),
                building_id: id.to_string(),
                unit: unit.to_string(),
            });
        }
    }
}
