//! In-memory store backed by ordered maps behind a read/write lock.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::airport::{Airport, AirportPatch, IataCode};
use crate::query::CountryCount;
use crate::route::{FlightRoute, RouteKey};

use super::{
    AirportIndex, AirportStore, DeleteSummary, InsertSummary, RouteStore, StoreError, Stored,
    UpsertSummary,
};

/// Thread-safe in-memory implementation of [`AirportStore`] and
/// [`RouteStore`].
///
/// Every write holds the lock for the whole call, so a batch is applied
/// atomically with respect to concurrent readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    airports: BTreeMap<IataCode, Stored<Airport>>,
    routes: BTreeMap<u64, Stored<FlightRoute>>,
    route_keys: HashSet<RouteKey>,
    last_airport_id: u64,
    last_route_id: u64,
    index: Option<Arc<AirportIndex>>,
}

impl MemoryStore {
    /// Create a store pre-populated with `airports`.
    pub fn with_airports<I>(airports: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = Airport>,
    {
        let store = Self::default();
        let airports: Vec<Airport> = airports.into_iter().collect();
        store.upsert_airports(&airports)?;
        Ok(store)
    }

    fn read(&self, operation: &'static str) -> Result<RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Poisoned { operation })
    }

    fn write(
        &self,
        operation: &'static str,
    ) -> Result<RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Poisoned { operation })
    }
}

impl AirportStore for MemoryStore {
    fn upsert_airports(&self, airports: &[Airport]) -> Result<UpsertSummary, StoreError> {
        let mut state = self.write("upsert airports")?;
        let mut summary = UpsertSummary::default();
        for airport in airports {
            if let Some(existing) = state.airports.get_mut(&airport.code) {
                let kept = &existing.record;
                let (is_major_hub, altitude_ft) = (kept.is_major_hub, kept.altitude_ft);
                existing.record = airport
                    .clone()
                    .with_major_hub(is_major_hub)
                    .with_altitude_ft(altitude_ft);
                summary.updated += 1;
            } else {
                state.last_airport_id += 1;
                let stored = Stored::new(state.last_airport_id, airport.clone());
                state.airports.insert(airport.code.clone(), stored);
                summary.inserted += 1;
            }
        }
        if summary.written() > 0 {
            state.index = None;
        }
        Ok(summary)
    }

    fn airport(&self, code: &IataCode) -> Result<Option<Stored<Airport>>, StoreError> {
        Ok(self.read("read airport")?.airports.get(code).cloned())
    }

    fn airports(&self) -> Result<Vec<Stored<Airport>>, StoreError> {
        Ok(self.read("list airports")?.airports.values().cloned().collect())
    }

    fn airport_count(&self) -> Result<u64, StoreError> {
        Ok(self.read("count airports")?.airports.len() as u64)
    }

    fn update_airport(
        &self,
        code: &IataCode,
        patch: &AirportPatch,
    ) -> Result<Option<Stored<Airport>>, StoreError> {
        let mut state = self.write("update airport")?;
        let Some(stored) = state.airports.get_mut(code) else {
            return Ok(None);
        };
        patch.apply(&mut stored.record);
        let updated = stored.clone();
        // Index entries carry the full record, so any change invalidates it.
        state.index = None;
        Ok(Some(updated))
    }

    fn delete_airport(&self, code: &IataCode) -> Result<Option<DeleteSummary>, StoreError> {
        let mut state = self.write("delete airport")?;
        if state.airports.remove(code).is_none() {
            return Ok(None);
        }
        let orphaned: Vec<u64> = state
            .routes
            .values()
            .filter(|route| route.record.touches(code))
            .map(|route| route.id)
            .collect();
        for id in &orphaned {
            if let Some(route) = state.routes.remove(id) {
                state.route_keys.remove(&route.record.key());
            }
        }
        state.index = None;
        Ok(Some(DeleteSummary {
            routes_removed: orphaned.len() as u64,
        }))
    }

    fn country_counts(&self) -> Result<Vec<CountryCount>, StoreError> {
        let state = self.read("count countries")?;
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for airport in state.airports.values() {
            *counts.entry(airport.record.country.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(country, count)| CountryCount::new(country, count))
            .collect())
    }

    fn spatial_index(&self) -> Result<Arc<AirportIndex>, StoreError> {
        if let Some(index) = &self.read("read spatial index")?.index {
            return Ok(Arc::clone(index));
        }
        let mut state = self.write("build spatial index")?;
        if let Some(index) = &state.index {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(AirportIndex::build(
            state.airports.values().cloned().collect(),
        ));
        state.index = Some(Arc::clone(&index));
        Ok(index)
    }
}

impl RouteStore for MemoryStore {
    fn insert_routes(&self, routes: &[FlightRoute]) -> Result<InsertSummary, StoreError> {
        let mut state = self.write("insert routes")?;
        let mut summary = InsertSummary::default();
        for route in routes {
            if !state.airports.contains_key(&route.origin)
                || !state.airports.contains_key(&route.destination)
            {
                summary.orphaned += 1;
                continue;
            }
            if !state.route_keys.insert(route.key()) {
                summary.conflicts += 1;
                continue;
            }
            state.last_route_id += 1;
            let id = state.last_route_id;
            state.routes.insert(id, Stored::new(id, route.clone()));
            summary.inserted += 1;
        }
        Ok(summary)
    }

    fn route(&self, id: u64) -> Result<Option<Stored<FlightRoute>>, StoreError> {
        Ok(self.read("read route")?.routes.get(&id).cloned())
    }

    fn routes_from(
        &self,
        origin: &IataCode,
        limit: usize,
    ) -> Result<Vec<Stored<FlightRoute>>, StoreError> {
        Ok(self
            .read("list routes")?
            .routes
            .values()
            .filter(|route| route.record.origin == *origin)
            .take(limit)
            .cloned()
            .collect())
    }

    fn route_count(&self) -> Result<u64, StoreError> {
        Ok(self.read("count routes")?.routes.len() as u64)
    }
}
