//! Sensor identity resolution
//!
//! Maps a canonical address to its store identity, creating the sensor on
//! first contact. Creation is serialized per address: concurrent workers
//! that see the same new address wait on a short-lived gate, and only the
//! first one reaches the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{ContractError, SensorIdentity, SensorStore, SourceAddress};
use tracing::{debug, info, instrument};

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Resolves (and creates) sensor identities
pub struct IdentityResolver<S> {
    store: Arc<S>,
    cache: Mutex<HashMap<SourceAddress, SensorIdentity>>,
    gates: Mutex<HashMap<SourceAddress, Gate>>,
    created: AtomicU64,
}

impl<S: SensorStore> IdentityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            created: AtomicU64::new(0),
        }
    }

    /// Return the identity for `address`, creating it when absent
    #[instrument(name = "resolve_identity", skip(self), fields(address = %address))]
    pub async fn resolve(&self, address: &SourceAddress) -> Result<SensorIdentity, ContractError> {
        if let Some(identity) = self.cached(address) {
            return Ok(identity);
        }

        let gate = Arc::clone(lock(&self.gates).entry(address.clone()).or_default());
        let _guard = gate.lock().await;

        // another worker may have created it while we waited
        if let Some(identity) = self.cached(address) {
            return Ok(identity);
        }

        let upserted = match self
            .store
            .upsert_sensor(address, &address.display_name())
            .await
        {
            Ok(upserted) => upserted,
            Err(e) => {
                lock(&self.gates).remove(address);
                return Err(e);
            }
        };

        if upserted.created {
            self.created.fetch_add(1, Ordering::Relaxed);
            observability::record_sensor_created();
            info!(
                sensor_id = upserted.identity.id,
                name = %upserted.identity.display_name,
                "Created new sensor"
            );
        } else {
            debug!(sensor_id = upserted.identity.id, "Sensor already known");
        }

        // cache before dropping the gate so late arrivals never miss both
        lock(&self.cache).insert(address.clone(), upserted.identity.clone());
        lock(&self.gates).remove(address);
        Ok(upserted.identity)
    }

    /// Sensors created by this resolver
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Addresses resolved so far
    pub fn cached_len(&self) -> usize {
        lock(&self.cache).len()
    }

    fn cached(&self, address: &SourceAddress) -> Option<SensorIdentity> {
        lock(&self.cache).get(address).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
