//! ConnectionRegistry - One shared client per connection target.
//!
//! Create one registry at startup and hand it to every repository. The first
//! repository asking for a target creates its client; everyone after that
//! gets the same `Arc`. Each target has its own slot: concurrent first use of
//! a target creates exactly one client, and a slow connect only holds up
//! callers of that same target.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::connection::ConnectionString;
use crate::store::memory::MemoryClient;
use crate::store::{StoreClient, StoreError};

type ClientFactory =
    dyn Fn(&ConnectionString) -> Result<Arc<dyn StoreClient>, StoreError> + Send + Sync;

/// Empty until the target's first successful connect.
type ClientSlot = Arc<Mutex<Option<Arc<dyn StoreClient>>>>;

pub struct ConnectionRegistry {
    factory: Box<ClientFactory>,
    slots: RwLock<HashMap<String, ClientSlot>>,
    created: AtomicUsize,
}

impl ConnectionRegistry {
    /// `factory` builds a driver client for a target; it is called until it
    /// succeeds once per target.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&ConnectionString) -> Result<Arc<dyn StoreClient>, StoreError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            factory: Box::new(factory),
            slots: RwLock::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// A registry whose clients are in-process `MemoryClient`s.
    pub fn in_memory() -> Self {
        Self::new(|_| Ok(Arc::new(MemoryClient::new()) as Arc<dyn StoreClient>))
    }

    /// Get the client for `connection`'s target, creating it on first use.
    pub fn client(&self, connection: &ConnectionString) -> Result<Arc<dyn StoreClient>, StoreError> {
        let slot = self.slot(connection.target())?;
        let mut client = slot
            .lock()
            .map_err(|_| StoreError::backend("registry lock poisoned"))?;

        if let Some(client) = client.as_ref() {
            return Ok(client.clone());
        }

        log::debug!("creating store client for {}", connection);
        let created = (self.factory)(connection)?;
        *client = Some(created.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    /// Number of clients created so far.
    pub fn len(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, target: String) -> Result<ClientSlot, StoreError> {
        if let Some(slot) = self
            .slots
            .read()
            .map_err(|_| StoreError::backend("registry lock poisoned"))?
            .get(&target)
        {
            return Ok(slot.clone());
        }

        let mut slots = self
            .slots
            .write()
            .map_err(|_| StoreError::backend("registry lock poisoned"))?;
        Ok(slots.entry(target).or_default().clone())
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("clients", &self.len())
            .finish()
    }
}
