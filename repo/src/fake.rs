//! In-memory remote source for tests and offline demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::entity::Entity;
use crate::error::RepoError;
use crate::remote::RemoteSource;

/// A remote source backed by a HashMap.
///
/// It can be switched offline with [`FakeRemote::set_failing`], after which
/// every call fails with [`RepoError::RemoteUnavailable`]. Calls are counted
/// so tests can assert whether the remote was reached.
pub struct FakeRemote<E: Entity> {
    entities: RwLock<HashMap<E::Id, E>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl<E: Entity> FakeRemote<E> {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let fake = Self::new();
        for entity in entities {
            fake.insert(entity);
        }
        fake
    }

    /// Stores `entity` directly, bypassing the call counter.
    pub fn insert(&self, entity: E) {
        self.entities.write().insert(entity.id(), entity);
    }

    /// Returns the stored entity without counting a call.
    pub fn get(&self, id: &E::Id) -> Option<E> {
        self.entities.read().get(id).cloned()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of trait calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> Result<(), RepoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::RemoteUnavailable("fake remote offline".into()));
        }
        Ok(())
    }
}

impl<E: Entity> Default for FakeRemote<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> RemoteSource<E> for FakeRemote<E> {
    async fn fetch(&self, id: &E::Id) -> Result<E, RepoError> {
        self.begin_call()?;
        self.get(id).ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    async fn fetch_batch(&self, ids: &[E::Id]) -> Result<Vec<E>, RepoError> {
        self.begin_call()?;
        let entities = self.entities.read();
        Ok(ids.iter().filter_map(|id| entities.get(id).cloned()).collect())
    }

    async fn create(&self, entity: E) -> Result<E, RepoError> {
        self.begin_call()?;
        self.insert(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, RepoError> {
        self.begin_call()?;
        let mut entities = self.entities.write();
        let id = entity.id();
        match entities.get_mut(&id) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(entity)
            }
            None => Err(RepoError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &E::Id) -> Result<(), RepoError> {
        self.begin_call()?;
        match self.entities.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound(id.to_string())),
        }
    }
}
