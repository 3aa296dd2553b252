use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ast::{Field, Machine};
use crate::netrc::Netrc;

/// A [`Netrc`] shared between threads.
///
/// Record creation, removal and updates hold the write lock for the whole
/// edit; lookups and serialization hold the read lock, so a reader never sees
/// a half-spliced token list.
#[derive(Debug, Clone, Default)]
pub struct SharedNetrc(Arc<RwLock<Netrc>>);

impl SharedNetrc {
    pub fn new(netrc: Netrc) -> Self {
        Self(Arc::new(RwLock::new(netrc)))
    }

    fn read(&self) -> RwLockReadGuard<'_, Netrc> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Netrc> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the record `name` resolves to, see [`Netrc::find_record`].
    pub fn find_record(&self, name: &str) -> Option<Machine> {
        self.read().find_record(name).cloned()
    }

    pub fn create_record(&self, name: &str, login: &str, password: &str, account: &str) -> Machine {
        let mut netrc = self.write();
        let machine = netrc.create_record(name, login, password, account);
        Machine::clone(&machine)
    }

    pub fn remove_record(&self, name: &str) {
        self.write().remove_record(name)
    }

    /// Update a field of the record `name` resolves to.
    ///
    /// Returns false when nothing matched.
    pub fn update_field(&self, name: &str, field: Field, value: &str) -> bool {
        match self.write().find_record_mut(name) {
            Some(mut machine) => {
                machine.update_field(field, value);
                true
            }
            None => false,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.read().serialize()
    }

    /// Run `f` with shared access to the document.
    pub fn with<T>(&self, f: impl FnOnce(&Netrc) -> T) -> T {
        f(&self.read())
    }

    pub fn into_inner(self) -> Result<Netrc, Self> {
        Arc::try_unwrap(self.0)
            .map(|lock| lock.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(Self)
    }
}

impl From<Netrc> for SharedNetrc {
    fn from(netrc: Netrc) -> Self {
        Self::new(netrc)
    }
}
