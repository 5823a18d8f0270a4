//! # IDs
//! Layers and history entries need an identity that survives being moved around, cloned into
//! commands, and re-inserted by undo. This is implemented via the `CraftID<T>` type, which hands out
//! process-unique IDs namespaced by the type T.
//!
//! Grab a fresh ID with `CraftID::default()`, or many at once with `CraftID::many`.

// Next free ID, per namespace.
static ID_SERVER: parking_lot::Mutex<std::collections::BTreeMap<std::any::TypeId, u64>> =
    parking_lot::const_mutex(std::collections::BTreeMap::new());

/// ID that is unique within this execution of the program.
/// IDs from different namespaces may share a value but are never comparable.
///
/// IDs are *not* persisted. Loading a project assigns new ones.
pub struct CraftID<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _namespace: std::marker::PhantomData<fn() -> T>,
}
impl<T: std::any::Any> Clone for CraftID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for CraftID<T> {}
impl<T: std::any::Any> PartialEq for CraftID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for CraftID<T> {}
impl<T: std::any::Any> PartialOrd for CraftID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: std::any::Any> Ord for CraftID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
impl<T: std::any::Any> std::hash::Hash for CraftID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: std::any::Any> CraftID<T> {
    /// Get the raw numeric value of this ID.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.id.get()
    }
    /// Allocate `count` IDs in one lock. IDs are reserved eagerly, dropping the iterator
    /// early does not return the unused ones.
    ///
    /// # Panics
    /// If the namespace is exhausted. With 64 bits to go through, that's a bug, not a workload.
    pub fn many(count: usize) -> impl ExactSizeIterator<Item = Self> {
        let count_u64 = count as u64;
        let start = {
            let mut server = ID_SERVER.lock();
            let next = server.entry(std::any::TypeId::of::<T>()).or_insert(1);
            let start = *next;
            *next = start.checked_add(count_u64).unwrap_or_else(|| {
                log::error!("{} ID space exhausted!", std::any::type_name::<T>());
                panic!("{} ID overflow", std::any::type_name::<T>())
            });
            start
        };

        (0..count).map(move |idx| CraftID {
            // Start is at least one and the range was checked for overflow above.
            id: std::num::NonZeroU64::new(start + idx as u64).unwrap(),
            _namespace: std::marker::PhantomData,
        })
    }
}
impl<T: std::any::Any> Default for CraftID<T> {
    fn default() -> Self {
        Self::many(1).next().unwrap()
    }
}
impl<T: std::any::Any> std::fmt::Display for CraftID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = std::any::type_name::<T>();
        let short = name.rsplit("::").next().unwrap_or(name);
        write!(f, "{short}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for CraftID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}
