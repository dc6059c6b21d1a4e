//! Hash collection aliases for the path-keyed lookup tables (prior snapshot,
//! exact ignore set). With the `gxhash` feature the faster gxhash hasher is
//! used; without it the std collections stand in, so the crate still builds
//! on CPUs lacking AES-NI/SSE2.

#[cfg(feature = "gxhash")]
pub use gxhash::{HashMap, HashMapExt, HashSet, HashSetExt};

#[cfg(not(feature = "gxhash"))]
pub use std::collections::{HashMap, HashSet};

/// Constructor shim so call sites read the same with either hasher
#[cfg(not(feature = "gxhash"))]
pub trait HashMapExt {
    /// Creates an empty map
    fn new() -> Self;

    /// Creates an empty map with room for `capacity` entries
    fn with_capacity(capacity: usize) -> Self;
}

#[cfg(not(feature = "gxhash"))]
impl<K, V> HashMapExt for HashMap<K, V> {
    fn new() -> Self {
        HashMap::default()
    }

    fn with_capacity(capacity: usize) -> Self {
        HashMap::with_capacity_and_hasher(capacity, Default::default())
    }
}

/// Constructor shim so call sites read the same with either hasher
#[cfg(not(feature = "gxhash"))]
pub trait HashSetExt {
    /// Creates an empty set
    fn new() -> Self;
}

#[cfg(not(feature = "gxhash"))]
impl<T> HashSetExt for HashSet<T> {
    fn new() -> Self {
        HashSet::default()
    }
}
