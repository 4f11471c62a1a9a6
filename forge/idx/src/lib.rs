//! Arena storage for the dependency graph. Every node kind is stored in an
//! [`IndexedMap`](maps::IndexedMap) and referred to by a small copyable index
//! type declared with [`impl_index!`].
mod index_trait;
mod indexed_map;
mod macros;

pub mod maps {
    pub use super::indexed_map::{IndexedMap, SecondaryMap};
}

pub use index_trait::IndexRef;
