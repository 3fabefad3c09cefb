// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Opaque resource handles and the registry backends use to resolve them.
//!
//! A handle is a plain identifier owned by the frontend; the memory behind it
//! belongs to the backend. Identifiers are allocated monotonically and never
//! reused, so a stale handle always resolves to [`ResourceError::InvalidHandle`].

use crate::renderer::error::ResourceError;
use std::collections::HashMap;
use std::marker::PhantomData;

/// Common behavior of every resource handle type.
pub trait ResourceHandle: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    /// Wraps a raw identifier.
    fn from_raw(raw: usize) -> Self;
    /// The raw identifier.
    fn raw(self) -> usize;
}

macro_rules! resource_handle {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl ResourceHandle for $name {
            fn from_raw(raw: usize) -> Self {
                Self(raw)
            }

            fn raw(self) -> usize {
                self.0
            }
        }
    };
}

resource_handle!(
    /// An opaque handle to a texture.
    TextureId
);
resource_handle!(
    /// An opaque handle to a render target (a set of texture attachments).
    RenderTargetId
);
resource_handle!(
    /// An opaque handle to a mesh (vertex buffer plus optional index buffer).
    MeshId
);
resource_handle!(
    /// An opaque handle to a compiled shader program.
    ShaderId
);

/// Backend-side storage mapping live handles of type `H` to their resources.
#[derive(Debug)]
pub struct ResourceRegistry<H: ResourceHandle, V> {
    entries: HashMap<usize, V>,
    next_id: usize,
    _marker: PhantomData<H>,
}

impl<H: ResourceHandle, V> ResourceRegistry<H, V> {
    /// Creates an empty registry. The first handle issued has raw value 1.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 1,
            _marker: PhantomData,
        }
    }

    /// Stores `value` under a freshly allocated handle.
    pub fn insert(&mut self, value: V) -> H {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, value);
        H::from_raw(id)
    }

    /// Resolves a handle.
    pub fn get(&self, handle: H) -> Result<&V, ResourceError> {
        self.entries
            .get(&handle.raw())
            .ok_or(ResourceError::InvalidHandle)
    }

    /// Resolves a handle mutably.
    pub fn get_mut(&mut self, handle: H) -> Result<&mut V, ResourceError> {
        self.entries
            .get_mut(&handle.raw())
            .ok_or(ResourceError::InvalidHandle)
    }

    /// Removes a resource, returning it to the caller for release.
    pub fn remove(&mut self, handle: H) -> Result<V, ResourceError> {
        self.entries
            .remove(&handle.raw())
            .ok_or(ResourceError::InvalidHandle)
    }

    pub fn contains(&self, handle: H) -> bool {
        self.entries.contains_key(&handle.raw())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over live handles and their resources, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &V)> {
        self.entries.iter().map(|(id, v)| (H::from_raw(*id), v))
    }

    /// Removes every resource, yielding them for release.
    pub fn drain(&mut self) -> impl Iterator<Item = (H, V)> + '_ {
        self.entries.drain().map(|(id, v)| (H::from_raw(id), v))
    }
}

impl<H: ResourceHandle, V> Default for ResourceRegistry<H, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_distinct_and_resolve() {
        let mut registry: ResourceRegistry<TextureId, &str> = ResourceRegistry::new();
        let a = registry.insert("a");
        let b = registry.insert("b");

        assert_ne!(a, b);
        assert_eq!(registry.get(a), Ok(&"a"));
        assert_eq!(registry.get(b), Ok(&"b"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn destroyed_handle_is_invalid_and_not_reused() {
        let mut registry: ResourceRegistry<MeshId, u32> = ResourceRegistry::new();
        let first = registry.insert(1);
        assert_eq!(registry.remove(first), Ok(1));

        // Double destroy and use-after-destroy are both reported.
        assert_eq!(registry.remove(first), Err(ResourceError::InvalidHandle));
        assert_eq!(registry.get(first), Err(ResourceError::InvalidHandle));

        let second = registry.insert(2);
        assert_ne!(first, second);
        assert!(!registry.contains(first));
    }

    #[test]
    fn never_issued_handle_is_invalid() {
        let registry: ResourceRegistry<ShaderId, ()> = ResourceRegistry::new();
        assert_eq!(registry.get(ShaderId(42)), Err(ResourceError::InvalidHandle));
    }

    #[test]
    fn drain_empties_the_registry() {
        let mut registry: ResourceRegistry<RenderTargetId, u8> = ResourceRegistry::new();
        registry.insert(1);
        registry.insert(2);
        let drained: Vec<_> = registry.drain().collect();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }
}
