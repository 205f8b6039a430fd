//! Layout cache
//!
//! Reconstruction is memoized per `(declaration, config)`. The cache is an
//! ordinary owned object: create one at startup, share it behind an [`Arc`]
//! and hand it to everything that binds instances.
//!
//! Layouts are computed outside the lock. When several threads race on the
//! same missing key, each computes a candidate but only the first one to be
//! published is kept; every caller receives that canonical [`Arc`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::decl::{DeclId, Declaration};
use crate::error::Result;
use crate::layout::{Layout, compute_layout};
use crate::memory::AbstractState;
use crate::platform::PlatformConfig;

type Key = (DeclId, PlatformConfig);

#[derive(Debug, Default)]
pub struct LayoutCache {
    entries: RwLock<HashMap<Key, Arc<Layout>>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache ready to be shared between instances
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Layout of `declaration` under `config`, computed on first request
    ///
    /// Equal configs always yield the identical [`Arc`]. Definition errors are
    /// not cached; asking again recomputes and fails again.
    pub fn reconstruct(
        &self,
        declaration: &Arc<Declaration>,
        config: PlatformConfig,
    ) -> Result<Arc<Layout>> {
        let key = (declaration.id(), config);
        if let Some(layout) = self.entries.read().get(&key) {
            return Ok(Arc::clone(layout));
        }

        // Nested composites re-enter the cache, so no lock is held here.
        let computed = Arc::new(compute_layout(declaration, self, config)?);

        let mut entries = self.entries.write();
        let published = entries.entry(key).or_insert_with(|| {
            debug!(
                "Computed layout of {} for {}: size={}, alignment={}",
                declaration.name(),
                config,
                computed.size(),
                computed.alignment()
            );
            Arc::clone(&computed)
        });

        if !Arc::ptr_eq(published, &computed) {
            debug!(
                "Discarded duplicate layout of {} for {}",
                declaration.name(),
                config
            );
        }
        Ok(Arc::clone(published))
    }

    /// [`reconstruct`](Self::reconstruct) for the config `state` reports
    pub fn reconstruct_for(
        &self,
        declaration: &Arc<Declaration>,
        state: &dyn AbstractState,
    ) -> Result<Arc<Layout>> {
        self.reconstruct(declaration, state.config())
    }

    pub fn contains(&self, declaration: &Declaration, config: PlatformConfig) -> bool {
        self.entries
            .read()
            .contains_key(&(declaration.id(), config))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached layout; outstanding `Arc`s stay valid
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Data;
    use crate::memory::BufferState;
    use crate::platform::Preset;
    use std::thread;

    fn point() -> Arc<Declaration> {
        Declaration::structure("Point")
            .field("x", Data::I32)
            .field("y", Data::I32)
            .field("owner", Data::pointer(Data::opaque("Entity")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_reconstruct_returns_identical_layout() {
        let cache = LayoutCache::new();
        let decl = point();

        let first = cache.reconstruct(&decl, Preset::Win64.config()).unwrap();
        let second = cache.reconstruct(&decl, Preset::Win64.config()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Different preset, equal config value.
        let third = cache.reconstruct(&decl, Preset::MacOsX64.config()).unwrap();
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_configs_get_separate_entries() {
        let cache = LayoutCache::new();
        let decl = point();

        let l32 = cache.reconstruct(&decl, Preset::Win32.config()).unwrap();
        let l64 = cache.reconstruct(&decl, Preset::Win64.config()).unwrap();
        assert!(!Arc::ptr_eq(&l32, &l64));
        assert_eq!(l32.size(), 12);
        assert_eq!(l64.size(), 16);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_declarations_are_keyed_by_identity() {
        let cache = LayoutCache::new();
        let a = point();
        let b = point();

        let la = cache.reconstruct(&a, Preset::Win64.config()).unwrap();
        let lb = cache.reconstruct(&b, Preset::Win64.config()).unwrap();
        assert!(!Arc::ptr_eq(&la, &lb));
        assert_eq!(la.size(), lb.size());
    }

    #[test]
    fn test_nested_layouts_are_shared() {
        let cache = LayoutCache::new();
        let inner = point();
        let outer = Declaration::structure("Segment")
            .field("from", Data::composite(&inner))
            .field("to", Data::composite(&inner))
            .build()
            .unwrap();

        let config = Preset::Win32.config();
        let layout = cache.reconstruct(&outer, config).unwrap();
        assert_eq!(layout.size(), 24);
        assert!(cache.contains(&inner, config));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reconstruct_for_uses_state_config() {
        let cache = LayoutCache::new();
        let decl = point();
        let state = BufferState::zeroed(Preset::Win32.config(), 0, 0);

        let via_state = cache.reconstruct_for(&decl, &state).unwrap();
        let direct = cache.reconstruct(&decl, Preset::Win32.config()).unwrap();
        assert!(Arc::ptr_eq(&via_state, &direct));
    }

    #[test]
    fn test_definition_errors_are_not_cached() {
        let cache = LayoutCache::new();
        let decl = Declaration::structure("Broken")
            .field("bad", Data::opaque("Missing"))
            .build()
            .unwrap();

        for _ in 0..2 {
            let err = cache.reconstruct(&decl, Preset::Win64.config()).unwrap_err();
            assert!(err.is_definition());
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_first_reconstruction_is_canonical() {
        let cache = LayoutCache::shared();
        let decl = point();
        let config = Preset::Win64.config();

        let layouts: Vec<Arc<Layout>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.reconstruct(&decl, config).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let canonical = cache.reconstruct(&decl, config).unwrap();
        assert!(layouts.iter().all(|l| Arc::ptr_eq(l, &canonical)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = LayoutCache::new();
        let decl = point();
        let kept = cache.reconstruct(&decl, Preset::Win64.config()).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(kept.size(), 16);
    }
}
