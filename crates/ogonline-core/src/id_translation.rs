//! Mapping between object ids assigned by the host ("original") and ids in
//! the local scene.
//!
//! Unmapped ids translate to themselves, unless that id already belongs to
//! the other side of some mapping. In that case the lookup returns
//! `INVALID_OBJECT_ID` rather than silently aliasing a different object.

use std::collections::HashMap;

use ogonline_proto::ObjectId;
use ogonline_proto::ids::INVALID_OBJECT_ID;
use tracing::warn;

#[derive(Debug, Default)]
pub struct IdTranslation {
    to_local: HashMap<ObjectId, ObjectId>,
    to_original: HashMap<ObjectId, ObjectId>,
}

impl IdTranslation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the host's `original` is `local` here. Replaces any
    /// mapping either id was part of.
    pub fn register(&mut self, original: ObjectId, local: ObjectId) {
        if original == INVALID_OBJECT_ID || local == INVALID_OBJECT_ID {
            warn!(original, local, "ignoring id mapping with invalid id");
            return;
        }
        if let Some(old_local) = self.to_local.insert(original, local) {
            self.to_original.remove(&old_local);
        }
        if let Some(old_original) = self.to_original.insert(local, original) {
            if old_original != original {
                self.to_local.remove(&old_original);
            }
        }
    }

    /// Drops the mapping for a local object, returning its original id.
    pub fn deregister_local(&mut self, local: ObjectId) -> Option<ObjectId> {
        let original = self.to_original.remove(&local)?;
        self.to_local.remove(&original);
        Some(original)
    }

    /// Host id → local id.
    pub fn object_id(&self, original: ObjectId) -> ObjectId {
        if original == INVALID_OBJECT_ID {
            return INVALID_OBJECT_ID;
        }
        if let Some(local) = self.to_local.get(&original) {
            return *local;
        }
        if self.to_original.contains_key(&original) {
            return INVALID_OBJECT_ID;
        }
        original
    }

    /// Local id → host id.
    pub fn original_id(&self, local: ObjectId) -> ObjectId {
        if local == INVALID_OBJECT_ID {
            return INVALID_OBJECT_ID;
        }
        if let Some(original) = self.to_original.get(&local) {
            return *original;
        }
        if self.to_local.contains_key(&local) {
            return INVALID_OBJECT_ID;
        }
        local
    }

    pub fn len(&self) -> usize {
        self.to_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_local.is_empty()
    }

    pub fn clear(&mut self) {
        self.to_local.clear();
        self.to_original.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unmapped_ids_are_identity() {
        let ids = IdTranslation::new();
        assert_eq!(ids.object_id(17), 17);
        assert_eq!(ids.original_id(17), 17);
        assert_eq!(ids.object_id(INVALID_OBJECT_ID), INVALID_OBJECT_ID);
    }

    #[test]
    fn mapped_ids_translate_both_ways() {
        let mut ids = IdTranslation::new();
        ids.register(100, 7);
        assert_eq!(ids.object_id(100), 7);
        assert_eq!(ids.original_id(7), 100);
        // 7 is the local half of a mapping, so it cannot also be an unmapped host id.
        assert_eq!(ids.object_id(7), INVALID_OBJECT_ID);
        assert_eq!(ids.original_id(100), INVALID_OBJECT_ID);
    }

    #[test]
    fn reregistering_replaces_old_pairs() {
        let mut ids = IdTranslation::new();
        ids.register(100, 7);
        ids.register(100, 8);
        assert_eq!(ids.object_id(100), 8);
        assert_eq!(ids.original_id(7), 7);
        assert_eq!(ids.len(), 1);

        assert_eq!(ids.deregister_local(8), Some(100));
        assert!(ids.is_empty());
        assert_eq!(ids.object_id(100), 100);
    }

    proptest! {
        #[test]
        fn translation_round_trips(
            pairs in proptest::collection::vec((0i32..200, 200i32..400), 0..20),
            id in 0i32..400,
        ) {
            let mut ids = IdTranslation::new();
            for (original, local) in &pairs {
                ids.register(*original, *local);
            }
            let local = ids.object_id(id);
            if local != INVALID_OBJECT_ID {
                prop_assert_eq!(ids.original_id(local), id);
            }
            let original = ids.original_id(id);
            if original != INVALID_OBJECT_ID {
                prop_assert_eq!(ids.object_id(original), id);
            }
        }
    }
}
