//! Identity bookkeeping for installed wrappers
//!
//! Both tables are keyed by [`ObjectId`], never by value equality, so two
//! callables that compare equal are still told apart.

use std::collections::{HashMap, HashSet};

use super::value::{ObjectId, Value};

/// Wrapper identity → original, for every currently installed wrapper.
///
/// A value is an instrumented wrapper iff it has an entry here.
#[derive(Debug, Clone, Default)]
pub struct IdentityRegistry {
    originals: HashMap<ObjectId, Value>,
}

impl IdentityRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `wrapper` as standing in for `original`.
    ///
    /// Scalars have no identity and are ignored.
    pub fn register(&mut self, wrapper: &Value, original: Value) {
        if let Some(id) = wrapper.identity() {
            self.originals.insert(id, original);
        }
    }

    /// Original replaced by `value`, if `value` is a wrapper
    pub fn lookup_original(&self, value: &Value) -> Option<&Value> {
        value.identity().and_then(|id| self.originals.get(&id))
    }

    /// Whether `value` is an installed wrapper
    pub fn is_wrapper(&self, value: &Value) -> bool {
        self.lookup_original(value).is_some()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.originals.clear();
    }

    /// Number of installed wrappers
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Whether nothing is installed
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

/// Wrappers built by one scope instance, kept across activation cycles so
/// each original maps to the same wrapper object every time.
#[derive(Debug, Default)]
pub struct WrapperCache {
    by_original: HashMap<ObjectId, Value>,
    by_wrapper: HashMap<ObjectId, Value>,
    passthrough: HashSet<ObjectId>,
}

impl WrapperCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `original` is replaced by `wrapper`
    pub fn insert(&mut self, original: &Value, wrapper: &Value) {
        if let (Some(original_id), Some(wrapper_id)) = (original.identity(), wrapper.identity()) {
            self.by_original.insert(original_id, wrapper.clone());
            self.by_wrapper.insert(wrapper_id, original.clone());
        }
    }

    /// Remember that the provider reported no conditions for `id`
    pub fn insert_passthrough(&mut self, id: ObjectId) {
        self.passthrough.insert(id);
    }

    /// Wrapper previously built for `original`
    pub fn wrapper_for(&self, original: ObjectId) -> Option<&Value> {
        self.by_original.get(&original)
    }

    /// Original behind a wrapper this cache built
    pub fn original_of(&self, wrapper: ObjectId) -> Option<&Value> {
        self.by_wrapper.get(&wrapper)
    }

    /// Whether `id` is known to carry no conditions
    pub fn is_passthrough(&self, id: ObjectId) -> bool {
        self.passthrough.contains(&id)
    }

    /// Number of cached wrappers
    pub fn len(&self) -> usize {
        self.by_original.len()
    }

    /// Whether no wrapper has been built yet
    pub fn is_empty(&self) -> bool {
        self.by_original.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keys_by_identity() {
        let original = Value::list(vec![Value::Int(1)]);
        let wrapper = Value::list(vec![Value::Int(1)]);
        let lookalike = Value::list(vec![Value::Int(1)]);

        let mut registry = IdentityRegistry::new();
        registry.register(&wrapper, original.clone());

        assert!(registry.is_wrapper(&wrapper));
        assert!(!registry.is_wrapper(&lookalike), "equal but distinct value");
        assert!(registry.lookup_original(&wrapper).unwrap().is_identical(&original));

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_scalars_never_register() {
        let mut registry = IdentityRegistry::new();
        registry.register(&Value::Int(1), Value::Int(2));
        assert!(!registry.is_wrapper(&Value::Int(1)));
    }

    #[test]
    fn test_cache_both_directions() {
        let original = Value::list(Vec::new());
        let wrapper = Value::list(Vec::new());
        let mut cache = WrapperCache::new();
        cache.insert(&original, &wrapper);

        let original_id = original.identity().unwrap();
        let wrapper_id = wrapper.identity().unwrap();
        assert!(cache.wrapper_for(original_id).unwrap().is_identical(&wrapper));
        assert!(cache.original_of(wrapper_id).unwrap().is_identical(&original));
        assert!(!cache.is_passthrough(original_id));
        assert_eq!(cache.len(), 1);
    }
}
