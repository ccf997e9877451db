//! Memoization of generated views, keyed by component type and parameters.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use serde::Serialize;
use slotmap::{Key, SlotMap};

use crate::component::{serialize_params, Component};
use crate::deps::arcstr::ArcStr;
use crate::error::Result;

/// Identifies a component by its type and serialized parameters.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(crate) struct ParamKey {
    type_id: TypeId,
    params: Vec<u8>,
}

impl ParamKey {
    pub(crate) fn from_params<T>(params: &T::Params) -> Result<Self>
    where
        T: Component,
        T::Params: Serialize,
    {
        Ok(Self {
            type_id: TypeId::of::<T>(),
            params: serialize_params(params)?,
        })
    }
}

/// The outcome of looking up a generated value.
pub(crate) enum GeneratedCheck<T, K> {
    /// The value was already generated.
    Exists(T),
    /// The value must be generated and stored under the given key.
    MustGenerate(K),
}

/// A map from parameters to generated values, with name allocation.
#[derive(Debug)]
pub(crate) struct GenerationMap<P, K: Key, V> {
    ids: HashMap<P, K>,
    values: SlotMap<K, Option<Arc<V>>>,
    names: HashSet<ArcStr>,
}

impl<P, K, V> Default for GenerationMap<P, K, V>
where
    K: Key,
{
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            values: SlotMap::with_key(),
            names: HashSet::new(),
        }
    }
}

impl<P, K, V> GenerationMap<P, K, V>
where
    P: Hash + Eq,
    K: Key,
{
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `params` or reserves a key for generating it.
    ///
    /// A reserved key whose value has not been stored yet is handed out again,
    /// so a failed generation can be retried.
    pub(crate) fn get(&mut self, params: P) -> GeneratedCheck<Arc<V>, K> {
        if let Some(id) = self.ids.get(&params) {
            if let Some(Some(value)) = self.values.get(*id) {
                return GeneratedCheck::Exists(value.clone());
            }
            return GeneratedCheck::MustGenerate(*id);
        }
        let id = self.gen_id();
        self.ids.insert(params, id);
        GeneratedCheck::MustGenerate(id)
    }

    /// Reserves a key not associated with any parameters.
    pub(crate) fn gen_id(&mut self) -> K {
        self.values.insert(None)
    }

    /// Stores a generated value, registering its name.
    pub(crate) fn set(&mut self, id: K, name: ArcStr, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.names.insert(name);
        if let Some(slot) = self.values.get_mut(id) {
            *slot = Some(value.clone());
        }
        value
    }

    /// Returns `base_name` if unused, otherwise the first free `base_name_N`.
    pub(crate) fn alloc_name(&self, base_name: impl Into<ArcStr>) -> ArcStr {
        let base_name = base_name.into();
        if !self.names.contains(&base_name) {
            return base_name;
        }
        let mut i = 1;
        loop {
            let name = arcstr::format!("{}_{}", base_name, i);
            if !self.names.contains(&name) {
                return name;
            }
            i += 1;
        }
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<V>> {
        self.values.values().filter_map(|v| v.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use slotmap::DefaultKey;

    use super::*;

    #[test]
    fn names_are_deduplicated() {
        let mut map: GenerationMap<u32, DefaultKey, u32> = GenerationMap::new();
        let id = map.gen_id();
        map.set(id, arcstr::literal!("wg"), 1);
        assert_eq!(map.alloc_name("wg"), "wg_1");
        let id = map.gen_id();
        map.set(id, arcstr::literal!("wg_1"), 2);
        assert_eq!(map.alloc_name("wg"), "wg_2");
        assert_eq!(map.alloc_name("mmi"), "mmi");
    }

    #[test]
    fn generated_values_are_reused() {
        let mut map: GenerationMap<u32, DefaultKey, u32> = GenerationMap::new();
        let GeneratedCheck::MustGenerate(id) = map.get(7) else {
            panic!("expected a fresh key");
        };
        assert!(matches!(map.get(7), GeneratedCheck::MustGenerate(k) if k == id));
        map.set(id, arcstr::literal!("seven"), 7);
        assert!(matches!(map.get(7), GeneratedCheck::Exists(v) if *v == 7));
        assert_eq!(map.values().count(), 1);
    }
}
