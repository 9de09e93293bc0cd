//! Per-scope symbol tables
//!
//! One insertion-ordered map per namespace. A name may appear once in each
//! namespace, so a class `Foo` and a function `Foo` coexist.

use super::symbols::Namespace;
use super::SymbolId;
use fxhash::FxBuildHasher;
use indexmap::IndexMap;

type NameMap = IndexMap<String, SymbolId, FxBuildHasher>;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    maps: [NameMap; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the (namespace, name) slot is taken
    pub fn insert(&mut self, ns: Namespace, name: &str, id: SymbolId) -> bool {
        let map = &mut self.maps[ns.index()];
        if map.contains_key(name) {
            return false;
        }
        map.insert(name.to_string(), id);
        true
    }

    /// Overwrite the slot in place, keeping its position
    pub fn replace(&mut self, ns: Namespace, name: &str, id: SymbolId) -> Option<SymbolId> {
        self.maps[ns.index()].insert(name.to_string(), id)
    }

    pub fn remove(&mut self, ns: Namespace, name: &str) -> Option<SymbolId> {
        self.maps[ns.index()].shift_remove(name)
    }

    pub fn get(&self, ns: Namespace, name: &str) -> Option<SymbolId> {
        self.maps[ns.index()].get(name).copied()
    }

    /// Find in one namespace, or the first hit across all of them
    pub fn find(&self, name: &str, ns: Option<Namespace>) -> Option<SymbolId> {
        match ns {
            Some(ns) => self.get(ns, name),
            None => Namespace::ALL.iter().find_map(|ns| self.get(*ns, name)),
        }
    }

    pub fn contains(&self, name: &str, ns: Option<Namespace>) -> bool {
        self.find(name, ns).is_some()
    }

    /// Entries of one namespace, in declaration order
    pub fn entries(&self, ns: Namespace) -> impl Iterator<Item = (&str, SymbolId)> + '_ {
        self.maps[ns.index()]
            .iter()
            .map(|(name, id)| (name.as_str(), *id))
    }

    /// All ids, namespace by namespace
    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.maps.iter().flat_map(|map| map.values().copied())
    }

    pub fn len(&self) -> usize {
        self.maps.iter().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.iter().all(IndexMap::is_empty)
    }
}
