//! Fusion classes.
//!
//! An individual asserted into several classes gets a synthetic class whose
//! bases are exactly that set. Fusion classes are memoized by the canonical
//! (sorted, deduplicated) identifier list, so individuals with equal type sets
//! share one object, and the same set always maps back to the same object.

use std::collections::HashMap;

use tracing::debug;

use crate::entity::Entity;
use crate::iri::Iri;
use crate::registry::EntityRegistry;
use crate::vocab;

/// Canonical memo key: sorted, deduplicated class identifiers.
pub type FusionKey = Vec<Iri>;

/// Outcome of re-deriving an individual's live type.
#[derive(Debug, Clone)]
pub struct Rebind {
    /// The class the individual is now bound to.
    pub class: Entity,
    /// True if a fusion class was allocated by this call.
    pub created: bool,
    /// True if the binding differs from the previous one.
    pub changed: bool,
}

/// Memoizes fusion classes and tracks the live type of every individual.
#[derive(Debug, Default)]
pub struct FusionClassManager {
    by_key: HashMap<FusionKey, Entity>,
    bindings: HashMap<Iri, Entity>,
}

/// Expands nested fusion classes, sorts by identifier and removes duplicates.
#[must_use]
pub fn canonicalize(types: &[Entity]) -> Vec<Entity> {
    let mut out: Vec<Entity> = Vec::with_capacity(types.len());
    for class in types {
        match class.fusion_bases() {
            Some(bases) => out.extend(bases.iter().cloned()),
            None => out.push(class.clone()),
        }
    }
    out.sort_by(|a, b| a.iri().cmp(b.iri()));
    out.dedup_by(|a, b| a.iri() == b.iri());
    out
}

fn fusion_iri(key: &[Iri]) -> Iri {
    let mut hasher = blake3::Hasher::new();
    for iri in key {
        hasher.update(iri.as_str().as_bytes());
        hasher.update(b"\n");
    }
    Iri::new_unchecked(&format!("{}{}", vocab::FUSION_PREFIX, hasher.finalize().to_hex()))
}

impl FusionClassManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the class representing exactly `types`.
    ///
    /// An empty set maps to `thing`, a singleton to its only member, anything
    /// larger to the memoized fusion class. The boolean is true when a fusion
    /// class was allocated.
    pub fn class_for(
        &mut self,
        types: &[Entity],
        registry: &mut EntityRegistry,
        thing: &Entity,
    ) -> (Entity, bool) {
        let canonical = canonicalize(types);
        match canonical.len() {
            0 => (thing.clone(), false),
            1 => (canonical[0].clone(), false),
            _ => {
                let key: FusionKey = canonical.iter().map(|c| c.iri().clone()).collect();
                if let Some(existing) = self.by_key.get(&key) {
                    return (existing.clone(), false);
                }
                let iri = fusion_iri(&key);
                let class = registry.insert_fusion(iri, canonical);
                debug!(fusion = %class.iri(), bases = key.len(), "allocated fusion class");
                self.by_key.insert(key, class.clone());
                (class, true)
            }
        }
    }

    /// Recomputes the live type of `individual` from its asserted types.
    pub fn rebind(
        &mut self,
        individual: &Iri,
        types: &[Entity],
        registry: &mut EntityRegistry,
        thing: &Entity,
    ) -> Rebind {
        let (class, created) = self.class_for(types, registry, thing);
        let previous = self.bindings.insert(individual.clone(), class.clone());
        let changed = previous.map_or(true, |p| !p.same(&class));
        if changed {
            debug!(individual = %individual, class = ?class, "rebound individual");
        }
        Rebind {
            class,
            created,
            changed,
        }
    }

    /// The live type of an individual, if bound.
    #[must_use]
    pub fn type_of(&self, individual: &Iri) -> Option<Entity> {
        self.bindings.get(individual).cloned()
    }

    /// Forgets the binding of an individual, returning its former live type.
    pub fn unbind(&mut self, individual: &Iri) -> Option<Entity> {
        self.bindings.remove(individual)
    }

    /// Looks up a memoized fusion class without allocating one.
    #[must_use]
    pub fn lookup(&self, types: &[Entity]) -> Option<Entity> {
        let key: FusionKey = canonicalize(types).iter().map(|c| c.iri().clone()).collect();
        self.by_key.get(&key).cloned()
    }

    /// Drops fusion classes that mention any of `removed`, returning their identifiers.
    pub fn purge(&mut self, removed: &[Iri], registry: &mut EntityRegistry) -> Vec<Iri> {
        let stale: Vec<FusionKey> = self
            .by_key
            .keys()
            .filter(|key| key.iter().any(|iri| removed.contains(iri)))
            .cloned()
            .collect();
        let mut dropped = Vec::with_capacity(stale.len());
        for key in stale {
            if let Some(class) = self.by_key.remove(&key) {
                registry.remove(class.iri());
                dropped.push(class.iri().clone());
            }
        }
        self.bindings.retain(|individual, class| {
            !removed.contains(individual) && !dropped.contains(class.iri())
        });
        dropped
    }

    /// Every memoized fusion class, ordered by identifier.
    #[must_use]
    pub fn fusion_classes(&self) -> Vec<Entity> {
        let mut out: Vec<Entity> = self.by_key.values().cloned().collect();
        out.sort_by(|a, b| a.iri().cmp(b.iri()));
        out
    }

    /// Snapshot of individual bindings, ordered by individual.
    #[must_use]
    pub fn mappings(&self) -> Vec<(Iri, Entity)> {
        let mut out: Vec<(Iri, Entity)> = self
            .bindings
            .iter()
            .map(|(iri, class)| (iri.clone(), class.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Number of memoized fusion classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns true if no fusion class is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
