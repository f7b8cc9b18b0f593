//! The component dependency solver.
//!
//! Given the declared components of an entity (plus the controller-wide
//! defaults), the solver produces the *full component set*: the declared set
//! closed transitively over the `implies` relation, order-preserving and
//! de-duplicated, validated against every component's `requires` and
//! `conflicts` tables.
//!
//! Expansion, requirement checking and conflict checking are separate passes
//! so each failure names exactly the two components involved. Implied
//! components are added *before* requirements are checked, so a dependency
//! satisfied via implication does not spuriously fail.
//!
//! The solve runs once per unique component combination; callers memoize the
//! result through the template cache.

use crate::ecs::{
    Error, Result,
    component::{Id, Registry},
};

/// Compute and validate the full component set for `defaults ∪ declared`.
///
/// The returned order is insertion order: defaults first, then the declared
/// components, then implied components in the order the expansion discovers
/// them.
pub fn solve(registry: &Registry, defaults: &[Id], declared: &[Id]) -> Result<Vec<Id>> {
    let mut full: Vec<Id> = Vec::with_capacity(defaults.len() + declared.len());
    for &id in defaults.iter().chain(declared) {
        push_unique(&mut full, id);
    }

    if full.is_empty() {
        return Err(Error::EmptyComponentSet);
    }

    // Close over `implies`. The worklist grows at the tail, so transitively
    // implied components are visited in discovery order.
    let mut cursor = 0;
    while cursor < full.len() {
        let relations = registry.relations(full[cursor]);
        for &implied in &relations.implies {
            push_unique(&mut full, implied);
        }
        cursor += 1;
    }

    // Requirement pass.
    for &id in &full {
        let relations = registry.relations(id);
        for &required in &relations.requires {
            if !full.contains(&required) {
                return Err(Error::MissingDependency {
                    required: registry.name_of(required),
                    required_by: registry.name_of(id),
                });
            }
        }
    }

    // Conflict pass.
    for &id in &full {
        let relations = registry.relations(id);
        for &conflict in &relations.conflicts {
            if full.contains(&conflict) {
                return Err(Error::ConflictingComponents {
                    component: registry.name_of(id),
                    conflicts_with: registry.name_of(conflict),
                });
            }
        }
    }

    Ok(full)
}

#[inline]
fn push_unique(ids: &mut Vec<Id>, id: Id) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
