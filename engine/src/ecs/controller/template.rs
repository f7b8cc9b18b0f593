//! Entity templates.
//!
//! A template caches, for one component combination, everything creation
//! needs: the solved [`Shape`] and the handles of the lists whose predicates
//! match it. Constructing a template examines every configured list, so
//! templates should be cached - either manually or through [`TemplateCache`].
//!
//! Templates work with any controller configured from the same config (same
//! lists, same defaults).

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use log::debug;

use crate::ecs::component::{Id, IntoSpec, Set, registry, solver};
use crate::ecs::controller::{Allocator, Controller, Membership, Predicate};
use crate::ecs::entity::{Entity, Shape};
use crate::ecs::list::ListHandle;
use crate::ecs::{Error, Result};

/// All information necessary to create an entity of one component
/// combination, for a specific controller configuration.
pub struct Template {
    shape: Arc<Shape>,
    handles: Vec<ListHandle>,
}

impl Template {
    /// The handles of the lists this template's entities are linked into, in
    /// splice order.
    #[inline]
    pub fn handles(&self) -> &[ListHandle] {
        &self.handles
    }

    /// The solved full component set.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub(crate) fn shape_arc(&self) -> &Arc<Shape> {
        &self.shape
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("components", &self.shape.component_count())
            .field("handles", &self.handles)
            .finish()
    }
}

/// Solve the component set for `S` and match it against the configured lists.
fn build_template<S: IntoSpec>(predicates: &[&Predicate], defaults: &[Id]) -> Result<Template> {
    let declared = S::component_ids(registry());
    let full = solver::solve(registry(), defaults, &declared)?;
    let shape = Shape::new(registry(), &full);

    let membership = Membership {
        shape: shape.as_ref(),
    };
    let mut handles = Vec::new();
    for (index, predicate) in predicates.iter().enumerate() {
        if (predicate.as_ref())(&membership) {
            handles.push(ListHandle::from_index(index));
        }
    }

    // Also rejected at creation time; catching it here gives the caller the
    // diagnostic at template-construction time.
    if handles.is_empty() {
        return Err(Error::TemplateMatchesNoLists);
    }

    Ok(Template { shape, handles })
}

impl<A: Allocator> Controller<A> {
    /// Make an entity template for the component combination `S`.
    ///
    /// This examines every configured list; cache the result.
    pub fn make_template<S: IntoSpec>(&self) -> Result<Template> {
        let predicates: Vec<&Predicate> = self.predicates().collect();
        build_template::<S>(&predicates, self.default_ids())
    }

    /// Create an entity, grabbing its template from a cache (and putting it
    /// there on first use).
    pub fn create_cached<S: IntoSpec>(
        &mut self,
        cache: &mut TemplateCache,
        overrides: impl Set,
    ) -> Result<Entity> {
        let template = cache.get_or_make::<S, A>(self)?;
        self.create(&template, overrides)
    }

    /// Create an entity by the name it was registered under with
    /// [`register_named_entity`]. All components are value-initialized.
    pub fn create_by_name(&mut self, cache: &mut TemplateCache, name: &str) -> Result<Entity> {
        let entry = named_entities()
            .read()
            .unwrap()
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownEntityName(name.to_string()))?;
        let template = cache.get_or_build(entry.type_key, || {
            let predicates: Vec<&Predicate> = self.predicates().collect();
            (entry.build)(&predicates, self.default_ids())
        })?;
        self.create(&template, ())
    }
}

/// The default template cache: a map from the component-combination key to
/// its template. The first miss computes and inserts.
#[derive(Default)]
pub struct TemplateCache {
    map: HashMap<TypeId, Arc<Template>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached template for `S`, computing it from the controller on a miss.
    pub fn get_or_make<S: IntoSpec, A: Allocator>(
        &mut self,
        controller: &Controller<A>,
    ) -> Result<Arc<Template>> {
        self.get_or_build(TypeId::of::<S>(), || controller.make_template::<S>())
    }

    pub(crate) fn get_or_build(
        &mut self,
        key: TypeId,
        build: impl FnOnce() -> Result<Template>,
    ) -> Result<Arc<Template>> {
        if let Some(template) = self.map.get(&key) {
            return Ok(Arc::clone(template));
        }
        let template = Arc::new(build()?);
        self.map.insert(key, Arc::clone(&template));
        Ok(template)
    }
}

#[derive(Clone, Copy)]
struct NamedEntry {
    type_key: TypeId,
    build: fn(&[&Predicate], &[Id]) -> Result<Template>,
}

fn named_entities() -> &'static RwLock<HashMap<String, NamedEntry>> {
    static NAMED: OnceLock<RwLock<HashMap<String, NamedEntry>>> = OnceLock::new();
    NAMED.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register the component combination `S` for creation by name via
/// [`Controller::create_by_name`]. Names are process-global; registering the
/// same name twice fails.
pub fn register_named_entity<S: IntoSpec>(name: impl Into<String>) -> Result<()> {
    let name = name.into();
    let mut map = named_entities().write().unwrap();
    if map.contains_key(&name) {
        return Err(Error::DuplicateNamedEntity(name));
    }
    debug!("registered entity type `{name}` for creation by name");
    map.insert(
        name,
        NamedEntry {
            type_key: TypeId::of::<S>(),
            build: build_template::<S>,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use ember_macros::Component;

    use super::*;
    use crate::ecs::controller::{ControllerConfig, has_components};

    #[derive(Component, Default)]
    struct Husk;

    #[derive(Component, Default)]
    struct Crystal;

    fn configured() -> (Controller, ListHandle) {
        let mut config = ControllerConfig::new();
        let all = config.add_list(has_components::<Husk>()).unwrap();
        let mut controller = Controller::new();
        config.configure(&mut controller).unwrap();
        (controller, all)
    }

    #[test]
    fn cache_computes_once() {
        // Given
        let (controller, _all) = configured();
        let mut cache = TemplateCache::new();

        // When
        let first = cache.get_or_make::<Husk, _>(&controller).unwrap();
        let second = cache.get_or_make::<Husk, _>(&controller).unwrap();

        // Then - The second lookup hits the cache.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn template_matching_no_lists_is_refused() {
        // Given
        let (controller, _all) = configured();

        // When - Crystal doesn't satisfy the only list's predicate.
        let err = controller.make_template::<Crystal>().unwrap_err();

        // Then
        assert_eq!(err, Error::TemplateMatchesNoLists);
    }

    #[test]
    fn create_by_name() {
        // Given
        let (mut controller, all) = configured();
        let mut cache = TemplateCache::new();
        register_named_entity::<Husk>("TemplateTestHusk").unwrap();

        // When
        let entity = controller
            .create_by_name(&mut cache, "TemplateTestHusk")
            .unwrap();

        // Then
        assert!(controller.entity(entity).unwrap().has::<Husk>());
        assert_eq!(controller.list(all).unwrap().len(), 1);

        // And - Unknown names are reported.
        assert_eq!(
            controller.create_by_name(&mut cache, "NoSuchEntity"),
            Err(Error::UnknownEntityName("NoSuchEntity".into()))
        );
    }

    #[test]
    fn duplicate_name_is_refused() {
        // Given
        register_named_entity::<Husk>("TemplateTestDupe").unwrap();

        // Then
        assert_eq!(
            register_named_entity::<Crystal>("TemplateTestDupe"),
            Err(Error::DuplicateNamedEntity("TemplateTestDupe".into()))
        );
    }
}
