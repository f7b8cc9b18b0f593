use thiserror::Error;

/// Errors surfaced by the entity controller and its collaborators.
///
/// Every failed lookup or invariant violation surfaces at the caller; nothing
/// is swallowed. Variants that involve component types carry the component
/// names so diagnostics always point at both parties.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Configuration.
    #[error("attempt to reconfigure an entity controller")]
    AlreadyConfigured,
    #[error("refuse to configure an entity controller without any entity lists")]
    NoLists,
    #[error("can't change a controller config after it was used to configure a controller")]
    ConfigFrozen,
    #[error("refuse to create an entity that doesn't belong to any lists")]
    TemplateMatchesNoLists,

    // Component dependency solving.
    #[error("refuse to create an entity with zero components")]
    EmptyComponentSet,
    #[error("entity lacks component `{required}`, required by `{required_by}`")]
    MissingDependency {
        required: &'static str,
        required_by: &'static str,
    },
    #[error("component `{component}` conflicts with `{conflicts_with}`")]
    ConflictingComponents {
        component: &'static str,
        conflicts_with: &'static str,
    },

    // Entity creation.
    #[error("more than one override provided for component `{0}`")]
    DuplicateOverride(&'static str),
    #[error("this entity doesn't contain component `{0}`, but an override for it was provided")]
    OverrideForAbsentComponent(&'static str),
    #[error("entity allocation failed")]
    AllocationFailed,

    // Lookup.
    #[error("no component `{0}` in this entity")]
    ComponentNotFound(&'static str),
    #[error("attempt to use a null entity list handle")]
    NullHandle,
    #[error("entity list handle is out of range")]
    InvalidHandle,
    #[error("this entity is not alive")]
    EntityNotAlive,
    #[error("expected exactly one entity in the specified list, but got none")]
    ExpectedOneGotNone,
    #[error("expected exactly one entity in the specified list, but got more")]
    ExpectedOneGotMore,
    #[error("expected at least one entity in the specified list")]
    ExpectedAtLeastOne,
    #[error("expected at most one entity in the specified list")]
    ExpectedAtMostOne,

    // Creation by name.
    #[error("entity type `{0}` is already registered")]
    DuplicateNamedEntity(String),
    #[error("unknown entity type `{0}`")]
    UnknownEntityName(String),
}
