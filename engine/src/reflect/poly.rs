//! Polymorphic reflection: the derived-class registry and [`PolyStorage`].
//!
//! Derived classes are registered per base during program startup, normally
//! through [`poly_register!`](crate::poly_register). On the first query the
//! registry *finalizes*: every pending base's class list is sorted by derived
//! name, adjacent duplicates abort, and each entry receives its position as a
//! stable index. From then on the registry is immutable; registering anything
//! else aborts. Those aborts are deliberate panics - a mis-registered class
//! table is an unrecoverable misconfiguration, not a recoverable error.
//!
//! The stable index is what goes on the wire in binary form: a little-endian
//! u16, with `0xFFFF` reserved for the null storage. That bounds the number
//! of derived classes per base at `u16::MAX - 1`.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use log::debug;

use crate::reflect::{
    ErrorKind, FromBinaryOptions, FromStringOptions, Input, Output, Reflect, Result,
    ToStringOptions,
};

/// The wire representation of "no object".
const NULL_INDEX: u16 = u16::MAX;

/// Supertrait required of polymorphic base traits; provides the downcast
/// hooks the dispatch records are built on. Blanket-implemented for every
/// `'static` type, so declaring `trait MyBase: PolyBase` is all a base needs.
pub trait PolyBase: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> PolyBase for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The four serializer entry points of one derived class, dispatching through
/// the concrete type.
struct PolyVtable<B: ?Sized> {
    write_text: fn(&B, &mut Output, &ToStringOptions) -> Result<()>,
    read_text: fn(&mut B, &mut Input<'_>, &FromStringOptions) -> Result<()>,
    write_binary: fn(&B, &mut Output) -> Result<()>,
    read_binary: fn(&mut B, &mut Input<'_>, &FromBinaryOptions) -> Result<()>,
}

/// The dispatch record of one derived class of base `B`.
pub struct PolyEntry<B: ?Sized> {
    name: &'static str,
    derived_type: TypeId,
    /// The stable index, written back at finalization.
    index: OnceLock<u16>,
    factory: fn() -> Box<B>,
    wrap: fn(Box<dyn Any>) -> Box<B>,
    vtable: PolyVtable<B>,
}

impl<B: ?Sized + PolyBase> PolyEntry<B> {
    fn new<D: Reflect + Any>(
        name: &'static str,
        factory: fn() -> Box<B>,
        wrap: fn(Box<dyn Any>) -> Box<B>,
    ) -> Self {
        Self {
            name,
            derived_type: TypeId::of::<D>(),
            index: OnceLock::new(),
            factory,
            wrap,
            vtable: PolyVtable {
                write_text: |base, out, options| downcast::<B, D>(base).write_text(out, options),
                read_text: |base, input, options| {
                    downcast_mut::<B, D>(base).read_text(input, options)
                },
                write_binary: |base, out| downcast::<B, D>(base).write_binary(out),
                read_binary: |base, input, options| {
                    downcast_mut::<B, D>(base).read_binary(input, options)
                },
            },
        }
    }

    fn stable_index(&self) -> u16 {
        *self
            .index
            .get()
            .expect("stable indices are assigned at finalization")
    }
}

fn downcast<B: ?Sized + PolyBase, D: Any>(base: &B) -> &D {
    base.as_any()
        .downcast_ref::<D>()
        .expect("dispatch record matches the stored class")
}

fn downcast_mut<B: ?Sized + PolyBase, D: Any>(base: &mut B) -> &mut D {
    base.as_any_mut()
        .downcast_mut::<D>()
        .expect("dispatch record matches the stored class")
}

/// Type-erased view of a [`PolyEntry`], for finalization.
trait AnyEntry: Any + Send + Sync {
    fn name(&self) -> &'static str;
    fn derived_type(&self) -> TypeId;
    fn assign_index(&self, index: u16);
    fn as_any(&self) -> &dyn Any;
}

impl<B: ?Sized + 'static> AnyEntry for PolyEntry<B> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn derived_type(&self) -> TypeId {
        self.derived_type
    }

    fn assign_index(&self, index: u16) {
        let _ = self.index.set(index);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct PendingBase {
    base_type: TypeId,
    base_name: &'static str,
    entries: Vec<&'static dyn AnyEntry>,
}

struct PendingRegistry {
    finalized: bool,
    bases: Vec<PendingBase>,
}

static PENDING: Mutex<PendingRegistry> = Mutex::new(PendingRegistry {
    finalized: false,
    bases: Vec::new(),
});

struct FinalBase {
    entries: Vec<&'static dyn AnyEntry>,
    by_type: HashMap<TypeId, u16>,
}

static FINALIZED: OnceLock<HashMap<TypeId, FinalBase>> = OnceLock::new();

/// Register the derived class `D` for the base `B`.
///
/// Must happen during program startup, before the registry is queried for the
/// first time. Prefer [`poly_register!`](crate::poly_register), which supplies
/// the factory and wrapper with the right trait-object coercions.
///
/// # Panics
/// After finalization, or when the per-base class limit is reached.
pub fn register<B, D>(
    name: &'static str,
    factory: fn() -> Box<B>,
    wrap: fn(Box<dyn Any>) -> Box<B>,
) where
    B: ?Sized + PolyBase,
    D: Reflect + Any,
{
    let mut pending = PENDING.lock().unwrap();
    if pending.finalized {
        panic!("attempt to register polymorphic class `{name}` after class lists were finalized");
    }

    let base_type = TypeId::of::<B>();
    let base_index = match pending.bases.iter().position(|b| b.base_type == base_type) {
        Some(index) => index,
        None => {
            pending.bases.push(PendingBase {
                base_type,
                base_name: type_name::<B>(),
                entries: Vec::new(),
            });
            pending.bases.len() - 1
        }
    };
    let base = &mut pending.bases[base_index];

    // One index value is reserved for null.
    if base.entries.len() >= NULL_INDEX as usize - 1 {
        panic!(
            "attempt to register too many polymorphic classes for base `{}`",
            base.base_name
        );
    }

    let entry: &'static PolyEntry<B> = Box::leak(Box::new(PolyEntry::new::<D>(name, factory, wrap)));
    base.entries.push(entry);
}

/// Finalize the pending registrations (once) and return the class tables.
fn finalized() -> &'static HashMap<TypeId, FinalBase> {
    FINALIZED.get_or_init(|| {
        let mut pending = PENDING.lock().unwrap();
        pending.finalized = true;

        let mut tables = HashMap::new();
        for base in pending.bases.drain(..) {
            let mut entries = base.entries;
            entries.sort_by_key(|entry| entry.name());
            for pair in entries.windows(2) {
                if pair[0].name() == pair[1].name() {
                    panic!(
                        "duplicate derived class `{}` registered for base `{}`",
                        pair[0].name(),
                        base.base_name
                    );
                }
            }

            let mut by_type = HashMap::new();
            for (index, entry) in entries.iter().enumerate() {
                entry.assign_index(index as u16);
                by_type.insert(entry.derived_type(), index as u16);
            }

            debug!(
                "finalized polymorphic base `{}` with {} derived classes",
                base.base_name,
                entries.len()
            );
            tables.insert(base.base_type, FinalBase { entries, by_type });
        }
        tables
    })
}

fn base_table<B: ?Sized + 'static>() -> Option<&'static FinalBase> {
    finalized().get(&TypeId::of::<B>())
}

fn entry_for<B: ?Sized + PolyBase>(index: u16) -> Option<&'static PolyEntry<B>> {
    let table = base_table::<B>()?;
    let entry = *table.entries.get(index as usize)?;
    entry.as_any().downcast_ref::<PolyEntry<B>>()
}

/// The number of registered derived classes for the base `B`.
pub fn derived_count<B: ?Sized + 'static>() -> usize {
    base_table::<B>().map_or(0, |table| table.entries.len())
}

/// The stable index of the derived class named `name`, if any.
pub fn name_to_index<B: ?Sized + 'static>(name: &str) -> Option<u16> {
    let table = base_table::<B>()?;
    table
        .entries
        .binary_search_by(|entry| entry.name().cmp(name))
        .ok()
        .map(|index| index as u16)
}

/// Construct a fresh default instance of the derived class with the given
/// stable index.
pub fn construct_from_index<B: ?Sized + PolyBase>(index: u16) -> Result<PolyStorage<B>> {
    match entry_for::<B>(index) {
        Some(entry) => Ok(PolyStorage {
            inner: Some(((entry.factory)(), entry)),
        }),
        None => Err(ErrorKind::InvalidClassIndex(index).into()),
    }
}

/// Construct a fresh default instance of the derived class with the given
/// name.
pub fn construct_from_name<B: ?Sized + PolyBase>(name: &str) -> Result<PolyStorage<B>> {
    match name_to_index::<B>(name) {
        Some(index) => construct_from_index(index),
        None => Err(ErrorKind::UnknownClassName(name.to_string()).into()),
    }
}

/// A value-semantic owner of a heap instance of a registered derived class of
/// `B`, carrying the class's dispatch record. Null is a distinct value.
///
/// Text form: the literal `0` when null, otherwise the class name followed by
/// the instance. Binary form: the u16 stable index (`0xFFFF` = null), then
/// the instance.
pub struct PolyStorage<B: ?Sized + PolyBase> {
    inner: Option<(Box<B>, &'static PolyEntry<B>)>,
}

impl<B: ?Sized + PolyBase> PolyStorage<B> {
    /// The null storage.
    pub const fn null() -> Self {
        Self { inner: None }
    }

    /// Wrap a value of the registered derived class `D`.
    ///
    /// Fails if `D` was never registered for this base - the runtime stand-in
    /// for a compile-time registration check.
    pub fn new<D: Reflect + Any>(value: D) -> Result<Self> {
        let entry = base_table::<B>()
            .and_then(|table| table.by_type.get(&TypeId::of::<D>()).copied())
            .and_then(entry_for::<B>)
            .ok_or(ErrorKind::UnregisteredClass(type_name::<D>()))?;
        Ok(Self {
            inner: Some(((entry.wrap)(Box::new(value)), entry)),
        })
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// The registered name of the stored class, or None when null.
    pub fn name(&self) -> Option<&'static str> {
        self.inner.as_ref().map(|(_, entry)| entry.name)
    }

    /// The stable index of the stored class, or None when null.
    pub fn index(&self) -> Option<u16> {
        self.inner.as_ref().map(|(_, entry)| entry.stable_index())
    }

    /// The stored instance through the base.
    pub fn base(&self) -> Option<&B> {
        self.inner.as_ref().map(|(boxed, _)| boxed.as_ref())
    }

    /// The stored instance through the base, mutably.
    pub fn base_mut(&mut self) -> Option<&mut B> {
        self.inner.as_mut().map(|(boxed, _)| boxed.as_mut())
    }

    /// The stored instance downcast to a concrete derived class.
    pub fn derived<D: Any>(&self) -> Option<&D> {
        self.base()?.as_any().downcast_ref::<D>()
    }

    /// The stored instance downcast to a concrete derived class, mutably.
    pub fn derived_mut<D: Any>(&mut self) -> Option<&mut D> {
        self.base_mut()?.as_any_mut().downcast_mut::<D>()
    }
}

impl<B: ?Sized + PolyBase> Default for PolyStorage<B> {
    /// The null storage.
    fn default() -> Self {
        Self::null()
    }
}

impl<B: ?Sized + PolyBase> std::fmt::Debug for PolyStorage<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PolyStorage")
            .field(&self.name().unwrap_or("<null>"))
            .finish()
    }
}

impl<B: ?Sized + PolyBase> Reflect for PolyStorage<B> {
    fn write_text(&self, out: &mut Output, options: &ToStringOptions) -> Result<()> {
        match &self.inner {
            None => {
                // `0` is not a valid identifier, so it can't collide with a
                // class name.
                out.write_str("0");
                Ok(())
            }
            Some((boxed, entry)) => {
                out.write_str(entry.name);
                if options.pretty {
                    out.write_char(' ');
                }
                (entry.vtable.write_text)(boxed.as_ref(), out, options)
            }
        }
    }

    fn read_text(&mut self, input: &mut Input<'_>, options: &FromStringOptions) -> Result<()> {
        // An identifier category that also accepts the `0` null marker.
        let name = input.extract("a class name", |b| b.is_ascii_alphanumeric() || b == b'_')?;
        if name == "0" {
            self.inner = None;
            return Ok(());
        }

        let Some(index) = name_to_index::<B>(&name) else {
            return Err(input.error(ErrorKind::UnknownClassName(name)));
        };
        let Some(entry) = entry_for::<B>(index) else {
            return Err(input.error(ErrorKind::InvalidClassIndex(index)));
        };

        let mut boxed = (entry.factory)();
        input.skip_whitespace_and_comments();
        (entry.vtable.read_text)(boxed.as_mut(), input, options)?;
        self.inner = Some((boxed, entry));
        Ok(())
    }

    fn write_binary(&self, out: &mut Output) -> Result<()> {
        match &self.inner {
            None => {
                out.write_u16_le(NULL_INDEX);
                Ok(())
            }
            Some((boxed, entry)) => {
                out.write_u16_le(entry.stable_index());
                (entry.vtable.write_binary)(boxed.as_ref(), out)
            }
        }
    }

    fn read_binary(&mut self, input: &mut Input<'_>, options: &FromBinaryOptions) -> Result<()> {
        let index = input.read_u16_le()?;
        if index == NULL_INDEX {
            self.inner = None;
            return Ok(());
        }

        let Some(entry) = entry_for::<B>(index) else {
            return Err(input.error(ErrorKind::InvalidClassIndex(index)));
        };
        let mut boxed = (entry.factory)();
        (entry.vtable.read_binary)(boxed.as_mut(), input, options)?;
        self.inner = Some((boxed, entry));
        Ok(())
    }
}

/// Register one or more derived classes for a polymorphic base trait:
///
/// ```ignore
/// poly_register!(StateBase { Initial, World });
/// ```
///
/// Each derived class must implement the base trait, `Reflect` (derived) and
/// `Default`. Call during program startup, before the first registry query.
#[macro_export]
macro_rules! poly_register {
    ($base:path { $($derived:ty),+ $(,)? }) => {
        $(
            $crate::reflect::poly::register::<dyn $base, $derived>(
                <$derived as $crate::reflect::structs::ReflectStruct>::DESCRIPTOR.name,
                || ::std::boxed::Box::new(<$derived as ::std::default::Default>::default())
                    as ::std::boxed::Box<dyn $base>,
                |any| match any.downcast::<$derived>() {
                    ::std::result::Result::Ok(value) => value as ::std::boxed::Box<dyn $base>,
                    ::std::result::Result::Err(_) => ::std::unreachable!(),
                },
            );
        )+
    };
}


#[cfg(test)]
mod tests {
    use super::test_support::{Bird, Creature, Spider, ensure_registered};
    use super::*;
    use crate::reflect::{from_binary, from_string, to_binary, to_string};

    #[derive(ember_macros::Reflect, Debug, Default, Clone, PartialEq)]
    struct Ghost {
        pub spook: u8,
    }

    impl Creature for Ghost {
        fn legs(&self) -> u32 {
            0
        }
    }

    #[test]
    fn finalization_sorts_by_name() {
        // Given
        ensure_registered();

        // Then - Bird sorts before Spider, so the stable indices follow.
        assert_eq!(derived_count::<dyn Creature>(), 2);
        assert_eq!(name_to_index::<dyn Creature>("Bird"), Some(0));
        assert_eq!(name_to_index::<dyn Creature>("Spider"), Some(1));
        assert_eq!(name_to_index::<dyn Creature>("Wolf"), None);
    }

    #[test]
    fn construct_by_name_and_index() {
        // Given
        ensure_registered();

        // When
        let by_name = construct_from_name::<dyn Creature>("Spider").unwrap();
        let by_index = construct_from_index::<dyn Creature>(0).unwrap();

        // Then
        assert_eq!(by_name.name(), Some("Spider"));
        assert_eq!(by_name.base().unwrap().legs(), 8);
        assert_eq!(by_index.name(), Some("Bird"));
        assert_eq!(
            construct_from_index::<dyn Creature>(42).unwrap_err().kind(),
            &ErrorKind::InvalidClassIndex(42)
        );
    }

    #[test]
    fn storage_wraps_registered_values() {
        // Given
        ensure_registered();

        // When
        let storage = PolyStorage::<dyn Creature>::new(Spider { venom: 1.5 }).unwrap();

        // Then
        assert_eq!(storage.name(), Some("Spider"));
        assert_eq!(storage.index(), Some(1));
        assert_eq!(storage.derived::<Spider>().unwrap().venom, 1.5);
        assert!(storage.derived::<Bird>().is_none());

        // And - Unregistered classes are refused.
        assert_eq!(
            PolyStorage::<dyn Creature>::new(Ghost { spook: 1 })
                .unwrap_err()
                .kind(),
            &ErrorKind::UnregisteredClass(std::any::type_name::<Ghost>())
        );
    }

    #[test]
    fn text_round_trip() {
        // Given
        ensure_registered();
        let storage = PolyStorage::<dyn Creature>::new(Spider { venom: 1.5 }).unwrap();

        // When
        let compact = to_string(&storage, &ToStringOptions::default()).unwrap();
        let pretty = to_string(&storage, &ToStringOptions::pretty(4)).unwrap();

        // Then
        assert_eq!(compact, "Spider{venom=1.5}");
        assert_eq!(pretty, "Spider {venom = 1.5}");

        let parsed = from_string::<PolyStorage<dyn Creature>>(&pretty).unwrap();
        assert_eq!(parsed.name(), Some("Spider"));
        assert_eq!(parsed.derived::<Spider>().unwrap().venom, 1.5);
    }

    #[test]
    fn null_forms() {
        // Given
        ensure_registered();
        let null = PolyStorage::<dyn Creature>::null();

        // Then
        assert_eq!(to_string(&null, &ToStringOptions::default()).unwrap(), "0");
        assert_eq!(to_binary(&null).unwrap(), vec![0xFF, 0xFF]);

        let parsed = from_string::<PolyStorage<dyn Creature>>("0").unwrap();
        assert!(parsed.is_null());
        let parsed = from_binary::<PolyStorage<dyn Creature>>(&[0xFF, 0xFF]).unwrap();
        assert!(parsed.is_null());
    }

    #[test]
    fn binary_round_trip() {
        // Given
        ensure_registered();
        let storage = PolyStorage::<dyn Creature>::new(Bird { wingspan: 2.0 }).unwrap();

        // When
        let bytes = to_binary(&storage).unwrap();

        // Then - Index 0 little-endian, then the payload.
        assert_eq!(&bytes[..2], &[0, 0]);
        let parsed = from_binary::<PolyStorage<dyn Creature>>(&bytes).unwrap();
        assert_eq!(parsed.derived::<Bird>().unwrap().wingspan, 2.0);
    }

    #[test]
    fn unknown_class_name_is_reported() {
        // Given
        ensure_registered();

        // Then
        assert_eq!(
            from_string::<PolyStorage<dyn Creature>>("Wolf{}")
                .unwrap_err()
                .kind(),
            &ErrorKind::UnknownClassName("Wolf".into())
        );
    }
}
