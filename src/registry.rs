//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Serialising values known only through a base-type handle.
//!
//! A `Registry<B>` maps display names to concrete types reachable through
//! the base `B` (typically a trait object like `dyn Shape`), and back. It is
//! an explicit value: call sites construct one, populate it with
//! `register`, and pass it by reference wherever polymorphic values occur —
//! there is no hidden process-wide state. Registration returns a guard whose
//! drop deregisters the type again, so a registration's lifetime is exactly
//! the guard's.
//!
//! On the wire a polymorphic value is a node with two named children:
//! `specialization`, the registered display name, and `content`, the
//! concrete value's own fields. Serialising looks the entry up by the
//! value's runtime type and forwards the write context to the entry's
//! forwarding function, which narrows to the concrete type and runs its own
//! `Serialize` impl — the generic engine only knows `B` statically, so this
//! double dispatch is what reaches code defined on the concrete type.
//! Deserialising reads the name, builds a fresh instance with the entry's
//! constructor and populates it the same way.
//!
//! Lookups happen on every polymorphic value while registration typically
//! happens once at startup, so the tables sit behind a read-write lock.
//!
//! ```
//! use larch::{Deserializer, Registry, Serializer};
//! use larch::registry::AnyValue;
//! use larch::larch_struct;
//!
//! trait Shape: AnyValue {}
//!
//! #[derive(Default)]
//! struct Circle { radius: u32 }
//! impl Shape for Circle {}
//! larch_struct!(Circle { radius });
//!
//! let registry = Registry::<dyn Shape>::new();
//! let _reg = registry.register::<Circle>(
//!     "Circle", || Box::new(Circle::default()))?;
//!
//! let mut ser = Serializer::new()?;
//! let shape: Box<dyn Shape> = Box::new(Circle { radius: 3 });
//! registry.serialize(ser.field("shape")?, &*shape)?;
//! let bytes = ser.finish();
//!
//! let mut de = Deserializer::new(&bytes)?;
//! let mut restored: Option<Box<dyn Shape>> = None;
//! registry.deserialize(&mut de.field("shape")?, &mut restored)?;
//! assert!(restored.is_some());
//! # Ok::<(), larch::Error>(())
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace};

use crate::de::Deserialize;
use crate::error::{Error, Result};
use crate::reader;
use crate::ser::Serialize;
use crate::wire;
use crate::writer;

/// Exposes a value's concrete `Any` identity through a base-type handle.
///
/// A trait meant to serve as a polymorphic base must declare this as a
/// supertrait (`trait Shape: AnyValue`); the blanket impl covers every
/// `'static` concrete type, so implementors need to do nothing further.
pub trait AnyValue: Any {
    /// This value as `Any`, for concrete-type identification and narrowing.
    fn as_any(&self) -> &dyn Any;
    /// Mutable counterpart of `as_any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// The concrete type's name, for diagnostics only.
    fn concrete_name(&self) -> &'static str;
}

impl<T: Any> AnyValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn concrete_name(&self) -> &'static str {
        ::std::any::type_name::<T>()
    }
}

/// Constructs a default instance of a registered concrete type, already
/// widened to the base handle.
pub type BuildFn<B> = fn() -> Box<B>;

type EncodeFn<B> = for<'a> fn(&B, &mut writer::Node<'a>) -> Result<()>;
type DecodeFn<B> = for<'de> fn(&mut B, &mut reader::Node<'de>) -> Result<()>;

/// One registered (name, concrete type) entry.
///
/// Holds the owning constructor plus one forwarding function per format
/// direction; a further backend would add its own pair of slots here.
struct Entry<B: ?Sized> {
    name: String,
    type_id: TypeId,
    build: BuildFn<B>,
    encode: EncodeFn<B>,
    decode: DecodeFn<B>,
}

struct Tables<B: ?Sized> {
    by_name: HashMap<String, Arc<Entry<B>>>,
    by_type: HashMap<TypeId, Arc<Entry<B>>>,
}

/// A name↔type registry for concrete types reachable through the base
/// handle `B`.
pub struct Registry<B: ?Sized> {
    tables: RwLock<Tables<B>>,
}

/// Keeps a `register` call in effect; dropping it removes the entry again.
#[must_use = "dropping a Registration immediately deregisters the type"]
pub struct Registration<'r, B: ?Sized + AnyValue> {
    registry: &'r Registry<B>,
    type_id: TypeId,
    name: String,
}

impl<B: ?Sized + AnyValue> Registry<B> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            tables: RwLock::new(Tables {
                by_name: HashMap::new(),
                by_type: HashMap::new(),
            }),
        }
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, Tables<B>> {
        match self.tables.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, Tables<B>> {
        match self.tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Registers the concrete type `D` under the given display name.
    ///
    /// `build` constructs the instance that deserialisation populates; it
    /// must produce a `D`, widened to the base handle. Registering a name or
    /// concrete type twice is an error. The entry lives until the returned
    /// guard is dropped.
    pub fn register<D>(&self, name: &str, build: BuildFn<B>)
                       -> Result<Registration<'_, B>>
    where D: Serialize + Deserialize + Any {
        let entry = Arc::new(Entry {
            name: name.to_owned(),
            type_id: TypeId::of::<D>(),
            build,
            encode: encode_erased::<B, D>,
            decode: decode_erased::<B, D>,
        });

        let mut tables = self.write_tables();
        if tables.by_name.contains_key(name)
            || tables.by_type.contains_key(&entry.type_id)
        {
            return Err(Error::DuplicateRegistration(name.to_owned()));
        }
        tables.by_name.insert(name.to_owned(), Arc::clone(&entry));
        tables.by_type.insert(entry.type_id, entry);

        debug!("registered specialization {:?} as {}",
               name, ::std::any::type_name::<D>());
        Ok(Registration {
            registry: self,
            type_id: TypeId::of::<D>(),
            name: name.to_owned(),
        })
    }

    fn deregister(&self, type_id: TypeId, name: &str) {
        let mut tables = self.write_tables();
        tables.by_name.remove(name);
        tables.by_type.remove(&type_id);
        debug!("deregistered specialization {:?}", name);
    }

    /// Serialises `value` through its registered entry, consuming `dst`.
    ///
    /// Writes the entry's display name as the `specialization` field and
    /// the concrete value's own fields under `content`. Fails with
    /// `Error::UnregisteredType` if `value`'s runtime type has no entry —
    /// a programming error on the caller's side, surfaced as a typed error.
    pub fn serialize(&self, dst: writer::Node<'_>, value: &B) -> Result<()> {
        let concrete = value.as_any().type_id();
        let entry = self.read_tables().by_type.get(&concrete).cloned()
            .ok_or_else(|| Error::UnregisteredType(value.concrete_name()))?;

        trace!("dispatching {:?} for serialisation", entry.name);
        dst.write(&PolyValue { entry: &*entry, value })
    }

    /// Serialises every element of `values` as one polymorphic sequence
    /// element of `dst`.
    pub fn serialize_seq<'v, I>(&self, dst: &mut writer::Node<'_>, values: I)
                                -> Result<()>
    where B: 'v, I: IntoIterator<Item = &'v B> {
        for value in values {
            self.serialize(dst.field_id(wire::SEQUENCE_MARKER), value)?;
        }
        Ok(())
    }

    /// Reconstructs an owned value from a polymorphic node.
    ///
    /// Reads the `specialization` name, builds a fresh instance via the
    /// entry's constructor and populates it from `content`. An absent node
    /// leaves `out` untouched; a name with no registered entry is
    /// `Error::UnknownSpecialization`.
    pub fn deserialize(&self, src: &mut reader::Node<'_>,
                       out: &mut Option<Box<B>>) -> Result<()> {
        if src.is_absent() {
            return Ok(());
        }

        let mut name = String::new();
        src.field("specialization")?.read(&mut name)?;

        let entry = self.read_tables().by_name.get(&name).cloned()
            .ok_or_else(|| Error::UnknownSpecialization(name.clone()))?;

        trace!("dispatching {:?} for deserialisation", entry.name);
        let mut value = (entry.build)();
        let mut content = src.field("content")?;
        (entry.decode)(&mut *value, &mut content)?;
        *out = Some(value);
        Ok(())
    }

    /// Reconstructs every polymorphic sequence element of `src`, in order.
    pub fn deserialize_seq(&self, src: &mut reader::Node<'_>)
                           -> Result<Vec<Box<B>>> {
        let mut out = Vec::with_capacity(src.seq_len()?);
        loop {
            let mut element = src.field_id(wire::SEQUENCE_MARKER)?;
            if element.is_absent() {
                return Ok(out);
            }
            let mut slot = None;
            self.deserialize(&mut element, &mut slot)?;
            if let Some(value) = slot {
                out.push(value);
            }
        }
    }
}

impl<B: ?Sized + AnyValue> Default for Registry<B> {
    fn default() -> Self {
        Registry::new()
    }
}

impl<'r, B: ?Sized + AnyValue> Drop for Registration<'r, B> {
    fn drop(&mut self) {
        self.registry.deregister(self.type_id, &self.name);
    }
}

fn encode_erased<B, D>(value: &B, dst: &mut writer::Node<'_>) -> Result<()>
where B: ?Sized + AnyValue, D: Serialize + Any {
    match value.as_any().downcast_ref::<D>() {
        Some(concrete) => concrete.serialize(dst),
        // Only reachable if an entry was somehow stored under the wrong
        // TypeId; treat it like the missing registration it is.
        None => Err(Error::UnregisteredType(value.concrete_name())),
    }
}

fn decode_erased<B, D>(value: &mut B, src: &mut reader::Node<'_>)
                       -> Result<()>
where B: ?Sized + AnyValue, D: Deserialize + Any {
    let name = (*value).concrete_name();
    match value.as_any_mut().downcast_mut::<D>() {
        Some(concrete) => concrete.deserialize(src),
        // The registration's build function produced a type other than D.
        None => Err(Error::UnregisteredType(name)),
    }
}

/// Serialises as the `specialization`/`content` field pair; routed through
/// `Node::write` so polymorphic values take the same rule-1 path as any
/// other type with its own `Serialize` impl.
struct PolyValue<'v, B: ?Sized> {
    entry: &'v Entry<B>,
    value: &'v B,
}

impl<'v, B: ?Sized> Serialize for PolyValue<'v, B> {
    fn serialize(&self, dst: &mut writer::Node<'_>) -> Result<()> {
        dst.field("specialization")?.write(self.entry.name.as_str())?;
        dst.field("content")?.write(&Forwarded {
            encode: self.entry.encode,
            value: self.value,
        })
    }
}

struct Forwarded<'v, B: ?Sized> {
    encode: EncodeFn<B>,
    value: &'v B,
}

impl<'v, B: ?Sized> Serialize for Forwarded<'v, B> {
    fn serialize(&self, dst: &mut writer::Node<'_>) -> Result<()> {
        (self.encode)(self.value, dst)
    }
}
