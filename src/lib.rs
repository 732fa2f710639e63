//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! larch is a compact, self-describing binary tree serialisation format.
//!
//! A document is a tree of nodes, each one an element ID, a content length
//! and the content itself — either raw scalar bytes or further nodes. IDs
//! for named fields are derived by hashing the field name, so documents
//! carry no schema and tolerate unknown or missing fields: anything absent
//! on read simply keeps its prior (usually default) value, which is the
//! format's whole schema-evolution story. Every document opens with a
//! self-describing header naming the format version, the hashed-ID width
//! and a content-type literal.
//!
//! # Writing and reading
//!
//! ```
//! use larch::{Deserializer, Serializer};
//! use std::collections::BTreeMap;
//!
//! let mut map = BTreeMap::new();
//! map.insert("hallo".to_owned(), "welt".to_owned());
//!
//! let mut ser = Serializer::new()?;
//! ser.field("map")?.write(&map)?;
//! ser.field("vec")?.write(&vec![0i32, -129, 256])?;
//! let bytes = ser.finish();
//!
//! let mut de = Deserializer::new(&bytes)?;
//! let mut restored_vec = Vec::<i32>::new();
//! de.field("vec")?.read(&mut restored_vec)?;
//! assert_eq!(vec![0, -129, 256], restored_vec);
//! # Ok::<(), larch::Error>(())
//! ```
//!
//! User types participate by implementing `Serialize` and `Deserialize`
//! (usually via `larch_struct!` or `larch_enum!`); a type's own impl always
//! takes precedence over the built-in container rules, which is also the
//! hook the polymorphic `registry` uses to reconstruct values known only
//! through a base-type handle.
//!
//! # Limitations
//!
//! Encoding and decoding recurse to the depth of the value graph, and
//! cyclic graphs reachable through owned handles are not detected; they
//! will recurse without bound. Hashed field IDs are not guaranteed
//! collision-free across distinct names — collisions are overwhelmingly
//! unlikely within a struct but are accepted by design rather than
//! detected.

#![deny(missing_docs)]

pub mod error;
pub mod wire;
pub mod writer;
pub mod reader;
pub mod ser;
pub mod de;
pub mod registry;
mod sugar;

#[cfg(test)]
mod test_helpers;

pub use crate::de::Deserialize;
pub use crate::error::{Error, Result};
pub use crate::reader::Deserializer;
pub use crate::registry::{AnyValue, Registration, Registry};
pub use crate::ser::Serialize;
pub use crate::writer::Serializer;
