//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Defines the trait and built-in impls for high-level deserialisation.
//!
//! Deserialisation populates values in place: `reader::Node::read` is a
//! no-op on the absent sentinel, so a field that was never written leaves
//! the target at whatever it already held. That contract is why the trait
//! takes `&mut self` instead of constructing fresh values — the caller's
//! default *is* the fallback.
//!
//! The dispatch rules mirror `ser` exactly; see that module for the
//! priority order.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet,
                       LinkedList, VecDeque};
use std::hash::{BuildHasher, Hash};
use std::str;

use crate::error::{Error, Result};
use crate::reader::Node;

/// Trait for values that can be populated from a read context.
pub trait Deserialize {
    /// Populates this value from the given (present) context.
    ///
    /// Implementations may assume the node is present: `Node::read` handles
    /// the absent sentinel before dispatching here.
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()>;
}

impl<T: Deserialize + ?Sized> Deserialize for Box<T> {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        (**self).deserialize(src)
    }
}

/// Any non-zero content decodes to `true`; empty content is `false`.
impl Deserialize for bool {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        *self = src.bytes().iter().any(|&b| b != 0);
        Ok(())
    }
}

macro_rules! des_uint {
    ($ty:ty) => {
        impl Deserialize for $ty {
            fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
                let value = src.uint()?;
                *self = <$ty>::try_from(value)
                    .map_err(|_| Error::IntegerOutOfRange(stringify!($ty)))?;
                Ok(())
            }
        }
    }
}
des_uint!(u8);
des_uint!(u16);
des_uint!(u32);
des_uint!(u64);
des_uint!(usize);

macro_rules! des_int {
    ($ty:ty) => {
        impl Deserialize for $ty {
            fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
                let value = src.int()?;
                *self = <$ty>::try_from(value)
                    .map_err(|_| Error::IntegerOutOfRange(stringify!($ty)))?;
                Ok(())
            }
        }
    }
}
des_int!(i8);
des_int!(i16);
des_int!(i32);
des_int!(i64);
des_int!(isize);

impl Deserialize for f32 {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        let content = src.bytes();
        match <[u8; 4]>::try_from(content) {
            Ok(bits) => {
                *self = f32::from_be_bytes(bits);
                Ok(())
            },
            Err(_) => Err(Error::InvalidFloatWidth(content.len())),
        }
    }
}

impl Deserialize for f64 {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        let content = src.bytes();
        match <[u8; 8]>::try_from(content) {
            Ok(bits) => {
                *self = f64::from_be_bytes(bits);
                Ok(())
            },
            Err(_) => Err(Error::InvalidFloatWidth(content.len())),
        }
    }
}

impl Deserialize for char {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        let value = src.uint()?;
        let value = u32::try_from(value)
            .map_err(|_| Error::IntegerOutOfRange("char"))?;
        *self = char::from_u32(value).ok_or(Error::InvalidChar(value))?;
        Ok(())
    }
}

impl Deserialize for String {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        *self = str::from_utf8(src.bytes())?.to_owned();
        Ok(())
    }
}

/// A present node yields `Some`, built from the inner type's default and
/// then populated; absence (handled in `Node::read`) leaves the option
/// untouched.
impl<T: Deserialize + Default> Deserialize for Option<T> {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        let mut value = T::default();
        value.deserialize(src)?;
        *self = Some(value);
        Ok(())
    }
}

impl<T: Deserialize + Default> Deserialize for Vec<T> {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        self.clear();
        self.reserve(src.seq_len()?);
        src.read_seq(|v| self.push(v))
    }
}

impl<T: Deserialize + Default> Deserialize for VecDeque<T> {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        self.clear();
        self.reserve(src.seq_len()?);
        src.read_seq(|v| self.push_back(v))
    }
}

impl<T: Deserialize + Default> Deserialize for LinkedList<T> {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        self.clear();
        src.read_seq(|v| self.push_back(v))
    }
}

/// Wire order is not meaningful for sets and does not round-trip.
impl<T: Deserialize + Default + Ord> Deserialize for BTreeSet<T> {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        self.clear();
        src.read_seq(|v| {
            self.insert(v);
        })
    }
}

impl<T, S> Deserialize for HashSet<T, S>
where T: Deserialize + Default + Eq + Hash, S: BuildHasher {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        self.clear();
        src.read_seq(|v| {
            self.insert(v);
        })
    }
}

impl<T: Deserialize + Default + Ord> Deserialize for BinaryHeap<T> {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        self.clear();
        src.read_seq(|v| self.push(v))
    }
}

/// Fixed arrays are re-defaulted, then overwritten by position in arrival
/// order; excess wire elements are an error rather than silently dropped.
impl<T: Deserialize + Default, const N: usize> Deserialize for [T; N] {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        for slot in self.iter_mut() {
            *slot = T::default();
        }

        let mut next = 0;
        let mut overflowed = false;
        src.read_seq::<T, _>(|v| {
            if next < N {
                self[next] = v;
                next += 1;
            } else {
                overflowed = true;
            }
        })?;

        if overflowed {
            Err(Error::SequenceTooLong(N))
        } else {
            Ok(())
        }
    }
}

impl<A: Deserialize, B: Deserialize> Deserialize for (A, B) {
    fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
        src.field("first")?.read(&mut self.0)?;
        src.field("second")?.read(&mut self.1)?;
        Ok(())
    }
}

macro_rules! des_map {
    ($($stuff:tt)*) => {
        /// Pairs are decoded in wire order and inserted one by one, so a
        /// later duplicate key overwrites an earlier one.
        impl $($stuff)* {
            fn deserialize(&mut self, src: &mut Node<'_>) -> Result<()> {
                self.clear();
                src.read_seq::<(K, V), _>(|(k, v)| {
                    self.insert(k, v);
                })
            }
        }
    }
}

des_map!(<K: Deserialize + Default + Ord, V: Deserialize + Default>
         Deserialize for BTreeMap<K, V>);
des_map!(<K: Deserialize + Default + Eq + Hash, V: Deserialize + Default,
          S: BuildHasher> Deserialize for HashMap<K, V, S>);
