//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Decodes documents by wrapping byte ranges in lazily-parsed read contexts.
//!
//! A `Deserializer` validates the document header and wraps the root node.
//! Indexing a node by field name or literal ID scans its children (exactly
//! once, memoised) and *removes* the first match, returning it as a detached
//! `Node`; looking the same name up again therefore yields the next sibling
//! with that ID, which is what lets repeated-field decoding and "read a
//! field at most once" coexist. A lookup that matches nothing returns the
//! absent sentinel, whose every read leaves the target value untouched —
//! missing fields are the schema-evolution mechanism of the format, never an
//! error.
//!
//! Children are discovered one level at a time: populating a node records
//! each child's ID and content range without recursing further.

use log::{debug, trace};

use crate::de::Deserialize;
use crate::error::{Error, Result};
use crate::wire::{self, ElementId};

/// The root read context over an encoded document.
///
/// Construction validates the header: its presence, the reader-compatibility
/// version, the hashed-ID width and the content-type literal. Any mismatch
/// is fatal to the whole document since nothing else can be trusted once
/// framing is in doubt.
#[derive(Debug)]
pub struct Deserializer<'de> {
    root: Node<'de>,
}

impl<'de> Deserializer<'de> {
    /// Opens a document over `input` and validates its header.
    pub fn new(input: &'de [u8]) -> Result<Self> {
        let mut root = Node::present(input, wire::DEFAULT_ID_LEN);

        let mut header = root.field_id(wire::DOC_MAGIC)?;
        if header.is_absent() {
            return Err(Error::MissingHeader);
        }

        let mut reader_version = wire::FORMAT_VERSION;
        header.field_id(wire::ID_READER_VERSION)?.read(&mut reader_version)?;
        if reader_version > wire::FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(reader_version));
        }

        let mut id_len = wire::DEFAULT_ID_LEN as u64;
        header.field_id(wire::ID_MAX_ID_LEN)?.read(&mut id_len)?;
        if id_len < 1 || id_len > wire::MAX_WIDTH as u64 {
            return Err(Error::IdLenOutOfRange(id_len as usize));
        }

        let mut content_type = String::new();
        header.field_id(wire::ID_CONTENT_TYPE)?.read(&mut content_type)?;
        if content_type != wire::CONTENT_TYPE {
            return Err(Error::BadContentType(content_type));
        }

        debug!("document header ok, auto_id_len = {}", id_len);
        root.auto_id_len = id_len as usize;
        Ok(Deserializer { root })
    }

    /// Consumes and returns the first remaining child with the given field
    /// name, or the absent sentinel.
    pub fn field(&mut self, name: &str) -> Result<Node<'de>> {
        self.root.field(name)
    }

    /// Consumes and returns the first remaining child with the given
    /// literal element ID, or the absent sentinel.
    pub fn field_id(&mut self, id: u64) -> Result<Node<'de>> {
        self.root.field_id(id)
    }
}

/// One read context of the tree: a node's content bytes, or the absent
/// sentinel.
#[derive(Debug)]
pub struct Node<'de> {
    content: &'de [u8],
    absent: bool,
    auto_id_len: usize,
    children: Option<Vec<Child<'de>>>,
}

#[derive(Debug)]
struct Child<'de> {
    id: ElementId,
    content: &'de [u8],
}

impl<'de> Node<'de> {
    fn present(content: &'de [u8], auto_id_len: usize) -> Self {
        Node { content, absent: false, auto_id_len, children: None }
    }

    fn absent(auto_id_len: usize) -> Self {
        Node { content: &[], absent: true, auto_id_len, children: None }
    }

    /// Whether this is the absent sentinel returned by an unmatched lookup.
    pub fn is_absent(&self) -> bool {
        self.absent
    }

    /// This node's raw content bytes.
    pub fn bytes(&self) -> &'de [u8] {
        self.content
    }

    /// This node's content decoded as a big-endian unsigned integer.
    pub fn uint(&self) -> Result<u64> {
        wire::take_uint(self.content)
    }

    /// This node's content decoded as a big-endian two's-complement signed
    /// integer.
    pub fn int(&self) -> Result<i64> {
        wire::take_int(self.content)
    }

    /// Scans this node's content into a child list, exactly once.
    ///
    /// Only (ID, content range) pairs are recorded; grandchildren are not
    /// examined until their own parent node is populated in turn.
    fn populate(&mut self) -> Result<&mut Vec<Child<'de>>> {
        if self.children.is_none() {
            let mut children = Vec::new();
            let mut rest = self.content;
            while !rest.is_empty() {
                let (id, consumed) = ElementId::read(rest)?;
                rest = &rest[consumed..];
                let (len, consumed) = wire::take_varint(rest)?;
                rest = &rest[consumed..];
                let len = len as usize;
                if len > rest.len() {
                    return Err(Error::Truncated);
                }
                children.push(Child { id, content: &rest[..len] });
                rest = &rest[len..];
            }
            trace!("populated {} children", children.len());
            self.children = Some(children);
        }

        match self.children {
            Some(ref mut children) => Ok(children),
            None => unreachable!(),
        }
    }

    fn take(&mut self, id: ElementId) -> Result<Node<'de>> {
        let auto_id_len = self.auto_id_len;
        let children = self.populate()?;
        match children.iter().position(|c| c.id == id) {
            Some(ix) => {
                let child = children.remove(ix);
                Ok(Node::present(child.content, auto_id_len))
            },
            None => Ok(Node::absent(auto_id_len)),
        }
    }

    /// Consumes and returns the first remaining child with the given field
    /// name, or the absent sentinel.
    pub fn field(&mut self, name: &str) -> Result<Node<'de>> {
        let id = ElementId::from_name(name, self.auto_id_len)?;
        self.take(id)
    }

    /// Consumes and returns the first remaining child with the given
    /// literal element ID, or the absent sentinel.
    pub fn field_id(&mut self, id: u64) -> Result<Node<'de>> {
        self.take(ElementId::from_literal(id))
    }

    /// Reads this node into `value`.
    ///
    /// On the absent sentinel this is a no-op: `value` keeps its prior
    /// state. Otherwise the value's `Deserialize` impl decides how to
    /// interpret the content.
    pub fn read<T: Deserialize>(&mut self, value: &mut T) -> Result<()> {
        if self.absent {
            return Ok(());
        }
        value.deserialize(self)
    }

    /// The number of sequence elements among this node's remaining
    /// children, without consuming any of them.
    pub fn seq_len(&mut self) -> Result<usize> {
        let marker = ElementId::from_literal(wire::SEQUENCE_MARKER);
        let children = self.populate()?;
        Ok(children.iter().filter(|c| c.id == marker).count())
    }

    /// Decodes sequence elements in order, handing each to `each`, until the
    /// first absence.
    pub fn read_seq<T, F>(&mut self, mut each: F) -> Result<()>
    where T: Deserialize + Default, F: FnMut(T) {
        loop {
            let mut element = self.field_id(wire::SEQUENCE_MARKER)?;
            if element.is_absent() {
                return Ok(());
            }
            let mut value = T::default();
            element.read(&mut value)?;
            each(value);
        }
    }

    /// Like `read_seq`, but first hands the exact element count to `count`
    /// so the consumer can pre-size its target container.
    pub fn read_seq_counted<T, C, F>(&mut self, count: C, each: F)
                                     -> Result<()>
    where T: Deserialize + Default, C: FnOnce(usize), F: FnMut(T) {
        let n = self.seq_len()?;
        count(n);
        self.read_seq(each)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::writer::Serializer;

    fn doc<F: FnOnce(&mut Serializer)>(build: F) -> Vec<u8> {
        let mut ser = Serializer::new().unwrap();
        build(&mut ser);
        ser.finish()
    }

    #[test]
    fn rejects_headerless_input() {
        match Deserializer::new(&[]) {
            Err(Error::MissingHeader) => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_wrong_content_type() {
        // A header whose content-type literal is "nonsense".
        let bytes = crate::test_helpers::parse(
            "1A 45 DF A3 8B 42 82 88 'nonsense'");
        match Deserializer::new(&bytes) {
            Err(Error::BadContentType(ref t)) if t == "nonsense" => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_future_reader_version() {
        let bytes = crate::test_helpers::parse(
            "1A 45 DF A3 84 42 F7 81 02");
        match Deserializer::new(&bytes) {
            Err(Error::UnsupportedVersion(2)) => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_truncated_child() {
        let bytes = doc(|ser| {
            ser.field("x").unwrap().write(&1u32).unwrap();
        });
        // Chop the final content byte off.
        match Deserializer::new(&bytes[..bytes.len() - 1])
            .and_then(|mut de| de.field("x"))
        {
            Err(Error::Truncated) => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn absent_field_leaves_value_alone() {
        let bytes = doc(|_| ());
        let mut de = Deserializer::new(&bytes).unwrap();
        let mut value = 42u32;
        de.field("never-written").unwrap().read(&mut value).unwrap();
        assert_eq!(42, value);
    }

    #[test]
    fn lookup_consumes_the_matched_child() {
        let bytes = doc(|ser| {
            ser.field("x").unwrap().write(&1u32).unwrap();
            ser.field("x").unwrap().write(&2u32).unwrap();
        });
        let mut de = Deserializer::new(&bytes).unwrap();

        let mut first = 0u32;
        de.field("x").unwrap().read(&mut first).unwrap();
        assert_eq!(1, first);

        let mut second = 0u32;
        de.field("x").unwrap().read(&mut second).unwrap();
        assert_eq!(2, second);

        assert!(de.field("x").unwrap().is_absent());
    }

    #[test]
    fn seq_len_does_not_consume() {
        let bytes = doc(|ser| {
            ser.field("seq").unwrap().write(&vec![5u32, 6, 7]).unwrap();
        });
        let mut de = Deserializer::new(&bytes).unwrap();
        let mut node = de.field("seq").unwrap();
        assert_eq!(3, node.seq_len().unwrap());
        assert_eq!(3, node.seq_len().unwrap());

        let mut collected = Vec::new();
        node.read_seq::<u32, _>(|v| collected.push(v)).unwrap();
        assert_eq!(vec![5, 6, 7], collected);
        assert_eq!(0, node.seq_len().unwrap());
    }

    #[test]
    fn counted_sequence_reports_before_iterating() {
        let bytes = doc(|ser| {
            ser.field("seq").unwrap().write(&vec![1u8, 2]).unwrap();
        });
        let mut de = Deserializer::new(&bytes).unwrap();
        let mut node = de.field("seq").unwrap();

        let mut reported = None;
        let mut collected = Vec::new();
        node.read_seq_counted::<u8, _, _>(
            |n| reported = Some(n),
            |v| collected.push(v)).unwrap();
        assert_eq!(Some(2), reported);
        assert_eq!(vec![1, 2], collected);
    }
}
