//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Builds documents bottom-up from scoped write contexts.
//!
//! A `Serializer` is the root of a document; it emits the document header
//! when constructed. Indexing it (`field`, `field_id`) yields a `Node`, a
//! child write context with its own buffer. A `Node` is finalised by the
//! single `write` call that consumes it, which appends the node's ID, its
//! content length and the buffered content to the parent. A context can
//! therefore never be reused after finalisation, and a parent cannot be
//! finished while a child still borrows it; the whole tree is assembled
//! without ever holding more than one root-to-leaf path in memory.
//!
//! The root has no ID and deliberately exposes no scalar surface: the only
//! way to write a value is through a `Node`, which always has one.

use log::trace;

use crate::error::{Error, Result};
use crate::ser::Serialize;
use crate::wire::{self, ElementId};

/// The root write context of a document.
///
/// ```
/// use larch::writer::Serializer;
///
/// let mut ser = Serializer::new()?;
/// ser.field("answer")?.write(&42u32)?;
/// let bytes = ser.finish();
/// # Ok::<(), larch::Error>(())
/// ```
#[derive(Debug)]
pub struct Serializer {
    buf: Vec<u8>,
    auto_id_len: usize,
}

impl Serializer {
    /// Creates a serializer with the default hashed-ID width and emits the
    /// document header.
    pub fn new() -> Result<Self> {
        Serializer::with_id_len(wire::DEFAULT_ID_LEN)
    }

    /// Creates a serializer whose hashed field IDs are `auto_id_len` bytes
    /// wide.
    ///
    /// Fails with `Error::IdLenOutOfRange` if `auto_id_len` is outside
    /// 1..=8.
    pub fn with_id_len(auto_id_len: usize) -> Result<Self> {
        if auto_id_len < 1 || auto_id_len > wire::MAX_WIDTH {
            return Err(Error::IdLenOutOfRange(auto_id_len));
        }

        let mut ser = Serializer { buf: Vec::new(), auto_id_len };
        ser.emit_header()?;
        Ok(ser)
    }

    fn emit_header(&mut self) -> Result<()> {
        let auto_id_len = self.auto_id_len;
        let mut header = Node::with_id(
            &mut self.buf, ElementId::from_literal(wire::DOC_MAGIC),
            auto_id_len);
        header.field_id(wire::ID_VERSION).write(&wire::FORMAT_VERSION)?;
        header.field_id(wire::ID_READER_VERSION).write(&wire::FORMAT_VERSION)?;
        header.field_id(wire::ID_MAX_ID_LEN).write(&(auto_id_len as u64))?;
        header.field_id(wire::ID_MAX_SIZE_LEN).write(&wire::MAX_SIZE_LEN)?;
        header.field_id(wire::ID_CONTENT_TYPE).write(wire::CONTENT_TYPE)?;
        header.finish()?;

        trace!("emitted document header, auto_id_len = {}", auto_id_len);
        Ok(())
    }

    /// Opens a write context for the named field.
    pub fn field(&mut self, name: &str) -> Result<Node<'_>> {
        let id = ElementId::from_name(name, self.auto_id_len)?;
        Ok(Node::with_id(&mut self.buf, id, self.auto_id_len))
    }

    /// Opens a write context for the given literal element ID.
    pub fn field_id(&mut self, id: u64) -> Node<'_> {
        Node::with_id(&mut self.buf, ElementId::from_literal(id),
                      self.auto_id_len)
    }

    /// Returns the finished document.
    ///
    /// All child contexts are necessarily complete by the time this can be
    /// called, since each one holds a mutable borrow of its parent until it
    /// is consumed.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// A scoped write context for one node of the tree.
///
/// Obtained by indexing a `Serializer` or a parent `Node`; consumed (and
/// flushed into the parent) by `write`.
#[derive(Debug)]
pub struct Node<'a> {
    parent: &'a mut Vec<u8>,
    id: ElementId,
    auto_id_len: usize,
    buf: Vec<u8>,
    omitted: bool,
}

impl<'a> Node<'a> {
    fn with_id(parent: &'a mut Vec<u8>, id: ElementId, auto_id_len: usize)
               -> Self {
        Node { parent, id, auto_id_len, buf: Vec::new(), omitted: false }
    }

    /// Opens a write context for the named child field.
    pub fn field(&mut self, name: &str) -> Result<Node<'_>> {
        let id = ElementId::from_name(name, self.auto_id_len)?;
        Ok(Node::with_id(&mut self.buf, id, self.auto_id_len))
    }

    /// Opens a write context for a child with the given literal element ID.
    pub fn field_id(&mut self, id: u64) -> Node<'_> {
        Node::with_id(&mut self.buf, ElementId::from_literal(id),
                      self.auto_id_len)
    }

    /// Serialises `value` into this context and finishes it.
    ///
    /// The context is consumed whether or not serialisation succeeds, and
    /// nothing is flushed on failure.
    pub fn write<T: Serialize + ?Sized>(mut self, value: &T) -> Result<()> {
        value.serialize(&mut self)?;
        self.finish()
    }

    /// Writes every element of `values` as a sibling node carrying the
    /// reserved sequence-marker ID, preserving iteration order.
    pub fn write_seq<I>(&mut self, values: I) -> Result<()>
    where I: IntoIterator, I::Item: Serialize {
        for value in values {
            self.field_id(wire::SEQUENCE_MARKER).write(&value)?;
        }
        Ok(())
    }

    /// Replaces this node's content with the given raw bytes.
    ///
    /// Like all scalar writes, this discards anything previously written
    /// into the context; only the last write before finalisation is kept.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.clear();
        self.buf.extend_from_slice(bytes);
    }

    /// Replaces this node's content with the minimal big-endian encoding of
    /// an unsigned integer.
    pub fn put_uint(&mut self, value: u64) {
        self.buf.clear();
        wire::put_uint(&mut self.buf, value);
    }

    /// Replaces this node's content with the minimal two's-complement
    /// big-endian encoding of a signed integer.
    pub fn put_int(&mut self, value: i64) {
        self.buf.clear();
        wire::put_int(&mut self.buf, value);
    }

    /// Marks this node as omitted: finalisation writes nothing into the
    /// parent, exactly as if the field had never been indexed.
    pub fn omit(&mut self) {
        self.omitted = true;
    }

    /// Finishes this context, flushing its ID, content length and content
    /// into the parent.
    ///
    /// `write` calls this automatically; it only needs to be called
    /// directly when a node's content was assembled through the `&mut`
    /// primitives (`put_*`, `write_seq`, child `field`s) rather than a
    /// single `write`. Consuming `self` makes finishing twice, or touching
    /// a finished context, unrepresentable.
    pub fn finish(self) -> Result<()> {
        if self.omitted {
            return Ok(());
        }
        self.parent.extend_from_slice(self.id.as_bytes());
        wire::put_varlen(self.parent, self.buf.len() as u64)?;
        self.parent.extend_from_slice(&self.buf);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::parse;
    use crate::wire::ElementId;

    fn header_bytes() -> Vec<u8> {
        parse("1A 45 DF A3 A2 \
               42 86 81 01 \
               42 F7 81 01 \
               42 F2 81 04 \
               42 F3 81 08 \
               42 82 8F 'ebml-serializer'")
    }

    #[test]
    fn empty_document_is_just_the_header() {
        let ser = Serializer::new().unwrap();
        assert_eq!(header_bytes(), ser.finish());
    }

    #[test]
    fn header_respects_configured_id_len() {
        let ser = Serializer::with_id_len(2).unwrap();
        let mut expected = header_bytes();
        // Only the max-id-length byte differs.
        expected[16] = 2;
        assert_eq!(expected, ser.finish());
    }

    #[test]
    fn id_len_out_of_range_is_rejected() {
        assert!(Serializer::with_id_len(0).is_err());
        assert!(Serializer::with_id_len(9).is_err());
    }

    #[test]
    fn named_scalar_field_framing() {
        let mut ser = Serializer::new().unwrap();
        ser.field("answer").unwrap().write(&1u32).unwrap();

        let mut expected = header_bytes();
        expected.extend_from_slice(
            ElementId::from_name("answer", 4).unwrap().as_bytes());
        expected.extend_from_slice(&[0x81, 0x01]);
        assert_eq!(expected, ser.finish());
    }

    #[test]
    fn sequence_framing() {
        let mut ser = Serializer::new().unwrap();
        let mut node = ser.field("seq").unwrap();
        node.write_seq([1u32, 2].iter()).unwrap();

        let buf = node.buf.clone();
        assert_eq!(parse("81 81 01 81 81 02"), buf);
    }

    #[test]
    fn scalar_write_keeps_only_the_last_value() {
        let mut ser = Serializer::new().unwrap();
        let mut node = ser.field("x").unwrap();
        node.put_uint(1);
        node.put_uint(2);
        assert_eq!(vec![2u8], node.buf);
    }

    #[test]
    fn omitted_node_writes_nothing() {
        let mut ser = Serializer::new().unwrap();
        ser.field("gone").unwrap().write(&None::<u32>).unwrap();
        assert_eq!(header_bytes(), ser.finish());
    }
}
