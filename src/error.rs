//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The error type shared by every fallible operation in the crate.
//!
//! The variants fall into three groups: malformed-document errors raised
//! while decoding, invalid-configuration errors raised at construction or
//! write time, and registry errors raised by polymorphic dispatch. A field
//! that is simply missing from a document is *never* an error; absent
//! fields leave the target value untouched (see `reader`).

use std::str::Utf8Error;

use quick_error::quick_error;

quick_error! {
    /// Errors that can be produced while building or decoding a document.
    #[derive(Debug)]
    pub enum Error {
        /// A varint began with a `0x00` byte, which would imply a length
        /// greater than the 8-byte ceiling.
        InvalidVarint {
            display("invalid varint leading byte 0x00")
        }
        /// A varint's length prefix claimed more bytes than the buffer
        /// holds.
        TruncatedVarint {
            display("truncated varint")
        }
        /// A value was too large to be represented as a varint at all
        /// (more than 56 significant bits).
        VarintOverflow(value: u64) {
            display("value {} does not fit in a varint", value)
        }
        /// A requested ID byte width was outside the format's 1..=8 range.
        IdLenOutOfRange(len: usize) {
            display("ID length {} outside supported range 1..=8", len)
        }
        /// A node's declared content length overruns the enclosing buffer.
        Truncated {
            display("node content overruns its buffer")
        }
        /// The document does not start with the reserved header node.
        MissingHeader {
            display("no document header present")
        }
        /// The document's content-type string is not the expected literal.
        BadContentType(found: String) {
            display("wrong document content type {:?}", found)
        }
        /// The document requires a newer reader than this library provides.
        UnsupportedVersion(version: u64) {
            display("document requires reader version {}", version)
        }
        /// An integer field's content was wider than 8 bytes.
        IntegerTooWide(len: usize) {
            display("integer content is {} bytes wide", len)
        }
        /// A decoded integer does not fit the target type.
        IntegerOutOfRange(target: &'static str) {
            display("integer out of range for {}", target)
        }
        /// A string field did not contain valid UTF-8.
        InvalidUtf8(err: Utf8Error) {
            from()
            cause(err)
            display("string content is not UTF-8: {}", err)
        }
        /// A float field's content was not exactly 4 or 8 bytes as
        /// required.
        InvalidFloatWidth(len: usize) {
            display("float content is {} bytes wide", len)
        }
        /// A `char` field decoded to something that is not a Unicode
        /// scalar value.
        InvalidChar(value: u32) {
            display("{:#x} is not a char", value)
        }
        /// An enum field decoded to a discriminant with no matching
        /// variant.
        InvalidDiscriminant(value: i64) {
            display("no enum variant with discriminant {}", value)
        }
        /// A fixed-size array was asked to absorb more elements than it
        /// has room for.
        SequenceTooLong(max: usize) {
            display("sequence exceeds fixed capacity {}", max)
        }
        /// A polymorphic document named a specialization that is not
        /// present in the registry consulted for decoding.
        UnknownSpecialization(name: String) {
            display("unknown specialization {:?}", name)
        }
        /// A value was serialised through a base handle whose concrete
        /// type was never registered.
        UnregisteredType(name: &'static str) {
            display("type {} is not registered", name)
        }
        /// A name or concrete type was registered twice with the same
        /// registry.
        DuplicateRegistration(name: String) {
            display("specialization {:?} is already registered", name)
        }
    }
}

/// The result type returned by every fallible operation in the crate.
pub type Result<T> = ::std::result::Result<T, Error>;
