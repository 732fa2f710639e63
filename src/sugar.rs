//-
// Copyright 2026 Jason Lingle
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Macros for deriving `Serialize`/`Deserialize` on user types.

/// Implements `Serialize` and `Deserialize` for a struct with named fields.
///
/// Each listed field is written as (and read back from) a child node named
/// after the field. Fields not listed simply don't participate; fields
/// missing from a document keep their prior values, per the usual
/// absent-field rule.
///
/// ```
/// use larch::{larch_struct, Deserializer, Serializer};
///
/// #[derive(Default, PartialEq, Debug)]
/// struct Segment {
///     content: String,
/// }
/// larch_struct!(Segment { content });
///
/// let mut ser = Serializer::new()?;
/// ser.field("segment")?.write(&Segment { content: "hi".to_owned() })?;
/// let bytes = ser.finish();
///
/// let mut de = Deserializer::new(&bytes)?;
/// let mut segment = Segment::default();
/// de.field("segment")?.read(&mut segment)?;
/// assert_eq!("hi", segment.content);
/// # Ok::<(), larch::Error>(())
/// ```
#[macro_export]
macro_rules! larch_struct {
    ($ty:ty { $($field:ident),* $(,)* }) => {
        impl $crate::ser::Serialize for $ty {
            fn serialize(&self, dst: &mut $crate::writer::Node<'_>)
                         -> $crate::error::Result<()> {
                $(dst.field(stringify!($field))?.write(&self.$field)?;)*
                Ok(())
            }
        }

        impl $crate::de::Deserialize for $ty {
            fn deserialize(&mut self, src: &mut $crate::reader::Node<'_>)
                           -> $crate::error::Result<()> {
                $(src.field(stringify!($field))?.read(&mut self.$field)?;)*
                Ok(())
            }
        }
    };
}

/// Implements `Serialize` and `Deserialize` for a C-like enum via its
/// underlying integer representation.
///
/// Every variant must be listed with its discriminant value. Decoding a
/// discriminant with no listed variant fails with
/// `Error::InvalidDiscriminant`.
///
/// ```
/// use larch::larch_enum;
///
/// #[derive(Clone, Copy, PartialEq, Debug, Default)]
/// enum Mode {
///     #[default]
///     Off,
///     On,
/// }
/// larch_enum!(Mode: u32 { Off = 0, On = 1 });
/// ```
#[macro_export]
macro_rules! larch_enum {
    ($ty:ty : $repr:ty { $($variant:ident = $value:expr),* $(,)* }) => {
        impl $crate::ser::Serialize for $ty {
            fn serialize(&self, dst: &mut $crate::writer::Node<'_>)
                         -> $crate::error::Result<()> {
                let value: $repr = match *self {
                    $(<$ty>::$variant => $value,)*
                };
                $crate::ser::Serialize::serialize(&value, dst)
            }
        }

        impl $crate::de::Deserialize for $ty {
            fn deserialize(&mut self, src: &mut $crate::reader::Node<'_>)
                           -> $crate::error::Result<()> {
                let mut value: $repr = Default::default();
                $crate::de::Deserialize::deserialize(&mut value, src)?;
                *self = match value {
                    $(v if v == $value => <$ty>::$variant,)*
                    v => return Err($crate::error::Error::InvalidDiscriminant(
                        v as i64)),
                };
                Ok(())
            }
        }
    };
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::reader::Deserializer;
    use crate::writer::Serializer;

    #[derive(Default, PartialEq, Debug)]
    struct Packet {
        kind: Kind,
        payload: Vec<u8>,
    }

    #[derive(Clone, Copy, PartialEq, Debug, Default)]
    enum Kind {
        #[default]
        Data,
        Ack,
    }

    crate::larch_struct!(Packet { kind, payload });
    crate::larch_enum!(Kind: u32 { Data = 0, Ack = 1 });

    #[test]
    fn struct_and_enum_round_trip() {
        let packet = Packet { kind: Kind::Ack, payload: vec![1, 2, 3] };

        let mut ser = Serializer::new().unwrap();
        ser.field("packet").unwrap().write(&packet).unwrap();
        let bytes = ser.finish();

        let mut de = Deserializer::new(&bytes).unwrap();
        let mut restored = Packet::default();
        de.field("packet").unwrap().read(&mut restored).unwrap();
        assert_eq!(packet, restored);
    }

    #[test]
    fn unknown_discriminant_is_rejected() {
        let mut ser = Serializer::new().unwrap();
        ser.field("kind").unwrap().write(&7u32).unwrap();
        let bytes = ser.finish();

        let mut de = Deserializer::new(&bytes).unwrap();
        let mut kind = Kind::Data;
        match de.field("kind").unwrap().read(&mut kind) {
            Err(Error::InvalidDiscriminant(7)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_fields_keep_prior_values() {
        // A document whose packet node carries only the kind field.
        let mut ser = Serializer::new().unwrap();
        let mut node = ser.field("packet").unwrap();
        node.field("kind").unwrap().write(&1u32).unwrap();
        node.finish().unwrap();
        let bytes = ser.finish();

        let mut de = Deserializer::new(&bytes).unwrap();
        let mut restored = Packet { kind: Kind::Data, payload: vec![9] };
        de.field("packet").unwrap().read(&mut restored).unwrap();
        assert_eq!(Kind::Ack, restored.kind);
        assert_eq!(vec![9], restored.payload);
    }
}
