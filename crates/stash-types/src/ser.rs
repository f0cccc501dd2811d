//! A serde `Serializer` that builds [`Candidate`] trees.
//!
//! Unlike `serde_json::to_value`, floats are kept as [`Candidate::Float`]
//! whatever their value, so a non-finite float reaches the purity filter
//! instead of becoming `null`. Mapping keys may be strings, integers,
//! booleans, floats, chars, or unit enum variants.

use serde::ser::{self, Impossible, Serialize};

use crate::candidate::{Candidate, MapKey};
use crate::error::TypeError;

/// Serialize `value` into a [`Candidate`].
pub fn to_candidate<T: Serialize + ?Sized>(value: &T) -> Result<Candidate, TypeError> {
    value.serialize(CandidateSerializer)
}

struct CandidateSerializer;

fn tagged(variant: &'static str, inner: Candidate) -> Candidate {
    Candidate::Mapping(vec![(MapKey::String(variant.to_string()), inner)])
}

impl ser::Serializer for CandidateSerializer {
    type Ok = Candidate;
    type Error = TypeError;
    type SerializeSeq = SequenceBuilder;
    type SerializeTuple = SequenceBuilder;
    type SerializeTupleStruct = SequenceBuilder;
    type SerializeTupleVariant = SequenceBuilder;
    type SerializeMap = MappingBuilder;
    type SerializeStruct = MappingBuilder;
    type SerializeStructVariant = MappingBuilder;

    fn serialize_bool(self, v: bool) -> Result<Candidate, TypeError> {
        Ok(Candidate::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Candidate, TypeError> {
        i64::try_from(v)
            .map(Candidate::from)
            .or_else(|_| u64::try_from(v).map(Candidate::from))
            .map_err(|_| TypeError::Serialization(format!("integer {v} is out of range")))
    }

    fn serialize_u8(self, v: u8) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Candidate, TypeError> {
        Ok(Candidate::from(v))
    }

    fn serialize_u128(self, v: u128) -> Result<Candidate, TypeError> {
        u64::try_from(v)
            .map(Candidate::from)
            .map_err(|_| TypeError::Serialization(format!("integer {v} is out of range")))
    }

    fn serialize_f32(self, v: f32) -> Result<Candidate, TypeError> {
        Ok(Candidate::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<Candidate, TypeError> {
        Ok(Candidate::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Candidate, TypeError> {
        Ok(Candidate::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Candidate, TypeError> {
        Ok(Candidate::String(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Candidate, TypeError> {
        Ok(Candidate::sequence(v.iter().copied()))
    }

    fn serialize_none(self) -> Result<Candidate, TypeError> {
        Ok(Candidate::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Candidate, TypeError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Candidate, TypeError> {
        Ok(Candidate::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Candidate, TypeError> {
        Ok(Candidate::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<Candidate, TypeError> {
        Ok(Candidate::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Candidate, TypeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Candidate, TypeError> {
        Ok(tagged(variant, value.serialize(self)?))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SequenceBuilder, TypeError> {
        Ok(SequenceBuilder::new(len, None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SequenceBuilder, TypeError> {
        Ok(SequenceBuilder::new(Some(len), None))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SequenceBuilder, TypeError> {
        Ok(SequenceBuilder::new(Some(len), None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SequenceBuilder, TypeError> {
        Ok(SequenceBuilder::new(Some(len), Some(variant)))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MappingBuilder, TypeError> {
        Ok(MappingBuilder::new(len, None))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MappingBuilder, TypeError> {
        Ok(MappingBuilder::new(Some(len), None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MappingBuilder, TypeError> {
        Ok(MappingBuilder::new(Some(len), Some(variant)))
    }
}

struct SequenceBuilder {
    items: Vec<Candidate>,
    variant: Option<&'static str>,
}

impl SequenceBuilder {
    fn new(len: Option<usize>, variant: Option<&'static str>) -> Self {
        Self {
            items: Vec::with_capacity(len.unwrap_or(0)),
            variant,
        }
    }

    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), TypeError> {
        self.items.push(to_candidate(value)?);
        Ok(())
    }

    fn finish(self) -> Candidate {
        let sequence = Candidate::Sequence(self.items);
        match self.variant {
            Some(variant) => tagged(variant, sequence),
            None => sequence,
        }
    }
}

impl ser::SerializeSeq for SequenceBuilder {
    type Ok = Candidate;
    type Error = TypeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), TypeError> {
        self.push(value)
    }

    fn end(self) -> Result<Candidate, TypeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SequenceBuilder {
    type Ok = Candidate;
    type Error = TypeError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), TypeError> {
        self.push(value)
    }

    fn end(self) -> Result<Candidate, TypeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SequenceBuilder {
    type Ok = Candidate;
    type Error = TypeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), TypeError> {
        self.push(value)
    }

    fn end(self) -> Result<Candidate, TypeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SequenceBuilder {
    type Ok = Candidate;
    type Error = TypeError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), TypeError> {
        self.push(value)
    }

    fn end(self) -> Result<Candidate, TypeError> {
        Ok(self.finish())
    }
}

struct MappingBuilder {
    entries: Vec<(MapKey, Candidate)>,
    pending: Option<MapKey>,
    variant: Option<&'static str>,
}

impl MappingBuilder {
    fn new(len: Option<usize>, variant: Option<&'static str>) -> Self {
        Self {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending: None,
            variant,
        }
    }

    fn field<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<(), TypeError> {
        self.entries
            .push((MapKey::String(key.to_string()), to_candidate(value)?));
        Ok(())
    }

    fn finish(self) -> Candidate {
        let mapping = Candidate::Mapping(self.entries);
        match self.variant {
            Some(variant) => tagged(variant, mapping),
            None => mapping,
        }
    }
}

impl ser::SerializeMap for MappingBuilder {
    type Ok = Candidate;
    type Error = TypeError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), TypeError> {
        self.pending = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), TypeError> {
        let key = self
            .pending
            .take()
            .ok_or_else(|| TypeError::Serialization("map value without a key".to_string()))?;
        self.entries.push((key, to_candidate(value)?));
        Ok(())
    }

    fn end(self) -> Result<Candidate, TypeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MappingBuilder {
    type Ok = Candidate;
    type Error = TypeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), TypeError> {
        self.field(key, value)
    }

    fn end(self) -> Result<Candidate, TypeError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MappingBuilder {
    type Ok = Candidate;
    type Error = TypeError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), TypeError> {
        self.field(key, value)
    }

    fn end(self) -> Result<Candidate, TypeError> {
        Ok(self.finish())
    }
}

/// Serializes mapping keys. Only scalar keys are accepted.
struct KeySerializer;

impl ser::Serializer for KeySerializer {
    type Ok = MapKey;
    type Error = TypeError;
    type SerializeSeq = Impossible<MapKey, TypeError>;
    type SerializeTuple = Impossible<MapKey, TypeError>;
    type SerializeTupleStruct = Impossible<MapKey, TypeError>;
    type SerializeTupleVariant = Impossible<MapKey, TypeError>;
    type SerializeMap = Impossible<MapKey, TypeError>;
    type SerializeStruct = Impossible<MapKey, TypeError>;
    type SerializeStructVariant = Impossible<MapKey, TypeError>;

    fn serialize_bool(self, v: bool) -> Result<MapKey, TypeError> {
        Ok(MapKey::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<MapKey, TypeError> {
        Ok(MapKey::Int(i64::from(v)))
    }

    fn serialize_i16(self, v: i16) -> Result<MapKey, TypeError> {
        Ok(MapKey::Int(i64::from(v)))
    }

    fn serialize_i32(self, v: i32) -> Result<MapKey, TypeError> {
        Ok(MapKey::Int(i64::from(v)))
    }

    fn serialize_i64(self, v: i64) -> Result<MapKey, TypeError> {
        Ok(MapKey::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<MapKey, TypeError> {
        Ok(MapKey::UInt(u64::from(v)))
    }

    fn serialize_u16(self, v: u16) -> Result<MapKey, TypeError> {
        Ok(MapKey::UInt(u64::from(v)))
    }

    fn serialize_u32(self, v: u32) -> Result<MapKey, TypeError> {
        Ok(MapKey::UInt(u64::from(v)))
    }

    fn serialize_u64(self, v: u64) -> Result<MapKey, TypeError> {
        Ok(MapKey::UInt(v))
    }

    fn serialize_f32(self, v: f32) -> Result<MapKey, TypeError> {
        Ok(MapKey::Float(f64::from(v)))
    }

    fn serialize_f64(self, v: f64) -> Result<MapKey, TypeError> {
        Ok(MapKey::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<MapKey, TypeError> {
        Ok(MapKey::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<MapKey, TypeError> {
        Ok(MapKey::String(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<MapKey, TypeError> {
        Err(TypeError::UnsupportedKey("bytes"))
    }

    fn serialize_none(self) -> Result<MapKey, TypeError> {
        Err(TypeError::UnsupportedKey("none"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<MapKey, TypeError> {
        Err(TypeError::UnsupportedKey("option"))
    }

    fn serialize_unit(self) -> Result<MapKey, TypeError> {
        Err(TypeError::UnsupportedKey("unit"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<MapKey, TypeError> {
        Err(TypeError::UnsupportedKey("unit struct"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> Result<MapKey, TypeError> {
        Ok(MapKey::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<MapKey, TypeError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<MapKey, TypeError> {
        Err(TypeError::UnsupportedKey("enum variant with data"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, TypeError> {
        Err(TypeError::UnsupportedKey("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, TypeError> {
        Err(TypeError::UnsupportedKey("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, TypeError> {
        Err(TypeError::UnsupportedKey("tuple struct"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, TypeError> {
        Err(TypeError::UnsupportedKey("enum variant with data"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, TypeError> {
        Err(TypeError::UnsupportedKey("mapping"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, TypeError> {
        Err(TypeError::UnsupportedKey("struct"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, TypeError> {
        Err(TypeError::UnsupportedKey("enum variant with data"))
    }
}
