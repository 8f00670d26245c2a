//! Schema-driven value codec.
//!
//! Interprets a checked schema directly instead of going through generated
//! code: useful for tooling and for testing that a schema's wire layout is
//! what it should be. Works on the parsed tree; aliases are followed on the
//! fly, so normalization is not required.
//!
//! Unions always surface as `Value::Union { tag, val }` here, flat or not:
//! flattening changes the host representation of generated code, never the
//! bytes.

use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use barec_compiler::ast::{AliasedType, Literal, Scalar, Schema, Type, TypeKind, resolve};

use crate::cursor::{ByteCursor, ByteSink, DecodeError};

/// Encoding failure: the value does not fit the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("encode error: {message}")]
pub struct EncodeError {
    pub message: String,
}

impl EncodeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A dynamically typed BARE value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Struct(Vec<(String, Value)>),
    Union { tag: u64, val: Box<Value> },
}

impl Value {
    pub fn union(tag: u64, val: Value) -> Self {
        Value::Union {
            tag,
            val: Box::new(val),
        }
    }
}

type Symbols<'a> = IndexMap<&'a str, &'a Rc<AliasedType>>;

/// Encode `value` as the declared alias. The schema must have passed the
/// checker; unknown aliases inside it are not reported here.
pub fn encode(schema: &Schema, alias: &str, value: &Value) -> Result<Vec<u8>, EncodeError> {
    let symbols = schema.symbols();
    let def = symbols
        .get(alias)
        .ok_or_else(|| EncodeError::new(format!("unknown alias '{alias}'")))?;
    let mut sink = ByteSink::new();
    encode_ty(&def.ty, value, &mut sink, &symbols)?;
    Ok(sink.into_bytes())
}

/// Decode bytes as the declared alias. Trailing bytes are an error.
pub fn decode(schema: &Schema, alias: &str, bytes: &[u8]) -> Result<Value, DecodeError> {
    let symbols = schema.symbols();
    let def = symbols
        .get(alias)
        .ok_or_else(|| DecodeError::new(0, format!("unknown alias '{alias}'")))?;
    let mut cursor = ByteCursor::new(bytes);
    let value = decode_ty(&def.ty, &mut cursor, &symbols)?;
    if !cursor.done() {
        return Err(DecodeError::new(cursor.offset, "remaining bytes"));
    }
    Ok(value)
}

fn encode_ty<'a>(
    ty: &'a Type,
    value: &Value,
    sink: &mut ByteSink,
    symbols: &Symbols<'a>,
) -> Result<(), EncodeError> {
    let ty = resolve(ty, symbols);
    match &ty.kind {
        TypeKind::Alias(name) => Err(EncodeError::new(format!("unknown alias '{name}'"))),
        TypeKind::Scalar(scalar) => encode_scalar(*scalar, value, sink),
        TypeKind::Data { len } => {
            let Value::Bytes(bytes) = value else {
                return Err(EncodeError::new("expected bytes"));
            };
            match len {
                Some(len) => {
                    if bytes.len() as u64 != *len {
                        return Err(EncodeError::new(format!("expected {len} bytes")));
                    }
                }
                None => sink.write_uint(bytes.len() as u64),
            }
            sink.write_bytes(bytes);
            Ok(())
        }
        TypeKind::List { elem, len, .. } => {
            encode_seq(value, *len, sink, |item, sink| {
                encode_ty(elem, item, sink, symbols)
            })
        }
        TypeKind::TypedArray { elem, len } => encode_seq(value, *len, sink, |item, sink| {
            encode_scalar(*elem, item, sink)
        }),
        TypeKind::Set { elem, .. } => encode_seq(value, None, sink, |item, sink| {
            encode_ty(elem, item, sink, symbols)
        }),
        TypeKind::Map { key, value: val_ty, .. } => {
            let Value::Map(entries) = value else {
                return Err(EncodeError::new("expected a map"));
            };
            sink.write_uint(entries.len() as u64);
            for (k, v) in entries {
                encode_ty(key, k, sink, symbols)?;
                encode_ty(val_ty, v, sink, symbols)?;
            }
            Ok(())
        }
        TypeKind::Optional { elem, .. } => match value {
            Value::Null => {
                sink.write_bool(false);
                Ok(())
            }
            present => {
                sink.write_bool(true);
                encode_ty(elem, present, sink, symbols)
            }
        },
        TypeKind::Enum { members, .. } => {
            let found = match value {
                Value::U64(v) => members.iter().find(|m| m.value == *v),
                Value::Str(name) => members.iter().find(|m| m.name == *name),
                _ => None,
            };
            let Some(member) = found else {
                return Err(EncodeError::new("value is not an enum member"));
            };
            let max = members.iter().map(|m| m.value).max().unwrap_or(0);
            write_tag(sink, member.value, max);
            Ok(())
        }
        TypeKind::Struct { fields, .. } => {
            let Value::Struct(entries) = value else {
                return Err(EncodeError::new("expected a struct"));
            };
            for field in fields {
                if is_literal(&field.ty, symbols) {
                    continue;
                }
                let Some((_, v)) = entries.iter().find(|(name, _)| name == &field.name) else {
                    return Err(EncodeError::new(format!("missing field '{}'", field.name)));
                };
                encode_ty(&field.ty, v, sink, symbols)?;
            }
            Ok(())
        }
        TypeKind::Union { arms, .. } => {
            let Value::Union { tag, val } = value else {
                return Err(EncodeError::new("expected a union value"));
            };
            let Some(arm) = arms.iter().find(|arm| arm.tag == *tag) else {
                return Err(EncodeError::new(format!("unknown union tag {tag}")));
            };
            let max = arms.iter().map(|arm| arm.tag).max().unwrap_or(0);
            write_tag(sink, *tag, max);
            encode_ty(&arm.ty, val, sink, symbols)
        }
        // Zero wire bytes; the constant is implied by the schema.
        TypeKind::Literal(_) => Ok(()),
    }
}

fn encode_scalar(scalar: Scalar, value: &Value, sink: &mut ByteSink) -> Result<(), EncodeError> {
    match scalar {
        Scalar::Bool => {
            let Value::Bool(v) = value else {
                return Err(EncodeError::new("expected a bool"));
            };
            sink.write_bool(*v);
        }
        Scalar::F32 => sink.write_f32(expect_f64(value)? as f32),
        Scalar::F64 => sink.write_f64(expect_f64(value)?),
        Scalar::I8 => sink.write_i8(int_in_range(value, i8::MIN as i64, i8::MAX as i64)? as i8),
        Scalar::I16 => sink.write_i16(int_in_range(value, i16::MIN as i64, i16::MAX as i64)? as i16),
        Scalar::I32 => sink.write_i32(int_in_range(value, i32::MIN as i64, i32::MAX as i64)? as i32),
        Scalar::I64 | Scalar::I64Safe => sink.write_i64(expect_i64(value)?),
        Scalar::Int | Scalar::IntSafe => sink.write_int(expect_i64(value)?),
        Scalar::Str => {
            let Value::Str(v) = value else {
                return Err(EncodeError::new("expected a string"));
            };
            sink.write_string(v);
        }
        Scalar::U8 => sink.write_u8(uint_in_range(value, u8::MAX as u64)? as u8),
        Scalar::U16 => sink.write_u16(uint_in_range(value, u16::MAX as u64)? as u16),
        Scalar::U32 => sink.write_u32(uint_in_range(value, u32::MAX as u64)? as u32),
        Scalar::U64 | Scalar::U64Safe => sink.write_u64(expect_u64(value)?),
        Scalar::Uint | Scalar::UintSafe => sink.write_uint(expect_u64(value)?),
        Scalar::Void => {
            if !matches!(value, Value::Null) {
                return Err(EncodeError::new("expected null for void"));
            }
        }
    }
    Ok(())
}

fn encode_seq(
    value: &Value,
    len: Option<u64>,
    sink: &mut ByteSink,
    mut item: impl FnMut(&Value, &mut ByteSink) -> Result<(), EncodeError>,
) -> Result<(), EncodeError> {
    let Value::List(items) = value else {
        return Err(EncodeError::new("expected a list"));
    };
    match len {
        Some(len) => {
            if items.len() as u64 != len {
                return Err(EncodeError::new(format!("expected {len} elements")));
            }
        }
        None => sink.write_uint(items.len() as u64),
    }
    for value in items {
        item(value, sink)?;
    }
    Ok(())
}

fn decode_ty<'a>(
    ty: &'a Type,
    cursor: &mut ByteCursor<'_>,
    symbols: &Symbols<'a>,
) -> Result<Value, DecodeError> {
    let ty = resolve(ty, symbols);
    match &ty.kind {
        TypeKind::Alias(name) => Err(DecodeError::new(
            cursor.offset,
            format!("unknown alias '{name}'"),
        )),
        TypeKind::Scalar(scalar) => decode_scalar(*scalar, cursor),
        TypeKind::Data { len } => {
            let len = match len {
                Some(len) => *len as usize,
                None => cursor.read_length()?,
            };
            Ok(Value::Bytes(cursor.read_bytes(len)?.to_vec()))
        }
        TypeKind::List { elem, len, .. } => {
            decode_seq(cursor, *len, |cursor| decode_ty(elem, cursor, symbols))
        }
        TypeKind::TypedArray { elem, len } => {
            decode_seq(cursor, *len, |cursor| decode_scalar(*elem, cursor))
        }
        TypeKind::Set { elem, .. } => {
            decode_seq(cursor, None, |cursor| decode_ty(elem, cursor, symbols))
        }
        TypeKind::Map { key, value, .. } => {
            let len = cursor.read_length()?;
            let mut entries: Vec<(Value, Value)> = Vec::with_capacity(len);
            for _ in 0..len {
                let offset = cursor.offset;
                let k = decode_ty(key, cursor, symbols)?;
                if entries.iter().any(|(seen, _)| *seen == k) {
                    return Err(DecodeError::new(offset, "duplicated key"));
                }
                let v = decode_ty(value, cursor, symbols)?;
                entries.push((k, v));
            }
            Ok(Value::Map(entries))
        }
        TypeKind::Optional { elem, .. } => {
            if cursor.read_bool()? {
                decode_ty(elem, cursor, symbols)
            } else {
                Ok(Value::Null)
            }
        }
        TypeKind::Enum { members, .. } => {
            let offset = cursor.offset;
            let max = members.iter().map(|m| m.value).max().unwrap_or(0);
            let tag = read_tag(cursor, max)?;
            let Some(member) = members.iter().find(|m| m.value == tag) else {
                return Err(DecodeError::new(offset, "invalid tag"));
            };
            Ok(Value::Str(member.name.clone()))
        }
        TypeKind::Struct { fields, .. } => {
            let mut entries = Vec::with_capacity(fields.len());
            for field in fields {
                let value = match literal_of(&field.ty, symbols) {
                    Some(lit) => literal_value(&lit),
                    None => decode_ty(&field.ty, cursor, symbols)?,
                };
                entries.push((field.name.clone(), value));
            }
            Ok(Value::Struct(entries))
        }
        TypeKind::Union { arms, .. } => {
            let offset = cursor.offset;
            let max = arms.iter().map(|arm| arm.tag).max().unwrap_or(0);
            let tag = read_tag(cursor, max)?;
            let Some(arm) = arms.iter().find(|arm| arm.tag == tag) else {
                return Err(DecodeError::new(offset, "invalid tag"));
            };
            let val = decode_ty(&arm.ty, cursor, symbols)?;
            Ok(Value::union(tag, val))
        }
        TypeKind::Literal(lit) => Ok(literal_value(lit)),
    }
}

fn decode_scalar(scalar: Scalar, cursor: &mut ByteCursor<'_>) -> Result<Value, DecodeError> {
    let value = match scalar {
        Scalar::Bool => Value::Bool(cursor.read_bool()?),
        Scalar::F32 => Value::F64(cursor.read_f32()? as f64),
        Scalar::F64 => Value::F64(cursor.read_f64()?),
        Scalar::I8 => Value::I64(cursor.read_i8()? as i64),
        Scalar::I16 => Value::I64(cursor.read_i16()? as i64),
        Scalar::I32 => Value::I64(cursor.read_i32()? as i64),
        Scalar::I64 | Scalar::I64Safe => Value::I64(cursor.read_i64()?),
        Scalar::Int | Scalar::IntSafe => Value::I64(cursor.read_int()?),
        Scalar::Str => Value::Str(cursor.read_string()?),
        Scalar::U8 => Value::U64(cursor.read_u8()? as u64),
        Scalar::U16 => Value::U64(cursor.read_u16()? as u64),
        Scalar::U32 => Value::U64(cursor.read_u32()? as u64),
        Scalar::U64 | Scalar::U64Safe => Value::U64(cursor.read_u64()?),
        Scalar::Uint | Scalar::UintSafe => Value::U64(cursor.read_uint()?),
        Scalar::Void => Value::Null,
    };
    Ok(value)
}

fn decode_seq(
    cursor: &mut ByteCursor<'_>,
    len: Option<u64>,
    mut item: impl FnMut(&mut ByteCursor<'_>) -> Result<Value, DecodeError>,
) -> Result<Value, DecodeError> {
    let len = match len {
        Some(len) => len as usize,
        None => cursor.read_length()?,
    };
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(item(cursor)?);
    }
    Ok(Value::List(items))
}

/// Tags and enum values bounded under 128 are a single raw byte.
fn write_tag(sink: &mut ByteSink, tag: u64, max: u64) {
    if max < 128 {
        sink.write_u8(tag as u8);
    } else {
        sink.write_uint(tag);
    }
}

fn read_tag(cursor: &mut ByteCursor<'_>, max: u64) -> Result<u64, DecodeError> {
    if max < 128 {
        Ok(cursor.read_u8()? as u64)
    } else {
        cursor.read_uint()
    }
}

fn is_literal<'a>(ty: &'a Type, symbols: &Symbols<'a>) -> bool {
    literal_of(ty, symbols).is_some()
}

fn literal_of<'a>(ty: &'a Type, symbols: &Symbols<'a>) -> Option<Literal> {
    match &resolve(ty, symbols).kind {
        TypeKind::Literal(lit) => Some(lit.clone()),
        _ => None,
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Bool(v) => Value::Bool(*v),
        Literal::Int(v) => Value::I64(*v),
        Literal::Str(v) => Value::Str(v.clone()),
    }
}

fn expect_f64(value: &Value) -> Result<f64, EncodeError> {
    match value {
        Value::F64(v) => Ok(*v),
        Value::I64(v) => Ok(*v as f64),
        Value::U64(v) => Ok(*v as f64),
        _ => Err(EncodeError::new("expected a number")),
    }
}

fn expect_i64(value: &Value) -> Result<i64, EncodeError> {
    match value {
        Value::I64(v) => Ok(*v),
        Value::U64(v) => {
            i64::try_from(*v).map_err(|_| EncodeError::new("integer out of range"))
        }
        _ => Err(EncodeError::new("expected an integer")),
    }
}

fn expect_u64(value: &Value) -> Result<u64, EncodeError> {
    match value {
        Value::U64(v) => Ok(*v),
        Value::I64(v) => {
            u64::try_from(*v).map_err(|_| EncodeError::new("integer out of range"))
        }
        _ => Err(EncodeError::new("expected an unsigned integer")),
    }
}

fn int_in_range(value: &Value, min: i64, max: i64) -> Result<i64, EncodeError> {
    let v = expect_i64(value)?;
    if v < min || v > max {
        return Err(EncodeError::new("integer out of range"));
    }
    Ok(v)
}

fn uint_in_range(value: &Value, max: u64) -> Result<u64, EncodeError> {
    let v = expect_u64(value)?;
    if v > max {
        return Err(EncodeError::new("integer out of range"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use barec_compiler::{Config, check, parser};

    use super::*;

    fn schema(src: &str) -> Rc<Schema> {
        let config = Config::default();
        let schema = parser::parse(src, "test.bare", &config).expect("valid schema");
        check::check(&schema, &config).expect("valid schema");
        schema
    }

    fn person() -> Value {
        Value::Struct(vec![
            ("name".to_string(), Value::Str("Ada".to_string())),
            ("age".to_string(), Value::U64(36)),
        ])
    }

    #[test]
    fn struct_round_trip() {
        let schema = schema("type Person struct { name: str age: u8 }");
        let bytes = encode(&schema, "Person", &person()).unwrap();
        assert_eq!(bytes, vec![3, b'A', b'd', b'a', 36]);
        assert_eq!(decode(&schema, "Person", &bytes).unwrap(), person());
    }

    #[test]
    fn union_tag_is_a_single_byte() {
        let schema = schema("type U (u8 | str)");
        let bytes = encode(&schema, "U", &Value::union(0, Value::U64(7))).unwrap();
        assert_eq!(bytes, vec![0x00, 0x07]);
        assert_eq!(
            decode(&schema, "U", &bytes).unwrap(),
            Value::union(0, Value::U64(7))
        );
    }

    #[test]
    fn wide_union_tags_use_varints() {
        let schema = schema("type U (u8 | str = 200)");
        let val = Value::union(200, Value::Str("x".to_string()));
        let bytes = encode(&schema, "U", &val).unwrap();
        assert_eq!(bytes, vec![0xc8, 0x01, 0x01, b'x']);
        assert_eq!(decode(&schema, "U", &bytes).unwrap(), val);

        // The low arm widens too; the byte width is a schema-level property.
        let bytes = encode(&schema, "U", &Value::union(0, Value::U64(9))).unwrap();
        assert_eq!(bytes, vec![0x00, 0x09]);
    }

    #[test]
    fn optional_presence_flag() {
        let schema = schema("type O optional<u8>");
        assert_eq!(encode(&schema, "O", &Value::Null).unwrap(), vec![0]);
        assert_eq!(
            encode(&schema, "O", &Value::U64(5)).unwrap(),
            vec![1, 5]
        );
        assert_eq!(decode(&schema, "O", &[0]).unwrap(), Value::Null);
        assert_eq!(decode(&schema, "O", &[1, 5]).unwrap(), Value::U64(5));
    }

    #[test]
    fn enum_accepts_name_or_value() {
        let schema = schema("type E enum { LOW HIGH = 300 }");
        let by_name = encode(&schema, "E", &Value::Str("HIGH".to_string())).unwrap();
        let by_value = encode(&schema, "E", &Value::U64(300)).unwrap();
        assert_eq!(by_name, vec![0xac, 0x02]);
        assert_eq!(by_name, by_value);
        assert_eq!(
            decode(&schema, "E", &by_name).unwrap(),
            Value::Str("HIGH".to_string())
        );

        let err = encode(&schema, "E", &Value::U64(4)).unwrap_err();
        assert!(err.message.contains("enum member"));
    }

    #[test]
    fn map_rejects_duplicated_keys() {
        let schema = schema("type M map[u8]u8");
        let bytes = [2, 1, 10, 1, 20];
        let err = decode(&schema, "M", &bytes).unwrap_err();
        assert_eq!(err.offset, 3);
        assert!(err.message.contains("duplicated key"));

        let val = Value::Map(vec![
            (Value::U64(1), Value::U64(10)),
            (Value::U64(2), Value::U64(20)),
        ]);
        let bytes = encode(&schema, "M", &val).unwrap();
        assert_eq!(decode(&schema, "M", &bytes).unwrap(), val);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let schema = schema("type B u8");
        let err = decode(&schema, "B", &[1, 2]).unwrap_err();
        assert_eq!(err.offset, 1);
        assert!(err.message.contains("remaining bytes"));
    }

    #[test]
    fn unknown_tag_is_invalid() {
        let schema = schema("type U (u8 | str)");
        let err = decode(&schema, "U", &[9, 0]).unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("invalid tag"));
    }

    #[test]
    fn fixed_lists_have_no_length_prefix() {
        let schema = schema("type L [2]u16");
        let val = Value::List(vec![Value::U64(1), Value::U64(2)]);
        let bytes = encode(&schema, "L", &val).unwrap();
        assert_eq!(bytes, vec![1, 0, 2, 0]);
        assert_eq!(decode(&schema, "L", &bytes).unwrap(), val);

        let err = encode(&schema, "L", &Value::List(vec![Value::U64(1)])).unwrap_err();
        assert!(err.message.contains("expected 2 elements"));
    }

    #[test]
    fn variable_lists_are_length_prefixed() {
        let schema = schema("type L []str");
        let val = Value::List(vec![Value::Str("a".to_string())]);
        let bytes = encode(&schema, "L", &val).unwrap();
        assert_eq!(bytes, vec![1, 1, b'a']);
        assert_eq!(decode(&schema, "L", &bytes).unwrap(), val);
    }

    #[test]
    fn typed_arrays_encode_like_lists() {
        let schema = schema("type A []u8");
        let val = Value::List(vec![Value::U64(1), Value::U64(255)]);
        let bytes = encode(&schema, "A", &val).unwrap();
        assert_eq!(bytes, vec![2, 1, 255]);
        assert_eq!(decode(&schema, "A", &bytes).unwrap(), val);
    }

    #[test]
    fn zigzag_for_int_scalars() {
        let schema = schema("type I int");
        assert_eq!(encode(&schema, "I", &Value::I64(-1)).unwrap(), vec![0x01]);
        assert_eq!(decode(&schema, "I", &[0x01]).unwrap(), Value::I64(-1));
    }

    #[test]
    fn literal_fields_take_no_wire_bytes() {
        let schema = schema("type T struct { tag: 7 x: u8 }");
        let val = Value::Struct(vec![("x".to_string(), Value::U64(3))]);
        let bytes = encode(&schema, "T", &val).unwrap();
        assert_eq!(bytes, vec![3]);
        assert_eq!(
            decode(&schema, "T", &bytes).unwrap(),
            Value::Struct(vec![
                ("tag".to_string(), Value::I64(7)),
                ("x".to_string(), Value::U64(3)),
            ])
        );
    }

    #[test]
    fn aliases_are_followed() {
        let schema = schema("type Age u8\ntype Person struct { age: Age }");
        let val = Value::Struct(vec![("age".to_string(), Value::U64(9))]);
        let bytes = encode(&schema, "Person", &val).unwrap();
        assert_eq!(bytes, vec![9]);
        assert_eq!(decode(&schema, "Person", &bytes).unwrap(), val);
    }

    #[test]
    fn scalars_are_range_checked() {
        let unsigned = schema("type B u8");
        let err = encode(&unsigned, "B", &Value::U64(256)).unwrap_err();
        assert!(err.message.contains("out of range"));

        let signed = schema("type S i8");
        let err = encode(&signed, "S", &Value::I64(200)).unwrap_err();
        assert!(err.message.contains("out of range"));
    }

    #[test]
    fn missing_struct_field_is_reported() {
        let schema = schema("type Person struct { name: str age: u8 }");
        let val = Value::Struct(vec![("name".to_string(), Value::Str("Ada".to_string()))]);
        let err = encode(&schema, "Person", &val).unwrap_err();
        assert!(err.message.contains("missing field 'age'"));
    }
}
