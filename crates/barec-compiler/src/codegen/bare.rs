//! Canonical re-serialization of a checked schema.
//!
//! Output uses the modern syntax only: legacy `enum Name {...}` declarations
//! come out as `type Name enum {...}`, `string` prints as `str`, and every
//! enum value and union tag is written explicitly. Doc comments are kept.
//! Runs on the pre-normalization tree; synthetic aliases never appear.

use crate::ast::{Literal, Scalar, Schema, Type, TypeKind};
use crate::codegen::Out;

pub fn render(schema: &Schema) -> String {
    let mut out = Out::new();
    for (i, def) in schema.defs.iter().enumerate() {
        if i > 0 {
            out.blank();
        }
        if let Some(doc) = &def.doc {
            for line in doc.lines() {
                if line.is_empty() {
                    out.line("#");
                } else {
                    out.line(format!("# {line}"));
                }
            }
        }
        out.line(format!("type {} {}", def.alias, expr(&def.ty, 0)));
    }
    out.finish()
}

fn expr(ty: &Type, indent: usize) -> String {
    let pad = "    ".repeat(indent);
    let inner = "    ".repeat(indent + 1);
    match &ty.kind {
        TypeKind::Alias(name) => name.clone(),
        TypeKind::Scalar(scalar) => keyword(*scalar).to_string(),
        TypeKind::Data { len: None } => "data".to_string(),
        TypeKind::Data { len: Some(len) } => format!("data[{len}]"),
        TypeKind::List { elem, len, .. } => match len {
            Some(len) => format!("[{len}]{}", expr(elem, indent)),
            None => format!("[]{}", expr(elem, indent)),
        },
        TypeKind::TypedArray { elem, len } => match len {
            Some(len) => format!("[{len}]{}", keyword(*elem)),
            None => format!("[]{}", keyword(*elem)),
        },
        TypeKind::Set { elem, .. } => format!("set<{}>", expr(elem, indent)),
        TypeKind::Map { key, value, .. } => {
            format!("map[{}]{}", expr(key, indent), expr(value, indent))
        }
        TypeKind::Optional { elem, .. } => format!("optional<{}>", expr(elem, indent)),
        TypeKind::Enum { members, .. } => {
            let mut text = String::from("enum {\n");
            for member in members {
                if let Some(doc) = &member.doc {
                    for line in doc.lines() {
                        text.push_str(&format!("{inner}# {line}\n"));
                    }
                }
                text.push_str(&format!("{inner}{} = {}\n", member.name, member.value));
            }
            text.push_str(&pad);
            text.push('}');
            text
        }
        TypeKind::Struct { fields, .. } => {
            let mut text = String::from("struct {\n");
            for field in fields {
                if let Some(doc) = &field.doc {
                    for line in doc.lines() {
                        text.push_str(&format!("{inner}# {line}\n"));
                    }
                }
                text.push_str(&format!(
                    "{inner}{}: {}\n",
                    field.name,
                    expr(&field.ty, indent + 1)
                ));
            }
            text.push_str(&pad);
            text.push('}');
            text
        }
        TypeKind::Union { arms, .. } => {
            let arms: Vec<String> = arms
                .iter()
                .map(|arm| format!("{} = {}", expr(&arm.ty, indent), arm.tag))
                .collect();
            format!("({})", arms.join(" | "))
        }
        TypeKind::Literal(lit) => match lit {
            Literal::Bool(v) => v.to_string(),
            Literal::Int(v) => v.to_string(),
            Literal::Str(v) => format!("\"{v}\""),
        },
    }
}

/// Schema keyword of a scalar. The float-safe alternates print as their
/// source keyword so the output stays a valid schema.
fn keyword(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Bool => "bool",
        Scalar::F32 => "f32",
        Scalar::F64 => "f64",
        Scalar::I8 => "i8",
        Scalar::I16 => "i16",
        Scalar::I32 => "i32",
        Scalar::I64 | Scalar::I64Safe => "i64",
        Scalar::Int | Scalar::IntSafe => "int",
        Scalar::Str => "str",
        Scalar::U8 => "u8",
        Scalar::U16 => "u16",
        Scalar::U32 => "u32",
        Scalar::U64 | Scalar::U64Safe => "u64",
        Scalar::Uint | Scalar::UintSafe => "uint",
        Scalar::Void => "void",
    }
}
