//! Schema validation: the invariants that cannot be enforced by the grammar.
//!
//! Runs on the parsed tree before normalization. Validation is fail-fast and
//! covers, per declaration: structural invariants (non-empty composites, sane
//! fixed lengths, map-key shape), placement rules for `void` and literal
//! types, alias existence, and circular references. When a flat wire
//! representation is requested every union is additionally checked for
//! flattenability.

use indexmap::{IndexMap, IndexSet};

use crate::ast::{
    AliasedType, HostCategory, EnumRepr, Scalar, Schema, Type, TypeKind, UnionArm, resolve,
};
use crate::config::Config;
use crate::error::{CompileError, Fail};

type Symbols<'a> = IndexMap<&'a str, &'a std::rc::Rc<AliasedType>>;

/// Validate a parsed schema. Returns the first violation found, in
/// declaration order.
pub fn check(schema: &Schema, config: &Config) -> Result<(), CompileError> {
    let symbols = schema.symbols();
    let run = || -> Result<(), Fail> {
        for def in &schema.defs {
            // Hoisted declarations had their placement validated at the
            // site they were lifted from.
            let pos = if def.exported {
                Position::TopLevel
            } else {
                Position::Hoisted
            };
            check_type(&def.ty, pos, &symbols, config)?;
        }
        for def in &schema.defs {
            check_cycles(def, &symbols)?;
        }
        Ok(())
    };
    run().map_err(|fail| fail.into_error(&schema.source, &schema.filename))
}

/// Where a type occurs, for the placement rules: `void` may only resolve
/// directly under a union or an optional (or sit behind a top-level alias),
/// and a literal may only be a union member or the leading struct field.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    TopLevel,
    /// A synthetic declaration minted by the normalizer.
    Hoisted,
    UnionArm,
    OptionalElem,
    LeadField,
    Field,
    Elem,
}

impl Position {
    fn allows_void(self) -> bool {
        matches!(
            self,
            Position::TopLevel | Position::Hoisted | Position::UnionArm | Position::OptionalElem
        )
    }

    fn allows_literal(self) -> bool {
        matches!(
            self,
            Position::Hoisted | Position::UnionArm | Position::LeadField
        )
    }
}

fn check_type(
    ty: &Type,
    pos: Position,
    symbols: &Symbols<'_>,
    config: &Config,
) -> Result<(), Fail> {
    match &ty.kind {
        TypeKind::Alias(name) => {
            if !symbols.contains_key(name.as_str()) {
                return Err(Fail::semantic(
                    ty.span,
                    format!("alias '{name}' is not defined"),
                ));
            }
            let resolved = resolve(ty, symbols);
            if matches!(resolved.kind, TypeKind::Scalar(Scalar::Void)) && !pos.allows_void() {
                return Err(Fail::semantic(
                    ty.span,
                    "void is only allowed as a union member or an optional element",
                ));
            }
            Ok(())
        }
        TypeKind::Scalar(Scalar::Void) => {
            if !pos.allows_void() {
                return Err(Fail::semantic(
                    ty.span,
                    "void is only allowed as a union member or an optional element",
                ));
            }
            Ok(())
        }
        TypeKind::Scalar(_) => Ok(()),
        TypeKind::Literal(_) => {
            if !pos.allows_literal() {
                return Err(Fail::semantic(
                    ty.span,
                    "a literal is only allowed as a union member or a leading struct field",
                ));
            }
            Ok(())
        }
        TypeKind::Data { len } => check_len(ty, *len),
        TypeKind::List { elem, len, .. } => {
            check_len(ty, *len)?;
            check_type(elem, Position::Elem, symbols, config)
        }
        TypeKind::TypedArray { len, .. } => check_len(ty, *len),
        TypeKind::Set { elem, .. } => check_type(elem, Position::Elem, symbols, config),
        TypeKind::Map { key, value, .. } => {
            check_type(key, Position::Elem, symbols, config)?;
            let resolved = resolve(key, symbols);
            let key_ok = match &resolved.kind {
                TypeKind::Scalar(scalar) => *scalar != Scalar::Void,
                TypeKind::Enum { .. } => true,
                _ => false,
            };
            if !key_ok {
                return Err(Fail::semantic(
                    key.span,
                    "map key must resolve to a scalar or enum type",
                ));
            }
            check_type(value, Position::Elem, symbols, config)
        }
        TypeKind::Optional { elem, .. } => {
            check_type(elem, Position::OptionalElem, symbols, config)
        }
        TypeKind::Enum { members, .. } => {
            if members.is_empty() {
                return Err(Fail::semantic(ty.span, "enum must have at least one member"));
            }
            Ok(())
        }
        TypeKind::Struct { fields, .. } => {
            if fields.is_empty() {
                return Err(Fail::semantic(ty.span, "struct must have at least one field"));
            }
            for (i, field) in fields.iter().enumerate() {
                let pos = if i == 0 {
                    Position::LeadField
                } else {
                    Position::Field
                };
                check_type(&field.ty, pos, symbols, config)?;
            }
            Ok(())
        }
        TypeKind::Union { arms, .. } => {
            if arms.is_empty() {
                return Err(Fail::semantic(ty.span, "union must have at least one member"));
            }
            for arm in arms {
                check_type(&arm.ty, Position::UnionArm, symbols, config)?;
            }
            if config.use_flat_union {
                flat_shape(arms, symbols)?;
            }
            Ok(())
        }
    }
}

fn check_len(ty: &Type, len: Option<u64>) -> Result<(), Fail> {
    match len {
        Some(0) => Err(Fail::semantic(ty.span, "fixed length must be at least 1")),
        Some(n) if n > u32::MAX as u64 => {
            Err(Fail::semantic(ty.span, "fixed length does not fit in 32 bits"))
        }
        _ => Ok(()),
    }
}

/// How a flattened union tells its members apart at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlatShape {
    /// Every member has a distinct runtime class (`typeof` dispatch).
    Category,
    /// Every member resolves to a struct; discrimination is arranged later,
    /// by class identity or an injected leading tag field.
    Structs,
}

/// Decide whether a union can drop its wire tag from the host representation.
pub(crate) fn flat_shape(arms: &[UnionArm], symbols: &Symbols<'_>) -> Result<FlatShape, Fail> {
    let resolved: Vec<&Type> = arms.iter().map(|arm| resolve(&arm.ty, symbols)).collect();

    if resolved
        .iter()
        .all(|ty| matches!(ty.kind, TypeKind::Struct { .. }))
    {
        return Ok(FlatShape::Structs);
    }

    let mut seen: Vec<HostCategory> = Vec::with_capacity(arms.len());
    for (arm, ty) in arms.iter().zip(&resolved) {
        let category = match &ty.kind {
            TypeKind::Scalar(scalar) => scalar.host_category(),
            TypeKind::Literal(lit) => lit.host_category(),
            TypeKind::Enum { repr, .. } => match repr {
                EnumRepr::StringKey => HostCategory::String,
                EnumRepr::IntKey => HostCategory::Number,
            },
            _ => {
                return Err(Fail::semantic(
                    arm.span,
                    "union cannot be flattened: member has no distinct runtime class",
                ));
            }
        };
        if seen.contains(&category) {
            return Err(Fail::semantic(
                arm.span,
                "union cannot be flattened: two members share a runtime class",
            ));
        }
        seen.push(category);
    }
    Ok(FlatShape::Category)
}

/// Reject infinitely sized values. Variable-length containers (lists without
/// a fixed length, sets, maps) and optionals break cycles; everything else
/// must bottom out. A union used as a struct field is allowed to be cyclic as
/// long as one of its members is not.
fn check_cycles(def: &AliasedType, symbols: &Symbols<'_>) -> Result<(), Fail> {
    let mut trail: IndexSet<&str> = IndexSet::new();
    trail.insert(&def.alias);
    visit_type(&def.ty, symbols, &mut trail)
}

fn visit_type<'a>(
    ty: &'a Type,
    symbols: &Symbols<'a>,
    trail: &mut IndexSet<&'a str>,
) -> Result<(), Fail> {
    match &ty.kind {
        TypeKind::Alias(name) => {
            if trail.contains(name.as_str()) {
                return Err(Fail::semantic(
                    ty.span,
                    format!("circular reference to '{name}'"),
                ));
            }
            let Some(target) = symbols.get(name.as_str()) else {
                return Ok(());
            };
            trail.insert(name);
            visit_type(&target.ty, symbols, trail)?;
            trail.shift_remove(name.as_str());
            Ok(())
        }
        TypeKind::List { len: None, .. }
        | TypeKind::Set { .. }
        | TypeKind::Map { .. }
        | TypeKind::Optional { .. } => Ok(()),
        TypeKind::List {
            len: Some(_), elem, ..
        } => visit_type(elem, symbols, trail),
        TypeKind::Scalar(_)
        | TypeKind::Data { .. }
        | TypeKind::TypedArray { .. }
        | TypeKind::Enum { .. }
        | TypeKind::Literal(_) => Ok(()),
        TypeKind::Struct { fields, .. } => {
            for field in fields {
                visit_field(&field.ty, symbols, trail)?;
            }
            Ok(())
        }
        TypeKind::Union { arms, .. } => {
            for arm in arms {
                visit_type(&arm.ty, symbols, trail)?;
            }
            Ok(())
        }
    }
}

/// Struct-field position relaxes the union rule: the field is finite if at
/// least one member of the union is.
fn visit_field<'a>(
    ty: &'a Type,
    symbols: &Symbols<'a>,
    trail: &mut IndexSet<&'a str>,
) -> Result<(), Fail> {
    match &ty.kind {
        TypeKind::Union { arms, .. } => {
            let mut first_err = None;
            for arm in arms {
                let mut branch = trail.clone();
                match visit_type(&arm.ty, symbols, &mut branch) {
                    Ok(()) => return Ok(()),
                    Err(err) => first_err = first_err.or(Some(err)),
                }
            }
            match first_err {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        TypeKind::Alias(name) => {
            let Some(target) = symbols.get(name.as_str()) else {
                return Ok(());
            };
            if trail.contains(name.as_str()) {
                // A cyclic alias is still finite in field position when it
                // lands on a union with a terminating member.
                if matches!(resolve(&target.ty, symbols).kind, TypeKind::Union { .. }) {
                    return visit_field(&target.ty, symbols, trail);
                }
                return Err(Fail::semantic(
                    ty.span,
                    format!("circular reference to '{name}'"),
                ));
            }
            trail.insert(name);
            visit_field(&target.ty, symbols, trail)?;
            trail.shift_remove(name.as_str());
            Ok(())
        }
        _ => visit_type(ty, symbols, trail),
    }
}
