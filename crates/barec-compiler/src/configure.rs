//! Apply generation options to a normalized schema.
//!
//! The parsed tree is config-free apart from what the parser itself resolves
//! (safe integers, generic arrays). This pass stamps the remaining options
//! onto the nodes they affect: enum representation, struct classes, mutable
//! collections, optional absent values, and flat unions. It also validates
//! the requested entry points and, for flat unions of plain record structs,
//! injects a leading literal discriminator field into each member so decoded
//! values can be told apart.
//!
//! Copy-on-write throughout: with a default config the input schema is
//! returned untouched.

use std::rc::Rc;

use indexmap::IndexSet;

use crate::ast::{
    Absent, AliasedType, EnumRepr, Literal, Scalar, Schema, Span, StructField, Type, TypeKind,
    resolve,
};
use crate::check::{FlatShape, flat_shape};
use crate::config::Config;
use crate::error::{CompileError, Fail};

/// The configured schema plus which declarations received an injected
/// discriminator.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub schema: Rc<Schema>,
    /// Aliases of struct declarations that gained a leading `tag` field.
    pub tagged: IndexSet<String>,
}

pub fn configure(schema: &Rc<Schema>, config: &Config) -> Result<Annotated, CompileError> {
    run(schema, config).map_err(|fail| fail.into_error(&schema.source, &schema.filename))
}

fn run(schema: &Rc<Schema>, config: &Config) -> Result<Annotated, Fail> {
    check_roots(schema, config)?;

    let mut changed = false;
    let mut defs: Vec<Rc<AliasedType>> = Vec::with_capacity(schema.defs.len());
    for def in &schema.defs {
        let ty = annotate(&def.ty, config);
        if Rc::ptr_eq(&ty, &def.ty) {
            defs.push(Rc::clone(def));
        } else {
            changed = true;
            defs.push(Rc::new(AliasedType {
                alias: def.alias.clone(),
                exported: def.exported,
                ty,
                span: def.span,
                doc: def.doc.clone(),
            }));
        }
    }

    let mut tagged = IndexSet::new();
    if config.use_flat_union {
        changed |= inject_discriminators(&mut defs, config, &mut tagged)?;
    }

    let schema = if changed {
        Rc::new(Schema {
            defs,
            filename: Rc::clone(&schema.filename),
            source: Rc::clone(&schema.source),
        })
    } else {
        Rc::clone(schema)
    };
    Ok(Annotated { schema, tagged })
}

fn check_roots(schema: &Schema, config: &Config) -> Result<(), Fail> {
    let symbols = schema.symbols();
    for root in &config.main {
        let Some(def) = symbols.get(root.as_str()) else {
            return Err(Fail::config(
                Span::point(0),
                format!("root alias '{root}' is not defined"),
            ));
        };
        if !def.exported {
            return Err(Fail::config(
                def.span,
                format!("root alias '{root}' is not exported"),
            ));
        }
        let resolved = resolve(&def.ty, &symbols);
        if matches!(resolved.kind, TypeKind::Scalar(Scalar::Void)) {
            return Err(Fail::config(
                def.span,
                format!("root alias '{root}' must not resolve to void"),
            ));
        }
    }
    Ok(())
}

/// Stamp config-dependent node attributes, copy-on-write.
fn annotate(ty: &Rc<Type>, config: &Config) -> Rc<Type> {
    match &ty.kind {
        TypeKind::Alias(_) | TypeKind::Scalar(_) | TypeKind::Data { .. }
        | TypeKind::TypedArray { .. } | TypeKind::Literal(_) => Rc::clone(ty),
        TypeKind::Enum { members, repr } => {
            let want = if config.use_int_enum {
                EnumRepr::IntKey
            } else {
                EnumRepr::StringKey
            };
            if *repr == want {
                Rc::clone(ty)
            } else {
                Rc::new(Type::new(
                    TypeKind::Enum {
                        members: members.clone(),
                        repr: want,
                    },
                    ty.span,
                ))
            }
        }
        TypeKind::List { elem, len, mutable } => {
            let new_elem = annotate(elem, config);
            if *mutable == config.use_mutable && Rc::ptr_eq(&new_elem, elem) {
                Rc::clone(ty)
            } else {
                Rc::new(Type::new(
                    TypeKind::List {
                        elem: new_elem,
                        len: *len,
                        mutable: config.use_mutable,
                    },
                    ty.span,
                ))
            }
        }
        TypeKind::Set { elem, mutable } => {
            let new_elem = annotate(elem, config);
            if *mutable == config.use_mutable && Rc::ptr_eq(&new_elem, elem) {
                Rc::clone(ty)
            } else {
                Rc::new(Type::new(
                    TypeKind::Set {
                        elem: new_elem,
                        mutable: config.use_mutable,
                    },
                    ty.span,
                ))
            }
        }
        TypeKind::Map {
            key,
            value,
            mutable,
        } => {
            let new_key = annotate(key, config);
            let new_value = annotate(value, config);
            if *mutable == config.use_mutable
                && Rc::ptr_eq(&new_key, key)
                && Rc::ptr_eq(&new_value, value)
            {
                Rc::clone(ty)
            } else {
                Rc::new(Type::new(
                    TypeKind::Map {
                        key: new_key,
                        value: new_value,
                        mutable: config.use_mutable,
                    },
                    ty.span,
                ))
            }
        }
        TypeKind::Optional { elem, absent, lax } => {
            let want_absent = if config.use_null {
                Absent::Null
            } else {
                Absent::Undefined
            };
            let new_elem = annotate(elem, config);
            if *absent == want_absent
                && *lax == config.use_lax_optional
                && Rc::ptr_eq(&new_elem, elem)
            {
                Rc::clone(ty)
            } else {
                Rc::new(Type::new(
                    TypeKind::Optional {
                        elem: new_elem,
                        absent: want_absent,
                        lax: config.use_lax_optional,
                    },
                    ty.span,
                ))
            }
        }
        TypeKind::Struct { fields, class } => {
            let mut field_changed = false;
            let new_fields: Vec<StructField> = fields
                .iter()
                .map(|field| {
                    let new_ty = annotate(&field.ty, config);
                    if Rc::ptr_eq(&new_ty, &field.ty) {
                        field.clone()
                    } else {
                        field_changed = true;
                        StructField {
                            name: field.name.clone(),
                            ty: new_ty,
                            span: field.span,
                            doc: field.doc.clone(),
                        }
                    }
                })
                .collect();
            if *class == config.use_class && !field_changed {
                Rc::clone(ty)
            } else {
                Rc::new(Type::new(
                    TypeKind::Struct {
                        fields: new_fields,
                        class: config.use_class,
                    },
                    ty.span,
                ))
            }
        }
        TypeKind::Union { arms, flat } => {
            let mut arm_changed = false;
            let new_arms: Vec<_> = arms
                .iter()
                .map(|arm| {
                    let new_ty = annotate(&arm.ty, config);
                    if Rc::ptr_eq(&new_ty, &arm.ty) {
                        arm.clone()
                    } else {
                        arm_changed = true;
                        crate::ast::UnionArm {
                            tag: arm.tag,
                            ty: new_ty,
                            span: arm.span,
                        }
                    }
                })
                .collect();
            if *flat == config.use_flat_union && !arm_changed {
                Rc::clone(ty)
            } else {
                Rc::new(Type::new(
                    TypeKind::Union {
                        arms: new_arms,
                        flat: config.use_flat_union,
                    },
                    ty.span,
                ))
            }
        }
    }
}

/// Give every flat union of record structs a way to tell its members apart:
/// a leading `tag` field typed as a literal, the member's alias name by
/// default or its wire tag when integer tags were requested. Class structs
/// need no field since `instanceof` discriminates them, and unions whose
/// members already share a distinct leading literal are left alone.
fn inject_discriminators(
    defs: &mut Vec<Rc<AliasedType>>,
    config: &Config,
    tagged: &mut IndexSet<String>,
) -> Result<bool, Fail> {
    let mut changed = false;
    let unions: Vec<Rc<AliasedType>> = defs
        .iter()
        .filter(|def| matches!(def.ty.kind, TypeKind::Union { .. }))
        .cloned()
        .collect();

    for def in unions {
        let TypeKind::Union { arms, .. } = &def.ty.kind else {
            continue;
        };
        let symbols: indexmap::IndexMap<&str, &Rc<AliasedType>> = defs
            .iter()
            .map(|d| (d.alias.as_str(), d))
            .collect();
        if flat_shape(arms, &symbols)? != FlatShape::Structs {
            continue;
        }
        if config.use_class || discriminated(arms, defs) {
            continue;
        }

        // Resolve each arm to the declaration holding its struct.
        let mut targets: Vec<(usize, String, u64)> = Vec::with_capacity(arms.len());
        for arm in arms {
            let TypeKind::Alias(name) = &arm.ty.kind else {
                continue;
            };
            let Some(pos) = terminal_struct(defs, name) else {
                continue;
            };
            targets.push((pos, name.clone(), arm.tag));
        }

        for (pos, arm_name, tag) in targets {
            let target = Rc::clone(&defs[pos]);
            if !tagged.insert(target.alias.clone()) {
                return Err(Fail::config(
                    def.span,
                    format!("alias '{arm_name}' is a member of two flat unions"),
                ));
            }
            let TypeKind::Struct { fields, class } = &target.ty.kind else {
                continue;
            };
            if fields.iter().any(|f| f.name == "tag") {
                return Err(Fail::config(
                    target.span,
                    format!("cannot inject a discriminator into '{arm_name}': a field named 'tag' already exists"),
                ));
            }

            let literal = if config.use_int_tag {
                Literal::Int(tag as i64)
            } else {
                Literal::Str(arm_name.clone())
            };
            let mut new_fields = Vec::with_capacity(fields.len() + 1);
            new_fields.push(StructField {
                name: "tag".to_string(),
                ty: Rc::new(Type::new(TypeKind::Literal(literal), target.span)),
                span: target.span,
                doc: None,
            });
            new_fields.extend(fields.iter().cloned());

            defs[pos] = Rc::new(AliasedType {
                alias: target.alias.clone(),
                exported: target.exported,
                ty: Rc::new(Type::new(
                    TypeKind::Struct {
                        fields: new_fields,
                        class: *class,
                    },
                    target.ty.span,
                )),
                span: target.span,
                doc: target.doc.clone(),
            });
            changed = true;
        }
    }
    Ok(changed)
}

/// True when every member already starts with a literal field and the values
/// are pairwise distinct.
fn discriminated(arms: &[crate::ast::UnionArm], defs: &[Rc<AliasedType>]) -> bool {
    let symbols: indexmap::IndexMap<&str, &Rc<AliasedType>> =
        defs.iter().map(|d| (d.alias.as_str(), d)).collect();
    let mut literals: Vec<&Literal> = Vec::with_capacity(arms.len());
    for arm in arms {
        let TypeKind::Struct { fields, .. } = &resolve(&arm.ty, &symbols).kind else {
            return false;
        };
        let Some(first) = fields.first() else {
            return false;
        };
        let TypeKind::Literal(lit) = &resolve(&first.ty, &symbols).kind else {
            return false;
        };
        if literals.contains(&lit) {
            return false;
        }
        literals.push(lit);
    }
    true
}

/// Index of the declaration a chain of aliases terminates at, if that
/// declaration is a struct.
fn terminal_struct(defs: &[Rc<AliasedType>], name: &str) -> Option<usize> {
    let mut seen: Vec<String> = Vec::new();
    let mut current = name.to_string();
    loop {
        if seen.contains(&current) {
            return None;
        }
        let pos = defs.iter().position(|d| d.alias == current)?;
        match &defs[pos].ty.kind {
            TypeKind::Struct { .. } => return Some(pos),
            TypeKind::Alias(next) => {
                let next = next.clone();
                seen.push(current);
                current = next;
            }
            _ => return None,
        }
    }
}
