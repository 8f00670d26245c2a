//! Normalization: hoist anonymous composite types into synthetic aliases.
//!
//! Code generation emits one reader/writer pair per declaration, so every
//! composite that needs its own functions must sit behind an alias. This pass
//! replaces inline composite children (an anonymous struct in a field, an
//! enum inside a list, a literal union member) with references to synthetic
//! declarations appended after the user ones. Synthetic aliases are decimal
//! strings, which cannot collide with user aliases since those must start
//! with an uppercase letter.
//!
//! Structurally equal hoisted types share one synthetic declaration. The pass
//! is copy-on-write: a schema with nothing to hoist is returned as-is.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{AliasedType, Schema, Span, StructuralKey, Type, TypeKind};

pub fn normalize(schema: &Rc<Schema>) -> Rc<Schema> {
    let mut norm = Normalizer {
        dedup: IndexMap::new(),
        synthetics: Vec::new(),
        counter: 0,
    };

    let mut changed = false;
    let mut defs: Vec<Rc<AliasedType>> = Vec::with_capacity(schema.defs.len());
    for def in &schema.defs {
        let ty = norm.rewrite(&def.ty);
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

    if !changed && norm.synthetics.is_empty() {
        return Rc::clone(schema);
    }

    defs.extend(norm.synthetics);
    Rc::new(Schema {
        defs,
        filename: Rc::clone(&schema.filename),
        source: Rc::clone(&schema.source),
    })
}

struct Normalizer {
    /// Structure -> synthetic alias, so equal hoisted types share one
    /// declaration.
    dedup: IndexMap<StructuralKey, String>,
    synthetics: Vec<Rc<AliasedType>>,
    counter: u32,
}

impl Normalizer {
    /// Rebuild `ty` with every hoistable child replaced by a synthetic alias.
    /// Returns the original `Rc` when nothing underneath changed.
    fn rewrite(&mut self, ty: &Rc<Type>) -> Rc<Type> {
        match &ty.kind {
            TypeKind::Alias(_)
            | TypeKind::Scalar(_)
            | TypeKind::Data { .. }
            | TypeKind::TypedArray { .. }
            | TypeKind::Enum { .. }
            | TypeKind::Literal(_) => Rc::clone(ty),
            TypeKind::List { elem, len, mutable } => {
                let new_elem = self.hoist_child(elem);
                if Rc::ptr_eq(&new_elem, elem) {
                    Rc::clone(ty)
                } else {
                    Rc::new(Type::new(
                        TypeKind::List {
                            elem: new_elem,
                            len: *len,
                            mutable: *mutable,
                        },
                        ty.span,
                    ))
                }
            }
            TypeKind::Set { elem, mutable } => {
                let new_elem = self.hoist_child(elem);
                if Rc::ptr_eq(&new_elem, elem) {
                    Rc::clone(ty)
                } else {
                    Rc::new(Type::new(
                        TypeKind::Set {
                            elem: new_elem,
                            mutable: *mutable,
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
                let new_key = self.hoist_child(key);
                let new_value = self.hoist_child(value);
                if Rc::ptr_eq(&new_key, key) && Rc::ptr_eq(&new_value, value) {
                    Rc::clone(ty)
                } else {
                    Rc::new(Type::new(
                        TypeKind::Map {
                            key: new_key,
                            value: new_value,
                            mutable: *mutable,
                        },
                        ty.span,
                    ))
                }
            }
            TypeKind::Optional { elem, absent, lax } => {
                let new_elem = self.hoist_child(elem);
                if Rc::ptr_eq(&new_elem, elem) {
                    Rc::clone(ty)
                } else {
                    Rc::new(Type::new(
                        TypeKind::Optional {
                            elem: new_elem,
                            absent: *absent,
                            lax: *lax,
                        },
                        ty.span,
                    ))
                }
            }
            TypeKind::Struct { fields, class } => {
                let mut changed = false;
                let new_fields: Vec<_> = fields
                    .iter()
                    .map(|field| {
                        let new_ty = self.hoist_child(&field.ty);
                        if Rc::ptr_eq(&new_ty, &field.ty) {
                            field.clone()
                        } else {
                            changed = true;
                            crate::ast::StructField {
                                name: field.name.clone(),
                                ty: new_ty,
                                span: field.span,
                                doc: field.doc.clone(),
                            }
                        }
                    })
                    .collect();
                if changed {
                    Rc::new(Type::new(
                        TypeKind::Struct {
                            fields: new_fields,
                            class: *class,
                        },
                        ty.span,
                    ))
                } else {
                    Rc::clone(ty)
                }
            }
            TypeKind::Union { arms, flat } => {
                let mut changed = false;
                let new_arms: Vec<_> = arms
                    .iter()
                    .map(|arm| {
                        let new_ty = self.hoist_child(&arm.ty);
                        if Rc::ptr_eq(&new_ty, &arm.ty) {
                            arm.clone()
                        } else {
                            changed = true;
                            crate::ast::UnionArm {
                                tag: arm.tag,
                                ty: new_ty,
                                span: arm.span,
                            }
                        }
                    })
                    .collect();
                if changed {
                    Rc::new(Type::new(
                        TypeKind::Union {
                            arms: new_arms,
                            flat: *flat,
                        },
                        ty.span,
                    ))
                } else {
                    Rc::clone(ty)
                }
            }
        }
    }

    fn hoist_child(&mut self, child: &Rc<Type>) -> Rc<Type> {
        if !hoistable(child) {
            return Rc::clone(child);
        }
        let normalized = self.rewrite(child);
        let name = self.mint(normalized, child.span);
        Rc::new(Type::new(TypeKind::Alias(name), child.span))
    }

    fn mint(&mut self, ty: Rc<Type>, span: Span) -> String {
        let key = StructuralKey(Rc::clone(&ty));
        if let Some(name) = self.dedup.get(&key) {
            return name.clone();
        }
        let name = self.counter.to_string();
        self.counter += 1;
        self.synthetics.push(Rc::new(AliasedType {
            alias: name.clone(),
            exported: false,
            ty,
            span,
            doc: None,
        }));
        self.dedup.insert(key, name.clone());
        name
    }
}

/// Composite kinds get their own declaration; scalars, alias references, and
/// unsized byte blobs stay inline. Fixed-length `data` and typed arrays hoist
/// because their readers carry a length check worth sharing.
fn hoistable(ty: &Type) -> bool {
    match &ty.kind {
        TypeKind::List { .. }
        | TypeKind::Set { .. }
        | TypeKind::Map { .. }
        | TypeKind::Optional { .. }
        | TypeKind::Enum { .. }
        | TypeKind::Struct { .. }
        | TypeKind::Union { .. }
        | TypeKind::Literal(_) => true,
        TypeKind::Data { len } => len.is_some(),
        TypeKind::TypedArray { len, .. } => len.is_some(),
        TypeKind::Alias(_) | TypeKind::Scalar(_) => false,
    }
}
