//! Schema AST: the immutable tree every pipeline stage consumes or rebuilds.
//!
//! Nodes are shared through `Rc`, which gives the normalizer and the
//! configurator cheap copy-on-write semantics: an unchanged subtree keeps its
//! allocation, so "did this pass change anything" is an `Rc::ptr_eq` check
//! rather than a deep comparison.

use std::rc::Rc;

use indexmap::IndexMap;

/// Byte range into the original schema text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn range(self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// A parsed schema: an ordered run of alias declarations plus provenance.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Declarations in source order. Synthetic aliases minted by the
    /// normalizer are appended after the user declarations.
    pub defs: Vec<Rc<AliasedType>>,
    /// Source file name, used for error artifacts and rendering.
    pub filename: Rc<str>,
    /// Full source text, kept so later stages can position their errors.
    pub source: Rc<str>,
}

impl Schema {
    /// Name -> declaration table, in declaration order.
    pub fn symbols(&self) -> IndexMap<&str, &Rc<AliasedType>> {
        self.defs
            .iter()
            .map(|def| (def.alias.as_str(), def))
            .collect()
    }
}

/// Follow alias chains down to the first non-alias type.
///
/// Stops on an undefined alias or on an alias cycle (both are reported by the
/// checker) and returns the last type reached.
pub fn resolve<'a>(ty: &'a Type, symbols: &IndexMap<&'a str, &'a Rc<AliasedType>>) -> &'a Type {
    let mut seen: Vec<&str> = Vec::new();
    let mut current = ty;
    while let TypeKind::Alias(name) = &current.kind {
        if seen.iter().any(|s| s == name) {
            return current;
        }
        match symbols.get(name.as_str()) {
            Some(def) => {
                seen.push(name.as_str());
                current = def.ty.as_ref();
            }
            None => return current,
        }
    }
    current
}

/// One `type Name ...` declaration.
#[derive(Debug, Clone)]
pub struct AliasedType {
    pub alias: String,
    /// `false` for synthetic aliases minted by the normalizer; those never
    /// appear in the generated public surface.
    pub exported: bool,
    pub ty: Rc<Type>,
    pub span: Span,
    /// Doc comment attached by the lexer (`#` lines directly above).
    pub doc: Option<String>,
}

/// A type node: a closed variant plus its source position.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub span: Span,
}

impl Type {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Every type the schema language can express. Exhaustively matched in each
/// pipeline stage; adding a variant is a compile error everywhere it matters.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Reference to a declared alias.
    Alias(String),
    /// Leaf scalar.
    Scalar(Scalar),
    /// Byte blob, length-prefixed unless `len` is fixed.
    Data { len: Option<u64> },
    /// Generic array. `len` fixes the element count.
    List {
        elem: Rc<Type>,
        len: Option<u64>,
        mutable: bool,
    },
    /// Array of a fixed-width numeric scalar, represented as a host typed
    /// array (`Uint8Array` and friends) instead of a generic array.
    TypedArray { elem: Scalar, len: Option<u64> },
    Set { elem: Rc<Type>, mutable: bool },
    /// Key type must resolve to a scalar or enum; the checker enforces it.
    Map {
        key: Rc<Type>,
        value: Rc<Type>,
        mutable: bool,
    },
    Optional {
        elem: Rc<Type>,
        absent: Absent,
        /// Lax decoding: the generated writer accepts both `null` and
        /// `undefined` as the absent value.
        lax: bool,
    },
    Enum {
        members: Vec<EnumMember>,
        repr: EnumRepr,
    },
    Struct {
        fields: Vec<StructField>,
        /// Class representation instead of a plain record.
        class: bool,
    },
    Union { arms: Vec<UnionArm>, flat: bool },
    /// A fixed constant. Occupies zero wire bytes; legal only as a union arm
    /// or a leading struct discriminator.
    Literal(Literal),
}

/// Scalar kinds, including the float-safe 64-bit alternates the parser
/// substitutes when `use_safe_int` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    I64Safe,
    Int,
    IntSafe,
    Str,
    U8,
    U16,
    U32,
    U64,
    U64Safe,
    Uint,
    UintSafe,
    Void,
}

impl Scalar {
    /// True for the fixed-width numeric kinds that have a host typed-array
    /// representation.
    pub fn typed_array_elem(self) -> bool {
        matches!(
            self,
            Scalar::F32
                | Scalar::F64
                | Scalar::I8
                | Scalar::I16
                | Scalar::I32
                | Scalar::I64
                | Scalar::U8
                | Scalar::U16
                | Scalar::U32
                | Scalar::U64
        )
    }

    /// Host runtime category, the basis of flat-union disambiguation.
    pub fn host_category(self) -> HostCategory {
        match self {
            Scalar::Bool => HostCategory::Boolean,
            Scalar::F32
            | Scalar::F64
            | Scalar::I8
            | Scalar::I16
            | Scalar::I32
            | Scalar::I64Safe
            | Scalar::IntSafe
            | Scalar::U8
            | Scalar::U16
            | Scalar::U32
            | Scalar::U64Safe
            | Scalar::UintSafe => HostCategory::Number,
            Scalar::I64 | Scalar::Int | Scalar::U64 | Scalar::Uint => HostCategory::BigInt,
            Scalar::Str => HostCategory::String,
            Scalar::Void => HostCategory::Absent,
        }
    }
}

/// How a decoded value of a flat-union arm surfaces at runtime. Two arms
/// sharing a category cannot be told apart post hoc, so such unions are
/// rejected when flattening is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCategory {
    Boolean,
    Number,
    BigInt,
    String,
    /// `null`/`undefined`.
    Absent,
}

/// Absent-value representation for `optional<T>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Absent {
    #[default]
    Undefined,
    Null,
}

/// Enum representation: string-keyed members or raw integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumRepr {
    #[default]
    StringKey,
    IntKey,
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    pub value: u64,
    pub span: Span,
    pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub ty: Rc<Type>,
    pub span: Span,
    pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UnionArm {
    pub tag: u64,
    pub ty: Rc<Type>,
    pub span: Span,
}

/// Constant values usable as literal types. String literals cannot be written
/// in schema text; they exist for the synthetic discriminators the
/// configurator injects into flat struct unions.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Literal {
    pub fn host_category(&self) -> HostCategory {
        match self {
            Literal::Bool(_) => HostCategory::Boolean,
            Literal::Int(_) => HostCategory::Number,
            Literal::Str(_) => HostCategory::String,
        }
    }
}

impl Type {
    /// Structural equality, ignoring source spans and doc comments.
    ///
    /// This replaces serialize-and-compare: union-arm uniqueness and the
    /// normalizer's dedup table both key on this. Field order is significant,
    /// so two structs with the same fields in different order stay distinct.
    pub fn structural_eq(&self, other: &Type) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Alias(a), TypeKind::Alias(b)) => a == b,
            (TypeKind::Scalar(a), TypeKind::Scalar(b)) => a == b,
            (TypeKind::Data { len: a }, TypeKind::Data { len: b }) => a == b,
            (
                TypeKind::List {
                    elem: ae,
                    len: al,
                    mutable: am,
                },
                TypeKind::List {
                    elem: be,
                    len: bl,
                    mutable: bm,
                },
            ) => al == bl && am == bm && ae.structural_eq(be),
            (
                TypeKind::TypedArray { elem: ae, len: al },
                TypeKind::TypedArray { elem: be, len: bl },
            ) => ae == be && al == bl,
            (
                TypeKind::Set {
                    elem: ae,
                    mutable: am,
                },
                TypeKind::Set {
                    elem: be,
                    mutable: bm,
                },
            ) => am == bm && ae.structural_eq(be),
            (
                TypeKind::Map {
                    key: ak,
                    value: av,
                    mutable: am,
                },
                TypeKind::Map {
                    key: bk,
                    value: bv,
                    mutable: bm,
                },
            ) => am == bm && ak.structural_eq(bk) && av.structural_eq(bv),
            (
                TypeKind::Optional {
                    elem: ae,
                    absent: aa,
                    lax: al,
                },
                TypeKind::Optional {
                    elem: be,
                    absent: ba,
                    lax: bl,
                },
            ) => aa == ba && al == bl && ae.structural_eq(be),
            (
                TypeKind::Enum {
                    members: am,
                    repr: ar,
                },
                TypeKind::Enum {
                    members: bm,
                    repr: br,
                },
            ) => {
                ar == br
                    && am.len() == bm.len()
                    && am
                        .iter()
                        .zip(bm)
                        .all(|(a, b)| a.name == b.name && a.value == b.value)
            }
            (
                TypeKind::Struct {
                    fields: af,
                    class: ac,
                },
                TypeKind::Struct {
                    fields: bf,
                    class: bc,
                },
            ) => {
                ac == bc
                    && af.len() == bf.len()
                    && af
                        .iter()
                        .zip(bf)
                        .all(|(a, b)| a.name == b.name && a.ty.structural_eq(&b.ty))
            }
            (
                TypeKind::Union { arms: aa, flat: af },
                TypeKind::Union { arms: ba, flat: bf },
            ) => {
                af == bf
                    && aa.len() == ba.len()
                    && aa
                        .iter()
                        .zip(ba)
                        .all(|(a, b)| a.tag == b.tag && a.ty.structural_eq(&b.ty))
            }
            (TypeKind::Literal(a), TypeKind::Literal(b)) => a == b,
            _ => false,
        }
    }

    fn structural_hash_into<H: std::hash::Hasher>(&self, state: &mut H) {
        use std::hash::Hash;

        std::mem::discriminant(&self.kind).hash(state);
        match &self.kind {
            TypeKind::Alias(name) => name.hash(state),
            TypeKind::Scalar(s) => s.hash(state),
            TypeKind::Data { len } => len.hash(state),
            TypeKind::List { elem, len, mutable } => {
                len.hash(state);
                mutable.hash(state);
                elem.structural_hash_into(state);
            }
            TypeKind::TypedArray { elem, len } => {
                elem.hash(state);
                len.hash(state);
            }
            TypeKind::Set { elem, mutable } => {
                mutable.hash(state);
                elem.structural_hash_into(state);
            }
            TypeKind::Map {
                key,
                value,
                mutable,
            } => {
                mutable.hash(state);
                key.structural_hash_into(state);
                value.structural_hash_into(state);
            }
            TypeKind::Optional { elem, absent, lax } => {
                (*absent == Absent::Null).hash(state);
                lax.hash(state);
                elem.structural_hash_into(state);
            }
            TypeKind::Enum { members, repr } => {
                (*repr == EnumRepr::IntKey).hash(state);
                for m in members {
                    m.name.hash(state);
                    m.value.hash(state);
                }
            }
            TypeKind::Struct { fields, class } => {
                class.hash(state);
                for f in fields {
                    f.name.hash(state);
                    f.ty.structural_hash_into(state);
                }
            }
            TypeKind::Union { arms, flat } => {
                flat.hash(state);
                for arm in arms {
                    arm.tag.hash(state);
                    arm.ty.structural_hash_into(state);
                }
            }
            TypeKind::Literal(lit) => match lit {
                Literal::Bool(v) => v.hash(state),
                Literal::Int(v) => v.hash(state),
                Literal::Str(v) => v.hash(state),
            },
        }
    }
}

/// Hash-table key wrapping a type by its structure (spans ignored).
#[derive(Debug, Clone)]
pub struct StructuralKey(pub Rc<Type>);

impl PartialEq for StructuralKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.structural_eq(&other.0)
    }
}

impl Eq for StructuralKey {}

impl std::hash::Hash for StructuralKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.structural_hash_into(state);
    }
}
