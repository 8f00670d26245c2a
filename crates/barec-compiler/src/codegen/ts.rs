//! TypeScript/JavaScript emission.
//!
//! One reader/writer pair per declaration, synthetic ones included; named
//! type declarations for exported aliases; encode/decode wrappers for the
//! configured roots. The `ts` mode emits everything, `js` strips static
//! types, `dts` keeps only declarations. Enum values and classes are runtime
//! constructs, so they survive into `js` output.
//!
//! Readers take a `bare.ByteCursor` and return a value; writers take the
//! cursor and the value. Functions reference each other by name, which is
//! what makes mutually recursive schemas generable: declaration order does
//! not matter at call time.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{
    Absent, AliasedType, EnumMember, EnumRepr, HostCategory, Literal, Scalar, Schema, StructField,
    Type, TypeKind, UnionArm, resolve,
};
use crate::codegen::Out;
use crate::config::{Config, Generator};
use crate::configure::Annotated;

pub fn render(annotated: &Annotated, config: &Config, mode: Generator) -> String {
    let schema = &annotated.schema;
    let mut emitter = Emitter {
        schema,
        symbols: schema.symbols(),
        config,
        mode,
        out: Out::new(),
    };
    emitter.render_module();
    emitter.out.finish()
}

struct Emitter<'a> {
    schema: &'a Schema,
    symbols: IndexMap<&'a str, &'a Rc<AliasedType>>,
    config: &'a Config,
    mode: Generator,
    out: Out,
}

impl<'a> Emitter<'a> {
    fn typed(&self) -> bool {
        matches!(self.mode, Generator::Ts | Generator::Dts)
    }

    fn runtime(&self) -> bool {
        matches!(self.mode, Generator::Ts | Generator::Js)
    }

    fn render_module(&mut self) {
        self.out.line("import * as bare from \"@bare-ts/lib\"");

        let schema = self.schema;
        for def in &schema.defs {
            self.render_def(def);
        }
        let config = self.config;
        for root in &config.main {
            self.render_root(root);
        }
    }

    fn render_def(&mut self, def: &AliasedType) {
        self.render_type_decl(def);
        if self.runtime() {
            self.out.blank();
            self.render_reader(def);
            self.out.blank();
            self.render_writer(def);
        } else if def.exported {
            let name = &def.alias;
            let ty = self.def_type_ref(def);
            self.out.blank();
            self.out.line(format!(
                "export declare function read{name}(bc: bare.ByteCursor): {ty}"
            ));
            self.out.line(format!(
                "export declare function write{name}(bc: bare.ByteCursor, x: {ty}): void"
            ));
        }
    }

    // ---- type declarations ----

    fn render_type_decl(&mut self, def: &AliasedType) {
        match &def.ty.kind {
            TypeKind::Enum { members, repr } if def.exported => {
                self.render_enum_decl(def, members, *repr);
            }
            TypeKind::Struct {
                fields,
                class: true,
            } => self.render_class_decl(def, fields),
            TypeKind::Struct { fields, .. } if def.exported && self.typed() => {
                self.out.blank();
                self.doc(def.doc.as_deref());
                self.out.open(format!("export interface {} {{", def.alias));
                for field in fields {
                    self.doc(field.doc.as_deref());
                    let expr = self.type_expr(&field.ty);
                    self.out.line(format!("readonly {}: {}", field.name, expr));
                }
                self.out.close("}");
            }
            TypeKind::Union { arms, flat } if def.exported && self.typed() => {
                self.out.blank();
                self.doc(def.doc.as_deref());
                self.out.open(format!("export type {} =", def.alias));
                for arm in arms {
                    let expr = if *flat {
                        self.type_expr(&arm.ty)
                    } else {
                        self.tagged_arm_expr(arm)
                    };
                    self.out.line(format!("| {expr}"));
                }
                self.out.indent -= 1;
            }
            _ if def.exported && self.typed() => {
                let expr = self.type_expr(&def.ty);
                self.out.blank();
                self.doc(def.doc.as_deref());
                self.out.line(format!("export type {} = {}", def.alias, expr));
            }
            _ => {}
        }
    }

    fn render_enum_decl(&mut self, def: &AliasedType, members: &[EnumMember], repr: EnumRepr) {
        let name = &def.alias;
        self.out.blank();
        self.doc(def.doc.as_deref());
        match self.mode {
            Generator::Dts => {
                self.out.open(format!("export declare const {name}: {{"));
                for member in members {
                    self.out.line(format!(
                        "readonly {}: {}",
                        member.name,
                        enum_member_literal(member, repr)
                    ));
                }
                self.out.close("}");
                self.out.line(format!(
                    "export type {name} = (typeof {name})[keyof typeof {name}]"
                ));
            }
            Generator::Ts => {
                self.out.open(format!("export const {name} = {{"));
                for member in members {
                    self.doc(member.doc.as_deref());
                    self.out.line(format!(
                        "{}: {},",
                        member.name,
                        enum_member_literal(member, repr)
                    ));
                }
                self.out.close("} as const");
                self.out.line(format!(
                    "export type {name} = (typeof {name})[keyof typeof {name}]"
                ));
            }
            Generator::Js => {
                self.out.open(format!("export const {name} = {{"));
                for member in members {
                    self.doc(member.doc.as_deref());
                    self.out.line(format!(
                        "{}: {},",
                        member.name,
                        enum_member_literal(member, repr)
                    ));
                }
                self.out.close("}");
            }
            Generator::Bare => {}
        }
    }

    fn render_class_decl(&mut self, def: &AliasedType, fields: &[StructField]) {
        let name = self.class_name(def);
        let export = if def.exported { "export " } else { "" };
        let declare = if self.mode == Generator::Dts {
            "declare "
        } else {
            ""
        };
        self.out.blank();
        self.doc(def.doc.as_deref());
        self.out.open(format!("{export}{declare}class {name} {{"));

        if self.typed() {
            for field in fields {
                let expr = self.type_expr(&field.ty);
                self.out.line(format!("readonly {}: {}", field.name, expr));
            }
        }

        let params: Vec<String> = fields
            .iter()
            .filter(|f| !self.is_literal(&f.ty))
            .map(|f| {
                if self.typed() {
                    format!("{}: {}", f.name, self.type_expr(&f.ty))
                } else {
                    f.name.clone()
                }
            })
            .collect();
        if self.mode == Generator::Dts {
            self.out.line(format!("constructor({})", params.join(", ")));
        } else {
            self.out.open(format!("constructor({}) {{", params.join(", ")));
            for field in fields {
                if let Some(lit) = self.literal_of(&field.ty) {
                    self.out
                        .line(format!("this.{} = {}", field.name, literal_expr(&lit)));
                } else {
                    self.out.line(format!("this.{0} = {0}", field.name));
                }
            }
            self.out.close("}");
        }
        self.out.close("}");
    }

    // ---- type expressions ----

    /// Type-level expression for a node. Exported aliases keep their name;
    /// synthetic ones expand inline, except classes, which need identity.
    fn type_expr(&self, ty: &Type) -> String {
        match &ty.kind {
            TypeKind::Alias(name) => self.alias_ref(name),
            TypeKind::Scalar(scalar) => scalar_type(*scalar).to_string(),
            TypeKind::Data { .. } => "ArrayBuffer".to_string(),
            TypeKind::TypedArray { elem, .. } => typed_array_type(*elem).to_string(),
            TypeKind::List { elem, mutable, .. } => {
                let elem = self.type_expr(elem);
                let elem = parenthesize(&elem);
                if *mutable {
                    format!("{elem}[]")
                } else {
                    format!("readonly {elem}[]")
                }
            }
            TypeKind::Set { elem, mutable } => {
                let elem = self.type_expr(elem);
                if *mutable {
                    format!("Set<{elem}>")
                } else {
                    format!("ReadonlySet<{elem}>")
                }
            }
            TypeKind::Map {
                key,
                value,
                mutable,
            } => {
                let key = self.type_expr(key);
                let value = self.type_expr(value);
                if *mutable {
                    format!("Map<{key}, {value}>")
                } else {
                    format!("ReadonlyMap<{key}, {value}>")
                }
            }
            TypeKind::Optional { elem, absent, lax } => {
                let elem = self.type_expr(elem);
                match (absent, lax) {
                    (_, true) => format!("{elem} | null | undefined"),
                    (Absent::Null, false) => format!("{elem} | null"),
                    (Absent::Undefined, false) => format!("{elem} | undefined"),
                }
            }
            TypeKind::Enum { members, repr } => members
                .iter()
                .map(|m| enum_member_literal(m, *repr))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeKind::Struct { fields, .. } => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|f| format!("readonly {}: {}", f.name, self.type_expr(&f.ty)))
                    .collect();
                format!("{{ {} }}", fields.join("; "))
            }
            TypeKind::Union { arms, flat } => arms
                .iter()
                .map(|arm| {
                    if *flat {
                        self.type_expr(&arm.ty)
                    } else {
                        self.tagged_arm_expr(arm)
                    }
                })
                .collect::<Vec<_>>()
                .join(" | "),
            TypeKind::Literal(lit) => literal_type(lit),
        }
    }

    fn tagged_arm_expr(&self, arm: &UnionArm) -> String {
        if self.resolves_to_void(&arm.ty) {
            format!("{{ readonly tag: {} }}", arm.tag)
        } else {
            format!(
                "{{ readonly tag: {}; readonly val: {} }}",
                arm.tag,
                self.type_expr(&arm.ty)
            )
        }
    }

    fn alias_ref(&self, name: &str) -> String {
        match self.symbols.get(name) {
            Some(def) if def.exported => name.to_string(),
            Some(def) => match &def.ty.kind {
                TypeKind::Struct { class: true, .. } => self.class_name(def),
                _ => self.type_expr(&def.ty),
            },
            None => name.to_string(),
        }
    }

    fn class_name(&self, def: &AliasedType) -> String {
        if def.exported {
            def.alias.clone()
        } else {
            format!("_{}", def.alias)
        }
    }

    fn def_type_ref(&self, def: &AliasedType) -> String {
        if def.exported {
            def.alias.clone()
        } else if matches!(def.ty.kind, TypeKind::Struct { class: true, .. }) {
            self.class_name(def)
        } else {
            self.type_expr(&def.ty)
        }
    }

    fn resolves_to_void(&self, ty: &Type) -> bool {
        matches!(
            resolve(ty, &self.symbols).kind,
            TypeKind::Scalar(Scalar::Void)
        )
    }

    fn is_literal(&self, ty: &Type) -> bool {
        self.literal_of(ty).is_some()
    }

    fn literal_of(&self, ty: &Type) -> Option<Literal> {
        match &resolve(ty, &self.symbols).kind {
            TypeKind::Literal(lit) => Some(lit.clone()),
            _ => None,
        }
    }

    // ---- readers ----

    fn render_reader(&mut self, def: &AliasedType) {
        let name = &def.alias;
        let export = if def.exported { "export " } else { "" };
        let sig = if self.typed() {
            format!(
                "{export}function read{name}(bc: bare.ByteCursor): {} {{",
                self.def_type_ref(def)
            )
        } else {
            format!("{export}function read{name}(bc) {{")
        };
        self.out.open(sig);
        self.reader_body(&def.ty, def);
        self.out.close("}");
    }

    fn reader_body(&mut self, ty: &Type, def: &AliasedType) {
        match &ty.kind {
            TypeKind::Alias(_) | TypeKind::Scalar(_) | TypeKind::Data { len: None }
            | TypeKind::TypedArray { len: None, .. } => {
                let expr = self.read_expr(ty);
                self.out.line(format!("return {expr}"));
            }
            TypeKind::Data { len: Some(len) } => {
                self.out.line(format!("return bare.readFixedData(bc, {len})"));
            }
            TypeKind::TypedArray {
                elem,
                len: Some(len),
            } => {
                self.out.line(format!(
                    "return bare.read{}FixedArray(bc, {len})",
                    scalar_fn(*elem)
                ));
            }
            TypeKind::Literal(lit) => {
                self.out.line(format!("return {}", literal_expr(lit)));
            }
            TypeKind::List { elem, len, .. } => self.list_reader(elem, *len),
            TypeKind::Set { elem, .. } => self.set_reader(elem),
            TypeKind::Map { key, value, .. } => self.map_reader(key, value),
            TypeKind::Optional { elem, absent, .. } => {
                let payload = self.read_expr(elem);
                let absent = absent_expr(*absent);
                self.out
                    .line(format!("return bare.readBool(bc) ? {payload} : {absent}"));
            }
            TypeKind::Enum { members, repr } => self.enum_reader(def, members, *repr),
            TypeKind::Struct { fields, class } => self.struct_reader(def, fields, *class),
            TypeKind::Union { arms, flat } => self.union_reader(arms, *flat),
        }
    }

    /// Inline read call for a structural child; after normalization children
    /// are aliases, scalars, or unsized blobs.
    fn read_expr(&self, ty: &Type) -> String {
        match &ty.kind {
            TypeKind::Alias(name) => format!("read{name}(bc)"),
            TypeKind::Scalar(Scalar::Void) => "undefined".to_string(),
            TypeKind::Scalar(scalar) => format!("bare.read{}(bc)", scalar_fn(*scalar)),
            TypeKind::Data { len: None } => "bare.readData(bc)".to_string(),
            TypeKind::TypedArray { elem, len: None } => {
                format!("bare.read{}Array(bc)", scalar_fn(*elem))
            }
            _ => unreachable!("composite children are hoisted before generation"),
        }
    }

    fn list_reader(&mut self, elem: &Type, len: Option<u64>) {
        let first = self.read_expr(elem);
        match len {
            Some(len) => {
                self.out.line(format!("const result = [{first}]"));
                self.out.open(format!("for (let i = 1; i < {len}; i++) {{"));
                self.out.line(format!("result[i] = {first}"));
                self.out.close("}");
                self.out.line("return result");
            }
            None => {
                self.out.line("const len = bare.readUintSafe(bc)");
                self.out.open("if (len === 0) {");
                self.out.line("return []");
                self.out.close("}");
                self.out.line(format!("const result = [{first}]"));
                self.out.open("for (let i = 1; i < len; i++) {");
                self.out.line(format!("result[i] = {first}"));
                self.out.close("}");
                self.out.line("return result");
            }
        }
    }

    fn set_reader(&mut self, elem: &Type) {
        let read = self.read_expr(elem);
        self.out.line("const len = bare.readUintSafe(bc)");
        if self.typed() {
            let elem_ty = self.type_expr(elem);
            self.out.line(format!("const result = new Set<{elem_ty}>()"));
        } else {
            self.out.line("const result = new Set()");
        }
        self.out.open("for (let i = 0; i < len; i++) {");
        self.out.line(format!("result.add({read})"));
        self.out.close("}");
        self.out.line("return result");
    }

    fn map_reader(&mut self, key: &Type, value: &Type) {
        let read_key = self.read_expr(key);
        let read_value = self.read_expr(value);
        self.out.line("const len = bare.readUintSafe(bc)");
        if self.typed() {
            let kt = self.type_expr(key);
            let vt = self.type_expr(value);
            self.out
                .line(format!("const result = new Map<{kt}, {vt}>()"));
        } else {
            self.out.line("const result = new Map()");
        }
        self.out.open("for (let i = 0; i < len; i++) {");
        self.out.line("const offset = bc.offset");
        self.out.line(format!("const key = {read_key}"));
        self.out.open("if (result.has(key)) {");
        self.out.line("bc.offset = offset");
        self.out
            .line("throw new bare.BareError(offset, \"duplicated key\")");
        self.out.close("}");
        self.out.line(format!("result.set(key, {read_value})"));
        self.out.close("}");
        self.out.line("return result");
    }

    fn enum_reader(&mut self, def: &AliasedType, members: &[EnumMember], repr: EnumRepr) {
        let max = members.iter().map(|m| m.value).max().unwrap_or(0);
        self.out.line("const offset = bc.offset");
        self.out.line(format!("const tag = {}(bc)", tag_read_fn(max)));
        self.out.open("switch (tag) {");
        for member in members {
            self.out.line(format!("case {}:", member.value));
            self.out.indent += 1;
            let value = self.enum_member_expr(def, member, repr);
            self.out.line(format!("return {value}"));
            self.out.indent -= 1;
        }
        self.out.line("default:");
        self.out.indent += 1;
        self.out.line("bc.offset = offset");
        self.out
            .line("throw new bare.BareError(offset, \"invalid tag\")");
        self.out.indent -= 1;
        self.out.close("}");
    }

    /// How a member value is spelled at runtime: through the exported const
    /// object when there is one, otherwise as a bare literal.
    fn enum_member_expr(&self, def: &AliasedType, member: &EnumMember, repr: EnumRepr) -> String {
        if def.exported {
            format!("{}.{}", def.alias, member.name)
        } else {
            enum_member_literal(member, repr)
        }
    }

    fn struct_reader(&mut self, def: &AliasedType, fields: &[StructField], class: bool) {
        if class {
            for field in fields {
                if !self.is_literal(&field.ty) {
                    let read = self.read_expr(&field.ty);
                    self.out.line(format!("const {} = {}", field.name, read));
                }
            }
            let args: Vec<&str> = fields
                .iter()
                .filter(|f| !self.is_literal(&f.ty))
                .map(|f| f.name.as_str())
                .collect();
            let name = self.class_name(def);
            self.out
                .line(format!("return new {name}({})", args.join(", ")));
        } else {
            self.out.open("return {");
            for field in fields {
                let expr = match self.literal_of(&field.ty) {
                    Some(lit) => literal_expr(&lit),
                    None => self.read_expr(&field.ty),
                };
                self.out.line(format!("{}: {},", field.name, expr));
            }
            self.out.close("}");
        }
    }

    fn union_reader(&mut self, arms: &[UnionArm], flat: bool) {
        let max = arms.iter().map(|arm| arm.tag).max().unwrap_or(0);
        self.out.line("const offset = bc.offset");
        self.out.line(format!("const tag = {}(bc)", tag_read_fn(max)));
        self.out.open("switch (tag) {");
        for arm in arms {
            self.out.line(format!("case {}:", arm.tag));
            self.out.indent += 1;
            if flat {
                let expr = self.read_expr(&arm.ty);
                self.out.line(format!("return {expr}"));
            } else if self.resolves_to_void(&arm.ty) {
                self.out.line("return { tag }");
            } else {
                let expr = self.read_expr(&arm.ty);
                self.out.line(format!("return {{ tag, val: {expr} }}"));
            }
            self.out.indent -= 1;
        }
        self.out.line("default:");
        self.out.indent += 1;
        self.out.line("bc.offset = offset");
        self.out
            .line("throw new bare.BareError(offset, \"invalid tag\")");
        self.out.indent -= 1;
        self.out.close("}");
    }

    // ---- writers ----

    fn render_writer(&mut self, def: &AliasedType) {
        let name = &def.alias;
        let export = if def.exported { "export " } else { "" };
        let sig = if self.typed() {
            format!(
                "{export}function write{name}(bc: bare.ByteCursor, x: {}): void {{",
                self.def_type_ref(def)
            )
        } else {
            format!("{export}function write{name}(bc, x) {{")
        };
        self.out.open(sig);
        self.writer_body(&def.ty, def);
        self.out.close("}");
    }

    fn writer_body(&mut self, ty: &Type, def: &AliasedType) {
        match &ty.kind {
            TypeKind::Alias(_) | TypeKind::Scalar(_) | TypeKind::Data { len: None }
            | TypeKind::TypedArray { len: None, .. } => {
                self.write_stmt(ty, "x");
            }
            TypeKind::Data { len: Some(len) } => {
                self.out.line(format!("bare.writeFixedData(bc, x, {len})"));
            }
            TypeKind::TypedArray {
                elem,
                len: Some(len),
            } => {
                self.out.line(format!(
                    "bare.write{}FixedArray(bc, x, {len})",
                    scalar_fn(*elem)
                ));
            }
            TypeKind::Literal(_) => {}
            TypeKind::List { elem, len, .. } => self.list_writer(elem, *len),
            TypeKind::Set { elem, .. } => {
                self.out.line("bare.writeUintSafe(bc, x.size)");
                self.out.open("for (const item of x) {");
                self.write_stmt(elem, "item");
                self.out.close("}");
            }
            TypeKind::Map { key, value, .. } => {
                self.out.line("bare.writeUintSafe(bc, x.size)");
                self.out.open("for (const [key, value] of x) {");
                self.write_stmt(key, "key");
                self.write_stmt(value, "value");
                self.out.close("}");
            }
            TypeKind::Optional { elem, absent, lax } => {
                let present = presence_test(*absent, *lax);
                self.out.line(format!("bare.writeBool(bc, {present})"));
                self.out.open(format!("if ({present}) {{"));
                self.write_stmt(elem, "x");
                self.out.close("}");
            }
            TypeKind::Enum { members, repr } => self.enum_writer(def, members, *repr),
            TypeKind::Struct { fields, .. } => {
                for field in fields {
                    if !self.is_literal(&field.ty) {
                        self.write_stmt(&field.ty, &format!("x.{}", field.name));
                    }
                }
            }
            TypeKind::Union { arms, flat } => {
                if *flat {
                    self.flat_union_writer(arms);
                } else {
                    self.tagged_union_writer(arms);
                }
            }
        }
    }

    fn write_stmt(&mut self, ty: &Type, value: &str) {
        match &ty.kind {
            TypeKind::Alias(name) => {
                self.out.line(format!("write{name}(bc, {value})"));
            }
            TypeKind::Scalar(Scalar::Void) => {}
            TypeKind::Scalar(scalar) => {
                self.out
                    .line(format!("bare.write{}(bc, {value})", scalar_fn(*scalar)));
            }
            TypeKind::Data { len: None } => {
                self.out.line(format!("bare.writeData(bc, {value})"));
            }
            TypeKind::TypedArray { elem, len: None } => {
                self.out
                    .line(format!("bare.write{}Array(bc, {value})", scalar_fn(*elem)));
            }
            _ => unreachable!("composite children are hoisted before generation"),
        }
    }

    fn list_writer(&mut self, elem: &Type, len: Option<u64>) {
        match len {
            Some(len) => {
                self.out.open(format!("if (x.length !== {len}) {{"));
                self.out
                    .line(format!("throw new Error(\"expected an array of length {len}\")"));
                self.out.close("}");
            }
            None => {
                self.out.line("bare.writeUintSafe(bc, x.length)");
            }
        }
        self.out.open("for (let i = 0; i < x.length; i++) {");
        self.write_stmt(elem, "x[i]");
        self.out.close("}");
    }

    fn enum_writer(&mut self, def: &AliasedType, members: &[EnumMember], repr: EnumRepr) {
        let max = members.iter().map(|m| m.value).max().unwrap_or(0);
        self.out.open("switch (x) {");
        for member in members {
            let value = self.enum_member_expr(def, member, repr);
            self.out.line(format!("case {value}:"));
            self.out.indent += 1;
            self.out
                .line(format!("{}(bc, {})", tag_write_fn(max), member.value));
            self.out.line("break");
            self.out.indent -= 1;
        }
        self.out.close("}");
    }

    fn tagged_union_writer(&mut self, arms: &[UnionArm]) {
        let max = arms.iter().map(|arm| arm.tag).max().unwrap_or(0);
        self.out.line(format!("{}(bc, x.tag)", tag_write_fn(max)));
        self.out.open("switch (x.tag) {");
        for arm in arms {
            self.out.line(format!("case {}:", arm.tag));
            self.out.indent += 1;
            if !self.resolves_to_void(&arm.ty) {
                self.write_stmt(&arm.ty, "x.val");
            }
            self.out.line("break");
            self.out.indent -= 1;
        }
        self.out.close("}");
    }

    /// Encode-side dispatch for flat unions: by runtime class for
    /// scalar-shaped unions, by class identity or leading discriminator for
    /// struct-shaped ones. Decode-side dispatch is always by wire tag.
    fn flat_union_writer(&mut self, arms: &[UnionArm]) {
        let max = arms.iter().map(|arm| arm.tag).max().unwrap_or(0);
        if arms.len() == 1 {
            let arm = &arms[0];
            self.out
                .line(format!("{}(bc, {})", tag_write_fn(max), arm.tag));
            self.write_stmt(&arm.ty, "x");
            return;
        }

        let all_structs = arms.iter().all(|arm| {
            matches!(
                resolve(&arm.ty, &self.symbols).kind,
                TypeKind::Struct { .. }
            )
        });

        if !all_structs {
            for (i, arm) in arms.iter().enumerate() {
                let test = self.category_test(&arm.ty);
                if i == 0 {
                    self.out.open(format!("if ({test}) {{"));
                } else if i == arms.len() - 1 {
                    self.out.indent -= 1;
                    self.out.open("} else {");
                } else {
                    self.out.indent -= 1;
                    self.out.open(format!("}} else if ({test}) {{"));
                }
                self.out
                    .line(format!("{}(bc, {})", tag_write_fn(max), arm.tag));
                self.write_stmt(&arm.ty, "x");
            }
            self.out.close("}");
            return;
        }

        let all_classes = arms.iter().all(|arm| {
            matches!(
                resolve(&arm.ty, &self.symbols).kind,
                TypeKind::Struct { class: true, .. }
            )
        });
        if all_classes {
            for (i, arm) in arms.iter().enumerate() {
                let class = self.arm_class_name(&arm.ty);
                if i == 0 {
                    self.out.open(format!("if (x instanceof {class}) {{"));
                } else if i == arms.len() - 1 {
                    self.out.indent -= 1;
                    self.out.open("} else {");
                } else {
                    self.out.indent -= 1;
                    self.out
                        .open(format!("}} else if (x instanceof {class}) {{"));
                }
                self.out
                    .line(format!("{}(bc, {})", tag_write_fn(max), arm.tag));
                self.write_stmt(&arm.ty, "x");
            }
            self.out.close("}");
            return;
        }

        // Discriminated records: every arm starts with the same literal-typed
        // field, natural or injected.
        let disc = self.discriminator_name(&arms[0].ty);
        self.out.open(format!("switch (x.{disc}) {{"));
        for arm in arms {
            let value = self
                .leading_literal(&arm.ty)
                .map(|lit| literal_expr(&lit))
                .unwrap_or_else(|| arm.tag.to_string());
            self.out.line(format!("case {value}:"));
            self.out.indent += 1;
            self.out
                .line(format!("{}(bc, {})", tag_write_fn(max), arm.tag));
            self.write_stmt(&arm.ty, "x");
            self.out.line("break");
            self.out.indent -= 1;
        }
        self.out.close("}");
    }

    fn category_test(&self, ty: &Type) -> String {
        let category = match &resolve(ty, &self.symbols).kind {
            TypeKind::Scalar(scalar) => scalar.host_category(),
            TypeKind::Literal(lit) => lit.host_category(),
            TypeKind::Enum { repr, .. } => match repr {
                EnumRepr::StringKey => HostCategory::String,
                EnumRepr::IntKey => HostCategory::Number,
            },
            _ => HostCategory::Absent,
        };
        match category {
            HostCategory::Boolean => "typeof x === \"boolean\"".to_string(),
            HostCategory::Number => "typeof x === \"number\"".to_string(),
            HostCategory::BigInt => "typeof x === \"bigint\"".to_string(),
            HostCategory::String => "typeof x === \"string\"".to_string(),
            HostCategory::Absent => "x === undefined".to_string(),
        }
    }

    fn arm_class_name(&self, ty: &Type) -> String {
        let mut current = ty;
        while let TypeKind::Alias(name) = &current.kind {
            match self.symbols.get(name.as_str()) {
                Some(def) => {
                    if matches!(def.ty.kind, TypeKind::Struct { .. }) {
                        return self.class_name(def);
                    }
                    current = &def.ty;
                }
                None => break,
            }
        }
        self.type_expr(ty)
    }

    fn discriminator_name(&self, ty: &Type) -> String {
        match &resolve(ty, &self.symbols).kind {
            TypeKind::Struct { fields, .. } => fields
                .first()
                .map(|f| f.name.clone())
                .unwrap_or_else(|| "tag".to_string()),
            _ => "tag".to_string(),
        }
    }

    fn leading_literal(&self, ty: &Type) -> Option<Literal> {
        match &resolve(ty, &self.symbols).kind {
            TypeKind::Struct { fields, .. } => self.literal_of(&fields.first()?.ty),
            _ => None,
        }
    }

    // ---- roots ----

    fn render_root(&mut self, root: &str) {
        let ty = if self.typed() {
            self.symbols
                .get(root)
                .map(|def| self.def_type_ref(def))
                .unwrap_or_else(|| root.to_string())
        } else {
            String::new()
        };

        self.out.blank();
        match self.mode {
            Generator::Dts => {
                self.out.line(format!(
                    "export declare function encode{root}(x: {ty}, config?: Partial<bare.Config>): Uint8Array"
                ));
                self.out.line(format!(
                    "export declare function decode{root}(bytes: Uint8Array): {ty}"
                ));
            }
            Generator::Ts => {
                self.out.open(format!(
                    "export function encode{root}(x: {ty}, config: Partial<bare.Config> = {{}}): Uint8Array {{"
                ));
                self.encode_body(root);
                self.out.close("}");
                self.out.blank();
                self.out.open(format!(
                    "export function decode{root}(bytes: Uint8Array): {ty} {{"
                ));
                self.decode_body(root);
                self.out.close("}");
            }
            Generator::Js => {
                self.out
                    .open(format!("export function encode{root}(x, config = {{}}) {{"));
                self.encode_body(root);
                self.out.close("}");
                self.out.blank();
                self.out
                    .open(format!("export function decode{root}(bytes) {{"));
                self.decode_body(root);
                self.out.close("}");
            }
            Generator::Bare => {}
        }
    }

    fn encode_body(&mut self, root: &str) {
        self.out.line("const fullConfig = bare.Config(config)");
        self.out.line(
            "const bc = new bare.ByteCursor(new Uint8Array(fullConfig.initialBufferLength), fullConfig)",
        );
        self.out.line(format!("write{root}(bc, x)"));
        self.out
            .line("return new Uint8Array(bc.view.buffer, bc.view.byteOffset, bc.offset)");
    }

    fn decode_body(&mut self, root: &str) {
        self.out
            .line("const bc = new bare.ByteCursor(bytes, bare.Config({}))");
        self.out.line(format!("const result = read{root}(bc)"));
        self.out.open("if (bc.offset < bc.view.byteLength) {");
        self.out
            .line("throw new bare.BareError(bc.offset, \"remaining bytes\")");
        self.out.close("}");
        self.out.line("return result");
    }

    // ---- misc ----

    fn doc(&mut self, doc: Option<&str>) {
        let Some(doc) = doc else { return };
        self.out.line("/**");
        for line in doc.lines() {
            if line.is_empty() {
                self.out.line(" *");
            } else {
                self.out.line(format!(" * {line}"));
            }
        }
        self.out.line(" */");
    }
}

fn scalar_fn(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Bool => "Bool",
        Scalar::F32 => "F32",
        Scalar::F64 => "F64",
        Scalar::I8 => "I8",
        Scalar::I16 => "I16",
        Scalar::I32 => "I32",
        Scalar::I64 => "I64",
        Scalar::I64Safe => "I64Safe",
        Scalar::Int => "Int",
        Scalar::IntSafe => "IntSafe",
        Scalar::Str => "String",
        Scalar::U8 => "U8",
        Scalar::U16 => "U16",
        Scalar::U32 => "U32",
        Scalar::U64 => "U64",
        Scalar::U64Safe => "U64Safe",
        Scalar::Uint => "Uint",
        Scalar::UintSafe => "UintSafe",
        Scalar::Void => "Void",
    }
}

fn scalar_type(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Bool => "boolean",
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
        | Scalar::UintSafe => "number",
        Scalar::I64 | Scalar::Int | Scalar::U64 | Scalar::Uint => "bigint",
        Scalar::Str => "string",
        Scalar::Void => "undefined",
    }
}

fn typed_array_type(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::I8 => "Int8Array",
        Scalar::I16 => "Int16Array",
        Scalar::I32 => "Int32Array",
        Scalar::I64 => "BigInt64Array",
        Scalar::U8 => "Uint8Array",
        Scalar::U16 => "Uint16Array",
        Scalar::U32 => "Uint32Array",
        Scalar::U64 => "BigUint64Array",
        Scalar::F32 => "Float32Array",
        Scalar::F64 => "Float64Array",
        _ => "never",
    }
}

/// Tags and enum values bounded under 128 fit one raw byte on the wire.
fn tag_read_fn(max: u64) -> &'static str {
    if max < 128 {
        "bare.readU8"
    } else {
        "bare.readUintSafe"
    }
}

fn tag_write_fn(max: u64) -> &'static str {
    if max < 128 {
        "bare.writeU8"
    } else {
        "bare.writeUintSafe"
    }
}

fn enum_member_literal(member: &EnumMember, repr: EnumRepr) -> String {
    match repr {
        EnumRepr::StringKey => format!("\"{}\"", member.name),
        EnumRepr::IntKey => member.value.to_string(),
    }
}

fn literal_expr(lit: &Literal) -> String {
    match lit {
        Literal::Bool(v) => v.to_string(),
        Literal::Int(v) => v.to_string(),
        Literal::Str(v) => format!("\"{v}\""),
    }
}

fn literal_type(lit: &Literal) -> String {
    literal_expr(lit)
}

fn absent_expr(absent: Absent) -> &'static str {
    match absent {
        Absent::Undefined => "undefined",
        Absent::Null => "null",
    }
}

fn presence_test(absent: Absent, lax: bool) -> &'static str {
    if lax {
        "x != null"
    } else {
        match absent {
            Absent::Undefined => "x !== undefined",
            Absent::Null => "x !== null",
        }
    }
}

fn parenthesize(expr: &str) -> String {
    if expr.contains(' ') || expr.contains('|') {
        format!("({expr})")
    } else {
        expr.to_string()
    }
}
