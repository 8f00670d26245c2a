//! Recursive-descent parser with single-token lookahead.
//!
//! Naming conventions are enforced here, not later: aliases are
//! UpperCamelCase, struct fields lowerCamelCase, enum members
//! UPPER_SNAKE_CASE. Enum values and union tags share one auto-increment
//! rule: an omitted value is previous+1 (starting at 0) and an explicit value
//! must be strictly greater than the previous one. The first violation wins;
//! there is no recovery.

use std::rc::Rc;

use indexmap::IndexSet;

use crate::ast::{
    AliasedType, EnumMember, EnumRepr, Literal, Scalar, Schema, Span, StructField, Type, TypeKind,
    UnionArm,
};
use crate::config::Config;
use crate::error::{CompileError, Fail};
use crate::lexer::{Lexer, Token, TokenKind};

/// Parse schema text into an AST. Fails on the first grammar or naming
/// violation with a positioned parse error.
pub fn parse(source: &str, filename: &str, config: &Config) -> Result<Rc<Schema>, CompileError> {
    let run = || -> Result<Vec<Rc<AliasedType>>, Fail> {
        let mut parser = Parser::new(source, config)?;
        parser.parse_schema()
    };
    run()
        .map(|defs| {
            Rc::new(Schema {
                defs,
                filename: Rc::from(filename),
                source: Rc::from(source),
            })
        })
        .map_err(|fail| fail.into_error(source, filename))
}

struct Parser<'src, 'cfg> {
    lexer: Lexer<'src>,
    config: &'cfg Config,
    current: Token,
    /// End offset of the previously consumed token, for span building.
    prev_end: usize,
}

impl<'src, 'cfg> Parser<'src, 'cfg> {
    fn new(source: &'src str, config: &'cfg Config) -> Result<Self, Fail> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next()?;
        Ok(Self {
            lexer,
            config,
            current,
            prev_end: 0,
        })
    }

    fn parse_schema(&mut self) -> Result<Vec<Rc<AliasedType>>, Fail> {
        let mut defs: Vec<Rc<AliasedType>> = Vec::new();
        let mut names: IndexSet<String> = IndexSet::new();

        while self.current.kind != TokenKind::Eof {
            let def = self.parse_decl(&mut names)?;
            defs.push(Rc::new(def));
        }

        if defs.is_empty() {
            return Err(Fail::parse(Span::point(0), "schema is empty"));
        }

        Ok(defs)
    }

    fn parse_decl(&mut self, names: &mut IndexSet<String>) -> Result<AliasedType, Fail> {
        let doc = self.lexer.take_doc();
        let start = self.current.span.start;
        let keyword = self.expect_word("a type declaration")?;
        let keyword_text = self.lexer.text(keyword);

        let (alias, alias_span, ty) = match keyword_text {
            "type" => {
                let (alias, alias_span) = self.parse_alias_name()?;
                let ty = self.parse_type()?;
                if let TypeKind::Alias(target) = &ty.kind
                    && *target == alias
                {
                    return Err(Fail::parse(
                        ty.span,
                        format!("alias '{alias}' aliases itself"),
                    ));
                }
                (alias, alias_span, ty)
            }
            "enum" | "struct" => {
                if !self.config.legacy {
                    return Err(Fail::parse(
                        keyword.span,
                        format!(
                            "legacy declaration; use 'type Name {keyword_text} {{...}}' \
                             or enable legacy syntax"
                        ),
                    ));
                }
                let (alias, alias_span) = self.parse_alias_name()?;
                let ty = if keyword_text == "enum" {
                    self.parse_enum_body(start)?
                } else {
                    self.parse_struct_body(start)?
                };
                (alias, alias_span, ty)
            }
            other => {
                return Err(Fail::parse(
                    keyword.span,
                    format!("expected a type declaration, found '{other}'"),
                ));
            }
        };

        if !names.insert(alias.clone()) {
            return Err(Fail::parse(
                alias_span,
                format!("alias '{alias}' is already defined"),
            ));
        }

        Ok(AliasedType {
            alias,
            exported: true,
            ty: Rc::new(ty),
            span: Span::new(start, self.prev_end),
            doc,
        })
    }

    fn parse_alias_name(&mut self) -> Result<(String, Span), Fail> {
        let token = self.expect_word("an alias name")?;
        let text = self.lexer.text(token);
        if !is_upper_camel(text) {
            return Err(Fail::parse(
                token.span,
                format!("alias '{text}' must be UpperCamelCase"),
            ));
        }
        Ok((text.to_string(), token.span))
    }

    fn parse_type(&mut self) -> Result<Type, Fail> {
        let start = self.current.span.start;
        match self.current.kind {
            TokenKind::Word => self.parse_word_type(start),
            TokenKind::LBracket => self.parse_array_type(start),
            TokenKind::LParen => {
                self.advance()?;
                let arms = self.parse_union_arms(TokenKind::RParen)?;
                Ok(self.finish(start, TypeKind::Union { arms, flat: false }))
            }
            _ => Err(Fail::parse(
                self.current.span,
                format!("expected a type, found '{}'", self.describe_current()),
            )),
        }
    }

    fn parse_word_type(&mut self, start: usize) -> Result<Type, Fail> {
        let token = self.bump()?;
        let text = self.lexer.text(token);

        if let Some(scalar) = self.scalar_keyword(text) {
            return Ok(self.finish(start, TypeKind::Scalar(scalar)));
        }

        match text {
            "data" => {
                let len = self.parse_fixed_len()?;
                Ok(self.finish(start, TypeKind::Data { len }))
            }
            "optional" => {
                self.expect(TokenKind::Lt, "'<'")?;
                let elem = self.parse_type()?;
                self.expect(TokenKind::Gt, "'>'")?;
                Ok(self.finish(
                    start,
                    TypeKind::Optional {
                        elem: Rc::new(elem),
                        absent: Default::default(),
                        lax: false,
                    },
                ))
            }
            "set" => {
                self.expect(TokenKind::Lt, "'<'")?;
                let elem = self.parse_type()?;
                self.expect(TokenKind::Gt, "'>'")?;
                Ok(self.finish(
                    start,
                    TypeKind::Set {
                        elem: Rc::new(elem),
                        mutable: false,
                    },
                ))
            }
            "map" => {
                self.expect(TokenKind::LBracket, "'['")?;
                let key = self.parse_type()?;
                self.check_map_key(&key)?;
                self.expect(TokenKind::RBracket, "']'")?;
                let value = self.parse_type()?;
                Ok(self.finish(
                    start,
                    TypeKind::Map {
                        key: Rc::new(key),
                        value: Rc::new(value),
                        mutable: false,
                    },
                ))
            }
            "enum" => self.parse_enum_body(start),
            "struct" => self.parse_struct_body(start),
            "union" => {
                self.expect(TokenKind::LBrace, "'{'")?;
                let arms = self.parse_union_arms(TokenKind::RBrace)?;
                Ok(self.finish(start, TypeKind::Union { arms, flat: false }))
            }
            "true" => Ok(self.finish(start, TypeKind::Literal(Literal::Bool(true)))),
            "false" => Ok(self.finish(start, TypeKind::Literal(Literal::Bool(false)))),
            _ if text.bytes().all(|b| b.is_ascii_digit()) => {
                let value: i64 = text
                    .parse()
                    .map_err(|_| Fail::parse(token.span, format!("number '{text}' is too large")))?;
                Ok(self.finish(start, TypeKind::Literal(Literal::Int(value))))
            }
            _ if is_upper_camel(text) => {
                Ok(self.finish(start, TypeKind::Alias(text.to_string())))
            }
            other => Err(Fail::parse(
                token.span,
                format!("expected a type, found '{other}'"),
            )),
        }
    }

    /// `[n]T`, `[]T`. Fixed-width numeric elements become typed arrays unless
    /// generic arrays were requested.
    fn parse_array_type(&mut self, start: usize) -> Result<Type, Fail> {
        self.expect(TokenKind::LBracket, "'['")?;
        let len = if self.current.kind == TokenKind::Word {
            Some(self.parse_number("a length")?)
        } else {
            None
        };
        self.expect(TokenKind::RBracket, "']'")?;
        let elem = self.parse_type()?;

        let kind = match elem.kind {
            TypeKind::Scalar(scalar)
                if scalar.typed_array_elem() && !self.config.use_generic_array =>
            {
                TypeKind::TypedArray { elem: scalar, len }
            }
            _ => TypeKind::List {
                elem: Rc::new(elem),
                len,
                mutable: false,
            },
        };
        Ok(self.finish(start, kind))
    }

    fn parse_fixed_len(&mut self) -> Result<Option<u64>, Fail> {
        if self.current.kind != TokenKind::LBracket {
            return Ok(None);
        }
        self.advance()?;
        let len = self.parse_number("a length")?;
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Some(len))
    }

    fn parse_enum_body(&mut self, start: usize) -> Result<Type, Fail> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut members: Vec<EnumMember> = Vec::new();
        let mut prev: Option<u64> = None;

        while self.current.kind != TokenKind::RBrace {
            let doc = self.lexer.take_doc();
            let token = self.expect_word("an enum member")?;
            let name = self.lexer.text(token).to_string();
            if !is_upper_snake(&name) {
                return Err(Fail::parse(
                    token.span,
                    format!("enum member '{name}' must be UPPER_SNAKE_CASE"),
                ));
            }
            if members.iter().any(|m| m.name == name) {
                return Err(Fail::parse(
                    token.span,
                    format!("enum member '{name}' is already defined"),
                ));
            }
            let value = self.parse_tag_value(&mut prev, "value")?;
            members.push(EnumMember {
                name,
                value,
                span: Span::new(token.span.start, self.prev_end),
                doc,
            });
        }
        self.advance()?; // closing brace

        Ok(self.finish(
            start,
            TypeKind::Enum {
                members,
                repr: EnumRepr::default(),
            },
        ))
    }

    fn parse_struct_body(&mut self, start: usize) -> Result<Type, Fail> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields: Vec<StructField> = Vec::new();

        while self.current.kind != TokenKind::RBrace {
            let doc = self.lexer.take_doc();
            let token = self.expect_word("a field name")?;
            let name = self.lexer.text(token).to_string();
            if !is_lower_camel(&name) {
                return Err(Fail::parse(
                    token.span,
                    format!("field '{name}' must be lowerCamelCase"),
                ));
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(Fail::parse(
                    token.span,
                    format!("field '{name}' is already defined"),
                ));
            }
            self.expect(TokenKind::Colon, "':'")?;
            let ty = self.parse_type()?;
            fields.push(StructField {
                name,
                ty: Rc::new(ty),
                span: Span::new(token.span.start, self.prev_end),
                doc,
            });
        }
        self.advance()?; // closing brace

        Ok(self.finish(
            start,
            TypeKind::Struct {
                fields,
                class: false,
            },
        ))
    }

    fn parse_union_arms(&mut self, close: TokenKind) -> Result<Vec<UnionArm>, Fail> {
        let mut arms: Vec<UnionArm> = Vec::new();
        let mut prev: Option<u64> = None;

        loop {
            let arm_start = self.current.span.start;
            let ty = self.parse_type()?;
            if arms.iter().any(|arm| arm.ty.structural_eq(&ty)) {
                return Err(Fail::parse(ty.span, "duplicated type in union"));
            }
            let tag = self.parse_tag_value(&mut prev, "tag")?;
            arms.push(UnionArm {
                tag,
                ty: Rc::new(ty),
                span: Span::new(arm_start, self.prev_end),
            });

            if self.current.kind == TokenKind::Pipe {
                self.advance()?;
            } else {
                break;
            }
        }

        if self.current.kind != close {
            return Err(Fail::parse(
                self.current.span,
                format!("expected '|' or '{}'", describe_kind(close)),
            ));
        }
        self.advance()?;
        Ok(arms)
    }

    /// Shared auto-increment rule for enum values and union tags.
    fn parse_tag_value(&mut self, prev: &mut Option<u64>, what: &str) -> Result<u64, Fail> {
        let value = if self.current.kind == TokenKind::Eq {
            self.advance()?;
            let token = self.current;
            let value = self.parse_number(&format!("a {what}"))?;
            if let Some(prev) = *prev
                && value <= prev
            {
                return Err(Fail::parse(
                    token.span,
                    format!("{what} {value} must be strictly greater than {prev}"),
                ));
            }
            value
        } else {
            if self.config.pedantic {
                return Err(Fail::parse(
                    self.current.span,
                    format!("pedantic mode requires an explicit {what}"),
                ));
            }
            match *prev {
                Some(prev) => prev.checked_add(1).ok_or_else(|| {
                    Fail::parse(self.current.span, format!("{what} overflows"))
                })?,
                None => 0,
            }
        };
        *prev = Some(value);
        Ok(value)
    }

    fn parse_number(&mut self, what: &str) -> Result<u64, Fail> {
        let token = self.expect_word(what)?;
        let text = self.lexer.text(token);
        if !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Fail::parse(
                token.span,
                format!("expected {what}, found '{text}'"),
            ));
        }
        text.parse()
            .map_err(|_| Fail::parse(token.span, format!("number '{text}' is too large")))
    }

    /// The immediate (syntactic) map-key restriction; the checker re-validates
    /// through aliases.
    fn check_map_key(&self, key: &Type) -> Result<(), Fail> {
        match &key.kind {
            TypeKind::Scalar(Scalar::Void) => {
                Err(Fail::parse(key.span, "map key cannot be void"))
            }
            TypeKind::Scalar(_) | TypeKind::Enum { .. } | TypeKind::Alias(_) => Ok(()),
            _ => Err(Fail::parse(
                key.span,
                "map key must be a scalar or enum type",
            )),
        }
    }

    fn scalar_keyword(&self, text: &str) -> Option<Scalar> {
        let safe = self.config.use_safe_int;
        let scalar = match text {
            "bool" => Scalar::Bool,
            "f32" => Scalar::F32,
            "f64" => Scalar::F64,
            "i8" => Scalar::I8,
            "i16" => Scalar::I16,
            "i32" => Scalar::I32,
            "i64" if safe => Scalar::I64Safe,
            "i64" => Scalar::I64,
            "int" if safe => Scalar::IntSafe,
            "int" => Scalar::Int,
            "str" | "string" => Scalar::Str,
            "u8" => Scalar::U8,
            "u16" => Scalar::U16,
            "u32" => Scalar::U32,
            "u64" if safe => Scalar::U64Safe,
            "u64" => Scalar::U64,
            "uint" if safe => Scalar::UintSafe,
            "uint" => Scalar::Uint,
            "void" => Scalar::Void,
            _ => return None,
        };
        Some(scalar)
    }

    fn finish(&self, start: usize, kind: TypeKind) -> Type {
        Type::new(kind, Span::new(start, self.prev_end))
    }

    fn advance(&mut self) -> Result<(), Fail> {
        self.prev_end = self.current.span.end;
        self.current = self.lexer.next()?;
        Ok(())
    }

    fn bump(&mut self) -> Result<Token, Fail> {
        let token = self.current;
        self.advance()?;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, Fail> {
        if self.current.kind != kind {
            return Err(Fail::parse(
                self.current.span,
                format!("expected {what}, found '{}'", self.describe_current()),
            ));
        }
        self.bump()
    }

    fn expect_word(&mut self, what: &str) -> Result<Token, Fail> {
        if self.current.kind != TokenKind::Word {
            return Err(Fail::parse(
                self.current.span,
                format!("expected {what}, found '{}'", self.describe_current()),
            ));
        }
        self.bump()
    }

    fn describe_current(&self) -> &str {
        match self.current.kind {
            TokenKind::Word => self.lexer.text(self.current),
            TokenKind::Eof => "end of input",
            other => describe_kind(other),
        }
    }
}

fn describe_kind(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Word => "word",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::Lt => "<",
        TokenKind::Gt => ">",
        TokenKind::Pipe => "|",
        TokenKind::Eq => "=",
        TokenKind::Colon => ":",
        TokenKind::Comma => ",",
        TokenKind::Eof => "end of input",
    }
}

fn is_upper_camel(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_uppercase())
        && s.bytes().skip(1).all(|b| b.is_ascii_alphanumeric())
}

fn is_lower_camel(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_lowercase())
        && s.bytes().skip(1).all(|b| b.is_ascii_alphanumeric())
}

fn is_upper_snake(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_uppercase())
        && s
            .bytes()
            .skip(1)
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}
