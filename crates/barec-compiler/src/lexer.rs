//! Single-pass tokenizer for schema text.
//!
//! Tokens are span-based; text is sliced from the source on demand. `#`
//! comments run to end of line; consecutive comment lines concatenate into a
//! pending doc-comment buffer that the parser takes when it starts the next
//! declaration. A blank line clears the buffer, which is what scopes a doc
//! comment to the declaration directly below it.

use logos::Logos;

use crate::ast::Span;
use crate::error::Fail;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
enum RawToken {
    #[token("\n")]
    Newline,

    #[regex(r"#[^\n]*", allow_greedy = true)]
    Comment,

    #[regex(r"[A-Za-z0-9_]+")]
    Word,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("|")]
    Pipe,
    #[token("=")]
    Eq,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
}

/// Token kinds the parser sees. Comments and newlines never surface here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Maximal `\w+` run: keyword, name, or number.
    Word,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Lt,
    Gt,
    Pipe,
    Eq,
    Colon,
    Comma,
    /// End of input. Returned repeatedly once reached.
    Eof,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub(crate) struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, RawToken>,
    /// Concatenated comment lines waiting to attach to the next declaration.
    pending_doc: Option<String>,
    /// Newlines seen since the last comment or token; two in a row form a
    /// blank line and drop the pending doc comment.
    newlines: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            inner: RawToken::lexer(source),
            pending_doc: None,
            newlines: 0,
        }
    }

    /// Next significant token, skipping whitespace and comment runs.
    pub fn next(&mut self) -> Result<Token, Fail> {
        loop {
            let Some(raw) = self.inner.next() else {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    span: Span::point(self.source.len()),
                });
            };
            let span = Span::new(self.inner.span().start, self.inner.span().end);
            let raw = match raw {
                Ok(raw) => raw,
                Err(()) => {
                    let text = self.inner.slice();
                    return Err(Fail::lex(
                        span,
                        format!("unexpected character {:?}", text.chars().next().unwrap_or('\0')),
                    ));
                }
            };
            let kind = match raw {
                RawToken::Newline => {
                    self.newlines += 1;
                    if self.newlines >= 2 {
                        self.pending_doc = None;
                    }
                    continue;
                }
                RawToken::Comment => {
                    self.push_doc_line(self.inner.slice());
                    self.newlines = 0;
                    continue;
                }
                RawToken::Word => TokenKind::Word,
                RawToken::LBrace => TokenKind::LBrace,
                RawToken::RBrace => TokenKind::RBrace,
                RawToken::LBracket => TokenKind::LBracket,
                RawToken::RBracket => TokenKind::RBracket,
                RawToken::LParen => TokenKind::LParen,
                RawToken::RParen => TokenKind::RParen,
                RawToken::Lt => TokenKind::Lt,
                RawToken::Gt => TokenKind::Gt,
                RawToken::Pipe => TokenKind::Pipe,
                RawToken::Eq => TokenKind::Eq,
                RawToken::Colon => TokenKind::Colon,
                RawToken::Comma => TokenKind::Comma,
            };
            self.newlines = 0;
            return Ok(Token { kind, span });
        }
    }

    fn push_doc_line(&mut self, comment: &str) {
        let line = comment.strip_prefix('#').unwrap_or(comment);
        let line = line.strip_prefix(' ').unwrap_or(line);
        let doc = self.pending_doc.get_or_insert_with(String::new);
        if !doc.is_empty() {
            doc.push('\n');
        }
        doc.push_str(line);
    }

    /// Take the accumulated doc comment, leaving the buffer empty.
    pub fn take_doc(&mut self) -> Option<String> {
        self.pending_doc.take()
    }

    /// Text slice of a token. O(1) into the source.
    pub fn text(&self, token: Token) -> &'src str {
        &self.source[token.span.range()]
    }
}
