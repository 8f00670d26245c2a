use super::lexer::{Lexer, TokenKind};

fn kinds(src: &str) -> Vec<TokenKind> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        let token = lexer.next().expect("valid input");
        if token.kind == TokenKind::Eof {
            return out;
        }
        out.push(token.kind);
    }
}

#[test]
fn words_and_punctuation() {
    assert_eq!(
        kinds("type Person struct { name: str }"),
        vec![
            TokenKind::Word,
            TokenKind::Word,
            TokenKind::Word,
            TokenKind::LBrace,
            TokenKind::Word,
            TokenKind::Colon,
            TokenKind::Word,
            TokenKind::RBrace,
        ]
    );
}

#[test]
fn spans_slice_source() {
    let src = "map[str]u8";
    let mut lexer = Lexer::new(src);
    let token = lexer.next().unwrap();
    assert_eq!(lexer.text(token), "map");
    let token = lexer.next().unwrap();
    assert_eq!(token.kind, TokenKind::LBracket);
    assert_eq!(token.span.start, 3);
}

#[test]
fn eof_is_stable() {
    let mut lexer = Lexer::new("u8");
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Word);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
    assert_eq!(lexer.next().unwrap().kind, TokenKind::Eof);
}

#[test]
fn rejects_unknown_character() {
    let mut lexer = Lexer::new("type A €");
    lexer.next().unwrap();
    lexer.next().unwrap();
    let err = lexer.next().unwrap_err();
    assert_eq!(err.span.start, 7);
    assert!(err.message.contains("unexpected character"));
}

#[test]
fn doc_comment_attaches_to_next_token() {
    let mut lexer = Lexer::new("# first line\n# second line\ntype A u8");
    let token = lexer.next().unwrap();
    assert_eq!(lexer.text(token), "type");
    assert_eq!(lexer.take_doc().as_deref(), Some("first line\nsecond line"));
}

#[test]
fn blank_line_clears_doc_comment() {
    let mut lexer = Lexer::new("# detached\n\ntype A u8");
    lexer.next().unwrap();
    assert_eq!(lexer.take_doc(), None);
}

#[test]
fn blank_line_splits_comment_runs() {
    let mut lexer = Lexer::new("# old\n\n# kept\ntype A u8");
    lexer.next().unwrap();
    assert_eq!(lexer.take_doc().as_deref(), Some("kept"));
}
