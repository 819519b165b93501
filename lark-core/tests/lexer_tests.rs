use lark_core::{tokenize, Error, TokenKind};

fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

// ============================================================================
// Token Kinds
// ============================================================================

#[test]
fn delimiters_and_atoms() {
    assert_eq!(
        kinds("(+ 1 2)"),
        vec![
            TokenKind::LParen,
            TokenKind::Symbol("+".to_string()),
            TokenKind::Number(1.0),
            TokenKind::Number(2.0),
            TokenKind::RParen,
        ]
    );
}

#[test]
fn brackets_and_braces() {
    assert_eq!(
        kinds("[{}]"),
        vec![
            TokenKind::LBracket,
            TokenKind::LBrace,
            TokenKind::RBrace,
            TokenKind::RBracket,
        ]
    );
}

#[test]
fn commas_are_whitespace() {
    assert_eq!(
        kinds("[1, 2,3]"),
        vec![
            TokenKind::LBracket,
            TokenKind::Number(1.0),
            TokenKind::Number(2.0),
            TokenKind::Number(3.0),
            TokenKind::RBracket,
        ]
    );
}

#[test]
fn reader_macro_tokens() {
    assert_eq!(
        kinds("'a `b ~c ~@d"),
        vec![
            TokenKind::Quote,
            TokenKind::Symbol("a".to_string()),
            TokenKind::Quasiquote,
            TokenKind::Symbol("b".to_string()),
            TokenKind::Unquote,
            TokenKind::Symbol("c".to_string()),
            TokenKind::UnquoteSplicing,
            TokenKind::Symbol("d".to_string()),
        ]
    );
}

#[test]
fn keywords_keep_their_colon() {
    assert_eq!(kinds(":foo"), vec![TokenKind::Keyword(":foo".to_string())]);
    assert_eq!(
        kinds(":ns/name"),
        vec![TokenKind::Keyword(":ns/name".to_string())]
    );
}

#[test]
fn true_false_nil_are_symbols_at_the_token_layer() {
    assert_eq!(
        kinds("true false nil"),
        vec![
            TokenKind::Symbol("true".to_string()),
            TokenKind::Symbol("false".to_string()),
            TokenKind::Symbol("nil".to_string()),
        ]
    );
}

#[test]
fn symbols_may_contain_slashes_and_punctuation() {
    assert_eq!(
        kinds("m/pi <ok->done?"),
        vec![
            TokenKind::Symbol("m/pi".to_string()),
            TokenKind::Symbol("<ok->done?".to_string()),
        ]
    );
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn numbers_parse() {
    assert_eq!(kinds("42"), vec![TokenKind::Number(42.0)]);
    assert_eq!(kinds("-7"), vec![TokenKind::Number(-7.0)]);
    assert_eq!(kinds("3.25"), vec![TokenKind::Number(3.25)]);
    assert_eq!(kinds("-0.5"), vec![TokenKind::Number(-0.5)]);
}

#[test]
fn minus_alone_is_a_symbol() {
    assert_eq!(kinds("-"), vec![TokenKind::Symbol("-".to_string())]);
    assert_eq!(kinds("-abc"), vec![TokenKind::Symbol("-abc".to_string())]);
}

#[test]
fn trailing_dot_is_malformed() {
    let err = tokenize("1.").unwrap_err();
    match err {
        Error::Tokenizer { message, .. } => assert!(message.contains("1.")),
        other => panic!("expected tokenizer error, got {other:?}"),
    }
}

#[test]
fn multi_dot_is_malformed() {
    let err = tokenize("1.2.3").unwrap_err();
    match err {
        Error::Tokenizer { message, .. } => assert!(message.contains("1.2.3")),
        other => panic!("expected tokenizer error, got {other:?}"),
    }
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn string_escapes() {
    assert_eq!(
        kinds(r#""a\nb\t\"c\"\\""#),
        vec![TokenKind::Str("a\nb\t\"c\"\\".to_string())]
    );
}

#[test]
fn unknown_escape_emits_the_character() {
    assert_eq!(kinds(r#""\q""#), vec![TokenKind::Str("q".to_string())]);
}

#[test]
fn literal_newlines_inside_strings() {
    assert_eq!(kinds("\"a\nb\""), vec![TokenKind::Str("a\nb".to_string())]);
}

#[test]
fn unterminated_string_is_an_error() {
    let err = tokenize("\"abc").unwrap_err();
    match err {
        Error::Tokenizer { line, col, .. } => {
            assert_eq!(line, 1);
            assert_eq!(col, 1);
        }
        other => panic!("expected tokenizer error, got {other:?}"),
    }
}

// ============================================================================
// Comments and Positions
// ============================================================================

#[test]
fn comments_are_retained_at_the_token_layer() {
    assert_eq!(
        kinds("; hello\n42"),
        vec![TokenKind::Comment, TokenKind::Number(42.0)]
    );
}

#[test]
fn comment_runs_to_end_of_line() {
    assert_eq!(kinds("1 ; 2 3\n4"), vec![
        TokenKind::Number(1.0),
        TokenKind::Comment,
        TokenKind::Number(4.0),
    ]);
}

#[test]
fn tokens_carry_positions() {
    let tokens = tokenize("(+ 1\n 2)").unwrap();
    let one = &tokens[2];
    assert_eq!(one.kind, TokenKind::Number(1.0));
    assert_eq!((one.start.line, one.start.col, one.start.offset), (1, 4, 3));

    let two = &tokens[3];
    assert_eq!(two.kind, TokenKind::Number(2.0));
    assert_eq!((two.start.line, two.start.col, two.start.offset), (2, 2, 6));
    assert_eq!((two.end.line, two.end.col), (2, 3));
}
