//! Hand-written lexer for the assembly-format DSL.
//!
//! The DSL is a plain string, not Rust tokens: backtick literals and `$`
//! variables have no token-tree representation, so the stream is scanned
//! byte-by-byte with byte-offset spans.

use crate::diag::{Diagnostic, Span};

use super::errors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A bare identifier that is not a directive keyword.
    Ident,
    /// `$name` — the span covers the whole token, `text` holds `name`.
    Variable,
    /// A backtick-quoted literal; `text` holds the raw contents.
    Literal,
    /// A double-quoted string; `text` holds the unescaped contents.
    Str,

    KwAttrDict,
    KwAttrDictWithKeyword,
    KwCustom,
    KwFunctionalType,
    KwOilist,
    KwOperands,
    KwPropDict,
    KwQualified,
    KwRef,
    KwRegions,
    KwResults,
    KwSuccessors,
    KwType,

    LParen,
    RParen,
    Comma,
    Colon,
    Question,
    Pipe,
    Caret,
    Less,
    Greater,

    Eof,
}

impl TokenKind {
    pub fn is_directive_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::KwAttrDict
                | TokenKind::KwAttrDictWithKeyword
                | TokenKind::KwCustom
                | TokenKind::KwFunctionalType
                | TokenKind::KwOilist
                | TokenKind::KwOperands
                | TokenKind::KwPropDict
                | TokenKind::KwQualified
                | TokenKind::KwRef
                | TokenKind::KwRegions
                | TokenKind::KwResults
                | TokenKind::KwSuccessors
                | TokenKind::KwType
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Token {
            kind,
            span,
            text: text.into(),
        }
    }
}

fn keyword_kind(ident: &str) -> Option<TokenKind> {
    Some(match ident {
        "attr-dict" => TokenKind::KwAttrDict,
        "attr-dict-with-keyword" => TokenKind::KwAttrDictWithKeyword,
        "custom" => TokenKind::KwCustom,
        "functional-type" => TokenKind::KwFunctionalType,
        "oilist" => TokenKind::KwOilist,
        "operands" => TokenKind::KwOperands,
        "prop-dict" => TokenKind::KwPropDict,
        "qualified" => TokenKind::KwQualified,
        "ref" => TokenKind::KwRef,
        "regions" => TokenKind::KwRegions,
        "results" => TokenKind::KwResults,
        "successors" => TokenKind::KwSuccessors,
        "type" => TokenKind::KwType,
        _ => return None,
    })
}

/// Lex a format string into tokens. The returned stream always ends with an
/// [`TokenKind::Eof`] token spanning the end of the input.
pub fn lex(format: &str) -> Result<Vec<Token>, Diagnostic> {
    let bytes = format.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let start = pos;
        let b = bytes[pos];
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
            }
            b'(' => tokens.push(punct(TokenKind::LParen, &mut pos, start, "(")),
            b')' => tokens.push(punct(TokenKind::RParen, &mut pos, start, ")")),
            b',' => tokens.push(punct(TokenKind::Comma, &mut pos, start, ",")),
            b':' => tokens.push(punct(TokenKind::Colon, &mut pos, start, ":")),
            b'?' => tokens.push(punct(TokenKind::Question, &mut pos, start, "?")),
            b'|' => tokens.push(punct(TokenKind::Pipe, &mut pos, start, "|")),
            b'^' => tokens.push(punct(TokenKind::Caret, &mut pos, start, "^")),
            b'<' => tokens.push(punct(TokenKind::Less, &mut pos, start, "<")),
            b'>' => tokens.push(punct(TokenKind::Greater, &mut pos, start, ">")),
            b'`' => {
                pos += 1;
                let content_start = pos;
                while pos < bytes.len() && bytes[pos] != b'`' {
                    pos += 1;
                }
                if pos == bytes.len() {
                    return Err(errors::unterminated_literal(Span::new(start, pos)));
                }
                let text = &format[content_start..pos];
                pos += 1;
                tokens.push(Token::new(TokenKind::Literal, Span::new(start, pos), text));
            }
            b'"' => {
                pos += 1;
                let mut text = String::new();
                loop {
                    if pos == bytes.len() {
                        return Err(errors::unterminated_string(Span::new(start, pos)));
                    }
                    match bytes[pos] {
                        b'"' => break,
                        b'\\' if pos + 1 < bytes.len() => {
                            // Pass escapes through verbatim minus the slash.
                            text.push(bytes[pos + 1] as char);
                            pos += 2;
                        }
                        c => {
                            text.push(c as char);
                            pos += 1;
                        }
                    }
                }
                pos += 1;
                tokens.push(Token::new(TokenKind::Str, Span::new(start, pos), text));
            }
            b'$' => {
                pos += 1;
                let name_start = pos;
                while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                    pos += 1;
                }
                if pos == name_start {
                    return Err(errors::empty_variable_name(Span::new(start, pos)));
                }
                tokens.push(Token::new(
                    TokenKind::Variable,
                    Span::new(start, pos),
                    &format[name_start..pos],
                ));
            }
            c if is_ident_start(c) => {
                // Identifiers may embed `-` so that `attr-dict` and friends
                // lex as one token; a trailing `-` is never consumed.
                while pos < bytes.len()
                    && (is_ident_continue(bytes[pos])
                        || (bytes[pos] == b'-'
                            && pos + 1 < bytes.len()
                            && is_ident_continue(bytes[pos + 1])))
                {
                    pos += 1;
                }
                let text = &format[start..pos];
                let kind = keyword_kind(text).unwrap_or(TokenKind::Ident);
                tokens.push(Token::new(kind, Span::new(start, pos), text));
            }
            other => {
                return Err(errors::unexpected_character(
                    other as char,
                    Span::new(start, start + 1),
                ));
            }
        }
    }

    tokens.push(Token::new(
        TokenKind::Eof,
        Span::point(bytes.len()),
        String::new(),
    ));
    Ok(tokens)
}

fn punct(kind: TokenKind, pos: &mut usize, start: usize, text: &str) -> Token {
    *pos += 1;
    Token::new(kind, Span::new(start, start + 1), text)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(format: &str) -> Vec<TokenKind> {
        lex(format).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn directive_keywords() {
        assert_eq!(
            kinds("$lhs `,` $rhs attr-dict `:` type($lhs)"),
            vec![
                TokenKind::Variable,
                TokenKind::Literal,
                TokenKind::Variable,
                TokenKind::KwAttrDict,
                TokenKind::Literal,
                TokenKind::KwType,
                TokenKind::LParen,
                TokenKind::Variable,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn attr_dict_with_keyword_is_one_token() {
        let tokens = lex("attr-dict-with-keyword").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::KwAttrDictWithKeyword);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn variable_spans_cover_the_dollar() {
        let tokens = lex("  $value").unwrap();
        assert_eq!(tokens[0].text, "value");
        assert_eq!(tokens[0].span, Span::new(2, 8));
    }

    #[test]
    fn whitespace_and_empty_literals() {
        let tokens = lex("` ` `` `\\n`").unwrap();
        assert_eq!(tokens[0].text, " ");
        assert_eq!(tokens[1].text, "");
        assert_eq!(tokens[2].text, "\\n");
    }

    #[test]
    fn custom_directive_tokens() {
        assert_eq!(
            kinds("custom<MyThing>($a, \"ctx\")"),
            vec![
                TokenKind::KwCustom,
                TokenKind::Less,
                TokenKind::Ident,
                TokenKind::Greater,
                TokenKind::LParen,
                TokenKind::Variable,
                TokenKind::Comma,
                TokenKind::Str,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_literal_is_an_error() {
        assert!(lex("`oops").is_err());
        assert!(lex("\"oops").is_err());
        assert!(lex("$").is_err());
    }
}
