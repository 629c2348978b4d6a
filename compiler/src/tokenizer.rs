use std::io::Read;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::DgenError;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"^[+-]?[0-9]+$").unwrap();
}

pub const BUILTIN_TYPES: [&str; 13] = [
    "uint8", "uint16", "uint32", "uint64", "int8", "int16", "int32", "int64",
    "float32", "float64", "string", "list", "map",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Builtin,
    Enum,
    Message,
    Service,
    Seq,
    Optional,
    Return,
    Identifier,
    Number,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind:   TokenKind,
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

fn punctuation_kind(c: char) -> Option<TokenKind> {
    match c {
        '=' => Some(TokenKind::Assign),
        '(' => Some(TokenKind::LParen),
        ')' => Some(TokenKind::RParen),
        '[' => Some(TokenKind::LBracket),
        ']' => Some(TokenKind::RBracket),
        '{' => Some(TokenKind::LBrace),
        '}' => Some(TokenKind::RBrace),
        ',' => Some(TokenKind::Comma),
        ';' => Some(TokenKind::Semicolon),
        _   => None,
    }
}

/// Classifies a bare run of characters. Keywords and builtins are looked up
/// by text; numbers are whatever parses as an integer.
fn word_kind(text: &str) -> TokenKind {
    match text {
        "enum"     => TokenKind::Enum,
        "message"  => TokenKind::Message,
        "service"  => TokenKind::Service,
        "seq"      => TokenKind::Seq,
        "optional" => TokenKind::Optional,
        "return"   => TokenKind::Return,
        _ if BUILTIN_TYPES.contains(&text) => TokenKind::Builtin,
        _ if NUMBER.is_match(text)         => TokenKind::Number,
        _ => TokenKind::Identifier,
    }
}

struct Pending {
    text:   String,
    line:   usize,
    column: usize,
}

impl Pending {
    fn flush(&mut self, tokens: &mut Vec<Token>) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        tokens.push(Token {
            kind:   word_kind(&text),
            text,
            line:   self.line,
            column: self.column,
        });
    }
}

/// Splits schema text into tokens. Never fails: any run of characters that is
/// not whitespace, punctuation or a comment becomes an identifier or number.
/// A trailing `Eof` token marks the end-of-input position.
pub fn tokenize_schema(text: &str) -> Vec<Token> {
    let mut tokens  = Vec::new();
    let mut pending = Pending { text: String::new(), line: 1, column: 1 };
    let mut line    = 1;
    let mut column  = 1;
    let mut chars   = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '#' {
            pending.flush(&mut tokens);
            // Comment runs to end of line; the newline itself is handled below.
            while chars.next_if(|&next| next != '\n').is_some() {
                column += 1;
            }
            column += 1;
        } else if let Some(kind) = punctuation_kind(c) {
            pending.flush(&mut tokens);
            tokens.push(Token {
                kind,
                text: c.to_string(),
                line,
                column,
            });
            column += 1;
        } else if c.is_whitespace() {
            pending.flush(&mut tokens);
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        } else {
            if pending.text.is_empty() {
                pending.line = line;
                pending.column = column;
            }
            pending.text.push(c);
            column += 1;
        }
    }
    pending.flush(&mut tokens);

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        line,
        column,
    });
    tokens
}

/// Reads a whole schema from `reader` and tokenizes it. Only read faults
/// (including invalid UTF-8) are errors.
pub fn tokenize_reader<R: Read>(mut reader: R) -> Result<Vec<Token>, DgenError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(tokenize_schema(&text))
}
