//=====================================================
// File: tokenizer/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: GatoScript tokenizer
// Objective: Turn GatoScript source text into positioned tokens for the parser
//=====================================================

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Represents the position of a token in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// All possible token types in GatoScript
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    String(String),
    Boolean(bool),
    Null,

    Identifier(String),

    // Keywords
    Let,
    Fn,
    Return,
    If,
    Else,
    While,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    EqualEqual,
    Not,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::Null => f.write_str("null"),
            TokenKind::Identifier(s) => f.write_str(s),
            TokenKind::Let => f.write_str("let"),
            TokenKind::Fn => f.write_str("fn"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::While => f.write_str("while"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Equal => f.write_str("="),
            TokenKind::EqualEqual => f.write_str("=="),
            TokenKind::Not => f.write_str("!"),
            TokenKind::NotEqual => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEqual => f.write_str("<="),
            TokenKind::GreaterEqual => f.write_str(">="),
            TokenKind::PlusEqual => f.write_str("+="),
            TokenKind::MinusEqual => f.write_str("-="),
            TokenKind::StarEqual => f.write_str("*="),
            TokenKind::SlashEqual => f.write_str("/="),
            TokenKind::LeftParen => f.write_str("("),
            TokenKind::RightParen => f.write_str(")"),
            TokenKind::LeftBrace => f.write_str("{"),
            TokenKind::RightBrace => f.write_str("}"),
            TokenKind::LeftBracket => f.write_str("["),
            TokenKind::RightBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

/// A token with its kind and position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: Position },
    #[error("unterminated string literal starting at {position}")]
    UnterminatedString { position: Position },
    #[error("invalid integer literal '{literal}' at {position}")]
    InvalidInteger { literal: String, position: Position },
}

/// Tokenizer for GatoScript
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    keywords: HashMap<&'static str, TokenKind>,
    tokens: Vec<Token>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        let keywords = HashMap::from([
            ("let", TokenKind::Let),
            ("fn", TokenKind::Fn),
            ("return", TokenKind::Return),
            ("if", TokenKind::If),
            ("else", TokenKind::Else),
            ("while", TokenKind::While),
            ("true", TokenKind::Boolean(true)),
            ("false", TokenKind::Boolean(false)),
            ("null", TokenKind::Null),
        ]);

        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            keywords,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenizeError> {
        loop {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }

            let ch = self.current_char();
            if ch == '"' {
                self.handle_string()?;
            } else if ch.is_ascii_digit() {
                self.handle_number()?;
            } else if ch.is_alphabetic() || ch == '_' {
                self.handle_identifier();
            } else {
                self.handle_operator_or_delimiter()?;
            }
        }

        let end = self.current_position();
        self.tokens.push(Token::new(TokenKind::Eof, end));
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input.get(self.position).copied().unwrap_or('\0')
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.current_char();
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column, self.position)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_char() == Some('/') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn handle_string(&mut self) -> Result<(), TokenizeError> {
        let start = self.current_position();
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(TokenizeError::UnterminatedString { position: start });
            }
            match self.advance() {
                '"' => break,
                '\\' => {
                    if self.is_at_end() {
                        return Err(TokenizeError::UnterminatedString { position: start });
                    }
                    match self.advance() {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\\' => value.push('\\'),
                        '"' => value.push('"'),
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                other => value.push(other),
            }
        }

        self.tokens.push(Token::new(TokenKind::String(value), start));
        Ok(())
    }

    fn handle_number(&mut self) -> Result<(), TokenizeError> {
        let start = self.current_position();
        let mut literal = String::new();
        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            literal.push(self.advance());
        }

        match literal.parse::<i64>() {
            Ok(value) => {
                self.tokens.push(Token::new(TokenKind::Integer(value), start));
                Ok(())
            }
            Err(_) => Err(TokenizeError::InvalidInteger {
                literal,
                position: start,
            }),
        }
    }

    fn handle_identifier(&mut self) {
        let start = self.current_position();
        let mut identifier = String::new();
        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            identifier.push(self.advance());
        }

        let kind = self
            .keywords
            .get(identifier.as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(identifier));
        self.tokens.push(Token::new(kind, start));
    }

    fn handle_operator_or_delimiter(&mut self) -> Result<(), TokenizeError> {
        let start = self.current_position();
        let ch = self.advance();

        let kind = match ch {
            '+' => self.with_equal(TokenKind::PlusEqual, TokenKind::Plus),
            '-' => self.with_equal(TokenKind::MinusEqual, TokenKind::Minus),
            '*' => self.with_equal(TokenKind::StarEqual, TokenKind::Star),
            '/' => self.with_equal(TokenKind::SlashEqual, TokenKind::Slash),
            '%' => TokenKind::Percent,
            '=' => self.with_equal(TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.with_equal(TokenKind::NotEqual, TokenKind::Not),
            '<' => self.with_equal(TokenKind::LessEqual, TokenKind::Less),
            '>' => self.with_equal(TokenKind::GreaterEqual, TokenKind::Greater),
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            character => {
                return Err(TokenizeError::UnexpectedCharacter {
                    character,
                    position: start,
                });
            }
        };

        self.tokens.push(Token::new(kind, start));
        Ok(())
    }

    // Picks the two-character form when the operator is followed by '='.
    fn with_equal(&mut self, paired: TokenKind, single: TokenKind) -> TokenKind {
        if self.current_char() == '=' {
            self.advance();
            paired
        } else {
            single
        }
    }
}
