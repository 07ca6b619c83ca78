use thiserror::Error;

pub use self::{
    source_position::{SourceLine, SourceUnit, Span},
    token::{Token, TokenType},
};
use crate::ast::Word;

/// Where tokens and lines are located in the source.
pub mod source_position;

/// Tokens produced by the lexer.
pub mod token;

// Example lines:
//
//   #signals{
//   0:0.3=ALU_OP
//   #op(0x3, x, FETCH){ load
//   ALU_OP=0b01, !MEM_OE, HLT
//
// '#' = directive prefix, e.g. `#inputs`
// '.' = bit range, e.g. `4.7`
// ':' = chip separator, e.g. `1:4`
// '!' = negated signal, e.g. `!MEM_OE`
// '*' = wildcard header field

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}'")]
    UnexpectedCharacter { ch: char, column: usize },
    #[error("Invalid numeric literal '{literal}'")]
    InvalidNumber { literal: String, column: usize },
}

impl LexError {
    pub fn column(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { column, .. } => *column,
            LexError::InvalidNumber { column, .. } => *column,
        }
    }
}

/// Splits a single source line into tokens on demand.
///
/// Tokens are only produced when asked for, so a caller can stop part way through a line and
/// take the remaining raw text, as `#define` replacements need.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,       // Input line
    position: usize,      // Current position in input (points to current char)
    read_position: usize, // Current reading position in input (after current char)
    ch: Option<u8>,       // Current char under examination
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::starting_at(input, 0)
    }

    /// Lexer that starts at byte `position` of `input`. Spans stay relative to the whole input.
    pub fn starting_at(input: &'a str, position: usize) -> Self {
        let mut lexer = Self {
            input,
            position,
            read_position: position,
            ch: None,
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        self.ch = self.input.as_bytes().get(self.read_position).copied();
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> Option<u8> {
        self.input.as_bytes().get(self.read_position).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.ch, Some(b' ' | b'\t')) {
            self.read_char();
        }
    }

    fn read_while(&mut self, accept: impl Fn(u8) -> bool) -> &'a str {
        let position = self.position;
        while self.ch.is_some_and(&accept) {
            self.read_char();
        }
        &self.input[position..self.position]
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.position.min(self.input.len())
    }

    /// Raw text that has not been tokenized yet.
    pub fn rest(&self) -> &'a str {
        &self.input[self.position()..]
    }

    fn single(&mut self, token_type: TokenType) -> Token {
        let start = self.position;
        let literal = &self.input[start..start + 1];
        self.read_char();
        Token::new(token_type, literal, Span::new(start, start + 1))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let prefix = match (self.ch, self.peek_char()) {
            (Some(b'0'), Some(b'x')) => Some((TokenType::Hex, 16)),
            (Some(b'0'), Some(b'b')) => Some((TokenType::Binary, 2)),
            _ => None,
        };

        let (token_type, radix, digits) = match prefix {
            Some((token_type, radix)) => {
                self.read_char();
                self.read_char();
                let digits = self.read_while(|ch| (ch as char).is_digit(radix));
                (token_type, radix, digits)
            }
            None => (TokenType::Decimal, 10, self.read_while(|ch| ch.is_ascii_digit())),
        };

        if digits.is_empty() || Word::from_str_radix(digits, radix).is_err() {
            return Err(LexError::InvalidNumber {
                literal: self.input[start..self.position].to_string(),
                column: start,
            });
        }

        Ok(Token::new(token_type, digits, Span::new(start, self.position)))
    }

    /// Input, signal, macro name or directive keyword
    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        // Allow alphanumeric and underscore after the first letter
        let literal = self.read_while(|ch| ch.is_ascii_alphanumeric() || ch == b'_');
        Token::new(TokenType::Identifier, literal, Span::new(start, self.position))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let ch = match self.ch {
            Some(ch) => ch,
            None => {
                let end = self.position();
                return Ok(Token::new(TokenType::Eof, "", Span::at(end)));
            }
        };

        let token = match ch {
            b'#' => self.single(TokenType::Hash),
            b'{' => self.single(TokenType::BraceLeft),
            b'}' => self.single(TokenType::BraceRight),
            b'(' => self.single(TokenType::ParenLeft),
            b')' => self.single(TokenType::ParenRight),
            b',' => self.single(TokenType::Comma),
            b':' => self.single(TokenType::Colon),
            b'.' => self.single(TokenType::Dot),
            b'=' => self.single(TokenType::Equals),
            b'!' => self.single(TokenType::Bang),
            b'*' => self.single(TokenType::Star),
            b'0'..=b'9' => self.read_number()?,
            b'A'..=b'Z' | b'a'..=b'z' => self.read_identifier(),
            _ => {
                return Err(LexError::UnexpectedCharacter {
                    ch: self.input[self.position..].chars().next().unwrap_or('?'),
                    column: self.position,
                })
            }
        };

        Ok(token)
    }

    /// The token `next_token` would return, without consuming it.
    pub fn peek_token(&self) -> Result<Token, LexError> {
        self.clone().next_token()
    }
}

/// Tokenize a whole line, `Eof` included.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.is(TokenType::Eof);
        tokens.push(token);
        if done {
            break;
        }
    }
    Ok(tokens)
}
