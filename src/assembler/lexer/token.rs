use super::source_position::Span;
use crate::ast::Word;

/// TokenType defines the types of tokens that are found in a source line.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TokenType {
    /// `#` directive prefix
    Hash,
    /// `{`
    BraceLeft,
    /// `}`
    BraceRight,
    /// `(`
    ParenLeft,
    /// `)`
    ParenRight,
    /// `,`
    Comma,
    /// `:` between chip and bit position
    Colon,
    /// `.` between the two ends of a bit range
    Dot,
    /// `=`
    Equals,
    /// `!` signal negation
    Bang,
    /// `*` wildcard
    Star,
    /// Decimal number
    Decimal,
    /// `0x` prefixed hex number, the literal holds the digits only
    Hex,
    /// `0b` prefixed binary number, the literal holds the digits only
    Binary,
    /// Directive keyword, signal, input or macro name.
    ///
    /// A letter followed by letters, digits or underscores.
    Identifier,
    /// End of the line
    Eof,
}

impl Default for TokenType {
    fn default() -> Self {
        Self::Eof
    }
}

/// Token is a lexical unit of a source line.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Token {
    /// Type of Token
    pub token: TokenType,
    /// Literal string of token, e.g. `"inputs"`, `"1F"`, `"="` etc.
    pub literal: String,
    /// Columns of the token in its line
    pub span: Span,
}

impl Token {
    pub fn new(token: TokenType, literal: &str, span: Span) -> Self {
        Self {
            token,
            literal: literal.to_owned(),
            span,
        }
    }

    pub fn is(&self, token: TokenType) -> bool {
        self.token == token
    }

    /// Value of a numeric token. The lexer only produces numbers that fit a [`Word`].
    pub fn number(&self) -> Option<Word> {
        let radix = match self.token {
            TokenType::Decimal => 10,
            TokenType::Hex => 16,
            TokenType::Binary => 2,
            _ => return None,
        };
        Word::from_str_radix(&self.literal, radix).ok()
    }

    fn literal_str(&self) -> String {
        match self.token {
            TokenType::Hex => "0x".to_string() + &self.literal,
            TokenType::Binary => "0b".to_string() + &self.literal,
            TokenType::Eof => "<eol>".to_owned(),
            _ => self.literal.to_owned(),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.literal_str())
    }
}
