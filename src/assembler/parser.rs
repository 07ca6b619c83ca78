use std::{fmt, str::FromStr};

use thiserror::Error;

use super::{
    compiler::{CompileError, RuleBuilder},
    lexer::{LexError, Lexer, SourceLine, SourceUnit, Span, Token, TokenType},
    symbols::{SymbolError, SymbolKind, SymbolTable},
    Session,
};
use crate::ast::{BitRange, Directive, HeaderToken, SignalToken, Word, WORD_BITS};

/// The broad category of a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A number or identifier was expected but not found
    MalformedLiteral,
    /// A signal or macro is used without being declared
    UndeclaredReference,
    /// A directive showed up before the declarations it depends on
    OrderingViolation,
    /// Missing delimiter, unterminated block or otherwise broken structure
    StructuralError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{0} expected")]
    MalformedLiteral(&'static str),
    #[error("Bit position {0} out of range, must be below {}", WORD_BITS)]
    BitOutOfRange(Word),
    #[error("Macro '{name}' expands to '{replacement}' which is neither a literal nor a wildcard")]
    InvalidExpansion { name: String, replacement: String },
    #[error("Delimiter character '{0}' expected")]
    MissingDelimiter(char),
    #[error("Unexpected '{0}'")]
    UnexpectedToken(String),
    #[error("Unknown command")]
    UnknownCommand,
    #[error("Unterminated #{0} block, '}}' expected")]
    UnterminatedBlock(Directive),
    #[error("{0}")]
    OrderingViolation(&'static str),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl ParseErrorKind {
    pub fn class(&self) -> ErrorClass {
        fn symbol_class(err: &SymbolError) -> ErrorClass {
            match err {
                SymbolError::Undefined(..) => ErrorClass::UndeclaredReference,
                SymbolError::ChipOutOfRange(_) => ErrorClass::MalformedLiteral,
                SymbolError::ValueTooWide { .. } => ErrorClass::MalformedLiteral,
            }
        }

        match self {
            ParseErrorKind::Lex(_)
            | ParseErrorKind::MalformedLiteral(_)
            | ParseErrorKind::BitOutOfRange(_)
            | ParseErrorKind::InvalidExpansion { .. } => ErrorClass::MalformedLiteral,
            ParseErrorKind::MissingDelimiter(_)
            | ParseErrorKind::UnexpectedToken(_)
            | ParseErrorKind::UnknownCommand
            | ParseErrorKind::UnterminatedBlock(_) => ErrorClass::StructuralError,
            ParseErrorKind::OrderingViolation(_) => ErrorClass::OrderingViolation,
            ParseErrorKind::Symbol(err) => symbol_class(err),
            ParseErrorKind::Compile(CompileError::Symbol(err)) => symbol_class(err),
            ParseErrorKind::Compile(CompileError::HeaderArity { .. }) => {
                ErrorClass::StructuralError
            }
        }
    }
}

/// A parse error together with the line it happened on.
///
/// Renders as
///
/// ```text
/// cpu.mc:12: error: Delimiter character '=' expected
///     | 0.3 OPCODE
///     |     ^
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub file: String,
    pub line: usize,
    pub text: String,
    pub column: Option<usize>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, file: &str, line: &SourceLine, column: Option<usize>) -> Self {
        ParseError {
            kind,
            file: file.to_owned(),
            line: line.line,
            text: line.text.clone(),
            column,
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:{}: error: {}", self.file, self.line, self.kind)?;
        write!(f, "    | {}", self.text)?;
        if let Some(column) = self.column {
            write!(f, "\n    | {}^", " ".repeat(column))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Pulls tokens from one line, or from the part of a line between braces.
struct Cursor<'a> {
    file: &'a str,
    line: &'a SourceLine,
    lexer: Lexer<'a>,
}

impl<'a> Cursor<'a> {
    fn new(file: &'a str, line: &'a SourceLine, start: usize, end: usize) -> Self {
        Self {
            file,
            line,
            lexer: Lexer::starting_at(&line.text[..end], start),
        }
    }

    fn error(&self, kind: impl Into<ParseErrorKind>, column: Option<usize>) -> ParseError {
        ParseError::new(kind.into(), self.file, self.line, column)
    }

    fn lex_error(&self, err: LexError) -> ParseError {
        let column = err.column();
        self.error(err, Some(column))
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        self.lexer.next_token().map_err(|err| self.lex_error(err))
    }

    fn peek_is(&self, token_type: TokenType) -> Result<bool, ParseError> {
        let token = self.lexer.peek_token().map_err(|err| self.lex_error(err))?;
        Ok(token.is(token_type))
    }

    /// Raw text after the last token taken.
    fn rest(&self) -> &'a str {
        self.lexer.rest()
    }

    fn expect(&mut self, token_type: TokenType, kind: ParseErrorKind) -> Result<Token, ParseError> {
        let token = self.next()?;
        if token.is(token_type) {
            Ok(token)
        } else {
            Err(self.error(kind, Some(token.span.start)))
        }
    }

    fn number(&mut self, what: &'static str) -> Result<(Word, Span), ParseError> {
        let token = self.next()?;
        match token.number() {
            Some(value) => Ok((value, token.span)),
            None => Err(self.error(
                ParseErrorKind::MalformedLiteral(what),
                Some(token.span.start),
            )),
        }
    }

    fn identifier(&mut self, what: &'static str) -> Result<Token, ParseError> {
        self.expect(TokenType::Identifier, ParseErrorKind::MalformedLiteral(what))
    }

    fn bit_position(&mut self) -> Result<u32, ParseError> {
        let (value, span) = self.number("Numeric value (bit position)")?;
        if value >= Word::from(WORD_BITS) {
            return Err(self.error(ParseErrorKind::BitOutOfRange(value), Some(span.start)));
        }
        Ok(value as u32)
    }

    /// `<bit>` or `<bit>.<bit>`, in either order.
    fn bit_range(&mut self) -> Result<BitRange, ParseError> {
        let a = self.bit_position()?;
        if self.peek_is(TokenType::Dot)? {
            self.next()?;
            let b = self.bit_position()?;
            Ok(BitRange::new(a, b))
        } else {
            Ok(BitRange::single(a))
        }
    }

    fn end(&mut self) -> Result<(), ParseError> {
        let token = self.next()?;
        if token.is(TokenType::Eof) {
            Ok(())
        } else {
            Err(self.error(
                ParseErrorKind::UnexpectedToken(token.to_string()),
                Some(token.span.start),
            ))
        }
    }
}

/// Part of a line that belongs to a block body.
#[derive(Debug, Clone, Copy)]
struct BodyLine<'a> {
    line: &'a SourceLine,
    start: usize,
    end: usize,
}

impl<'a> BodyLine<'a> {
    fn whole(line: &'a SourceLine) -> Self {
        Self {
            line,
            start: 0,
            end: line.text.len(),
        }
    }

    fn is_blank(&self) -> bool {
        self.line.text[self.start..self.end].trim().is_empty()
    }
}

#[derive(Debug)]
struct Block<'a> {
    lines: Vec<BodyLine<'a>>,
    /// Text following `{` on the opening line of a multi-line block
    trailing: Option<&'a str>,
}

/// Classify the replacement text of a macro. Only literals and wildcards are accepted.
pub fn classify_expansion(replacement: &str) -> Option<HeaderToken> {
    let mut lexer = Lexer::new(replacement);
    let token = lexer.next_token().ok()?;
    if !lexer.next_token().ok()?.is(TokenType::Eof) {
        return None;
    }

    match token.token {
        TokenType::Decimal | TokenType::Hex | TokenType::Binary => {
            token.number().map(HeaderToken::Literal)
        }
        TokenType::Star => Some(HeaderToken::Wildcard),
        TokenType::Identifier if token.literal.starts_with('x') => Some(HeaderToken::Wildcard),
        _ => None,
    }
}

/// Parses flattened source lines into the symbol tables and rule list of a [`Session`].
///
/// Top level lines must start with one of the directives `#inputs{`, `#signals{`, `#define`,
/// `#defaults{` or `#op(...){`. Block directives consume the following lines up to and
/// including the next line holding a `}`.
pub struct Parser<'a> {
    unit: &'a SourceUnit,
    index: usize,
}

impl<'a> Parser<'a> {
    pub fn new(unit: &'a SourceUnit) -> Self {
        Self { unit, index: 0 }
    }

    fn file(&self, line: &SourceLine) -> &'a str {
        self.unit.source_name(line.source)
    }

    fn cursor(&self, body: BodyLine<'a>) -> Cursor<'a> {
        Cursor::new(self.file(body.line), body.line, body.start, body.end)
    }

    /// Collect the body of a block whose `{` ends at column `after` of `opener`.
    fn block_body(
        &mut self,
        opener: &'a SourceLine,
        after: usize,
        directive: Directive,
    ) -> Result<Block<'a>, ParseError> {
        let rest = &opener.text[after..];

        // Single-line block, e.g. `#inputs{ 0=A }`
        if let Some(close) = rest.find('}') {
            let body = BodyLine {
                line: opener,
                start: after,
                end: after + close,
            };
            let lines = if body.is_blank() { vec![] } else { vec![body] };
            return Ok(Block {
                lines,
                trailing: None,
            });
        }

        // After the brace of `#op(...){` comes the rule name, elsewhere the first body line
        let mut lines = Vec::new();
        let mut trailing = None;
        if directive == Directive::Op {
            trailing = Some(rest.trim()).filter(|text| !text.is_empty());
        } else {
            let body = BodyLine {
                line: opener,
                start: after,
                end: opener.text.len(),
            };
            if !body.is_blank() {
                lines.push(body);
            }
        }
        let unit = self.unit;
        loop {
            self.index += 1;
            let line = match unit.lines.get(self.index) {
                Some(line) => line,
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnterminatedBlock(directive),
                        self.file(opener),
                        opener,
                        Some(after.saturating_sub(1)),
                    ))
                }
            };
            if line.text.contains('}') {
                break;
            }
            let body = BodyLine::whole(line);
            if !body.is_blank() {
                lines.push(body);
            }
        }

        Ok(Block { lines, trailing })
    }

    // 2.0=STEP
    fn parse_input(&self, body: BodyLine<'a>, symbols: &mut SymbolTable) -> Result<(), ParseError> {
        let mut cursor = self.cursor(body);
        let bits = cursor.bit_range()?;
        cursor.expect(TokenType::Equals, ParseErrorKind::MissingDelimiter('='))?;
        let name = cursor.identifier("Identifier (name of input)")?;
        cursor.end()?;

        symbols
            .declare_input(&name.literal, bits)
            .map_err(|err| cursor.error(err, Some(name.span.start)))?;
        tracing::debug!("New input: {} bits:{} width:{}", name.literal, bits, bits.width());
        Ok(())
    }

    // 1:0.3=ALU_OP
    fn parse_signal(&self, body: BodyLine<'a>, symbols: &mut SymbolTable) -> Result<(), ParseError> {
        let mut cursor = self.cursor(body);
        let (chip, chip_span) = cursor.number("Numeric value (chip number)")?;
        let chip = usize::try_from(chip).map_err(|_| {
            cursor.error(
                ParseErrorKind::MalformedLiteral("Numeric value (chip number)"),
                Some(chip_span.start),
            )
        })?;
        cursor.expect(TokenType::Colon, ParseErrorKind::MissingDelimiter(':'))?;
        let bits = cursor.bit_range()?;
        cursor.expect(TokenType::Equals, ParseErrorKind::MissingDelimiter('='))?;
        let name = cursor.identifier("Identifier (name of signal)")?;
        cursor.end()?;

        symbols
            .declare_signal(chip, bits, &name.literal)
            .map_err(|err| {
                let column = match err {
                    SymbolError::ChipOutOfRange(_) => chip_span.start,
                    _ => name.span.start,
                };
                cursor.error(err, Some(column))
            })?;
        tracing::debug!(
            "New signal: {} chip:{} bits:{} width:{}",
            name.literal,
            chip,
            bits,
            bits.width()
        );
        Ok(())
    }

    // ALU_OP=0b01
    fn parse_default(&self, body: BodyLine<'a>, symbols: &mut SymbolTable) -> Result<(), ParseError> {
        let mut cursor = self.cursor(body);
        let name = cursor.identifier("Identifier (of signal)")?;
        cursor.expect(TokenType::Equals, ParseErrorKind::MissingDelimiter('='))?;
        let (value, span) = cursor.number("Numeric value (for default value)")?;
        cursor.end()?;

        symbols
            .set_default(&name.literal, value)
            .map_err(|err| {
                let column = match err {
                    SymbolError::ValueTooWide { .. } => span.start,
                    _ => name.span.start,
                };
                cursor.error(err, Some(column))
            })?;
        tracing::debug!("New default: {}={:#x}", name.literal, value);
        Ok(())
    }

    // #define FETCH(0b00)
    fn parse_define(
        &self,
        cursor: &mut Cursor<'a>,
        symbols: &mut SymbolTable,
    ) -> Result<(), ParseError> {
        let name = cursor.identifier("Identifier (of definition)")?;
        cursor.expect(TokenType::ParenLeft, ParseErrorKind::MissingDelimiter('('))?;

        let rest = cursor.rest();
        let replacement = match rest.rfind(')') {
            Some(end) => &rest[..end],
            None => {
                let column = cursor.lexer.position() + rest.len();
                return Err(cursor.error(ParseErrorKind::MissingDelimiter(')'), Some(column)));
            }
        };

        symbols
            .declare_define(&name.literal, replacement)
            .map_err(|err| cursor.error(err, Some(name.span.start)))?;
        tracing::debug!("New definition: {} rep:\"{}\"", name.literal, replacement);
        Ok(())
    }

    fn header_token(
        &self,
        cursor: &Cursor<'a>,
        token: &Token,
        symbols: &SymbolTable,
    ) -> Result<HeaderToken, ParseError> {
        let column = Some(token.span.start);
        match token.token {
            TokenType::Decimal | TokenType::Hex | TokenType::Binary => match token.number() {
                Some(value) => Ok(HeaderToken::Literal(value)),
                None => Err(cursor.error(
                    ParseErrorKind::MalformedLiteral("Numeric value (input value)"),
                    column,
                )),
            },
            TokenType::Star => Ok(HeaderToken::Wildcard),
            TokenType::Identifier => {
                if let Some(define) = symbols.find_define(&token.literal) {
                    let expansion = classify_expansion(&define.replacement).ok_or_else(|| {
                        cursor.error(
                            ParseErrorKind::InvalidExpansion {
                                name: define.name.clone(),
                                replacement: define.replacement.clone(),
                            },
                            column,
                        )
                    })?;
                    Ok(HeaderToken::Macro {
                        name: define.name.clone(),
                        expansion: Box::new(expansion),
                    })
                } else if token.literal.starts_with('x') {
                    Ok(HeaderToken::Wildcard)
                } else {
                    Err(cursor.error(
                        SymbolError::Undefined(SymbolKind::Macro, token.literal.clone()),
                        column,
                    ))
                }
            }
            _ => Err(cursor.error(
                ParseErrorKind::MalformedLiteral("Input value, wildcard or macro"),
                column,
            )),
        }
    }

    // HLT, ALU_OP=0b01, !MEM_OE
    fn parse_signal_list(
        &self,
        body: BodyLine<'a>,
        builder: &mut RuleBuilder,
    ) -> Result<(), ParseError> {
        let mut cursor = self.cursor(body);
        loop {
            let token = cursor.next()?;
            let signal = match token.token {
                // Trailing comma
                TokenType::Eof => break,
                TokenType::Bang => {
                    let name = cursor.identifier("Identifier (name of signal)")?;
                    SignalToken::Negate(name.literal)
                }
                TokenType::Identifier => {
                    if cursor.peek_is(TokenType::Equals)? {
                        cursor.next()?;
                        let (value, _) = cursor.number("Numeric value (signal value)")?;
                        SignalToken::Assign(token.literal, value)
                    } else {
                        SignalToken::Assert(token.literal)
                    }
                }
                _ => {
                    return Err(cursor.error(
                        ParseErrorKind::MalformedLiteral("Identifier (name of signal)"),
                        Some(token.span.start),
                    ))
                }
            };

            builder
                .apply(&signal)
                .map_err(|err| cursor.error(err, Some(token.span.start)))?;

            let delimiter = cursor.next()?;
            match delimiter.token {
                TokenType::Comma => continue,
                TokenType::Eof => break,
                _ => {
                    return Err(cursor.error(
                        ParseErrorKind::MissingDelimiter(','),
                        Some(delimiter.span.start),
                    ))
                }
            }
        }
        Ok(())
    }

    // #op(0x3, x, FETCH){ name
    fn parse_opcode(
        &mut self,
        mut cursor: Cursor<'a>,
        opener: &'a SourceLine,
        session: &mut Session,
    ) -> Result<(), ParseError> {
        let symbols = &session.symbols;
        let mut builder = RuleBuilder::new(symbols);

        cursor.expect(TokenType::ParenLeft, ParseErrorKind::MissingDelimiter('('))?;
        let mut header = Vec::new();
        if cursor.peek_is(TokenType::ParenRight)? {
            cursor.next()?;
        } else {
            loop {
                let token = cursor.next()?;
                let field = self.header_token(&cursor, &token, symbols)?;
                builder
                    .match_field(&field)
                    .map_err(|err| cursor.error(err, Some(token.span.start)))?;
                header.push(field);

                let delimiter = cursor.next()?;
                match delimiter.token {
                    TokenType::Comma => continue,
                    TokenType::ParenRight => break,
                    _ => {
                        return Err(cursor.error(
                            ParseErrorKind::MissingDelimiter(')'),
                            Some(delimiter.span.start),
                        ))
                    }
                }
            }
        }
        let brace = cursor.expect(TokenType::BraceLeft, ParseErrorKind::MissingDelimiter('{'))?;

        let block = self.block_body(opener, brace.span.end, Directive::Op)?;
        for body in block.lines {
            self.parse_signal_list(body, &mut builder)?;
        }

        let rule = builder.finish(block.trailing.map(str::to_owned));

        tracing::debug!(
            "New opcode({}) header:[{}] {}",
            rule.display_name(),
            header
                .iter()
                .map(|field| field.to_string())
                .collect::<Vec<String>>()
                .join(", "),
            rule.pattern
        );
        for (chip, word) in rule.words.iter().enumerate() {
            tracing::debug!("  signals[{}]: {:#b}", chip, word);
        }

        session.rules.push(rule);
        Ok(())
    }

    fn parse_line(&mut self, line: &'a SourceLine, session: &mut Session) -> Result<(), ParseError> {
        let mut cursor = self.cursor(BodyLine::whole(line));

        let hash = cursor.next()?;
        match hash.token {
            TokenType::Eof => return Ok(()),
            TokenType::Hash => (),
            _ => {
                return Err(cursor.error(ParseErrorKind::UnknownCommand, Some(hash.span.start)))
            }
        }

        let keyword = cursor.next()?;
        let directive = if keyword.is(TokenType::Identifier) {
            Directive::from_str(&keyword.literal).ok()
        } else {
            None
        };
        let directive = directive
            .ok_or_else(|| cursor.error(ParseErrorKind::UnknownCommand, Some(hash.span.start)))?;

        match directive {
            Directive::Defaults if session.symbols.signals.is_empty() => {
                return Err(cursor.error(
                    ParseErrorKind::OrderingViolation(
                        "Signals must be declared before #defaults",
                    ),
                    Some(hash.span.start),
                ));
            }
            Directive::Op
                if session.symbols.inputs.is_empty() || session.symbols.signals.is_empty() =>
            {
                return Err(cursor.error(
                    ParseErrorKind::OrderingViolation(
                        "Inputs and signals must be declared before #op",
                    ),
                    Some(hash.span.start),
                ));
            }
            _ => (),
        }

        match directive {
            Directive::Define => self.parse_define(&mut cursor, &mut session.symbols),
            Directive::Op => self.parse_opcode(cursor, line, session),
            Directive::Inputs | Directive::Signals | Directive::Defaults => {
                let brace =
                    cursor.expect(TokenType::BraceLeft, ParseErrorKind::MissingDelimiter('{'))?;
                let block = self.block_body(line, brace.span.end, directive)?;
                for body in block.lines {
                    match directive {
                        Directive::Inputs => self.parse_input(body, &mut session.symbols)?,
                        Directive::Signals => self.parse_signal(body, &mut session.symbols)?,
                        _ => self.parse_default(body, &mut session.symbols)?,
                    }
                }

                match directive {
                    Directive::Inputs => tracing::info!(
                        "Number of input bits found: {}",
                        session.symbols.input_width()
                    ),
                    Directive::Signals => tracing::info!(
                        "Number of signal bits found: {} chip(s), {} bit(s)",
                        session.symbols.chip_count(),
                        session.symbols.signal_width()
                    ),
                    _ => (),
                }
                Ok(())
            }
        }
    }

    /// Parse every line of the unit into `session`. The first error aborts parsing.
    #[tracing::instrument(skip_all)]
    pub fn parse(&mut self, session: &mut Session) -> Result<(), ParseError> {
        tracing::info!("Parsing...");
        let unit = self.unit;
        while let Some(line) = unit.lines.get(self.index) {
            self.parse_line(line, session)?;
            self.index += 1;
        }
        tracing::info!("Parsing... done ({} ops/instructions)", session.rules.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{InputField, MacroDefinition, MatchPattern, OpcodeRule, SignalField};

    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Session, ParseError> {
        let unit = SourceUnit::from_text("test.mc", source);
        let mut session = Session::new();
        Parser::new(&unit).parse(&mut session)?;
        Ok(session)
    }

    fn parse_err(source: &str) -> ParseError {
        match parse(source) {
            Ok(session) => panic!("expected an error, got {:?}", session),
            Err(err) => err,
        }
    }

    #[test]
    fn test_parse_inputs() {
        let session = parse("#inputs{\n0.2=STEP\n7.3=OPCODE\n8 = FLAG\n}").unwrap();
        assert_eq!(
            session.symbols.inputs,
            vec![
                InputField::new("STEP", BitRange::new(0, 2)),
                InputField::new("OPCODE", BitRange::new(3, 7)),
                InputField::new("FLAG", BitRange::single(8)),
            ]
        );
    }

    #[test]
    fn test_parse_signals_and_defaults() {
        let source = "
#signals{
0:0=HLT
0:4.1=ALU
1:0x0.0b111=BUS
}
#defaults{
HLT=1
ALU=0b1010
BUS=0x7
}";
        let session = parse(source).unwrap();
        let mut expected = vec![
            SignalField::new("HLT", 0, BitRange::single(0)),
            SignalField::new("ALU", 0, BitRange::new(1, 4)),
            SignalField::new("BUS", 1, BitRange::new(0, 7)),
        ];
        expected[0].default = 1;
        expected[1].default = 10;
        expected[2].default = 7;
        assert_eq!(session.symbols.signals, expected);
    }

    #[test]
    fn test_parse_define() {
        let session = parse("#define FETCH(0b00)\n#define ANY( x )\n#define ODD(f(x))").unwrap();
        assert_eq!(
            session.symbols.defines,
            vec![
                MacroDefinition::new("FETCH", "0b00"),
                MacroDefinition::new("ANY", " x "),
                MacroDefinition::new("ODD", "f(x)"),
            ]
        );
    }

    #[test]
    fn test_parse_opcode() {
        let source = "
#inputs{
0.1=STEP
2.5=OPCODE
}
#signals{
0:0=HLT
0:1.2=ALU
1:0.3=BUS
}
#defaults{
ALU=2
}
#define FETCH(0)
#op(FETCH, x){ fetch
BUS=0xa
}
#op(*, 0x3){
HLT, !ALU
}
";
        let session = parse(source).unwrap();
        assert_eq!(
            session.rules,
            vec![
                OpcodeRule {
                    pattern: MatchPattern {
                        value: 0,
                        mask: 0b11,
                    },
                    words: vec![0b100, 0xa],
                    name: Some("fetch".to_string()),
                },
                OpcodeRule {
                    pattern: MatchPattern {
                        value: 0b0011_00,
                        mask: 0b1111_00,
                    },
                    words: vec![0b011, 0],
                    name: None,
                },
            ]
        );
    }

    #[test]
    fn test_macro_resolves_like_literal() {
        let head = "#inputs{\n0=A\n}\n#signals{\n0:0=S\n}\n#define FOO(1)\n";
        let with_macro = parse(&format!("{}#op(FOO){{\nS\n}}", head)).unwrap();
        let with_literal = parse(&format!("{}#op(1){{\nS\n}}", head)).unwrap();
        assert_eq!(with_macro.rules, with_literal.rules);
    }

    #[test]
    fn test_single_line_blocks() {
        let source = "#inputs{0=A}\n#signals{ 0:0=S }\n#defaults{S=1}\n#op(1){ S=0 }";
        let session = parse(source).unwrap();
        assert_eq!(session.symbols.inputs.len(), 1);
        assert_eq!(session.symbols.signals[0].default, 1);
        assert_eq!(
            session.rules,
            vec![OpcodeRule {
                pattern: MatchPattern { value: 1, mask: 1 },
                words: vec![0],
                name: None,
            }]
        );
    }

    #[test]
    fn test_signal_list_forms() {
        let head = "#inputs{\n0=A\n}\n#signals{\n0:0=S\n0:1.3=T\n}\n";
        let tests = vec![
            ("S", vec![0b0001]),
            ("S,", vec![0b0001]),
            ("T=5", vec![0b1010]),
            ("S, T = 0b11", vec![0b0111]),
            ("!T", vec![0b1110]),
            ("S\nT=1", vec![0b0011]),
            ("", vec![0]),
        ];
        for (body, expected) in tests {
            let session = parse(&format!("{}#op(x){{\n{}\n}}", head, body)).unwrap();
            assert_eq!(session.rules[0].words, expected, "body: {:?}", body);
        }
    }

    #[test]
    fn test_duplicate_names_use_first() {
        let source = "
#inputs{
0=A
1=A
}
#signals{
0:0=S
1:3=S
}
#defaults{
S=1
}
#define ONE(1)
#define ONE(0)
#op(ONE, 0){
S=0
}
";
        let session = parse(source).unwrap();
        assert_eq!(session.symbols.inputs.len(), 2);
        assert_eq!(session.symbols.signals[0].default, 1);
        assert_eq!(session.symbols.signals[1].default, 0);
        assert_eq!(
            session.rules,
            vec![OpcodeRule {
                pattern: MatchPattern {
                    value: 0b01,
                    mask: 0b11,
                },
                words: vec![0, 0],
                name: None,
            }]
        );
    }

    #[test]
    fn test_short_header() {
        let head = "#inputs{\n0.1=STEP\n2=FLAG\n3.4=OPCODE\n}\n#signals{\n0:0=S\n}\n";
        let tests = vec![
            ("#op(){", MatchPattern::default()),
            ("#op(2){", MatchPattern { value: 0b10, mask: 0b11 }),
            ("#op(1, 1){", MatchPattern { value: 0b1_01, mask: 0b1_11 }),
            ("#op(*, *, 3){", MatchPattern { value: 0b11_0_00, mask: 0b11_0_00 }),
        ];
        for (op, expected) in tests {
            let session = parse(&format!("{}{}\nS\n}}", head, op)).unwrap();
            assert_eq!(session.rules[0].pattern, expected, "header: {:?}", op);
        }
    }

    #[test]
    fn test_text_after_opening_brace() {
        let session = parse("#inputs{ 0=A\n1=B\n}\n#signals{0:0=S\n0:1=T\n}\n#defaults{ T=1\n}").unwrap();
        assert_eq!(
            session.symbols.inputs,
            vec![
                InputField::new("A", BitRange::single(0)),
                InputField::new("B", BitRange::single(1)),
            ]
        );
        assert_eq!(session.symbols.signals.len(), 2);
        assert_eq!(session.symbols.signals[1].default, 1);

        let err = parse_err("#inputs{ 0=A 1\n}");
        assert_eq!((err.class(), err.line, err.column), (ErrorClass::StructuralError, 1, Some(13)));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let session = parse("\n#inputs{\n\n0=A\n   \n}\n\n").unwrap();
        assert_eq!(session.symbols.inputs.len(), 1);
    }

    #[test]
    fn test_errors() {
        let head = "#inputs{\n0=A\n1=B\n}\n#signals{\n0:0=S\n}\n";
        let tests = vec![
            // (source, class, line, column)
            ("#inputs{\nA=0\n}", ErrorClass::MalformedLiteral, 2, Some(0)),
            ("#inputs{\n0.3 A\n}", ErrorClass::StructuralError, 2, Some(4)),
            ("#inputs{\n0=\n}", ErrorClass::MalformedLiteral, 2, Some(2)),
            ("#inputs{\n64=A\n}", ErrorClass::MalformedLiteral, 2, Some(0)),
            ("#inputs{\n0=A B\n}", ErrorClass::StructuralError, 2, Some(4)),
            ("#inputs{\n0=A\n", ErrorClass::StructuralError, 1, Some(7)),
            ("#signals{\n0.0=S\n}", ErrorClass::StructuralError, 2, Some(1)),
            ("#signals{\n256:0=S\n}", ErrorClass::MalformedLiteral, 2, Some(0)),
            ("#signals{\n0:0=S\n 0xFFFFFFFFFFFFFFFF:0=T\n}", ErrorClass::MalformedLiteral, 3, Some(1)),
            ("#signals{\n0:0=S\n}\n#defaults{\nT=1\n}", ErrorClass::UndeclaredReference, 5, Some(0)),
            ("#signals{\n0:0=S\n}\n#defaults{\nS=2\n}", ErrorClass::MalformedLiteral, 5, Some(2)),
            ("#signals{\n0:0=S\n}\n#defaults{\nS=0x\n}", ErrorClass::MalformedLiteral, 5, Some(2)),
            ("#defaults{\n}", ErrorClass::OrderingViolation, 1, Some(0)),
            ("#inputs{\n0=A\n}\n#op(1){\n}", ErrorClass::OrderingViolation, 4, Some(0)),
            ("#signals{\n0:0=S\n}\n#op(1){\n}", ErrorClass::OrderingViolation, 4, Some(0)),
            ("#define 1(2)", ErrorClass::MalformedLiteral, 1, Some(8)),
            ("#define A 2", ErrorClass::StructuralError, 1, Some(10)),
            ("#define A(2", ErrorClass::StructuralError, 1, Some(11)),
            ("#include \"x.mc\"", ErrorClass::StructuralError, 1, Some(0)),
            ("inputs{", ErrorClass::StructuralError, 1, Some(0)),
            ("#op", ErrorClass::OrderingViolation, 1, Some(0)),
            ("0=A & 1", ErrorClass::StructuralError, 1, Some(0)),
        ];
        for (source, class, line, column) in tests {
            let err = parse_err(source);
            assert_eq!(
                (err.class(), err.line, err.column),
                (class, line, column),
                "source: {:?}, error: {}",
                source,
                err
            );
        }

        let op_tests = vec![
            ("#op(1, 1){\nT\n}", ErrorClass::UndeclaredReference, 0),
            ("#op(1, 1){\n!T\n}", ErrorClass::UndeclaredReference, 0),
            ("#op(1, 1){\nS=\n}", ErrorClass::MalformedLiteral, 2),
            ("#op(1, 1){\nS S\n}", ErrorClass::StructuralError, 2),
            ("#op(1, 1){\nS,,S\n}", ErrorClass::MalformedLiteral, 2),
            ("#op(1, FOO){\n}", ErrorClass::UndeclaredReference, 7),
            ("#op(1, 1, 1){\n}", ErrorClass::StructuralError, 10),
            ("#op(1 1){\n}", ErrorClass::StructuralError, 6),
            ("#op(1, =){\n}", ErrorClass::MalformedLiteral, 7),
            ("#op 1, 1){\n}", ErrorClass::StructuralError, 4),
            ("#op(1, 1)\n}", ErrorClass::StructuralError, 9),
            ("#op(1, 1){\nS\n", ErrorClass::StructuralError, 9),
        ];
        for (op, class, column) in op_tests {
            let source = format!("{}{}", head, op);
            let err = parse_err(&source);
            assert_eq!(
                (err.class(), err.column),
                (class, Some(column)),
                "source: {:?}, error: {}",
                op,
                err
            );
        }
    }

    #[test]
    fn test_invalid_expansion() {
        let source = "#inputs{\n0=A\n}\n#signals{\n0:0=S\n}\n#define BAD(1, 2)\n#op(BAD){\n}";
        let err = parse_err(source);
        assert_eq!(
            err.kind,
            ParseErrorKind::InvalidExpansion {
                name: "BAD".to_string(),
                replacement: "1, 2".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_expansion() {
        let tests = vec![
            ("0x1F", Some(HeaderToken::Literal(31))),
            (" 0b101 ", Some(HeaderToken::Literal(5))),
            ("31", Some(HeaderToken::Literal(31))),
            ("x", Some(HeaderToken::Wildcard)),
            ("xxxx", Some(HeaderToken::Wildcard)),
            ("*", Some(HeaderToken::Wildcard)),
            ("FOO", None),
            ("", None),
            ("1 2", None),
        ];
        for (input, expected) in tests {
            assert_eq!(classify_expansion(input), expected, "input: {:?}", input);
        }
    }

    #[test]
    fn test_error_display() {
        let err = parse_err("#inputs{\n0.3 OPCODE\n}");
        assert_eq!(
            err.to_string(),
            "test.mc:2: error: Delimiter character '=' expected
    | 0.3 OPCODE
    |     ^"
        );

        let err = parse_err("#signals{\n0:0=S\n}\n#defaults{\nT=1\n}");
        assert_eq!(
            err.to_string(),
            "test.mc:5: error: Signal 'T' not defined
    | T=1
    | ^"
        );
    }
}
