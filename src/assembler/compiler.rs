use thiserror::Error;

use super::symbols::{SymbolError, SymbolTable};
use crate::ast::{HeaderToken, MatchPattern, OpcodeRule, SignalToken, Word};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error("Header has {found} field(s) but {expected} input(s) are declared")]
    HeaderArity { expected: usize, found: usize },
}

/// Builds one [`OpcodeRule`] from the fields of an `#op` header and the tokens of its body.
///
/// Every chip word starts out with all signals at their defaults, body tokens are then applied
/// in order.
#[derive(Debug)]
pub struct RuleBuilder<'a> {
    symbols: &'a SymbolTable,
    pattern: MatchPattern,
    words: Vec<Word>,
    fields: usize,
}

impl<'a> RuleBuilder<'a> {
    pub fn new(symbols: &'a SymbolTable) -> RuleBuilder<'a> {
        RuleBuilder {
            symbols,
            pattern: MatchPattern::default(),
            words: symbols.default_words(),
            fields: 0,
        }
    }

    /// Add the next header field. Fields are matched with the declared inputs in order.
    ///
    /// Inputs left without a field once the header ends are not matched on. More fields than
    /// declared inputs are an error.
    pub fn match_field(&mut self, token: &HeaderToken) -> Result<(), CompileError> {
        let expected = self.symbols.inputs.len();
        let input = self
            .symbols
            .inputs
            .get(self.fields)
            .ok_or(CompileError::HeaderArity {
                expected,
                found: self.fields + 1,
            })?;
        self.fields += 1;

        if let Some(value) = token.literal() {
            if !input.bits.fits(value) {
                tracing::warn!(
                    "Value {:#x} truncated to the {} bit(s) of input '{}'",
                    value,
                    input.bits.width(),
                    input.name
                );
            }
            self.pattern.value |= input.bits.place(value);
            self.pattern.mask |= input.bits.field_mask();
        }

        Ok(())
    }

    /// Apply one body token to the chip word of its signal.
    pub fn apply(&mut self, token: &SignalToken) -> Result<(), CompileError> {
        let symbols = self.symbols;
        let signal = symbols.signal(token.signal())?;
        let bits = signal.bits;
        let word = &mut self.words[signal.chip];

        match token {
            SignalToken::Assert(_) => *word |= bits.field_mask(),
            SignalToken::Assign(_, value) => {
                if !bits.fits(*value) {
                    tracing::warn!(
                        "Value {:#x} truncated to the {} bit(s) of signal '{}'",
                        value,
                        bits.width(),
                        signal.name
                    );
                }
                *word = (*word & !bits.field_mask()) | bits.place(*value);
            }
            // Complement of the default, not of the current value
            SignalToken::Negate(_) => {
                *word = (*word & !bits.field_mask()) | bits.place(!signal.default);
            }
        }

        Ok(())
    }

    pub fn finish(self, name: Option<String>) -> OpcodeRule {
        let expected = self.symbols.inputs.len();
        if self.fields < expected {
            tracing::debug!(
                "Header has {} of {} field(s), the rest match anything",
                self.fields,
                expected
            );
        }

        OpcodeRule {
            pattern: self.pattern,
            words: self.words,
            name,
        }
    }
}

/// Compile a rule from already classified header and body tokens.
#[tracing::instrument(skip(symbols))]
pub fn compile_rule(
    symbols: &SymbolTable,
    header: &[HeaderToken],
    body: &[SignalToken],
    name: Option<String>,
) -> Result<OpcodeRule, CompileError> {
    let mut builder = RuleBuilder::new(symbols);
    for token in header {
        builder.match_field(token)?;
    }
    for token in body {
        builder.apply(token)?;
    }
    Ok(builder.finish(name))
}
