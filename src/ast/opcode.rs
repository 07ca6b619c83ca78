use std::fmt;

use super::Word;

/// One field of an opcode header, e.g. the `0x3`, `x` and `FETCH` in `#op(0x3, x, FETCH){`.
///
/// Fields line up with the declared input fields by position, not by name.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum HeaderToken {
    /// `x...` or `*`, the field does not take part in matching
    Wildcard,
    /// Decimal, `0x` hex or `0b` binary value the field must equal
    Literal(Word),
    /// A `#define` name together with what its replacement text classified as
    Macro {
        name: String,
        expansion: Box<HeaderToken>,
    },
}

impl HeaderToken {
    /// Value the field must equal after macro substitution, `None` for a wildcard.
    pub fn literal(&self) -> Option<Word> {
        match self {
            HeaderToken::Wildcard => None,
            HeaderToken::Literal(value) => Some(*value),
            HeaderToken::Macro { expansion, .. } => expansion.literal(),
        }
    }
}

impl fmt::Display for HeaderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderToken::Wildcard => write!(f, "x"),
            HeaderToken::Literal(value) => write!(f, "{:#x}", value),
            HeaderToken::Macro { name, .. } => write!(f, "{}", name),
        }
    }
}

/// One entry of an opcode body, e.g. `ALU_OP=0b01`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SignalToken {
    /// `name` sets every bit of the signal
    Assert(String),
    /// `name=value` replaces the signal value
    Assign(String, Word),
    /// `!name` drives the complement of the signal default
    Negate(String),
}

impl SignalToken {
    pub fn signal(&self) -> &str {
        match self {
            SignalToken::Assert(name) | SignalToken::Assign(name, _) | SignalToken::Negate(name) => {
                name
            }
        }
    }
}

impl fmt::Display for SignalToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalToken::Assert(name) => write!(f, "{}", name),
            SignalToken::Assign(name, value) => write!(f, "{}={:#x}", name, value),
            SignalToken::Negate(name) => write!(f, "!{}", name),
        }
    }
}

/// Addresses matched by a rule: `address & mask == value`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct MatchPattern {
    pub value: Word,
    pub mask: Word,
}

impl MatchPattern {
    pub fn matches(&self, address: Word) -> bool {
        address & self.mask == self.value
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value={:#b} mask={:#b}", self.value, self.mask)
    }
}

/// A compiled `#op` block.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct OpcodeRule {
    pub pattern: MatchPattern,
    /// Signal word for every chip, indexed by chip number
    pub words: Vec<Word>,
    /// Optional name following the opening brace, only used in diagnostics
    pub name: Option<String>,
}

impl OpcodeRule {
    pub fn matches(&self, address: Word) -> bool {
        self.pattern.matches(address)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("???")
    }
}

impl fmt::Display for OpcodeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#op({}) {}", self.pattern, self.display_name())?;
        for (chip, word) in self.words.iter().enumerate() {
            write!(f, " [{}]={:X}", chip, word)?;
        }
        Ok(())
    }
}
