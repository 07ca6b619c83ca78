pub use self::{
    define::MacroDefinition,
    directive::Directive,
    field::{BitRange, InputField, SignalField},
    opcode::{HeaderToken, MatchPattern, OpcodeRule, SignalToken},
};

/// Textual macros declared with `#define`.
mod define;

/// Directive keywords.
mod directive;

/// Named bit fields on the input bus and on the output chips.
mod field;

/// Opcode rules and the tokens they are built from.
mod opcode;

/// Value of one chip word or of one input address.
pub type Word = u64;

/// Number of bits in a [`Word`]. Bit indices must stay below this.
pub const WORD_BITS: u32 = Word::BITS;

/// All-ones mask covering the lowest `width` bits.
pub fn ones(width: u32) -> Word {
    if width >= WORD_BITS {
        Word::MAX
    } else {
        (1 << width) - 1
    }
}
