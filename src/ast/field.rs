use std::fmt;

use super::{ones, Word};

/// An inclusive range of bit positions, normalized so that `start <= end`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BitRange {
    pub start: u32,
    pub end: u32,
}

impl BitRange {
    /// Range from two bit positions given in any order.
    pub fn new(a: u32, b: u32) -> BitRange {
        BitRange {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn single(bit: u32) -> BitRange {
        BitRange::new(bit, bit)
    }

    pub fn width(&self) -> u32 {
        self.end - self.start + 1
    }

    /// All-ones mask of the field width, not shifted.
    pub fn mask(&self) -> Word {
        ones(self.width())
    }

    /// Mask of the bits covered by the field at its position.
    pub fn field_mask(&self) -> Word {
        self.mask() << self.start
    }

    /// Place `value` at the field position. Bits above the field width are dropped.
    pub fn place(&self, value: Word) -> Word {
        (value & self.mask()) << self.start
    }

    pub fn fits(&self, value: Word) -> bool {
        value & !self.mask() == 0
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}.{}", self.start, self.end)
        }
    }
}

/// A named field of the input bus, e.g. `4.7=OPCODE`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InputField {
    pub name: String,
    pub bits: BitRange,
}

impl InputField {
    pub fn new(name: &str, bits: BitRange) -> InputField {
        InputField {
            name: name.to_owned(),
            bits,
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.bits, self.name)
    }
}

/// A named output signal living on one chip, e.g. `1:0.2=ALU_OP`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SignalField {
    pub name: String,
    pub chip: usize,
    pub bits: BitRange,
    /// Value driven when no rule overrides the signal. Always fits the field width.
    pub default: Word,
}

impl SignalField {
    pub fn new(name: &str, chip: usize, bits: BitRange) -> SignalField {
        SignalField {
            name: name.to_owned(),
            chip,
            bits,
            default: 0,
        }
    }

    /// The default value placed at the signal position.
    pub fn default_bits(&self) -> Word {
        self.bits.place(self.default)
    }
}

impl fmt::Display for SignalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={}", self.chip, self.bits, self.name)
    }
}
