use std::fmt;

use thiserror::Error;

use crate::ast::{BitRange, InputField, MacroDefinition, SignalField, Word};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("{0} '{1}' not defined")]
    Undefined(SymbolKind, String),
    #[error("Chip number {0} out of range, must be below {}", MAX_CHIPS)]
    ChipOutOfRange(usize),
    #[error("Value {value:#x} does not fit signal '{name}' ({width} bit(s))")]
    ValueTooWide {
        name: String,
        value: Word,
        width: u32,
    },
}

/// Output chips a source may declare signals on.
pub const MAX_CHIPS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Input,
    Signal,
    Macro,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Input => write!(f, "Input"),
            SymbolKind::Signal => write!(f, "Signal"),
            SymbolKind::Macro => write!(f, "Macro"),
        }
    }
}

/// Declared inputs, signals and macros of one compilation.
///
/// Declaration order is kept: opcode headers are matched against the inputs by position.
/// Names may be declared more than once, lookups then find the first declaration.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    pub inputs: Vec<InputField>,
    pub signals: Vec<SignalField>,
    pub defines: Vec<MacroDefinition>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    #[tracing::instrument(skip(self))]
    pub fn declare_input(&mut self, name: &str, bits: BitRange) -> Result<(), SymbolError> {
        if self.find_input(name).is_some() {
            tracing::warn!("Input '{}' already defined", name);
        }
        self.inputs.push(InputField::new(name, bits));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn declare_signal(
        &mut self,
        chip: usize,
        bits: BitRange,
        name: &str,
    ) -> Result<(), SymbolError> {
        if chip >= MAX_CHIPS {
            return Err(SymbolError::ChipOutOfRange(chip));
        }
        if self.find_signal(name).is_some() {
            tracing::warn!("Signal '{}' already defined, the first declaration is used", name);
        }
        self.signals.push(SignalField::new(name, chip, bits));
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn declare_define(&mut self, name: &str, replacement: &str) -> Result<(), SymbolError> {
        if self.find_define(name).is_some() {
            tracing::warn!("Macro '{}' already defined, the first definition is used", name);
        }
        self.defines.push(MacroDefinition::new(name, replacement));
        Ok(())
    }

    /// Set the default value of a declared signal.
    #[tracing::instrument(skip(self))]
    pub fn set_default(&mut self, name: &str, value: Word) -> Result<(), SymbolError> {
        let signal = self
            .signals
            .iter_mut()
            .find(|signal| signal.name == name)
            .ok_or_else(|| SymbolError::Undefined(SymbolKind::Signal, name.to_owned()))?;
        if !signal.bits.fits(value) {
            return Err(SymbolError::ValueTooWide {
                name: name.to_owned(),
                value,
                width: signal.bits.width(),
            });
        }
        signal.default = value;
        Ok(())
    }

    pub fn find_input(&self, name: &str) -> Option<&InputField> {
        self.inputs.iter().find(|input| input.name == name)
    }

    pub fn find_signal(&self, name: &str) -> Option<&SignalField> {
        self.signals.iter().find(|signal| signal.name == name)
    }

    pub fn find_define(&self, name: &str) -> Option<&MacroDefinition> {
        self.defines.iter().find(|define| define.name == name)
    }

    /// Signal lookup that fails with [`SymbolError::Undefined`].
    pub fn signal(&self, name: &str) -> Result<&SignalField, SymbolError> {
        self.find_signal(name)
            .ok_or_else(|| SymbolError::Undefined(SymbolKind::Signal, name.to_owned()))
    }

    /// Number of address bits: one past the highest input bit, 0 without inputs.
    pub fn input_width(&self) -> u32 {
        self.inputs
            .iter()
            .map(|input| input.bits.end + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of output chips: one past the highest chip index, 0 without signals.
    pub fn chip_count(&self) -> usize {
        self.signals
            .iter()
            .map(|signal| signal.chip + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of bits used on the widest chip.
    pub fn signal_width(&self) -> u32 {
        self.signals
            .iter()
            .map(|signal| signal.bits.end + 1)
            .max()
            .unwrap_or(0)
    }

    /// The word of every chip with all signals at their defaults.
    ///
    /// Bits not covered by any signal stay 0.
    pub fn default_words(&self) -> Vec<Word> {
        let mut words = vec![0; self.chip_count()];
        for signal in &self.signals {
            words[signal.chip] |= signal.default_bits();
        }
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn example_table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.declare_input("STEP", BitRange::new(0, 2)).unwrap();
        table.declare_input("OPCODE", BitRange::new(7, 3)).unwrap();
        table.declare_signal(0, BitRange::single(0), "HLT").unwrap();
        table.declare_signal(0, BitRange::new(4, 5), "ALU").unwrap();
        table.declare_signal(2, BitRange::new(0, 7), "BUS").unwrap();
        table
    }

    #[test]
    fn test_find() {
        let table = example_table();
        assert_eq!(
            table.find_signal("ALU"),
            Some(&SignalField::new("ALU", 0, BitRange::new(4, 5)))
        );
        assert_eq!(table.find_signal("alu"), None);
        assert_eq!(table.find_input("OPCODE").map(|input| input.bits.start), Some(3));
        assert_eq!(
            table.signal("NOPE"),
            Err(SymbolError::Undefined(SymbolKind::Signal, "NOPE".to_string()))
        );
    }

    #[test]
    fn test_widths() {
        let table = example_table();
        assert_eq!(table.input_width(), 8);
        assert_eq!(table.chip_count(), 3);
        assert_eq!(table.signal_width(), 8);
        assert_eq!(SymbolTable::new().input_width(), 0);
        assert_eq!(SymbolTable::new().chip_count(), 0);
    }

    #[test]
    fn test_duplicates() {
        let mut table = example_table();
        table.declare_signal(1, BitRange::single(3), "HLT").unwrap();
        table.declare_define("FETCH", "0").unwrap();
        table.declare_define("FETCH", "1").unwrap();
        table.declare_input("STEP", BitRange::single(9)).unwrap();

        assert_eq!(table.signals.len(), 4);
        assert_eq!(
            table.find_signal("HLT"),
            Some(&SignalField::new("HLT", 0, BitRange::single(0)))
        );
        assert_eq!(
            table.find_define("FETCH").map(|define| define.replacement.as_str()),
            Some("0")
        );
        assert_eq!(table.inputs.len(), 3);
        assert_eq!(table.input_width(), 10);

        // Defaults go to the first declaration
        table.set_default("HLT", 1).unwrap();
        assert_eq!(table.default_words(), vec![0b1, 0, 0]);
    }

    #[test]
    fn test_chip_out_of_range() {
        let mut table = SymbolTable::new();
        table.declare_signal(MAX_CHIPS - 1, BitRange::single(0), "LAST").unwrap();
        assert_eq!(table.chip_count(), MAX_CHIPS);
        assert_eq!(
            table.declare_signal(MAX_CHIPS, BitRange::single(0), "S"),
            Err(SymbolError::ChipOutOfRange(MAX_CHIPS))
        );
        assert_eq!(
            table.declare_signal(usize::MAX, BitRange::single(0), "S"),
            Err(SymbolError::ChipOutOfRange(usize::MAX))
        );
    }

    #[test]
    fn test_set_default() {
        let mut table = example_table();
        table.set_default("ALU", 0b10).unwrap();
        table.set_default("BUS", 0xff).unwrap();
        assert_eq!(table.find_signal("ALU").map(|signal| signal.default), Some(0b10));

        assert_eq!(
            table.set_default("MISSING", 1),
            Err(SymbolError::Undefined(SymbolKind::Signal, "MISSING".to_string()))
        );
        assert_eq!(
            table.set_default("HLT", 2),
            Err(SymbolError::ValueTooWide {
                name: "HLT".to_string(),
                value: 2,
                width: 1,
            })
        );
    }

    #[test]
    fn test_default_words() {
        let mut table = example_table();
        assert_eq!(table.default_words(), vec![0, 0, 0]);

        table.set_default("HLT", 1).unwrap();
        table.set_default("ALU", 0b11).unwrap();
        table.set_default("BUS", 0xa5).unwrap();
        // Chip 1 has no signals and stays 0
        assert_eq!(table.default_words(), vec![0b11_0001, 0, 0xa5]);
    }
}
