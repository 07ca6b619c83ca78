use thiserror::Error;

use super::{symbols::SymbolTable, Session};
use crate::{
    ast::{OpcodeRule, Word, WORD_BITS},
    rom::{RomError, RomSink},
};

/// Largest address space enumerated unless asked for more, 16M addresses.
pub const DEFAULT_MAX_ADDRESS_BITS: u32 = 24;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Inputs span {bits} address bits, more than the limit of {limit}")]
    AddressSpaceTooLarge { bits: u32, limit: u32 },
    #[error(transparent)]
    Sink(#[from] RomError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Refuse to enumerate more than `2^max_address_bits` addresses
    pub max_address_bits: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_address_bits: DEFAULT_MAX_ADDRESS_BITS,
        }
    }
}

impl GeneratorOptions {
    /// Width of the address space of `symbols`, checked against the limit.
    pub fn address_bits(&self, symbols: &SymbolTable) -> Result<u32, CodegenError> {
        let bits = symbols.input_width();
        // 2^64 addresses cannot be counted in a Word
        let limit = self.max_address_bits.min(WORD_BITS - 1);
        if bits > limit {
            return Err(CodegenError::AddressSpaceTooLarge { bits, limit });
        }
        Ok(bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerateStats {
    pub addresses: Word,
    /// Addresses covered by a rule, the rest got the default words
    pub matches: Word,
}

/// First rule matching `address`, in declaration order.
pub fn select_rule(rules: &[OpcodeRule], address: Word) -> Option<&OpcodeRule> {
    rules.iter().find(|rule| rule.matches(address))
}

/// Enumerate every input address and emit the signal word of every chip to `sink`.
///
/// Addresses go in ascending order, and for each address chips go from 0 up. An address no rule
/// matches gets the default word of every chip.
#[tracing::instrument(skip_all)]
pub fn generate(
    session: &Session,
    options: &GeneratorOptions,
    sink: &mut impl RomSink,
) -> Result<GenerateStats, CodegenError> {
    let bits = options.address_bits(&session.symbols)?;
    let chips = session.symbols.chip_count();
    let defaults = session.symbols.default_words();
    let addresses: Word = 1 << bits;

    tracing::info!(
        "Generating... {} address(es) x {} chip(s), {} rule(s)",
        addresses,
        chips,
        session.rules.len()
    );

    let mut matches = 0;
    for address in 0..addresses {
        let words = match select_rule(&session.rules, address) {
            Some(rule) => {
                matches += 1;
                &rule.words
            }
            None => &defaults,
        };

        for (chip, default) in defaults.iter().enumerate() {
            // Chips declared after the rule was compiled keep their defaults
            let word = words.get(chip).copied().unwrap_or(*default);
            sink.emit(chip, word)?;
        }
    }

    tracing::info!("Generating... done ({} matches)", matches);
    Ok(GenerateStats { addresses, matches })
}

/// The whole decode table in memory, one vector of words per chip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeTable {
    pub chips: Vec<Vec<Word>>,
}

impl DecodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Word of `chip` at `address`.
    pub fn word(&self, chip: usize, address: Word) -> Option<Word> {
        let address = usize::try_from(address).ok()?;
        self.chips.get(chip)?.get(address).copied()
    }
}

impl RomSink for DecodeTable {
    fn emit(&mut self, chip: usize, word: Word) -> Result<(), RomError> {
        if self.chips.len() <= chip {
            self.chips.resize_with(chip + 1, Vec::new);
        }
        self.chips[chip].push(word);
        Ok(())
    }
}

/// Generate the decode table of `session` in memory.
pub fn decode_table(
    session: &Session,
    options: &GeneratorOptions,
) -> Result<DecodeTable, CodegenError> {
    let mut table = DecodeTable::new();
    generate(session, options, &mut table)?;
    Ok(table)
}
