use std::path::PathBuf;

use anyhow::Context;

use self::{
    codegen::{decode_table, generate, CodegenError, DecodeTable, GeneratorOptions},
    lexer::SourceUnit,
    parser::{ParseError, Parser},
    symbols::SymbolTable,
};
use crate::{
    ast::OpcodeRule,
    loader::{DiskReader, Loader, LoaderError, MemoryReader},
    rom::{RomError, RomImageWriter},
};

/// Lexes source lines into tokens.
///
/// Converts a line into tokens. For example, the line `1:0.3=ALU_OP` would be
/// converted into the following tokens:
///
/// ```text
/// [
///     Token { token: TokenType::Decimal, literal: "1", span: 0-1 },
///     Token { token: TokenType::Colon, literal: ":", span: 1-2 },
///     Token { token: TokenType::Decimal, literal: "0", span: 2-3 },
///     Token { token: TokenType::Dot, literal: ".", span: 3-4 },
///     Token { token: TokenType::Decimal, literal: "3", span: 4-5 },
///     Token { token: TokenType::Equals, literal: "=", span: 5-6 },
///     Token { token: TokenType::Identifier, literal: "ALU_OP", span: 6-12 },
///     Token { token: TokenType::Eof, literal: "", span: 12-12 },
/// ]
/// ```
pub mod lexer;

/// Parses directives into symbol tables and opcode rules.
pub mod parser;

/// Declared inputs, signals and macros.
pub mod symbols;

/// Turns an `#op` header and body into a match pattern and chip words.
pub mod compiler;

/// Enumerates the address space into the decode table.
pub mod codegen;

/// Everything one compilation builds up: the symbol tables and the rules in declaration order.
#[derive(Debug, Default, Clone)]
pub struct Session {
    pub symbols: SymbolTable,
    pub rules: Vec<OpcodeRule>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblerError {
    #[error("Loader error: {0}")]
    Load(#[from] LoaderError),
    #[error("Parser error: {0}")]
    Parse(#[from] ParseError),
    #[error("Generator error: {0}")]
    Codegen(#[from] CodegenError),
    #[error("Output error: {0}")]
    Rom(#[from] RomError),
}

/// Parse a flattened source into a new session.
pub fn parse(unit: &SourceUnit) -> Result<Session, ParseError> {
    let mut session = Session::new();
    Parser::new(unit).parse(&mut session)?;
    Ok(session)
}

/// Name under which [`compile_code`] registers its input.
pub const INPUT_NAME: &str = "<input>";

/// Utility function for generating the decode table of a microcode source held in memory.
///
/// `#include` is not available since there is no file system to read from.
#[tracing::instrument(skip(input))]
pub fn compile_code(input: &str) -> Result<DecodeTable, AssemblerError> {
    let reader = MemoryReader::new().with_file(INPUT_NAME, input);
    let unit = Loader::new(reader).load(INPUT_NAME)?;
    let session = parse(&unit)?;
    let table = decode_table(&session, &GeneratorOptions::default())?;

    Ok(table)
}

#[derive(clap::Args, Debug, Clone)]
pub struct AssemblyArgs {
    #[clap(help = "Microcode source file")]
    pub source: PathBuf,
    #[clap(default_value = "rom%d.hex")]
    #[clap(help = "Output file name, %d is replaced by the chip number")]
    pub target: String,
    #[clap(long, default_value_t = codegen::DEFAULT_MAX_ADDRESS_BITS)]
    #[clap(help = "Refuse to generate images with more address bits")]
    pub max_address_bits: u32,
}

/// Load, parse and generate one ROM image per chip.
pub fn assemble(args: &AssemblyArgs) -> anyhow::Result<()> {
    let source = args.source.to_string_lossy();
    let unit = Loader::new(DiskReader)
        .load(&source)
        .with_context(|| format!("Unable to load '{}'", source))?;

    let session = parse(&unit)?;

    let options = GeneratorOptions {
        max_address_bits: args.max_address_bits,
    };
    // Fail before any file is created
    options.address_bits(&session.symbols)?;

    let chips = session.symbols.chip_count();
    if chips == 0 {
        tracing::warn!("No signals declared, nothing to write");
        return Ok(());
    }

    let mut writer = RomImageWriter::create(&args.target, chips)?;
    generate(&session, &options, &mut writer).with_context(|| "Generating ROM images failed")?;

    let paths: Vec<String> = writer.paths().map(str::to_owned).collect();
    writer.finish()?;
    tracing::info!("Wrote {}", paths.join(", "));

    Ok(())
}
