/// Compiles microcode descriptions into decode tables.
///
/// The steps are:
/// 1. **Lexing** - converting a source line into tokens
/// 2. **Parsing** - turning directives into symbol tables and opcode rules
/// 3. **Compiling** - computing the match pattern and chip words of every `#op`
/// 4. **Generating** - enumerating every input address into one word per chip
pub mod assembler;

/// Input and signal fields, macros and opcode rules
pub mod ast;

/// Reads sources, strips comments and expands `#include`
pub mod loader;

/// Logisim ROM image output
pub mod rom;

/// Logging and chrome tracing setup
pub mod instrumentation;
