use std::fmt;

/// A macro definition.
///
/// E.g. `#define FETCH(0b00)`. The replacement is substituted verbatim wherever the name shows
/// up as an opcode header field.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MacroDefinition {
    /// The name of the macro (e.g. `FETCH`)
    pub name: String,
    /// Replacement text between the parentheses
    pub replacement: String,
}

impl MacroDefinition {
    pub fn new(name: &str, replacement: &str) -> MacroDefinition {
        MacroDefinition {
            name: name.to_owned(),
            replacement: replacement.to_owned(),
        }
    }
}

impl fmt::Display for MacroDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#define {}({})", self.name, self.replacement)
    }
}
