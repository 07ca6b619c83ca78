/// Commands recognised at the top level of a microcode source.
///
/// Every directive starts with `#`. All of them except [`Directive::Define`] open a block that
/// runs until the next line holding a `}`.
#[derive(
    Debug, PartialEq, Eq, Clone, Copy, strum_macros::EnumString, strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Directive {
    /// `#inputs{` declares the fields of the input bus.
    Inputs,
    /// `#signals{` declares the output signals, per chip.
    Signals,
    /// `#define NAME(replacement)` declares a header macro.
    Define,
    /// `#defaults{` assigns default values to declared signals.
    Defaults,
    /// `#op(...){` declares an opcode rule.
    Op,
}
