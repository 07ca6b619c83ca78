use tracing::Level;
use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::{filter::Targets, prelude::*};

/// Logging switches from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Debug flags: `l` loader, `p` parser, `g` generator
    pub debug: Option<String>,
    /// Only warnings and errors
    pub silent: bool,
    /// Chrome tracing
    pub trace: bool,
}

/// Debug flags understood by [`targets`].
pub const DEBUG_FLAGS: &str = "lpg";

fn debug_targets(flag: char) -> &'static [&'static str] {
    match flag {
        'l' => &["mcasm::loader"],
        'p' => &[
            "mcasm::assembler::parser",
            "mcasm::assembler::compiler",
            "mcasm::assembler::symbols",
        ],
        'g' => &["mcasm::assembler::codegen", "mcasm::rom"],
        _ => &[],
    }
}

/// Log filter for `options`. Everything logs at info, or warn when silent. Debug flags lower
/// the level of their modules to debug.
pub fn targets(options: &LogOptions) -> Targets {
    let level = if options.silent {
        Level::WARN
    } else {
        Level::INFO
    };

    let mut targets = Targets::new().with_default(level);
    for flag in options.debug.iter().flat_map(|flags| flags.chars()) {
        for target in debug_targets(flag) {
            targets = targets.with_target(*target, Level::DEBUG);
        }
    }
    targets
}

/// Install the global subscriber: log lines on stderr and, when asked for, tracing to
/// chrome://tracing or https://ui.perfetto.dev/
///
/// Make sure to store the returned guard in a variable in the scope to be instrumented, otherwise
/// the trace will be disabled immediately.
pub fn init(options: &LogOptions) -> Option<FlushGuard> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_filter(targets(options));

    if options.trace {
        let (chrome_layer, guard) = ChromeLayerBuilder::new().build();
        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(chrome_layer)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry().with(fmt_layer).init();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets() {
        let tests = vec![
            // (debug, silent, target, level, enabled)
            (None, false, "mcasm::loader", Level::INFO, true),
            (None, false, "mcasm::loader", Level::DEBUG, false),
            (None, true, "mcasm::loader", Level::INFO, false),
            (None, true, "mcasm::rom", Level::WARN, true),
            (Some("l"), false, "mcasm::loader", Level::DEBUG, true),
            (Some("l"), false, "mcasm::assembler::parser", Level::DEBUG, false),
            (Some("p"), false, "mcasm::assembler::compiler", Level::DEBUG, true),
            (Some("g"), false, "mcasm::assembler::codegen", Level::DEBUG, true),
            (Some("lpg"), true, "mcasm::rom", Level::DEBUG, true),
            (Some("lpg"), true, "mcasm::instrumentation", Level::INFO, false),
        ];
        for (debug, silent, target, level, enabled) in tests {
            let options = LogOptions {
                debug: debug.map(str::to_owned),
                silent,
                trace: false,
            };
            assert_eq!(
                targets(&options).would_enable(target, &level),
                enabled,
                "{:?} {} {}",
                options,
                target,
                level
            );
        }
    }
}
