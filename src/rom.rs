use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

use thiserror::Error;

use crate::ast::Word;

/// First line of a Logisim raw memory image.
pub const LOGISIM_HEADER: &str = "v2.0 raw";

/// Placeholder in a target template that is replaced by the chip number.
pub const CHIP_PLACEHOLDER: &str = "%d";

#[derive(Error, Debug)]
pub enum RomError {
    #[error("Unable to write '{path}': {source}")]
    Destination {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Target '{template}' has no %d placeholder but {chips} chips are declared")]
    MissingPlaceholder { template: String, chips: usize },
    #[error("No output stream for chip {0}")]
    UnknownChip(usize),
}

/// Receives the decode table one record at a time, in address order.
///
/// For every address the generator emits one record per chip, chip 0 first.
pub trait RomSink {
    fn emit(&mut self, chip: usize, word: Word) -> Result<(), RomError>;
}

/// File name of the image for `chip`. Only the first placeholder is replaced.
pub fn chip_filename(template: &str, chip: usize) -> String {
    template.replacen(CHIP_PLACEHOLDER, &chip.to_string(), 1)
}

#[derive(Debug)]
struct Output<W> {
    path: String,
    writer: W,
}

/// Writes one Logisim "v2.0 raw" image per chip: the header line followed by one upper-case hex
/// record per address.
#[derive(Debug)]
pub struct RomImageWriter<W: Write> {
    outputs: Vec<Output<W>>,
}

impl<W: Write> RomImageWriter<W> {
    /// Start an image on every writer. Writers are indexed by chip number.
    pub fn new(outputs: Vec<(String, W)>) -> Result<Self, RomError> {
        let mut outputs: Vec<Output<W>> = outputs
            .into_iter()
            .map(|(path, writer)| Output { path, writer })
            .collect();

        for output in outputs.iter_mut() {
            writeln!(output.writer, "{}", LOGISIM_HEADER).map_err(|source| {
                RomError::Destination {
                    path: output.path.clone(),
                    source,
                }
            })?;
        }

        Ok(Self { outputs })
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.outputs.iter().map(|output| output.path.as_str())
    }

    /// Flush every image and hand the writers back.
    pub fn finish(self) -> Result<Vec<W>, RomError> {
        self.outputs
            .into_iter()
            .map(|mut output| -> Result<W, RomError> {
                output
                    .writer
                    .flush()
                    .map_err(|source| RomError::Destination {
                        path: output.path.clone(),
                        source,
                    })?;
                Ok(output.writer)
            })
            .collect()
    }
}

impl RomImageWriter<BufWriter<File>> {
    /// Create the image files for `chips` chips named after `template`.
    ///
    /// Files are created up front. If one of them fails the ones already created are left as
    /// they are.
    #[tracing::instrument]
    pub fn create(template: &str, chips: usize) -> Result<Self, RomError> {
        if chips > 1 && !template.contains(CHIP_PLACEHOLDER) {
            return Err(RomError::MissingPlaceholder {
                template: template.to_owned(),
                chips,
            });
        }

        let mut outputs = Vec::with_capacity(chips);
        for chip in 0..chips {
            let path = chip_filename(template, chip);
            let file = File::create(&path).map_err(|source| RomError::Destination {
                path: path.clone(),
                source,
            })?;
            tracing::info!("Chip {} -> {}", chip, path);
            outputs.push((path, BufWriter::new(file)));
        }

        Self::new(outputs)
    }
}

impl<W: Write> RomSink for RomImageWriter<W> {
    fn emit(&mut self, chip: usize, word: Word) -> Result<(), RomError> {
        let output = self
            .outputs
            .get_mut(chip)
            .ok_or(RomError::UnknownChip(chip))?;
        writeln!(output.writer, "{:X}", word).map_err(|source| RomError::Destination {
            path: output.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn memory_writer(chips: usize) -> RomImageWriter<Vec<u8>> {
        let outputs = (0..chips)
            .map(|chip| (chip_filename("rom%d.hex", chip), Vec::new()))
            .collect();
        RomImageWriter::new(outputs).unwrap()
    }

    fn images(writer: RomImageWriter<Vec<u8>>) -> Vec<String> {
        writer
            .finish()
            .unwrap()
            .into_iter()
            .map(|bytes| String::from_utf8(bytes).unwrap())
            .collect()
    }

    #[test]
    fn test_chip_filename() {
        let tests = vec![
            ("rom%d.hex", 0, "rom0.hex"),
            ("rom%d.hex", 12, "rom12.hex"),
            ("out/%d/%d.hex", 3, "out/3/%d.hex"),
            ("single.hex", 0, "single.hex"),
        ];
        for (template, chip, expected) in tests {
            assert_eq!(chip_filename(template, chip), expected);
        }
    }

    #[test]
    fn test_header_only() {
        assert_eq!(images(memory_writer(2)), vec!["v2.0 raw\n", "v2.0 raw\n"]);
    }

    #[test]
    fn test_records() {
        let mut writer = memory_writer(2);
        for (chip, word) in [(0, 0x1), (1, 0xff), (0, 0), (1, 0xabc), (0, 0x1_0000_0000)] {
            writer.emit(chip, word).unwrap();
        }
        assert_eq!(
            images(writer),
            vec!["v2.0 raw\n1\n0\n100000000\n", "v2.0 raw\nFF\nABC\n"]
        );
    }

    #[test]
    fn test_unknown_chip() {
        let mut writer = memory_writer(1);
        assert!(matches!(writer.emit(1, 0), Err(RomError::UnknownChip(1))));
    }

    #[test]
    fn test_paths() {
        let writer = memory_writer(3);
        assert_eq!(
            writer.paths().collect::<Vec<&str>>(),
            vec!["rom0.hex", "rom1.hex", "rom2.hex"]
        );
    }

    #[test]
    fn test_missing_placeholder() {
        assert!(matches!(
            RomImageWriter::create("single.hex", 2),
            Err(RomError::MissingPlaceholder { chips: 2, .. })
        ));
    }

    #[test]
    fn test_destination_error() {
        let result = RomImageWriter::create("/nonexistent-mcasm-dir/rom%d.hex", 1);
        match result {
            Err(RomError::Destination { path, .. }) => {
                assert_eq!(path, "/nonexistent-mcasm-dir/rom0.hex")
            }
            other => panic!("expected a destination error, got {:?}", other),
        }
    }
}
