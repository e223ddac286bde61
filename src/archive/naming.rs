use std::path::{Path, PathBuf};

use super::variant::ContainerVariant;

/// Derives output file names from the output prefix and the input name.
///
/// The prefix is prepended verbatim, so `out/` writes into a directory while
/// `out/take2_` prefixes the file names.
#[derive(Debug, Clone)]
pub struct OutputNaming {
    stem: String,
    extension: &'static str,
}

impl OutputNaming {
    pub fn new(output_prefix: &str, input: &Path, variant: ContainerVariant) -> Self {
        Self {
            stem: format!("{output_prefix}{}", base_name(input)),
            extension: variant.output_extension(),
        }
    }

    /// `{prefix}{base}.{ext}`
    pub fn single_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.stem, self.extension))
    }

    /// `{prefix}{base}-{sequence}.{ext}`
    pub fn entry_path(&self, sequence: i32) -> PathBuf {
        PathBuf::from(format!("{}-{}.{}", self.stem, sequence, self.extension))
    }
}

/// File name up to its first dot.
fn base_name(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_names_embed_sequence() {
        let naming = OutputNaming::new(
            "out/",
            Path::new("data/z0420.ovk"),
            ContainerVariant::IndexedTypeB,
        );
        assert_eq!(naming.entry_path(17), PathBuf::from("out/z0420-17.ogg"));
        assert_eq!(naming.entry_path(-3), PathBuf::from("out/z0420--3.ogg"));
    }

    #[test]
    fn single_stream_name() {
        let naming = OutputNaming::new("", Path::new("bgm01.nwa"), ContainerVariant::SingleStream);
        assert_eq!(naming.single_path(), PathBuf::from("bgm01.wav"));
    }

    #[test]
    fn base_name_stops_at_first_dot() {
        assert_eq!(base_name(Path::new("/tmp/voice.part1.nwk")), "voice");
        assert_eq!(base_name(Path::new("noext")), "noext");
    }
}
