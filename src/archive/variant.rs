use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// On-disk shape of one index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    /// Record width in bytes.
    pub width: usize,
    /// Whether the trailing `original_size` field is present.
    pub has_original_size: bool,
}

impl RecordLayout {
    /// `size, offset, sequence`
    pub const COMPACT: Self = Self {
        width: 12,
        has_original_size: false,
    };

    /// `size, offset, sequence, original_size`
    pub const FULL: Self = Self {
        width: 16,
        has_original_size: true,
    };
}

/// The container families this tool understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerVariant {
    /// `.nwa`: the whole file is a single NWA stream.
    SingleStream,
    /// `.nwk`: indexed archive of NWA streams.
    IndexedTypeA,
    /// `.ovk`: indexed archive of raw Ogg streams.
    IndexedTypeB,
}

/// Suffixes in match order; the first one found in the file name wins.
const SUFFIXES: [(&str, ContainerVariant); 3] = [
    (".nwa", ContainerVariant::SingleStream),
    (".nwk", ContainerVariant::IndexedTypeA),
    (".ovk", ContainerVariant::IndexedTypeB),
];

impl ContainerVariant {
    /// Pick the variant from the input's file name. Does not touch the file.
    pub fn classify(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        SUFFIXES
            .iter()
            .find(|(suffix, _)| name.contains(suffix))
            .map(|(_, variant)| *variant)
            .ok_or_else(|| Error::UnsupportedFormat {
                path: path.to_path_buf(),
            })
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ContainerVariant::SingleStream => "NWA",
            ContainerVariant::IndexedTypeA => "Koe-nwk",
            ContainerVariant::IndexedTypeB => "Ogg-ovk",
        }
    }

    /// Index record layout, or `None` for the unindexed variant.
    pub fn record_layout(&self) -> Option<RecordLayout> {
        match self {
            ContainerVariant::SingleStream => None,
            ContainerVariant::IndexedTypeA => Some(RecordLayout::COMPACT),
            ContainerVariant::IndexedTypeB => Some(RecordLayout::FULL),
        }
    }

    pub fn output_extension(&self) -> &'static str {
        match self {
            ContainerVariant::SingleStream | ContainerVariant::IndexedTypeA => "wav",
            ContainerVariant::IndexedTypeB => "ogg",
        }
    }

    /// Whether indexed entries go through the decoder before being written.
    pub fn decodes_entries(&self) -> bool {
        matches!(self, ContainerVariant::IndexedTypeA)
    }
}

impl fmt::Display for ContainerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_suffixes() {
        let cases = [
            ("bgm01.nwa", ContainerVariant::SingleStream),
            ("z0001.nwk", ContainerVariant::IndexedTypeA),
            ("data/voice/z0420.ovk", ContainerVariant::IndexedTypeB),
        ];
        for (path, expected) in cases {
            assert_eq!(ContainerVariant::classify(Path::new(path)).unwrap(), expected);
        }
    }

    #[test]
    fn substring_match_first_wins() {
        let variant = ContainerVariant::classify(Path::new("odd.nwa.ovk")).unwrap();
        assert_eq!(variant, ContainerVariant::SingleStream);
    }

    #[test]
    fn directory_names_are_ignored() {
        let err = ContainerVariant::classify(Path::new("dump.ovk/readme.txt")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = ContainerVariant::classify(Path::new("music.xyz")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn variant_parameters() {
        assert_eq!(ContainerVariant::SingleStream.record_layout(), None);
        assert_eq!(ContainerVariant::IndexedTypeA.record_layout().unwrap().width, 12);
        assert_eq!(ContainerVariant::IndexedTypeB.record_layout().unwrap().width, 16);
        assert_eq!(ContainerVariant::IndexedTypeA.output_extension(), "wav");
        assert_eq!(ContainerVariant::IndexedTypeB.output_extension(), "ogg");
        assert!(ContainerVariant::IndexedTypeA.decodes_entries());
        assert!(!ContainerVariant::IndexedTypeB.decodes_entries());
    }
}
