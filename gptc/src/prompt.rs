use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{GptcError, GptcResult};
use crate::mode::Mode;
use crate::telemetry::{TelemetryEncoder, TelemetrySnapshot};

/// Source of the static instruction header for a mode.
pub trait PromptStore: Send + Sync {
    fn header(&self, mode: Mode) -> GptcResult<String>;
}

/// Headers compiled into the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinPromptStore;

impl BuiltinPromptStore {
    pub fn template(mode: Mode) -> &'static str {
        match mode {
            Mode::Altitude => include_str!("../assets/prompts/altitude.md"),
            Mode::Heading => include_str!("../assets/prompts/heading.md"),
            Mode::Speed => include_str!("../assets/prompts/speed.md"),
            Mode::Approach => include_str!("../assets/prompts/approach.md"),
        }
    }
}

impl PromptStore for BuiltinPromptStore {
    fn header(&self, mode: Mode) -> GptcResult<String> {
        Ok(Self::template(mode).to_string())
    }
}

/// Reads `<base_dir>/<mode>.md`, falling back to the builtin header when the
/// file does not exist.
#[derive(Clone, Debug)]
pub struct FilePromptStore {
    base_dir: PathBuf,
}

impl FilePromptStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, mode: Mode) -> PathBuf {
        self.base_dir.join(format!("{}.md", mode.as_str()))
    }
}

impl PromptStore for FilePromptStore {
    fn header(&self, mode: Mode) -> GptcResult<String> {
        let path = self.path_for(mode);
        if !path.exists() {
            debug!(path = %path.display(), "no prompt template on disk, using builtin");
            return BuiltinPromptStore.header(mode);
        }
        fs::read_to_string(&path).map_err(|e| {
            GptcError::Prompt(format!(
                "Failed to read prompt template {} for mode {}: {}",
                path.display(),
                mode,
                e
            ))
        })
    }
}

/// The exact text submitted to the oracle for one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    text: String,
}

impl Prompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Hex SHA-256 of the prompt text, for correlating log lines.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Header + encoded telemetry, concatenated with no extra separator.
#[derive(Clone, Debug)]
pub struct PromptAssembler {
    mode: Mode,
    header: String,
    encoder: TelemetryEncoder,
}

impl PromptAssembler {
    /// Loads the header once; it is reused for every prompt afterwards.
    pub fn new(store: &dyn PromptStore, mode: Mode, encoder: TelemetryEncoder) -> GptcResult<Self> {
        let header = store.header(mode)?;
        Ok(Self {
            mode,
            header,
            encoder,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn assemble(&self, snapshot: &TelemetrySnapshot) -> Prompt {
        let body = self.encoder.encode(snapshot);
        let mut text = String::with_capacity(self.header.len() + body.len());
        text.push_str(&self.header);
        text.push_str(&body);
        Prompt { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::AircraftTelemetry;

    #[test]
    fn test_builtin_headers_name_their_grammar() {
        assert!(BuiltinPromptStore::template(Mode::Altitude).contains("ALT <aircraft> <altitude>"));
        assert!(BuiltinPromptStore::template(Mode::Heading).contains("HDG <aircraft> <heading>"));
        assert!(BuiltinPromptStore::template(Mode::Speed).contains("SPD <aircraft> <speed>"));
        assert!(BuiltinPromptStore::template(Mode::Approach)
            .contains("<aircraft>: <heading> <flight level> <latitude> <longitude>"));
        for mode in Mode::ALL {
            assert!(BuiltinPromptStore::template(mode).ends_with('\n'));
        }
    }

    #[test]
    fn test_builtin_headers_state_minima_and_example() {
        for mode in Mode::ALL {
            let header = BuiltinPromptStore::template(mode);
            assert!(header.contains("minimum"), "{} header has no separation minimum", mode);
            assert!(header.contains("Example"), "{} header has no worked example", mode);
        }
        let policy = Mode::Approach.policy();
        let max = policy.max_line_length.unwrap();
        for example in ["A: 220 FL020 130.1 65.1", "B: 220 FL040 130.2 65.2"] {
            assert!(BuiltinPromptStore::template(Mode::Approach).contains(example));
            assert!(example.chars().count() <= max);
        }
    }

    #[test]
    fn test_assemble_is_header_then_telemetry() {
        let assembler =
            PromptAssembler::new(&BuiltinPromptStore, Mode::Heading, TelemetryEncoder::default())
                .unwrap();
        let snapshot: TelemetrySnapshot = [AircraftTelemetry::new("DL1", 1.0, 2.0)]
            .into_iter()
            .collect();
        let prompt = assembler.assemble(&snapshot);
        let body = TelemetryEncoder::default().encode(&snapshot);
        assert_eq!(prompt.as_str(), format!("{}{}", assembler.header(), body));
        assert_eq!(prompt.hash().len(), 64);
        assert_eq!(prompt.hash(), assembler.assemble(&snapshot).hash());
    }

    #[test]
    fn test_file_store_overrides_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("speed.md"), "Custom speed header\n").unwrap();
        let store = FilePromptStore::new(dir.path());
        assert_eq!(store.header(Mode::Speed).unwrap(), "Custom speed header\n");
        assert_eq!(
            store.header(Mode::Altitude).unwrap(),
            BuiltinPromptStore::template(Mode::Altitude)
        );
    }
}
