//! PII detection and de-identification models.

use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Entity types that can be detected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectEntity {
    /// Person name.
    Name,
    /// Email address.
    EmailAddress,
    /// Phone number.
    PhoneNumber,
    /// Social Security Number.
    Ssn,
    /// Credit card number.
    CreditCard,
    /// Physical location or address.
    Location,
    /// Date of birth.
    Dob,
    /// IP address.
    IpAddress,
    /// Passport number.
    PassportNumber,
    /// Driver's license number.
    DriverLicense,
    /// Bank account number.
    BankAccount,
    /// Medical record or health plan identifier.
    HealthcareNumber,
    /// Tax ID number.
    TaxId,
    /// Username or account ID.
    Username,
    /// Password or credential.
    Password,
    /// Vehicle identification number.
    Vin,
}

impl std::fmt::Display for DetectEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // serde's snake_case name is the wire and display form
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        f.write_str(&name)
    }
}

/// Format of the tokens substituted for detected entities.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenFormat {
    /// Entity name with a per-entity counter, e.g. `[NAME_1]`.
    #[default]
    #[serde(rename = "entity_unq_counter")]
    EntityUniqueCounter,
    /// Entity name only, e.g. `[NAME]`.
    EntityOnly,
    /// A vault token that can be reidentified later.
    VaultToken,
}

/// Request to de-identify a text blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeidentifyTextRequest {
    /// Text to process.
    pub text: String,
    /// Entities to detect; all when empty.
    #[serde(default)]
    pub entities: Vec<DetectEntity>,
    /// Token format.
    #[serde(default)]
    pub token_format: TokenFormat,
    /// Regexes whose matches are never de-identified.
    #[serde(default)]
    pub allow_regex: Vec<String>,
    /// Regexes whose matches are always de-identified.
    #[serde(default)]
    pub restrict_regex: Vec<String>,
}

impl DeidentifyTextRequest {
    /// Creates a request for a text blob.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
            token_format: TokenFormat::default(),
            allow_regex: Vec::new(),
            restrict_regex: Vec::new(),
        }
    }

    /// Limits detection to specific entities.
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<DetectEntity>) -> Self {
        self.entities = entities;
        self
    }

    /// Sets the token format.
    #[must_use]
    pub fn with_token_format(mut self, format: TokenFormat) -> Self {
        self.token_format = format;
        self
    }

    /// Adds an allow regex.
    #[must_use]
    pub fn allow(mut self, regex: impl Into<String>) -> Self {
        self.allow_regex.push(regex.into());
        self
    }

    /// Adds a restrict regex.
    #[must_use]
    pub fn restrict(mut self, regex: impl Into<String>) -> Self {
        self.restrict_regex.push(regex.into());
        self
    }
}

/// Position of an entity in the original and processed text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLocation {
    /// Start offset in the original text.
    #[serde(rename = "start_index", default)]
    pub start: usize,
    /// End offset in the original text.
    #[serde(rename = "end_index", default)]
    pub end: usize,
    /// Start offset in the processed text.
    #[serde(rename = "start_index_processed", default)]
    pub start_processed: usize,
    /// End offset in the processed text.
    #[serde(rename = "end_index_processed", default)]
    pub end_processed: usize,
}

/// A detected entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEntity {
    /// Token substituted for the entity.
    #[serde(default)]
    pub token: String,
    /// The original value.
    #[serde(default)]
    pub value: String,
    /// Entity type, as reported by the service.
    #[serde(default)]
    pub entity_type: String,
    /// Location of the entity.
    #[serde(default)]
    pub location: EntityLocation,
    /// Confidence per candidate type.
    #[serde(default)]
    pub entity_scores: std::collections::HashMap<String, f64>,
}

/// Result of de-identifying a text blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeidentifyTextResponse {
    /// Text with entities replaced by tokens.
    pub processed_text: String,
    /// Detected entities.
    #[serde(default)]
    pub entities: Vec<DetectedEntity>,
    /// Words in the input.
    #[serde(default)]
    pub word_count: u64,
    /// Characters in the input.
    #[serde(default)]
    pub character_count: u64,
}

/// Request to restore the values behind tokens in a text blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReidentifyTextRequest {
    /// Text with tokens.
    pub text: String,
    /// Entities returned redacted.
    #[serde(default)]
    pub redacted_entities: Vec<DetectEntity>,
    /// Entities returned masked.
    #[serde(default)]
    pub masked_entities: Vec<DetectEntity>,
    /// Entities returned in plain text.
    #[serde(default)]
    pub plain_text_entities: Vec<DetectEntity>,
}

impl ReidentifyTextRequest {
    /// Creates a request for a text blob.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns these entities redacted.
    #[must_use]
    pub fn redacted(mut self, entities: Vec<DetectEntity>) -> Self {
        self.redacted_entities = entities;
        self
    }

    /// Returns these entities masked.
    #[must_use]
    pub fn masked(mut self, entities: Vec<DetectEntity>) -> Self {
        self.masked_entities = entities;
        self
    }

    /// Returns these entities in plain text.
    #[must_use]
    pub fn plain_text(mut self, entities: Vec<DetectEntity>) -> Self {
        self.plain_text_entities = entities;
        self
    }
}

/// Result of reidentifying a text blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReidentifyTextResponse {
    /// Text with tokens replaced by values.
    #[serde(rename = "text")]
    pub processed_text: String,
}

/// File contents submitted for de-identification.
#[derive(Clone, Serialize, Deserialize)]
pub struct FileInput {
    /// Base64 encoded contents.
    pub base64: String,
    /// Lowercase file extension, e.g. `pdf` or `mp3`.
    pub data_format: String,
}

impl FileInput {
    /// Wraps raw bytes with their file extension.
    #[must_use]
    pub fn from_bytes(bytes: impl AsRef<[u8]>, extension: impl Into<String>) -> Self {
        Self {
            base64: base64::engine::general_purpose::STANDARD.encode(bytes.as_ref()),
            data_format: extension.into().trim_start_matches('.').to_lowercase(),
        }
    }

    /// Reads a file, taking the format from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                Error::validation(format!("file {} has no extension", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(bytes, extension))
    }
}

impl std::fmt::Debug for FileInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileInput")
            .field("data_format", &self.data_format)
            .field("base64_len", &self.base64.len())
            .finish()
    }
}

/// Request to de-identify a file.
#[derive(Debug, Clone)]
pub struct DeidentifyFileRequest {
    /// The file.
    pub file: FileInput,
    /// Entities to detect; all when empty.
    pub entities: Vec<DetectEntity>,
    /// Token format.
    pub token_format: TokenFormat,
    /// Regexes whose matches are never de-identified.
    pub allow_regex: Vec<String>,
    /// Regexes whose matches are always de-identified.
    pub restrict_regex: Vec<String>,
    /// How long to wait for the run before returning it in progress.
    pub wait_time: Option<Duration>,
}

impl DeidentifyFileRequest {
    /// Creates a request for a file.
    #[must_use]
    pub fn new(file: FileInput) -> Self {
        Self {
            file,
            entities: Vec::new(),
            token_format: TokenFormat::default(),
            allow_regex: Vec::new(),
            restrict_regex: Vec::new(),
            wait_time: None,
        }
    }

    /// Limits detection to specific entities.
    #[must_use]
    pub fn with_entities(mut self, entities: Vec<DetectEntity>) -> Self {
        self.entities = entities;
        self
    }

    /// Sets the token format.
    #[must_use]
    pub fn with_token_format(mut self, format: TokenFormat) -> Self {
        self.token_format = format;
        self
    }

    /// Sets the maximum time to wait for the run.
    #[must_use]
    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = Some(wait_time);
        self
    }
}

/// Status of a de-identification run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Still processing.
    InProgress,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Failed,
}

impl RunStatus {
    /// Returns true for `Success` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One artifact produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Base64 encoded artifact.
    #[serde(default)]
    pub processed_file: String,
    /// Artifact type, e.g. `redacted_file` or `entities`.
    #[serde(default)]
    pub processed_file_type: String,
    /// Artifact extension.
    #[serde(default)]
    pub processed_file_extension: String,
}

/// Word and character counts of a processed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCharacterCount {
    /// Words.
    #[serde(default)]
    pub word_count: u64,
    /// Characters.
    #[serde(default)]
    pub character_count: u64,
}

/// A de-identification run, terminal or still in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeidentifyFileResponse {
    /// Run id, used to resume polling with
    /// [`DetectService::get_run`](crate::client::DetectService::get_run).
    #[serde(default)]
    pub run_id: String,
    /// Run status.
    pub status: RunStatus,
    /// Produced artifacts.
    #[serde(default)]
    pub output: Vec<RunOutput>,
    /// Output type reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    /// Word and character counts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_character_count: Option<WordCharacterCount>,
    /// Processed size in KB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Audio duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Pages of a document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    /// Slides of a presentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides: Option<u32>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeidentifyFileResponse {
    /// A run that has not finished yet.
    #[must_use]
    pub fn in_progress(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            status: RunStatus::InProgress,
            output: Vec::new(),
            output_type: None,
            word_character_count: None,
            size: None,
            duration: None,
            pages: None,
            slides: None,
            message: None,
        }
    }

    /// The processed file, if the run produced one.
    #[must_use]
    pub fn processed_file(&self) -> Option<&RunOutput> {
        self.output
            .iter()
            .find(|o| o.processed_file_type != "entities")
    }

    /// Entity reports produced alongside the file.
    pub fn entity_reports(&self) -> impl Iterator<Item = &RunOutput> {
        self.output
            .iter()
            .filter(|o| o.processed_file_type == "entities")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunHandle {
    pub run_id: String,
}
