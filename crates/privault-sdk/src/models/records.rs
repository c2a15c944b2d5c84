//! Vault record models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{Fields, RedactionType, TokenMode};

/// A record to insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsertRecord {
    /// Column values.
    pub fields: Fields,
    /// Caller supplied tokens, keyed by column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Fields>,
}

impl InsertRecord {
    /// Creates a record from column values.
    #[must_use]
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            tokens: None,
        }
    }

    /// Adds a column value.
    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Adds a caller supplied token for a column.
    #[must_use]
    pub fn with_token(mut self, column: impl Into<String>, token: impl Into<Value>) -> Self {
        self.tokens
            .get_or_insert_with(Fields::new)
            .insert(column.into(), token.into());
        self
    }
}

/// Request to insert records into a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertRequest {
    /// Target table.
    pub table: String,
    /// Records to insert.
    pub records: Vec<InsertRecord>,
    /// Whether the response should carry tokens for the inserted values.
    #[serde(default)]
    pub return_tokens: bool,
    /// Column used to upsert on, if any.
    #[serde(default)]
    pub upsert: Option<String>,
    /// Bring-your-own-token mode.
    #[serde(default)]
    pub token_mode: TokenMode,
    /// Insert records one by one and report failures per record instead of
    /// sending the batch as a single atomic request.
    #[serde(default)]
    pub continue_on_error: bool,
}

impl InsertRequest {
    /// Creates an insert request.
    #[must_use]
    pub fn new(table: impl Into<String>, records: Vec<InsertRecord>) -> Self {
        Self {
            table: table.into(),
            records,
            return_tokens: false,
            upsert: None,
            token_mode: TokenMode::Disable,
            continue_on_error: false,
        }
    }

    /// Requests tokens in the response.
    #[must_use]
    pub fn with_return_tokens(mut self, return_tokens: bool) -> Self {
        self.return_tokens = return_tokens;
        self
    }

    /// Upserts on the given column.
    #[must_use]
    pub fn with_upsert(mut self, column: impl Into<String>) -> Self {
        self.upsert = Some(column.into());
        self
    }

    /// Sets the bring-your-own-token mode.
    #[must_use]
    pub fn with_token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    /// Sets continue-on-error.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// An inserted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertedRecord {
    /// Vault-assigned record id.
    #[serde(rename = "skyflow_id")]
    pub id: String,
    /// Tokens of the inserted values, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Fields>,
}

/// Lookup of records by a unique column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnLookup {
    /// Column name.
    pub name: String,
    /// Values to match.
    pub values: Vec<String>,
}

/// Request to fetch records.
///
/// Records are addressed either by id (one call per id) or by a unique
/// column lookup (a single call).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetRequest {
    /// Target table.
    pub table: String,
    /// Record ids.
    #[serde(default)]
    pub ids: Vec<String>,
    /// Column lookup, exclusive with `ids`.
    #[serde(default)]
    pub column: Option<ColumnLookup>,
    /// Redaction applied to returned values.
    #[serde(default)]
    pub redaction: Option<RedactionType>,
    /// Return tokens instead of values.
    #[serde(default)]
    pub return_tokens: bool,
    /// Columns to return; all when empty.
    #[serde(default)]
    pub fields: Vec<String>,
}

impl GetRequest {
    /// Fetches records by id.
    #[must_use]
    pub fn by_ids(table: impl Into<String>, ids: Vec<String>) -> Self {
        Self {
            table: table.into(),
            ids,
            ..Self::default()
        }
    }

    /// Fetches records by unique column values.
    #[must_use]
    pub fn by_column(
        table: impl Into<String>,
        column: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: Some(ColumnLookup {
                name: column.into(),
                values,
            }),
            ..Self::default()
        }
    }

    /// Sets the redaction type.
    #[must_use]
    pub fn with_redaction(mut self, redaction: RedactionType) -> Self {
        self.redaction = Some(redaction);
        self
    }

    /// Requests tokens instead of values.
    #[must_use]
    pub fn with_return_tokens(mut self, return_tokens: bool) -> Self {
        self.return_tokens = return_tokens;
        self
    }

    /// Restricts the returned columns.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }
}

/// A fetched record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedRecord {
    /// Column values (or tokens when tokens were requested).
    #[serde(default)]
    pub fields: Fields,
    /// Tokens, when returned separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Fields>,
}

impl FetchedRecord {
    /// Returns the record id, when the vault included it.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.fields.get("skyflow_id").and_then(Value::as_str)
    }
}

/// A record to update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecord {
    /// Record id.
    pub id: String,
    /// New column values.
    pub fields: Fields,
    /// Caller supplied tokens, keyed by column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Fields>,
}

impl UpdateRecord {
    /// Creates an update for a record.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
            tokens: None,
        }
    }

    /// Adds a caller supplied token for a column.
    #[must_use]
    pub fn with_token(mut self, column: impl Into<String>, token: impl Into<Value>) -> Self {
        self.tokens
            .get_or_insert_with(Fields::new)
            .insert(column.into(), token.into());
        self
    }
}

/// Request to update records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Target table.
    pub table: String,
    /// Records to update.
    pub records: Vec<UpdateRecord>,
    /// Whether the response should carry tokens.
    #[serde(default)]
    pub return_tokens: bool,
    /// Bring-your-own-token mode.
    #[serde(default)]
    pub token_mode: TokenMode,
}

impl UpdateRequest {
    /// Creates an update request.
    #[must_use]
    pub fn new(table: impl Into<String>, records: Vec<UpdateRecord>) -> Self {
        Self {
            table: table.into(),
            records,
            return_tokens: false,
            token_mode: TokenMode::Disable,
        }
    }

    /// Requests tokens in the response.
    #[must_use]
    pub fn with_return_tokens(mut self, return_tokens: bool) -> Self {
        self.return_tokens = return_tokens;
        self
    }

    /// Sets the bring-your-own-token mode.
    #[must_use]
    pub fn with_token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }
}

/// An updated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedRecord {
    /// Record id.
    #[serde(rename = "skyflow_id")]
    pub id: String,
    /// Tokens of the updated values, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Fields>,
}

/// Request to delete records by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Target table.
    pub table: String,
    /// Record ids.
    pub ids: Vec<String>,
}

impl DeleteRequest {
    /// Creates a delete request.
    #[must_use]
    pub fn new(table: impl Into<String>, ids: Vec<String>) -> Self {
        Self {
            table: table.into(),
            ids,
        }
    }
}

/// A deleted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    /// Record id.
    #[serde(rename = "skyflow_id")]
    pub id: String,
    /// Whether the vault confirmed the deletion.
    #[serde(default)]
    pub deleted: bool,
}

/// A token to detokenize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetokenizeToken {
    /// The token.
    pub token: String,
    /// Redaction applied to the returned value.
    #[serde(default)]
    pub redaction: RedactionType,
}

impl DetokenizeToken {
    /// Creates a detokenize entry with default redaction.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            redaction: RedactionType::Default,
        }
    }

    /// Sets the redaction type.
    #[must_use]
    pub fn with_redaction(mut self, redaction: RedactionType) -> Self {
        self.redaction = redaction;
        self
    }
}

/// Request to detokenize tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetokenizeRequest {
    /// Tokens to resolve.
    pub tokens: Vec<DetokenizeToken>,
}

impl DetokenizeRequest {
    /// Creates a request from tokens with default redaction.
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(DetokenizeToken::new).collect(),
        }
    }

    /// Applies one redaction type to every token.
    #[must_use]
    pub fn with_redaction(mut self, redaction: RedactionType) -> Self {
        for token in &mut self.tokens {
            token.redaction = redaction;
        }
        self
    }
}

/// A resolved token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetokenizedRecord {
    /// The token.
    pub token: String,
    /// Its value, after redaction.
    #[serde(default)]
    pub value: String,
    /// Value type reported by the vault.
    #[serde(rename = "valueType", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

/// A value to tokenize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeValue {
    /// The value.
    pub value: String,
    /// Column group whose token policy applies.
    #[serde(rename = "columnGroup")]
    pub column_group: String,
}

/// Request to tokenize values without storing records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizeRequest {
    /// Values to tokenize.
    pub values: Vec<TokenizeValue>,
}

impl TokenizeRequest {
    /// Creates a tokenize request.
    #[must_use]
    pub fn new(values: Vec<TokenizeValue>) -> Self {
        Self { values }
    }

    /// Adds a value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>, column_group: impl Into<String>) -> Self {
        self.values.push(TokenizeValue {
            value: value.into(),
            column_group: column_group.into(),
        });
        self
    }
}

/// A token issued by a tokenize call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedValue {
    /// The token.
    pub token: String,
}

/// Request to run a query against the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// SQL-like query.
    pub query: String,
}

impl QueryRequest {
    /// Creates a query request.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// A record produced by a batched operation.
///
/// Carried by [`Error::Aggregate`](crate::Error::Aggregate) so that the
/// successes of a failed batch can be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultRecord {
    /// From an insert.
    Inserted(InsertedRecord),
    /// From a get.
    Fetched(FetchedRecord),
    /// From an update.
    Updated(UpdatedRecord),
    /// From a delete.
    Deleted(DeletedRecord),
    /// From a detokenize.
    Detokenized(DetokenizedRecord),
}

impl VaultRecord {
    /// Returns the record id, when the record has one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Inserted(r) => Some(&r.id),
            Self::Fetched(r) => r.id(),
            Self::Updated(r) => Some(&r.id),
            Self::Deleted(r) => Some(&r.id),
            Self::Detokenized(_) => None,
        }
    }

    /// Returns the detokenized entry, if this is one.
    #[must_use]
    pub fn as_detokenized(&self) -> Option<&DetokenizedRecord> {
        match self {
            Self::Detokenized(r) => Some(r),
            _ => None,
        }
    }
}

impl From<InsertedRecord> for VaultRecord {
    fn from(record: InsertedRecord) -> Self {
        Self::Inserted(record)
    }
}

impl From<FetchedRecord> for VaultRecord {
    fn from(record: FetchedRecord) -> Self {
        Self::Fetched(record)
    }
}

impl From<UpdatedRecord> for VaultRecord {
    fn from(record: UpdatedRecord) -> Self {
        Self::Updated(record)
    }
}

impl From<DeletedRecord> for VaultRecord {
    fn from(record: DeletedRecord) -> Self {
        Self::Deleted(record)
    }
}

impl From<DetokenizedRecord> for VaultRecord {
    fn from(record: DetokenizedRecord) -> Self {
        Self::Detokenized(record)
    }
}
