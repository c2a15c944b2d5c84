//! Vault record and token service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::batch::{RecordError, RecordOutcome};
use crate::error::Result;
use crate::models::{
    DeleteRequest, DeletedRecord, DetokenizeRequest, DetokenizeToken, DetokenizedRecord,
    FetchedRecord, Fields, GetRequest, InsertRecord, InsertRequest, InsertedRecord, QueryRequest,
    TokenMode, TokenizeRequest, TokenizeValue, TokenizedValue, UpdateRecord, UpdateRequest,
    UpdatedRecord,
};
use crate::validation;

use super::super::ClientContext;

/// List envelope used by most vault responses.
#[derive(Debug, Deserialize)]
struct RecordsEnvelope<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
}

#[derive(Debug, Serialize)]
struct InsertBody<'a> {
    records: &'a [InsertRecord],
    tokenization: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    upsert: Option<&'a str>,
    byot: TokenMode,
}

impl<'a> InsertBody<'a> {
    fn new(request: &'a InsertRequest, records: &'a [InsertRecord]) -> Self {
        Self {
            records,
            tokenization: request.return_tokens,
            upsert: request.upsert.as_deref(),
            byot: request.token_mode,
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateFields<'a> {
    fields: &'a Fields,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens: Option<&'a Fields>,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    record: UpdateFields<'a>,
    tokenization: bool,
    byot: TokenMode,
}

#[derive(Debug, Serialize)]
struct DetokenizeBody<'a> {
    #[serde(rename = "detokenizationParameters")]
    parameters: &'a [DetokenizeToken],
}

#[derive(Debug, Serialize)]
struct TokenizeBody<'a> {
    #[serde(rename = "tokenizationParameters")]
    parameters: &'a [TokenizeValue],
}

fn first_record<T>(
    envelope: RecordsEnvelope<T>,
    missing: impl FnOnce() -> RecordError,
) -> RecordOutcome<T> {
    match envelope.records.into_iter().next() {
        Some(record) => RecordOutcome::Success(record),
        None => RecordOutcome::Failure(missing()),
    }
}

fn read_options(request: &GetRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![("tokenization", request.return_tokens.to_string())];
    if !request.return_tokens {
        query.push(("redaction", request.redaction.unwrap_or_default().to_string()));
    }
    query.extend(request.fields.iter().map(|f| ("fields", f.clone())));
    query
}

/// Service for reading and writing vault records and tokens.
///
/// Operations on several records dispatch one request per record (insert
/// only when `continue_on_error` is set) with a single bearer token, and
/// report per-record failures through
/// [`Error::Aggregate`](crate::Error::Aggregate).
#[derive(Clone)]
pub struct VaultService {
    ctx: Arc<ClientContext>,
}

impl VaultService {
    pub(crate) fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }

    /// Returns the vault ID this service operates on.
    #[must_use]
    pub fn vault_id(&self) -> &str {
        &self.ctx.config.vault_id
    }

    /// Inserts records into a table.
    ///
    /// Without `continue_on_error` the records are sent as one request that
    /// either succeeds or fails as a whole with [`Error::Api`](crate::Error::Api).
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use privault_sdk::{VaultClient, InsertRecord, InsertRequest};
    /// # async fn example(client: VaultClient) -> Result<(), privault_sdk::Error> {
    /// let records = vec![
    ///     InsertRecord::default().with_field("email", "ada@example.com"),
    ///     InsertRecord::default().with_field("email", "alan@example.com"),
    /// ];
    ///
    /// match client
    ///     .vault()
    ///     .insert(InsertRequest::new("customers", records).with_continue_on_error(true))
    ///     .await
    /// {
    ///     Ok(inserted) => println!("Inserted {} records", inserted.len()),
    ///     Err(e) => {
    ///         if let Some(result) = e.aggregate() {
    ///             println!("{} inserted, {} failed", result.records.len(), result.errors.len());
    ///         }
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn insert(&self, request: InsertRequest) -> Result<Vec<InsertedRecord>> {
        self.ctx.scoped(self.insert_records(request)).await
    }

    #[instrument(
        skip(self, request),
        fields(table = %request.table, records = request.records.len(), continue_on_error = request.continue_on_error)
    )]
    async fn insert_records(&self, request: InsertRequest) -> Result<Vec<InsertedRecord>> {
        validation::validate_insert(&request)?;
        let token = self.ctx.bearer_token().await?;
        let path = self.ctx.vault_path(&request.table);

        if !request.continue_on_error {
            let body = InsertBody::new(&request, &request.records);
            let envelope: RecordsEnvelope<InsertedRecord> =
                self.ctx.http.post(&path, &body, &token).await?.into_json()?;
            debug!(inserted = envelope.records.len(), "Inserted batch");
            return Ok(envelope.records);
        }

        let records: Vec<&InsertRecord> = request.records.iter().collect();
        let (ctx, token, path, request_ref) = (&*self.ctx, &token, path.as_str(), &request);
        ctx.fan_out()
            .execute(records, move |record| async move {
                let body = InsertBody::new(request_ref, std::slice::from_ref(record));
                let response = ctx.http.post(path, &body, token).await;
                let status = response.as_ref().ok().map(|r| r.status.as_u16());
                RecordOutcome::<RecordsEnvelope<InsertedRecord>>::from_response(response)
                    .and_then(|envelope| {
                        first_record(envelope, || {
                            RecordError::new(0, status, "Insert response contained no record")
                        })
                    })
            })
            .await
            .into_result()
    }

    /// Fetches records by id or by a unique column.
    ///
    /// Lookups by id dispatch one request per id; an id the vault does not
    /// know fails with code 404. A column lookup is a single request.
    pub async fn get(&self, request: GetRequest) -> Result<Vec<FetchedRecord>> {
        self.ctx.scoped(self.get_records(request)).await
    }

    #[instrument(skip(self, request), fields(table = %request.table, ids = request.ids.len()))]
    async fn get_records(&self, request: GetRequest) -> Result<Vec<FetchedRecord>> {
        validation::validate_get(&request)?;
        let token = self.ctx.bearer_token().await?;
        let path = self.ctx.vault_path(&request.table);
        let options = read_options(&request);

        if let Some(column) = &request.column {
            let mut query = options;
            query.push(("column_name", column.name.clone()));
            query.extend(column.values.iter().map(|v| ("column_values", v.clone())));

            let envelope: RecordsEnvelope<FetchedRecord> =
                self.ctx.http.get(&path, &query, &token).await?.into_json()?;
            return Ok(envelope.records);
        }

        let ids: Vec<&String> = request.ids.iter().collect();
        let (ctx, token, path, options) = (&*self.ctx, &token, path.as_str(), &options);
        ctx.fan_out()
            .execute(ids, move |id| async move {
                let mut query = options.clone();
                query.push(("skyflow_ids", id.clone()));
                let response = ctx.http.get(path, &query, token).await;
                RecordOutcome::<RecordsEnvelope<FetchedRecord>>::from_response(response)
                    .and_then(|envelope| {
                        first_record(envelope, || {
                            RecordError::new(0, Some(404), format!("No record found for id {id}"))
                        })
                    })
            })
            .await
            .into_result()
    }

    /// Updates records by id, one request per record.
    pub async fn update(&self, request: UpdateRequest) -> Result<Vec<UpdatedRecord>> {
        self.ctx.scoped(self.update_records(request)).await
    }

    #[instrument(skip(self, request), fields(table = %request.table, records = request.records.len()))]
    async fn update_records(&self, request: UpdateRequest) -> Result<Vec<UpdatedRecord>> {
        validation::validate_update(&request)?;
        let token = self.ctx.bearer_token().await?;

        let records: Vec<&UpdateRecord> = request.records.iter().collect();
        let (ctx, token, request_ref) = (&*self.ctx, &token, &request);
        ctx.fan_out()
            .execute(
                records,
                move |record| async move {
                    let path = ctx.vault_path(&format!("{}/{}", request_ref.table, record.id));
                    let body = UpdateBody {
                        record: UpdateFields {
                            fields: &record.fields,
                            tokens: record.tokens.as_ref(),
                        },
                        tokenization: request_ref.return_tokens,
                        byot: request_ref.token_mode,
                    };
                    RecordOutcome::<UpdatedRecord>::from_response(
                        ctx.http.put(&path, &body, token).await,
                    )
                },
            )
            .await
            .into_result()
    }

    /// Deletes records by id, one request per id.
    pub async fn delete(&self, request: DeleteRequest) -> Result<Vec<DeletedRecord>> {
        self.ctx.scoped(self.delete_records(request)).await
    }

    #[instrument(skip(self, request), fields(table = %request.table, ids = request.ids.len()))]
    async fn delete_records(&self, request: DeleteRequest) -> Result<Vec<DeletedRecord>> {
        validation::validate_delete(&request)?;
        let token = self.ctx.bearer_token().await?;

        let ids: Vec<&String> = request.ids.iter().collect();
        let (ctx, token, table) = (&*self.ctx, &token, request.table.as_str());
        ctx.fan_out()
            .execute(ids, move |id| async move {
                let path = ctx.vault_path(&format!("{table}/{id}"));
                RecordOutcome::<DeletedRecord>::from_response(ctx.http.delete(&path, token).await)
            })
            .await
            .into_result()
    }

    /// Resolves tokens to their values, one request per token.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use privault_sdk::{VaultClient, DetokenizeRequest, RedactionType};
    /// # async fn example(client: VaultClient) -> Result<(), privault_sdk::Error> {
    /// let request = DetokenizeRequest::new(["tok1", "tok2"]).with_redaction(RedactionType::Masked);
    ///
    /// for record in client.vault().detokenize(request).await? {
    ///     println!("{} => {}", record.token, record.value);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn detokenize(&self, request: DetokenizeRequest) -> Result<Vec<DetokenizedRecord>> {
        self.ctx.scoped(self.detokenize_tokens(request)).await
    }

    #[instrument(skip(self, request), fields(tokens = request.tokens.len()))]
    async fn detokenize_tokens(&self, request: DetokenizeRequest) -> Result<Vec<DetokenizedRecord>> {
        validation::validate_detokenize(&request)?;
        let token = self.ctx.bearer_token().await?;
        let path = self.ctx.vault_path("detokenize");

        let entries: Vec<&DetokenizeToken> = request.tokens.iter().collect();
        let (ctx, bearer, path) = (&*self.ctx, &token, path.as_str());
        ctx.fan_out()
            .execute(
                entries,
                move |entry| async move {
                    let body = DetokenizeBody {
                        parameters: std::slice::from_ref(entry),
                    };
                    let response = ctx.http.post(path, &body, bearer).await;
                    RecordOutcome::<RecordsEnvelope<DetokenizedRecord>>::from_response(response)
                        .and_then(|envelope| {
                            first_record(envelope, || {
                                RecordError::new(
                                    0,
                                    Some(404),
                                    format!("Token not found for {}", entry.token),
                                )
                            })
                        })
                },
            )
            .await
            .into_result()
    }

    /// Issues tokens for values without storing records, in a single request.
    pub async fn tokenize(&self, request: TokenizeRequest) -> Result<Vec<TokenizedValue>> {
        self.ctx.scoped(self.tokenize_values(request)).await
    }

    #[instrument(skip(self, request), fields(values = request.values.len()))]
    async fn tokenize_values(&self, request: TokenizeRequest) -> Result<Vec<TokenizedValue>> {
        validation::validate_tokenize(&request)?;
        let token = self.ctx.bearer_token().await?;
        let body = TokenizeBody {
            parameters: &request.values,
        };

        let envelope: RecordsEnvelope<TokenizedValue> = self
            .ctx
            .http
            .post(&self.ctx.vault_path("tokenize"), &body, &token)
            .await?
            .into_json()?;
        Ok(envelope.records)
    }

    /// Runs a query against the vault.
    pub async fn query(&self, request: QueryRequest) -> Result<Vec<FetchedRecord>> {
        self.ctx.scoped(self.run_query(request)).await
    }

    #[instrument(skip(self, request))]
    async fn run_query(&self, request: QueryRequest) -> Result<Vec<FetchedRecord>> {
        validation::validate_query(&request)?;
        let token = self.ctx.bearer_token().await?;

        let envelope: RecordsEnvelope<FetchedRecord> = self
            .ctx
            .http
            .post(&self.ctx.vault_path("query"), &request, &token)
            .await?
            .into_json()?;
        Ok(envelope.records)
    }
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService")
            .field("vault_id", &self.ctx.config.vault_id)
            .finish_non_exhaustive()
    }
}
