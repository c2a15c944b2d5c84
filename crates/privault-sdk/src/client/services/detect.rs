//! PII detection and de-identification service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::models::{
    DeidentifyFileRequest, DeidentifyFileResponse, DeidentifyTextRequest, DeidentifyTextResponse,
    DetectEntity, FileInput, ReidentifyTextRequest, ReidentifyTextResponse, RunHandle,
    TokenFormat,
};
use crate::poller::{JobPoller, RunFetcher, MAX_WAIT};
use crate::validation;

use super::super::ClientContext;

const DEIDENTIFY_TEXT_PATH: &str = "/v1/detect/deidentify/string";
const REIDENTIFY_TEXT_PATH: &str = "/v1/detect/reidentify/string";
const DEIDENTIFY_FILE_PATH: &str = "/v1/detect/deidentify/file";

#[derive(Debug, Serialize)]
struct TokenType {
    default: TokenFormat,
}

#[derive(Debug, Serialize)]
struct DeidentifyTextBody<'a> {
    text: &'a str,
    vault_id: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    entity_types: &'a [DetectEntity],
    token_type: TokenType,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    allow_regex: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    restrict_regex: &'a [String],
}

#[derive(Debug, Serialize)]
struct ReidentifyFormat<'a> {
    redacted: &'a [DetectEntity],
    masked: &'a [DetectEntity],
    plaintext: &'a [DetectEntity],
}

#[derive(Debug, Serialize)]
struct ReidentifyTextBody<'a> {
    text: &'a str,
    vault_id: &'a str,
    format: ReidentifyFormat<'a>,
}

#[derive(Debug, Serialize)]
struct DeidentifyFileBody<'a> {
    file: &'a FileInput,
    vault_id: &'a str,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    entity_types: &'a [DetectEntity],
    token_type: TokenType,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    allow_regex: &'a [String],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    restrict_regex: &'a [String],
}

/// Looks up runs through the client, with a fresh token per poll.
struct RunLookup<'a> {
    ctx: &'a ClientContext,
}

#[async_trait]
impl RunFetcher for RunLookup<'_> {
    async fn fetch_run(&self, run_id: &str) -> Result<DeidentifyFileResponse> {
        let token = self.ctx.bearer_token().await?;
        let path = format!("/v1/detect/runs/{run_id}");
        let query = [("vault_id", self.ctx.config.vault_id.clone())];

        self.ctx.http.get(&path, &query, &token).await?.into_json()
    }
}

/// Service for detecting and de-identifying PII in text and files.
#[derive(Clone)]
pub struct DetectService {
    ctx: Arc<ClientContext>,
}

impl DetectService {
    pub(crate) fn new(ctx: Arc<ClientContext>) -> Self {
        Self { ctx }
    }

    /// Replaces detected entities in a text blob with tokens.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use privault_sdk::{VaultClient, DeidentifyTextRequest, DetectEntity, TokenFormat};
    /// # async fn example(client: VaultClient) -> Result<(), privault_sdk::Error> {
    /// let request = DeidentifyTextRequest::new("Call Ada on 555-0100")
    ///     .with_entities(vec![DetectEntity::Name, DetectEntity::PhoneNumber])
    ///     .with_token_format(TokenFormat::VaultToken);
    ///
    /// let result = client.detect().deidentify_text(request).await?;
    /// println!("{}", result.processed_text);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn deidentify_text(
        &self,
        request: DeidentifyTextRequest,
    ) -> Result<DeidentifyTextResponse> {
        self.ctx.scoped(self.deidentify_text_inner(request)).await
    }

    #[instrument(skip(self, request), fields(entities = request.entities.len()))]
    async fn deidentify_text_inner(
        &self,
        request: DeidentifyTextRequest,
    ) -> Result<DeidentifyTextResponse> {
        validation::validate_deidentify_text(&request)?;
        let token = self.ctx.bearer_token().await?;
        let body = DeidentifyTextBody {
            text: &request.text,
            vault_id: &self.ctx.config.vault_id,
            entity_types: &request.entities,
            token_type: TokenType {
                default: request.token_format,
            },
            allow_regex: &request.allow_regex,
            restrict_regex: &request.restrict_regex,
        };

        self.ctx
            .http
            .post(DEIDENTIFY_TEXT_PATH, &body, &token)
            .await?
            .into_json()
    }

    /// Restores the values behind tokens in a text blob.
    pub async fn reidentify_text(
        &self,
        request: ReidentifyTextRequest,
    ) -> Result<ReidentifyTextResponse> {
        self.ctx.scoped(self.reidentify_text_inner(request)).await
    }

    #[instrument(skip(self, request))]
    async fn reidentify_text_inner(
        &self,
        request: ReidentifyTextRequest,
    ) -> Result<ReidentifyTextResponse> {
        validation::validate_reidentify_text(&request)?;
        let token = self.ctx.bearer_token().await?;
        let body = ReidentifyTextBody {
            text: &request.text,
            vault_id: &self.ctx.config.vault_id,
            format: ReidentifyFormat {
                redacted: &request.redacted_entities,
                masked: &request.masked_entities,
                plaintext: &request.plain_text_entities,
            },
        };

        self.ctx
            .http
            .post(REIDENTIFY_TEXT_PATH, &body, &token)
            .await?
            .into_json()
    }

    /// Submits a file for de-identification and waits for the run.
    ///
    /// Waits at most `wait_time` (64 seconds when unset) in total. A run that
    /// has not finished by then is returned with status
    /// [`RunStatus::InProgress`](crate::models::RunStatus::InProgress); pass
    /// its `run_id` to [`get_run`](Self::get_run) to check on it later.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use privault_sdk::{VaultClient, DeidentifyFileRequest, FileInput, RunStatus};
    /// # async fn example(client: VaultClient) -> Result<(), privault_sdk::Error> {
    /// let file = FileInput::from_path("statement.pdf").await?;
    /// let run = client.detect().deidentify_file(DeidentifyFileRequest::new(file)).await?;
    ///
    /// if run.status == RunStatus::InProgress {
    ///     let run = client.detect().get_run(&run.run_id).await?;
    ///     println!("{}", run.status);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn deidentify_file(
        &self,
        request: DeidentifyFileRequest,
    ) -> Result<DeidentifyFileResponse> {
        self.ctx.scoped(self.deidentify_file_inner(request)).await
    }

    #[instrument(skip(self, request), fields(format = %request.file.data_format))]
    async fn deidentify_file_inner(
        &self,
        request: DeidentifyFileRequest,
    ) -> Result<DeidentifyFileResponse> {
        validation::validate_deidentify_file(&request)?;
        let poller = JobPoller::new(request.wait_time.unwrap_or(MAX_WAIT))?
            .with_unit(self.ctx.config.poll_interval);

        let token = self.ctx.bearer_token().await?;
        let body = DeidentifyFileBody {
            file: &request.file,
            vault_id: &self.ctx.config.vault_id,
            entity_types: &request.entities,
            token_type: TokenType {
                default: request.token_format,
            },
            allow_regex: &request.allow_regex,
            restrict_regex: &request.restrict_regex,
        };

        let handle: RunHandle = self
            .ctx
            .http
            .post(DEIDENTIFY_FILE_PATH, &body, &token)
            .await?
            .into_json()?;
        debug!(run_id = %handle.run_id, "Submitted file for de-identification");

        poller
            .poll(&RunLookup { ctx: &self.ctx }, &handle.run_id)
            .await
    }

    /// Fetches the current state of a run.
    pub async fn get_run(&self, run_id: &str) -> Result<DeidentifyFileResponse> {
        self.ctx.scoped(self.get_run_inner(run_id)).await
    }

    #[instrument(skip(self))]
    async fn get_run_inner(&self, run_id: &str) -> Result<DeidentifyFileResponse> {
        if run_id.trim().is_empty() {
            return Err(Error::validation("run id must not be empty"));
        }

        let mut run = RunLookup { ctx: &self.ctx }.fetch_run(run_id).await?;
        if run.run_id.is_empty() {
            run.run_id = run_id.to_string();
        }
        Ok(run)
    }
}

impl std::fmt::Debug for DetectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectService")
            .field("vault_id", &self.ctx.config.vault_id)
            .finish_non_exhaustive()
    }
}
