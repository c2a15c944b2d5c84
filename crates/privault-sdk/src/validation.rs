//! Request validation.
//!
//! Every check here runs before a token is fetched or a request is sent, so
//! a rejected request never reaches the network.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::{
    DeidentifyFileRequest, DeidentifyTextRequest, DeleteRequest, DetokenizeRequest, Fields,
    GetRequest, InsertRequest, QueryRequest, ReidentifyTextRequest, TokenMode, TokenizeRequest,
    UpdateRequest,
};
use crate::poller::MAX_WAIT;

/// Checks caller supplied tokens against the bring-your-own-token mode.
///
/// Each item is a record's fields and its optional tokens.
pub fn validate_token_mode<'a, I>(mode: TokenMode, records: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a Fields, Option<&'a Fields>)>,
{
    for (index, (fields, tokens)) in records.into_iter().enumerate() {
        match mode {
            TokenMode::Disable => {
                if tokens.is_some_and(|t| !t.is_empty()) {
                    return Err(Error::validation(format!(
                        "record {index}: tokens are not allowed when token mode is DISABLE"
                    )));
                }
            }
            TokenMode::Enable => {
                if tokens.map_or(true, Fields::is_empty) {
                    return Err(Error::validation(format!(
                        "record {index}: tokens are required when token mode is ENABLE"
                    )));
                }
            }
            TokenMode::EnableStrict => {
                let field_keys: BTreeSet<&String> = fields.keys().collect();
                let token_keys: BTreeSet<&String> =
                    tokens.map(|t| t.keys().collect()).unwrap_or_default();
                if field_keys != token_keys {
                    return Err(Error::validation(format!(
                        "record {index}: token mode ENABLE_STRICT requires a token for every field"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn require_table(table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(Error::validation("table name must not be empty"));
    }
    Ok(())
}

fn require_records(count: usize, what: &str) -> Result<()> {
    if count == 0 {
        return Err(Error::validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn require_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> Result<()> {
    for (index, id) in ids.into_iter().enumerate() {
        if id.trim().is_empty() {
            return Err(Error::validation(format!("record {index}: id must not be empty")));
        }
    }
    Ok(())
}

/// Validates an insert request.
pub fn validate_insert(request: &InsertRequest) -> Result<()> {
    require_table(&request.table)?;
    require_records(request.records.len(), "records")?;

    for (index, record) in request.records.iter().enumerate() {
        if record.fields.is_empty() {
            return Err(Error::validation(format!(
                "record {index}: fields must not be empty"
            )));
        }
    }
    if request.upsert.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(Error::validation("upsert column must not be empty"));
    }

    validate_token_mode(
        request.token_mode,
        request.records.iter().map(|r| (&r.fields, r.tokens.as_ref())),
    )
}

/// Validates a get request.
pub fn validate_get(request: &GetRequest) -> Result<()> {
    require_table(&request.table)?;

    match (&request.column, request.ids.is_empty()) {
        (Some(_), false) => {
            return Err(Error::validation(
                "ids and column lookup cannot be combined",
            ))
        }
        (None, true) => return Err(Error::validation("ids must not be empty")),
        (Some(column), true) => {
            if column.name.trim().is_empty() {
                return Err(Error::validation("column name must not be empty"));
            }
            require_records(column.values.len(), "column values")?;
        }
        (None, false) => require_ids(&request.ids)?,
    }

    if request.return_tokens && request.redaction.is_some() {
        return Err(Error::validation(
            "redaction cannot be applied when tokens are returned",
        ));
    }
    Ok(())
}

/// Validates an update request.
pub fn validate_update(request: &UpdateRequest) -> Result<()> {
    require_table(&request.table)?;
    require_records(request.records.len(), "records")?;
    require_ids(request.records.iter().map(|r| &r.id))?;

    for (index, record) in request.records.iter().enumerate() {
        if record.fields.is_empty() {
            return Err(Error::validation(format!(
                "record {index}: fields must not be empty"
            )));
        }
    }

    validate_token_mode(
        request.token_mode,
        request.records.iter().map(|r| (&r.fields, r.tokens.as_ref())),
    )
}

/// Validates a delete request.
pub fn validate_delete(request: &DeleteRequest) -> Result<()> {
    require_table(&request.table)?;
    require_records(request.ids.len(), "ids")?;
    require_ids(&request.ids)
}

/// Validates a detokenize request.
pub fn validate_detokenize(request: &DetokenizeRequest) -> Result<()> {
    require_records(request.tokens.len(), "tokens")?;
    for (index, token) in request.tokens.iter().enumerate() {
        if token.token.trim().is_empty() {
            return Err(Error::validation(format!(
                "record {index}: token must not be empty"
            )));
        }
    }
    Ok(())
}

/// Validates a tokenize request.
pub fn validate_tokenize(request: &TokenizeRequest) -> Result<()> {
    require_records(request.values.len(), "values")?;
    for (index, value) in request.values.iter().enumerate() {
        if value.column_group.trim().is_empty() {
            return Err(Error::validation(format!(
                "record {index}: column group must not be empty"
            )));
        }
    }
    Ok(())
}

/// Validates a query request.
pub fn validate_query(request: &QueryRequest) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(Error::validation("query must not be empty"));
    }
    Ok(())
}

/// Validates a text de-identification request.
pub fn validate_deidentify_text(request: &DeidentifyTextRequest) -> Result<()> {
    if request.text.trim().is_empty() {
        return Err(Error::validation("text must not be empty"));
    }
    Ok(())
}

/// Validates a text reidentification request.
pub fn validate_reidentify_text(request: &ReidentifyTextRequest) -> Result<()> {
    if request.text.trim().is_empty() {
        return Err(Error::validation("text must not be empty"));
    }

    let mut seen = BTreeSet::new();
    let all = request
        .redacted_entities
        .iter()
        .chain(&request.masked_entities)
        .chain(&request.plain_text_entities);
    for entity in all {
        if !seen.insert(entity.to_string()) {
            return Err(Error::validation(format!(
                "entity {entity} is listed under more than one format"
            )));
        }
    }
    Ok(())
}

/// Validates a file de-identification request.
pub fn validate_deidentify_file(request: &DeidentifyFileRequest) -> Result<()> {
    if request.file.base64.is_empty() {
        return Err(Error::validation("file must not be empty"));
    }
    if request.file.data_format.is_empty() {
        return Err(Error::validation("file format must not be empty"));
    }
    if let Some(wait) = request.wait_time {
        if wait.is_zero() || wait > MAX_WAIT {
            return Err(Error::validation(format!(
                "wait time must be greater than 0 and at most {} seconds",
                MAX_WAIT.as_secs()
            )));
        }
    }
    Ok(())
}
