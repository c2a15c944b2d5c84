//! Per-record fan-out and result aggregation.
//!
//! A batched operation is split into one future per record. [`FanOut`]
//! dispatches them with bounded concurrency, waits for every one of them, and
//! partitions the outcomes into an [`AggregateResult`] that keeps the original
//! record order inside both the success and the failure lists.

use std::future::Future;

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::RawResponse;
use crate::error::{Error, Result};
use crate::models::VaultRecord;

/// Default number of in-flight requests per batched call.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// A failed record of a batched call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// Position of the record in the caller's request.
    pub index: usize,
    /// HTTP code, absent when no response was received.
    pub code: Option<u16>,
    /// Error description.
    pub description: String,
    /// Value of the `x-request-id` response header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RecordError {
    /// Creates a record error.
    pub fn new(index: usize, code: Option<u16>, description: impl Into<String>) -> Self {
        Self {
            index,
            code,
            description: description.into(),
            request_id: None,
        }
    }

    /// Builds a record error from a request that never got a response.
    #[must_use]
    pub fn transport(error: &Error) -> Self {
        Self::new(0, error.status_code(), error.to_string())
    }
}

/// Outcome of a single dispatched record.
#[derive(Debug, Clone)]
pub enum RecordOutcome<T> {
    /// The call succeeded and its body was parsed.
    Success(T),
    /// The call failed.
    Failure(RecordError),
}

impl<T: DeserializeOwned> RecordOutcome<T> {
    /// Converts a raw response into an outcome.
    ///
    /// Transport errors and non-2xx statuses become failures; a 2xx body that
    /// does not parse as `T` is a failure carrying the response status.
    pub fn from_response(response: Result<RawResponse>) -> Self {
        match response {
            Err(e) => Self::Failure(RecordError::transport(&e)),
            Ok(response) if !response.is_success() => Self::Failure(response.failure()),
            Ok(response) => match response.json::<T>() {
                Ok(value) => Self::Success(value),
                Err(e) => Self::Failure(RecordError::new(
                    0,
                    Some(response.status.as_u16()),
                    format!("Failed to parse response: {e}"),
                )),
            },
        }
    }
}

impl<T> RecordOutcome<T> {
    /// Chains a fallible conversion onto a successful outcome.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> RecordOutcome<U>) -> RecordOutcome<U> {
        match self {
            Self::Success(value) => f(value),
            Self::Failure(error) => RecordOutcome::Failure(error),
        }
    }

    /// Returns true for a successful outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Partitioned result of a batched call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult<T> {
    /// Successful records, in request order.
    pub records: Vec<T>,
    /// Failed records, in request order.
    pub errors: Vec<RecordError>,
    /// True when some records succeeded and some failed.
    pub partial: bool,
}

impl<T> AggregateResult<T> {
    /// Partitions outcomes, stamping each failure with its record index.
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<RecordOutcome<T>>) -> Self {
        let mut records = Vec::new();
        let mut errors = Vec::new();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                RecordOutcome::Success(value) => records.push(value),
                RecordOutcome::Failure(mut error) => {
                    error.index = index;
                    errors.push(error);
                }
            }
        }

        let partial = !errors.is_empty() && !records.is_empty();
        Self {
            records,
            errors,
            partial,
        }
    }

    /// Total number of records, succeeded or failed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len() + self.errors.len()
    }

    /// Returns true when no record was processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true when every record succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Maps the successful records.
    pub fn map_records<U>(self, f: impl FnMut(T) -> U) -> AggregateResult<U> {
        AggregateResult {
            records: self.records.into_iter().map(f).collect(),
            errors: self.errors,
            partial: self.partial,
        }
    }
}

impl<T> AggregateResult<T>
where
    T: Into<VaultRecord>,
{
    /// Returns the records when all succeeded, otherwise raises
    /// [`Error::Aggregate`] carrying both partitions.
    pub fn into_result(self) -> Result<Vec<T>> {
        if self.errors.is_empty() {
            return Ok(self.records);
        }

        warn!(
            succeeded = self.records.len(),
            failed = self.errors.len(),
            partial = self.partial,
            "Batched call finished with failures"
        );
        Err(Error::Aggregate(Box::new(self.map_records(Into::into))))
    }
}

/// Bounded-concurrency dispatcher for per-record calls.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    limit: usize,
}

impl FanOut {
    /// Creates a dispatcher running at most `limit` calls at once.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    /// Returns the concurrency limit.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs `op` for every request and aggregates the outcomes.
    ///
    /// All requests are dispatched before any is awaited (up to the limit),
    /// and every request runs to completion: a failure never cancels its
    /// siblings. Outcomes are collected in request order.
    pub async fn execute<R, T, F, Fut>(&self, requests: Vec<R>, op: F) -> AggregateResult<T>
    where
        F: FnMut(R) -> Fut,
        Fut: Future<Output = RecordOutcome<T>>,
    {
        debug!(records = requests.len(), limit = self.limit, "Dispatching batch");

        let outcomes: Vec<RecordOutcome<T>> = stream::iter(requests)
            .map(op)
            .buffered(self.limit)
            .collect()
            .await;

        AggregateResult::from_outcomes(outcomes)
    }
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::models::DeletedRecord;

    fn deleted(id: &str) -> DeletedRecord {
        DeletedRecord {
            id: id.to_string(),
            deleted: true,
        }
    }

    #[tokio::test]
    async fn test_all_success_keeps_order() {
        let ids: Vec<String> = (0..5).map(|i| format!("id-{i}")).collect();

        let result = FanOut::new(5)
            .execute((0..5u64).collect::<Vec<_>>(), |i| async move {
                // Later records finish first.
                tokio::time::sleep(Duration::from_millis(50 - i * 10)).await;
                RecordOutcome::Success(deleted(&format!("id-{i}")))
            })
            .await;

        assert!(result.is_success());
        assert!(!result.partial);
        let records = result.into_result().expect("all records succeed");
        let got: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(got, ids);
    }

    #[tokio::test]
    async fn test_partial_failure_is_raised() {
        let result = FanOut::new(4)
            .execute((0..5).collect::<Vec<usize>>(), |i| async move {
                if i == 1 || i == 3 {
                    RecordOutcome::Failure(RecordError::new(0, Some(400), format!("bad {i}")))
                } else {
                    RecordOutcome::Success(deleted(&i.to_string()))
                }
            })
            .await;

        assert!(result.partial);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].index, 1);
        assert_eq!(result.errors[1].index, 3);
        assert_eq!(result.errors[1].description, "bad 3");

        let err = result.into_result().expect_err("partial success is an error");
        let aggregate = err.into_aggregate().expect("aggregate payload");
        let ids: Vec<_> = aggregate
            .records
            .iter()
            .map(|r| match r {
                VaultRecord::Deleted(d) => d.id.clone(),
                other => panic!("unexpected record {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec!["0", "2", "4"]);
    }

    #[tokio::test]
    async fn test_full_failure_is_not_partial() {
        let result: AggregateResult<DeletedRecord> = FanOut::default()
            .execute(vec![1, 2, 3], |_| async {
                RecordOutcome::Failure(RecordError::new(0, Some(500), "down"))
            })
            .await;

        assert!(!result.partial);
        assert!(result.records.is_empty());
        assert_eq!(result.errors.len(), 3);
        let indices: Vec<_> = result.errors.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let err = result.into_result().expect_err("full failure is an error");
        assert!(matches!(err, Error::Aggregate(ref a) if !a.partial));
    }

    #[tokio::test]
    async fn test_failure_does_not_cancel_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));

        let result = FanOut::new(8)
            .execute((0..6).collect::<Vec<u64>>(), |i| {
                let completed = Arc::clone(&completed);
                async move {
                    if i == 0 {
                        return RecordOutcome::Failure(RecordError::new(0, Some(500), "fast fail"));
                    }
                    tokio::time::sleep(Duration::from_millis(10 * i)).await;
                    completed.fetch_add(1, Ordering::SeqCst);
                    RecordOutcome::Success(deleted(&i.to_string()))
                }
            })
            .await;

        assert_eq!(completed.load(Ordering::SeqCst), 5);
        assert_eq!(result.records.len(), 5);
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_but_not_serialized() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let result = FanOut::new(3)
            .execute((0..9).collect::<Vec<usize>>(), |i| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    RecordOutcome::Success(deleted(&i.to_string()))
                }
            })
            .await;

        assert_eq!(result.records.len(), 9);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        assert_eq!(FanOut::new(0).limit(), 1);
    }

    #[test]
    fn test_and_then_keeps_failures() {
        let failed: RecordOutcome<u8> =
            RecordOutcome::Failure(RecordError::new(0, Some(404), "missing"));
        let mapped = failed.and_then(|v| RecordOutcome::Success(u16::from(v)));
        assert!(!mapped.is_success());

        let ok = RecordOutcome::Success(1u8).and_then(|v| RecordOutcome::Success(u16::from(v) + 1));
        assert!(matches!(ok, RecordOutcome::Success(2)));
    }

    fn raw(status: u16, body: &'static [u8]) -> RawResponse {
        RawResponse {
            status: reqwest::StatusCode::from_u16(status).unwrap(),
            request_id: Some("req-1".to_string()),
            body: bytes::Bytes::from_static(body),
        }
    }

    #[test]
    fn test_from_response_unparsable_success_body() {
        let outcome = RecordOutcome::<DeletedRecord>::from_response(Ok(raw(200, b"not json")));

        match outcome {
            RecordOutcome::Failure(error) => {
                assert_eq!(error.code, Some(200));
                assert!(error.description.starts_with("Failed to parse response"));
            }
            RecordOutcome::Success(_) => panic!("unparsable body must fail"),
        }
    }

    #[test]
    fn test_from_response_error_status() {
        let body = br#"{"error":{"http_code":404,"message":"No Records Found"}}"#;
        let outcome = RecordOutcome::<DeletedRecord>::from_response(Ok(raw(404, body)));

        match outcome {
            RecordOutcome::Failure(error) => {
                assert_eq!(error.code, Some(404));
                assert_eq!(error.request_id.as_deref(), Some("req-1"));
            }
            RecordOutcome::Success(_) => panic!("404 must fail"),
        }
    }

    #[test]
    fn test_from_response_transport_error_has_no_code() {
        let outcome =
            RecordOutcome::<DeletedRecord>::from_response(Err(Error::config("connection refused")));

        match outcome {
            RecordOutcome::Failure(error) => {
                assert_eq!(error.code, None);
                assert!(error.description.contains("connection refused"));
            }
            RecordOutcome::Success(_) => panic!("transport error must fail"),
        }
    }
}
