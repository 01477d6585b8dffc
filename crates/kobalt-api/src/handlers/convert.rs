//! Server-sent events conversion endpoint.
//!
//! `GET /api/v1/convert?url=&title=&artist=` always answers 200 with an
//! event stream; failures arrive as an in-band error event. The response
//! body owns the job's cancellation guard, so a client that disconnects
//! cancels the job and its work directory is removed.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn, Instrument};

use kobalt_converter::ProgressStream;
use kobalt_models::{ConvertRequest, JobId, ProgressEvent};

use crate::metrics;
use crate::middleware::RequestId;
use crate::state::AppState;

/// Start a conversion and stream its progress.
pub async fn convert(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    query: Result<Query<ConvertRequest>, QueryRejection>,
) -> Response {
    // An unparseable query is reported in-band like any missing parameter
    let request = match query {
        Ok(Query(request)) => request,
        Err(e) => {
            debug!(error = %e.body_text(), "Rejected convert query");
            ConvertRequest::default()
        }
    };

    let job_id = request_id
        .map(|Extension(RequestId(id))| JobId::from_correlation_id(&id))
        .unwrap_or_default();

    let cancel = CancellationToken::new();
    let (progress, events) = ProgressStream::new(state.converter.config().progress_buffer);

    let done = CancellationToken::new();
    spawn_deadline(
        job_id.clone(),
        state.config.convert_timeout,
        cancel.clone(),
        done.clone(),
    );

    let converter = state.converter.clone();
    let job_cancel = cancel.clone();
    let span = tracing::info_span!("convert", job_id = %job_id);
    tokio::spawn(
        async move {
            let _done = done.drop_guard();
            let terminal = converter.run(&job_id, &request, &progress, job_cancel).await;
            debug!(status = terminal.status.as_str(), "Conversion task finished");
        }
        .instrument(span),
    );

    let sse = Sse::new(event_stream(events, cancel.drop_guard()));

    (
        [(header::CONNECTION, HeaderValue::from_static("keep-alive"))],
        sse,
    )
        .into_response()
}

/// Cancel the job once `timeout` elapses, unless it finished first.
fn spawn_deadline(
    job_id: JobId,
    timeout: Duration,
    cancel: CancellationToken,
    done: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = done.cancelled() => {}
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                warn!(job_id = %job_id, timeout_secs = timeout.as_secs(), "Conversion deadline exceeded");
                metrics::record_deadline_exceeded();
                cancel.cancel();
            }
        }
    });
}

/// Held by the response body. Dropping it cancels the job.
struct StreamGuard {
    _cancel: DropGuard,
}

impl StreamGuard {
    fn new(cancel: DropGuard) -> Self {
        metrics::sse_stream_opened();
        Self { _cancel: cancel }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        metrics::sse_stream_closed();
    }
}

/// One `data: <json>` frame per event, ending when the job task is done.
fn event_stream(
    events: mpsc::Receiver<ProgressEvent>,
    cancel: DropGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (events, StreamGuard::new(cancel)),
        |(mut events, guard)| async move {
            loop {
                let event = events.recv().await?;
                match Event::default().json_data(&event) {
                    Ok(frame) => return Some((Ok(frame), (events, guard))),
                    Err(e) => warn!(error = %e, "Failed to serialize progress event"),
                }
            }
        },
    )
}
