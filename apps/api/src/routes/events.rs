//! `GET /api/events` — an SSE stream of `{counts, processed, total}` snapshots
//! emitted roughly once per second until the client disconnects.

use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use serde::Serialize;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use wts_store::JobStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct Snapshot {
    counts: std::collections::HashMap<JobStatus, i64>,
    processed: u64,
    total: i64,
}

pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let ticks = IntervalStream::new(tokio::time::interval(Duration::from_secs(1)));

    let stream = ticks.then(move |_| {
        let state = state.clone();
        async move {
            let counts = state.store.counts().await.unwrap_or_default();
            let total = counts.values().sum();
            let processed = state.progress.get_stats().total_processed;
            let snapshot = Snapshot { counts, processed, total };
            let payload = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());
            Ok(Event::default().data(payload))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
