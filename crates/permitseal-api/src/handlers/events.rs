//! SSE change feed for the documents collection.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;

use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /api/v0/events`: change events as server-sent events.
///
/// Delivery mirrors the store contract: at-least-once, unordered, lossy
/// across reconnects. Clients treat an event as a hint to re-list.
pub async fn document_events(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HttpAppError> {
    let subscription = state.documents.subscribe().await?;

    let stream = futures::stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.next().await?;
        let event = Event::default()
            .event(change.kind.as_str())
            .json_data(&change)
            .ok()?;
        Some((Ok::<_, Infallible>(event), subscription))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
