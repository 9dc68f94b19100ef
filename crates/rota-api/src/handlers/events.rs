//! Server-Sent Events stream of invitation changes.
//!
//! Each event's SSE name is the event type (`invitation_created`,
//! `invitation_cancelled`, `membership_joined`) and its data is the JSON
//! payload. Lagging clients skip what they missed and keep streaming.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use rota_services::InvitationEvent;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;

use crate::state::AppState;

fn to_sse(event: &InvitationEvent) -> Option<Event> {
    match Event::default().event(event.name()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode invitation event");
            None
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v0/events",
    tag = "events",
    responses(
        (status = 200, description = "Stream of invitation events", body = String, content_type = "text/event-stream")
    )
)]
pub async fn invitation_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|received| {
        match received {
            Ok(event) => to_sse(&event).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
