use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use signups_core::LiveCount;

use super::AppState;

fn live_event(live: &LiveCount) -> Event {
    Event::default()
        .event("count")
        .data(serde_json::to_string(live).unwrap_or_default())
}

/// Streams the current count, then every change pushed by the store.
///
/// Nothing is sent until a count is known. The stream ends when the server
/// shuts down and the sender side is dropped.
pub(super) async fn live_counts(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.live.clone();

    let stream = async_stream::stream! {
        let initial = *rx.borrow_and_update();
        if let Some(live) = initial {
            yield Ok(live_event(&live));
        }

        while rx.changed().await.is_ok() {
            let latest = *rx.borrow_and_update();
            if let Some(live) = latest {
                yield Ok(live_event(&live));
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
