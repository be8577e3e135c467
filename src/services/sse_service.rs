use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::{StoreStatus, StreamEvent, StreamHello},
    state::{CompletionCorrected, SharedState},
};

/// First event of a stream.
pub const EVENT_HANDSHAKE: &str = "handshake";
/// A local completion flag was overwritten with the remote value.
pub const EVENT_COMPLETION_CORRECTED: &str = "completion_corrected";
/// Degraded mode was entered or left.
pub const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Sources feeding one completions stream.
pub struct Subscription {
    corrections: broadcast::Receiver<CompletionCorrected>,
    degraded: watch::Receiver<bool>,
    handshake: Option<StreamEvent>,
}

/// Subscribe to completion corrections and degraded mode changes.
pub fn subscribe_completions(state: &SharedState) -> Subscription {
    let degraded = state.store().degraded_watcher();
    let handshake = encode(EVENT_HANDSHAKE, &StreamHello::new(*degraded.borrow()));

    Subscription {
        corrections: state.tracker().subscribe(),
        degraded,
        handshake,
    }
}

/// Convert a subscription into an SSE response, forwarding events until the client
/// disconnects.
pub fn to_sse_stream(
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut corrections,
        mut degraded,
        handshake,
    } = subscription;

    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(handshake.into())).await.is_err() {
                return;
            }
        }

        loop {
            let payload = tokio::select! {
                _ = tx.closed() => break,
                recv_result = corrections.recv() => match recv_result {
                    Ok(correction) => encode(EVENT_COMPLETION_CORRECTED, &correction),
                    Err(RecvError::Closed) => break,
                    // Skip lagged messages but keep the stream alive.
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "completions SSE stream lagged");
                        continue;
                    }
                },
                changed = degraded.changed() => match changed {
                    Ok(()) => {
                        let status = StoreStatus::new(*degraded.borrow_and_update());
                        encode(EVENT_SYSTEM_STATUS, &status)
                    }
                    Err(_) => break,
                },
            };

            let Some(payload) = payload else {
                continue;
            };
            if tx.send(Ok(payload.into())).await.is_err() {
                break;
            }
        }

        info!("completions SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn encode(name: &'static str, payload: &impl serde::Serialize) -> Option<StreamEvent> {
    StreamEvent::encode(name, payload)
        .inspect_err(|err| warn!(event = name, error = %err, "failed to serialize SSE payload"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::GameId;

    #[test]
    fn corrections_serialize_as_camel_case_json() {
        let event = encode(
            EVENT_COMPLETION_CORRECTED,
            &CompletionCorrected {
                username: "alice".into(),
                game_id: GameId::new(4).unwrap(),
                completed: true,
            },
        )
        .unwrap();

        assert_eq!(event.name, EVENT_COMPLETION_CORRECTED);
        assert_eq!(
            event.data,
            r#"{"username":"alice","gameId":4,"completed":true}"#
        );
    }
}
