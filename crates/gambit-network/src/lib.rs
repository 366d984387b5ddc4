//! Server-facing facade: the remote game API contract and the per-game event channel.

use async_trait::async_trait;
use futures::{future, stream::BoxStream, Stream, StreamExt};
use gambit_types::{events::GameEvent, GambitError, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, warn};

/// Game actions submitted to the server. Any retry policy lives in the implementation.
#[async_trait]
pub trait GameApi: Send + Sync {
    async fn send_move(&self, game_id: &str, uci_move: &str, offer_draw: bool) -> Result<()>;
    async fn resign_game(&self, game_id: &str) -> Result<()>;
    async fn abort_game(&self, game_id: &str) -> Result<()>;
}

/// Decodes a newline-delimited game stream. The stream ends on the first read error.
pub fn decode_lines<R>(reader: R) -> BoxStream<'static, GameEvent>
where
    R: AsyncBufRead + Send + Unpin + 'static,
{
    LinesStream::new(reader.lines())
        .take_while(|line| {
            if let Err(err) = line {
                warn!(%err, "game stream read failed");
            }
            future::ready(line.is_ok())
        })
        .filter_map(|line| future::ready(line.ok().map(|text| GameEvent::from_line(&text))))
        .boxed()
}

/// Forwards `events` into a bounded channel in arrival order.
///
/// The receiver yields `None` once the source stream is exhausted, which is the
/// stream-closed signal for the consuming session.
pub fn spawn_event_pump<S>(events: S, capacity: usize) -> (mpsc::Receiver<GameEvent>, JoinHandle<()>)
where
    S: Stream<Item = GameEvent> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(async move {
        let mut events = Box::pin(events);
        while let Some(event) = events.next().await {
            if tx.send(event).await.is_err() {
                debug!("event receiver dropped; stopping pump");
                return;
            }
        }
        debug!("game stream closed");
    });
    (rx, handle)
}

pub fn network_error(message: impl Into<String>) -> GambitError {
    GambitError::Network(message.into())
}
