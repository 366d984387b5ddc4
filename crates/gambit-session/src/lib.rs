//! Per-game session: consumes one game's event stream and drives moves, aborts and the result.

mod notifier;
mod result;

pub use notifier::{Notifier, SilentNotifier};
pub use result::{DrawCause, GameResult, WinCause};

use chrono::{DateTime, Utc};
use gambit_engine::{BrokerFactory, MoveBroker};
use futures::Stream;
use gambit_network::{spawn_event_pump, GameApi};
use gambit_types::{
    color::Color,
    config::SessionConfig,
    events::{ChatLine, FullState, GameEvent},
    game::{GameInfo, GameState},
    GambitError, Result,
};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for the first full-state event.
    Init,
    Active,
    /// Terminal result known; wrapping up.
    Finishing,
    Finished,
}

/// Sent to the supervisor exactly once when a session stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub game_id: String,
    /// `None` when the session stopped without a terminal event.
    pub result: Option<GameResult>,
    pub summary: Option<String>,
    /// When the first full state was processed; `None` if the game never started.
    pub started_at: Option<DateTime<Utc>>,
    /// The game ended while still abortable, or never started.
    pub was_aborted: bool,
}

/// Instant after which an unstarted game is aborted. Computed once per game.
pub fn abort_deadline(
    started_at: DateTime<Utc>,
    config: &SessionConfig,
    opponent_is_bot: bool,
) -> DateTime<Utc> {
    chrono::Duration::from_std(config.abort_grace(opponent_is_bot))
        .ok()
        .and_then(|grace| started_at.checked_add_signed(grace))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

struct ActiveGame<B> {
    info: GameInfo,
    broker: B,
    abort_deadline: DateTime<Utc>,
    abort_sent: bool,
}

pub struct GameSession<F, A, N>
where
    F: BrokerFactory,
    A: GameApi,
    N: Notifier,
{
    game_id: String,
    username: String,
    config: SessionConfig,
    factory: F,
    api: A,
    notifier: N,
    phase: SessionPhase,
    game: Option<ActiveGame<F::Broker>>,
    started_at: Option<DateTime<Utc>>,
    was_aborted: bool,
    result: Option<GameResult>,
    summary: Option<String>,
    supervisor: Option<mpsc::UnboundedSender<SessionReport>>,
}

impl<F, A, N> GameSession<F, A, N>
where
    F: BrokerFactory,
    A: GameApi,
    N: Notifier,
{
    pub fn new(
        game_id: impl Into<String>,
        username: impl Into<String>,
        config: SessionConfig,
        factory: F,
        api: A,
        notifier: N,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            username: username.into(),
            config,
            factory,
            api,
            notifier,
            phase: SessionPhase::Init,
            game: None,
            started_at: None,
            was_aborted: true,
            result: None,
            summary: None,
            supervisor: None,
        }
    }

    /// Reports completion on `tx` in addition to the task's return value.
    pub fn with_supervisor(mut self, tx: mpsc::UnboundedSender<SessionReport>) -> Self {
        self.supervisor = Some(tx);
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn game_info(&self) -> Option<&GameInfo> {
        self.game.as_ref().map(|game| &game.info)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn abort_deadline(&self) -> Option<DateTime<Utc>> {
        self.game.as_ref().map(|game| game.abort_deadline)
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Drains `events` until the game finishes or the stream closes.
    pub async fn run(mut self, mut events: mpsc::Receiver<GameEvent>) -> SessionReport {
        while self.phase != SessionPhase::Finished {
            let Some(event) = events.recv().await else {
                warn!(game_id = %self.game_id, "game stream closed before the game finished");
                self.release().await;
                break;
            };
            if let Err(err) = self.handle_event(event).await {
                error!(game_id = %self.game_id, %err, "session stopped");
                self.release().await;
                break;
            }
        }

        let report = SessionReport {
            game_id: self.game_id.clone(),
            result: self.result,
            summary: self.summary.clone(),
            started_at: self.started_at,
            was_aborted: self.was_aborted,
        };
        if let Some(tx) = &self.supervisor {
            let _ = tx.send(report.clone());
        }
        report
    }

    /// Processes one event. Only a failure to set the game up is returned as an error.
    pub async fn handle_event(&mut self, event: GameEvent) -> Result<SessionPhase> {
        if self.phase == SessionPhase::Finished {
            debug!(game_id = %self.game_id, tag = event.tag(), "event after game end ignored");
            return Ok(self.phase);
        }

        if !event.is_state() {
            self.check_abort().await;
        }

        match event {
            GameEvent::FullState(full) => {
                if self.phase == SessionPhase::Init {
                    self.start(&full).await?;
                } else {
                    self.resync(&full).await;
                }
            }
            GameEvent::StateUpdate(state) => self.apply_update(&state).await,
            GameEvent::ChatLine(line) => self.forward_chat(&line).await,
            GameEvent::OpponentGone { gone, .. } => {
                debug!(game_id = %self.game_id, gone, "opponent presence changed");
            }
            GameEvent::Keepalive => {}
            GameEvent::Unknown(raw) => {
                info!(game_id = %self.game_id, %raw, "unhandled game event");
            }
        }
        Ok(self.phase)
    }

    async fn start(&mut self, full: &FullState) -> Result<()> {
        let info = GameInfo::from_full_state(full, &self.username);
        info!(game_id = %self.game_id, "{}", info.header_line());

        let broker = self.factory.create(&info).await?;
        let now = Utc::now();
        let deadline = abort_deadline(now, &self.config, info.opponent_is_bot());
        self.started_at = Some(now);
        if let Err(err) = self.notifier.send_greetings(&info).await {
            warn!(game_id = %self.game_id, %err, "greeting failed");
        }

        let winner = info.state.winner;
        self.game = Some(ActiveGame {
            info,
            broker,
            abort_deadline: deadline,
            abort_sent: false,
        });
        self.phase = SessionPhase::Active;

        if !self.finish_if_over(winner).await {
            self.act_on_turn().await;
        }
        Ok(())
    }

    async fn resync(&mut self, full: &FullState) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        game.info = GameInfo::from_full_state(full, &self.username);
        if let Err(err) = game.broker.update(&full.state).await {
            warn!(game_id = %self.game_id, %err, "broker rejected full state");
        }

        if !self.finish_if_over(full.state.winner).await {
            self.act_on_turn().await;
        }
    }

    async fn apply_update(&mut self, state: &GameState) {
        let Some(game) = self.game.as_mut() else {
            warn!(game_id = %self.game_id, "state update before the game was initialised");
            return;
        };
        let changed = match game.broker.update(state).await {
            Ok(changed) => changed,
            Err(err) => {
                warn!(game_id = %self.game_id, %err, "broker rejected state update");
                false
            }
        };

        if self.finish_if_over(state.winner).await {
            return;
        }
        let game_over = self
            .game
            .as_ref()
            .map_or(true, |game| game.broker.is_game_over());
        if game_over || !changed {
            return;
        }
        self.act_on_turn().await;
    }

    async fn forward_chat(&mut self, line: &ChatLine) {
        let Some(info) = self.game.as_ref().map(|game| &game.info) else {
            debug!(game_id = %self.game_id, "chat before the game was initialised");
            return;
        };
        if let Err(err) = self.notifier.handle_chat_message(info, line).await {
            warn!(game_id = %self.game_id, %err, "chat handling failed");
        }
    }

    async fn check_abort(&mut self) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if game.abort_sent || !game.broker.is_abortable() || Utc::now() < game.abort_deadline {
            return;
        }

        info!(game_id = %self.game_id, "Aborting game ...");
        match self.api.abort_game(&self.game_id).await {
            Ok(()) => {
                game.abort_sent = true;
                if let Err(err) = self.notifier.send_abortion_message(&game.info).await {
                    warn!(game_id = %self.game_id, %err, "abort message failed");
                }
            }
            Err(err) => warn!(game_id = %self.game_id, %err, "abort request failed"),
        }
    }

    async fn act_on_turn(&mut self) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if !game.broker.is_our_turn() {
            if let Err(err) = game.broker.start_pondering().await {
                warn!(game_id = %self.game_id, %err, "pondering failed");
            }
            return;
        }

        let decision = match game.broker.make_move().await {
            Ok(decision) => decision,
            Err(err) => {
                warn!(game_id = %self.game_id, %err, "no move available");
                return;
            }
        };

        let submitted = if decision.resign {
            info!(game_id = %self.game_id, "Resigning");
            self.api.resign_game(&self.game_id).await
        } else {
            self.api
                .send_move(&self.game_id, &decision.uci_move, decision.offer_draw)
                .await
        };
        if let Err(err) = submitted {
            // Left unresolved until the next actionable event.
            warn!(game_id = %self.game_id, %err, mv = %decision.uci_move, "move submission failed");
        }
    }

    /// Moves to `Finishing` and wraps up when the broker reports the game as over.
    async fn finish_if_over(&mut self, winner: Option<Color>) -> bool {
        let Some(game) = self.game.as_mut() else {
            return false;
        };
        if !game.broker.is_finished() {
            return false;
        }

        self.phase = SessionPhase::Finishing;
        self.was_aborted = game.broker.is_abortable();
        let result = GameResult::classify(winner, game.broker.status(), game.broker.draw_reason());
        let summary = result.summary_line(&game.info);
        info!(game_id = %self.game_id, "{summary}");

        if let Err(err) = self.notifier.send_goodbyes(&game.info).await {
            warn!(game_id = %self.game_id, %err, "goodbye failed");
        }
        if let Err(err) = game.broker.end_game().await {
            warn!(game_id = %self.game_id, %err, "releasing broker failed");
        }

        self.result = Some(result);
        self.summary = Some(summary);
        self.phase = SessionPhase::Finished;
        true
    }

    async fn release(&mut self) {
        if let Some(game) = self.game.as_mut() {
            self.was_aborted = game.broker.is_abortable();
            if let Err(err) = game.broker.end_game().await {
                warn!(game_id = %self.game_id, %err, "releasing broker failed");
            }
        }
        self.phase = SessionPhase::Finished;
    }
}

/// Runs `session` as its own task.
pub fn spawn_session<F, A, N>(
    session: GameSession<F, A, N>,
    events: mpsc::Receiver<GameEvent>,
) -> JoinHandle<SessionReport>
where
    F: BrokerFactory + 'static,
    F::Broker: 'static,
    A: GameApi + 'static,
    N: Notifier + 'static,
{
    tokio::spawn(session.run(events))
}

/// Pumps `events` through a channel of `session.event_buffer` slots and runs `session`
/// on the receiving end.
pub fn spawn_session_on_stream<F, A, N, S>(
    session: GameSession<F, A, N>,
    events: S,
) -> (JoinHandle<SessionReport>, JoinHandle<()>)
where
    F: BrokerFactory + 'static,
    F::Broker: 'static,
    A: GameApi + 'static,
    N: Notifier + 'static,
    S: Stream<Item = GameEvent> + Send + 'static,
{
    let (rx, pump) = spawn_event_pump(events, session.config().event_buffer);
    (spawn_session(session, rx), pump)
}

pub fn session_error(message: impl Into<String>) -> GambitError {
    GambitError::Session(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_deadline_depends_on_opponent_kind() {
        let now = Utc::now();
        let config = SessionConfig::default();
        assert_eq!(
            abort_deadline(now, &config, true),
            now + chrono::Duration::seconds(30)
        );
        assert_eq!(
            abort_deadline(now, &config, false),
            now + chrono::Duration::seconds(60)
        );
    }

    #[test]
    fn abort_deadline_saturates() {
        let config = SessionConfig {
            human_abort_secs: u64::MAX,
            ..SessionConfig::default()
        };
        assert_eq!(
            abort_deadline(Utc::now(), &config, false),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn session_error_wraps_message() {
        assert_eq!(
            session_error("no broker").to_string(),
            "session error: no broker"
        );
    }
}
