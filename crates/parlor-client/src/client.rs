//! Public session handle.
//!
//! [`ChatSession`] spawns the actor loop and hands out a cloneable handle.
//! Operations are forwarded as commands; state reads return snapshots taken
//! on the actor task, so callers never observe a half-applied transition.

use std::time::Duration;

use parlor_core::{
    ConnectionConfig, ConnectionState, Message, PublishOutcome, QueueState, QueueStatus, Session,
    SessionNotice, env::SystemEnv,
};
use parlor_proto::RoomId;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    credentials::CredentialProvider,
    error::ClientError,
    rest::MatchmakingApi,
    runtime::{Command, Runtime},
};

/// Command channel depth.
const COMMAND_CAPACITY: usize = 32;

/// Notice fan-out buffer per subscriber.
const NOTICE_CAPACITY: usize = 128;

/// Default tick period driving reconnect timers.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Endpoints and tuning for a chat session.
#[derive(Debug, Clone)]
pub struct ChatSessionConfig {
    /// WebSocket endpoint, e.g. `wss://chat.example.com/ws`.
    pub ws_url: String,
    /// REST base URL, e.g. `https://chat.example.com`.
    pub rest_base_url: String,
    /// Connection machine tuning (reconnect delay).
    pub connection: ConnectionConfig,
    /// How often the actor ticks its timers.
    pub tick_interval: Duration,
}

impl ChatSessionConfig {
    /// Config with default tuning for the given endpoints.
    pub fn new(ws_url: impl Into<String>, rest_base_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            rest_base_url: rest_base_url.into(),
            connection: ConnectionConfig::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Consistent point-in-time view of the session's top-level state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Connection lifecycle state.
    pub connection: ConnectionState,
    /// Matchmaking state.
    pub queue: QueueState,
    /// Latest queue snapshot, if queued.
    pub queue_status: Option<QueueStatus>,
}

/// Handle to a running chat session.
///
/// Cheap to clone; all clones talk to the same actor. The session stops
/// when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct ChatSession {
    commands: mpsc::Sender<Command>,
    notices: broadcast::Sender<SessionNotice>,
}

impl ChatSession {
    /// Spawn the session actor on the current tokio runtime.
    pub fn spawn<P: CredentialProvider>(config: ChatSessionConfig, provider: P) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);

        let session =
            Session::new(SystemEnv, provider.identity(), config.connection.clone());
        let runtime = Runtime::new(
            session,
            provider,
            MatchmakingApi::new(config.rest_base_url),
            config.ws_url,
            command_rx,
            notice_tx.clone(),
            config.tick_interval,
        );
        drop(tokio::spawn(runtime.run()));

        Self { commands: command_tx, notices: notice_tx }
    }

    /// Subscribe to change notices. Each subscriber gets its own cursor;
    /// slow subscribers may observe `Lagged` and should re-read state.
    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Request a connection. Idempotent; progress arrives as
    /// [`SessionNotice::ConnectionChanged`] notices.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.send(Command::Connect).await
    }

    /// Tear the connection down.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.send(Command::Disconnect).await
    }

    /// Send a chat message. The message is visible in [`Self::messages`]
    /// immediately; the returned outcome covers the publish attempt only.
    pub async fn send_chat(
        &self,
        room_id: RoomId,
        body: impl Into<String>,
    ) -> Result<PublishOutcome, ClientError> {
        self.request(|reply| Command::SendChat { room_id, body: body.into(), reply }).await
    }

    /// Join the matchmaking queue.
    pub async fn join_queue(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::JoinQueue { reply }).await?
    }

    /// Leave the matchmaking queue.
    pub async fn leave_queue(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::LeaveQueue { reply }).await?
    }

    /// Enter the matched room. `participant_count` comes from the caller's
    /// room-join response.
    pub async fn join_room(
        &self,
        room_id: RoomId,
        participant_count: u32,
    ) -> Result<(), ClientError> {
        self.request(|reply| Command::JoinRoom { room_id, participant_count, reply }).await?
    }

    /// Leave the active room, discarding its messages.
    pub async fn leave_room(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::LeaveRoom { reply }).await?
    }

    /// Reset matchmaking and room state to the signed-out baseline.
    pub async fn reset(&self) -> Result<(), ClientError> {
        self.send(Command::Reset).await
    }

    /// Ordered messages for a room; empty for unknown rooms.
    pub async fn messages(&self, room_id: RoomId) -> Result<Vec<Message>, ClientError> {
        self.request(|reply| Command::Messages { room_id, reply }).await
    }

    /// Point-in-time view of connection and queue state.
    pub async fn state(&self) -> Result<StateSnapshot, ClientError> {
        self.request(|reply| Command::Inspect { reply }).await
    }

    async fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).await.map_err(|_| ClientError::SessionClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| ClientError::SessionClosed)
    }
}
