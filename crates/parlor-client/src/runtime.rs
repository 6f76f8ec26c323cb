//! The session actor loop.
//!
//! One task owns the [`Session`] and everything it needs: the live
//! transport (if any), the matchmaking API, and the credential provider.
//! The loop multiplexes handle commands, inbound transport events, and a
//! periodic tick, executing the actions each step returns before taking the
//! next one. Because all mutation happens here, the core needs no locks.

use std::collections::VecDeque;

use parlor_core::{
    Message, PublishOutcome, Session, SessionAction, SessionEvent, SessionNotice, env::SystemEnv,
};
use parlor_proto::RoomId;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    client::StateSnapshot,
    credentials::CredentialProvider,
    error::{ClientError, RestError},
    rest::MatchmakingApi,
    transport::{self, TransportEvent, TransportHandle},
};

/// Commands from [`crate::ChatSession`] handles.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    SendChat {
        room_id: RoomId,
        body: String,
        reply: oneshot::Sender<PublishOutcome>,
    },
    JoinQueue {
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    LeaveQueue {
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    JoinRoom {
        room_id: RoomId,
        participant_count: u32,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    LeaveRoom {
        reply: oneshot::Sender<Result<(), ClientError>>,
    },
    Reset,
    Messages {
        room_id: RoomId,
        reply: oneshot::Sender<Vec<Message>>,
    },
    Inspect {
        reply: oneshot::Sender<StateSnapshot>,
    },
}

/// The actor owning the session core.
pub(crate) struct Runtime<P: CredentialProvider> {
    session: Session<SystemEnv>,
    provider: P,
    api: MatchmakingApi,
    ws_url: String,
    commands: mpsc::Receiver<Command>,
    notices: broadcast::Sender<SessionNotice>,
    transport: Option<TransportHandle>,
    tick_interval: std::time::Duration,
}

impl<P: CredentialProvider> Runtime<P> {
    pub(crate) fn new(
        session: Session<SystemEnv>,
        provider: P,
        api: MatchmakingApi,
        ws_url: String,
        commands: mpsc::Receiver<Command>,
        notices: broadcast::Sender<SessionNotice>,
        tick_interval: std::time::Duration,
    ) -> Self {
        Self {
            session,
            provider,
            api,
            ws_url,
            commands,
            notices,
            transport: None,
            tick_interval,
        }
    }

    /// Run until every handle is dropped.
    pub(crate) async fn run(mut self) {
        let mut tick = tokio::time::interval(self.tick_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("all session handles dropped, stopping");
                        break;
                    };
                    self.on_command(command).await;
                },
                event = Self::next_transport_event(&mut self.transport) => {
                    self.on_transport_event(event).await;
                },
                _ = tick.tick() => {
                    let actions = self.session.handle(SessionEvent::Tick);
                    self.execute(actions).await;
                },
            }
        }

        if let Some(handle) = self.transport.take() {
            handle.stop();
        }
    }

    /// Next inbound transport event; pends forever while disconnected so
    /// the select arm stays quiet.
    async fn next_transport_event(
        transport: &mut Option<TransportHandle>,
    ) -> Option<TransportEvent> {
        match transport {
            Some(handle) => handle.from_server.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                let actions = self.session.connect();
                self.execute(actions).await;
            },
            Command::Disconnect => {
                let actions = self.session.disconnect();
                self.execute(actions).await;
            },
            Command::SendChat { room_id, body, reply } => {
                let (outcome, actions) = self.session.send_chat(room_id, &body);
                self.execute(actions).await;
                let _ = reply.send(outcome);
            },
            Command::JoinQueue { reply } => {
                let result = self.join_queue().await;
                let _ = reply.send(result);
            },
            Command::LeaveQueue { reply } => {
                let result = self.leave_queue().await;
                let _ = reply.send(result);
            },
            Command::JoinRoom { room_id, participant_count, reply } => {
                let result = match self.session.join_room(room_id, participant_count) {
                    Ok(actions) => {
                        self.execute(actions).await;
                        Ok(())
                    },
                    Err(error) => Err(ClientError::Queue(error)),
                };
                let _ = reply.send(result);
            },
            Command::LeaveRoom { reply } => {
                let result = match self.session.leave_room() {
                    Ok(actions) => {
                        self.execute(actions).await;
                        Ok(())
                    },
                    Err(error) => Err(ClientError::Queue(error)),
                };
                let _ = reply.send(result);
            },
            Command::Reset => {
                let actions = self.session.reset();
                self.execute(actions).await;
            },
            Command::Messages { room_id, reply } => {
                let _ = reply.send(self.session.messages(room_id).to_vec());
            },
            Command::Inspect { reply } => {
                let _ = reply.send(self.snapshot());
            },
        }
    }

    /// Join the queue: validate, call the service, feed the result back.
    ///
    /// Queue state moves only on a successful response; the error (if any)
    /// goes straight back to the caller.
    async fn join_queue(&mut self) -> Result<(), ClientError> {
        let _ = self.session.join_queue().map_err(ClientError::Queue)?;

        let rest_result = self.call_matchmaking(true).await;
        let actions = self
            .session
            .handle(SessionEvent::JoinQueueResolved { success: rest_result.is_ok() });
        self.execute(actions).await;
        rest_result.map_err(ClientError::Rest)
    }

    async fn leave_queue(&mut self) -> Result<(), ClientError> {
        let _ = self.session.leave_queue().map_err(ClientError::Queue)?;

        let rest_result = self.call_matchmaking(false).await;
        let actions = self
            .session
            .handle(SessionEvent::LeaveQueueResolved { success: rest_result.is_ok() });
        self.execute(actions).await;
        rest_result.map_err(ClientError::Rest)
    }

    async fn call_matchmaking(&self, join: bool) -> Result<(), RestError> {
        let Some(token) = self.provider.bearer_token() else {
            return Err(RestError::MissingToken);
        };
        if join { self.api.join_queue(&token).await } else { self.api.leave_queue(&token).await }
    }

    async fn on_transport_event(&mut self, event: Option<TransportEvent>) {
        let actions = match event {
            Some(TransportEvent::Frame(frame)) => {
                self.session.handle(SessionEvent::FrameReceived(frame))
            },
            Some(TransportEvent::Closed { reason }) => {
                self.transport = None;
                self.session.handle(SessionEvent::TransportClosed { reason })
            },
            None => {
                self.transport = None;
                self.session.handle(SessionEvent::TransportClosed {
                    reason: "transport channel closed".to_string(),
                })
            },
        };
        self.execute(actions).await;
    }

    /// Execute actions, including any produced while executing (a dial that
    /// completes produces the opened/closed event inline).
    async fn execute(&mut self, actions: Vec<SessionAction>) {
        let mut pending: VecDeque<SessionAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                SessionAction::Dial => match transport::dial(&self.ws_url).await {
                    Ok(handle) => {
                        self.transport = Some(handle);
                        pending.extend(self.session.handle(SessionEvent::TransportOpened));
                    },
                    Err(error) => {
                        tracing::warn!(%error, url = %self.ws_url, "dial failed");
                        pending.extend(self.session.handle(SessionEvent::TransportClosed {
                            reason: error.to_string(),
                        }));
                    },
                },
                SessionAction::CloseTransport => {
                    if let Some(handle) = self.transport.take() {
                        handle.stop();
                    }
                },
                SessionAction::SendFrame(frame) => {
                    let Some(handle) = &self.transport else {
                        tracing::debug!("no transport, outbound frame dropped");
                        continue;
                    };
                    if handle.to_server.send(frame).await.is_err() {
                        tracing::warn!("transport writer gone, treating as closed");
                        self.transport = None;
                        pending.extend(self.session.handle(SessionEvent::TransportClosed {
                            reason: "writer channel closed".to_string(),
                        }));
                    }
                },
                // REST calls are driven at the command site so their result
                // can be returned to the caller.
                SessionAction::CallJoinQueue | SessionAction::CallLeaveQueue => {},
                SessionAction::Notify(notice) => {
                    // A send error only means nobody is listening right now.
                    let _ = self.notices.send(notice);
                },
            }
        }
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            connection: self.session.connection_state(),
            queue: self.session.queue_state(),
            queue_status: self.session.queue_status().cloned(),
        }
    }
}
