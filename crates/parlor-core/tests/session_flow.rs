//! End-to-end event sequences through the session core.
//!
//! These tests script the driver's side of the conversation: user intents,
//! transport lifecycle, REST results, and inbound frames, asserting the
//! actions and observable state at each step of the matchmaking journey.

use parlor_core::{
    ConnectionConfig, ConnectionState, MemberId, MessageOrigin, PublishOutcome, QueueState,
    RoomId, Session, SessionAction, SessionEvent, SessionIdentity, SessionNotice, Topic,
    env::SystemEnv,
};
use parlor_proto::{ClientFrame, ServerFrame};
use serde_json::json;

fn session() -> Session<SystemEnv> {
    Session::new(
        SystemEnv,
        SessionIdentity { member_id: MemberId(12), nickname: "ash".into() },
        ConnectionConfig::default(),
    )
}

fn sent_frames(actions: &[SessionAction]) -> Vec<ClientFrame> {
    actions
        .iter()
        .filter_map(|action| match action {
            SessionAction::SendFrame(frame) => Some(frame.clone()),
            _ => None,
        })
        .collect()
}

fn notices(actions: &[SessionAction]) -> Vec<SessionNotice> {
    actions
        .iter()
        .filter_map(|action| match action {
            SessionAction::Notify(notice) => Some(*notice),
            _ => None,
        })
        .collect()
}

fn message_frame(topic: Topic, body: serde_json::Value) -> SessionEvent {
    SessionEvent::FrameReceived(ServerFrame::Message { topic, body })
}

#[test]
fn full_matchmaking_journey() {
    let mut session = session();

    // Connect: one dial, then the service-default queue subscription on open.
    let actions = session.connect();
    assert!(actions.contains(&SessionAction::Dial));
    let actions = session.handle(SessionEvent::TransportOpened);
    assert_eq!(sent_frames(&actions), vec![ClientFrame::Subscribe { topic: Topic::QueueStatus }]);
    assert_eq!(session.connection_state(), ConnectionState::Connected);

    // Join the queue: REST first, state moves on success only.
    let actions = session.join_queue().unwrap();
    assert_eq!(actions, vec![SessionAction::CallJoinQueue]);
    assert_eq!(session.queue_state(), QueueState::Idle);

    let actions = session.handle(SessionEvent::JoinQueueResolved { success: true });
    assert_eq!(session.queue_state(), QueueState::Queued);
    // The queue topic is already subscribed; no duplicate SUBSCRIBE goes out.
    assert!(sent_frames(&actions).is_empty());

    // Queue snapshots replace wholesale while queued.
    let actions = session.handle(message_frame(
        Topic::QueueStatus,
        json!({"type": "QUEUE_STATUS", "participantList": ["ash"], "estimatedWaitSeconds": 40}),
    ));
    assert_eq!(notices(&actions), vec![SessionNotice::QueueStatusUpdated]);

    let _ = session.handle(message_frame(
        Topic::QueueStatus,
        json!({"type": "QUEUE_STATUS", "participantList": ["ash", "birch"], "estimatedWaitSeconds": 10}),
    ));
    assert_eq!(session.queue_status().unwrap().participant_list.len(), 2);

    // Match: unsubscribe the queue topic, notify the presentation layer.
    let actions =
        session.handle(message_frame(Topic::QueueStatus, json!({"type": "MATCHED", "chatRoomId": 7})));
    assert_eq!(sent_frames(&actions), vec![ClientFrame::Unsubscribe { topic: Topic::QueueStatus }]);
    assert!(notices(&actions).contains(&SessionNotice::MatchFound { room_id: RoomId(7) }));
    assert_eq!(session.queue_state(), QueueState::Matched(RoomId(7)));
    assert!(session.queue_status().is_none());

    // The presentation layer enters the room.
    let actions = session.join_room(RoomId(7), 2).unwrap();
    assert_eq!(sent_frames(&actions), vec![ClientFrame::Subscribe { topic: Topic::Room(RoomId(7)) }]);
    assert_eq!(session.queue_state(), QueueState::InRoom(RoomId(7)));
    assert_eq!(session.participant_count(RoomId(7)), Some(2));

    // Inbound chat from the other member.
    let actions = session.handle(message_frame(
        Topic::Room(RoomId(7)),
        json!({"chatId": 1, "message": "hi", "nickName": "birch", "createdAt": 1_000, "chatRoomId": 7}),
    ));
    assert_eq!(notices(&actions), vec![SessionNotice::RoomUpdated { room_id: RoomId(7) }]);
    assert_eq!(session.messages(RoomId(7)).len(), 1);

    // Optimistic send, then the server's echo merges instead of duplicating.
    let (outcome, _) = session.send_chat(RoomId(7), "hello");
    assert_eq!(outcome, PublishOutcome::Sent);
    assert_eq!(session.messages(RoomId(7)).len(), 2);

    let _ = session.handle(message_frame(
        Topic::Room(RoomId(7)),
        json!({"chatId": 2, "message": "hello", "nickName": "ash", "createdAt": 1_001, "chatRoomId": 7}),
    ));
    let messages = session.messages(RoomId(7));
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.origin == MessageOrigin::RemoteConfirmed));

    // Leave: room state and subscription are torn down, queue back to Idle.
    let actions = session.leave_room().unwrap();
    assert_eq!(sent_frames(&actions), vec![ClientFrame::Unsubscribe {
        topic: Topic::Room(RoomId(7))
    }]);
    assert!(notices(&actions).contains(&SessionNotice::RoomClosed { room_id: RoomId(7) }));
    assert_eq!(session.queue_state(), QueueState::Idle);
    assert!(session.messages(RoomId(7)).is_empty());
}

#[test]
fn duplicate_matched_event_transitions_once() {
    let mut session = session();
    let _ = session.connect();
    let _ = session.handle(SessionEvent::TransportOpened);
    let _ = session.join_queue().unwrap();
    let _ = session.handle(SessionEvent::JoinQueueResolved { success: true });

    let matched = json!({"type": "MATCHED", "chatRoomId": 7});
    let first = session.handle(message_frame(Topic::QueueStatus, matched.clone()));
    assert!(notices(&first).contains(&SessionNotice::MatchFound { room_id: RoomId(7) }));

    // Redelivery: the topic is unsubscribed, so the frame is dropped at the
    // registry edge and nothing moves.
    let second = session.handle(message_frame(Topic::QueueStatus, matched));
    assert!(second.is_empty());
    assert_eq!(session.queue_state(), QueueState::Matched(RoomId(7)));
}

#[test]
fn queue_status_after_match_mutates_nothing() {
    let mut session = session();
    let _ = session.connect();
    let _ = session.handle(SessionEvent::TransportOpened);
    let _ = session.join_queue().unwrap();
    let _ = session.handle(SessionEvent::JoinQueueResolved { success: true });
    let _ =
        session.handle(message_frame(Topic::QueueStatus, json!({"type": "MATCHED", "chatRoomId": 7})));

    let actions = session.handle(message_frame(
        Topic::QueueStatus,
        json!({"type": "QUEUE_STATUS", "participantList": ["cedar"], "estimatedWaitSeconds": 5}),
    ));

    assert!(actions.is_empty());
    assert_eq!(session.queue_state(), QueueState::Matched(RoomId(7)));
    assert!(session.queue_status().is_none());
}

#[test]
fn reconnect_replays_subscriptions_and_flushes_deferred_sends() {
    let mut session = session();
    let _ = session.connect();
    let _ = session.handle(SessionEvent::TransportOpened);
    let _ = session.join_queue().unwrap();
    let _ = session.handle(SessionEvent::JoinQueueResolved { success: true });
    let _ =
        session.handle(message_frame(Topic::QueueStatus, json!({"type": "MATCHED", "chatRoomId": 7})));
    let _ = session.join_room(RoomId(7), 2).unwrap();

    // The transport drops out from under us.
    let actions = session.handle(SessionEvent::TransportClosed { reason: "io error".into() });
    assert_eq!(session.connection_state(), ConnectionState::Reconnecting);
    assert!(notices(&actions).contains(&SessionNotice::ConnectionChanged {
        state: ConnectionState::Reconnecting
    }));

    // A send while down is stored optimistically and parked.
    let (outcome, _) = session.send_chat(RoomId(7), "still there?");
    assert_eq!(outcome, PublishOutcome::Deferred);
    assert_eq!(session.messages(RoomId(7)).len(), 1);

    // Redial succeeded: every durable intent is replayed, then the parked
    // publish goes out.
    let actions = session.handle(SessionEvent::TransportOpened);
    let frames = sent_frames(&actions);
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0], ClientFrame::Subscribe { topic: Topic::QueueStatus });
    assert_eq!(frames[1], ClientFrame::Subscribe { topic: Topic::Room(RoomId(7)) });
    match &frames[2] {
        ClientFrame::Send { topic, body } => {
            assert_eq!(*topic, Topic::Room(RoomId(7)));
            assert_eq!(body["message"], "still there?");
        },
        other => panic!("expected flushed SEND frame, got {other:?}"),
    }
}

#[test]
fn leave_queue_unsubscribes_and_returns_to_idle() {
    let mut session = session();
    let _ = session.connect();
    let _ = session.handle(SessionEvent::TransportOpened);
    let _ = session.join_queue().unwrap();
    let _ = session.handle(SessionEvent::JoinQueueResolved { success: true });

    let actions = session.leave_queue().unwrap();
    assert_eq!(actions, vec![SessionAction::CallLeaveQueue]);
    assert_eq!(session.queue_state(), QueueState::Queued);

    let actions = session.handle(SessionEvent::LeaveQueueResolved { success: true });
    assert_eq!(sent_frames(&actions), vec![ClientFrame::Unsubscribe { topic: Topic::QueueStatus }]);
    assert_eq!(session.queue_state(), QueueState::Idle);
}

#[test]
fn rest_failure_surfaces_without_state_change() {
    let mut session = session();
    let _ = session.connect();
    let _ = session.handle(SessionEvent::TransportOpened);
    let _ = session.join_queue().unwrap();

    let actions = session.handle(SessionEvent::JoinQueueResolved { success: false });
    assert!(actions.is_empty());
    assert_eq!(session.queue_state(), QueueState::Idle);

    // The user can try again immediately.
    assert!(session.join_queue().is_ok());
}

#[test]
fn malformed_inbound_payloads_never_crash_dispatch() {
    let mut session = session();
    let _ = session.connect();
    let _ = session.handle(SessionEvent::TransportOpened);
    let _ = session.join_queue().unwrap();
    let _ = session.handle(SessionEvent::JoinQueueResolved { success: true });

    for garbage in [
        json!(null),
        json!(42),
        json!({"type": "UNKNOWN_EVENT"}),
        json!({"type": "MATCHED"}),
        json!({"participantList": "not an array"}),
    ] {
        let actions = session.handle(message_frame(Topic::QueueStatus, garbage));
        assert!(actions.is_empty());
    }

    // The session is still live and consistent afterwards.
    assert_eq!(session.queue_state(), QueueState::Queued);
    let _ =
        session.handle(message_frame(Topic::QueueStatus, json!({"type": "MATCHED", "chatRoomId": 3})));
    assert_eq!(session.queue_state(), QueueState::Matched(RoomId(3)));
}
