//! Queue up, wait for a match, say hello.
//!
//! Endpoints and identity come from the environment:
//!
//! ```sh
//! PARLOR_WS=ws://localhost:8080/ws \
//! PARLOR_REST=http://localhost:8080 \
//! PARLOR_TOKEN=dev-token PARLOR_NICK=ash PARLOR_MEMBER=12 \
//! cargo run -p parlor-client --example matchmake
//! ```

use parlor_client::{
    ChatSession, ChatSessionConfig, MemberId, SessionIdentity, SessionNotice, StaticCredentials,
};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let identity = SessionIdentity {
        member_id: MemberId(env_or("PARLOR_MEMBER", "1").parse()?),
        nickname: env_or("PARLOR_NICK", "anon"),
    };
    let provider = StaticCredentials::new(env_or("PARLOR_TOKEN", "dev-token"), identity);
    let config = ChatSessionConfig::new(
        env_or("PARLOR_WS", "ws://localhost:8080/ws"),
        env_or("PARLOR_REST", "http://localhost:8080"),
    );

    let session = ChatSession::spawn(config, provider);
    let mut notices = session.notices();

    session.connect().await?;
    session.join_queue().await?;
    println!("queued, waiting for a match...");

    while let Ok(notice) = notices.recv().await {
        match notice {
            SessionNotice::QueueStatusUpdated => {
                if let Some(status) = session.state().await?.queue_status {
                    println!(
                        "{} waiting, ~{}s",
                        status.participant_list.len(),
                        status.estimated_wait_seconds
                    );
                }
            },
            SessionNotice::MatchFound { room_id } => {
                println!("matched into {room_id}");
                session.join_room(room_id, 2).await?;
                session.send_chat(room_id, "hello!").await?;
            },
            SessionNotice::RoomUpdated { room_id } => {
                let messages = session.messages(room_id).await?;
                if let Some(last) = messages.last() {
                    println!("[{}] {}", last.sender, last.body);
                }
            },
            SessionNotice::RoomClosed { room_id } => {
                println!("room {room_id} ended");
                break;
            },
            other => tracing::debug!(?other, "notice"),
        }
    }

    session.disconnect().await?;
    Ok(())
}
