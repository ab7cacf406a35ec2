//! 연결 핸들러

use crate::protocol::ServerMessage;
use crate::state::{AppState, PeerSession};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// 새 연결 처리
pub async fn handle_connection(
    state: Arc<AppState>,
    sender: UnboundedSender<ServerMessage>,
) -> String {
    let peer_id = Uuid::new_v4().to_string();

    state
        .peers
        .insert(peer_id.clone(), Arc::new(PeerSession::new(peer_id.clone())));
    state.broadcaster.register(&peer_id, sender);
    state.broadcaster.send_to(
        &peer_id,
        ServerMessage::Connected {
            socket_id: peer_id.clone(),
        },
    );

    tracing::info!(peer_id = %peer_id, "New connection established");
    peer_id
}

/// 연결 해제 처리
///
/// 참여 중이던 방에서 빠지고, 방이 비면 즉시 저장 후 퇴거 타이머를 건다.
pub async fn handle_disconnect(state: Arc<AppState>, peer_id: &str) {
    if let Some((_, session)) = state.peers.remove(peer_id) {
        if let Some((room_id, _)) = session.joined().await {
            crate::handlers::room::leave_room_internal(&state, peer_id, &room_id).await;
        }
        tracing::info!(
            peer_id = %session.id,
            connected_ms = session.connected_at.elapsed().as_millis() as u64,
            "Connection closed"
        );
    }
    state.broadcaster.unregister(peer_id);
}

/// Heartbeat 처리
pub fn handle_heartbeat(state: &AppState, peer_id: &str) {
    state.broadcaster.send_to(peer_id, ServerMessage::HeartbeatAck);
}
