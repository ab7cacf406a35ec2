//! 방 관리 핸들러

use crate::error::SessionError;
use crate::protocol::{ServerMessage, UserInfo};
use crate::state::{AppState, SessionPhase};
use std::sync::Arc;

/// 방 참여 처리
///
/// 요청자 구독과 캔버스 스냅샷 전송을 방 잠금 안에서 처리하므로, 요청자는
/// 모든 편집을 스냅샷 안에서 보거나 이후 `pixel-changed`로 받는다.
pub async fn handle_join_room(
    state: Arc<AppState>,
    peer_id: &str,
    room_id: &str,
    username: &str,
) -> Result<(), SessionError> {
    let room_id = room_id.trim().to_string();
    if room_id.is_empty() {
        return Err(SessionError::InvalidRoomId);
    }

    let session = state.session(peer_id)?;
    let mut phase = session.phase.write().await;
    if let SessionPhase::Joined { room_id: current, .. } = &*phase {
        return Err(SessionError::AlreadyJoined(current.clone()));
    }

    let member = UserInfo {
        id: peer_id.to_string(),
        username: username.to_string(),
    };
    let (_room, room_state) = state.registry.add_participant(&room_id, member).await?;

    state.broadcaster.subscribe(&room_id, peer_id);
    *phase = SessionPhase::Joined {
        room_id: room_id.clone(),
        username: username.to_string(),
    };

    state.broadcaster.send_to(
        peer_id,
        ServerMessage::CanvasState {
            grid: room_state.snapshot().rows,
        },
    );
    let users = room_state.members().to_vec();
    let user_count = users.len();
    state
        .broadcaster
        .send_to_room(&room_id, ServerMessage::UsersUpdate { users });
    drop(room_state);

    tracing::info!(
        peer_id = %peer_id,
        room_id = %room_id,
        username = %username,
        user_count = user_count,
        "User joined room"
    );
    Ok(())
}

/// 방 나가기 내부 로직
pub async fn leave_room_internal(state: &AppState, peer_id: &str, room_id: &str) {
    state.broadcaster.unsubscribe(room_id, peer_id);

    let Some(departure) = state.registry.remove_participant(room_id, peer_id).await else {
        return;
    };

    if departure.became_empty {
        // 퇴거 타이머는 레지스트리가 이미 걸었다
        let snapshot = departure.state.snapshot();
        state
            .registry
            .persist_in_background(&departure.room, snapshot, "last participant left");
    } else {
        state.broadcaster.send_to_room(
            room_id,
            ServerMessage::UsersUpdate {
                users: departure.state.members().to_vec(),
            },
        );
    }

    tracing::info!(
        peer_id = %peer_id,
        room_id = %room_id,
        remaining = departure.state.members().len(),
        "User left room"
    );
}
