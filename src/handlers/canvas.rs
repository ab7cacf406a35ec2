//! 캔버스 편집 / 저장 핸들러

use crate::error::SessionError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

/// 픽셀 편집 처리
///
/// 적용과 전파는 방 잠금 안에서, 저장은 잠금 밖 백그라운드에서 한다.
pub async fn handle_pixel_update(
    state: Arc<AppState>,
    peer_id: &str,
    x: i64,
    y: i64,
    color: &str,
) -> Result<(), SessionError> {
    let (room_id, _) = state
        .session(peer_id)?
        .joined()
        .await
        .ok_or(SessionError::UnknownRoom)?;
    let (room, mut room_state) = state
        .registry
        .lock(&room_id)
        .await
        .ok_or(SessionError::UnknownRoom)?;

    let applied = room_state.apply_edit(x, y, color)?;
    state.broadcaster.send_to_room_except(
        &room_id,
        peer_id,
        ServerMessage::PixelChanged {
            x,
            y,
            color: applied.into_string(),
        },
    );

    let auto_save = room_state.claim_auto_save(state.config.canvas.save_throttle());
    drop(room_state);

    if let Some(snapshot) = auto_save {
        state.registry.persist_in_background(&room, snapshot, "auto-save");
    }
    Ok(())
}

/// 명시적 저장 처리
///
/// 실패해도 연결은 유지되고 요청자에게만 `save-error`가 간다.
pub async fn handle_save_canvas(state: Arc<AppState>, peer_id: &str) -> Result<(), SessionError> {
    let (room_id, username) = state
        .session(peer_id)?
        .joined()
        .await
        .ok_or(SessionError::UnknownRoom)?;
    let (room, room_state) = state
        .registry
        .lock(&room_id)
        .await
        .ok_or(SessionError::UnknownRoom)?;
    let snapshot = room_state.snapshot();
    drop(room_state);

    let store = state.registry.store().clone();
    let history = snapshot.rows.clone();

    match room.persist(store.as_ref(), snapshot).await {
        Ok(written) => {
            state.broadcaster.send_to(
                peer_id,
                ServerMessage::SaveSuccess {
                    message: "Canvas saved successfully!".to_string(),
                },
            );
            tracing::info!(peer_id = %peer_id, room_id = %room_id, username = %username, "Canvas saved");

            // 더 새로운 리비전이 이미 저장됐으면 이 사본은 기록하지 않는다
            if written {
                if let Err(e) = store.append_snapshot(&room_id, peer_id, history).await {
                    tracing::warn!(room_id = %room_id, error = %e, "Snapshot history append failed");
                }
            }
        }
        Err(e) => {
            state.broadcaster.send_to(
                peer_id,
                ServerMessage::SaveError {
                    message: "Failed to save canvas".to_string(),
                },
            );
            tracing::warn!(peer_id = %peer_id, room_id = %room_id, error = %e, "Explicit save failed");
        }
    }
    Ok(())
}
