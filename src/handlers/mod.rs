//! 핸들러 모듈

pub mod canvas;
pub mod connection;
pub mod room;

pub use canvas::*;
pub use connection::*;
pub use room::*;

use crate::error::SessionError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

/// 클라이언트 메시지 분배
///
/// 이벤트 에러는 그 이벤트 안에서 끝난다. 연결은 끊지 않는다.
pub async fn dispatch(state: &Arc<AppState>, peer_id: &str, msg: ClientMessage) {
    let result = match msg {
        ClientMessage::Heartbeat => {
            handle_heartbeat(state, peer_id);
            Ok(())
        }
        ClientMessage::JoinRoom { room_id, username } => {
            handle_join_room(state.clone(), peer_id, &room_id, &username).await
        }
        ClientMessage::PixelUpdate { x, y, color } => {
            handle_pixel_update(state.clone(), peer_id, x, y, &color).await
        }
        ClientMessage::SaveCanvas => handle_save_canvas(state.clone(), peer_id).await,
    };

    if let Err(err) = result {
        report_error(state, peer_id, err);
    }
}

fn report_error(state: &AppState, peer_id: &str, err: SessionError) {
    match err.client_code() {
        Some(code) => {
            tracing::warn!(peer_id = %peer_id, error = %err, "Rejected client event");
            state
                .broadcaster
                .send_to(peer_id, ServerMessage::error(code, err.to_string()));
        }
        None => {
            tracing::debug!(peer_id = %peer_id, error = %err, "Dropped client event");
        }
    }
}
