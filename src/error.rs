//! 이벤트 처리 에러

use crate::canvas::CanvasError;
use crate::storage::StorageError;
use thiserror::Error;

/// 단일 이벤트 처리 중 발생한 에러. 연결을 끊지 않는다.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection {0} is not registered")]
    UnknownConnection(String),
    #[error("connection has not joined a room")]
    UnknownRoom,
    #[error("connection already joined room {0:?}")]
    AlreadyJoined(String),
    #[error("room id must not be empty")]
    InvalidRoomId,
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("persistence failure: {0}")]
    Persistence(#[from] StorageError),
}

impl SessionError {
    /// 요청자에게 돌려줄 에러 코드 (없으면 조용히 무시)
    pub fn client_code(&self) -> Option<&'static str> {
        match self {
            Self::AlreadyJoined(_) => Some("ALREADY_JOINED"),
            Self::InvalidRoomId => Some("INVALID_ROOM_ID"),
            Self::Persistence(_) => Some("LOAD_FAILED"),
            Self::UnknownConnection(_) | Self::UnknownRoom | Self::Canvas(_) => None,
        }
    }
}
