//! 애플리케이션 상태 관리

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::error::SessionError;
use crate::rooms::RoomRegistry;
use crate::storage::CanvasStore;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// 전역 애플리케이션 상태
pub struct AppState {
    /// 방 레지스트리 (room_id -> Room)
    pub registry: RoomRegistry,
    /// 피어 세션 (peer_id -> PeerSession)
    pub peers: DashMap<String, Arc<PeerSession>>,
    /// 연결 송신 큐와 방 구독
    pub broadcaster: Broadcaster,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn CanvasStore>) -> Self {
        Self {
            registry: RoomRegistry::new(store, config.canvas.clone()),
            peers: DashMap::new(),
            broadcaster: Broadcaster::new(),
            config: Arc::new(config),
        }
    }

    pub fn session(&self, peer_id: &str) -> Result<Arc<PeerSession>, SessionError> {
        self.peers
            .get(peer_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| SessionError::UnknownConnection(peer_id.to_string()))
    }
}

/// 연결 상태. 세션 맵에서 빠지면 연결 종료로 본다
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Unjoined,
    Joined { room_id: String, username: String },
}

/// 피어 세션 정보
pub struct PeerSession {
    pub id: String,
    pub phase: RwLock<SessionPhase>,
    pub connected_at: Instant,
}

impl PeerSession {
    pub fn new(id: String) -> Self {
        Self {
            id,
            phase: RwLock::new(SessionPhase::Unjoined),
            connected_at: Instant::now(),
        }
    }

    /// 참여 중인 방 (room_id, username)
    pub async fn joined(&self) -> Option<(String, String)> {
        match &*self.phase.read().await {
            SessionPhase::Joined { room_id, username } => Some((room_id.clone(), username.clone())),
            SessionPhase::Unjoined => None,
        }
    }
}
