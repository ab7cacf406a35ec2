//! 테스트 공용 도우미

use crate::canvas::GridRows;
use crate::config::{CanvasConfig, Config, StorageConfig};
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::storage::{CanvasRecord, CanvasStore, MemoryStore, StorageError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// 호출 횟수를 세고 실패를 흉내 낼 수 있는 메모리 저장소
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    loads: AtomicUsize,
    upserts: AtomicUsize,
    fail_loads: AtomicBool,
    fail_upserts: AtomicBool,
    load_delay_ms: AtomicU64,
    upsert_delay_ms: AtomicU64,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load_delay(delay: Duration) -> Self {
        let store = Self::new();
        store.set_load_delay(delay);
        store
    }

    pub fn set_load_delay(&self, delay: Duration) {
        self.load_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// 쓰기가 시작된 뒤 이만큼 멈춘다 (호출 횟수는 먼저 센다)
    pub fn set_upsert_delay(&self, delay: Duration) {
        self.upsert_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CanvasStore for RecordingStore {
    async fn load(&self, room_id: &str) -> Result<Option<CanvasRecord>, StorageError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(unavailable("load disabled"));
        }
        self.inner.load(room_id).await
    }

    async fn upsert(
        &self,
        room_id: &str,
        pixel_data: GridRows,
    ) -> Result<CanvasRecord, StorageError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(unavailable("upsert disabled"));
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let delay = self.upsert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.upsert(room_id, pixel_data).await
    }

    async fn append_snapshot(
        &self,
        room_id: &str,
        user_id: &str,
        pixel_data: GridRows,
    ) -> Result<(), StorageError> {
        self.inner.append_snapshot(room_id, user_id, pixel_data).await
    }
}

fn unavailable(what: &str) -> StorageError {
    StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, what.to_string()))
}

/// 백그라운드 태스크가 진행되도록 양보
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn test_state(store: Arc<RecordingStore>) -> Arc<AppState> {
    let config = Config {
        port: 0,
        host: "127.0.0.1".into(),
        cors_origins: vec!["*".into()],
        canvas: CanvasConfig::default(),
        storage: StorageConfig::default(),
        log_level: "debug".into(),
    };
    Arc::new(AppState::new(config, store))
}

/// 가짜 연결. 등록된 peer_id와 수신 큐를 돌려준다
pub async fn connect(state: &Arc<AppState>) -> (String, UnboundedReceiver<ServerMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let peer_id = crate::handlers::handle_connection(state.clone(), tx).await;
    (peer_id, rx)
}

pub fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
