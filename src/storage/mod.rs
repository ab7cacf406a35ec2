//! 캔버스 영속화 게이트웨이
//!
//! 코어는 `load` / `upsert` 두 연산에만 의존한다. 히스토리용
//! `append_snapshot`은 명시적 저장 시에만 쓰인다.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::canvas::GridRows;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// 저장된 캔버스 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasRecord {
    pub room_id: String,
    pub pixel_data: GridRows,
    pub created_at: u64,
    pub updated_at: u64,
}

/// 추가 전용 스냅샷 레코드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub room_id: String,
    pub user_id: String,
    pub pixel_data: GridRows,
    pub created_at: u64,
}

/// 저장소 에러
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored record is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("stored canvas for room {room_id:?} is unusable: {reason}")]
    Corrupt { room_id: String, reason: String },
}

#[async_trait]
pub trait CanvasStore: Send + Sync {
    /// 방 캔버스 조회 (없으면 `None`)
    async fn load(&self, room_id: &str) -> Result<Option<CanvasRecord>, StorageError>;

    /// 방 캔버스 생성 또는 갱신. `created_at`은 최초 값을 유지
    async fn upsert(&self, room_id: &str, pixel_data: GridRows)
        -> Result<CanvasRecord, StorageError>;

    /// 히스토리 스냅샷 추가
    async fn append_snapshot(
        &self,
        room_id: &str,
        user_id: &str,
        pixel_data: GridRows,
    ) -> Result<(), StorageError>;
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
