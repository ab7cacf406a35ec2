//! 메모리 저장소 (기본값, 프로세스 종료 시 소멸)

use crate::canvas::GridRows;
use crate::storage::{now_millis, CanvasRecord, CanvasStore, SnapshotRecord, StorageError};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    canvases: DashMap<String, CanvasRecord>,
    snapshots: DashMap<String, Vec<SnapshotRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn snapshots(&self, room_id: &str) -> Vec<SnapshotRecord> {
        self.snapshots
            .get(room_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CanvasStore for MemoryStore {
    async fn load(&self, room_id: &str) -> Result<Option<CanvasRecord>, StorageError> {
        Ok(self.canvases.get(room_id).map(|r| r.clone()))
    }

    async fn upsert(
        &self,
        room_id: &str,
        pixel_data: GridRows,
    ) -> Result<CanvasRecord, StorageError> {
        let now = now_millis();
        let mut entry = self
            .canvases
            .entry(room_id.to_string())
            .or_insert_with(|| CanvasRecord {
                room_id: room_id.to_string(),
                pixel_data: GridRows::new(),
                created_at: now,
                updated_at: now,
            });
        entry.pixel_data = pixel_data;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn append_snapshot(
        &self,
        room_id: &str,
        user_id: &str,
        pixel_data: GridRows,
    ) -> Result<(), StorageError> {
        self.snapshots
            .entry(room_id.to_string())
            .or_default()
            .push(SnapshotRecord {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                pixel_data,
                created_at: now_millis(),
            });
        Ok(())
    }
}
