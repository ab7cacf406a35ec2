//! 방 상태

use crate::canvas::{CanvasError, CanvasGrid, Color, GridRows};
use crate::protocol::UserInfo;
use crate::storage::{CanvasStore, StorageError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// 편집 리비전이 붙은 그리드 사본
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasSnapshot {
    pub revision: u64,
    pub rows: GridRows,
}

/// 방 정보
pub struct Room {
    pub id: String,
    state: Arc<Mutex<RoomState>>,
    /// 마지막으로 저장된 리비전. 방 단위 쓰기를 직렬화한다.
    saved_revision: Mutex<Option<u64>>,
    pub created_at: Instant,
}

impl Room {
    pub fn new(id: String, canvas: CanvasGrid, saved_revision: Option<u64>) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(RoomState::new(canvas))),
            saved_revision: Mutex::new(saved_revision),
            created_at: Instant::now(),
        }
    }

    /// 방의 단일 쓰기 경로. 가드를 쥐고 있는 동안 다른 이벤트는 대기한다.
    pub async fn lock(&self) -> OwnedMutexGuard<RoomState> {
        self.state.clone().lock_owned().await
    }

    /// 스냅샷 저장. 이미 더 새로운 리비전이 저장돼 있으면 건너뛴다.
    ///
    /// 같은 리비전은 다시 쓴다 (명시적 저장은 멱등 upsert).
    pub async fn persist(
        &self,
        store: &dyn CanvasStore,
        snapshot: CanvasSnapshot,
    ) -> Result<bool, StorageError> {
        let mut saved = self.saved_revision.lock().await;
        if saved.is_some_and(|rev| snapshot.revision < rev) {
            tracing::debug!(
                room_id = %self.id,
                revision = snapshot.revision,
                "Skipped stale canvas write"
            );
            return Ok(false);
        }
        store.upsert(&self.id, snapshot.rows).await?;
        *saved = Some(snapshot.revision);
        Ok(true)
    }

    /// 저장되지 않은 변경이 있을 때만 저장
    pub async fn flush(
        &self,
        store: &dyn CanvasStore,
        snapshot: CanvasSnapshot,
    ) -> Result<bool, StorageError> {
        {
            let saved = self.saved_revision.lock().await;
            if saved.is_some_and(|rev| snapshot.revision <= rev) {
                return Ok(false);
            }
        }
        self.persist(store, snapshot).await
    }

    #[cfg(test)]
    pub(crate) async fn mark_saved(&self, revision: u64) {
        *self.saved_revision.lock().await = Some(revision);
    }
}

/// 방의 가변 상태 (캔버스, 참여자, 저장 시각, 퇴거 타이머)
pub struct RoomState {
    canvas: CanvasGrid,
    members: Vec<UserInfo>,
    revision: u64,
    last_persisted_at: Instant,
    eviction: Option<JoinHandle<()>>,
    evicted: bool,
}

impl RoomState {
    fn new(canvas: CanvasGrid) -> Self {
        Self {
            canvas,
            members: Vec::new(),
            revision: 0,
            last_persisted_at: Instant::now(),
            eviction: None,
            evicted: false,
        }
    }

    pub fn members(&self) -> &[UserInfo] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 참여자 추가. 대기 중인 퇴거 타이머는 취소한다.
    pub fn add_participant(&mut self, member: UserInfo) {
        self.cancel_eviction();
        if !self.members.iter().any(|m| m.id == member.id) {
            self.members.push(member);
        }
    }

    /// 참여자 제거. 실제로 있었으면 `true`
    pub fn remove_participant(&mut self, peer_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.id != peer_id);
        self.members.len() != before
    }

    /// 한 칸 편집 적용 (도착 순서대로 마지막 쓰기 우선)
    pub fn apply_edit(&mut self, x: i64, y: i64, color: &str) -> Result<Color, CanvasError> {
        let applied = self.canvas.set(x, y, color)?;
        self.revision += 1;
        Ok(applied)
    }

    pub fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            revision: self.revision,
            rows: self.canvas.snapshot(),
        }
    }

    /// 스로틀 창이 지났으면 자동 저장 슬롯을 차지하고 스냅샷을 돌려준다.
    ///
    /// 저장이 끝나기 전에 시각을 갱신해서 연속 편집이 저장을 쌓지 않게 한다.
    pub fn claim_auto_save(&mut self, throttle: Duration) -> Option<CanvasSnapshot> {
        let now = Instant::now();
        if now.duration_since(self.last_persisted_at) <= throttle {
            return None;
        }
        self.last_persisted_at = now;
        Some(self.snapshot())
    }

    pub(crate) fn arm_eviction(&mut self, handle: JoinHandle<()>) {
        self.cancel_eviction();
        self.eviction = Some(handle);
    }

    pub(crate) fn has_pending_eviction(&self) -> bool {
        self.eviction.is_some()
    }

    /// 타이머 태스크 자신이 호출하므로 abort 하지 않고 분리만 한다
    pub(crate) fn detach_eviction(&mut self) {
        self.eviction = None;
    }

    pub(crate) fn mark_evicted(&mut self) {
        self.evicted = true;
        self.detach_eviction();
    }

    fn cancel_eviction(&mut self) {
        if let Some(handle) = self.eviction.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn room() -> Room {
        Room::new("r1".into(), CanvasGrid::new(8, 8, &Color::white()), None)
    }

    fn member(id: &str) -> UserInfo {
        UserInfo {
            id: id.into(),
            username: format!("user-{id}"),
        }
    }

    #[tokio::test]
    async fn membership_is_a_set_in_join_order() {
        let room = room();
        let mut state = room.lock().await;
        state.add_participant(member("a"));
        state.add_participant(member("b"));
        state.add_participant(member("a"));
        let ids: Vec<_> = state.members().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        assert!(state.remove_participant("a"));
        assert!(!state.remove_participant("a"));
        assert!(state.remove_participant("b"));
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn rejected_edit_does_not_bump_revision() {
        let room = room();
        let mut state = room.lock().await;
        state.apply_edit(1, 1, "#000").unwrap();
        assert!(state.apply_edit(8, 1, "#000").is_err());
        assert!(state.apply_edit(1, 1, "black").is_err());
        assert_eq!(state.revision(), 1);
        assert_eq!(state.snapshot().rows[1][1], "#000");
    }

    #[tokio::test(start_paused = true)]
    async fn auto_save_slot_opens_once_per_window() {
        let room = room();
        let mut state = room.lock().await;
        let throttle = Duration::from_secs(5);

        assert!(state.claim_auto_save(throttle).is_none());
        tokio::time::advance(Duration::from_millis(5_001)).await;
        assert!(state.claim_auto_save(throttle).is_some());
        assert!(state.claim_auto_save(throttle).is_none());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(state.claim_auto_save(throttle).is_none());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(state.claim_auto_save(throttle).is_some());
    }

    #[tokio::test]
    async fn stale_snapshot_never_overwrites_newer_write() {
        let room = room();
        let store = MemoryStore::new();

        let (old, new) = {
            let mut state = room.lock().await;
            let old = state.snapshot();
            state.apply_edit(0, 0, "#FF0000").unwrap();
            (old, state.snapshot())
        };

        assert!(room.persist(&store, new.clone()).await.unwrap());
        assert!(!room.persist(&store, old).await.unwrap());
        let stored = store.load("r1").await.unwrap().unwrap();
        assert_eq!(stored.pixel_data, new.rows);

        // 같은 리비전은 다시 쓰지만 flush는 건너뛴다
        assert!(room.persist(&store, new.clone()).await.unwrap());
        assert!(!room.flush(&store, new).await.unwrap());
    }
}
