//! 방 레지스트리
//!
//! 방 생성·조회·퇴거의 유일한 주체. 방 키마다 `OnceCell`을 두어
//! 같은 키에 대한 동시 최초 참여가 한 번의 로드만 수행하게 한다.
//! 기다림은 그 키에만 걸리고 다른 방 트래픽은 막지 않는다.

use crate::canvas::CanvasGrid;
use crate::config::CanvasConfig;
use crate::protocol::UserInfo;
use crate::rooms::{CanvasSnapshot, Room, RoomState};
use crate::storage::{CanvasStore, StorageError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, OwnedMutexGuard};

type RoomSlot = Arc<OnceCell<Arc<Room>>>;

/// 방 이탈 결과
pub struct Departure {
    pub room: Arc<Room>,
    pub state: OwnedMutexGuard<RoomState>,
    /// 이번 이탈로 방이 비었는지
    pub became_empty: bool,
}

#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    rooms: DashMap<String, RoomSlot>,
    store: Arc<dyn CanvasStore>,
    canvas: CanvasConfig,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn CanvasStore>, canvas: CanvasConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: DashMap::new(),
                store,
                canvas,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn CanvasStore> {
        &self.inner.store
    }

    /// 메모리에 올라와 있는 방 수
    pub fn room_count(&self) -> usize {
        self.inner
            .rooms
            .iter()
            .filter(|slot| slot.value().initialized())
            .count()
    }

    /// 방 조회 (없으면 `None`)
    pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.inner.rooms.get(room_id)?.value().get().cloned()
    }

    /// 방 가져오기 또는 생성
    ///
    /// 저장소에 기록이 있으면 복원하고, 없으면 새 그리드를 만들어 즉시
    /// 백그라운드 저장을 건다. 로드 실패 시 슬롯을 치우고, 다음 참여가
    /// 다시 시도한다.
    pub async fn get_or_create(&self, room_id: &str) -> Result<Arc<Room>, StorageError> {
        let slot = self
            .inner
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .value()
            .clone();
        let created = slot
            .get_or_try_init(|| self.create_room(room_id))
            .await
            .cloned();
        match created {
            Ok(room) => Ok(room),
            Err(e) => {
                // 같은 슬롯을 기다리는 참여가 없을 때만 빈 슬롯을 치운다
                let failed = Arc::as_ptr(&slot);
                drop(slot);
                self.inner.rooms.remove_if(room_id, |_, current| {
                    Arc::as_ptr(current) == failed
                        && !current.initialized()
                        && Arc::strong_count(current) == 1
                });
                Err(e)
            }
        }
    }

    /// 잠긴 방 상태 가져오기. 퇴거된 방은 `None`
    pub async fn lock(&self, room_id: &str) -> Option<(Arc<Room>, OwnedMutexGuard<RoomState>)> {
        let room = self.get(room_id)?;
        let state = room.lock().await;
        if state.is_evicted() {
            return None;
        }
        Some((room, state))
    }

    /// 참여자 추가 후 잠긴 상태를 돌려준다
    ///
    /// 잠금을 기다리는 사이 방이 퇴거됐으면 새로 만들어 다시 시도한다.
    pub async fn add_participant(
        &self,
        room_id: &str,
        member: UserInfo,
    ) -> Result<(Arc<Room>, OwnedMutexGuard<RoomState>), StorageError> {
        loop {
            let room = self.get_or_create(room_id).await?;
            let mut state = room.lock().await;
            if state.is_evicted() {
                tracing::debug!(room_id = %room_id, "Room evicted while joining, retrying");
                continue;
            }
            state.add_participant(member);
            return Ok((room, state));
        }
    }

    /// 참여자 제거. 마지막 참여자였으면 퇴거 타이머를 건다
    pub async fn remove_participant(&self, room_id: &str, peer_id: &str) -> Option<Departure> {
        let (room, mut state) = self.lock(room_id).await?;
        if !state.remove_participant(peer_id) {
            return None;
        }
        let became_empty = state.is_empty();
        if became_empty {
            self.schedule_eviction(&room, &mut state, self.inner.canvas.eviction_grace());
        }
        Some(Departure {
            room,
            state,
            became_empty,
        })
    }

    /// 유예 기간 뒤 방이 여전히 비어 있으면 퇴거
    pub fn schedule_eviction(&self, room: &Arc<Room>, state: &mut RoomState, grace: Duration) {
        let registry = self.clone();
        let room = room.clone();
        let room_id = room.id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            registry.evict_if_empty(&room).await;
        });
        state.arm_eviction(handle);
        tracing::debug!(room_id = %room_id, grace_ms = grace.as_millis() as u64, "Eviction scheduled");
    }

    /// 백그라운드 저장. 실패는 로그만 남긴다
    pub fn persist_in_background(&self, room: &Arc<Room>, snapshot: CanvasSnapshot, reason: &'static str) {
        let store = self.inner.store.clone();
        let room = room.clone();
        tokio::spawn(async move {
            let revision = snapshot.revision;
            match room.persist(store.as_ref(), snapshot).await {
                Ok(true) => {
                    tracing::debug!(room_id = %room.id, revision, reason, "Canvas saved");
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(room_id = %room.id, revision, reason, error = %e, "Background save failed");
                }
            }
        });
    }

    async fn create_room(&self, room_id: &str) -> Result<Arc<Room>, StorageError> {
        let canvas = &self.inner.canvas;

        if let Some(record) = self.inner.store.load(room_id).await? {
            let grid = CanvasGrid::from_rows(&record.pixel_data, canvas.grid_width, canvas.grid_height)
                .map_err(|e| StorageError::Corrupt {
                    room_id: room_id.to_string(),
                    reason: e.to_string(),
                })?;
            tracing::info!(room_id = %room_id, "Room restored from storage");
            return Ok(Arc::new(Room::new(room_id.to_string(), grid, Some(0))));
        }

        let grid = CanvasGrid::new(canvas.grid_width, canvas.grid_height, &canvas.default_color);
        let snapshot = CanvasSnapshot {
            revision: 0,
            rows: grid.snapshot(),
        };
        let room = Arc::new(Room::new(room_id.to_string(), grid, None));
        self.persist_in_background(&room, snapshot, "room created");
        tracing::info!(room_id = %room_id, "Room created");
        Ok(room)
    }

    async fn evict_if_empty(&self, room: &Arc<Room>) {
        let snapshot = {
            let mut state = room.lock().await;
            if !state.is_empty() || state.is_evicted() {
                return;
            }
            state.detach_eviction();
            state.snapshot()
        };
        let revision = snapshot.revision;

        // 마지막 변경 저장은 잠금 밖에서. 그동안의 참여는 기다리지 않는다
        let flushed = room.flush(self.inner.store.as_ref(), snapshot).await;

        let mut state = room.lock().await;
        if !state.is_empty() || state.is_evicted() || state.has_pending_eviction() {
            return;
        }
        if let Err(e) = flushed {
            tracing::warn!(room_id = %room.id, error = %e, "Final save failed, keeping room in memory");
            self.schedule_eviction(room, &mut state, self.inner.canvas.eviction_grace());
            return;
        }
        if state.revision() != revision {
            self.schedule_eviction(room, &mut state, self.inner.canvas.eviction_grace());
            return;
        }

        state.mark_evicted();
        self.inner.rooms.remove_if(&room.id, |_, slot| {
            slot.get().is_some_and(|current| Arc::ptr_eq(current, room))
        });
        tracing::info!(
            room_id = %room.id,
            revision,
            age_ms = room.created_at.elapsed().as_millis() as u64,
            "Room evicted"
        );
    }
}
