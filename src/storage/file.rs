//! JSON 파일 저장소
//!
//! 방마다 `<dir>/<key>.json` 하나, 스냅샷은
//! `<dir>/snapshots/<key>.jsonl`에 한 줄씩 추가된다.
//! `<key>`는 방 키의 16진수 인코딩이고, 파일 이름 한도를 넘는 긴 키는
//! `h-<sha1>`로 줄인다. 실제 방 키는 레코드 안에 남는다.

use crate::canvas::GridRows;
use crate::storage::{now_millis, CanvasRecord, CanvasStore, SnapshotRecord, StorageError};
use async_trait::async_trait;
use sha1::{Digest, Sha1};
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// 저장 디렉터리를 만들고 저장소 열기
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join("snapshots")).await?;
        tracing::info!(dir = %dir.display(), "File storage opened");
        Ok(Self { dir })
    }

    fn canvas_path(&self, room_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(room_id)))
    }

    fn snapshot_path(&self, room_id: &str) -> PathBuf {
        self.dir
            .join("snapshots")
            .join(format!("{}.jsonl", encode_key(room_id)))
    }
}

#[async_trait]
impl CanvasStore for FileStore {
    async fn load(&self, room_id: &str) -> Result<Option<CanvasRecord>, StorageError> {
        let bytes = match fs::read(self.canvas_path(room_id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: CanvasRecord = serde_json::from_slice(&bytes)?;
        if record.room_id != room_id {
            return Err(StorageError::Corrupt {
                room_id: room_id.to_string(),
                reason: format!("file belongs to room {:?}", record.room_id),
            });
        }
        Ok(Some(record))
    }

    async fn upsert(
        &self,
        room_id: &str,
        pixel_data: GridRows,
    ) -> Result<CanvasRecord, StorageError> {
        let now = now_millis();
        let created_at = match self.load(room_id).await {
            Ok(existing) => existing.map_or(now, |record| record.created_at),
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "Existing canvas unreadable, overwriting");
                now
            }
        };

        let record = CanvasRecord {
            room_id: room_id.to_string(),
            pixel_data,
            created_at,
            updated_at: now,
        };

        let path = self.canvas_path(room_id);
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, serde_json::to_vec(&record)?).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(room_id = %room_id, path = %path.display(), "Canvas written");
        Ok(record)
    }

    async fn append_snapshot(
        &self,
        room_id: &str,
        user_id: &str,
        pixel_data: GridRows,
    ) -> Result<(), StorageError> {
        let record = SnapshotRecord {
            room_id: room_id.to_string(),
            user_id: user_id.to_string(),
            pixel_data,
            created_at: now_millis(),
        };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.snapshot_path(room_id))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// 16진수 파일 이름 최대 길이 (확장자와 임시 접미사 여유 포함)
const MAX_HEX_KEY_LEN: usize = 200;

/// 방 키를 파일 이름으로 쓸 수 있게 인코딩
fn encode_key(room_id: &str) -> String {
    let hex = to_hex(room_id.as_bytes());
    if hex.len() <= MAX_HEX_KEY_LEN {
        return hex;
    }
    format!("h-{}", to_hex(&Sha1::digest(room_id.as_bytes())))
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}
