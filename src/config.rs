//! 환경 변수 기반 설정 관리

use crate::canvas::Color;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GRID_SIZE: usize = 64;
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";
pub const DEFAULT_SAVE_THROTTLE_MS: u64 = 5_000;
pub const DEFAULT_EVICTION_GRACE_MS: u64 = 60_000;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub canvas: CanvasConfig,
    pub storage: StorageConfig,
    pub log_level: String,
}

/// 캔버스 / 방 수명 설정
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    pub default_color: Color,
    pub save_throttle_ms: u64,
    pub eviction_grace_ms: u64,
}

impl CanvasConfig {
    pub fn save_throttle(&self) -> Duration {
        Duration::from_millis(self.save_throttle_ms)
    }

    pub fn eviction_grace(&self) -> Duration {
        Duration::from_millis(self.eviction_grace_ms)
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_SIZE,
            grid_height: DEFAULT_GRID_SIZE,
            default_color: Color::white(),
            save_throttle_ms: DEFAULT_SAVE_THROTTLE_MS,
            eviction_grace_ms: DEFAULT_EVICTION_GRACE_MS,
        }
    }
}

/// 저장소 설정 (디렉터리가 없으면 메모리 저장소)
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub dir: Option<PathBuf>,
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let default_color = env::var("DEFAULT_COLOR")
            .ok()
            .and_then(|raw| Color::parse(raw.trim()).ok())
            .unwrap_or_else(Color::white);

        Self {
            port: parse_var("PORT", 5502),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            canvas: CanvasConfig {
                grid_width: parse_var("GRID_WIDTH", DEFAULT_GRID_SIZE).max(1),
                grid_height: parse_var("GRID_HEIGHT", DEFAULT_GRID_SIZE).max(1),
                default_color,
                save_throttle_ms: parse_var("SAVE_THROTTLE_MS", DEFAULT_SAVE_THROTTLE_MS),
                eviction_grace_ms: parse_var("EVICTION_GRACE_MS", DEFAULT_EVICTION_GRACE_MS),
            },
            storage: StorageConfig {
                dir: env::var("STORAGE_DIR")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
