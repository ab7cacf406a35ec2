//! 색상 값 검증

use crate::canvas::CanvasError;
use std::fmt;

/// 검증된 색상 문자열 (`#RGB` 또는 `#RRGGBB`)
///
/// 받은 문자열을 그대로 보관하고 그대로 다시 내보낸다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Color(String);

impl Color {
    pub fn parse(raw: &str) -> Result<Self, CanvasError> {
        let digits = raw
            .strip_prefix('#')
            .ok_or_else(|| CanvasError::InvalidColor(raw.to_string()))?;

        let well_formed =
            matches!(digits.len(), 3 | 6) && digits.bytes().all(|b| b.is_ascii_hexdigit());
        if !well_formed {
            return Err(CanvasError::InvalidColor(raw.to_string()));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn white() -> Self {
        Self(crate::config::DEFAULT_BACKGROUND.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
