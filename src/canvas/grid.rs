//! 고정 크기 2차원 색상 그리드

use crate::canvas::Color;
use thiserror::Error;

/// 행 우선(`grid[y][x]`) 색상 배열. 초기 동기화와 저장에 쓰이는 사본 형태.
pub type GridRows = Vec<Vec<String>>;

/// 캔버스 에러
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasError {
    #[error("pixel ({x}, {y}) is outside the {width}x{height} canvas")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },
    #[error("invalid color value: {0:?}")]
    InvalidColor(String),
    #[error("stored grid is {found_width}x{found_height}, expected {width}x{height}")]
    ShapeMismatch {
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },
}

/// 캔버스 그리드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasGrid {
    width: usize,
    height: usize,
    cells: Vec<Color>,
}

impl CanvasGrid {
    /// 모든 칸을 배경색으로 채운 그리드 생성
    pub fn new(width: usize, height: usize, background: &Color) -> Self {
        Self {
            width,
            height,
            cells: vec![background.clone(); width * height],
        }
    }

    /// 저장된 행 데이터로 그리드 복원
    pub fn from_rows(rows: &GridRows, width: usize, height: usize) -> Result<Self, CanvasError> {
        let found_width = rows.first().map_or(0, Vec::len);
        if rows.len() != height || rows.iter().any(|row| row.len() != width) {
            return Err(CanvasError::ShapeMismatch {
                width,
                height,
                found_width,
                found_height: rows.len(),
            });
        }

        let cells = rows
            .iter()
            .flatten()
            .map(|raw| Color::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    #[cfg(test)]
    pub fn get(&self, x: i64, y: i64) -> Result<&Color, CanvasError> {
        let index = self.index(x, y)?;
        Ok(&self.cells[index])
    }

    /// 한 칸 교체 (마지막 쓰기 우선). 적용된 색상을 반환
    pub fn set(&mut self, x: i64, y: i64, color: &str) -> Result<Color, CanvasError> {
        let index = self.index(x, y)?;
        let color = Color::parse(color)?;
        self.cells[index] = color.clone();
        Ok(color)
    }

    /// 전체 상태의 깊은 사본
    pub fn snapshot(&self) -> GridRows {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|c| c.as_str().to_string()).collect())
            .collect()
    }

    fn index(&self, x: i64, y: i64) -> Result<usize, CanvasError> {
        let out_of_bounds = || CanvasError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        };
        let col = usize::try_from(x).map_err(|_| out_of_bounds())?;
        let row = usize::try_from(y).map_err(|_| out_of_bounds())?;
        if col >= self.width || row >= self.height {
            return Err(out_of_bounds());
        }
        Ok(row * self.width + col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> CanvasGrid {
        CanvasGrid::new(64, 64, &Color::white())
    }

    #[test]
    fn new_grid_is_filled_with_background() {
        let grid = blank();
        let rows = grid.snapshot();
        assert_eq!(rows.len(), 64);
        assert!(rows.iter().all(|row| row.len() == 64));
        assert!(rows.iter().flatten().all(|c| c == "#FFFFFF"));
    }

    #[test]
    fn set_then_get_returns_written_color() {
        let mut grid = blank();
        for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63), (3, 4)] {
            let applied = grid.set(x, y, "#FF0000").unwrap();
            assert_eq!(applied.as_str(), "#FF0000");
            assert_eq!(grid.get(x, y).unwrap().as_str(), "#FF0000");
        }
    }

    #[test]
    fn snapshot_is_row_major() {
        let mut grid = blank();
        grid.set(3, 4, "#00ff00").unwrap();
        let rows = grid.snapshot();
        assert_eq!(rows[4][3], "#00ff00");
        assert_eq!(rows[3][4], "#FFFFFF");
    }

    #[test]
    fn out_of_bounds_leaves_grid_unchanged() {
        let mut grid = blank();
        let before = grid.clone();
        for (x, y) in [(-1, 0), (0, -1), (64, 0), (0, 64), (i64::MAX, i64::MIN)] {
            assert!(matches!(grid.get(x, y), Err(CanvasError::OutOfBounds { .. })));
            assert!(matches!(
                grid.set(x, y, "#000000"),
                Err(CanvasError::OutOfBounds { .. })
            ));
        }
        assert_eq!(grid, before);
    }

    #[test]
    fn invalid_color_leaves_cell_unchanged() {
        let mut grid = blank();
        assert_eq!(
            grid.set(1, 1, "blue"),
            Err(CanvasError::InvalidColor("blue".to_string()))
        );
        assert_eq!(grid.get(1, 1).unwrap().as_str(), "#FFFFFF");
    }

    #[test]
    fn snapshot_is_detached_from_live_grid() {
        let mut grid = blank();
        let snapshot = grid.snapshot();
        grid.set(0, 0, "#123456").unwrap();
        assert_eq!(snapshot[0][0], "#FFFFFF");
    }

    #[test]
    fn from_rows_round_trips_and_checks_shape() {
        let mut grid = CanvasGrid::new(4, 2, &Color::white());
        grid.set(2, 1, "#abc").unwrap();
        let restored = CanvasGrid::from_rows(&grid.snapshot(), 4, 2).unwrap();
        assert_eq!(restored, grid);

        assert!(matches!(
            CanvasGrid::from_rows(&grid.snapshot(), 64, 64),
            Err(CanvasError::ShapeMismatch { .. })
        ));

        let mut corrupt = grid.snapshot();
        corrupt[0][0] = "nope".to_string();
        assert!(matches!(
            CanvasGrid::from_rows(&corrupt, 4, 2),
            Err(CanvasError::InvalidColor(_))
        ));
    }
}
