//! Focus movement, independent of drawing.

use super::Key;

/// Row-major grid of `cols` × `rows` cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
}

impl Grid {
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    pub const fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (row, col) of cell `index`.
    pub const fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Move focus one cell, wrapping within the current row or column.
    pub fn step(&self, index: usize, key: Key) -> usize {
        if self.is_empty() {
            return 0;
        }
        let (r, c) = self.position(index.min(self.len() - 1));
        let (r, c) = match key {
            Key::Left => (r, (c + self.cols - 1) % self.cols),
            Key::Right => (r, (c + 1) % self.cols),
            Key::Up => ((r + self.rows - 1) % self.rows, c),
            Key::Down => ((r + 1) % self.rows, c),
            Key::Enter | Key::Esc => (r, c),
        };
        r * self.cols + c
    }
}

/// Previous page, wrapping to the last.
pub fn page_prev(page: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        (page + count - 1) % count
    }
}

/// Next page, wrapping to the first.
pub fn page_next(page: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        (page + 1) % count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAUNCHER: Grid = Grid::new(3, 2);

    #[test]
    fn horizontal_moves_wrap_within_row() {
        assert_eq!(LAUNCHER.step(0, Key::Left), 2);
        assert_eq!(LAUNCHER.step(2, Key::Right), 0);
        assert_eq!(LAUNCHER.step(4, Key::Right), 5);
        assert_eq!(LAUNCHER.step(3, Key::Left), 5);
    }

    #[test]
    fn vertical_moves_wrap_within_column() {
        assert_eq!(LAUNCHER.step(1, Key::Down), 4);
        assert_eq!(LAUNCHER.step(4, Key::Down), 1);
        assert_eq!(LAUNCHER.step(0, Key::Up), 3);
    }

    #[test]
    fn non_moves_keep_focus() {
        assert_eq!(LAUNCHER.step(4, Key::Enter), 4);
    }

    #[test]
    fn pager_wraps_both_ways() {
        assert_eq!(page_next(3, 4), 0);
        assert_eq!(page_prev(0, 4), 3);
        assert_eq!(page_next(1, 4), 2);
        assert_eq!(page_prev(0, 0), 0);
    }
}
