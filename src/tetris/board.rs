//! Tetris play field
//!
//! A fixed `rows x columns` grid. Only cell contents change at runtime: rows
//! removed by a line clear are replaced by empty rows at the top.

use glam::Vec2;

use crate::geom::Rect;
use crate::render::{Color, Renderer};

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub occupied: bool,
    pub color: Option<Color>,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        occupied: false,
        color: None,
    };

    pub fn filled(color: Color) -> Self {
        Self {
            occupied: true,
            color: Some(color),
        }
    }
}

/// The grid, row 0 at the top
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    rows: usize,
    columns: usize,
    grid: Vec<Vec<Cell>>,
}

impl Board {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            grid: vec![vec![Cell::EMPTY; columns]; rows],
        }
    }

    /// Empty every cell
    pub fn reset(&mut self) {
        self.grid = vec![vec![Cell::EMPTY; self.columns]; self.rows];
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Rows currently held; equals `rows()` outside a line clear
    pub fn row_count(&self) -> usize {
        self.grid.len()
    }

    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.grid.get(row).map(|r| r.as_slice())
    }

    /// Cell at signed coordinates, None when off the grid
    pub fn cell(&self, row: i32, column: i32) -> Option<Cell> {
        if row < 0 || column < 0 {
            return None;
        }
        self.grid
            .get(row as usize)
            .and_then(|r| r.get(column as usize))
            .copied()
    }

    pub fn is_occupied(&self, row: i32, column: i32) -> bool {
        self.cell(row, column).is_some_and(|c| c.occupied)
    }

    /// Fill a cell; out-of-grid writes are ignored and return false
    pub fn set(&mut self, row: i32, column: i32, color: Color) -> bool {
        if row < 0 || column < 0 {
            return false;
        }
        match self
            .grid
            .get_mut(row as usize)
            .and_then(|r| r.get_mut(column as usize))
        {
            Some(cell) => {
                *cell = Cell::filled(color);
                true
            }
            None => false,
        }
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.grid
            .get(row)
            .is_some_and(|r| r.iter().all(|c| c.occupied))
    }

    /// Indices of full rows, top to bottom
    pub fn find_full_rows(&self) -> Vec<usize> {
        (0..self.grid.len())
            .filter(|&r| self.is_row_full(r))
            .collect()
    }

    /// Drop the given rows in one pass.
    ///
    /// The grid is rebuilt from a snapshot, so earlier removals never shift
    /// the indices of later ones. Unknown indices are ignored.
    pub fn remove_full_rows(&mut self, rows: &[usize]) {
        let snapshot = std::mem::take(&mut self.grid);
        self.grid = snapshot
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !rows.contains(i))
            .map(|(_, row)| row)
            .collect();
    }

    /// Prepend up to `count` empty rows, never growing past `rows()`.
    /// Returns how many were inserted.
    pub fn insert_empty_rows(&mut self, count: usize) -> usize {
        let missing = self.rows.saturating_sub(self.grid.len());
        let n = count.min(missing);
        if n > 0 {
            let mut fresh = vec![vec![Cell::EMPTY; self.columns]; n];
            fresh.append(&mut self.grid);
            self.grid = fresh;
        }
        n
    }

    /// Find, remove and replenish full rows. Returns the number cleared.
    pub fn clear_full_rows(&mut self) -> usize {
        let full = self.find_full_rows();
        if full.is_empty() {
            return 0;
        }
        self.remove_full_rows(&full);
        self.insert_empty_rows(full.len());
        full.len()
    }

    /// Draw the grid with its top-left corner at `origin`
    pub fn draw(&self, renderer: &mut dyn Renderer, origin: Vec2, cell_size: f32) {
        for (r, row) in self.grid.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let rect = Rect::new(
                    origin.x + c as f32 * cell_size,
                    origin.y + r as f32 * cell_size,
                    cell_size,
                    cell_size,
                );
                match cell.color {
                    Some(color) if cell.occupied => renderer.fill_rect(rect, color),
                    _ => renderer.stroke_rect(rect, Color::Grid),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fill_row(board: &mut Board, row: i32) {
        for c in 0..board.columns() as i32 {
            board.set(row, c, Color::Red);
        }
    }

    #[test]
    fn test_find_full_rows_ascending() {
        let mut board = Board::new(20, 10);
        fill_row(&mut board, 17);
        fill_row(&mut board, 5);
        board.set(10, 0, Color::Blue);
        assert_eq!(board.find_full_rows(), vec![5, 17]);
    }

    #[test]
    fn test_clear_keeps_row_count_and_order() {
        let mut board = Board::new(20, 10);
        board.set(18, 3, Color::Blue);
        fill_row(&mut board, 19);
        board.set(4, 0, Color::Green);

        assert_eq!(board.clear_full_rows(), 1);
        assert_eq!(board.row_count(), 20);
        // Everything above the cleared row moved down by one
        assert!(board.is_occupied(19, 3));
        assert!(board.is_occupied(5, 0));
        assert!(!board.is_occupied(0, 0));
    }

    #[test]
    fn test_insert_never_grows_past_rows() {
        let mut board = Board::new(20, 10);
        assert_eq!(board.insert_empty_rows(3), 0);
        board.remove_full_rows(&[0, 1]);
        assert_eq!(board.insert_empty_rows(5), 2);
        assert_eq!(board.row_count(), 20);
    }

    #[test]
    fn test_out_of_grid_access() {
        let mut board = Board::new(20, 10);
        assert!(!board.set(-1, 0, Color::Red));
        assert!(!board.set(0, 10, Color::Red));
        assert_eq!(board.cell(20, 0), None);
        assert!(!board.is_occupied(-3, 4));
    }

    proptest! {
        #[test]
        fn prop_line_clear_preserves_survivors(
            cells in proptest::collection::vec(proptest::collection::vec(any::<bool>(), 10), 20),
            full in proptest::collection::vec(any::<bool>(), 20),
        ) {
            let mut board = Board::new(20, 10);
            for (r, row) in cells.iter().enumerate() {
                for (c, &on) in row.iter().enumerate() {
                    if on || full[r] {
                        board.set(r as i32, c as i32, Color::Cyan);
                    }
                }
            }

            let survivors: Vec<Vec<Cell>> = (0..20)
                .filter(|&r| !board.is_row_full(r))
                .filter_map(|r| board.row(r).map(|s| s.to_vec()))
                .collect();

            let cleared = board.clear_full_rows();
            prop_assert_eq!(board.row_count(), 20);
            prop_assert_eq!(cleared, 20 - survivors.len());

            for r in 0..cleared {
                prop_assert!(board.row(r).is_some_and(|row| row.iter().all(|c| !c.occupied)));
            }
            for (i, expected) in survivors.iter().enumerate() {
                prop_assert_eq!(board.row(cleared + i).map(|s| s.to_vec()), Some(expected.clone()));
            }
        }
    }
}
