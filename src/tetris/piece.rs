//! Tetrominoes
//!
//! Each family has a fixed table of four orientations. Masks are stored as
//! 4x4 matrices; every family except `I` only uses the top-left 3x3.
//! Rotation is a plain orientation step checked against the board, with no
//! wall kicks.

use glam::Vec2;
use rand::Rng;

use super::board::Board;
use crate::geom::Rect;
use crate::render::{Color, Renderer};

type Mask = [[u8; 4]; 4];

const I_TABLE: [Mask; 4] = [
    [[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 0, 1, 0], [0, 0, 1, 0], [0, 0, 1, 0], [0, 0, 1, 0]],
    [[0, 0, 0, 0], [0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 0, 0], [0, 1, 0, 0], [0, 1, 0, 0]],
];

const J_TABLE: [Mask; 4] = [
    [[1, 0, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 1, 0], [0, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [1, 1, 1, 0], [0, 0, 1, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 0, 0], [1, 1, 0, 0], [0, 0, 0, 0]],
];

const L_TABLE: [Mask; 4] = [
    [[0, 0, 1, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [1, 1, 1, 0], [1, 0, 0, 0], [0, 0, 0, 0]],
    [[1, 1, 0, 0], [0, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
];

const O_MASK: Mask = [[0, 1, 1, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]];
const O_TABLE: [Mask; 4] = [O_MASK; 4];

const S_TABLE: [Mask; 4] = [
    [[0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 1, 0], [0, 0, 1, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0]],
    [[1, 0, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
];

const T_TABLE: [Mask; 4] = [
    [[0, 1, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [0, 1, 1, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [1, 1, 1, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [1, 1, 0, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
];

const Z_TABLE: [Mask; 4] = [
    [[1, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]],
    [[0, 0, 1, 0], [0, 1, 1, 0], [0, 1, 0, 0], [0, 0, 0, 0]],
    [[0, 0, 0, 0], [1, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0]],
    [[0, 1, 0, 0], [1, 1, 0, 0], [1, 0, 0, 0], [0, 0, 0, 0]],
];

/// The seven shape families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl Shape {
    pub const ALL: [Shape; 7] = [
        Shape::I,
        Shape::J,
        Shape::L,
        Shape::O,
        Shape::S,
        Shape::T,
        Shape::Z,
    ];

    /// Uniformly random family
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn color(&self) -> Color {
        match self {
            Shape::I => Color::Cyan,
            Shape::J => Color::Blue,
            Shape::L => Color::Orange,
            Shape::O => Color::Yellow,
            Shape::S => Color::Green,
            Shape::T => Color::Purple,
            Shape::Z => Color::Red,
        }
    }

    /// Side length of the mask actually used
    pub fn size(&self) -> usize {
        match self {
            Shape::I => 4,
            _ => 3,
        }
    }

    fn table(&self) -> &'static [Mask; 4] {
        match self {
            Shape::I => &I_TABLE,
            Shape::J => &J_TABLE,
            Shape::L => &L_TABLE,
            Shape::O => &O_TABLE,
            Shape::S => &S_TABLE,
            Shape::T => &T_TABLE,
            Shape::Z => &Z_TABLE,
        }
    }

    pub fn orientations(&self) -> usize {
        self.table().len()
    }

    /// Occupancy matrix for an orientation, `size() x size()`
    pub fn mask(&self, orientation: usize) -> Vec<Vec<bool>> {
        let mask = &self.table()[orientation % self.orientations()];
        let n = self.size();
        (0..n)
            .map(|r| (0..n).map(|c| mask[r][c] != 0).collect())
            .collect()
    }

    /// Occupied (row, column) offsets within the mask
    fn offsets(&self, orientation: usize) -> impl Iterator<Item = (i32, i32)> + '_ {
        let mask = &self.table()[orientation % self.orientations()];
        let n = self.size();
        (0..n).flat_map(move |r| {
            (0..n).filter_map(move |c| (mask[r][c] != 0).then_some((r as i32, c as i32)))
        })
    }
}

/// Piece origin on the board. Mask cell `(r, c)` sits at board
/// `(row + r - 1, column + c - 1)`; rows may be negative above the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub row: i32,
    pub column: i32,
}

/// Where new pieces enter the board
pub const SPAWN_POSITION: Position = Position { row: 0, column: 4 };

/// Result of a move or rotation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Horizontal move or rotation blocked; nothing changed
    Rejected,
    /// Downward move blocked; the piece is now locked in place
    Locked,
}

/// Result of stamping a locked piece into the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// Cells written to the board
    Stamped,
    /// A cell would land at or above the top row; the game is lost
    Overflow,
    /// The piece was not locked
    NotLocked,
}

/// A falling piece
#[derive(Debug, Clone, PartialEq)]
pub struct Tetromino {
    pub shape: Shape,
    pub orientation: usize,
    pub position: Position,
    pub color: Color,
    pub is_playable: bool,
    pub is_locked: bool,
}

impl Tetromino {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            orientation: 0,
            position: SPAWN_POSITION,
            color: shape.color(),
            is_playable: true,
            is_locked: false,
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::new(Shape::random(rng))
    }

    /// Board cells covered at the given placement
    pub fn cells_at(
        &self,
        position: Position,
        orientation: usize,
    ) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .offsets(orientation)
            .map(move |(r, c)| (position.row + r - 1, position.column + c - 1))
    }

    /// Board cells covered right now
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells_at(self.position, self.orientation)
    }

    /// Whether the placement stays on the board, above the floor and over
    /// empty cells. Cells above the top edge are allowed.
    pub fn fits(&self, board: &Board, position: Position, orientation: usize) -> bool {
        let rows = board.rows() as i32;
        let columns = board.columns() as i32;
        self.cells_at(position, orientation).all(|(r, c)| {
            let on_board = c >= 0 && c < columns;
            let above_floor = r < rows;
            on_board && above_floor && !board.is_occupied(r, c)
        })
    }

    /// Move by `(dx, dy)` into `orientation`.
    ///
    /// A blocked move changes nothing; if it was a downward move the piece
    /// becomes locked.
    pub fn move_to(&mut self, board: &Board, dx: i32, dy: i32, orientation: usize) -> MoveOutcome {
        if !self.is_playable || self.is_locked {
            return MoveOutcome::Rejected;
        }

        let target = Position {
            row: self.position.row + dy,
            column: self.position.column + dx,
        };
        let orientation = orientation % self.shape.orientations();

        if self.fits(board, target, orientation) {
            self.position = target;
            self.orientation = orientation;
            MoveOutcome::Moved
        } else if dy != 0 {
            self.is_locked = true;
            MoveOutcome::Locked
        } else {
            MoveOutcome::Rejected
        }
    }

    /// Move keeping the current orientation
    pub fn move_by(&mut self, board: &Board, dx: i32, dy: i32) -> MoveOutcome {
        self.move_to(board, dx, dy, self.orientation)
    }

    /// Step to the next orientation, wrapping after the last
    pub fn rotate(&mut self, board: &Board) -> MoveOutcome {
        let next = (self.orientation + 1) % self.shape.orientations();
        self.move_to(board, 0, 0, next)
    }

    /// Drop until blocked. Returns the rows travelled.
    pub fn hard_drop(&mut self, board: &Board) -> u32 {
        let mut rows = 0;
        while self.move_by(board, 0, 1) == MoveOutcome::Moved {
            rows += 1;
        }
        rows
    }

    /// Stamp a locked piece into the board.
    ///
    /// Any cell landing on row 0 or above means the stack overflowed; then
    /// nothing is stamped. Either way the piece leaves play.
    pub fn lock(&mut self, board: &mut Board) -> LockOutcome {
        if !self.is_locked {
            return LockOutcome::NotLocked;
        }
        self.is_playable = false;

        if self.cells().any(|(r, _)| r <= 0) {
            return LockOutcome::Overflow;
        }

        let color = self.color;
        let cells: Vec<_> = self.cells().collect();
        for (r, c) in cells {
            board.set(r, c, color);
        }
        LockOutcome::Stamped
    }

    /// Draw the visible cells with the board's top-left at `origin`
    pub fn draw(&self, renderer: &mut dyn Renderer, origin: Vec2, cell_size: f32) {
        for (r, c) in self.cells().filter(|&(r, _)| r >= 0) {
            let rect = Rect::new(
                origin.x + c as f32 * cell_size,
                origin.y + r as f32 * cell_size,
                cell_size,
                cell_size,
            );
            renderer.fill_rect(rect, self.color);
        }
    }

    /// Draw the mask alone, e.g. as a next-piece preview
    pub fn draw_preview(&self, renderer: &mut dyn Renderer, origin: Vec2, cell_size: f32) {
        for (r, c) in self.shape.offsets(0) {
            let rect = Rect::new(
                origin.x + c as f32 * cell_size,
                origin.y + r as f32 * cell_size,
                cell_size,
                cell_size,
            );
            renderer.fill_rect(rect, self.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_every_orientation_has_four_cells() {
        for shape in Shape::ALL {
            for o in 0..shape.orientations() {
                assert_eq!(shape.offsets(o).count(), 4, "{shape:?} orientation {o}");
            }
        }
    }

    #[test]
    fn test_o_rotation_is_identity() {
        let board = Board::new(20, 10);
        let mut piece = Tetromino::new(Shape::O);
        piece.position.row = 5;
        let before: Vec<_> = piece.cells().collect();
        for _ in 0..4 {
            assert_eq!(piece.rotate(&board), MoveOutcome::Moved);
            assert_eq!(piece.cells().collect::<Vec<_>>(), before);
        }
    }

    #[test]
    fn test_rotation_wraps() {
        let board = Board::new(20, 10);
        let mut piece = Tetromino::new(Shape::T);
        piece.position.row = 5;
        for expected in [1, 2, 3, 0] {
            piece.rotate(&board);
            assert_eq!(piece.orientation, expected);
        }
    }

    #[test]
    fn test_wall_blocks_horizontal_without_locking() {
        let board = Board::new(20, 10);
        let mut piece = Tetromino::new(Shape::O);
        piece.position.row = 5;
        while piece.move_by(&board, 1, 0) == MoveOutcome::Moved {}
        assert_eq!(piece.move_by(&board, 1, 0), MoveOutcome::Rejected);
        assert!(!piece.is_locked);
        assert!(piece.cells().all(|(_, c)| c < 10));
    }

    #[test]
    fn test_floor_locks() {
        let board = Board::new(20, 10);
        let mut piece = Tetromino::new(Shape::I);
        let dropped = piece.hard_drop(&board);
        assert!(dropped > 0);
        assert!(piece.is_locked);
        assert!(piece.cells().all(|(r, _)| r == 19));
    }

    #[test]
    fn test_lock_stamps_cells() {
        let mut board = Board::new(20, 10);
        let mut piece = Tetromino::new(Shape::T);
        piece.hard_drop(&board);
        assert_eq!(piece.lock(&mut board), LockOutcome::Stamped);
        assert!(!piece.is_playable);
        for (r, c) in piece.cells() {
            assert_eq!(board.cell(r, c).and_then(|cell| cell.color), Some(Color::Purple));
        }
    }

    #[test]
    fn test_lock_at_top_overflows() {
        let mut board = Board::new(20, 10);
        for r in 1..20 {
            board.set(r, 4, Color::Red);
        }
        let mut piece = Tetromino::new(Shape::T);
        assert_eq!(piece.move_by(&board, 0, 1), MoveOutcome::Locked);
        assert_eq!(piece.lock(&mut board), LockOutcome::Overflow);
        assert!(!board.is_occupied(0, 4));
    }

    #[test]
    fn test_unlocked_piece_does_not_stamp() {
        let mut board = Board::new(20, 10);
        let mut piece = Tetromino::new(Shape::S);
        assert_eq!(piece.lock(&mut board), LockOutcome::NotLocked);
        assert!(piece.is_playable);
    }

    fn shape_strategy() -> impl Strategy<Value = Shape> {
        (0usize..7).prop_map(|i| Shape::ALL[i])
    }

    proptest! {
        #[test]
        fn prop_move_accepted_iff_target_free(
            shape in shape_strategy(),
            row in -2i32..22,
            column in -2i32..12,
            orientation in 0usize..4,
            dx in -1i32..=1,
            dy in 0i32..=1,
            filled in proptest::collection::vec((0i32..20, 0i32..10), 0..40),
        ) {
            let mut board = Board::new(20, 10);
            for (r, c) in &filled {
                board.set(*r, *c, Color::Dim);
            }
            let mut piece = Tetromino::new(shape);
            piece.position = Position { row, column };
            piece.orientation = orientation;

            let target = Position { row: row + dy, column: column + dx };
            let free = piece.cells_at(target, orientation).all(|(r, c)| {
                (0..10).contains(&c) && r < 20 && !board.is_occupied(r, c)
            });

            let outcome = piece.move_by(&board, dx, dy);
            if free {
                prop_assert_eq!(outcome, MoveOutcome::Moved);
                prop_assert_eq!(piece.position, target);
            } else if dy != 0 {
                prop_assert_eq!(outcome, MoveOutcome::Locked);
                prop_assert!(piece.is_locked);
                prop_assert_eq!(piece.position, Position { row, column });
            } else {
                prop_assert_eq!(outcome, MoveOutcome::Rejected);
                prop_assert!(!piece.is_locked);
            }
        }
    }
}
