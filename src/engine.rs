use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fmt;

use crate::piece::{Piece, Points, Value};
use crate::stack::PieceStack;

pub const DEFAULT_COLS: usize = 4;
pub const DEFAULT_ROWS: usize = 4;
const SETUP_PIECES: usize = 6;

/// A direction to slide pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Order used when listing available moves.
    pub const ALL: [Move; 4] = [Move::Left, Move::Right, Move::Up, Move::Down];

    /// Unit step `(dx, dy)` for this direction; y grows downwards.
    #[inline]
    pub fn offset(self) -> (i32, i32) {
        match self {
            Move::Up => (0, -1),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
            Move::Right => (1, 0),
        }
    }

    #[inline]
    pub fn is_vertical(self) -> bool { matches!(self, Move::Up | Move::Down) }

    pub fn name(self) -> &'static str {
        match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Cell coordinate. Signed so callers can probe off-board neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self { Pos { x, y } }

    #[inline]
    pub fn step(self, dir: Move) -> Pos {
        let (dx, dy) = dir.offset();
        Pos::new(self.x + dx, self.y + dy)
    }

    /// The four grid neighbors, including off-board ones.
    pub fn neighbors(self) -> [Pos; 4] {
        [Move::Left, Move::Right, Move::Up, Move::Down].map(|dir| self.step(dir))
    }
}

/// Canonical row-major value grid (0 = empty). Used as the score cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    cols: u16,
    values: Box<[Value]>,
}

/// Rectangular grid of optional pieces.
///
/// Every slide returns a fresh `Board`; only `add_piece`, `clear` and
/// the commit path mutate in place.
#[derive(Clone)]
pub struct Board {
    cols: usize,
    rows: usize,
    cells: Vec<Option<Piece>>,
}

impl Default for Board {
    fn default() -> Self { Board::new(DEFAULT_COLS, DEFAULT_ROWS) }
}

impl Board {
    /// An empty `cols × rows` board.
    pub fn new(cols: usize, rows: usize) -> Self {
        Board { cols, rows, cells: vec![None; cols * rows] }
    }

    #[inline]
    pub fn cols(&self) -> usize { self.cols }

    #[inline]
    pub fn rows(&self) -> usize { self.rows }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }

    /// Clear the board, then draw six pieces and scatter them.
    pub fn setup<R: Rng + ?Sized>(&mut self, stack: &mut PieceStack, rng: &mut R) {
        self.clear();
        let pieces: Vec<Piece> = (0..SETUP_PIECES.min(self.cells.len()))
            .map(|_| stack.draw_next(self.max_piece_value(), rng))
            .collect();
        self.randomly_add_pieces(pieces, rng);
    }

    /// Place each piece on a random empty cell. Stops early once the board is full.
    pub fn randomly_add_pieces<R, I>(&mut self, pieces: I, rng: &mut R)
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = Piece>,
    {
        for piece in pieces {
            match self.find_empty_spot(rng) {
                Some(pos) => {
                    self.add_piece(piece, pos);
                }
                None => break,
            }
        }
    }

    #[inline]
    pub fn in_bounds(&self, pos: Pos) -> bool {
        0 <= pos.x && (pos.x as usize) < self.cols && 0 <= pos.y && (pos.y as usize) < self.rows
    }

    #[inline]
    fn index(&self, pos: Pos) -> Option<usize> {
        if self.in_bounds(pos) { Some(pos.y as usize * self.cols + pos.x as usize) } else { None }
    }

    /// The piece at `pos`; off-board positions are simply empty.
    #[inline]
    pub fn piece_at(&self, pos: Pos) -> Option<&Piece> {
        self.index(pos).and_then(|idx| self.cells[idx].as_ref())
    }

    #[inline]
    pub fn value_at(&self, pos: Pos) -> Option<Value> { self.piece_at(pos).map(Piece::value) }

    #[inline]
    pub fn position_taken(&self, pos: Pos) -> bool { self.piece_at(pos).is_some() }

    /// Drop `piece` at `pos`, merging into an occupant when possible.
    ///
    /// Returns false when `pos` is off-board or the occupant refuses the merge.
    pub fn add_piece(&mut self, piece: Piece, pos: Pos) -> bool {
        let Some(idx) = self.index(pos) else { return false };
        let cell = &mut self.cells[idx];
        match cell {
            Some(placed) => placed.merge_with(&piece),
            None => {
                *cell = Some(piece);
                true
            }
        }
    }

    /// True when `piece` could land on `pos`: on-board and empty or mergeable.
    pub fn can_move_to(&self, piece: &Piece, pos: Pos) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        match self.piece_at(pos) {
            Some(placed) => placed.can_merge(piece),
            None => true,
        }
    }

    /// Rejection-sample an empty cell. None only when the board is full.
    pub fn find_empty_spot<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Pos> {
        if self.size() == self.cells.len() {
            return None;
        }
        loop {
            let pos = Pos::new(rng.gen_range(0..self.cols) as i32, rng.gen_range(0..self.rows) as i32);
            if !self.position_taken(pos) {
                return Some(pos);
            }
        }
    }

    /// Slide every piece one cell in `dir`, merging where allowed.
    ///
    /// Cells nearest the destination edge go first, so a piece that has
    /// already moved or merged is never hit a second time in the same slide.
    ///
    /// ```
    /// use trois::engine::{Board, Move, Pos};
    /// use trois::piece::Piece;
    /// let mut b = Board::default();
    /// b.add_piece(Piece::new(3), Pos::new(0, 1));
    /// b.add_piece(Piece::new(3), Pos::new(0, 0));
    /// let up = b.slide(Move::Up);
    /// assert_eq!(up.value_at(Pos::new(0, 0)), Some(6));
    /// assert_eq!(b.value_at(Pos::new(0, 1)), Some(3));
    /// ```
    pub fn slide(&self, dir: Move) -> Board {
        let (dx, dy) = dir.offset();
        let mut next = Board::new(self.cols, self.rows);
        let xs = ordered(self.cols, dx > 0);
        let ys = ordered(self.rows, dy > 0);
        for &x in &xs {
            for &y in &ys {
                let from = Pos::new(x, y);
                if let Some(&piece) = self.piece_at(from) {
                    let to = from.step(dir);
                    let dest = if next.can_move_to(&piece, to) { to } else { from };
                    next.add_piece(piece, dest);
                }
            }
        }
        next
    }

    /// True when sliding in `dir` changes at least one cell's value.
    #[inline]
    pub fn can_move(&self, dir: Move) -> bool { self.slide(dir) != *self }

    pub fn available_moves(&self) -> Vec<Move> {
        Move::ALL.into_iter().filter(|&dir| self.can_move(dir)).collect()
    }

    #[inline]
    pub fn playing(&self) -> bool { Move::ALL.into_iter().any(|dir| self.can_move(dir)) }

    pub fn points(&self) -> Points { self.pieces().map(Piece::points).sum() }

    /// Highest value on the board, 0 when empty.
    pub fn max_piece_value(&self) -> Value { self.pieces().map(Piece::value).max().unwrap_or(0) }

    /// Positions holding `value`, column-major.
    pub fn positions_of(&self, value: Value) -> Vec<Pos> {
        let mut out = Vec::new();
        for x in 0..self.cols as i32 {
            for y in 0..self.rows as i32 {
                let pos = Pos::new(x, y);
                if self.value_at(pos) == Some(value) {
                    out.push(pos);
                }
            }
        }
        out
    }

    /// True if some piece of `a` sits next to a piece of `b`.
    pub fn pieces_adjacent(&self, a: Value, b: Value) -> bool {
        self.positions_of(a)
            .into_iter()
            .any(|pos| pos.neighbors().iter().any(|&n| self.value_at(n) == Some(b)))
    }

    pub fn column(&self, x: usize) -> Vec<Option<Value>> {
        (0..self.rows).map(|y| self.value_at(Pos::new(x as i32, y as i32))).collect()
    }

    pub fn row(&self, y: usize) -> Vec<Option<Value>> {
        (0..self.cols).map(|x| self.value_at(Pos::new(x as i32, y as i32))).collect()
    }

    /// Occupied cell count.
    pub fn size(&self) -> usize { self.cells.iter().filter(|c| c.is_some()).count() }

    #[inline]
    pub fn open_cells(&self) -> usize { self.cells.len() - self.size() }

    /// Columns whose value sequence differs between `self` and `after`.
    pub fn moved_columns(&self, after: &Board) -> Vec<usize> {
        (0..self.cols).filter(|&x| self.column(x) != after.column(x)).collect()
    }

    /// Rows whose value sequence differs between `self` and `after`.
    pub fn moved_rows(&self, after: &Board) -> Vec<usize> {
        (0..self.rows).filter(|&y| self.row(y) != after.row(y)).collect()
    }

    /// Lines (columns for vertical moves, rows otherwise) changed by `dir`.
    pub fn moved_lines(&self, after: &Board, dir: Move) -> Vec<usize> {
        if dir.is_vertical() { self.moved_columns(after) } else { self.moved_rows(after) }
    }

    /// Where a new piece enters line `line` after sliding in `dir`: the
    /// edge the pieces moved away from.
    pub fn spawn_pos(&self, dir: Move, line: usize) -> Pos {
        let line = line as i32;
        match dir {
            Move::Up => Pos::new(line, self.rows as i32 - 1),
            Move::Down => Pos::new(line, 0),
            Move::Left => Pos::new(self.cols as i32 - 1, line),
            Move::Right => Pos::new(0, line),
        }
    }

    /// Commit a slide: no-op (false) when `dir` changes nothing, otherwise
    /// replace the contents with the slid board plus a piece drawn from
    /// `stack` at a random changed line.
    pub fn commit_slide<R: Rng + ?Sized>(&mut self, dir: Move, stack: &mut PieceStack, rng: &mut R) -> bool {
        let mut next = self.slide(dir);
        let lines = self.moved_lines(&next, dir);
        let Some(&line) = lines.choose(rng) else { return false };
        let piece = stack.draw_next(self.max_piece_value(), rng);
        next.add_piece(piece, next.spawn_pos(dir, line));
        *self = next;
        true
    }

    pub fn signature(&self) -> Signature {
        Signature {
            cols: self.cols as u16,
            values: self.cells.iter().map(|c| c.map_or(0, |p| p.value())).collect(),
        }
    }

    fn pieces(&self) -> impl Iterator<Item = &Piece> { self.cells.iter().flatten() }
}

fn ordered(len: usize, reverse: bool) -> Vec<i32> {
    let mut v: Vec<i32> = (0..len as i32).collect();
    if reverse {
        v.reverse();
    }
    v
}

impl PartialEq for Board {
    /// Value-wise comparison; wild flags are ignored.
    fn eq(&self, other: &Self) -> bool {
        self.cols == other.cols && self.rows == other.rows && self.cells == other.cells
    }
}

impl Eq for Board {}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("cols", &self.cols)
            .field("rows", &self.rows)
            .field("values", &self.signature().values)
            .finish()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = format!("+{}\n", "-----+".repeat(self.cols));
        f.write_str(&sep)?;
        for y in 0..self.rows as i32 {
            f.write_str("|")?;
            for x in 0..self.cols as i32 {
                match self.piece_at(Pos::new(x, y)) {
                    Some(piece) => write!(f, "{:^5}|", piece.to_string())?,
                    None => f.write_str("     |")?,
                }
            }
            f.write_str("\n")?;
            f.write_str(&sep)?;
        }
        Ok(())
    }
}

/// The live game: board, draw stack and the random source feeding both.
///
/// This is the surface a front end drives.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    stack: PieceStack,
    rng: StdRng,
}

impl Game {
    /// A freshly set-up `cols × rows` game.
    pub fn new(cols: usize, rows: usize, seed: Option<u64>) -> Self {
        let mut game = Game::from_board(Board::new(cols, rows), seed);
        game.board.setup(&mut game.stack, &mut game.rng);
        game
    }

    /// Wrap an existing board (no setup).
    pub fn from_board(board: Board, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Game { board, stack: PieceStack::new(), rng }
    }

    #[inline]
    pub fn board(&self) -> &Board { &self.board }

    pub fn piece_at(&self, x: i32, y: i32) -> Option<Value> { self.board.value_at(Pos::new(x, y)) }

    /// The piece the next commit will spawn. May refill the stack.
    pub fn next_piece_preview(&mut self) -> Piece {
        let max = self.board.max_piece_value();
        self.stack.peek(max, &mut self.rng)
    }

    pub fn available_moves(&self) -> Vec<Move> { self.board.available_moves() }

    pub fn points(&self) -> Points { self.board.points() }

    pub fn playing(&self) -> bool { self.board.playing() }

    pub fn commit_slide(&mut self, dir: Move) -> bool {
        self.board.commit_slide(dir, &mut self.stack, &mut self.rng)
    }
}
