use rand::seq::SliceRandom;
use rand::Rng;

use crate::piece::{Piece, Value};

/// Board maximum at which refills start alternating in a wild piece.
pub const WILD_THRESHOLD: Value = 48;
const PIECES_PER_VALUE: usize = 4;

/// Shuffled queue of upcoming pieces.
///
/// Draws pop from the back; randomness only happens at refill time.
#[derive(Debug, Clone, Default)]
pub struct PieceStack {
    pieces: Vec<Piece>,
    // None until the board first reaches the wild threshold.
    include_wild: Option<bool>,
}

impl PieceStack {
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn len(&self) -> usize { self.pieces.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.pieces.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Piece> { self.pieces.iter() }

    /// Append four each of 1, 2 and 3 (plus a wild piece on alternating
    /// refills once `max` reaches 48), then shuffle the whole stack.
    pub fn refill<R: Rng + ?Sized>(&mut self, max: Value, rng: &mut R) {
        if max >= WILD_THRESHOLD {
            self.include_wild = Some(matches!(self.include_wild, Some(false)));
        }
        if self.include_wild == Some(true) {
            if let Some(&value) = wild_values(max).choose(rng) {
                let mut wild = Piece::new(value);
                wild.make_wild();
                self.pieces.push(wild);
            }
        }
        for value in 1..=3 {
            self.pieces.extend(std::iter::repeat(Piece::new(value)).take(PIECES_PER_VALUE));
        }
        self.pieces.shuffle(rng);
    }

    /// Remove and return the next piece, refilling first when one or
    /// fewer remain.
    pub fn draw_next<R: Rng + ?Sized>(&mut self, max: Value, rng: &mut R) -> Piece {
        self.ensure_stocked(max, rng);
        // ensure_stocked always leaves at least 12 pieces behind
        self.pieces.pop().unwrap_or_default()
    }

    /// The piece `draw_next` would return, under the same refill rule.
    pub fn peek<R: Rng + ?Sized>(&mut self, max: Value, rng: &mut R) -> Piece {
        self.ensure_stocked(max, rng);
        self.pieces.last().copied().unwrap_or_default()
    }

    fn ensure_stocked<R: Rng + ?Sized>(&mut self, max: Value, rng: &mut R) {
        if self.pieces.len() <= 1 {
            self.refill(max, rng);
        }
    }
}

/// Candidate wild values: `max/8` halved repeatedly while above 3.
fn wild_values(max: Value) -> Vec<Value> {
    let mut values = Vec::new();
    let mut value = max / 8;
    while value > 3 {
        values.push(value);
        value /= 2;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn count(stack: &PieceStack, value: Value) -> usize {
        stack.iter().filter(|p| **p == value).count()
    }

    fn drain(stack: &mut PieceStack) {
        stack.pieces.clear();
    }

    #[test]
    fn starts_empty() {
        assert!(PieceStack::new().is_empty());
    }

    #[test]
    fn refill_is_equal_parts() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut stack = PieceStack::new();
        stack.refill(6, &mut rng);
        assert_eq!(stack.len(), 12);
        assert_eq!(count(&stack, 1), 4);
        assert_eq!(count(&stack, 2), 4);
        assert_eq!(count(&stack, 3), 4);
        assert!(!stack.iter().any(Piece::is_wild));
    }

    #[test]
    fn never_wild_below_threshold() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut stack = PieceStack::new();
        for _ in 0..10 {
            stack.refill(24, &mut rng);
            assert_eq!(stack.len(), 12);
            assert!(!stack.iter().any(Piece::is_wild));
            drain(&mut stack);
        }
    }

    #[test]
    fn wild_alternates_from_the_second_refill() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut stack = PieceStack::new();

        stack.refill(48, &mut rng);
        assert_eq!(stack.len(), 12);
        assert!(!stack.iter().any(Piece::is_wild));
        drain(&mut stack);

        stack.refill(48, &mut rng);
        assert_eq!(stack.len(), 13);
        assert_eq!(stack.iter().filter(|p| p.is_wild()).count(), 1);
        // 48 / 8 = 6 is the only candidate
        assert_eq!(count(&stack, 6), 1);
        drain(&mut stack);

        stack.refill(48, &mut rng);
        assert_eq!(stack.len(), 12);
        assert!(!stack.iter().any(Piece::is_wild));
    }

    #[test]
    fn wild_values_halve_down_to_above_three() {
        assert_eq!(wild_values(48), vec![6]);
        assert_eq!(wild_values(384), vec![48, 24, 12, 6]);
        assert!(wild_values(24).is_empty());
    }

    #[test]
    fn draw_refills_when_low() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut stack = PieceStack::new();
        let first = stack.draw_next(3, &mut rng);
        assert!((1..=3).contains(&first.value()));
        assert_eq!(stack.len(), 11);
        for _ in 0..10 {
            stack.draw_next(3, &mut rng);
        }
        assert_eq!(stack.len(), 1);
        // one left: the next draw tops up before popping
        stack.draw_next(3, &mut rng);
        assert_eq!(stack.len(), 12);
    }

    #[test]
    fn peek_matches_next_draw() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut stack = PieceStack::new();
        for _ in 0..30 {
            let peeked = stack.peek(12, &mut rng);
            let drawn = stack.draw_next(12, &mut rng);
            assert_eq!(peeked, drawn);
        }
    }
}
