use std::fmt;

/// Numeric strength of a piece: 1, 2, or 3·2^k.
pub type Value = u32;
pub type Points = u64;

/// A single tile on the board.
///
/// Equality only looks at `value`; the wild flag is presentation detail
/// for pieces injected by the stack late in the game.
#[derive(Debug, Clone, Copy, Default)]
pub struct Piece {
    value: Value,
    wild: bool,
}

impl Piece {
    #[inline]
    pub const fn new(value: Value) -> Self { Piece { value, wild: false } }

    #[inline]
    pub fn value(&self) -> Value { self.value }

    #[inline]
    pub fn is_wild(&self) -> bool { self.wild }

    /// Mark this piece as wild. One-way and idempotent.
    #[inline]
    pub fn make_wild(&mut self) { self.wild = true; }

    /// 1 and 2 only merge with each other; everything from 3 up merges
    /// with an equal value.
    ///
    /// ```
    /// use trois::piece::Piece;
    /// assert!(Piece::new(1).can_merge(&Piece::new(2)));
    /// assert!(!Piece::new(2).can_merge(&Piece::new(2)));
    /// assert!(Piece::new(12).can_merge(&Piece::new(12)));
    /// ```
    #[inline]
    pub fn can_merge(&self, other: &Piece) -> bool {
        match self.value {
            1 => other.value == 2,
            2 => other.value == 1,
            v => other.value == v,
        }
    }

    /// Absorb `other` into this piece. Returns false and leaves `self`
    /// untouched when the values are not mergeable.
    pub fn merge_with(&mut self, other: &Piece) -> bool {
        if !self.can_merge(other) {
            return false;
        }
        self.value += other.value;
        true
    }

    #[inline]
    pub fn rank(&self) -> u32 { rank_of(self.value) }

    /// 0 below 3, otherwise `3^rank`.
    #[inline]
    pub fn points(&self) -> Points {
        if self.value < 3 { 0 } else { 3_u64.pow(self.rank()) }
    }
}

/// Number of halvings from `value` down to 3, counting 3 itself as rank 1.
///
/// Values below 3 have no rank and map to 0.
pub fn rank_of(value: Value) -> u32 {
    if value < 3 {
        return 0;
    }
    let mut rank = 1;
    let mut v = value;
    while v > 3 {
        v /= 2;
        rank += 1;
    }
    rank
}

impl PartialEq for Piece {
    fn eq(&self, other: &Self) -> bool { self.value == other.value }
}

impl Eq for Piece {}

impl PartialEq<Value> for Piece {
    fn eq(&self, other: &Value) -> bool { self.value == *other }
}

impl From<Value> for Piece {
    fn from(value: Value) -> Self { Piece::new(value) }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wild { write!(f, "{}*", self.value) } else { write!(f, "{}", self.value) }
    }
}
