//! trois: a Threes-style sliding tile engine + lookahead search player
//!
//! This crate provides:
//! - `Piece` merge/rank/points rules (`piece` module)
//! - A shuffled draw stack with alternating wild pieces (`stack` module)
//! - A `Board` with pure one-step slides and a live `Game` that commits
//!   them and spawns pieces (`engine` module)
//! - A search player with a cached multiplicative heuristic, sequential
//!   and rayon-parallel variants (`player` module)
//! - Optional score-breakdown sinks for offline analysis (`diagnostics` module)
//!
//! Quick start:
//! ```
//! use trois::engine::{Board, Game, Move, Pos};
//! use trois::piece::Piece;
//!
//! // Slides never touch the source board
//! let mut b = Board::default();
//! b.add_piece(Piece::new(1), Pos::new(0, 1));
//! b.add_piece(Piece::new(2), Pos::new(0, 0));
//! let up = b.slide(Move::Up);
//! assert_eq!(up.value_at(Pos::new(0, 0)), Some(3));
//! assert_eq!(b.size(), 2);
//!
//! // A live, seeded game
//! let mut game = Game::new(4, 4, Some(42));
//! let dir = game.available_moves()[0];
//! assert!(game.commit_slide(dir));
//! ```
//!
//! Full loop
//! ```
//! use trois::player::{player_from_config, PlayerConfig, SearchConfig};
//!
//! let cfg = PlayerConfig {
//!     seed: Some(7),
//!     search: SearchConfig { depth: 1, ..SearchConfig::default() },
//!     ..PlayerConfig::default()
//! };
//! let mut player = player_from_config(&cfg).unwrap();
//! let summary = player.decide_and_play(cfg.search.depth);
//! assert!(summary.moves > 0);
//! ```
//!
pub mod diagnostics;
pub mod engine;
pub mod piece;
pub mod player;
pub mod stack;
