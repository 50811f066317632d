use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use super::geometry::{Bounds, Position};
use super::snake::Snake;

/// Colour tier of a food cell. Only `Magic` changes the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodKind {
    Blue,
    Amber,
    Magenta,
    Cyan,
    Magic,
}

impl FoodKind {
    /// Maps a roll in `0..=10` to a tier; two of the eleven faces are magic.
    pub fn from_roll(roll: u8) -> Self {
        match roll {
            8..=u8::MAX => FoodKind::Blue,
            6..=7 => FoodKind::Amber,
            4..=5 => FoodKind::Magenta,
            2..=3 => FoodKind::Cyan,
            _ => FoodKind::Magic,
        }
    }

    pub fn is_magic(self) -> bool {
        self == FoodKind::Magic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Food {
    pub position: Position,
    pub kind: FoodKind,
}

const MIN_ATTEMPTS: usize = 64;

/// Picks a free cell farther than `fairness` (Manhattan) from the head.
///
/// Sampling is bounded. When it gives up, the free cell farthest from the
/// head is used instead, so a crowded or tiny board still gets food.
/// Returns `None` only when the snake covers every cell.
pub fn place_food<R: Rng>(
    rng: &mut R,
    bounds: Bounds,
    snake: &Snake,
    fairness: u32,
) -> Option<Food> {
    if bounds.area() == 0 {
        return None;
    }

    let kind = FoodKind::from_roll(rng.gen_range(0..=10));
    let head = snake.head();
    let attempts = (bounds.area() * 4).max(MIN_ATTEMPTS);

    for _ in 0..attempts {
        let candidate = Position::new(
            rng.gen_range(0..bounds.width as i32),
            rng.gen_range(0..bounds.height as i32),
        );
        if !snake.contains(&candidate) && candidate.manhattan(head) > fairness {
            return Some(Food { position: candidate, kind });
        }
    }

    let occupied: HashSet<&Position> = snake.cells().collect();
    let free: Vec<Position> = bounds.cells().filter(|cell| !occupied.contains(cell)).collect();
    let farthest = free.iter().map(|cell| cell.manhattan(head)).max()?;
    let best: Vec<Position> = free
        .into_iter()
        .filter(|cell| cell.manhattan(head) == farthest)
        .collect();

    debug!(
        "Food sampling gave up after {} attempts, falling back to a cell {} away",
        attempts, farthest
    );

    best.choose(rng).map(|&position| Food { position, kind })
}
