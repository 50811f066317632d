use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::food::Food;
use super::geometry::Position;
use super::heading::Heading;
use super::snake::Snake;
use crate::config::{PaceConfig, RulesConfig};

/// Score state shared between the game loop and the background timer.
#[derive(Debug, Default)]
pub struct Scoreboard {
    score: AtomicU64,
    length: AtomicUsize,
    ticks: AtomicU64,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self, length: usize) {
        self.score.store(0, Ordering::Relaxed);
        self.length.store(length, Ordering::Relaxed);
    }

    pub fn score(&self) -> u64 {
        self.score.load(Ordering::Relaxed)
    }

    pub fn length(&self) -> usize {
        self.length.load(Ordering::Relaxed)
    }

    pub fn add(&self, points: u64) {
        self.score.fetch_add(points, Ordering::Relaxed);
    }

    pub fn set_length(&self, length: usize) {
        self.length.store(length, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the ticks counted since the last call and restarts the count.
    pub fn take_ticks(&self) -> u64 {
        self.ticks.swap(0, Ordering::Relaxed)
    }
}

/// Everything that belongs to a single play, from setup to game over.
pub struct GameSession {
    pub snake: Snake,
    pub food: Option<Food>,
    /// Set while the food on the board is magic
    pub special: bool,
    pub target_length: usize,
    pub heading: Heading,
    scoreboard: Arc<Scoreboard>,
}

impl GameSession {
    pub fn new(
        start: Position,
        rules: &RulesConfig,
        pace: &PaceConfig,
        scoreboard: Arc<Scoreboard>,
    ) -> Self {
        scoreboard.reset(rules.initial_length);
        Self {
            snake: Snake::new(start),
            food: None,
            special: false,
            target_length: rules.initial_length,
            heading: Heading::new(pace),
            scoreboard,
        }
    }

    pub fn score(&self) -> u64 {
        self.scoreboard.score()
    }

    pub fn set_food(&mut self, food: Food) {
        self.special = food.kind.is_magic();
        self.food = Some(food);
    }

    pub fn food_at(&self, position: Position) -> bool {
        self.food.map_or(false, |food| food.position == position)
    }

    /// Consumes the food on the board: grows the target length, scores the
    /// meal and ramps difficulty. Returns the points awarded.
    pub fn eat(&mut self, rules: &RulesConfig) -> u64 {
        self.food = None;

        let growth = if std::mem::take(&mut self.special) {
            rules.magic_growth
        } else {
            rules.normal_growth
        };
        self.target_length += growth;

        let points = rules.food_points + self.target_length as u64;
        self.scoreboard.add(points);
        self.scoreboard.set_length(self.target_length);
        self.heading.ramp(rules.difficulty_ramp);

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::food::FoodKind;

    fn session() -> GameSession {
        GameSession::new(
            Position::new(0, 5),
            &RulesConfig::default(),
            &PaceConfig::default(),
            Arc::new(Scoreboard::new()),
        )
    }

    fn food(kind: FoodKind) -> Food {
        Food { position: Position::new(9, 9), kind }
    }

    #[test]
    fn test_fresh_session() {
        let session = session();
        assert_eq!(session.score(), 0);
        assert_eq!(session.target_length, 3);
        assert_eq!(session.snake.len(), 1);
        assert_eq!(session.snake.head(), Position::new(0, 5));
        assert!(session.food.is_none());
    }

    #[test]
    fn test_ordinary_meal() {
        let mut session = session();
        session.set_food(food(FoodKind::Cyan));
        assert!(!session.special);

        let points = session.eat(&RulesConfig::default());
        assert_eq!(session.target_length, 6);
        assert_eq!(points, 16);
        assert_eq!(session.score(), 16);
        assert!(session.food.is_none());
        assert_eq!(session.heading.rates(), (61, 81));
    }

    #[test]
    fn test_magic_meal_clears_flag() {
        let mut session = session();
        session.set_food(food(FoodKind::Magic));
        assert!(session.special);

        session.eat(&RulesConfig::default());
        assert_eq!(session.target_length, 9);
        assert_eq!(session.score(), 19);
        assert!(!session.special);

        // The next meal is ordinary again
        session.set_food(food(FoodKind::Blue));
        session.eat(&RulesConfig::default());
        assert_eq!(session.target_length, 12);
        assert_eq!(session.score(), 19 + 22);
    }

    #[test]
    fn test_new_session_resets_shared_score() {
        let scoreboard = Arc::new(Scoreboard::new());
        scoreboard.add(40);
        scoreboard.set_length(12);

        let _session = GameSession::new(
            Position::new(0, 0),
            &RulesConfig::default(),
            &PaceConfig::default(),
            Arc::clone(&scoreboard),
        );
        assert_eq!(scoreboard.score(), 0);
        assert_eq!(scoreboard.length(), 3);
    }

    #[test]
    fn test_tick_counter() {
        let scoreboard = Scoreboard::new();
        scoreboard.record_tick();
        scoreboard.record_tick();
        assert_eq!(scoreboard.take_ticks(), 2);
        assert_eq!(scoreboard.take_ticks(), 0);
    }
}
