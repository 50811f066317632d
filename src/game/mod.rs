mod food;
mod geometry;
mod heading;
mod session;
mod snake;
mod timer;

pub use food::FoodKind;
pub use geometry::{in_bounds, Bounds, Direction, Position};
pub use session::Scoreboard;
pub use timer::ScoreTimer;

use food::place_food;
use geometry::next_position;
use session::GameSession;
use snake::Advance;

use log::{debug, info, warn};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{Config, PaceConfig, RulesConfig};
use crate::input::{InputEvent, InputSource};
use crate::ui::{Canvas, Glyph, Notifier};

/// Why a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    OutOfBounds,
    SelfCollision,
    /// The snake covers every cell, so no food can be placed
    BoardFull,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Over(Ending),
}

/// Drives rounds of the game: setup, ticks until an ending, game over,
/// and again until the player quits.
pub struct Game<I: InputSource, R: Rng> {
    bounds: Bounds,
    rules: RulesConfig,
    pace: PaceConfig,
    canvas: Arc<Canvas>,
    scoreboard: Arc<Scoreboard>,
    input: I,
    notifier: Box<dyn Notifier>,
    running: Arc<AtomicBool>,
    rng: R,
}

impl<I: InputSource, R: Rng> Game<I, R> {
    pub fn new(
        config: &Config,
        canvas: Arc<Canvas>,
        scoreboard: Arc<Scoreboard>,
        input: I,
        notifier: Box<dyn Notifier>,
        running: Arc<AtomicBool>,
        rng: R,
    ) -> Self {
        Self {
            bounds: Bounds::new(config.board.width, config.board.height),
            rules: config.rules.clone(),
            pace: config.pace.clone(),
            canvas,
            scoreboard,
            input,
            notifier,
            running,
            rng,
        }
    }

    /// Plays rounds until a quit is requested.
    pub fn run(&mut self) {
        while self.running.load(Ordering::Relaxed) {
            let mut session = self.setup();
            let ending = self.play(&mut session);
            self.game_over(&session, ending);
        }
    }

    /// Starts a fresh round: new session, cleared board, zero score.
    pub fn setup(&mut self) -> GameSession {
        // Left-most column, half way down
        let start = Position::new(0, self.bounds.height as i32 / 2);
        let session = GameSession::new(
            start,
            &self.rules,
            &self.pace,
            Arc::clone(&self.scoreboard),
        );
        info!("New game on a {}x{} board", self.bounds.width, self.bounds.height);

        let (bounds, scoreboard) = (self.bounds, &self.scoreboard);
        self.canvas.draw("board", |s| {
            s.clear(bounds)?;
            s.paint(start, Glyph::Head)?;
            s.write_score_line(scoreboard.score(), scoreboard.length(), bounds.width)
        });

        session
    }

    fn play(&mut self, session: &mut GameSession) -> Ending {
        loop {
            match self.tick(session) {
                Tick::Continue => thread::sleep(session.heading.delay()),
                Tick::Over(ending) => return ending,
            }
        }
    }

    /// One step of the round: input, move, collisions, food.
    pub fn tick(&mut self, session: &mut GameSession) -> Tick {
        self.scoreboard.record_tick();

        match self.input.poll() {
            Ok(Some(event)) => self.apply_input(session, event),
            Ok(None) => {}
            Err(err) => warn!("Failed to read input: {:#}", err),
        }

        let next = next_position(session.heading.direction(), session.snake.head());
        if !in_bounds(next, self.bounds) {
            return Tick::Over(Ending::OutOfBounds);
        }

        match session.snake.try_advance(next, session.target_length) {
            Advance::Collided => return Tick::Over(Ending::SelfCollision),
            Advance::Stalled => {}
            Advance::Moved { head, previous_head, vacated } => {
                self.canvas.draw("snake", |s| {
                    s.paint(previous_head, Glyph::Body)?;
                    s.paint(head, Glyph::Head)?;
                    if let Some(cell) = vacated {
                        s.erase(cell)?;
                    }
                    Ok(())
                });
            }
        }

        if session.food_at(next) {
            let points = session.eat(&self.rules);
            debug!(
                "Ate food for {} points, target length {}, rates {:?}",
                points,
                session.target_length,
                session.heading.rates()
            );

            let (score, length, width) = (session.score(), session.target_length, self.bounds.width);
            self.canvas.draw("score line", |s| s.write_score_line(score, length, width));
        }

        if session.food.is_none() {
            let placed = place_food(
                &mut self.rng,
                self.bounds,
                &session.snake,
                self.rules.fairness_distance,
            );
            let Some(food) = placed else {
                return Tick::Over(Ending::BoardFull);
            };

            debug!("Placed {:?} food at ({}, {})", food.kind, food.position.x, food.position.y);
            session.set_food(food);
            self.canvas.draw("food", |s| s.paint(food.position, Glyph::Food(food.kind)));
        }

        if !self.running.load(Ordering::Relaxed) {
            return Tick::Over(Ending::Quit);
        }

        Tick::Continue
    }

    fn apply_input(&mut self, session: &mut GameSession, event: InputEvent) {
        match event {
            InputEvent::Turn(direction) => {
                if !session.heading.turn(direction) {
                    debug!("Ignored reversal to {:?}", direction);
                }
            }
            InputEvent::SpeedUp => session.heading.speed_up(),
            InputEvent::SpeedDown => session.heading.slow_down(),
            InputEvent::Quit => {
                info!("Quit requested");
                self.running.store(false, Ordering::Relaxed);
            }
        }
    }

    fn game_over(&mut self, session: &GameSession, ending: Ending) {
        info!(
            "Game over ({:?}): score {}, length {}",
            ending,
            session.score(),
            session.snake.len()
        );

        let message = if self.running.load(Ordering::Relaxed) {
            self.notifier.game_over();
            "Game Over"
        } else {
            "Good Bye"
        };
        self.canvas.draw("game over message", |s| s.show_message(message));

        thread::sleep(Duration::from_millis(self.rules.game_over_pause_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::food::Food;
    use super::*;
    use crate::input::{ScriptedInput, ThreadedInput};
    use crate::ui::testing::{CountingNotifier, DrawOp, RecordingSurface};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::AtomicUsize;

    struct Harness {
        game: Game<ScriptedInput, StdRng>,
        surface: RecordingSurface,
        running: Arc<AtomicBool>,
    }

    fn test_config(width: u16, height: u16) -> Config {
        let mut config = Config::default();
        config.board.width = width;
        config.board.height = height;
        config.pace.initial_delay_ms = 1;
        config.pace.horizontal_ms = 1;
        config.pace.vertical_ms = 1;
        config.rules.game_over_pause_ms = 0;
        config
    }

    fn harness(config: &Config, script: Vec<Option<InputEvent>>) -> Harness {
        harness_with(config, ScriptedInput::new(script), Box::new(CountingNotifier::default()))
    }

    fn harness_with(config: &Config, input: ScriptedInput, notifier: Box<dyn Notifier>) -> Harness {
        let surface = RecordingSurface::default();
        let running = Arc::new(AtomicBool::new(true));
        let game = Game::new(
            config,
            Arc::new(Canvas::new(surface.clone())),
            Arc::new(Scoreboard::new()),
            input,
            notifier,
            Arc::clone(&running),
            StdRng::seed_from_u64(3),
        );
        Harness { game, surface, running }
    }

    fn food(x: i32, y: i32, kind: FoodKind) -> Food {
        Food { position: Position::new(x, y), kind }
    }

    #[test]
    fn test_setup_draws_fresh_board() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![]);

        let session = h.game.setup();

        assert_eq!(session.snake.head(), Position::new(0, 5));
        assert_eq!(session.heading.direction(), Direction::Right);
        assert_eq!(
            h.surface.ops(),
            vec![
                DrawOp::Clear(Bounds::new(10, 10)),
                DrawOp::Paint(Position::new(0, 5), Glyph::Head),
                DrawOp::Score { score: 0, length: 3 },
                DrawOp::Flush,
            ]
        );
    }

    #[test]
    fn test_walks_off_the_right_edge_after_ten_ticks() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![]);
        let mut session = h.game.setup();
        // Off the y = 5 path so only the wall can end the round
        session.set_food(food(9, 0, FoodKind::Blue));

        let mut ticks = 0;
        let ending = loop {
            ticks += 1;
            match h.game.tick(&mut session) {
                Tick::Continue => assert!(ticks < 10),
                Tick::Over(ending) => break ending,
            }
        };

        assert_eq!(ticks, 10);
        assert_eq!(ending, Ending::OutOfBounds);
        assert_eq!(session.snake.head(), Position::new(9, 5));
        assert_eq!(session.snake.len(), 3);
        assert_eq!(session.score(), 0);
    }

    #[test]
    fn test_moves_paint_head_and_erase_tail() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![]);
        let mut session = h.game.setup();
        session.set_food(food(9, 0, FoodKind::Blue));

        for _ in 0..3 {
            assert_eq!(h.game.tick(&mut session), Tick::Continue);
        }

        let ops = h.surface.ops();
        assert!(ops.contains(&DrawOp::Paint(Position::new(3, 5), Glyph::Head)));
        assert!(ops.contains(&DrawOp::Paint(Position::new(2, 5), Glyph::Body)));
        assert!(ops.contains(&DrawOp::Erase(Position::new(0, 5))));
        assert!(!ops.contains(&DrawOp::Erase(Position::new(1, 5))));
    }

    #[test]
    fn test_ordinary_food_scores_and_grows() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![]);
        let mut session = h.game.setup();
        session.set_food(food(1, 5, FoodKind::Cyan));

        assert_eq!(h.game.tick(&mut session), Tick::Continue);

        assert_eq!(session.target_length, 6);
        assert_eq!(session.score(), 16);
        assert!(h.surface.ops().contains(&DrawOp::Score { score: 16, length: 6 }));

        // A replacement is placed straight away, far from the head
        let replacement = session.food.expect("food should be replaced");
        assert!(replacement.position.manhattan(session.snake.head()) > 8);
        assert!(h
            .surface
            .ops()
            .contains(&DrawOp::Paint(replacement.position, Glyph::Food(replacement.kind))));
    }

    #[test]
    fn test_magic_food_grows_more() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![]);
        let mut session = h.game.setup();
        session.set_food(food(1, 5, FoodKind::Magic));

        h.game.tick(&mut session);

        assert_eq!(session.target_length, 9);
        assert_eq!(session.score(), 19);
        assert_eq!(session.special, session.food.map_or(false, |f| f.kind.is_magic()));
    }

    #[test]
    fn test_turning_into_body_collides() {
        let config = test_config(10, 10);
        let turns = vec![
            None,
            None,
            None,
            None,
            Some(InputEvent::Turn(Direction::Up)),
            Some(InputEvent::Turn(Direction::Left)),
            Some(InputEvent::Turn(Direction::Down)),
        ];
        let mut h = harness(&config, turns);
        let mut session = h.game.setup();
        session.target_length = 5;
        session.set_food(food(9, 0, FoodKind::Blue));

        for _ in 0..6 {
            assert_eq!(h.game.tick(&mut session), Tick::Continue);
        }
        assert_eq!(session.snake.head(), Position::new(3, 4));
        assert_eq!(h.game.tick(&mut session), Tick::Over(Ending::SelfCollision));
    }

    #[test]
    fn test_reversal_input_keeps_heading() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![Some(InputEvent::Turn(Direction::Left))]);
        let mut session = h.game.setup();
        session.set_food(food(9, 0, FoodKind::Blue));

        assert_eq!(h.game.tick(&mut session), Tick::Continue);
        assert_eq!(session.heading.direction(), Direction::Right);
        assert_eq!(session.snake.head(), Position::new(1, 5));
    }

    #[test]
    fn test_reader_turns_apply_newest_first() {
        let config = test_config(10, 10);
        let input = ThreadedInput::replay(vec![
            InputEvent::Turn(Direction::Down),
            InputEvent::Turn(Direction::Right),
            InputEvent::Turn(Direction::Up),
        ]);
        let mut game = Game::new(
            &config,
            Arc::new(Canvas::new(RecordingSurface::default())),
            Arc::new(Scoreboard::new()),
            input,
            Box::new(CountingNotifier::default()),
            Arc::new(AtomicBool::new(true)),
            StdRng::seed_from_u64(3),
        );
        let mut session = game.setup();
        session.set_food(food(9, 0, FoodKind::Blue));

        assert_eq!(game.tick(&mut session), Tick::Continue);
        assert_eq!(session.heading.direction(), Direction::Up);
        assert_eq!(session.snake.head(), Position::new(0, 4));

        // The older turns are gone, not waiting for later ticks
        assert_eq!(game.tick(&mut session), Tick::Continue);
        assert_eq!(session.heading.direction(), Direction::Up);
        assert_eq!(session.snake.head(), Position::new(0, 3));
    }

    #[test]
    fn test_speed_inputs_adjust_delay() {
        let mut config = test_config(10, 10);
        config.pace.horizontal_ms = 60;
        config.pace.vertical_ms = 80;
        let script = vec![Some(InputEvent::SpeedUp), Some(InputEvent::SpeedDown), Some(InputEvent::SpeedDown)];
        let mut h = harness(&config, script);
        let mut session = h.game.setup();
        session.set_food(food(9, 0, FoodKind::Blue));

        h.game.tick(&mut session);
        assert_eq!(session.heading.rates(), (50, 70));
        assert_eq!(session.heading.delay(), Duration::from_millis(50));

        h.game.tick(&mut session);
        h.game.tick(&mut session);
        assert_eq!(session.heading.rates(), (70, 90));
    }

    #[test]
    fn test_input_failure_is_not_fatal() {
        let config = test_config(10, 10);
        let mut input = ScriptedInput::new(vec![]);
        input.push_failure("keyboard unplugged");
        let mut h = harness_with(&config, input, Box::new(CountingNotifier::default()));
        let mut session = h.game.setup();
        session.set_food(food(9, 0, FoodKind::Blue));

        assert_eq!(h.game.tick(&mut session), Tick::Continue);
        assert_eq!(session.snake.head(), Position::new(1, 5));
    }

    #[test]
    fn test_render_failure_is_not_fatal() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![]);
        let mut session = h.game.setup();
        session.set_food(food(9, 0, FoodKind::Blue));
        h.surface.failing.store(true, Ordering::SeqCst);

        assert_eq!(h.game.tick(&mut session), Tick::Continue);
        assert_eq!(h.game.tick(&mut session), Tick::Continue);
        assert_eq!(session.snake.head(), Position::new(2, 5));
    }

    #[test]
    fn test_quit_finishes_the_tick() {
        let config = test_config(10, 10);
        let mut h = harness(&config, vec![Some(InputEvent::Quit)]);
        let mut session = h.game.setup();
        session.set_food(food(9, 0, FoodKind::Blue));

        assert_eq!(h.game.tick(&mut session), Tick::Over(Ending::Quit));
        assert_eq!(session.snake.head(), Position::new(1, 5));
        assert!(!h.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_full_board_ends_round() {
        let config = test_config(2, 1);
        let mut h = harness(&config, vec![]);
        let mut session = h.game.setup();

        assert_eq!(h.game.tick(&mut session), Tick::Over(Ending::BoardFull));
    }

    struct SharedCounter(Arc<AtomicUsize>);

    impl Notifier for SharedCounter {
        fn game_over(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_run_restarts_until_quit() {
        let config = test_config(10, 10);
        // Ten quiet ticks take the first round into the wall, then quit
        let mut script = vec![None; 10];
        script.push(Some(InputEvent::Quit));
        let rings = Arc::new(AtomicUsize::new(0));
        let mut h = harness_with(
            &config,
            ScriptedInput::new(script),
            Box::new(SharedCounter(Arc::clone(&rings))),
        );

        h.game.run();

        assert_eq!(rings.load(Ordering::SeqCst), 1);
        let messages: Vec<DrawOp> = h
            .surface
            .ops()
            .into_iter()
            .filter(|op| matches!(op, DrawOp::Message(_)))
            .collect();
        assert_eq!(
            messages,
            vec![
                DrawOp::Message("Game Over".to_string()),
                DrawOp::Message("Good Bye".to_string()),
            ]
        );
        let clears = h
            .surface
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Clear(_)))
            .count();
        assert_eq!(clears, 2);
    }
}
