use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::session::Scoreboard;
use crate::ui::Canvas;

/// Periodic score refresh running beside the game loop.
///
/// Each interval it redraws the score line, unless a draw is already under
/// way, in which case the player gets a small survival bonus and the
/// redraw waits for the loop's next score update.
pub struct ScoreTimer {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ScoreTimer {
    pub fn spawn(
        interval: Duration,
        width: u16,
        bonus: u64,
        canvas: Arc<Canvas>,
        scoreboard: Arc<Scoreboard>,
    ) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("score-timer".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let ticks = scoreboard.take_ticks();
                        debug!("Ticks/sec: {:.1}", ticks as f64 / interval.as_secs_f64());
                        check_in(&canvas, &scoreboard, width, bonus);
                    }
                    // Stop requested or the timer handle is gone
                    _ => break,
                }
            })
            .context("Failed to spawn score timer thread")?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }
}

impl Drop for ScoreTimer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Score timer thread panicked");
            }
        }
    }
}

/// One timer firing. Reads the drawing flag without taking the lock, so a
/// draw that starts right after the check still races with the redraw.
pub fn check_in(canvas: &Canvas, scoreboard: &Scoreboard, width: u16, bonus: u64) {
    if canvas.is_drawing() {
        scoreboard.add(bonus);
    } else {
        canvas.draw("score line", |s| {
            s.write_score_line(scoreboard.score(), scoreboard.length(), width)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::testing::{DrawOp, RecordingSurface};

    #[test]
    fn test_idle_canvas_gets_redrawn() {
        let surface = RecordingSurface::default();
        let canvas = Canvas::new(surface.clone());
        let scoreboard = Scoreboard::new();
        scoreboard.reset(3);
        scoreboard.add(16);

        check_in(&canvas, &scoreboard, 60, 2);

        assert_eq!(scoreboard.score(), 16);
        assert_eq!(
            surface.ops(),
            vec![DrawOp::Score { score: 16, length: 3 }, DrawOp::Flush]
        );
    }

    #[test]
    fn test_busy_canvas_awards_bonus() {
        let surface = RecordingSurface::default();
        let canvas = Canvas::new(surface.clone());
        let scoreboard = Scoreboard::new();

        // Fire while a draw holds the canvas
        canvas.draw("busy", |_| {
            check_in(&canvas, &scoreboard, 60, 2);
            Ok(())
        });

        assert_eq!(scoreboard.score(), 2);
        assert_eq!(surface.ops(), vec![DrawOp::Flush]);
    }

    #[test]
    fn test_timer_fires_and_stops() {
        let surface = RecordingSurface::default();
        let canvas = Arc::new(Canvas::new(surface.clone()));
        let scoreboard = Arc::new(Scoreboard::new());

        let timer = ScoreTimer::spawn(
            Duration::from_millis(10),
            60,
            2,
            Arc::clone(&canvas),
            Arc::clone(&scoreboard),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(100));
        drop(timer);

        let redraws = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::Score { .. }))
            .count();
        assert!(redraws >= 1);

        // Nothing fires after the timer is dropped
        let before = surface.ops().len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(surface.ops().len(), before);
    }
}
