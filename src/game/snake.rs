use std::collections::VecDeque;

use super::geometry::Position;

/// Result of trying to move the head onto a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved {
        head: Position,
        previous_head: Position,
        vacated: Option<Position>,
    },
    // Target is the current head; nothing moved
    Stalled,
    Collided,
}

// The snake's body as a sequence of positions (tail at the front, head at the back)
#[derive(Debug, Clone)]
pub struct Snake {
    body: VecDeque<Position>,
}

impl Snake {
    pub fn new(seed: Position) -> Self {
        let mut body = VecDeque::new();
        body.push_back(seed);
        Self { body }
    }

    pub fn head(&self) -> Position {
        // The body is never empty: it starts with a seed and only loses a
        // cell right after gaining one.
        self.body[self.body.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.body.contains(position)
    }

    /// Body cells from tail to head.
    pub fn cells(&self) -> impl Iterator<Item = &Position> {
        self.body.iter()
    }

    /// Moves the head onto `target`, dropping the tail once the body is
    /// longer than `target_length`.
    pub fn try_advance(&mut self, target: Position, target_length: usize) -> Advance {
        let previous_head = self.head();
        if target == previous_head {
            return Advance::Stalled;
        }

        if self.body.contains(&target) {
            return Advance::Collided;
        }

        self.body.push_back(target);

        let vacated = if self.body.len() > target_length {
            self.body.pop_front()
        } else {
            None
        };

        Advance::Moved { head: target, previous_head, vacated }
    }
}
