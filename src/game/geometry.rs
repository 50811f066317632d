// Direction the snake can move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

// A grid cell. Signed so that a step off the left or top edge is representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Size of the playing field in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: u16,
    pub height: u16,
}

impl Bounds {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Every cell of the board, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Position> {
        let (width, height) = (self.width as i32, self.height as i32);
        (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }
}

pub fn next_position(direction: Direction, position: Position) -> Position {
    match direction {
        Direction::Up => Position::new(position.x, position.y - 1),
        Direction::Down => Position::new(position.x, position.y + 1),
        Direction::Left => Position::new(position.x - 1, position.y),
        Direction::Right => Position::new(position.x + 1, position.y),
    }
}

pub fn in_bounds(position: Position, bounds: Bounds) -> bool {
    position.x >= 0
        && position.y >= 0
        && position.x < bounds.width as i32
        && position.y < bounds.height as i32
}
