//! Small maze used to drive the controller from the console.

use vote_core::{GameEngine, GameFactory};

const LAYOUT: &[&str] = &[
    "#########",
    "#S..#...#",
    "#.#.#.#.#",
    "#.#...#G#",
    "#########",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    row: usize,
    col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Playing,
    Escaped,
    OutOfTurns,
}

pub struct MazeGame {
    walls: Vec<Vec<bool>>,
    start: Cell,
    goal: Cell,
    player: Cell,
    turn: u32,
    max_turns: u32,
    outcome: Outcome,
    last_move: Option<String>,
}

impl MazeGame {
    pub fn new(max_turns: u32) -> Self {
        let mut start = Cell { row: 0, col: 0 };
        let mut goal = Cell { row: 0, col: 0 };
        let walls: Vec<Vec<bool>> = LAYOUT
            .iter()
            .enumerate()
            .map(|(row, line)| {
                line.chars()
                    .enumerate()
                    .map(|(col, tile)| {
                        match tile {
                            'S' => start = Cell { row, col },
                            'G' => goal = Cell { row, col },
                            _ => {}
                        }
                        tile == '#'
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            walls,
            start,
            goal,
            player: start,
            turn: 0,
            max_turns,
            outcome: Outcome::Playing,
            last_move: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    fn step(&self, game_move: &str) -> Option<Cell> {
        let Cell { row, col } = self.player;
        let next = match game_move {
            "up" => Cell { row: row.checked_sub(1)?, col },
            "down" => Cell { row: row + 1, col },
            "left" => Cell { row, col: col.checked_sub(1)? },
            "right" => Cell { row, col: col + 1 },
            _ => return None,
        };
        let blocked = self
            .walls
            .get(next.row)
            .and_then(|line| line.get(next.col))
            .copied()
            .unwrap_or(true);
        (!blocked).then_some(next)
    }
}

impl GameEngine for MazeGame {
    fn start(&mut self) {
        self.player = self.start;
        self.turn = 0;
        self.outcome = Outcome::Playing;
        self.last_move = None;
    }

    fn tick(&mut self, game_move: Option<&str>) {
        if self.outcome != Outcome::Playing {
            return;
        }
        self.turn += 1;
        self.last_move = game_move.map(str::to_string);
        if let Some(next) = game_move.and_then(|game_move| self.step(game_move)) {
            self.player = next;
        }

        if self.player == self.goal {
            self.outcome = Outcome::Escaped;
        } else if self.turn >= self.max_turns {
            self.outcome = Outcome::OutOfTurns;
        }
    }

    fn is_over(&self) -> bool {
        self.outcome != Outcome::Playing
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (row, line) in self.walls.iter().enumerate() {
            for (col, wall) in line.iter().enumerate() {
                let cell = Cell { row, col };
                let tile = if cell == self.player {
                    '@'
                } else if cell == self.goal {
                    'G'
                } else if *wall {
                    '#'
                } else {
                    '.'
                };
                out.push(tile);
            }
            out.push('\n');
        }

        let last = self.last_move.as_deref().unwrap_or("-");
        let status = match self.outcome {
            Outcome::Playing => "vote with a reaction",
            Outcome::Escaped => "escaped!",
            Outcome::OutOfTurns => "out of turns",
        };
        out.push_str(&format!(
            "turn {}/{} | last move: {last} | {status}",
            self.turn, self.max_turns
        ));
        out
    }
}

pub struct MazeFactory {
    pub max_turns: u32,
}

impl GameFactory for MazeFactory {
    type Game = MazeGame;

    fn create(&self) -> MazeGame {
        MazeGame::new(self.max_turns)
    }
}
