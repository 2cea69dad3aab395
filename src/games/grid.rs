//! Grid: two players, a 3x3 board, three in a row wins.
//!
//! The smallest possible variant. It uses none of the card machinery and
//! ends the game the moment a line is made or the board fills up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::{MoveError, Seat, SessionError};
use crate::session::{MoveOutcome, MoveTable, Standing, Table, TurnState, Variant};

const CELLS: usize = 9;

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The first seat plays X.
    #[must_use]
    pub fn of(seat: Seat) -> Self {
        if seat.0 == 0 {
            Mark::X
        } else {
            Mark::O
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridAction {
    Place,
}

/// No rule knobs; accepts any room settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GridSettings {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    board: Vec<Option<Mark>>,
}

impl Grid {
    #[must_use]
    pub fn board(&self) -> &[Option<Mark>] {
        &self.board
    }

    /// Seat that owns a full line, if any.
    #[must_use]
    pub fn line_owner(&self) -> Option<Seat> {
        LINES.iter().find_map(|&[a, b, c]| {
            let mark = self.board[a]?;
            (self.board[b] == Some(mark) && self.board[c] == Some(mark)).then(|| match mark {
                Mark::X => Seat(0),
                Mark::O => Seat(1),
            })
        })
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.board.iter().all(Option::is_some)
    }
}

#[async_trait]
impl Variant for Grid {
    type Action = GridAction;
    type Settings = GridSettings;

    const NAME: &'static str = "grid";
    const MIN_PLAYERS: usize = 2;
    const MAX_PLAYERS: usize = 2;

    fn move_table() -> MoveTable<GridAction> {
        MoveTable::new().with("place", GridAction::Place, &[TurnState::NormalTurn])
    }

    fn setup(_settings: GridSettings, _table: &mut Table) -> Result<Self, SessionError> {
        Ok(Self {
            board: vec![None; CELLS],
        })
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.board.len() != CELLS {
            return Err(SessionError::snapshot(format!("board has {} cells", self.board.len())));
        }
        Ok(())
    }

    async fn handle(
        &mut self,
        table: &mut Table,
        seat: Seat,
        action: GridAction,
        payload: &Value,
    ) -> Result<MoveOutcome, MoveError> {
        let GridAction::Place = action;
        let position = payload
            .get("position")
            .ok_or_else(|| MoveError::invalid("Invalid move data, position required"))?
            .as_u64()
            .and_then(|p| usize::try_from(p).ok())
            .filter(|&p| p < CELLS)
            .ok_or_else(|| MoveError::invalid("Invalid position"))?;
        if self.board[position].is_some() {
            return Err(MoveError::invalid("Position already taken"));
        }

        let mark = Mark::of(seat);
        self.board[position] = Some(mark);
        table
            .broadcast(json!({ "type": "mark_placed", "player": table.player(seat), "position": position, "mark": mark }))
            .await;
        Ok(MoveOutcome::ends_turn())
    }

    fn is_complete(&self, seat: Seat) -> bool {
        self.line_owner() == Some(seat)
    }

    fn ends_immediately(&self, _table: &Table) -> bool {
        self.line_owner().is_some() || self.is_full()
    }

    fn standings(&self, table: &Table) -> Vec<Standing> {
        let winner = self.line_owner();
        let mut seats: Vec<Seat> = Seat::all(table.player_count()).collect();
        seats.sort_by_key(|&seat| (winner != Some(seat), seat));
        seats
            .into_iter()
            .map(|seat| {
                let marks = self.board.iter().filter(|&&m| m == Some(Mark::of(seat))).count();
                Standing {
                    seat,
                    player: table.player(seat),
                    score: i32::from(winner == Some(seat)),
                    breakdown: json!({ "marks": marks }),
                }
            })
            .collect()
    }

    /// `None` on a full board without a line.
    fn winner(&self, _table: &Table, _standings: &[Standing]) -> Option<Seat> {
        self.line_owner()
    }

    fn view(&self, table: &Table, viewer: Seat) -> Value {
        let players: Vec<Value> = Seat::all(table.player_count())
            .map(|seat| json!({ "player": table.player(seat), "mark": Mark::of(seat) }))
            .collect();
        json!({ "board": self.board, "mark": Mark::of(viewer), "players": players })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{PlayerId, Roster, SessionConfig};
    use crate::protocol::RecordingTransport;

    fn table() -> Table {
        let roster = Roster::new(vec![PlayerId(1), PlayerId(2)]).unwrap();
        Table::new("grid", roster, SessionConfig::new(), 0, Arc::new(RecordingTransport::new()))
    }

    fn board(marks: &str) -> Grid {
        Grid {
            board: marks
                .chars()
                .map(|c| match c {
                    'X' => Some(Mark::X),
                    'O' => Some(Mark::O),
                    _ => None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_place_validation() {
        let mut table = table();
        let mut grid = Grid::setup(GridSettings::default(), &mut table).unwrap();

        grid.handle(&mut table, Seat(0), GridAction::Place, &json!({ "position": 4 }))
            .await
            .unwrap();
        assert_eq!(grid.board()[4], Some(Mark::X));

        for (payload, error) in [
            (json!({ "position": 4 }), "Position already taken"),
            (json!({ "position": 9 }), "Invalid position"),
            (json!({ "position": "a" }), "Invalid position"),
            (json!({ "position": u64::MAX }), "Invalid position"),
            (json!({ "position": -1 }), "Invalid position"),
            (json!({}), "Invalid move data, position required"),
        ] {
            let err = grid.handle(&mut table, Seat(1), GridAction::Place, &payload).await.unwrap_err();
            assert_eq!(err, MoveError::invalid(error));
        }
    }

    #[test]
    fn test_lines() {
        let table = table();
        let won = board("XXX.OO...");
        assert_eq!(won.line_owner(), Some(Seat(0)));
        assert!(won.is_complete(Seat(0)));
        assert!(won.ends_immediately(&table));
        assert_eq!(board("X.O.O.O.X").line_owner(), Some(Seat(1)));
        assert!(!board("XO.......").ends_immediately(&table));
    }

    #[test]
    fn test_full_board_is_a_draw() {
        let table = table();
        let draw = board("XOXXOOOXX");

        assert!(draw.ends_immediately(&table));
        let standings = draw.standings(&table);
        assert_eq!(draw.winner(&table, &standings), None);
        assert!(standings.iter().all(|s| s.score == 0));
    }

    #[test]
    fn test_winner_ranks_first() {
        let table = table();
        let grid = board("OX.OX..X.");
        let standings = grid.standings(&table);
        assert_eq!(standings[0].seat, Seat(0));
        assert_eq!(standings[0].score, 1);
    }
}
