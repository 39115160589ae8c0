//! Tic-tac-toe - デモ用アプリ
//!
//! Two players are collected with a `UserFinder`, seeded with whoever started
//! the game. Once confirmed, the roster message turns into the board and the
//! keycap reactions 1⃣..9⃣ place marks.
//!
//! ```text
//! 0 1 2
//! 3 4 5
//! 6 7 8
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use reacthost_core::domain::{Action, Member, MessageId, UserId};
use reacthost_core::user_finder::UserFinder;
use reacthost_core::{AppError, Application, HostedApp, InstanceContext};

/// Keycap emojis, in board order.
pub const KEYCAPS: [&str; 9] = [
    "1\u{20e3}",
    "2\u{20e3}",
    "3\u{20e3}",
    "4\u{20e3}",
    "5\u{20e3}",
    "6\u{20e3}",
    "7\u{20e3}",
    "8\u{20e3}",
    "9\u{20e3}",
];

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    O,
    X,
}

impl Mark {
    fn symbol(self) -> char {
        match self {
            Mark::O => 'O',
            Mark::X => 'X',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Won(Mark),
    Draw,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board([Option<Mark>; 9]);

impl Board {
    /// Place `mark` on an empty cell. Returns `false` if the cell is taken or
    /// out of range.
    pub fn place(&mut self, index: usize, mark: Mark) -> bool {
        match self.0.get_mut(index) {
            Some(cell @ None) => {
                *cell = Some(mark);
                true
            }
            _ => false,
        }
    }

    pub fn outcome(&self) -> Outcome {
        for line in LINES {
            if let [Some(a), Some(b), Some(c)] = line.map(|i| self.0[i]) {
                if a == b && b == c {
                    return Outcome::Won(a);
                }
            }
        }
        if self.0.iter().all(Option::is_some) {
            Outcome::Draw
        } else {
            Outcome::InProgress
        }
    }

    fn render(&self) -> String {
        let cell = |i: usize| self.0[i].map_or(' ', Mark::symbol);
        let rule = "-------------";
        let mut out = String::new();
        out.push_str(rule);
        for row in 0..3 {
            out.push_str(&format!(
                "\n| {} | {} | {} |\n{rule}",
                cell(row * 3),
                cell(row * 3 + 1),
                cell(row * 3 + 2)
            ));
        }
        out
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Game {
    finder: UserFinder,
    /// Empty until the roster is confirmed. Index 0 plays O and moves first.
    #[serde(default)]
    players: Vec<Member>,
    #[serde(default)]
    board: Board,
    #[serde(default)]
    turn: usize,
    #[serde(default)]
    message_id: Option<MessageId>,
}

impl Game {
    pub fn new(author: Member) -> Self {
        Self {
            finder: UserFinder::new(2).with_users(vec![author]),
            players: Vec::new(),
            board: Board::default(),
            turn: 0,
            message_id: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.board.outcome()
    }

    fn current_player(&self) -> Option<(&Member, Mark)> {
        let mark = if self.turn % 2 == 0 { Mark::O } else { Mark::X };
        self.players.get(self.turn % 2).map(|p| (p, mark))
    }

    async fn on_players_found(
        &mut self,
        ctx: &mut InstanceContext,
        players: Vec<Member>,
    ) -> Result<(), AppError> {
        info!(
            instance_id = %ctx.instance_id(),
            player_o = %players[0].display_name(),
            player_x = %players[1].display_name(),
            "tic-tac-toe players confirmed"
        );
        self.players = players;
        self.message_id = self.finder.message_id().cloned();
        let message_id = self
            .message_id
            .clone()
            .ok_or_else(|| AppError::new("board message missing"))?;

        ctx.clear_actions().await;
        ctx.set_allow_all_users(false);
        ctx.add_users(self.players.iter().map(|p| p.user_id.clone()));

        let keys: Vec<Action> = KEYCAPS
            .iter()
            .enumerate()
            .map(|(index, emoji)| {
                Action::new(message_id.clone(), *emoji)
                    .with_data("index", index)
                    .remove_if_unauthorized()
            })
            .collect();
        ctx.add_actions(keys).await?;

        self.render(ctx).await
    }

    fn status(&self) -> String {
        match self.outcome() {
            Outcome::Won(mark) => {
                let winner = &self.players[if mark == Mark::O { 0 } else { 1 }];
                format!("**{}** wins!", winner.display_name())
            }
            Outcome::Draw => "It's a draw.".to_string(),
            Outcome::InProgress => match self.current_player() {
                Some((player, mark)) => {
                    format!("Turn {}: {} ({})", self.turn + 1, player.display_name(), mark.symbol())
                }
                None => String::new(),
            },
        }
    }

    async fn render(&self, ctx: &InstanceContext) -> Result<(), AppError> {
        let Some(message_id) = &self.message_id else {
            return Ok(());
        };
        let content = format!("```\n{}\n```\n{}", self.board.render(), self.status());
        ctx.edit_message(message_id, &content).await?;
        Ok(())
    }
}

impl Default for Game {
    fn default() -> Self {
        Self {
            finder: UserFinder::new(2),
            players: Vec::new(),
            board: Board::default(),
            turn: 0,
            message_id: None,
        }
    }
}

impl HostedApp for Game {
    const APP_ID: &'static str = "reacthost.tictactoe.v1";
}

#[async_trait]
impl Application for Game {
    async fn start(&mut self, ctx: &mut InstanceContext) -> Result<(), AppError> {
        self.finder.start(ctx).await
    }

    async fn exit(&mut self, ctx: &mut InstanceContext) -> Result<(), AppError> {
        if self.outcome() == Outcome::InProgress {
            if let Some(message_id) = self.finder.message_id() {
                ctx.edit_message(message_id, "Game closed.").await?;
            }
        }
        Ok(())
    }

    async fn handle_action(
        &mut self,
        ctx: &mut InstanceContext,
        user_id: &UserId,
        action: &Action,
    ) -> Result<(), AppError> {
        if self.finder.handle_action(ctx, user_id, action).await? {
            return Ok(());
        }

        let Some((player, mark)) = self.current_player() else {
            return Ok(());
        };
        if player.user_id != *user_id {
            debug!(user_id = %user_id, "not this player's turn");
            return Ok(());
        }

        let index = action
            .data
            .int("index")
            .ok_or_else(|| AppError::new("board action without an index"))?;
        if !self.board.place(index, mark) {
            return Ok(());
        }
        self.turn += 1;
        self.render(ctx).await?;

        if self.outcome() != Outcome::InProgress {
            ctx.request_exit();
        }
        Ok(())
    }

    async fn handle_timer(
        &mut self,
        ctx: &mut InstanceContext,
        timer: &str,
    ) -> Result<(), AppError> {
        if let Some(players) = self.finder.handle_timer(ctx, timer).await? {
            self.on_players_found(ctx, players).await?;
        }
        Ok(())
    }

    fn serialize_state(&self) -> Result<Vec<u8>, AppError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn load_state(&mut self, ctx: &mut InstanceContext, data: &[u8]) -> Result<(), AppError> {
        *self = serde_json::from_slice(data)?;
        self.finder.resume(ctx);
        Ok(())
    }
}
