use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GAME_WIDTH: i32 = 1280;
pub const GAME_HEIGHT: i32 = 720;
pub const GAME_FPS: u32 = 60;

/// Paddle height in pixels. The name follows the wire protocol, where the
/// paddle is described as a rectangle lying on its side.
pub const RECT_WIDTH: i32 = 100;
/// Paddle thickness in pixels.
pub const RECT_HEIGHT: i32 = 10;

pub const MID_COORD: i32 = (GAME_HEIGHT - RECT_WIDTH) / 2;
pub const MAX_PADDLE_Y: i32 = GAME_HEIGHT - RECT_WIDTH;

/// Maximum launch angle of the ball after a restart, in degrees.
pub const MAX_ANGLE: i32 = 35;
pub const BALL_RADIUS: f64 = 15.0;
pub const BALL_VELOCITY: f64 = 10.0;

/// Extra hit box depth in front of the left paddle.
pub const LEFT_PADDLE_REACH: i32 = 10;

pub const MAX_PLAYERS: usize = 2;

/// Start positions by join order: left paddle first, right paddle second.
pub const START_POSITIONS: [PlayerState; MAX_PLAYERS] = [
    PlayerState { x: 10, y: MID_COORD },
    PlayerState {
        x: GAME_WIDTH - 20,
        y: MID_COORD,
    },
];

/// Top-left corner of a paddle in game space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: i32,
    pub y: i32,
}

impl PlayerState {
    pub fn move_up(&mut self) {
        self.y = (self.y - 1).max(0);
    }

    pub fn move_down(&mut self) {
        self.y = (self.y + 1).min(MAX_PADDLE_Y);
    }

    /// Hit box as `(left, top, right, bottom)`, extended forward by `reach`.
    pub fn get_bounds(&self, reach: i32) -> (f64, f64, f64, f64) {
        (
            self.x as f64,
            self.y as f64,
            (self.x + RECT_HEIGHT + reach) as f64,
            (self.y + RECT_WIDTH) as f64,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallState {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Launch angle in radians.
    pub angle: f64,
    pub speed_x: f64,
    pub speed_y: f64,
    pub velocity: f64,
}

impl BallState {
    /// A motionless ball at the centre of the field.
    pub fn centered() -> Self {
        Self {
            x: GAME_WIDTH as f64 / 2.0,
            y: GAME_HEIGHT as f64 / 2.0,
            radius: BALL_RADIUS,
            angle: 0.0,
            speed_x: 0.0,
            speed_y: 0.0,
            velocity: BALL_VELOCITY,
        }
    }

    pub fn get_bounds(&self) -> (f64, f64, f64, f64) {
        (
            self.x - self.radius,
            self.y - self.radius,
            self.x + self.radius,
            self.y + self.radius,
        )
    }

    pub fn speed(&self) -> f64 {
        (self.speed_x * self.speed_x + self.speed_y * self.speed_y).sqrt()
    }
}

impl Default for BallState {
    fn default() -> Self {
        Self::centered()
    }
}

/// Strict AABB overlap between the ball and a paddle hit box.
pub fn check_paddle_hit(ball: &BallState, paddle: &PlayerState, reach: i32) -> bool {
    let (bx1, by1, bx2, by2) = ball.get_bounds();
    let (px1, py1, px2, py2) = paddle.get_bounds(reach);

    bx2 > px1 && bx1 < px2 && by2 > py1 && by1 < py2
}

/// Action names known to the server, with their wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    UpdateFrame,
    GameStart,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::MoveUp => "MOVE_UP",
            Action::MoveDown => "MOVE_DOWN",
            Action::UpdateFrame => "UPDATE_FRAME",
            Action::GameStart => "GAME_START",
        }
    }

    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "MOVE_UP" => Some(Action::MoveUp),
            "MOVE_DOWN" => Some(Action::MoveDown),
            "UPDATE_FRAME" => Some(Action::UpdateFrame),
            "GAME_START" => Some(Action::GameStart),
            _ => None,
        }
    }
}

/// Movement requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    MoveUp,
    MoveDown,
}

impl From<Input> for Action {
    fn from(input: Input) -> Self {
        match input {
            Input::MoveUp => Action::MoveUp,
            Input::MoveDown => Action::MoveDown,
        }
    }
}

/// Loosely typed `{action, content}` object as it arrives on the wire.
///
/// Clients may attach any `content`, so it is kept as raw JSON until the
/// action is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub action: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
}

impl Envelope {
    pub fn from_input(input: Input) -> Self {
        Self {
            action: Action::from(input).as_str().to_string(),
            content: Value::Null,
        }
    }

    pub fn action(&self) -> Option<Action> {
        Action::parse(&self.action)
    }

    /// Returns the movement this envelope asks for, if any.
    pub fn input(&self) -> Option<Input> {
        match self.action()? {
            Action::MoveUp => Some(Input::MoveUp),
            Action::MoveDown => Some(Input::MoveDown),
            Action::UpdateFrame | Action::GameStart => None,
        }
    }
}

/// Snapshot shared by `GAME_START` and `UPDATE_FRAME`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameState {
    pub players_state: [PlayerState; MAX_PLAYERS],
    pub ball_state: BallState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    GameStart(FrameState),
    UpdateFrame(FrameState),
}

impl ServerMessage {
    pub fn frame(&self) -> &FrameState {
        match self {
            ServerMessage::GameStart(frame) | ServerMessage::UpdateFrame(frame) => frame,
        }
    }
}
