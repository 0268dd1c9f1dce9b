use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    pub struct NodeId;
    pub struct ConnectionId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self { x: self.x + (other.x - self.x) * t, y: self.y + (other.y - self.y) * t }
    }

    pub fn distance_to(self, other: Self) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Axis-aligned rectangle anchored at its minimum corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn min(self) -> Point {
        Point { x: self.x, y: self.y }
    }

    pub fn x_max(self) -> f32 {
        self.x + self.width
    }

    pub fn y_max(self) -> f32 {
        self.y + self.height
    }

    pub fn contains(self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.x_max() && point.y >= self.y && point.y <= self.y_max()
    }
}

/// Which way an edge is being walked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TravelDirection {
    Forward,
    Backtrack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalState {
    Idle,
    Moving,
}

/// Domain events recorded by the traversal controller for hosts to drain.
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    MapEntered { map: usize },
    MapHidden { map: usize },
    MapShown { map: usize },
    MoveAccepted { from: Option<NodeId>, to: NodeId, direction: TravelDirection },
    Left { node: NodeId },
    Arrived { node: NodeId },
    Say { message: String, duration: f32 },
    SelectableChanged { node: NodeId, selectable: bool },
    HiddenNodeRevealed { node: NodeId, connection: ConnectionId },
    BattleRequested { node: NodeId, scene: String },
    BattleFinished { node: NodeId },
    RunCompleted,
}
