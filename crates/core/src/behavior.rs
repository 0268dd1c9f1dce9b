//! Node variants and their lifecycle hooks.
//!
//! Every node kind shares the same hook order; variants only decide what each hook does.
//! Hooks that need to wait on the outside world return a [`HookTask`] that the traversal
//! controller steps once per tick until it reports [`Progress::Done`]. Hooks never touch the
//! controller directly: they queue [`Directive`]s that the controller applies after each step.

use serde::{Deserialize, Serialize};

use crate::graph::MapNode;
use crate::seed::MapRng;

pub const ENEMY_AHEAD_MESSAGE: &str = "I see an enemy up ahead...";
pub const BAD_FEELING_MESSAGE: &str = "I don't have a good feeling about this path...";
const ENEMY_AHEAD_CHANCE: f32 = 0.5;
const BAD_FEELING_CHANCE: f32 = 0.25;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain stop on the path; nothing is triggered on arrival.
    Movement,
    /// Starts a battle the first time the player arrives.
    Battle { scene: String },
    /// Ends the current map and moves the run on to the next one.
    Win {
        #[serde(default)]
        message: Option<String>,
    },
}

impl NodeKind {
    pub fn tag(&self) -> NodeTag {
        match self {
            Self::Movement => NodeTag::Movement,
            Self::Battle { .. } => NodeTag::Battle,
            Self::Win { .. } => NodeTag::Win,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTag {
    Movement,
    Battle,
    Win,
}

/// Conditions under which a node may follow another one on a path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRules {
    /// Tags this node may not directly follow.
    #[serde(default)]
    pub not_after: Vec<NodeTag>,
    /// Maximum number of nodes with this node's tag on one path.
    #[serde(default)]
    pub max_per_path: Option<u32>,
}

impl PlacementRules {
    pub fn permits(&self, previous: Option<NodeTag>, same_tag_on_path: usize) -> bool {
        if let Some(previous) = previous
            && self.not_after.contains(&previous)
        {
            return false;
        }
        match self.max_per_path {
            Some(limit) => same_tag_on_path < limit as usize,
            None => true,
        }
    }
}

/// A node prototype that generation instantiates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTemplate {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub rules: PlacementRules,
}

impl NodeTemplate {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self { name: name.into(), kind, rules: PlacementRules::default() }
    }

    pub fn with_rules(mut self, rules: PlacementRules) -> Self {
        self.rules = rules;
        self
    }
}

/// Side effects a hook asks the traversal controller to perform.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Directive {
    HideMap,
    ShowMap,
    PauseMovement(bool),
    StartBattle { scene: String },
    FinishBattle,
    NextMap,
    Say { message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Running,
    Done,
}

/// Flags the combat system raises for battle nodes to wait on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombatSignals {
    pub battle_mode: bool,
    pub waiting_to_start: bool,
}

pub(crate) struct HookContext<'a> {
    pub(crate) combat: &'a CombatSignals,
    pub(crate) dt: f32,
    pub(crate) battle_cooldown: f32,
    pub(crate) directives: &'a mut Vec<Directive>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum BattleStage {
    Start,
    AwaitBattleMode,
    AwaitWaitingToStart,
    Cooldown { remaining: f32 },
}

/// Resumable remainder of an arrive or leave hook.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum HookTask {
    Done,
    Battle { scene: String, stage: BattleStage },
}

impl HookTask {
    pub(crate) fn step(&mut self, node: &mut MapNode, ctx: &mut HookContext<'_>) -> Progress {
        let HookTask::Battle { scene, stage } = self else {
            return Progress::Done;
        };
        loop {
            match *stage {
                BattleStage::Start => {
                    ctx.directives.push(Directive::HideMap);
                    ctx.directives.push(Directive::StartBattle { scene: scene.clone() });
                    ctx.directives.push(Directive::PauseMovement(true));
                    *stage = BattleStage::AwaitBattleMode;
                }
                BattleStage::AwaitBattleMode => {
                    if !ctx.combat.battle_mode {
                        return Progress::Running;
                    }
                    *stage = BattleStage::AwaitWaitingToStart;
                }
                BattleStage::AwaitWaitingToStart => {
                    if !ctx.combat.waiting_to_start {
                        return Progress::Running;
                    }
                    ctx.directives.push(Directive::ShowMap);
                    ctx.directives.push(Directive::FinishBattle);
                    *stage = BattleStage::Cooldown { remaining: ctx.battle_cooldown };
                    return Progress::Running;
                }
                BattleStage::Cooldown { remaining } => {
                    let remaining = remaining - ctx.dt;
                    if remaining > 0.0 {
                        *stage = BattleStage::Cooldown { remaining };
                        return Progress::Running;
                    }
                    ctx.directives.push(Directive::PauseMovement(false));
                    node.triggered = true;
                    break;
                }
            }
        }
        *self = HookTask::Done;
        Progress::Done
    }
}

pub(crate) fn on_generate(node: &mut MapNode) {
    node.selectable = false;
}

/// Returns whether the node's selectable state changed.
pub(crate) fn on_approach(node: &mut MapNode) -> bool {
    let changed = !node.selectable;
    node.selectable = true;
    changed
}

/// Returns whether the node's selectable state changed.
pub(crate) fn on_move_nearby(node: &mut MapNode) -> bool {
    let changed = node.selectable;
    node.selectable = false;
    changed
}

pub(crate) fn on_move_towards(node: &MapNode, directives: &mut Vec<Directive>) {
    if let NodeKind::Win { message: Some(message) } = &node.kind {
        directives.push(Directive::Say { message: message.clone() });
    }
}

pub(crate) fn on_arrive(node: &MapNode, directives: &mut Vec<Directive>) -> HookTask {
    tracing::debug!(target: "overworld::traversal", node = %node.name, "arrived");
    match &node.kind {
        NodeKind::Movement => HookTask::Done,
        NodeKind::Battle { .. } if node.triggered => HookTask::Done,
        NodeKind::Battle { scene } => {
            HookTask::Battle { scene: scene.clone(), stage: BattleStage::Start }
        }
        NodeKind::Win { .. } => {
            directives.push(Directive::NextMap);
            HookTask::Done
        }
    }
}

pub(crate) fn on_leave(node: &MapNode) -> HookTask {
    tracing::debug!(target: "overworld::traversal", node = %node.name, "left");
    HookTask::Done
}

/// Runs when an edge ending at a node of `kind` is created.
pub(crate) fn on_connect_to(kind: &NodeKind, travel_messages: &mut Vec<String>, rng: &mut MapRng) {
    if let NodeKind::Battle { .. } = kind
        && rng.chance(ENEMY_AHEAD_CHANCE)
    {
        travel_messages.push(ENEMY_AHEAD_MESSAGE.to_string());
    }
}

/// Runs when a hidden node of `kind` is attached to an edge.
pub(crate) fn on_hidden_connect_to(
    kind: &NodeKind,
    travel_messages: &mut Vec<String>,
    rng: &mut MapRng,
) {
    if let NodeKind::Battle { .. } = kind
        && rng.chance(BAD_FEELING_CHANCE)
    {
        travel_messages.push(BAD_FEELING_MESSAGE.to_string());
    }
}
