//! Player movement across the ordered maps of a run.

mod transition;


use std::mem;

use serde::{Deserialize, Serialize};

use crate::behavior::{self, CombatSignals, Directive, HookTask};
use crate::error::MapError;
use crate::graph::{MapGraph, MapNode};
use crate::map::Map;
use crate::seed::{MapRng, derive_map_seed, runtime_seed};
use crate::types::{
    ConnectionId, MapEvent, NodeId, Point, Rect, TravelDirection, TraversalState,
};

use transition::{Phase, Transition};

const TRAVERSAL_TARGET: &str = "overworld::traversal";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalSettings {
    /// Seconds spent walking one connection.
    pub movement_time: f32,
    pub allow_backtracking: bool,
    pub movement_enabled: bool,
    /// Seeds travel message picks; live entropy when absent.
    pub message_seed: Option<u64>,
    /// How long a spoken line stays up, forwarded on [`MapEvent::Say`].
    pub say_duration: f32,
    /// Delay between the map reappearing after a battle and movement unpausing.
    pub battle_cooldown: f32,
    /// Rectangle a map is laid out in when it is entered.
    pub viewport: Rect,
    pub padding: Point,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            movement_time: 0.2,
            allow_backtracking: false,
            movement_enabled: true,
            message_seed: None,
            say_duration: 2.0,
            battle_cooldown: 1.0,
            viewport: Rect::new(0.0, 0.0, 1.0, 1.0),
            padding: Point::ZERO,
        }
    }
}

type RunCompleteHook = Box<dyn FnMut()>;

/// Owns the maps of a run and moves the player over the active one.
///
/// Movement is cooperative: [`MapTraversal::request_move`] only starts a transition and
/// [`MapTraversal::advance`] drives it one tick at a time until the controller is idle again.
pub struct MapTraversal {
    maps: Vec<Map>,
    run_seed: u64,
    settings: TraversalSettings,
    current_map: Option<usize>,
    current_node: Option<NodeId>,
    previous_node: Option<NodeId>,
    allow_movement: bool,
    /// Movement flag to restore once a requested hide is undone.
    hidden_movement: Option<bool>,
    paused: bool,
    transition: Option<Transition>,
    combat: CombatSignals,
    messages: MapRng,
    events: Vec<MapEvent>,
    run_complete: Vec<RunCompleteHook>,
    pending_next_maps: u32,
}

impl MapTraversal {
    pub fn new(
        maps: Vec<Map>,
        run_seed: u64,
        settings: TraversalSettings,
    ) -> Result<Self, MapError> {
        if maps.is_empty() {
            tracing::warn!(target: TRAVERSAL_TARGET, "there are no maps to traverse");
            return Err(MapError::NoMaps);
        }
        let messages = MapRng::new(settings.message_seed.unwrap_or_else(runtime_seed));
        Ok(Self {
            maps,
            run_seed,
            allow_movement: settings.movement_enabled,
            settings,
            current_map: None,
            current_node: None,
            previous_node: None,
            hidden_movement: None,
            paused: false,
            transition: None,
            combat: CombatSignals::default(),
            messages,
            events: Vec::new(),
            run_complete: Vec::new(),
            pending_next_maps: 0,
        })
    }

    /// Generates every map that is not generated yet, hides them, and places the player on the
    /// start of the first one. The placement completes on the next [`MapTraversal::advance`].
    pub fn start(&mut self) -> Result<(), MapError> {
        self.guard_idle("start")?;
        for (index, map) in self.maps.iter_mut().enumerate() {
            if !map.is_generated() {
                map.generate(derive_map_seed(self.run_seed, index))?;
            }
            map.hide();
        }
        self.current_map = None;
        self.enter_map(0)
    }

    /// Starts moving toward `target`. Returns whether the move was accepted.
    ///
    /// Moves are rejected while another move is in flight, while movement is disabled, and
    /// toward nodes that no connection of the current node reaches. Backtracking along an
    /// incoming connection is allowed only when enabled in the settings. The very first move
    /// onto a map is accepted without a connection.
    pub fn request_move(&mut self, target: NodeId) -> bool {
        let Some(graph) = graph_of(&self.maps, self.current_map) else {
            tracing::warn!(target: TRAVERSAL_TARGET, "requested movement without an active map");
            return false;
        };
        let Some(node) = graph.node(target) else {
            tracing::debug!(target: TRAVERSAL_TARGET, "requested movement to an unknown node");
            return false;
        };
        if node.hidden || self.current_node == Some(target) {
            return false;
        }
        if !self.allow_movement {
            tracing::debug!(
                target: TRAVERSAL_TARGET,
                node = %node.name,
                "requested movement but movement is disabled"
            );
            return false;
        }
        if self.transition.is_some() {
            tracing::debug!(
                target: TRAVERSAL_TARGET,
                node = %node.name,
                "requested movement while already moving"
            );
            return false;
        }

        let Some(current) = self.current_node else {
            tracing::warn!(target: TRAVERSAL_TARGET, node = %node.name, "moving from no node");
            self.begin_transition(target, None, TravelDirection::Forward, false);
            return true;
        };

        let forward = graph.connection_between(current, target);
        let edge = match forward {
            Some(connection) => Some((connection, TravelDirection::Forward)),
            None if self.settings.allow_backtracking => graph
                .connection_between(target, current)
                .map(|connection| (connection, TravelDirection::Backtrack)),
            None => None,
        };
        let Some((connection, direction)) = edge else {
            tracing::debug!(
                target: TRAVERSAL_TARGET,
                node = %node.name,
                "requested movement to a node that is not connected to the current node"
            );
            return false;
        };

        self.begin_transition(target, Some(connection), direction, true);
        true
    }

    /// Moves on to the next map, or completes the run when the current map is the last one.
    ///
    /// Every call at the last map notifies the run-complete hooks again. While a move is in
    /// flight the request is queued; each queued request is handled once the controller is idle.
    pub fn request_next_map(&mut self) {
        if self.transition.is_some() {
            self.pending_next_maps += 1;
            return;
        }
        self.advance_map();
    }

    /// Drives the in-flight transition by `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> TraversalState {
        let mut budget = dt.max(0.0);
        while let Some(mut transition) = self.transition.take() {
            match self.step_transition(&mut transition, &mut budget) {
                transition::Step::Continue => self.transition = Some(transition),
                transition::Step::Yield => {
                    self.transition = Some(transition);
                    break;
                }
                transition::Step::Finished => {
                    tracing::debug!(target: TRAVERSAL_TARGET, "movement finished");
                    self.drain_next_maps();
                }
            }
        }
        self.state()
    }

    /// Hides the active map and suspends movement. Repeated calls are ignored.
    pub fn hide_current_map(&mut self) {
        if self.hidden_movement.is_some() {
            return;
        }
        let Some(index) = self.current_map else {
            tracing::warn!(target: TRAVERSAL_TARGET, "attempted to hide without an active map");
            return;
        };
        self.hidden_movement = Some(self.allow_movement);
        self.allow_movement = false;
        self.maps[index].hide();
        self.events.push(MapEvent::MapHidden { map: index });
    }

    /// Undoes [`MapTraversal::hide_current_map`]; does nothing without a prior hide.
    pub fn show_current_map(&mut self) {
        let Some(restore) = self.hidden_movement.take() else {
            return;
        };
        self.allow_movement = restore;
        if let Some(index) = self.current_map {
            self.maps[index].show();
            self.events.push(MapEvent::MapShown { map: index });
        }
    }

    /// Regenerates map `index`. Refused while a move is in flight.
    pub fn regenerate_map(&mut self, index: usize, run_seed: u64) -> Result<(), MapError> {
        self.guard_idle("regenerate")?;
        let map = self.maps.get_mut(index).ok_or(MapError::UnknownMap(index))?;
        map.generate(run_seed)?;
        if self.current_map != Some(index) {
            map.hide();
            return Ok(());
        }
        map.display(self.settings.viewport, self.settings.padding)?;
        let start = map.start_node().ok_or(MapError::NotGenerated)?;
        self.current_node = None;
        self.previous_node = None;
        self.begin_transition(start, None, TravelDirection::Forward, false);
        Ok(())
    }

    /// Destroys map `index`. Refused while a move is in flight.
    pub fn destroy_map(&mut self, index: usize) -> Result<(), MapError> {
        self.guard_idle("destroy")?;
        let map = self.maps.get_mut(index).ok_or(MapError::UnknownMap(index))?;
        map.destroy();
        if self.current_map == Some(index) {
            self.current_node = None;
            self.previous_node = None;
        }
        Ok(())
    }

    /// Registers a hook that runs every time the run is completed.
    pub fn on_run_complete(&mut self, hook: impl FnMut() + 'static) {
        self.run_complete.push(Box::new(hook));
    }

    pub fn state(&self) -> TraversalState {
        if self.transition.is_some() { TraversalState::Moving } else { TraversalState::Idle }
    }

    pub fn is_moving(&self) -> bool {
        self.transition.is_some()
    }

    pub fn can_move(&self) -> bool {
        self.allow_movement
    }

    /// Enables or disables movement; while the map is hidden the value applies once it is shown.
    pub fn set_movement_enabled(&mut self, enabled: bool) {
        match &mut self.hidden_movement {
            Some(restore) => *restore = enabled,
            None => self.allow_movement = enabled,
        }
    }

    pub fn set_allow_backtracking(&mut self, allow: bool) {
        self.settings.allow_backtracking = allow;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Freezes travel progress and delays move completion without cancelling the move.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn combat(&self) -> CombatSignals {
        self.combat
    }

    pub fn set_battle_mode(&mut self, battle_mode: bool) {
        self.combat.battle_mode = battle_mode;
    }

    pub fn set_waiting_to_start(&mut self, waiting_to_start: bool) {
        self.combat.waiting_to_start = waiting_to_start;
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.current_node
    }

    pub fn previous_node(&self) -> Option<NodeId> {
        self.previous_node
    }

    pub fn current_map_index(&self) -> Option<usize> {
        self.current_map
    }

    pub fn current_map(&self) -> Option<&Map> {
        self.current_map.and_then(|index| self.maps.get(index))
    }

    pub fn maps(&self) -> &[Map] {
        &self.maps
    }

    pub fn settings(&self) -> &TraversalSettings {
        &self.settings
    }

    /// Progress along the connection being walked, if any.
    pub fn travel_progress(&self) -> Option<f32> {
        self.transition.as_ref().and_then(Transition::progress)
    }

    /// Player position: interpolated while walking, otherwise the current node's position.
    pub fn player_position(&self) -> Option<Point> {
        let graph = graph_of(&self.maps, self.current_map)?;
        let to = graph.node(self.current_node?)?.position;
        let Some(transition) = &self.transition else {
            return Some(to);
        };
        let from = transition.from.and_then(|id| graph.node(id)).map(|node| node.position);
        match (from, transition.progress()) {
            (Some(from), Some(progress)) => Some(from.lerp(to, progress)),
            (Some(from), None) if matches!(transition.phase, Phase::Leaving(_)) => Some(from),
            _ => Some(to),
        }
    }

    pub fn events(&self) -> &[MapEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        mem::take(&mut self.events)
    }

    fn guard_idle(&self, operation: &str) -> Result<(), MapError> {
        if self.transition.is_some() {
            tracing::error!(
                target: TRAVERSAL_TARGET,
                operation,
                "map modification requested while a move is in flight"
            );
            return Err(MapError::TransitionInFlight);
        }
        Ok(())
    }

    /// Handles queued next-map requests in order, stopping when one starts a new transition.
    fn drain_next_maps(&mut self) {
        while self.transition.is_none() && self.pending_next_maps > 0 {
            self.pending_next_maps -= 1;
            self.advance_map();
        }
    }

    fn advance_map(&mut self) {
        let next = self.current_map.map_or(0, |index| index + 1);
        if next < self.maps.len() {
            if let Err(error) = self.enter_map(next) {
                tracing::error!(
                    target: TRAVERSAL_TARGET,
                    %error,
                    map = next,
                    "failed to enter map"
                );
            }
            return;
        }
        tracing::debug!(target: TRAVERSAL_TARGET, "left the last map");
        for hook in &mut self.run_complete {
            hook();
        }
        self.events.push(MapEvent::RunCompleted);
    }

    fn enter_map(&mut self, index: usize) -> Result<(), MapError> {
        if index >= self.maps.len() {
            tracing::error!(target: TRAVERSAL_TARGET, map = index, "out of bounds map movement");
            return Err(MapError::UnknownMap(index));
        }
        if let Some(old) = self.current_map
            && old != index
        {
            self.maps[old].hide();
            self.events.push(MapEvent::MapHidden { map: old });
        }
        if let Some(restore) = self.hidden_movement.take() {
            self.allow_movement = restore;
        }

        let run_seed = self.run_seed;
        let map = &mut self.maps[index];
        if !map.is_generated() {
            map.generate(derive_map_seed(run_seed, index))?;
        }
        map.display(self.settings.viewport, self.settings.padding)?;
        let start = map.start_node().ok_or(MapError::NotGenerated)?;

        self.current_map = Some(index);
        self.current_node = None;
        self.previous_node = None;
        self.events.push(MapEvent::MapEntered { map: index });
        tracing::debug!(
            target: TRAVERSAL_TARGET,
            map = index,
            name = %self.maps[index].name(),
            "entered map"
        );
        self.begin_transition(start, None, TravelDirection::Forward, false);
        Ok(())
    }

    fn begin_transition(
        &mut self,
        target: NodeId,
        connection: Option<ConnectionId>,
        direction: TravelDirection,
        animated: bool,
    ) {
        let from = self.current_node;
        self.events.push(MapEvent::MoveAccepted { from, to: target, direction });
        tracing::debug!(target: TRAVERSAL_TARGET, ?direction, animated, "movement accepted");

        if let Some(old) = from {
            for id in self.adjacent(old) {
                if let Some(node) = self.node_mut(id)
                    && behavior::on_move_nearby(node)
                {
                    self.events
                        .push(MapEvent::SelectableChanged { node: id, selectable: false });
                }
            }
        }
        self.previous_node = from;
        self.current_node = Some(target);

        let mut leave = HookTask::Done;
        if let Some(id) = from
            && let Some(node) = self.node(id)
        {
            leave = behavior::on_leave(node);
            self.events.push(MapEvent::Left { node: id });
        }
        self.transition =
            Some(Transition::new(from, target, connection, direction, animated, leave));
    }

    /// Nodes the player could move to from `id`.
    fn adjacent(&self, id: NodeId) -> Vec<NodeId> {
        let Some(graph) = graph_of(&self.maps, self.current_map) else {
            return Vec::new();
        };
        let mut adjacent: Vec<NodeId> = graph.successors(id).collect();
        if self.settings.allow_backtracking {
            for previous in graph.predecessors(id) {
                if !adjacent.contains(&previous) {
                    adjacent.push(previous);
                }
            }
        }
        adjacent
    }

    fn node(&self, id: NodeId) -> Option<&MapNode> {
        graph_of(&self.maps, self.current_map)?.node(id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MapNode> {
        let index = self.current_map?;
        self.maps.get_mut(index)?.graph_mut().node_mut(id)
    }

    fn apply_directives(&mut self, node: NodeId, directives: Vec<Directive>) {
        for directive in directives {
            match directive {
                Directive::HideMap => self.hide_current_map(),
                Directive::ShowMap => self.show_current_map(),
                Directive::PauseMovement(paused) => self.paused = paused,
                Directive::StartBattle { scene } => {
                    tracing::debug!(target: TRAVERSAL_TARGET, %scene, "battle requested");
                    self.events.push(MapEvent::BattleRequested { node, scene });
                }
                Directive::FinishBattle => self.events.push(MapEvent::BattleFinished { node }),
                Directive::NextMap => self.pending_next_maps += 1,
                Directive::Say { message } => self.say(message),
            }
        }
    }

    fn say(&mut self, message: String) {
        tracing::debug!(target: TRAVERSAL_TARGET, %message, "say");
        self.events.push(MapEvent::Say { message, duration: self.settings.say_duration });
    }
}

fn graph_of(maps: &[Map], index: Option<usize>) -> Option<&MapGraph> {
    maps.get(index?).map(Map::graph)
}
