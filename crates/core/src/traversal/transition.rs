//! Phase machine for one move along a connection, stepped once per tick.

use std::mem;

use super::*;

use crate::behavior::{HookContext, Progress};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Step {
    /// Run the next phase within the same tick.
    Continue,
    /// Wait for the next tick.
    Yield,
    Finished,
}

#[derive(Clone, Debug)]
pub(super) struct Transition {
    pub(super) from: Option<NodeId>,
    pub(super) to: NodeId,
    connection: Option<ConnectionId>,
    direction: TravelDirection,
    animated: bool,
    pub(super) phase: Phase,
}

#[derive(Clone, Debug)]
pub(super) enum Phase {
    Leaving(HookTask),
    Traveling(Travel),
    Encounter { travel: Travel, hidden: NodeId, stage: EncounterStage },
    Arriving(HookTask),
    Settling,
}

#[derive(Clone, Debug)]
pub(super) enum EncounterStage {
    Arriving(HookTask),
    Leaving(HookTask),
}

#[derive(Clone, Debug)]
pub(super) struct Travel {
    elapsed: f32,
    /// Last progress reported; hidden nodes fire when a boundary lies in `(progress, next]`.
    progress: f32,
    hidden_count: usize,
}

impl Travel {
    fn new(hidden_count: usize) -> Self {
        Self { elapsed: 0.0, progress: 0.0, hidden_count }
    }

    fn boundary(&self, slot: usize) -> f32 {
        (slot + 1) as f32 / (self.hidden_count + 1) as f32
    }

    /// First hidden slot crossed when moving from the last progress to `next`.
    fn next_crossing(&self, next: f32) -> Option<usize> {
        (0..self.hidden_count).find(|slot| {
            let boundary = self.boundary(*slot);
            self.progress < boundary && boundary <= next
        })
    }
}

impl Transition {
    pub(super) fn new(
        from: Option<NodeId>,
        to: NodeId,
        connection: Option<ConnectionId>,
        direction: TravelDirection,
        animated: bool,
        leave: HookTask,
    ) -> Self {
        Self { from, to, connection, direction, animated, phase: Phase::Leaving(leave) }
    }

    pub(super) fn progress(&self) -> Option<f32> {
        match &self.phase {
            Phase::Traveling(travel) | Phase::Encounter { travel, .. } => Some(travel.progress),
            _ => None,
        }
    }
}

impl MapTraversal {
    pub(super) fn step_transition(
        &mut self,
        transition: &mut Transition,
        budget: &mut f32,
    ) -> Step {
        let phase = mem::replace(&mut transition.phase, Phase::Settling);
        let (phase, step) = self.step_phase(transition, phase, budget);
        transition.phase = phase;
        step
    }

    fn step_phase(
        &mut self,
        transition: &Transition,
        phase: Phase,
        budget: &mut f32,
    ) -> (Phase, Step) {
        match phase {
            Phase::Leaving(mut task) => {
                if let Some(from) = transition.from
                    && self.run_task(&mut task, from, budget) == Progress::Running
                {
                    return (Phase::Leaving(task), Step::Yield);
                }
                self.start_travel(transition);
                if transition.animated {
                    (Phase::Traveling(Travel::new(self.hidden_count(transition))), Step::Continue)
                } else {
                    (self.arrive(transition.to), Step::Continue)
                }
            }
            Phase::Traveling(mut travel) => {
                if self.paused {
                    return (Phase::Traveling(travel), Step::Yield);
                }
                travel.elapsed += mem::take(budget);
                let movement_time = self.settings.movement_time;
                let next = if movement_time > 0.0 {
                    (travel.elapsed / movement_time).min(1.0)
                } else {
                    1.0
                };

                if let Some(slot) = travel.next_crossing(next) {
                    travel.progress = travel.boundary(slot);
                    return match self.reveal(transition, slot, travel.hidden_count) {
                        Some((hidden, task)) => {
                            let stage = EncounterStage::Arriving(task);
                            (Phase::Encounter { travel, hidden, stage }, Step::Continue)
                        }
                        None => (Phase::Traveling(travel), Step::Continue),
                    };
                }

                travel.progress = next;
                if next >= 1.0 {
                    (self.arrive(transition.to), Step::Continue)
                } else {
                    (Phase::Traveling(travel), Step::Yield)
                }
            }
            Phase::Encounter { travel, hidden, stage } => match stage {
                EncounterStage::Arriving(mut task) => {
                    if self.run_task(&mut task, hidden, budget) == Progress::Running {
                        let stage = EncounterStage::Arriving(task);
                        return (Phase::Encounter { travel, hidden, stage }, Step::Yield);
                    }
                    let task = match self.node(hidden) {
                        Some(node) => behavior::on_leave(node),
                        None => HookTask::Done,
                    };
                    self.events.push(MapEvent::Left { node: hidden });
                    let stage = EncounterStage::Leaving(task);
                    (Phase::Encounter { travel, hidden, stage }, Step::Continue)
                }
                EncounterStage::Leaving(mut task) => {
                    if self.run_task(&mut task, hidden, budget) == Progress::Running {
                        let stage = EncounterStage::Leaving(task);
                        return (Phase::Encounter { travel, hidden, stage }, Step::Yield);
                    }
                    (Phase::Traveling(travel), Step::Continue)
                }
            },
            Phase::Arriving(mut task) => {
                if self.run_task(&mut task, transition.to, budget) == Progress::Running {
                    return (Phase::Arriving(task), Step::Yield);
                }
                for id in self.adjacent(transition.to) {
                    if let Some(node) = self.node_mut(id)
                        && !node.hidden
                        && behavior::on_approach(node)
                    {
                        self.events
                            .push(MapEvent::SelectableChanged { node: id, selectable: true });
                    }
                }
                (Phase::Settling, Step::Continue)
            }
            Phase::Settling if self.paused => (Phase::Settling, Step::Yield),
            Phase::Settling => (Phase::Settling, Step::Finished),
        }
    }

    /// Says a travel or return line of the connection and runs the target's move-towards hook.
    fn start_travel(&mut self, transition: &Transition) {
        let message = transition
            .connection
            .and_then(|id| graph_of(&self.maps, self.current_map)?.connection(id))
            .and_then(|connection| {
                connection.pick_message(transition.direction, &mut self.messages)
            })
            .map(str::to_string);
        if let Some(message) = message {
            self.say(message);
        }

        let mut directives = Vec::new();
        if let Some(node) = self.node(transition.to) {
            behavior::on_move_towards(node, &mut directives);
        }
        self.apply_directives(transition.to, directives);
    }

    fn hidden_count(&self, transition: &Transition) -> usize {
        transition
            .connection
            .and_then(|id| graph_of(&self.maps, self.current_map)?.connection(id))
            .map_or(0, |connection| connection.hidden_nodes.len())
    }

    /// Marks the hidden node in `slot` revealed and runs its arrive hook.
    ///
    /// Slots count from the node being left, so a backtracking walk meets the hidden nodes of
    /// the connection in reverse order.
    fn reveal(
        &mut self,
        transition: &Transition,
        slot: usize,
        hidden_count: usize,
    ) -> Option<(NodeId, HookTask)> {
        let connection = transition.connection?;
        let index = match transition.direction {
            TravelDirection::Forward => slot,
            TravelDirection::Backtrack => hidden_count.checked_sub(slot + 1)?,
        };
        let hidden = *graph_of(&self.maps, self.current_map)?
            .connection(connection)?
            .hidden_nodes
            .get(index)?;

        let node = self.node_mut(hidden)?;
        node.revealed = true;
        tracing::debug!(target: TRAVERSAL_TARGET, node = %node.name, "hidden node revealed");
        self.events.push(MapEvent::HiddenNodeRevealed { node: hidden, connection });
        self.events.push(MapEvent::Arrived { node: hidden });

        let mut directives = Vec::new();
        let task = behavior::on_arrive(self.node(hidden)?, &mut directives);
        self.apply_directives(hidden, directives);
        Some((hidden, task))
    }

    fn arrive(&mut self, to: NodeId) -> Phase {
        self.events.push(MapEvent::Arrived { node: to });
        let mut directives = Vec::new();
        let task = match self.node(to) {
            Some(node) => behavior::on_arrive(node, &mut directives),
            None => HookTask::Done,
        };
        self.apply_directives(to, directives);
        Phase::Arriving(task)
    }

    /// Steps a hook task; a real task consumes the rest of the tick.
    fn run_task(&mut self, task: &mut HookTask, node: NodeId, budget: &mut f32) -> Progress {
        if *task == HookTask::Done {
            return Progress::Done;
        }
        let combat = self.combat;
        let battle_cooldown = self.settings.battle_cooldown;
        let dt = mem::take(budget);
        let mut directives = Vec::new();
        let progress = match self.node_mut(node) {
            Some(map_node) => task.step(map_node, &mut HookContext {
                combat: &combat,
                dt,
                battle_cooldown,
                directives: &mut directives,
            }),
            None => Progress::Done,
        };
        self.apply_directives(node, directives);
        progress
    }
}
