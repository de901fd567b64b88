//! Beam resolution: seeding, advancement, interaction, and cycle detection.

use std::collections::{BTreeMap, HashSet, VecDeque};

use lumengrid_core::{Beam, BeamStep, BeamTrace, GridPos, PieceKind, TraceEnding};
use lumengrid_system_optics::{self as optics, Passage};

use crate::goals::GoalProgress;
use crate::grid::PieceGrid;

/// Outcome of one full resolution pass over a grid.
#[derive(Clone, Debug)]
pub(crate) struct Resolution {
    pub(crate) traces: Vec<BeamTrace>,
    pub(crate) goals: BTreeMap<GridPos, GoalProgress>,
    pub(crate) solved: bool,
}

/// Runs a complete resolution pass: resets every goal, seeds one beam per
/// source in row-major order, and walks each beam to a terminal outcome.
///
/// Termination is guaranteed per beam: every walk step either ends the
/// trace or records a previously unseen (position, heading, color) state,
/// and the state space is finite. Spawned beams inherit their parent's
/// visited states, which extends the same bound across split generations.
pub(crate) fn resolve(grid: &PieceGrid) -> Resolution {
    let placements = grid.occupied_cells();

    let mut goals: BTreeMap<GridPos, GoalProgress> = BTreeMap::new();
    for (position, piece) in &placements {
        if piece.kind() == PieceKind::StrictGoal {
            let _ = goals.insert(*position, GoalProgress::reset(piece.color()));
        }
    }

    let relays: Vec<GridPos> = placements
        .iter()
        .filter(|(_, piece)| piece.kind() == PieceKind::Teleporter)
        .map(|(position, _)| *position)
        .collect();

    let mut queue: VecDeque<PendingBeam> = VecDeque::new();
    for (position, piece) in &placements {
        if let Some(beam) = optics::emitted_beam(piece, *position) {
            queue.push_back(PendingBeam::seeded(beam));
        }
    }

    let mut traces = Vec::new();
    while let Some(pending) = queue.pop_front() {
        traces.push(walk(pending, grid, &relays, &mut goals, &mut queue));
    }

    let solved = goals.values().all(|goal| goal.satisfied());
    Resolution {
        traces,
        goals,
        solved,
    }
}

/// Walks one beam until it leaves the field, is absorbed, dissipates, or
/// revisits one of its own states.
fn walk(
    mut pending: PendingBeam,
    grid: &PieceGrid,
    relays: &[GridPos],
    goals: &mut BTreeMap<GridPos, GoalProgress>,
    queue: &mut VecDeque<PendingBeam>,
) -> BeamTrace {
    loop {
        if !grid.contains(pending.beam.position()) {
            return pending.into_trace(TraceEnding::LeftField);
        }
        if pending.visited.contains(&pending.beam) {
            return pending.into_trace(TraceEnding::Looped);
        }
        pending.record();

        if let Some(piece) = grid.piece_at(pending.beam.position()) {
            if let Some(goal) = goals.get_mut(&pending.beam.position()) {
                goal.absorb(&pending.beam);
            }
            if optics::blocks_beam(&piece, &pending.beam) {
                pending.beam.invalidate();
                return pending.into_trace(TraceEnding::Absorbed);
            }
            let mut spawned = Vec::new();
            match optics::receive_beam(&piece, &mut pending.beam, &mut spawned) {
                Passage::Onward => {}
                Passage::Teleport => {
                    if let Some(exit) = relay_exit(relays, pending.beam.position()) {
                        pending.beam.relocate(exit);
                    }
                }
            }
            for child in spawned {
                queue.push_back(PendingBeam::spawned(child, &pending.visited));
            }
            if !pending.beam.is_valid() {
                return pending.into_trace(TraceEnding::Dissipated);
            }
        }
        pending.beam.advance();
    }
}

/// Next teleporter after the entry cell in row-major order, wrapping.
///
/// A sole teleporter has no exit, so the beam passes through it.
fn relay_exit(relays: &[GridPos], entry: GridPos) -> Option<GridPos> {
    if relays.len() < 2 {
        return None;
    }
    let index = relays.iter().position(|relay| *relay == entry)?;
    Some(relays[(index + 1) % relays.len()])
}

/// A beam queued for walking together with its trajectory history.
struct PendingBeam {
    beam: Beam,
    visited: HashSet<Beam>,
    steps: Vec<BeamStep>,
}

impl PendingBeam {
    /// Registers the beam's birth cell and steps off it before interactions
    /// begin, so emitters and prisms never act on their own output.
    fn seeded(beam: Beam) -> Self {
        let mut pending = Self {
            beam,
            visited: HashSet::new(),
            steps: Vec::new(),
        };
        pending.record();
        pending.beam.advance();
        pending
    }

    /// Seeds a split-off child that inherits its parent's visited states.
    fn spawned(beam: Beam, inherited: &HashSet<Beam>) -> Self {
        let mut pending = Self {
            beam,
            visited: inherited.clone(),
            steps: Vec::new(),
        };
        pending.record();
        pending.beam.advance();
        pending
    }

    fn record(&mut self) {
        let _ = self.visited.insert(self.beam);
        self.steps.push(BeamStep {
            position: self.beam.position(),
            direction: self.beam.direction(),
            color: self.beam.color(),
        });
    }

    fn into_trace(self, ending: TraceEnding) -> BeamTrace {
        BeamTrace::new(self.steps, ending)
    }
}
