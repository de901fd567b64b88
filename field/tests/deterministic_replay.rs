use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use lumengrid_core::{
    BeamTrace, Command, Direction, Event, FieldLayout, GoalSnapshot, GridPos, LayoutError,
    LightColor, Piece, PieceKind, PlacedPiece, PlacementError, PlacementSnapshot, Rotation,
    RotationError,
};
use lumengrid_field::{self as field, query, Field};

#[test]
fn deterministic_replay_produces_identical_snapshots() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());

    assert!(first.solved, "the scripted session solves the level");
    assert!(
        matches!(
            first.events.last(),
            Some(EventRecord::PlacementRejected {
                reason: PlacementError::MissingStock,
                ..
            })
        ),
        "the trailing misplay must not disturb the solved state"
    );
    assert!(!first.traces.is_empty());
    assert_eq!(first.goals.len(), 1);
    assert!(first.goals[0].satisfied);
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let mut field = Field::new(1, 1);
    let mut log = Vec::new();

    for command in commands {
        let mut events = Vec::new();
        field::apply(&mut field, command, &mut events);
        log.extend(events.iter().map(EventRecord::from));
    }

    ReplayOutcome {
        placements: query::placements(&field).into_vec(),
        goals: query::goal_view(&field).into_vec(),
        traces: query::beam_traces(&field).into_vec(),
        solved: query::is_solved(&field),
        events: log,
    }
}

/// Loads a mirror-corner level, resolves it once unsolved, repositions the
/// mirror, solves it, and finishes with a rejected placement.
fn scripted_commands() -> Vec<Command> {
    let layout = FieldLayout::new(
        5,
        3,
        vec![
            PlacedPiece::new(
                Piece::locked(PieceKind::Source, Direction::East, LightColor::RED),
                GridPos::new(0, 2),
            ),
            PlacedPiece::new(
                Piece::locked(PieceKind::StrictGoal, Direction::North, LightColor::RED),
                GridPos::new(2, 0),
            ),
        ],
        vec![Piece::new(
            PieceKind::Mirror,
            Direction::North,
            LightColor::NONE,
        )],
    );
    let corner = GridPos::new(2, 2);

    vec![
        Command::LoadLayout { layout },
        Command::PlacePiece {
            slot: 0,
            at: GridPos::new(3, 1),
        },
        Command::Resolve,
        Command::MovePiece {
            from: GridPos::new(3, 1),
            to: corner,
        },
        Command::RotatePiece {
            at: corner,
            rotation: Rotation::Clockwise,
        },
        Command::RotatePiece {
            at: corner,
            rotation: Rotation::Clockwise,
        },
        Command::RotatePiece {
            at: corner,
            rotation: Rotation::Clockwise,
        },
        Command::Resolve,
        Command::PlacePiece {
            slot: 0,
            at: GridPos::new(1, 1),
        },
    ]
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    placements: Vec<PlacementSnapshot>,
    goals: Vec<GoalSnapshot>,
    traces: Vec<BeamTrace>,
    solved: bool,
    events: Vec<EventRecord>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum EventRecord {
    LayoutLoaded {
        columns: u32,
        rows: u32,
        placements: usize,
        stock: usize,
    },
    LayoutRejected {
        reason: LayoutError,
    },
    FieldCleared,
    PiecePlaced {
        kind: PieceKind,
        at: GridPos,
    },
    PieceMoved {
        from: GridPos,
        to: GridPos,
    },
    PieceReturned {
        kind: PieceKind,
        from: GridPos,
    },
    PieceRotated {
        at: GridPos,
        orientation: Direction,
    },
    PlacementRejected {
        at: GridPos,
        reason: PlacementError,
    },
    RotationRejected {
        at: GridPos,
        reason: RotationError,
    },
    FieldResolved {
        solved: bool,
        satisfied_goals: usize,
        total_goals: usize,
        beams: usize,
    },
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        match event {
            Event::LayoutLoaded {
                columns,
                rows,
                placements,
                stock,
            } => Self::LayoutLoaded {
                columns: *columns,
                rows: *rows,
                placements: *placements,
                stock: *stock,
            },
            Event::LayoutRejected { reason } => Self::LayoutRejected { reason: *reason },
            Event::FieldCleared => Self::FieldCleared,
            Event::PiecePlaced { kind, at } => Self::PiecePlaced {
                kind: *kind,
                at: *at,
            },
            Event::PieceMoved { from, to } => Self::PieceMoved {
                from: *from,
                to: *to,
            },
            Event::PieceReturned { kind, from } => Self::PieceReturned {
                kind: *kind,
                from: *from,
            },
            Event::PieceRotated { at, orientation } => Self::PieceRotated {
                at: *at,
                orientation: *orientation,
            },
            Event::PlacementRejected { at, reason } => Self::PlacementRejected {
                at: *at,
                reason: *reason,
            },
            Event::RotationRejected { at, reason } => Self::RotationRejected {
                at: *at,
                reason: *reason,
            },
            Event::FieldResolved {
                solved,
                satisfied_goals,
                total_goals,
                beams,
            } => Self::FieldResolved {
                solved: *solved,
                satisfied_goals: *satisfied_goals,
                total_goals: *total_goals,
                beams: *beams,
            },
        }
    }
}
