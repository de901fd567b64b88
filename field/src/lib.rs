#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative field state management for Lumengrid.

mod goals;
mod grid;
mod trace;

use lumengrid_core::{
    Command, Event, FieldLayout, GridPos, Piece, PlacementError, Rotation, RotationError,
};

use crate::grid::PieceGrid;
use crate::trace::Resolution;

/// Represents the authoritative Lumengrid field state.
///
/// The field owns the piece grid, the stock of unplaced pieces, and the
/// outcome of the most recent resolution pass. Every mutation goes through
/// [`apply`]; reads go through [`query`]. Any successful edit discards the
/// cached outcome, so stale traces are never observable.
#[derive(Debug)]
pub struct Field {
    grid: PieceGrid,
    stock: Vec<Piece>,
    outcome: Option<Resolution>,
}

impl Field {
    /// Creates an empty field with the given grid dimensions.
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            grid: PieceGrid::new(columns, rows),
            stock: Vec::new(),
            outcome: None,
        }
    }

    fn load_layout(&mut self, layout: FieldLayout, out_events: &mut Vec<Event>) {
        if let Err(reason) = layout.validate() {
            out_events.push(Event::LayoutRejected { reason });
            return;
        }
        self.grid = PieceGrid::new(layout.columns(), layout.rows());
        for placement in layout.placements() {
            self.grid.occupy(placement.at(), placement.piece());
        }
        self.stock = layout.stock().to_vec();
        self.outcome = None;
        out_events.push(Event::LayoutLoaded {
            columns: layout.columns(),
            rows: layout.rows(),
            placements: layout.placements().len(),
            stock: self.stock.len(),
        });
    }

    fn place_piece(&mut self, slot: usize, at: GridPos, out_events: &mut Vec<Event>) {
        if slot >= self.stock.len() {
            out_events.push(Event::PlacementRejected {
                at,
                reason: PlacementError::MissingStock,
            });
            return;
        }
        if !self.grid.contains(at) {
            out_events.push(Event::PlacementRejected {
                at,
                reason: PlacementError::OutOfBounds,
            });
            return;
        }
        if self.grid.piece_at(at).is_some() {
            out_events.push(Event::PlacementRejected {
                at,
                reason: PlacementError::Occupied,
            });
            return;
        }
        // Later slots shift down by one after the removal.
        let piece = self.stock.remove(slot);
        self.grid.occupy(at, piece);
        self.outcome = None;
        out_events.push(Event::PiecePlaced {
            kind: piece.kind(),
            at,
        });
    }

    fn move_piece(&mut self, from: GridPos, to: GridPos, out_events: &mut Vec<Event>) {
        let Some(piece) = self.grid.piece_at(from) else {
            out_events.push(Event::PlacementRejected {
                at: from,
                reason: PlacementError::VacantCell,
            });
            return;
        };
        if !piece.can_be_moved() {
            out_events.push(Event::PlacementRejected {
                at: from,
                reason: PlacementError::Immovable,
            });
            return;
        }
        if !self.grid.contains(to) {
            out_events.push(Event::PlacementRejected {
                at: to,
                reason: PlacementError::OutOfBounds,
            });
            return;
        }
        if self.grid.piece_at(to).is_some() {
            out_events.push(Event::PlacementRejected {
                at: to,
                reason: PlacementError::Occupied,
            });
            return;
        }
        let _ = self.grid.vacate(from);
        self.grid.occupy(to, piece);
        self.outcome = None;
        out_events.push(Event::PieceMoved { from, to });
    }

    fn return_piece(&mut self, from: GridPos, out_events: &mut Vec<Event>) {
        let Some(piece) = self.grid.piece_at(from) else {
            out_events.push(Event::PlacementRejected {
                at: from,
                reason: PlacementError::VacantCell,
            });
            return;
        };
        if !piece.can_be_moved() {
            out_events.push(Event::PlacementRejected {
                at: from,
                reason: PlacementError::Immovable,
            });
            return;
        }
        let _ = self.grid.vacate(from);
        self.stock.push(piece);
        self.outcome = None;
        out_events.push(Event::PieceReturned {
            kind: piece.kind(),
            from,
        });
    }

    fn rotate_piece(&mut self, at: GridPos, rotation: Rotation, out_events: &mut Vec<Event>) {
        let Some(piece) = self.grid.piece_at_mut(at) else {
            out_events.push(Event::RotationRejected {
                at,
                reason: RotationError::VacantCell,
            });
            return;
        };
        if !piece.can_be_rotated() {
            out_events.push(Event::RotationRejected {
                at,
                reason: RotationError::FixedOrientation,
            });
            return;
        }
        match rotation {
            Rotation::Clockwise => piece.rotate_right(),
            Rotation::CounterClockwise => piece.rotate_left(),
        }
        let orientation = piece.orientation();
        self.outcome = None;
        out_events.push(Event::PieceRotated { at, orientation });
    }

    fn resolve(&mut self, out_events: &mut Vec<Event>) {
        let resolution = trace::resolve(&self.grid);
        let total_goals = resolution.goals.len();
        let satisfied_goals = resolution
            .goals
            .values()
            .filter(|goal| goal.satisfied())
            .count();
        out_events.push(Event::FieldResolved {
            solved: resolution.solved,
            satisfied_goals,
            total_goals,
            beams: resolution.traces.len(),
        });
        self.outcome = Some(resolution);
    }
}

/// Applies the provided command to the field, mutating state deterministically.
pub fn apply(field: &mut Field, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadLayout { layout } => field.load_layout(layout, out_events),
        Command::ClearField => {
            field.grid.clear();
            field.stock.clear();
            field.outcome = None;
            out_events.push(Event::FieldCleared);
        }
        Command::PlacePiece { slot, at } => field.place_piece(slot, at, out_events),
        Command::MovePiece { from, to } => field.move_piece(from, to, out_events),
        Command::ReturnPiece { from } => field.return_piece(from, out_events),
        Command::RotatePiece { at, rotation } => field.rotate_piece(at, rotation, out_events),
        Command::Resolve => field.resolve(out_events),
    }
}

/// Query functions that provide read-only access to the field state.
pub mod query {
    use lumengrid_core::{
        AtlasTile, GoalSnapshot, GoalView, GridPos, LightColor, Piece, PieceKind,
        PlacementSnapshot, PlacementView, TraceView, GOAL_SATISFIED_ROW,
    };

    use super::Field;

    /// Grid dimensions of the field as `(columns, rows)`.
    #[must_use]
    pub fn dimensions(field: &Field) -> (u32, u32) {
        field.grid.dimensions()
    }

    /// Returns the piece occupying the given cell, if any.
    #[must_use]
    pub fn piece_at(field: &Field, at: GridPos) -> Option<Piece> {
        field.grid.piece_at(at)
    }

    /// Captures a read-only view of every occupied cell on the field.
    #[must_use]
    pub fn placements(field: &Field) -> PlacementView {
        let snapshots = field
            .grid
            .occupied_cells()
            .into_iter()
            .map(|(at, piece)| PlacementSnapshot { at, piece })
            .collect();
        PlacementView::from_snapshots(snapshots)
    }

    /// Pieces currently available for placement, in slot order.
    #[must_use]
    pub fn stock(field: &Field) -> Vec<Piece> {
        field.stock.clone()
    }

    /// Captures a read-only view of goal progress across the field.
    ///
    /// Before the first resolution pass, and after any edit, goals report
    /// reset progress: nothing received, darkness goals satisfied, color
    /// goals not.
    #[must_use]
    pub fn goal_view(field: &Field) -> GoalView {
        let snapshots = match &field.outcome {
            Some(resolution) => resolution
                .goals
                .iter()
                .map(|(at, progress)| GoalSnapshot {
                    at: *at,
                    target: progress.target(),
                    received: progress.received(),
                    satisfied: progress.satisfied(),
                })
                .collect(),
            None => field
                .grid
                .occupied_cells()
                .into_iter()
                .filter(|(_, piece)| piece.kind() == PieceKind::StrictGoal)
                .map(|(at, piece)| GoalSnapshot {
                    at,
                    target: piece.color(),
                    received: LightColor::NONE,
                    satisfied: piece.color().is_none(),
                })
                .collect(),
        };
        GoalView::from_snapshots(snapshots)
    }

    /// Captures the beam traces produced by the latest resolution pass.
    ///
    /// The view is empty until the field resolves, and empties again after
    /// any edit.
    #[must_use]
    pub fn beam_traces(field: &Field) -> TraceView {
        match &field.outcome {
            Some(resolution) => TraceView::from_traces(resolution.traces.clone()),
            None => TraceView::default(),
        }
    }

    /// Reports whether the latest resolution pass satisfied every goal.
    ///
    /// A field edited since its last pass reports unsolved.
    #[must_use]
    pub fn is_solved(field: &Field) -> bool {
        field
            .outcome
            .as_ref()
            .map_or(false, |resolution| resolution.solved)
    }

    /// Sprite-sheet tile for the piece at the given cell, if any.
    ///
    /// Goal pieces swap onto the satisfied strip once their requirement is
    /// met.
    #[must_use]
    pub fn gfx_tile(field: &Field, at: GridPos) -> Option<AtlasTile> {
        let piece = field.grid.piece_at(at)?;
        let tile = piece.gfx_tile();
        if piece.kind() == PieceKind::StrictGoal && goal_is_satisfied(field, at) {
            return Some(AtlasTile::new(tile.column(), GOAL_SATISFIED_ROW));
        }
        Some(tile)
    }

    fn goal_is_satisfied(field: &Field, at: GridPos) -> bool {
        match &field.outcome {
            Some(resolution) => resolution
                .goals
                .get(&at)
                .map_or(false, |goal| goal.satisfied()),
            None => field
                .grid
                .piece_at(at)
                .map_or(false, |piece| piece.color().is_none()),
        }
    }
}
