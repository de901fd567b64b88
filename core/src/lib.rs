#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lumengrid engine.
//!
//! This crate defines the message surface that connects level loaders, the
//! authoritative field, and pure systems. Callers submit [`Command`] values
//! describing desired mutations, the field executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! actually happened. Renderers and persistence layers consume the read-only
//! snapshot types produced by the field's query module and never touch field
//! state directly.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Single-step rotation senses available to rotate commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// One 45 degree step clockwise.
    Clockwise,
    /// One 45 degree step counter-clockwise.
    CounterClockwise,
}

/// Commands that express all permissible field mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Replaces the field's contents with the provided level description.
    LoadLayout {
        /// Grid dimensions, fixed placements, and player stock to install.
        layout: FieldLayout,
    },
    /// Empties every cell and the stock while keeping the grid dimensions.
    ClearField,
    /// Requests placement of a stocked piece onto a vacant cell.
    PlacePiece {
        /// Index of the piece within the field's stock.
        slot: usize,
        /// Cell that should receive the piece.
        at: GridPos,
    },
    /// Requests relocation of a placed piece to another vacant cell.
    MovePiece {
        /// Cell currently holding the piece.
        from: GridPos,
        /// Cell that should receive the piece.
        to: GridPos,
    },
    /// Requests that a placed piece return to the field's stock.
    ReturnPiece {
        /// Cell currently holding the piece.
        from: GridPos,
    },
    /// Requests a single-step rotation of a placed piece.
    RotatePiece {
        /// Cell holding the piece to rotate.
        at: GridPos,
        /// Sense in which to rotate the piece.
        rotation: Rotation,
    },
    /// Runs one full beam resolution pass over the current placements.
    Resolve,
}

/// Events broadcast by the field after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a layout replaced the field's contents.
    LayoutLoaded {
        /// Number of columns in the installed grid.
        columns: u32,
        /// Number of rows in the installed grid.
        rows: u32,
        /// Number of pieces placed onto cells by the layout.
        placements: usize,
        /// Number of pieces deposited into the stock by the layout.
        stock: usize,
    },
    /// Reports that a layout failed validation and was not installed.
    LayoutRejected {
        /// Specific invariant the layout violated.
        reason: LayoutError,
    },
    /// Confirms that every cell and the stock were emptied.
    FieldCleared,
    /// Confirms that a stocked piece was placed onto a cell.
    PiecePlaced {
        /// Kind of the placed piece.
        kind: PieceKind,
        /// Cell that received the piece.
        at: GridPos,
    },
    /// Confirms that a placed piece moved between two cells.
    PieceMoved {
        /// Cell the piece occupied before the move.
        from: GridPos,
        /// Cell the piece occupies after the move.
        to: GridPos,
    },
    /// Confirms that a placed piece returned to the stock.
    PieceReturned {
        /// Kind of the returned piece.
        kind: PieceKind,
        /// Cell the piece vacated.
        from: GridPos,
    },
    /// Confirms that a placed piece rotated one step.
    PieceRotated {
        /// Cell holding the rotated piece.
        at: GridPos,
        /// Orientation the piece now faces.
        orientation: Direction,
    },
    /// Reports that a place, move, or return request was rejected.
    PlacementRejected {
        /// Cell named by the rejected request.
        at: GridPos,
        /// Specific reason the request failed.
        reason: PlacementError,
    },
    /// Reports that a rotation request was rejected.
    RotationRejected {
        /// Cell named by the rejected request.
        at: GridPos,
        /// Specific reason the request failed.
        reason: RotationError,
    },
    /// Reports the outcome of a completed resolution pass.
    FieldResolved {
        /// Whether every goal on the field is satisfied.
        solved: bool,
        /// Number of goals currently satisfied.
        satisfied_goals: usize,
        /// Number of goals present on the field.
        total_goals: usize,
        /// Number of beams traced during the pass.
        beams: usize,
    },
}

/// Compass headings a beam may travel and a piece may face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing columns and decreasing rows.
    NorthEast,
    /// Toward increasing column indices.
    East,
    /// Toward increasing columns and increasing rows.
    SouthEast,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing columns and increasing rows.
    SouthWest,
    /// Toward decreasing column indices.
    West,
    /// Toward decreasing columns and decreasing rows.
    NorthWest,
}

impl Direction {
    /// All eight headings in clockwise order starting from north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Zero-based clockwise index of the heading, north first.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::NorthEast => 1,
            Direction::East => 2,
            Direction::SouthEast => 3,
            Direction::South => 4,
            Direction::SouthWest => 5,
            Direction::West => 6,
            Direction::NorthWest => 7,
        }
    }

    const fn from_index(value: i32) -> Self {
        Self::ALL[value.rem_euclid(8) as usize]
    }

    /// Heading reached by rotating counter-clockwise in 45 degree steps.
    ///
    /// Any step count is accepted, including negative and full-turn values;
    /// the result always lands on one of the eight compass points.
    #[must_use]
    pub const fn rotated_left(self, steps: i32) -> Self {
        Self::from_index(self.index() as i32 - steps)
    }

    /// Heading reached by rotating clockwise in 45 degree steps.
    #[must_use]
    pub const fn rotated_right(self, steps: i32) -> Self {
        Self::from_index(self.index() as i32 + steps)
    }

    /// Heading pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        self.rotated_right(4)
    }

    /// Unit cell offset travelled by one step along this heading.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }
}

/// Additive three-channel light mask carried by beams and pieces.
///
/// The low three bits map to red, green, and blue. Composite colors are
/// unions of channels, so yellow is red plus green and white lights all
/// three.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LightColor(u8);

impl LightColor {
    /// Absence of light.
    pub const NONE: LightColor = LightColor(0);
    /// Pure red channel.
    pub const RED: LightColor = LightColor(1);
    /// Pure green channel.
    pub const GREEN: LightColor = LightColor(2);
    /// Red and green channels combined.
    pub const YELLOW: LightColor = LightColor(3);
    /// Pure blue channel.
    pub const BLUE: LightColor = LightColor(4);
    /// Red and blue channels combined.
    pub const MAGENTA: LightColor = LightColor(5);
    /// Green and blue channels combined.
    pub const CYAN: LightColor = LightColor(6);
    /// All three channels combined.
    pub const WHITE: LightColor = LightColor(7);

    /// Creates a color from raw channel bits; bits beyond blue are dropped.
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits & Self::WHITE.0)
    }

    /// Raw channel bits of the color.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reports whether no channel is lit.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Reports whether the two colors share at least one lit channel.
    #[must_use]
    pub const fn overlaps(self, other: LightColor) -> bool {
        self.0 & other.0 != 0
    }

    /// Color remaining after passing through the provided gate.
    #[must_use]
    pub const fn filtered(self, gate: LightColor) -> Self {
        Self(self.0 & gate.0)
    }

    /// Color produced by combining the lit channels of both colors.
    #[must_use]
    pub const fn merged(self, other: LightColor) -> Self {
        Self(self.0 | other.0)
    }

    /// Color with every channel toggled.
    #[must_use]
    pub const fn inverted(self) -> Self {
        Self(!self.0 & Self::WHITE.0)
    }

    /// Cycles every lit channel one step toward red, red wrapping to blue.
    #[must_use]
    pub const fn shifted_toward_red(self) -> Self {
        Self((self.0 >> 1) | ((self.0 & Self::RED.0) << 2))
    }

    /// Cycles every lit channel one step toward blue, blue wrapping to red.
    #[must_use]
    pub const fn shifted_toward_blue(self) -> Self {
        Self(((self.0 << 1) & Self::WHITE.0) | ((self.0 & Self::BLUE.0) >> 2))
    }
}

/// Location of a single field cell expressed as signed column and row
/// coordinates.
///
/// Coordinates are signed so a beam may step past any edge of the field
/// before the resolver retires it. The sentinel [`GridPos::INVALID`] marks
/// positions no field contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    x: i32,
    y: i32,
}

impl GridPos {
    /// Sentinel position that lies outside every field.
    pub const INVALID: GridPos = GridPos { x: -1, y: -1 };

    /// Creates a new cell position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Reports whether the position could lie inside a field.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    /// Neighboring position one step away along the provided heading.
    #[must_use]
    pub const fn stepped(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A travelling unit of light: a position, a heading, and a color mask.
///
/// Equality and hashing cover all three fields. The resolver keys its cycle
/// detection on complete beam states, so revisiting a cell counts as a loop
/// only when heading and color also repeat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Beam {
    position: GridPos,
    direction: Direction,
    color: LightColor,
}

impl Beam {
    /// Creates a beam at the provided position, heading, and color.
    #[must_use]
    pub const fn new(position: GridPos, direction: Direction, color: LightColor) -> Self {
        Self {
            position,
            direction,
            color,
        }
    }

    /// Cell the beam currently occupies.
    #[must_use]
    pub const fn position(&self) -> GridPos {
        self.position
    }

    /// Heading the beam currently travels.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Color mask the beam currently carries.
    #[must_use]
    pub const fn color(&self) -> LightColor {
        self.color
    }

    /// Advances the beam one cell along its heading.
    pub fn advance(&mut self) {
        self.position = self.position.stepped(self.direction);
    }

    /// Rotates the heading counter-clockwise in 45 degree steps.
    pub fn rotate_left(&mut self, steps: i32) {
        self.direction = self.direction.rotated_left(steps);
    }

    /// Rotates the heading clockwise in 45 degree steps.
    pub fn rotate_right(&mut self, steps: i32) {
        self.direction = self.direction.rotated_right(steps);
    }

    /// Reverses the heading.
    pub fn flip(&mut self) {
        self.direction = self.direction.opposite();
    }

    /// Moves the beam to the provided cell without changing heading or color.
    pub fn relocate(&mut self, position: GridPos) {
        self.position = position;
    }

    /// Replaces the beam's color mask.
    pub fn set_color(&mut self, color: LightColor) {
        self.color = color;
    }

    /// Retires the beam by moving it to the invalid sentinel.
    pub fn invalidate(&mut self) {
        self.position = GridPos::INVALID;
    }

    /// Reports whether the beam still occupies a plausible field position.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.position.is_valid()
    }
}

/// Concrete piece kinds a field cell may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    /// Opaque block that absorbs every beam.
    Wall,
    /// Transparent block that beams cross untouched.
    Glass,
    /// Emitter that seeds one beam per resolution pass.
    Source,
    /// Flat mirror that reflects beams striking its face.
    Mirror,
    /// Mirror angled to reflect in 45 and 135 degree bounces.
    SkewMirror,
    /// Mirror silvered on both faces.
    DoubleMirror,
    /// Double-faced mirror that lets unsupported beams pass through.
    DoublePassMirror,
    /// Double-faced variant of the skew mirror.
    DoubleSkewMirror,
    /// Double-faced mirror that also retro-reflects a split copy.
    DoubleSplitterMirror,
    /// Lens that nudges near-axis beams a half step sideways.
    Refractor,
    /// Fixed prism bending every beam one step clockwise.
    Bender,
    /// Prism twisting every beam a quarter turn counter-clockwise.
    Twister,
    /// Conduit passing beams along its axis and destroying all others.
    Tunnel,
    /// Crystal cycling beam channels along the spectrum.
    ColorShifter,
    /// Crystal replacing a beam's color with its complement.
    ColorInverter,
    /// Color inverter that accepts beams on both grid axes.
    CrossColorInverter,
    /// Tinted pane passing only its own channels.
    Filter,
    /// Rotatable filter passing one primary channel per facing.
    RoundFilter,
    /// Axis-locked filter combining a tint with a direction gate.
    Polarizer,
    /// Axis gate reserved for channel-routing experiments.
    Selector,
    /// Axis gate that recombines routed channels.
    Splicer,
    /// Prism duplicating a beam at a right angle.
    Splitter,
    /// Prism duplicating a beam to both sides.
    ThreeWaySplitter,
    /// Prism spraying duplicates along every other heading.
    StarSplitter,
    /// Prism duplicating a beam to both adjacent headings.
    DSplitter,
    /// Prism splitting one step clockwise.
    Prism,
    /// Prism splitting one step counter-clockwise.
    FlippedPrism,
    /// Portal relaying beams to the next portal on the field.
    Teleporter,
    /// Explosive charge; inert to light.
    Tnt,
    /// Sticky hazard; inert to light.
    Slime,
    /// Buried charge; inert to light.
    Mine,
    /// Receiver that must collect exactly its target color on one axis.
    StrictGoal,
}

impl PieceKind {
    /// Reports whether the kind has an orientation the player could change.
    #[must_use]
    pub const fn supports_rotation(self) -> bool {
        !matches!(
            self,
            PieceKind::Wall
                | PieceKind::Glass
                | PieceKind::Bender
                | PieceKind::Filter
                | PieceKind::StarSplitter
                | PieceKind::Teleporter
                | PieceKind::Tnt
                | PieceKind::Mine
        )
    }
}

/// A puzzle piece occupying one field cell.
///
/// Pieces are plain values owned by the grid; they carry no references back
/// into the field. The `movable` and `rotatable` flags let layouts lock
/// individual pieces independently of their kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    kind: PieceKind,
    orientation: Direction,
    color: LightColor,
    movable: bool,
    rotatable: bool,
}

impl Piece {
    /// Creates a piece the player may both move and rotate.
    #[must_use]
    pub const fn new(kind: PieceKind, orientation: Direction, color: LightColor) -> Self {
        Self {
            kind,
            orientation,
            color,
            movable: true,
            rotatable: true,
        }
    }

    /// Creates a piece fixed to its cell but free to rotate.
    #[must_use]
    pub const fn immovable(kind: PieceKind, orientation: Direction, color: LightColor) -> Self {
        Self {
            kind,
            orientation,
            color,
            movable: false,
            rotatable: true,
        }
    }

    /// Creates a piece free to move but locked to its orientation.
    #[must_use]
    pub const fn rotation_locked(
        kind: PieceKind,
        orientation: Direction,
        color: LightColor,
    ) -> Self {
        Self {
            kind,
            orientation,
            color,
            movable: true,
            rotatable: false,
        }
    }

    /// Creates a piece the player may neither move nor rotate.
    #[must_use]
    pub const fn locked(kind: PieceKind, orientation: Direction, color: LightColor) -> Self {
        Self {
            kind,
            orientation,
            color,
            movable: false,
            rotatable: false,
        }
    }

    /// Kind of the piece.
    #[must_use]
    pub const fn kind(&self) -> PieceKind {
        self.kind
    }

    /// Heading the piece currently faces.
    #[must_use]
    pub const fn orientation(&self) -> Direction {
        self.orientation
    }

    /// Color the piece emits, filters toward, or expects.
    #[must_use]
    pub const fn color(&self) -> LightColor {
        self.color
    }

    /// Reports whether the player may move the piece to another cell.
    #[must_use]
    pub const fn can_be_moved(&self) -> bool {
        self.movable
    }

    /// Reports whether the player may rotate the piece.
    ///
    /// Requires both the per-piece flag and a kind that supports
    /// orientation at all.
    #[must_use]
    pub const fn can_be_rotated(&self) -> bool {
        self.rotatable && self.kind.supports_rotation()
    }

    /// Rotates the piece one step counter-clockwise.
    pub fn rotate_left(&mut self) {
        self.orientation = self.orientation.rotated_left(1);
    }

    /// Rotates the piece one step clockwise.
    pub fn rotate_right(&mut self) {
        self.orientation = self.orientation.rotated_right(1);
    }

    /// Signed offset from the piece's facing to the beam's heading.
    ///
    /// Normalized into `(-4, 4]`: an exact half turn always reports `4`,
    /// never `-4`. Every reflection and gating rule keys off this value.
    #[must_use]
    pub const fn delta_direction(&self, beam: &Beam) -> i8 {
        let mut delta = beam.direction().index() as i8 - self.orientation.index() as i8;
        if delta > 4 {
            delta -= 8;
        } else if delta < -4 {
            delta += 8;
        } else if delta == -4 {
            delta = 4;
        }
        delta
    }

    /// Sprite sheet cell used to draw the piece.
    ///
    /// Goal pieces report their pending-row sprite; the field's query layer
    /// swaps in [`GOAL_SATISFIED_ROW`] once the goal is met.
    #[must_use]
    pub const fn gfx_tile(&self) -> AtlasTile {
        let rot = self.orientation.index();
        let color = self.color.bits();
        match self.kind {
            PieceKind::Wall => AtlasTile::new(13, 7),
            PieceKind::Glass => AtlasTile::new(11, 7),
            PieceKind::Source => AtlasTile::new(rot, 1),
            PieceKind::Mirror => AtlasTile::new(rot, 0),
            PieceKind::SkewMirror => AtlasTile::new(rot, 10),
            PieceKind::DoubleMirror => AtlasTile::new(rot % 4 + 4, 5),
            PieceKind::DoublePassMirror => AtlasTile::new(rot % 4, 12),
            PieceKind::DoubleSkewMirror => AtlasTile::new(rot % 4, 11),
            PieceKind::DoubleSplitterMirror => AtlasTile::new(rot % 4 + 4, 11),
            PieceKind::Refractor => AtlasTile::new(rot % 4, 5),
            PieceKind::Bender => AtlasTile::new(14, 7),
            PieceKind::Twister => AtlasTile::new(12, 7),
            PieceKind::Tunnel => AtlasTile::new(rot, 6),
            PieceKind::ColorShifter => AtlasTile::new(rot, 8),
            PieceKind::ColorInverter => AtlasTile::new(rot, 7),
            PieceKind::CrossColorInverter => AtlasTile::new(4 + rot % 2, 9),
            PieceKind::Filter => AtlasTile::new(color + 8, 8),
            PieceKind::RoundFilter => AtlasTile::new(rot % 4, 9),
            PieceKind::Polarizer => AtlasTile::new(color + 8, 9 + rot % 4),
            PieceKind::Selector => AtlasTile::new(rot, 12 + color),
            PieceKind::Splicer => AtlasTile::new(rot, 19 + color),
            PieceKind::Splitter => AtlasTile::new(rot, 2),
            // The sheet reuses the three-way strip for flipped prisms.
            PieceKind::ThreeWaySplitter | PieceKind::FlippedPrism => AtlasTile::new(rot + 8, 17),
            PieceKind::StarSplitter => AtlasTile::new(10, 7),
            PieceKind::DSplitter => AtlasTile::new(rot, 3),
            PieceKind::Prism => AtlasTile::new(rot, 4),
            PieceKind::Teleporter => AtlasTile::new(9, 7),
            PieceKind::Tnt => AtlasTile::new(15, 7),
            PieceKind::Slime => AtlasTile::new(8, 7),
            PieceKind::Mine => AtlasTile::new(8, 8),
            PieceKind::StrictGoal => AtlasTile::new(color + 8, GOAL_PENDING_ROW),
        }
    }
}

/// Atlas row holding goal sprites that await satisfaction.
pub const GOAL_PENDING_ROW: u8 = 13;

/// Atlas row holding satisfied goal sprites.
pub const GOAL_SATISFIED_ROW: u8 = 14;

/// Column and row of a sprite inside the piece atlas.
///
/// Purely cosmetic; the simulation never reads tiles back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AtlasTile {
    column: u8,
    row: u8,
}

impl AtlasTile {
    /// Creates an atlas tile reference.
    #[must_use]
    pub const fn new(column: u8, row: u8) -> Self {
        Self { column, row }
    }

    /// Zero-based column of the sprite within the atlas.
    #[must_use]
    pub const fn column(&self) -> u8 {
        self.column
    }

    /// Zero-based row of the sprite within the atlas.
    #[must_use]
    pub const fn row(&self) -> u8 {
        self.row
    }
}

/// In-memory description of a level: grid dimensions, fixed placements, and
/// the stock of pieces handed to the player.
///
/// How layouts reach memory is the loader's concern; the field only ever
/// sees this value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    columns: u32,
    rows: u32,
    placements: Vec<PlacedPiece>,
    stock: Vec<Piece>,
}

impl FieldLayout {
    /// Creates a layout from dimensions, placements, and stock.
    #[must_use]
    pub const fn new(
        columns: u32,
        rows: u32,
        placements: Vec<PlacedPiece>,
        stock: Vec<Piece>,
    ) -> Self {
        Self {
            columns,
            rows,
            placements,
            stock,
        }
    }

    /// Number of columns in the layout's grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the layout's grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Pieces the layout pins to specific cells.
    #[must_use]
    pub fn placements(&self) -> &[PlacedPiece] {
        &self.placements
    }

    /// Pieces the layout deposits into the player's stock.
    #[must_use]
    pub fn stock(&self) -> &[Piece] {
        &self.stock
    }

    /// Reports whether the position lies inside the layout's grid.
    #[must_use]
    pub fn contains(&self, position: GridPos) -> bool {
        position.is_valid()
            && i64::from(position.x()) < i64::from(self.columns)
            && i64::from(position.y()) < i64::from(self.rows)
    }

    /// Checks the structural invariants of the layout.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: a degenerate grid, a placement
    /// outside the grid, or two placements claiming the same cell.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(LayoutError::EmptyGrid);
        }
        let mut claimed = HashSet::new();
        for placement in &self.placements {
            let at = placement.at();
            if !self.contains(at) {
                return Err(LayoutError::PlacementOutOfBounds { at });
            }
            if !claimed.insert(at) {
                return Err(LayoutError::OverlappingPlacements { at });
            }
        }
        Ok(())
    }
}

/// A piece pinned to a specific cell by a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacedPiece {
    piece: Piece,
    at: GridPos,
}

impl PlacedPiece {
    /// Creates a placement of the provided piece at the provided cell.
    #[must_use]
    pub const fn new(piece: Piece, at: GridPos) -> Self {
        Self { piece, at }
    }

    /// Piece the placement installs.
    #[must_use]
    pub const fn piece(&self) -> Piece {
        self.piece
    }

    /// Cell the placement claims.
    #[must_use]
    pub const fn at(&self) -> GridPos {
        self.at
    }
}

/// Reasons a field layout fails validation at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum LayoutError {
    /// The layout describes a grid with no columns or no rows.
    #[error("layout grid must have at least one column and one row")]
    EmptyGrid,
    /// A placement names a cell outside the layout's grid.
    #[error("placement at {at} lies outside the layout grid")]
    PlacementOutOfBounds {
        /// Cell named by the offending placement.
        at: GridPos,
    },
    /// Two placements claim the same cell.
    #[error("multiple placements claim the cell at {at}")]
    OverlappingPlacements {
        /// Cell claimed more than once.
        at: GridPos,
    },
}

/// Reasons a place, move, or return request may be rejected by the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The named stock slot holds no piece.
    MissingStock,
    /// The named cell lies outside the field's grid.
    OutOfBounds,
    /// The named cell already holds a piece.
    Occupied,
    /// The named cell holds no piece to act on.
    VacantCell,
    /// The piece at the named cell is fixed to its cell.
    Immovable,
}

/// Reasons a rotation request may be rejected by the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationError {
    /// The named cell holds no piece to rotate.
    VacantCell,
    /// The piece at the named cell cannot change orientation.
    FixedOrientation,
}

/// One recorded beam state: the cell it crossed and how it crossed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BeamStep {
    /// Cell the beam occupied.
    pub position: GridPos,
    /// Heading the beam travelled while crossing the cell.
    pub direction: Direction,
    /// Color the beam carried while crossing the cell.
    pub color: LightColor,
}

/// Terminal outcome of a traced beam.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraceEnding {
    /// The beam stepped across an edge of the field.
    LeftField,
    /// A piece absorbed the beam.
    Absorbed,
    /// An interaction destroyed the beam in place.
    Dissipated,
    /// The beam revisited one of its own earlier states.
    Looped,
}

/// Complete path of a single beam from emission to retirement.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BeamTrace {
    steps: Vec<BeamStep>,
    ending: TraceEnding,
}

impl BeamTrace {
    /// Creates a trace from recorded steps and a terminal outcome.
    #[must_use]
    pub const fn new(steps: Vec<BeamStep>, ending: TraceEnding) -> Self {
        Self { steps, ending }
    }

    /// Recorded states in travel order, one per cell crossed.
    #[must_use]
    pub fn steps(&self) -> &[BeamStep] {
        &self.steps
    }

    /// How the beam retired.
    #[must_use]
    pub const fn ending(&self) -> TraceEnding {
        self.ending
    }
}

/// Read-only collection of the beam paths produced by a resolution pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceView {
    traces: Vec<BeamTrace>,
}

impl TraceView {
    /// Creates a view over traces in their emission order.
    #[must_use]
    pub fn from_traces(traces: Vec<BeamTrace>) -> Self {
        Self { traces }
    }

    /// Iterator over the captured traces in emission order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &BeamTrace> {
        self.traces.iter()
    }

    /// Consumes the view, yielding the underlying traces.
    #[must_use]
    pub fn into_vec(self) -> Vec<BeamTrace> {
        self.traces
    }
}

/// Immutable representation of a single goal's progress used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GoalSnapshot {
    /// Cell holding the goal piece.
    pub at: GridPos,
    /// Color the goal must collect, or none to demand darkness.
    pub target: LightColor,
    /// Union of every beam color the goal absorbed this pass.
    pub received: LightColor,
    /// Whether the goal's requirement is currently met.
    pub satisfied: bool,
}

/// Read-only snapshot describing all goals on the field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoalView {
    snapshots: Vec<GoalSnapshot>,
}

impl GoalView {
    /// Creates a new goal view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<GoalSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| (snapshot.at.y(), snapshot.at.x()));
        Self { snapshots }
    }

    /// Iterator over the captured goal snapshots in row-major order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &GoalSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<GoalSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single occupied cell used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlacementSnapshot {
    /// Cell holding the piece.
    pub at: GridPos,
    /// Piece occupying the cell.
    pub piece: Piece,
}

/// Read-only snapshot describing every occupied cell on the field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlacementView {
    snapshots: Vec<PlacementSnapshot>,
}

impl PlacementView {
    /// Creates a new placement view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PlacementSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| (snapshot.at.y(), snapshot.at.x()));
        Self { snapshots }
    }

    /// Iterator over the captured placements in row-major order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &PlacementSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PlacementSnapshot> {
        self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Beam, Direction, FieldLayout, GridPos, LayoutError, LightColor, Piece, PieceKind,
        PlacedPiece, PlacementError, RotationError,
    };
    use proptest::prelude::*;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn rotation_wraps_past_north() {
        assert_eq!(Direction::NorthWest.rotated_right(1), Direction::North);
        assert_eq!(Direction::North.rotated_left(1), Direction::NorthWest);
    }

    #[test]
    fn opposite_is_a_half_turn() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite(), direction.rotated_right(4));
            assert_eq!(direction.opposite().opposite(), direction);
        }
    }

    #[test]
    fn offsets_cover_the_unit_neighborhood() {
        let center = GridPos::new(2, 2);
        let reached: Vec<GridPos> = Direction::ALL
            .iter()
            .map(|direction| center.stepped(*direction))
            .collect();
        assert_eq!(reached.len(), 8);
        for (index, position) in reached.iter().enumerate() {
            assert_ne!(*position, center);
            for other in reached.iter().skip(index + 1) {
                assert_ne!(position, other);
            }
        }
        assert_eq!(center.stepped(Direction::North), GridPos::new(2, 1));
        assert_eq!(center.stepped(Direction::SouthWest), GridPos::new(1, 3));
    }

    #[test]
    fn half_turn_delta_always_reports_positive_four() {
        let beam_east = Beam::new(GridPos::new(0, 0), Direction::East, LightColor::WHITE);
        let beam_west = Beam::new(GridPos::new(0, 0), Direction::West, LightColor::WHITE);
        let facing_west = Piece::new(PieceKind::Mirror, Direction::West, LightColor::NONE);
        let facing_east = Piece::new(PieceKind::Mirror, Direction::East, LightColor::NONE);
        assert_eq!(facing_west.delta_direction(&beam_east), 4);
        assert_eq!(facing_east.delta_direction(&beam_west), 4);
    }

    #[test]
    fn near_wrap_deltas_stay_small() {
        let beam_north = Beam::new(GridPos::new(0, 0), Direction::North, LightColor::WHITE);
        let facing_north_west =
            Piece::new(PieceKind::Mirror, Direction::NorthWest, LightColor::NONE);
        assert_eq!(facing_north_west.delta_direction(&beam_north), 1);

        let beam_north_west = Beam::new(GridPos::new(0, 0), Direction::NorthWest, LightColor::WHITE);
        let facing_north = Piece::new(PieceKind::Mirror, Direction::North, LightColor::NONE);
        assert_eq!(facing_north.delta_direction(&beam_north_west), -1);
    }

    #[test]
    fn channel_shifts_cycle_the_primaries() {
        assert_eq!(LightColor::RED.shifted_toward_blue(), LightColor::GREEN);
        assert_eq!(LightColor::GREEN.shifted_toward_blue(), LightColor::BLUE);
        assert_eq!(LightColor::BLUE.shifted_toward_blue(), LightColor::RED);
        assert_eq!(LightColor::RED.shifted_toward_red(), LightColor::BLUE);
        assert_eq!(LightColor::GREEN.shifted_toward_red(), LightColor::RED);
        assert_eq!(LightColor::BLUE.shifted_toward_red(), LightColor::GREEN);
        assert_eq!(LightColor::WHITE.shifted_toward_blue(), LightColor::WHITE);
        assert_eq!(LightColor::NONE.shifted_toward_red(), LightColor::NONE);
    }

    #[test]
    fn beam_advances_along_its_heading() {
        let mut beam = Beam::new(GridPos::new(3, 3), Direction::SouthEast, LightColor::RED);
        beam.advance();
        assert_eq!(beam.position(), GridPos::new(4, 4));
        beam.flip();
        beam.advance();
        assert_eq!(beam.position(), GridPos::new(3, 3));
        assert_eq!(beam.direction(), Direction::NorthWest);
    }

    #[test]
    fn invalidated_beam_reports_invalid() {
        let mut beam = Beam::new(GridPos::new(0, 0), Direction::North, LightColor::WHITE);
        assert!(beam.is_valid());
        beam.invalidate();
        assert!(!beam.is_valid());
        assert_eq!(beam.position(), GridPos::INVALID);
    }

    #[test]
    fn kind_gates_rotation_regardless_of_flags() {
        let wall = Piece::new(PieceKind::Wall, Direction::North, LightColor::NONE);
        assert!(!wall.can_be_rotated());
        let mirror = Piece::new(PieceKind::Mirror, Direction::North, LightColor::NONE);
        assert!(mirror.can_be_rotated());
        let pinned = Piece::rotation_locked(PieceKind::Mirror, Direction::North, LightColor::NONE);
        assert!(!pinned.can_be_rotated());
        assert!(pinned.can_be_moved());
        let fixture = Piece::locked(PieceKind::Source, Direction::East, LightColor::RED);
        assert!(!fixture.can_be_moved());
        assert!(!fixture.can_be_rotated());
    }

    #[test]
    fn layout_validation_accepts_a_plain_level() {
        let layout = FieldLayout::new(
            4,
            3,
            vec![PlacedPiece::new(
                Piece::locked(PieceKind::Source, Direction::East, LightColor::RED),
                GridPos::new(0, 1),
            )],
            vec![Piece::new(
                PieceKind::Mirror,
                Direction::North,
                LightColor::NONE,
            )],
        );
        assert_eq!(layout.validate(), Ok(()));
    }

    #[test]
    fn layout_validation_rejects_degenerate_grids() {
        let layout = FieldLayout::new(0, 3, Vec::new(), Vec::new());
        assert_eq!(layout.validate(), Err(LayoutError::EmptyGrid));
    }

    #[test]
    fn layout_validation_rejects_escaping_placements() {
        let at = GridPos::new(4, 0);
        let layout = FieldLayout::new(
            4,
            3,
            vec![PlacedPiece::new(
                Piece::new(PieceKind::Wall, Direction::North, LightColor::NONE),
                at,
            )],
            Vec::new(),
        );
        assert_eq!(
            layout.validate(),
            Err(LayoutError::PlacementOutOfBounds { at })
        );
    }

    #[test]
    fn layout_validation_rejects_overlapping_placements() {
        let at = GridPos::new(1, 1);
        let wall = Piece::new(PieceKind::Wall, Direction::North, LightColor::NONE);
        let layout = FieldLayout::new(
            4,
            3,
            vec![PlacedPiece::new(wall, at), PlacedPiece::new(wall, at)],
            Vec::new(),
        );
        assert_eq!(
            layout.validate(),
            Err(LayoutError::OverlappingPlacements { at })
        );
    }

    #[test]
    fn gfx_tiles_follow_the_atlas_layout() {
        let wall = Piece::new(PieceKind::Wall, Direction::North, LightColor::NONE);
        assert_eq!(wall.gfx_tile().column(), 13);
        assert_eq!(wall.gfx_tile().row(), 7);

        let mirror = Piece::new(PieceKind::Mirror, Direction::NorthEast, LightColor::NONE);
        assert_eq!(mirror.gfx_tile().column(), 1);
        assert_eq!(mirror.gfx_tile().row(), 0);

        let double = Piece::new(PieceKind::DoubleMirror, Direction::South, LightColor::NONE);
        assert_eq!(double.gfx_tile().column(), 4);
        assert_eq!(double.gfx_tile().row(), 5);

        let filter = Piece::new(PieceKind::Filter, Direction::North, LightColor::MAGENTA);
        assert_eq!(filter.gfx_tile().column(), 13);
        assert_eq!(filter.gfx_tile().row(), 8);

        let goal = Piece::locked(PieceKind::StrictGoal, Direction::North, LightColor::CYAN);
        assert_eq!(goal.gfx_tile().column(), 14);
        assert_eq!(goal.gfx_tile().row(), super::GOAL_PENDING_ROW);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn layout_round_trips_through_bincode() {
        let layout = FieldLayout::new(
            5,
            4,
            vec![PlacedPiece::new(
                Piece::locked(PieceKind::Source, Direction::East, LightColor::WHITE),
                GridPos::new(0, 2),
            )],
            vec![Piece::new(
                PieceKind::Splitter,
                Direction::North,
                LightColor::NONE,
            )],
        );
        assert_round_trip(&layout);
    }

    #[test]
    fn piece_round_trips_through_bincode() {
        let piece = Piece::immovable(PieceKind::RoundFilter, Direction::SouthWest, LightColor::NONE);
        assert_round_trip(&piece);
    }

    #[test]
    fn rejection_reasons_round_trip_through_bincode() {
        assert_round_trip(&PlacementError::Occupied);
        assert_round_trip(&RotationError::FixedOrientation);
        assert_round_trip(&LayoutError::PlacementOutOfBounds {
            at: GridPos::new(9, 9),
        });
    }

    proptest! {
        #[test]
        fn rotations_invert_for_every_direction(index in 0usize..8, steps in -64i32..64) {
            let direction = Direction::ALL[index];
            prop_assert_eq!(direction.rotated_left(steps).rotated_right(steps), direction);
            prop_assert_eq!(direction.rotated_right(steps).rotated_left(steps), direction);
        }

        #[test]
        fn rotation_results_stay_on_the_compass(index in 0usize..8, steps in -1000i32..1000) {
            let direction = Direction::ALL[index];
            let rotated = direction.rotated_right(steps);
            prop_assert!(Direction::ALL.contains(&rotated));
        }

        #[test]
        fn delta_direction_stays_in_range(facing in 0usize..8, heading in 0usize..8) {
            let piece = Piece::new(
                PieceKind::Mirror,
                Direction::ALL[facing],
                LightColor::NONE,
            );
            let beam = Beam::new(
                GridPos::new(0, 0),
                Direction::ALL[heading],
                LightColor::WHITE,
            );
            let delta = piece.delta_direction(&beam);
            prop_assert!((-3..=4).contains(&delta));
        }

        #[test]
        fn invert_is_an_involution(bits in 0u8..8) {
            let color = LightColor::new(bits);
            prop_assert_eq!(color.inverted().inverted(), color);
        }

        #[test]
        fn filtering_is_idempotent(bits in 0u8..8, gate in 0u8..8) {
            let color = LightColor::new(bits);
            let gate = LightColor::new(gate);
            prop_assert_eq!(color.filtered(gate), color.filtered(gate).filtered(gate));
        }

        #[test]
        fn merging_is_commutative(a in 0u8..8, b in 0u8..8) {
            let a = LightColor::new(a);
            let b = LightColor::new(b);
            prop_assert_eq!(a.merged(b), b.merged(a));
        }

        #[test]
        fn channel_shifts_invert_each_other(bits in 0u8..8) {
            let color = LightColor::new(bits);
            prop_assert_eq!(color.shifted_toward_blue().shifted_toward_red(), color);
            prop_assert_eq!(color.shifted_toward_red().shifted_toward_blue(), color);
        }
    }
}
