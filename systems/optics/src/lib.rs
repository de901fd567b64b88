#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure beam-piece interaction rules consumed by the field resolver.
//!
//! Every function here is a function of the piece and beam values alone; the
//! crate holds no state and never touches the grid. The resolver asks
//! [`blocks_beam`] whether a piece absorbs an incoming beam, then routes
//! surviving beams through [`receive_beam`], which transforms the beam in
//! place, spawns split-off children, or asks for a teleport relay.

use lumengrid_core::{Beam, GridPos, LightColor, Piece, PieceKind};

/// How a beam continues after a piece interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Passage {
    /// The beam keeps travelling from its current cell.
    Onward,
    /// The beam must be relayed to the piece's partner teleporter.
    Teleport,
}

/// Reports whether the piece absorbs the incoming beam outright.
///
/// Absorption happens before any transformation: a blocked beam never
/// reaches [`receive_beam`].
#[must_use]
pub fn blocks_beam(piece: &Piece, beam: &Beam) -> bool {
    match piece.kind() {
        PieceKind::Wall | PieceKind::Source => true,
        PieceKind::Filter => !piece.color().overlaps(beam.color()),
        PieceKind::RoundFilter => match residue_quarter(piece.delta_direction(beam)) {
            0 => !beam.color().overlaps(LightColor::RED),
            1 => !beam.color().overlaps(LightColor::GREEN),
            2 => !beam.color().overlaps(LightColor::BLUE),
            _ => true,
        },
        PieceKind::Polarizer => {
            residue_quarter(piece.delta_direction(beam)) != 0
                || !piece.color().overlaps(beam.color())
        }
        PieceKind::Selector | PieceKind::Splicer => {
            residue_quarter(piece.delta_direction(beam)) != 0
        }
        _ => false,
    }
}

/// Applies the piece's interaction rule to a beam crossing its cell.
///
/// The beam is transformed in place; beams split off by prisms are pushed
/// onto `spawned` at the prism's cell with rotated headings. Unsupported
/// approach angles invalidate the beam, which the resolver reports as a
/// dissipation rather than an absorption.
pub fn receive_beam(piece: &Piece, beam: &mut Beam, spawned: &mut Vec<Beam>) -> Passage {
    let delta = piece.delta_direction(beam);
    match piece.kind() {
        PieceKind::Mirror => match delta {
            0 => beam.flip(),
            -1 => beam.rotate_left(2),
            1 => beam.rotate_right(2),
            _ => beam.invalidate(),
        },
        PieceKind::SkewMirror => match delta {
            0 => beam.rotate_right(3),
            -1 => beam.rotate_left(3),
            -2 => beam.rotate_left(1),
            1 => beam.rotate_right(1),
            _ => beam.invalidate(),
        },
        PieceKind::DoubleMirror => match delta {
            0 | 4 => beam.flip(),
            -1 | 3 => beam.rotate_left(2),
            1 | -3 => beam.rotate_right(2),
            _ => beam.invalidate(),
        },
        PieceKind::DoublePassMirror => match delta {
            0 | 4 => beam.flip(),
            -1 | 3 => beam.rotate_left(2),
            1 | -3 => beam.rotate_right(2),
            _ => {}
        },
        PieceKind::DoubleSkewMirror => match residue_quarter(delta) {
            0 => beam.rotate_right(3),
            1 => beam.rotate_right(1),
            2 => beam.rotate_left(1),
            _ => beam.rotate_left(3),
        },
        PieceKind::Refractor => match residue_quarter(delta) {
            0 => beam.rotate_right(1),
            1 => beam.rotate_left(1),
            _ => beam.invalidate(),
        },
        PieceKind::Bender => beam.rotate_right(1),
        PieceKind::Twister => beam.rotate_left(2),
        PieceKind::Tunnel => {
            if delta != 0 {
                beam.invalidate();
            }
        }
        PieceKind::ColorShifter => match delta {
            0 => beam.set_color(beam.color().shifted_toward_red()),
            4 => beam.set_color(beam.color().shifted_toward_blue()),
            _ => beam.invalidate(),
        },
        PieceKind::ColorInverter => {
            if residue_quarter(delta) == 0 {
                beam.set_color(beam.color().inverted());
            } else {
                beam.invalidate();
            }
        }
        PieceKind::CrossColorInverter => {
            if delta.rem_euclid(2) == 0 {
                beam.set_color(beam.color().inverted());
            } else {
                beam.invalidate();
            }
        }
        PieceKind::Filter | PieceKind::Polarizer => {
            beam.set_color(beam.color().filtered(piece.color()));
        }
        PieceKind::RoundFilter => match residue_quarter(delta) {
            0 => beam.set_color(beam.color().filtered(LightColor::RED)),
            1 => beam.set_color(beam.color().filtered(LightColor::GREEN)),
            2 => beam.set_color(beam.color().filtered(LightColor::BLUE)),
            // Residue 3 is absorbed by `blocks_beam`; receive leaves it alone.
            _ => {}
        },
        PieceKind::Splitter
        | PieceKind::ThreeWaySplitter
        | PieceKind::StarSplitter
        | PieceKind::DSplitter
        | PieceKind::DoubleSplitterMirror
        | PieceKind::Prism
        | PieceKind::FlippedPrism => {
            for offset in fan_out(piece.kind()) {
                let mut child = *beam;
                child.rotate_right(*offset);
                spawned.push(child);
            }
        }
        PieceKind::Teleporter => return Passage::Teleport,
        PieceKind::Wall
        | PieceKind::Glass
        | PieceKind::Source
        | PieceKind::Selector
        | PieceKind::Splicer
        | PieceKind::Tnt
        | PieceKind::Slime
        | PieceKind::Mine
        | PieceKind::StrictGoal => {}
    }
    Passage::Onward
}

/// Beam a piece emits at the start of a resolution pass, if any.
///
/// Only sources emit; the returned beam sits on the source's own cell and
/// must be advanced off it before interactions begin.
#[must_use]
pub fn emitted_beam(piece: &Piece, at: GridPos) -> Option<Beam> {
    match piece.kind() {
        PieceKind::Source => Some(Beam::new(at, piece.orientation(), piece.color())),
        _ => None,
    }
}

/// Clockwise heading offsets of the children a splitting piece spawns.
const fn fan_out(kind: PieceKind) -> &'static [i32] {
    match kind {
        PieceKind::Splitter => &[2],
        PieceKind::DSplitter => &[-1, 1],
        PieceKind::ThreeWaySplitter => &[-2, 2],
        PieceKind::StarSplitter => &[1, 2, 3, 4, 5, 6, 7],
        PieceKind::DoubleSplitterMirror => &[4],
        PieceKind::Prism => &[1],
        PieceKind::FlippedPrism => &[-1],
        _ => &[],
    }
}

fn residue_quarter(delta: i8) -> i8 {
    delta.rem_euclid(4)
}
