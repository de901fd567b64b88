//! Dense piece storage backing the field grid.

use lumengrid_core::{GridPos, Piece};

/// Row-major grid of optionally occupied cells.
///
/// The grid owns its pieces by value; there are no identifiers and no
/// back-references, so copying a piece out of a cell is always cheap and
/// mutation happens through the cell alone.
#[derive(Clone, Debug)]
pub(crate) struct PieceGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<Piece>>,
}

impl PieceGrid {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    pub(crate) fn clear(&mut self) {
        self.cells.fill(None);
    }

    pub(crate) fn contains(&self, position: GridPos) -> bool {
        position.is_valid()
            && i64::from(position.x()) < i64::from(self.columns)
            && i64::from(position.y()) < i64::from(self.rows)
    }

    pub(crate) fn piece_at(&self, position: GridPos) -> Option<Piece> {
        self.index(position)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    pub(crate) fn piece_at_mut(&mut self, position: GridPos) -> Option<&mut Piece> {
        let index = self.index(position)?;
        self.cells.get_mut(index).and_then(|slot| slot.as_mut())
    }

    pub(crate) fn occupy(&mut self, position: GridPos, piece: Piece) {
        if let Some(index) = self.index(position) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = Some(piece);
            }
        }
    }

    pub(crate) fn vacate(&mut self, position: GridPos) -> Option<Piece> {
        let index = self.index(position)?;
        self.cells.get_mut(index).and_then(|slot| slot.take())
    }

    /// Occupied cells paired with their pieces, in row-major order.
    pub(crate) fn occupied_cells(&self) -> Vec<(GridPos, Piece)> {
        let mut occupied = Vec::new();
        for (index, cell) in self.cells.iter().enumerate() {
            if let Some(piece) = cell {
                if let Some(position) = self.position_of(index) {
                    occupied.push((position, *piece));
                }
            }
        }
        occupied
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, position: GridPos) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let column = usize::try_from(position.x()).ok()?;
        let row = usize::try_from(position.y()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        Some(row * width + column)
    }

    fn position_of(&self, index: usize) -> Option<GridPos> {
        let width = usize::try_from(self.columns).ok()?;
        if width == 0 {
            return None;
        }
        let x = i32::try_from(index % width).ok()?;
        let y = i32::try_from(index / width).ok()?;
        Some(GridPos::new(x, y))
    }
}
