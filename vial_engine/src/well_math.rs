//! Well-coverage geometry.
//!
//! Maps an active nozzle rectangle onto the wells it physically reaches.
//! Labware is compared against the SBS 96 grid (12 columns by 8 rows):
//! denser labware gets one nozzle per well, sparser labware (reservoirs)
//! pools several nozzles into each well.

use thiserror::Error;
use vial_common::consts::{SBS_COLUMNS, SBS_ROWS};
use vial_common::nozzle::NozzleMap;

/// Errors from well-coverage computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WellMathError {
    /// Labware is denser than SBS 96 on one axis and sparser on the other.
    #[error("Labware of non-SBS and non-reservoir format cannot be handled: {0}")]
    MixedDensity(String),

    /// Target well is not part of the labware.
    #[error("Well name {0} is not present in labware")]
    WellNotInLabware(String),

    /// Nozzle map starts from a nozzle that is not a grid corner.
    #[error("A nozzle configuration may not start at nozzle {0}")]
    InvalidStartingNozzle(String),

    /// Labware has no wells.
    #[error("Labware has no wells")]
    EmptyLabware,
}

/// Grid corner a nozzle configuration starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartCorner {
    A1,
    A12,
    H1,
    H12,
}

impl StartCorner {
    fn of(nozzle_map: &NozzleMap) -> Result<Self, WellMathError> {
        match nozzle_map.starting_nozzle() {
            "A1" => Ok(Self::A1),
            "A12" => Ok(Self::A12),
            "H1" => Ok(Self::H1),
            "H12" => Ok(Self::H12),
            other => Err(WellMathError::InvalidStartingNozzle(other.to_string())),
        }
    }

    /// Column grows rightward from the target.
    fn column_forward(self) -> bool {
        matches!(self, Self::A1 | Self::H1)
    }

    /// Row grows toward the front from the target.
    fn row_forward(self) -> bool {
        matches!(self, Self::A1 | Self::A12)
    }
}

fn step(index: usize, offset: usize, forward: bool, len: usize) -> Option<usize> {
    if forward {
        index.checked_add(offset).filter(|i| *i < len)
    } else {
        index.checked_sub(offset)
    }
}

/// Row and column index of `target_well` within column-major well names.
pub fn row_col_ordinals(
    target_well: &str,
    wells_by_column: &[Vec<String>],
) -> Result<(usize, usize), WellMathError> {
    wells_by_column
        .iter()
        .enumerate()
        .find_map(|(c, column)| column.iter().position(|w| w == target_well).map(|r| (r, c)))
        .ok_or_else(|| WellMathError::WellNotInLabware(target_well.to_string()))
}

fn dimensions(wells_by_column: &[Vec<String>]) -> Result<(usize, usize), WellMathError> {
    let rows = wells_by_column.first().map(Vec::len).unwrap_or(0);
    if rows == 0 {
        return Err(WellMathError::EmptyLabware);
    }
    Ok((wells_by_column.len(), rows))
}

/// Wells covered by `nozzle_map` when its starting nozzle sits over `target_well`.
pub fn wells_covered(
    nozzle_map: &NozzleMap,
    target_well: &str,
    wells_by_column: &[Vec<String>],
) -> Result<Vec<String>, WellMathError> {
    let (columns, rows) = dimensions(wells_by_column)?;
    if columns >= SBS_COLUMNS && rows >= SBS_ROWS {
        wells_covered_dense(nozzle_map, target_well, wells_by_column)
    } else if columns <= SBS_COLUMNS && rows <= SBS_ROWS {
        wells_covered_sparse(nozzle_map, target_well, wells_by_column)
    } else {
        Err(WellMathError::MixedDensity(format!(
            "{columns} columns by {rows} rows"
        )))
    }
}

/// One nozzle per well on labware at least as dense as SBS 96.
///
/// Nozzle offsets are scaled by the integer downsample factor, so a column
/// on a 384 plate touches every other row.
pub fn wells_covered_dense(
    nozzle_map: &NozzleMap,
    target_well: &str,
    wells_by_column: &[Vec<String>],
) -> Result<Vec<String>, WellMathError> {
    let (target_row, target_column) = row_col_ordinals(target_well, wells_by_column)?;
    let (columns, rows) = dimensions(wells_by_column)?;
    let column_downsample = columns / SBS_COLUMNS;
    let row_downsample = rows / SBS_ROWS;
    if column_downsample < 1 || row_downsample < 1 {
        return Err(WellMathError::MixedDensity(
            "labware is less dense than SBS 96".to_string(),
        ));
    }
    let corner = StartCorner::of(nozzle_map)?;

    let mut covered = Vec::with_capacity(nozzle_map.active_nozzle_count());
    for nozzle_column in 0..nozzle_map.columns().len() {
        let Some(c) = step(
            target_column,
            nozzle_column * column_downsample,
            corner.column_forward(),
            columns,
        ) else {
            continue;
        };
        for nozzle_row in 0..nozzle_map.rows().len() {
            let column = &wells_by_column[c];
            if let Some(r) = step(
                target_row,
                nozzle_row * row_downsample,
                corner.row_forward(),
                column.len(),
            ) {
                covered.push(column[r].clone());
            }
        }
    }
    Ok(covered)
}

/// Pooled coverage on labware sparser than SBS 96, such as reservoirs.
pub fn wells_covered_sparse(
    nozzle_map: &NozzleMap,
    target_well: &str,
    wells_by_column: &[Vec<String>],
) -> Result<Vec<String>, WellMathError> {
    let (target_row, target_column) = row_col_ordinals(target_well, wells_by_column)?;
    let (columns, rows) = dimensions(wells_by_column)?;
    let column_upsample = SBS_COLUMNS / columns;
    let row_upsample = SBS_ROWS / rows;
    if column_upsample < 1 || row_upsample < 1 {
        return Err(WellMathError::MixedDensity(
            "labware is more dense than SBS 96".to_string(),
        ));
    }
    let corner = StartCorner::of(nozzle_map)?;

    let span_columns = (nozzle_map.columns().len() / column_upsample).max(1);
    let span_rows = (nozzle_map.rows().len() / row_upsample).max(1);
    let mut covered = Vec::with_capacity(span_columns * span_rows);
    for nozzle_column in 0..span_columns {
        let Some(c) = step(target_column, nozzle_column, corner.column_forward(), columns) else {
            continue;
        };
        for nozzle_row in 0..span_rows {
            let column = &wells_by_column[c];
            if let Some(r) = step(target_row, nozzle_row, corner.row_forward(), column.len()) {
                covered.push(column[r].clone());
            }
        }
    }
    Ok(covered)
}

/// How many active nozzles enter each covered well.
pub fn nozzles_per_well(
    nozzle_map: &NozzleMap,
    target_well: &str,
    wells_by_column: &[Vec<String>],
) -> Result<usize, WellMathError> {
    let (_, target_column) = row_col_ordinals(target_well, wells_by_column)?;
    let labware_columns = wells_by_column.len();
    let labware_rows = wells_by_column[target_column].len();
    let nozzle_columns = nozzle_map.columns().len();
    let nozzle_rows = nozzle_map.rows().len();
    if labware_columns >= nozzle_columns && labware_rows >= nozzle_rows {
        return Ok(1);
    }
    Ok((nozzle_columns / labware_columns).max(1) * (nozzle_rows / labware_rows).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vial_common::nozzle::{NozzleLayout, PhysicalNozzleGrid};

    fn grid(columns: usize, rows: usize) -> Vec<Vec<String>> {
        (1..=columns)
            .map(|c| {
                (0..rows)
                    .map(|r| format!("{}{c}", char::from(b'A' + r as u8)))
                    .collect()
            })
            .collect()
    }

    fn map96(start: &str, back_left: &str, front_right: &str) -> NozzleMap {
        let grid = PhysicalNozzleGrid::for_channels(96).unwrap();
        NozzleMap::build(&grid, start, back_left, front_right).unwrap()
    }

    fn column8() -> NozzleMap {
        let grid = PhysicalNozzleGrid::for_channels(8).unwrap();
        NozzleMap::full(&grid).unwrap()
    }

    #[test]
    fn full_96_on_96_plate() {
        let wells = grid(12, 8);
        let covered = wells_covered(&map96("A1", "A1", "H12"), "A1", &wells).unwrap();
        assert_eq!(covered.len(), 96);
        assert_eq!(covered[0], "A1");
        assert_eq!(covered[95], "H12");
    }

    #[test]
    fn sub_rectangle_on_96_plate() {
        let wells = grid(12, 8);
        let covered = wells_covered(&map96("A1", "A1", "E2"), "A1", &wells).unwrap();
        assert_eq!(
            covered,
            ["A1", "B1", "C1", "D1", "E1", "A2", "B2", "C2", "D2", "E2"]
        );
    }

    #[test]
    fn column_on_384_skips_rows() {
        let wells = grid(24, 16);
        let covered = wells_covered(&column8(), "A1", &wells).unwrap();
        assert_eq!(covered, ["A1", "C1", "E1", "G1", "I1", "K1", "M1", "O1"]);
        let covered = wells_covered(&column8(), "B1", &wells).unwrap();
        assert_eq!(covered, ["B1", "D1", "F1", "H1", "J1", "L1", "N1", "P1"]);
    }

    #[test]
    fn out_of_bounds_nozzles_are_dropped() {
        let wells = grid(12, 8);
        let covered = wells_covered(&column8(), "E1", &wells).unwrap();
        assert_eq!(covered, ["E1", "F1", "G1", "H1"]);
    }

    #[test]
    fn back_right_start_walks_left() {
        let wells = grid(12, 8);
        let covered = wells_covered(&map96("A12", "A11", "B12"), "A12", &wells).unwrap();
        assert_eq!(covered, ["A12", "B12", "A11", "B11"]);
    }

    #[test]
    fn front_start_walks_back() {
        let grid8 = PhysicalNozzleGrid::for_channels(8).unwrap();
        let layout = NozzleLayout::PartialColumn {
            primary_nozzle: "H1".into(),
            end_nozzle: "F1".into(),
        };
        let map = NozzleMap::from_layout(&grid8, &layout).unwrap();
        let covered = wells_covered(&map, "H3", &grid(12, 8)).unwrap();
        assert_eq!(covered, ["H3", "G3", "F3"]);
    }

    #[test]
    fn full_96_on_12_column_reservoir() {
        let wells = grid(12, 1);
        let map = map96("A1", "A1", "H12");
        assert_eq!(wells_covered(&map, "A1", &wells).unwrap().len(), 12);
        let covered = wells_covered(&map, "A8", &wells).unwrap();
        assert_eq!(covered, ["A8", "A9", "A10", "A11", "A12"]);
        assert_eq!(nozzles_per_well(&map, "A1", &wells).unwrap(), 8);
    }

    #[test]
    fn single_well_reservoir_pools_every_nozzle() {
        let wells = grid(1, 1);
        let map = map96("A1", "A1", "H12");
        assert_eq!(wells_covered(&map, "A1", &wells).unwrap(), ["A1"]);
        assert_eq!(nozzles_per_well(&map, "A1", &wells).unwrap(), 96);
        assert_eq!(nozzles_per_well(&column8(), "A1", &wells).unwrap(), 8);
    }

    #[test]
    fn dense_labware_has_one_nozzle_per_well() {
        let wells = grid(24, 16);
        let map = map96("A1", "A1", "H12");
        assert_eq!(nozzles_per_well(&map, "A1", &wells).unwrap(), 1);
    }

    #[test]
    fn mixed_density_is_rejected() {
        let wells = grid(24, 4);
        let err = wells_covered(&column8(), "A1", &wells).unwrap_err();
        assert!(matches!(err, WellMathError::MixedDensity(_)));
    }

    #[test]
    fn unknown_well_is_rejected() {
        let err = wells_covered(&column8(), "Z9", &grid(12, 8)).unwrap_err();
        assert_eq!(err, WellMathError::WellNotInLabware("Z9".into()));
    }

    #[test]
    fn ordinals() {
        assert_eq!(row_col_ordinals("C4", &grid(12, 8)).unwrap(), (2, 3));
    }
}
