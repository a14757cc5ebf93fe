//! Nozzle layouts for single- and multi-channel pipettes.
//!
//! A [`NozzleMap`] is the active rectangle of a pipette's physical nozzle
//! grid. It is produced from a [`NozzleLayout`] request and consumed by the
//! engine's well-coverage geometry; nothing mutates it after construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a nozzle map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NozzleMapError {
    /// Nozzle name is not part of the physical grid.
    #[error("Nozzle not found on pipette: {0}")]
    UnknownNozzle(String),

    /// Corners do not describe a back-left to front-right rectangle.
    #[error("Invalid nozzle rectangle: {0}")]
    InvalidRectangle(String),

    /// Layout is not supported by this pipette.
    #[error("Unsupported nozzle layout: {0}")]
    UnsupportedLayout(String),
}

/// Physical nozzle grid of a pipette, rows back to front, columns left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalNozzleGrid {
    rows: Vec<String>,
    columns: Vec<String>,
}

impl PhysicalNozzleGrid {
    /// Grid for a pipette with the given channel count (1, 8 or 96).
    pub fn for_channels(channels: u32) -> Result<Self, NozzleMapError> {
        let (rows, columns) = match channels {
            1 => (1, 1),
            8 => (8, 1),
            96 => (8, 12),
            other => {
                return Err(NozzleMapError::UnsupportedLayout(format!(
                    "{other}-channel pipette"
                )));
            }
        };
        Ok(Self {
            rows: (0..rows).map(row_label).collect(),
            columns: (1..=columns).map(|c| c.to_string()).collect(),
        })
    }

    /// Number of physical nozzles.
    pub fn len(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    /// True for an empty grid.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn back_left(&self) -> String {
        format!("{}{}", self.rows[0], self.columns[0])
    }

    fn back_right(&self) -> String {
        format!("{}{}", self.rows[0], self.columns[self.columns.len() - 1])
    }

    fn front_left(&self) -> String {
        format!("{}{}", self.rows[self.rows.len() - 1], self.columns[0])
    }

    fn front_right(&self) -> String {
        format!(
            "{}{}",
            self.rows[self.rows.len() - 1],
            self.columns[self.columns.len() - 1]
        )
    }

    fn locate(&self, nozzle: &str) -> Result<(usize, usize), NozzleMapError> {
        let split = nozzle
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| NozzleMapError::UnknownNozzle(nozzle.to_string()))?;
        let (row, column) = nozzle.split_at(split);
        let r = self.rows.iter().position(|x| x == row);
        let c = self.columns.iter().position(|x| x == column);
        match (r, c) {
            (Some(r), Some(c)) => Ok((r, c)),
            _ => Err(NozzleMapError::UnknownNozzle(nozzle.to_string())),
        }
    }
}

fn row_label(index: usize) -> String {
    char::from(b'A' + index as u8).to_string()
}

/// Requested nozzle configuration, as carried by `configureNozzleLayout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "camelCase")]
pub enum NozzleLayout {
    /// Every nozzle active.
    All,
    /// One nozzle.
    #[serde(rename_all = "camelCase")]
    Single {
        /// Active nozzle, a grid corner.
        primary_nozzle: String,
    },
    /// One full column.
    #[serde(rename_all = "camelCase")]
    Column {
        /// `A1` selects the leftmost column, `A12` the rightmost.
        primary_nozzle: String,
    },
    /// One full row.
    #[serde(rename_all = "camelCase")]
    Row {
        /// `A1` selects the back row, `H1` the front row.
        primary_nozzle: String,
    },
    /// Part of a column on an 8-channel pipette.
    #[serde(rename_all = "camelCase")]
    PartialColumn {
        /// `A1` grows toward the front, `H1` toward the back.
        primary_nozzle: String,
        /// Far end of the active span.
        end_nozzle: String,
    },
}

/// Active subset of a pipette's nozzle grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NozzleMap {
    starting_nozzle: String,
    back_left: String,
    front_right: String,
    rows: Vec<(String, Vec<String>)>,
    columns: Vec<(String, Vec<String>)>,
    physical_nozzle_count: usize,
}

impl NozzleMap {
    /// Build the active rectangle spanning `back_left` to `front_right`.
    pub fn build(
        grid: &PhysicalNozzleGrid,
        starting_nozzle: &str,
        back_left: &str,
        front_right: &str,
    ) -> Result<Self, NozzleMapError> {
        let (r0, c0) = grid.locate(back_left)?;
        let (r1, c1) = grid.locate(front_right)?;
        let (rs, cs) = grid.locate(starting_nozzle)?;
        if r0 > r1 || c0 > c1 {
            return Err(NozzleMapError::InvalidRectangle(format!(
                "{back_left} is not back-left of {front_right}"
            )));
        }
        if !(r0..=r1).contains(&rs) || !(c0..=c1).contains(&cs) {
            return Err(NozzleMapError::InvalidRectangle(format!(
                "starting nozzle {starting_nozzle} outside {back_left}..{front_right}"
            )));
        }

        let rows = grid.rows[r0..=r1]
            .iter()
            .map(|row| {
                let names = grid.columns[c0..=c1]
                    .iter()
                    .map(|col| format!("{row}{col}"))
                    .collect();
                (row.clone(), names)
            })
            .collect();
        let columns = grid.columns[c0..=c1]
            .iter()
            .map(|col| {
                let names = grid.rows[r0..=r1]
                    .iter()
                    .map(|row| format!("{row}{col}"))
                    .collect();
                (col.clone(), names)
            })
            .collect();

        Ok(Self {
            starting_nozzle: starting_nozzle.to_string(),
            back_left: back_left.to_string(),
            front_right: front_right.to_string(),
            rows,
            columns,
            physical_nozzle_count: grid.len(),
        })
    }

    /// Map with every nozzle of the grid active, starting at A1.
    pub fn full(grid: &PhysicalNozzleGrid) -> Result<Self, NozzleMapError> {
        let back_left = grid.back_left();
        Self::build(grid, &back_left, &back_left, &grid.front_right())
    }

    /// Resolve a layout request against a physical grid.
    pub fn from_layout(
        grid: &PhysicalNozzleGrid,
        layout: &NozzleLayout,
    ) -> Result<Self, NozzleMapError> {
        let corners = [
            grid.back_left(),
            grid.back_right(),
            grid.front_left(),
            grid.front_right(),
        ];
        let require_corner = |nozzle: &str| {
            if corners.iter().any(|c| c == nozzle) {
                Ok(())
            } else {
                Err(NozzleMapError::UnsupportedLayout(format!(
                    "primary nozzle {nozzle} is not a grid corner"
                )))
            }
        };

        match layout {
            NozzleLayout::All => Self::full(grid),
            NozzleLayout::Single { primary_nozzle } => {
                require_corner(primary_nozzle)?;
                Self::build(grid, primary_nozzle, primary_nozzle, primary_nozzle)
            }
            NozzleLayout::Column { primary_nozzle } => {
                require_corner(primary_nozzle)?;
                let (_, c) = grid.locate(primary_nozzle)?;
                let col = &grid.columns[c];
                let back = format!("{}{col}", grid.rows[0]);
                let front = format!("{}{col}", grid.rows[grid.rows.len() - 1]);
                Self::build(grid, primary_nozzle, &back, &front)
            }
            NozzleLayout::Row { primary_nozzle } => {
                require_corner(primary_nozzle)?;
                let (r, _) = grid.locate(primary_nozzle)?;
                let row = &grid.rows[r];
                let left = format!("{row}{}", grid.columns[0]);
                let right = format!("{row}{}", grid.columns[grid.columns.len() - 1]);
                Self::build(grid, primary_nozzle, &left, &right)
            }
            NozzleLayout::PartialColumn {
                primary_nozzle,
                end_nozzle,
            } => {
                if grid.columns.len() != 1 {
                    return Err(NozzleMapError::UnsupportedLayout(
                        "partial column needs a single-column pipette".to_string(),
                    ));
                }
                require_corner(primary_nozzle)?;
                let (rp, _) = grid.locate(primary_nozzle)?;
                let (re, _) = grid.locate(end_nozzle)?;
                if rp <= re {
                    Self::build(grid, primary_nozzle, primary_nozzle, end_nozzle)
                } else {
                    Self::build(grid, primary_nozzle, end_nozzle, primary_nozzle)
                }
            }
        }
    }

    /// Nozzle the pipette positions over the addressed well.
    pub fn starting_nozzle(&self) -> &str {
        &self.starting_nozzle
    }

    /// Back-left corner of the active rectangle.
    pub fn back_left(&self) -> &str {
        &self.back_left
    }

    /// Front-right corner of the active rectangle.
    pub fn front_right(&self) -> &str {
        &self.front_right
    }

    /// Active rows, back to front, each with its active nozzles.
    pub fn rows(&self) -> &[(String, Vec<String>)] {
        &self.rows
    }

    /// Active columns, left to right, each with its active nozzles.
    pub fn columns(&self) -> &[(String, Vec<String>)] {
        &self.columns
    }

    /// Number of active nozzles.
    pub fn active_nozzle_count(&self) -> usize {
        self.rows.len() * self.columns.len()
    }

    /// True when every physical nozzle is active.
    pub fn is_full(&self) -> bool {
        self.active_nozzle_count() == self.physical_nozzle_count
    }
}
