//! Fluid stack tracking for pipette tips.
//!
//! A tip can hold alternating segments of working liquid and air. The
//! stack keeps them in physical order: index 0 is the physical top of the
//! column, the last element is the segment nearest the tip opening and is
//! the first to leave on a dispense.

use serde::Serialize;
use std::fmt;
use tracing::error;
use vial_common::consts::VOLUME_TOLERANCE;

/// What a segment in the tip is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FluidKind {
    /// Protocol liquid.
    Liquid,
    /// Air gap.
    Air,
}

/// One contiguous segment inside a tip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AspiratedFluid {
    /// Segment kind.
    pub kind: FluidKind,
    /// Segment volume in µL.
    pub volume: f64,
}

impl AspiratedFluid {
    /// Build a segment.
    pub const fn new(kind: FluidKind, volume: f64) -> Self {
        Self { kind, volume }
    }
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= VOLUME_TOLERANCE.max(1e-8 * b.abs())
}

/// Ordered air/liquid segments; adjacent segments never share a kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FluidStack {
    segments: Vec<AspiratedFluid>,
}

impl FluidStack {
    /// Empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Segments from physical top to the tip opening.
    pub fn segments(&self) -> &[AspiratedFluid] {
        &self.segments
    }

    /// True when nothing is in the tip.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Push fluid at the tip opening, merging with a segment of the same kind.
    pub fn add_fluid(&mut self, new: AspiratedFluid) {
        match self.segments.last_mut() {
            Some(last) if last.kind == new.kind => last.volume += new.volume,
            _ => self.segments.push(new),
        }
    }

    /// Remove `volume` starting at the tip opening.
    ///
    /// Removing more than is present empties the stack and logs the
    /// deficit; it never fails.
    pub fn remove_fluid(&mut self, volume: f64) {
        let mut remaining = volume;
        let mut keep = self.segments.len();

        while remaining > 0.0 {
            if keep == 0 {
                error!(
                    left_over = remaining,
                    "Attempting to remove more fluid than present, {remaining}uL left over"
                );
                self.segments.clear();
                return;
            }
            let segment = &mut self.segments[keep - 1];
            if is_close(segment.volume, remaining) {
                keep -= 1;
                remaining = 0.0;
            } else if segment.volume < remaining {
                remaining -= segment.volume;
                keep -= 1;
            } else {
                segment.volume -= remaining;
                remaining = 0.0;
            }
        }
        self.segments.truncate(keep);
    }

    /// Total volume, optionally of one kind only. An empty stack holds `+0.0`.
    pub fn aspirated_volume(&self, kind: Option<FluidKind>) -> f64 {
        self.segments
            .iter()
            .filter(|s| kind.is_none_or(|k| s.kind == k))
            .fold(0.0, |total, s| total + s.volume)
    }

    /// How much of the next `volume` µL leaving the tip is liquid.
    pub fn liquid_part_of_dispense_volume(&self, volume: f64) -> f64 {
        let mut remaining = volume;
        let mut liquid = 0.0;
        for segment in self.segments.iter().rev() {
            let taken = segment.volume.min(remaining);
            if segment.kind == FluidKind::Liquid {
                liquid += taken;
            }
            remaining -= taken;
            if is_close(remaining, 0.0) {
                break;
            }
        }
        liquid
    }
}

impl fmt::Display for FluidStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "empty");
        }
        write!(f, "(top)")?;
        for (i, s) in self.segments.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{:?}:{}", s.kind, s.volume)?;
        }
        write!(f, " (bottom)")
    }
}
