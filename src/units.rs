//! Metric/imperial scaling from field values to internal units.
//!
//! Positions are kept in motor steps. With a precision factor of 1000 and 31 bits of signed
//! range, the reachable build volume is `2^31 / steps_per_mm / 1000` mm per axis, about 671mm
//! for a 1/16 microstepped M6 threaded rod.

use crate::{
    decimal::{decimal_to_int, DecimalValue},
    Error,
};

/// Per axis motor resolution, read once from the machine configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepsPerMm {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub e: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
    E,
}

impl Axis {
    pub(crate) const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
            Axis::E => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct AxisScale {
    per_meter: i64,
    per_inch: i64,
}

/// Integer scale tables derived from [`StepsPerMm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scale {
    axes: [AxisScale; 4],
}

impl Scale {
    pub fn new(steps: &StepsPerMm) -> Self {
        let axis = |mm: f64| AxisScale {
            per_meter: i64::from((mm * 1000.0) as u32),
            per_inch: (25.4 * mm) as i64,
        };
        Self {
            axes: [axis(steps.x), axis(steps.y), axis(steps.z), axis(steps.e)],
        }
    }

    pub fn steps_per_meter(&self, axis: Axis) -> i64 {
        self.axes[axis.index()].per_meter
    }

    pub fn steps_per_inch(&self, axis: Axis) -> i64 {
        self.axes[axis.index()].per_inch
    }

    /// Converts a coordinate to steps.
    pub fn axis(&self, axis: Axis, value: &DecimalValue, inches: bool) -> Result<i64, Error> {
        let s = &self.axes[axis.index()];
        if inches {
            decimal_to_int(value, s.per_inch, 1)
        } else {
            decimal_to_int(value, s.per_meter, 1000)
        }
    }
}

/// Feed rates stay raw; only the planner knows the move length and step count needed to turn
/// them into a step rate.
pub fn feed(value: &DecimalValue, inches: bool) -> Result<i64, Error> {
    if inches {
        decimal_to_int(value, 254, 10)
    } else {
        decimal_to_int(value, 1, 1)
    }
}

/// `P` is in seconds for a dwell and stored in milliseconds.
pub fn pause(value: &DecimalValue, dwell: bool) -> Result<i64, Error> {
    if dwell {
        decimal_to_int(value, 1000, 1)
    } else {
        decimal_to_int(value, 1, 1)
    }
}

pub fn plain(value: &DecimalValue) -> Result<i64, Error> {
    decimal_to_int(value, 1, 1)
}
