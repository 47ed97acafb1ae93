use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;
use crate::grade::{Grade, grade_for};

/// Priced view of one `(projection, line, std_dev)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeResult {
    /// `(projection - line) / line * 100`.
    pub edge_pct: f64,
    /// P(outcome > line) under N(projection, std_dev^2).
    pub win_probability: f64,
    pub grade: Grade,
}

/// Per-row outcome. Incomplete rows are the normal case for players with no posted line.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EdgeOutcome {
    Computed(EdgeResult),
    #[default]
    Incomplete,
    Rejected(EdgeError),
}

impl EdgeOutcome {
    pub fn result(&self) -> Option<&EdgeResult> {
        match self {
            EdgeOutcome::Computed(r) => Some(r),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<EdgeError> {
        match self {
            EdgeOutcome::Rejected(err) => Some(*err),
            _ => None,
        }
    }

    pub fn edge_pct(&self) -> Option<f64> {
        self.result().map(|r| r.edge_pct)
    }

    pub fn win_probability(&self) -> Option<f64> {
        self.result().map(|r| r.win_probability)
    }

    pub fn grade(&self) -> Option<Grade> {
        self.result().map(|r| r.grade)
    }
}

pub fn compute(projection: f64, line: f64, std_dev: f64) -> Result<EdgeResult, EdgeError> {
    if !projection.is_finite() {
        return Err(EdgeError::NonFiniteOperand("projection"));
    }
    if !line.is_finite() {
        return Err(EdgeError::NonFiniteOperand("line"));
    }
    // Written as a negation so NaN is rejected too.
    if !(std_dev > 0.0) || std_dev.is_infinite() {
        return Err(EdgeError::InvalidStdDev(std_dev));
    }
    if line == 0.0 {
        return Err(EdgeError::DivisionByZeroEdge);
    }

    let edge_pct = edge_pct(projection, line);
    let win_probability = win_probability(projection, line, std_dev);
    Ok(EdgeResult {
        edge_pct,
        win_probability,
        grade: grade_for(win_probability),
    })
}

/// Row-level entry point: any absent operand short-circuits to `Incomplete`.
pub fn compute_row(
    projection: Option<f64>,
    line: Option<f64>,
    std_dev: Option<f64>,
) -> EdgeOutcome {
    let (Some(projection), Some(line), Some(std_dev)) = (projection, line, std_dev) else {
        return EdgeOutcome::Incomplete;
    };
    match compute(projection, line, std_dev) {
        Ok(result) => EdgeOutcome::Computed(result),
        Err(err) => EdgeOutcome::Rejected(err),
    }
}

pub fn edge_pct(projection: f64, line: f64) -> f64 {
    (projection - line) / line * 100.0
}

pub fn win_probability(projection: f64, line: f64, std_dev: f64) -> f64 {
    let z = (line - projection) / std_dev;
    (1.0 - normal_cdf(z)).clamp(0.0, 1.0)
}

/// Standard normal CDF via the Gauss error function.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + libm::erf(z / SQRT_2))
}
