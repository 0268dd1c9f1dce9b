//! Piecewise-linear probability curves evaluated over a normalized [0, 1] input.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub t: f32,
    pub value: f32,
}

/// Either a flat value or a sorted list of keys joined by straight segments.
///
/// Inputs are clamped to [0, 1]; inputs before the first key or after the last key take
/// that key's value. An empty key list evaluates to zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Curve {
    Constant(f32),
    Keys(Vec<CurveKey>),
}

impl Default for Curve {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl Curve {
    pub fn constant(value: f32) -> Self {
        Self::Constant(value)
    }

    pub fn linear(from: f32, to: f32) -> Self {
        Self::Keys(vec![CurveKey { t: 0.0, value: from }, CurveKey { t: 1.0, value: to }])
    }

    pub fn from_keys(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<CurveKey> =
            keys.into_iter().map(|(t, value)| CurveKey { t, value }).collect();
        keys.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self::Keys(keys)
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Constant(value) => *value,
            Self::Keys(keys) => evaluate_keys(keys, t),
        }
    }
}

fn evaluate_keys(keys: &[CurveKey], t: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return 0.0;
    };
    if t <= first.t {
        return first.value;
    }
    if t >= last.t {
        return last.value;
    }
    for pair in keys.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if t >= left.t && t <= right.t {
            let span = right.t - left.t;
            if span <= f32::EPSILON {
                return right.value;
            }
            return left.value + (right.value - left.value) * ((t - left.t) / span);
        }
    }
    last.value
}
