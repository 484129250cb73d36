//! Half-point meeting ratings and the star control that produces them.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A rating between 0.5 and 5.0 in steps of 0.5, stored as half points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rating(u8);

impl Rating {
    pub const MAX_STARS: u8 = 5;

    pub fn from_half_points(half_points: u8) -> Option<Self> {
        (1..=Self::MAX_STARS * 2)
            .contains(&half_points)
            .then_some(Rating(half_points))
    }

    /// A whole-star rating, `star` in 1..=5.
    pub fn full(star: u8) -> Option<Self> {
        if star == 0 {
            return None;
        }
        Self::from_half_points(star.checked_mul(2)?)
    }

    pub fn half_points(self) -> u8 {
        self.0
    }

    pub fn value(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    /// Applies a click on star `star` to the current rating.
    ///
    /// Clicking a star sets the rating to that star; clicking the same star
    /// again while the rating sits exactly on it drops half a point, so
    /// repeated clicks alternate between `star - 0.5` and `star`.
    pub fn click(current: Option<Rating>, star: u8) -> Result<Rating> {
        let full = Self::full(star).ok_or_else(|| {
            AppError::invalid(format!("star must be between 1 and {}", Self::MAX_STARS))
        })?;

        if current == Some(full) {
            Ok(Rating(full.0 - 1))
        } else {
            Ok(full)
        }
    }

    /// Converts a request value; `None` and `0` both mean "no rating".
    pub fn from_input(value: Option<f64>) -> Result<Option<Rating>> {
        match value {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(None),
            Some(v) => Rating::try_from(v).map(Some),
        }
    }
}

impl TryFrom<f64> for Rating {
    type Error = AppError;

    fn try_from(value: f64) -> Result<Self> {
        let doubled = value * 2.0;
        if !doubled.is_finite() || doubled.fract() != 0.0 {
            return Err(AppError::invalid("rating must use half-point steps"));
        }
        if !(1.0..=f64::from(Self::MAX_STARS * 2)).contains(&doubled) {
            return Err(AppError::invalid("rating must be between 0.5 and 5"));
        }
        Ok(Rating(doubled as u8))
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.value()
    }
}
