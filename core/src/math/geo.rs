use crate::prelude::Coordinate;
use serde::Serialize;

/// Mean Earth radius, metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Point in a local plane: `x` east, `y` north, metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Equirectangular projection about a fixed origin.
///
/// Accurate to well under a metre over the few tens of kilometres spanned by
/// a hydrophone array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: Coordinate,
    cos_lat: f64,
}

impl LocalFrame {
    pub fn new(origin: Coordinate) -> Self {
        Self {
            origin,
            cos_lat: origin.lat.to_radians().cos(),
        }
    }

    /// Frame centred on the mean of `coordinates`.
    pub fn centered(coordinates: &[Coordinate]) -> Option<Self> {
        if coordinates.is_empty() {
            return None;
        }
        let n = coordinates.len() as f64;
        let lat = coordinates.iter().map(|c| c.lat).sum::<f64>() / n;
        let lon = coordinates.iter().map(|c| c.lon).sum::<f64>() / n;
        Some(Self::new(Coordinate::new(lat, lon)))
    }

    pub fn project(&self, coordinate: Coordinate) -> Point2 {
        let dlon = wrap_degrees(coordinate.lon - self.origin.lon);
        Point2::new(
            EARTH_RADIUS_M * dlon.to_radians() * self.cos_lat,
            EARTH_RADIUS_M * (coordinate.lat - self.origin.lat).to_radians(),
        )
    }

    pub fn unproject(&self, point: Point2) -> Coordinate {
        let lat = self.origin.lat + (point.y / EARTH_RADIUS_M).to_degrees();
        let lon = self.origin.lon + (point.x / (EARTH_RADIUS_M * self.cos_lat)).to_degrees();
        Coordinate::new(lat, wrap_degrees(lon))
    }
}

/// Maps a longitude difference into [-180, 180).
fn wrap_degrees(value: f64) -> f64 {
    (value + 180.0).rem_euclid(360.0) - 180.0
}

/// Normalizes an angle in degrees into [0, 360).
pub fn normalize_degrees(value: f64) -> f64 {
    let wrapped = value.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Compass bearing from `from` to `to`: 0° north, clockwise, in [0, 360).
pub fn compass_bearing(from: Point2, to: Point2) -> f64 {
    let math_angle = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    normalize_degrees(90.0 - math_angle)
}

/// Smallest absolute difference between two bearings, in degrees.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let diff = normalize_degrees(a - b);
    diff.min(360.0 - diff)
}
