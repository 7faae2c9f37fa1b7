use crate::bearing::solver::TdoaProblem;
use crate::catalog::StationLookup;
use crate::math::{compass_bearing, LocalFrame, Point2, StatsHelper};
use crate::prelude::{Coordinate, EstimatorConfig};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Closest the solved source may sit to the reference sensor, metres.
const MIN_BEARING_RANGE_M: f64 = 1e-6;

/// Arrival of one event at one sensor, in seconds on any common clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrival {
    pub sensor: String,
    pub time: f64,
}

/// Sensor already placed in the local east/north plane.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFix {
    pub sensor: String,
    pub position: Point2,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BearingEstimate {
    /// Sensor the bearing is measured from.
    pub reference: String,
    /// Degrees clockwise from north, in [0, 360).
    pub bearing_deg: f64,
    /// Solved source position in the local plane, metres.
    pub local: Point2,
    /// Solved source position, when the sensors were geolocated.
    pub location: Option<Coordinate>,
    pub sensors: usize,
    pub residual_rms: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BearingOutcome {
    Solved(BearingEstimate),
    /// Fewer than two usable sensors.
    Underdetermined { sensors: usize },
    /// The solve landed on the reference sensor, so no direction exists.
    Degenerate { sensors: usize },
}

impl BearingOutcome {
    pub fn estimate(&self) -> Option<&BearingEstimate> {
        match self {
            BearingOutcome::Solved(estimate) => Some(estimate),
            BearingOutcome::Underdetermined { .. } | BearingOutcome::Degenerate { .. } => None,
        }
    }

    pub fn bearing(&self) -> Option<f64> {
        self.estimate().map(|e| e.bearing_deg)
    }
}

/// Time-difference-of-arrival bearing solver.
#[derive(Debug, Clone, Default)]
pub struct BearingEstimator {
    config: EstimatorConfig,
}

impl BearingEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Estimates the bearing of one event from its arrivals.
    ///
    /// Sensors without coordinates and repeated sensor ids are dropped. The
    /// remaining sensors are projected onto a plane centred on their mean
    /// position before solving.
    pub fn estimate<L: StationLookup + ?Sized>(
        &self,
        arrivals: &[Arrival],
        stations: &L,
    ) -> BearingOutcome {
        let mut seen = HashSet::new();
        let located: Vec<(&Arrival, Coordinate)> = arrivals
            .iter()
            .filter(|a| seen.insert(a.sensor.as_str()))
            .filter_map(|a| match stations.coordinate_of(&a.sensor) {
                Some(coordinate) => Some((a, coordinate)),
                None => {
                    warn!("no coordinates for sensor {}, dropping it", a.sensor);
                    None
                }
            })
            .collect();

        let coordinates: Vec<Coordinate> = located.iter().map(|(_, c)| *c).collect();
        let Some(frame) = LocalFrame::centered(&coordinates) else {
            return BearingOutcome::Underdetermined { sensors: 0 };
        };
        let fixes: Vec<SensorFix> = located
            .iter()
            .map(|(arrival, coordinate)| SensorFix {
                sensor: arrival.sensor.clone(),
                position: frame.project(*coordinate),
                time: arrival.time,
            })
            .collect();

        match self.estimate_local(&fixes) {
            BearingOutcome::Solved(mut estimate) => {
                estimate.location = Some(frame.unproject(estimate.local));
                BearingOutcome::Solved(estimate)
            }
            other => other,
        }
    }

    /// Solves for the source in the plane the fixes are given in.
    pub fn estimate_local(&self, fixes: &[SensorFix]) -> BearingOutcome {
        let usable: Vec<&SensorFix> = fixes
            .iter()
            .filter(|f| f.time.is_finite() && f.position.x.is_finite() && f.position.y.is_finite())
            .collect();
        if usable.len() < 2 {
            return BearingOutcome::Underdetermined {
                sensors: usable.len(),
            };
        }

        let positions: Vec<Point2> = usable.iter().map(|f| f.position).collect();
        let times: Vec<f64> = usable.iter().map(|f| f.time).collect();
        let start = StatsHelper::centroid(&positions).unwrap_or(positions[0]);
        let problem = TdoaProblem::from_arrivals(positions, &times, self.config.speed);
        let solution = problem.solve(start, self.config.max_iterations, self.config.tolerance);
        if !solution.converged {
            debug!(
                "solve stopped after {} iterations, rms {:.3} m",
                solution.iterations, solution.residual_rms
            );
        }

        let reference = self
            .config
            .reference
            .as_deref()
            .and_then(|id| usable.iter().find(|f| f.sensor == id))
            .unwrap_or(&usable[0]);
        if !solution.point.x.is_finite()
            || !solution.point.y.is_finite()
            || reference.position.distance_to(&solution.point) < MIN_BEARING_RANGE_M
        {
            warn!(
                "source solved onto reference {}, no bearing from {} sensors",
                reference.sensor,
                usable.len()
            );
            return BearingOutcome::Degenerate {
                sensors: usable.len(),
            };
        }

        BearingOutcome::Solved(BearingEstimate {
            reference: reference.sensor.clone(),
            bearing_deg: compass_bearing(reference.position, solution.point),
            local: solution.point,
            location: None,
            sensors: usable.len(),
            residual_rms: solution.residual_rms,
            iterations: solution.iterations,
            converged: solution.converged,
        })
    }
}
