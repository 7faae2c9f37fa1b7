//! Levenberg-Marquardt solve of the pairwise range-difference equations.

use crate::math::{MatrixHelper, Point2, StatsHelper};
use ndarray::{Array1, Array2};

const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;
const DIAG_FLOOR: f64 = 1e-12;
/// Sum of squared residuals (m²) treated as an exact fit.
const COST_FLOOR: f64 = 1e-18;

/// Observed range difference between sensors `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairDelay {
    pub a: usize,
    pub b: usize,
    /// `speed * (t_a - t_b)`, metres.
    pub range_diff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub point: Point2,
    pub iterations: usize,
    pub residual_rms: f64,
    /// False when the iteration cap was hit first.
    pub converged: bool,
}

/// Sensor positions plus one range difference per unordered sensor pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TdoaProblem {
    sensors: Vec<Point2>,
    pairs: Vec<PairDelay>,
}

impl TdoaProblem {
    pub fn from_arrivals(sensors: Vec<Point2>, times: &[f64], speed: f64) -> Self {
        let n = sensors.len().min(times.len());
        let pairs = (0..n)
            .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
            .map(|(a, b)| PairDelay {
                a,
                b,
                range_diff: speed * (times[a] - times[b]),
            })
            .collect();
        Self { sensors, pairs }
    }

    pub fn pairs(&self) -> &[PairDelay] {
        &self.pairs
    }

    /// `|P - S_a| - |P - S_b| - Δd` for every pair.
    pub fn residuals(&self, point: Point2) -> Array1<f64> {
        self.pairs
            .iter()
            .map(|pair| {
                point.distance_to(&self.sensors[pair.a]) - point.distance_to(&self.sensors[pair.b])
                    - pair.range_diff
            })
            .collect()
    }

    fn cost(&self, point: Point2) -> f64 {
        self.residuals(point).iter().map(|r| r * r).sum()
    }

    fn linearize(&self, point: Point2) -> (Array1<f64>, Array2<f64>) {
        let mut jacobian = Array2::zeros((self.pairs.len(), 2));
        for (row, pair) in self.pairs.iter().enumerate() {
            let ua = unit_from(&self.sensors[pair.a], &point);
            let ub = unit_from(&self.sensors[pair.b], &point);
            jacobian[[row, 0]] = ua.x - ub.x;
            jacobian[[row, 1]] = ua.y - ub.y;
        }
        (self.residuals(point), jacobian)
    }

    /// Damped Gauss-Newton iteration from `start`; returns a local optimum.
    pub fn solve(&self, start: Point2, max_iterations: usize, tolerance: f64) -> Solution {
        let mut point = start;
        let mut cost = self.cost(point);
        let mut lambda = LAMBDA_START;
        let mut iterations = 0;
        let mut converged = self.pairs.is_empty() || cost <= COST_FLOOR;

        while !converged && iterations < max_iterations {
            iterations += 1;
            let (residuals, jacobian) = self.linearize(point);
            let (jtj, jtr) = MatrixHelper::normal_equations(jacobian.view(), residuals.view());
            let rhs = jtr.mapv(|v| -v);

            let mut accepted = None;
            while lambda <= LAMBDA_MAX {
                let mut damped = jtj.clone();
                for k in 0..2 {
                    damped[[k, k]] += lambda * jtj[[k, k]].max(DIAG_FLOOR);
                }
                if let Some([dx, dy]) = MatrixHelper::solve_2x2(&damped, &rhs) {
                    let candidate = Point2::new(point.x + dx, point.y + dy);
                    let candidate_cost = self.cost(candidate);
                    if candidate_cost < cost {
                        accepted = Some((candidate, candidate_cost, dx.hypot(dy)));
                        break;
                    }
                }
                lambda *= 10.0;
            }

            // No damping gives a downhill step: stationary point.
            let Some((candidate, candidate_cost, step)) = accepted else {
                converged = true;
                break;
            };
            point = candidate;
            cost = candidate_cost;
            lambda = (lambda / 10.0).max(LAMBDA_MIN);
            converged = cost <= COST_FLOOR || step <= tolerance * (1.0 + point.norm());
        }

        Solution {
            point,
            iterations,
            residual_rms: StatsHelper::rms(&self.residuals(point).to_vec()),
            converged,
        }
    }
}

/// Unit vector from `sensor` towards `point`; zero when they coincide.
fn unit_from(sensor: &Point2, point: &Point2) -> Point2 {
    let d = point.distance_to(sensor);
    if d < 1e-12 {
        return Point2::new(0.0, 0.0);
    }
    Point2::new((point.x - sensor.x) / d, (point.y - sensor.y) / d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_cover_each_unordered_pair_once() {
        let sensors = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 1.0),
        ];
        let problem = TdoaProblem::from_arrivals(sensors, &[0.0, 1.0, 2.0, 3.0], 10.0);
        assert_eq!(problem.pairs().len(), 6);
        assert_eq!(
            problem.pairs()[0],
            PairDelay {
                a: 0,
                b: 1,
                range_diff: -10.0
            }
        );
    }

    #[test]
    fn residuals_vanish_at_true_source() {
        let sensors = vec![Point2::new(0.0, 0.0), Point2::new(1000.0, 0.0)];
        let truth = Point2::new(300.0, 400.0);
        let times: Vec<f64> = sensors.iter().map(|s| s.distance_to(&truth) / 1500.0).collect();
        let problem = TdoaProblem::from_arrivals(sensors, &times, 1500.0);
        assert!(problem.residuals(truth)[0].abs() < 1e-9);
    }

    #[test]
    fn solve_respects_iteration_cap() {
        let sensors = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1000.0, 0.0),
            Point2::new(0.0, 1000.0),
        ];
        let problem = TdoaProblem::from_arrivals(sensors, &[0.0, 0.3, 0.5], 1462.0);
        let solution = problem.solve(Point2::new(333.0, 333.0), 1, 0.0);
        assert_eq!(solution.iterations, 1);
        assert!(solution.point.x.is_finite() && solution.point.y.is_finite());
    }

    #[test]
    fn coincident_sensors_do_not_blow_up() {
        let sensors = vec![Point2::new(5.0, 5.0), Point2::new(5.0, 5.0)];
        let problem = TdoaProblem::from_arrivals(sensors, &[0.0, 0.1], 1462.0);
        let solution = problem.solve(Point2::new(5.0, 5.0), 50, 1e-10);
        assert!(solution.point.x.is_finite() && solution.point.y.is_finite());
        assert!(solution.iterations <= 50);
    }
}
