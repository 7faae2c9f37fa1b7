use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPS: f64 = 1e-18;

pub struct MatrixHelper;

impl MatrixHelper {
    /// `JᵀJ` and `Jᵀr` for a Gauss-Newton step.
    pub fn normal_equations(
        jacobian: ArrayView2<f64>,
        residuals: ArrayView1<f64>,
    ) -> (Array2<f64>, Array1<f64>) {
        let jt = jacobian.t();
        (jt.dot(&jacobian), jt.dot(&residuals))
    }

    /// Solves a 2x2 system by Cramer's rule.
    pub fn solve_2x2(a: &Array2<f64>, b: &Array1<f64>) -> Option<[f64; 2]> {
        if a.dim() != (2, 2) || b.len() != 2 {
            return None;
        }
        let det = a[[0, 0]] * a[[1, 1]] - a[[0, 1]] * a[[1, 0]];
        if !det.is_finite() || det.abs() < SINGULAR_EPS {
            return None;
        }
        Some([
            (a[[1, 1]] * b[0] - a[[0, 1]] * b[1]) / det,
            (a[[0, 0]] * b[1] - a[[1, 0]] * b[0]) / det,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn normal_equations_match_hand_product() {
        let j = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let r = array![1.0, 0.0, -1.0];
        let (jtj, jtr) = MatrixHelper::normal_equations(j.view(), r.view());
        assert_eq!(jtj, array![[35.0, 44.0], [44.0, 56.0]]);
        assert_eq!(jtr, array![-4.0, -4.0]);
    }

    #[test]
    fn solve_2x2_inverts_regular_system() {
        let a = array![[2.0, 1.0], [1.0, 3.0]];
        let b = array![3.0, 5.0];
        let [x, y] = MatrixHelper::solve_2x2(&a, &b).unwrap();
        assert!((x - 0.8).abs() < 1e-12);
        assert!((y - 1.4).abs() < 1e-12);
    }

    #[test]
    fn solve_2x2_rejects_singular_system() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(MatrixHelper::solve_2x2(&a, &array![1.0, 2.0]).is_none());
    }
}
