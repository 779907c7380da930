//! Limited-memory BFGS (L-BFGS) minimizer.
//!
//! Quasi-Newton method that approximates the inverse Hessian from the last
//! `m` position/gradient differences.  Steps are chosen by Armijo
//! backtracking; the iteration stops when the largest absolute gradient
//! component drops below `tol`.

use std::collections::VecDeque;

use log::debug;

use super::dot;

/// How a minimization ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    Converged,
    MaxIterations,
    /// The line search could not find a decreasing step.
    Stalled,
    /// The objective became NaN or infinite; the last finite iterate is kept.
    NumericalError,
}

/// Result of [`Lbfgs::minimize`].
#[derive(Debug, Clone)]
pub struct Minimum {
    pub solution: Vec<f64>,
    pub objective: f64,
    pub iterations: usize,
    pub status: ConvergenceStatus,
    /// Max-abs gradient component at `solution`.
    pub gradient_max: f64,
}

impl Minimum {
    pub fn converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }
}

/// Armijo backtracking: start at `α = 1` and shrink by `rho` until
/// `f(x + α·d) ≤ f(x) + c1·α·∇f(x)ᵀd`.
#[derive(Debug, Clone)]
struct BacktrackingLineSearch {
    c1: f64,
    rho: f64,
    max_iter: usize,
}

impl Default for BacktrackingLineSearch {
    fn default() -> Self {
        Self {
            c1: 1e-4,
            rho: 0.5,
            max_iter: 50,
        }
    }
}

impl BacktrackingLineSearch {
    /// Returns `(α, x_new, f_new, g_new)` or `None` when no step satisfies
    /// the Armijo condition.
    fn search<F>(
        &self,
        f: &F,
        x: &[f64],
        fx: f64,
        dir_deriv: f64,
        d: &[f64],
    ) -> Option<(f64, Vec<f64>, f64, Vec<f64>)>
    where
        F: Fn(&[f64]) -> (f64, Vec<f64>),
    {
        let mut alpha = 1.0;
        for _ in 0..self.max_iter {
            let x_new: Vec<f64> = x.iter().zip(d).map(|(xi, di)| xi + alpha * di).collect();
            let (f_new, g_new) = f(&x_new);
            if f_new.is_finite() && f_new <= fx + self.c1 * alpha * dir_deriv {
                return Some((alpha, x_new, f_new, g_new));
            }
            alpha *= self.rho;
        }
        None
    }
}

/// L-BFGS optimizer over `f64` parameter vectors.
#[derive(Debug, Clone)]
pub struct Lbfgs {
    max_iter: usize,
    tol: f64,
    m: usize,
    line_search: BacktrackingLineSearch,
}

impl Lbfgs {
    /// * `max_iter` – iteration budget
    /// * `tol` – stop when `max |∇f| < tol`
    /// * `m` – number of correction pairs kept (typical: 5-20)
    pub fn new(max_iter: usize, tol: f64, m: usize) -> Self {
        Self {
            max_iter,
            tol,
            m: m.max(1),
            line_search: BacktrackingLineSearch::default(),
        }
    }

    /// Minimize `f`, which returns the objective and its gradient, from `x0`.
    pub fn minimize<F>(&self, f: F, x0: Vec<f64>) -> Minimum
    where
        F: Fn(&[f64]) -> (f64, Vec<f64>),
    {
        let mut history: VecDeque<(Vec<f64>, Vec<f64>, f64)> = VecDeque::with_capacity(self.m);

        let mut x = x0;
        let (mut fx, mut grad) = f(&x);
        if !fx.is_finite() {
            return Minimum {
                gradient_max: max_abs(&grad),
                solution: x,
                objective: fx,
                iterations: 0,
                status: ConvergenceStatus::NumericalError,
            };
        }

        for iter in 0..self.max_iter {
            let gmax = max_abs(&grad);
            if gmax < self.tol {
                return Minimum {
                    solution: x,
                    objective: fx,
                    iterations: iter,
                    status: ConvergenceStatus::Converged,
                    gradient_max: gmax,
                };
            }

            let mut d = two_loop_direction(&grad, &history);
            let mut dir_deriv = dot(&grad, &d);
            if dir_deriv >= 0.0 {
                // Curvature information went stale; restart from steepest descent.
                history.clear();
                d = grad.iter().map(|g| -g).collect();
                dir_deriv = dot(&grad, &d);
            }

            let Some((alpha, x_new, f_new, g_new)) =
                self.line_search.search(&f, &x, fx, dir_deriv, &d)
            else {
                return Minimum {
                    solution: x,
                    objective: fx,
                    iterations: iter,
                    status: ConvergenceStatus::Stalled,
                    gradient_max: gmax,
                };
            };

            let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_new.iter().zip(&grad).map(|(a, b)| a - b).collect();
            let ys = dot(&y, &s);
            if ys > 1e-10 {
                if history.len() == self.m {
                    history.pop_front();
                }
                history.push_back((s, y, 1.0 / ys));
            }

            debug!("lbfgs iter {iter}: f = {f_new:.6e}, step = {alpha:.3e}");
            x = x_new;
            fx = f_new;
            grad = g_new;
        }

        let gmax = max_abs(&grad);
        Minimum {
            solution: x,
            objective: fx,
            iterations: self.max_iter,
            status: if gmax < self.tol {
                ConvergenceStatus::Converged
            } else {
                ConvergenceStatus::MaxIterations
            },
            gradient_max: gmax,
        }
    }
}

/// Two-loop recursion: approximates `-H⁻¹ g` from the stored `(s, y, ρ)`.
fn two_loop_direction(grad: &[f64], history: &VecDeque<(Vec<f64>, Vec<f64>, f64)>) -> Vec<f64> {
    let mut q: Vec<f64> = grad.iter().map(|g| -g).collect();
    let Some((s_last, y_last, _)) = history.back() else {
        return q;
    };

    let mut alpha = vec![0.0; history.len()];
    for (i, (s, y, rho)) in history.iter().enumerate().rev() {
        alpha[i] = rho * dot(s, &q);
        for (qj, yj) in q.iter_mut().zip(y) {
            *qj -= alpha[i] * yj;
        }
    }

    let gamma = dot(s_last, y_last) / dot(y_last, y_last);
    for qj in &mut q {
        *qj *= gamma;
    }

    for (i, (s, y, rho)) in history.iter().enumerate() {
        let beta = rho * dot(y, &q);
        for (qj, sj) in q.iter_mut().zip(s) {
            *qj += sj * (alpha[i] - beta);
        }
    }
    q
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_converges() {
        let opt = Lbfgs::new(100, 1e-8, 10);
        let f = |x: &[f64]| ((x[0] - 5.0).powi(2), vec![2.0 * (x[0] - 5.0)]);
        let min = opt.minimize(f, vec![0.0]);
        assert!(min.converged());
        assert!((min.solution[0] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn rosenbrock_converges() {
        let opt = Lbfgs::new(1000, 1e-6, 10);
        let f = |x: &[f64]| {
            let (a, b) = (x[0], x[1]);
            (
                (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2),
                vec![
                    -2.0 * (1.0 - a) - 400.0 * a * (b - a * a),
                    200.0 * (b - a * a),
                ],
            )
        };
        let min = opt.minimize(f, vec![-1.2, 1.0]);
        assert_eq!(min.status, ConvergenceStatus::Converged);
        assert!((min.solution[0] - 1.0).abs() < 1e-4);
        assert!((min.solution[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn already_at_minimum() {
        let opt = Lbfgs::new(100, 1e-8, 5);
        let min = opt.minimize(|x: &[f64]| (x[0] * x[0], vec![2.0 * x[0]]), vec![0.0]);
        assert!(min.converged());
        assert_eq!(min.iterations, 0);
    }

    #[test]
    fn budget_exhaustion_keeps_iterate() {
        let opt = Lbfgs::new(1, 1e-12, 5);
        let f = |x: &[f64]| {
            let (a, b) = (x[0], x[1]);
            (
                (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2),
                vec![
                    -2.0 * (1.0 - a) - 400.0 * a * (b - a * a),
                    200.0 * (b - a * a),
                ],
            )
        };
        let min = opt.minimize(f, vec![-1.2, 1.0]);
        assert_eq!(min.status, ConvergenceStatus::MaxIterations);
        assert_eq!(min.iterations, 1);
        assert!(min.objective < 24.2);
    }

    #[test]
    fn steepest_descent_without_history() {
        let d = two_loop_direction(&[3.0, -4.0], &VecDeque::new());
        assert_eq!(d, vec![-3.0, 4.0]);
    }
}
