//! Model fitting: least-squares regression on the continuous label and
//! multinomial logistic regression on the emotion classes.

pub mod lbfgs;
pub mod linear;
pub mod logistic;

pub use linear::LinearRegression;
pub use logistic::LogisticRegression;

/// Left-to-right dot product.  The inference replica sums in the same order.
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
