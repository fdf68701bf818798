use crate::BlackOil::indices::NUM_EQ;
use nalgebra::{Const, SVector, U1};
use num_dual::{Derivative, DualSVec64};

/// Scalar with `NUM_EQ` forward-mode derivatives, one per primary variable of a cell.
pub type Evaluation = DualSVec64<NUM_EQ>;

/// constant, no derivative information
pub fn constant(value: f64) -> Evaluation {
    Evaluation::from_re(value)
}

/// value seeded as the independent variable number `pv_idx`
pub fn variable(value: f64, pv_idx: usize) -> Evaluation {
    Evaluation::new(
        value,
        Derivative::derivative_generic(Const::<NUM_EQ>, U1, pv_idx),
    )
}

/// Drops the derivatives of `e` and keeps its value.
pub fn value_only(e: &Evaluation) -> Evaluation {
    Evaluation::from_re(e.re)
}

pub fn derivatives(e: &Evaluation) -> SVector<f64, NUM_EQ> {
    e.eps.unwrap_generic(Const::<NUM_EQ>, U1)
}

/// `min(e, bound)`; if the bound wins the result is a constant.
pub fn min_with(e: Evaluation, bound: f64) -> Evaluation {
    if e.re < bound { e } else { constant(bound) }
}

pub fn max_with(e: Evaluation, bound: f64) -> Evaluation {
    if e.re > bound { e } else { constant(bound) }
}
