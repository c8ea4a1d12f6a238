//! Numerical helpers for the layerfit-rs library.

pub mod finite_difference;
pub mod integrate;
pub mod interpolate;
pub mod matrix_convert;

pub use finite_difference::jacobian;
pub use integrate::simpson;
pub use interpolate::Pchip;
pub use matrix_convert::{nalgebra_to_ndarray, nalgebra_vec_to_ndarray, ndarray_to_nalgebra};
