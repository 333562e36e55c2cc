//! Triangle rasterization: rows, plane equations and the quad loops that consume them.

pub mod common;
pub mod depth;
pub mod fill;
pub mod projection;
pub mod rows;

pub use common::{orient_2d, IntTriangle};
pub use depth::{depth_clear_value, fill_depth};
pub use fill::{fill_function, fill_shape, FillFn, FillTarget};
pub use projection::{PlaneEquation, Projection, QuadWeights};
pub use rows::{rasterize_rows, row_buffer_len, RowInterval, RowPair, RowShape};
