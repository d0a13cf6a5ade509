//! Core vector types and correlation metrics for the Quiver LSH engine.

pub mod correlation;
pub mod distance;
pub mod error;
pub mod types;

pub use correlation::{is_incomparable, Correlation, CorrelationKind};
pub use distance::{dot_product, l2_distance, l2_distance_squared, l2_norm, sparse_dot_product};
pub use error::{CoreError, CoreResult};
pub use types::{Vector, VectorKey, VectorValues};
