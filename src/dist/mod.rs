pub mod fit;
pub mod normal;
pub mod truncnorm;

pub use fit::{fit_from_anchors, FitError, FitOutcome, QuantileAnchor};
pub use truncnorm::{DistError, TruncatedNormal, TruncatedNormalParams};
