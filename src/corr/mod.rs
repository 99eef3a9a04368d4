pub mod copula;
pub mod factors;
pub mod psd;

pub use copula::{CopulaSampler, NormalSource};
pub use factors::{FactorModel, MAX_EXPLAINED_VARIANCE};
pub use psd::{min_eigenvalue, nearest_psd, symmetric_eigenvalues, PsdError};
