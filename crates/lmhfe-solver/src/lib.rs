//! GMRES solver, LMHFE time-stepping assembly, and sensitivity drivers
//! (components 2, 4 and 5 of the diffusion engine).

pub mod gmres;
pub mod lmhfe;
pub mod sensitivity;

pub use gmres::{GmresOptions, GmresResult, solve_gmres};
pub use lmhfe::Lmhfe;
pub use sensitivity::{FinDiff, FwdDiff};
