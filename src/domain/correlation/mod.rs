// Category correlation tables, the project correlation matrix and its repair
pub mod builder;
pub mod category_matrix;
pub mod project_matrix;
pub mod psd;

pub use builder::CorrelationMatrixBuilder;
pub use category_matrix::CategoryCorrelationMatrix;
pub use project_matrix::ProjectCorrelationMatrix;
pub use psd::{PsdRepairConfig, RepairReport};
