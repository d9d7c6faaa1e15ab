// Projects, the yearly portfolio table and per-year active sets
pub mod active_set;
pub mod project;
pub mod yearly_portfolio;

pub use active_set::{ActiveProject, ActiveSet, ActiveSetResolver};
pub use project::{Project, YearlyFigures};
pub use yearly_portfolio::{YearlyPortfolio, YearlyRow};
