//! Adapters connecting the flow loops to a real browser and solver.

pub mod pacer;
pub mod solver;
pub mod webdriver;

pub use pacer::TokioPacer;
pub use solver::CommandSolver;
pub use webdriver::WebDriver;
