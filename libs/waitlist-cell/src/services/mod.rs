pub mod directory;
pub mod prioritizer;
pub mod recalc;

pub use directory::PatientDirectory;
pub use recalc::ScoreRecalcService;
