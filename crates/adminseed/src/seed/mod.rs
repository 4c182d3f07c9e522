pub mod dataset;
mod orchestrator;

pub use orchestrator::{run_all, run_level, strip_district_suffix};
