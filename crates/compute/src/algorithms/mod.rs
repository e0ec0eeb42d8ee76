pub mod segment;
pub mod stats;
pub mod trend;
