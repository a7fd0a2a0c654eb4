pub mod speedometer;

pub use speedometer::Speedometer;
