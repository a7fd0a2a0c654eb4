pub mod coordinate;
pub mod measurement;
