pub mod gnss;
pub mod pathset;

pub use gnss::{Heading, Speedometer, GNSS};
