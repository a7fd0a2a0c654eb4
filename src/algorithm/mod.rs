pub mod lpf;

pub use lpf::{HeadingLPF, LPF};
