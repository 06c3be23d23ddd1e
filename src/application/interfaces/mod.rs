mod extraction;
mod file_system;
mod graph_sink;

pub use extraction::*;
pub use file_system::*;
pub use graph_sink::*;
