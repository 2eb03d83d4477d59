pub mod config;
pub mod normalizer;
pub mod split;
pub mod windows;


pub use config::*;
pub use normalizer::*;
pub use split::*;
pub use windows::*;
