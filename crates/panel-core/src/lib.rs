pub mod error;
pub mod panel;
pub mod tensor;
pub mod traits;

pub use error::*;
pub use panel::*;
pub use tensor::*;
pub use traits::*;
