pub mod deploy;
pub mod upload;

pub use deploy::*;
pub use upload::*;
