pub mod deploy;
pub mod session;
pub mod upload;
