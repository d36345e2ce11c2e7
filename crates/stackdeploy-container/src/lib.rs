pub mod docker;
pub mod error;
pub mod process;
pub mod secrets;

pub use docker::*;
pub use error::*;
pub use process::*;
pub use secrets::*;
