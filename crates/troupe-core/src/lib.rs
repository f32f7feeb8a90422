pub mod detect;
pub mod error;
pub mod import;
pub mod io;
pub mod paths;
pub mod registry;
pub mod settings;
pub mod sync;
pub mod trash;
pub mod types;

pub use error::{Result, TroupeError};
pub use registry::Registry;
