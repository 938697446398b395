pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod metrics;

pub use config::*;
pub use driver::*;
pub use error::*;
pub use events::*;
pub use metrics::*;
