pub mod block;
pub mod encoding;
pub mod error;
pub mod header;
pub mod ids;
pub mod window;

pub use block::*;
pub use encoding::*;
pub use error::*;
pub use header::*;
pub use ids::*;
pub use window::*;
