pub mod address;
pub mod errors;
pub mod ownership;
pub mod report;

pub use address::*;
pub use errors::*;
pub use ownership::*;
pub use report::*;
