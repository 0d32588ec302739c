pub mod quote;
pub mod sort;
pub mod tag;

pub use quote::*;
pub use sort::*;
pub use tag::*;
