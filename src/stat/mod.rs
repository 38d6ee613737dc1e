pub mod aggregate;
pub mod datatype;
pub mod format;
pub mod sample_data;

pub use aggregate::*;
pub use datatype::*;
pub use format::*;
