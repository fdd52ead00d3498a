pub mod columnar;
pub mod value;

pub use columnar::*;
pub use value::*;
