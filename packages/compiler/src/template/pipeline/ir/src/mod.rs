pub mod enums;
pub mod expression;
pub mod handle;
pub mod operations;
pub mod ops;
pub mod variable;

pub use enums::*;
pub use expression::*;
pub use handle::*;
pub use operations::{Op, OpId, OpList};
pub use ops::*;
pub use variable::*;
