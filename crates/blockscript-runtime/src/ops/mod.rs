//! Operation libraries used by the interpreter's action blocks.

pub mod args;
pub mod condition;
pub mod math;
pub mod text;
pub mod variable;
