//! BlockScript data model.
//!
//! Scripts are authored as trees of typed blocks rather than text. This crate holds the tree
//! itself: [`Value`]s carried by block parameters, the [`BlockKind`] tagged union with one
//! strongly-typed parameter struct per variant, the declarative parameter schema, the
//! [`Script`]/[`Line`] container, structural validation and the JSON [`document`] format.
//!
//! # Example
//!
//! ```
//! use blockscript_lang::{Block, BlockKind, EventKind, Line, Script, ActorId};
//!
//! let mut script = Script::new(ActorId::new(), "alex");
//! script.push_line(Line::new("greet").with_blocks([
//!     Block::new(BlockKind::event(EventKind::Join)),
//!     Block::new(BlockKind::message("Welcome back, %player%!")),
//! ]));
//!
//! assert!(script.validate().is_ok());
//! let json = blockscript_lang::document::to_json(&script).unwrap();
//! assert_eq!(blockscript_lang::document::from_json(&json).unwrap(), script);
//! ```

mod block;
mod condition;
pub mod document;
mod error;
mod kinds;
mod schema;
mod script;
mod value;

pub use block::{Block, BlockId};
pub use condition::{Condition, ConditionKind};
pub use error::{DocumentError, DocumentResult, ValidationError};
pub use kinds::*;
pub use schema::{ParamBag, ParamKind, ParamSpec, ParamValue};
pub use script::{ActorId, Line, Scalar, Script};
pub use value::*;
