#![allow(clippy::redundant_pub_crate)]

//! BlockScript runtime.
//!
//! Executes the block trees defined in `blockscript-lang` on behalf of a host.
//!
//! # Execution Model
//!
//! ```text
//! Host event ──► Session::dispatch ──► Dispatcher (kind → owner's lines)
//!                                          │
//!                                          ▼
//!                  fresh ExecutionContext (globals snapshot + roles)
//!                                          │
//!                                          ▼
//!                     Interpreter::run_line ──► commit to script globals
//!
//! Session::tick:
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Phase 1: Dispatch events queued from other threads         │
//! │  Phase 2: Advance the tick counter                          │
//! │  Phase 3: Run DELAY bodies that are due                     │
//! │  Phase 4: Run one iteration of every due async loop         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on the thread that owns the [`Session`]. The only shared state is the
//! [`LoopRegistry`], so any thread can stop an actor's loop.

mod config;
mod context;
mod dispatcher;
mod error;
mod host;
mod interpreter;
mod memory_host;
pub mod ops;
mod resolve;
mod result;
mod scheduler;
mod session;
pub mod store;
mod value;

pub use config::EngineConfig;
pub use context::{ExecutionContext, LogEntry, Target};
pub use dispatcher::{Dispatcher, Handler, HandlerId, HostEvent, actor_role};
pub use error::{HostError, ScriptError, ScriptResult};
pub use host::{ActorInfo, EntityId, EntityInfo, Host, NoSideEffects, SideEffects};
pub use interpreter::{Interpreter, LoopCursor};
pub use memory_host::{MemoryHost, PerformedEffect, RecordingEffects};
pub use resolve::Resolver;
pub use result::ExecutionResult;
pub use scheduler::{
    DeferredTask, LoopHandle, LoopId, LoopPoll, LoopRegistry, LoopTask, TickScheduler,
};
pub use session::{Session, SessionError, SessionResult};
pub use store::{JsonFileStore, MemoryStore, ScriptStore, StoreError};
pub use value::{Location, RuntimeValue};
