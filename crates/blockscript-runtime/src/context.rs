//! Per-run mutable state.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use blockscript_lang::{ActorId, Block, BlockId, BlockType, Scalar, Script};
use hashbrown::HashMap;

use crate::host::EntityId;
use crate::result::ExecutionResult;
use crate::value::RuntimeValue;

/// The implicit subject of the blocks that follow.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Target {
    /// Nothing resolved.
    #[default]
    None,
    Actor(ActorId),
    Actors(Vec<ActorId>),
    Entity(EntityId),
    Entities(Vec<EntityId>),
    Value(RuntimeValue),
}

impl Target {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Actors in this target, in order.
    #[must_use]
    pub fn actors(&self) -> Vec<ActorId> {
        match self {
            Self::Actor(id) | Self::Value(RuntimeValue::Actor(id)) => vec![*id],
            Self::Actors(ids) => ids.clone(),
            _ => Vec::new(),
        }
    }

    /// Split a group into its members; single targets yield themselves.
    #[must_use]
    pub fn members(&self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Actors(ids) => ids.iter().copied().map(Self::Actor).collect(),
            Self::Entities(ids) => ids.iter().copied().map(Self::Entity).collect(),
            single => vec![single.clone()],
        }
    }
}

/// One executed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub block: BlockId,
    pub ty: BlockType,
    pub outcome: &'static str,
}

/// Variable scopes, target, function table and log for one run of a line.
///
/// Reads check the local overlay first, then the snapshot of the script's globals. Writes only
/// ever touch the overlay; [`ExecutionContext::commit`] moves them into the script afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    actor: ActorId,
    /// Name of the line being run, for error reports.
    line: Arc<str>,
    globals: HashMap<String, RuntimeValue>,
    /// `None` marks a cleared variable that shadows its global.
    locals: HashMap<String, Option<RuntimeValue>>,
    roles: HashMap<String, String>,
    target: Target,
    functions: Arc<HashMap<String, Block>>,
    call_depth: u32,
    log: Vec<LogEntry>,
    log_limit: usize,
    dropped_log_entries: usize,
    cancelled: Arc<AtomicBool>,
}

impl ExecutionContext {
    /// Fresh context for a run of `script` on behalf of `actor`.
    #[must_use]
    pub fn new(actor: ActorId, script: &Script, log_limit: usize) -> Self {
        Self {
            actor,
            line: Arc::from(""),
            globals: snapshot(&script.globals),
            locals: HashMap::new(),
            roles: HashMap::new(),
            target: Target::Actor(actor),
            functions: script.functions(),
            call_depth: 0,
            log: Vec::new(),
            log_limit,
            dropped_log_entries: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Context with no script behind it.
    #[must_use]
    pub fn detached(actor: ActorId) -> Self {
        Self {
            actor,
            line: Arc::from(""),
            globals: HashMap::new(),
            locals: HashMap::new(),
            roles: HashMap::new(),
            target: Target::Actor(actor),
            functions: Arc::default(),
            call_depth: 0,
            log: Vec::new(),
            log_limit: usize::MAX,
            dropped_log_entries: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn set_line(&mut self, name: &str) {
        self.line = Arc::from(name);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        match self.locals.get(name) {
            Some(local) => local.as_ref(),
            None => self.globals.get(name),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<RuntimeValue>) {
        self.locals.insert(name.into(), Some(value.into()));
    }

    /// Unset a variable, shadowing any global of the same name.
    pub fn clear(&mut self, name: &str) {
        self.locals.insert(name.to_string(), None);
    }

    /// Every variable name currently readable.
    #[must_use]
    pub fn visible_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .locals
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.extend(
            self.globals
                .keys()
                .filter(|name| !self.locals.contains_key(name.as_str()))
                .cloned(),
        );
        names
    }

    pub fn set_role(&mut self, role: impl Into<String>, value: impl Into<String>) {
        self.roles.insert(role.into(), value.into());
    }

    #[must_use]
    pub fn role(&self, role: &str) -> Option<&str> {
        self.roles.get(role).map(String::as_str)
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Swap the current target, returning the previous one.
    pub fn replace_target(&mut self, target: Target) -> Target {
        std::mem::replace(&mut self.target, target)
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Block> {
        self.functions.get(name)
    }

    /// Shared handle to the whole function table.
    pub(crate) fn function_table(&self) -> Arc<HashMap<String, Block>> {
        Arc::clone(&self.functions)
    }

    #[must_use]
    pub const fn call_depth(&self) -> u32 {
        self.call_depth
    }

    /// Record an executed block. Entries past the log limit are counted, not stored.
    pub fn record(&mut self, block: &Block, result: &ExecutionResult) {
        if self.log.len() >= self.log_limit {
            self.dropped_log_entries += 1;
            return;
        }
        self.log.push(LogEntry {
            block: block.id(),
            ty: block.block_type(),
            outcome: result.label(),
        });
    }

    #[must_use]
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    #[must_use]
    pub const fn dropped_log_entries(&self) -> usize {
        self.dropped_log_entries
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Share a cancellation flag (an async loop's handle) with this context.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancelled = flag;
    }

    /// Context a function body runs in: the caller's variables, target and roles, one level
    /// deeper.
    #[must_use]
    pub fn child_for_call(&self) -> Self {
        Self {
            actor: self.actor,
            line: Arc::clone(&self.line),
            globals: self.globals.clone(),
            locals: self.locals.clone(),
            roles: self.roles.clone(),
            target: self.target.clone(),
            functions: Arc::clone(&self.functions),
            call_depth: self.call_depth + 1,
            log: Vec::new(),
            log_limit: self.log_limit.saturating_sub(self.log.len()),
            dropped_log_entries: 0,
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Copy back from a finished call every variable that was visible here before the call.
    ///
    /// Names the callee created are dropped.
    pub fn merge_back(&mut self, child: Self) {
        for name in self.visible_names() {
            match child.get(&name) {
                Some(value) if self.get(&name) != Some(value) => {
                    self.locals.insert(name, Some(value.clone()));
                }
                Some(_) => {}
                None => {
                    self.locals.insert(name, None);
                }
            }
        }
        self.log.extend(child.log);
        self.dropped_log_entries += child.dropped_log_entries;
    }

    /// Write the overlay into the script's globals. Names starting with `_` are transient.
    pub fn commit(&self, globals: &mut BTreeMap<String, Scalar>) {
        for (name, value) in &self.locals {
            if is_transient(name) {
                continue;
            }
            match value {
                Some(value) => {
                    globals.insert(name.clone(), value.to_scalar());
                }
                None => {
                    globals.remove(name);
                }
            }
        }
    }

    /// Take a new globals snapshot after [`commit`](Self::commit), keeping transient locals.
    pub fn refresh(&mut self, globals: &BTreeMap<String, Scalar>) {
        self.globals = snapshot(globals);
        self.locals.retain(|name, _| is_transient(name));
    }
}

fn snapshot(globals: &BTreeMap<String, Scalar>) -> HashMap<String, RuntimeValue> {
    globals
        .iter()
        .map(|(name, scalar)| (name.clone(), RuntimeValue::from(scalar)))
        .collect()
}

fn is_transient(name: &str) -> bool {
    name.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Script {
        let mut script = Script::new(ActorId::new(), "alex");
        script.globals.insert("score".into(), Scalar::Number(10.0));
        script
    }

    #[test]
    fn test_overlay_shadows_globals() {
        let script = script();
        let mut ctx = ExecutionContext::new(script.owner_id, &script, 16);
        assert_eq!(ctx.get("score"), Some(&RuntimeValue::Number(10.0)));

        ctx.set("score", 11.0);
        assert_eq!(ctx.get("score"), Some(&RuntimeValue::Number(11.0)));

        ctx.clear("score");
        assert_eq!(ctx.get("score"), None);
    }

    #[test]
    fn test_commit_skips_transient_names() {
        let mut script = script();
        let mut ctx = ExecutionContext::new(script.owner_id, &script, 16);
        ctx.set("_loop_index", 3.0);
        ctx.set("greeted", true);
        ctx.clear("score");
        ctx.commit(&mut script.globals);

        assert_eq!(script.globals.get("greeted"), Some(&Scalar::Boolean(true)));
        assert!(!script.globals.contains_key("_loop_index"));
        assert!(!script.globals.contains_key("score"));
    }

    #[test]
    fn test_merge_back_updates_only_known_names() {
        let script = script();
        let mut caller = ExecutionContext::new(script.owner_id, &script, 16);
        caller.set("total", 1.0);

        let mut callee = caller.child_for_call();
        callee.set("total", 2.0);
        callee.set("score", 99.0);
        callee.set("scratch", 5.0);
        caller.merge_back(callee);

        assert_eq!(caller.get("total"), Some(&RuntimeValue::Number(2.0)));
        assert_eq!(caller.get("score"), Some(&RuntimeValue::Number(99.0)));
        assert_eq!(caller.get("scratch"), None);
    }

    #[test]
    fn test_log_is_capped() {
        let script = script();
        let mut ctx = ExecutionContext::new(script.owner_id, &script, 1);
        let block = Block::new(blockscript_lang::BlockKind::Break);
        ctx.record(&block, &ExecutionResult::Break);
        ctx.record(&block, &ExecutionResult::Success);

        assert_eq!(ctx.log().len(), 1);
        assert_eq!(ctx.dropped_log_entries(), 1);
    }
}
