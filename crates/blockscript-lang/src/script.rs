//! Scripts: the per-actor container of trigger lines, globals and functions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::block::{Block, BlockId, check_sequence};
use crate::error::ValidationError;
use crate::kinds::{BlockKind, EventKind};
use crate::value::format_number;

/// Identity of an actor (the owner of a script).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A persisted global variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<Scalar>),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// One trigger line: an event block followed by the blocks it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub blocks: Vec<Block>,
}

impl Line {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            enabled: true,
            blocks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_blocks(mut self, blocks: impl IntoIterator<Item = Block>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    /// The event this line reacts to, if it starts with an event block.
    #[must_use]
    pub fn event_kind(&self) -> Option<EventKind> {
        match self.blocks.first()?.kind() {
            BlockKind::Event(params) => params.event,
            _ => None,
        }
    }

    /// The blocks run when the line fires (everything after the event block).
    #[must_use]
    pub fn body(&self) -> &[Block] {
        match self.blocks.first().map(Block::kind) {
            Some(BlockKind::Event(_)) => &self.blocks[1..],
            _ => &self.blocks,
        }
    }
}

/// An actor's script.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub owner_id: ActorId,
    pub owner_name: String,
    pub enabled: bool,
    /// Lines only fire while the owner is in this world.
    pub bound_world: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub lines: Vec<Line>,
    pub globals: BTreeMap<String, Scalar>,
    functions: Arc<HashMap<String, Block>>,
}

impl Script {
    pub fn new(owner_id: ActorId, owner_name: impl Into<String>) -> Self {
        Self {
            owner_id,
            owner_name: owner_name.into(),
            enabled: true,
            bound_world: None,
            last_modified: Utc::now(),
            lines: Vec::new(),
            globals: BTreeMap::new(),
            functions: Arc::default(),
        }
    }

    /// Append a line and refresh the function table.
    pub fn push_line(&mut self, line: Line) {
        self.lines.push(line);
        self.rebuild_functions();
        self.touch();
    }

    /// Shared snapshot of the function table.
    #[must_use]
    pub fn functions(&self) -> Arc<HashMap<String, Block>> {
        Arc::clone(&self.functions)
    }

    /// Re-collect every `FUNCTION` block, in line order. The first definition of a name wins.
    pub fn rebuild_functions(&mut self) {
        let mut table = HashMap::new();
        for block in self.lines.iter().flat_map(|line| line.blocks.iter()) {
            for node in block.walk() {
                if let BlockKind::Function(params) = node.kind() {
                    table
                        .entry(params.name.clone())
                        .or_insert_with(|| node.clone());
                }
            }
        }
        self.functions = Arc::new(table);
    }

    #[must_use]
    pub fn find_block(&self, id: BlockId) -> Option<&Block> {
        self.lines
            .iter()
            .flat_map(|line| line.blocks.iter())
            .find_map(|block| block.find(id))
    }

    /// Index of the line that contains `id`.
    #[must_use]
    pub fn line_of(&self, id: BlockId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.blocks.iter().any(|block| block.find(id).is_some()))
    }

    /// Structural check of every line. Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.problems().into_iter().next().map_or(Ok(()), Err)
    }

    /// Every structural problem in the script.
    #[must_use]
    pub fn problems(&self) -> Vec<ValidationError> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        let mut functions = HashSet::new();

        for line in &self.lines {
            check_sequence(&line.blocks, true, &mut problems);
            for block in &line.blocks {
                block.collect_problems(&mut problems, &mut seen);
                for node in block.walk() {
                    if let BlockKind::Function(params) = node.kind() {
                        if !functions.insert(params.name.as_str()) {
                            problems.push(ValidationError::DuplicateFunction(params.name.clone()));
                        }
                    }
                }
            }
        }
        problems
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }
}
