//! The persisted JSON form of a script.
//!
//! ```json
//! {
//!   "ownerId": "…", "ownerName": "alex", "enabled": true,
//!   "lastModified": "2026-01-01T00:00:00Z", "boundWorld": "lobby",
//!   "lines": [{ "name": "greet", "description": "", "enabled": true, "lineNumber": 0,
//!               "blocks": [{ "id": "…", "type": "EVENT", "parameters": { "event": "JOIN" } }] }],
//!   "globalVariables": { "visits": 3 }
//! }
//! ```
//!
//! Parameter encoding is driven by the block's schema: text values are bare strings, literal
//! numbers are JSON numbers, compound values are `{"kind": …}` objects, enum parameters are
//! their `SCREAMING_SNAKE_CASE` names.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::block::{Block, BlockId};
use crate::error::{DocumentError, DocumentResult};
use crate::kinds::{BlockKind, BlockType};
use crate::schema::{
    ParamBag, ParamKind, ParamSpec, ParamValue, condition_schema, put_condition_fields,
    take_condition_fields,
};
use crate::script::{ActorId, Line, Scalar, Script};
use crate::value::{Value, format_number};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDocument {
    pub owner_id: ActorId,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub last_modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_world: Option<String>,
    #[serde(default)]
    pub lines: Vec<LineDocument>,
    #[serde(default)]
    pub global_variables: BTreeMap<String, Scalar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub line_number: usize,
    #[serde(default)]
    pub blocks: Vec<BlockDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDocument {
    #[serde(default)]
    pub id: BlockId,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub parameters: Map<String, Json>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockDocument>,
}

const fn enabled() -> bool {
    true
}

/// Convert a script to its document form.
#[must_use]
pub fn to_document(script: &Script) -> ScriptDocument {
    ScriptDocument {
        owner_id: script.owner_id,
        owner_name: script.owner_name.clone(),
        enabled: script.enabled,
        last_modified: script.last_modified,
        bound_world: script.bound_world.clone(),
        lines: script
            .lines
            .iter()
            .enumerate()
            .map(|(line_number, line)| LineDocument {
                name: line.name.clone(),
                description: line.description.clone(),
                enabled: line.enabled,
                line_number,
                blocks: line.blocks.iter().map(encode_block).collect(),
            })
            .collect(),
        global_variables: script.globals.clone(),
    }
}

/// Rebuild a script from its document form.
///
/// # Errors
/// Fails on an unknown block type, a malformed parameter or a repeated block id.
pub fn from_document(document: ScriptDocument) -> DocumentResult<Script> {
    let mut seen = HashSet::new();
    let mut line_docs = document.lines;
    line_docs.sort_by_key(|line| line.line_number);

    let mut lines = Vec::with_capacity(line_docs.len());
    for line in line_docs {
        let blocks = line
            .blocks
            .into_iter()
            .map(|block| decode_tracked(block, &mut seen))
            .collect::<DocumentResult<Vec<_>>>()?;
        lines.push(Line {
            name: line.name,
            description: line.description,
            enabled: line.enabled,
            blocks,
        });
    }

    let mut script = Script::new(document.owner_id, document.owner_name);
    script.enabled = document.enabled;
    script.bound_world = document.bound_world;
    script.lines = lines;
    script.globals = document.global_variables;
    script.rebuild_functions();
    script.last_modified = document.last_modified;
    Ok(script)
}

/// Pretty-printed JSON for a script.
///
/// # Errors
/// Only fails if serialization itself fails.
pub fn to_json(script: &Script) -> DocumentResult<String> {
    Ok(serde_json::to_string_pretty(&to_document(script))?)
}

/// Parse a script from JSON.
///
/// # Errors
/// See [`from_document`].
pub fn from_json(json: &str) -> DocumentResult<Script> {
    from_document(serde_json::from_str(json)?)
}

/// Encode one block subtree.
#[must_use]
pub fn encode_block(block: &Block) -> BlockDocument {
    let bag = block.kind().to_params();
    let parameters = bag
        .iter()
        .map(|(name, value)| (name.clone(), encode_param(value)))
        .collect();
    BlockDocument {
        id: block.id(),
        ty: block.block_type().to_string(),
        parameters,
        children: block.children().iter().map(encode_block).collect(),
    }
}

/// Decode one block subtree.
///
/// # Errors
/// Fails on an unknown block type, a malformed parameter or a repeated block id.
pub fn decode_block(document: BlockDocument) -> DocumentResult<Block> {
    decode_tracked(document, &mut HashSet::new())
}

fn decode_tracked(document: BlockDocument, seen: &mut HashSet<BlockId>) -> DocumentResult<Block> {
    let ty: BlockType = document
        .ty
        .parse()
        .map_err(|_| DocumentError::UnknownBlockType(document.ty.clone()))?;
    if !seen.insert(document.id) {
        return Err(DocumentError::DuplicateId(document.id));
    }

    let bag = decode_params(document.id, ty.schema(), document.parameters)?;
    let children = document
        .children
        .into_iter()
        .map(|child| decode_tracked(child, seen))
        .collect::<DocumentResult<Vec<_>>>()?;

    Ok(Block::with_id(document.id, BlockKind::from_params(ty, bag)).with_children(children))
}

fn decode_params(
    block: BlockId,
    schema: &[ParamSpec],
    parameters: Map<String, Json>,
) -> DocumentResult<ParamBag> {
    let mut bag = ParamBag::new();
    for (name, json) in parameters {
        if json.is_null() {
            continue;
        }
        let kind = schema
            .iter()
            .find(|spec| spec.name == name)
            .map_or(ParamKind::Value(None), |spec| spec.kind);
        let value = decode_param(block, kind, json).map_err(|reason| {
            DocumentError::MalformedParameter {
                block,
                name: name.clone(),
                reason,
            }
        })?;
        bag.insert(name, value);
    }
    Ok(bag)
}

fn decode_param(block: BlockId, kind: ParamKind, json: Json) -> Result<ParamValue, String> {
    Ok(match (kind, json) {
        (ParamKind::Value(_), json) => ParamValue::Value(decode_value(json)?),
        (ParamKind::Enum(_), Json::String(name)) => ParamValue::Enum(name),
        (ParamKind::Bool, Json::Bool(b)) => ParamValue::Bool(b),
        (ParamKind::Bool, Json::String(s)) => ParamValue::Bool(s.eq_ignore_ascii_case("true")),
        (ParamKind::Integer, Json::Number(n)) => ParamValue::Integer(
            n.as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| format!("{n} is not an integer"))?,
        ),
        (ParamKind::Integer, Json::String(s)) => ParamValue::Integer(
            s.trim()
                .parse()
                .map_err(|_| format!("'{s}' is not an integer"))?,
        ),
        (ParamKind::Text, Json::String(s)) => ParamValue::Text(s),
        (ParamKind::Text, Json::Number(n)) => ParamValue::Text(n.to_string()),
        (ParamKind::Names, Json::Array(items)) => ParamValue::Names(
            items
                .into_iter()
                .map(|item| match item {
                    Json::String(s) => Ok(s),
                    other => Err(format!("expected a name, found {other}")),
                })
                .collect::<Result<_, _>>()?,
        ),
        (ParamKind::Names, Json::String(s)) => ParamValue::Names(
            s.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        (ParamKind::Condition, Json::Object(fields)) => {
            let mut bag = decode_params(block, condition_schema(), fields)
                .map_err(|err| err.to_string())?;
            ParamValue::Condition(take_condition_fields(&mut bag))
        }
        (ParamKind::ValueMap, Json::Object(fields)) => ParamValue::ValueMap(
            fields
                .into_iter()
                .map(|(key, json)| Ok((key, decode_value(json)?)))
                .collect::<Result<_, String>>()?,
        ),
        (kind, json) => return Err(format!("expected {}, found {json}", describe(kind))),
    })
}

fn decode_value(json: Json) -> Result<Value, String> {
    match json {
        Json::String(raw) => Ok(Value::text(raw)),
        Json::Number(n) => n
            .as_f64()
            .map(Value::number)
            .ok_or_else(|| format!("{n} is out of range")),
        Json::Bool(b) => Ok(Value::text(b.to_string())),
        object @ Json::Object(_) => serde_json::from_value(object).map_err(|err| err.to_string()),
        other => Err(format!("expected a value, found {other}")),
    }
}

fn encode_param(value: &ParamValue) -> Json {
    match value {
        ParamValue::Value(value) => encode_value(value),
        ParamValue::Enum(name) | ParamValue::Text(name) => Json::String(name.clone()),
        ParamValue::Bool(b) => Json::Bool(*b),
        ParamValue::Integer(i) => Json::from(*i),
        ParamValue::Names(names) => Json::from(names.clone()),
        ParamValue::Condition(condition) => {
            let mut bag = ParamBag::new();
            put_condition_fields(&mut bag, condition);
            Json::Object(
                bag.iter()
                    .map(|(name, value)| (name.clone(), encode_param(value)))
                    .collect(),
            )
        }
        ParamValue::ValueMap(map) => Json::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), encode_value(value)))
                .collect(),
        ),
    }
}

fn encode_value(value: &Value) -> Json {
    match value {
        Value::Text { raw } => Json::String(raw.clone()),
        Value::Number(n) => match n.as_literal() {
            Some(literal) if literal.is_finite() && n.raw() == format_number(literal) => {
                Json::from(literal)
            }
            _ => serde_json::to_value(value).unwrap_or(Json::Null),
        },
        other => serde_json::to_value(other).unwrap_or(Json::Null),
    }
}

const fn describe(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Value(_) => "a value",
        ParamKind::Enum(_) => "an enum name",
        ParamKind::Bool => "a boolean",
        ParamKind::Integer => "an integer",
        ParamKind::Text => "text",
        ParamKind::Names => "a list of names",
        ParamKind::Condition => "a condition object",
        ParamKind::ValueMap => "an object of values",
    }
}
