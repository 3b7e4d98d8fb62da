//! Authored values carried by block parameters.
//!
//! A [`Value`] is what the editor stores: a raw template (`"Hello %player%"`, `"{score}"`) or a
//! structured compound (location, item, ...). The structured form is parsed once when the value
//! is constructed; the final runtime value is only known at execution time, after role and
//! variable substitution against a live context.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminator for [`Value`] variants, used by parameter schemas.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ValueKind {
    Text,
    Number,
    Variable,
    Location,
    Item,
    Sound,
    Particle,
    PotionEffect,
}

/// A typed, lazily-resolved expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Value {
    /// Text template. `%role%`, `%var%` and `{var}` are substituted at runtime.
    Text { raw: String },
    /// Numeric template; literal numbers are parsed up front.
    Number(NumberValue),
    /// Reference to a variable by (templated) name.
    Variable { name: String },
    Location(LocationSpec),
    Item(ItemSpec),
    Sound(SoundSpec),
    Particle(ParticleSpec),
    PotionEffect(EffectSpec),
}

impl Value {
    /// Text value from a raw template.
    pub fn text(raw: impl Into<String>) -> Self {
        Self::Text { raw: raw.into() }
    }

    /// Number value from a literal.
    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Number(NumberValue::literal(value))
    }

    /// Number value from a raw template such as `"{count}"` or `"2.5"`.
    pub fn number_raw(raw: impl Into<String>) -> Self {
        Self::Number(NumberValue::new(raw))
    }

    /// Reference to a variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable {
            name: strip_variable_markers(&name.into()),
        }
    }

    /// Parse an authored string into a value of the requested kind.
    ///
    /// Compound kinds accept the comma form used by the editor
    /// (`"world,10,64,-3"`, `"DIAMOND,3,Shiny"`). Malformed input falls back to the kind's
    /// default instead of failing.
    #[must_use]
    pub fn parse(kind: ValueKind, raw: &str) -> Self {
        match kind {
            ValueKind::Text => Self::text(raw),
            ValueKind::Number => Self::number_raw(raw.trim()),
            ValueKind::Variable => Self::variable(raw),
            ValueKind::Location => Self::Location(LocationSpec::parse(raw)),
            ValueKind::Item => Self::Item(ItemSpec::parse(raw)),
            ValueKind::Sound => Self::Sound(SoundSpec::parse(raw)),
            ValueKind::Particle => Self::Particle(ParticleSpec::parse(raw)),
            ValueKind::PotionEffect => Self::PotionEffect(EffectSpec::parse(raw)),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Text { .. } => ValueKind::Text,
            Self::Number(_) => ValueKind::Number,
            Self::Variable { .. } => ValueKind::Variable,
            Self::Location(_) => ValueKind::Location,
            Self::Item(_) => ValueKind::Item,
            Self::Sound(_) => ValueKind::Sound,
            Self::Particle(_) => ValueKind::Particle,
            Self::PotionEffect(_) => ValueKind::PotionEffect,
        }
    }

    /// The authored form of this value.
    #[must_use]
    pub fn raw(&self) -> Cow<'_, str> {
        match self {
            Self::Text { raw } => Cow::Borrowed(raw),
            Self::Number(n) => Cow::Borrowed(&n.raw),
            Self::Variable { name } => Cow::Owned(format!("{{{name}}}")),
            Self::Location(l) => Cow::Owned(l.to_string()),
            Self::Item(i) => Cow::Owned(i.to_string()),
            Self::Sound(s) => Cow::Owned(format!("{},{},{}", s.sound, s.volume, s.pitch)),
            Self::Particle(p) => Cow::Owned(format!("{},{},{}", p.particle, p.count, p.spread)),
            Self::PotionEffect(e) => Cow::Owned(format!(
                "{},{},{}",
                e.effect, e.duration_ticks, e.amplifier
            )),
        }
    }

    /// Whether a value of this kind can stand in for `expected`.
    ///
    /// Variable references and text templates are accepted anywhere because their runtime kind
    /// is only known after substitution.
    #[must_use]
    pub fn satisfies(&self, expected: ValueKind) -> bool {
        let kind = self.kind();
        kind == expected || matches!(kind, ValueKind::Variable | ValueKind::Text)
    }
}

impl From<&str> for Value {
    fn from(raw: &str) -> Self {
        Self::text(raw)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

/// A number template with its literal pre-parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNumber", into = "RawNumber")]
pub struct NumberValue {
    raw: String,
    literal: Option<f64>,
}

impl NumberValue {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let literal = raw.trim().parse::<f64>().ok();
        Self { raw, literal }
    }

    #[must_use]
    pub fn literal(value: f64) -> Self {
        Self {
            raw: format_number(value),
            literal: Some(value),
        }
    }

    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parsed literal, if the raw text contains no placeholders.
    #[must_use]
    pub const fn as_literal(&self) -> Option<f64> {
        self.literal
    }
}

#[derive(Serialize, Deserialize)]
struct RawNumber {
    raw: String,
}

impl From<RawNumber> for NumberValue {
    fn from(value: RawNumber) -> Self {
        Self::new(value.raw)
    }
}

impl From<NumberValue> for RawNumber {
    fn from(value: NumberValue) -> Self {
        Self { raw: value.raw }
    }
}

/// A location in an (optionally named) world.
///
/// `world: None` resolves to the host's default world at execution time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl LocationSpec {
    /// Parse `x,y,z`, `world,x,y,z` or `world,x,y,z,yaw,pitch`.
    ///
    /// Anything else yields the default world origin.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        let parsed = match parts.as_slice() {
            [x, y, z] => coords(None, x, y, z, "0", "0"),
            [world, x, y, z] => coords(Some(world), x, y, z, "0", "0"),
            [world, x, y, z, yaw, pitch] => coords(Some(world), x, y, z, yaw, pitch),
            _ => None,
        };
        parsed.unwrap_or_else(|| {
            tracing::warn!("malformed location '{}', using world origin", raw);
            Self::default()
        })
    }
}

fn coords(
    world: Option<&&str>,
    x: &str,
    y: &str,
    z: &str,
    yaw: &str,
    pitch: &str,
) -> Option<LocationSpec> {
    Some(LocationSpec {
        world: world.map(|w| (*w).to_string()).filter(|w| !w.is_empty()),
        x: x.parse().ok()?,
        y: y.parse().ok()?,
        z: z.parse().ok()?,
        yaw: yaw.parse().ok()?,
        pitch: pitch.parse().ok()?,
    })
}

impl fmt::Display for LocationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(world) = &self.world {
            write!(f, "{world},")?;
        }
        write!(f, "{},{},{}", self.x, self.y, self.z)?;
        if self.yaw != 0.0 || self.pitch != 0.0 {
            write!(f, ",{},{}", self.yaw, self.pitch)?;
        }
        Ok(())
    }
}

/// An item stack description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub material: String,
    #[serde(default = "one")]
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ItemSpec {
    /// Parse `MATERIAL[,amount[,display name]]`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.splitn(3, ',').map(str::trim);
        let material = parts.next().unwrap_or_default();
        let material = if material.is_empty() { "AIR" } else { material };
        let amount = parts.next().and_then(|a| a.parse().ok()).unwrap_or(1);
        let display_name = parts.next().filter(|n| !n.is_empty()).map(str::to_string);
        Self {
            material: material.to_ascii_uppercase(),
            amount,
            display_name,
        }
    }
}

impl fmt::Display for ItemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.material, self.amount)?;
        if let Some(name) = &self.display_name {
            write!(f, ",{name}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundSpec {
    pub sound: String,
    #[serde(default = "unit")]
    pub volume: f32,
    #[serde(default = "unit")]
    pub pitch: f32,
}

impl SoundSpec {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',').map(str::trim);
        Self {
            sound: parts.next().unwrap_or_default().to_string(),
            volume: parts.next().and_then(|v| v.parse().ok()).unwrap_or(1.0),
            pitch: parts.next().and_then(|p| p.parse().ok()).unwrap_or(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSpec {
    pub particle: String,
    #[serde(default = "one")]
    pub count: u32,
    #[serde(default)]
    pub spread: f64,
}

impl ParticleSpec {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',').map(str::trim);
        Self {
            particle: parts.next().unwrap_or_default().to_string(),
            count: parts.next().and_then(|c| c.parse().ok()).unwrap_or(1),
            spread: parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0),
        }
    }
}

/// A potion effect: type, duration in ticks and amplifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub effect: String,
    #[serde(default = "default_effect_duration")]
    pub duration_ticks: u32,
    #[serde(default)]
    pub amplifier: u8,
}

impl EffectSpec {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',').map(str::trim);
        Self {
            effect: parts.next().unwrap_or_default().to_ascii_uppercase(),
            duration_ticks: parts
                .next()
                .and_then(|d| d.parse().ok())
                .unwrap_or_else(default_effect_duration),
            amplifier: parts.next().and_then(|a| a.parse().ok()).unwrap_or(0),
        }
    }
}

const fn one() -> u32 {
    1
}

const fn unit() -> f32 {
    1.0
}

const fn default_effect_duration() -> u32 {
    200
}

/// `{name}` and `%name%` both name the variable `name`.
fn strip_variable_markers(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .or_else(|| trimmed.strip_prefix('%').and_then(|r| r.strip_suffix('%')))
        .unwrap_or(trimmed)
        .to_string()
}

/// Format a number for display, avoiding unnecessary decimals.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_literal_is_parsed_at_construction() {
        let Value::Number(n) = Value::number_raw("2.5") else {
            panic!("expected number");
        };
        assert_eq!(n.as_literal(), Some(2.5));

        let Value::Number(n) = Value::number_raw("{count}") else {
            panic!("expected number");
        };
        assert_eq!(n.as_literal(), None);
        assert_eq!(n.raw(), "{count}");
    }

    #[test]
    fn test_location_forms() {
        let loc = LocationSpec::parse("1, 64, -3");
        assert_eq!(loc.world, None);
        assert!((loc.y - 64.0).abs() < f64::EPSILON);

        let loc = LocationSpec::parse("nether,1,2,3,90,10");
        assert_eq!(loc.world.as_deref(), Some("nether"));
        assert!((loc.yaw - 90.0).abs() < f32::EPSILON);

        assert_eq!(LocationSpec::parse("garbage"), LocationSpec::default());
    }

    #[test]
    fn test_item_parse_defaults() {
        let item = ItemSpec::parse("diamond");
        assert_eq!(item.material, "DIAMOND");
        assert_eq!(item.amount, 1);
        assert_eq!(item.display_name, None);

        let item = ItemSpec::parse("STONE,16,Rocks, lots of them");
        assert_eq!(item.amount, 16);
        assert_eq!(item.display_name.as_deref(), Some("Rocks, lots of them"));
    }

    #[test]
    fn test_variable_markers_stripped() {
        assert_eq!(Value::variable("{score}"), Value::variable("score"));
        assert_eq!(Value::variable("%score%"), Value::variable("score"));
    }

    #[test]
    fn test_value_serde_tags() {
        let json = serde_json::to_value(Value::number(3.0)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "number", "raw": "3"}));

        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, Value::number(3.0));
    }

    #[test]
    fn test_satisfies() {
        assert!(Value::number(1.0).satisfies(ValueKind::Number));
        assert!(Value::variable("x").satisfies(ValueKind::Location));
        assert!(!Value::Item(ItemSpec::parse("STONE")).satisfies(ValueKind::Number));
    }
}
