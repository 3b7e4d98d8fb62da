//! Runtime value types.

use blockscript_lang::{
    ActorId, EffectSpec, ItemSpec, ParticleSpec, Scalar, SoundSpec, format_number,
};

use crate::host::EntityId;

/// A resolved location in a named world.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
}

impl Location {
    #[must_use]
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Squared distance, or `None` across worlds.
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> Option<f64> {
        if self.world != other.world {
            return None;
        }
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        Some(dz.mul_add(dz, dx.mul_add(dx, dy * dy)))
    }

    /// Whether `other` is in the same world and within `radius`.
    #[must_use]
    pub fn within(&self, other: &Self, radius: f64) -> bool {
        self.distance_squared(other)
            .is_some_and(|d| d <= radius * radius)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.world,
            format_number(self.x),
            format_number(self.y),
            format_number(self.z)
        )
    }
}

/// A value at execution time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RuntimeValue {
    /// No value / unset.
    #[default]
    None,
    Boolean(bool),
    Number(f64),
    Text(String),
    Actor(ActorId),
    Entity(EntityId),
    Location(Location),
    Item(ItemSpec),
    Sound(SoundSpec),
    Particle(ParticleSpec),
    Effect(EffectSpec),
    List(Vec<RuntimeValue>),
}

impl RuntimeValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Convert to boolean (truthiness).
    #[must_use]
    pub fn as_boolean(&self) -> bool {
        match self {
            Self::None => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Text(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
            Self::List(l) => !l.is_empty(),
            _ => true,
        }
    }

    /// Convert to number. Unparseable text is 0.
    #[must_use]
    pub fn as_number(&self) -> f64 {
        self.try_number().unwrap_or(0.0)
    }

    /// Numeric form, if the value has one.
    #[must_use]
    pub fn try_number(&self) -> Option<f64> {
        match self {
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::List(l) => Some(l.len() as f64),
            _ => None,
        }
    }

    /// Convert to text.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::Actor(id) => id.to_string(),
            Self::Entity(id) => format!("entity:{}", id.0),
            Self::Location(l) => l.to_string(),
            Self::Item(i) => i.to_string(),
            Self::Sound(s) => s.sound.clone(),
            Self::Particle(p) => p.particle.clone(),
            Self::Effect(e) => e.effect.clone(),
            Self::List(l) => l.iter().map(Self::as_text).collect::<Vec<_>>().join(", "),
        }
    }

    /// Elements for iteration. Text is split on commas; anything else is a single element.
    #[must_use]
    pub fn into_list(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::List(items) => items,
            Self::Text(s) if s.trim().is_empty() => Vec::new(),
            Self::Text(s) => s.split(',').map(|part| Self::text(part.trim())).collect(),
            other => vec![other],
        }
    }

    /// Check equality with another value.
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => (a - b).abs() < f64::EPSILON,
            (Self::Text(a), Self::Text(b)) => a.eq_ignore_ascii_case(b),
            (Self::Actor(a), Self::Actor(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a == b,
            // Cross-type: try numeric comparison, then textual
            (Self::Number(_), Self::Text(_)) | (Self::Text(_), Self::Number(_)) => {
                match (self.try_number(), other.try_number()) {
                    (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                    _ => self.as_text().eq_ignore_ascii_case(&other.as_text()),
                }
            }
            (Self::Boolean(_), Self::Text(_)) | (Self::Text(_), Self::Boolean(_)) => {
                self.as_text().eq_ignore_ascii_case(&other.as_text())
            }
            (a, b) => a == b,
        }
    }

    /// Persistable form. Host handles (actors, entities) and compound values are stored as
    /// text.
    #[must_use]
    pub fn to_scalar(&self) -> Scalar {
        match self {
            Self::Boolean(b) => Scalar::Boolean(*b),
            Self::Number(n) => Scalar::Number(*n),
            Self::List(items) => Scalar::List(items.iter().map(Self::to_scalar).collect()),
            other => Scalar::Text(other.as_text()),
        }
    }
}

impl From<&Scalar> for RuntimeValue {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Boolean(b) => Self::Boolean(*b),
            Scalar::Number(n) => Self::Number(*n),
            Scalar::Text(s) => Self::Text(s.clone()),
            Scalar::List(items) => Self::List(items.iter().map(Self::from).collect()),
        }
    }
}

impl From<f64> for RuntimeValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for RuntimeValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RuntimeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_conversion() {
        assert!(!RuntimeValue::None.as_boolean());
        assert!(!RuntimeValue::Number(0.0).as_boolean());
        assert!(RuntimeValue::Number(1.0).as_boolean());
        assert!(!RuntimeValue::text("").as_boolean());
        assert!(!RuntimeValue::text("false").as_boolean());
        assert!(RuntimeValue::text("hello").as_boolean());
    }

    #[test]
    fn test_number_conversion() {
        assert!((RuntimeValue::None.as_number() - 0.0).abs() < f64::EPSILON);
        assert!((RuntimeValue::text(" 3.5 ").as_number() - 3.5).abs() < f64::EPSILON);
        assert!((RuntimeValue::text("abc").as_number() - 0.0).abs() < f64::EPSILON);
        assert_eq!(RuntimeValue::text("abc").try_number(), None);
    }

    #[test]
    fn test_equality() {
        assert!(RuntimeValue::text("Hello").equals(&RuntimeValue::text("hello")));
        assert!(RuntimeValue::Number(42.0).equals(&RuntimeValue::text("42")));
        assert!(RuntimeValue::Boolean(true).equals(&RuntimeValue::text("true")));
        assert!(!RuntimeValue::Number(1.0).equals(&RuntimeValue::text("one")));
    }

    #[test]
    fn test_into_list_splits_text() {
        let items = RuntimeValue::text("a, b,c").into_list();
        assert_eq!(items, vec!["a".into(), "b".into(), "c".into()]);
        assert!(RuntimeValue::text("  ").into_list().is_empty());
    }

    #[test]
    fn test_scalar_conversion() {
        let value = RuntimeValue::List(vec![1.0.into(), "x".into()]);
        assert_eq!(RuntimeValue::from(&value.to_scalar()), value);
    }

    #[test]
    fn test_distance_across_worlds() {
        let a = Location::new("lobby", 0.0, 0.0, 0.0);
        let b = Location::new("arena", 1.0, 0.0, 0.0);
        assert_eq!(a.distance_squared(&b), None);
        assert!(a.within(&Location::new("lobby", 3.0, 4.0, 0.0), 5.0));
    }
}
