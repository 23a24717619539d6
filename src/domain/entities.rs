//! Domain entities: node payloads and the values they carry

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix marking a fragment text or group name as negative in the signed view.
pub const SIGN_PREFIX: &str = "n!";

/// Name given to groups created without one.
pub const DEFAULT_GROUP_NAME: &str = "Group";

/// Emphasis weight, stored as non-negative hundredths.
///
/// Every factor in the tree goes through [`Factor::parse`] or [`Factor::from_f64`],
/// so values are always rounded to two decimals and clamped to `0.00..=Factor::MAX`.
/// The upper bound keeps every factor exact when written as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Factor(u64);

impl Factor {
    pub const ZERO: Factor = Factor(0);
    pub const ONE: Factor = Factor(100);
    /// 2^53 hundredths: below this a factor's f64 value is spaced finer than 0.01.
    pub const MAX: Factor = Factor(1 << 53);

    /// Build a factor from raw user input.
    ///
    /// Returns `None` (factor unset) for empty, non-numeric, NaN or infinite input.
    /// Negative numbers clamp to `0.00`. Rounding is half-up on the shortest decimal
    /// representation of the parsed number: `"1.005"` becomes `1.01`.
    pub fn parse(raw: &str) -> Option<Factor> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let value: f64 = trimmed.parse().ok()?;
        Self::from_f64(value)
    }

    /// Normalize a numeric value with the same rules as [`Factor::parse`].
    pub fn from_f64(value: f64) -> Option<Factor> {
        if !value.is_finite() {
            return None;
        }
        if value <= 0.0 {
            return Some(Factor::ZERO);
        }
        // f64 Display never uses exponent notation and yields the shortest
        // representation that round-trips, so digits can be rounded textually.
        Some(Factor::from_hundredths(round_half_up_hundredths(
            &value.to_string(),
        )))
    }

    /// Values above [`Factor::MAX`] clamp to it.
    pub fn from_hundredths(hundredths: u64) -> Factor {
        Factor(hundredths.min(Factor::MAX.0))
    }

    pub fn hundredths(self) -> u64 {
        self.0
    }

    pub fn is_one(self) -> bool {
        self == Factor::ONE
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

fn round_half_up_hundredths(decimal: &str) -> u64 {
    let (whole, fraction) = decimal.split_once('.').unwrap_or((decimal, ""));
    let mut digits = fraction
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| u64::from(b - b'0'));
    let tenths = digits.next().unwrap_or(0);
    let hundredths = digits.next().unwrap_or(0);
    let carry = u64::from(digits.next().is_some_and(|d| d >= 5));

    // integer parts beyond u64 range saturate
    let whole: u64 = whole.parse().unwrap_or(u64::MAX);
    whole
        .saturating_mul(100)
        .saturating_add(tenths * 10 + hundredths)
        .saturating_add(carry)
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Factor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Factor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Factor::from_f64(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid factor: {value}")))
    }
}

/// Split the signed view of a text into `(negative, content)`.
///
/// Leading whitespace followed by [`SIGN_PREFIX`] marks the text negative and the
/// prefix is dropped. Line breaks are removed; the content is otherwise kept verbatim.
pub fn split_sign(raw: &str) -> (bool, String) {
    let single_line: String = raw.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    match single_line.trim_start().strip_prefix(SIGN_PREFIX) {
        Some(content) => (true, content.to_string()),
        None => (false, single_line),
    }
}

/// Render content back to its signed view.
pub fn join_sign(negative: bool, content: &str) -> String {
    if negative {
        format!("{SIGN_PREFIX}{content}")
    } else {
        content.to_string()
    }
}

/// Leaf prompt token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub enabled: bool,
    /// Sign-stripped content
    pub text: String,
    pub factor: Option<Factor>,
    pub negative: bool,
}

impl Default for Fragment {
    fn default() -> Self {
        Self {
            enabled: true,
            text: String::new(),
            factor: None,
            negative: false,
        }
    }
}

impl Fragment {
    /// Create an enabled fragment from its signed view (`"n!sky"` is negative `sky`).
    pub fn from_signed(raw: &str) -> Self {
        let (negative, text) = split_sign(raw);
        Self {
            text,
            negative,
            ..Self::default()
        }
    }

    /// Trimmed content; empty fragments are deletable and compile to nothing.
    pub fn content(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.content().is_empty()
    }

    pub fn signed_text(&self) -> String {
        join_sign(self.negative, &self.text)
    }
}

/// Named container payload; children live on the arena node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub enabled: bool,
    /// Sign-stripped name
    pub name: String,
    pub factor: Option<Factor>,
    pub negative: bool,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            enabled: true,
            name: DEFAULT_GROUP_NAME.to_string(),
            factor: None,
            negative: false,
        }
    }
}

impl Group {
    /// Create an enabled group from its signed name. A blank name falls back to `Group`.
    pub fn from_signed(raw: &str) -> Self {
        let (negative, name) = normalize_name(raw);
        Self {
            name,
            negative,
            ..Self::default()
        }
    }

    pub fn signed_name(&self) -> String {
        join_sign(self.negative, &self.name)
    }
}

/// Signed-name parsing shared by group creation and renames.
pub fn normalize_name(raw: &str) -> (bool, String) {
    let (negative, name) = split_sign(raw);
    if name.trim().is_empty() {
        (negative, DEFAULT_GROUP_NAME.to_string())
    } else {
        (negative, name)
    }
}
