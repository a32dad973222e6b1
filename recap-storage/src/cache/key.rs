//! Canonical cache keys for memoized operations.
//!
//! A [`CacheKey`] is the operation name plus its full argument list. Every
//! argument is reduced to a canonical [`KeyPart`] before it reaches the key,
//! so the same logical query always lands on the same entry no matter how
//! the caller spelled it:
//!
//! - integers of any width and [`UserId`]s become `KeyPart::Int`
//! - strings are kept verbatim as `KeyPart::Text`, so `"007"` and `"7"`
//!   stay distinct
//! - ids that arrive as text go through [`KeyPart::id`], which maps
//!   `"0042"` and `42` to the same part

use recap_core::UserId;
use std::fmt;

/// One canonicalized argument of a memoized call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl KeyPart {
    /// Canonicalize an identifier given as text.
    ///
    /// Anything [`UserId`] accepts becomes the same `Int` as the numeric
    /// id. Other input is kept verbatim.
    pub fn id(value: &str) -> Self {
        match value.parse::<UserId>() {
            Ok(id) => KeyPart::Int(id.as_i64()),
            Err(_) => KeyPart::Text(value.to_string()),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(n) => write!(f, "{}", n),
            KeyPart::Text(s) => write!(f, "{:?}", s),
            KeyPart::Bool(b) => write!(f, "{}", b),
        }
    }
}

macro_rules! key_part_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for KeyPart {
                fn from(value: $t) -> Self {
                    KeyPart::Int(i64::from(value))
                }
            }
        )*
    };
}

key_part_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => KeyPart::Int(n),
            Err(_) => KeyPart::Text(value.to_string()),
        }
    }
}

impl From<usize> for KeyPart {
    fn from(value: usize) -> Self {
        KeyPart::from(value as u64)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        KeyPart::Bool(value)
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Text(value)
    }
}

impl From<&String> for KeyPart {
    fn from(value: &String) -> Self {
        KeyPart::Text(value.clone())
    }
}

impl From<UserId> for KeyPart {
    fn from(value: UserId) -> Self {
        KeyPart::Int(value.as_i64())
    }
}

/// Identity of one memoized result: operation plus canonical arguments.
///
/// Fields are private; keys are only built through [`CacheKey::new`] or
/// [`cache_key!`](crate::cache_key), which canonicalize every part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: &'static str,
    parts: Vec<KeyPart>,
}

impl CacheKey {
    pub fn new(operation: &'static str, parts: Vec<KeyPart>) -> Self {
        Self { operation, parts }
    }

    /// Name of the memoized operation.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Canonical argument list.
    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.operation)?;
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", part)?;
        }
        f.write_str(")")
    }
}

/// Build a [`CacheKey`] from an operation name and arguments.
///
/// ```
/// use recap_storage::cache_key;
///
/// use recap_storage::KeyPart;
///
/// let a = cache_key!("user_stats"; 42i64, 2025);
/// let b = cache_key!("user_stats"; KeyPart::id("0042"), 2025);
/// assert_eq!(a, b);
/// assert_ne!(cache_key!("word_usage"; "007"), cache_key!("word_usage"; "7"));
/// ```
#[macro_export]
macro_rules! cache_key {
    ($operation:expr) => {
        $crate::cache::CacheKey::new($operation, ::std::vec::Vec::new())
    };
    ($operation:expr; $($part:expr),+ $(,)?) => {
        $crate::cache::CacheKey::new(
            $operation,
            ::std::vec![$($crate::cache::KeyPart::from($part)),+],
        )
    };
}
