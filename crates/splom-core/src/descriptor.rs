#![forbid(unsafe_code)]

//! Overlay and render-strategy descriptors and their canonical strings.
//!
//! A [`Descriptor`] is an immutable value: a type tag (`kind`) plus a set of
//! named parameters. Its canonical string is the sole identity used for
//! equality and diffing; two descriptors with the same canonical string are
//! interchangeable.
//!
//! # Canonical form
//!
//! ```text
//! kind                       (no parameters)
//! kind:key=value,key=value   (keys in ascending byte order)
//! ```
//!
//! The four structural characters `%`, `:`, `,` and `=` are percent-escaped
//! wherever they occur inside the kind, a key, or a value, so every
//! descriptor canonicalizes and the first bare `:` always separates the kind
//! from its parameters. Parameters are kept in a `BTreeMap`, which makes the
//! string independent of the order in which they were supplied.
//!
//! # Example
//!
//! ```
//! use splom_core::Descriptor;
//!
//! let a = Descriptor::new("lowess").with_param("window", 120).with_param("color", "#ff0000");
//! let b = Descriptor::new("lowess").with_param("color", "#ff0000").with_param("window", 120);
//! assert_eq!(a.canonical(), "lowess:color=#ff0000,window=120");
//! assert_eq!(a.canonical(), b.canonical());
//! assert_eq!(Descriptor::parse(&a.canonical()).unwrap(), a);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const ESCAPED: [char; 4] = ['%', ':', ',', '='];

/// An overlay or render-strategy configuration.
///
/// Cloning is an explicit value copy; it never goes through the canonical
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Descriptor {
    kind: String,
    params: BTreeMap<String, String>,
}

impl Descriptor {
    /// Create a descriptor with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Set a parameter, replacing any previous value for `key`.
    ///
    /// The value is stored in its `Display` form. Floating point values use
    /// Rust's shortest round-trip formatting, which is deterministic.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    /// The type tag.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Parameters in canonical (ascending key) order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// The raw text of a parameter.
    pub fn raw_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parse a parameter as `T`.
    ///
    /// Returns `Ok(None)` when the parameter is absent.
    pub fn param<T>(&self, key: &str) -> Result<Option<T>, ParamError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.params.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|e| ParamError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Parse a parameter as `T`, falling back to `default` when absent.
    pub fn param_or<T>(&self, key: &str, default: T) -> Result<T, ParamError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        Ok(self.param(key)?.unwrap_or(default))
    }

    /// Reject parameters outside `allowed`.
    pub fn check_keys(&self, allowed: &[&str]) -> Result<(), ParamError> {
        match self.params.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(ParamError::Unknown {
                kind: self.kind.clone(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// The canonical identity string.
    pub fn canonical(&self) -> String {
        let mut out = String::with_capacity(self.kind.len() + self.params.len() * 12);
        escape_into(&self.kind, &mut out);
        for (i, (key, value)) in self.params.iter().enumerate() {
            out.push(if i == 0 { ':' } else { ',' });
            escape_into(key, &mut out);
            out.push('=');
            escape_into(value, &mut out);
        }
        out
    }

    /// Reconstruct a descriptor from its canonical string.
    ///
    /// Parameter order in `s` does not matter; the result canonicalizes to
    /// the sorted form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let (kind_raw, params_raw) = match s.split_once(':') {
            Some((k, p)) => (k, Some(p)),
            None => (s, None),
        };
        let kind = unescape(kind_raw)?;
        if kind.is_empty() {
            return Err(ParseError::EmptyKind);
        }

        let mut params = BTreeMap::new();
        if let Some(params_raw) = params_raw {
            if params_raw.is_empty() {
                return Err(ParseError::EmptyParameterList { kind });
            }
            for pair in params_raw.split(',') {
                let (key_raw, value_raw) = pair
                    .split_once('=')
                    .ok_or_else(|| ParseError::MissingValue(pair.to_string()))?;
                let key = unescape(key_raw)?;
                if key.is_empty() {
                    return Err(ParseError::EmptyKey(pair.to_string()));
                }
                let value = unescape(value_raw)?;
                if params.insert(key.clone(), value).is_some() {
                    return Err(ParseError::DuplicateKey(key));
                }
            }
        }

        Ok(Self { kind, params })
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for Descriptor {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A canonical string could not be parsed back into a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("descriptor has an empty type tag")]
    EmptyKind,
    #[error("descriptor {kind:?} has a ':' but no parameters")]
    EmptyParameterList { kind: String },
    #[error("parameter {0:?} has no '='")]
    MissingValue(String),
    #[error("parameter {0:?} has an empty name")]
    EmptyKey(String),
    #[error("parameter {0:?} appears more than once")]
    DuplicateKey(String),
    #[error("invalid escape sequence in {0:?}")]
    BadEscape(String),
    #[error("escaped text in {0:?} is not valid UTF-8")]
    InvalidUtf8(String),
}

/// A parameter was present but unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("parameter {key}={value:?} is invalid: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
    #[error("{kind} does not accept parameter {key:?}")]
    Unknown { kind: String, key: String },
}

fn escape_into(raw: &str, out: &mut String) {
    for ch in raw.chars() {
        if ESCAPED.contains(&ch) {
            out.push_str(&format!("%{:02X}", ch as u32));
        } else {
            out.push(ch);
        }
    }
}

fn unescape(raw: &str) -> Result<String, ParseError> {
    if !raw.contains('%') {
        return Ok(raw.to_string());
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| ParseError::BadEscape(raw.to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| ParseError::InvalidUtf8(raw.to_string()))
}
