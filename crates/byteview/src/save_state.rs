//! String-keyed property bag used for every piece of persisted viewer state.
//!
//! Keys are free-form strings; values are a small closed set of scalar types
//! plus nested bags. Reads never fail: a typed getter returns the supplied
//! default when the key is missing or holds a value of another type, so old
//! or hand-edited state degrades one entry at a time.
//!
//! Arbitrary-precision numbers (offsets, row indices) are stored as
//! lower-case hexadecimal strings.
//!
//! # Examples
//!
//! ```rust
//! use byteview::SaveState;
//!
//! let mut state = SaveState::new();
//! state.put_int("Bytes Per Line", 16);
//! state.put_strings("View Names", vec!["Hex".into(), "Ascii".into()]);
//!
//! let json = state.to_json().unwrap();
//! let back = SaveState::from_json(&json).unwrap();
//! assert_eq!(back.get_int("Bytes Per Line", 8), 16);
//! assert_eq!(back.get_int("Missing", 8), 8);
//! ```
use std::collections::BTreeMap;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// One value stored in a `SaveState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateValue {
    Int(i64),
    Bool(bool),
    String(String),
    Strings(Vec<String>),
    State(SaveState),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveState {
    entries: BTreeMap<String, StateValue>,
}

impl SaveState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.entries.remove(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: StateValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.put(key, StateValue::Int(value));
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.entries.get(key) {
            Some(StateValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// `get_int` narrowed to `usize`; negative or oversized values yield
    /// the default.
    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.entries.get(key) {
            Some(StateValue::Int(v)) => usize::try_from(*v).unwrap_or(default),
            _ => default,
        }
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.put(key, StateValue::Bool(value));
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.entries.get(key) {
            Some(StateValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.put(key, StateValue::String(value.into()));
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.entries.get(key) {
            Some(StateValue::String(v)) => v.clone(),
            _ => default.to_string(),
        }
    }

    pub fn put_strings(&mut self, key: impl Into<String>, value: Vec<String>) {
        self.put(key, StateValue::Strings(value));
    }

    pub fn get_strings(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.entries.get(key) {
            Some(StateValue::Strings(v)) => v.clone(),
            _ => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn put_state(&mut self, key: impl Into<String>, value: SaveState) {
        self.put(key, StateValue::State(value));
    }

    /// Nested bag stored under `key`, if any.
    pub fn get_state(&self, key: &str) -> Option<&SaveState> {
        match self.entries.get(key) {
            Some(StateValue::State(v)) => Some(v),
            _ => None,
        }
    }

    pub fn put_big(&mut self, key: impl Into<String>, value: &BigUint) {
        self.put(key, StateValue::String(value.to_str_radix(16)));
    }

    pub fn get_big(&self, key: &str, default: BigUint) -> BigUint {
        self.try_get_big(key).unwrap_or(default)
    }

    /// Arbitrary-precision value under `key`, or `None` when missing or not
    /// a hexadecimal string.
    pub fn try_get_big(&self, key: &str) -> Option<BigUint> {
        match self.entries.get(key) {
            Some(StateValue::String(v)) => BigUint::parse_bytes(v.as_bytes(), 16),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }
}
