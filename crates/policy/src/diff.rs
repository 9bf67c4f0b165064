//! State-diff verification
//!
//! A [`FieldPolicy`] whitelists the fields a transition may touch and says how
//! each may change. Records are compared through their serde representation,
//! so every field the policy does not name must be identical in the old and
//! new record without the caller having to list it.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::rejection::DiffViolation;

/// Check applied to a single sequence element
pub struct Predicate<'a> {
    check: Box<dyn Fn(&Value) -> bool + 'a>,
}

impl<'a> Predicate<'a> {
    pub fn new(check: impl Fn(&Value) -> bool + 'a) -> Self {
        Self { check: Box::new(check) }
    }

    /// The element must be exactly `expected`
    pub fn equals(expected: Value) -> Self {
        Self::new(move |value| *value == expected)
    }

    /// The element must decode as `T` and satisfy `check`
    pub fn decoded<T: DeserializeOwned>(check: impl Fn(&T) -> bool + 'a) -> Self {
        Self::new(move |value| {
            serde_json::from_value::<T>(value.clone())
                .map(|decoded| check(&decoded))
                .unwrap_or(false)
        })
    }

    pub fn matches(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Predicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

/// How a whitelisted field may change
#[derive(Debug)]
pub enum FieldRule<'a> {
    /// Identical before and after (the implicit rule for unlisted fields)
    Unchanged,
    /// Any value; used for advisory fields whose truth is enforced elsewhere
    Unrestricted,
    /// Sequence keeps every element in place and gains one trailing element
    AppendExactlyOne(Predicate<'a>),
    /// Sequence keeps its length; only the entry at the index changes, under a nested policy
    ReplaceEntryAt(usize, FieldPolicy<'a>),
    /// Field becomes exactly this value
    ReplacedWith(Value),
    /// Set (array) or map (object) keeps every member and gains exactly this one, order-insensitive
    ContainsAllPlusOne(Value),
}

/// Whitelist of field-level change rules for one record shape
#[derive(Debug, Default)]
pub struct FieldPolicy<'a> {
    rules: BTreeMap<&'static str, FieldRule<'a>>,
}

/// Serialize a value for use in a rule
pub fn value_of<T: Serialize + ?Sized>(value: &T) -> Result<Value, DiffViolation> {
    serde_json::to_value(value)
        .map_err(|e| DiffViolation::SuccessorShapeInvalid(format!("unserializable value: {}", e)))
}

/// Compare two records under `policy`
pub fn verify_transition<T: Serialize>(old: &T, new: &T, policy: &FieldPolicy<'_>) -> Result<(), DiffViolation> {
    let old = value_of(old)?;
    let new = value_of(new)?;
    policy.verify(&old, &new)
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

fn sequences<'v>(field: &str, old: &'v Value, new: &'v Value) -> Result<(&'v Vec<Value>, &'v Vec<Value>), DiffViolation> {
    match (old.as_array(), new.as_array()) {
        (Some(old), Some(new)) => Ok((old, new)),
        _ => Err(DiffViolation::SuccessorShapeInvalid(format!("'{}' is not a sequence", field))),
    }
}

fn first_mismatch(old: &[Value], new: &[Value]) -> Option<usize> {
    old.iter().zip(new.iter()).position(|(o, n)| o != n)
}

impl<'a> FieldPolicy<'a> {
    pub fn new() -> Self {
        Self { rules: BTreeMap::new() }
    }

    /// Whitelist `field` under `rule`
    pub fn allow(mut self, field: &'static str, rule: FieldRule<'a>) -> Self {
        self.rules.insert(field, rule);
        self
    }

    pub fn verify(&self, old: &Value, new: &Value) -> Result<(), DiffViolation> {
        self.verify_at("", old, new)
    }

    fn verify_at(&self, path: &str, old: &Value, new: &Value) -> Result<(), DiffViolation> {
        let (old_fields, new_fields) = match (old.as_object(), new.as_object()) {
            (Some(old), Some(new)) => (old, new),
            _ => {
                let what = if path.is_empty() { "successor" } else { path };
                return Err(DiffViolation::SuccessorShapeInvalid(format!("{} is not a record", what)));
            }
        };

        if let Some(name) = self.rules.keys().find(|name| !old_fields.contains_key(**name)) {
            return Err(DiffViolation::SuccessorShapeInvalid(format!(
                "policy names unknown field '{}'",
                child_path(path, name)
            )));
        }

        if let Some(name) = new_fields.keys().find(|name| !old_fields.contains_key(*name)) {
            return Err(DiffViolation::FieldUnexpectedlyChanged(child_path(path, name)));
        }

        for (name, old_value) in old_fields {
            let field = child_path(path, name);
            let new_value = new_fields
                .get(name)
                .ok_or_else(|| DiffViolation::FieldUnexpectedlyChanged(field.clone()))?;

            match self.rules.get(name.as_str()) {
                None => {
                    if old_value != new_value {
                        return Err(DiffViolation::FieldUnexpectedlyChanged(field));
                    }
                }
                Some(rule) => rule.check(&field, old_value, new_value)?,
            }
        }

        Ok(())
    }
}

impl FieldRule<'_> {
    fn check(&self, field: &str, old: &Value, new: &Value) -> Result<(), DiffViolation> {
        match self {
            FieldRule::Unchanged => {
                if old != new {
                    return Err(DiffViolation::FieldUnexpectedlyChanged(field.to_string()));
                }
                Ok(())
            }
            FieldRule::Unrestricted => Ok(()),
            FieldRule::AppendExactlyOne(predicate) => {
                let (old_seq, new_seq) = sequences(field, old, new)?;
                if new_seq.len() != old_seq.len() + 1 {
                    return Err(DiffViolation::SequenceLengthMismatch {
                        field: field.to_string(),
                        expected: old_seq.len() + 1,
                        actual: new_seq.len(),
                    });
                }
                if let Some(index) = first_mismatch(old_seq, new_seq) {
                    return Err(DiffViolation::ElementMismatch { field: field.to_string(), index });
                }
                if !predicate.matches(&new_seq[old_seq.len()]) {
                    return Err(DiffViolation::ElementMismatch {
                        field: field.to_string(),
                        index: old_seq.len(),
                    });
                }
                Ok(())
            }
            FieldRule::ReplaceEntryAt(index, policy) => {
                let (old_seq, new_seq) = sequences(field, old, new)?;
                if new_seq.len() != old_seq.len() {
                    return Err(DiffViolation::SequenceLengthMismatch {
                        field: field.to_string(),
                        expected: old_seq.len(),
                        actual: new_seq.len(),
                    });
                }
                if *index >= old_seq.len() {
                    return Err(DiffViolation::ElementMismatch { field: field.to_string(), index: *index });
                }
                for (i, (old_entry, new_entry)) in old_seq.iter().zip(new_seq.iter()).enumerate() {
                    if i == *index {
                        policy.verify_at(&format!("{}[{}]", field, i), old_entry, new_entry)?;
                    } else if old_entry != new_entry {
                        return Err(DiffViolation::ElementMismatch { field: field.to_string(), index: i });
                    }
                }
                Ok(())
            }
            FieldRule::ReplacedWith(expected) => {
                if let (Some(expected_seq), Some(new_seq)) = (expected.as_array(), new.as_array()) {
                    if expected_seq.len() != new_seq.len() {
                        return Err(DiffViolation::SequenceLengthMismatch {
                            field: field.to_string(),
                            expected: expected_seq.len(),
                            actual: new_seq.len(),
                        });
                    }
                    if let Some(index) = first_mismatch(expected_seq, new_seq) {
                        return Err(DiffViolation::ElementMismatch { field: field.to_string(), index });
                    }
                    return Ok(());
                }
                if new != expected {
                    return Err(DiffViolation::FieldUnexpectedlyChanged(field.to_string()));
                }
                Ok(())
            }
            FieldRule::ContainsAllPlusOne(element) => match (old, new) {
                (Value::Array(old_set), Value::Array(new_set)) => {
                    set_plus_one(field, old_set, new_set, element)
                }
                (Value::Object(old_map), Value::Object(new_map)) => {
                    map_plus_one(field, old_map, new_map, element)
                }
                _ => Err(DiffViolation::SuccessorShapeInvalid(format!(
                    "'{}' is neither a set nor a map",
                    field
                ))),
            },
        }
    }
}

fn set_plus_one(field: &str, old: &[Value], new: &[Value], element: &Value) -> Result<(), DiffViolation> {
    if new.len() != old.len() + 1 {
        return Err(DiffViolation::SequenceLengthMismatch {
            field: field.to_string(),
            expected: old.len() + 1,
            actual: new.len(),
        });
    }
    if let Some(index) = old.iter().position(|member| !new.contains(member)) {
        return Err(DiffViolation::ElementMismatch { field: field.to_string(), index });
    }
    // The added member must be new, and the grown set must stay duplicate-free.
    let duplicated = new
        .iter()
        .enumerate()
        .any(|(i, member)| new[i + 1..].contains(member));
    if old.contains(element) || !new.contains(element) || duplicated {
        return Err(DiffViolation::ElementMismatch { field: field.to_string(), index: old.len() });
    }
    Ok(())
}

fn map_plus_one(
    field: &str,
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    element: &Value,
) -> Result<(), DiffViolation> {
    let single_entry = element
        .as_object()
        .filter(|entry| entry.len() == 1)
        .and_then(|entry| entry.iter().next());
    let (key, value) = match single_entry {
        Some(pair) => pair,
        None => {
            return Err(DiffViolation::SuccessorShapeInvalid(format!(
                "entry added to '{}' must be a single key/value pair",
                field
            )))
        }
    };

    if new.len() != old.len() + 1 {
        return Err(DiffViolation::SequenceLengthMismatch {
            field: field.to_string(),
            expected: old.len() + 1,
            actual: new.len(),
        });
    }
    if let Some(index) = old.iter().position(|(k, v)| new.get(k) != Some(v)) {
        return Err(DiffViolation::ElementMismatch { field: field.to_string(), index });
    }
    if old.contains_key(key) || new.get(key) != Some(value) {
        return Err(DiffViolation::ElementMismatch { field: field.to_string(), index: old.len() });
    }
    Ok(())
}
