//! Common types used throughout the ICN project

use std::collections::BTreeSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// An identity that can endorse a transition (a key hash, a DID, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create a new identity
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Get the identity as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque handle to the current location of another record.
///
/// Records never hold each other directly; a cross-record check goes through a
/// collaborator that knows how to resolve the handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordRef(String);

impl RecordRef {
    /// Create a new record reference
    pub fn new<S: Into<String>>(handle: S) -> Self {
        Self(handle.into())
    }

    /// Get the handle as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the handle is known at all
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque bytes: a proposed successor record, a produced output, or a
/// proposal's execution payload. Serialized as a hex string.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Wrap raw bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encode a record as a payload.
    ///
    /// The encoding is canonical: compact JSON with object keys in sorted
    /// order, so equal records always encode to equal bytes.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| Error::serialization(e.to_string()))?;
        let bytes = serde_json::to_vec(&value).map_err(|e| Error::serialization(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Whether these bytes are exactly the canonical encoding of `value`
    pub fn is_canonical_encoding_of<T: Serialize>(&self, value: &T) -> Result<bool> {
        Ok(Self::encode(value)?.as_bytes() == self.as_bytes())
    }

    /// Decode the payload as a record of type `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.0).map_err(|e| Error::deserialization(e.to_string()))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hex-encoded SHA-256 of the payload bytes
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.0))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({})", hex::encode(&self.0))
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded)
            .map(Payload)
            .map_err(serde::de::Error::custom)
    }
}

/// The set of identities that endorsed a transition.
///
/// Membership matters, not order. Where a workflow needs "the" signer (the
/// contributor, the proposer, the approver) it uses [`SignerSet::primary`],
/// the first identity in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerSet(BTreeSet<Identity>);

impl SignerSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// The acting signer, if any
    pub fn primary(&self) -> Option<&Identity> {
        self.0.iter().next()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.0.contains(identity)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.0.iter()
    }
}

impl<I: Into<Identity>> FromIterator<I> for SignerSet {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
