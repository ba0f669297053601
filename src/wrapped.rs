// SPDX-License-Identifier: AGPL-3.0-or-later

//! `WrappedOperation`: an [`Operation`] plus an opaque metadata envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::operation::Operation;

/// A scalar value in a [`Metadata`] map. Matches the wire scalar domain
/// (`clientId: string`, `cursor: integer`, `selectionEnd: integer`); the
/// algebra never interprets these, only merges or carries them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    String(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::String(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::String(s)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Int(n)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

/// An opaque, flat, string-keyed map of scalar values attached to an
/// operation: client id, cursor position, selection end, or anything else a
/// caller wants to carry alongside an edit. A `BTreeMap` keeps iteration
/// (and therefore serialization and the `Eq` impl used by the property
/// tests) order-deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetaValue>);

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    /// Right-biased merge: keys in `other` overwrite keys in `self`.
    #[must_use]
    pub fn merged_with(&self, other: &Metadata) -> Metadata {
        let mut merged = self.clone();
        for (k, v) in &other.0 {
            merged.0.insert(k.clone(), v.clone());
        }
        merged
    }
}

impl FromIterator<(String, MetaValue)> for Metadata {
    fn from_iter<T: IntoIterator<Item = (String, MetaValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An [`Operation`] paired with opaque [`Metadata`]. `apply`/`invert`
/// delegate straight to the wrapped operation, keeping the metadata
/// unchanged; `compose` right-biased-merges the two operations' metadata;
/// `transform` keeps each side's own metadata, unmerged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedOperation {
    pub operation: Operation,
    pub meta: Metadata,
}

impl WrappedOperation {
    #[must_use]
    pub fn new(operation: Operation, meta: Metadata) -> Self {
        Self { operation, meta }
    }

    pub fn apply(&self, input: &str) -> Result<String> {
        self.operation.apply(input)
    }

    pub fn invert(&self, input: &str) -> Result<WrappedOperation> {
        Ok(WrappedOperation::new(
            self.operation.invert(input)?,
            self.meta.clone(),
        ))
    }

    pub fn compose(&self, other: &WrappedOperation) -> Result<WrappedOperation> {
        Ok(WrappedOperation::new(
            self.operation.compose(&other.operation)?,
            self.meta.merged_with(&other.meta),
        ))
    }

    pub fn transform(
        &self,
        other: &WrappedOperation,
    ) -> Result<(WrappedOperation, WrappedOperation)> {
        let (a_prime, b_prime) = self.operation.transform(&other.operation)?;
        Ok((
            WrappedOperation::new(a_prime, self.meta.clone()),
            WrappedOperation::new(b_prime, other.meta.clone()),
        ))
    }

    #[must_use]
    pub const fn base_len(&self) -> usize {
        self.operation.base_len()
    }

    #[must_use]
    pub const fn target_len(&self) -> usize {
        self.operation.target_len()
    }
}
