//! Key-value records.
use crate::error::ArenaError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{IntoIter, Iter, Keys},
    HashMap,
};

/// A value stored in a [`Record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    /// Scalar metric such as a loss or a cumulative reward.
    Scalar(f32),

    /// Timestamp.
    DateTime(DateTime<Local>),

    /// 1-dimensional array, e.g., the encoded state of a tick.
    Array1(Vec<f32>),

    /// Text, e.g., the winner of a match.
    String(String),
}

/// A set of named values produced by one training step or one match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a value, overwriting the old one with the same key.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over key-value pairs.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Consumes the record into an iterator over key-value pairs.
    pub fn into_iter_in_record(self) -> IntoIter<String, RecordValue> {
        self.0.into_iter()
    }

    /// Gets the value of the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges two records. Values of `record` win on key collisions.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Merges `record` into `self`. Values of `record` win on key collisions.
    pub fn merge_inplace(&mut self, record: Record) {
        self.0.extend(record.0);
    }

    /// Gets a scalar value.
    ///
    /// Fails if the key is missing or the value is not [`RecordValue::Scalar`].
    pub fn get_scalar(&self, k: &str) -> Result<f32, ArenaError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(_) => Err(ArenaError::RecordValueTypeError("Scalar".to_string())),
            None => Err(ArenaError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a 1-dimensional array.
    pub fn get_array1(&self, k: &str) -> Result<Vec<f32>, ArenaError> {
        match self.0.get(k) {
            Some(RecordValue::Array1(v)) => Ok(v.clone()),
            Some(_) => Err(ArenaError::RecordValueTypeError("Array1".to_string())),
            None => Err(ArenaError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value.
    pub fn get_string(&self, k: &str) -> Result<String, ArenaError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(_) => Err(ArenaError::RecordValueTypeError("String".to_string())),
            None => Err(ArenaError::RecordKeyError(k.to_string())),
        }
    }

    /// Returns `true` if the record has no values.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of values in the record.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites() {
        let r1 = Record::from_slice(&[
            ("loss", RecordValue::Scalar(1.0)),
            ("beta", RecordValue::Scalar(0.4)),
        ]);
        let r2 = Record::from_scalar("loss", 0.5);
        let r = r1.merge(r2);
        assert_eq!(r.len(), 2);
        assert_eq!(r.get_scalar("loss").unwrap(), 0.5);
        assert_eq!(r.get_scalar("beta").unwrap(), 0.4);
    }

    #[test]
    fn test_get_errors() {
        let mut r = Record::empty();
        r.insert("winner", RecordValue::String("none".into()));
        assert!(matches!(
            r.get_scalar("winner"),
            Err(ArenaError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            r.get_scalar("ticks"),
            Err(ArenaError::RecordKeyError(_))
        ));
        assert_eq!(r.get_string("winner").unwrap(), "none");
    }
}
