//! Attribute lists: flat `[key, value, key, value, ..., 0]` arrays.

use crate::error::{KmsError, KmsResult};

/// Property keys shared by every buffer-object backend in the family.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKey {
    BoType = 1,
    Width = 2,
    Height = 3,
    Pitch = 4,
    Handle = 5,
}

/// Terminates an attribute list.
pub const ATTR_TERMINATE: u32 = 0;

impl AttrKey {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::BoType),
            2 => Some(Self::Width),
            3 => Some(Self::Height),
            4 => Some(Self::Pitch),
            5 => Some(Self::Handle),
            _ => None,
        }
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self as u32
    }
}

/// Checks that every key before the terminator is accepted at creation time.
///
/// Only `WIDTH`, `HEIGHT` and `BO_TYPE` are allowed. The first other key rejects the
/// whole list. Values are not inspected.
///
/// # Errors
/// `InvalidArgument` for an unrecognised key, a key without a value slot, or a list
/// that runs out before the terminator.
pub fn validate_attrs(attrs: &[u32]) -> KmsResult<()> {
    let mut i = 0;
    loop {
        let Some(&key) = attrs.get(i) else {
            return Err(KmsError::invalid("attribute list is not terminated"));
        };
        if key == ATTR_TERMINATE {
            return Ok(());
        }
        match AttrKey::from_raw(key) {
            Some(AttrKey::Width | AttrKey::Height | AttrKey::BoType) => {}
            _ => {
                return Err(KmsError::invalid(format!(
                    "attribute key {key} not accepted at index {i}"
                )));
            }
        }
        if attrs.get(i + 1).is_none() {
            return Err(KmsError::invalid(format!("attribute key {key} has no value")));
        }
        i += 2;
    }
}

/// Builds a well-formed, terminated attribute list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrList {
    pairs: Vec<(AttrKey, u32)>,
}

impl AttrList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: AttrKey, value: u32) -> Self {
        self.pairs.push((key, value));
        self
    }

    #[must_use]
    pub fn width(self, width: u32) -> Self {
        self.with(AttrKey::Width, width)
    }

    #[must_use]
    pub fn height(self, height: u32) -> Self {
        self.with(AttrKey::Height, height)
    }

    #[must_use]
    pub fn bo_type(self, bo_type: u32) -> Self {
        self.with(AttrKey::BoType, bo_type)
    }

    /// Flattens the pairs and appends the terminator.
    #[must_use]
    pub fn to_raw(&self) -> Vec<u32> {
        let mut raw = Vec::with_capacity(self.pairs.len() * 2 + 1);
        for &(key, value) in &self.pairs {
            raw.push(key.raw());
            raw.push(value);
        }
        raw.push(ATTR_TERMINATE);
        raw
    }
}
