//! Record identifiers and link descriptors.
//!
//! A [`RecordId`] names a record in the backing store. Identifiers are
//! opaque to the indexing engine: they are compared, hashed, printed and
//! used as lock keys, nothing more. The one piece of structure they carry
//! is the master/variant relationship: a variant record shares the master
//! key of its master record and adds a set of variant properties.
//!
//! A [`Link`] is the decoded value of a link-typed record field. It either
//! names its target explicitly or is relative, in which case it resolves
//! against the master of the record the traversal started from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a record in the backing store.
///
/// # Examples
///
/// ```
/// use tern::record::RecordId;
///
/// let master = RecordId::new("book1");
/// let variant = master.variant([("lang", "en")]);
///
/// assert!(!master.is_variant());
/// assert!(variant.is_variant());
/// assert_eq!(variant.master(), master);
/// assert_eq!(variant.to_string(), "book1.lang=en");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    /// The master key shared by a master record and all of its variants.
    master_key: String,
    /// Variant properties; empty for a master record. Ordered so that the
    /// printed form and the lock path are deterministic.
    variant_props: BTreeMap<String, String>,
}

impl RecordId {
    /// Create a master record id from its key.
    pub fn new<S: Into<String>>(master_key: S) -> Self {
        RecordId {
            master_key: master_key.into(),
            variant_props: BTreeMap::new(),
        }
    }

    /// Create a variant id of this id's master with the given properties.
    pub fn variant<K, V, I>(&self, props: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        RecordId {
            master_key: self.master_key.clone(),
            variant_props: props
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The master key of this record.
    pub fn master_key(&self) -> &str {
        &self.master_key
    }

    /// The id of the master record. For a master id this is a copy of self.
    pub fn master(&self) -> RecordId {
        RecordId::new(self.master_key.clone())
    }

    /// Whether this id names a variant record.
    pub fn is_variant(&self) -> bool {
        !self.variant_props.is_empty()
    }

    /// The variant properties of this id; empty for a master record.
    pub fn variant_props(&self) -> &BTreeMap<String, String> {
        &self.variant_props
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.master_key)?;
        for (i, (key, value)) in self.variant_props.iter().enumerate() {
            let sep = if i == 0 { '.' } else { ',' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

/// The decoded value of a link-typed record field.
///
/// A link either carries an explicit target id, or it is relative: resolving
/// a relative link yields the master of the record the traversal started
/// from. Relative links let variant records point at "my own master" without
/// repeating their identity in every field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    target: Option<RecordId>,
}

impl Link {
    /// Create a link with an explicit target.
    pub fn to(target: RecordId) -> Self {
        Link {
            target: Some(target),
        }
    }

    /// Create a relative link (no explicit target).
    pub fn relative() -> Self {
        Link { target: None }
    }

    /// The explicit target, if any.
    pub fn target(&self) -> Option<&RecordId> {
        self.target.as_ref()
    }

    /// Resolve this link to a concrete record id.
    ///
    /// `context` is the top-level record of the traversal; a link without an
    /// explicit target resolves to that record's master.
    pub fn resolve(&self, context: &RecordId) -> RecordId {
        match &self.target {
            Some(target) => target.clone(),
            None => context.master(),
        }
    }
}
