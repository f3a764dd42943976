//! Process-wide interning.
//!
//! An [`Interner`] hands out `&'static` references that are unique per value,
//! so two interned values can be compared and hashed by address. Entries are
//! leaked on purpose and live until the process exits; the tables are never
//! reset because outstanding handles must keep their identity.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

type Table<T> = RwLock<HashSet<&'static T>>;

fn empty_table<T: ?Sized + 'static>() -> Table<T> {
    RwLock::new(HashSet::new())
}

/// A table of leaked, deduplicated values.
pub struct Interner<T: ?Sized + 'static> {
    table: LazyLock<Table<T>>,
}

impl<T: ?Sized + Eq + Hash + 'static> Interner<T> {
    /// Create an empty interner, usable in a `static`.
    pub const fn new() -> Self {
        Interner {
            table: LazyLock::new(empty_table::<T>),
        }
    }

    /// Return the canonical reference for `key`, calling `leak` to allocate
    /// it the first time the value is seen.
    pub fn intern_with(&self, key: &T, leak: impl FnOnce() -> &'static T) -> &'static T {
        {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&interned) = table.get(key) {
                return interned;
            }
        }

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);

        // Another thread may have won the race between the two locks.
        if let Some(&interned) = table.get(key) {
            return interned;
        }

        let leaked = leak();
        table.insert(leaked);
        leaked
    }

    /// Number of distinct values interned so far.
    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized + Eq + Hash + 'static> Default for Interner<T> {
    fn default() -> Self {
        Self::new()
    }
}

static STRINGS: Interner<str> = Interner::new();

/// An interned string: `Copy`, compared and hashed by address.
///
/// Used for project, target and plugin-type names that are looked up often.
#[derive(Clone, Copy)]
pub struct InternedString {
    inner: &'static str,
}

impl InternedString {
    pub fn new(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();
        let inner = STRINGS.intern_with(s, || Box::leak(s.to_owned().into_boxed_str()));
        InternedString { inner }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.inner
    }
}

impl Default for InternedString {
    fn default() -> Self {
        InternedString::new("")
    }
}

impl Deref for InternedString {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.inner
    }
}

impl AsRef<str> for InternedString {
    #[inline]
    fn as_ref(&self) -> &str {
        self.inner
    }
}

impl PartialEq for InternedString {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.inner, other.inner)
    }
}

impl Eq for InternedString {}

impl PartialOrd for InternedString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InternedString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(other.inner)
    }
}

impl Hash for InternedString {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.inner, state)
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner, f)
    }
}

impl fmt::Display for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner, f)
    }
}

impl From<&str> for InternedString {
    fn from(s: &str) -> Self {
        InternedString::new(s)
    }
}

impl From<String> for InternedString {
    fn from(s: String) -> Self {
        InternedString::new(s)
    }
}

impl Serialize for InternedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InternedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(InternedString::new(s))
    }
}
