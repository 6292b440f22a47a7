use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Represents the final configuration after merging defaults, the project file and CLI args.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Root every destination folder is resolved against.
    pub source_directory: PathBuf,
    /// Root the fetched libraries live in; patterns expand under `<packages_directory>/<library>`.
    pub packages_directory: PathBuf,
    pub extension_folders: BTreeMap<String, String>,
    pub minified: MinifiedOptions,
    pub default_folder: String,
    pub default_minified_folder: String,
    pub manifest: Manifest,
}

#[derive(Debug, Clone, Default)]
pub struct MinifiedOptions {
    /// Extensions (without the dot) that never get a `.min` sibling lookup.
    pub ignored_extensions: BTreeSet<String>,
    pub prefer_minified: bool,
    pub rename_to_minified: bool,
}

/// A string-keyed map that keeps the order keys were written in.
///
/// Declaration order drives the duplicate tie-break during reconciliation, so
/// neither a `HashMap` nor a `BTreeMap` will do here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> &[(String, V)] {
        &self.0
    }

    /// Inserts or replaces `key`. A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// `libraryKey -> package entries`.
pub type Manifest = OrderedMap<PackageEntries>;

/// `packageEntryKey -> destinationSpec`.
pub type PackageEntries = OrderedMap<DestinationSpec>;

/// Right-hand side of a package entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
pub enum DestinationSpec {
    /// Logical destination filename; `*` takes each matched file's own stem.
    File(String),
    /// Several patterns expanded in order; the entry key is then the logical
    /// filename instead of a glob.
    Patterns(Vec<String>),
    /// A nested group of entries sharing the enclosing library.
    Group(PackageEntries),
}

/// Which bucket a resolved file lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ignore,
    Move,
}

/// A single copy from a fetched package into the project layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileOperation {
    pub from: PathBuf,
    pub to: PathBuf,
    pub rename: String,
}

impl FileOperation {
    /// Full path of the file this operation writes.
    pub fn target(&self) -> PathBuf {
        self.to.join(&self.rename)
    }
}

/// Operations resolved so far, split by action, before ignores are applied.
#[derive(Debug, Default)]
pub struct Bucket {
    pub ignored: Vec<FileOperation>,
    pub moved: Vec<FileOperation>,
}

impl Bucket {
    pub fn push(&mut self, action: Action, op: FileOperation) {
        match action {
            Action::Ignore => self.ignored.push(op),
            Action::Move => self.moved.push(op),
        }
    }

    pub fn append(&mut self, mut other: Bucket) {
        self.ignored.append(&mut other.ignored);
        self.moved.append(&mut other.moved);
    }

    /// Drops every move whose source is also ignored, then keeps only the
    /// first move for each remaining source and for each written target.
    pub fn reconcile(self) -> Vec<FileOperation> {
        let Bucket { ignored, moved } = self;
        let ignored: HashSet<&Path> = ignored.iter().map(|op| op.from.as_path()).collect();
        let mut sources: HashSet<PathBuf> = HashSet::new();
        let mut targets: HashSet<PathBuf> = HashSet::new();

        moved
            .into_iter()
            .filter(|op| !ignored.contains(op.from.as_path()))
            .filter(|op| {
                if !sources.insert(op.from.clone()) {
                    log::debug!(
                        "Dropping duplicate operation for {} (-> {})",
                        op.from.display(),
                        op.target().display()
                    );
                    return false;
                }
                let target = op.target();
                if targets.contains(&target) {
                    log::warn!(
                        "{} already receives another file; skipping {}",
                        target.display(),
                        op.from.display()
                    );
                    return false;
                }
                targets.insert(target);
                true
            })
            .collect()
    }
}
