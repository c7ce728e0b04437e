//! Identifier and GUID generation
//!
//! Component GUIDs are content addressed: the same component id under the
//! same product seed always yields the same GUID, so unchanged entities keep
//! their GUIDs from one build to the next.
//!
//! # Example
//!
//! ```
//! use uuid::Uuid;
//! use wix_tree::guid::GuidGenerator;
//!
//! let seed = Uuid::parse_str("6fe30b47-2577-43ad-9095-1861ba25889b").unwrap();
//! let gen = GuidGenerator::new(seed);
//! assert_eq!(gen.component_guid("Component.MyApp.exe"), gen.component_guid("Component.MyApp.exe"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// GUID format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidFormat {
    /// xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
    #[default]
    Hyphens,
    /// {XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}
    Braces,
    /// xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx
    Plain,
}

impl GuidFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hyphens" | "h" | "d" => Some(GuidFormat::Hyphens),
            "braces" | "b" | "registry" => Some(GuidFormat::Braces),
            "plain" | "p" | "n" => Some(GuidFormat::Plain),
            _ => None,
        }
    }
}

pub fn format_guid(guid: &Uuid, format: GuidFormat) -> String {
    match format {
        GuidFormat::Hyphens => guid.hyphenated().to_string(),
        GuidFormat::Braces => format!("{{{}}}", guid.hyphenated().to_string().to_uppercase()),
        GuidFormat::Plain => guid.simple().to_string(),
    }
}

/// Seeded GUID generator for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidGenerator {
    seed: Uuid,
}

impl GuidGenerator {
    pub fn new(seed: Uuid) -> Self {
        Self { seed }
    }

    /// Seed for a project that declares no GUID: derived from the name so
    /// repeated builds still agree.
    pub fn seed_from_name(product_name: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("wix-tree:product:{}", product_name).as_bytes())
    }

    pub fn seed(&self) -> Uuid {
        self.seed
    }

    /// GUID of a synthesized component
    pub fn component_guid(&self, component_id: &str) -> Uuid {
        Uuid::new_v5(&self.seed, component_id.as_bytes())
    }

    /// Per-version product id
    pub fn product_id(&self, version: &str) -> Uuid {
        Uuid::new_v5(&self.seed, format!("version:{}", version).as_bytes())
    }

    /// Upgrade code shared by every version of the product family
    pub fn upgrade_code(&self) -> Uuid {
        self.seed
    }
}

/// Monotonically increasing GUIDs. Unique within one generator, but not
/// content addressed.
#[derive(Debug, Clone)]
pub struct SequentialGuid {
    current: u128,
}

impl SequentialGuid {
    pub fn new(start: Uuid) -> Self {
        Self {
            current: start.as_u128(),
        }
    }

    pub fn next(&mut self) -> Uuid {
        self.current = self.current.wrapping_add(1);
        Uuid::from_u128(self.current)
    }
}

/// Kinds of entities that receive generated ids. Each kind has its own
/// namespace, so a file and a shortcut may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Directory,
    File,
    Shortcut,
    Action,
    Binary,
    MergeModule,
    Permission,
    EnvVar,
    User,
    Database,
    Certificate,
}

/// Per-compile identifier generator. A fresh one is created for every
/// compile, so independent builds never share counters.
#[derive(Debug, Default)]
pub struct IdGenerator {
    seen: HashMap<(IdKind, String), u32>,
    counters: HashMap<IdKind, u32>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id derived from an (already escaped) name. The first use returns the
    /// name itself; repeats get `.1`, `.2`, ... skipping any suffixed id that
    /// is already taken. Every returned id is recorded as used.
    pub fn from_name(&mut self, kind: IdKind, name: &str) -> String {
        let Some(count) = self.seen.get(&(kind, name.to_string())).copied() else {
            self.seen.insert((kind, name.to_string()), 0);
            return name.to_string();
        };

        let mut next = count;
        let candidate = loop {
            next += 1;
            let candidate = format!("{}.{}", name, next);
            if !self.seen.contains_key(&(kind, candidate.clone())) {
                break candidate;
            }
        };
        self.seen.insert((kind, name.to_string()), next);
        self.seen.insert((kind, candidate.clone()), 0);
        candidate
    }

    /// Register an explicit id so later generated ids never collide with it.
    pub fn reserve(&mut self, kind: IdKind, id: &str) {
        self.seen.entry((kind, id.to_string())).or_insert(0);
    }

    /// Next value of a plain counter (`prefix1`, `prefix2`, ...).
    pub fn next(&mut self, kind: IdKind, prefix: &str) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}{}", prefix, counter)
    }
}
