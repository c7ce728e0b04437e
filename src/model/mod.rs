//! Declarative project tree
//!
//! Everything the compiler reads. Trees are built in code through the
//! builder methods or deserialized from a manifest (see [`crate::manifest`]).

mod action;
mod dir;
mod entities;
mod feature;
mod project;

pub use action::{ActionKind, CustomAction, Execute, Return, Sequence, Step, When};
pub use dir::{
    Dir, File, FileAssociation, MergeModule, Permission, ProcessorArchitecture, ServiceInstaller,
    Shortcut,
};
pub use entities::{
    Binary, Certificate, EnvVarAction, EnvVarPart, EnvironmentVariable, LaunchCondition, Property,
    RegistryHive, RegistryKeyAction, RegistrySearch, RegValue, RegValueKind, SqlDatabase,
    SqlScript, SqlString, User,
};
pub use feature::{Feature, FeatureCondition};
pub use project::{
    culture_info, InstallScope, MajorUpgradeStrategy, Platform, Project, UiKind, VersionRange,
};

use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extra attributes copied verbatim onto an emitted element
pub type Attributes = BTreeMap<String, String>;

/// Condition text with optional attributes for the `Condition` element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionDef")]
pub struct Condition {
    pub text: String,
    pub attributes: Attributes,
}

impl Condition {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: Attributes::new(),
        }
    }
}

impl From<&str> for Condition {
    fn from(text: &str) -> Self {
        Condition::new(text)
    }
}

/// Manifest form of a condition: a bare string or a table
#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionDef {
    Text(String),
    Full {
        text: String,
        #[serde(default)]
        attributes: Attributes,
    },
}

impl From<ConditionDef> for Condition {
    fn from(def: ConditionDef) -> Self {
        match def {
            ConditionDef::Text(text) => Condition::new(text),
            ConditionDef::Full { text, attributes } => Condition { text, attributes },
        }
    }
}

/// Every kind of top-level entity a project may hold
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Dir(Dir),
    Action(CustomAction),
    Registry(RegValue),
    Env(EnvironmentVariable),
    Property(Property),
    Binary(Binary),
    User(User),
    Sql(SqlDatabase),
    Certificate(Certificate),
    LaunchCondition(LaunchCondition),
    Feature(Feature),
}

impl Entity {
    /// Classify a tagged manifest item (`kind: dir`, `kind: registry`, ...)
    pub fn from_tagged(kind: &str, value: serde_json::Value) -> Result<Self> {
        let entity = match kind {
            "dir" => Entity::Dir(serde_json::from_value(value)?),
            "action" => Entity::Action(serde_json::from_value(value)?),
            "registry" => Entity::Registry(serde_json::from_value(value)?),
            "env" => Entity::Env(serde_json::from_value(value)?),
            "property" => Entity::Property(serde_json::from_value(value)?),
            "binary" => Entity::Binary(serde_json::from_value(value)?),
            "user" => Entity::User(serde_json::from_value(value)?),
            "sql" => Entity::Sql(serde_json::from_value(value)?),
            "certificate" => Entity::Certificate(serde_json::from_value(value)?),
            "launch-condition" => Entity::LaunchCondition(serde_json::from_value(value)?),
            "feature" => Entity::Feature(serde_json::from_value(value)?),
            other => return Err(CompileError::UnrecognizedEntity(other.to_string())),
        };
        Ok(entity)
    }
}

pub(crate) fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub(crate) fn default_true() -> bool {
    true
}
