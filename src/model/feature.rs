use super::{default_true, Attributes};
use crate::folders;
use serde::{Deserialize, Serialize};

/// User-selectable group of components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,

    /// Explicit id, otherwise derived from the name
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Whether the user may deselect the feature
    #[serde(default = "default_true")]
    pub allow_change: bool,

    /// Installed by default
    #[serde(default = "default_true")]
    pub is_enabled: bool,

    /// Name of the parent feature
    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default)]
    pub configurable_dir: Option<String>,

    #[serde(default)]
    pub condition: Option<FeatureCondition>,

    #[serde(default)]
    pub attributes: Attributes,
}

/// Install level override applied when the condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCondition {
    pub level: u32,
    pub text: String,
}

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            description: String::new(),
            allow_change: true,
            is_enabled: true,
            parent: None,
            configurable_dir: None,
            condition: None,
            attributes: Attributes::new(),
        }
    }

    pub fn id(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => folders::expand(&self.name),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Not installed unless selected
    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    /// Always installed, cannot be deselected
    pub fn required(mut self) -> Self {
        self.allow_change = false;
        self
    }

    pub fn with_condition(mut self, level: u32, text: impl Into<String>) -> Self {
        self.condition = Some(FeatureCondition {
            level,
            text: text.into(),
        });
        self
    }

    pub fn configurable_dir(mut self, dir_id: impl Into<String>) -> Self {
        self.configurable_dir = Some(dir_id.into());
        self
    }
}

impl Default for Feature {
    fn default() -> Self {
        Feature::new("Complete")
    }
}
