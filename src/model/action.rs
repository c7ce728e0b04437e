use super::{default_true, Attributes};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative placement of an action against its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum When {
    Before,
    #[default]
    After,
}

impl When {
    pub fn as_str(&self) -> &'static str {
        match self {
            When::Before => "Before",
            When::After => "After",
        }
    }
}

/// Anchor an action is sequenced against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Step {
    /// The action declared just before this one
    PreviousAction,
    /// The previous action, or `InstallInitialize` when there is none
    PreviousActionOrInstallInitialize,
    /// The previous action, or `InstallFinalize` when there is none
    PreviousActionOrInstallFinalize,
    /// A standard or custom action name
    Named(String),
}

impl Step {
    pub const INSTALL_INITIALIZE: &'static str = "InstallInitialize";
    pub const INSTALL_FINALIZE: &'static str = "InstallFinalize";
    pub const INSTALL_FILES: &'static str = "InstallFiles";
    pub const FIND_RELATED_PRODUCTS: &'static str = "FindRelatedProducts";

    pub fn named(name: impl Into<String>) -> Self {
        Step::Named(name.into())
    }

    pub fn install_initialize() -> Self {
        Step::named(Self::INSTALL_INITIALIZE)
    }

    pub fn install_finalize() -> Self {
        Step::named(Self::INSTALL_FINALIZE)
    }
}

impl Default for Step {
    fn default() -> Self {
        Step::install_finalize()
    }
}

impl From<String> for Step {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PreviousAction" => Step::PreviousAction,
            "PreviousActionOrInstallInitialize" => Step::PreviousActionOrInstallInitialize,
            "PreviousActionOrInstallFinalize" => Step::PreviousActionOrInstallFinalize,
            _ => Step::Named(s),
        }
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        step.to_string()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::PreviousAction => write!(f, "PreviousAction"),
            Step::PreviousActionOrInstallInitialize => write!(f, "PreviousActionOrInstallInitialize"),
            Step::PreviousActionOrInstallFinalize => write!(f, "PreviousActionOrInstallFinalize"),
            Step::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Named execution sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sequence {
    InstallExecuteSequence,
    InstallUISequence,
    AdminExecuteSequence,
    AdminUISequence,
    AdvertiseExecuteSequence,
}

impl Sequence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sequence::InstallExecuteSequence => "InstallExecuteSequence",
            Sequence::InstallUISequence => "InstallUISequence",
            Sequence::AdminExecuteSequence => "AdminExecuteSequence",
            Sequence::AdminUISequence => "AdminUISequence",
            Sequence::AdvertiseExecuteSequence => "AdvertiseExecuteSequence",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Return {
    #[default]
    Check,
    Ignore,
    AsyncNoWait,
    AsyncWait,
}

impl Return {
    pub fn as_str(&self) -> &'static str {
        match self {
            Return::Check => "check",
            Return::Ignore => "ignore",
            Return::AsyncNoWait => "asyncNoWait",
            Return::AsyncWait => "asyncWait",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Execute {
    #[default]
    Immediate,
    Deferred,
    Rollback,
    Commit,
    OncePerProcess,
    FirstSequence,
    SecondSequence,
}

impl Execute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Execute::Immediate => "immediate",
            Execute::Deferred => "deferred",
            Execute::Rollback => "rollback",
            Execute::Commit => "commit",
            Execute::OncePerProcess => "oncePerProcess",
            Execute::FirstSequence => "firstSequence",
            Execute::SecondSequence => "secondSequence",
        }
    }
}

/// What a custom action does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionKind {
    /// Assign a literal value to a property
    SetProperty { property: String, value: String },

    /// Inline VBScript
    Script { code: String },

    /// VBScript file embedded as a binary, calling one procedure
    ScriptFile { script_file: String, procedure: String },

    /// Managed entry point in an assembly packaged into a native DLL
    Managed {
        assembly: String,
        method: String,
        /// Properties captured for deferred execution (`NAME` or `NAME=value`)
        #[serde(default)]
        uses_properties: Vec<String>,
    },

    /// Command line run silently through the quiet execution helper
    QtCmdLine {
        app_path: String,
        #[serde(default)]
        args: String,
    },

    /// Run a file installed by this package
    InstalledFile {
        file_key: String,
        #[serde(default)]
        args: String,
    },

    /// Run an executable embedded as a binary
    BinaryFile {
        binary_key: String,
        #[serde(default)]
        args: String,
    },

    /// Run an executable at a path on the target machine
    PathFile {
        app_path: String,
        #[serde(default)]
        args: String,
        #[serde(default)]
        working_dir: String,
    },
}

/// Custom action with its placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomAction {
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(flatten)]
    pub kind: ActionKind,

    #[serde(default)]
    pub when: When,

    #[serde(default)]
    pub step: Step,

    /// Explicit sequence number, overriding `when`/`step`
    #[serde(default)]
    pub sequence_number: Option<u32>,

    /// Sequences the action runs in; empty means not sequenced at all
    #[serde(default = "default_sequences")]
    pub sequences: Vec<Sequence>,

    #[serde(default = "default_condition")]
    pub condition: String,

    #[serde(default)]
    pub execute: Execute,

    #[serde(default, rename = "return")]
    pub return_: Return,

    #[serde(default = "default_true")]
    pub impersonate: bool,

    #[serde(default)]
    pub attributes: Attributes,
}

fn default_sequences() -> Vec<Sequence> {
    vec![Sequence::InstallExecuteSequence]
}

fn default_condition() -> String {
    "1".to_string()
}

impl CustomAction {
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            id: None,
            kind,
            when: When::After,
            step: Step::default(),
            sequence_number: None,
            sequences: default_sequences(),
            condition: default_condition(),
            execute: Execute::Immediate,
            return_: Return::Check,
            impersonate: true,
            attributes: Attributes::new(),
        }
    }

    pub fn set_property(name: impl Into<String>, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            name,
            ActionKind::SetProperty {
                property: property.into(),
                value: value.into(),
            },
        )
    }

    pub fn managed(name: impl Into<String>, assembly: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(
            name,
            ActionKind::Managed {
                assembly: assembly.into(),
                method: method.into(),
                uses_properties: Vec::new(),
            },
        )
    }

    pub fn script(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(name, ActionKind::Script { code: code.into() })
    }

    pub fn qt_cmd_line(name: impl Into<String>, app_path: impl Into<String>, args: impl Into<String>) -> Self {
        Self::new(
            name,
            ActionKind::QtCmdLine {
                app_path: app_path.into(),
                args: args.into(),
            },
        )
    }

    pub fn path_file(name: impl Into<String>, app_path: impl Into<String>, args: impl Into<String>, working_dir: impl Into<String>) -> Self {
        Self::new(
            name,
            ActionKind::PathFile {
                app_path: app_path.into(),
                args: args.into(),
                working_dir: working_dir.into(),
            },
        )
    }

    pub fn placed(mut self, when: When, step: Step) -> Self {
        self.when = when;
        self.step = step;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, sequence_number: u32) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }

    pub fn in_sequences(mut self, sequences: Vec<Sequence>) -> Self {
        self.sequences = sequences;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn deferred(mut self) -> Self {
        self.execute = Execute::Deferred;
        self.impersonate = false;
        self
    }

    pub fn uses_properties(mut self, properties: &[&str]) -> Self {
        if let ActionKind::Managed { uses_properties, .. } = &mut self.kind {
            *uses_properties = properties.iter().map(|p| p.to_string()).collect();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_round_trip_names() {
        assert_eq!(Step::from("PreviousAction".to_string()), Step::PreviousAction);
        assert_eq!(Step::from("InstallFiles".to_string()), Step::named("InstallFiles"));
        assert_eq!(Step::PreviousActionOrInstallFinalize.to_string(), "PreviousActionOrInstallFinalize");
    }

    #[test]
    fn test_action_from_manifest() {
        let action: CustomAction = serde_json::from_str(
            r#"{
                "name": "Configure",
                "type": "managed",
                "assembly": "Acme.Setup.dll",
                "method": "Configure",
                "execute": "deferred",
                "step": "PreviousAction",
                "sequences": ["InstallExecuteSequence", "InstallUISequence"]
            }"#,
        )
        .unwrap();
        assert!(matches!(action.kind, ActionKind::Managed { .. }));
        assert_eq!(action.execute, Execute::Deferred);
        assert_eq!(action.step, Step::PreviousAction);
        assert_eq!(action.sequences.len(), 2);
        assert_eq!(action.condition, "1");
        assert!(action.impersonate);
    }

    #[test]
    fn test_deferred_builder() {
        let action = CustomAction::managed("Configure", "Acme.Setup.dll", "Configure")
            .deferred()
            .uses_properties(&["INSTALLDIR", "MODE=full"]);
        assert_eq!(action.execute, Execute::Deferred);
        assert!(!action.impersonate);
        match action.kind {
            ActionKind::Managed { uses_properties, .. } => assert_eq!(uses_properties.len(), 2),
            _ => panic!("expected a managed action"),
        }
    }
}
