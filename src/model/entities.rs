//! Standalone entities anchored at the installation directory, plus the
//! product-level properties, binaries and launch conditions.

use super::{default_true, Attributes, Condition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryHive {
    #[serde(alias = "HKEY_LOCAL_MACHINE")]
    HKLM,
    #[serde(alias = "HKEY_CURRENT_USER")]
    HKCU,
    #[serde(alias = "HKEY_CLASSES_ROOT")]
    HKCR,
    #[serde(alias = "HKEY_USERS")]
    HKU,
    /// HKLM for per-machine installs, HKCU for per-user ones
    HKMU,
}

impl RegistryHive {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryHive::HKLM => "HKLM",
            RegistryHive::HKCU => "HKCU",
            RegistryHive::HKCR => "HKCR",
            RegistryHive::HKU => "HKU",
            RegistryHive::HKMU => "HKMU",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegValueKind {
    #[default]
    String,
    Integer,
    Expandable,
    MultiString,
    Binary,
}

impl RegValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegValueKind::String => "string",
            RegValueKind::Integer => "integer",
            RegValueKind::Expandable => "expandable",
            RegValueKind::MultiString => "multiString",
            RegValueKind::Binary => "binary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistryKeyAction {
    Create,
    CreateAndRemoveOnUninstall,
    None,
}

impl RegistryKeyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKeyAction::Create => "create",
            RegistryKeyAction::CreateAndRemoveOnUninstall => "createAndRemoveOnUninstall",
            RegistryKeyAction::None => "none",
        }
    }
}

/// Registry value written by the install
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegValue {
    pub root: RegistryHive,

    pub key: String,

    /// Value name; empty for the key's default value
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub value: String,

    #[serde(default, rename = "type")]
    pub kind: RegValueKind,

    #[serde(default)]
    pub key_action: Option<RegistryKeyAction>,

    #[serde(default)]
    pub force_create_on_install: bool,

    #[serde(default)]
    pub force_delete_on_uninstall: bool,

    /// Write to the 64-bit view of the registry
    #[serde(default)]
    pub win64: bool,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub condition: Option<Condition>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl RegValue {
    pub fn new(root: RegistryHive, key: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            root,
            key: key.into(),
            name: name.into(),
            value: value.into(),
            kind: RegValueKind::String,
            key_action: None,
            force_create_on_install: false,
            force_delete_on_uninstall: false,
            win64: false,
            feature: None,
            condition: None,
            attributes: Attributes::new(),
        }
    }

    pub fn of_kind(mut self, kind: RegValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvVarAction {
    #[default]
    Set,
    Create,
    Remove,
}

impl EnvVarAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvVarAction::Set => "set",
            EnvVarAction::Create => "create",
            EnvVarAction::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvVarPart {
    All,
    First,
    Last,
}

impl EnvVarPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvVarPart::All => "all",
            EnvVarPart::First => "first",
            EnvVarPart::Last => "last",
        }
    }
}

/// Environment variable set by the install
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,

    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub part: Option<EnvVarPart>,

    #[serde(default)]
    pub action: EnvVarAction,

    /// Left in place on uninstall
    #[serde(default)]
    pub permanent: bool,

    /// System variable rather than a per-user one
    #[serde(default = "default_true")]
    pub system: bool,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub condition: Option<Condition>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            id: None,
            part: None,
            action: EnvVarAction::Set,
            permanent: false,
            system: true,
            feature: None,
            condition: None,
            attributes: Attributes::new(),
        }
    }

    /// Append to an existing list variable such as `PATH`
    pub fn append(mut self) -> Self {
        self.part = Some(EnvVarPart::Last);
        self
    }
}

/// Local or domain user account
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub create_user: Option<bool>,

    #[serde(default)]
    pub update_if_exists: Option<bool>,

    #[serde(default)]
    pub remove_on_uninstall: Option<bool>,

    #[serde(default)]
    pub fail_if_exists: Option<bool>,

    #[serde(default)]
    pub password_never_expires: Option<bool>,

    #[serde(default)]
    pub can_not_change_password: Option<bool>,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Any of the settings only valid inside a component makes the user an
    /// installed entity instead of a reference.
    pub fn is_installed(&self) -> bool {
        self.create_user.is_some()
            || self.update_if_exists.is_some()
            || self.remove_on_uninstall.is_some()
            || self.fail_if_exists.is_some()
            || self.password_never_expires.is_some()
            || self.can_not_change_password.is_some()
    }
}

/// SQL statement run against a database
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SqlString {
    pub sql: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub execute_on_install: bool,

    #[serde(default)]
    pub execute_on_reinstall: bool,

    #[serde(default)]
    pub execute_on_uninstall: bool,

    #[serde(default)]
    pub continue_on_error: bool,

    #[serde(default)]
    pub sequence: Option<u32>,

    #[serde(default)]
    pub feature: Option<String>,
}

/// SQL script taken from an embedded binary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SqlScript {
    pub binary_key: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub execute_on_install: bool,

    #[serde(default)]
    pub execute_on_reinstall: bool,

    #[serde(default)]
    pub execute_on_uninstall: bool,

    #[serde(default)]
    pub continue_on_error: bool,

    #[serde(default)]
    pub sequence: Option<u32>,

    #[serde(default)]
    pub feature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SqlDatabase {
    pub database: String,

    pub server: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub instance: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub create_on_install: Option<bool>,

    #[serde(default)]
    pub create_on_reinstall: Option<bool>,

    #[serde(default)]
    pub create_on_uninstall: Option<bool>,

    #[serde(default)]
    pub drop_on_install: Option<bool>,

    #[serde(default)]
    pub drop_on_reinstall: Option<bool>,

    #[serde(default)]
    pub drop_on_uninstall: Option<bool>,

    #[serde(default)]
    pub confirm_overwrite: Option<bool>,

    #[serde(default)]
    pub continue_on_error: Option<bool>,

    #[serde(default)]
    pub strings: Vec<SqlString>,

    #[serde(default)]
    pub scripts: Vec<SqlScript>,

    #[serde(default)]
    pub feature: Option<String>,
}

impl SqlDatabase {
    pub fn new(database: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            server: server.into(),
            ..Default::default()
        }
    }

    /// Creating or dropping the database is part of the install
    pub fn is_installed(&self) -> bool {
        self.create_on_install.is_some()
            || self.create_on_reinstall.is_some()
            || self.create_on_uninstall.is_some()
            || self.drop_on_install.is_some()
            || self.drop_on_reinstall.is_some()
            || self.drop_on_uninstall.is_some()
            || self.confirm_overwrite.is_some()
            || self.continue_on_error.is_some()
    }
}

/// Certificate installed into a store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Certificate {
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    /// `currentUser` or `localMachine`
    pub store_location: String,

    /// `ca`, `my`, `root`, `trustedPeople`, ...
    pub store_name: String,

    #[serde(default)]
    pub binary_key: Option<String>,

    #[serde(default)]
    pub certificate_path: Option<String>,

    #[serde(default)]
    pub pfx_password: Option<String>,

    #[serde(default)]
    pub request: bool,

    #[serde(default)]
    pub overwrite: bool,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub attributes: Attributes,
}

/// Registry lookup that initializes a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySearch {
    pub root: RegistryHive,

    pub key: String,

    /// Value name; empty reads the key's default value
    #[serde(default)]
    pub entry_name: String,
}

/// Installer property: a plain value, a registry search, or a reference to
/// a property defined elsewhere
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Property {
    pub name: String,

    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub registry: Option<RegistrySearch>,

    /// Emit a `PropertyRef` instead of a definition
    #[serde(default, rename = "ref")]
    pub is_ref: bool,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn from_registry(name: impl Into<String>, root: RegistryHive, key: impl Into<String>, entry_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: Some(RegistrySearch {
                root,
                key: key.into(),
                entry_name: entry_name.into(),
            }),
            ..Default::default()
        }
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Self {
            name: id.into(),
            is_ref: true,
            ..Default::default()
        }
    }
}

/// Embedded binary
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Binary {
    /// Source path
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    /// Managed assembly that must be packaged into a native-callable DLL
    #[serde(default)]
    pub managed: bool,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Binary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn managed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            managed: true,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Condition that must hold for the install to start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchCondition {
    pub condition: String,

    pub message: String,

    #[serde(default)]
    pub attributes: Attributes,
}

impl LaunchCondition {
    pub fn new(condition: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            message: message.into(),
            attributes: Attributes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_is_installed() {
        assert!(!User::new("svc").is_installed());
        let user = User {
            create_user: Some(true),
            ..User::new("svc")
        };
        assert!(user.is_installed());
    }

    #[test]
    fn test_sql_database_is_installed() {
        assert!(!SqlDatabase::new("Acme", "localhost").is_installed());
        let db = SqlDatabase {
            create_on_install: Some(true),
            ..SqlDatabase::new("Acme", "localhost")
        };
        assert!(db.is_installed());
    }

    #[test]
    fn test_reg_value_from_manifest() {
        let value: RegValue = serde_json::from_str(
            r#"{ "root": "HKEY_LOCAL_MACHINE", "key": "Software\\Acme", "name": "Paths", "value": "a\nb", "type": "multiString" }"#,
        )
        .unwrap();
        assert_eq!(value.root, RegistryHive::HKLM);
        assert_eq!(value.kind, RegValueKind::MultiString);
        assert_eq!(value.kind.as_str(), "multiString");
    }

    #[test]
    fn test_property_ref_from_manifest() {
        let prop: Property = serde_json::from_str(r#"{ "name": "NETFRAMEWORK45", "ref": true }"#).unwrap();
        assert!(prop.is_ref);
    }
}
