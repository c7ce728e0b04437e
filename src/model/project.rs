use super::{
    Attributes, Binary, Certificate, CustomAction, Dir, Entity, EnvironmentVariable, Feature,
    LaunchCondition, Property, RegValue, SqlDatabase, Step, User,
};
use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    X86,
    X64,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::X86 => "x86",
            Platform::X64 => "x64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstallScope {
    #[default]
    PerMachine,
    PerUser,
}

impl InstallScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallScope::PerMachine => "perMachine",
            InstallScope::PerUser => "perUser",
        }
    }
}

/// Standard dialog set referenced by the package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiKind {
    /// Progress dialog only, no dialog set referenced
    ProgressOnly,
    #[default]
    Minimal,
    InstallDir,
    FeatureTree,
    Mondo,
    Advanced,
}

impl UiKind {
    /// `UIRef` id, `None` when no dialog set is referenced
    pub fn ui_ref(&self) -> Option<&'static str> {
        match self {
            UiKind::ProgressOnly => None,
            UiKind::Minimal => Some("WixUI_Minimal"),
            UiKind::InstallDir => Some("WixUI_InstallDir"),
            UiKind::FeatureTree => Some("WixUI_FeatureTree"),
            UiKind::Mondo => Some("WixUI_Mondo"),
            UiKind::Advanced => Some("WixUI_Advanced"),
        }
    }
}

/// Version range of related products. `%this%` stands for the version
/// being built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRange {
    pub minimum: String,

    #[serde(default)]
    pub maximum: Option<String>,

    #[serde(default)]
    pub include_minimum: bool,

    #[serde(default)]
    pub include_maximum: bool,

    #[serde(default)]
    pub migrate_features: Option<bool>,
}

impl VersionRange {
    /// Every version older than the one being built
    pub fn older_than_this() -> Self {
        Self {
            minimum: "0.0.0.1".to_string(),
            maximum: Some("%this%".to_string()),
            include_minimum: true,
            include_maximum: false,
            migrate_features: None,
        }
    }

    /// Every version newer than the one being built
    pub fn newer_than_this() -> Self {
        Self {
            minimum: "%this%".to_string(),
            maximum: None,
            include_minimum: false,
            include_maximum: false,
            migrate_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MajorUpgradeStrategy {
    /// Installed versions removed by this install
    #[serde(default)]
    pub upgrade_versions: Option<VersionRange>,

    /// Installed versions that block this install
    #[serde(default)]
    pub prevent_downgrading_versions: Option<VersionRange>,

    #[serde(default)]
    pub newer_product_installed_error_message: Option<String>,

    #[serde(default = "default_remove_after")]
    pub remove_existing_product_after: String,
}

fn default_remove_after() -> String {
    Step::INSTALL_INITIALIZE.to_string()
}

impl Default for MajorUpgradeStrategy {
    /// Replace older versions, refuse to install over newer ones
    fn default() -> Self {
        Self {
            upgrade_versions: Some(VersionRange::older_than_this()),
            prevent_downgrading_versions: Some(VersionRange::newer_than_this()),
            newer_product_installed_error_message: Some("Newer version already installed".to_string()),
            remove_existing_product_after: default_remove_after(),
        }
    }
}

/// Root of the project tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Seed of every generated GUID
    #[serde(default)]
    pub guid: Option<Uuid>,

    #[serde(default)]
    pub upgrade_code: Option<Uuid>,

    #[serde(default)]
    pub product_id: Option<Uuid>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub codepage: Option<u32>,

    #[serde(default)]
    pub platform: Platform,

    #[serde(default)]
    pub install_scope: InstallScope,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub manufacturer: Option<String>,

    /// Feature receiving every entity without an explicit one
    #[serde(default)]
    pub default_feature: Feature,

    #[serde(default)]
    pub features: Vec<Feature>,

    #[serde(default)]
    pub dirs: Vec<Dir>,

    #[serde(default)]
    pub actions: Vec<CustomAction>,

    #[serde(default)]
    pub reg_values: Vec<RegValue>,

    #[serde(default)]
    pub env_vars: Vec<EnvironmentVariable>,

    #[serde(default)]
    pub properties: Vec<Property>,

    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub sql_databases: Vec<SqlDatabase>,

    #[serde(default)]
    pub certificates: Vec<Certificate>,

    #[serde(default)]
    pub binaries: Vec<Binary>,

    #[serde(default)]
    pub launch_conditions: Vec<LaunchCondition>,

    #[serde(default)]
    pub ui: UiKind,

    /// Custom UI assembly replacing the standard dialog set
    #[serde(default)]
    pub embedded_ui: Option<Binary>,

    #[serde(default)]
    pub banner_image: Option<String>,

    #[serde(default)]
    pub background_image: Option<String>,

    #[serde(default)]
    pub licence_file: Option<String>,

    #[serde(default)]
    pub major_upgrade_strategy: Option<MajorUpgradeStrategy>,

    /// Directory source paths are relative to
    #[serde(default)]
    pub source_base_dir: String,

    /// Directory receiving packaged and generated files
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    #[serde(default)]
    pub out_file_name: Option<String>,

    /// Give the package the same id as the product
    #[serde(default)]
    pub emit_consistent_package_id: bool,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default)]
    pub package_attributes: Attributes,

    #[serde(default)]
    pub media_attributes: Attributes,
}

fn default_version() -> String {
    "1.0.0.0".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_out_dir() -> String {
    ".".to_string()
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            guid: None,
            upgrade_code: None,
            product_id: None,
            language: default_language(),
            codepage: None,
            platform: Platform::X86,
            install_scope: InstallScope::PerMachine,
            description: None,
            manufacturer: None,
            default_feature: Feature::default(),
            features: Vec::new(),
            dirs: Vec::new(),
            actions: Vec::new(),
            reg_values: Vec::new(),
            env_vars: Vec::new(),
            properties: Vec::new(),
            users: Vec::new(),
            sql_databases: Vec::new(),
            certificates: Vec::new(),
            binaries: Vec::new(),
            launch_conditions: Vec::new(),
            ui: UiKind::Minimal,
            embedded_ui: None,
            banner_image: None,
            background_image: None,
            licence_file: None,
            major_upgrade_strategy: None,
            source_base_dir: String::new(),
            out_dir: default_out_dir(),
            out_file_name: None,
            emit_consistent_package_id: false,
            attributes: Attributes::new(),
            package_attributes: Attributes::new(),
            media_attributes: Attributes::new(),
        }
    }

    pub fn add(&mut self, entity: Entity) {
        match entity {
            Entity::Dir(dir) => self.dirs.push(dir),
            Entity::Action(action) => self.actions.push(action),
            Entity::Registry(value) => self.reg_values.push(value),
            Entity::Env(var) => self.env_vars.push(var),
            Entity::Property(prop) => self.properties.push(prop),
            Entity::Binary(bin) => self.binaries.push(bin),
            Entity::User(user) => self.users.push(user),
            Entity::Sql(db) => self.sql_databases.push(db),
            Entity::Certificate(cert) => self.certificates.push(cert),
            Entity::LaunchCondition(cond) => self.launch_conditions.push(cond),
            Entity::Feature(feature) => self.features.push(feature),
        }
    }

    pub fn with_guid(mut self, guid: Uuid) -> Self {
        self.guid = Some(guid);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn dir(mut self, dir: Dir) -> Self {
        self.dirs.push(dir);
        self
    }

    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    pub fn action(mut self, action: CustomAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn reg_value(mut self, value: RegValue) -> Self {
        self.reg_values.push(value);
        self
    }

    pub fn env_var(mut self, var: EnvironmentVariable) -> Self {
        self.env_vars.push(var);
        self
    }

    pub fn property(mut self, prop: Property) -> Self {
        self.properties.push(prop);
        self
    }

    pub fn binary(mut self, bin: Binary) -> Self {
        self.binaries.push(bin);
        self
    }

    pub fn launch_condition(mut self, condition: LaunchCondition) -> Self {
        self.launch_conditions.push(condition);
        self
    }

    /// Feature by name, the default feature included
    pub fn find_feature(&self, name: &str) -> Option<&Feature> {
        if self.default_feature.name == name {
            return Some(&self.default_feature);
        }
        self.features.iter().find(|f| f.name == name)
    }

    /// Every feature, the default one first
    pub fn all_features(&self) -> Vec<&Feature> {
        let mut all = vec![&self.default_feature];
        all.extend(self.features.iter().filter(|f| f.name != self.default_feature.name));
        all
    }

    /// Locale id and ANSI code page of the project language
    pub fn culture(&self) -> Result<(u32, u32)> {
        let (lcid, codepage) = culture_info(&self.language)
            .ok_or_else(|| CompileError::UnknownLanguage(self.language.clone()))?;
        Ok((lcid, self.codepage.unwrap_or(codepage)))
    }
}

/// Culture name to locale id and ANSI code page
const CULTURES: &[(&str, u32, u32)] = &[
    ("ar-SA", 1025, 1256),
    ("zh-TW", 1028, 950),
    ("cs-CZ", 1029, 1250),
    ("da-DK", 1030, 1252),
    ("de-DE", 1031, 1252),
    ("el-GR", 1032, 1253),
    ("en-US", 1033, 1252),
    ("fi-FI", 1035, 1252),
    ("fr-FR", 1036, 1252),
    ("he-IL", 1037, 1255),
    ("hu-HU", 1038, 1250),
    ("it-IT", 1040, 1252),
    ("ja-JP", 1041, 932),
    ("ko-KR", 1042, 949),
    ("nl-NL", 1043, 1252),
    ("nb-NO", 1044, 1252),
    ("pl-PL", 1045, 1250),
    ("pt-BR", 1046, 1252),
    ("ru-RU", 1049, 1251),
    ("hr-HR", 1050, 1250),
    ("sk-SK", 1051, 1250),
    ("sv-SE", 1053, 1252),
    ("th-TH", 1054, 874),
    ("tr-TR", 1055, 1254),
    ("uk-UA", 1058, 1251),
    ("sl-SI", 1060, 1250),
    ("et-EE", 1061, 1257),
    ("lv-LV", 1062, 1257),
    ("lt-LT", 1063, 1257),
    ("zh-CN", 2052, 936),
    ("en-GB", 2057, 1252),
    ("pt-PT", 2070, 1252),
    ("es-ES", 3082, 1252),
];

pub fn culture_info(name: &str) -> Option<(u32, u32)> {
    CULTURES
        .iter()
        .find(|(culture, _, _)| culture.eq_ignore_ascii_case(name))
        .map(|(_, lcid, codepage)| (*lcid, *codepage))
}
