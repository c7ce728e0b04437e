use super::{default_true, Attributes, Condition};
use serde::{Deserialize, Serialize};

/// Directory node. The name may be a special-folder token or a whole
/// logical path (`%ProgramFiles%\My Company\My Product`), in which case the
/// contents belong to the innermost directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dir {
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub dirs: Vec<Dir>,

    #[serde(default)]
    pub files: Vec<File>,

    #[serde(default)]
    pub shortcuts: Vec<Shortcut>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    #[serde(default)]
    pub merge_modules: Vec<MergeModule>,
}

impl Dir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn dir(mut self, dir: Dir) -> Self {
        self.dirs.push(dir);
        self
    }

    pub fn file(mut self, file: File) -> Self {
        self.files.push(file);
        self
    }

    pub fn shortcut(mut self, shortcut: Shortcut) -> Self {
        self.shortcuts.push(shortcut);
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn merge_module(mut self, module: MergeModule) -> Self {
        self.merge_modules.push(module);
        self
    }

    /// Nothing to install and nothing below it
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.shortcuts.is_empty()
            && self.dirs.is_empty()
            && self.permissions.is_empty()
    }
}

/// Installable file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct File {
    /// Source path, relative to the project's source base directory
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub condition: Option<Condition>,

    #[serde(default)]
    pub attributes: Attributes,

    #[serde(default)]
    pub associations: Vec<FileAssociation>,

    #[serde(default)]
    pub shortcuts: Vec<Shortcut>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    /// Register the file as a .NET assembly in the GAC
    #[serde(default)]
    pub register_in_gac: bool,

    #[serde(default)]
    pub processor_architecture: ProcessorArchitecture,

    #[serde(default)]
    pub service: Option<ServiceInstaller>,
}

impl File {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<Condition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn shortcut(mut self, shortcut: Shortcut) -> Self {
        self.shortcuts.push(shortcut);
        self
    }

    pub fn association(mut self, association: FileAssociation) -> Self {
        self.associations.push(association);
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn service(mut self, service: ServiceInstaller) -> Self {
        self.service = Some(service);
        self
    }

    /// Install into the GAC
    pub fn gac_assembly(mut self, arch: ProcessorArchitecture) -> Self {
        self.register_in_gac = true;
        self.processor_architecture = arch;
        self
    }

    /// File name without directories
    pub fn file_name(&self) -> &str {
        self.name.rsplit(['\\', '/']).next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorArchitecture {
    #[default]
    Msil,
    X86,
    X64,
    Ia64,
}

impl ProcessorArchitecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorArchitecture::Msil => "msil",
            ProcessorArchitecture::X86 => "x86",
            ProcessorArchitecture::X64 => "x64",
            ProcessorArchitecture::Ia64 => "ia64",
        }
    }
}

/// Shortcut. Owned by a directory it gets a component of its own; owned by
/// a file it is placed in `location` (or the file's directory).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shortcut {
    pub name: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub target: String,

    #[serde(default)]
    pub arguments: String,

    /// Logical path, special folder or directory id where the shortcut lives
    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub condition: Option<Condition>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Shortcut {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }
}

/// File type registration for an installed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAssociation {
    pub extension: String,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_arguments")]
    pub arguments: String,

    #[serde(default)]
    pub advertise: bool,

    /// Icon file id; an empty string means the associated file itself
    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub icon_index: u32,

    #[serde(default = "default_sequence")]
    pub sequence: u32,
}

fn default_command() -> String {
    "open".to_string()
}

fn default_arguments() -> String {
    "\"%1\"".to_string()
}

fn default_sequence() -> u32 {
    1
}

impl FileAssociation {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            content_type: None,
            description: None,
            command: default_command(),
            arguments: default_arguments(),
            advertise: false,
            icon: None,
            icon_index: 0,
            sequence: default_sequence(),
        }
    }

    pub fn content_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| format!("application/{}", self.extension))
    }

    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} file", self.extension))
    }
}

/// Access rights granted on a file or directory
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Permission {
    pub user: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    /// Rights set to `yes` (`GenericAll`, `Read`, `Write`, ...)
    #[serde(default)]
    pub rights: Vec<String>,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Permission {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn grant(mut self, right: impl Into<String>) -> Self {
        self.rights.push(right.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Prebuilt merge module referenced from a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeModule {
    pub source_file: String,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub feature: Option<String>,

    #[serde(default = "default_true")]
    pub file_compression: bool,

    #[serde(default)]
    pub attributes: Attributes,
}

impl MergeModule {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            id: None,
            feature: None,
            file_compression: true,
            attributes: Attributes::new(),
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// File stem of the module, used for its generated id
    pub fn stem(&self) -> &str {
        let name = self
            .source_file
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(&self.source_file);
        match name.rfind('.') {
            Some(pos) if pos > 0 => &name[..pos],
            _ => name,
        }
    }
}

/// Windows service installed with a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstaller {
    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default = "default_start_type")]
    pub start_type: String,

    #[serde(default = "default_service_type")]
    pub service_type: String,

    #[serde(default = "default_error_control")]
    pub error_control: String,

    #[serde(default)]
    pub account: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub arguments: Option<String>,

    #[serde(default = "default_start_on")]
    pub start_on: Option<String>,

    #[serde(default = "default_stop_on")]
    pub stop_on: Option<String>,

    #[serde(default = "default_remove_on")]
    pub remove_on: Option<String>,
}

fn default_start_type() -> String {
    "auto".to_string()
}

fn default_service_type() -> String {
    "ownProcess".to_string()
}

fn default_error_control() -> String {
    "normal".to_string()
}

fn default_start_on() -> Option<String> {
    Some("install".to_string())
}

fn default_stop_on() -> Option<String> {
    Some("both".to_string())
}

fn default_remove_on() -> Option<String> {
    Some("uninstall".to_string())
}

impl ServiceInstaller {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            start_type: default_start_type(),
            service_type: default_service_type(),
            error_control: default_error_control(),
            account: None,
            password: None,
            arguments: None,
            start_on: default_start_on(),
            stop_on: default_stop_on(),
            remove_on: default_remove_on(),
        }
    }
}
