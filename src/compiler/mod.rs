//! Project tree to WiX source compiler
//!
//! One [`Compiler::compile`] call runs the whole pipeline over a private copy
//! of the project:
//!
//! 1. directory preparation (dummy directory, 64-bit mapping, path splitting,
//!    install directory auto-assignment, id resolution)
//! 2. directory tree and component synthesis
//! 3. standalone entities anchored at the top-level directory
//! 4. properties, custom actions and binaries
//! 5. features, UI, merge module wiring and upgrade strategy
//!
//! All generator state lives in a [`CompileState`] created per call, so two
//! compiles never share identifiers.

mod actions;
mod assembler;
mod components;
mod directories;
mod entities;
mod features;

use crate::config::{CompilerOptions, OutputType};
use crate::document::{Document, Element};
use crate::error::{CompileError, Result};
use crate::guid::{format_guid, GuidFormat, GuidGenerator, IdGenerator};
use crate::model::Project;
use crate::writer::format_source;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// WiX extension required by some of the emitted elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WixExtension {
    Util,
    Sql,
    IIs,
    UI,
}

impl WixExtension {
    /// Element prefix, `None` for extensions without schema elements
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            WixExtension::Util => Some("util"),
            WixExtension::Sql => Some("sql"),
            WixExtension::IIs => Some("iis"),
            WixExtension::UI => None,
        }
    }

    pub fn namespace(&self) -> Option<&'static str> {
        match self {
            WixExtension::Util => Some("http://schemas.microsoft.com/wix/UtilExtension"),
            WixExtension::Sql => Some("http://schemas.microsoft.com/wix/SqlExtension"),
            WixExtension::IIs => Some("http://schemas.microsoft.com/wix/IIsExtension"),
            WixExtension::UI => None,
        }
    }

    /// Extension library passed to the toolchain
    pub fn dll(&self) -> &'static str {
        match self {
            WixExtension::Util => "WixUtilExtension.dll",
            WixExtension::Sql => "WixSqlExtension.dll",
            WixExtension::IIs => "WixIIsExtension.dll",
            WixExtension::UI => "WixUIExtension.dll",
        }
    }
}

/// Managed assembly the external packager must turn into a native DLL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingRequest {
    pub assembly: String,
    pub output: String,
}

/// Result of one compile
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub document: Document,
    /// Logical path that received the default install directory id
    pub auto_assigned_install_dir: Option<String>,
    pub product_guid: Uuid,
    pub product_id: Uuid,
    pub upgrade_code: Uuid,
    pub extensions: BTreeSet<WixExtension>,
    pub packaging_requests: Vec<PackagingRequest>,
}

impl CompileOutput {
    /// Formatted source text
    pub fn to_wxs(&self) -> String {
        format_source(&self.document.to_xml())
    }
}

/// A source document written to disk
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub wxs_path: PathBuf,
    pub temp_files: Vec<PathBuf>,
    pub output: CompileOutput,
    preserve_temp_files: bool,
}

impl BuildArtifact {
    /// Delete the temporary files unless they are to be preserved.
    /// Returns the files actually removed.
    pub fn cleanup(&self) -> Result<Vec<PathBuf>> {
        if self.preserve_temp_files {
            debug!("Preserving {} temporary file(s)", self.temp_files.len());
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for file in &self.temp_files {
            if file.exists() {
                fs::remove_file(file)?;
                removed.push(file.clone());
            }
        }
        Ok(removed)
    }
}

/// Compiler configured with one set of options
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile a project into an in-memory document
    pub fn compile(&self, project: &Project) -> Result<CompileOutput> {
        let mut ids = IdGenerator::new();
        let mut working = project.clone();
        let auto_install_dir = directories::prepare(&mut working, &self.options, &mut ids);

        let mut state = CompileState::new(&working, &self.options, ids)?;
        state.auto_install_dir = auto_install_dir;

        let document = assembler::assemble(&mut state)?;

        info!(
            product_id = %state.product_id,
            upgrade_code = %state.upgrade_code,
            "Compiled project '{}'",
            working.name
        );
        if let Some(path) = &state.auto_install_dir {
            info!("Auto-assigned {} to {}", self.options.install_dir_default_id, path);
        }

        Ok(CompileOutput {
            document,
            auto_assigned_install_dir: state.auto_install_dir,
            product_guid: state.guids.seed(),
            product_id: state.product_id,
            upgrade_code: state.upgrade_code,
            extensions: state.extensions,
            packaging_requests: state.packaging_requests,
        })
    }

    /// Compile and write the source document to `path`
    pub fn build_wxs(&self, project: &Project, path: impl AsRef<Path>) -> Result<BuildArtifact> {
        let path = path.as_ref();
        let output = self.compile(project)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, output.to_wxs())?;
        info!("Wrote {}", path.display());

        Ok(BuildArtifact {
            wxs_path: path.to_path_buf(),
            temp_files: Vec::new(),
            output,
            preserve_temp_files: self.options.preserve_temp_files,
        })
    }

    /// Write the source document into `dir` as an intermediate of a package
    /// build. The file is recorded as temporary.
    pub fn stage(&self, project: &Project, dir: impl AsRef<Path>) -> Result<BuildArtifact> {
        let file_name = format!("{}.wxs", project.out_file_name.as_deref().unwrap_or(&project.name));
        let path = dir.as_ref().join(file_name);
        let mut artifact = self.build_wxs(project, &path)?;
        artifact.temp_files.push(path);
        Ok(artifact)
    }
}

/// Everything one compile pass reads and accumulates
pub(crate) struct CompileState<'a> {
    pub project: &'a Project,
    pub options: &'a CompilerOptions,
    pub ids: IdGenerator,
    pub guids: GuidGenerator,
    pub product_id: Uuid,
    pub upgrade_code: Uuid,
    pub lcid: u32,
    pub codepage: u32,
    /// Components explicitly assigned to a feature, by feature name
    pub feature_components: BTreeMap<String, Vec<String>>,
    /// Components without a feature, merged into the default feature
    pub default_components: Vec<String>,
    /// Shortcut locations that name no declared directory, with the feature
    /// of the first shortcut using each
    pub shortcut_locations: Vec<(String, Option<String>)>,
    /// Merge module ids with their declared feature
    pub merge_modules: Vec<(String, Option<String>)>,
    pub extensions: BTreeSet<WixExtension>,
    pub packaging_requests: Vec<PackagingRequest>,
    pub auto_install_dir: Option<String>,
}

impl<'a> CompileState<'a> {
    pub fn new(project: &'a Project, options: &'a CompilerOptions, ids: IdGenerator) -> Result<Self> {
        let seed = project
            .guid
            .unwrap_or_else(|| GuidGenerator::seed_from_name(&project.name));
        let guids = GuidGenerator::new(seed);
        let product_id = project
            .product_id
            .unwrap_or_else(|| guids.product_id(&project.version));
        let upgrade_code = project.upgrade_code.unwrap_or_else(|| guids.upgrade_code());
        let (lcid, codepage) = project.culture()?;

        Ok(Self {
            project,
            options,
            ids,
            guids,
            product_id,
            upgrade_code,
            lcid,
            codepage,
            feature_components: BTreeMap::new(),
            default_components: Vec::new(),
            shortcut_locations: Vec::new(),
            merge_modules: Vec::new(),
            extensions: BTreeSet::new(),
            packaging_requests: Vec::new(),
            auto_install_dir: None,
        })
    }

    /// New `Component` element with its derived GUID
    pub fn component(&self, id: &str) -> Element {
        let guid = self.guids.component_guid(id);
        debug!("Component {} ({})", id, guid);
        Element::new("Component")
            .attr("Id", id)
            .attr("Guid", format_guid(&guid, GuidFormat::Hyphens))
    }

    /// Record which feature a component belongs to
    pub fn assign(&mut self, entity: &str, feature: Option<&String>, component_id: &str) -> Result<()> {
        match feature {
            Some(name) => {
                if self.project.find_feature(name).is_none() {
                    return Err(CompileError::UnknownFeature {
                        entity: entity.to_string(),
                        feature: name.clone(),
                    });
                }
                self.feature_components
                    .entry(name.clone())
                    .or_default()
                    .push(component_id.to_string());
            }
            None => self.default_components.push(component_id.to_string()),
        }
        Ok(())
    }

    pub fn use_extension(&mut self, extension: WixExtension) {
        self.extensions.insert(extension);
    }

    /// Path of a source file, joined with the project's source base directory
    pub fn source_path(&self, name: &str) -> String {
        join_path(&self.project.source_base_dir, name)
    }

    /// Where the external packager writes the native DLL for an assembly
    pub fn packaged_path(&self, assembly: &str) -> String {
        let file = assembly.rsplit(['\\', '/']).next().unwrap_or(assembly);
        let stem = match file.rfind('.') {
            Some(pos) if pos > 0 => &file[..pos],
            _ => file,
        };
        join_path(&self.project.out_dir, &format!("{}.CA.dll", stem))
    }

    pub fn request_packaging(&mut self, assembly: String, output: String) {
        let request = PackagingRequest { assembly, output };
        if !self.packaging_requests.contains(&request) {
            debug!("Packaging request {} -> {}", request.assembly, request.output);
            self.packaging_requests.push(request);
        }
    }

    pub fn is_msm(&self) -> bool {
        self.options.output_type == OutputType::Msm
    }
}

/// Join two logical paths with a backslash, leaving `path` alone when `base`
/// is empty or `path` is already absolute
pub(crate) fn join_path(base: &str, path: &str) -> String {
    let absolute = path.starts_with('\\')
        || path.starts_with('/')
        || path.chars().nth(1) == Some(':');
    if base.is_empty() || absolute {
        return path.to_string();
    }
    if base.ends_with('\\') || base.ends_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}\\{}", base, path)
    }
}

/// Run `f` on the directory that receives standalone components: the first
/// directory under `dir` (descending through first children) that already
/// owns a component, or the deepest one reached.
pub(crate) fn with_top_level_dir<R>(dir: &mut Element, f: impl FnOnce(&mut Element) -> R) -> R {
    let descend = dir.child("Component").is_none() && dir.child("Directory").is_some();
    if descend {
        if let Some(child) = dir.child_mut("Directory") {
            return with_top_level_dir(child, f);
        }
    }
    f(dir)
}

/// [`with_top_level_dir`] starting at the product's root directory
pub(crate) fn with_install_root<R>(product: &mut Element, f: impl FnOnce(&mut Element) -> R) -> R {
    match product.child_mut("Directory") {
        Some(root) => with_top_level_dir(root, f),
        None => f(product),
    }
}
