//! Document shape: product skeleton, pipeline order and the final
//! post-passes (element ordering, merge module output)

use super::directories::TARGET_DIR;
use super::{actions, directories, entities, features, with_install_root, CompileState, WixExtension};
use crate::document::{Document, Element};
use crate::error::{CompileError, Result};
use crate::folders;
use crate::guid::{format_guid, GuidFormat};
use crate::model::{yes_no, Sequence, Step, UiKind, VersionRange};
use tracing::debug;

pub(crate) const WIX_NAMESPACE: &str = "http://schemas.microsoft.com/wix/2006/wi";

/// Children moved to the end of the product, in this order
const TRAILING_ELEMENTS: &[&str] = &["CustomAction", "Binary", "UIRef", "Feature"];

/// Run the whole pipeline and return the finished document
pub(crate) fn assemble(state: &mut CompileState) -> Result<Document> {
    let project = state.project;
    let mut product = skeleton(state);

    entities::launch_conditions(state, &mut product);

    let mut root_dir = Element::new("Directory")
        .attr("Id", TARGET_DIR)
        .attr("Name", "SourceDir");
    for dir in &project.dirs {
        directories::process_dir(state, dir, &mut root_dir)?;
    }
    directories::process_shortcut_locations(state, &mut root_dir)?;
    product.add(root_dir);

    entities::registry(state, &mut product)?;
    entities::env_vars(state, &mut product)?;
    entities::users(state, &mut product)?;
    entities::sql(state, &mut product)?;
    entities::certificates(state, &mut product)?;
    entities::properties(state, &mut product)?;

    actions::process(state, &mut product)?;
    entities::binaries(state, &mut product);

    features::process(state, &mut product);
    ui(state, &mut product);
    embedded_ui(state, &mut product);
    wix_variables(state, &mut product)?;
    features::wire_merge_modules(state, &mut product)?;
    upgrade(state, &mut product);

    reorder(&mut product);
    if state.is_msm() {
        to_module(state, &mut product);
    }

    let mut root = Element::new("Wix").attr("xmlns", WIX_NAMESPACE);
    for extension in &state.extensions {
        if let (Some(prefix), Some(namespace)) = (extension.prefix(), extension.namespace()) {
            root.set_attr(&format!("xmlns:{}", prefix), namespace);
        }
    }
    root.add(product);

    Ok(Document::new(root))
}

/// `Product` with its `Package` and `Media`
fn skeleton(state: &CompileState) -> Element {
    let project = state.project;
    let product_id = format_guid(&state.product_id, GuidFormat::Hyphens);

    let mut product = Element::new("Product")
        .attr("Id", &product_id)
        .attr("Name", &project.name)
        .attr("Language", state.lcid)
        .attr("Codepage", state.codepage)
        .attr("Version", &project.version)
        .attr("UpgradeCode", format_guid(&state.upgrade_code, GuidFormat::Hyphens))
        .attr_opt("Manufacturer", project.manufacturer.as_ref());
    product.extend_attrs(&project.attributes);

    let mut package = Element::new("Package")
        .attr("InstallerVersion", 200)
        .attr("Compressed", "yes")
        .attr("Description", project.description.as_deref().unwrap_or(&project.name))
        .attr("Platform", project.platform.as_str())
        .attr("SummaryCodepage", state.codepage)
        .attr("Languages", state.lcid)
        .attr("InstallScope", project.install_scope.as_str());
    if project.emit_consistent_package_id {
        package.set_attr("Id", &product_id);
    }
    package.extend_attrs(&project.package_attributes);
    product.add(package);

    let mut media = Element::new("Media")
        .attr("Id", 1)
        .attr("Cabinet", format!("{}.cab", folders::expand(&project.name)))
        .attr("EmbedCab", "yes");
    media.extend_attrs(&project.media_attributes);
    product.add(media);

    product
}

fn ui(state: &mut CompileState, product: &mut Element) {
    let project = state.project;
    let Some(ui_ref) = project.ui.ui_ref() else {
        return;
    };

    if project.ui == UiKind::InstallDir {
        let install_dir = with_install_root(product, |dir| dir.id().map(String::from));
        if let Some(id) = install_dir {
            product.add(
                Element::new("Property")
                    .attr("Id", "WIXUI_INSTALLDIR")
                    .attr("Value", id),
            );
        }
    }

    product.add(Element::new("UIRef").attr("Id", ui_ref));
    state.use_extension(WixExtension::UI);
}

/// A custom UI assembly replaces the standard dialog set
fn embedded_ui(state: &mut CompileState, product: &mut Element) {
    let project = state.project;
    let Some(binary) = &project.embedded_ui else {
        return;
    };

    let id = binary.id.clone().unwrap_or_else(|| {
        let file_name = binary.name.rsplit(['\\', '/']).next().unwrap_or(&binary.name);
        folders::expand(file_name)
    });
    let source = state.source_path(&binary.name);
    let source = if binary.managed {
        let packaged = state.packaged_path(&source);
        state.request_packaging(source, packaged.clone());
        packaged
    } else {
        source
    };

    product.take_children(|e| e.name == "UIRef");
    product.add(Element::new("UI").with(
        Element::new("EmbeddedUI")
            .attr("Id", id)
            .attr("SourceFile", source),
    ));
}

/// Banner, background and license assets of the standard dialogs
fn wix_variables(state: &CompileState, product: &mut Element) -> Result<()> {
    let project = state.project;

    let images = [
        ("WixUIBannerBmp", &project.banner_image),
        ("WixUIDialogBmp", &project.background_image),
    ];
    for (id, path) in images {
        if let Some(path) = path {
            product.add(
                Element::new("WixVariable")
                    .attr("Id", id)
                    .attr("Value", state.source_path(path)),
            );
        }
    }

    if let Some(license) = &project.licence_file {
        if !state.options.allow_non_rtf_license && !license.to_lowercase().ends_with(".rtf") {
            return Err(CompileError::LicenseNotRtf(license.clone()));
        }
        product.add(
            Element::new("WixVariable")
                .attr("Id", "WixUILicenseRtf")
                .attr("Value", state.source_path(license)),
        );
    }
    Ok(())
}

fn expand_version(version: &str, this: &str) -> String {
    version.replace("%this%", this)
}

fn upgrade_version(range: &VersionRange, this: &str) -> Element {
    Element::new("UpgradeVersion")
        .attr("Minimum", expand_version(&range.minimum, this))
        .attr("IncludeMinimum", yes_no(range.include_minimum))
}

/// Major upgrade: remove older versions and optionally refuse to install
/// over a newer one
fn upgrade(state: &CompileState, product: &mut Element) {
    let project = state.project;
    let Some(strategy) = &project.major_upgrade_strategy else {
        return;
    };
    let this = project.version.as_str();

    let mut upgrade = Element::new("Upgrade").attr("Id", format_guid(&state.upgrade_code, GuidFormat::Hyphens));

    if let Some(range) = &strategy.upgrade_versions {
        let mut element = upgrade_version(range, this);
        if let Some(maximum) = &range.maximum {
            element.set_attr("Maximum", expand_version(maximum, this));
        }
        element.set_attr("IncludeMaximum", yes_no(range.include_maximum));
        element.set_attr("Property", "UPGRADEFOUND");
        if let Some(migrate) = range.migrate_features {
            element.set_attr("MigrateFeatures", yes_no(migrate));
        }
        upgrade.add(element);
    }

    let prevent = strategy.prevent_downgrading_versions.as_ref();
    if let Some(range) = prevent {
        let mut element = upgrade_version(range, this)
            .attr("OnlyDetect", "yes")
            .attr("Property", "NEWPRODUCTFOUND");
        if let Some(migrate) = range.migrate_features {
            element.set_attr("MigrateFeatures", yes_no(migrate));
        }
        upgrade.add(element);
    }
    product.add(upgrade);

    if prevent.is_none() {
        return;
    }

    if let Some(message) = &strategy.newer_product_installed_error_message {
        product.add(
            Element::new("CustomAction")
                .attr("Id", "PreventDowngrading")
                .attr("Error", message),
        );
        for sequence in [Sequence::InstallExecuteSequence, Sequence::InstallUISequence] {
            product.child_or_create(sequence.as_str()).add(
                Element::new("Custom")
                    .attr("Action", "PreventDowngrading")
                    .attr("After", Step::FIND_RELATED_PRODUCTS)
                    .with_text("NEWPRODUCTFOUND"),
            );
        }
    }

    product
        .child_or_create(Sequence::InstallExecuteSequence.as_str())
        .add(Element::new("RemoveExistingProducts").attr("After", &strategy.remove_existing_product_after));
}

/// Move definitions referenced from elsewhere and the sequence tables to
/// the end of the product
fn reorder(product: &mut Element) {
    for name in TRAILING_ELEMENTS {
        for element in product.take_children(|e| e.name == *name) {
            product.add(element);
        }
    }
    for element in product.take_children(|e| e.name.ends_with("Sequence")) {
        product.add(element);
    }
}

/// Turn the product into a merge module
fn to_module(state: &CompileState, product: &mut Element) {
    let project = state.project;
    debug!("Converting product '{}' to a merge module", project.name);

    product.take_children(|e| e.name == "Feature" || e.name == "Media");

    product.name = "Module".to_string();
    product.attrs.clear();
    product.set_attr("Id", folders::expand(&project.name));
    product.set_attr("Codepage", state.codepage);
    product.set_attr("Language", state.lcid);
    product.set_attr("Version", &project.version);

    if let Some(package) = product.child_mut("Package") {
        package.remove_attr("Compressed");
        package.set_attr("Id", format_guid(&state.product_id, GuidFormat::Hyphens));
        if let Some(manufacturer) = &project.manufacturer {
            package.set_attr("Manufacturer", manufacturer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompilerOptions, OutputType};
    use crate::guid::IdGenerator;
    use crate::model::{MajorUpgradeStrategy, Project};

    fn state_for<'a>(project: &'a Project, options: &'a CompilerOptions) -> CompileState<'a> {
        CompileState::new(project, options, IdGenerator::new()).unwrap()
    }

    #[test]
    fn test_reorder() {
        let mut product = Element::new("Product")
            .with(Element::new("Feature").attr("Id", "Complete"))
            .with(Element::new("InstallExecuteSequence"))
            .with(Element::new("Binary").attr("Id", "b"))
            .with(Element::new("Property").attr("Id", "P"))
            .with(Element::new("CustomAction").attr("Id", "a"));
        reorder(&mut product);

        let names: Vec<&str> = product.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Property", "CustomAction", "Binary", "Feature", "InstallExecuteSequence"]);
    }

    #[test]
    fn test_upgrade_with_downgrade_prevention() {
        let mut project = Project::new("MyApp").with_version("2.1.0.0");
        project.major_upgrade_strategy = Some(MajorUpgradeStrategy::default());
        let options = CompilerOptions::default();
        let state = state_for(&project, &options);

        let mut product = Element::new("Product");
        upgrade(&state, &mut product);

        let versions: Vec<&Element> = product.child("Upgrade").unwrap().elements().collect();
        assert_eq!(versions[0].get_attr("Maximum"), Some("2.1.0.0"));
        assert_eq!(versions[0].get_attr("Property"), Some("UPGRADEFOUND"));
        assert_eq!(versions[1].get_attr("Minimum"), Some("2.1.0.0"));
        assert_eq!(versions[1].get_attr("OnlyDetect"), Some("yes"));

        let exec = product.child("InstallExecuteSequence").unwrap();
        assert_eq!(exec.child("Custom").unwrap().text(), "NEWPRODUCTFOUND");
        assert_eq!(exec.child("RemoveExistingProducts").unwrap().get_attr("After"), Some("InstallInitialize"));
        assert!(product.child("InstallUISequence").is_some());
        assert!(product.find_by_id("CustomAction", "PreventDowngrading").is_some());
    }

    #[test]
    fn test_license_must_be_rtf() {
        let mut project = Project::new("MyApp");
        project.licence_file = Some("license.txt".to_string());
        let options = CompilerOptions::default();
        let state = state_for(&project, &options);
        let err = wix_variables(&state, &mut Element::new("Product")).unwrap_err();
        assert!(matches!(err, CompileError::LicenseNotRtf(path) if path == "license.txt"));

        let options = CompilerOptions {
            allow_non_rtf_license: true,
            ..CompilerOptions::default()
        };
        let state = state_for(&project, &options);
        let mut product = Element::new("Product");
        wix_variables(&state, &mut product).unwrap();
        assert_eq!(product.child("WixVariable").unwrap().id(), Some("WixUILicenseRtf"));
    }

    #[test]
    fn test_upper_case_rtf_is_accepted() {
        let mut project = Project::new("MyApp");
        project.licence_file = Some("EULA.RTF".to_string());
        let options = CompilerOptions::default();
        let state = state_for(&project, &options);
        assert!(wix_variables(&state, &mut Element::new("Product")).is_ok());
    }

    #[test]
    fn test_install_dir_ui_property() {
        let mut project = Project::new("MyApp");
        project.ui = UiKind::InstallDir;
        let options = CompilerOptions::default();
        let mut state = state_for(&project, &options);

        let mut product = Element::new("Product").with(
            Element::new("Directory").attr("Id", "TARGETDIR").with(
                Element::new("Directory")
                    .attr("Id", "INSTALLDIR")
                    .with(Element::new("Component").attr("Id", "c")),
            ),
        );
        ui(&mut state, &mut product);

        let prop = product.find_by_id("Property", "WIXUI_INSTALLDIR").unwrap();
        assert_eq!(prop.get_attr("Value"), Some("INSTALLDIR"));
        assert_eq!(product.child("UIRef").unwrap().id(), Some("WixUI_InstallDir"));
        assert!(state.extensions.contains(&WixExtension::UI));
    }

    #[test]
    fn test_to_module() {
        let mut project = Project::new("My Module");
        project.manufacturer = Some("Acme".to_string());
        let options = CompilerOptions {
            output_type: OutputType::Msm,
            ..CompilerOptions::default()
        };
        let state = state_for(&project, &options);
        let mut product = skeleton(&state).with(Element::new("Feature").attr("Id", "Complete"));
        to_module(&state, &mut product);

        assert_eq!(product.name, "Module");
        assert_eq!(product.id(), Some("My_Module"));
        assert!(product.child("Media").is_none());
        assert!(product.child("Feature").is_none());
        let package = product.child("Package").unwrap();
        assert!(package.get_attr("Compressed").is_none());
        assert_eq!(package.get_attr("Manufacturer"), Some("Acme"));
    }
}
