//! End-to-end compiles checked against the parsed source document

use roxmltree::{Document, Node};
use tempfile::TempDir;
use uuid::Uuid;
use wix_tree::guid::{format_guid, GuidFormat, GuidGenerator};
use wix_tree::model::{
    CustomAction, Dir, Feature, File, MajorUpgradeStrategy, Platform, Property, RegValue, RegistryHive,
    Shortcut, Step, User, When,
};
use wix_tree::{CompileError, Compiler, CompilerOptions, OutputType, Project};

const SEED: &str = "6fe30b47-2577-43ad-9095-1861ba25889b";

fn seed() -> Uuid {
    Uuid::parse_str(SEED).unwrap()
}

fn sample_project() -> Project {
    Project::new("MyApp")
        .with_guid(seed())
        .with_version("1.2.0.0")
        .dir(
            Dir::new(r"%ProgramFiles%\My Company\My App")
                .file(File::new("MyApp.exe"))
                .file(File::new("readme.txt")),
        )
}

fn compile(project: &Project) -> String {
    Compiler::default().compile(project).unwrap().to_wxs()
}

fn element<'a, 'i>(doc: &'a Document<'i>, name: &str, id: &str) -> Node<'a, 'i> {
    doc.descendants()
        .find(|n| n.tag_name().name() == name && n.attribute("Id") == Some(id))
        .unwrap_or_else(|| panic!("no {} with Id {}", name, id))
}

fn child_names<'a>(node: Node<'a, '_>) -> Vec<&'a str> {
    node.children()
        .filter(|n| n.is_element())
        .map(|n| n.tag_name().name())
        .collect()
}

#[test]
fn test_product_skeleton() {
    let wxs = compile(&sample_project());
    let doc = Document::parse(&wxs).unwrap();

    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "Wix");
    assert_eq!(root.tag_name().namespace(), Some("http://schemas.microsoft.com/wix/2006/wi"));

    let product = root.first_element_child().unwrap();
    assert_eq!(product.tag_name().name(), "Product");
    assert_eq!(product.attribute("Name"), Some("MyApp"));
    assert_eq!(product.attribute("Version"), Some("1.2.0.0"));
    assert_eq!(product.attribute("Language"), Some("1033"));
    assert_eq!(product.attribute("UpgradeCode"), Some(SEED));

    let names = child_names(product);
    assert_eq!(&names[..3], &["Package", "Media", "Directory"]);
    assert!(names.contains(&"Feature"));
    assert!(names.contains(&"UIRef"));

    let media = product.children().find(|n| n.has_tag_name("Media")).unwrap();
    assert_eq!(media.attribute("Cabinet"), Some("MyApp.cab"));
    assert_eq!(media.attribute("EmbedCab"), Some("yes"));
}

#[test]
fn test_directory_chain_and_install_dir() {
    let output = Compiler::default().compile(&sample_project()).unwrap();
    assert_eq!(output.auto_assigned_install_dir.as_deref(), Some(r"%ProgramFiles%\My Company\My App"));

    let wxs = output.to_wxs();
    let doc = Document::parse(&wxs).unwrap();

    let target = element(&doc, "Directory", "TARGETDIR");
    assert_eq!(target.attribute("Name"), Some("SourceDir"));
    let program_files = element(&doc, "Directory", "ProgramFilesFolder");
    assert_eq!(program_files.parent_element(), Some(target));

    let install_dir = element(&doc, "Directory", "INSTALLDIR");
    assert_eq!(install_dir.attribute("Name"), Some("My App"));
    let components: Vec<&str> = install_dir
        .children()
        .filter(|n| n.has_tag_name("Component"))
        .filter_map(|n| n.attribute("Id"))
        .collect();
    assert_eq!(components, vec!["Component.MyApp.exe", "Component.readme.txt"]);

    let file = element(&doc, "File", "MyApp.exe");
    assert_eq!(file.attribute("Source"), Some("MyApp.exe"));
}

#[test]
fn test_component_guids_are_content_addressed() {
    let wxs = compile(&sample_project());
    let doc = Document::parse(&wxs).unwrap();

    let expected = GuidGenerator::new(seed()).component_guid("Component.MyApp.exe");
    let component = element(&doc, "Component", "Component.MyApp.exe");
    assert_eq!(component.attribute("Guid"), Some(format_guid(&expected, GuidFormat::Hyphens).as_str()));
}

#[test]
fn test_compile_is_deterministic() {
    let project = sample_project()
        .action(CustomAction::set_property("SetMode", "MODE", "full"))
        .reg_value(RegValue::new(RegistryHive::HKLM, r"Software\My Company", "Installed", "1"));
    assert_eq!(compile(&project), compile(&project));
}

#[test]
fn test_unassigned_components_go_to_default_feature() {
    let project = sample_project().feature(Feature::new("Docs"));
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    let complete = element(&doc, "Feature", "Complete");
    let refs: Vec<&str> = complete
        .children()
        .filter(|n| n.has_tag_name("ComponentRef"))
        .filter_map(|n| n.attribute("Id"))
        .collect();
    assert_eq!(refs, vec!["Component.MyApp.exe", "Component.readme.txt"]);

    // Docs owns nothing and is not emitted
    assert!(doc.descendants().all(|n| n.attribute("Id") != Some("Docs")));
}

#[test]
fn test_file_in_named_feature() {
    let project = Project::new("MyApp")
        .with_guid(seed())
        .feature(Feature::new("Docs"))
        .dir(
            Dir::new(r"%ProgramFiles%\MyApp")
                .file(File::new("MyApp.exe"))
                .file(File::new("manual.pdf").with_feature("Docs")),
        );
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    let docs = element(&doc, "Feature", "Docs");
    let refs: Vec<&str> = docs.children().filter_map(|n| n.attribute("Id")).collect();
    assert_eq!(refs, vec!["Component.manual.pdf"]);
}

#[test]
fn test_undeclared_feature_is_rejected() {
    let project = Project::new("MyApp")
        .dir(Dir::new(r"%ProgramFiles%\MyApp").file(File::new("MyApp.exe").with_feature("Ghost")));
    let err = Compiler::default().compile(&project).unwrap_err();
    assert!(matches!(err, CompileError::UnknownFeature { feature, .. } if feature == "Ghost"));
}

#[test]
fn test_actions_chain_and_trail_the_product() {
    let project = sample_project()
        .action(CustomAction::set_property("SetMode", "MODE", "full"))
        .action(CustomAction::set_property("SetLevel", "LEVEL", "3").placed(When::After, Step::PreviousAction));
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    let product = doc.root_element().first_element_child().unwrap();
    let names = child_names(product);
    assert_eq!(names.last(), Some(&"InstallExecuteSequence"));
    let first_action = names.iter().position(|n| *n == "CustomAction").unwrap();
    let feature = names.iter().position(|n| *n == "Feature").unwrap();
    assert!(first_action < feature);

    let sequence = product.children().find(|n| n.has_tag_name("InstallExecuteSequence")).unwrap();
    let customs: Vec<Node> = sequence.children().filter(|n| n.has_tag_name("Custom")).collect();
    assert_eq!(customs[0].attribute("Action"), Some("SetMode"));
    assert_eq!(customs[0].attribute("After"), Some("InstallFinalize"));
    assert_eq!(customs[1].attribute("Action"), Some("SetLevel"));
    assert_eq!(customs[1].attribute("After"), Some("SetMode"));
    assert_eq!(customs[1].text(), Some("1"));
}

#[test]
fn test_previous_action_without_predecessor() {
    let project = sample_project()
        .action(CustomAction::set_property("SetMode", "MODE", "full").placed(When::Before, Step::PreviousAction));
    let err = Compiler::default().compile(&project).unwrap_err();
    assert!(matches!(err, CompileError::PreviousActionUnavailable { action } if action == "SetMode"));
}

#[test]
fn test_properties() {
    let project = sample_project()
        .property(Property::new("MODE", "full"))
        .property(Property::from_registry("OLDDIR", RegistryHive::HKLM, r"Software\My Company", "Path"))
        .property(Property::reference("NETFRAMEWORK45"));
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    assert_eq!(element(&doc, "Property", "MODE").attribute("Value"), Some("full"));
    let search = element(&doc, "Property", "OLDDIR").first_element_child().unwrap();
    assert_eq!(search.tag_name().name(), "RegistrySearch");
    assert_eq!(search.attribute("Name"), Some("Path"));
    element(&doc, "PropertyRef", "NETFRAMEWORK45");
}

#[test]
fn test_empty_property_ref() {
    let project = sample_project().property(Property::reference(""));
    let err = Compiler::default().compile(&project).unwrap_err();
    assert!(matches!(err, CompileError::EmptyPropertyRef));
}

#[test]
fn test_registry_component_under_install_dir() {
    let project = sample_project().reg_value(RegValue::new(RegistryHive::HKLM, r"Software\My Company", "Installed", "1"));
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    let component = element(&doc, "Component", "Registry1");
    assert_eq!(component.parent_element().and_then(|p| p.attribute("Id")), Some("INSTALLDIR"));
    element(&doc, "Feature", "Complete")
        .children()
        .find(|n| n.attribute("Id") == Some("Registry1"))
        .unwrap();
}

#[test]
fn test_extension_namespaces_are_declared() {
    let mut project = sample_project();
    project.users.push(User::new("svc_app"));
    let output = Compiler::default().compile(&project).unwrap();
    let wxs = output.to_wxs();
    let doc = Document::parse(&wxs).unwrap();

    let user = doc.descendants().find(|n| n.tag_name().name() == "User").unwrap();
    assert_eq!(user.tag_name().namespace(), Some("http://schemas.microsoft.com/wix/UtilExtension"));
    assert!(output.extensions.iter().any(|e| e.dll() == "WixUtilExtension.dll"));
}

#[test]
fn test_x64_maps_program_files() {
    let project = sample_project().with_platform(Platform::X64);
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    element(&doc, "Directory", "ProgramFiles64Folder");
    assert!(doc.descendants().all(|n| n.attribute("Id") != Some("ProgramFilesFolder")));

    let package = doc.descendants().find(|n| n.has_tag_name("Package")).unwrap();
    assert_eq!(package.attribute("Platform"), Some("x64"));
}

#[test]
fn test_shortcut_to_undeclared_location() {
    let project = Project::new("MyApp").with_guid(seed()).dir(
        Dir::new(r"%ProgramFiles%\MyApp")
            .file(File::new("MyApp.exe").shortcut(Shortcut::new("MyApp").location("%Desktop%"))),
    );
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    let desktop = element(&doc, "Directory", "DesktopFolder");
    assert_eq!(desktop.parent_element().and_then(|p| p.attribute("Id")), Some("TARGETDIR"));
    let shortcut = doc.descendants().find(|n| n.has_tag_name("Shortcut")).unwrap();
    assert_eq!(shortcut.attribute("Directory"), Some("DesktopFolder"));
}

#[test]
fn test_directory_ids_unique_across_document() {
    let project = Project::new("MyApp")
        .with_guid(seed())
        .dir(
            Dir::new(r"%ProgramFiles%\Acme")
                .file(
                    File::new("app.exe")
                        .shortcut(Shortcut::new("Tools").location(r"%ProgramMenu%\Acme\Tools"))
                        .shortcut(Shortcut::new("Site").location(r"%ProgramMenu%\Acme")),
                )
                .dir(Dir::new("Data").file(File::new("a.txt")))
                .dir(Dir::new("Data").file(File::new("b.txt")))
                .dir(Dir::new("Data.1").file(File::new("c.txt")))
                .dir(Dir::new("Logs").with_id("LOGDIR").file(File::new("log.cfg"))),
        )
        .dir(Dir::new(r"%ProgramMenu%\Acme.Tools").file(File::new("tools.txt")));
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    let mut ids: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("Directory"))
        .filter_map(|n| n.attribute("Id"))
        .collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total, "duplicate directory ids in {:?}", ids);

    let dir_of = |file: &str| {
        element(&doc, "File", file)
            .ancestors()
            .find(|n| n.has_tag_name("Directory"))
            .unwrap()
    };
    assert_eq!(dir_of("c.txt").attribute("Id"), Some("INSTALLDIR.Data.1.1"));
    assert_eq!(dir_of("c.txt").attribute("Name"), Some("Data.1"));
    assert_eq!(dir_of("b.txt").attribute("Id"), Some("INSTALLDIR.Data.1"));
    assert_eq!(dir_of("log.cfg").attribute("Id"), Some("LOGDIR"));
    assert_eq!(dir_of("tools.txt").attribute("Id"), Some("ProgramMenuFolder.Acme.Tools.1"));

    let tools = element(&doc, "Directory", "ProgramMenuFolder.Acme.Tools");
    assert_eq!(tools.attribute("Name"), Some("Tools"));
    assert_eq!(
        tools.parent_element().and_then(|p| p.attribute("Id")),
        Some("ProgramMenuFolder.Acme")
    );
    let shortcut = element(&doc, "Shortcut", "Shortcut.app.exe.Tools");
    assert_eq!(shortcut.attribute("Directory"), Some("ProgramMenuFolder.Acme.Tools"));
}

#[test]
fn test_major_upgrade() {
    let mut project = sample_project();
    project.major_upgrade_strategy = Some(MajorUpgradeStrategy::default());
    let wxs = compile(&project);
    let doc = Document::parse(&wxs).unwrap();

    let upgrade = element(&doc, "Upgrade", SEED);
    let versions: Vec<Node> = upgrade.children().filter(|n| n.is_element()).collect();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].attribute("Maximum"), Some("1.2.0.0"));
    assert_eq!(versions[1].attribute("Minimum"), Some("1.2.0.0"));
    assert_eq!(versions[1].attribute("OnlyDetect"), Some("yes"));

    let prevent = element(&doc, "CustomAction", "PreventDowngrading");
    assert_eq!(prevent.attribute("Error"), Some("Newer version already installed"));
    for sequence in ["InstallExecuteSequence", "InstallUISequence"] {
        let seq = doc.descendants().find(|n| n.has_tag_name(sequence)).unwrap();
        assert!(seq.children().any(|n| n.attribute("Action") == Some("PreventDowngrading")));
    }
    assert!(doc.descendants().any(|n| n.has_tag_name("RemoveExistingProducts")));
}

#[test]
fn test_license_file_must_be_rtf() {
    let mut project = sample_project();
    project.licence_file = Some("license.txt".to_string());
    let err = Compiler::default().compile(&project).unwrap_err();
    assert!(matches!(err, CompileError::LicenseNotRtf(_)));

    project.licence_file = Some("license.rtf".to_string());
    let wxs = compile(&project);
    assert!(wxs.contains("WixUILicenseRtf"));
}

#[test]
fn test_merge_module_output() {
    let options = CompilerOptions {
        output_type: OutputType::Msm,
        ..CompilerOptions::default()
    };
    let mut project = sample_project();
    project.manufacturer = Some("My Company".to_string());
    let wxs = Compiler::new(options).compile(&project).unwrap().to_wxs();
    let doc = Document::parse(&wxs).unwrap();

    let module = doc.root_element().first_element_child().unwrap();
    assert_eq!(module.tag_name().name(), "Module");
    assert_eq!(module.attribute("Id"), Some("MyApp"));
    assert!(doc.descendants().all(|n| !n.has_tag_name("Feature") && !n.has_tag_name("Media")));

    let package = module.children().find(|n| n.has_tag_name("Package")).unwrap();
    assert_eq!(package.attribute("Manufacturer"), Some("My Company"));
    assert_eq!(package.attribute("Compressed"), None);
}

#[test]
fn test_empty_project_gets_dummy_directory() {
    let wxs = compile(&Project::new("Empty").with_guid(seed()));
    let doc = Document::parse(&wxs).unwrap();

    let install_dir = element(&doc, "Directory", "INSTALLDIR");
    assert_eq!(install_dir.attribute("Name"), Some("DummyDir"));
    assert!(install_dir.children().any(|n| n.has_tag_name("Component")));
}

#[test]
fn test_stage_and_cleanup() {
    let temp = TempDir::new().unwrap();
    let artifact = Compiler::default().stage(&sample_project(), temp.path()).unwrap();
    assert!(artifact.wxs_path.exists());
    assert_eq!(artifact.temp_files, vec![temp.path().join("MyApp.wxs")]);

    let removed = artifact.cleanup().unwrap();
    assert_eq!(removed.len(), 1);
    assert!(!artifact.wxs_path.exists());
}

#[test]
fn test_preserved_temp_files_survive_cleanup() {
    let temp = TempDir::new().unwrap();
    let options = CompilerOptions {
        preserve_temp_files: true,
        ..CompilerOptions::default()
    };
    let artifact = Compiler::new(options).stage(&sample_project(), temp.path()).unwrap();
    assert!(artifact.cleanup().unwrap().is_empty());
    assert!(artifact.wxs_path.exists());
}

#[test]
fn test_preserve_temp_files_does_not_change_document() {
    let project = sample_project().action(CustomAction::set_property("SetMode", "MODE", "full"));
    let preserved = CompilerOptions {
        preserve_temp_files: true,
        ..CompilerOptions::default()
    };
    let a = Compiler::default().compile(&project).unwrap().to_wxs();
    let b = Compiler::new(preserved).compile(&project).unwrap().to_wxs();
    assert_eq!(a, b);
}
