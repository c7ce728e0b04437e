//! Component synthesis for the directory walk

use super::directories::find_dir;
use super::{CompileState, WixExtension};
use crate::document::Element;
use crate::error::{CompileError, Result};
use crate::folders;
use crate::model::{yes_no, Condition, Dir, File, FileAssociation, Permission, ServiceInstaller, Shortcut};
use tracing::debug;

/// `Condition` element with CDATA text
pub(crate) fn condition_element(condition: &Condition) -> Element {
    let mut element = Element::new("Condition").with_cdata(&condition.text);
    element.extend_attrs(&condition.attributes);
    element
}

/// Placeholder component so the installer creates and removes a directory
/// with nothing else in it
pub(crate) fn empty_dir(state: &mut CompileState, dir: &Dir, dir_id: &str, element: &mut Element) -> Result<()> {
    let comp_id = format!("{}.EmptyDirectory", dir_id);
    state.assign(&format!("directory '{}'", dir.name), dir.feature.as_ref(), &comp_id)?;
    element.add(state.component(&comp_id).with(Element::new("CreateFolder")));
    Ok(())
}

/// Component carrying the directory's own feature assignment
pub(crate) fn dir_feature(state: &mut CompileState, dir: &Dir, dir_id: &str, element: &mut Element) -> Result<()> {
    let comp_id = format!("Component.{}", dir_id);
    state.assign(&format!("directory '{}'", dir.name), dir.feature.as_ref(), &comp_id)?;
    element.add(state.component(&comp_id).with(Element::new("CreateFolder")));
    Ok(())
}

/// One component per file
pub(crate) fn file(state: &mut CompileState, dir_id: &str, file: &File, element: &mut Element) -> Result<()> {
    let file_id = file
        .id
        .clone()
        .unwrap_or_else(|| folders::expand(file.file_name()));
    let comp_id = format!("Component.{}", file_id);
    state.assign(&format!("file '{}'", file.name), file.feature.as_ref(), &comp_id)?;

    let mut comp = state.component(&comp_id);
    if let Some(condition) = &file.condition {
        comp.add(condition_element(condition));
    }

    let mut file_element = Element::new("File")
        .attr("Id", &file_id)
        .attr("Source", state.source_path(&file.name));
    file_element.extend_attrs(&file.attributes);

    if file.register_in_gac {
        file_element.set_attr("KeyPath", "yes");
        file_element.set_attr("Assembly", ".net");
        file_element.set_attr("AssemblyManifest", &file_id);
        file_element.set_attr("ProcessorArchitecture", file.processor_architecture.as_str());
    }

    for shortcut in &file.shortcuts {
        file_element.add(file_shortcut(state, dir_id, file, &file_id, shortcut));
    }

    if !file.permissions.is_empty() {
        state.use_extension(WixExtension::Util);
        for permission in &file.permissions {
            file_element.add(permission_element(permission));
        }
    }

    comp.add(file_element);

    if let Some(service) = &file.service {
        let (install, control) = service_elements(service);
        comp.add(install);
        comp.add(control);
    }

    for association in &file.associations {
        comp.add(prog_id(association, &file_id));
    }

    element.add(comp);
    Ok(())
}

fn file_shortcut(state: &mut CompileState, dir_id: &str, file: &File, file_id: &str, shortcut: &Shortcut) -> Element {
    let location_id = if shortcut.location.is_empty() {
        dir_id.to_string()
    } else {
        match find_dir(&state.project.dirs, &shortcut.location).and_then(|d| d.id.clone()) {
            Some(id) => id,
            None => {
                if !state.shortcut_locations.iter().any(|(l, _)| *l == shortcut.location) {
                    debug!("Shortcut location {} is not declared", shortcut.location);
                    state
                        .shortcut_locations
                        .push((shortcut.location.clone(), shortcut.feature.clone()));
                }
                folders::expand(&shortcut.location)
            }
        }
    };

    let working_dir = match shortcut.working_dir.as_deref() {
        Some(dir) if !dir.is_empty() => folders::expand(dir),
        _ => location_id.clone(),
    };

    let name = if shortcut.name.is_empty() {
        let file_name = file.file_name();
        match file_name.rfind('.') {
            Some(pos) if pos > 0 => file_name[..pos].to_string(),
            _ => file_name.to_string(),
        }
    } else {
        format!("{}.lnk", shortcut.name)
    };

    let shortcut_id = shortcut.id.clone().unwrap_or_else(|| folders::expand(&shortcut.name));
    let mut element = Element::new("Shortcut")
        .attr("Id", format!("Shortcut.{}.{}", file_id, shortcut_id))
        .attr("WorkingDirectory", working_dir)
        .attr("Directory", location_id)
        .attr("Name", name);
    element.extend_attrs(&shortcut.attributes);
    element
}

fn prog_id(association: &FileAssociation, file_id: &str) -> Element {
    let mut verb = Element::new("Verb");
    if association.advertise {
        verb.set_attr("Sequence", association.sequence);
    } else {
        verb.set_attr("TargetFile", file_id);
    }
    verb.set_attr("Id", &association.command);
    verb.set_attr("Command", &association.command);
    verb.set_attr("Argument", &association.arguments);

    let extension = Element::new("Extension")
        .attr("Id", &association.extension)
        .attr("ContentType", association.content_type())
        .with(verb);

    let mut element = Element::new("ProgId")
        .attr("Id", format!("{}.file", association.extension))
        .attr("Advertise", yes_no(association.advertise))
        .attr("Description", association.description());
    if let Some(icon) = &association.icon {
        let icon = if icon.is_empty() { file_id } else { icon.as_str() };
        element.set_attr("Icon", icon);
        element.set_attr("IconIndex", association.icon_index);
    }
    element.with(extension)
}

fn service_elements(service: &ServiceInstaller) -> (Element, Element) {
    let install = Element::new("ServiceInstall")
        .attr("Id", &service.name)
        .attr("Name", &service.name)
        .attr_opt("DisplayName", service.display_name.as_ref())
        .attr_opt("Description", service.description.as_ref())
        .attr("Type", &service.service_type)
        .attr("Start", &service.start_type)
        .attr("ErrorControl", &service.error_control)
        .attr_opt("Account", service.account.as_ref())
        .attr_opt("Password", service.password.as_ref())
        .attr_opt("Arguments", service.arguments.as_ref());

    let control = Element::new("ServiceControl")
        .attr("Id", format!("{}.Control", service.name))
        .attr("Name", &service.name)
        .attr_opt("Start", service.start_on.as_ref())
        .attr_opt("Stop", service.stop_on.as_ref())
        .attr_opt("Remove", service.remove_on.as_ref())
        .attr("Wait", "yes");

    (install, control)
}

fn permission_element(permission: &Permission) -> Element {
    let mut element = Element::new("util:PermissionEx")
        .attr("User", &permission.user)
        .attr_opt("Domain", permission.domain.as_ref());
    for right in &permission.rights {
        element.set_attr(right, "yes");
    }
    element.extend_attrs(&permission.attributes);
    element
}

/// Component holding a directory-owned shortcut
pub(crate) fn dir_shortcut(state: &mut CompileState, dir_id: &str, shortcut: &Shortcut, element: &mut Element) -> Result<()> {
    let shortcut_id = shortcut.id.clone().unwrap_or_else(|| folders::expand(&shortcut.name));
    state.assign(&format!("shortcut '{}'", shortcut.name), shortcut.feature.as_ref(), &shortcut_id)?;

    let mut comp = state.component(&shortcut_id);
    if let Some(condition) = &shortcut.condition {
        comp.add(condition_element(condition));
    }

    let working_dir = match shortcut.working_dir.as_deref() {
        Some(dir) if !dir.is_empty() => folders::expand(dir),
        _ => target_working_dir(&shortcut.target),
    };

    let mut sc = Element::new("Shortcut").attr("Id", format!("{}.{}", dir_id, shortcut_id));
    if !working_dir.is_empty() {
        sc.set_attr("WorkingDirectory", working_dir);
    }
    sc.set_attr("Target", &shortcut.target);
    if !shortcut.arguments.is_empty() {
        sc.set_attr("Arguments", &shortcut.arguments);
    }
    sc.set_attr("Name", format!("{}.lnk", shortcut.name));
    sc.extend_attrs(&shortcut.attributes);

    comp.add(sc);
    element.add(comp);
    Ok(())
}

/// Directory part of a shortcut target: `[INSTALLDIR]bin\app.exe` gives
/// `INSTALLDIRbin\`. A target without a separator is returned unchanged.
fn target_working_dir(target: &str) -> String {
    match target.rfind(['\\', '/', ']']) {
        Some(pos) => target[..=pos].replace(['[', ']'], ""),
        None => target.to_string(),
    }
}

/// Merge module references. No component: the module is wired to its
/// feature after the features are emitted.
pub(crate) fn merge_modules(state: &mut CompileState, dir: &Dir, element: &mut Element) -> Result<()> {
    for module in &dir.merge_modules {
        if let Some(feature) = &module.feature {
            if state.project.find_feature(feature).is_none() {
                return Err(CompileError::UnknownFeature {
                    entity: format!("merge module '{}'", module.source_file),
                    feature: feature.clone(),
                });
            }
        }

        let id = module.id.clone().unwrap_or_else(|| folders::expand(module.stem()));
        let mut merge = Element::new("Merge")
            .attr("Id", &id)
            .attr("FileCompression", yes_no(module.file_compression))
            .attr("Language", state.lcid)
            .attr("SourceFile", &module.source_file)
            .attr("DiskId", "1");
        merge.extend_attrs(&module.attributes);
        element.add(merge);

        debug!("Merge module {}", id);
        state.merge_modules.push((id, module.feature.clone()));
    }
    Ok(())
}

/// One component per directory permission
pub(crate) fn dir_permissions(state: &mut CompileState, dir: &Dir, element: &mut Element) -> Result<()> {
    if dir.permissions.is_empty() {
        return Ok(());
    }
    state.use_extension(WixExtension::Util);

    for permission in &dir.permissions {
        let perm_id = permission.id.clone().unwrap_or_else(|| folders::expand(&permission.user));
        let comp_id = format!("Component.{}", perm_id);
        state.assign(
            &format!("permission for '{}'", permission.user),
            permission.feature.as_ref(),
            &comp_id,
        )?;

        let comp = state
            .component(&comp_id)
            .with(Element::new("CreateFolder").with(permission_element(permission)));
        element.add(comp);
    }
    Ok(())
}
