//! Directory tree construction
//!
//! Directories are prepared on the compiler's private copy of the project:
//! path-named directories become nested chains, 32-bit special folders are
//! mapped for x64 packages, the install directory gets its default id and
//! every directory, file, shortcut, permission and merge module receives its
//! final id. Emission then only reads ids.

use super::{components, CompileState};
use crate::config::CompilerOptions;
use crate::document::Element;
use crate::error::Result;
use crate::folders;
use crate::guid::{IdGenerator, IdKind};
use crate::model::{ActionKind, Dir, Platform, Project, Shortcut};
use tracing::debug;

/// Id of the document's root directory
pub(crate) const TARGET_DIR: &str = "TARGETDIR";

/// Placeholder installed when a project declares no directory at all
const DUMMY_DIR: &str = r"%ProgramFiles%\WixTree\DummyDir";

/// Normalize the directory tree and assign ids. Returns the logical path
/// that received the default install directory id, if any.
pub(crate) fn prepare(project: &mut Project, options: &CompilerOptions, ids: &mut IdGenerator) -> Option<String> {
    if project.dirs.is_empty() {
        debug!("No directories declared, adding {}", DUMMY_DIR);
        project.dirs.push(Dir::new(DUMMY_DIR));
    }

    if project.platform == Platform::X64 && options.map_64_install_dirs {
        map_64(project);
    }

    let dirs = std::mem::take(&mut project.dirs);
    project.dirs = dirs.into_iter().map(split_dir).collect();

    let auto_install_dir = assign_install_dir(project, &options.install_dir_default_id);

    for dir in &project.dirs {
        reserve_explicit(dir, ids);
    }
    reserve_shortcut_locations(project, ids);
    for dir in &mut project.dirs {
        resolve_dir(dir, TARGET_DIR, ids);
    }

    auto_install_dir
}

fn map_64(project: &mut Project) {
    for dir in &mut project.dirs {
        map_dir_64(dir);
    }

    for action in &mut project.actions {
        match &mut action.kind {
            ActionKind::QtCmdLine { app_path, args } => {
                *app_path = folders::map_64_dirs(app_path);
                *args = folders::map_64_dirs(args);
            }
            ActionKind::PathFile { app_path, args, working_dir } => {
                *app_path = folders::map_64_dirs(app_path);
                *args = folders::map_64_dirs(args);
                *working_dir = folders::map_64_dirs(working_dir);
            }
            ActionKind::InstalledFile { args, .. } | ActionKind::BinaryFile { args, .. } => {
                *args = folders::map_64_dirs(args);
            }
            _ => {}
        }
    }
}

fn map_dir_64(dir: &mut Dir) {
    dir.name = folders::map_64_dirs(&dir.name);
    for shortcut in &mut dir.shortcuts {
        map_shortcut_64(shortcut);
    }
    for file in &mut dir.files {
        for shortcut in &mut file.shortcuts {
            map_shortcut_64(shortcut);
        }
    }
    for sub in &mut dir.dirs {
        map_dir_64(sub);
    }
}

fn map_shortcut_64(shortcut: &mut Shortcut) {
    shortcut.location = folders::map_64_dirs(&shortcut.location);
    shortcut.target = folders::map_64_dirs(&shortcut.target);
    if let Some(dir) = &mut shortcut.working_dir {
        *dir = folders::map_64_dirs(dir);
    }
}

/// Expand a path-named directory into a chain of single-name directories.
/// Contents, id and feature stay with the innermost one.
fn split_dir(mut dir: Dir) -> Dir {
    dir.dirs = std::mem::take(&mut dir.dirs).into_iter().map(split_dir).collect();

    let parts: Vec<String> = folders::split_path(&dir.name)
        .into_iter()
        .map(String::from)
        .collect();
    let Some((leaf, outer)) = parts.split_last() else {
        return dir;
    };
    if outer.is_empty() {
        return dir;
    }

    dir.name = leaf.clone();
    let mut current = dir;
    for name in outer.iter().rev() {
        current = Dir::new(name.clone()).dir(current);
    }
    current
}

/// Give the default install directory id to the first directory that owns
/// items or branches, descending from the first top-level directory.
fn assign_install_dir(project: &mut Project, default_id: &str) -> Option<String> {
    let mut dir = project.dirs.first_mut()?;
    let mut logical_path = dir.name.clone();

    while dir.shortcuts.is_empty() && dir.files.is_empty() && dir.dirs.len() == 1 {
        dir = &mut dir.dirs[0];
        logical_path.push('\\');
        logical_path.push_str(&dir.name);
    }

    // Special folders keep their installer id
    if dir.id.is_some() || default_id.is_empty() || folders::is_special_folder(&dir.name) {
        return None;
    }
    dir.id = Some(default_id.to_string());
    Some(logical_path)
}

fn reserve_explicit(dir: &Dir, ids: &mut IdGenerator) {
    if let Some(id) = &dir.id {
        ids.reserve(IdKind::Directory, id);
    }
    for file in &dir.files {
        if let Some(id) = &file.id {
            ids.reserve(IdKind::File, id);
        }
    }
    for sub in &dir.dirs {
        reserve_explicit(sub, ids);
    }
}

/// Reserve the ids of undeclared shortcut location paths. Those directories
/// are only created during emission, after every declared directory has its
/// id, and their ids are fixed by the path the shortcuts reference.
fn reserve_shortcut_locations(project: &Project, ids: &mut IdGenerator) {
    let mut locations = Vec::new();
    for dir in &project.dirs {
        collect_locations(dir, &mut locations);
    }

    for location in locations {
        for prefix in folders::path_prefixes(location) {
            // Single names never collide: generated directory ids are dotted
            if folders::split_path(&prefix).len() < 2 || find_dir(&project.dirs, &prefix).is_some() {
                break;
            }
            ids.reserve(IdKind::Directory, &folders::expand(&prefix));
        }
    }
}

fn collect_locations<'d>(dir: &'d Dir, locations: &mut Vec<&'d str>) {
    for shortcut in dir.files.iter().flat_map(|f| f.shortcuts.iter()) {
        if !shortcut.location.is_empty() {
            locations.push(&shortcut.location);
        }
    }
    for sub in &dir.dirs {
        collect_locations(sub, locations);
    }
}

/// Assign the final id of a directory and everything it owns
pub(crate) fn resolve_dir(dir: &mut Dir, parent_id: &str, ids: &mut IdGenerator) {
    let id = match &dir.id {
        Some(id) => id.clone(),
        None => match folders::special_folder_id(&dir.name) {
            Some(folder) => folder.to_string(),
            None => ids.from_name(
                IdKind::Directory,
                &format!("{}.{}", parent_id, folders::expand(&dir.name)),
            ),
        },
    };
    dir.id = Some(id.clone());

    for file in &mut dir.files {
        if file.id.is_none() {
            file.id = Some(ids.from_name(IdKind::File, &folders::expand(file.file_name())));
        }
        for shortcut in &mut file.shortcuts {
            resolve_shortcut(shortcut, ids);
        }
        for permission in &mut file.permissions {
            if permission.id.is_none() {
                permission.id = Some(ids.next(IdKind::Permission, "Permission"));
            }
        }
    }

    for shortcut in &mut dir.shortcuts {
        resolve_shortcut(shortcut, ids);
    }

    for permission in &mut dir.permissions {
        if permission.id.is_none() {
            permission.id = Some(ids.next(IdKind::Permission, "Permission"));
        }
    }

    for module in &mut dir.merge_modules {
        if module.id.is_none() {
            module.id = Some(ids.from_name(IdKind::MergeModule, &folders::expand(module.stem())));
        }
    }

    for sub in &mut dir.dirs {
        resolve_dir(sub, &id, ids);
    }
}

fn resolve_shortcut(shortcut: &mut Shortcut, ids: &mut IdGenerator) {
    if shortcut.id.is_none() {
        shortcut.id = Some(ids.from_name(IdKind::Shortcut, &folders::expand(&shortcut.name)));
    }
}

/// Find a declared directory by logical path (`%ProgramFiles%\My Company`)
/// or by id (`INSTALLDIR`, `[INSTALLDIR]`). Names compare case-insensitively
/// after token expansion.
pub(crate) fn find_dir<'d>(dirs: &'d [Dir], path: &str) -> Option<&'d Dir> {
    let tokens = folders::split_path(path);
    if tokens.len() == 1 {
        let bare = tokens[0].trim_start_matches('[').trim_end_matches(']');
        if let Some(dir) = find_by_id(dirs, bare) {
            return Some(dir);
        }
    }
    find_by_tokens(dirs, &tokens)
}

fn find_by_id<'d>(dirs: &'d [Dir], id: &str) -> Option<&'d Dir> {
    for dir in dirs {
        if dir.id.as_deref() == Some(id) {
            return Some(dir);
        }
        if let Some(found) = find_by_id(&dir.dirs, id) {
            return Some(found);
        }
    }
    None
}

fn find_by_tokens<'d>(dirs: &'d [Dir], tokens: &[&str]) -> Option<&'d Dir> {
    let (first, rest) = tokens.split_first()?;
    let key = folders::expand(first).to_lowercase();

    for dir in dirs {
        if folders::expand(&dir.name).to_lowercase() != key {
            continue;
        }
        if rest.is_empty() {
            return Some(dir);
        }
        if let Some(found) = find_by_tokens(&dir.dirs, rest) {
            return Some(found);
        }
    }
    None
}

/// Emit a directory, its components and its subdirectories under `parent`
pub(crate) fn process_dir(state: &mut CompileState, dir: &Dir, parent: &mut Element) -> Result<()> {
    let dir_id = dir.id.clone().unwrap_or_else(|| folders::expand(&dir.name));
    let name = folders::special_folder_id(&dir.name)
        .map(String::from)
        .unwrap_or_else(|| dir.name.clone());

    // Special folders and explicit ids may repeat under the same parent
    let element = parent.child_matching_or_add(
        |e| e.name == "Directory" && e.id() == Some(dir_id.as_str()),
        || Element::new("Directory").attr("Id", &dir_id).attr("Name", &name),
    );

    if dir.is_empty() {
        if element.child("Component").is_none() {
            components::empty_dir(state, dir, &dir_id, element)?;
        }
        components::merge_modules(state, dir, element)?;
        return Ok(());
    }

    if dir.feature.is_some() {
        components::dir_feature(state, dir, &dir_id, element)?;
    }

    for file in &dir.files {
        components::file(state, &dir_id, file, element)?;
    }

    for shortcut in &dir.shortcuts {
        components::dir_shortcut(state, &dir_id, shortcut, element)?;
    }

    components::merge_modules(state, dir, element)?;
    components::dir_permissions(state, dir, element)?;

    for sub in &dir.dirs {
        process_dir(state, sub, element)?;
    }
    Ok(())
}

/// Create the directories named by shortcut locations that no declared
/// directory matches. Each chain hangs off the longest declared prefix of
/// its path, or off the root directory.
pub(crate) fn process_shortcut_locations(state: &mut CompileState, root: &mut Element) -> Result<()> {
    let locations = std::mem::take(&mut state.shortcut_locations);
    let project = state.project;

    for (location, feature) in locations {
        let tokens = folders::split_path(&location);
        if tokens.is_empty() {
            continue;
        }

        let anchor = folders::path_prefixes(&location)
            .iter()
            .skip(1)
            .find_map(|prefix| find_dir(&project.dirs, prefix).map(|dir| (dir, folders::split_path(prefix).len())));

        let (anchor_id, start) = match anchor {
            Some((dir, n)) => (dir.id.clone(), n),
            None => (None, 0),
        };

        let mut chain = location_chain(&tokens, start, feature);
        let parent_id = anchor_id.clone().unwrap_or_else(|| TARGET_DIR.to_string());
        resolve_dir(&mut chain, &parent_id, &mut state.ids);
        debug!("Creating shortcut location {} under {}", location, parent_id);

        match anchor_id {
            Some(id) => match root.find_by_id_mut("Directory", &id) {
                Some(parent) => process_dir(state, &chain, parent)?,
                None => process_dir(state, &chain, root)?,
            },
            None => process_dir(state, &chain, root)?,
        }
    }
    Ok(())
}

/// Nested directories for `tokens[start..]`. Each one is identified by its
/// full logical path, so chains sharing a prefix merge on emission. The
/// innermost one takes the id the shortcuts already reference and the
/// shortcut's feature.
fn location_chain(tokens: &[&str], start: usize, feature: Option<String>) -> Dir {
    let id_at = |n: usize| folders::expand(&tokens[..n].join("\\"));
    let last = tokens.len() - 1;

    let mut current = Dir::new(tokens[last]).with_id(id_at(tokens.len()));
    current.feature = feature;
    for n in (start + 1..=last).rev() {
        current = Dir::new(tokens[n - 1]).with_id(id_at(n)).dir(current);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::File;

    fn prepared(project: &mut Project) -> Option<String> {
        let mut ids = IdGenerator::new();
        prepare(project, &CompilerOptions::default(), &mut ids)
    }

    #[test]
    fn test_split_path_named_dir() {
        let dir = split_dir(
            Dir::new(r"%ProgramFiles%\Acme\MyApp")
                .with_feature("Core")
                .file(File::new("a.exe")),
        );
        assert_eq!(dir.name, "%ProgramFiles%");
        assert!(dir.files.is_empty());
        let leaf = &dir.dirs[0].dirs[0];
        assert_eq!(leaf.name, "MyApp");
        assert_eq!(leaf.files.len(), 1);
        assert_eq!(leaf.feature.as_deref(), Some("Core"));
        assert!(dir.dirs[0].feature.is_none());
    }

    #[test]
    fn test_install_dir_auto_assigned() {
        let mut project = Project::new("MyApp").dir(
            Dir::new(r"%ProgramFiles%\Acme\MyApp")
                .file(File::new("a.exe"))
                .dir(Dir::new("Docs")),
        );
        let path = prepared(&mut project);
        assert_eq!(path.as_deref(), Some(r"%ProgramFiles%\Acme\MyApp"));

        let root = &project.dirs[0];
        assert_eq!(root.id.as_deref(), Some("ProgramFilesFolder"));
        assert_eq!(root.dirs[0].id.as_deref(), Some("ProgramFilesFolder.Acme"));
        let install = &root.dirs[0].dirs[0];
        assert_eq!(install.id.as_deref(), Some("INSTALLDIR"));
        assert_eq!(install.dirs[0].id.as_deref(), Some("INSTALLDIR.Docs"));
        assert_eq!(install.files[0].id.as_deref(), Some("a.exe"));
    }

    #[test]
    fn test_explicit_id_blocks_auto_assignment() {
        let mut project = Project::new("MyApp")
            .dir(Dir::new(r"%ProgramFiles%\Acme").with_id("APPDIR").file(File::new("a.exe")));
        assert!(prepared(&mut project).is_none());
        assert_eq!(project.dirs[0].dirs[0].id.as_deref(), Some("APPDIR"));
    }

    #[test]
    fn test_empty_default_id_disables_auto_assignment() {
        let mut project = Project::new("MyApp").dir(Dir::new("%ProgramFiles%").file(File::new("a.exe")));
        let options = CompilerOptions {
            install_dir_default_id: String::new(),
            ..CompilerOptions::default()
        };
        assert!(prepare(&mut project, &options, &mut IdGenerator::new()).is_none());
        assert_eq!(project.dirs[0].id.as_deref(), Some("ProgramFilesFolder"));
    }

    #[test]
    fn test_zero_dirs_get_dummy() {
        let mut project = Project::new("MyApp");
        prepared(&mut project);
        assert_eq!(project.dirs.len(), 1);
        assert_eq!(project.dirs[0].name, "%ProgramFiles%");
    }

    #[test]
    fn test_x64_mapping() {
        let mut project = Project::new("MyApp")
            .with_platform(Platform::X64)
            .dir(Dir::new(r"%ProgramFiles%\Acme").file(File::new("a.exe")));
        prepared(&mut project);
        assert_eq!(project.dirs[0].id.as_deref(), Some("ProgramFiles64Folder"));
    }

    #[test]
    fn test_duplicate_names_get_unique_ids() {
        let mut project = Project::new("MyApp").dir(
            Dir::new("%ProgramFiles%")
                .dir(Dir::new("Data").file(File::new("a.txt")))
                .dir(Dir::new("Data").file(File::new("b.txt"))),
        );
        prepared(&mut project);
        let root = &project.dirs[0];
        assert_eq!(root.id.as_deref(), Some("ProgramFilesFolder"));
        assert_eq!(root.dirs[0].id.as_deref(), Some("ProgramFilesFolder.Data"));
        assert_eq!(root.dirs[1].id.as_deref(), Some("ProgramFilesFolder.Data.1"));
    }

    #[test]
    fn test_find_dir() {
        let mut project = Project::new("MyApp")
            .dir(Dir::new(r"%ProgramFiles%\My Company\My Product").file(File::new("a.exe")));
        prepared(&mut project);

        let found = find_dir(&project.dirs, r"%ProgramFiles%\my company\My Product").unwrap();
        assert_eq!(found.id.as_deref(), Some("INSTALLDIR"));
        assert!(find_dir(&project.dirs, "[INSTALLDIR]").is_some());
        assert!(find_dir(&project.dirs, r"ProgramFilesFolder\My Company").is_some());
        assert!(find_dir(&project.dirs, r"%ProgramMenu%\My Company").is_none());
    }

    #[test]
    fn test_location_chain() {
        let chain = location_chain(&["%ProgramMenu%", "Acme"], 0, Some("Docs".into()));
        assert_eq!(chain.name, "%ProgramMenu%");
        assert_eq!(chain.id.as_deref(), Some("ProgramMenuFolder"));
        assert!(chain.feature.is_none());
        let leaf = &chain.dirs[0];
        assert_eq!(leaf.id.as_deref(), Some("ProgramMenuFolder.Acme"));
        assert_eq!(leaf.feature.as_deref(), Some("Docs"));
    }

    #[test]
    fn test_location_chain_below_anchor() {
        let chain = location_chain(&["%ProgramMenu%", "Acme", "Tools"], 1, None);
        assert_eq!(chain.name, "Acme");
        assert_eq!(chain.id.as_deref(), Some("ProgramMenuFolder.Acme"));
        assert_eq!(chain.dirs[0].id.as_deref(), Some("ProgramMenuFolder.Acme.Tools"));
    }

    #[test]
    fn test_suffixed_sibling_keeps_its_own_id() {
        let mut project = Project::new("MyApp").dir(
            Dir::new("%ProgramFiles%")
                .dir(Dir::new("Data").file(File::new("a.txt")))
                .dir(Dir::new("Data").file(File::new("b.txt")))
                .dir(Dir::new("Data.1").file(File::new("c.txt"))),
        );
        prepared(&mut project);
        let ids: Vec<&str> = project.dirs[0].dirs.iter().filter_map(|d| d.id.as_deref()).collect();
        assert_eq!(ids, vec!["ProgramFilesFolder.Data", "ProgramFilesFolder.Data.1", "ProgramFilesFolder.Data.1.1"]);
    }

    #[test]
    fn test_undeclared_shortcut_location_is_reserved() {
        let mut project = Project::new("MyApp").dir(
            Dir::new("%ProgramMenu%")
                .dir(Dir::new("Acme.Tools").file(File::new("a.txt")))
                .dir(
                    Dir::new("Other")
                        .file(File::new("b.exe").shortcut(Shortcut::new("B").location(r"%ProgramMenu%\Acme\Tools"))),
                ),
        );
        prepared(&mut project);
        assert_eq!(project.dirs[0].dirs[0].id.as_deref(), Some("ProgramMenuFolder.Acme.Tools.1"));
    }
}
