//! Special folder tokens and identifier escaping
//!
//! Directory names may use the short `%Token%` form (`%ProgramFiles%`), the
//! long form (`%ProgramFilesFolder%`), the bare installer id
//! (`ProgramFilesFolder`) or the bracketed document reference
//! (`[ProgramFilesFolder]`). All of them resolve to the same folder id.

/// `%Token%` to folder id. Long forms come first so that replacement never
/// matches a short token inside a long one.
const FOLDER_TOKENS: &[(&str, &str)] = &[
    ("%AdminToolsFolder%", "AdminToolsFolder"),
    ("%AppDataFolder%", "AppDataFolder"),
    ("%CommonAppDataFolder%", "CommonAppDataFolder"),
    ("%CommonFiles64Folder%", "CommonFiles64Folder"),
    ("%CommonFilesFolder%", "CommonFilesFolder"),
    ("%DesktopFolder%", "DesktopFolder"),
    ("%FavoritesFolder%", "FavoritesFolder"),
    ("%FontsFolder%", "FontsFolder"),
    ("%LocalAppDataFolder%", "LocalAppDataFolder"),
    ("%MyPicturesFolder%", "MyPicturesFolder"),
    ("%PersonalFolder%", "PersonalFolder"),
    ("%ProgramFiles64Folder%", "ProgramFiles64Folder"),
    ("%ProgramFilesFolder%", "ProgramFilesFolder"),
    ("%ProgramMenuFolder%", "ProgramMenuFolder"),
    ("%SendToFolder%", "SendToFolder"),
    ("%StartMenuFolder%", "StartMenuFolder"),
    ("%StartupFolder%", "StartupFolder"),
    ("%System16Folder%", "System16Folder"),
    ("%System64Folder%", "System64Folder"),
    ("%SystemFolder%", "SystemFolder"),
    ("%TempFolder%", "TempFolder"),
    ("%TemplateFolder%", "TemplateFolder"),
    ("%WindowsFolder%", "WindowsFolder"),
    ("%WindowsVolume%", "WindowsVolume"),
    ("%AdminTools%", "AdminToolsFolder"),
    ("%AppData%", "AppDataFolder"),
    ("%CommonAppData%", "CommonAppDataFolder"),
    ("%CommonFiles64%", "CommonFiles64Folder"),
    ("%CommonFiles%", "CommonFilesFolder"),
    ("%Desktop%", "DesktopFolder"),
    ("%Favorites%", "FavoritesFolder"),
    ("%Fonts%", "FontsFolder"),
    ("%LocalAppData%", "LocalAppDataFolder"),
    ("%MyPictures%", "MyPicturesFolder"),
    ("%Personal%", "PersonalFolder"),
    ("%ProgramFiles64%", "ProgramFiles64Folder"),
    ("%ProgramFiles%", "ProgramFilesFolder"),
    ("%ProgramMenu%", "ProgramMenuFolder"),
    ("%SendTo%", "SendToFolder"),
    ("%StartMenu%", "StartMenuFolder"),
    ("%Startup%", "StartupFolder"),
    ("%System16%", "System16Folder"),
    ("%System64%", "System64Folder"),
    ("%System%", "SystemFolder"),
    ("%Temp%", "TempFolder"),
    ("%Template%", "TemplateFolder"),
    ("%Windows%", "WindowsFolder"),
];

/// 32-bit token to 64-bit token.
const FOLDERS_64: &[(&str, &str)] = &[
    ("%ProgramFilesFolder%", "%ProgramFiles64Folder%"),
    ("%ProgramFiles%", "%ProgramFiles64%"),
    ("%CommonFilesFolder%", "%CommonFiles64Folder%"),
    ("%SystemFolder%", "%System64Folder%"),
    ("%CommonFiles%", "%CommonFiles64%"),
    ("%System%", "%System64%"),
    ("[ProgramFilesFolder]", "[ProgramFiles64Folder]"),
    ("[CommonFilesFolder]", "[CommonFiles64Folder]"),
    ("[SystemFolder]", "[System64Folder]"),
];

const BARE_FOLDERS_64: &[(&str, &str)] = &[
    ("ProgramFilesFolder", "ProgramFiles64Folder"),
    ("CommonFilesFolder", "CommonFiles64Folder"),
    ("SystemFolder", "System64Folder"),
];

/// Resolve a directory name to its special folder id, if it is one.
pub fn special_folder_id(name: &str) -> Option<&'static str> {
    if let Some((_, id)) = FOLDER_TOKENS.iter().find(|(token, _)| *token == name) {
        return Some(id);
    }
    let bare = name.trim_start_matches('[').trim_end_matches(']');
    FOLDER_TOKENS
        .iter()
        .map(|(_, id)| *id)
        .find(|id| *id == bare)
}

pub fn is_special_folder(name: &str) -> bool {
    special_folder_id(name).is_some()
}

/// Replace every `%Token%` in `s` with its folder id.
pub fn expand_folder_tokens(s: &str) -> String {
    let mut result = s.to_string();
    for (token, id) in FOLDER_TOKENS {
        if result.contains(token) {
            result = result.replace(token, id);
        }
    }
    result
}

/// Turn a name or logical path into an identifier.
///
/// `%ProgramMenu%\My Company` becomes `ProgramMenuFolder.My_Company`.
pub fn expand(name: &str) -> String {
    if let Some(id) = special_folder_id(name) {
        return id.to_string();
    }

    let expanded = expand_folder_tokens(name);
    let mut id: String = expanded
        .split(['\\', '/'])
        .filter(|s| !s.is_empty())
        .map(|part| {
            let part = match special_folder_id(part) {
                Some(id) => id.to_string(),
                None => part.to_string(),
            };
            sanitize_id(&part)
        })
        .collect::<Vec<_>>()
        .join(".");

    if id.is_empty() {
        id.push('_');
    } else if id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    id
}

/// Replace `%Token%` with the `[FolderId]` property reference used by
/// command lines and shortcut targets.
pub fn expand_command_path(s: &str) -> String {
    let mut result = s.to_string();
    for (token, id) in FOLDER_TOKENS {
        if result.contains(token) {
            result = result.replace(token, &format!("[{}]", id));
        }
    }
    result
}

/// Rewrite 32-bit special folder references to their 64-bit equivalents.
pub fn map_64_dirs(s: &str) -> String {
    if let Some((_, mapped)) = BARE_FOLDERS_64.iter().find(|(from, _)| *from == s) {
        return mapped.to_string();
    }
    let mut result = s.to_string();
    for (from, to) in FOLDERS_64 {
        if result.contains(from) {
            result = result.replace(from, to);
        }
    }
    result
}

/// Split a logical path into its components.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(['\\', '/']).filter(|s| !s.is_empty()).collect()
}

/// Every prefix of a logical path, longest first (`a\b\c`, `a\b`, `a`).
pub fn path_prefixes(path: &str) -> Vec<String> {
    let parts = split_path(path);
    (1..=parts.len())
        .rev()
        .map(|n| parts[..n].join("\\"))
        .collect()
}

pub fn sanitize_id(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
