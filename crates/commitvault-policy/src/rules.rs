//! Per-path structure and naming rules.
//!
//! ```text
//! README.md | .gitignore | config.toml
//! src/
//!   projects/
//!     <title>-<artists>-<feat>-<NN>bpm-prodby.<producer>/
//!       <folder>.<flp|rpp|song|project|cpr|ptx|logicx|als>
//!       exports/
//!         <folder>-<status>.<mp3|wav|flac>
//!   <anything else>/...      (not checked)
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Files allowed at the repository root.
pub const ALLOWED_ROOT_FILES: &[&str] = &["README.md", ".gitignore", "config.toml"];

/// Project file extensions (matched case-insensitively).
pub const PROJECT_EXTENSIONS: &[&str] = &["flp", "rpp", "song", "project", "cpr", "ptx", "logicx", "als"];

/// Export file extensions (matched case-insensitively).
pub const EXPORT_EXTENSIONS: &[&str] = &["mp3", "wav", "flac"];

/// Mix/master stages allowed as the export status suffix.
pub const EXPORT_STATUSES: &[&str] = &[
    "progress",
    "unmixed",
    "rough",
    "mixed",
    "finalmix",
    "roughmaster",
    "mastered",
    "finalmaster",
];

static PROJECT_FOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([a-zA-Z0-9_.,-]+)-([a-zA-Z0-9_.,-]+(?:,[a-zA-Z0-9_.,-]+)*)-([a-zA-Z0-9_.,-]+)-([0-9]{2,3})bpm-prodby\.([a-zA-Z0-9_.,-]+)$",
    )
    .expect("project folder regex")
});

static EXPORT_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)-([^-]+)$").expect("export name regex"));

/// Whether `name` is a valid project folder name.
pub fn is_project_folder(name: &str) -> bool {
    PROJECT_FOLDER_REGEX.is_match(name)
}

/// Split `name` at its last dot: `("song", ".flp")`. No dot gives an empty extension.
fn split_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) => (&name[..i], &name[i..]),
        None => (name, ""),
    }
}

fn has_extension(name: &str, allowed: &[&str]) -> bool {
    let (_, ext) = split_ext(name);
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    !ext.is_empty() && allowed.contains(&ext.as_str())
}

/// Every violation for one changed path, in rule order. Empty means the path is fine.
pub fn check_path(file: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if file.contains(' ') {
        errors.push(format!("Path contains spaces: '{}'", file));
    }

    let path = file.replace('\\', "/");
    let parts: Vec<&str> = path.split('/').collect();

    if parts.len() == 1 {
        if !ALLOWED_ROOT_FILES.contains(&parts[0]) {
            errors.push(format!("Unexpected file in root directory: '{}'", file));
        }
        return errors;
    }

    if parts[0] != "src" {
        errors.push(format!(
            "Unexpected top-level file or directory: '{}'. Only 'src/', 'README.md', 'config.toml', '.gitignore' allowed.",
            file
        ));
        return errors;
    }

    if parts[1] != "projects" {
        // src/<other>/... is not checked
        return errors;
    }

    let Some(folder) = parts.get(2).copied() else {
        errors.push(format!(
            "Files are not allowed directly inside 'src/projects/'. Place them in a named project folder: '{}'",
            file
        ));
        return errors;
    };

    if !is_project_folder(folder) {
        errors.push(format!(
            "Invalid project folder name format: '{}' in path '{}'",
            folder, file
        ));
        return errors;
    }

    let inside = &parts[3..];
    match inside {
        [] | [""] => {}
        [name] => check_project_file(folder, name, file, &mut errors),
        ["exports", rest @ ..] => {
            if let Some(name) = rest.last().filter(|n| !n.is_empty()) {
                check_export_file(folder, name, file, &mut errors);
            }
        }
        _ => errors.push(format!(
            "Unexpected file or directory inside project folder: '{}' in path '{}'. Only project file and 'exports/' dir allowed directly under '{}/'",
            inside.join("/"),
            file,
            folder
        )),
    }

    errors
}

fn check_project_file(folder: &str, name: &str, file: &str, errors: &mut Vec<String>) {
    let (stem, _) = split_ext(name);
    if stem != folder {
        errors.push(format!(
            "Project filename base must match folder name. Expected '{}.*', found '{}' in path '{}'",
            folder, name, file
        ));
    }
    if !has_extension(name, PROJECT_EXTENSIONS) {
        errors.push(format!(
            "Invalid file extension for project file '{}'. Allowed: {}. Path: '{}'",
            name,
            dotted(PROJECT_EXTENSIONS),
            file
        ));
    }
}

fn check_export_file(folder: &str, name: &str, file: &str, errors: &mut Vec<String>) {
    let (stem, _) = split_ext(name);
    match EXPORT_NAME_REGEX.captures(stem) {
        Some(caps) => {
            let base = caps.get(1).map_or("", |m| m.as_str());
            let status = caps.get(2).map_or("", |m| m.as_str());
            if base != folder {
                errors.push(format!(
                    "Export filename base must match project folder name. Expected '{}-[status].*', found '{}' in path '{}'",
                    folder, name, file
                ));
            }
            if !EXPORT_STATUSES.contains(&status) {
                errors.push(format!(
                    "Invalid status identifier '{}' in export filename '{}'. Allowed: {}. Path: '{}'",
                    status,
                    name,
                    EXPORT_STATUSES.join(", "),
                    file
                ));
            }
        }
        None => errors.push(format!(
            "Export filename '{}' does not match expected format '[project_base]-[status]'. Path: '{}'",
            name, file
        )),
    }

    if !has_extension(name, EXPORT_EXTENSIONS) {
        errors.push(format!(
            "Invalid file extension for export file '{}'. Allowed: {}. Path: '{}'",
            name,
            dotted(EXPORT_EXTENSIONS),
            file
        ));
    }
}

fn dotted(exts: &[&str]) -> String {
    exts.iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOLDER: &str = "song-artist-feat-x-120bpm-prodby.me";

    #[test]
    fn test_project_folder_pattern() {
        assert!(is_project_folder(FOLDER));
        assert!(is_project_folder("night_drive-ana,bo-none-95bpm-prodby.k.j"));
        assert!(!is_project_folder("song-artist-120bpm-prodby.me"));
        assert!(!is_project_folder("song-artist-feat-x-1200bpm-prodby.me"));
        assert!(!is_project_folder("song-artist-feat-x-120bpm-prodby_me"));
        assert!(!is_project_folder("my song-artist-feat-x-120bpm-prodby.me"));
    }

    #[test]
    fn test_root_files() {
        assert!(check_path("README.md").is_empty());
        assert!(check_path(".gitignore").is_empty());
        assert!(check_path("config.toml").is_empty());
        assert_eq!(
            check_path("notes.txt"),
            vec!["Unexpected file in root directory: 'notes.txt'"]
        );
    }

    #[test]
    fn test_spaces_and_root_errors_accumulate() {
        let errors = check_path("weird name.flp");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], "Path contains spaces: 'weird name.flp'");
        assert!(errors[1].starts_with("Unexpected file in root directory"));
    }

    #[test]
    fn test_top_level_directories() {
        assert!(check_path("src/samples/kick.wav").is_empty());
        assert!(check_path("src/readme.txt").is_empty());
        assert!(check_path("docs/guide.md")[0].starts_with("Unexpected top-level"));
        assert!(check_path("SRC/projects/x")[0].starts_with("Unexpected top-level"));
    }

    #[test]
    fn test_project_file_rules() {
        assert!(check_path(&format!("src/projects/{0}/{0}.flp", FOLDER)).is_empty());
        assert!(check_path(&format!("src/projects/{0}/{0}.ALS", FOLDER)).is_empty());

        let errors = check_path(&format!("src/projects/{0}/other.flp", FOLDER));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Project filename base must match folder name"));

        let errors = check_path(&format!("src/projects/{0}/{0}.mp3", FOLDER));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid file extension for project file"));
    }

    #[test]
    fn test_export_rules() {
        assert!(check_path(&format!("src/projects/{0}/exports/{0}-mixed.wav", FOLDER)).is_empty());
        assert!(check_path(&format!("src/projects/{0}/exports/{0}-finalmaster.FLAC", FOLDER)).is_empty());

        let errors = check_path(&format!("src/projects/{0}/exports/{0}-loud.wav", FOLDER));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid status identifier 'loud'"));

        let errors = check_path(&format!("src/projects/{0}/exports/other-mixed.ogg", FOLDER));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Export filename base must match"));
        assert!(errors[1].starts_with("Invalid file extension for export file"));

        let errors = check_path(&format!("src/projects/{0}/exports/nodash.wav", FOLDER));
        assert!(errors[0].contains("does not match expected format"));
    }

    #[test]
    fn test_project_folder_layout() {
        let errors = check_path("src/projects/loose.flp");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid project folder name format: 'loose.flp'"));

        assert!(check_path("src/projects")[0].starts_with("Files are not allowed directly inside"));

        let errors = check_path(&format!("src/projects/{0}/stems/kick.wav", FOLDER));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Unexpected file or directory inside project folder: 'stems/kick.wav'"));

        let errors = check_path(&format!("src/projects/{0}/Exports/{0}-mixed.wav", FOLDER));
        assert!(errors[0].starts_with("Unexpected file or directory inside project folder"));
    }
}
