//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. path does not exist), the path is made absolute relative
/// to CWD and `..`/`.` components are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

/// Resolve `.` and `..` without touching the filesystem.
pub fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// True when `path` lies strictly below `root` (equal paths do not count).
///
/// Comparison is syntactic so a browser root that has not been created yet
/// still classifies correctly. Components compare ASCII case-insensitively,
/// as the FAT card does.
pub fn is_strictly_under(path: &Path, root: &Path) -> bool {
    let path = normalize_syntactic(path);
    let root = normalize_syntactic(root);
    let mut inner = path.components();
    for want in root.components() {
        match inner.next() {
            Some(got) if got.as_os_str().eq_ignore_ascii_case(want.as_os_str()) => {}
            _ => return false,
        }
    }
    inner.next().is_some()
}

/// Parent of `path`, or `None` at the filesystem root.
pub fn parent_of(path: &Path) -> Option<PathBuf> {
    let normalized = normalize_syntactic(path);
    normalized
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_existing_path_canonically() {
        let cwd = env::current_dir().unwrap();
        let resolved = resolve_absolute_path(Path::new("."));
        assert_eq!(resolved, std::fs::canonicalize(&cwd).unwrap());
    }

    #[test]
    fn normalizes_nonexistent_path_syntactically() {
        let input = Path::new("/nonexistent/games/../saves");
        assert!(std::fs::canonicalize(input).is_err());
        assert_eq!(resolve_absolute_path(input), Path::new("/nonexistent/saves"));
    }

    #[test]
    fn handles_parent_at_root() {
        assert_eq!(normalize_syntactic(Path::new("/../foo")), Path::new("/foo"));
    }

    #[test]
    fn strictly_under_excludes_equal_and_siblings() {
        let root = Path::new("/media/fat/games/NES");
        assert!(is_strictly_under(Path::new("/media/fat/games/NES/USA"), root));
        assert!(!is_strictly_under(Path::new("/media/fat/games/NES"), root));
        assert!(!is_strictly_under(Path::new("/media/fat/games/NES/"), root));
        assert!(!is_strictly_under(Path::new("/media/fat/games/NESX"), root));
        assert!(!is_strictly_under(
            Path::new("/media/fat/games/NES/../SNES"),
            root
        ));
    }

    #[test]
    fn strictly_under_ignores_ascii_case() {
        let root = Path::new("/media/fat/games/NES");
        assert!(is_strictly_under(Path::new("/media/fat/Games/nes/USA"), root));
        assert!(!is_strictly_under(Path::new("/media/fat/GAMES/nes"), root));
        assert!(!is_strictly_under(Path::new("/media/fat/games/SNES/USA"), root));
    }

    #[test]
    fn parent_of_stops_at_root() {
        assert_eq!(
            parent_of(Path::new("/media/fat/games")),
            Some(PathBuf::from("/media/fat"))
        );
        assert_eq!(parent_of(Path::new("/")), None);
    }
}
