use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::AppPaths;

use super::types::{ContentDiscoveryError, ContentRequest};

pub(crate) const BASE_MOD_ID: &str = "base";

/// One content root in load order, with its XML files already listed.
#[derive(Debug, Clone)]
pub(crate) struct ModSource {
    pub mod_id: String,
    pub xml_files: Vec<PathBuf>,
}

/// Base content first, then the enabled mods in request order. A missing
/// base dir contributes no files; a missing enabled mod is an error.
pub(crate) fn plan_mod_sources(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<Vec<ModSource>, ContentDiscoveryError> {
    let mut sources = vec![ModSource {
        mod_id: BASE_MOD_ID.to_string(),
        xml_files: list_xml_files(BASE_MOD_ID, &app_paths.base_content_dir)?,
    }];

    let mut seen = HashSet::<&str>::new();
    for mod_id in request.enabled_mods.iter().map(|id| id.trim()) {
        if mod_id.is_empty() {
            return Err(ContentDiscoveryError::EmptyEnabledMod);
        }
        if mod_id == BASE_MOD_ID {
            return Err(ContentDiscoveryError::ReservedModId {
                mod_id: mod_id.to_string(),
            });
        }
        if !seen.insert(mod_id) {
            return Err(ContentDiscoveryError::DuplicateEnabledMod {
                mod_id: mod_id.to_string(),
            });
        }

        let mod_dir = app_paths.mods_dir.join(mod_id);
        if !mod_dir.is_dir() {
            return Err(ContentDiscoveryError::EnabledModMissing {
                mod_id: mod_id.to_string(),
                expected_dir: mod_dir,
            });
        }
        sources.push(ModSource {
            mod_id: mod_id.to_string(),
            xml_files: list_xml_files(mod_id, &mod_dir)?,
        });
    }

    Ok(sources)
}

/// Every `.xml` file under `root`, sorted by `/`-joined relative path so the
/// order does not depend on the platform or directory iteration.
fn list_xml_files(mod_id: &str, root: &Path) -> Result<Vec<PathBuf>, ContentDiscoveryError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let read_dir_error = |source: std::io::Error| ContentDiscoveryError::ReadDir {
            mod_id: mod_id.to_string(),
            path: dir.clone(),
            source,
        };
        for entry in fs::read_dir(&dir).map_err(read_dir_error)? {
            let path = entry.map_err(read_dir_error)?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_xml(&path) {
                files.push(path);
            }
        }
    }
    files.sort_by_cached_key(|path| sort_key(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn sort_key(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, "<Defs/>").expect("write");
    }

    fn mod_ids(sources: &[ModSource]) -> Vec<&str> {
        sources.iter().map(|source| source.mod_id.as_str()).collect()
    }

    #[test]
    fn base_is_first_then_enabled_order() {
        let temp = TempDir::new().expect("tempdir");
        let app_paths = AppPaths::from_root(temp.path().to_path_buf());
        fs::create_dir_all(app_paths.mods_dir.join("b")).expect("create mod b");
        fs::create_dir_all(app_paths.mods_dir.join("a")).expect("create mod a");
        let request = ContentRequest {
            enabled_mods: vec!["b".to_string(), " a ".to_string()],
        };

        let sources = plan_mod_sources(&app_paths, &request).expect("plan");
        assert_eq!(mod_ids(&sources), vec!["base", "b", "a"]);
        assert!(sources[0].xml_files.is_empty());
    }

    #[test]
    fn xml_files_are_recursive_and_sorted_by_relative_path() {
        let temp = TempDir::new().expect("tempdir");
        let app_paths = AppPaths::from_root(temp.path().to_path_buf());
        let base = &app_paths.base_content_dir;
        touch(&base.join("tools").join("shovel.xml"));
        touch(&base.join("b.XML"));
        touch(&base.join("a.xml"));
        touch(&base.join("notes.txt"));

        let sources = plan_mod_sources(&app_paths, &ContentRequest::default()).expect("plan");
        let relative: Vec<_> = sources[0]
            .xml_files
            .iter()
            .map(|path| sort_key(path.strip_prefix(base).expect("under base")))
            .collect();
        assert_eq!(relative, vec!["a.xml", "b.XML", "tools/shovel.xml"]);
    }

    #[test]
    fn bad_enabled_mod_ids_are_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let app_paths = AppPaths::from_root(temp.path().to_path_buf());
        fs::create_dir_all(app_paths.mods_dir.join("a")).expect("create mod a");
        let plan = |ids: &[&str]| {
            plan_mod_sources(
                &app_paths,
                &ContentRequest {
                    enabled_mods: ids.iter().map(ToString::to_string).collect(),
                },
            )
        };

        assert!(matches!(
            plan(&["nope"]),
            Err(ContentDiscoveryError::EnabledModMissing { .. })
        ));
        assert!(matches!(
            plan(&["a", " a "]),
            Err(ContentDiscoveryError::DuplicateEnabledMod { .. })
        ));
        assert!(matches!(
            plan(&["  "]),
            Err(ContentDiscoveryError::EmptyEnabledMod)
        ));
        assert!(matches!(
            plan(&["base"]),
            Err(ContentDiscoveryError::ReservedModId { .. })
        ));
    }
}
