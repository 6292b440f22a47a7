use crate::app::cli::ConfigArgs;
use crate::app::models::{Manifest, MinifiedOptions, RuntimeConfig};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_PACKAGES_DIR: &str = "bower_components";

/// The `cInstall` block of bower.json, or the root of a .toml config.
#[derive(Deserialize, Debug, Default)]
struct InstallSection {
    #[serde(default)]
    folder: BTreeMap<String, String>,
    #[serde(default)]
    option: OptionSection,
    #[serde(default)]
    source: Manifest,
}

#[derive(Deserialize, Debug, Default)]
struct OptionSection {
    #[serde(default)]
    default: DefaultSection,
    #[serde(default)]
    min: MinSection,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct DefaultSection {
    folder: Option<String>,
    min_folder: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct MinSection {
    get: Option<bool>,
    rename_min: Option<bool>,
    ignore_ext: Option<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct BowerFile {
    #[serde(rename = "cInstall")]
    c_install: Option<InstallSection>,
}

fn defaults_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".config")
            .join("clean-bower")
            .join("defaults.toml")
    })
}

/// User-wide `folder` / `option` defaults. A missing file means no defaults.
fn load_defaults_file(path: Option<&Path>) -> Result<InstallSection> {
    let Some(path) = path else {
        return Ok(InstallSection::default());
    };
    if !path.exists() {
        return Ok(InstallSection::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read defaults at {}", path.display()))?;
    let parsed: InstallSection = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if !parsed.source.is_empty() {
        log::warn!(
            "Ignoring `source` in {}; libraries belong in the project config",
            path.display()
        );
    }
    Ok(parsed)
}

fn load_project_file(path: &Path) -> Result<InstallSection> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display())),
        Some("json") => {
            let bower: BowerFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            match bower.c_install {
                Some(section) => Ok(section),
                None => bail!("{} has no `cInstall` section", path.display()),
            }
        }
        _ => bail!(
            "Unsupported config format for {} (expected .json or .toml)",
            path.display()
        ),
    }
}

/// Project values win over user defaults; CLI flags win over both.
///
/// Relative directories are anchored at `cwd`, so every resolved path is absolute.
fn merge(
    args: &ConfigArgs,
    cwd: &Path,
    defaults: InstallSection,
    project: InstallSection,
) -> RuntimeConfig {
    let config_dir = args.config.parent().filter(|p| !p.as_os_str().is_empty());
    let source_directory = match (&args.source_dir, config_dir) {
        (Some(dir), _) => cwd.join(dir),
        (None, Some(parent)) => cwd.join(parent),
        (None, None) => cwd.to_path_buf(),
    };
    let packages_directory = source_directory.join(
        args.packages_dir
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_PACKAGES_DIR)),
    );

    let mut extension_folders = defaults.folder;
    extension_folders.extend(project.folder);

    let (user, proj) = (defaults.option, project.option);
    let ignored_extensions = proj
        .min
        .ignore_ext
        .or(user.min.ignore_ext)
        .unwrap_or_default()
        .into_iter()
        .map(|ext| ext.trim_start_matches('.').to_string())
        .collect();

    let minified = MinifiedOptions {
        ignored_extensions,
        prefer_minified: args
            .prefer_minified()
            .or(proj.min.get)
            .or(user.min.get)
            .unwrap_or(false),
        rename_to_minified: args.rename_min
            || proj.min.rename_min.or(user.min.rename_min).unwrap_or(false),
    };

    RuntimeConfig {
        source_directory,
        packages_directory,
        extension_folders,
        minified,
        default_folder: proj
            .default
            .folder
            .or(user.default.folder)
            .unwrap_or_default(),
        default_minified_folder: proj
            .default
            .min_folder
            .or(user.default.min_folder)
            .unwrap_or_default(),
        manifest: project.source,
    }
}

pub fn resolve_config(args: &ConfigArgs) -> Result<RuntimeConfig> {
    let defaults = load_defaults_file(defaults_path().as_deref())?;
    let project = load_project_file(&args.config)?;
    let cwd = env::current_dir().context("Failed to get current directory")?;
    let config = merge(args, &cwd, defaults, project);

    log::debug!(
        "Loaded {} libraries from {}; packages in {}",
        config.manifest.len(),
        args.config.display(),
        config.packages_directory.display()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn args(config: PathBuf) -> ConfigArgs {
        ConfigArgs {
            config,
            ..ConfigArgs::default()
        }
    }

    const BOWER: &str = r#"{
        "name": "site",
        "dependencies": { "bootstrap": "~3" },
        "cInstall": {
            "folder": { "js": "js/vendor/", "css": "css/" },
            "option": {
                "default": { "folder": "public/", "minFolder": "public/min/" },
                "min": { "get": true, "ignoreExt": [".map", "png"] }
            },
            "source": {
                "bootstrap#bs": { "dist/js/bootstrap.js": "bootstrap.js" },
                "jquery": { "dist/*.js": "*" }
            }
        }
    }"#;

    #[test]
    fn reads_c_install_from_bower_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bower.json", BOWER);

        let cfg = merge(
            &args(path.clone()),
            Path::new("/work"),
            InstallSection::default(),
            load_project_file(&path).unwrap(),
        );

        assert_eq!(cfg.source_directory, dir.path());
        assert_eq!(cfg.packages_directory, dir.path().join("bower_components"));
        assert_eq!(cfg.extension_folders["js"], "js/vendor/");
        assert_eq!(cfg.default_folder, "public/");
        assert_eq!(cfg.default_minified_folder, "public/min/");
        assert!(cfg.minified.prefer_minified);
        assert!(!cfg.minified.rename_to_minified);
        assert!(cfg.minified.ignored_extensions.contains("map"));
        assert!(cfg.minified.ignored_extensions.contains("png"));

        let libraries: Vec<&str> = cfg
            .manifest
            .entries()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(libraries, ["bootstrap#bs", "jquery"]);
    }

    #[test]
    fn reads_toml_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "install.toml",
            r#"
[folder]
js = "scripts"

[option.default]
folder = "vendor/"

[source.zeta]
"z.js" = "z.js"

[source.acme]
"a.js" = "a.js"
"#,
        );

        let cfg = merge(
            &args(path.clone()),
            Path::new("/work"),
            InstallSection::default(),
            load_project_file(&path).unwrap(),
        );
        assert_eq!(cfg.default_folder, "vendor/");
        assert_eq!(cfg.extension_folders["js"], "scripts");
        let libraries: Vec<&str> = cfg
            .manifest
            .entries()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(libraries, ["zeta", "acme"]);
    }

    #[test]
    fn missing_c_install_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bower.json", r#"{"name": "site"}"#);
        let err = load_project_file(&path).unwrap_err();
        assert!(err.to_string().contains("cInstall"));
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.yaml", "a: b");
        assert!(load_project_file(&path).is_err());
    }

    #[test]
    fn missing_defaults_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = load_defaults_file(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(defaults.folder.is_empty());
        assert!(load_defaults_file(None).unwrap().source.is_empty());
    }

    #[test]
    fn project_wins_over_defaults_and_cli_wins_over_both() {
        let dir = tempfile::tempdir().unwrap();
        let defaults_path = write(
            dir.path(),
            "defaults.toml",
            r#"
[folder]
js = "default-js"
css = "default-css"

[option.default]
folder = "from-defaults"
minFolder = "min-from-defaults"

[option.min]
get = false
renameMin = true
"#,
        );
        let project_path = write(
            dir.path(),
            "bower.json",
            r#"{"cInstall": {"folder": {"js": "project-js"}, "option": {"default": {"folder": "from-project"}}}}"#,
        );

        let mut cli = args(project_path.clone());
        cli.min = true;
        cli.source_dir = Some(PathBuf::from("/site"));
        cli.packages_dir = Some(PathBuf::from("deps"));

        let cfg = merge(
            &cli,
            Path::new("/work"),
            load_defaults_file(Some(&defaults_path)).unwrap(),
            load_project_file(&project_path).unwrap(),
        );

        assert_eq!(cfg.extension_folders["js"], "project-js");
        assert_eq!(cfg.extension_folders["css"], "default-css");
        assert_eq!(cfg.default_folder, "from-project");
        assert_eq!(cfg.default_minified_folder, "min-from-defaults");
        assert!(cfg.minified.prefer_minified);
        assert!(cfg.minified.rename_to_minified);
        assert_eq!(cfg.source_directory, PathBuf::from("/site"));
        assert_eq!(cfg.packages_directory, PathBuf::from("/site/deps"));
    }

    #[test]
    fn bare_config_name_uses_current_directory() {
        let cfg = merge(
            &args(PathBuf::from("bower.json")),
            Path::new("/work"),
            InstallSection::default(),
            InstallSection::default(),
        );
        assert_eq!(cfg.source_directory, PathBuf::from("/work"));
        assert_eq!(cfg.packages_directory, PathBuf::from("/work/bower_components"));
    }

    #[test]
    fn relative_directories_are_anchored_at_current_directory() {
        let nested = merge(
            &args(PathBuf::from("site/bower.json")),
            Path::new("/work"),
            InstallSection::default(),
            InstallSection::default(),
        );
        assert_eq!(nested.source_directory, PathBuf::from("/work/site"));

        let mut cli = args(PathBuf::from("bower.json"));
        cli.source_dir = Some(PathBuf::from("public"));
        let overridden = merge(
            &cli,
            Path::new("/work"),
            InstallSection::default(),
            InstallSection::default(),
        );
        assert_eq!(overridden.source_directory, PathBuf::from("/work/public"));
        assert_eq!(
            overridden.packages_directory,
            PathBuf::from("/work/public/bower_components")
        );
    }
}
