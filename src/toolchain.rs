//! External toolchain boundary
//!
//! Describes the two stages that turn a written source document into a
//! package: `candle.exe` compiles it to an object file and `light.exe` links
//! that into the `.msi` or `.msm`. Nothing here runs a process; callers get
//! the program paths and argument vectors.

use crate::compiler::WixExtension;
use crate::config::CompilerOptions;
use crate::error::{CompileError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const CANDLE: &str = "candle.exe";
const LIGHT: &str = "light.exe";

/// Location of the compile and link binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub candle: PathBuf,
    pub light: PathBuf,
}

impl Toolchain {
    /// Binaries inside `dir`, without checking that they exist
    pub fn at(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            candle: dir.join(CANDLE),
            light: dir.join(LIGHT),
        }
    }

    /// Bare program names, resolved by the shell at run time
    pub fn unresolved() -> Self {
        Self {
            candle: PathBuf::from(CANDLE),
            light: PathBuf::from(LIGHT),
        }
    }

    /// Find the binaries in the configured location, or on `PATH` when no
    /// location is configured
    pub fn locate(options: &CompilerOptions) -> Result<Self> {
        match options.resolved_wix_location() {
            Some(dir) => {
                let toolchain = Self::at(&dir);
                for binary in [&toolchain.candle, &toolchain.light] {
                    if !binary.is_file() {
                        return Err(CompileError::ToolchainNotFound(binary.clone()));
                    }
                }
                debug!("Using toolchain in {}", dir.display());
                Ok(toolchain)
            }
            None => {
                let candle = which::which("candle")
                    .map_err(|_| CompileError::ToolchainNotFound(PathBuf::from(CANDLE)))?;
                let light = which::which("light")
                    .map_err(|_| CompileError::ToolchainNotFound(PathBuf::from(LIGHT)))?;
                Ok(Self { candle, light })
            }
        }
    }
}

/// One program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub program: PathBuf,
    pub args: Vec<String>,
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program.to_string_lossy()))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Compile and link commands for one source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub compile: Stage,
    pub link: Stage,
    /// Final package
    pub package: PathBuf,
    /// Files produced on the way, removed after a successful link
    pub intermediates: Vec<PathBuf>,
}

impl BuildPlan {
    pub fn new(
        toolchain: &Toolchain,
        options: &CompilerOptions,
        wxs: &Path,
        extensions: &BTreeSet<WixExtension>,
        culture: &str,
    ) -> Self {
        let object = wxs.with_extension("wixobj");
        let package = wxs.with_extension(options.output_type.extension());

        let ext_args: Vec<String> = extensions
            .iter()
            .flat_map(|ext| ["-ext".to_string(), ext.dll().to_string()])
            .collect();

        let mut compile_args: Vec<String> = options.candle_options.split_whitespace().map(String::from).collect();
        compile_args.extend(ext_args.iter().cloned());
        compile_args.push(wxs.to_string_lossy().into_owned());
        compile_args.push("-out".to_string());
        compile_args.push(object.to_string_lossy().into_owned());

        let mut link_args: Vec<String> = options.light_options.split_whitespace().map(String::from).collect();
        link_args.push(object.to_string_lossy().into_owned());
        link_args.push("-out".to_string());
        link_args.push(package.to_string_lossy().into_owned());
        link_args.extend(ext_args);
        link_args.push(format!("-cultures:{}", culture));

        Self {
            compile: Stage {
                program: toolchain.candle.clone(),
                args: compile_args,
            },
            link: Stage {
                program: toolchain.light.clone(),
                args: link_args,
            },
            package,
            intermediates: vec![object, wxs.with_extension("wixpdb")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputType;
    use std::fs;
    use tempfile::TempDir;

    fn plan(options: &CompilerOptions, extensions: &[WixExtension]) -> BuildPlan {
        BuildPlan::new(
            &Toolchain::at("wix"),
            options,
            Path::new("out/MyApp.wxs"),
            &extensions.iter().copied().collect(),
            "en-US",
        )
    }

    #[test]
    fn test_compile_stage() {
        let plan = plan(&CompilerOptions::default(), &[WixExtension::Util]);
        assert_eq!(plan.compile.program, Path::new("wix").join("candle.exe"));
        assert_eq!(
            plan.compile.args,
            vec!["-sw1026", "-ext", "WixUtilExtension.dll", "out/MyApp.wxs", "-out", "out/MyApp.wixobj"]
        );
    }

    #[test]
    fn test_link_stage() {
        let plan = plan(&CompilerOptions::default(), &[WixExtension::UI]);
        assert_eq!(
            plan.link.args,
            vec![
                "-sw1076",
                "-sw1079",
                "out/MyApp.wixobj",
                "-out",
                "out/MyApp.msi",
                "-ext",
                "WixUIExtension.dll",
                "-cultures:en-US"
            ]
        );
        assert_eq!(plan.intermediates.len(), 2);
    }

    #[test]
    fn test_module_package_extension() {
        let options = CompilerOptions {
            output_type: OutputType::Msm,
            ..CompilerOptions::default()
        };
        assert_eq!(plan(&options, &[]).package, Path::new("out/MyApp.msm"));
    }

    #[test]
    fn test_stage_display_quotes_spaces() {
        let stage = Stage {
            program: PathBuf::from("candle.exe"),
            args: vec!["-out".into(), "My App.wixobj".into()],
        };
        assert_eq!(stage.to_string(), "candle.exe -out \"My App.wixobj\"");
    }

    #[test]
    fn test_locate_missing_binaries() {
        let temp = TempDir::new().unwrap();
        let options = CompilerOptions {
            wix_location: Some(temp.path().to_path_buf()),
            ..CompilerOptions::default()
        };
        // the environment override would bypass the configured location
        if std::env::var_os(crate::config::WIX_LOCATION_ENV).is_some() {
            return;
        }
        let err = Toolchain::locate(&options).unwrap_err();
        assert!(matches!(err, CompileError::ToolchainNotFound(path) if path.ends_with("candle.exe")));

        fs::write(temp.path().join("candle.exe"), "").unwrap();
        fs::write(temp.path().join("light.exe"), "").unwrap();
        let toolchain = Toolchain::locate(&options).unwrap();
        assert_eq!(toolchain.light, temp.path().join("light.exe"));
    }
}
