//! wix-tree - declarative project tree to WiX source compiler
//!
//! Describe an installer as a tree of directories, files, registry values,
//! custom actions and features, in code or in a YAML/JSON manifest, and get
//! a complete WiX source document back.
//!
//! # Example
//!
//! ```
//! use wix_tree::model::{Dir, File, Project};
//! use wix_tree::Compiler;
//!
//! let project = Project::new("MyApp")
//!     .dir(Dir::new(r"%ProgramFiles%\My Company\My App").file(File::new("MyApp.exe")));
//!
//! let output = Compiler::default().compile(&project).unwrap();
//! assert!(output.to_wxs().contains("<Product"));
//! assert_eq!(output.auto_assigned_install_dir.as_deref(), Some(r"%ProgramFiles%\My Company\My App"));
//! ```

pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod folders;
pub mod guid;
pub mod manifest;
pub mod model;
pub mod toolchain;
pub mod writer;

pub use compiler::{BuildArtifact, CompileOutput, Compiler, PackagingRequest, WixExtension};
pub use config::{CompilerOptions, OutputType};
pub use document::{Document, Element};
pub use error::{CompileError, Result};
pub use model::Project;
pub use toolchain::{BuildPlan, Toolchain};
