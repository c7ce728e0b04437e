//! Compile errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(
        "Custom action '{action}' is placed after the previous action, but it is the very first action in the sequence"
    )]
    PreviousActionUnavailable { action: String },

    #[error("Unrecognized entity type among project items: {0}")]
    UnrecognizedEntity(String),

    #[error(
        "Merge module '{module}' does not belong to any feature and the default feature '{default_feature}' is not present"
    )]
    MergeModuleWithoutFeature {
        module: String,
        default_feature: String,
    },

    #[error("License file must have 'rtf' file extension: {0} (set allow_non_rtf_license to override)")]
    LicenseNotRtf(String),

    #[error("{entity} references undeclared feature '{feature}'")]
    UnknownFeature { entity: String, feature: String },

    #[error("PropertyRef id must be set before compiling the project")]
    EmptyPropertyRef,

    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),

    #[error("WiX toolset binary not found: {0}")]
    ToolchainNotFound(PathBuf),

    #[error("Failed to read or write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompileError>;

impl CompileError {
    /// Configuration errors abort the compile and are never retried.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            CompileError::Io(_) | CompileError::ToolchainNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_entity() {
        let err = CompileError::PreviousActionUnavailable {
            action: "CheckLicense".into(),
        };
        assert!(err.to_string().contains("CheckLicense"));

        let err = CompileError::MergeModuleWithoutFeature {
            module: "CRT".into(),
            default_feature: "Complete".into(),
        };
        assert!(err.to_string().contains("CRT"));
        assert!(err.to_string().contains("Complete"));
    }

    #[test]
    fn test_is_configuration() {
        assert!(CompileError::EmptyPropertyRef.is_configuration());
        assert!(!CompileError::ToolchainNotFound(PathBuf::from("candle.exe")).is_configuration());
    }
}
