use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PipelineParseError,
    PipelineNotFound,
    WorkspaceNotFound,

    ValidationInvalidArgument,

    ConfigInvalidJson,
    ConfigInvalidValue,

    ToolNotFound,
    ToolCommandFailed,

    InstallReleaseFetchFailed,
    InstallDownloadFailed,
    InstallExtractFailed,

    GitHookNoRepository,
    GitHookForeignHook,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PipelineParseError => "pipeline.parse_error",
            ErrorCode::PipelineNotFound => "pipeline.not_found",
            ErrorCode::WorkspaceNotFound => "workspace.not_found",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ToolNotFound => "tool.not_found",
            ErrorCode::ToolCommandFailed => "tool.command_failed",

            ErrorCode::InstallReleaseFetchFailed => "install.release_fetch_failed",
            ErrorCode::InstallDownloadFailed => "install.download_failed",
            ErrorCode::InstallExtractFailed => "install.extract_failed",

            ErrorCode::GitHookNoRepository => "githook.no_repository",
            ErrorCode::GitHookForeignHook => "githook.foreign_hook",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineNotFoundDetails {
    pub pattern: String,
    pub searched_root: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn pipeline_parse(error: impl Into<String>, file: Option<String>) -> Self {
        let details = serde_json::to_value(ParseErrorDetails {
            error: error.into(),
            file,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::PipelineParseError,
            "Pipeline YAML is not valid",
            details,
        )
    }

    pub fn pipeline_not_found(pattern: impl Into<String>, searched_root: impl Into<String>) -> Self {
        let details = serde_json::to_value(PipelineNotFoundDetails {
            pattern: pattern.into(),
            searched_root: searched_root.into(),
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::PipelineNotFound,
            "No pipeline file found in the workspace",
            details,
        )
        .with_hint("Run 'wingman init' to create a default .drone.yml")
    }

    pub fn workspace_not_found(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::WorkspaceNotFound,
            message,
            Value::Object(serde_json::Map::new()),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        let details = serde_json::to_value(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            value,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = serde_json::json!({
            "path": path.into(),
            "error": err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in settings file",
            details,
        )
    }

    pub fn config_invalid_value(key: impl Into<String>, problem: impl Into<String>) -> Self {
        let details = serde_json::json!({
            "key": key.into(),
            "problem": problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let details = serde_json::json!({ "tool": tool });
        Self::new(
            ErrorCode::ToolNotFound,
            format!("'{}' binary could not be located", tool),
            details,
        )
        .with_hint("Run 'wingman install' to download the drone cli")
        .with_hint("Or set the tool path: wingman config set tool-path /path/to/drone")
    }

    pub fn tool_command_failed(details: ToolCommandFailedDetails) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(ErrorCode::ToolCommandFailed, "Tool invocation failed", details)
    }

    pub fn install_release_fetch_failed(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InstallReleaseFetchFailed,
            "Could not determine the latest drone cli release",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn install_download_failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InstallDownloadFailed,
            "Downloading the drone cli failed",
            serde_json::json!({ "url": url.into(), "error": error.into() }),
        )
    }

    pub fn install_extract_failed(archive: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InstallExtractFailed,
            "Extracting the drone cli archive failed",
            serde_json::json!({ "archive": archive.into(), "error": error.into() }),
        )
    }

    pub fn git_hook_no_repository(root: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GitHookNoRepository,
            "Workspace root is not a git repository",
            serde_json::json!({ "root": root.into() }),
        )
        .with_hint("Initialize one with 'git init' to run pipelines on commit")
    }

    pub fn git_hook_foreign_hook(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::GitHookForeignHook,
            "A post-commit hook not managed by wingman already exists",
            serde_json::json!({ "path": path.into() }),
        )
        .with_hint("Remove or merge the existing hook manually, then retry")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::to_value(InternalIoErrorDetails {
            error: error.into(),
            context,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": error.into(),
            "context": context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
