//! CLI response formatting and output.
//!
//! Provides the JSON envelope, printing, and exit code mapping.

use serde::Serialize;

use crate::error::{Error, ErrorCode, Hint, Result};

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) {
    use std::io::{self, Write};

    let payload = match response.to_json() {
        Ok(p) => p,
        Err(_) => return,
    };
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Exit gracefully on SIGPIPE
    let _ = writeln!(handle, "{}", payload);
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::PipelineParseError
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue => 2,

        ErrorCode::PipelineNotFound
        | ErrorCode::WorkspaceNotFound
        | ErrorCode::ToolNotFound => 4,

        ErrorCode::ToolCommandFailed
        | ErrorCode::InstallReleaseFetchFailed
        | ErrorCode::InstallDownloadFailed
        | ErrorCode::InstallExtractFailed
        | ErrorCode::GitHookNoRepository
        | ErrorCode::GitHookForeignHook => 20,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

/// Print a command result as the JSON envelope and map it to a process
/// exit code.
pub fn finish<T: Serialize>(result: Result<T>) -> std::process::ExitCode {
    match result {
        Ok(data) => {
            print_response(&CliResponse::success(data));
            std::process::ExitCode::SUCCESS
        }
        Err(err) => {
            let code = exit_code_for_error(err.code);
            print_response(&CliResponse::<()>::from_error(&err));
            std::process::ExitCode::from(exit_code_to_u8(code))
        }
    }
}

pub fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_has_data_no_error() {
        let response = CliResponse::success(serde_json::json!({ "steps": ["a"] }));
        let json = response.to_json().unwrap();
        assert!(json.contains("\"success\": true"));
        assert!(json.contains("\"steps\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn error_envelope_carries_code_and_hints() {
        let err = Error::pipeline_not_found("**/.drone.yml", "/tmp/ws");
        let json = CliResponse::<()>::from_error(&err).to_json().unwrap();
        assert!(json.contains("\"success\": false"));
        assert!(json.contains("\"code\": \"pipeline.not_found\""));
        assert!(json.contains("wingman init"));
    }

    #[test]
    fn error_codes_map_to_exit_codes() {
        assert_eq!(exit_code_for_error(ErrorCode::PipelineParseError), 2);
        assert_eq!(exit_code_for_error(ErrorCode::PipelineNotFound), 4);
        assert_eq!(exit_code_for_error(ErrorCode::ToolNotFound), 4);
        assert_eq!(exit_code_for_error(ErrorCode::InstallDownloadFailed), 20);
        assert_eq!(exit_code_for_error(ErrorCode::InternalIoError), 1);
    }

    #[test]
    fn exit_codes_clamp_to_u8() {
        assert_eq!(exit_code_to_u8(-1), 0);
        assert_eq!(exit_code_to_u8(0), 0);
        assert_eq!(exit_code_to_u8(20), 20);
        assert_eq!(exit_code_to_u8(300), 255);
    }
}
