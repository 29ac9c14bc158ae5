pub mod response;

pub use response::{exit_code_for_error, exit_code_to_u8, finish, CliError, CliResponse};
