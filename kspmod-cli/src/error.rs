//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use kspmod::config::ConfigFileError;
use kspmod::installer::InstallError;
use kspmod::queue::ResolveError;
use kspmod::session::SessionError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// A session operation failed
    Session(SessionError),
    /// The user asked for something that does not exist
    NotFound(String),
    /// The user interrupted the operation
    Interrupted,
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'kspmod config path' to locate the configuration file.");
                eprintln!("At minimum, [game] install_root must point at your KSP directory.");
            }
            CliError::Session(SessionError::Resolve(ResolveError::ConflictDetected { .. })) => {
                eprintln!();
                eprintln!("Remove the conflicting mod first, or pick a different one.");
            }
            CliError::Session(SessionError::Install(InstallError::BatchFailed { .. })) => {
                eprintln!();
                eprintln!("Mods installed before the failure were kept.");
                eprintln!("Run 'kspmod list' to see the current state.");
            }
            _ => {}
        }

        let code = match self {
            CliError::Interrupted => 130,
            _ => 1,
        };
        process::exit(code)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Session(e) => write!(f, "{}", e),
            CliError::NotFound(msg) => write!(f, "{}", msg),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Session(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<SessionError> for CliError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Config(inner) => CliError::Config(inner.to_string()),
            SessionError::Install(ref inner) if inner.is_cancelled() => CliError::Interrupted,
            other => CliError::Session(other),
        }
    }
}
