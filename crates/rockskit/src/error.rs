//! Error types for LuaRocks operations.
//!
//! Every per-action failure inside a sync run is caught at the point of
//! use and accumulated; only the run-level outcome escapes to the
//! caller. These types carry enough context (action, rock name, raw
//! stderr) for the accumulated reports to stand on their own.

use thiserror::Error;

/// Errors that can occur during LuaRocks operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The luarocks binary could not be spawned at all.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Binary that could not be started
        program: String,
        /// OS-level diagnostic
        message: String,
    },

    /// luarocks ran but exited non-zero.
    #[error("{action} failed for {name}: {stderr}")]
    Tool {
        /// What was being attempted ("install", "remove", "list", ...)
        action: &'static str,
        /// Rock the action targeted
        name: String,
        /// Raw stderr from luarocks
        stderr: String,
    },

    /// A version string could not be resolved or compared.
    #[error("cannot parse version {version:?} for {name}")]
    Parse {
        /// Rock the version belongs to
        name: String,
        /// The offending version string
        version: String,
    },

    /// A recursive removal left some rocks behind.
    #[error("removal of {name} was incomplete: {failed:?} could not be removed")]
    PartialRemoval {
        /// Root rock the removal started from
        name: String,
        /// Rocks whose direct removal step failed
        failed: Vec<String>,
    },

    /// Output from luarocks did not match the expected shape.
    #[error("unexpected luarocks output for {name}: {message}")]
    Output {
        /// Rock the command targeted
        name: String,
        /// What was wrong with the output
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Tool`] from raw command output.
    pub fn tool(action: &'static str, name: impl Into<String>, stderr: &str) -> Self {
        Error::Tool {
            action,
            name: name.into(),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for LuaRocks operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_trims_stderr() {
        let err = Error::tool("install", "cjson", "\nError: no results\n");
        match err {
            Error::Tool { stderr, .. } => assert_eq!(stderr, "Error: no results"),
            _ => panic!("expected Tool error"),
        }
    }

    #[test]
    fn test_partial_removal_display() {
        let err = Error::PartialRemoval {
            name: "neotest".to_string(),
            failed: vec!["nio".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("neotest"));
        assert!(msg.contains("nio"));
    }
}
