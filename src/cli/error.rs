// Error handling utilities for consistent error messages and exit codes

use std::process;
use crate::directory::DirectoryError;
use crate::models::Stage;
use crate::store::StoreError;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing negotiations, rejected moves.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Whether an error reflects a storage failure rather than bad input
pub fn is_internal(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if cause.downcast_ref::<rusqlite::Error>().is_some() {
            return true;
        }
        let directory = cause.downcast_ref::<DirectoryError>().or_else(|| {
            match cause.downcast_ref::<StoreError>() {
                Some(StoreError::Directory(inner)) => Some(inner),
                _ => None,
            }
        });
        matches!(directory, Some(DirectoryError::Server(_) | DirectoryError::Transport(_)))
    })
}

/// Validate that a negotiation ID is a positive integer
pub fn validate_negotiation_id(id_str: &str) -> Result<i64, String> {
    id_str.parse::<i64>()
        .map_err(|_| format!("Invalid negotiation ID: '{}'. Negotiation ID must be a number.", id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid negotiation ID: {}. Negotiation ID must be positive.", id))
            }
        })
}

/// Resolve a stage name typed by the user
pub fn parse_stage_arg(input: &str) -> Result<Stage, String> {
    if let Some(stage) = Stage::parse(input) {
        return Ok(stage);
    }
    match Stage::suggest(input) {
        Some(close) => Err(format!("Unknown stage: '{}'. Did you mean '{}'?", input, close.as_str())),
        None => Err(format!("Unknown stage: '{}'. Run 'negocia stages' to list stages.", input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_negotiation_id() {
        assert_eq!(validate_negotiation_id("12"), Ok(12));
        assert!(validate_negotiation_id("0").is_err());
        assert!(validate_negotiation_id("-3").is_err());
        assert!(validate_negotiation_id("abc").unwrap_err().contains("must be a number"));
    }

    #[test]
    fn test_parse_stage_arg() {
        assert_eq!(parse_stage_arg("qualificado"), Ok(Stage::Qualificado));
        assert_eq!(parse_stage_arg("visita agendada"), Ok(Stage::VisitaAgendada));

        let err = parse_stage_arg("QUALIFICDO").unwrap_err();
        assert!(err.contains("Did you mean 'QUALIFICADO'?"));

        let err = parse_stage_arg("zzzzzzzzzzzzzz").unwrap_err();
        assert!(err.contains("negocia stages"));
    }

    #[test]
    fn test_is_internal() {
        let server: anyhow::Error = DirectoryError::Server("disk I/O error".into()).into();
        assert!(is_internal(&server));

        let wrapped: anyhow::Error = StoreError::Directory(DirectoryError::Server("locked".into())).into();
        assert!(is_internal(&wrapped.context("Failed to load board")));

        let validation: anyhow::Error = DirectoryError::Validation("lead name is required".into()).into();
        assert!(!is_internal(&validation));

        assert!(!is_internal(&anyhow::anyhow!("Negotiation 4 not found")));
    }
}
