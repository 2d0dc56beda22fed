use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::error::AppError;

/// Converts a Diesel error into the matching `AppError` variant.
///
/// Unique violations on `cron_jobs.function_name` become `Duplicate`; rows
/// that vanish become `NotFound`; everything else is an opaque database
/// failure tagged with `operation`.
pub fn convert_diesel_error(error: DieselError, operation: &str) -> AppError {
    match error {
        DieselError::NotFound => AppError::NotFound {
            entity: "resource".to_string(),
            field: "id".to_string(),
            value: "unknown".to_string(),
        },
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let field = info
                .column_name()
                .map(str::to_string)
                .or_else(|| unique_field_from_constraint(info.constraint_name()))
                .unwrap_or_else(|| "unknown".to_string());
            AppError::Duplicate {
                entity: info.table_name().unwrap_or("resource").to_string(),
                field,
                value: info.details().unwrap_or_default().to_string(),
            }
        }
        DieselError::DatabaseError(kind, info) => AppError::Database {
            operation: operation.to_string(),
            source: anyhow::anyhow!("{:?}: {}", kind, info.message()),
        },
        other => AppError::Database {
            operation: operation.to_string(),
            source: anyhow::Error::from(other),
        },
    }
}

/// Postgres names unique constraints `{table}_{column}_key`.
fn unique_field_from_constraint(constraint: Option<&str>) -> Option<String> {
    let name = constraint?.strip_suffix("_key")?;
    name.strip_prefix("cron_jobs_").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = convert_diesel_error(DieselError::NotFound, "load job");
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn test_other_errors_keep_operation() {
        let err = convert_diesel_error(DieselError::RollbackTransaction, "update job");
        match err {
            AppError::Database { operation, .. } => assert_eq!(operation, "update job"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unique_field_from_constraint() {
        assert_eq!(
            unique_field_from_constraint(Some("cron_jobs_function_name_key")),
            Some("function_name".to_string())
        );
        assert_eq!(unique_field_from_constraint(Some("other_pkey")), None);
        assert_eq!(unique_field_from_constraint(None), None);
    }
}
