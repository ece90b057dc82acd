use crate::error::{SupplyChainError, SupplyChainResult};
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> SupplyChainResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let field = errors
                .field_errors()
                .keys()
                .next()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "model".to_string());
            Err(SupplyChainError::validation(field, format_validation_errors(&errors)))
        }
    }
}

/// Flattens field errors into one message, preferring the message declared on
/// the validation rule.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    let mut field_errors: Vec<_> = errors.field_errors().into_iter().collect();
    field_errors.sort_by_key(|(field, _)| *field);

    for (field, field_errors) in field_errors {
        for error in field_errors {
            let message = match (&error.message, error.code.as_ref()) {
                (Some(message), _) => message.to_string(),
                (None, "email") => "Invalid email format".to_string(),
                (None, "length") => format!("Length validation failed for field '{}'", field),
                (None, "range") => format!("Value out of range for field '{}'", field),
                (None, "required") => format!("Field '{}' is required", field),
                (None, code) => format!("Validation failed for field '{}': {}", field, code),
            };
            messages.push(message);
        }
    }

    messages.join(", ")
}

/// Minimum length plus at least one letter and one digit.
pub fn validate_password_strength(password: &str, min_length: usize) -> SupplyChainResult<()> {
    if password.chars().count() < min_length {
        return Err(SupplyChainError::validation(
            "password",
            format!("Password must be at least {} characters long", min_length),
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(SupplyChainError::validation(
            "password",
            "Password must contain at least one letter and one digit",
        ));
    }

    Ok(())
}

/// Caps a client-supplied page size.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplychainx_models::{NewProductionOrder, NewRawMaterial, ProductionPriority};

    #[test]
    fn test_declared_message_is_used() {
        let order = NewProductionOrder {
            product_id: 1,
            quantity: 0,
            priority: ProductionPriority::Standard,
        };
        let err = validate_model(&order).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("Production quantity must be positive"));
    }

    #[test]
    fn test_negative_stock_is_rejected() {
        let material = NewRawMaterial {
            name: "Oak plank".to_string(),
            description: None,
            unit: "pcs".to_string(),
            stock: -1,
            min_stock: 10,
            supplier_id: None,
        };
        match validate_model(&material) {
            Err(SupplyChainError::Validation { field, .. }) => assert_eq!(field, "stock"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("s3cretpass", 8).is_ok());
        assert!(validate_password_strength("short1", 8).is_err());
        assert!(validate_password_strength("lettersonly", 8).is_err());
        assert!(validate_password_strength("1234567890", 8).is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50, 500), 50);
        assert_eq!(clamp_limit(Some(10_000), 50, 500), 500);
        assert_eq!(clamp_limit(Some(0), 50, 500), 1);
    }
}
