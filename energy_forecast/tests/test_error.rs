use energy_forecast::error::ForecastError;
use production_math::MathError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    assert!(matches!(ForecastError::from(io_error), ForecastError::IoError(_)));

    let math_error = MathError::InvalidInput("window must be positive".to_string());
    assert!(matches!(ForecastError::from(math_error), ForecastError::Math(_)));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(ForecastError::from(json_error), ForecastError::JsonError(_)));
}

#[test]
fn test_error_display() {
    let error = ForecastError::Schema {
        missing: vec!["region".to_string(), "production_mwh".to_string()],
    };
    assert_eq!(
        error.to_string(),
        "Missing required columns: region, production_mwh"
    );

    let error = ForecastError::InsufficientData {
        required: 8,
        available: 3,
    };
    assert!(error.to_string().contains("need at least 8"));
}

#[test]
fn test_only_insufficient_data_is_degradable() {
    assert!(ForecastError::InsufficientData {
        required: 8,
        available: 0
    }
    .is_insufficient_data());
    assert!(!ForecastError::ModelError("boom".to_string()).is_insufficient_data());
    assert!(!ForecastError::Math(MathError::InsufficientData("x".to_string())).is_insufficient_data());
}
