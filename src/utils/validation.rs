use crate::utils::error::{Result, TrackerError};
use chrono::NaiveTime;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(TrackerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Accepts `HH:MM` or `HH:MM:SS` in 24h local time.
pub fn parse_time_of_day(field_name: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Expected HH:MM: {}", e),
        })
}

/// Loose syntax check; the SMTP relay has the final word.
pub fn validate_email(field_name: &str, value: &str) -> Result<()> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(TrackerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Not a valid email address".to_string(),
        });
    }
    Ok(())
}

/// Rejects missing or blank product names.
pub fn validate_product_name(value: Option<&str>) -> Result<&str> {
    match value.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(TrackerError::ValidationError {
            message: "Product name is required".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("oracle.base_url", "https://api.openai.com").is_ok());
        assert!(validate_url("oracle.base_url", "http://localhost:4444").is_ok());
        assert!(validate_url("oracle.base_url", "").is_err());
        assert!(validate_url("oracle.base_url", "invalid-url").is_err());
        assert!(validate_url("oracle.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        let t = parse_time_of_day("sweep.time", "08:00").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert!(parse_time_of_day("sweep.time", "07:30:15").is_ok());
        assert!(parse_time_of_day("sweep.time", "25:00").is_err());
        assert!(parse_time_of_day("sweep.time", "eight").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("subscribers.emails", "alice@example.com").is_ok());
        assert!(validate_email("subscribers.emails", "alice@localhost").is_err());
        assert!(validate_email("subscribers.emails", "@example.com").is_err());
        assert!(validate_email("subscribers.emails", "alice example@x.com").is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert_eq!(validate_product_name(Some(" Milk ")).unwrap(), "Milk");
        assert!(validate_product_name(Some("   ")).is_err());
        assert!(validate_product_name(None).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("server.port", 5001u16, 1, u16::MAX).is_ok());
        assert!(validate_range("server.port", 0u16, 1, u16::MAX).is_err());
    }
}
