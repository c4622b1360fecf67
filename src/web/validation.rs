use crate::web::error::AppError;

pub const MAX_SHORT_TEXT: usize = 100;
pub const MAX_LONG_TEXT: usize = 5_000;
pub const MAX_CONTENT: usize = 100_000;

/// Trims and drops control characters other than newlines and tabs.
pub fn sanitize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

pub fn required(value: Option<&str>, label: &str, max_len: usize) -> Result<String, AppError> {
    let cleaned = value.map(sanitize).unwrap_or_default();
    if cleaned.is_empty() {
        return Err(AppError::InvalidInput(format!("{label}을(를) 입력해주세요.")));
    }
    if cleaned.chars().count() > max_len {
        return Err(AppError::InvalidInput(format!(
            "{label}은(는) {max_len}자 이하로 입력해주세요."
        )));
    }
    Ok(cleaned)
}

pub fn optional(value: Option<&str>, label: &str, max_len: usize) -> Result<Option<String>, AppError> {
    match value.map(sanitize) {
        Some(cleaned) if !cleaned.is_empty() => {
            if cleaned.chars().count() > max_len {
                return Err(AppError::InvalidInput(format!(
                    "{label}은(는) {max_len}자 이하로 입력해주세요."
                )));
            }
            Ok(Some(cleaned))
        }
        _ => Ok(None),
    }
}

/// Accepts Korean mobile and landline numbers with or without dashes and
/// returns the dashed form, e.g. `01012345678` -> `010-1234-5678`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | '.' | '(' | ')'))
        .collect();
    if digits.len() < 9 || !digits.chars().all(|c| c.is_ascii_digit()) || !digits.starts_with('0') {
        return None;
    }

    let (area_len, len_ok) = if digits.starts_with("02") {
        (2, (9..=10).contains(&digits.len()))
    } else if digits.starts_with("01") {
        let prefix_ok = matches!(&digits[..3], "010" | "011" | "016" | "017" | "018" | "019");
        (3, prefix_ok && (10..=11).contains(&digits.len()))
    } else {
        (3, (10..=11).contains(&digits.len()))
    };
    if !len_ok {
        return None;
    }

    let (area, rest) = digits.split_at(area_len);
    let (middle, last) = rest.split_at(rest.len() - 4);
    Some(format!("{area}-{middle}-{last}"))
}

pub fn required_phone(value: Option<&str>, label: &str) -> Result<String, AppError> {
    let raw = required(value, label, 20)?;
    normalize_phone(&raw)
        .ok_or_else(|| AppError::InvalidInput(format!("올바른 {label} 형식이 아닙니다.")))
}

pub fn is_valid_email(raw: &str) -> bool {
    if raw.len() > 254 || raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

pub fn optional_email(value: Option<&str>) -> Result<Option<String>, AppError> {
    match optional(value, "이메일", 254)? {
        Some(email) => {
            let email = email.to_lowercase();
            if is_valid_email(&email) {
                Ok(Some(email))
            } else {
                Err(AppError::InvalidInput("올바른 이메일 형식이 아닙니다.".to_string()))
            }
        }
        None => Ok(None),
    }
}

pub fn required_email(value: Option<&str>) -> Result<String, AppError> {
    optional_email(value)?.ok_or_else(|| AppError::InvalidInput("이메일을 입력해주세요.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  홍길동\u{0007} "), "홍길동");
        assert_eq!(sanitize("줄1\n줄2"), "줄1\n줄2");
    }

    #[test]
    fn test_required_and_optional() {
        assert_eq!(required(Some(" 이름 "), "이름", 10).unwrap(), "이름");
        assert!(matches!(required(None, "이름", 10), Err(AppError::InvalidInput(_))));
        assert!(required(Some("   "), "이름", 10).is_err());
        assert!(required(Some("가나다라마바사아자차카"), "이름", 10).is_err());
        assert_eq!(optional(Some("  "), "메모", 10).unwrap(), None);
        assert_eq!(optional(None, "메모", 10).unwrap(), None);
        assert_eq!(optional(Some(" a "), "메모", 10).unwrap(), Some("a".to_string()));
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("01012345678").as_deref(), Some("010-1234-5678"));
        assert_eq!(normalize_phone("010-1234-5678").as_deref(), Some("010-1234-5678"));
        assert_eq!(normalize_phone("011 123 4567").as_deref(), Some("011-123-4567"));
        assert_eq!(normalize_phone("0212345678").as_deref(), Some("02-1234-5678"));
        assert_eq!(normalize_phone("031-123-4567").as_deref(), Some("031-123-4567"));
        assert_eq!(normalize_phone("0151234567"), None);
        assert_eq!(normalize_phone("1012345678"), None);
        assert_eq!(normalize_phone("010-1234-567a"), None);
        assert_eq!(normalize_phone("010123"), None);
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("parent@example.com"));
        assert!(!is_valid_email("parent@example"));
        assert!(!is_valid_email("parent example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert_eq!(
            optional_email(Some(" Parent@Example.COM ")).unwrap().as_deref(),
            Some("parent@example.com")
        );
        assert!(optional_email(Some("nope")).is_err());
        assert!(required_email(None).is_err());
    }
}
