use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@/-]+$").expect("Invalid identifier regex"));

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w .-]+$").expect("Invalid assessment code regex"));

/// 学号 / 工号校验（调用方负责去除首尾空白）
pub fn validate_identifier(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("Identifier must not be empty");
    }
    if id.chars().count() > 64 {
        return Err("Identifier must be at most 64 characters");
    }
    // 只能包含字母、数字以及 _ . @ / -
    if !IDENTIFIER_RE.is_match(id) {
        return Err("Identifier contains invalid characters");
    }
    Ok(())
}

pub fn validate_assessment_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() || code.chars().count() > 64 {
        return Err("Assessment code length must be between 1 and 64 characters");
    }
    if !CODE_RE.is_match(code) {
        return Err("Assessment code must contain only letters, numbers, spaces, dots, underscores or hyphens");
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), &'static str> {
    if title.is_empty() || title.chars().count() > 255 {
        return Err("Title length must be between 1 and 255 characters");
    }
    Ok(())
}

/// 分类列表校验结果
#[derive(Debug, Clone)]
pub struct CategoryValidationResult {
    pub is_valid: bool,
    pub errors: Vec<&'static str>,
}

impl CategoryValidationResult {
    pub fn error_message(&self) -> String {
        self.errors.join("; ")
    }
}

/// 校验分类定义：(名称, 满分, 是否评语)
pub fn validate_categories<'a, I>(categories: I) -> CategoryValidationResult
where
    I: IntoIterator<Item = (&'a str, f64, bool)>,
{
    let mut errors = Vec::new();

    for (name, max_marks, is_comment) in categories {
        if name.trim().is_empty() && !errors.contains(&"Category name must not be empty") {
            errors.push("Category name must not be empty");
        }
        if !is_comment
            && (!max_marks.is_finite() || max_marks < 0.0)
            && !errors.contains(&"Category marks must be a non-negative number")
        {
            errors.push("Category marks must be a non-negative number");
        }
    }

    CategoryValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("BSCS-21-001").is_ok());
        assert!(validate_identifier("teacher.ali@bgnu").is_ok());
        assert!(validate_identifier("42").is_ok());
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("has space").is_err());
        assert!(validate_identifier(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_assessment_code() {
        assert!(validate_assessment_code("MID-2025 A").is_ok());
        assert!(validate_assessment_code("").is_err());
        assert!(validate_assessment_code("drop;table").is_err());
    }

    #[test]
    fn test_categories() {
        let ok = validate_categories([("Logic", 10.0, false), ("Remarks", 0.0, true)]);
        assert!(ok.is_valid);

        let bad = validate_categories([("", 10.0, false), ("Logic", -1.0, false)]);
        assert!(!bad.is_valid);
        assert_eq!(bad.errors.len(), 2);
        assert!(bad.error_message().contains("non-negative"));
    }
}
