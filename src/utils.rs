use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Textual date formats accepted by report tables, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Parses a date cell against the accepted formats. Returns `None` when the
/// cell is blank or matches no format.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Parses an amount cell. Currency symbols, thousands separators and
/// whitespace are stripped; parentheses or a leading/trailing minus sign
/// denote a negative value. Returns `None` on non-numeric content.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',') && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let mut negative = false;
    if cleaned.starts_with('(') && cleaned.ends_with(')') {
        negative = true;
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    } else if let Some(stripped) = cleaned.strip_suffix('-') {
        negative = true;
        cleaned = stripped.to_string();
    } else if let Some(stripped) = cleaned.strip_prefix('-') {
        negative = true;
        cleaned = stripped.to_string();
    }

    // A sign marker was already consumed; anything left over is garbage.
    if cleaned.contains('-') || cleaned.contains('(') || cleaned.contains(')') {
        return None;
    }

    let value: Decimal = cleaned.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Parses a boolean-ish cell ("Yes", "true", "1", "recallable", ...).
/// Anything unrecognized is `false`.
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "yes" | "true" | "1" | "y" | "recallable"
    )
}

/// Finds the first column whose header matches one of the synonyms, exact
/// matches before substring matches so that e.g. an "Amount" column wins
/// over a "Distribution Amount Date" header.
pub fn find_column(headers: &[String], synonyms: &[&str]) -> Option<usize> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    for name in synonyms {
        if let Some(idx) = lowered.iter().position(|h| h == name) {
            return Some(idx);
        }
    }

    for name in synonyms {
        if let Some(idx) = lowered.iter().position(|h| h.contains(name)) {
            return Some(idx);
        }
    }

    None
}

/// Returns the trimmed cell at `idx`, or `None` when the column is absent
/// or the row is too short.
pub fn cell<'a>(row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| row.get(i)).map(|c| c.trim())
}

/// Trimmed cell content, falling back to `default` when blank or missing.
pub fn cell_or<'a>(row: &'a [String], idx: Option<usize>, default: &'a str) -> &'a str {
    match cell(row, idx) {
        Some(c) if !c.is_empty() => c,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 31).unwrap();
        assert_eq!(parse_date("2023-03-31"), Some(expected));
        assert_eq!(parse_date("03/31/2023"), Some(expected));
        assert_eq!(parse_date("31-03-2023"), Some(expected));
        assert_eq!(parse_date("Mar 31, 2023"), Some(expected));
        assert_eq!(parse_date("31 March 2023"), Some(expected));
        assert_eq!(parse_date(" 2023-03-31 "), Some(expected));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2023-13-01"), None);
    }

    #[test]
    fn test_parse_amount_plain_and_formatted() {
        assert_eq!(parse_amount("384710"), Some(dec!(384710)));
        assert_eq!(parse_amount("$384,710.00"), Some(dec!(384710.00)));
        assert_eq!(parse_amount("€2,500.75"), Some(dec!(2500.75)));
        assert_eq!(parse_amount("£500,000"), Some(dec!(500000)));
        assert_eq!(parse_amount("1 234 567"), Some(dec!(1234567)));
    }

    #[test]
    fn test_parse_amount_negative_forms() {
        assert_eq!(parse_amount("(50,000)"), Some(dec!(-50000)));
        assert_eq!(parse_amount("-50000"), Some(dec!(-50000)));
        assert_eq!(parse_amount("50000-"), Some(dec!(-50000)));
        assert_eq!(parse_amount("($1,234.56)"), Some(dec!(-1234.56)));
    }

    #[test]
    fn test_parse_amount_rejects_non_numeric() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("N/A"), None);
        assert_eq!(parse_amount("--5"), None);
        assert_eq!(parse_amount("(50"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("Yes"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(parse_flag("recallable"));
        assert!(!parse_flag("No"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_find_column_prefers_exact_match() {
        let headers = vec![
            "Distribution Amount Note".to_string(),
            "Amount".to_string(),
        ];
        assert_eq!(find_column(&headers, &["amount"]), Some(1));
    }

    #[test]
    fn test_find_column_substring_fallback() {
        let headers = vec!["Call Date".to_string(), "Capital Call Amount".to_string()];
        assert_eq!(find_column(&headers, &["amount"]), Some(1));
        assert_eq!(find_column(&headers, &["call date", "date"]), Some(0));
        assert_eq!(find_column(&headers, &["recallable"]), None);
    }
}
