/// Strips every trailing slash so paths can be appended with `format!("{base}/...")`.
///
/// # Examples
/// ```
/// use chatbot::utils::url::trim_trailing_slashes;
/// assert_eq!(
///     trim_trailing_slashes("https://generativelanguage.googleapis.com/v1beta/"),
///     "https://generativelanguage.googleapis.com/v1beta"
/// );
/// ```
pub fn trim_trailing_slashes<S>(url: S) -> String
where
    S: Into<String>,
{
    let mut url = url.into();
    let trimmed_len = url.trim_end_matches('/').len();
    url.truncate(trimmed_len);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_trailing_slashes() {
        let test_cases = vec![
            ("http://localhost:8080/", "http://localhost:8080"),
            ("http://localhost:8080", "http://localhost:8080"),
            ("http://localhost:8080/v1beta//", "http://localhost:8080/v1beta"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(trim_trailing_slashes(input), expected);
            assert_eq!(trim_trailing_slashes(input.to_string()), expected);
        }
    }

    #[test]
    fn test_no_allocation_when_unchanged() {
        let input = String::from("http://localhost:8080");
        let ptr = input.as_ptr();
        let result = trim_trailing_slashes(input);

        assert_eq!(result.as_ptr(), ptr);
    }
}
