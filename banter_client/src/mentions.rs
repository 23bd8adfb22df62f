use regex::Regex;

/// Keeps only the candidate usernames that actually appear as an @handle in
/// the text. A handle must end at a word boundary, so "@rob" does not match
/// inside "@robert".
pub fn filter_mentions(content: &str, candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|username| {
            let pattern = format!(r"@{}\b", regex::escape(username));
            Regex::new(&pattern)
                .map(|re| re.is_match(content))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}
