use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Abbreviations ("U.S", "N") are tried before plain word runs.
    static ref RE: Regex = Regex::new(r"\b(?:[A-Z]{1,2}\.)*[A-Z]{1,2}\.?\b|\b\w+(?:[-']\w+)*\b").expect("valid regex");
}

/// Tokenize text into terms. Case is preserved; the same function is used for corpus
/// ingestion and for queries so both sides agree on what a term is.
pub fn tokenize(text: &str) -> Vec<String> {
    RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("The cat, the dog!");
        assert_eq!(t, vec!["The", "cat", "the", "dog"]);
    }

    #[test]
    fn keeps_joined_words() {
        let t = tokenize("a well-known fact, don't you think");
        assert!(t.contains(&"well-known".to_string()));
        assert!(t.contains(&"don't".to_string()));
    }

    #[test]
    fn empty_and_punctuation_only() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" ,.;!? -- ").is_empty());
    }
}
