use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};

use super::{email::EmailDocument, html::strip_html, stopwords::is_stopword};

static ENGLISH_STEMMER: Lazy<Stemmer> = Lazy::new(|| Stemmer::create(Algorithm::English));

/// Lowercases, drops punctuation and stopwords, and stems what is left.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '_' || ch.is_whitespace() {
                ch
            } else {
                ' '
            }
        })
        .collect();

    lowered
        .split_whitespace()
        .filter(|token| token.chars().count() > 1 && !is_stopword(token))
        .map(|token| ENGLISH_STEMMER.stem(token).into_owned())
        .collect()
}

/// Feature text for one email: subject and de-HTML'd body, tokenized and
/// joined by single spaces. Training and inference both go through here.
pub fn clean_email(raw: &str) -> String {
    let doc = EmailDocument::parse(raw);
    let body = strip_html(&doc.body);
    let combined = match doc.subject {
        Some(subject) => format!("{subject} {body}"),
        None => body,
    };
    tokenize(&combined).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_and_stopwords_are_removed() {
        let tokens = tokenize("The PRIZES are waiting, claim them NOW!!!");
        assert_eq!(tokens, vec!["prize", "wait", "claim"]);
    }

    #[test]
    fn single_characters_are_dropped() {
        assert_eq!(tokenize("a b c offer"), vec!["offer"]);
    }

    #[test]
    fn non_ascii_letters_survive() {
        assert_eq!(tokenize("oferta única"), vec!["oferta", "única"]);
    }

    #[test]
    fn clean_email_uses_subject_and_strips_html() {
        let raw = "Subject: Winning offers\n\n<html><b>Claimed</b> &amp; paid</html>";
        assert_eq!(clean_email(raw), "win offer claim paid");
    }

    #[test]
    fn empty_input_cleans_to_empty() {
        assert_eq!(clean_email(""), "");
        assert_eq!(clean_email("!!! ??? ..."), "");
    }
}
