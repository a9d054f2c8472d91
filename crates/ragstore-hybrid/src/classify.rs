use ragstore_core::config::{ClassifierConfig, KeywordConfig};
use ragstore_core::traits::Classifier;
use ragstore_core::types::Collection;
use ragstore_text::KeywordIndex;

/// Routes text to `Domain` when it mentions one of a fixed list of terms.
///
/// ASCII terms match as token prefixes ("regulation" matches "regulations");
/// other terms match anywhere inside a token, since Korean attaches particles
/// and compounds without spaces ("법" inside "항만법에").
pub struct KeywordClassifier {
    terms: Vec<String>,
    extractor: KeywordIndex,
}

impl KeywordClassifier {
    pub fn new<I, S>(terms: I, keyword: &KeywordConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms.into_iter().map(|t| t.as_ref().trim().to_lowercase()).filter(|t| !t.is_empty()).collect();
        Self { terms, extractor: KeywordIndex::new(1, keyword.max_len) }
    }

    pub fn from_config(classifier: &ClassifierConfig, keyword: &KeywordConfig) -> Self {
        Self::new(&classifier.domain_terms, keyword)
    }

    fn term_matches(term: &str, token: &str) -> bool {
        if term.is_ascii() { token.starts_with(term) } else { token.contains(term) }
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Collection {
        let tokens = self.extractor.extract_keywords(text);
        let hit = tokens.iter().any(|tok| self.terms.iter().any(|term| Self::term_matches(term, tok)));
        if hit { Collection::Domain } else { Collection::General }
    }
}
