use crate::error::{AnalysisError, AnalysisResult};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};

/// Contractions whose expansion is not a plain suffix rewrite.
static IRREGULAR_CONTRACTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("can't", "cannot"),
        ("won't", "will not"),
        ("shan't", "shall not"),
        ("ain't", "are not"),
        ("y'all", "you all"),
        ("ma'am", "madam"),
        ("o'clock", "of the clock"),
        ("gonna", "going to"),
        ("gotta", "got to"),
        ("wanna", "want to"),
    ]
    .into_iter()
    .collect()
});

/// Irregular plural nouns and their lemma.
static IRREGULAR_NOUNS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("men", "man"),
        ("women", "woman"),
        ("children", "child"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("mice", "mouse"),
        ("geese", "goose"),
        ("lives", "life"),
        ("wives", "wife"),
        ("knives", "knife"),
        ("leaves", "leaf"),
        ("wolves", "wolf"),
        ("halves", "half"),
        ("selves", "self"),
        ("shelves", "shelf"),
        ("thieves", "thief"),
        ("movies", "movie"),
        ("cookies", "cookie"),
        ("zombies", "zombie"),
        ("selfies", "selfie"),
        ("hoodies", "hoodie"),
        ("rookies", "rookie"),
        ("goes", "go"),
        ("data", "datum"),
        ("criteria", "criterion"),
        ("phenomena", "phenomenon"),
    ]
    .into_iter()
    .collect()
});

/// Words ending in `s` that are not plurals.
static NON_PLURAL_S: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "this", "was", "has", "does", "his", "hers", "its", "ours", "yours", "theirs", "yes",
        "news", "always", "series", "species", "thus", "plus", "perhaps", "whereas", "besides",
        "across", "unless", "towards", "afterwards", "nevertheless", "sometimes", "lens",
        "chaos", "canvas", "atlas", "bias", "alias", "christmas", "physics", "mathematics",
        "economics", "politics", "ethics", "graphics", "lyrics",
    ]
    .into_iter()
    .collect()
});

/// Text cleaner that reproduces the preprocessing applied to training data.
pub struct TextCleaner {
    possessive_regex: Regex,
    mention_regex: Regex,
    url_regex: Regex,
    contraction_regex: Regex,
    non_alpha_regex: Regex,
}

impl TextCleaner {
    /// Create a new TextCleaner.
    pub fn new() -> AnalysisResult<Self> {
        Ok(Self {
            possessive_regex: Regex::new(r"'s\b").map_err(|e| AnalysisError::Nlp(e.to_string()))?,
            mention_regex: Regex::new(r"@[A-Za-z0-9]+")
                .map_err(|e| AnalysisError::Nlp(e.to_string()))?,
            url_regex: Regex::new(r"http\S+").map_err(|e| AnalysisError::Nlp(e.to_string()))?,
            contraction_regex: Regex::new(r"(?i)\b[a-z]+(?:'[a-z]+)+\b|(?i)\b(?:gonna|gotta|wanna)\b")
                .map_err(|e| AnalysisError::Nlp(e.to_string()))?,
            non_alpha_regex: Regex::new(r"[^a-zA-Z]")
                .map_err(|e| AnalysisError::Nlp(e.to_string()))?,
        })
    }

    /// Clean and lemmatize a comment.
    ///
    /// Returns an empty string when nothing alphabetic survives.
    pub fn clean(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        let text = text.replace(['\u{2019}', '\u{2018}'], "'");
        let text = self.possessive_regex.replace_all(&text, " is");
        let text = text.replace('#', "");
        let text = self.mention_regex.replace_all(&text, "");
        let text = self.url_regex.replace_all(&text, "");
        let text = self.expand_contractions(&text);
        let text = self.non_alpha_regex.replace_all(&text, " ");
        let text = text.to_lowercase();

        text.split_whitespace()
            .map(lemmatize_noun)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Expand English contractions such as `don't` or `they're`.
    pub fn expand_contractions(&self, text: &str) -> String {
        self.contraction_regex
            .replace_all(text, |caps: &Captures| expand_contraction(&caps[0]))
            .into_owned()
    }
}

fn expand_contraction(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some(expanded) = IRREGULAR_CONTRACTIONS.get(lower.as_str()) {
        return (*expanded).to_string();
    }

    let suffixes: [(&str, &str); 6] = [
        ("n't", " not"),
        ("'re", " are"),
        ("'ll", " will"),
        ("'ve", " have"),
        ("'m", " am"),
        ("'d", " would"),
    ];
    for (suffix, replacement) in suffixes {
        if let Some(stem) = lower.strip_suffix(suffix) {
            if !stem.is_empty() {
                return format!("{}{}", stem, replacement);
            }
        }
    }

    lower
}

/// Reduce a lowercase token to its noun lemma.
pub fn lemmatize_noun(word: &str) -> String {
    if let Some(lemma) = IRREGULAR_NOUNS.get(word) {
        return (*lemma).to_string();
    }
    if word.len() < 4 || NON_PLURAL_S.contains(word) {
        return word.to_string();
    }
    if word.ends_with("sses") {
        return word[..word.len() - 2].to_string();
    }
    if word.ends_with("ies") && word.len() > 4 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    if ["xes", "ches", "shes"].iter().any(|s| word.ends_with(s)) {
        return word[..word.len() - 2].to_string();
    }
    if let Some(stem) = word.strip_suffix('s') {
        return stem.to_string();
    }
    word.to_string()
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static HTML_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid break regex"));
static HTML_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&[a-zA-Z]+;").expect("valid entity regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space regex"));

/// Strip HTML markup from YouTube's `textDisplay` field.
pub fn clean_html(text: &str) -> String {
    let text = HTML_BREAK.replace_all(text, " ");
    let text = HTML_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    let text = HTML_ENTITY.replace_all(&text, |caps: &Captures| {
        if &caps[0] == "&amp;" {
            "&".to_string()
        } else {
            String::new()
        }
    });
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
