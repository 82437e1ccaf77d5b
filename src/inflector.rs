//! Name inflection.
//!
//! Only used while model declarations are normalized: table names are the plural
//! of the model name, and `has_many` targets default to the singular of the alias.

/// Pluralize / singularize model and relation names
pub trait Inflector: Send + Sync {
    fn plural(&self, word: &str) -> String;
    fn singular(&self, word: &str) -> String;
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "media",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
];

/// Simple English rules, applied to the last `_`-separated segment of a name
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishInflector;

impl EnglishInflector {
    fn split_last(word: &str) -> (&str, &str) {
        match word.rfind('_') {
            Some(idx) => (&word[..=idx], &word[idx + 1..]),
            None => ("", word),
        }
    }

    fn plural_word(word: &str) -> String {
        let lower = word.to_ascii_lowercase();
        if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
            return word.to_string();
        }
        if let Some((_, plural)) = IRREGULAR.iter().find(|(single, _)| *single == lower) {
            return (*plural).to_string();
        }
        if IRREGULAR.iter().any(|(_, plural)| *plural == lower) {
            return word.to_string();
        }

        if let Some(stem) = word.strip_suffix('y') {
            if !ends_with_vowel(stem) {
                return format!("{}ies", stem);
            }
        }
        if lower.ends_with('s')
            || lower.ends_with("sh")
            || lower.ends_with("ch")
            || lower.ends_with('x')
            || lower.ends_with('z')
        {
            return format!("{}es", word);
        }
        format!("{}s", word)
    }

    fn singular_word(word: &str) -> String {
        let lower = word.to_ascii_lowercase();
        if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
            return word.to_string();
        }
        if let Some((single, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == lower) {
            return (*single).to_string();
        }
        if IRREGULAR.iter().any(|(single, _)| *single == lower) {
            return word.to_string();
        }

        if let Some(stem) = word.strip_suffix("ies") {
            if !stem.is_empty() {
                return format!("{}y", stem);
            }
        }
        for suffix in ["sses", "shes", "ches", "xes", "zes"] {
            if lower.ends_with(suffix) {
                return word[..word.len() - 2].to_string();
            }
        }
        if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
            return word.to_string();
        }
        match word.strip_suffix('s') {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => word.to_string(),
        }
    }
}

fn ends_with_vowel(stem: &str) -> bool {
    stem.chars()
        .last()
        .map(|c| matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u'))
        .unwrap_or(false)
}

impl Inflector for EnglishInflector {
    fn plural(&self, word: &str) -> String {
        let (head, last) = Self::split_last(word);
        format!("{}{}", head, Self::plural_word(last))
    }

    fn singular(&self, word: &str) -> String {
        let (head, last) = Self::split_last(word);
        format!("{}{}", head, Self::singular_word(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_rules() {
        let inflector = EnglishInflector;
        assert_eq!(inflector.plural("post"), "posts");
        assert_eq!(inflector.plural("category"), "categories");
        assert_eq!(inflector.plural("day"), "days");
        assert_eq!(inflector.plural("box"), "boxes");
        assert_eq!(inflector.plural("address"), "addresses");
        assert_eq!(inflector.plural("person"), "people");
        assert_eq!(inflector.plural("news"), "news");
    }

    #[test]
    fn test_singular_rules() {
        let inflector = EnglishInflector;
        assert_eq!(inflector.singular("tags"), "tag");
        assert_eq!(inflector.singular("categories"), "category");
        assert_eq!(inflector.singular("boxes"), "box");
        assert_eq!(inflector.singular("addresses"), "address");
        assert_eq!(inflector.singular("people"), "person");
        assert_eq!(inflector.singular("status"), "status");
        assert_eq!(inflector.singular("user"), "user");
    }

    #[test]
    fn test_compound_names_inflect_last_segment() {
        let inflector = EnglishInflector;
        assert_eq!(inflector.plural("blog_post"), "blog_posts");
        assert_eq!(inflector.singular("user_tokens"), "user_token");
        assert_eq!(inflector.plural("role_category"), "role_categories");
    }
}
