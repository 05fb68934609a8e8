//! Language detection from loosely formatted filename tokens.

use serde::Serialize;
use std::path::Path;

/// A canonical language: three-letter code plus display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub label: &'static str,
}

impl Language {
    const fn new(code: &'static str, label: &'static str) -> Self {
        Self { code, label }
    }
}

pub const UNDEFINED: Language = Language::new("und", "Undefined");
pub const ENGLISH: Language = Language::new("eng", "English");
const SPANISH: Language = Language::new("spa", "Spanish");
const PORTUGUESE: Language = Language::new("por", "Portuguese");
const FRENCH: Language = Language::new("fra", "French");
const GERMAN: Language = Language::new("deu", "German");
const ITALIAN: Language = Language::new("ita", "Italian");
const JAPANESE: Language = Language::new("jpn", "Japanese");
const CHINESE: Language = Language::new("chi", "Chinese");
const RUSSIAN: Language = Language::new("rus", "Russian");
const KOREAN: Language = Language::new("kor", "Korean");
const ARABIC: Language = Language::new("ara", "Arabic");
const HINDI: Language = Language::new("hin", "Hindi");

/// Languages offered for selection, `und` first.
pub const LANGUAGES: &[Language] = &[
    UNDEFINED, ENGLISH, SPANISH, PORTUGUESE, FRENCH, GERMAN, ITALIAN, JAPANESE, CHINESE,
    RUSSIAN, KOREAN, ARABIC, HINDI,
];

/// Lower-case alias to canonical language.
const ALIASES: &[(&str, Language)] = &[
    ("en", ENGLISH),
    ("eng", ENGLISH),
    ("english", ENGLISH),
    ("en-us", ENGLISH),
    ("en-gb", ENGLISH),
    ("pt", PORTUGUESE),
    ("por", PORTUGUESE),
    ("portuguese", PORTUGUESE),
    ("pt-br", PORTUGUESE),
    ("pt-pt", PORTUGUESE),
    ("pob", PORTUGUESE),
    ("es", SPANISH),
    ("spa", SPANISH),
    ("spanish", SPANISH),
    ("esp", SPANISH),
    ("es-419", SPANISH),
    ("fr", FRENCH),
    ("fra", FRENCH),
    ("fre", FRENCH),
    ("french", FRENCH),
    ("de", GERMAN),
    ("deu", GERMAN),
    ("ger", GERMAN),
    ("german", GERMAN),
    ("it", ITALIAN),
    ("ita", ITALIAN),
    ("italian", ITALIAN),
    ("ja", JAPANESE),
    ("jpn", JAPANESE),
    ("japanese", JAPANESE),
    ("jp", JAPANESE),
    ("zh", CHINESE),
    ("chi", CHINESE),
    ("zho", CHINESE),
    ("chn", CHINESE),
    ("chinese", CHINESE),
    ("ru", RUSSIAN),
    ("rus", RUSSIAN),
    ("russian", RUSSIAN),
    ("ko", KOREAN),
    ("kor", KOREAN),
    ("korean", KOREAN),
    ("ar", ARABIC),
    ("ara", ARABIC),
    ("arabic", ARABIC),
    ("hi", HINDI),
    ("hin", HINDI),
    ("hindi", HINDI),
];

/// Resolve a single alias, case-insensitively.
pub fn lookup(token: &str) -> Option<Language> {
    let token = token.to_ascii_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, lang)| *lang)
}

/// Display label for a canonical code, if known.
pub fn label_for(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|l| l.code.eq_ignore_ascii_case(code))
        .map(|l| l.label)
}

/// Detect a language from a filename.
///
/// The extension is removed and the rest split on runs of `.`, `_`, `-` and
/// whitespace. Tokens are scanned from the end; at each position the token
/// joined with its left neighbour is tried first so regional tags split by
/// the separator (`pt-br`, `en_us`) still resolve.
pub fn detect(filename: &str) -> Option<Language> {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tokens: Vec<&str> = stem
        .split(|c: char| matches!(c, '.' | '_' | '-') || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    for i in (0..tokens.len()).rev() {
        if i > 0 {
            let pair = format!("{}-{}", tokens[i - 1], tokens[i]);
            if let Some(lang) = lookup(&pair) {
                return Some(lang);
            }
        }
        if let Some(lang) = lookup(tokens[i]) {
            return Some(lang);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_from_the_end() {
        assert_eq!(detect("movie.en.forced.srt"), Some(ENGLISH));
        assert_eq!(detect("movie.director.cut.eng.srt"), Some(ENGLISH));
        assert_eq!(detect("movie.es.eng.srt"), Some(ENGLISH));
    }

    #[test]
    fn no_match() {
        assert_eq!(detect("no_lang.srt"), None);
        assert_eq!(detect(""), None);
        assert_eq!(detect("movie.srt"), None);
    }

    #[test]
    fn case_insensitive_and_separators() {
        assert_eq!(detect("Movie_SPA.srt").map(|l| l.code), Some("spa"));
        assert_eq!(detect("Movie - Japanese.ass").map(|l| l.code), Some("jpn"));
        assert_eq!(detect("movie  ger.sub").map(|l| l.code), Some("deu"));
    }

    #[test]
    fn regional_variants() {
        assert_eq!(detect("movie.pt-br.srt").map(|l| l.label), Some("Portuguese"));
        assert_eq!(detect("movie.pt_br.forced.srt").map(|l| l.code), Some("por"));
        assert_eq!(detect("show.s01e01.en-us.srt").map(|l| l.code), Some("eng"));
        assert_eq!(detect("movie.pob.srt").map(|l| l.code), Some("por"));
    }

    #[test]
    fn strips_directory_and_extension() {
        assert_eq!(detect("/subs/eng/movie.srt"), None);
        assert_eq!(detect("/subs/movie.fr.srt").map(|l| l.code), Some("fra"));
    }

    #[test]
    fn labels() {
        assert_eq!(label_for("chi"), Some("Chinese"));
        assert_eq!(label_for("UND"), Some("Undefined"));
        assert_eq!(label_for("xyz"), None);
        assert_eq!(lookup("Korean"), Some(Language { code: "kor", label: "Korean" }));
    }
}
