//! Text normalization for dedup keys and citation keys.
//!
//! Everything here is pure and allocation-cheap: lowercasing, punctuation
//! stripping, accent folding, and identifier cleanup. Stored record fields
//! keep their original Unicode; the folded forms exist only for matching
//! and for ASCII BibTeX keys.

/// Leading articles dropped from titles before dedup comparison.
const LEADING_ARTICLES: &[&str] = &["a", "an", "the"];

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a title for fallback dedup matching: lowercase, strip
/// punctuation, collapse whitespace, drop leading articles.
pub fn normalize_title(s: &str) -> String {
    let cleaned: String = s
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while let Some(first) = words.first() {
        if LEADING_ARTICLES.contains(first) {
            words.remove(0);
        } else {
            break;
        }
    }
    words.join(" ")
}

/// Fold accented Latin characters to their ASCII base letter and drop
/// anything else non-ASCII. Covers the precomposed Latin-1 Supplement and
/// Latin Extended-A ranges that appear in author names; combining marks
/// are dropped.
pub fn ascii_fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        match fold_char(c) {
            Some(folded) => out.push_str(folded),
            None => {}
        }
    }
    out
}

fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'ç' | 'ć' | 'ĉ' | 'č' => "c",
        'Ç' | 'Ć' | 'Ĉ' | 'Č' => "C",
        'ď' | 'đ' | 'ð' => "d",
        'Ď' | 'Đ' => "D",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => "G",
        'ĥ' | 'ħ' => "h",
        'Ĥ' | 'Ħ' => "H",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => "I",
        'ĵ' => "j",
        'Ĵ' => "J",
        'ķ' => "k",
        'Ķ' => "K",
        'ĺ' | 'ļ' | 'ľ' | 'ł' => "l",
        'Ĺ' | 'Ļ' | 'Ľ' | 'Ł' => "L",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'Ŕ' | 'Ŗ' | 'Ř' => "R",
        'ś' | 'ŝ' | 'ş' | 'š' => "s",
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => "S",
        'ţ' | 'ť' | 'ŧ' => "t",
        'Ţ' | 'Ť' | 'Ŧ' => "T",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ŵ' => "w",
        'Ŵ' => "W",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'Ý' | 'Ÿ' | 'Ŷ' => "Y",
        'ź' | 'ż' | 'ž' => "z",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'þ' => "th",
        'Þ' => "Th",
        _ => return None,
    };
    Some(folded)
}

/// Normalize a DOI: trim, strip URL/`doi:` prefixes, lowercase.
/// Returns `None` for empty input.
pub fn normalize_doi(s: &str) -> Option<String> {
    let mut doi = s.trim();
    for prefix in [
        "https://doi.org/",
        "http://doi.org/",
        "https://dx.doi.org/",
        "http://dx.doi.org/",
        "doi:",
    ] {
        if doi.len() >= prefix.len() && doi[..prefix.len()].eq_ignore_ascii_case(prefix) {
            doi = &doi[prefix.len()..];
            break;
        }
    }
    if doi.is_empty() {
        None
    } else {
        Some(doi.to_lowercase())
    }
}

/// Split an arXiv identifier into its bare id and version number.
///
/// Accepts `arXiv:` prefixes, `/abs/` and `/pdf/` URLs, and both new-style
/// (`2401.12345v2`) and old-style (`astro-ph/9901313v1`) ids. The bare id
/// is the dedup key; the version is kept for display only.
pub fn split_arxiv_id(s: &str) -> Option<(String, Option<u32>)> {
    let mut id = s.trim();
    if id.is_empty() {
        return None;
    }
    if let Some(pos) = id.find("/abs/") {
        id = &id[pos + 5..];
    } else if let Some(pos) = id.find("/pdf/") {
        id = &id[pos + 5..];
    }
    if let Some(stripped) = strip_prefix_ignore_case(id, "arxiv:") {
        id = stripped;
    }
    let id = id.trim_end_matches(".pdf").trim_matches('/');
    if id.is_empty() {
        return None;
    }

    // Trailing "vN" is a version suffix, not part of the id.
    if let Some(v_pos) = id.rfind('v') {
        let (base, tail) = id.split_at(v_pos);
        let digits = &tail[1..];
        if !base.is_empty() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(version) = digits.parse() {
                return Some((base.to_string(), Some(version)));
            }
        }
    }
    Some((id.to_string(), None))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Reduce an OpenAlex id to its bare `W…` form (they arrive as full URLs).
pub fn normalize_openalex_id(s: &str) -> Option<String> {
    let id = s.trim().trim_end_matches('/');
    if id.is_empty() {
        return None;
    }
    let bare = id.rsplit('/').next().unwrap_or(id);
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}

/// Extract the surname from an author name in either "Last, First" or
/// "First Last" form. Trailing "et al." is ignored.
pub fn surname(author: &str) -> String {
    let name = author.trim();
    // "et al" only as a separate word, so surnames like "Poet" survive.
    let name = match name.to_lowercase().find(" et al") {
        Some(pos) => name[..pos].trim().trim_end_matches(','),
        None => name,
    };
    if let Some((last, _)) = name.split_once(',') {
        return last.trim().to_string();
    }
    name.split_whitespace()
        .last()
        .unwrap_or("")
        .to_string()
}

/// Strip XML/HTML tags (CrossRef abstracts arrive as JATS markup).
pub fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    collapse_ws(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title_drops_articles_and_punctuation() {
        assert_eq!(
            normalize_title("The  Annotated Transformer!"),
            "annotated transformer"
        );
        assert_eq!(
            normalize_title("Attention Is All You Need"),
            normalize_title("attention is all you need.")
        );
        assert_eq!(normalize_title("A An The Survey"), "survey");
    }

    #[test]
    fn test_ascii_fold() {
        assert_eq!(ascii_fold("Łukasz Kaiser"), "Lukasz Kaiser");
        assert_eq!(ascii_fold("Müller"), "Muller");
        assert_eq!(ascii_fold("Straße"), "Strasse");
        assert_eq!(ascii_fold("Ølberg"), "Olberg");
        // Non-Latin content is dropped rather than mangled.
        assert_eq!(ascii_fold("李"), "");
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(
            normalize_doi("https://doi.org/10.1000/XYZ123").as_deref(),
            Some("10.1000/xyz123")
        );
        assert_eq!(
            normalize_doi("DOI:10.1000/xyz123").as_deref(),
            Some("10.1000/xyz123")
        );
        assert_eq!(normalize_doi("  "), None);
    }

    #[test]
    fn test_split_arxiv_id_versions() {
        assert_eq!(
            split_arxiv_id("2401.12345v2"),
            Some(("2401.12345".to_string(), Some(2)))
        );
        assert_eq!(
            split_arxiv_id("2401.12345"),
            Some(("2401.12345".to_string(), None))
        );
        assert_eq!(
            split_arxiv_id("arXiv:astro-ph/9901313v1"),
            Some(("astro-ph/9901313".to_string(), Some(1)))
        );
        assert_eq!(
            split_arxiv_id("http://arxiv.org/abs/1706.03762v5"),
            Some(("1706.03762".to_string(), Some(5)))
        );
    }

    #[test]
    fn test_normalize_openalex_id() {
        assert_eq!(
            normalize_openalex_id("https://openalex.org/W2741809807").as_deref(),
            Some("W2741809807")
        );
        assert_eq!(
            normalize_openalex_id("W2741809807").as_deref(),
            Some("W2741809807")
        );
    }

    #[test]
    fn test_surname_forms() {
        assert_eq!(surname("Vaswani, Ashish"), "Vaswani");
        assert_eq!(surname("Ashish Vaswani"), "Vaswani");
        assert_eq!(surname("Vaswani"), "Vaswani");
        assert_eq!(surname("Smith et al."), "Smith");
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("<jats:p>An <i>important</i> result.</jats:p>"),
            "An important result."
        );
    }
}
