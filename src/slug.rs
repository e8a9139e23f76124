use url::Url;

const SEPARATOR: char = '_';

/// Lowercases `input` and collapses every run of non-alphanumeric characters into `_`.
///
/// Leading and trailing separators are dropped, except that a leading underscore
/// in the input is kept.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_sep = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(SEPARATOR);
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if input.starts_with(SEPARATOR) {
        out.insert(0, SEPARATOR);
    }
    out
}

/// Slugifies a URL after clearing its fragment and sorting its query parameters by name.
///
/// Parameters with the same name keep their relative order.
pub fn slugify_url(url: &str) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(url)?;
    parsed.set_fragment(None);

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }

    Ok(slugify(parsed.as_str()))
}
