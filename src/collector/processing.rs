use std::collections::HashSet;

/// Removes markup tags and decodes entities, then collapses whitespace.
pub fn strip_html(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "middot" => Some('·'),
        "hellip" => Some('…'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

const TITLE_WEIGHT: u32 = 2;
const DESCRIPTION_WEIGHT: u32 = 1;

/// Scores 0–100 by how many keyword terms appear in the title (weight 2)
/// and the description (weight 1).
pub fn relevance_score(keyword: &str, title: &str, description: &str) -> u32 {
    let terms: Vec<String> = keyword
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();
    if terms.is_empty() {
        return 0;
    }

    let title = title.to_lowercase();
    let description = description.to_lowercase();
    let hits: u32 = terms
        .iter()
        .map(|term| {
            let mut score = 0;
            if title.contains(term.as_str()) {
                score += TITLE_WEIGHT;
            }
            if description.contains(term.as_str()) {
                score += DESCRIPTION_WEIGHT;
            }
            score
        })
        .sum();

    let max = terms.len() as u32 * (TITLE_WEIGHT + DESCRIPTION_WEIGHT);
    ((hits as f64 / max as f64) * 100.0).round() as u32
}

/// Keeps the first occurrence of each URL, preserving order.
pub fn dedupe_by_url<T>(items: Vec<T>, url_of: impl Fn(&T) -> &str) -> (Vec<T>, u32) {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(url_of(&item).to_string()) {
            kept.push(item);
        } else {
            duplicates += 1;
        }
    }
    (kept, duplicates)
}

/// Host part of a URL with any leading `www.` removed.
pub fn source_from_url(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    host.trim_start_matches("www.").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_and_entities() {
        assert_eq!(
            strip_html("<b>로봇</b> 교육 &quot;확대&quot; &amp; 지원"),
            "로봇 교육 \"확대\" & 지원"
        );
        assert_eq!(strip_html("A&#39;s  <i>new</i>\n class"), "A's new class");
        assert_eq!(decode_entities("AT&T &#x41;"), "AT&T A");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
    }

    #[test]
    fn test_relevance_weights_title_over_description() {
        assert_eq!(relevance_score("코딩교육", "코딩교육 열풍", "코딩교육 현장"), 100);
        assert_eq!(relevance_score("코딩교육", "코딩교육 열풍", "학부모 관심"), 67);
        assert_eq!(relevance_score("코딩교육", "학부모 관심", "코딩교육 현장"), 33);
        assert_eq!(relevance_score("코딩교육", "날씨", "맑음"), 0);
        assert_eq!(relevance_score("어린이 코딩", "어린이 축제", "코딩 체험"), 50);
        assert_eq!(relevance_score("  ", "a", "b"), 0);
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let items = vec![("https://a.kr/1", 1), ("https://a.kr/2", 2), ("https://a.kr/1", 3)];
        let (kept, duplicates) = dedupe_by_url(items, |item| item.0);
        assert_eq!(kept, vec![("https://a.kr/1", 1), ("https://a.kr/2", 2)]);
        assert_eq!(duplicates, 1);
    }

    #[test]
    fn test_source_from_url() {
        assert_eq!(source_from_url("https://www.hani.co.kr/arti/123"), "hani.co.kr");
        assert_eq!(source_from_url("http://news.example.com?id=1"), "news.example.com");
        assert_eq!(source_from_url("edu.go.kr/path"), "edu.go.kr");
    }
}
