//! Finding platform links inside free-form text.

use reqwest::Url;

use crate::error::{self, Result};
use crate::url_info::{SHORT_HOSTS, SITE_HOSTS};

const TRAILING: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"', '>'];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '<' | '>' | '"' | '(' | '[')
}

/// Yields every platform link found in `text`, in order of appearance.
pub fn extract_links(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.split(is_separator)
        .flat_map(|word| word.match_indices("http").map(move |(at, _)| &word[at..]))
        .map(|candidate| candidate.trim_end_matches(TRAILING))
        .filter(|candidate| is_platform_link(candidate))
}

/// First platform link in `text`; the text may be the link itself.
pub fn first_link(text: &str) -> Result<&str> {
    extract_links(text)
        .next()
        .ok_or(error::Error::LinkNotFound)
}

fn is_platform_link(candidate: &str) -> bool {
    let url = match Url::parse(candidate) {
        Ok(url) => url,
        Err(_) => return false,
    };

    matches!(url.scheme(), "http" | "https")
        && url
            .host_str()
            .map(str::to_ascii_lowercase)
            .map_or(false, |host| {
                SITE_HOSTS.contains(&host.as_str()) || SHORT_HOSTS.contains(&host.as_str())
            })
        && url.path_segments().map_or(false, |mut segments| {
            segments.any(|segment| !segment.is_empty())
        })
}
