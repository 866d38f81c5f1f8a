//! Address-bar input filtering
//!
//! String-level helpers behind the router's classification rules: scheme
//! allow-list matching, scheme repair, the scheme-less URL heuristic and
//! query encoding.

use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use url::Url;

/// Schemes loaded directly. Matching is case-insensitive; group 1 is the
/// scheme with its separator, group 2 the remainder.
static ACCEPTED_URI_SCHEMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((?:http|https|file)://|(?:inline|data|about|content|javascript):)(.*)$")
        .expect("accepted-scheme regex is a compile-time constant and must be valid")
});

/// Normalize input that matches the scheme allow-list: the scheme is
/// lowercased and spaces are percent-encoded. Nothing else changes.
///
/// Returns None if the input is not on the allow-list.
pub fn accept_scheme(input: &str) -> Option<String> {
    let caps = ACCEPTED_URI_SCHEMA.captures(input)?;
    let scheme = caps.get(1)?.as_str().to_ascii_lowercase();
    let rest = caps.get(2).map_or("", |m| m.as_str());

    Some(format!("{}{}", scheme, rest).replace(' ', "%20"))
}

pub fn has_accepted_scheme(input: &str) -> bool {
    ACCEPTED_URI_SCHEMA.is_match(input)
}

/// Repair a URL typed into a search box: lowercase a mistyped scheme and
/// restore missing slashes after `http:` / `https:`.
pub fn fix_url(input: &str) -> String {
    let mut url = input.to_string();

    if let Some(colon) = url.find(':') {
        let scheme = &url[..colon];
        if !scheme.is_empty()
            && scheme.chars().all(|c| c.is_ascii_alphabetic())
            && scheme.chars().any(|c| c.is_ascii_uppercase())
        {
            url = format!("{}{}", scheme.to_ascii_lowercase(), &url[colon..]);
        }
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return url;
    }
    if url.starts_with("http:") || url.starts_with("https:") {
        url = if url.starts_with("http:/") || url.starts_with("https:/") {
            url.replacen('/', "//", 1)
        } else {
            url.replacen(':', "://", 1)
        };
    }
    url
}

/// Heuristic check if scheme-less input looks like a web address
pub fn looks_like_url(input: &str) -> bool {
    if input.is_empty() || input.contains(char::is_whitespace) {
        return false;
    }

    // localhost or IP address
    let (host, _) = split_host_and_rest(input);
    if host == "localhost" || host.starts_with("localhost:") || parse_ip_host(host).is_some() {
        return true;
    }

    // Domain-like pattern
    if host.contains('.') && !host.starts_with('.') && !host.contains("..") {
        let tld = host.rsplit('.').next().unwrap_or_default();
        let tld = tld.split(':').next().unwrap_or_default();

        // Basic TLD validation (2-6 chars)
        return (2..=6).contains(&tld.len()) && tld.chars().all(|c| c.is_ascii_alphabetic());
    }

    false
}

/// Insert the default scheme in front of a scheme-less address.
///
/// Returns None if the result does not parse as a URL.
pub fn guess_url(input: &str) -> Option<String> {
    let (host, rest) = split_host_and_rest(input);
    let guessed = if matches!(parse_ip_host(host), Some(IpAddr::V6(_))) && !host.starts_with('[') {
        format!("http://[{}]{}", host, rest)
    } else {
        format!("http://{}{}", host, rest)
    };

    Url::parse(&guessed).ok().map(|_| guessed)
}

fn parse_ip_host(host: &str) -> Option<IpAddr> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let host = if host.starts_with('[') {
        host.strip_prefix('[')
            .and_then(|s| s.split(']').next())
            .unwrap_or(host)
    } else if host.matches(':').count() == 1 {
        host.split(':').next().unwrap_or(host)
    } else {
        host
    };

    host.parse().ok()
}

fn split_host_and_rest(input: &str) -> (&str, &str) {
    let cut = ['/', '?', '#']
        .iter()
        .filter_map(|ch| input.find(*ch))
        .min()
        .unwrap_or(input.len());

    input.split_at(cut)
}

/// Substitute an encoded query into a `%s` search template.
pub fn compose_search_url(template: &str, query: &str) -> String {
    template.replace("%s", &urlencoding::encode(query))
}
