// Social share links for a finished post

use crate::blog_api::GeneratedPost;
use crate::error::{BlogError, Result};
use crate::export::post_title;

use reqwest::Url;

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharePlatform {
    Twitter,
    Facebook,
    LinkedIn,
    WhatsApp,
    Reddit,
}

impl SharePlatform {
    pub const ALL: [SharePlatform; 5] = [
        SharePlatform::Twitter,
        SharePlatform::Facebook,
        SharePlatform::LinkedIn,
        SharePlatform::WhatsApp,
        SharePlatform::Reddit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SharePlatform::Twitter => "twitter",
            SharePlatform::Facebook => "facebook",
            SharePlatform::LinkedIn => "linkedin",
            SharePlatform::WhatsApp => "whatsapp",
            SharePlatform::Reddit => "reddit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "x" => Some(SharePlatform::Twitter),
            _ => Self::ALL.into_iter().find(|p| p.name() == name),
        }
    }
}

/// Plain-text opening of the post, without Markdown markers, capped at 200 characters.
pub fn excerpt(post: &GeneratedPost) -> String {
    let plain = post
        .text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_start_matches(['-', '*', '>', ' ']))
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['*', '_', '`'], "");

    if plain.chars().count() <= EXCERPT_CHARS {
        return plain;
    }
    let cut: String = plain.chars().take(EXCERPT_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}

pub fn share_url(platform: SharePlatform, title: &str, excerpt: &str) -> Result<Url> {
    let message = format!("{}\n\n{}", title, excerpt);
    let (base, params): (&str, Vec<(&str, &str)>) = match platform {
        SharePlatform::Twitter => ("https://twitter.com/intent/tweet", vec![("text", message.as_str())]),
        SharePlatform::Facebook => ("https://www.facebook.com/sharer/sharer.php", vec![("quote", message.as_str())]),
        SharePlatform::LinkedIn => (
            "https://www.linkedin.com/feed/",
            vec![("shareActive", "true"), ("text", message.as_str())],
        ),
        SharePlatform::WhatsApp => ("https://wa.me/", vec![("text", message.as_str())]),
        SharePlatform::Reddit => (
            "https://www.reddit.com/submit",
            vec![("title", title), ("text", excerpt)],
        ),
    };

    let mut url = Url::parse(base)
        .map_err(|e| BlogError::Config(format!("bad share URL for {}: {}", platform.name(), e)))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url)
}

pub fn share_links(post: &GeneratedPost) -> Result<Vec<(SharePlatform, Url)>> {
    let title = post_title(post);
    let excerpt = excerpt(post);
    SharePlatform::ALL
        .into_iter()
        .map(|platform| share_url(platform, &title, &excerpt).map(|url| (platform, url)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(text: &str) -> GeneratedPost {
        GeneratedPost {
            prompt: "Write about cats".into(),
            text: text.into(),
            images: Vec::new(),
            completed_at: "2024-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn excerpt_strips_markdown_and_truncates() {
        let short = post("# Cats\n\nCats are **great**.\n- they purr");
        assert_eq!(excerpt(&short), "Cats are great. they purr");

        let long = post(&"word ".repeat(100));
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn links_are_percent_encoded() {
        let url = share_url(SharePlatform::Twitter, "Cats & Dogs", "100% fun").unwrap();
        let text: Vec<_> = url.query_pairs().filter(|(k, _)| k == "text").map(|(_, v)| v.into_owned()).collect();

        assert_eq!(url.host_str(), Some("twitter.com"));
        assert_eq!(text, vec!["Cats & Dogs\n\n100% fun".to_string()]);
        assert!(!url.as_str().contains("Cats & Dogs"));
    }

    #[test]
    fn reddit_uses_separate_title() {
        let url = share_url(SharePlatform::Reddit, "Cats", "short").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("title".to_string(), "Cats".to_string()), ("text".to_string(), "short".to_string())]
        );
    }

    #[test]
    fn one_link_per_platform() {
        let links = share_links(&post("# Cats\nCats are great.")).unwrap();
        assert_eq!(links.len(), SharePlatform::ALL.len());
        assert!(links.iter().all(|(_, url)| url.scheme() == "https"));
    }

    #[test]
    fn platform_names_parse() {
        assert_eq!(SharePlatform::from_name("X"), Some(SharePlatform::Twitter));
        assert_eq!(SharePlatform::from_name("LinkedIn"), Some(SharePlatform::LinkedIn));
        assert_eq!(SharePlatform::from_name("myspace"), None);
    }
}
