//! Runtime settings, taken from the Lambda's environment variables.

use anyhow::{anyhow, bail, Context, Result};
use std::env;

pub const DEFAULT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/completions";
pub const DEFAULT_COMPLETIONS_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const DEFAULT_URL_BASE: &str = "https://s3.amazonaws.com";

/// Which object key the `articleUrl` of a successful response refers to.
///
/// Historically the URL has pointed at the *uploaded image*, using the key
/// exactly as it appeared in the notification, rather than at the article
/// document. That remains the default; the other variants exist so that a
/// deployment can opt into something more useful.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum UrlTarget {
    /// The source object key, as received (still percent-encoded).
    #[default]
    Source,

    /// The source object key after decoding.
    SourceDecoded,

    /// The key of the published article document.
    Article,
}

impl UrlTarget {
    pub fn parse(text: &str) -> Result<Self> {
        match text {
            "source" => Ok(UrlTarget::Source),
            "source-decoded" => Ok(UrlTarget::SourceDecoded),
            "article" => Ok(UrlTarget::Article),
            other => bail!("unrecognized URL target `{other}` (expected source, source-decoded or article)"),
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub completions_url: String,
    pub completions_model: String,
    pub story_max_tokens: u32,
    pub title_max_tokens: u32,
    pub url_base: String,
    pub url_target: UrlTarget,
}

// Hand-written so that the API key never ends up in the logs.
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("completions_url", &self.completions_url)
            .field("completions_model", &self.completions_model)
            .field("story_max_tokens", &self.story_max_tokens)
            .field("title_max_tokens", &self.title_max_tokens)
            .field("url_base", &self.url_base)
            .field("url_target", &self.url_target)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: String::new(),
            completions_url: DEFAULT_COMPLETIONS_URL.to_owned(),
            completions_model: DEFAULT_COMPLETIONS_MODEL.to_owned(),
            story_max_tokens: 500,
            title_max_tokens: 100,
            url_base: DEFAULT_URL_BASE.to_owned(),
            url_target: UrlTarget::Source,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup. Unset variables
    /// fall back to the defaults, except for the API key, which is mandatory.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut settings = Settings::default();

        settings.api_key = lookup("OPEN_API_KEY")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("the environment variable OPEN_API_KEY must be set"))?;

        if let Some(url) = lookup("FACESTORY_COMPLETIONS_URL") {
            settings.completions_url = url;
        }

        if let Some(model) = lookup("FACESTORY_COMPLETIONS_MODEL") {
            settings.completions_model = model;
        }

        if let Some(n) = lookup("FACESTORY_STORY_MAX_TOKENS") {
            settings.story_max_tokens = n
                .parse()
                .with_context(|| format!("illegal FACESTORY_STORY_MAX_TOKENS value `{n}`"))?;
        }

        if let Some(n) = lookup("FACESTORY_TITLE_MAX_TOKENS") {
            settings.title_max_tokens = n
                .parse()
                .with_context(|| format!("illegal FACESTORY_TITLE_MAX_TOKENS value `{n}`"))?;
        }

        if let Some(base) = lookup("FACESTORY_URL_BASE") {
            settings.url_base = base.trim_end_matches('/').to_owned();
        }

        if let Some(target) = lookup("FACESTORY_URL_TARGET") {
            settings.url_target = UrlTarget::parse(&target)?;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let s = Settings::from_lookup(lookup_in(&[("OPEN_API_KEY", "sk-test")])).unwrap();
        assert_eq!(s.api_key, "sk-test");
        assert_eq!(s.completions_url, DEFAULT_COMPLETIONS_URL);
        assert_eq!(s.completions_model, DEFAULT_COMPLETIONS_MODEL);
        assert_eq!(s.story_max_tokens, 500);
        assert_eq!(s.title_max_tokens, 100);
        assert_eq!(s.url_base, DEFAULT_URL_BASE);
        assert_eq!(s.url_target, UrlTarget::Source);
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(Settings::from_lookup(lookup_in(&[])).is_err());
        assert!(Settings::from_lookup(lookup_in(&[("OPEN_API_KEY", "")])).is_err());
    }

    #[test]
    fn overrides_are_honored() {
        let s = Settings::from_lookup(lookup_in(&[
            ("OPEN_API_KEY", "k"),
            ("FACESTORY_STORY_MAX_TOKENS", "250"),
            ("FACESTORY_TITLE_MAX_TOKENS", "20"),
            ("FACESTORY_URL_BASE", "https://cdn.example.com/"),
            ("FACESTORY_URL_TARGET", "article"),
        ]))
        .unwrap();
        assert_eq!(s.story_max_tokens, 250);
        assert_eq!(s.title_max_tokens, 20);
        assert_eq!(s.url_base, "https://cdn.example.com");
        assert_eq!(s.url_target, UrlTarget::Article);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(Settings::from_lookup(lookup_in(&[
            ("OPEN_API_KEY", "k"),
            ("FACESTORY_STORY_MAX_TOKENS", "lots"),
        ]))
        .is_err());
        assert!(Settings::from_lookup(lookup_in(&[
            ("OPEN_API_KEY", "k"),
            ("FACESTORY_URL_TARGET", "elsewhere"),
        ]))
        .is_err());
    }

    #[test]
    fn debug_output_hides_key() {
        let s = Settings::from_lookup(lookup_in(&[("OPEN_API_KEY", "sk-secret")])).unwrap();
        assert!(!format!("{s:?}").contains("sk-secret"));
    }
}
