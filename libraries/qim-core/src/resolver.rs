//! URL-template audio resolver
//!
//! Builds recitation addresses from a CDN template instead of querying the
//! content API. Useful for editions whose files follow a fixed layout.

use crate::error::{QimError, Result};
use crate::traits::AudioResolver;
use async_trait::async_trait;
use url::Url;

/// Default ayah audio layout on the islamic.network CDN
pub const DEFAULT_AYAH_TEMPLATE: &str =
    "https://cdn.islamic.network/quran/audio/128/{edition}/{reference}.mp3";

/// Resolves `{edition}` and `{reference}` placeholders in a URL template
#[derive(Debug, Clone)]
pub struct TemplateAudioResolver {
    template: String,
}

impl TemplateAudioResolver {
    /// Create a resolver from a template containing `{reference}`
    ///
    /// # Errors
    /// Returns `QimError::InvalidInput` if the template has no `{reference}` placeholder
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains("{reference}") {
            return Err(QimError::invalid_input(format!(
                "Audio template must contain {{reference}}: {template}"
            )));
        }
        Ok(Self { template })
    }

    /// The template this resolver expands
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expand the template without touching the network
    pub fn expand(&self, edition: &str, reference: &str) -> Result<String> {
        if reference.trim().is_empty() {
            return Err(QimError::resolution("Empty reference"));
        }

        let expanded = self
            .template
            .replace("{edition}", edition.trim())
            .replace("{reference}", reference.trim());

        Url::parse(&expanded)
            .map(String::from)
            .map_err(|e| QimError::resolution(format!("Invalid audio address {expanded}: {e}")))
    }
}

impl Default for TemplateAudioResolver {
    fn default() -> Self {
        Self {
            template: DEFAULT_AYAH_TEMPLATE.to_string(),
        }
    }
}

#[async_trait]
impl AudioResolver for TemplateAudioResolver {
    async fn resolve_audio(&self, edition: &str, reference: &str) -> Result<String> {
        self.expand(edition, reference)
    }
}
