//! AI-assisted image descriptions
//!
//! An ordered chain of description providers is tried until one returns a
//! caption, which is then parsed into six fixed fields. When every provider
//! fails a rule-based generator fills the same fields from hint tags and the
//! filename, so callers always receive a complete result.

pub mod fallback;
pub mod parse;
pub mod providers;

pub use parse::parse_description;
pub use providers::{HuggingFaceProvider, ProviderSettings};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// The six descriptive fields every analysis produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub what_it_is: String,
    pub main_colors: String,
    pub background: String,
    pub atmosphere: String,
    pub impression: String,
    pub style: String,
}

impl ImageAnalysis {
    #[cfg(test)]
    pub(crate) fn has_empty_field(&self) -> bool {
        [
            &self.what_it_is,
            &self.main_colors,
            &self.background,
            &self.atmosphere,
            &self.impression,
            &self.style,
        ]
        .iter()
        .any(|field| field.trim().is_empty())
    }
}

/// Which path produced an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    VisionLlmParsed,
    EnhancedAiCombinedAnalysis,
    EnhancedIntelligentAnalysis,
    FallbackAnalysis,
}

/// An image handed to the providers.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Read a spooled upload. The MIME type is sniffed from the content and
    /// falls back to the client supplied one.
    pub fn read_from(
        path: &Path,
        original_name: &str,
        declared_mime: Option<&str>,
    ) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime_type = image::guess_format(&bytes)
            .map(|format| format.to_mime_type().to_string())
            .ok()
            .or_else(|| declared_mime.map(str::to_string))
            .unwrap_or_else(|| "image/jpeg".to_string());

        Ok(Self {
            original_name: original_name.to_string(),
            mime_type,
            bytes,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider answered with status {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("provider returned no text")]
    EmptyOutput,
}

/// A source of free-text image descriptions.
#[async_trait]
pub trait DescriptionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn describe(&self, image: &ImageInput) -> Result<String, ProviderError>;
}

/// One provider that did not produce a caption. Kept for diagnostics only.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub analysis: ImageAnalysis,
    pub source: AnalysisSource,
}

impl AnalysisReport {
    fn new(analysis: ImageAnalysis, source: AnalysisSource) -> Self {
        Self { analysis, source }
    }

    /// The rule-based result used when the image itself could not be read.
    pub fn unreadable_image(hint_tags: &[String]) -> Self {
        Self::new(
            fallback::combined_analysis("unknown.jpg", hint_tags),
            AnalysisSource::FallbackAnalysis,
        )
    }
}

/// Runs the provider chain and the rule-based fallback.
pub struct AnalysisAdapter {
    providers: Vec<Arc<dyn DescriptionProvider>>,
}

impl AnalysisAdapter {
    pub fn new(providers: Vec<Arc<dyn DescriptionProvider>>) -> Self {
        Self { providers }
    }

    /// The default remote chain, or no providers at all when remote analysis
    /// is disabled.
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        if !settings.remote_enabled {
            tracing::info!("Remote analysis disabled, using rule-based descriptions only");
            return Self::new(Vec::new());
        }
        Self::new(providers::default_chain(settings))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Describe `image`. Never fails: provider errors are logged and the
    /// next provider is tried, ending in the rule-based generator.
    pub async fn analyze(&self, image: &ImageInput, hint_tags: &[String]) -> AnalysisReport {
        let mut failures: Vec<ProviderFailure> = Vec::new();

        for provider in &self.providers {
            tracing::debug!("Trying provider {}", provider.name());
            match provider.describe(image).await {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!(
                        "Provider {} described {}: {}",
                        provider.name(),
                        image.original_name,
                        text
                    );
                    return AnalysisReport::new(
                        parse_description(&text, hint_tags),
                        AnalysisSource::VisionLlmParsed,
                    );
                }
                Ok(_) => failures.push(ProviderFailure {
                    provider: provider.name().to_string(),
                    error: ProviderError::EmptyOutput,
                }),
                Err(error) => failures.push(ProviderFailure {
                    provider: provider.name().to_string(),
                    error,
                }),
            }
        }

        for failure in &failures {
            tracing::warn!("Provider {} failed: {}", failure.provider, failure.error);
        }

        rule_based(&image.original_name, Some(image.bytes.len()), hint_tags)
    }
}

/// Hint tags drive the combined generator; without them the filename
/// patterns get the first chance.
pub fn rule_based(filename: &str, size_bytes: Option<usize>, hint_tags: &[String]) -> AnalysisReport {
    if hint_tags.is_empty() {
        if let Some(analysis) = fallback::filename_analysis(filename, size_bytes) {
            return AnalysisReport::new(analysis, AnalysisSource::EnhancedIntelligentAnalysis);
        }
    }
    AnalysisReport::new(
        fallback::combined_analysis(filename, hint_tags),
        AnalysisSource::EnhancedAiCombinedAnalysis,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DescriptionProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn describe(&self, _image: &ImageInput) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Status(503))
        }
    }

    struct FixedProvider {
        text: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DescriptionProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn describe(&self, _image: &ImageInput) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.to_string())
        }
    }

    fn failing() -> Arc<FailingProvider> {
        Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        })
    }

    fn fixed(text: &'static str) -> Arc<FixedProvider> {
        Arc::new(FixedProvider {
            text,
            calls: AtomicUsize::new(0),
        })
    }

    fn input(name: &str) -> ImageInput {
        ImageInput {
            original_name: name.to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0u8; 2048],
        }
    }

    #[tokio::test]
    async fn all_providers_failing_still_yields_six_fields() {
        let a = failing();
        let b = failing();
        let chain: Vec<Arc<dyn DescriptionProvider>> = vec![a.clone(), b.clone()];
        let adapter = AnalysisAdapter::new(chain);

        let report = adapter.analyze(&input("IMG_0001.png"), &[]).await;

        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.source, AnalysisSource::EnhancedAiCombinedAnalysis);
        assert!(!report.analysis.has_empty_field());
    }

    #[tokio::test]
    async fn first_success_short_circuits_the_chain() {
        let first = failing();
        let second = fixed("a brown dog in a park");
        let third = fixed("never used");
        let chain: Vec<Arc<dyn DescriptionProvider>> =
            vec![first.clone(), second.clone(), third.clone()];
        let adapter = AnalysisAdapter::new(chain);

        let report = adapter.analyze(&input("x.png"), &[]).await;

        assert_eq!(report.source, AnalysisSource::VisionLlmParsed);
        assert_eq!(report.analysis.what_it_is, "brown dog in a park");
        assert_eq!(report.analysis.background, "outdoor environment");
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_caption_counts_as_failure() {
        let chain: Vec<Arc<dyn DescriptionProvider>> = vec![fixed("   ")];
        let adapter = AnalysisAdapter::new(chain);

        let report = adapter
            .analyze(&input("x.png"), &["cat".to_string()])
            .await;

        assert_eq!(report.source, AnalysisSource::EnhancedAiCombinedAnalysis);
        assert_eq!(
            report.analysis.what_it_is,
            "Feline companion displaying natural grace and character"
        );
    }

    #[tokio::test]
    async fn filename_patterns_apply_without_hint_tags() {
        let adapter = AnalysisAdapter::new(Vec::new());
        let report = adapter.analyze(&input("beach-sunset.png"), &[]).await;
        assert_eq!(report.source, AnalysisSource::EnhancedIntelligentAnalysis);
        assert_eq!(report.analysis.what_it_is, "Natural landscape or botanical subject");
    }

    #[test]
    fn report_serialises_flat_with_source() {
        let report = AnalysisReport::unreadable_image(&[]);
        let value = serde_json::to_value(&report).unwrap();
        for field in [
            "what_it_is",
            "main_colors",
            "background",
            "atmosphere",
            "impression",
            "style",
        ] {
            assert!(value[field].is_string(), "missing {}", field);
        }
        assert_eq!(value["source"], "fallback_analysis");
    }

    #[test]
    fn read_from_sniffs_mime_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spool");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n0000").unwrap();

        let png = ImageInput::read_from(&path, "a.jpg", Some("image/jpeg")).unwrap();
        assert_eq!(png.mime_type, "image/png");

        std::fs::write(&path, b"not an image").unwrap();
        let other = ImageInput::read_from(&path, "a.webp", Some("image/webp")).unwrap();
        assert_eq!(other.mime_type, "image/webp");
    }
}
