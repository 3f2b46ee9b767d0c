//! Keyword and tag filtering over the image collection.
//!
//! A linear scan in store order. Tag matching is case-insensitive on both
//! sides; the keyword is a case-insensitive substring match against the
//! stored filename, the original filename and every tag.

use super::ImageRecord;

/// How several tag filter terms combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatchMode {
    /// Every term must be present.
    And,
    /// At least one term must be present.
    #[default]
    Or,
}

impl TagMatchMode {
    /// Only the literal `"and"` selects AND; anything else, typos and
    /// other casings included, is OR.
    pub fn from_param(mode: Option<&str>) -> Self {
        match mode {
            Some("and") => TagMatchMode::And,
            _ => TagMatchMode::Or,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Lower-cased, trimmed keyword. Empty means no keyword filtering.
    keyword: String,
    /// Lower-cased tag filter terms.
    tags: Vec<String>,
    mode: TagMatchMode,
}

impl SearchQuery {
    pub fn new<I, S>(keyword: Option<&str>, tags: I, mode: TagMatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keyword: keyword.map(|k| k.trim().to_lowercase()).unwrap_or_default(),
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            mode,
        }
    }

    /// Build a query from raw `q`, `tags` (comma separated) and `mode`
    /// request parameters.
    pub fn from_params(q: Option<&str>, tags: Option<&str>, mode: Option<&str>) -> Self {
        let tag_terms = tags.map(|t| t.split(',').collect::<Vec<_>>()).unwrap_or_default();
        Self::new(q, tag_terms, TagMatchMode::from_param(mode))
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn mode(&self) -> TagMatchMode {
        self.mode
    }

    pub fn matches(&self, image: &ImageRecord) -> bool {
        self.matches_tags(image) && self.matches_keyword(image)
    }

    fn matches_tags(&self, image: &ImageRecord) -> bool {
        if self.tags.is_empty() {
            return true;
        }

        let image_tags: Vec<String> = image.tags.iter().map(|t| t.to_lowercase()).collect();
        let present = |term: &String| image_tags.iter().any(|t| t == term);

        match self.mode {
            TagMatchMode::And => self.tags.iter().all(present),
            TagMatchMode::Or => self.tags.iter().any(present),
        }
    }

    fn matches_keyword(&self, image: &ImageRecord) -> bool {
        if self.keyword.is_empty() {
            return true;
        }

        let keyword = self.keyword.as_str();
        image.filename.to_lowercase().contains(keyword)
            || image.original_name.to_lowercase().contains(keyword)
            || image
                .tags
                .iter()
                .any(|t| t.to_lowercase().contains(keyword))
    }
}

/// Records satisfying `query`, in their original order.
pub fn filter_images(images: &[ImageRecord], query: &SearchQuery) -> Vec<ImageRecord> {
    images
        .iter()
        .filter(|image| query.matches(image))
        .cloned()
        .collect()
}
