//! The unit of text delivered by the completion service.

/// One piece of an upstream response.
///
/// A fragment may carry no text at all (role announcements, finish markers
/// and other metadata-only messages); such fragments are skipped by the
/// parser and never mark the end of a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    text: Option<String>,
}

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// A fragment with no text payload.
    pub fn empty() -> Self {
        Self { text: None }
    }

    /// The text payload, or `None` when the fragment carries nothing usable.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<Option<String>> for Fragment {
    fn from(text: Option<String>) -> Self {
        Self { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_string_has_no_text() {
        assert_eq!(Fragment::new("").text(), None);
        assert_eq!(Fragment::empty().text(), None);
        assert_eq!(Fragment::from(None).text(), None);
    }

    #[test]
    fn test_text_is_passed_through_untrimmed() {
        assert_eq!(Fragment::from(" {\"a\"\n").text(), Some(" {\"a\"\n"));
    }
}
