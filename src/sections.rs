//! Label classification and the sticky "current section" scan.

use crate::config::CategoryKeywords;
use crate::schema::SemanticCategory;

/// First category whose keyword is contained in the upper-cased label.
pub fn classify_label(label: &str, keywords: &CategoryKeywords) -> Option<SemanticCategory> {
    let upper = label.to_uppercase();
    SemanticCategory::MATCH_ORDER.into_iter().find(|category| {
        keywords
            .for_category(*category)
            .iter()
            .any(|keyword| upper.contains(&keyword.to_uppercase()))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Labelled row with no value in any month column.
    Banner,
    Metric,
}

/// State of the row walk: which section, if any, unmatched labels fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionState {
    #[default]
    Idle,
    Active(SemanticCategory),
}

impl SectionState {
    pub fn category(&self) -> SemanticCategory {
        match self {
            SectionState::Idle => SemanticCategory::Unclassified,
            SectionState::Active(category) => *category,
        }
    }

    /// Advances the scan by one labelled row.
    ///
    /// A label that matches a keyword is classified by it and becomes the
    /// active section. A label that matches nothing inherits the active
    /// section and leaves it unchanged, whether it is a banner or a metric.
    pub fn step(
        self,
        label: &str,
        kind: RowKind,
        keywords: &CategoryKeywords,
    ) -> (SectionState, SemanticCategory) {
        match classify_label(label, keywords) {
            Some(category) => (SectionState::Active(category), category),
            None => {
                if kind == RowKind::Banner {
                    log::debug!(
                        "Banner '{}' matches no category; keeping section {}",
                        label,
                        self.category()
                    );
                }
                (self, self.category())
            }
        }
    }
}
