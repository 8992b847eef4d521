use crate::error::AppError;
use crate::models::{Field, NOT_SPECIFIED, Record};
use crate::profile::{FieldSelectors, InclusionFilter, SiteProfile};
use crate::traits::DocumentExtractor;

/// What to do with a candidate whose identity field could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentinelIdentity {
    /// Keep it under the [`NOT_SPECIFIED`] identity. Every unnamed candidate
    /// then shares one store entry.
    #[default]
    Collapse,
    /// Drop it.
    Reject,
}

/// Outcome of reading one detail document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Candidate(Record),
    /// The inclusion filter rejected the document.
    Filtered,
    /// The identity was missing and the policy is [`SentinelIdentity::Reject`].
    Unidentified,
}

/// Reads a [`Record`] out of a detail document.
///
/// Field lookups are total: a missing or blank element yields
/// [`NOT_SPECIFIED`]. Errors only come from the document extractor itself,
/// e.g. a descriptor it cannot compile.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    fields: FieldSelectors,
    filter: Option<InclusionFilter>,
    sentinel: SentinelIdentity,
}

impl RecordExtractor {
    pub fn new(fields: FieldSelectors, filter: Option<InclusionFilter>) -> Self {
        Self {
            fields,
            filter,
            sentinel: SentinelIdentity::default(),
        }
    }

    pub fn from_profile(profile: &SiteProfile) -> Self {
        Self::new(profile.fields.clone(), profile.filter.clone())
    }

    pub fn with_sentinel_policy(mut self, sentinel: SentinelIdentity) -> Self {
        self.sentinel = sentinel;
        self
    }

    pub fn extract<D: DocumentExtractor>(
        &self,
        extractor: &D,
        document: &D::Document,
    ) -> Result<Extraction, AppError> {
        if let Some(filter) = &self.filter {
            let matches = extractor.find_all(document, &filter.selector)?;
            if !filter.accepts(&matches) {
                return Ok(Extraction::Filtered);
            }
        }

        let mut record = Record::new(NOT_SPECIFIED);
        for field in Field::ALL {
            record.set(field, self.field_value(extractor, document, field)?);
        }

        if record.has_sentinel_identity() {
            match self.sentinel {
                SentinelIdentity::Reject => return Ok(Extraction::Unidentified),
                SentinelIdentity::Collapse => {
                    tracing::warn!(
                        title = %record.title,
                        "Identity missing, storing under '{NOT_SPECIFIED}'"
                    );
                }
            }
        }

        Ok(Extraction::Candidate(record))
    }

    fn field_value<D: DocumentExtractor>(
        &self,
        extractor: &D,
        document: &D::Document,
        field: Field,
    ) -> Result<String, AppError> {
        let value = extractor
            .find(document, self.fields.get(field))?
            .and_then(|el| clean_text(&el.text));
        Ok(value.unwrap_or_else(|| NOT_SPECIFIED.to_string()))
    }
}

/// Trimmed text, or `None` when nothing but whitespace is left.
pub(crate) fn clean_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
