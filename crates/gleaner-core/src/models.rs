use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder stored for any field that could not be extracted.
pub const NOT_SPECIFIED: &str = "Not specified";

fn not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

/// One harvested record.
///
/// The column set and its order are fixed: the serde renames are the CSV
/// headers, and field declaration order is the column order on disk. Missing
/// columns in an existing file deserialize to [`NOT_SPECIFIED`], so every
/// record always carries the complete field set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identity field.
    #[serde(rename = "Company Name", default = "not_specified")]
    pub company: String,
    #[serde(rename = "Job Title", default = "not_specified")]
    pub title: String,
    #[serde(rename = "Job Description", default = "not_specified")]
    pub description: String,
    #[serde(rename = "Skills Required", default = "not_specified")]
    pub skills: String,
}

impl Record {
    /// A record with the given identity and every payload field unspecified.
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            title: not_specified(),
            description: not_specified(),
            skills: not_specified(),
        }
    }

    pub fn key(&self) -> &str {
        &self.company
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Company => &self.company,
            Field::Title => &self.title,
            Field::Description => &self.description,
            Field::Skills => &self.skills,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Company => self.company = value,
            Field::Title => self.title = value,
            Field::Description => self.description = value,
            Field::Skills => self.skills = value,
        }
    }

    /// True when the identity field fell back to [`NOT_SPECIFIED`].
    pub fn has_sentinel_identity(&self) -> bool {
        self.company == NOT_SPECIFIED
    }
}

/// The columns of a [`Record`], in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Company,
    Title,
    Description,
    Skills,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::Company,
        Field::Title,
        Field::Description,
        Field::Skills,
    ];

    /// Column header used in durable storage.
    pub fn header(&self) -> &'static str {
        match self {
            Field::Company => "Company Name",
            Field::Title => "Job Title",
            Field::Description => "Job Description",
            Field::Skills => "Skills Required",
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Field::Company)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}
