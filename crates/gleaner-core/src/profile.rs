//! Site profile: every site-specific descriptor the crawler and the record
//! extractor need, loaded from JSON.
//!
//! Fields left out of a profile file fall back to [`SiteProfile::default`],
//! which describes the job-search listing Gleaner was first written for.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::Element;
use crate::error::AppError;
use crate::models::Field;
use crate::selector::ElementSelector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Listing to start from. The CLI may override it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,

    /// Present once a listing page is usable.
    pub listing_ready: ElementSelector,

    /// One per item on a listing page.
    pub item_card: ElementSelector,

    /// The detail link inside a card.
    pub item_link: ElementSelector,

    /// Attribute of `item_link` holding the detail URL.
    pub link_attribute: String,

    /// Element inside a card whose text equals the record identity. When set,
    /// already collected items are skipped without visiting their detail page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_identity: Option<ElementSelector>,

    /// Present once a detail page is usable.
    pub detail_ready: ElementSelector,

    /// The pagination control leading to the next listing page.
    pub next_page: ElementSelector,

    pub fields: FieldSelectors,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<InclusionFilter>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginProfile>,
}

/// Where each record field is read from on a detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelectors {
    pub company: ElementSelector,
    pub title: ElementSelector,
    pub description: ElementSelector,
    pub skills: ElementSelector,
}

impl FieldSelectors {
    pub fn get(&self, field: Field) -> &ElementSelector {
        match field {
            Field::Company => &self.company,
            Field::Title => &self.title,
            Field::Description => &self.description,
            Field::Skills => &self.skills,
        }
    }
}

fn default_filter_index() -> usize {
    1
}

/// Accepts a detail page when the `index`-th element (0-based) matching
/// `selector` contains `contains`. Fewer matches than that rejects the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionFilter {
    pub selector: ElementSelector,
    #[serde(default = "default_filter_index")]
    pub index: usize,
    pub contains: String,
}

impl InclusionFilter {
    pub fn accepts(&self, matches: &[Element]) -> bool {
        matches
            .get(self.index)
            .is_some_and(|el| el.text.contains(&self.contains))
    }
}

/// Sign-in form description, used before the crawl starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProfile {
    pub url: String,
    /// Control to click on `url` before the form shows up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_control: Option<ElementSelector>,
    pub username_field: ElementSelector,
    pub password_field: ElementSelector,
    pub submit: ElementSelector,
    /// Present once the session is established.
    pub ready: ElementSelector,
}

impl Default for SiteProfile {
    fn default() -> Self {
        let card = ElementSelector::tag("li").with_class(
            "ember-view jobs-search-results__list-item occludable-update p0 relative scaffold-layout__list-item",
        );
        Self {
            listing_url: None,
            listing_ready: card.clone(),
            item_card: card,
            item_link: ElementSelector::tag("a").with_class(
                "disabled ember-view job-card-container__link job-card-list__title job-card-list__title--link",
            ),
            link_attribute: "href".to_string(),
            card_identity: Some(
                ElementSelector::default().with_class("job-card-container__primary-description"),
            ),
            detail_ready: ElementSelector::default().with_class("job-view-layout jobs-details"),
            next_page: ElementSelector::tag("button").with_attr("aria-label", "View next page"),
            fields: FieldSelectors {
                company: ElementSelector::tag("div")
                    .with_class("job-details-jobs-unified-top-card__company-name"),
                title: ElementSelector::tag("div")
                    .with_class("display-flex justify-space-between flex-wrap mt2"),
                description: ElementSelector::tag("li").with_class(
                    "job-details-jobs-unified-top-card__job-insight job-details-jobs-unified-top-card__job-insight--highlight",
                ),
                skills: ElementSelector::tag("button")
                    .with_class("job-details-jobs-unified-top-card__job-insight-text-button"),
            },
            filter: Some(InclusionFilter {
                selector: ElementSelector::tag("div").with_class("tvm__text tvm__text--low-emphasis"),
                index: 1,
                contains: "Hyderabad".to_string(),
            }),
            login: Some(LoginProfile {
                url: "https://www.linkedin.com/".to_string(),
                open_control: Some(
                    ElementSelector::default()
                        .with_class("nav__button-secondary btn-md btn-secondary-emphasis"),
                ),
                username_field: ElementSelector::tag("input").with_attr("id", "username"),
                password_field: ElementSelector::tag("input").with_attr("id", "password"),
                submit: ElementSelector::default()
                    .with_class("btn__primary--large from__button--floating"),
                ready: ElementSelector::default().with_attr("id", "global-nav"),
            }),
        }
    }
}

impl SiteProfile {
    /// Read and validate a profile from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read profile {}: {e}", path.display()))
        })?;
        let profile: SiteProfile = serde_json::from_str(&raw).map_err(|e| {
            AppError::ConfigError(format!("Invalid JSON in profile {}: {e}", path.display()))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reject descriptors that would match every element, and empty values
    /// the crawl cannot work with.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut required: Vec<(&str, &ElementSelector)> = vec![
            ("listing_ready", &self.listing_ready),
            ("item_card", &self.item_card),
            ("item_link", &self.item_link),
            ("detail_ready", &self.detail_ready),
            ("next_page", &self.next_page),
            ("fields.company", &self.fields.company),
            ("fields.title", &self.fields.title),
            ("fields.description", &self.fields.description),
            ("fields.skills", &self.fields.skills),
        ];
        if let Some(card_identity) = &self.card_identity {
            required.push(("card_identity", card_identity));
        }
        if let Some(filter) = &self.filter {
            required.push(("filter.selector", &filter.selector));
            if filter.contains.is_empty() {
                return Err(AppError::ConfigError(
                    "filter.contains must not be empty".into(),
                ));
            }
        }
        if let Some(login) = &self.login {
            required.push(("login.username_field", &login.username_field));
            required.push(("login.password_field", &login.password_field));
            required.push(("login.submit", &login.submit));
            required.push(("login.ready", &login.ready));
            if let Some(open) = &login.open_control {
                required.push(("login.open_control", open));
            }
        }

        if let Some((name, _)) = required.iter().find(|(_, sel)| sel.is_empty()) {
            return Err(AppError::ConfigError(format!(
                "Selector '{name}' must name a tag, class or attribute"
            )));
        }
        if self.link_attribute.trim().is_empty() {
            return Err(AppError::ConfigError(
                "link_attribute must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The listing to crawl: `override_url` wins over the profile's own.
    pub fn resolve_listing_url(&self, override_url: Option<&str>) -> Result<String, AppError> {
        override_url
            .or(self.listing_url.as_deref())
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::ConfigError(
                    "No listing URL: set listing_url in the profile or pass --url".into(),
                )
            })
    }
}
