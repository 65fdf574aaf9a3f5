use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Business category a gallery belongs to.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, AsRefStr, PartialEq, Eq,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Niche {
    Plumber,
    Hvac,
    Movers,
    Contractor,
    Cleaning,
    Seasonal,
    WhiteLabel,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, AsRefStr, PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    En,
    Es,
}

/// Rhetorical framing of the generated cards.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, AsRefStr, PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CtaType {
    Urgency,
    Trust,
    Value,
}

/// Tags derived from a Gamma page URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrlMetadata {
    pub niche: Niche,
    pub language: Language,
    pub business_name: String,
    pub cta_type: CtaType,
    pub fomo_score: i16,
    pub utm_campaign: String,
}

impl UrlMetadata {
    /// Business name as used in storage file names ("Coolfix Fresno" -> "coolfix-fresno").
    pub fn slug(&self) -> String {
        self.business_name.to_lowercase().replace(' ', "-")
    }
}

/// One URL to migrate, with its correlation id.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationTask {
    pub source_url: String,
    pub trace_id: String,
    pub metadata: UrlMetadata,
}
