//! URL classification.
//!
//! Derives niche, language, business name and call-to-action framing from a
//! Gamma page URL. Matching is keyword-based on the lowercased URL and the
//! first matching rule wins, so the rule tables are ordered by priority.

use crate::models::metadata::{CtaType, Language, Niche, UrlMetadata};

const NICHE_RULES: &[(&[&str], Niche)] = &[
    (&["plumb", "drain", "clog"], Niche::Plumber),
    (&["hvac", "cool", "heat"], Niche::Hvac),
    (&["mover", "moving", "piano"], Niche::Movers),
    (&["paint", "contractor"], Niche::Contractor),
    (&["clean", "maid"], Niche::Cleaning),
    (&["tamale", "sale", "weekend"], Niche::Seasonal),
];

/// Matched as a whole host token only.
const HVAC_TOKEN: &str = "ac";

const SPANISH_MARKERS: &[&str] = &["mudanza", "servicio"];

const CTA_RULES: &[(&[&str], CtaType, i16)] = &[
    (&["stress", "emergency", "urgent"], CtaType::Urgency, 9),
    (&["cool", "heat", "sale"], CtaType::Urgency, 8),
    (&["reliable", "trust", "family"], CtaType::Trust, 7),
];

const DEFAULT_FOMO_SCORE: i16 = 6;
const FALLBACK_BUSINESS_NAME: &str = "Gamma Business";

/// Classify a URL. Never fails: unmatched URLs fall through to defaults.
pub fn extract_metadata(url: &str) -> UrlMetadata {
    let lower = url.to_lowercase();

    let niche = classify_niche(&lower);
    let language = if contains_any(&lower, SPANISH_MARKERS) {
        Language::Es
    } else {
        Language::En
    };
    let (cta_type, fomo_score) = CTA_RULES
        .iter()
        .find(|(keywords, _, _)| contains_any(&lower, keywords))
        .map(|(_, cta, score)| (*cta, *score))
        .unwrap_or((CtaType::Value, DEFAULT_FOMO_SCORE));

    UrlMetadata {
        niche,
        language,
        business_name: business_name(url),
        cta_type,
        fomo_score,
        utm_campaign: format!("{}_{}_test", niche, cta_type),
    }
}

fn classify_niche(lower: &str) -> Niche {
    for (keywords, niche) in NICHE_RULES {
        if contains_any(lower, keywords) {
            return *niche;
        }
        if *niche == Niche::Hvac && has_token(lower, HVAC_TOKEN) {
            return Niche::Hvac;
        }
    }
    Niche::WhiteLabel
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn has_token(haystack: &str, token: &str) -> bool {
    haystack
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|part| part == token)
}

/// First host label, dashes to spaces, title-cased.
fn business_name(url: &str) -> String {
    let host = url.split("//").nth(1).unwrap_or(url);
    let label = host.split(['.', '/']).next().unwrap_or_default();
    let name = title_case(&label.replace('-', " "));
    let name = name.trim();

    if name.is_empty() {
        FALLBACK_BUSINESS_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Upper-cases a letter that follows a non-letter, lower-cases the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
