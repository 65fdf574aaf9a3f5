use crate::models::metadata::{CtaType, UrlMetadata};

/// Build the generation prompt for a URL. Metadata is interpolated as-is.
pub fn build_prompt(url: &str, metadata: &UrlMetadata) -> String {
    let (theme, style, elements, colors) = match metadata.cta_type {
        CtaType::Urgency => (
            "urgency",
            "Urgency-focused with red/orange CTAs",
            r#""Slots filling fast!", "Call NOW!", "Limited time", emergency contact"#,
            "Red (#EF4444) and orange (#F97316) accents",
        ),
        CtaType::Trust => (
            "trust",
            "Trust-focused with blue/green CTAs",
            r#""Licensed & Insured", "5+ years experience", "3,500+ families served""#,
            "Blue (#3B82F6) and green (#10B981) accents",
        ),
        CtaType::Value => (
            "value",
            "Value-focused with savings and benefits",
            r#""$99 special", "Save $180/year", "Free estimate", service benefits"#,
            "Blue (#3B82F6) and purple (#8B5CF6) accents",
        ),
    };

    format!(
        "Recreate from {url}: 5 square PNG ad cards (1080x1080) with {theme} theme.\n\n\
         Business: {name} ({niche} services)\n\
         Style: {style}\n\
         Elements: {elements}\n\
         Colors: {colors}\n\
         Format: 5 individual PNG files, high quality, mobile-optimized",
        name = metadata.business_name,
        niche = metadata.niche,
    )
}
