use crate::domain::report::SectorCategory;

const AI_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    " ai ",
    "neural",
    "generative",
    "data analytics",
];
// Leading space keeps "biotechnology" out of tech.
const TECH_KEYWORDS: &[&str] = &[
    " technology",
    "software",
    "semiconductor",
    "internet",
    "computer",
];
const MEDICAL_KEYWORDS: &[&str] = &[
    "health",
    "medical",
    "biotech",
    "pharma",
    "drug",
    "therapeutic",
    "diagnostic",
];
const INTERNATIONAL_KEYWORDS: &[&str] = &["adr", "international", "global", "foreign"];

/// Maps provider sector/industry text to a focus category. First match wins, so AI
/// beats tech when both appear.
pub fn classify(sector: Option<&str>, industry: Option<&str>) -> SectorCategory {
    let sector = sector.unwrap_or("Unknown");
    let industry = industry.unwrap_or("Unknown");
    // Padded so " ai " matches at either end.
    let haystack = format!(" {} {} ", sector, industry).to_lowercase();

    let table: [(&[&str], SectorCategory); 4] = [
        (AI_KEYWORDS, SectorCategory::Ai),
        (TECH_KEYWORDS, SectorCategory::Tech),
        (MEDICAL_KEYWORDS, SectorCategory::Medical),
        (INTERNATIONAL_KEYWORDS, SectorCategory::International),
    ];

    table
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| haystack.contains(kw)))
        .map(|(_, category)| *category)
        .unwrap_or(SectorCategory::Other)
}
