//! Keyword classification of provider role strings into credit categories.
//!
//! Categories are checked in a fixed order (Production, Engineering,
//! Songwriting, Performers) and the first keyword hit wins, so terms such as
//! "programming" land in Engineering even though they also read as playing.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::credits::CreditCategory;
use crate::text::upper_first;

type KeywordMap = [(CreditCategory, &'static [&'static str]); 4];

const MUSICBRAINZ_KEYWORDS: KeywordMap = [
    (
        CreditCategory::Production,
        &["producer", "co-producer", "executive producer"],
    ),
    (
        CreditCategory::Engineering,
        &[
            "engineer",
            "sound",
            "audio",
            "recording",
            "mix",
            "mastering",
            "balance",
            "editor",
            "programming",
        ],
    ),
    (
        CreditCategory::Songwriting,
        &[
            "composer",
            "lyricist",
            "writer",
            "songwriter",
            "librettist",
            "arranger",
            "orchestrator",
        ],
    ),
    (
        CreditCategory::Performers,
        &[
            "performer",
            "vocal",
            "performing orchestra",
            "conductor",
            "chorus master",
            "concertmaster",
            "instrument",
            "guitar",
            "bass guitar",
            "bass",
            "banjo",
            "ukulele",
            "mandolin",
            "lute",
            "sitar",
            "violin",
            "viola",
            "cello",
            "double bass",
            "harp",
            "dulcimer",
            "piano",
            "keyboard",
            "organ",
            "synthesizer",
            "synth",
            "harpsichord",
            "accordion",
            "melodica",
            "flute",
            "oboe",
            "clarinet",
            "bassoon",
            "saxophone",
            "sax",
            "trumpet",
            "trombone",
            "french horn",
            "tuba",
            "harmonica",
            "recorder",
            "piccolo",
            "cornet",
            "flugelhorn",
            "drums",
            "drum",
            "percussion",
            "timpani",
            "xylophone",
            "marimba",
            "vibraphone",
            "congas",
            "bongos",
            "tabla",
            "djembe",
            "tambourine",
            "cajon",
            "turntables",
            "dj",
            "beatbox",
            "sampler",
            "backing",
            "lead",
            "rhythm",
            "chorus",
            "choir",
            "strings",
            "horns",
            "orchestra",
            "solo",
            "featuring",
            "rap",
            "mc",
        ],
    ),
];

const DISCOGS_KEYWORDS: KeywordMap = [
    (
        CreditCategory::Production,
        &["producer", "produced", "executive"],
    ),
    (
        CreditCategory::Engineering,
        &[
            "engineer",
            "mixed",
            "mastered",
            "recorded",
            "technician",
            "programming",
            "edited",
        ],
    ),
    (
        CreditCategory::Songwriting,
        &[
            "written",
            "composed",
            "lyrics",
            "songwriter",
            "music by",
            "arranged",
            "orchestrated",
            "adapted",
        ],
    ),
    (
        CreditCategory::Performers,
        &[
            "vocals",
            "voice",
            "singing",
            "rap",
            "mc",
            "spoken",
            "guitar",
            "bass guitar",
            "bass",
            "banjo",
            "ukulele",
            "mandolin",
            "lute",
            "sitar",
            "dulcimer",
            "piano",
            "keyboard",
            "organ",
            "synthesizer",
            "synth",
            "harpsichord",
            "accordion",
            "melodica",
            "wurlitzer",
            "rhodes",
            "clavinet",
            "violin",
            "viola",
            "cello",
            "double bass",
            "harp",
            "string",
            "saxophone",
            "sax",
            "trumpet",
            "trombone",
            "flute",
            "oboe",
            "clarinet",
            "bassoon",
            "french horn",
            "tuba",
            "harmonica",
            "recorder",
            "piccolo",
            "cornet",
            "flugelhorn",
            "drums",
            "drum",
            "percussion",
            "timpani",
            "xylophone",
            "marimba",
            "vibraphone",
            "congas",
            "bongos",
            "tabla",
            "djembe",
            "tambourine",
            "cajon",
            "cowbell",
            "turntables",
            "dj",
            "beatbox",
            "sampler",
            "horns",
            "horn",
            "brass",
            "woodwind",
            "choir",
            "orchestra",
            "backing",
            "lead",
            "rhythm",
            "solo",
            "featuring",
            "feat",
            "with",
            "additional",
            "instrument",
            "performer",
            "conductor",
            "concertmaster",
        ],
    ),
];

const PERFORMER_NEEDLES: &[&str] = &[
    "vocal",
    "voice",
    "singer",
    "perform",
    "instrument",
    "guitar",
    "bass",
    "drum",
    "percussion",
    "piano",
    "keyboard",
    "synth",
    "violin",
    "viola",
    "cello",
    "sax",
    "trumpet",
    "trombone",
    "flute",
    "clarinet",
    "harp",
    "banjo",
    "ukulele",
    "dj",
    "turntables",
    "choir",
    "chorus",
    "orchestra",
    "conductor",
];

static ROLE_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[,;/]\s*").expect("static role segment pattern"));

fn keyword_category(map: &KeywordMap, role: &str) -> Option<CreditCategory> {
    let lowered = role.to_lowercase();
    map.iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(category, _)| *category)
}

fn join_unique(parts: Vec<String>) -> String {
    let mut unique: Vec<String> = Vec::with_capacity(parts.len());
    for part in parts {
        if !unique.contains(&part) {
            unique.push(part);
        }
    }
    unique.join(", ")
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|text| !text.is_empty())
}

fn attributes(relation: &Value) -> &[Value] {
    relation["attributes"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn is_instrument_attribute(attribute: &Value) -> bool {
    attribute["type"]
        .as_str()
        .is_some_and(|kind| kind.to_lowercase().contains("instrument"))
}

/// Whether free text names a voice, an instrument or a performing role.
pub fn looks_like_performer_text(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    !lowered.is_empty() && PERFORMER_NEEDLES.iter().any(|needle| lowered.contains(needle))
}

/// Category for a MusicBrainz relation type, falling back to its attributes.
pub fn mb_categorize(relation_type: &str, relation: &Value) -> CreditCategory {
    if let Some(category) = keyword_category(&MUSICBRAINZ_KEYWORDS, relation_type) {
        return category;
    }

    let performs = attributes(relation).iter().any(|attribute| match attribute {
        Value::Object(_) => is_instrument_attribute(attribute),
        Value::String(text) => looks_like_performer_text(text),
        _ => false,
    });
    if performs {
        CreditCategory::Performers
    } else {
        CreditCategory::Other
    }
}

/// Category for a Discogs free-text role.
pub fn dc_categorize(role: &str) -> CreditCategory {
    keyword_category(&DISCOGS_KEYWORDS, role).unwrap_or(CreditCategory::Other)
}

/// Display role for a MusicBrainz relation: its attributes when present,
/// otherwise the relation type.
pub fn mb_role(relation: &Value) -> String {
    let parts: Vec<String> = attributes(relation)
        .iter()
        .filter_map(|attribute| match attribute {
            Value::String(text) if !text.trim().is_empty() => Some(upper_first(text)),
            Value::Object(_) => non_empty_str(&attribute["value"])
                .or_else(|| non_empty_str(&attribute["name"]))
                .or_else(|| non_empty_str(&attribute["type"]))
                .map(upper_first),
            _ => None,
        })
        .collect();
    if !parts.is_empty() {
        return join_unique(parts);
    }

    let relation_type = relation["type"].as_str().unwrap_or_default();
    upper_first(&relation_type.replace('-', " "))
}

/// Instrument/voice role implied by a MusicBrainz relation's attributes, or
/// an empty string.
pub fn mb_instrumentation_role(relation: &Value) -> String {
    let parts: Vec<String> = attributes(relation)
        .iter()
        .filter_map(|attribute| match attribute {
            Value::String(text) => {
                let clean = text.trim();
                looks_like_performer_text(clean).then(|| upper_first(clean))
            }
            Value::Object(_) if is_instrument_attribute(attribute) => {
                non_empty_str(&attribute["value"])
                    .or_else(|| non_empty_str(&attribute["name"]))
                    .or_else(|| non_empty_str(&attribute["type"]))
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(upper_first)
            }
            _ => None,
        })
        .collect();
    join_unique(parts)
}

/// Instrument/voice segments of a Discogs role such as
/// `"Guitar, Backing Vocals / Mixed By"`, or an empty string.
pub fn discogs_instrumentation_role(role: &str) -> String {
    let role = role.trim();
    if role.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = ROLE_SEGMENT_RE
        .split(role)
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && looks_like_performer_text(segment))
        .map(upper_first)
        .collect();
    join_unique(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_production_wins_over_performer_keywords() {
        assert_eq!(dc_categorize("Producer, Guitar"), CreditCategory::Production);
        assert_eq!(
            mb_categorize("producer, guitar", &Value::Null),
            CreditCategory::Production
        );
    }

    #[test]
    fn test_programming_resolves_to_engineering() {
        assert_eq!(mb_categorize("programming", &Value::Null), CreditCategory::Engineering);
        assert_eq!(dc_categorize("Programming"), CreditCategory::Engineering);
    }

    #[test]
    fn test_musicbrainz_relation_types() {
        assert_eq!(mb_categorize("composer", &Value::Null), CreditCategory::Songwriting);
        assert_eq!(mb_categorize("mix", &Value::Null), CreditCategory::Engineering);
        assert_eq!(mb_categorize("vocal", &Value::Null), CreditCategory::Performers);
        assert_eq!(mb_categorize("guitar", &Value::Null), CreditCategory::Performers);
        assert_eq!(mb_categorize("misc", &Value::Null), CreditCategory::Other);
    }

    #[test]
    fn test_musicbrainz_attribute_fallback() {
        let instrument_object = json!({"attributes": [{"type": "Instrument", "value": "clavinet"}]});
        assert_eq!(mb_categorize("misc", &instrument_object), CreditCategory::Performers);
        let instrument_text = json!({"attributes": ["lead vocals"]});
        assert_eq!(mb_categorize("misc", &instrument_text), CreditCategory::Performers);
        let unrelated = json!({"attributes": ["additional"]});
        assert_eq!(mb_categorize("misc", &unrelated), CreditCategory::Other);
    }

    #[test]
    fn test_discogs_roles() {
        assert_eq!(dc_categorize("Written-By"), CreditCategory::Songwriting);
        assert_eq!(dc_categorize("Mixed By"), CreditCategory::Engineering);
        assert_eq!(dc_categorize("Clavinet"), CreditCategory::Performers);
        assert_eq!(dc_categorize("Artwork"), CreditCategory::Other);
    }

    #[test]
    fn test_mb_role_prefers_attributes() {
        let relation = json!({
            "type": "instrument",
            "attributes": ["guitar", "Guitar", {"type": "x", "value": "lead"}]
        });
        assert_eq!(mb_role(&relation), "Guitar, Lead");
        assert_eq!(mb_role(&json!({"type": "co-producer"})), "Co producer");
        assert_eq!(mb_role(&json!({"type": "producer", "attributes": []})), "Producer");
    }

    #[test]
    fn test_mb_instrumentation_role() {
        let relation = json!({
            "type": "instrument",
            "attributes": [
                "lead vocals",
                "additional",
                {"type": "instrument", "value": "clavinet"},
                {"type": "instrument", "name": "Moog"},
                {"type": "other", "value": "ignored"}
            ]
        });
        assert_eq!(mb_instrumentation_role(&relation), "Lead vocals, Clavinet, Moog");
        assert_eq!(mb_instrumentation_role(&json!({"type": "producer"})), "");
    }

    #[test]
    fn test_discogs_instrumentation_role_splits_segments() {
        assert_eq!(
            discogs_instrumentation_role("Guitar, Backing Vocals / Mixed By; bass"),
            "Guitar, Backing Vocals, Bass"
        );
        assert_eq!(discogs_instrumentation_role("Mastered By"), "");
        assert_eq!(discogs_instrumentation_role("   "), "");
    }

    #[test]
    fn test_looks_like_performer_text() {
        assert!(looks_like_performer_text("Backing Vocals"));
        assert!(looks_like_performer_text("Drum Machine"));
        assert!(!looks_like_performer_text("Liner Notes"));
        assert!(!looks_like_performer_text("  "));
    }
}
