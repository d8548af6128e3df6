//! MusicBrainz: recording search, recording relations and one linked work.

use log::{debug, warn};
use serde_json::Value;

use crate::categorize::{mb_categorize, mb_instrumentation_role, mb_role};
use crate::credits::{CategoryMap, CreditCategory};
use crate::http::{request_url, HttpFetcher, SourceId};
use crate::matching::{best_index, score_text_match};
use crate::text::extract_year;

use super::{json_array, json_str, SourceCredits};

pub(crate) const API_BASE: &str = "https://musicbrainz.org/ws/2/";
const SEARCH_LIMIT: &str = "5";
const RECORDING_INCLUDES: &str = "artist-credits+artist-rels+work-rels+instrument-rels";
const WORK_INCLUDES: &str = "artist-rels";
const TITLE_WEIGHT: f64 = 0.7;
const ARTIST_WEIGHT: f64 = 0.3;

/// Escapes a value for use inside a quoted Lucene phrase.
pub fn escape_phrase(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Joins an `artist-credit` array into its display form, e.g.
/// `"Daft Punk feat. Pharrell Williams"`.
pub fn format_artist_credit(credits: &[Value]) -> String {
    credits
        .iter()
        .map(|credit| {
            let name = credit_name(credit).unwrap_or_default();
            let join = credit["joinphrase"].as_str().unwrap_or_default();
            format!("{name}{join}")
        })
        .collect()
}

fn credit_name(credit: &Value) -> Option<&str> {
    credit["name"]
        .as_str()
        .or_else(|| credit["artist"]["name"].as_str())
}

fn pick_best_recording<'a>(recordings: &'a [Value], artist: &str, title: &str) -> Option<&'a Value> {
    let (index, score) = best_index(recordings, |recording| {
        json_str(&recording["id"])?;
        let recording_title = recording["title"].as_str().unwrap_or_default();
        let recording_artist = format_artist_credit(json_array(&recording["artist-credit"]));
        let title_score = f64::from(score_text_match(title, recording_title));
        let artist_score = f64::from(score_text_match(artist, &recording_artist));
        Some(title_score * TITLE_WEIGHT + artist_score * ARTIST_WEIGHT)
    })?;
    debug!("MusicBrainz best recording index {} scored {:.1}", index, score);
    recordings.get(index)
}

fn apply_relations(categories: &mut CategoryMap, relations: &[Value]) {
    for relation in relations {
        let Some(name) = relation["artist"]["name"].as_str() else {
            continue;
        };
        let relation_type = relation["type"].as_str().unwrap_or_default();
        let category = mb_categorize(relation_type, relation);
        categories.append_unique(category, name, &mb_role(relation));

        let instrumentation = mb_instrumentation_role(relation);
        if !instrumentation.is_empty() {
            categories.append_unique(CreditCategory::Performers, name, &instrumentation);
        }
    }
}

fn performance_work_id(relations: &[Value]) -> Option<&str> {
    relations
        .iter()
        .filter(|relation| relation["type"].as_str() == Some("performance"))
        .find_map(|relation| json_str(&relation["work"]["id"]))
}

pub fn fetch(fetcher: &HttpFetcher, artist: &str, title: &str) -> SourceCredits {
    let mut result = SourceCredits::default();

    let query = format!(
        "recording:\"{}\" AND artist:\"{}\"",
        escape_phrase(title),
        escape_phrase(artist)
    );
    let search_url = request_url(
        &format!("{API_BASE}recording/"),
        &[("query", &query), ("fmt", "json"), ("limit", SEARCH_LIMIT)],
    );
    let search = match fetcher.request(&search_url, SourceId::MusicBrainz) {
        Ok(search) => search,
        Err(err) => {
            warn!("MusicBrainz search failed: {}", err);
            return result;
        }
    };

    let recordings = json_array(&search["recordings"]);
    let Some(recording) = pick_best_recording(recordings, artist, title) else {
        debug!("MusicBrainz returned no usable recordings for {:?}", title);
        return result;
    };
    let Some(recording_id) = json_str(&recording["id"]) else {
        return result;
    };

    result.title = recording["title"].as_str().unwrap_or_default().to_string();
    if let Some(date) = json_str(&recording["first-release-date"]) {
        result.year = extract_year(date);
    }

    let artist_credit = json_array(&recording["artist-credit"]);
    if !artist_credit.is_empty() {
        result.artist = format_artist_credit(artist_credit);
        for credit in artist_credit {
            result.categories.append_unique(
                CreditCategory::Performers,
                credit_name(credit).unwrap_or_default(),
                "Primary artist",
            );
        }
    }

    let detail_url = format!(
        "{API_BASE}recording/{}?inc={RECORDING_INCLUDES}&fmt=json",
        urlencoding::encode(recording_id)
    );
    let detail = match fetcher.request(&detail_url, SourceId::MusicBrainz) {
        Ok(detail) => detail,
        Err(err) => {
            warn!("MusicBrainz recording detail failed for {}: {}", recording_id, err);
            return result;
        }
    };

    let relations = json_array(&detail["relations"]);
    apply_relations(&mut result.categories, relations);

    // One work carries the songwriting credits; further works are ignored.
    if let Some(work_id) = performance_work_id(relations) {
        let work_url = format!(
            "{API_BASE}work/{}?inc={WORK_INCLUDES}&fmt=json",
            urlencoding::encode(work_id)
        );
        match fetcher.request(&work_url, SourceId::MusicBrainz) {
            Ok(work) => apply_relations(&mut result.categories, json_array(&work["relations"])),
            Err(err) => warn!("MusicBrainz work lookup failed for {}: {}", work_id, err),
        }
    }

    result
}
