//! Wikidata performer fallback: entity search, P175 claims, English labels.

use std::collections::HashMap;

use log::{debug, warn};
use serde_json::Value;

use crate::credits::CreditCategory;
use crate::http::{request_url, HttpFetcher, SourceId};
use crate::matching::{best_index, score_text_match};

use super::{json_array, json_str, SourceCredits};

pub(crate) const API_URL: &str = "https://www.wikidata.org/w/api.php";
const ENTITY_DATA_BASE: &str = "https://www.wikidata.org/wiki/Special:EntityData/";
const PERFORMER_PROPERTY: &str = "P175";
const SEARCH_LIMIT: &str = "8";
const LABEL_BATCH_SIZE: usize = 50;
const TITLE_WEIGHT: f64 = 0.75;
const ARTIST_WEIGHT: f64 = 0.25;
const MIN_CANDIDATE_SCORE: f64 = 35.0;
pub const PERFORMER_ROLE: &str = "Performer (Wikidata)";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    title_label: String,
    performer_ids: Vec<String>,
}

/// Linked entity ids of `property` claims, deduplicated in claim order.
fn claim_entity_ids(entity: &Value, property: &str) -> Vec<String> {
    let mut ids = Vec::<String>::new();
    for claim in json_array(&entity["claims"][property]) {
        let Some(id) = json_str(&claim["mainsnak"]["datavalue"]["value"]["id"]) else {
            continue;
        };
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

fn english_label(entity: &Value) -> Option<&str> {
    json_str(&entity["labels"]["en"]["value"])
}

fn load_candidate(fetcher: &HttpFetcher, item: &Value) -> Option<Candidate> {
    let qid = json_str(&item["id"])?;
    let url = format!("{ENTITY_DATA_BASE}{}.json", urlencoding::encode(qid));
    let document = match fetcher.request(&url, SourceId::Wikidata) {
        Ok(document) => document,
        Err(err) => {
            debug!("Wikidata entity {} unavailable: {}", qid, err);
            return None;
        }
    };

    let entity = &document["entities"][qid];
    let performer_ids = claim_entity_ids(entity, PERFORMER_PROPERTY);
    if performer_ids.is_empty() {
        return None;
    }

    let title_label = english_label(entity)
        .or_else(|| json_str(&item["label"]))
        .unwrap_or_default()
        .to_string();
    Some(Candidate {
        title_label,
        performer_ids,
    })
}

fn labels_by_qid(fetcher: &HttpFetcher, qids: &[String]) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    for chunk in qids.chunks(LABEL_BATCH_SIZE) {
        let ids = chunk.join("|");
        let url = request_url(
            API_URL,
            &[
                ("action", "wbgetentities"),
                ("ids", &ids),
                ("props", "labels"),
                ("languages", "en"),
                ("format", "json"),
            ],
        );
        let response = match fetcher.request(&url, SourceId::Wikidata) {
            Ok(response) => response,
            Err(err) => {
                warn!("Wikidata label lookup failed: {}", err);
                continue;
            }
        };
        let Some(entities) = response["entities"].as_object() else {
            continue;
        };
        for (qid, entity) in entities {
            if let Some(label) = english_label(entity) {
                labels.insert(qid.clone(), label.to_string());
            }
        }
    }
    labels
}

pub fn fetch(fetcher: &HttpFetcher, artist: &str, title: &str) -> SourceCredits {
    let mut result = SourceCredits::default();

    let search_url = request_url(
        API_URL,
        &[
            ("action", "wbsearchentities"),
            ("search", title),
            ("language", "en"),
            ("type", "item"),
            ("limit", SEARCH_LIMIT),
            ("format", "json"),
        ],
    );
    let search = match fetcher.request(&search_url, SourceId::Wikidata) {
        Ok(search) => search,
        Err(err) => {
            warn!("Wikidata search failed: {}", err);
            return result;
        }
    };

    let candidates: Vec<Candidate> = json_array(&search["search"])
        .iter()
        .filter_map(|item| load_candidate(fetcher, item))
        .collect();
    if candidates.is_empty() {
        return result;
    }

    let mut all_ids = Vec::<String>::new();
    for id in candidates.iter().flat_map(|candidate| &candidate.performer_ids) {
        if !all_ids.contains(id) {
            all_ids.push(id.clone());
        }
    }
    let labels = labels_by_qid(fetcher, &all_ids);
    if labels.is_empty() {
        return result;
    }

    let best = best_index(&candidates, |candidate| {
        let title_score = f64::from(score_text_match(title, &candidate.title_label));
        let artist_score = candidate
            .performer_ids
            .iter()
            .filter_map(|id| labels.get(id))
            .map(|label| score_text_match(artist, label))
            .max()
            .unwrap_or(0);
        Some(title_score * TITLE_WEIGHT + f64::from(artist_score) * ARTIST_WEIGHT)
    });
    let Some((index, score)) = best.filter(|(_, score)| *score >= MIN_CANDIDATE_SCORE) else {
        debug!("No Wikidata candidate for {:?} scored at least {}", title, MIN_CANDIDATE_SCORE);
        return result;
    };
    debug!("Wikidata picked {:?} with score {:.1}", candidates[index].title_label, score);

    for id in &candidates[index].performer_ids {
        if let Some(label) = labels.get(id) {
            result
                .categories
                .append_unique(CreditCategory::Performers, label, PERFORMER_ROLE);
        }
    }
    result
}
