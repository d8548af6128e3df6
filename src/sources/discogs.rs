//! Discogs: release search, release credits and best-matching track credits.

use log::{debug, warn};
use serde_json::Value;

use crate::categorize::{dc_categorize, discogs_instrumentation_role};
use crate::credits::{CategoryMap, CreditCategory};
use crate::http::{request_url, HttpFetcher, SourceId};
use crate::matching::{best_index, score_text_match};
use crate::text::extract_year_value;

use super::{json_array, json_id, json_str, SourceCredits};

pub(crate) const API_BASE: &str = "https://api.discogs.com/";
const SEARCH_PAGE_SIZE: &str = "8";
const TITLE_WEIGHT: f64 = 0.65;
const ARTIST_WEIGHT: f64 = 0.35;
/// Below this title score no track-level credits are attached.
pub const TRACK_MATCH_THRESHOLD: u32 = 55;
const UNKNOWN_ROLE: &str = "Unknown Role";

fn pick_best_result<'a>(results: &'a [Value], artist: &str, title: &str) -> Option<&'a Value> {
    // Search results only carry "Artist - Release", so both sides score
    // against the same label.
    let (index, _) = best_index(results, |item| {
        json_id(&item["id"])?;
        let label = item["title"].as_str().unwrap_or_default();
        let title_score = f64::from(score_text_match(title, label));
        let artist_score = f64::from(score_text_match(artist, label));
        Some(title_score * TITLE_WEIGHT + artist_score * ARTIST_WEIGHT)
    })?;
    results.get(index)
}

/// Index of the best-scoring track, if its score reaches the threshold.
pub fn select_track(scores: &[Option<u32>]) -> Option<usize> {
    let (index, score) = best_index(scores, |score| score.map(f64::from))?;
    (score >= f64::from(TRACK_MATCH_THRESHOLD)).then_some(index)
}

fn pick_best_track<'a>(tracklist: &'a [Value], title: &str) -> Option<&'a Value> {
    let scores: Vec<Option<u32>> = tracklist
        .iter()
        .map(|track| json_str(&track["title"]).map(|track_title| score_text_match(title, track_title)))
        .collect();
    let index = select_track(&scores);
    if index.is_none() {
        debug!("No Discogs track matched {:?} closely enough", title);
    }
    tracklist.get(index?)
}

fn apply_extra_artists(categories: &mut CategoryMap, extra_artists: &[Value]) {
    for extra in extra_artists {
        let name = extra["name"].as_str().unwrap_or_default();
        let role = json_str(&extra["role"]).unwrap_or(UNKNOWN_ROLE);
        categories.append_unique(dc_categorize(role), name, role);

        let instrumentation = discogs_instrumentation_role(role);
        if !instrumentation.is_empty() {
            categories.append_unique(CreditCategory::Performers, name, &instrumentation);
        }
    }
}

fn apply_artists(categories: &mut CategoryMap, artists: &[Value], role: &str) {
    for artist in artists {
        categories.append_unique(
            CreditCategory::Performers,
            artist["name"].as_str().unwrap_or_default(),
            role,
        );
    }
}

pub fn fetch(fetcher: &HttpFetcher, artist: &str, title: &str) -> SourceCredits {
    let mut result = SourceCredits::default();

    let search_url = request_url(
        &format!("{API_BASE}database/search"),
        &[
            ("q", title),
            ("artist", artist),
            ("track", title),
            ("type", "release"),
            ("per_page", SEARCH_PAGE_SIZE),
        ],
    );
    let search = match fetcher.request(&search_url, SourceId::Discogs) {
        Ok(search) => search,
        Err(err) => {
            warn!("Discogs search failed: {}", err);
            return result;
        }
    };

    let Some(best) = pick_best_result(json_array(&search["results"]), artist, title) else {
        debug!("Discogs returned no usable releases for {:?}", title);
        return result;
    };
    let Some(release_id) = json_id(&best["id"]) else {
        return result;
    };

    let release_url = format!("{API_BASE}releases/{}", urlencoding::encode(&release_id));
    let release = match fetcher.request(&release_url, SourceId::Discogs) {
        Ok(release) => release,
        Err(err) => {
            warn!("Discogs release {} failed: {}", release_id, err);
            return result;
        }
    };

    result.year = extract_year_value(&release["year"]);
    if result.year.is_empty() {
        result.year = extract_year_value(&best["year"]);
    }

    apply_artists(&mut result.categories, json_array(&release["artists"]), "Release artist");
    apply_extra_artists(&mut result.categories, json_array(&release["extraartists"]));

    if let Some(track) = pick_best_track(json_array(&release["tracklist"]), title) {
        apply_artists(&mut result.categories, json_array(&track["artists"]), "Track artist");
        apply_extra_artists(&mut result.categories, json_array(&track["extraartists"]));
    }

    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::credits::CreditEntry;
    use crate::test_support::{token_config, ScriptedTransport, TestHarness};

    pub(crate) const TALKING_BOOK_SEARCH: &str = r#"{
        "results": [
            {"id": 111, "title": "Stevie Wonder - Superstition (Remix)", "year": "1990"},
            {"id": 249504, "title": "Stevie Wonder - Superstition", "year": "1972"}
        ]
    }"#;

    pub(crate) const TALKING_BOOK_RELEASE: &str = r#"{
        "id": 249504,
        "year": 1972,
        "artists": [{"name": "Stevie Wonder"}],
        "extraartists": [
            {"name": "Robert Margouleff", "role": "Producer, Programmed By"},
            {"name": "Malcolm Cecil", "role": "Engineer"},
            {"name": "Trevor Laurence", "role": "Tenor Saxophone"},
            {"name": "Anon", "role": ""}
        ],
        "tracklist": [
            {"title": "You Are The Sunshine Of My Life"},
            {"title": "Superstition",
             "extraartists": [
                {"name": "Steve Madaio", "role": "Trumpet"},
                {"name": "Stevie Wonder", "role": "Written-By"}
             ]}
        ]
    }"#;

    fn release_with_tracks(tracklist: &str) -> String {
        format!(
            r#"{{"id": 5, "artists": [{{"name": "Stevie Wonder"}}], "tracklist": {tracklist}}}"#
        )
    }

    fn harness_for(release: &str) -> TestHarness {
        let transport = ScriptedTransport::default()
            .route_json("database/search?", TALKING_BOOK_SEARCH)
            .route_json("releases/", release);
        TestHarness::from_transport(&token_config("token"), transport)
    }

    #[test]
    fn test_select_track_threshold() {
        assert_eq!(select_track(&[Some(10), Some(40), None]), None);
        assert_eq!(select_track(&[Some(10), Some(70), Some(70)]), Some(1));
        assert_eq!(select_track(&[Some(55)]), Some(0));
        assert_eq!(select_track(&[None, None]), None);
    }

    #[test]
    fn test_fetch_collects_release_and_track_credits() {
        let harness = harness_for(TALKING_BOOK_RELEASE);
        let credits = fetch(&harness.fetcher, "Stevie Wonder", "Superstition");

        assert_eq!(credits.year, "1972");
        assert_eq!(
            credits.categories.entries(CreditCategory::Production),
            &[CreditEntry::new("Robert Margouleff", "Producer, Programmed By")]
        );
        assert_eq!(
            credits.categories.entries(CreditCategory::Engineering),
            &[CreditEntry::new("Malcolm Cecil", "Engineer")]
        );
        assert_eq!(
            credits.categories.entries(CreditCategory::Other),
            &[CreditEntry::new("Anon", "Unknown Role")]
        );
        assert_eq!(
            credits.categories.entries(CreditCategory::Songwriting),
            &[CreditEntry::new("Stevie Wonder", "Written-By")]
        );
        assert_eq!(
            credits.categories.entries(CreditCategory::Performers),
            &[
                CreditEntry::new("Stevie Wonder", "Release artist"),
                CreditEntry::new("Trevor Laurence", "Tenor Saxophone"),
                CreditEntry::new("Steve Madaio", "Trumpet"),
            ]
        );

        let urls = harness.transport.requested_urls();
        assert!(urls[0].contains("q=Superstition&artist=Stevie%20Wonder&track=Superstition&type=release&per_page=8"));
        assert!(urls[1].ends_with("/releases/249504"));
    }

    #[test]
    fn test_unmatched_tracklist_attaches_no_track_credits() {
        let release = release_with_tracks(
            r#"[{"title": "You Are The Sunshine Of My Life",
                 "extraartists": [{"name": "Jim Gilstrap", "role": "Backing Vocals"}]}]"#,
        );
        let harness = harness_for(&release);
        let credits = fetch(&harness.fetcher, "Stevie Wonder", "Superstition");
        assert_eq!(
            credits.categories.entries(CreditCategory::Performers),
            &[CreditEntry::new("Stevie Wonder", "Release artist")]
        );
        assert_eq!(credits.year, "1972");
    }

    #[test]
    fn test_matching_track_attaches_track_artists() {
        let release = release_with_tracks(
            r#"[{"title": "Superstition", "artists": [{"name": "Stevie Wonder"}]}]"#,
        );
        let harness = harness_for(&release);
        let credits = fetch(&harness.fetcher, "Stevie Wonder", "Superstition");
        assert_eq!(
            credits.categories.entries(CreditCategory::Performers),
            &[CreditEntry::new("Stevie Wonder", "Release artist, Track artist")]
        );
    }
}
