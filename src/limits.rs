//! Soft work budget for one search call.
//!
//! Callers may ask for their own limits through [`SearchLimits`]; the engine
//! always clamps them with [`SearchLimits::resolve`] so no request can ask for
//! unbounded work. A [`LimitTracker`] then counts consumption during the call.
//!
//! Tripping a limit is never an error. The search stops after the unit that
//! reached the cap and hands back a continuation cursor.

use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: usize = 6;
pub const HARD_MAX_TOKENS: usize = 12;
pub const DEFAULT_MAX_POSTINGS_PAGES: usize = 4;
pub const HARD_MAX_POSTINGS_PAGES: usize = 12;
pub const DEFAULT_MAX_CANDIDATES_VERIFIED: usize = 200;
pub const HARD_MAX_CANDIDATES_VERIFIED: usize = 1000;
pub const DEFAULT_MAX_TIME_MS: u64 = 150;
pub const HARD_MAX_TIME_MS: u64 = 500;

/// Caller-requested limits. Every knob is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLimits {
    /// Distinct lossy query tokens used for candidate discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<f64>,
    /// Postings pages read per call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_postings_pages: Option<f64>,
    /// Candidates examined per call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates_verified: Option<f64>,
    /// Wall-clock budget in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_ms: Option<f64>,
}

impl SearchLimits {
    /// Overlay `other` on top of `self`; knobs set in `other` win.
    pub fn merged_with(&self, other: &SearchLimits) -> SearchLimits {
        SearchLimits {
            max_tokens: other.max_tokens.or(self.max_tokens),
            max_postings_pages: other.max_postings_pages.or(self.max_postings_pages),
            max_candidates_verified: other
                .max_candidates_verified
                .or(self.max_candidates_verified),
            max_time_ms: other.max_time_ms.or(self.max_time_ms),
        }
    }

    /// Clamp the requested values into effective limits.
    ///
    /// Negative or non-finite values fall back to the default; everything is
    /// capped at the hard maximum.
    pub fn resolve(&self) -> ResolvedLimits {
        ResolvedLimits {
            max_tokens: clamp(self.max_tokens, DEFAULT_MAX_TOKENS, HARD_MAX_TOKENS).max(1),
            max_postings_pages: clamp(
                self.max_postings_pages,
                DEFAULT_MAX_POSTINGS_PAGES,
                HARD_MAX_POSTINGS_PAGES,
            ),
            max_candidates_verified: clamp(
                self.max_candidates_verified,
                DEFAULT_MAX_CANDIDATES_VERIFIED,
                HARD_MAX_CANDIDATES_VERIFIED,
            ),
            time_budget: Duration::from_millis(clamp(
                self.max_time_ms,
                DEFAULT_MAX_TIME_MS as usize,
                HARD_MAX_TIME_MS as usize,
            ) as u64),
        }
    }
}

fn clamp(requested: Option<f64>, default: usize, hard_max: usize) -> usize {
    match requested {
        Some(value) if value.is_finite() && value >= 0.0 => (value.floor() as usize).min(hard_max),
        _ => default,
    }
}

/// Effective limits after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLimits {
    pub max_tokens: usize,
    pub max_postings_pages: usize,
    pub max_candidates_verified: usize,
    pub time_budget: Duration,
}

impl Default for ResolvedLimits {
    fn default() -> Self {
        SearchLimits::default().resolve()
    }
}

/// Counts work done by one search call against its [`ResolvedLimits`].
#[derive(Debug)]
pub struct LimitTracker {
    limits: ResolvedLimits,
    started_at: Instant,
    tokens_consumed: usize,
    postings_pages_consumed: usize,
    candidates_verified: usize,
    pages_exhausted: bool,
    candidates_exhausted: bool,
}

impl LimitTracker {
    pub fn new(limits: ResolvedLimits) -> Self {
        LimitTracker {
            limits,
            started_at: Instant::now(),
            tokens_consumed: 0,
            postings_pages_consumed: 0,
            candidates_verified: 0,
            pages_exhausted: false,
            candidates_exhausted: false,
        }
    }

    pub fn limits(&self) -> &ResolvedLimits {
        &self.limits
    }

    /// Account for one postings page.
    ///
    /// The page is always permitted; `false` means it was the last one.
    pub fn try_consume_postings_page(&mut self) -> bool {
        self.postings_pages_consumed += 1;
        let within = self.postings_pages_consumed < self.limits.max_postings_pages;
        if !within {
            self.trip("postings pages");
            self.pages_exhausted = true;
        }
        within
    }

    /// Account for one candidate whose processing touches `cost` tokens.
    ///
    /// The candidate is always permitted; `false` means it was the last one.
    pub fn try_consume_candidate(&mut self, cost: usize) -> bool {
        self.candidates_verified += 1;
        self.tokens_consumed += cost;
        let within = self.candidates_verified < self.limits.max_candidates_verified;
        if !within {
            self.trip("candidates verified");
            self.candidates_exhausted = true;
        }
        within
    }

    /// Whether a cap has been reached or the time budget has elapsed.
    pub fn should_stop(&self) -> bool {
        self.pages_exhausted || self.should_stop_within_page()
    }

    /// Whether work on an already fetched page has to stop.
    ///
    /// The page that used up the page budget is still scanned; only the
    /// candidate cap and the time budget cut it short.
    pub fn should_stop_within_page(&self) -> bool {
        self.candidates_exhausted || self.started_at.elapsed() >= self.limits.time_budget
    }

    pub fn tokens_consumed(&self) -> usize {
        self.tokens_consumed
    }

    pub fn postings_pages_consumed(&self) -> usize {
        self.postings_pages_consumed
    }

    pub fn candidates_verified(&self) -> usize {
        self.candidates_verified
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn trip(&self, what: &str) {
        if !self.pages_exhausted && !self.candidates_exhausted {
            debug!(
                "search budget reached on {what} (pages={}, candidates={}, tokens={})",
                self.postings_pages_consumed, self.candidates_verified, self.tokens_consumed
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let limits = SearchLimits::default().resolve();
        assert_eq!(limits.max_tokens, 6);
        assert_eq!(limits.max_postings_pages, 4);
        assert_eq!(limits.max_candidates_verified, 200);
        assert_eq!(limits.time_budget, Duration::from_millis(150));
    }

    #[test]
    fn test_clamping() {
        let limits = SearchLimits {
            max_tokens: Some(100.0),
            max_postings_pages: Some(-3.0),
            max_candidates_verified: Some(f64::INFINITY),
            max_time_ms: Some(10_000.0),
        }
        .resolve();
        assert_eq!(limits.max_tokens, HARD_MAX_TOKENS);
        assert_eq!(limits.max_postings_pages, DEFAULT_MAX_POSTINGS_PAGES);
        assert_eq!(limits.max_candidates_verified, DEFAULT_MAX_CANDIDATES_VERIFIED);
        assert_eq!(limits.time_budget, Duration::from_millis(HARD_MAX_TIME_MS));

        let nan = SearchLimits {
            max_candidates_verified: Some(f64::NAN),
            ..Default::default()
        };
        assert_eq!(nan.resolve().max_candidates_verified, 200);
    }

    #[test]
    fn test_merge_prefers_override() {
        let base = SearchLimits {
            max_tokens: Some(8.0),
            max_postings_pages: Some(2.0),
            ..Default::default()
        };
        let request = SearchLimits {
            max_postings_pages: Some(5.0),
            ..Default::default()
        };
        let merged = base.merged_with(&request);
        assert_eq!(merged.max_tokens, Some(8.0));
        assert_eq!(merged.max_postings_pages, Some(5.0));
    }

    #[test]
    fn test_crossing_call_is_permitted_then_stops() {
        let limits = SearchLimits {
            max_candidates_verified: Some(2.0),
            ..Default::default()
        }
        .resolve();
        let mut tracker = LimitTracker::new(limits);
        assert!(tracker.try_consume_candidate(1));
        assert!(!tracker.should_stop());
        assert!(!tracker.try_consume_candidate(3));
        assert!(tracker.should_stop());
        assert_eq!(tracker.candidates_verified(), 2);
        assert_eq!(tracker.tokens_consumed(), 4);
    }

    #[test]
    fn test_postings_pages() {
        let limits = SearchLimits {
            max_postings_pages: Some(1.0),
            ..Default::default()
        }
        .resolve();
        let mut tracker = LimitTracker::new(limits);
        assert!(!tracker.try_consume_postings_page());
        assert!(tracker.should_stop());
        assert_eq!(tracker.postings_pages_consumed(), 1);
    }

    #[test]
    fn test_last_page_is_scanned_to_its_end() {
        let limits = SearchLimits {
            max_postings_pages: Some(1.0),
            max_candidates_verified: Some(3.0),
            ..Default::default()
        }
        .resolve();
        let mut tracker = LimitTracker::new(limits);
        assert!(!tracker.try_consume_postings_page());
        assert!(tracker.should_stop());
        assert!(!tracker.should_stop_within_page());
        assert!(tracker.try_consume_candidate(1));
        assert!(tracker.try_consume_candidate(1));
        assert!(!tracker.try_consume_candidate(1));
        assert!(tracker.should_stop_within_page());
    }

    #[test]
    fn test_time_budget() {
        let limits = SearchLimits {
            max_time_ms: Some(0.0),
            ..Default::default()
        }
        .resolve();
        let tracker = LimitTracker::new(limits);
        assert!(tracker.should_stop());
    }
}
