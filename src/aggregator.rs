//! Multi-source playlist aggregation
//!
//! Sources are processed one after another: load, parse, label, validate,
//! then merge into the running result. Only this control task touches the
//! dedup set and the output list, so no locking is needed; the concurrency
//! lives inside each source's liveness batch.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppResult;
use crate::ingestor::parse_m3u;
use crate::labeling::SourceLabeler;
use crate::liveness::{self, HttpStreamProber, LivenessLog, LivenessValidator, StreamProber};
use crate::models::{normalize_source, Candidate};
use crate::sources::{ContentLoader, SourceLoader};
use crate::utils::url::UrlUtils;

/// Per-source counts for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub label: String,
    /// Candidates parsed from the source
    pub parsed: usize,
    /// Candidates that passed validation (all parsed ones when validation is off)
    pub accepted: usize,
    /// Accepted candidates not already present from an earlier source
    pub added: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AggregatedPlaylist {
    /// Unique channels, grouped by source in source order
    pub channels: Vec<Candidate>,
    pub summaries: Vec<SourceSummary>,
    /// Sources that could not be loaded (credentials masked)
    pub skipped: Vec<String>,
}

pub struct Aggregator<L = SourceLoader, P = HttpStreamProber> {
    loader: L,
    labeler: SourceLabeler,
    validator: Option<LivenessValidator<P>>,
    log: Option<LivenessLog>,
}

impl Aggregator<SourceLoader, HttpStreamProber> {
    /// Build the production pipeline. Creating the liveness log truncates it.
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let loader = SourceLoader::new()?;
        let labeler = config.labeler()?;

        let log = match &config.log_file {
            Some(path) => Some(LivenessLog::create(path).await?),
            None => None,
        };

        let validator = if config.validate_streams {
            Some(LivenessValidator::from_config(&config.liveness)?)
        } else {
            info!("Stream validation disabled; all parsed channels are accepted");
            None
        };

        let mut aggregator = Self::new(loader, labeler, validator);
        if let Some(log) = log {
            aggregator = aggregator.with_log(log);
        }
        Ok(aggregator)
    }
}

impl<L: ContentLoader, P: StreamProber> Aggregator<L, P> {
    pub fn new(loader: L, labeler: SourceLabeler, validator: Option<LivenessValidator<P>>) -> Self {
        Self {
            loader,
            labeler,
            validator,
            log: None,
        }
    }

    pub fn with_log(mut self, log: LivenessLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Run every source through the pipeline and merge the results.
    ///
    /// Unloadable sources are skipped with a warning. The first occurrence of
    /// a stream URL wins; later duplicates are dropped.
    pub async fn aggregate(&self, sources: &[String]) -> AggregatedPlaylist {
        let mut result = AggregatedPlaylist::default();
        let mut seen: HashSet<String> = HashSet::new();

        for raw in sources {
            let source = normalize_source(raw);
            if source.is_empty() {
                continue;
            }
            let safe_source = UrlUtils::obfuscate_credentials(&source);

            let content = match self.loader.load(&source).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Skipping source {}: {}", safe_source, e);
                    result.skipped.push(safe_source);
                    continue;
                }
            };

            let label = self.labeler.label(&source).to_string();
            let mut candidates = parse_m3u(&content, &source);
            for candidate in &mut candidates {
                candidate.source_label = label.clone();
            }
            let parsed = candidates.len();

            let accepted = self.validate(candidates).await;
            info!("{}: accepted {} channels", label, accepted.len());

            let accepted_count = accepted.len();
            let mut added = 0;
            for candidate in accepted {
                if seen.insert(candidate.dedup_key().to_string()) {
                    result.channels.push(candidate);
                    added += 1;
                }
            }

            result.summaries.push(SourceSummary {
                label,
                parsed,
                accepted: accepted_count,
                added,
            });
        }

        info!(
            "Aggregated {} unique channels from {} sources ({} skipped)",
            result.channels.len(),
            result.summaries.len(),
            result.skipped.len()
        );
        result
    }

    async fn validate(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let Some(validator) = &self.validator else {
            return candidates;
        };
        if candidates.is_empty() {
            return candidates;
        }

        let probed = validator.probe_batch(candidates).await;
        if let Some(log) = &self.log {
            log.append(&probed).await;
        }
        liveness::accepted(&probed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SourceError, SourceResult};
    use crate::labeling::{LabelMode, SourceKey};
    use crate::liveness::{ProbeAttempt, RetryPolicy};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MemoryLoader {
        playlists: HashMap<String, String>,
    }

    impl MemoryLoader {
        fn new(playlists: &[(&str, &str)]) -> Self {
            Self {
                playlists: playlists
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ContentLoader for MemoryLoader {
        async fn load(&self, source: &str) -> SourceResult<String> {
            self.playlists
                .get(source)
                .cloned()
                .ok_or_else(|| SourceError::unreachable(source, "connection refused"))
        }
    }

    /// Every URL is live except the listed ones, which answer 404
    struct DeadListProber {
        dead: HashSet<String>,
    }

    #[async_trait]
    impl StreamProber for DeadListProber {
        async fn probe(&self, url: &str) -> ProbeAttempt {
            if self.dead.contains(url) {
                ProbeAttempt::Status(404)
            } else {
                ProbeAttempt::Body {
                    status: 200,
                    has_data: true,
                }
            }
        }
    }

    fn playlist(urls: &[&str]) -> String {
        let mut content = String::from("#EXTM3U\n");
        for (i, url) in urls.iter().enumerate() {
            content.push_str(&format!(
                "#EXTINF:-1 tvg-logo=\"\" group-title=\"G\",Channel {i}\n{url}\n"
            ));
        }
        content
    }

    fn labeler() -> SourceLabeler {
        SourceLabeler::new(
            SourceKey::from_passphrase("test-passphrase").unwrap(),
            LabelMode::Deterministic,
        )
    }

    fn validator(dead: &[&str]) -> LivenessValidator<DeadListProber> {
        let prober = DeadListProber {
            dead: dead.iter().map(|s| s.to_string()).collect(),
        };
        LivenessValidator::new(prober, RetryPolicy::new(1, Duration::from_millis(1)), 4).unwrap()
    }

    fn sources(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn two_sources() -> MemoryLoader {
        MemoryLoader::new(&[
            ("a", playlist(&["http://x.com/1", "http://x.com/2"]).as_str()),
            ("b", playlist(&["http://x.com/2", "http://x.com/3"]).as_str()),
        ])
    }

    #[tokio::test]
    async fn test_merge_keeps_first_occurrence() {
        let aggregator =
            Aggregator::<_, DeadListProber>::new(two_sources(), labeler(), None);
        let result = aggregator.aggregate(&sources(&["a", "b"])).await;

        let urls: Vec<&str> = result.channels.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["http://x.com/1", "http://x.com/2", "http://x.com/3"]);

        let label_a = labeler().label("a").to_string();
        let label_b = labeler().label("b").to_string();
        assert_eq!(result.channels[1].source_label, label_a);
        assert_eq!(result.channels[2].source_label, label_b);

        assert_eq!(
            result.summaries,
            vec![
                SourceSummary {
                    label: label_a,
                    parsed: 2,
                    accepted: 2,
                    added: 2
                },
                SourceSummary {
                    label: label_b,
                    parsed: 2,
                    accepted: 2,
                    added: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_aggregate_is_idempotent_for_repeated_source() {
        let aggregator =
            Aggregator::<_, DeadListProber>::new(two_sources(), labeler(), None);
        let once = aggregator.aggregate(&sources(&["a", "b"])).await;
        let repeated = aggregator.aggregate(&sources(&["a", "b", "a", " b "])).await;

        assert_eq!(once.channels, repeated.channels);
        assert_eq!(repeated.summaries[2].added, 0);
        assert_eq!(repeated.summaries[3].added, 0);
    }

    #[tokio::test]
    async fn test_unreachable_source_is_skipped() {
        let aggregator =
            Aggregator::<_, DeadListProber>::new(two_sources(), labeler(), None);
        let result = aggregator
            .aggregate(&sources(&["missing", "", "b"]))
            .await;

        assert_eq!(result.skipped, vec!["missing"]);
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.channels.len(), 2);
    }

    #[tokio::test]
    async fn test_dead_streams_are_dropped_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("liveness.log");
        let log = LivenessLog::create(&log_path).await.unwrap();

        let aggregator =
            Aggregator::new(two_sources(), labeler(), Some(validator(&["http://x.com/2"])))
                .with_log(log);
        let result = aggregator.aggregate(&sources(&["a", "b"])).await;

        let urls: Vec<&str> = result.channels.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["http://x.com/1", "http://x.com/3"]);
        assert_eq!(result.summaries[0].accepted, 1);
        assert_eq!(result.summaries[1].parsed, 2);
        assert_eq!(result.summaries[1].accepted, 1);

        let content = tokio::fs::read_to_string(&log_path).await.unwrap();
        let rows: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows.iter().filter(|r| r.contains("\tDEAD\t404\t")).count(), 2);
        assert!(rows[1].ends_with("\thttp_status\t2\t"));
    }

    #[tokio::test]
    async fn test_source_without_channels() {
        let loader = MemoryLoader::new(&[("empty", "#EXTM3U\n# nothing here\n")]);
        let aggregator = Aggregator::new(loader, labeler(), Some(validator(&[])));
        let result = aggregator.aggregate(&sources(&["empty"])).await;

        assert!(result.channels.is_empty());
        assert_eq!(result.summaries[0].parsed, 0);
        assert_eq!(result.summaries[0].added, 0);
    }
}
