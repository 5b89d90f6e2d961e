//! Translation of one member: prompt rendering, cache lookup, gateway
//! invocation and advisory structure inspection, composed into a single
//! awaited operation. The orchestrator calls this strictly one member at
//! a time; each call fully resolves before the next member starts.

pub mod cache;
pub mod gateway;
pub mod prompt;
pub mod structure;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::classify::FileCategory;
use crate::job::TranslateMode;
use crate::lang::Language;
use crate::metrics::{metric_names, MetricsRegistry};
use cache::TranslationCache;
use gateway::{GatewayError, GatewayReply, TranslationGateway};
use structure::StructureInspector;

#[derive(Debug)]
pub enum TranslateError {
    Gateway(GatewayError),
    /// The member's category has no translation template.
    NotTranslatable(String),
}

impl std::fmt::Display for TranslateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslateError::Gateway(e) => write!(f, "{e}"),
            TranslateError::NotTranslatable(name) => {
                write!(f, "not a translatable file: {name}")
            }
        }
    }
}

impl From<GatewayError> for TranslateError {
    fn from(e: GatewayError) -> Self {
        TranslateError::Gateway(e)
    }
}

/// Per-member translation front end over the gateway.
pub struct TranslationService {
    gateway: Arc<dyn TranslationGateway>,
    cache: Arc<TranslationCache>,
    metrics: Arc<MetricsRegistry>,
    inspector: StructureInspector,
}

impl TranslationService {
    pub fn new(
        gateway: Arc<dyn TranslationGateway>,
        cache: Arc<TranslationCache>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            gateway,
            cache,
            metrics,
            inspector: StructureInspector::new(),
        }
    }

    /// Translate one member's text. The subtitle template is selected by
    /// mode; the string-file template ignores it.
    pub async fn translate_member(
        &self,
        member_name: &str,
        category: FileCategory,
        mode: TranslateMode,
        target: Language,
        content: &str,
    ) -> Result<String, TranslateError> {
        let prompt = match category {
            FileCategory::Subtitle => match mode {
                TranslateMode::Normal => prompt::subtitle(content, target),
                TranslateMode::AdultSafe => prompt::subtitle_adult_safe(content, target),
            },
            FileCategory::StringFile => prompt::string_file(content, target),
            FileCategory::Archive | FileCategory::Unsupported => {
                return Err(TranslateError::NotTranslatable(member_name.to_string()))
            }
        };

        let key = TranslationCache::compute_key(mode.wire(), target.code(), content);
        if let Some(hit) = self.cache.get(&key) {
            debug!(member = member_name, "translation_cache_hit");
            return Ok(hit);
        }

        if let Some(source) = structure::detect_language(content) {
            debug!(member = member_name, source_lang = source, "source_language_detected");
        }

        let span = self.metrics.span(metric_names::T_GATEWAY_ROUNDTRIP);
        let reply = self.gateway.complete(&prompt).await?;
        span.finish();

        let translated = match reply {
            GatewayReply::Text(text) => text,
            GatewayReply::Unrecognized(raw) => {
                warn!(
                    member = member_name,
                    "gateway reply shape unrecognized, using raw value"
                );
                raw.to_string()
            }
        };

        self.inspect(member_name, category, content, &translated);
        self.cache.insert(key, translated.clone());
        Ok(translated)
    }

    fn inspect(&self, member_name: &str, category: FileCategory, input: &str, output: &str) {
        match category {
            FileCategory::Subtitle => {
                let lost = self.inspector.lost_timecodes(input, output);
                if !lost.is_empty() {
                    warn!(
                        member = member_name,
                        lost = lost.len(),
                        "timecode lines missing from translated output"
                    );
                }
            }
            FileCategory::StringFile => {
                let lost = self.inspector.lost_keys(input, output);
                if !lost.is_empty() {
                    warn!(
                        member = member_name,
                        lost = lost.len(),
                        "key names missing from translated output"
                    );
                }
            }
            FileCategory::Archive | FileCategory::Unsupported => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    /// Returns the content part of the prompt unchanged, counting calls.
    struct EchoGateway {
        calls: AtomicUsize,
    }

    impl EchoGateway {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TranslationGateway for EchoGateway {
        async fn complete(&self, prompt: &str) -> Result<GatewayReply, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (_, content) = prompt
                .split_once("Now translate:\n")
                .expect("prompt carries the content marker");
            Ok(GatewayReply::Text(content.to_string()))
        }
    }

    struct UnrecognizedGateway;

    #[async_trait]
    impl TranslationGateway for UnrecognizedGateway {
        async fn complete(&self, _prompt: &str) -> Result<GatewayReply, GatewayError> {
            Ok(GatewayReply::Unrecognized(serde_json::json!({
                "object": "error-ish",
            })))
        }
    }

    fn service(gateway: Arc<dyn TranslationGateway>) -> TranslationService {
        TranslationService::new(
            gateway,
            Arc::new(TranslationCache::new(16, Duration::from_secs(60))),
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[tokio::test]
    async fn echo_round_trip_preserves_content() {
        let svc = service(Arc::new(EchoGateway::new()));
        let input = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";
        let out = svc
            .translate_member(
                "a.srt",
                FileCategory::Subtitle,
                TranslateMode::Normal,
                Language::English,
                input,
            )
            .await
            .unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn repeated_content_hits_the_cache() {
        let gateway = Arc::new(EchoGateway::new());
        let svc = service(gateway.clone());
        for _ in 0..3 {
            svc.translate_member(
                "dup.str",
                FileCategory::StringFile,
                TranslateMode::Normal,
                Language::Japanese,
                "k=v\n",
            )
            .await
            .unwrap();
        }
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mode_changes_miss_the_cache() {
        let gateway = Arc::new(EchoGateway::new());
        let svc = service(gateway.clone());
        for mode in [TranslateMode::Normal, TranslateMode::AdultSafe] {
            svc.translate_member(
                "a.srt",
                FileCategory::Subtitle,
                mode,
                Language::Japanese,
                "1\nHello\n",
            )
            .await
            .unwrap();
        }
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unrecognized_reply_degrades_to_raw_value() {
        let svc = service(Arc::new(UnrecognizedGateway));
        let out = svc
            .translate_member(
                "a.srt",
                FileCategory::Subtitle,
                TranslateMode::Normal,
                Language::English,
                "1\nHi\n",
            )
            .await
            .unwrap();
        assert!(out.contains("error-ish"));
    }

    #[tokio::test]
    async fn archive_category_is_rejected() {
        let svc = service(Arc::new(EchoGateway::new()));
        let err = svc
            .translate_member(
                "pack.zip",
                FileCategory::Archive,
                TranslateMode::Normal,
                Language::English,
                "",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::NotTranslatable(_)));
    }
}
