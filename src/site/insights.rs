use crate::config::ExtractConfig;
use crate::crawler::parser::script_containing;
use crate::crawler::Document;
use crate::extract::{decode, extract_between, locate_fragment, lookup, lookup_str, PathSegment};
use crate::site::{ExtractionError, HandlerContext, HandlerOutput, PageHandler};
use crate::store::{Direction, Field, Horizon};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Prefixes of the page's own quote path, escaped and plain
const ORIGIN_PREFIXES: &[&str] = &[
    r#""originUrl":"\u002Fquote\u002F"#,
    r#""originUrl":"/quote/"#,
];
const ORIGIN_SUFFIX: &str = "?p=";

/// Reads technical insights from the JSON store embedded in a quote page
#[derive(Debug, Clone)]
pub struct InsightsJsonHandler {
    config: ExtractConfig,
}

impl InsightsJsonHandler {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Key the page itself claims to describe
    fn correlated_key(script: &str) -> Option<String> {
        ORIGIN_PREFIXES
            .iter()
            .find_map(|prefix| extract_between(script, prefix, ORIGIN_SUFFIX))
            .map(|raw| raw.replace(r"\u002F", "/").trim().to_string())
            .filter(|key| !key.is_empty())
    }

    fn insights_path(key: &str) -> Vec<PathSegment> {
        [
            "dispatcher",
            "stores",
            "ResearchPageStore",
            "technicalInsights",
            key,
        ]
        .into_iter()
        .map(PathSegment::from)
        .collect()
    }

    fn unavailable_or(
        &self,
        script: &str,
        url: &str,
        key: &str,
        otherwise: ExtractionError,
    ) -> ExtractionError {
        if script.contains(&self.config.failure_marker) {
            ExtractionError::InsightsUnavailable {
                url: url.to_string(),
                key: key.to_string(),
            }
        } else {
            otherwise
        }
    }

    fn events_fields(events: &Value) -> Vec<Field> {
        let mut fields = Vec::new();

        if let Ok(sector) = lookup_str(events, &[PathSegment::from("sector")]) {
            fields.push(Field::Sector(sector.to_string()));
        }

        for horizon in Horizon::ALL {
            let outlook = PathSegment::from(horizon.outlook_key());
            if let Ok(direction) = lookup_str(events, &[outlook.clone(), "direction".into()]) {
                fields.push(Field::StockOutlook(horizon, Direction::parse(direction)));
            }
            if let Ok(direction) = lookup_str(events, &[outlook, "sectorDirection".into()]) {
                fields.push(Field::SectorOutlook(horizon, Direction::parse(direction)));
            }
        }

        fields
    }
}

impl PageHandler for InsightsJsonHandler {
    fn name(&self) -> &'static str {
        "insights-json"
    }

    fn matches(&self, document: &Document) -> bool {
        document.contains(&self.config.store_marker)
    }

    fn handle(
        &self,
        document: &Document,
        ctx: &HandlerContext<'_>,
    ) -> Result<HandlerOutput, ExtractionError> {
        let url = document.url.to_string();
        let script = {
            let html = document.html();
            script_containing(&html, &self.config.store_marker)
        }
        .unwrap_or_else(|| document.body.clone());

        let key = Self::correlated_key(&script).ok_or_else(|| ExtractionError::Correlation {
            url: url.clone(),
            key: None,
        })?;
        if !ctx.store.contains(&key) {
            return Err(ExtractionError::Correlation {
                url,
                key: Some(key),
            });
        }

        let fragment = locate_fragment(
            &script,
            &self.config.start_marker,
            &self.config.end_marker,
            self.config.boundary,
        )
        .map_err(|e| {
            self.unavailable_or(
                &script,
                &url,
                &key,
                ExtractionError::FragmentNotFound {
                    url: url.clone(),
                    reason: e.to_string(),
                },
            )
        })?;

        let tree = decode(fragment).map_err(|e| {
            self.unavailable_or(
                &script,
                &url,
                &key,
                ExtractionError::Decode {
                    url: url.clone(),
                    reason: e.to_string(),
                },
            )
        })?;

        let ticker_node = match lookup(&tree, &Self::insights_path(&key)) {
            Ok(node) => node,
            Err(missing) if script.contains(&self.config.failure_marker) => {
                debug!("{} at {}", missing, url);
                return Err(ExtractionError::InsightsUnavailable { url, key });
            }
            Err(missing) => {
                warn!("No insights for {} on {}: {}", key, url, missing);
                return Ok(HandlerOutput::default());
            }
        };

        let events_path = [
            PathSegment::from("instrumentInfo"),
            PathSegment::from("technicalEvents"),
        ];
        let fields = match lookup(ticker_node, &events_path) {
            Ok(events) => Self::events_fields(events),
            Err(missing) => {
                warn!("No technical events for {} on {}: {}", key, url, missing);
                Vec::new()
            }
        };

        if fields.is_empty() {
            return Ok(HandlerOutput::default());
        }

        let merged = fields.len();
        ctx.store
            .merge_fields(&key, fields)
            .map_err(|_| ExtractionError::Correlation {
                url: url.clone(),
                key: Some(key.clone()),
            })?;
        info!("Merged {} insight fields for {} from {}", merged, key, url);

        Ok(HandlerOutput::default())
    }
}
