//! External decision service
//!
//! A stage with the `service` strategy asks a remote model whether two values
//! match under a rule. Calls go through `ServiceClient`, which applies the
//! per-call timeout, one retry on transient failures, the concurrency cap and
//! the verdict cache. Any failure left after the retry counts as a reject.

pub mod cache;
pub mod ollama;

pub use cache::{cache_key, VerdictCache};
pub use ollama::OllamaService;

use crate::config::ServiceConfig;
use crate::matcher::predicate::{Predicate, PredicateProvider, Verdict};
use crate::matcher::{MatchField, StageSpec, Strategy};
use crate::normalizer::FieldValue;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// One question for the service
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictRequest {
    pub field: MatchField,
    pub rule: String,
    pub search: String,
    pub candidate: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Worth one retry (connection errors, 429, 5xx)
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),
}

impl ServiceFailure {
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceFailure::Timeout(_) | ServiceFailure::Transient(_))
    }
}

#[async_trait]
pub trait VerdictService: Send + Sync {
    fn model(&self) -> &str;

    async fn decide(&self, request: &VerdictRequest) -> Result<bool, ServiceFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceLimits {
    pub timeout: Duration,
    pub retry_backoff: Duration,
    pub max_concurrent: usize,
}

impl ServiceLimits {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_seconds),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_concurrent: config.max_concurrent.max(1),
        }
    }
}

/// Shared, cloneable handle to a verdict service
#[derive(Clone)]
pub struct ServiceClient {
    service: Arc<dyn VerdictService>,
    limits: ServiceLimits,
    permits: Arc<Semaphore>,
    cache: Arc<Mutex<VerdictCache>>,
    runtime: Handle,
}

impl ServiceClient {
    /// `runtime` drives the calls made from synchronous matcher threads.
    pub fn new(service: Arc<dyn VerdictService>, limits: ServiceLimits, runtime: Handle) -> Self {
        Self {
            service,
            permits: Arc::new(Semaphore::new(limits.max_concurrent)),
            limits,
            cache: Arc::new(Mutex::new(VerdictCache::default())),
            runtime,
        }
    }

    pub fn with_cache(self, cache: VerdictCache) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
            ..self
        }
    }

    /// Copy of the cache for persisting after a run
    pub fn cache_snapshot(&self) -> VerdictCache {
        self.cache
            .lock()
            .map(|cache| cache.clone())
            .unwrap_or_default()
    }

    async fn attempt(&self, request: &VerdictRequest) -> Result<bool, ServiceFailure> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ServiceFailure::Fatal(e.to_string()))?;

        match tokio::time::timeout(self.limits.timeout, self.service.decide(request)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceFailure::Timeout(self.limits.timeout)),
        }
    }

    /// Cached verdict, else ask (one retry on transient failure).
    /// Failures resolve to `false`.
    pub async fn decide(&self, request: &VerdictRequest) -> bool {
        let key = cache_key(self.service.model(), request);
        if let Some(verdict) = self.cache.lock().ok().and_then(|cache| cache.get(&key)) {
            return verdict;
        }

        let result = match self.attempt(request).await {
            Err(e) if e.is_transient() => {
                debug!("Retrying {} after {:?}: {}", request.field, self.limits.retry_backoff, e);
                tokio::time::sleep(self.limits.retry_backoff).await;
                self.attempt(request).await
            }
            other => other,
        };

        match result {
            Ok(verdict) => {
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(key, request, verdict);
                }
                verdict
            }
            Err(e) => {
                warn!(
                    "Decision service failed on {} '{}' vs '{}', treating as no match: {}",
                    request.field, request.search, request.candidate, e
                );
                false
            }
        }
    }

    /// Blocking form for matcher worker threads.
    pub fn decide_blocking(&self, request: &VerdictRequest) -> bool {
        self.runtime.block_on(self.decide(request))
    }
}

impl PredicateProvider for ServiceClient {
    fn predicate_for(&self, spec: &StageSpec) -> catalog_match_common::Result<Arc<dyn Predicate>> {
        Ok(Arc::new(ServicePredicate {
            client: self.clone(),
            field: spec.field,
            rule: spec.rule().to_string(),
        }))
    }
}

/// Hard-gate predicate answered by the decision service
pub struct ServicePredicate {
    client: ServiceClient,
    field: MatchField,
    rule: String,
}

impl Predicate for ServicePredicate {
    fn strategy(&self) -> Strategy {
        Strategy::Service
    }

    fn evaluate(
        &self,
        search: &FieldValue,
        candidate: &FieldValue,
    ) -> catalog_match_common::Result<Verdict> {
        let request = VerdictRequest {
            field: self.field,
            rule: self.rule.clone(),
            search: search.to_string(),
            candidate: candidate.to_string(),
        };
        Ok(if self.client.decide_blocking(&request) {
            Verdict::Accept
        } else {
            Verdict::Reject
        })
    }
}
