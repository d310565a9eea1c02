//! Batch inference smoke test.
//!
//! Submits one small batch per provider variant, each with a fresh random
//! token so that no two runs send the same prompt.

use crate::config::{ConfigError, ConfigResult, SmokeSettings};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};
use tuneup_models::{BatchSubmission, GatewayClient};
use tuneup_training::TrainingResult;

/// Anything that accepts a batch of prompts for one function variant.
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit_batch(
        &self,
        function_name: &str,
        variant_name: &str,
        prompts: &[String],
    ) -> TrainingResult<BatchSubmission>;
}

#[async_trait]
impl BatchSubmitter for GatewayClient {
    async fn submit_batch(
        &self,
        function_name: &str,
        variant_name: &str,
        prompts: &[String],
    ) -> TrainingResult<BatchSubmission> {
        self.batch_inference(function_name, variant_name, prompts).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmokeTarget {
    pub name: String,
    pub function_name: String,
    pub variant_name: String,
}

/// Targets from `settings`, or only `only` when given.
pub fn smoke_targets(settings: &SmokeSettings, only: Option<&str>) -> ConfigResult<Vec<SmokeTarget>> {
    let target = |variant: &String| SmokeTarget {
        name: variant.clone(),
        function_name: settings.function_name.clone(),
        variant_name: variant.clone(),
    };

    match only {
        Some(name) => settings
            .variants
            .iter()
            .find(|v| v.as_str() == name)
            .map(|v| vec![target(v)])
            .ok_or_else(|| ConfigError::UnknownVariant {
                function: settings.function_name.clone(),
                variant: name.to_string(),
            }),
        None => Ok(settings.variants.iter().map(target).collect()),
    }
}

/// Random hex token, 16 bytes of entropy.
#[must_use]
pub fn random_token() -> String {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    hex::encode(bytes)
}

#[must_use]
pub fn smoke_prompt(token: &str) -> String {
    format!("Write a haiku about the following token: {token}")
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeResult {
    pub target: SmokeTarget,
    pub token: String,
    pub batch_id: Option<String>,
    pub error: Option<String>,
}

impl SmokeResult {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeSummary {
    pub results: Vec<SmokeResult>,
}

impl SmokeSummary {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(SmokeResult::succeeded)
    }
}

async fn run_one(submitter: &dyn BatchSubmitter, target: SmokeTarget, token: String) -> SmokeResult {
    let prompts = [smoke_prompt(&token)];
    match submitter.submit_batch(&target.function_name, &target.variant_name, &prompts).await {
        Ok(submission) => {
            info!(target = %target.name, batch_id = %submission.batch_id, "Batch submitted");
            SmokeResult { target, token, batch_id: Some(submission.batch_id), error: None }
        }
        Err(e) => {
            error!(target = %target.name, error = %e, "Batch submission failed");
            SmokeResult { target, token, batch_id: None, error: Some(e.to_string()) }
        }
    }
}

/// Submit every target concurrently and wait for all of them.
pub async fn run_smoke_tests(submitter: &dyn BatchSubmitter, targets: Vec<SmokeTarget>) -> SmokeSummary {
    let runs: Vec<_> = targets
        .into_iter()
        .map(|target| {
            let token = random_token();
            run_one(submitter, target, token)
        })
        .collect();

    let results = join_all(runs).await;
    let failed = results.iter().filter(|r| !r.succeeded()).count();
    info!(targets = results.len(), failed, "Batch smoke tests completed");
    SmokeSummary { results }
}
