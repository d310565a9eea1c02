//! Vertex AI supervised tuning jobs.

use crate::http::{error_from_response, request_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tuneup_training::job::AdapterSize;
use tuneup_training::{
    FineTuneClient, JobState, JobStatus, TrainingError, TrainingResult, TuningJobId, TuningJobSpec,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTuningJobRequest<'a> {
    base_model: &'a str,
    supervised_tuning_spec: SupervisedTuningSpec<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tuned_model_display_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SupervisedTuningSpec<'a> {
    training_dataset_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_dataset_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "HyperParameters::is_empty")]
    hyper_parameters: HyperParameters,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct HyperParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    epoch_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    learning_rate_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    adapter_size: Option<&'static str>,
}

impl HyperParameters {
    fn is_empty(&self) -> bool {
        self.epoch_count.is_none() && self.learning_rate_multiplier.is_none() && self.adapter_size.is_none()
    }
}

fn adapter_size_name(size: AdapterSize) -> &'static str {
    match size {
        AdapterSize::One => "ADAPTER_SIZE_ONE",
        AdapterSize::Four => "ADAPTER_SIZE_FOUR",
        AdapterSize::Eight => "ADAPTER_SIZE_EIGHT",
        AdapterSize::Sixteen => "ADAPTER_SIZE_SIXTEEN",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TuningJobResource {
    name: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    tuned_model: Option<TunedModel>,
    #[serde(default)]
    error: Option<RpcStatus>,
}

#[derive(Debug, Deserialize)]
struct TunedModel {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    message: Option<String>,
}

/// Map a Vertex `JobState` string onto [`JobState`].
fn map_job_state(state: &str) -> JobState {
    match state {
        "JOB_STATE_QUEUED" | "JOB_STATE_PENDING" => JobState::Pending,
        "JOB_STATE_RUNNING" | "JOB_STATE_CANCELLING" | "JOB_STATE_PAUSED" | "JOB_STATE_UPDATING" => {
            JobState::Running
        }
        "JOB_STATE_SUCCEEDED" | "JOB_STATE_PARTIALLY_SUCCEEDED" => JobState::Succeeded,
        "JOB_STATE_FAILED" | "JOB_STATE_EXPIRED" => JobState::Failed,
        "JOB_STATE_CANCELLED" => JobState::Cancelled,
        other => {
            warn!(state = %other, "Unrecognized tuning job state; treating as pending");
            JobState::Pending
        }
    }
}

/// Client for Vertex AI `tuningJobs` in one project/region.
pub struct VertexTuningClient {
    project_id: String,
    location: String,
    access_token: String,
    http_client: Client,
    base_url: String,
}

impl VertexTuningClient {
    #[must_use]
    pub fn with_access_token(project_id: String, location: String, access_token: String) -> Self {
        let base_url = format!("https://{location}-aiplatform.googleapis.com/v1");
        Self { project_id, location, access_token, http_client: Client::new(), base_url }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn jobs_url(&self) -> String {
        format!("{}/projects/{}/locations/{}/tuningJobs", self.base_url, self.project_id, self.location)
    }

    fn job_url(&self, job_id: &TuningJobId) -> String {
        format!("{}/{}", self.base_url, job_id.0.trim_start_matches('/'))
    }
}

#[async_trait]
impl FineTuneClient for VertexTuningClient {
    fn id(&self) -> &'static str {
        "gcp_vertex_gemini"
    }

    async fn submit(&self, job: &TuningJobSpec) -> TrainingResult<TuningJobId> {
        job.validate()?;

        let request = CreateTuningJobRequest {
            base_model: &job.base_model,
            supervised_tuning_spec: SupervisedTuningSpec {
                training_dataset_uri: &job.training_dataset_uri,
                validation_dataset_uri: job.validation_dataset_uri.as_deref(),
                hyper_parameters: HyperParameters {
                    epoch_count: job.hyperparams.epochs,
                    learning_rate_multiplier: job.hyperparams.learning_rate_multiplier,
                    adapter_size: job.hyperparams.adapter_size.map(adapter_size_name),
                },
            },
            tuned_model_display_name: job.tuned_model_display_name.as_deref(),
        };

        let response = self
            .http_client
            .post(self.jobs_url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("create tuning job", &e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, "create tuning job").await);
        }

        let resource: TuningJobResource = response
            .json()
            .await
            .map_err(|e| TrainingError::Transport(format!("failed to parse tuning job response: {e}")))?;

        info!(job = %resource.name, base_model = %job.base_model, "Submitted tuning job");
        Ok(TuningJobId(resource.name))
    }

    async fn status(&self, job_id: &TuningJobId) -> TrainingResult<JobStatus> {
        let response = self
            .http_client
            .get(self.job_url(job_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| request_error("get tuning job", &e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, &format!("get tuning job {job_id}")).await);
        }

        let resource: TuningJobResource = response
            .json()
            .await
            .map_err(|e| TrainingError::Transport(format!("failed to parse tuning job response: {e}")))?;

        let state = resource.state.as_deref().map_or(JobState::Pending, map_job_state);
        debug!(job = %resource.name, state = %state, "Fetched tuning job status");

        let (tuned_model, endpoint) = resource
            .tuned_model
            .map(|m| (m.model, m.endpoint))
            .unwrap_or((None, None));

        Ok(JobStatus {
            job_id: TuningJobId(resource.name),
            state,
            tuned_model,
            endpoint,
            error: resource.error.and_then(|e| e.message),
        })
    }

    async fn cancel(&self, job_id: &TuningJobId) -> TrainingResult<()> {
        let response = self
            .http_client
            .post(format!("{}:cancel", self.job_url(job_id)))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| request_error("cancel tuning job", &e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, &format!("cancel tuning job {job_id}")).await);
        }
        info!(job = %job_id, "Requested tuning job cancellation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use tuneup_training::TuningHyperParams;

    fn client(server: &mockito::Server) -> VertexTuningClient {
        VertexTuningClient::with_access_token("proj".to_string(), "us-central1".to_string(), "tok".to_string())
            .with_base_url(server.url())
    }

    #[test]
    fn test_job_state_mapping() {
        assert_eq!(map_job_state("JOB_STATE_QUEUED"), JobState::Pending);
        assert_eq!(map_job_state("JOB_STATE_RUNNING"), JobState::Running);
        assert_eq!(map_job_state("JOB_STATE_SUCCEEDED"), JobState::Succeeded);
        assert_eq!(map_job_state("JOB_STATE_EXPIRED"), JobState::Failed);
        assert_eq!(map_job_state("JOB_STATE_CANCELLED"), JobState::Cancelled);
        assert_eq!(map_job_state("SOMETHING_NEW"), JobState::Pending);
    }

    #[tokio::test]
    async fn test_submit_posts_supervised_spec() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/projects/proj/locations/us-central1/tuningJobs")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({
                "baseModel": "gemini-2.0-flash-lite-001",
                "supervisedTuningSpec": {
                    "trainingDatasetUri": "gs://b/train.jsonl",
                    "validationDatasetUri": "gs://b/validation.jsonl",
                    "hyperParameters": {"epochCount": 2, "adapterSize": "ADAPTER_SIZE_FOUR"}
                },
                "tunedModelDisplayName": "extract-tuned"
            })))
            .with_status(200)
            .with_body(r#"{"name": "projects/proj/locations/us-central1/tuningJobs/77", "state": "JOB_STATE_PENDING"}"#)
            .create_async()
            .await;

        let mut spec = TuningJobSpec::new("gemini-2.0-flash-lite-001", "gs://b/train.jsonl")
            .with_validation("gs://b/validation.jsonl")
            .with_display_name("extract-tuned");
        spec.hyperparams = TuningHyperParams { epochs: Some(2), adapter_size: Some(AdapterSize::Four), ..Default::default() };

        let job_id = client(&server).submit(&spec).await.unwrap();
        assert_eq!(job_id.0, "projects/proj/locations/us-central1/tuningJobs/77");
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_status_reads_tuned_model() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock("GET", "/projects/proj/locations/us-central1/tuningJobs/77")
            .with_status(200)
            .with_body(
                json!({
                    "name": "projects/proj/locations/us-central1/tuningJobs/77",
                    "state": "JOB_STATE_SUCCEEDED",
                    "tunedModel": {
                        "model": "projects/proj/locations/us-central1/models/9",
                        "endpoint": "projects/proj/locations/us-central1/endpoints/5"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let status = client(&server)
            .status(&TuningJobId("projects/proj/locations/us-central1/tuningJobs/77".to_string()))
            .await
            .unwrap();

        assert_eq!(status.state, JobState::Succeeded);
        assert_eq!(status.endpoint.as_deref(), Some("projects/proj/locations/us-central1/endpoints/5"));
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_status_carries_failure_message() {
        let mut server = mockito::Server::new_async().await;
        let _get = server
            .mock("GET", "/jobs/1")
            .with_status(200)
            .with_body(r#"{"name": "jobs/1", "state": "JOB_STATE_FAILED", "error": {"code": 3, "message": "bad dataset"}}"#)
            .create_async()
            .await;

        let status = client(&server).status(&TuningJobId("jobs/1".to_string())).await.unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert_eq!(status.error.as_deref(), Some("bad dataset"));
    }

    #[tokio::test]
    async fn test_status_http_error_is_transport() {
        let mut server = mockito::Server::new_async().await;
        let _get = server.mock("GET", "/jobs/1").with_status(503).create_async().await;

        let err = client(&server).status(&TuningJobId("jobs/1".to_string())).await.unwrap_err();
        assert!(matches!(err, TrainingError::Transport(_)));
    }

    #[tokio::test]
    async fn test_cancel_posts_cancel_verb() {
        let mut server = mockito::Server::new_async().await;
        let cancel = server.mock("POST", "/jobs/1:cancel").with_status(200).with_body("{}").create_async().await;

        client(&server).cancel(&TuningJobId("jobs/1".to_string())).await.unwrap();
        cancel.assert_async().await;
    }
}
