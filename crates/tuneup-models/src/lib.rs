//! Service clients for Tuneup.
//!
//! Concrete implementations of the `tuneup-training` seams:
//!
//! - **Cloud Storage**: `ObjectStore` with create-only uploads
//! - **Vertex AI**: `FineTuneClient` for supervised tuning jobs
//! - **Gateway**: `InferenceSource` over stored inferences, plus batch inference

pub mod gateway;
pub mod gcs;
mod http;
pub mod vertex;

pub use gateway::{BatchSubmission, GatewayClient};
pub use gcs::GcsObjectStore;
pub use vertex::VertexTuningClient;
