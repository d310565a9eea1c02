//! Configuration fragment routing a new variant to a tuned model.

use crate::config::{ConfigError, ConfigResult, VariantConfig};
use serde::Serialize;
use std::collections::BTreeMap;

const PROVIDER_KIND: &str = "gcp_vertex_gemini";

#[derive(Debug, Serialize)]
struct Fragment {
    models: BTreeMap<String, ModelBlock>,
    functions: BTreeMap<String, FunctionBlock>,
}

#[derive(Debug, Serialize)]
struct ModelBlock {
    routing: Vec<String>,
    providers: BTreeMap<String, ProviderBlock>,
}

#[derive(Debug, Serialize)]
struct ProviderBlock {
    #[serde(rename = "type")]
    kind: String,
    endpoint_id: String,
    location: String,
    project_id: String,
}

#[derive(Debug, Serialize)]
struct FunctionBlock {
    variants: BTreeMap<String, VariantBlock>,
}

#[derive(Debug, Serialize)]
struct VariantBlock {
    #[serde(rename = "type")]
    kind: String,
    weight: u32,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assistant_template: Option<String>,
}

/// Inputs for [`render_fragment`].
#[derive(Debug, Clone)]
pub struct FragmentSpec<'a> {
    pub model_name: &'a str,
    /// Tuned endpoint, either a bare id or a full `.../endpoints/<id>` resource name.
    pub endpoint: &'a str,
    pub project_id: &'a str,
    pub location: &'a str,
    pub function_name: &'a str,
    pub variant_name: &'a str,
    /// Variant whose templates the new variant inherits.
    pub templates: &'a VariantConfig,
}

/// Last path segment of an endpoint resource name.
#[must_use]
pub fn endpoint_id(endpoint: &str) -> &str {
    endpoint.trim_end_matches('/').rsplit('/').next().unwrap_or(endpoint)
}

pub fn render_fragment(spec: &FragmentSpec<'_>) -> ConfigResult<String> {
    let endpoint_id = endpoint_id(spec.endpoint);
    if endpoint_id.is_empty() {
        return Err(ConfigError::InvalidValue("tuned endpoint is empty".to_string()));
    }

    let provider = ProviderBlock {
        kind: PROVIDER_KIND.to_string(),
        endpoint_id: endpoint_id.to_string(),
        location: spec.location.to_string(),
        project_id: spec.project_id.to_string(),
    };
    let model = ModelBlock {
        routing: vec![PROVIDER_KIND.to_string()],
        providers: BTreeMap::from([(PROVIDER_KIND.to_string(), provider)]),
    };
    let variant = VariantBlock {
        kind: "chat_completion".to_string(),
        weight: 0,
        model: spec.model_name.to_string(),
        system_template: spec.templates.system_template.clone(),
        user_template: spec.templates.user_template.clone(),
        assistant_template: spec.templates.assistant_template.clone(),
    };

    let fragment = Fragment {
        models: BTreeMap::from([(spec.model_name.to_string(), model)]),
        functions: BTreeMap::from([(
            spec.function_name.to_string(),
            FunctionBlock { variants: BTreeMap::from([(spec.variant_name.to_string(), variant)]) },
        )]),
    };

    toml::to_string(&fragment).map_err(|e| ConfigError::ParseError(format!("failed to render fragment: {e}")))
}
