use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::core::util::quantity::parse_quantity;
use crate::domain::cluster::model::service_info::ServiceType;

/// Body of `POST /api/deployments`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_service_exposure"))]
pub struct DeploymentRequest {
    #[validate(custom(function = "validate_dns_label"))]
    pub name: String,

    #[serde(default = "default_namespace")]
    #[validate(custom(function = "validate_dns_label"))]
    pub namespace: String,

    #[validate(length(min = 1, max = 512))]
    pub image: String,

    /// Upper bound comes from configuration and is checked on submission.
    #[serde(default = "default_replicas")]
    #[validate(range(min = 1))]
    pub replicas: i32,

    #[validate(range(min = 1, max = 65535))]
    pub port: Option<i32>,

    #[serde(default)]
    #[validate(custom(function = "validate_env_names"))]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    #[validate(custom(function = "validate_labels"))]
    pub labels: BTreeMap<String, String>,

    #[validate(custom(function = "validate_labels"))]
    pub node_selector: Option<BTreeMap<String, String>>,

    #[validate(nested)]
    pub resources: Option<ResourceSpec>,

    #[serde(default)]
    pub create_service: bool,

    #[serde(default = "default_service_type")]
    pub service_type: ServiceType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_requests_within_limits"))]
pub struct ResourceSpec {
    #[validate(nested)]
    pub requests: Option<ResourceQuantities>,
    #[validate(nested)]
    pub limits: Option<ResourceQuantities>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ResourceQuantities {
    #[validate(custom(function = "validate_quantity"))]
    pub cpu: Option<String>,
    #[validate(custom(function = "validate_quantity"))]
    pub memory: Option<String>,
}

/// Body of `POST /api/deployments/{namespace}/{name}/scale`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScaleRequest {
    #[validate(range(min = 0))]
    pub replicas: i32,
}

/// Query of `DELETE /api/deployments/{namespace}/{name}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub delete_service: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_replicas() -> i32 {
    1
}

fn default_service_type() -> ServiceType {
    ServiceType::ClusterIP
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

/// RFC 1123 label: lowercase alphanumerics and '-', at most 63 chars,
/// starting and ending with an alphanumeric.
pub fn validate_dns_label(value: &str) -> Result<(), ValidationError> {
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = !value.starts_with('-') && !value.ends_with('-');

    if value.is_empty() || value.len() > 63 || !valid_chars || !valid_edges {
        return Err(invalid(
            "dns_label",
            format!("'{value}' is not a valid DNS-1123 label"),
        ));
    }
    Ok(())
}

fn validate_env_names(env: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    let bad = env.keys().find(|key| {
        let mut chars = key.chars();
        let first_ok = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    });
    match bad {
        Some(key) => Err(invalid(
            "env_name",
            format!("'{key}' is not a valid environment variable name"),
        )),
        None => Ok(()),
    }
}

fn validate_quantity(value: &str) -> Result<(), ValidationError> {
    match parse_quantity(value) {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(()),
        _ => Err(invalid(
            "quantity",
            format!("'{value}' is not a valid resource quantity"),
        )),
    }
}

fn validate_requests_within_limits(spec: &ResourceSpec) -> Result<(), ValidationError> {
    let (Some(requests), Some(limits)) = (&spec.requests, &spec.limits) else {
        return Ok(());
    };
    let pairs = [
        ("cpu", &requests.cpu, &limits.cpu),
        ("memory", &requests.memory, &limits.memory),
    ];
    for (resource, request, limit) in pairs {
        let (Some(request), Some(limit)) = (request, limit) else {
            continue;
        };
        if let (Some(r), Some(l)) = (parse_quantity(request), parse_quantity(limit)) {
            if r > l {
                return Err(invalid(
                    "request_exceeds_limit",
                    format!("{resource} request {request} exceeds its limit {limit}"),
                ));
            }
        }
    }
    Ok(())
}

/// Label keys are `[prefix/]name`: the prefix a DNS-1123 subdomain of at most
/// 253 chars, the name at most 63 alphanumerics plus `-_.` with alphanumeric
/// edges. Values follow the name rule and may be empty.
fn validate_labels(labels: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    for (key, value) in labels {
        if !is_label_key(key) {
            return Err(invalid("label_key", format!("'{key}' is not a valid label key")));
        }
        if !value.is_empty() && !is_label_name(value) {
            return Err(invalid(
                "label_value",
                format!("'{value}' is not a valid value for label '{key}'"),
            ));
        }
    }
    Ok(())
}

fn is_label_key(key: &str) -> bool {
    match key.split_once('/') {
        Some((prefix, name)) => is_dns_subdomain(prefix) && is_label_name(name),
        None => is_label_name(key),
    }
}

fn is_label_name(name: &str) -> bool {
    let edges_ok = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());
    name.len() <= 63
        && edges_ok
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_dns_subdomain(prefix: &str) -> bool {
    prefix.len() <= 253 && prefix.split('.').all(|part| validate_dns_label(part).is_ok())
}

fn validate_service_exposure(request: &DeploymentRequest) -> Result<(), ValidationError> {
    if !request.create_service {
        return Ok(());
    }
    if request.port.is_none() {
        return Err(invalid(
            "service_port",
            "create_service requires a port".to_string(),
        ));
    }
    if request.service_type == ServiceType::ExternalName {
        return Err(invalid(
            "service_type",
            "ExternalName services cannot front a deployment".to_string(),
        ));
    }
    Ok(())
}
