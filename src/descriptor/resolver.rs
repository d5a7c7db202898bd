//! Descriptor resolution into a routing table.

use std::path::Path;

use serde_yaml::Value;
use thiserror::Error;

use crate::routing::{EventType, PathPattern, RoutingEntry, RoutingTable};

const DISTRIBUTION_TYPE: &str = "AWS::CloudFront::Distribution";
const VERSION_TYPE: &str = "AWS::Lambda::Version";

/// Error type for descriptor loading.
///
/// Callers treat every variant as "no routing configured" and keep the
/// previous table; none of these may take the proxy down.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read descriptor: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse descriptor: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("descriptor has no {DISTRIBUTION_TYPE} resource")]
    NoDistribution,
    #[error("descriptor yields no function association for any event type")]
    Empty,
}

/// A `LambdaFunctionARN` field, classified before resolution.
#[derive(Debug)]
enum FunctionReference<'a> {
    /// Literal colon-delimited ARN; the function name is segment 7.
    Literal(&'a str),
    /// `{Ref: <logical-id>}` pointing at a function-version resource.
    VersionRef(&'a str),
    /// `{Fn::GetAtt: [<logical-id>, ...]}` naming a function resource.
    GetAtt(&'a str),
}

/// Read and resolve the descriptor file at `path`.
pub fn load(path: &Path) -> Result<RoutingTable, DescriptorError> {
    let text = std::fs::read_to_string(path)?;
    resolve(&text)
}

/// Resolve descriptor text into a routing table.
///
/// Walks the distribution's path-specific cache behaviors in declaration
/// order, then the default behavior bound to the catch-all pattern.
/// Associations the resolver cannot interpret are skipped with a warning.
pub fn resolve(text: &str) -> Result<RoutingTable, DescriptorError> {
    let doc: Value = serde_yaml::from_str(text)?;
    let resources = doc
        .get("Resources")
        .and_then(Value::as_mapping)
        .ok_or(DescriptorError::NoDistribution)?;

    let mut distributions = resources.iter().filter(|(_, resource)| {
        resource.get("Type").and_then(Value::as_str) == Some(DISTRIBUTION_TYPE)
    });
    let (dist_name, distribution) = distributions.next().ok_or(DescriptorError::NoDistribution)?;
    let extra = distributions.count();
    if extra > 0 {
        // Known limitation: only one distribution is honored.
        tracing::warn!(
            distribution = ?dist_name.as_str(),
            ignored = extra,
            "multiple distribution resources in descriptor, using the first"
        );
    }

    let dist_config = distribution
        .get("Properties")
        .and_then(|p| p.get("DistributionConfig"))
        .ok_or(DescriptorError::NoDistribution)?;

    let mut table = RoutingTable::default();

    if let Some(behaviors) = dist_config.get("CacheBehaviors").and_then(Value::as_sequence) {
        for behavior in behaviors {
            let Some(pattern) = behavior.get("PathPattern").and_then(Value::as_str) else {
                tracing::warn!("cache behavior without PathPattern, skipping");
                continue;
            };
            collect_associations(PathPattern::new(pattern), behavior, &doc, &mut table);
        }
    }
    if let Some(default) = dist_config.get("DefaultCacheBehavior") {
        collect_associations(PathPattern::catch_all(), default, &doc, &mut table);
    }

    if table.is_empty() {
        return Err(DescriptorError::Empty);
    }
    tracing::info!(entries = table.len(), "descriptor resolved");
    Ok(table)
}

/// Collect one behavior's `LambdaFunctionAssociations` into the table.
fn collect_associations(pattern: PathPattern, behavior: &Value, doc: &Value, table: &mut RoutingTable) {
    let Some(associations) = behavior
        .get("LambdaFunctionAssociations")
        .and_then(Value::as_sequence)
    else {
        return;
    };

    for association in associations {
        let Some(raw_event) = association.get("EventType").and_then(Value::as_str) else {
            tracing::warn!(pattern = %pattern, "association without EventType, skipping");
            continue;
        };
        let Some(event_type) = EventType::parse(raw_event) else {
            tracing::warn!(
                pattern = %pattern,
                event_type = raw_event,
                "event type not handled by the local pipeline, skipping"
            );
            continue;
        };
        let include_body = association
            .get("IncludeBody")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let Some(arn) = association.get("LambdaFunctionARN") else {
            tracing::warn!(pattern = %pattern, "association without LambdaFunctionARN, skipping");
            continue;
        };
        match resolve_function(arn, doc) {
            Some(function_name) => {
                tracing::debug!(
                    pattern = %pattern,
                    event_type = %event_type,
                    function = %function_name,
                    include_body,
                    "routing entry added"
                );
                table.push(RoutingEntry {
                    pattern: pattern.clone(),
                    event_type,
                    function_name,
                    include_body,
                });
            }
            None => {
                tracing::warn!(
                    pattern = %pattern,
                    reference = ?arn,
                    "unsupported function reference, skipping association"
                );
            }
        }
    }
}

/// Resolve a `LambdaFunctionARN` value to a flat function name.
fn resolve_function(value: &Value, doc: &Value) -> Option<String> {
    match classify_reference(value)? {
        FunctionReference::Literal(arn) => arn_function_name(arn),
        FunctionReference::GetAtt(logical_id) => Some(logical_id.to_string()),
        FunctionReference::VersionRef(logical_id) => {
            let resource = doc.get("Resources")?.get(logical_id)?;
            if resource.get("Type").and_then(Value::as_str) != Some(VERSION_TYPE) {
                return None;
            }
            let function_name = resource.get("Properties")?.get("FunctionName")?;
            match classify_reference(function_name)? {
                FunctionReference::Literal(s) => {
                    // Either a bare name or a full ARN.
                    if s.contains(':') {
                        arn_function_name(s)
                    } else {
                        Some(s.to_string())
                    }
                }
                FunctionReference::VersionRef(name) | FunctionReference::GetAtt(name) => {
                    Some(name.to_string())
                }
            }
        }
    }
}

fn classify_reference(value: &Value) -> Option<FunctionReference<'_>> {
    match value {
        Value::String(s) => Some(FunctionReference::Literal(s)),
        Value::Mapping(_) => {
            if let Some(id) = value.get("Ref").and_then(Value::as_str) {
                return Some(FunctionReference::VersionRef(id));
            }
            get_att_target(value.get("Fn::GetAtt")?).map(FunctionReference::GetAtt)
        }
        // YAML short forms (`!Ref X`, `!GetAtt X.Arn`) arrive as tagged values.
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            match tag.trim_start_matches('!') {
                "Ref" => tagged.value.as_str().map(FunctionReference::VersionRef),
                "GetAtt" | "Fn::GetAtt" => {
                    get_att_target(&tagged.value).map(FunctionReference::GetAtt)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// The resource logical id named by a `Fn::GetAtt` argument, which is
/// either `[LogicalId, Attribute]` or the dotted string form.
fn get_att_target(value: &Value) -> Option<&str> {
    match value {
        Value::Sequence(parts) => parts.first().and_then(Value::as_str),
        Value::String(dotted) => dotted.split('.').next(),
        _ => None,
    }
}

/// Function name is the 7th colon-delimited ARN segment.
fn arn_function_name(arn: &str) -> Option<String> {
    let segment = arn.split(':').nth(6)?;
    if segment.is_empty() {
        return None;
    }
    Some(segment.to_string())
}
