//! Show how the runtime would treat a request.

use anyhow::{Context as _, Result};
use http::Method;
use offline_cache::{ClassPolicy, KeyNormalizer};
use offline_core::{Destination, RequestDescriptor, RequestMode};
use offline_runtime::RequestClassifier;
use serde::Serialize;

use super::ClassifyArgs;
use crate::context::Context;
use crate::output::class_badge;

#[derive(Serialize)]
struct Classification<'a> {
    url: &'a str,
    class: &'static str,
    cache_key: String,
    policy: ClassPolicy,
}

/// Run the classify command.
pub async fn run(args: ClassifyArgs, ctx: &Context) -> Result<()> {
    let request = build_request(&args)?;
    let config = &ctx.config.runtime;

    let classifier = RequestClassifier::from_config(config);
    let origin = config
        .origin
        .parse()
        .with_context(|| format!("Invalid origin in config: {}", config.origin))?;
    let normalizer = KeyNormalizer::new(origin, config.query.clone());

    let class = classifier.classify(&request);
    let key = normalizer.normalize(&request.url);
    let policy = ClassPolicy::for_class(class, config);

    if ctx.output.is_json() {
        ctx.output.json(&Classification {
            url: &args.url,
            class: class.name(),
            cache_key: key.to_string(),
            policy,
        });
        return Ok(());
    }

    ctx.output.header("Classification");
    ctx.output.kv("class", &class_badge(class.name()));
    ctx.output.kv("cache key", key.as_str());
    ctx.output.kv("strategy", &format!("{:?}", policy.strategy));
    match &policy.partition {
        Some(partition) if policy.writes_cache() => {
            ctx.output.kv("partition", &format!("{}-{}", partition, config.generation));
        }
        _ => ctx.output.kv("partition", "none"),
    }
    if let Some(timeout) = policy.timeout {
        ctx.output.kv("timeout", &format!("{}ms", timeout.as_millis()));
    }

    if ctx.output.is_verbose() {
        ctx.output.info("Key components:");
        for component in key.components() {
            ctx.output.list_item(component);
        }
    }

    Ok(())
}

fn build_request(args: &ClassifyArgs) -> Result<RequestDescriptor> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid method: {}", args.method))?;

    let mut request = RequestDescriptor::new(method, &args.url)?;
    if let Some(accept) = &args.accept {
        request = request.with_header("accept", accept);
    }
    if let Some(destination) = &args.destination {
        request = request.with_destination(Destination::parse(destination));
    }
    if let Some(mode) = &args.mode {
        request = request.with_mode(RequestMode::parse(mode));
    }
    Ok(request)
}
