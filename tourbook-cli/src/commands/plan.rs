use anyhow::Result;
use clap::Args;
use serde_json::Value;
use tourbook_service::query::Filter;
use tourbook_service::prelude::*;
use tourbook_service::resources::{tours, users};

use crate::utils;

#[derive(Args)]
pub struct PlanArgs {
    /// Query string, with or without the leading `?`
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Resource the query targets
    #[arg(long, value_name = "RESOURCE", default_value = "tours")]
    pub resource: ResourceKind,
}

pub fn execute(args: PlanArgs) -> Result<()> {
    let plan = build_plan(&args.query, args.resource, &QueryOptions::default())?;
    utils::section(&format!("Query plan for /{}/{}", API_PREFIX.trim_start_matches('/'), args.resource));
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// The plan a list request on `resource` would run, without the page check.
fn build_plan(raw: &str, resource: ResourceKind, options: &QueryOptions) -> Result<Value> {
    let spec = QuerySpec::parse(raw.trim_start_matches('?'), &resource.parameter_policy());
    let plan = Query::new(&spec, options)
        .scoped(visibility(resource))
        .filter()
        .sort()
        .limit_fields()
        .window()
        .into_plan();
    Ok(serde_json::to_value(plan)?)
}

fn visibility(resource: ResourceKind) -> Filter {
    match resource {
        ResourceKind::Tours => tours::visibility(),
        ResourceKind::Users => users::visibility(),
        ResourceKind::Reviews | ResourceKind::Bookings => Filter::default(),
    }
}
