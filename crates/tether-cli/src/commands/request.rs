//! Request command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;

use tether_http::{ApiRequest, Method};

use crate::output;
use crate::session::{self, LOGIN_HINT};

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,

    /// Path relative to the base URL (e.g. requests/)
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub data: Option<String>,

    /// Query parameter as key=value; repeatable
    #[arg(long = "query", short = 'q', value_parser = parse_query)]
    pub query: Vec<(String, String)>,
}

fn parse_query(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    Ok((key.to_string(), value.to_string()))
}

pub async fn run(args: RequestArgs, base_url: &str) -> Result<()> {
    let (client, _) = session::open(base_url)?;

    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;

    let query: Vec<(&str, &str)> = args
        .query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let mut request = ApiRequest::new(method, &args.path).query(&query);
    if let Some(data) = &args.data {
        let body: serde_json::Value =
            serde_json::from_str(data).context("--data is not valid JSON")?;
        request = request.json(&body)?;
    }

    let response = match client.send(request).await {
        Ok(response) => response,
        Err(e) if e.is_session_expired() => bail!("Session expired. {LOGIN_HINT}"),
        Err(e) => return Err(anyhow::Error::new(e).context("Request failed")),
    };

    output::body(response.body())?;

    let status = response.status();
    if !status.is_success() {
        bail!("Server responded with {status}");
    }
    Ok(())
}
