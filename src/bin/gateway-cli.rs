use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use reqwest::header::CONTENT_DISPOSITION;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Query Loki through a running grafana-session-proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:5011")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Range {
    /// LogQL expression.
    query: String,
    /// Start, nanoseconds since epoch. Defaults to one hour before `end`.
    #[arg(long)]
    start: Option<i64>,
    /// End, nanoseconds since epoch. Defaults to now.
    #[arg(long)]
    end: Option<i64>,
    #[arg(long, default_value_t = 1000)]
    limit: u32,
}

impl Range {
    fn resolve(&self) -> (i64, i64) {
        let end = self
            .end
            .unwrap_or_else(|| Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let start = self.start.unwrap_or(end - 3_600 * 1_000_000_000);
        (start, end)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List label names
    Labels,
    /// List values of one label
    Values { name: String },
    /// Run a ranged query and print the JSON result
    Query(Range),
    /// Export a ranged query to a file
    Export {
        #[command(flatten)]
        range: Range,
        /// json or csv
        #[arg(long, default_value = "csv")]
        format: String,
        /// Output path. Defaults to the server-provided file name.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder().no_proxy().build()?;
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Labels => {
            let res = client.get(format!("{}/api/labels", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Values { name } => {
            let mut url = reqwest::Url::parse(&format!("{}/api/label", base))?;
            url.path_segments_mut()
                .map_err(|_| "base URL cannot have paths")?
                .extend([name.as_str(), "values"]);
            let res = client.get(url).send().await?;
            print_response(res).await?;
        }
        Commands::Query(range) => {
            let (start, end) = range.resolve();
            let res = client
                .get(format!("{}/api/query_range", base))
                .query(&[
                    ("query", range.query.clone()),
                    ("start", start.to_string()),
                    ("end", end.to_string()),
                    ("limit", range.limit.to_string()),
                ])
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Export {
            range,
            format,
            output,
        } => {
            let (start, end) = range.resolve();
            let res = client
                .post(format!("{}/api/export", base))
                .json(&json!({
                    "query": range.query,
                    "start": start,
                    "end": end,
                    "limit": range.limit,
                    "format": &format,
                }))
                .send()
                .await?;

            if !res.status().is_success() {
                return report_failure(res).await;
            }

            let path = output
                .or_else(|| attachment_name(&res).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(format!("loki-export.{}", format)));
            let bytes = res.bytes().await?;
            tokio::fs::write(&path, &bytes).await?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
    }

    Ok(())
}

fn attachment_name(res: &reqwest::Response) -> Option<String> {
    let value = res.headers().get(CONTENT_DISPOSITION)?.to_str().ok()?;
    let name = value.split("filename=").nth(1)?.trim_matches('"');
    (!name.is_empty() && !name.contains(['/', '\\'])).then(|| name.to_string())
}

async fn report_failure(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Error: gateway returned status {}", res.status());
    if let Ok(text) = res.text().await {
        eprintln!("Response: {}", text);
    }
    std::process::exit(1);
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if !res.status().is_success() {
        return report_failure(res).await;
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
