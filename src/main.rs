//! `edge-client` command-line tool.
//!
//! Frames and deframes gRPC messages, runs a request through the filter chain
//! against the in-process loopback engine, and checks configuration files.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;

use edge_client::config::{load_config, ClientConfig};
use edge_client::error::StreamError;
use edge_client::filter::LoggingFilter;
use edge_client::grpc::{encode_message, GrpcMessageDecoder};
use edge_client::headers::{
    Headers, RequestHeadersBuilder, RequestMethod, ResponseHeaders, ResponseTrailers,
};
use edge_client::observability::init_logging;
use edge_client::{LoopbackEngine, StreamClient};

const ECHO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "edge-client")]
#[command(about = "HTTP/gRPC stream client tooling", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the gRPC frame of a file's bytes as hex
    Frame { file: PathBuf },
    /// Decode a hex frame dump and list its messages
    Deframe { file: PathBuf },
    /// Send a request through the filter chain to the loopback engine
    Echo {
        #[arg(long)]
        path: String,
        #[arg(long)]
        authority: String,
        #[arg(long)]
        body: Option<String>,
        /// Extra request header, repeatable
        #[arg(long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,
    },
    /// Load and validate a configuration file
    CheckConfig { file: PathBuf },
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected name=value, got {raw:?}")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ClientConfig::default(),
    };
    init_logging(&config.logging);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: ClientConfig) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Frame { file } => {
            let message = fs::read(&file)?;
            let frame = encode_message(&message)?;
            println!("{}", hex::encode(&frame));
        }
        Commands::Deframe { file } => deframe(&file)?,
        Commands::Echo {
            path,
            authority,
            body,
            headers,
        } => {
            let response = echo(config, &path, &authority, body, headers).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::CheckConfig { file } => {
            let checked = load_config(&file)?;
            tracing::info!(path = %file.display(), "Configuration is valid");
            println!("{}", toml::to_string_pretty(&checked)?);
        }
    }
    Ok(())
}

fn deframe(file: &Path) -> Result<(), Box<dyn Error>> {
    let dump: String = fs::read_to_string(file)?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let bytes = hex::decode(dump)?;

    let mut decoder = GrpcMessageDecoder::new();
    let mut index = 0;
    decoder.decode(&bytes, true, |message, end_stream| {
        println!("message {index}: {} bytes, end_stream={end_stream}", message.len());
        index += 1;
    })?;

    if !decoder.is_idle() {
        return Err(format!(
            "{} trailing bytes do not form a complete frame",
            decoder.buffered_len()
        )
        .into());
    }
    Ok(())
}

enum EchoEvent {
    Headers(ResponseHeaders),
    Data(Bytes),
    Trailers(ResponseTrailers),
    Error(StreamError),
    Cancel,
    Complete,
}

#[derive(Serialize, Default)]
struct EchoResponse {
    status: Option<u16>,
    headers: BTreeMap<String, Vec<String>>,
    body: String,
    trailers: BTreeMap<String, Vec<String>>,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn echo(
    config: ClientConfig,
    path: &str,
    authority: &str,
    body: Option<String>,
    extra_headers: Vec<(String, String)>,
) -> Result<EchoResponse, Box<dyn Error>> {
    let engine = Arc::new(LoopbackEngine::new());
    let mut client = StreamClient::new(&engine, config);
    client.register_filter(LoggingFilter::instance);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let on_headers = tx.clone();
    let on_data = tx.clone();
    let on_trailers = tx.clone();
    let on_error = tx.clone();
    let on_cancel = tx.clone();
    let on_complete = tx;

    let stream = client
        .new_stream_prototype()
        .set_on_response_headers(move |headers, _| {
            let _ = on_headers.send(EchoEvent::Headers(headers));
        })
        .set_on_response_data(move |data, _| {
            let _ = on_data.send(EchoEvent::Data(data));
        })
        .set_on_response_trailers(move |trailers| {
            let _ = on_trailers.send(EchoEvent::Trailers(trailers));
        })
        .set_on_error(move |error| {
            let _ = on_error.send(EchoEvent::Error(error));
        })
        .set_on_cancel(move || {
            let _ = on_cancel.send(EchoEvent::Cancel);
        })
        .set_on_complete(move || {
            let _ = on_complete.send(EchoEvent::Complete);
        })
        .start()?;

    let method = if body.is_some() {
        RequestMethod::Post
    } else {
        RequestMethod::Get
    };
    let mut builder = RequestHeadersBuilder::new(method, "https", authority, path);
    for (name, value) in extra_headers {
        builder.add(&name, value);
    }

    match body {
        Some(body) => {
            stream.send_headers(builder.build(), false)?;
            stream.close_with_data(body)?;
        }
        None => stream.send_headers(builder.build(), true)?,
    }

    let mut response = EchoResponse::default();
    let mut received = BytesMut::new();
    let finished = tokio::time::timeout(ECHO_TIMEOUT, async {
        while let Some(event) = rx.recv().await {
            match event {
                EchoEvent::Headers(headers) => {
                    response.status = headers.http_status();
                    response.headers = headers.all_headers().into_iter().collect();
                }
                EchoEvent::Data(data) => received.extend_from_slice(&data),
                EchoEvent::Trailers(trailers) => {
                    response.trailers = trailers.all_headers().into_iter().collect();
                }
                EchoEvent::Error(error) => {
                    response.outcome = "error";
                    response.error = Some(error.to_string());
                    return;
                }
                EchoEvent::Cancel => {
                    response.outcome = "cancelled";
                    return;
                }
                EchoEvent::Complete => {
                    response.outcome = "complete";
                    return;
                }
            }
        }
    })
    .await;

    if finished.is_err() {
        stream.cancel();
        return Err(format!("no response within {}s", ECHO_TIMEOUT.as_secs()).into());
    }
    response.body = String::from_utf8_lossy(&received).into_owned();
    Ok(response)
}
