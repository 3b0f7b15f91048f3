use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use parley_engine::{AgentClient, CancellationToken, ClientConfig, TurnReply};
use parley_tools::{ToolDefinition, ToolError};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Tool-calling chat against a Responses API backend", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(flatten)]
    connection: ConnectionArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct ConnectionArgs {
    /// JSON config file; unset fields fall back to the environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    model: Option<String>,
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long, global = true)]
    instructions: Option<String>,
    #[arg(long, global = true)]
    max_tool_iterations: Option<u32>,
    #[arg(long, global = true, action = clap::ArgAction::SetTrue)]
    parallel_tool_calls: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one prompt and print the reply.
    Run {
        prompt: String,
        /// Print the raw final response instead of its text.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        json: bool,
    },
    /// Interactive conversation. `/reset` clears history, `/exit` quits.
    Chat,
}

#[derive(Deserialize)]
struct EchoArgs {
    text: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = build_config(&cli.connection)?;
    let mut client = AgentClient::new(config, demo_tools());
    match cli.command {
        Commands::Run { prompt, json } => {
            let reply = client.send(prompt).await?;
            println!("{}", render_reply(&reply, json)?);
        }
        Commands::Chat => chat(&mut client).await?,
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .init();
}

fn build_config(args: &ConnectionArgs) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ClientConfig::from_env(),
    };
    if let Some(model) = &args.model {
        config = config.with_model(model);
    }
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(instructions) = &args.instructions {
        config = config.with_instructions(instructions);
    }
    if let Some(limit) = args.max_tool_iterations {
        config = config.with_max_tool_iterations(limit);
    }
    if args.parallel_tool_calls {
        config = config.with_parallel_tool_calls(true);
    }
    tracing::debug!(?config, "resolved client config");
    Ok(config)
}

fn demo_tools() -> Vec<ToolDefinition> {
    vec![ToolDefinition::typed(
        "echo",
        "Echo the given text back to the model.",
        json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
            "additionalProperties": false
        }),
        |args: EchoArgs| async move { Ok::<_, ToolError>(json!({ "text": args.text })) },
    )
    .with_strict(true)]
}

fn render_reply(reply: &TurnReply, raw: bool) -> anyhow::Result<String> {
    if raw {
        return Ok(serde_json::to_string_pretty(&reply.raw_response)?);
    }
    Ok(reply.text.clone())
}

async fn chat(client: &mut AgentClient) -> anyhow::Result<()> {
    if !client.is_ready() {
        anyhow::bail!("missing API key: set PARLEY_API_KEY or OPENAI_API_KEY");
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/exit" => break,
            "/reset" => {
                client.reset();
                println!("(history cleared)");
                continue;
            }
            _ => {}
        }

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });
        let outcome = client.send_with_cancel(line, cancel).await;
        watcher.abort();
        match outcome {
            Ok(reply) => println!("{}", reply.text),
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "parley",
            "run",
            "hello",
            "--model",
            "fixture-model",
            "--max-tool-iterations",
            "3",
            "--parallel-tool-calls",
        ])
        .expect("parse");
        assert_eq!(cli.connection.model.as_deref(), Some("fixture-model"));
        assert_eq!(cli.connection.max_tool_iterations, Some(3));
        assert!(cli.connection.parallel_tool_calls);
        assert!(matches!(cli.command, Commands::Run { ref prompt, json: false } if prompt == "hello"));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("parley.json");
        std::fs::write(
            &path,
            r#"{ "api_key": "sk-file", "model": "file-model", "max_tool_iterations": 4 }"#,
        )
        .expect("write config");
        let args = ConnectionArgs {
            config: Some(path),
            model: Some("flag-model".to_string()),
            ..ConnectionArgs::default()
        };
        let config = build_config(&args).expect("config");

        assert_eq!(config.api_key(), Some("sk-file"));
        assert_eq!(config.model(), "flag-model");
        assert_eq!(config.max_tool_iterations, 4);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("absent.json");
        let args = ConnectionArgs {
            config: Some(path.clone()),
            ..ConnectionArgs::default()
        };
        let err = build_config(&args).err().expect("error");
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[tokio::test]
    async fn run_turn_advertises_echo_tool() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/responses")
                .header("authorization", "Bearer sk-test")
                .body_contains("\"name\":\"echo\"")
                .body_contains("\"strict\":true");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "status": "completed",
                    "output": [{
                        "type": "message",
                        "role": "assistant",
                        "content": [{ "type": "output_text", "text": "pong" }]
                    }]
                }));
        });

        let config = ClientConfig::default()
            .with_api_key("sk-test")
            .with_base_url(server.url("/v1"));
        let mut client = AgentClient::new(config, demo_tools());
        let reply = client.send("ping").await.expect("reply");

        mock.assert();
        assert_eq!(render_reply(&reply, false).expect("render"), "pong");
        assert!(render_reply(&reply, true)
            .expect("render")
            .contains("\"status\": \"completed\""));
    }

    #[tokio::test]
    async fn echo_tool_returns_its_text() {
        let tools = demo_tools();
        let handler = tools[0].handler();
        let output = handler(json!({ "text": "ping" })).await.expect("echo");
        assert_eq!(output, json!({ "text": "ping" }));
        assert!(handler(json!({})).await.is_err());
    }
}
