use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use agentic_platform::config::PlatformConfig;
use agentic_platform::llm::ModelBackends;
use agentic_platform::logging;
use agentic_platform::mcp::{ToolCallOutcome, ToolRegistry};
use agentic_platform::orchestrator::{AgentDescriptor, ExecutionMode, WorkflowExecutor};

#[derive(Parser)]
#[command(name = "agentic-platform")]
#[command(about = "Agent orchestration core: model backends, MCP tools and versioned prompts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: nearest .platform.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_HOST", global = true)]
    ollama_host: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    #[cfg(feature = "web")]
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Run a prompt through one or more agents
    Run {
        /// Agent as id=backend:model (e.g. writer=ollama:llama3); repeatable
        #[arg(long = "agent", short, required = true)]
        agents: Vec<String>,
        /// Run agents concurrently
        #[arg(long)]
        concurrent: bool,
        /// Prompt text
        prompt: String,
    },
    /// Connect configured MCP servers and list their tools
    Tools,
    /// Call a tool directly
    Call {
        /// Tool name
        tool: String,
        /// Arguments as JSON
        #[arg(long, short)]
        args: Option<String>,
        /// Connection to use (default: the one that advertised the tool)
        #[arg(long)]
        connection: Option<String>,
    },
    /// List models available on the Ollama server
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = PlatformConfig::load_from_path(path)?;
            config.apply_env_overrides();
            config
        }
        None => PlatformConfig::load()?,
    };
    if let Some(host) = cli.ollama_host {
        config.llm.ollama_host = Some(host);
    }

    logging::init(&config.log);

    match cli.command {
        #[cfg(feature = "web")]
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            agentic_platform::web::serve(config).await?;
        }
        Commands::Run {
            agents,
            concurrent,
            prompt,
        } => {
            run_workflow(&config, &agents, concurrent, &prompt).await?;
        }
        Commands::Tools => {
            run_tools(&config).await?;
        }
        Commands::Call {
            tool,
            args,
            connection,
        } => {
            run_call_tool(&config, &tool, args, connection).await?;
        }
        Commands::Models => {
            run_models(&config).await?;
        }
    }

    Ok(())
}

/// Parse `id=backend:model`; backend and model are optional
fn parse_agent_spec(spec: &str) -> Result<AgentDescriptor> {
    let (id, target) = spec.split_once('=').unwrap_or((spec, ""));
    if id.trim().is_empty() {
        bail!("Agent spec '{}' has no id", spec);
    }

    let mut config = serde_json::Map::new();
    if !target.is_empty() {
        let (kind, model) = match target.split_once(':') {
            Some((kind, model)) => (kind, Some(model)),
            None => (target, None),
        };
        config.insert("llm_type".into(), json!(kind));
        if let Some(model) = model.filter(|m| !m.is_empty()) {
            config.insert("model_name".into(), json!(model));
        }
    }

    Ok(AgentDescriptor::new(id.trim(), config.into()))
}

async fn connected_registry(config: &PlatformConfig) -> Arc<ToolRegistry> {
    let registry = Arc::new(ToolRegistry::new());
    if !config.mcp.connections.is_empty() {
        registry.bootstrap(&config.mcp.connections).await;
    }
    registry
}

async fn run_workflow(
    config: &PlatformConfig,
    specs: &[String],
    concurrent: bool,
    prompt: &str,
) -> Result<()> {
    let agents = specs
        .iter()
        .map(|s| parse_agent_spec(s))
        .collect::<Result<Vec<_>>>()?;

    let registry = connected_registry(config).await;
    let backends =
        Arc::new(ModelBackends::new(config.llm.clone()).with_tool_registry(registry.clone()));

    let mode = if concurrent {
        ExecutionMode::Concurrent
    } else {
        config.workflow.mode
    };
    let executor = WorkflowExecutor::new(backends).with_mode(mode);

    let result = executor.run_workflow(&agents, prompt).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    registry.close_all().await;
    Ok(())
}

async fn run_tools(config: &PlatformConfig) -> Result<()> {
    if config.mcp.connections.is_empty() {
        println!("No MCP connections configured.");
        println!("Add [[mcp.connections]] entries to .platform.toml.");
        return Ok(());
    }

    let registry = connected_registry(config).await;

    for connection in registry.list_connections().await {
        let state = if connection.is_connected {
            "connected"
        } else {
            "not connected"
        };
        println!("{} ({}, {})", connection.name, connection.transport, state);
    }
    println!();

    let tools = registry.list_tools().await;
    if tools.is_empty() {
        println!("No tools found.");
    }

    let mut by_server: BTreeMap<String, Vec<_>> = BTreeMap::new();
    for tool in tools {
        by_server
            .entry(tool.server_name.clone())
            .or_default()
            .push(tool);
    }

    for (server, tools) in by_server {
        println!("=== {} ({} tools) ===", server, tools.len());
        for tool in tools {
            let desc = tool.description.lines().next().unwrap_or("No description");
            println!("  {} - {}", tool.name, desc);
        }
        println!();
    }

    registry.close_all().await;
    Ok(())
}

async fn run_call_tool(
    config: &PlatformConfig,
    tool_name: &str,
    args: Option<String>,
    connection: Option<String>,
) -> Result<()> {
    let arguments = match args {
        Some(raw) => serde_json::from_str(&raw).context("--args must be valid JSON")?,
        None => json!({}),
    };

    let registry = connected_registry(config).await;
    let outcome = registry
        .execute_tool(tool_name, arguments, connection.as_deref())
        .await;
    registry.close_all().await;

    match outcome {
        ToolCallOutcome::Success {
            result, connection, ..
        } => {
            println!("Result ({}):", connection);
            println!("{}", result);
            Ok(())
        }
        ToolCallOutcome::Failure { error } => bail!(error),
    }
}

async fn run_models(config: &PlatformConfig) -> Result<()> {
    let backends = ModelBackends::new(config.llm.clone());
    let models = backends.list_local_models().await?;

    if models.is_empty() {
        println!("No models installed.");
    }
    for model in models {
        println!(
            "{:<40} {:>8.1} GB  {}",
            model.name,
            model.size as f64 / 1e9,
            model.modified_at
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_spec() {
        let agent = parse_agent_spec("writer=ollama:llama3:8b").unwrap();
        assert_eq!(agent.id, "writer");
        assert_eq!(agent.llm_type(), "ollama");
        assert_eq!(agent.model_name("fallback"), "llama3:8b");

        let agent = parse_agent_spec("critic=anthropic").unwrap();
        assert_eq!(agent.llm_type(), "anthropic");
        assert_eq!(agent.model_name("fallback"), "fallback");

        let agent = parse_agent_spec("plain").unwrap();
        assert_eq!(agent.llm_type(), "ollama");

        assert!(parse_agent_spec("=openai:gpt-4o").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "agentic-platform",
            "run",
            "--agent",
            "a=openai:gpt-4o",
            "-a",
            "b=mcp:summarize",
            "hello",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { agents, prompt, .. } => {
                assert_eq!(agents.len(), 2);
                assert_eq!(prompt, "hello");
            }
            _ => panic!("expected run"),
        }
    }
}
