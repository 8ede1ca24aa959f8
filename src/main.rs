use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::UserConfig;
use controller::{Appraiser, ExecuteCommand, MavenDocumentEvent, PomPayload};
use entity::supported_commands;
use serde_json::Value;
use tokio::sync::{mpsc::Sender, oneshot};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{LanguageServer, LspService, Server};
use tracing::{error, info};
use tree_parser::MavenRunner;

mod config;
mod controller;
mod entity;
mod usecase;

const POM_FILE: &str = "pom.xml";

fn is_pom(uri: &Url) -> bool {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        == Some(POM_FILE)
}

#[derive(Debug)]
struct MavenAppraiser {
    tx: Sender<MavenDocumentEvent>,
}

impl MavenAppraiser {
    async fn send(&self, event: MavenDocumentEvent, name: &str) {
        if let Err(e) = self.tx.send(event).await {
            error!("error sending {} event: {}", name, e);
        }
    }

    /// Send an event carrying a reply channel and wait for the reply.
    async fn request<T>(
        &self,
        name: &str,
        event: impl FnOnce(oneshot::Sender<T>) -> MavenDocumentEvent,
    ) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        if let Err(e) = self.tx.send(event(tx)).await {
            error!("error sending {} event: {}", name, e);
            return None;
        }
        rx.await.ok()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for MavenAppraiser {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let config = UserConfig::from_value(params.initialization_options);
        self.send(MavenDocumentEvent::Configured(config), "configured")
            .await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: supported_commands(),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                        ..Default::default()
                    },
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        will_save: None,
                        will_save_wait_until: None,
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("maven-appraiser server initialized!");
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        if !is_pom(&uri) {
            return;
        };
        self.send(
            MavenDocumentEvent::Opened(PomPayload {
                uri,
                text: params.text_document.text,
            }),
            "opened",
        )
        .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if !is_pom(&uri) {
            return;
        };
        // full sync, the last change holds the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.send(
            MavenDocumentEvent::Changed(PomPayload {
                uri,
                text: change.text,
            }),
            "changed",
        )
        .await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if !is_pom(&uri) {
            return;
        };
        if let Some(text) = params.text {
            self.send(MavenDocumentEvent::Saved(PomPayload { uri, text }), "saved")
                .await;
        };
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if !is_pom(&uri) {
            return;
        };
        self.send(MavenDocumentEvent::Closed(uri), "closed").await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        info!("did change configuration: {}", params.settings);
        let config = UserConfig::from_value(Some(params.settings));
        self.send(MavenDocumentEvent::Configured(config), "configured")
            .await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        if !is_pom(&uri) {
            return Ok(None);
        };
        let position = params.text_document_position_params.position;
        Ok(self
            .request("hover", |tx| MavenDocumentEvent::Hovered(uri, position, tx))
            .await
            .flatten())
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        if !is_pom(&uri) {
            return Ok(None);
        };
        let position = params.text_document_position_params.position;
        Ok(self
            .request("goto definition", |tx| {
                MavenDocumentEvent::Gded(uri, position, tx)
            })
            .await
            .flatten())
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        if !is_pom(&uri) {
            return Ok(None);
        };
        let range = params.range;
        let diagnostics = params.context.diagnostics;
        Ok(self
            .request("code action", |tx| {
                MavenDocumentEvent::CodeAction(uri, range, diagnostics, tx)
            })
            .await
            .filter(|actions| !actions.is_empty()))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let Some(command) = ExecuteCommand::parse(&params) else {
            error!("unknown command or arguments: {}", params.command);
            return Ok(None);
        };
        let value = match command {
            ExecuteCommand::DependencyTree(uri) => self
                .request("dependency tree", |tx| {
                    MavenDocumentEvent::DependencyTree(uri, tx)
                })
                .await
                .flatten(),
            ExecuteCommand::GoToEffective {
                uri,
                group_id,
                artifact_id,
            } => self
                .request("go to effective", |tx| {
                    MavenDocumentEvent::GoToEffective(uri, group_id, artifact_id, tx)
                })
                .await
                .flatten(),
            ExecuteCommand::Refresh(uri) => {
                self.send(MavenDocumentEvent::Refresh(uri), "refresh").await;
                None
            }
        };
        Ok(value)
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    ///stdio transport. now only work with stdio transport
    #[arg(short, long, default_value = "true")]
    stdio: bool,
    ///log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the dependency tree of a pom and exit
    Tree {
        /// path to pom.xml
        pom: PathBuf,
        /// print the forest as JSON instead of the normalized text
        #[arg(long)]
        json: bool,
    },
}

/// Resolve and print one tree, without starting the server.
async fn run_tree(pom: PathBuf, json: bool) -> anyhow::Result<()> {
    let pom = dunce::canonicalize(&pom)
        .with_context(|| format!("pom not found: {}", pom.display()))?;
    let output = MavenRunner::new(UserConfig::default().runner_config())
        .resolve(&pom)
        .await
        .with_context(|| format!("resolve {}", pom.display()))?;
    if json {
        serde_json::to_writer_pretty(std::io::stdout(), &output.tree)?;
        println!();
    } else {
        print!("{}", output.normalized_text());
    }
    for id in &output.conflicts {
        let node = output.tree.node(*id);
        eprintln!(
            "conflict: {}:{} conflicts with {}",
            node.coordinates(),
            node.requested_version.as_deref().unwrap_or(&node.version),
            node.effective_version()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    //logging, stdout belongs to the lsp transport
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if let Some(Command::Tree { pom, json }) = args.command {
        if let Err(e) = run_tree(pom, json).await {
            error!("{:#}", e);
            std::process::exit(1);
        }
        return;
    }

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| {
        let tx = Appraiser::new(client, UserConfig::default()).initialize();
        MavenAppraiser { tx }
    });

    Server::new(stdin, stdout, socket).serve(service).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pom() {
        assert!(is_pom(&Url::parse("file:///p/pom.xml").unwrap()));
        assert!(!is_pom(&Url::parse("file:///p/build.gradle").unwrap()));
        assert!(!is_pom(&Url::parse("file:///p/mypom.xml").unwrap()));
        assert!(!is_pom(&Url::parse("file:///p/pom.xml.bak").unwrap()));
    }

    #[test]
    fn test_tree_subcommand_args() {
        let args = Args::parse_from(["maven-appraiser", "tree", "pom.xml", "--json"]);
        match args.command {
            Some(Command::Tree { pom, json }) => {
                assert_eq!(pom, PathBuf::from("pom.xml"));
                assert!(json);
            }
            None => panic!("expected tree subcommand"),
        }
        let args = Args::parse_from(["maven-appraiser", "--stdio"]);
        assert!(args.command.is_none());
    }
}
