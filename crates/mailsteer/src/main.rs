//! `MailSteer` - console host for the mail client control layer
//!
//! Loads accounts, folders and conversations from a JSON fixture into the
//! in-memory provider and drives the controller from stdin commands.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod command;
mod console;

use std::sync::Arc;

use anyhow::Context;
use mailsteer_control::{ControlConfig, ControlHandle, Controller, Event, StateStore};
use mailsteer_core::{Fixture, MemoryProvider};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use command::{Command, HELP, ParseError};
use console::{ConsoleActionBar, ConsoleFolders, ConsoleHost, ConsoleList};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mailsteer=info,mailsteer_control=info,mailsteer_core=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting MailSteer");

    let fixture_path = std::env::args()
        .nth(1)
        .context("usage: mailsteer <fixture.json>")?;
    let contents = tokio::fs::read_to_string(&fixture_path)
        .await
        .with_context(|| format!("reading fixture {fixture_path}"))?;
    let fixture = Fixture::from_json(&contents).context("parsing fixture")?;

    let config = ControlConfig::load(&ControlConfig::default_path())
        .await
        .context("loading config")?;
    let store = StateStore::new(config.state_path());

    let provider = Arc::new(MemoryProvider::from_fixture(fixture));
    let mut controller = Controller::new(Arc::clone(&provider), &config);
    let handle = controller.control_handle();
    controller.attach_list_surface(Some(Box::new(ConsoleList::new(handle.clone()))));
    controller.attach_action_bar(Some(Box::new(ConsoleActionBar)));
    controller.attach_folder_list(Some(Box::new(ConsoleFolders)));
    controller.attach_host(Some(Box::new(ConsoleHost)));

    match store.load().await {
        Ok(Some(snapshot)) => controller.restore(snapshot),
        Ok(None) => {}
        Err(e) => warn!("Ignoring unreadable control state: {}", e),
    }
    controller.start();

    let task = tokio::spawn(async move {
        controller.run().await;
        controller
    });

    shell(&handle, &provider).await?;

    handle.shutdown();
    let controller = task.await.context("controller task failed")?;
    store
        .save(&controller.snapshot())
        .await
        .context("saving control state")?;
    info!("MailSteer stopped");
    Ok(())
}

/// Reads commands from stdin until `quit` or end of input.
async fn shell(handle: &ControlHandle, provider: &MemoryProvider) -> anyhow::Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if !dispatch(handle, provider, command) {
            break;
        }
    }
    Ok(())
}

/// Turns a command into controller events.
///
/// Returns false if the controller is gone.
fn dispatch(handle: &ControlHandle, provider: &MemoryProvider, command: Command) -> bool {
    match command {
        Command::Account(id) => handle.select_account(id),
        Command::Folder(id) => handle.post(Event::OpenFolder(id)),
        Command::Open(id) => match provider.conversation(&id) {
            Some(conversation) => handle.select_conversation(conversation),
            None => {
                println!("no conversation {id}");
                true
            }
        },
        Command::Action(action) => handle.request_action(action),
        Command::Update(update) => handle.post(Event::UpdateConversation(update)),
        Command::Search(query) => handle.post(Event::Search(query)),
        Command::Inbox => handle.post(Event::LoadInbox),
        Command::Refresh => handle.post(Event::RefreshFolder),
        Command::Confirm { action, accepted } => handle.resolve_confirmation(action, accepted),
        Command::Back => handle.post(Event::NavigateBack),
        Command::Help => {
            println!("{HELP}");
            true
        }
        Command::Quit => handle.shutdown(),
    }
}
