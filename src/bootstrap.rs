//! Wiring: identity, persisted directories, session, then the two tasks.
use anyhow::Context;
use log::{error, info};
use std::sync::Arc;
use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::cli::BotConfig;
use crate::contact::ContactDirectory;
use crate::dispatch::Dispatcher;
use crate::ds::{DirectoryService, SessionConnector, SessionReceiptFactory};
use crate::error::DispatchError;
use crate::group::GroupDirectory;
use crate::identity::Identity;
use crate::identity_store::{load_or_create, IdentityStore};
use crate::sender::{spawn_stdin_reader, ProactiveSender};
use crate::storage::FileStore;

/// External collaborators the bot is started with.
pub struct Collaborators {
    pub identities: Arc<dyn IdentityStore>,
    pub directory: Arc<dyn DirectoryService>,
    pub connector: Arc<dyn SessionConnector>,
}

pub struct Bot {
    pub local: Identity,
    pub contacts: Arc<Mutex<ContactDirectory>>,
    pub groups: Arc<Mutex<GroupDirectory>>,
    /// Stops the console reader.
    pub cancel: CancellationToken,
    /// Ends when the inbound source closes or on a fatal error.
    pub dispatch_task: JoinHandle<Result<(), DispatchError>>,
    pub sender_task: JoinHandle<Result<(), DispatchError>>,
}

impl Bot {
    /// Wait for the dispatch loop to finish, then stop the sender.
    pub async fn wait(self) -> anyhow::Result<()> {
        let dispatched = self.dispatch_task.await.context("dispatch task panicked")?;
        self.cancel.cancel();
        let sent = self.sender_task.await.context("sender task panicked")?;
        dispatched?;
        sent?;
        Ok(())
    }
}

pub async fn bootstrap(cfg: &BotConfig, collaborators: Collaborators) -> anyhow::Result<Bot> {
    let local = load_or_create(
        collaborators.identities.as_ref(),
        &cfg.identity_path,
        &cfg.passphrase,
        cfg.create_identity,
    )
    .with_context(|| format!("Failed to load identity from {}", cfg.identity_path.display()))?;
    info!("My ID: ~{} [{local}]", cfg.nickname);

    info!("Loading address book from {}", cfg.address_book_path.display());
    let contacts = ContactDirectory::load(
        collaborators.directory.clone(),
        Arc::new(FileStore::new(&cfg.address_book_path)),
    )
    .context("Loading address book failed")?;

    info!(
        "Loading group directory from {}",
        cfg.group_directory_path.display()
    );
    let groups = GroupDirectory::load(
        local,
        Arc::new(FileStore::new(&cfg.group_directory_path)),
    )
    .context("Loading group directory failed")?;

    let contacts = Arc::new(Mutex::new(contacts));
    let groups = Arc::new(Mutex::new(groups));

    info!("Starting session");
    let session = collaborators
        .connector
        .start(local, &cfg.nickname)
        .await
        .context("Failed to start session")?;

    let dispatcher = Dispatcher::new(
        local,
        contacts.clone(),
        groups.clone(),
        Arc::new(SessionReceiptFactory::new(local)),
        session.outbound.clone(),
        cfg.dispatch.clone(),
    );
    let inbound = session.inbound;
    let dispatch_task = tokio::spawn(async move { dispatcher.run(inbound).await });

    let cancel = CancellationToken::new();
    let sender = ProactiveSender::new(contacts.clone(), session.outbound);
    let greeting = cfg.greeting.clone();
    let console = cfg.console;
    let sender_cancel = cancel.clone();
    let sender_task = tokio::spawn(async move {
        if let Some((to, text)) = greeting {
            info!("Sending initial message to {to}");
            match sender.send_text(&to, &text).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => error!("Initial message to {to} failed: {e}"),
            }
        }
        if console {
            sender.run_console(spawn_stdin_reader(), sender_cancel).await?;
        }
        Ok(())
    });

    Ok(Bot {
        local,
        contacts,
        groups,
        cancel,
        dispatch_task,
        sender_task,
    })
}
