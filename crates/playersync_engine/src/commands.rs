//! Named console commands.
//!
//! A [`CommandRegistry`] maps command ids to async actions. Commands are
//! registered inside folders; a command's id is its folder path and name
//! joined with `.`, e.g. `Data.Save`.

use crate::config::PlayerSession;
use crate::console::{ConsoleLog, SYNC_CHANNEL};
use crate::coordinator::SyncCoordinator;
use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use playersync_core::is_metadata_key;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

type BoxFuture = Pin<Box<dyn Future<Output = SyncResult<()>> + Send>>;
type Action = Arc<dyn Fn() -> BoxFuture + Send + Sync>;

/// Error returned by [`CommandRegistry::invoke`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// No registered command matches the name.
    #[error("unknown command: {0}")]
    NotFound(String),

    /// The command ran and failed.
    #[error("{id} failed: {source}")]
    Failed {
        /// Id of the command that failed.
        id: String,
        /// The underlying failure.
        #[source]
        source: SyncError,
    },
}

struct Command {
    id: String,
    action: Action,
}

/// An ordered set of named async commands.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
    folders: Vec<String>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a folder. Commands registered until the matching
    /// [`end_folder`](Self::end_folder) are prefixed with its name.
    pub fn start_folder(&mut self, name: impl Into<String>) {
        self.folders.push(name.into());
    }

    /// Closes the innermost folder.
    pub fn end_folder(&mut self) {
        if self.folders.pop().is_none() {
            error!("tried to end more command folders than were started");
        }
    }

    /// Registers `action` under `name` in the current folder and returns
    /// the command's id. A command with the same id is replaced.
    pub fn register<F, Fut>(&mut self, name: &str, action: F) -> String
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SyncResult<()>> + Send + 'static,
    {
        let id = self
            .folders
            .iter()
            .filter(|f| !f.is_empty())
            .map(String::as_str)
            .chain(std::iter::once(name))
            .collect::<Vec<_>>()
            .join(".");
        let action: Action = Arc::new(move || Box::pin(action()) as BoxFuture);

        match self.commands.iter_mut().find(|c| c.id == id) {
            Some(existing) => existing.action = action,
            None => self.commands.push(Command {
                id: id.clone(),
                action,
            }),
        }
        id
    }

    /// Ids of all commands in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.id.as_str()).collect()
    }

    /// Returns true if [`invoke`](Self::invoke) would find `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Runs the command matching `name`.
    ///
    /// `name` is matched against ids exactly, then case-insensitively, then
    /// case-insensitively against the last segment of each id.
    pub async fn invoke(&self, name: &str) -> Result<(), CommandError> {
        let Some((id, action)) = self.find(name) else {
            debug!(name, "no such command");
            return Err(CommandError::NotFound(name.trim().to_string()));
        };
        action().await.map_err(|source| {
            warn!(command = %id, error = %source, "command failed");
            CommandError::Failed { id, source }
        })
    }

    fn find(&self, name: &str) -> Option<(String, Action)> {
        let name = name.trim();
        self.commands
            .iter()
            .find(|c| c.id == name)
            .or_else(|| self.commands.iter().find(|c| c.id.eq_ignore_ascii_case(name)))
            .or_else(|| {
                self.commands.iter().find(|c| {
                    c.id.rsplit('.')
                        .next()
                        .is_some_and(|last| last.eq_ignore_ascii_case(name))
                })
            })
            .map(|c| (c.id.clone(), c.action.clone()))
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .field("folders", &self.folders)
            .finish()
    }
}

/// Installs the player data commands in a folder named `folder`.
///
/// Sync commands report through the coordinator's own console. Dumps and
/// the gameplay shortcuts write to `console` on the `"Sync"` channel.
pub fn register_sync_commands<T>(
    registry: &mut CommandRegistry,
    folder: &str,
    coordinator: Arc<SyncCoordinator<T>>,
    session: PlayerSession,
    console: Arc<dyn ConsoleLog>,
) where
    T: SyncTransport + 'static,
{
    let session = Arc::new(session);
    registry.start_folder(folder);

    {
        let (sync, session) = (coordinator.clone(), session.clone());
        registry.register("Save", move || {
            let (sync, session) = (sync.clone(), session.clone());
            async move {
                sync.save(&session.player_id, session.token()).await.map(|_| ())
            }
        });
    }

    {
        let (sync, session) = (coordinator.clone(), session.clone());
        registry.register("Load", move || {
            let (sync, session) = (sync.clone(), session.clone());
            async move {
                sync.load(&session.player_id, session.token()).await.map(|_| ())
            }
        });
    }

    {
        let (sync, session) = (coordinator.clone(), session.clone());
        registry.register("Wipe All", move || {
            let (sync, session) = (sync.clone(), session.clone());
            async move {
                sync.wipe_all(&session.player_id, session.token()).await.map(|_| ())
            }
        });
    }

    {
        let (sync, session) = (coordinator.clone(), session.clone());
        registry.register("Delete All Keys", move || {
            let (sync, session) = (sync.clone(), session.clone());
            async move {
                let keys: Vec<String> = sync
                    .with_store(|store| store.get_all_keys())
                    .await
                    .into_iter()
                    .filter(|k| !is_metadata_key(k))
                    .collect();
                sync.delete_keys(&session.player_id, &keys, session.token())
                    .await
                    .map(|_| ())
            }
        });
    }

    for (name, include_metadata) in [("Dump", false), ("Dump With Metadata", true)] {
        let (sync, console) = (coordinator.clone(), console.clone());
        registry.register(name, move || {
            let (sync, console) = (sync.clone(), console.clone());
            async move {
                let dump = sync.with_store(|store| store.debug_dump(include_metadata)).await;
                console.log(SYNC_CHANNEL, &format!("Data: {dump}"));
                Ok(())
            }
        });
    }

    for (name, key, step) in [("Add 100 Coins", "Coins", 100), ("Level Up", "PlayerLevel", 1)] {
        let (sync, console) = (coordinator.clone(), console.clone());
        registry.register(name, move || {
            let (sync, console) = (sync.clone(), console.clone());
            async move {
                let result = sync
                    .with_store_mut(|store| {
                        let value = store.get(key, 0i64).saturating_add(step);
                        store.set(key, value).map(|()| value)
                    })
                    .await;
                match result {
                    Ok(value) => {
                        console.log(SYNC_CHANNEL, &format!("{key}: {value}"));
                        Ok(())
                    }
                    Err(e) => {
                        console.log(SYNC_CHANNEL, &format!("FAILED: {e}"));
                        Err(SyncError::from(e))
                    }
                }
            }
        });
    }

    registry.end_folder();
}
