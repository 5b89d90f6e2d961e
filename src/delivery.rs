//! Outbound delivery seam. The chat-platform transport is an external
//! collaborator; the orchestrator only ever talks to this trait. A real
//! deployment implements it over the platform's send-document/send-message
//! APIs; the CLI harness and tests use the directory-backed sink below.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::session::UserId;

/// One button of an inline menu.
#[derive(Debug, Clone)]
pub struct MenuButton {
    pub label: String,
    /// Opaque callback payload echoed back on tap.
    pub data: String,
}

#[derive(Debug)]
pub enum DeliveryError {
    Io(std::io::Error),
    /// Rejected or dropped by the chat platform.
    Platform(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Io(e) => write!(f, "delivery IO error: {e}"),
            DeliveryError::Platform(msg) => write!(f, "delivery rejected: {msg}"),
        }
    }
}

impl From<std::io::Error> for DeliveryError {
    fn from(e: std::io::Error) -> Self {
        DeliveryError::Io(e)
    }
}

/// Outbound side of a job: files, status lines and button menus.
/// Implementations must read or copy the file during `send_file`: the
/// path lives in the job's working directory, which is deleted right
/// after the job finishes.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn send_file(
        &self,
        user_id: UserId,
        path: &Path,
        name: &str,
    ) -> Result<(), DeliveryError>;

    async fn send_status(&self, user_id: UserId, text: &str) -> Result<(), DeliveryError>;

    async fn show_menu(
        &self,
        user_id: UserId,
        title: &str,
        buttons: Vec<MenuButton>,
    ) -> Result<(), DeliveryError>;
}

/// Directory-backed sink: outputs are copied into a local directory,
/// status lines and menus go to the log. Used by the CLI harness.
pub struct DirectoryDelivery {
    out_dir: PathBuf,
}

impl DirectoryDelivery {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

#[async_trait]
impl DeliverySink for DirectoryDelivery {
    async fn send_file(
        &self,
        user_id: UserId,
        path: &Path,
        name: &str,
    ) -> Result<(), DeliveryError> {
        tokio::fs::create_dir_all(&self.out_dir).await?;
        let target = self.out_dir.join(name);
        tokio::fs::copy(path, &target).await?;
        info!(user_id, output = %target.display(), "file_delivered");
        Ok(())
    }

    async fn send_status(&self, user_id: UserId, text: &str) -> Result<(), DeliveryError> {
        info!(user_id, status = text, "status_delivered");
        Ok(())
    }

    async fn show_menu(
        &self,
        user_id: UserId,
        title: &str,
        buttons: Vec<MenuButton>,
    ) -> Result<(), DeliveryError> {
        let labels = buttons
            .iter()
            .map(|b| b.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        info!(user_id, title, buttons = %labels, "menu_presented");
        Ok(())
    }
}
