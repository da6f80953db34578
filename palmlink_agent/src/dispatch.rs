use crate::executor::{PointerActions, PointerCommand};
use palmlink_protocol::{ControlAction, MouseEvent};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, warn};

/// The local dispatch seam the role router writes to.
pub trait CommandSink {
    fn dispatch_control(&mut self, action: ControlAction);
    fn dispatch_mouse(&mut self, event: MouseEvent);
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace command failed to start: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("workspace command exited with {0}")]
    Failed(std::process::ExitStatus),
}

/// The workspace-navigation side of the action executor: each action is
/// one fixed key-combination effect. Failure is reported, never retried.
pub trait WorkspaceActions: Send + Sync {
    fn perform(&self, action: ControlAction) -> Result<(), WorkspaceError>;
}

/// Runs the ctrl+arrow workspace-navigation key codes through
/// `osascript`.
pub struct KeyComboWorkspace;

impl KeyComboWorkspace {
    fn key_code(action: ControlAction) -> u8 {
        match action {
            ControlAction::SwipeLeft => 123,
            ControlAction::SwipeRight => 124,
            ControlAction::SwipeUp => 126,
            ControlAction::SwipeDown => 125,
        }
    }
}

impl WorkspaceActions for KeyComboWorkspace {
    fn perform(&self, action: ControlAction) -> Result<(), WorkspaceError> {
        let script = format!(
            "tell application \"System Events\" to key code {} using control down",
            Self::key_code(action)
        );
        let status = Command::new("osascript").arg("-e").arg(script).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(WorkspaceError::Failed(status))
        }
    }
}

/// Local dispatcher: mouse events go to the pointer executor, control
/// actions to the workspace backend. Failures are logged and the command
/// dropped.
pub struct Dispatcher<P> {
    pointer: P,
    workspace: Arc<dyn WorkspaceActions>,
}

impl<P: PointerActions> Dispatcher<P> {
    pub fn new(pointer: P, workspace: Arc<dyn WorkspaceActions>) -> Self {
        Self { pointer, workspace }
    }
}

impl<P: PointerActions> CommandSink for Dispatcher<P> {
    fn dispatch_control(&mut self, action: ControlAction) {
        if let Err(err) = self.workspace.perform(action) {
            warn!(action = action.as_str(), %err, "workspace command failed");
        }
    }

    fn dispatch_mouse(&mut self, event: MouseEvent) {
        if let Err(err) = self.pointer.send(PointerCommand::from_event(&event)) {
            warn!(%err, "pointer executor write failed");
        }
    }
}

/// Sink for roles that never dispatch locally.
pub struct DiscardSink;

impl CommandSink for DiscardSink {
    fn dispatch_control(&mut self, action: ControlAction) {
        debug!(action = action.as_str(), "command discarded, no local dispatcher");
    }

    fn dispatch_mouse(&mut self, _event: MouseEvent) {
        debug!("mouse command discarded, no local dispatcher");
    }
}
