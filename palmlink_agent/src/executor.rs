use palmlink_protocol::{MouseEvent, MouseKind};
use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::info;

/// Typed form of the executor's stdin line protocol. Keeping the enum at
/// the boundary means a malformed internal state cannot produce an
/// invalid text command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerCommand {
    Move { x: f64, y: f64 },
    LeftDown,
    LeftUp,
    RightClick,
    Drag { x: f64, y: f64 },
}

impl PointerCommand {
    pub fn from_event(event: &MouseEvent) -> Self {
        match event.kind {
            MouseKind::Move => PointerCommand::Move {
                x: event.x,
                y: event.y,
            },
            MouseKind::Down => PointerCommand::LeftDown,
            MouseKind::Up => PointerCommand::LeftUp,
            MouseKind::RightClick => PointerCommand::RightClick,
            MouseKind::Drag => PointerCommand::Drag {
                x: event.x,
                y: event.y,
            },
        }
    }

    /// One line of the wire protocol, newline included.
    pub fn encode(&self) -> String {
        match self {
            PointerCommand::Move { x, y } => format!("m {x} {y}\n"),
            PointerCommand::LeftDown => "l\n".to_string(),
            PointerCommand::LeftUp => "u\n".to_string(),
            PointerCommand::RightClick => "r\n".to_string(),
            PointerCommand::Drag { x, y } => format!("d {x} {y}\n"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("executor command is empty")]
    EmptyCommand,
    #[error("failed to spawn executor `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("executor stdin unavailable")]
    MissingStdin,
    #[error("executor write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// The pointer side of the action executor.
pub trait PointerActions {
    fn send(&mut self, command: PointerCommand) -> Result<(), ExecutorError>;
}

/// Long-lived pointer-executor subprocess. Commands are written to its
/// stdin; no acknowledgment is ever read back.
pub struct ExecutorProcess {
    child: Child,
    stdin: ChildStdin,
}

impl ExecutorProcess {
    /// `command` is a program plus arguments, e.g.
    /// `["swift", "mouse_control.swift"]`.
    pub fn spawn(command: &[String]) -> Result<Self, ExecutorError> {
        let (program, args) = command.split_first().ok_or(ExecutorError::EmptyCommand)?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ExecutorError::Spawn {
                command: program.clone(),
                source,
            })?;
        let stdin = child.stdin.take().ok_or(ExecutorError::MissingStdin)?;
        info!(program = %program, "pointer executor spawned");
        Ok(Self { child, stdin })
    }
}

impl PointerActions for ExecutorProcess {
    fn send(&mut self, command: PointerCommand) -> Result<(), ExecutorError> {
        self.stdin.write_all(command.encode().as_bytes())?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for ExecutorProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
