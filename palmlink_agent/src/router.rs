use crate::dispatch::CommandSink;
use crate::net::PeerHandle;
use palmlink_protocol::{GestureSnapshot, MouseEvent, PeerCommand, PeerMessage};
use palmlink_tracker::Command;
use serde_json::Value;
use tracing::debug;

/// A device's position in the control topology. Exactly one role is
/// active per running instance; it decides routing, never classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    None,
    Standalone,
    Host,
    Controller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::None => "none",
            Role::Standalone => "standalone",
            Role::Host => "host",
            Role::Controller => "controller",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`, expected standalone, host, or controller")]
pub struct UnknownRole(String);

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Role::None),
            "standalone" => Ok(Role::Standalone),
            "host" => Ok(Role::Host),
            "controller" => Ok(Role::Controller),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Display-only view of the connected controller, merged from untagged
/// telemetry payloads. Never dispatched.
#[derive(Debug, Clone, Default)]
pub struct RemoteState {
    pub last_telemetry: Option<Value>,
}

/// Routes generated commands by role: standalone and host dispatch
/// locally, a controller forwards everything over the peer link (or drops
/// it when no link is open). Inbound peer traffic feeds the same local
/// dispatch path on the host.
pub struct RoleRouter {
    role: Role,
    peer: Option<PeerHandle>,
    link_open: bool,
    remote: RemoteState,
}

impl RoleRouter {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            peer: None,
            link_open: false,
            remote: RemoteState::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Switching role tears down the active session. Messages queued for
    /// the old session are not flushed.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        self.peer = None;
        self.link_open = false;
        self.remote = RemoteState::default();
    }

    pub fn attach_peer(&mut self, handle: PeerHandle) {
        self.peer = Some(handle);
    }

    pub fn link_opened(&mut self) {
        self.link_open = true;
    }

    pub fn link_closed(&mut self) {
        self.link_open = false;
    }

    pub fn link_open(&self) -> bool {
        self.link_open
    }

    pub fn remote(&self) -> &RemoteState {
        &self.remote
    }

    /// Route one locally generated command.
    pub fn route(&mut self, command: Command, sink: &mut dyn CommandSink) {
        match self.role {
            Role::Standalone | Role::Host => match command {
                Command::Control(action) => sink.dispatch_control(action),
                Command::Mouse(event) => sink.dispatch_mouse(event),
            },
            Role::Controller => {
                if !self.link_open {
                    debug!("no open peer link, command dropped");
                    return;
                }
                let message = match command {
                    Command::Control(action) => PeerMessage::Command(PeerCommand::control(action)),
                    Command::Mouse(event) => PeerMessage::Command(PeerCommand::mouse(event)),
                };
                if let Some(peer) = &self.peer {
                    peer.send(message);
                }
            }
            Role::None => {}
        }
    }

    /// Best-effort telemetry broadcast; only a controller with an open
    /// link sends anything.
    pub fn publish_telemetry(&self, snapshot: &GestureSnapshot) {
        if self.role != Role::Controller || !self.link_open {
            return;
        }
        let (Some(peer), Ok(value)) = (&self.peer, serde_json::to_value(snapshot)) else {
            return;
        };
        peer.send(PeerMessage::State(value));
    }

    /// Feed one inbound peer message into the local dispatch path. Only a
    /// host dispatches; tagged commands behave exactly as if generated
    /// locally, anything else is display-only state.
    pub fn handle_peer(&mut self, message: PeerMessage, sink: &mut dyn CommandSink) {
        if self.role != Role::Host {
            debug!(role = self.role.as_str(), "inbound peer message ignored");
            return;
        }
        match message {
            PeerMessage::Command(PeerCommand::Control { action }) => sink.dispatch_control(action),
            PeerMessage::Command(PeerCommand::Mouse { mouse_type, x, y }) => {
                sink.dispatch_mouse(MouseEvent::new(mouse_type, x, y))
            }
            PeerMessage::State(value) => self.remote.last_telemetry = Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::outbound_channel;
    use palmlink_protocol::{ControlAction, Gesture, MouseKind};

    #[derive(Default)]
    struct RecordingSink {
        controls: Vec<ControlAction>,
        mouse: Vec<MouseEvent>,
    }

    impl CommandSink for RecordingSink {
        fn dispatch_control(&mut self, action: ControlAction) {
            self.controls.push(action);
        }

        fn dispatch_mouse(&mut self, event: MouseEvent) {
            self.mouse.push(event);
        }
    }

    fn snapshot() -> GestureSnapshot {
        GestureSnapshot {
            hand_position: [0.0, 0.0, 0.0],
            is_pinching: false,
            is_open_palm: true,
            gesture: Gesture::OpenPalm,
        }
    }

    #[test]
    fn standalone_dispatches_locally_and_never_sends() {
        let (handle, rx) = outbound_channel();
        let mut router = RoleRouter::new(Role::Standalone);
        router.attach_peer(handle);
        router.link_opened();
        let mut sink = RecordingSink::default();

        router.route(Command::Control(ControlAction::SwipeUp), &mut sink);
        router.route(
            Command::Mouse(MouseEvent::new(MouseKind::Move, 1.0, 2.0)),
            &mut sink,
        );
        router.publish_telemetry(&snapshot());

        assert_eq!(sink.controls, vec![ControlAction::SwipeUp]);
        assert_eq!(sink.mouse.len(), 1);
        assert!(rx.try_recv().is_err(), "standalone must never touch the link");
    }

    #[test]
    fn controller_forwards_and_never_dispatches() {
        let (handle, rx) = outbound_channel();
        let mut router = RoleRouter::new(Role::Controller);
        router.attach_peer(handle);
        router.link_opened();
        let mut sink = RecordingSink::default();

        router.route(Command::Control(ControlAction::SwipeLeft), &mut sink);
        router.route(
            Command::Mouse(MouseEvent::new(MouseKind::Down, 10.0, 20.0)),
            &mut sink,
        );

        assert!(sink.controls.is_empty() && sink.mouse.is_empty());
        assert_eq!(
            rx.try_recv().unwrap(),
            PeerMessage::Command(PeerCommand::control(ControlAction::SwipeLeft))
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            PeerMessage::Command(PeerCommand::Mouse {
                mouse_type: MouseKind::Down,
                x: 10.0,
                y: 20.0,
            })
        );
    }

    #[test]
    fn controller_without_open_link_drops_commands() {
        let (handle, rx) = outbound_channel();
        let mut router = RoleRouter::new(Role::Controller);
        router.attach_peer(handle);
        let mut sink = RecordingSink::default();

        router.route(Command::Control(ControlAction::SwipeDown), &mut sink);

        assert!(sink.controls.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn host_dispatches_inbound_commands_like_local_ones() {
        let mut router = RoleRouter::new(Role::Host);
        let mut sink = RecordingSink::default();

        router.handle_peer(
            PeerMessage::Command(PeerCommand::control(ControlAction::SwipeRight)),
            &mut sink,
        );
        router.handle_peer(
            PeerMessage::Command(PeerCommand::Mouse {
                mouse_type: MouseKind::Drag,
                x: 5.0,
                y: 6.0,
            }),
            &mut sink,
        );

        assert_eq!(sink.controls, vec![ControlAction::SwipeRight]);
        assert_eq!(sink.mouse, vec![MouseEvent::new(MouseKind::Drag, 5.0, 6.0)]);
    }

    #[test]
    fn telemetry_merges_into_remote_state_without_dispatch() {
        let mut router = RoleRouter::new(Role::Host);
        let mut sink = RecordingSink::default();

        let value = serde_json::to_value(snapshot()).unwrap();
        router.handle_peer(PeerMessage::State(value.clone()), &mut sink);

        assert!(sink.controls.is_empty() && sink.mouse.is_empty());
        assert_eq!(router.remote().last_telemetry, Some(value));
    }

    #[test]
    fn telemetry_rides_the_link_for_an_open_controller() {
        let (handle, rx) = outbound_channel();
        let mut router = RoleRouter::new(Role::Controller);
        router.attach_peer(handle);
        router.link_opened();

        router.publish_telemetry(&snapshot());
        assert!(matches!(rx.try_recv().unwrap(), PeerMessage::State(_)));
    }

    #[test]
    fn role_change_tears_down_the_session() {
        let (handle, rx) = outbound_channel();
        let mut router = RoleRouter::new(Role::Controller);
        router.attach_peer(handle);
        router.link_opened();

        router.set_role(Role::Standalone);
        let mut sink = RecordingSink::default();
        router.route(Command::Control(ControlAction::SwipeUp), &mut sink);

        assert!(!router.link_open());
        assert_eq!(sink.controls, vec![ControlAction::SwipeUp]);
        assert!(rx.try_recv().is_err());
    }
}
