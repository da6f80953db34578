pub mod control_api;
pub mod dispatch;
pub mod executor;
pub mod main_loop;
pub mod net;
pub mod router;

pub use dispatch::{CommandSink, Dispatcher, DiscardSink, KeyComboWorkspace, WorkspaceActions};
pub use executor::{ExecutorProcess, PointerActions, PointerCommand};
pub use main_loop::MainLoop;
pub use net::{ControllerLink, HostLink, LinkEvent, PeerHandle};
pub use router::{Role, RoleRouter};
