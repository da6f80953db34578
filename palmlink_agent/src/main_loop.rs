use crate::dispatch::CommandSink;
use crate::net::LinkEvent;
use crate::router::RoleRouter;
use crossbeam_channel::{Receiver, TryRecvError};
use palmlink_tracker::{FrameError, FrameSource, Pipeline, TimedFrame};
use std::time::Instant;
use tracing::info;

/// Single-threaded agent core: each tick drains link events, feeds
/// inbound peer traffic to the router, then pushes at most one frame
/// through the pipeline. Nothing here ever blocks on delivery.
pub struct MainLoop {
    pipeline: Pipeline,
    router: RoleRouter,
    link_events: Option<Receiver<LinkEvent>>,
}

impl MainLoop {
    pub fn new(
        pipeline: Pipeline,
        router: RoleRouter,
        link_events: Option<Receiver<LinkEvent>>,
    ) -> Self {
        Self {
            pipeline,
            router,
            link_events,
        }
    }

    pub fn router(&self) -> &RoleRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut RoleRouter {
        &mut self.router
    }

    /// One scheduling pass. A duplicate-timestamp frame is skipped inside
    /// the pipeline.
    pub fn tick(&mut self, frame: Option<&TimedFrame>, now: Instant, sink: &mut dyn CommandSink) {
        self.pump_link_events(sink);

        let Some(frame) = frame else { return };
        let Some(output) = self.pipeline.process(frame, now) else {
            return;
        };
        self.router.publish_telemetry(&output.state.snapshot());
        for command in output.commands {
            self.router.route(command, sink);
        }
    }

    fn pump_link_events(&mut self, sink: &mut dyn CommandSink) {
        let Some(events) = &self.link_events else { return };
        loop {
            match events.try_recv() {
                Ok(LinkEvent::Opened) => {
                    info!("peer link open");
                    self.router.link_opened();
                }
                Ok(LinkEvent::Closed) => {
                    info!("peer link closed");
                    self.router.link_closed();
                }
                Ok(LinkEvent::Inbound(message)) => self.router.handle_peer(message, sink),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Drive the loop from a frame source until its stream ends. On the
    /// way out an in-progress drag is closed with a final UP.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn CommandSink,
    ) -> Result<(), FrameError> {
        while let Some(frame) = source.next_frame()? {
            self.tick(Some(&frame), Instant::now(), sink);
        }
        if let Some(command) = self.pipeline.reset() {
            self.router.route(command, sink);
        }
        self.tick(None, Instant::now(), sink);
        Ok(())
    }
}
