pub mod classifier;
pub mod emitter;
pub mod landmarks;
pub mod pipeline;
pub mod two_hand;

pub use classifier::{Classifier, ClassifierConfig, GestureState};
pub use emitter::{Command, CommandEmitter, EmitterConfig, PointerPhase};
pub use landmarks::{Hand, HandFrame, Point};
pub use pipeline::{FrameError, FrameOutput, FrameSource, JsonlFrameSource, Pipeline, TimedFrame};
pub use two_hand::{HandPairState, TwoHandConfig};
