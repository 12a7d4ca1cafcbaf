//! Presentation of debugger state in source file coordinates

pub mod breakpoints;
pub mod call_stack;
pub mod console;
pub mod model;

pub use breakpoints::PresentedBreakpoint;
pub use call_stack::{FrameLocation, PresentedCallFrame};
pub use console::{ConsoleMessage, MessageLevel, PresentedMessage};
pub use model::{Collaborators, DebuggerPresentationModel};
