//! 终端层：行式交互、进度指示器、过程叙述

pub mod narrator;
pub mod spinner;
pub mod terminal;

pub use narrator::{describe, narrate};
pub use spinner::{Spinner, SpinnerPause};
pub use terminal::{ScriptedTerminal, StdTerminal, Terminal};
