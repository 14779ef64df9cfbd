//! Luna runtime: executes decoded bytecode against a game session.
//!
//! The runtime is a stack machine with:
//! - One operand stack shared by every frame of a run
//! - Explicit frames for script calls, each with its own [`Domain`]
//! - Global and per-code-entry static scopes owned by the [`Session`]
//! - A static table of native functions resolved by name
//!
//! # Usage
//!
//! ```no_run
//! use luna_container::Game;
//! use luna_vm::{Domain, Session, SessionConfig};
//!
//! let game = Game::open("data.win")?;
//! let mut session = Session::new(game, SessionConfig::default())?;
//! let result = session.run_code("gml_Script_main", &mut Domain::new())?;
//! println!("{result}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod arena;
pub mod domain;
pub mod error;
pub mod event;
pub mod execute;
pub mod host;
pub mod instance;
pub mod machine;
pub mod registry;
pub mod scope;
pub mod session;

mod builtins;

pub use domain::{Domain, FIRST_INSTANCE_ID};
pub use error::RuntimeError;
pub use event::{EventContext, EventType, STEP_BEGIN, STEP_END, STEP_NORMAL};
pub use host::{DrawCall, HeadlessPlatform, Keys, Message, Platform, RecordingRenderer, Renderer};
pub use instance::Instance;
pub use machine::{Frame, Machine, DEFAULT_MAX_CALL_DEPTH};
pub use registry::{NativeFn, NativeRegistry};
pub use scope::Scopes;
pub use session::{DsMap, Session, SessionConfig};

use luna_common::LValue;
use luna_container::Game;

/// Run one code entry of `game` in a fresh session and domain.
///
/// # Errors
///
/// Returns [`RuntimeError::UnknownCode`] if no entry is called `code`, or
/// whatever error the code raises.
pub fn run(game: Game, code: &str) -> Result<LValue, RuntimeError> {
    let mut session = Session::new(game, SessionConfig::default())?;
    session.run_code(code, &mut Domain::new())
}
