//! Bundled commands
//!
//! Small command implementations that exercise the command contract:
//! `NARRATE` sends text to actors, `WAIT` holds its queue until a timer
//! signals completion.

use std::sync::Arc;

use crate::runtime::actor::ActorResolver;
use crate::runtime::registry::CommandCatalog;

pub mod narrate;
pub mod wait;

pub use narrate::NarrateCommand;
pub use wait::WaitCommand;

/// Register every bundled command in `catalog`
pub fn register_builtin(catalog: &CommandCatalog, actors: Arc<dyn ActorResolver>) {
    catalog.register("narrate", NarrateCommand::new(actors));
    catalog.register_default::<WaitCommand>("wait");
}
