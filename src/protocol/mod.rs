pub mod events;
pub mod filters;
pub mod opcodes;
pub mod tracks;

pub use events::*;
pub use filters::*;
pub use opcodes::*;
pub use tracks::*;
