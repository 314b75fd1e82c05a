//! tern-parser - VT byte stream parsing
//!
//! The parsing half of the tern terminal emulation core. Raw PTY bytes go
//! in, semantic [`Action`]s come out; the screen model in `tern-core`
//! turns those actions into grid mutations.
//!
//! The parser is total: any byte sequence, including malformed escape
//! sequences and broken UTF-8, produces a well-defined action stream and
//! leaves the parser in a recoverable state.
//!
//! # Example
//!
//! ```
//! use tern_parser::{Action, Parser};
//!
//! let mut parser = Parser::new();
//! let actions = parser.feed(b"ok\x1b[1m");
//! assert_eq!(actions[0], Action::Print('o'));
//! assert_eq!(actions[1], Action::Print('k'));
//! assert!(matches!(actions[2], Action::CsiDispatch { .. }));
//! ```

mod action;
mod params;
mod parser;
pub mod sixel;
mod utf8;

pub use action::Action;
pub use params::{Params, MAX_PARAMETERS, MAX_SUBPARAMETERS};
pub use parser::{Parser, MAX_OSC_LENGTH};
pub use utf8::{Utf8Decoder, Utf8Step, REPLACEMENT};
