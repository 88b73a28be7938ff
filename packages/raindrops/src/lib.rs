//! Raindrop sounds.
//!
//! A number "sounds" like the factor tokens it is divisible by: `Pling` for 3,
//! `Plang` for 5 and `Plong` for 7, concatenated in that order. A number with
//! none of those factors sounds like its own decimal rendering.
//!
//! The crate builds two ways:
//!
//! - as an `rlib`, [`convert`] returns an owned `String`;
//! - as a `cdylib` for `wasm32`, the module exports `convert(n: i32) -> i64`,
//!   which writes the sound into a buffer inside its linear memory and returns
//!   the packed `(offset, length)` span described in [`abi`].

pub mod abi;
mod error;
mod sound;

pub use abi::{convert_into, pack_span, unpack_span, Span, MAX_SOUND_LEN};
pub use error::ConvertError;
pub use sound::{convert, sounds, write_sound, FACTOR_TOKENS};
