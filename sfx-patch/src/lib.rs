//! sfx-patch: sound effect registration for N64 decomp audio trees
//!
//! Adding a sound effect to a decomp project means touching four files that
//! have no shared schema and must agree with each other:
//!
//! - `include/sounds.h`: the `SoundBank` enum and the `SOUND_<BANK>_<SOUND>`
//!   macros the game code plays
//! - `sound/sound_banks/<hex>_<bank>.json`: the bank's instruments, plus the
//!   bank's entry in `sound/sequences.json`
//! - `sound/sequences/00_sound_player.s`: one channel per bank, one table
//!   entry and note layer per sound
//! - `src/audio/external.c`: the bank's case label in the two bank switches
//!
//! Shared values (the bank's hex id, its enum ordinal, the next sound id, the
//! instrument position) are never stored separately; they are derived from
//! the artifacts each time. Every edit is idempotent, so registering the same
//! sound twice leaves all files byte-identical.
//!
//! # Usage
//!
//! ```ignore
//! use sfx_patch::{AiffProbe, Decomp, Identifier, SoundRegistration, register_sound};
//!
//! let decomp = Decomp::open("/path/to/sm64")?;
//! let request = SoundRegistration {
//!     sample: "bird.aiff".into(),
//!     bank: Identifier::parse("JUNGLE")?,
//!     sound: Identifier::parse("BIRD")?,
//! };
//! let report = register_sound(&decomp, &request, &AiffProbe)?;
//! println!("bank {} instrument {}", report.bank_hex(), report.instrument.position);
//! ```

pub mod bank_descriptor;
pub mod bank_ids;
pub mod dispatch_switch;
pub mod duration;
mod error;
pub mod layout;
pub mod names;
mod register;
pub mod sound_player;
pub mod sounds_header;
pub mod text;

pub use duration::{AiffProbe, DurationProbe, Ticks, duration_to_ticks};
pub use error::{Result, SfxError};
pub use layout::{Decomp, LayoutConfig};
pub use names::Identifier;
pub use register::{
    RegistrationReport, SoundRegistration, copy_sample, next_bank_id, register_sound,
};
