//! Pipeline stages for card-sheet conversion.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets the codec be swapped without touching
//! the layout logic.
//!
//! ## Data Flow
//!
//! ```text
//! cards/ ──▶ ppi ──▶ cache ──▶ batch/card ──▶ grid+merge ──▶ grid+merge ──▶ pdf
//!                              individual/     vertical/      horizontal/    pdfs/
//! ```
//!
//! 1. [`listing`]  — the one ordering every other stage relies on
//! 2. [`ppi`]      — density from the first card's pixel size
//! 3. [`cache`]    — which cards still need the individual stage
//! 4. [`card`]     — density rewrite + orientation for one card
//! 5. [`batch`]    — bounded fan-out of `card` with a join
//! 6. [`merge`]    — composite one group into one sheet
//! 7. [`grid`]     — cut a listing into groups of 4 or 2 and merge each
//! 8. [`pdf`]      — one PDF per horizontal sheet
//!
//! [`blocking`] wraps every codec call in `spawn_blocking` with a timeout.

pub mod batch;
pub mod blocking;
pub mod cache;
pub mod card;
pub mod grid;
pub mod listing;
pub mod merge;
pub mod pdf;
pub mod ppi;
