//! Answer module - deterministic rendering and the paraphrase guard

pub mod paraphrase;
pub mod synthesizer;

pub use paraphrase::accept_paraphrase;
pub use synthesizer::{render, render_apology, render_not_found, render_out_of_scope};
