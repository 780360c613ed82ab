//! HTTP API handlers for wortschatz-web

pub mod health;
pub mod progress;
pub mod ui;
pub mod words;

pub use health::health_routes;
pub use progress::{get_all_progress, get_progress, get_word_progress};
pub use ui::{serve_app_js, serve_index};
pub use words::{add_noun, add_verb, get_nouns, get_verbs, update_learned_count};
