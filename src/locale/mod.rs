//! Locale resolution and translations.
//!
//! Translation files are flat JSON maps stored as `<translations_path>/<locale>.json`:
//!
//! ```json
//! { "greeting": "Bonjour", "error.generic": "Une erreur est survenue" }
//! ```

mod service;
mod table;

pub use service::{LocalePhase, LocaleService, language_from_hint};
pub use table::{LocaleError, TranslationTable, is_valid_locale_code};
