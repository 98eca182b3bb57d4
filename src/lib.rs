use lazy_static::lazy_static;
use translations::Translations;

pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod fold;
pub mod fold_gate;
pub mod iupac_code;
pub mod loop_matcher;
pub mod patterns;
pub mod rna_sequence;
pub mod sink;
pub mod task;
pub mod translations;
pub mod vienna;

lazy_static! {
    // Diagnostic message translations
    pub static ref TRANSLATIONS: Translations = Translations::default();
}
