//! Diagnostic message catalogs and language helpers.

use csv::ReaderBuilder;
use std::collections::HashMap;

pub struct Translations {
    values: HashMap<String, String>,
    language: String,
}

impl Translations {
    fn from_text(csv_text: &str) -> Self {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv_text.as_bytes());

        let mut languages = match rdr.headers() {
            Ok(headers) => Self::to_vec(headers),
            Err(_) => vec![],
        };
        if !languages.is_empty() {
            let _ = languages.remove(0); // Remove the key column
        }

        // Iterate over the records
        let mut values = HashMap::new();
        for record in rdr.records().flatten() {
            let mut record = Self::to_vec(&record);
            if record.is_empty() {
                continue;
            }
            let key = record.remove(0);
            for (lnum, t) in record.iter().enumerate() {
                if let Some(language) = languages.get(lnum) {
                    let lang_key = format!("{language}:{key}");
                    values.insert(lang_key, t.to_owned());
                }
            }
        }

        Self {
            values,
            language: "en".to_owned(),
        }
    }

    pub fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }

    /// Returns the catalog text for `key`, or the key itself when the
    /// catalog has no entry. Diagnostics must never fail over a missing
    /// translation.
    pub fn get(&self, key: &str) -> String {
        let lang_key = format!("{}:{}", self.language, key);
        self.values
            .get(&lang_key)
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    fn to_vec(record: &csv::StringRecord) -> Vec<String> {
        record.iter().map(|s| s.to_string()).collect()
    }
}

impl Default for Translations {
    fn default() -> Self {
        let text = include_str!("../assets/translations.csv");
        Self::from_text(text)
    }
}
