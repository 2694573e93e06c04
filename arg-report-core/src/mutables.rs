//! Generated report values ("mutables"): title, date, number and author
//! computed when the parameters do not supply them, persisted next to the
//! structure file so later runs keep the first values.

use chrono::{Datelike, NaiveDate};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::{info, warn};

use crate::error::ExploreError;
use crate::parameters::Parameters;

pub const DEFAULT_TITLE: &str = "ARG Report";

/// Fill unset report values in `parameters` and return those that were
/// generated, keyed by their mutables-file name.
///
/// The title is only generated when no structure title directive will let
/// the renderer derive one.
pub fn generate_mutables(
    parameters: &mut Parameters,
    has_title_directive: bool,
    today: NaiveDate,
    user: &str,
) -> Mapping {
    let mut generated = Mapping::new();
    let mut record = |key: &str, value: &str| {
        generated.insert(Value::from(key), Value::from(value));
    };

    if is_unset(&parameters.title) && !has_title_directive {
        info!("No specified title found");
        parameters.title = Some(DEFAULT_TITLE.to_string());
        record("title", DEFAULT_TITLE);
    }
    if is_unset(&parameters.year) {
        let year = today.year().to_string();
        record("year", &year);
        parameters.year = Some(year);
    }
    if is_unset(&parameters.month) {
        let month = today.format("%B").to_string();
        record("month", &month);
        parameters.month = Some(month);
    }
    if is_unset(&parameters.number) {
        let number = format!("{:02}-{:02}-ARG", today.month(), today.day());
        record("number", &number);
        parameters.number = Some(number);
    }
    if is_unset(&parameters.file_name) {
        parameters.file_name = Some(format!(
            "{}{}",
            parameters.report_type.as_deref().unwrap_or_default(),
            parameters.number.as_deref().unwrap_or_default()
        ));
    }
    if parameters.authors.is_empty() && !user.is_empty() {
        record("author", user);
        parameters.authors.push(user.to_string());
    }
    generated
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Login name of the invoking user, empty when the environment has none.
pub fn default_author() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_default()
}

/// Merge `generated` into the mutables file at `path`, existing keys
/// winning, and write the result back with sorted keys.
pub fn save_generated_mutables(path: &Path, generated: Mapping) -> Result<Mapping, ExploreError> {
    if generated.is_empty() {
        info!(path = %path.display(), "No mutable variables to be saved");
        return Ok(generated);
    }

    let existing = read_existing(path);
    let n_generated = generated.len();
    let n_existing = existing.len();
    let mut merged = generated;
    for (key, value) in existing {
        merged.insert(key, value);
    }
    if n_existing > 0 {
        info!(count = n_existing, path = %path.display(), "Found pre-existing mutable variables");
        let overlap = n_generated + n_existing - merged.len();
        if overlap > 0 {
            warn!(
                count = overlap,
                "*  WARNING: {overlap} pre-existing mutable variable(s) took precedence over new one(s)"
            );
        }
    }

    let mut entries: Vec<(Value, Value)> = merged.into_iter().collect();
    entries.sort_by_key(|(k, _)| k.as_str().unwrap_or_default().to_string());
    let merged: Mapping = entries.into_iter().collect();

    let text = serde_yaml::to_string(&merged)?;
    std::fs::write(path, text).map_err(|e| ExploreError::io(path, e))?;
    info!(count = merged.len(), path = %path.display(), "Saved mutable variables");
    Ok(merged)
}

/// Existing mutables, or an empty mapping when the file is absent or not a
/// mapping.
fn read_existing(path: &Path) -> Mapping {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Mapping::new();
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Mapping(m)) => m,
        Ok(Value::Null) => Mapping::new(),
        Ok(_) => {
            warn!(path = %path.display(), "*  WARNING: mutables file is not a mapping, ignoring its content");
            Mapping::new()
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "*  WARNING: could not parse mutables file, ignoring its content");
            Mapping::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTables;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn generates_missing_values_from_date_and_user() {
        let mut parameters = Parameters::new(&TypeTables::default());
        parameters.report_type = Some("Report".into());
        let generated = generate_mutables(&mut parameters, false, today(), "analyst");

        assert_eq!(generated.get("title"), Some(&Value::from("ARG Report")));
        assert_eq!(generated.get("year"), Some(&Value::from("2024")));
        assert_eq!(generated.get("month"), Some(&Value::from("March")));
        assert_eq!(generated.get("number"), Some(&Value::from("03-07-ARG")));
        assert_eq!(generated.get("author"), Some(&Value::from("analyst")));
        assert_eq!(parameters.file_name.as_deref(), Some("Report03-07-ARG"));
        assert_eq!(parameters.authors, vec!["analyst"]);
    }

    #[test]
    fn supplied_values_and_title_directive_suppress_generation() {
        let mut parameters = Parameters::new(&TypeTables::default());
        parameters.year = Some("1999".into());
        parameters.authors = vec!["someone".into()];
        let generated = generate_mutables(&mut parameters, true, today(), "analyst");

        assert!(generated.get("title").is_none());
        assert!(generated.get("year").is_none());
        assert!(generated.get("author").is_none());
        assert!(parameters.title.is_none());
        assert_eq!(parameters.year.as_deref(), Some("1999"));
    }

    #[test]
    fn existing_mutables_take_precedence_and_output_is_sorted() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("mutables.yml");
        std::fs::write(&path, "year: '1999'\nauthor: first\n").unwrap();

        let mut generated = Mapping::new();
        generated.insert("year".into(), "2024".into());
        generated.insert("month".into(), "March".into());
        let merged = save_generated_mutables(&path, generated).unwrap();

        assert_eq!(merged.get("year"), Some(&Value::from("1999")));
        assert_eq!(merged.get("month"), Some(&Value::from("March")));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "author: first\nmonth: March\nyear: '1999'\n");
    }

    #[test]
    fn second_run_keeps_first_values() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("mutables.yml");
        let run = |day: u32| {
            let mut parameters = Parameters::new(&TypeTables::default());
            let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
            let generated = generate_mutables(&mut parameters, false, date, "analyst");
            save_generated_mutables(&path, generated).unwrap()
        };
        let first = run(7);
        let second = run(8);
        assert_eq!(first, second);
        assert_eq!(second.get("number"), Some(&Value::from("03-07-ARG")));
    }

    #[test]
    #[serial]
    fn default_author_reads_login_environment() {
        let saved = std::env::var("USER").ok();
        std::env::set_var("USER", "jdoe");
        assert_eq!(default_author(), "jdoe");
        match saved {
            Some(v) => std::env::set_var("USER", v),
            None => std::env::remove_var("USER"),
        }
    }
}
