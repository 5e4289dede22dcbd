//! Beryllium lens stack recipes.
//!
//! The hutch tab records which Be lenses are inserted at each of four stack
//! locations as flag attributes such as `hutch-be-top-d1-3 = "1"` (location
//! `top`, 1D lens, position 3). The recipe for a location is the sorted list of
//! inserted lenses rendered as `<dim><pos>x<count>`, with the stack
//! orientation appended to 1D lenses.

use super::{AttributeEntry, ProposalRecord};
use crate::error::{QsError, Result};
use crate::value::AttrValue;

/// Hutch attribute prefix → reporting key.
pub const LENS_LOCATIONS: [(&str, &str); 4] = [
    ("hutch-be-top-d", "Be-TOP"),
    ("hutch-be-mid-d", "Be-MID"),
    ("hutch-be-bot-d", "Be-BTM"),
    ("hutch-be-sam-d", "Be-AIR"),
];

pub const COMBINED_LENS_KEY: &str = "Be-All Beryllium Lens Stack Recipes";

const UNKNOWN_ORIENTATION: &str = "VERT/HORZ";

#[derive(Debug, Clone, PartialEq, Eq)]
struct LensEntry {
    dimension: String,
    position: String,
    position_index: i64,
    count: String,
}

impl LensEntry {
    fn parse(entry: &AttributeEntry) -> Result<Self> {
        let segments: Vec<&str> = entry.id.split('-').collect();
        if segments.len() < 5 {
            return Err(QsError::MalformedAttribute {
                id: entry.id.clone(),
                reason: "lens attribute needs at least five hyphen-separated segments".to_string(),
            });
        }
        let dimension = segments[3].replace("d1", "1D").replace("d2", "2D");
        let position = segments[4].to_string();
        let position_index = AttrValue::from(position.as_str()).as_int(&entry.id)?;
        Ok(Self {
            dimension,
            position,
            position_index,
            count: entry.val.as_text(),
        })
    }

    fn token(&self, orientation: &str) -> String {
        let mut token = format!("{}{}x{}", self.dimension, self.position, self.count);
        if self.dimension == "1D" {
            token.push_str(orientation);
        }
        token
    }
}

fn orientation_code(value: &AttrValue) -> &'static str {
    match value.as_str() {
        Some("vertical") => "VERT",
        Some("horizontal") => "HORZ",
        _ => UNKNOWN_ORIENTATION,
    }
}

/// Recipe string for one stack location, or `None` when no lens is inserted.
///
/// Every attribute under `prefix` must carry an integer flag; a non-integer
/// value aborts the build.
pub fn lens_stack_recipe(hutch: &[AttributeEntry], prefix: &str) -> Result<Option<String>> {
    let mut entries = Vec::new();
    for attr in hutch.iter().filter(|a| a.id.starts_with(prefix)) {
        if attr.val.as_int(&attr.id)? != 0 {
            entries.push(LensEntry::parse(attr)?);
        }
    }
    if entries.is_empty() {
        return Ok(None);
    }
    entries.sort_by(|a, b| {
        a.dimension
            .cmp(&b.dimension)
            .then(a.position_index.cmp(&b.position_index))
    });

    let orientation_id = prefix.replace("-d", "-orientation");
    let codes: Vec<&str> = hutch
        .iter()
        .filter(|a| a.id == orientation_id)
        .map(|a| orientation_code(&a.val))
        .collect();
    if codes.len() > 1 {
        tracing::warn!(
            attribute = %orientation_id,
            count = codes.len(),
            "repeated orientation attribute; suffixes are concatenated"
        );
    }
    let orientation = codes.concat();

    let recipe = entries
        .iter()
        .map(|e| e.token(&orientation))
        .collect::<Vec<_>>()
        .join("  ");
    Ok(Some(recipe))
}

/// Adds `Be-TOP`/`Be-MID`/`Be-BTM`/`Be-AIR` and the combined summary to `record`.
pub(crate) fn apply_lens_summaries(record: &mut ProposalRecord, hutch: &[AttributeEntry]) -> Result<()> {
    for (prefix, key) in LENS_LOCATIONS {
        if let Some(recipe) = lens_stack_recipe(hutch, prefix)? {
            tracing::debug!(location = key, recipe = %recipe, "derived lens stack recipe");
            record.insert(key, recipe);
        }
    }

    let combined = LENS_LOCATIONS
        .iter()
        .filter_map(|(_, key)| record.get(key).map(|v| format!("{key}:{v}")))
        .collect::<Vec<_>>()
        .join("\n");
    if !combined.is_empty() {
        record.insert(COMBINED_LENS_KEY, combined);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hutch(pairs: &[(&str, &str)]) -> Vec<AttributeEntry> {
        pairs
            .iter()
            .map(|(id, val)| AttributeEntry::new(*id, *val))
            .collect()
    }

    #[test]
    fn single_1d_lens_gets_orientation_suffix() {
        let attrs = hutch(&[
            ("hutch-be-top-d1-1", "1"),
            ("hutch-be-top-orientation", "vertical"),
        ]);
        let recipe = lens_stack_recipe(&attrs, "hutch-be-top-d").unwrap();
        assert_eq!(recipe.as_deref(), Some("1D1x1VERT"));
    }

    #[test]
    fn zero_flag_is_excluded() {
        let attrs = hutch(&[
            ("hutch-be-top-d1-1", "0"),
            ("hutch-be-top-orientation", "vertical"),
        ]);
        assert_eq!(lens_stack_recipe(&attrs, "hutch-be-top-d").unwrap(), None);
    }

    #[test]
    fn entries_sort_by_dimension_then_numeric_position() {
        let attrs = hutch(&[
            ("hutch-be-mid-d2-10", "1"),
            ("hutch-be-mid-d1-10", "2"),
            ("hutch-be-mid-d1-9", "1"),
            ("hutch-be-mid-d2-2", "3"),
            ("hutch-be-mid-orientation", "horizontal"),
        ]);
        let recipe = lens_stack_recipe(&attrs, "hutch-be-mid-d").unwrap().unwrap();
        assert_eq!(recipe, "1D9x1HORZ  1D10x2HORZ  2D2x3  2D10x1");
    }

    #[test]
    fn unknown_orientation_and_missing_orientation() {
        let odd = hutch(&[
            ("hutch-be-bot-d1-1", "1"),
            ("hutch-be-bot-orientation", "diagonal"),
        ]);
        assert_eq!(
            lens_stack_recipe(&odd, "hutch-be-bot-d").unwrap().as_deref(),
            Some("1D1x1VERT/HORZ")
        );

        let missing = hutch(&[("hutch-be-bot-d1-1", "1")]);
        assert_eq!(
            lens_stack_recipe(&missing, "hutch-be-bot-d").unwrap().as_deref(),
            Some("1D1x1")
        );
    }

    /// Collects formatted log output of the closure.
    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        use std::io;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Buffer(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Buffer {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Buffer {
            type Writer = Buffer;

            fn make_writer(&'a self) -> Self::Writer {
                self.clone()
            }
        }

        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).to_string();
        (out, logs)
    }

    #[test]
    fn repeated_orientation_concatenates_and_warns() {
        let attrs = hutch(&[
            ("hutch-be-top-d1-1", "1"),
            ("hutch-be-top-d1-02", "2"),
            ("hutch-be-top-orientation", "horizontal"),
            ("hutch-be-top-orientation", "vertical"),
        ]);
        let (recipe, logs) = with_captured_logs(|| lens_stack_recipe(&attrs, "hutch-be-top-d").unwrap());
        assert_eq!(recipe.as_deref(), Some("1D1x1HORZVERT  1D02x2HORZVERT"));
        assert!(logs.contains("WARN"));
        assert!(logs.contains("hutch-be-top-orientation"));
    }

    #[test]
    fn single_orientation_does_not_warn() {
        let attrs = hutch(&[
            ("hutch-be-top-d1-1", "1"),
            ("hutch-be-top-orientation", "vertical"),
        ]);
        let (_, logs) = with_captured_logs(|| lens_stack_recipe(&attrs, "hutch-be-top-d").unwrap());
        assert!(logs.is_empty());
    }

    #[test]
    fn non_integer_flag_fails_fast() {
        let attrs = hutch(&[("hutch-be-sam-d1-1", "yes")]);
        assert!(matches!(
            lens_stack_recipe(&attrs, "hutch-be-sam-d"),
            Err(QsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn short_attribute_id_is_malformed() {
        let attrs = hutch(&[("hutch-be-sam-d", "1")]);
        assert!(matches!(
            lens_stack_recipe(&attrs, "hutch-be-sam-d"),
            Err(QsError::MalformedAttribute { .. })
        ));
    }

    #[test]
    fn other_locations_do_not_leak() {
        let attrs = hutch(&[("hutch-be-top-d2-4", "1"), ("hutch-other-flag", "oops")]);
        assert_eq!(lens_stack_recipe(&attrs, "hutch-be-mid-d").unwrap(), None);
        assert_eq!(
            lens_stack_recipe(&attrs, "hutch-be-top-d").unwrap().as_deref(),
            Some("2D4x1")
        );
    }

    #[test]
    fn combined_summary_lists_present_locations_in_fixed_order() {
        let attrs = hutch(&[
            ("hutch-be-sam-d2-1", "1"),
            ("hutch-be-top-d2-2", "2"),
        ]);
        let mut record = ProposalRecord::new("LR01");
        apply_lens_summaries(&mut record, &attrs).unwrap();
        assert_eq!(
            record.get(COMBINED_LENS_KEY).map(|v| v.as_text()),
            Some("Be-TOP:2D2x2\nBe-AIR:2D1x1".to_string())
        );
        assert!(record.get("Be-MID").is_none());
    }

    #[test]
    fn no_lenses_means_no_combined_summary() {
        let mut record = ProposalRecord::new("LR01");
        apply_lens_summaries(&mut record, &[]).unwrap();
        assert!(record.get(COMBINED_LENS_KEY).is_none());
    }
}
