//! Dropdown options for the model selector.

use std::collections::HashSet;

use crate::catalog;
use crate::db::models::ModelOption;

/// Merge a fetched model list with the currently selected model.
///
/// Keeps the first occurrence of each trimmed, non-blank id in fetch order,
/// then appends `selected` if it is non-blank and not already listed, so the
/// active model is always a valid dropdown entry.
pub fn merge_model_options<S: AsRef<str>>(fetched: &[S], selected: &str) -> Vec<ModelOption> {
    let mut seen = HashSet::new();
    let mut options = Vec::with_capacity(fetched.len() + 1);

    let candidates = fetched
        .iter()
        .map(|m| m.as_ref())
        .chain(std::iter::once(selected));

    for raw in candidates {
        let id = raw.trim();
        if id.is_empty() || !seen.insert(id) {
            continue;
        }
        options.push(ModelOption::new(id, id));
    }

    options
}

/// The fixed Bedrock model list followed by the custom-model sentinel.
/// Fetched models never change this list.
pub fn bedrock_model_options() -> Vec<ModelOption> {
    catalog::BEDROCK_MODELS
        .iter()
        .map(|(id, label)| ModelOption::new(*id, *label))
        .chain(std::iter::once(ModelOption::new(
            catalog::BEDROCK_CUSTOM_MODEL,
            "Custom model ID",
        )))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(options: &[ModelOption]) -> Vec<&str> {
        options.iter().map(|o| o.value.as_str()).collect()
    }

    #[test]
    fn test_duplicates_collapse_in_order() {
        let options = merge_model_options(&["a", "a", "b"], "b");
        assert_eq!(
            options,
            vec![ModelOption::new("a", "a"), ModelOption::new("b", "b")]
        );
    }

    #[test]
    fn test_selected_appended_when_missing() {
        let options = merge_model_options(&["a", "b"], "c");
        assert_eq!(values(&options), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_blank_and_padded_entries() {
        let options = merge_model_options(&["", "  gpt-4o ", "gpt-4o", "   "], " ");
        assert_eq!(options, vec![ModelOption::new("gpt-4o", "gpt-4o")]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge_model_options::<&str>(&[], "").is_empty());
        assert_eq!(values(&merge_model_options::<&str>(&[], "o3")), vec!["o3"]);
    }

    #[test]
    fn test_bedrock_options_are_fixed() {
        let options = bedrock_model_options();
        assert_eq!(options.len(), catalog::BEDROCK_MODELS.len() + 1);
        assert_eq!(options.last().unwrap().value, catalog::BEDROCK_CUSTOM_MODEL);
        assert_eq!(options[0].value, catalog::BEDROCK_DEFAULT_MODEL_ID);
    }
}
