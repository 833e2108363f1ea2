use super::types::ToolbarFilter;
use crate::form::FieldValue;

/// Whether a filter tree constrains nothing. Groups are empty when all their
/// members are; a value is empty when it is null or, with `ignore_fixed`,
/// fixed.
pub fn is_toolbar_filter_empty(filter: &ToolbarFilter, ignore_fixed: bool) -> bool {
    match filter {
        ToolbarFilter::Group(group) => group
            .fields
            .iter()
            .all(|field| is_toolbar_filter_empty(field, ignore_fixed)),
        ToolbarFilter::Value(value) => {
            (ignore_fixed && value.is_fixed) || value.value == FieldValue::Null
        }
    }
}

pub fn are_toolbar_filters_empty(filters: &[ToolbarFilter], ignore_fixed: bool) -> bool {
    filters
        .iter()
        .all(|filter| is_toolbar_filter_empty(filter, ignore_fixed))
}

/// `and` group of the fixed filters followed by the user filters, skipping
/// empty user filters.
pub fn combine_filters(fixed: &[ToolbarFilter], user: &[ToolbarFilter]) -> ToolbarFilter {
    let fixed = fixed.iter().cloned().map(ToolbarFilter::fixed);
    let user = user
        .iter()
        .filter(|filter| !is_toolbar_filter_empty(filter, false))
        .cloned();
    ToolbarFilter::and(fixed.chain(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MatchMode;

    #[test]
    fn empty_groups_and_null_values_are_empty() {
        assert!(is_toolbar_filter_empty(&ToolbarFilter::and([]), true));
        assert!(is_toolbar_filter_empty(
            &ToolbarFilter::value("name", FieldValue::Null, MatchMode::Contains),
            false
        ));
        assert!(!is_toolbar_filter_empty(
            &ToolbarFilter::value("name", "x", MatchMode::Contains),
            false
        ));
    }

    #[test]
    fn fixed_values_count_only_when_not_ignored() {
        let tree = ToolbarFilter::or([
            ToolbarFilter::value("branch_id", 3, MatchMode::Equals).fixed(),
            ToolbarFilter::and([ToolbarFilter::value(
                "name",
                FieldValue::Null,
                MatchMode::StartsWith,
            )]),
        ]);
        assert!(is_toolbar_filter_empty(&tree, true));
        assert!(!is_toolbar_filter_empty(&tree, false));
        assert!(are_toolbar_filters_empty(&[tree.clone(), ToolbarFilter::default()], true));
    }

    #[test]
    fn combining_keeps_fixed_filters_first() {
        let combined = combine_filters(
            &[ToolbarFilter::value("branch_id", 3, MatchMode::Equals)],
            &[
                ToolbarFilter::value("name", FieldValue::Null, MatchMode::Contains),
                ToolbarFilter::value("code", "A1", MatchMode::Equals),
            ],
        );
        let ToolbarFilter::Group(group) = combined else {
            panic!("expected a group");
        };
        assert_eq!(group.fields.len(), 2);
        assert!(group.fields[0].is_fixed());
        assert!(!group.fields[1].is_fixed());
    }
}
