use pandaura_vault::diff::{
    apply_changes, compare_file_sets, diff_files, diff_lines, similarity, unified_text, NamedFile,
    DEFAULT_CONTEXT,
};

fn named(path: &str, content: &str) -> NamedFile {
    NamedFile {
        path: path.into(),
        content: content.into(),
    }
}

#[test]
fn identical_contents_produce_an_empty_diff() {
    let diff = diff_files("a\nb\nc\n", "a\nb\nc\n", DEFAULT_CONTEXT);
    assert!(diff.summary.is_identical);
    assert_eq!(diff.summary.lines_added, 0);
    assert_eq!(diff.summary.lines_deleted, 0);
    assert!(diff.hunks.is_empty());
}

#[test]
fn applying_a_diff_reproduces_the_new_content() {
    let old = "one\ntwo\nthree\nfour\n";
    let new = "one\n2\nthree\nfour\nfive\n";
    let changes = diff_lines(old, new);
    assert_eq!(apply_changes(old, &changes), new);
}

#[test]
fn modified_line_counts_on_both_sides() {
    // A 10-line file: line 7 changed, two lines appended.
    let old: String = (1..=10).map(|n| format!("line {n}\n")).collect();
    let new: String = (1..=10)
        .map(|n| {
            if n == 7 {
                "line seven\n".to_string()
            } else {
                format!("line {n}\n")
            }
        })
        .chain(["tail 1\n".to_string(), "tail 2\n".to_string()])
        .collect();

    let diff = diff_files(&old, &new, DEFAULT_CONTEXT);
    assert_eq!(diff.summary.lines_added, 3);
    assert_eq!(diff.summary.lines_deleted, 1);
    assert_eq!(diff.summary.lines_modified, 1);
}

#[test]
fn distant_changes_split_into_hunks() {
    let old: String = (1..=30).map(|n| format!("l{n}\n")).collect();
    let new = old.replace("l2\n", "L2\n").replace("l28\n", "L28\n");
    let diff = diff_files(&old, &new, DEFAULT_CONTEXT);
    assert_eq!(diff.hunks.len(), 2, "gap of 25 lines forces a second hunk");
}

#[test]
fn nearby_changes_share_a_hunk() {
    let old: String = (1..=20).map(|n| format!("l{n}\n")).collect();
    let new = old.replace("l5\n", "L5\n").replace("l9\n", "L9\n");
    let diff = diff_files(&old, &new, DEFAULT_CONTEXT);
    assert_eq!(diff.hunks.len(), 1, "gap of 3 lines fits one hunk");
}

#[test]
fn unified_text_has_headers_and_prefixes() {
    let diff = diff_files("a\nb\n", "a\nc\n", DEFAULT_CONTEXT);
    let text = unified_text("old.st", "new.st", &diff);
    assert!(text.starts_with("--- old.st\n+++ new.st\n"));
    assert!(text.contains("@@ -"));
    assert!(text.contains("-b"));
    assert!(text.contains("+c"));
    assert!(text.contains(" a"));
}

#[test]
fn file_set_comparison_classifies_paths() {
    let old = vec![
        named("main.st", "x := 1;\n"),
        named("gone.st", "y := 2;\n"),
        named("same.st", "z := 3;\n"),
    ];
    let new = vec![
        named("main.st", "x := 9;\n"),
        named("fresh.st", "w := 4;\n"),
        named("same.st", "z := 3;\n"),
    ];
    let comparison = compare_file_sets(&old, &new, false);
    assert_eq!(comparison.totals.files_modified, 1);
    assert_eq!(comparison.totals.files_added, 1);
    assert_eq!(comparison.totals.files_deleted, 1);
    assert_eq!(comparison.totals.files_changed, 3);

    let changes: Vec<(&str, &str)> = comparison
        .files
        .iter()
        .map(|f| (f.path.as_str(), f.change.as_str()))
        .collect();
    assert!(changes.contains(&("main.st", "modified")));
    assert!(changes.contains(&("fresh.st", "added")));
    assert!(changes.contains(&("gone.st", "deleted")));
}

#[test]
fn tag_metadata_paths_are_skipped() {
    let old = vec![named("tags.json", "{}"), named("sub/tags.json", "{}")];
    let new = vec![named("tags.json", "{\"a\":1}")];
    let comparison = compare_file_sets(&old, &new, false);
    assert_eq!(comparison.totals.files_changed, 0);
}

#[test]
fn renamed_file_reports_as_move() {
    let body: String = (1..=10).map(|n| format!("line {n}\n")).collect();
    let old = vec![named("old_name.st", &body)];
    let new = vec![named("new_name.st", &body)];
    let comparison = compare_file_sets(&old, &new, true);
    let moved = comparison
        .files
        .iter()
        .find(|f| f.change == "moved")
        .expect("move detected");
    assert_eq!(moved.path, "new_name.st");
    assert_eq!(moved.moved_from.as_deref(), Some("old_name.st"));
    assert_eq!(comparison.totals.files_deleted, 0, "the source is not double-counted");
}

#[test]
fn similarity_is_lcs_over_max_line_count() {
    let a = "1\n2\n3\n4\n5\n";
    assert!(similarity(a, a) > 0.99);
    assert!(similarity(a, "1\n2\n3\n4\nX\n") >= 0.8);
    assert!(similarity(a, "a\nb\nc\nd\ne\n") < 0.5);
}
