//! Integration tests for shared-subtree extraction and run aggregation.

use std::fs;

use tempfile::TempDir;

use logsmith::config::Settings;
use logsmith::emit::ParserSpec;
use logsmith::pipeline::Miner;

fn test_settings(temp: &TempDir, content: &str) -> Settings {
    let input = temp.path().join("input.log");
    fs::write(&input, content).expect("write input file");

    let mut settings = Settings::default();
    settings.input_file = Some(input);
    settings.timestamp_length = 0;
    settings.output.tree_file = temp.path().join("tree.txt");
    settings.output.templates_file = temp.path().join("templates.txt");
    settings.output.parser_file = temp.path().join("parser.json");
    settings
}

fn read(temp: &TempDir, name: &str) -> String {
    fs::read_to_string(temp.path().join(name)).expect("read artifact")
}

// ============================================================
// Aggregation
// ============================================================

#[test]
fn given_consecutive_single_child_literals_when_mining_then_one_element() {
    // Arrange - '=' as a delimiter turns "foo=bar" into three tokens
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(&temp, "foo=bar\nfoo=bar\nfoo=bar\n");
    settings.delimiters = vec![' ', '='];

    // Act
    let mined = Miner::new(settings.clone()).mine().unwrap();
    Miner::new(settings).run().unwrap();

    // Assert - the three-token run collapses into one node
    assert!(mined.registry.is_empty(), "nothing repeats in a single chain");
    assert_eq!(mined.root.children.len(), 1);
    let collapsed = &mined.root.children[0];
    assert_eq!(collapsed.element(), Some("foo=bar"));
    assert_eq!(collapsed.occurrence, 3);
    assert!(collapsed.end);
    assert_eq!(read(&temp, "templates.txt"), "foo=bar\n");
}

// ============================================================
// Shared subtrees
// ============================================================

#[test]
fn given_repeated_tail_at_two_depths_when_mining_then_registered_and_referenced() {
    // Arrange - the tail "p q" occurs directly under A and one token deeper
    // under B, so it cannot collapse into a sibling list
    let temp = TempDir::new().unwrap();
    let settings = test_settings(&temp, "A p q\nB r p q\n");

    // Act
    let mined = Miner::new(settings.clone()).mine().unwrap();
    Miner::new(settings).run().unwrap();

    // Assert - both the delimiter-rooted and the token-rooted fragment repeat
    assert_eq!(mined.registry.len(), 2);
    for (_, shared) in mined.registry.iter() {
        assert_eq!(shared.sites, 2);
    }

    let parser = read(&temp, "parser.json");
    let spec: ParserSpec = serde_json::from_str(&parser).expect("parse spec back");
    assert_eq!(spec.subtrees.len(), 2);
    assert!(
        parser.matches("\"subtree\"").count() >= 2,
        "parser spec:\n{}",
        parser
    );
}

#[test]
fn given_registered_subtree_when_aggregating_then_run_stops_at_boundary() {
    // Arrange - without the registry, "B r p q" would fuse into one element
    let temp = TempDir::new().unwrap();
    let settings = test_settings(&temp, "A p q\nB r p q\n");

    // Act
    Miner::new(settings).run().unwrap();

    // Assert - the run under B only absorbs up to the registered fragment
    let tree = read(&temp, "tree.txt");
    assert!(tree.contains("'B r'"), "tree dump:\n{}", tree);
    assert!(!tree.contains("'B r p"), "tree dump:\n{}", tree);
    assert!(!tree.contains("'A p"), "tree dump:\n{}", tree);

    // templates still render the full paths
    let templates = read(&temp, "templates.txt");
    assert_eq!(templates, "A p q\nB r p q\n");
}

#[test]
fn given_shared_fragments_when_mining_then_training_lines_still_covered() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = test_settings(&temp, "A p q\nB r p q\n");

    // Act
    let output = Miner::new(settings).run().unwrap();

    // Assert - walking multi-token aggregated elements and shared fragments
    // still matches every training line
    assert_eq!(output.summary.unmatched_lines, 0);
    assert_eq!(output.summary.matched_lines, 2);
}

#[test]
fn given_min_height_above_fragments_when_mining_then_nothing_registered() {
    // Arrange - raise the bar past the tallest repeated fragment
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(&temp, "A p q\nB r p q\n");
    settings.subtree_min_height = 5;

    // Act
    let mined = Miner::new(settings).mine().unwrap();

    // Assert - no registration, so the runs aggregate all the way down
    assert!(mined.registry.is_empty());
    let elements: Vec<_> = mined
        .root
        .children
        .iter()
        .filter_map(|c| c.element())
        .collect();
    assert_eq!(elements, vec!["A p q", "B r p q"]);
}
