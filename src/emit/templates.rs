//! Template extraction and line-cluster assignment.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::model::{DatatypeDetector, LogLine, Node, NodeId, NodeKind, WILDCARD};

/// One terminal path through the tree, rendered with literal tokens verbatim
/// and generalized positions as the wildcard marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: Option<NodeId>,
    pub text: String,
}

/// Collect one template per `end` node in depth-first order. The artificial
/// root element contributes no text.
pub fn collect_templates(root: &Node) -> Vec<Template> {
    let mut templates = Vec::new();
    walk(root, String::new(), true, &mut templates);
    templates
}

fn walk(node: &Node, mut path: String, is_root: bool, out: &mut Vec<Template>) {
    if !is_root {
        match &node.kind {
            NodeKind::Fixed(element) => path.push_str(element),
            _ => path.push(WILDCARD),
        }
    }
    if node.end {
        out.push(Template {
            id: node.id,
            text: path.clone(),
        });
    }
    for child in &node.children {
        walk(child, path.clone(), false, out);
    }
}

/// Template artifact body, one template per line.
pub fn render_templates(templates: &[Template]) -> String {
    let mut text = String::new();
    for template in templates {
        text.push_str(&template.text);
        text.push('\n');
    }
    text
}

/// Line identifiers grouped by the template that matched them.
#[derive(Debug, Default)]
pub struct ClusterAssignment {
    pub clusters: BTreeMap<NodeId, Vec<usize>>,
    pub unmatched: Vec<usize>,
}

impl ClusterAssignment {
    pub fn matched_lines(&self) -> usize {
        self.clusters.values().map(Vec::len).sum()
    }
}

/// Walk every line through the tree and record which template it reaches.
///
/// Call after identifier assignment; an end node without an identifier counts
/// as unmatched. A fully covering tree leaves `unmatched` empty for the
/// training lines it was built from.
pub fn assign_clusters(
    root: &Node,
    lines: &[LogLine],
    detector: &DatatypeDetector,
) -> ClusterAssignment {
    let mut assignment = ClusterAssignment::default();
    for line in lines {
        match descend(root, &line.tokens, detector).and_then(|end| end.id) {
            Some(id) => assignment.clusters.entry(id).or_default().push(line.id),
            None => assignment.unmatched.push(line.id),
        }
    }
    assignment
}

/// Cluster artifact body: template identifier, member count, line identifiers.
pub fn render_clusters(assignment: &ClusterAssignment) -> String {
    let mut text = String::new();
    for (id, members) in &assignment.clusters {
        let ids: Vec<_> = members.iter().map(usize::to_string).collect();
        let _ = writeln!(text, "{}\t{}\t{}", id, members.len(), ids.join(","));
    }
    text
}

/// `node` is already matched, `rest` holds the tokens still to consume.
/// Children are tried in order with backtracking, so a branch that consumes
/// a prefix but dead-ends does not shadow a later sibling.
fn descend<'a>(node: &'a Node, rest: &[String], detector: &DatatypeDetector) -> Option<&'a Node> {
    if rest.is_empty() {
        return if node.end { Some(node) } else { None };
    }
    for child in &node.children {
        if let Some(consumed) = consume(child, rest, detector) {
            if let Some(end) = descend(child, &rest[consumed..], detector) {
                return Some(end);
            }
        }
    }
    None
}

/// How many leading tokens of `rest` this node matches, if any. Aggregated
/// fixed nodes span several tokens whose concatenation equals the element.
fn consume(node: &Node, rest: &[String], detector: &DatatypeDetector) -> Option<usize> {
    match &node.kind {
        NodeKind::Fixed(element) => {
            let mut matched = 0;
            for (count, token) in rest.iter().enumerate() {
                let upto = matched + token.len();
                if upto > element.len() || &element.as_bytes()[matched..upto] != token.as_bytes() {
                    return None;
                }
                matched = upto;
                if matched == element.len() {
                    return Some(count + 1);
                }
            }
            None
        }
        NodeKind::Variable(datatypes) => {
            if datatypes.is_empty() {
                return Some(1);
            }
            let detected = detector.detect(&rest[0]);
            if datatypes.iter().any(|d| detected.contains(d)) {
                Some(1)
            } else {
                None
            }
        }
        NodeKind::List(values) => {
            if values.contains(&rest[0]) {
                Some(1)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::model::Datatype;

    fn line(id: usize, tokens: &[&str]) -> LogLine {
        LogLine {
            id,
            timestamp: String::new(),
            remainder: tokens.concat(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn scenario_tree() -> Node {
        // root -> '2021-01-01' -> ' ' -> 'A' -> ' ' -> {'B', 'C'}
        let mut b = Node::fixed("B", 1);
        b.end = true;
        let mut c = Node::fixed("C", 1);
        c.end = true;
        let mut sep2 = Node::fixed(" ", 2);
        sep2.children.push(b);
        sep2.children.push(c);
        let mut a = Node::fixed("A", 2);
        a.children.push(sep2);
        let mut sep1 = Node::fixed(" ", 2);
        sep1.children.push(a);
        let mut date = Node::fixed("2021-01-01", 2);
        date.children.push(sep1);
        let mut root = Node::fixed("root", 2);
        root.children.push(date);
        root
    }

    #[test]
    fn given_two_branches_when_collecting_then_two_templates_without_root() {
        let templates = collect_templates(&scenario_tree());

        let texts: Vec<_> = templates.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["2021-01-01 A B", "2021-01-01 A C"]);
    }

    #[test]
    fn given_generalized_positions_when_collecting_then_wildcard_marker() {
        let mut var = Node::variable(BTreeSet::new(), 2);
        var.end = true;
        let mut list = Node::list(["up".to_string(), "down".to_string()].into(), 2);
        list.children.push(var);
        let mut root = Node::fixed("root", 2);
        root.children.push(list);

        let templates = collect_templates(&root);

        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].text, "§§");
    }

    #[test]
    fn given_matching_lines_when_clustering_then_grouped_by_end_id() {
        let mut root = scenario_tree();
        let mut issuer = crate::emit::IdIssuer::new();
        crate::emit::assign_ids(&mut root, &mut issuer);

        let lines = vec![
            line(1, &["2021-01-01", " ", "A", " ", "B"]),
            line(2, &["2021-01-01", " ", "A", " ", "C"]),
            line(3, &["2021-01-01", " ", "A", " ", "B"]),
            line(4, &["2021-01-01", " ", "X"]),
        ];
        let assignment = assign_clusters(&root, &lines, &DatatypeDetector::new());

        assert_eq!(assignment.clusters.len(), 2);
        let mut sizes: Vec<_> = assignment.clusters.values().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
        assert_eq!(assignment.unmatched, vec![4]);
        assert_eq!(assignment.matched_lines(), 3);
    }

    #[test]
    fn given_aggregated_element_when_walking_then_multiple_tokens_consumed() {
        let mut tail = Node::fixed("foo=bar", 1);
        tail.end = true;
        tail.id = Some(7);
        let mut root = Node::fixed("root", 1);
        root.id = Some(0);
        root.children.push(tail);

        let lines = vec![line(1, &["foo", "=", "bar"])];
        let assignment = assign_clusters(&root, &lines, &DatatypeDetector::new());

        assert_eq!(assignment.clusters.get(&7), Some(&vec![1]));
        assert!(assignment.unmatched.is_empty());
    }

    #[test]
    fn given_dead_end_branch_when_walking_then_backtracks_to_sibling() {
        // First child consumes the first token but has no continuation.
        let mut shallow = Node::list(["ab".to_string()].into(), 1);
        shallow.end = true;
        shallow.id = Some(1);
        let mut deep_tail = Node::fixed("c", 1);
        deep_tail.end = true;
        deep_tail.id = Some(3);
        let mut deep = Node::fixed("ab", 1);
        deep.id = Some(2);
        deep.children.push(deep_tail);
        let mut root = Node::fixed("root", 2);
        root.id = Some(0);
        root.children.push(shallow);
        root.children.push(deep);

        let lines = vec![line(1, &["ab", "c"])];
        let assignment = assign_clusters(&root, &lines, &DatatypeDetector::new());

        assert_eq!(assignment.clusters.get(&3), Some(&vec![1]));
    }

    #[test]
    fn given_typed_variable_when_walking_then_datatype_enforced() {
        let mut var = Node::variable(BTreeSet::from([Datatype::Integer]), 2);
        var.end = true;
        var.id = Some(1);
        let mut root = Node::fixed("root", 2);
        root.id = Some(0);
        root.children.push(var);

        let lines = vec![line(1, &["42"]), line(2, &["abc"])];
        let assignment = assign_clusters(&root, &lines, &DatatypeDetector::new());

        assert_eq!(assignment.clusters.get(&1), Some(&vec![1]));
        assert_eq!(assignment.unmatched, vec![2]);
    }

    #[test]
    fn given_clusters_when_rendering_then_one_line_each() {
        let mut assignment = ClusterAssignment::default();
        assignment.clusters.insert(3, vec![1, 4, 9]);
        assignment.clusters.insert(8, vec![2]);

        let text = render_clusters(&assignment);

        assert_eq!(text, "3\t3\t1,4,9\n8\t1\t2\n");
    }
}
