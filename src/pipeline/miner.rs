//! End-to-end mining pipeline.
//!
//! [`Miner`] wires the stages together: ingest the raw log, build the prefix
//! tree, generalize it, and emit the artifacts. [`Miner::mine`] stops after
//! the tree is final and is what the inspection commands use;
//! [`Miner::run`] additionally writes every configured artifact to disk.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{info, instrument, warn};

use crate::config::{ConfigError, Settings};
use crate::emit::{
    assign_clusters, assign_ids, build_parser_spec, collect_templates, dump_tree, render_clusters,
    render_dot, render_templates, IdIssuer,
};
use crate::ingest::{LogReader, Tokenizer};
use crate::model::{Datatype, DatatypeDetector, LogLine, Node, NodeKind};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::tree::{
    sort_tree, Aggregator, ListCollapser, ListGeneralizer, SharedSubtreeRegistry, SubtreeExtractor,
    SubtreeMerger, TreeBuilder,
};

/// Generalized template tree together with the data it was mined from.
#[derive(Debug)]
pub struct MinedTree {
    pub root: Node,
    pub lines: Vec<LogLine>,
    pub registry: SharedSubtreeRegistry,
}

/// Structural counters over the final tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub height: usize,
    pub templates: usize,
    pub shared_subtrees: usize,
    /// Occurrences of leaf nodes, i.e. lines ending at the bottom of a branch.
    pub leaf_occurrences: usize,
    /// Lines ending at an inner node whose continuation is therefore optional.
    pub optional_occurrences: usize,
    pub datatype_counts: BTreeMap<Datatype, usize>,
}

impl TreeStats {
    pub fn collect(root: &Node, registry: &SharedSubtreeRegistry) -> Self {
        let mut stats = Self {
            nodes: 0,
            height: root.height(),
            templates: 0,
            shared_subtrees: registry.len(),
            leaf_occurrences: 0,
            optional_occurrences: 0,
            datatype_counts: BTreeMap::new(),
        };
        stats.visit(root);
        stats
    }

    fn visit(&mut self, node: &Node) {
        self.nodes += 1;
        if node.end {
            self.templates += 1;
            if node.children.is_empty() {
                self.leaf_occurrences += node.occurrence;
            } else {
                self.optional_occurrences += node.terminal_count();
            }
        }
        if let NodeKind::Variable(datatypes) = &node.kind {
            for datatype in datatypes {
                *self.datatype_counts.entry(*datatype).or_default() += 1;
            }
        }
        for child in &node.children {
            self.visit(child);
        }
    }
}

/// What a full run produced, for reporting.
#[derive(Debug)]
pub struct RunSummary {
    pub lines_total: usize,
    pub clusters: usize,
    pub matched_lines: usize,
    pub unmatched_lines: usize,
    pub stats: TreeStats,
}

#[derive(Debug)]
pub struct MineOutput {
    pub summary: RunSummary,
    pub artifacts: Vec<PathBuf>,
}

/// Drives the pipeline for one [`Settings`] instance.
#[derive(Debug)]
pub struct Miner {
    settings: Settings,
}

impl Miner {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run ingestion and every tree stage, returning the finished tree with
    /// identifiers assigned. No files are written.
    #[instrument(skip_all)]
    pub fn mine(&self) -> PipelineResult<MinedTree> {
        self.settings.validate()?;
        let input = self.settings.input_file.as_deref().ok_or_else(|| {
            ConfigError::Invalid(
                "no input file configured, set input_file or pass one on the command line".into(),
            )
        })?;

        let reader = LogReader::new(
            self.settings.timestamp_length,
            Tokenizer::new(&self.settings.delimiters),
        );
        let lines = reader.read(input)?;
        info!("{} lines read from {}", lines.len(), input.display());
        if lines.is_empty() {
            warn!("input produced no usable lines");
        }

        info!("building tree");
        let mut root = TreeBuilder::from_settings(&self.settings).build(&lines);
        sort_tree(&mut root);

        info!("merging similar branches");
        SubtreeMerger::from_settings(&self.settings).merge_siblings(&mut root);

        info!("inserting lists");
        ListCollapser.collapse(&mut root);

        info!("matching lists");
        ListGeneralizer::new(self.settings.element_list_similarity).generalize(&mut root);

        // Canonical order before subtree extraction: the registry keys on
        // structural fingerprints, which include child order, so the tree
        // must not be reordered afterwards.
        sort_tree(&mut root);

        info!("extracting shared subtrees");
        let registry = SubtreeExtractor::new(self.settings.subtree_min_height).extract(&root);

        info!("aggregating token sequences");
        Aggregator::new(&registry).aggregate(&mut root);

        let mut issuer = IdIssuer::new();
        assign_ids(&mut root, &mut issuer);
        info!("tree finished, {} nodes", root.node_count());

        Ok(MinedTree {
            root,
            lines,
            registry,
        })
    }

    /// Mine the input and write every configured artifact.
    #[instrument(skip_all)]
    pub fn run(&self) -> PipelineResult<MineOutput> {
        let mined = self.mine()?;
        let output = &self.settings.output;

        let detector = DatatypeDetector::new();
        let assignment = assign_clusters(&mined.root, &mined.lines, &detector);
        if !assignment.unmatched.is_empty() {
            warn!(
                "{} of {} lines do not match the mined tree",
                assignment.unmatched.len(),
                mined.lines.len()
            );
        }

        let delimiters: BTreeSet<char> = self.settings.delimiters.iter().copied().collect();
        let spec = build_parser_spec(&mined.root, &mined.registry, &delimiters);
        let templates = collect_templates(&mined.root);

        let mut artifacts = Vec::new();
        artifacts.push(write_artifact(&output.tree_file, &dump_tree(&mined.root))?);
        artifacts.push(write_artifact(
            &output.templates_file,
            &render_templates(&templates),
        )?);
        artifacts.push(write_artifact(
            &output.parser_file,
            &serde_json::to_string_pretty(&spec)?,
        )?);
        if let Some(clusters_file) = &output.clusters_file {
            artifacts.push(write_artifact(clusters_file, &render_clusters(&assignment))?);
        }
        if output.visualize {
            artifacts.push(write_artifact(
                &output.visualization_file,
                &render_dot(&mined.root),
            )?);
        }

        let stats = TreeStats::collect(&mined.root, &mined.registry);
        let summary = RunSummary {
            lines_total: mined.lines.len(),
            clusters: assignment.clusters.len(),
            matched_lines: assignment.matched_lines(),
            unmatched_lines: assignment.unmatched.len(),
            stats,
        };
        Ok(MineOutput { summary, artifacts })
    }
}

/// Write `content` to `path` atomically: into a temporary file in the target
/// directory first, then rename over the destination.
fn write_artifact(path: &Path, content: &str) -> PipelineResult<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| PipelineError::artifact(path, e))?;

    let mut file = NamedTempFile::new_in(parent).map_err(|e| PipelineError::artifact(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| PipelineError::artifact(path, e))?;
    file.persist(path)
        .map_err(|e| PipelineError::artifact(path, e.error))?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::init_test_setup;
    use tempfile::TempDir;

    fn settings_for(temp: &TempDir, input: &str) -> Settings {
        let input_path = temp.path().join("input.log");
        std::fs::write(&input_path, input).expect("write input");

        let mut settings = Settings::default();
        settings.input_file = Some(input_path);
        settings.timestamp_length = 0;
        settings.output.tree_file = temp.path().join("tree.txt");
        settings.output.templates_file = temp.path().join("templates.txt");
        settings.output.parser_file = temp.path().join("parser.json");
        settings
    }

    #[test]
    fn given_missing_input_setting_when_mining_then_config_error() {
        init_test_setup();
        let settings = Settings::default();

        let result = Miner::new(settings).mine();

        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn given_small_log_when_mining_then_occurrence_matches_line_count() {
        init_test_setup();
        let temp = TempDir::new().unwrap();
        let settings = settings_for(&temp, "user alice logged in\nuser bob logged in\n");

        let mined = Miner::new(settings).mine().unwrap();

        assert_eq!(mined.root.occurrence, 2);
        assert_eq!(mined.lines.len(), 2);
        assert_eq!(mined.root.id, Some(0));
    }

    #[test]
    fn given_small_log_when_running_then_artifacts_written() {
        init_test_setup();
        let temp = TempDir::new().unwrap();
        let settings = settings_for(&temp, "user alice logged in\nuser bob logged in\n");

        let output = Miner::new(settings).run().unwrap();

        assert_eq!(output.artifacts.len(), 3);
        for artifact in &output.artifacts {
            assert!(artifact.exists(), "missing {}", artifact.display());
        }
        assert_eq!(output.summary.lines_total, 2);
        assert_eq!(output.summary.unmatched_lines, 0);
    }

    #[test]
    fn given_clusters_file_configured_when_running_then_written_too() {
        init_test_setup();
        let temp = TempDir::new().unwrap();
        let mut settings = settings_for(&temp, "alpha one\nalpha two\n");
        settings.output.clusters_file = Some(temp.path().join("clusters.txt"));

        let output = Miner::new(settings).run().unwrap();

        assert_eq!(output.artifacts.len(), 4);
        let clusters = std::fs::read_to_string(temp.path().join("clusters.txt")).unwrap();
        assert!(!clusters.is_empty());
    }

    #[test]
    fn given_stats_when_collected_then_leaf_occurrences_cover_all_lines() {
        init_test_setup();
        let temp = TempDir::new().unwrap();
        let settings = settings_for(&temp, "alpha one\nalpha two\nbeta three\n");

        let mined = Miner::new(settings).mine().unwrap();
        let stats = TreeStats::collect(&mined.root, &mined.registry);

        assert_eq!(stats.leaf_occurrences + stats.optional_occurrences, 3);
        assert!(stats.nodes >= stats.templates);
    }

    #[test]
    fn given_artifact_in_new_directory_when_writing_then_directories_created() {
        init_test_setup();
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("out").join("deep").join("tree.txt");

        write_artifact(&nested, "content\n").unwrap();

        assert_eq!(std::fs::read_to_string(&nested).unwrap(), "content\n");
    }
}
