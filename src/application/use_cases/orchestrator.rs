use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::application::{
    CallResolver, ChunkPlanner, CommunityProcessor, ExtractionPort, FileSystemPort, GraphSink,
    HeritageResolver, ImportMap, ImportResolutionContext, ImportResolver, ProcessDetector,
    Scanner, StructureProcessor, SymbolTable,
};
use crate::domain::{
    normalize_path, CallSite, DefinitionKind, DomainError, ExtractedRecord, GraphSnapshot,
    HeritageClause, ImportStatement, IngestStats, Node, NodeLabel, Phase, PhaseErrorLog,
    PipelineConfig, ProgressEvent, Relationship, RelationshipType,
};

/// Thin wrapper over the progress channel (spec.md §6 "Produced" #2).
/// Mirrors the teacher's use of an `indicatif::ProgressBar` threaded
/// through use cases, generalised to an `mpsc` channel since progress
/// here must reach an external caller rather than a terminal.
#[derive(Clone)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender: Some(sender) }
    }

    /// A reporter that discards every event — for callers (and tests)
    /// that don't need progress updates.
    pub fn new_discarding() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, phase: Phase, local_percent: f64, message: impl Into<String>) {
        self.send(ProgressEvent::new(phase, local_percent, message));
    }

    pub fn emit_detail(&self, phase: Phase, local_percent: f64, message: impl Into<String>, detail: impl Into<String>) {
        self.send(ProgressEvent::new(phase, local_percent, message).with_detail(detail));
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // A closed receiver (the caller stopped listening) is not a
            // pipeline failure; progress is best-effort.
            let _ = sender.send(event);
        }
    }
}

/// Per-file definitions awaiting the resolution phase, kept instead of
/// the whole `ExtractedRecord` once definitions are registered, so only
/// the lightweight import/call/heritage lists survive past the parse
/// phase (spec.md §5 "bounded memory").
struct PendingFile {
    file_path: String,
    imports: Vec<ImportStatement>,
    calls: Vec<CallSite>,
    heritage: Vec<HeritageClause>,
}

/// Drives all six phases in order, owning the `SymbolTable`, `ImportMap`,
/// and `GraphSnapshot` for the run's duration (spec.md §5 "Shared
/// resources" / §2). A fresh `Orchestrator` is expected per repository
/// ingestion; it holds no state between calls to [`Orchestrator::run`].
pub struct Orchestrator {
    fs: Arc<dyn FileSystemPort>,
    extraction: Arc<dyn ExtractionPort>,
    graph_sink: Arc<dyn GraphSink>,
    config: PipelineConfig,
}

/// Everything a completed run produced (spec.md §6 "Produced").
pub struct IngestOutcome {
    pub snapshot: GraphSnapshot,
    pub stats: IngestStats,
    pub errors: PhaseErrorLog,
}

impl Orchestrator {
    pub fn new(
        fs: Arc<dyn FileSystemPort>,
        extraction: Arc<dyn ExtractionPort>,
        graph_sink: Arc<dyn GraphSink>,
        config: PipelineConfig,
    ) -> Self {
        Self { fs, extraction, graph_sink, config }
    }

    pub async fn run(&self, root: &Path, progress: &ProgressReporter) -> Result<IngestOutcome, DomainError> {
        let mut snapshot = GraphSnapshot::new();
        let mut errors = PhaseErrorLog::new();
        let mut stats = IngestStats::default();

        // Phase 1: Scan.
        let scanner = Scanner::new(self.fs.clone());
        let (files, scan_stats) = scanner.scan(root, progress).await?;
        stats.files_scanned = scan_stats.admitted;
        stats.files_skipped_oversized = scan_stats.skipped_oversized;
        stats.files_skipped_unreadable = scan_stats.skipped_unreadable;

        let normalized_paths: Vec<String> = files.iter().map(|f| normalize_path(&f.relative_path)).collect();

        // Phase 2: Structure.
        progress.emit(Phase::Structure, 0.0, "building file tree");
        let file_node_ids = StructureProcessor::new().build(&files, &mut snapshot);
        progress.emit(Phase::Structure, 100.0, "file tree complete");

        // Phase 3 + 4: chunked parse, each chunk resolved against the
        // symbol table as it stands immediately after, so a chunk's raw
        // content and extracted records can be dropped before the next
        // chunk begins (spec.md §4.3 "read -> parse -> resolve imports ->
        // resolve calls -> resolve heritage -> free"; §5 "cross-chunk
        // resolution sees symbols from all prior chunks but not later
        // ones").
        let planner = ChunkPlanner::new(self.config.chunk_byte_budget);
        let chunks = planner.plan(files);
        let total_chunks = chunks.len().max(1);

        let mut symbol_table = SymbolTable::new();
        let mut class_ids_by_file: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        let mut function_ids_by_file: HashMap<String, BTreeMap<String, String>> = HashMap::new();

        let mut import_context = ImportResolutionContext::new(&normalized_paths);
        let mut import_map = ImportMap::new();
        let import_resolver = ImportResolver::default();
        let call_resolver = CallResolver::default();
        let heritage_resolver = HeritageResolver::default();

        for (chunk_index, chunk) in chunks.iter().enumerate() {
            let relative_paths: Vec<String> = chunk.files.iter().map(|f| f.relative_path.clone()).collect();
            let sources = self.fs.read_contents(root, &relative_paths).await?;

            let (records, chunk_errors) = {
                let extraction = self.extraction.clone();
                let chunk_files = chunk.files.clone();
                tokio::task::spawn_blocking(move || extraction.extract_chunk(&chunk_files, &sources))
                    .await
                    .map_err(|e| DomainError::internal(format!("extraction worker panicked: {e}")))?
            };
            errors.merge(chunk_errors);

            let mut pending_files: Vec<PendingFile> = Vec::with_capacity(records.len());
            for record in records {
                stats.files_parsed += 1;
                self.register_definitions(
                    &record,
                    &file_node_ids,
                    &mut snapshot,
                    &mut symbol_table,
                    &mut class_ids_by_file,
                    &mut function_ids_by_file,
                );
                stats.definitions += record.definitions.len() as u64;
                pending_files.push(PendingFile {
                    file_path: record.file_path,
                    imports: record.imports,
                    calls: record.calls,
                    heritage: record.heritage,
                });
            }

            stats.chunks_processed += 1;
            let percent = ((chunk_index + 1) as f64 / total_chunks as f64) * 100.0;
            progress.emit(Phase::ChunkedParse, percent, "parsing chunks");

            for pending in &pending_files {
                stats.imports_resolved += import_resolver.resolve_file(
                    &pending.file_path,
                    &pending.imports,
                    &mut import_context,
                    &mut import_map,
                    &file_node_ids,
                    &mut snapshot,
                );

                let empty = BTreeMap::new();
                let enclosing_ids = function_ids_by_file.get(&pending.file_path).unwrap_or(&empty);
                let file_node_id = file_node_ids.get(&pending.file_path).cloned().unwrap_or_default();
                stats.calls_resolved += call_resolver.resolve_file(
                    &pending.file_path,
                    &file_node_id,
                    &pending.calls,
                    enclosing_ids,
                    &symbol_table,
                    &import_map,
                    &mut snapshot,
                );

                let empty_classes = BTreeMap::new();
                let class_ids = class_ids_by_file.get(&pending.file_path).unwrap_or(&empty_classes);
                stats.heritage_resolved += heritage_resolver.resolve_file(
                    &pending.file_path,
                    class_ids,
                    &pending.heritage,
                    &symbol_table,
                    &import_map,
                    &mut snapshot,
                );
            }
            // `pending_files` (and the chunk's sources, already consumed
            // above) drop here, before the next chunk is read.
            progress.emit(Phase::SymbolResolution, percent, "resolving symbols");
        }

        // Phase 5: Community detection.
        progress.emit(Phase::CommunityDetection, 0.0, "detecting communities");
        stats.communities = CommunityProcessor::new(&self.config).detect(&mut snapshot);
        progress.emit(Phase::CommunityDetection, 100.0, "communities detected");

        // Phase 6: Process detection.
        progress.emit(Phase::ProcessDetection, 0.0, "tracing processes");
        let (processes, cross_community) = ProcessDetector::new(&self.config).detect(&mut snapshot);
        stats.processes = processes;
        stats.cross_community_processes = cross_community;
        progress.emit(Phase::ProcessDetection, 100.0, "processes traced");

        snapshot.retain_relationships_with_known_endpoints();
        stats.non_fatal_errors = errors.count() as u64;

        info!(
            nodes = snapshot.nodes.len(),
            relationships = snapshot.relationships.len(),
            errors = errors.count(),
            "ingestion complete"
        );
        if !errors.is_empty() {
            warn!(count = errors.count(), "non-fatal errors recorded during ingestion");
        }

        self.graph_sink.write_snapshot(&snapshot).await?;

        Ok(IngestOutcome { snapshot, stats, errors })
    }

    /// Creates a node for every definition, registers it in the symbol
    /// table, links it to its owning file with `DEFINES`, and — for
    /// methods nested in a class/interface — emits the `MEMBER_OF` edge
    /// once both ends exist (spec.md §4.4 "enclosing scope").
    fn register_definitions(
        &self,
        record: &ExtractedRecord,
        file_node_ids: &BTreeMap<String, String>,
        snapshot: &mut GraphSnapshot,
        symbol_table: &mut SymbolTable,
        class_ids_by_file: &mut HashMap<String, BTreeMap<String, String>>,
        function_ids_by_file: &mut HashMap<String, BTreeMap<String, String>>,
    ) {
        let Some(file_node_id) = file_node_ids.get(&record.file_path) else {
            return;
        };

        for definition in &record.definitions {
            let label = definition_label(definition.kind);
            let node = Node::new(label, record.file_path.clone(), definition.name.clone())
                .with_span(definition.start_line, definition.end_line)
                .with_exported(definition.is_exported);
            let node_id = node.id().to_string();
            snapshot.add_node(node);

            snapshot.add_relationship(Relationship::new(
                file_node_id.clone(),
                node_id.clone(),
                RelationshipType::Defines,
                1.0,
                "",
            ));
            symbol_table.register(&record.file_path, &definition.name, &node_id);

            match definition.kind {
                DefinitionKind::Class | DefinitionKind::Interface => {
                    class_ids_by_file
                        .entry(record.file_path.clone())
                        .or_default()
                        .insert(definition.name.clone(), node_id.clone());
                }
                DefinitionKind::Function | DefinitionKind::Method => {
                    function_ids_by_file
                        .entry(record.file_path.clone())
                        .or_default()
                        .insert(definition.name.clone(), node_id.clone());
                }
                _ => {}
            }
        }

        for definition in &record.definitions {
            let Some(scope_name) = &definition.enclosing_scope else {
                continue;
            };
            let (Some(member_id), Some(owner_id)) = (
                symbol_table.lookup_exact(&record.file_path, &definition.name),
                symbol_table.lookup_exact(&record.file_path, scope_name),
            ) else {
                continue;
            };
            snapshot.add_relationship(Relationship::new(
                member_id.to_string(),
                owner_id.to_string(),
                RelationshipType::MemberOf,
                1.0,
                "",
            ));
        }
    }
}

fn definition_label(kind: DefinitionKind) -> NodeLabel {
    match kind {
        DefinitionKind::Class => NodeLabel::Class,
        DefinitionKind::Function => NodeLabel::Function,
        DefinitionKind::Method => NodeLabel::Method,
        DefinitionKind::Interface => NodeLabel::Interface,
        DefinitionKind::Enum => NodeLabel::Enum,
        DefinitionKind::Variable => NodeLabel::Variable,
        DefinitionKind::Decorator => NodeLabel::Decorator,
        DefinitionKind::Type => NodeLabel::Type,
        DefinitionKind::Module => NodeLabel::Module,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallSite, Definition, DomainError as Err, Language, ScannedFile, WalkOutcome};
    use async_trait::async_trait;
    use std::collections::HashMap as Map;

    struct FakeFs {
        files: Vec<ScannedFile>,
        sources: Map<String, String>,
    }

    #[async_trait]
    impl FileSystemPort for FakeFs {
        async fn walk_paths(&self, _root: &Path) -> Result<WalkOutcome, DomainError> {
            Ok(WalkOutcome { files: self.files.clone(), skipped_oversized: 0, skipped_unreadable: 0 })
        }

        async fn read_contents(&self, _root: &Path, relative_paths: &[String]) -> Result<Map<String, String>, DomainError> {
            Ok(relative_paths
                .iter()
                .filter_map(|p| self.sources.get(p).map(|s| (p.clone(), s.clone())))
                .collect())
        }

        fn ignore_policy(&self, _path: &Path) -> bool {
            false
        }

        fn language_for(&self, _path: &Path) -> Language {
            Language::TypeScript
        }
    }

    struct FakeExtraction;

    impl ExtractionPort for FakeExtraction {
        fn extract_chunk(
            &self,
            files: &[ScannedFile],
            _sources: &Map<String, String>,
        ) -> (Vec<ExtractedRecord>, PhaseErrorLog) {
            let records = files
                .iter()
                .map(|f| {
                    let mut record = ExtractedRecord::new(f.relative_path.clone());
                    record
                        .definitions
                        .push(Definition::new(DefinitionKind::Function, "main", 1, 5).exported());
                    if f.relative_path == "b.ts" {
                        record.calls.push(CallSite::new("main", 2, 0));
                        record.imports.push(ImportStatement::new("./a"));
                    }
                    record
                })
                .collect();
            (records, PhaseErrorLog::new())
        }
    }

    struct FakeSink;

    #[async_trait]
    impl GraphSink for FakeSink {
        async fn write_snapshot(&self, _snapshot: &GraphSnapshot) -> Result<(), Err> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn end_to_end_run_resolves_a_cross_file_call() {
        let fs = Arc::new(FakeFs {
            files: vec![ScannedFile::new("a.ts", 10), ScannedFile::new("b.ts", 10)],
            sources: [("a.ts".to_string(), "".to_string()), ("b.ts".to_string(), "".to_string())]
                .into_iter()
                .collect(),
        });
        let orchestrator = Orchestrator::new(fs, Arc::new(FakeExtraction), Arc::new(FakeSink), PipelineConfig::default());
        let progress = ProgressReporter::new_discarding();
        let outcome = orchestrator.run(Path::new("/tmp/repo"), &progress).await.unwrap();

        assert_eq!(outcome.stats.files_parsed, 2);
        assert_eq!(outcome.stats.imports_resolved, 1);
        assert_eq!(outcome.stats.calls_resolved, 1);

        let calls_edge = outcome
            .snapshot
            .relationships
            .iter()
            .any(|r| r.relationship_type() == RelationshipType::Calls);
        assert!(calls_edge);
    }
}
