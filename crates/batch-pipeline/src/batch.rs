//! Batch orchestration over (source × template) render jobs.
//!
//! Each source is decoded once on a blocking worker and rendered against
//! every template. Workers are bounded by a semaphore. Cancelling the token
//! abandons the batch: collected outputs are dropped and no archive is built.

use std::sync::Arc;

use image_compositor::{CompositeError, RenderedOutput, Renderer, SourceImage, WatermarkSpec};
use template_catalog::{Template, TemplateCatalog};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::archive::{self, ArchiveBlob};
use crate::naming::unique_base_names;
use crate::request::{BatchRequest, SourceFile, TemplateRequest};
use crate::{BatchError, Result};

/// Live counters for a running batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchProgress {
    pub fn is_done(&self) -> bool {
        self.total > 0 && self.completed + self.failed >= self.total
    }
}

/// A (source, template) pair that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub source: String,
    pub template: String,
    pub error: String,
}

impl JobFailure {
    fn new(source: &str, template: &Template, error: impl ToString) -> Self {
        Self {
            source: source.to_string(),
            template: template.name.clone(),
            error: error.to_string(),
        }
    }
}

/// Result of a batch that produced at least one output.
#[derive(Debug)]
pub struct BatchOutput {
    pub archive: ArchiveBlob,
    pub failures: Vec<JobFailure>,
}

type JobResult = std::result::Result<RenderedOutput, JobFailure>;

#[derive(Clone, Default)]
struct ProgressReporter {
    tx: Option<Arc<watch::Sender<BatchProgress>>>,
}

impl ProgressReporter {
    fn start(&self, total: usize) {
        if let Some(tx) = &self.tx {
            tx.send_replace(BatchProgress {
                total,
                ..BatchProgress::default()
            });
        }
    }

    fn record(&self, ok: bool) {
        if let Some(tx) = &self.tx {
            tx.send_modify(|p| {
                if ok {
                    p.completed += 1;
                } else {
                    p.failed += 1;
                }
            });
        }
    }
}

/// Drives batches against a shared, read-only template catalog.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    catalog: Arc<TemplateCatalog>,
    workers: usize,
}

impl BatchOrchestrator {
    pub fn new(catalog: Arc<TemplateCatalog>) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self { catalog, workers }
    }

    /// Cap the number of sources rendered concurrently.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run a batch to completion and return its archive.
    pub async fn process(
        &self,
        request: BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchOutput> {
        self.run(request, cancel, ProgressReporter::default()).await
    }

    /// Like [`process`](Self::process), publishing counters on `progress`.
    pub async fn process_with_progress(
        &self,
        request: BatchRequest,
        cancel: &CancellationToken,
        progress: watch::Sender<BatchProgress>,
    ) -> Result<BatchOutput> {
        let reporter = ProgressReporter {
            tx: Some(Arc::new(progress)),
        };
        self.run(request, cancel, reporter).await
    }

    /// Concrete render targets for a request, with "All Templates" expanded.
    pub fn resolve_templates(&self, request: &TemplateRequest) -> Result<Vec<Template>> {
        let templates = match request {
            TemplateRequest::Catalog(requested) => self.catalog.expand(requested),
            TemplateRequest::Custom { width, height } => {
                vec![TemplateRequest::custom_template(*width, *height)]
            }
        };
        if templates.is_empty() {
            return Err(BatchError::NoTemplates);
        }
        Ok(templates)
    }

    async fn run(
        &self,
        request: BatchRequest,
        cancel: &CancellationToken,
        progress: ProgressReporter,
    ) -> Result<BatchOutput> {
        let BatchRequest {
            sources,
            templates,
            watermark,
            tier_limit,
            format,
        } = request;

        if sources.len() > tier_limit as usize {
            warn!(
                count = sources.len(),
                limit = tier_limit,
                "Batch rejected: too many files"
            );
            return Err(BatchError::TooManyFiles {
                count: sources.len(),
                limit: tier_limit,
            });
        }

        let templates = Arc::new(self.resolve_templates(&templates)?);
        let watermark_kind = watermark.as_ref().map(WatermarkSpec::kind);
        let watermark = Arc::new(watermark);
        let renderer = Renderer::new(format);
        let total = sources.len() * templates.len();
        progress.start(total);

        info!(
            sources = sources.len(),
            templates = templates.len(),
            jobs = total,
            workers = self.workers,
            format = %format,
            watermark = watermark_kind,
            "Batch started"
        );

        let bases = unique_base_names(sources.iter().map(|s| s.file_name.as_str()));
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (file, base) in sources.into_iter().zip(bases) {
            let permits = Arc::clone(&permits);
            let templates = Arc::clone(&templates);
            let watermark = Arc::clone(&watermark);
            let cancel = cancel.clone();
            let progress = progress.clone();

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return Vec::new();
                };
                let file_name = file.file_name.clone();
                let job_templates = Arc::clone(&templates);
                let job_progress = progress.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    render_source(
                        file,
                        &base,
                        &job_templates,
                        (*watermark).as_ref(),
                        renderer,
                        &cancel,
                        &job_progress,
                    )
                });
                match handle.await {
                    Ok(results) => results,
                    Err(e) => {
                        error!(source = %file_name, error = %e, "Render worker panicked");
                        templates
                            .iter()
                            .map(|t| {
                                progress.record(false);
                                Err(JobFailure::new(&file_name, t, &e))
                            })
                            .collect()
                    }
                }
            });
        }

        let mut outputs = Vec::with_capacity(total);
        let mut failures = Vec::new();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    info!(rendered = outputs.len(), "Batch cancelled, discarding outputs");
                    return Err(BatchError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(results)) => {
                        for result in results {
                            match result {
                                Ok(output) => outputs.push(output),
                                Err(failure) => failures.push(failure),
                            }
                        }
                    }
                    Some(Err(e)) => error!(error = %e, "Batch task failed"),
                },
            }
        }

        if outputs.is_empty() {
            warn!(failed = failures.len(), "Batch produced no outputs");
            return Err(BatchError::EmptyResult {
                failed: failures.len(),
            });
        }

        let rendered = outputs.len();
        let assembly = tokio::task::spawn_blocking(move || archive::assemble(outputs));
        let blob = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Batch cancelled during archive assembly");
                return Err(BatchError::Cancelled);
            }
            joined = assembly => joined.map_err(|e| BatchError::ArchiveWrite(e.to_string()))??,
        };

        info!(
            rendered,
            failed = failures.len(),
            archive_bytes = blob.bytes.len(),
            "Batch finished"
        );
        Ok(BatchOutput {
            archive: blob,
            failures,
        })
    }
}

/// Decode one source and render it against every template.
fn render_source(
    file: SourceFile,
    base: &str,
    templates: &[Template],
    watermark: Option<&WatermarkSpec>,
    renderer: Renderer,
    cancel: &CancellationToken,
    progress: &ProgressReporter,
) -> Vec<JobResult> {
    let source = match SourceImage::decode(file.file_name.as_str(), &file.bytes) {
        Ok(source) => source,
        Err(e) => {
            warn!(source = %file.file_name, error = %e, "Skipping undecodable source");
            return templates
                .iter()
                .map(|t| {
                    progress.record(false);
                    Err(JobFailure::new(&file.file_name, t, &e))
                })
                .collect();
        }
    };
    drop(file.bytes);

    let mut results = Vec::with_capacity(templates.len());
    for template in templates {
        if cancel.is_cancelled() {
            break;
        }
        let result = renderer
            .render_named(&source, base, template, watermark)
            .map_err(|e: CompositeError| {
                warn!(
                    source = %file.file_name,
                    template = %template.name,
                    error = %e,
                    "Render job failed, skipping"
                );
                JobFailure::new(&file.file_name, template, &e)
            });
        progress.record(result.is_ok());
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use image_compositor::{WatermarkBitmap, WatermarkLayout};
    use std::collections::HashSet;
    use std::io::Cursor;
    use std::time::Duration;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 128, 255, 255])))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn catalog() -> Arc<TemplateCatalog> {
        Arc::new(
            TemplateCatalog::new(vec![
                Template::new("Square", 40, 40).unwrap(),
                Template::new("Tall Story", 20, 60).unwrap(),
                Template::new("Alt Story", 20, 60).unwrap(),
            ])
            .unwrap(),
        )
    }

    fn orchestrator() -> BatchOrchestrator {
        BatchOrchestrator::new(catalog()).with_workers(2)
    }

    fn pick(names: &[&str]) -> TemplateRequest {
        let catalog = catalog();
        TemplateRequest::Catalog(
            names
                .iter()
                .map(|n| catalog.get(n).unwrap().clone())
                .collect(),
        )
    }

    fn sources(n: usize) -> Vec<SourceFile> {
        (0..n)
            .map(|i| SourceFile::new(format!("img{i}.png"), png(30, 20)))
            .collect()
    }

    #[tokio::test]
    async fn renders_every_pair() {
        let request = BatchRequest::new(sources(3), pick(&["Square", "Tall Story"]), 5);
        let out = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.archive.len(), 6);
        assert!(out.failures.is_empty());
        assert!(out.archive.entries.contains(&"img0.square.40x40.png".to_string()));
        assert!(out.archive.entries.contains(&"img2.tall-story.20x60.png".to_string()));
    }

    #[tokio::test]
    async fn too_many_files_fails_before_rendering() {
        let (tx, rx) = watch::channel(BatchProgress::default());
        let request = BatchRequest::new(sources(6), pick(&["Square"]), 5);
        let err = orchestrator()
            .process_with_progress(request, &CancellationToken::new(), tx)
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::TooManyFiles { count: 6, limit: 5 }));
        assert_eq!(*rx.borrow(), BatchProgress::default());
    }

    #[tokio::test]
    async fn bad_source_is_skipped() {
        let mut files = sources(3);
        files[1] = SourceFile::new("broken.png", b"definitely not a png".to_vec());
        let request = BatchRequest::new(files, pick(&["Square", "Tall Story"]), 5);

        let out = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.archive.len(), (3 - 1) * 2);
        assert_eq!(out.failures.len(), 2);
        assert!(out.failures.iter().all(|f| f.source == "broken.png"));
    }

    #[tokio::test]
    async fn all_templates_expands_to_catalog() {
        let request = BatchRequest::new(
            sources(2),
            TemplateRequest::Catalog(vec![Template::all_templates()]),
            5,
        );
        let out = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap();

        // Two equal-sized templates still yield two entries each.
        assert_eq!(out.archive.len(), 2 * 3);
        assert!(!out.archive.entries.iter().any(|n| n.contains("all-templates")));
    }

    #[tokio::test]
    async fn duplicate_file_names_get_unique_entries() {
        let files = vec![
            SourceFile::new("photo.png", png(10, 10)),
            SourceFile::new("photo.png", png(12, 10)),
        ];
        let request = BatchRequest::new(files, pick(&["Square", "Alt Story"]), 5);
        let out = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap();

        let names: HashSet<_> = out.archive.entries.iter().collect();
        assert_eq!(names.len(), 4);
        assert!(out.archive.entries.contains(&"photo-2.square.40x40.png".to_string()));
    }

    #[tokio::test]
    async fn nothing_renderable_is_empty_result() {
        let files = vec![SourceFile::new("a.png", b"nope".to_vec())];
        let request = BatchRequest::new(files, pick(&["Square"]), 5);
        let err = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::EmptyResult { failed: 1 }));
    }

    #[tokio::test]
    async fn broken_watermark_fails_each_job() {
        let spec = WatermarkSpec::image(
            WatermarkBitmap::new("logo.png", b"broken".to_vec()),
            WatermarkLayout::default(),
        )
        .unwrap();
        let request = BatchRequest::new(sources(2), pick(&["Square"]), 5).with_watermark(spec);
        let err = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::EmptyResult { failed: 2 }));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let request = BatchRequest::new(sources(1), TemplateRequest::Catalog(Vec::new()), 5);
        let err = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::NoTemplates));
    }

    #[tokio::test]
    async fn custom_size_renders_single_template() {
        let request = BatchRequest::new(
            sources(2),
            TemplateRequest::Custom {
                width: 30,
                height: 15,
            },
            5,
        );
        let out = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            out.archive.entries,
            vec!["img0.custom.30x15.png", "img1.custom.30x15.png"]
        );
    }

    #[tokio::test]
    async fn zero_custom_size_fails_per_job() {
        let request = BatchRequest::new(
            sources(1),
            TemplateRequest::Custom {
                width: 0,
                height: 15,
            },
            5,
        );
        let err = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::EmptyResult { failed: 1 }));
    }

    #[tokio::test]
    async fn cancelled_batch_returns_no_archive() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = BatchRequest::new(sources(2), pick(&["Square"]), 5);
        let err = orchestrator().process(request, &cancel).await.unwrap_err();
        assert!(matches!(err, BatchError::Cancelled));
    }

    #[tokio::test]
    async fn cancelling_mid_batch_stops_workers_and_drops_outputs() {
        let templates = (0..120)
            .map(|i| Template::new(format!("Size {i}"), 160, 160).unwrap())
            .collect();
        let request = BatchRequest::new(sources(1), TemplateRequest::Catalog(templates), 5);
        let (tx, rx) = watch::channel(BatchProgress::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        let mut watcher = rx.clone();
        tokio::spawn(async move {
            while watcher.changed().await.is_ok() {
                if watcher.borrow_and_update().completed > 0 {
                    trigger.cancel();
                    break;
                }
            }
        });

        let err = orchestrator()
            .with_workers(1)
            .process_with_progress(request, &cancel, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Cancelled));

        // Wait for the abandoned worker to settle; it stops between templates.
        let mut last = *rx.borrow();
        loop {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let now = *rx.borrow();
            if now == last {
                break;
            }
            last = now;
        }
        assert_eq!(last.total, 120);
        assert!(last.completed >= 1);
        assert!(last.completed + last.failed < last.total, "{last:?}");
    }

    #[tokio::test]
    async fn dotted_names_never_collide() {
        let files = vec![
            SourceFile::new("a.b.png", png(10, 10)),
            SourceFile::new("a.png", png(10, 10)),
        ];
        let templates = vec![
            Template::new("c", 20, 40).unwrap(),
            Template::new("b.c", 20, 40).unwrap(),
            Template::new("C", 20, 40).unwrap(),
        ];
        let request = BatchRequest::new(files, TemplateRequest::Catalog(templates), 5);
        let out = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            out.archive.entries,
            vec![
                "a.b-c.20x40.png",
                "a.b.b-c.20x40.png",
                "a.b.c.20x40.png",
                "a.c.20x40.png",
            ]
        );
    }

    #[tokio::test]
    async fn oversized_custom_size_fails_per_job() {
        let request = BatchRequest::new(
            sources(1),
            TemplateRequest::Custom {
                width: 100_000,
                height: 100_000,
            },
            5,
        );
        let err = orchestrator()
            .process(request, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::EmptyResult { failed: 1 }));
    }

    #[tokio::test]
    async fn progress_reaches_total() {
        let (tx, rx) = watch::channel(BatchProgress::default());
        let mut files = sources(2);
        files.push(SourceFile::new("bad.png", b"x".to_vec()));
        let request = BatchRequest::new(files, pick(&["Square", "Tall Story"]), 5);

        orchestrator()
            .process_with_progress(request, &CancellationToken::new(), tx)
            .await
            .unwrap();

        let progress = *rx.borrow();
        assert_eq!(progress.total, 6);
        assert_eq!(progress.completed, 4);
        assert_eq!(progress.failed, 2);
        assert!(progress.is_done());
    }
}
