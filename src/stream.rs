//! Streaming conversion API: observe a conversion as a `Stream` of events.
//!
//! [`convert_stream`] starts the conversion on a blocking worker and returns
//! immediately with two halves:
//!
//! * a [`ProgressStream`] of [`ConversionEvent`]s, fed by a channel-backed
//!   [`ConversionProgressCallback`], which ends when the conversion does;
//! * a `JoinHandle` resolving to the final [`ConversionOutput`] (or error).
//!
//! This keeps the pipeline ignorant of any UI: a progress bar, a web socket
//! or a log line are all just consumers of the stream.

use crate::config::ConversionConfig;
use crate::convert::convert;
use crate::error::{DarkPdfError, ErrorKind};
use crate::output::ConversionOutput;
use crate::progress::{ConversionProgress, ConversionProgressCallback, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::info;

/// One observable step of a running conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConversionEvent {
    Started {
        total_pages: usize,
    },
    Progress(ConversionProgress),
    PageCompleted {
        page_num: usize,
        total_pages: usize,
        encoded_bytes: usize,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
    Completed {
        total_pages: usize,
        output_bytes: usize,
    },
}

/// A boxed stream of conversion events.
pub type ProgressStream = Pin<Box<dyn Stream<Item = ConversionEvent> + Send>>;

/// Forwards callback invocations into a channel, then to any inner callback.
struct ChannelCallback {
    tx: mpsc::UnboundedSender<ConversionEvent>,
    inner: Option<ProgressCallback>,
}

impl ChannelCallback {
    fn send(&self, event: ConversionEvent) {
        // The receiver may have been dropped; the conversion carries on.
        let _ = self.tx.send(event);
    }
}

impl ConversionProgressCallback for ChannelCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.send(ConversionEvent::Started { total_pages });
        if let Some(ref cb) = self.inner {
            cb.on_conversion_start(total_pages);
        }
    }

    fn on_progress(&self, progress: &ConversionProgress) {
        self.send(ConversionEvent::Progress(*progress));
        if let Some(ref cb) = self.inner {
            cb.on_progress(progress);
        }
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        if let Some(ref cb) = self.inner {
            cb.on_page_start(page_num, total_pages);
        }
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
        self.send(ConversionEvent::PageCompleted {
            page_num,
            total_pages,
            encoded_bytes: encoded_len,
        });
        if let Some(ref cb) = self.inner {
            cb.on_page_complete(page_num, total_pages, encoded_len);
        }
    }

    fn on_conversion_failed(&self, error: &DarkPdfError) {
        self.send(ConversionEvent::Failed {
            kind: error.kind(),
            message: error.to_string(),
        });
        if let Some(ref cb) = self.inner {
            cb.on_conversion_failed(error);
        }
    }

    fn on_conversion_complete(&self, total_pages: usize, output_len: usize) {
        self.send(ConversionEvent::Completed {
            total_pages,
            output_bytes: output_len,
        });
        if let Some(ref cb) = self.inner {
            cb.on_conversion_complete(total_pages, output_len);
        }
    }
}

/// Wrap `config` so every callback also lands on the returned receiver.
pub(crate) fn with_event_channel(
    config: &ConversionConfig,
) -> (ConversionConfig, mpsc::UnboundedReceiver<ConversionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut config = config.clone();
    let callback = ChannelCallback {
        tx,
        inner: config.progress_callback.take(),
    };
    config.progress_callback = Some(Arc::new(callback));
    (config, rx)
}

/// Start converting `path` and return its event stream plus a result handle.
///
/// The stream ends after the final `Completed` or `Failed` event. Any
/// callback already set on `config` still fires.
///
/// # Example
/// ```rust,no_run
/// use pdf2dark::{convert_stream, ConversionConfig, ConversionEvent};
/// use tokio_stream::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (mut events, handle) = convert_stream("slides.pdf", &ConversionConfig::default());
/// while let Some(event) = events.next().await {
///     if let ConversionEvent::Progress(p) = event {
///         eprintln!("{}%", p.percent());
///     }
/// }
/// let output = handle.await??;
/// std::fs::write(&output.suggested_filename, &output.bytes)?;
/// # Ok(())
/// # }
/// ```
pub fn convert_stream(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> (
    ProgressStream,
    JoinHandle<Result<ConversionOutput, DarkPdfError>>,
) {
    let path = path.as_ref().to_path_buf();
    info!("Starting streaming conversion: {}", path.display());

    let (config, rx) = with_event_channel(config);
    // The config (and the sender inside it) is dropped when the task ends,
    // which closes the stream.
    let handle = tokio::spawn(async move { convert(&path, &config).await });

    (Box::pin(UnboundedReceiverStream::new(rx)), handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Phase;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_stream::StreamExt;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ConversionProgressCallback for Counter {
        fn on_progress(&self, _: &ConversionProgress) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn channel_forwards_and_chains() {
        let inner = Arc::new(Counter::default());
        let config = ConversionConfig::builder()
            .progress_callback(inner.clone())
            .build()
            .unwrap();
        let (config, mut rx) = with_event_channel(&config);
        let cb = config.progress_callback.clone().unwrap();

        cb.on_conversion_start(2);
        cb.on_progress(&ConversionProgress::new(Phase::Rendering, 1, 2));
        cb.on_conversion_complete(2, 100);
        drop(cb);
        drop(config);

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ConversionEvent::Started { total_pages: 2 });
        assert!(matches!(events[1], ConversionEvent::Progress(p) if p.pages_completed == 1));
        assert_eq!(inner.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_ends_with_failure_for_missing_file() {
        let (events, handle) =
            convert_stream("/nonexistent/input.pdf", &ConversionConfig::default());
        let events: Vec<_> = events.collect().await;

        assert!(matches!(
            events.iter().find(|e| matches!(e, ConversionEvent::Failed { .. })),
            Some(ConversionEvent::Failed {
                kind: ErrorKind::Validation,
                ..
            })
        ));
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(DarkPdfError::FileNotFound { .. })));
    }

    #[test]
    fn events_serialise_with_tag() {
        let json = serde_json::to_value(ConversionEvent::Completed {
            total_pages: 3,
            output_bytes: 10,
        })
        .unwrap();
        assert_eq!(json["event"], "completed");
        assert_eq!(json["total_pages"], 3);
    }
}
