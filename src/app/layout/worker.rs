use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use super::{Generation, LayoutError, LayoutMessage, LayoutRequest, compute_layout};

/// Owned handle to one running layout thread. Dropping it cancels the run.
pub(in crate::app) struct LayoutHandle {
    generation: Generation,
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl LayoutHandle {
    pub(in crate::app) fn spawn(request: LayoutRequest, tx: Sender<LayoutMessage>) -> io::Result<Self> {
        let generation = request.generation;
        let cancel = Arc::new(AtomicBool::new(false));
        let worker_cancel = Arc::clone(&cancel);

        let thread = thread::Builder::new()
            .name(format!("layout-{generation}"))
            .spawn(move || run_worker(request, &worker_cancel, &tx))?;

        Ok(Self {
            generation,
            cancel,
            thread,
        })
    }

    pub(in crate::app) fn generation(&self) -> Generation {
        self.generation
    }

    pub(in crate::app) fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// True once the thread has exited, whether it sent a result or not.
    pub(in crate::app) fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

impl Drop for LayoutHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_worker(request: LayoutRequest, cancel: &AtomicBool, tx: &Sender<LayoutMessage>) {
    let generation = request.generation;
    debug!(
        "layout {generation}: {} nodes, {} links",
        request.nodes.len(),
        request.links.len()
    );

    let outcome = compute_layout(request, cancel, |fraction| {
        let _ = tx.send(LayoutMessage::Progress {
            generation,
            fraction,
        });
    });

    match outcome {
        Ok(nodes) => {
            let _ = tx.send(LayoutMessage::Progress {
                generation,
                fraction: 1.0,
            });
            let _ = tx.send(LayoutMessage::Finished { generation, nodes });
        }
        Err(LayoutError::Cancelled) => debug!("layout {generation} cancelled"),
        Err(error) => warn!("layout {generation} produced no result: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::app::layout::LayoutParams;
    use crate::flows::{Node, SurfaceSize};

    fn node(id: &str, x: f32) -> Node {
        Node {
            id: id.to_owned(),
            x,
            y: 100.0,
            degree: 0,
            is_high_priority: false,
            group: None,
        }
    }

    fn request(generation: Generation, nodes: Vec<Node>) -> LayoutRequest {
        LayoutRequest {
            generation,
            nodes,
            links: Vec::new(),
            surface: SurfaceSize::default(),
            params: LayoutParams::default(),
        }
    }

    #[test]
    fn sends_tagged_result() {
        let (tx, rx) = mpsc::channel();
        let generation = Generation::default().next().next();
        let handle = LayoutHandle::spawn(request(generation, vec![node("a", 10.0), node("b", 20.0)]), tx)
            .unwrap();
        assert_eq!(handle.generation(), generation);

        let mut finished = None;
        while let Ok(message) = rx.recv_timeout(Duration::from_secs(10)) {
            assert_eq!(message.generation(), generation);
            if let LayoutMessage::Finished { nodes, .. } = message {
                finished = Some(nodes);
                break;
            }
        }

        let nodes = finished.expect("layout result");
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn failure_sends_nothing() {
        let (tx, rx) = mpsc::channel();
        let handle = LayoutHandle::spawn(
            request(Generation::default(), vec![node("bad", f32::INFINITY)]),
            tx,
        )
        .unwrap();

        assert!(rx.recv_timeout(Duration::from_secs(10)).is_err());
        for _ in 0..1000 {
            if handle.is_finished() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.is_finished());
    }
}
