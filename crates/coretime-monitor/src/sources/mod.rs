//! Signal sources feeding the control loop.

pub mod blocks;
pub mod pool;
pub mod queue;

use crate::{reconnect_backoff, ChainInterface, MonitorError};
use backoff::backoff::Backoff;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Monitoring flag and stop channel shared by every source.
pub(crate) struct TaskHandle {
	/// Flag indicating if monitoring is active.
	is_monitoring: Arc<AtomicBool>,
	/// Channel for signaling monitoring shutdown.
	stop_signal: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl TaskHandle {
	pub(crate) fn new() -> Self {
		Self {
			is_monitoring: Arc::new(AtomicBool::new(false)),
			stop_signal: Arc::new(Mutex::new(None)),
		}
	}

	/// Spawns the task built by `task`, handing it the stop receiver.
	pub(crate) async fn start<F, Fut>(&self, task: F) -> Result<(), MonitorError>
	where
		F: FnOnce(mpsc::Receiver<()>) -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		if self.is_monitoring.load(Ordering::SeqCst) {
			return Err(MonitorError::AlreadyMonitoring);
		}

		let (stop_tx, stop_rx) = mpsc::channel(1);
		*self.stop_signal.lock().await = Some(stop_tx);

		tokio::spawn(task(stop_rx));

		self.is_monitoring.store(true, Ordering::SeqCst);
		Ok(())
	}

	pub(crate) async fn stop(&self) {
		if !self.is_monitoring.load(Ordering::SeqCst) {
			return;
		}

		if let Some(stop_tx) = self.stop_signal.lock().await.take() {
			let _ = stop_tx.send(()).await;
		}

		self.is_monitoring.store(false, Ordering::SeqCst);
	}
}

/// Sleeps for the next backoff delay. Returns false if stopped meanwhile.
pub(crate) async fn wait_retry<B: Backoff>(backoff: &mut B, stop_rx: &mut mpsc::Receiver<()>) -> bool {
	let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(60));
	tokio::select! {
		_ = tokio::time::sleep(delay) => true,
		_ = stop_rx.recv() => false,
	}
}

/// Keeps a subscription alive until stopped.
///
/// `open` is called for every (re)subscription and `on_item` for every value;
/// `on_item` returns false once the receiving side is gone. State captured by
/// `on_item` outlives individual subscriptions.
pub(crate) async fn supervise<T, Open, Fut, Handle>(
	phase: &'static str,
	para_id: u32,
	chain: Arc<dyn ChainInterface>,
	mut open: Open,
	mut on_item: Handle,
	mut stop_rx: mpsc::Receiver<()>,
) where
	Open: FnMut(Arc<dyn ChainInterface>) -> Fut,
	Fut: Future<Output = Result<BoxStream<'static, Result<T, MonitorError>>, MonitorError>>,
	Handle: FnMut(T) -> bool,
{
	let mut backoff = reconnect_backoff();
	let mut needs_reconnect = false;
	let mut generation = chain.connection_generation();

	loop {
		if needs_reconnect {
			if let Err(e) = chain.reconnect(generation).await {
				tracing::warn!(parachain_id = para_id, phase, error = %e, "Reconnect failed");
				if !wait_retry(&mut backoff, &mut stop_rx).await {
					return;
				}
				continue;
			}
		}

		generation = chain.connection_generation();
		let mut stream = match open(chain.clone()).await {
			Ok(stream) => stream,
			Err(e) => {
				tracing::warn!(parachain_id = para_id, phase, error = %e, "Subscription failed");
				needs_reconnect = true;
				if !wait_retry(&mut backoff, &mut stop_rx).await {
					return;
				}
				continue;
			}
		};

		loop {
			tokio::select! {
				item = stream.next() => match item {
					Some(Ok(value)) => {
						backoff.reset();
						if !on_item(value) {
							return;
						}
					}
					Some(Err(e)) => {
						tracing::warn!(parachain_id = para_id, phase, error = %e, "Subscription dropped");
						break;
					}
					None => {
						tracing::warn!(parachain_id = para_id, phase, "Subscription ended");
						break;
					}
				},
				_ = stop_rx.recv() => return,
			}
		}

		needs_reconnect = true;
		if !wait_retry(&mut backoff, &mut stop_rx).await {
			return;
		}
	}
}
