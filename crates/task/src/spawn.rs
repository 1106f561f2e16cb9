use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("kiln-task-global")
			.build()
			.expect("failed to build kiln-task global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns an async task with shared task classification metadata.
///
/// Reactor-safe: falls back to a process-global runtime so spawning works
/// even when called from a thread without an active tokio runtime.
pub fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(task_class = class.as_str(), "task.spawn");
	runtime_handle().spawn(fut)
}

/// Spawns blocking work with shared task classification metadata.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(task_class = class.as_str(), "task.spawn_blocking");
	runtime_handle().spawn_blocking(f)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn spawn_runs_on_current_runtime() {
		let handle = spawn(TaskClass::Compile, async { 7u32 });
		assert_eq!(handle.await.unwrap(), 7);
	}

	#[tokio::test]
	async fn spawn_blocking_runs_closure() {
		let handle = spawn_blocking(TaskClass::Compile, || 6 * 7);
		assert_eq!(handle.await.unwrap(), 42);
	}

	#[test]
	fn spawn_works_from_thread_without_reactor() {
		let (tx, rx) = std::sync::mpsc::channel();

		std::thread::spawn(move || {
			let handle = spawn(TaskClass::Timer, async { 42u32 });
			tx.send(handle).unwrap();
		})
		.join()
		.unwrap();

		let handle = rx.recv().unwrap();
		let value = runtime_handle().block_on(async { handle.await.unwrap() });
		assert_eq!(value, 42);
	}
}
