//! Per-game engine sessions.
//!
//! Each game id maps to exactly one [`GtpClient`]. Lookup and creation happen
//! under the map's entry lock, so concurrent first requests for the same game
//! still start a single engine.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::GtpClient;
use crate::driver::EngineConfig;

/// Creates the engine for a new game.
pub trait EngineFactory: Send + Sync {
	/// Must not block for long: it runs while the registry holds the entry lock.
	fn create(&self, game_id: &str) -> GtpClient;
}

/// Launches one engine process per game.
#[derive(Debug, Clone)]
pub struct ProcessFactory {
	config: EngineConfig,
}

impl ProcessFactory {
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}
}

impl EngineFactory for ProcessFactory {
	fn create(&self, _game_id: &str) -> GtpClient {
		GtpClient::spawn(&self.config)
	}
}

impl<F> EngineFactory for F
where
	F: Fn(&str) -> GtpClient + Send + Sync,
{
	fn create(&self, game_id: &str) -> GtpClient {
		self(game_id)
	}
}

struct Session {
	engine: Arc<GtpClient>,
	last_used: Mutex<Instant>,
}

impl Session {
	fn new(engine: GtpClient) -> Self {
		Self {
			engine: Arc::new(engine),
			last_used: Mutex::new(Instant::now()),
		}
	}

	fn touch(&self) -> Arc<GtpClient> {
		*self.last_used.lock() = Instant::now();
		Arc::clone(&self.engine)
	}

	fn idle_for(&self) -> Duration {
		self.last_used.lock().elapsed()
	}
}

/// Map from game id to that game's engine.
pub struct SessionRegistry {
	sessions: DashMap<String, Session>,
	factory: Arc<dyn EngineFactory>,
}

impl SessionRegistry {
	pub fn new(factory: impl EngineFactory + 'static) -> Self {
		Self {
			sessions: DashMap::new(),
			factory: Arc::new(factory),
		}
	}

	/// Registry whose engines are processes launched from `config`.
	pub fn from_config(config: EngineConfig) -> Self {
		Self::new(ProcessFactory::new(config))
	}

	/// Registry configured from the environment; see [`EngineConfig::from_env`].
	pub fn from_env() -> Self {
		Self::from_config(EngineConfig::from_env())
	}

	/// Returns the engine for `game_id`, creating it on first use.
	pub fn get_or_create(&self, game_id: &str) -> Arc<GtpClient> {
		match self.sessions.entry(game_id.to_string()) {
			Entry::Occupied(entry) => {
				debug!(target = "gtp.registry", game_id, "reusing engine");
				entry.get().touch()
			}
			Entry::Vacant(entry) => {
				info!(target = "gtp.registry", game_id, "creating engine");
				let session = Session::new(self.factory.create(game_id));
				let engine = Arc::clone(&session.engine);
				entry.insert(session);
				engine
			}
		}
	}

	/// Returns the engine for `game_id` without creating one.
	pub fn get(&self, game_id: &str) -> Option<Arc<GtpClient>> {
		self.sessions.get(game_id).map(|session| session.touch())
	}

	pub fn contains(&self, game_id: &str) -> bool {
		self.sessions.contains_key(game_id)
	}

	pub fn len(&self) -> usize {
		self.sessions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.is_empty()
	}

	pub fn game_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
		ids.sort();
		ids
	}

	/// Drops the session and shuts its engine down. Returns false if unknown.
	pub async fn remove(&self, game_id: &str) -> bool {
		let Some((_, session)) = self.sessions.remove(game_id) else {
			return false;
		};
		info!(target = "gtp.registry", game_id, "removing engine");
		shutdown_engine(game_id, &session.engine).await;
		true
	}

	/// Shuts down every engine unused for at least `max_idle`.
	///
	/// Returns the number of sessions removed.
	pub async fn reap_idle(&self, max_idle: Duration) -> usize {
		let candidates: Vec<String> = self
			.sessions
			.iter()
			.filter(|entry| entry.value().idle_for() >= max_idle)
			.map(|entry| entry.key().clone())
			.collect();

		let mut reaped = 0;
		for game_id in candidates {
			// re-checked under the entry lock: a lookup since the scan keeps it
			let Some((_, session)) = self
				.sessions
				.remove_if(&game_id, |_, session| session.idle_for() >= max_idle)
			else {
				continue;
			};
			info!(
				target = "gtp.registry",
				game_id = %game_id,
				idle_ms = session.idle_for().as_millis() as u64,
				"reaping idle engine"
			);
			shutdown_engine(&game_id, &session.engine).await;
			reaped += 1;
		}
		reaped
	}

	/// Runs [`SessionRegistry::reap_idle`] every `interval` until the
	/// registry is dropped.
	pub fn spawn_reaper(self: &Arc<Self>, interval: Duration, max_idle: Duration) -> JoinHandle<()> {
		let weak: Weak<Self> = Arc::downgrade(self);
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.tick().await;
			loop {
				ticker.tick().await;
				let Some(registry) = weak.upgrade() else {
					break;
				};
				let reaped = registry.reap_idle(max_idle).await;
				if reaped > 0 {
					debug!(target = "gtp.registry", reaped, remaining = registry.len(), "reaper pass");
				}
			}
		})
	}

	/// Removes every session and shuts its engine down.
	pub async fn shutdown_all(&self) {
		for game_id in self.game_ids() {
			self.remove(&game_id).await;
		}
	}
}

async fn shutdown_engine(game_id: &str, engine: &GtpClient) {
	if let Err(e) = engine.shutdown().await {
		warn!(target = "gtp.registry", game_id, error = %e, "engine shutdown failed");
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use futures_util::future::join_all;
	use tokio::io::{DuplexStream, duplex};

	use super::*;

	/// Factory producing clients over silent in-memory pipes.
	///
	/// The engine-side ends are kept open so connections stay up.
	fn counting_factory() -> (impl EngineFactory, Arc<AtomicUsize>) {
		let created = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&created);
		let engine_ends: Mutex<Vec<DuplexStream>> = Mutex::new(Vec::new());
		let factory = move |_game_id: &str| {
			counter.fetch_add(1, Ordering::SeqCst);
			let (writer, engine_stdin) = duplex(1024);
			let (reader, engine_stdout) = duplex(1024);
			engine_ends.lock().extend([engine_stdin, engine_stdout]);
			GtpClient::connect(writer, reader, None)
		};
		(factory, created)
	}

	#[tokio::test]
	async fn test_same_game_returns_same_engine() {
		let (factory, created) = counting_factory();
		let registry = SessionRegistry::new(factory);

		let first = registry.get_or_create("game-1");
		let again = registry.get_or_create("game-1");
		let other = registry.get_or_create("game-2");

		assert!(Arc::ptr_eq(&first, &again));
		assert!(!Arc::ptr_eq(&first, &other));
		assert_eq!(created.load(Ordering::SeqCst), 2);
		assert_eq!(registry.game_ids(), ["game-1", "game-2"]);
		assert!(registry.get("game-3").is_none());
		assert!(!registry.contains("game-3"));
	}

	#[tokio::test]
	async fn test_concurrent_first_lookup_creates_one_engine() {
		let (factory, created) = counting_factory();
		let registry = Arc::new(SessionRegistry::new(factory));

		let lookups = (0..16).map(|_| {
			let registry = Arc::clone(&registry);
			tokio::spawn(async move { registry.get_or_create("shared") })
		});
		let engines: Vec<Arc<GtpClient>> = join_all(lookups)
			.await
			.into_iter()
			.map(|r| r.unwrap())
			.collect();

		assert_eq!(created.load(Ordering::SeqCst), 1);
		assert!(engines.iter().all(|e| Arc::ptr_eq(e, &engines[0])));
		assert_eq!(registry.len(), 1);
	}

	#[tokio::test]
	async fn test_remove_shuts_engine_down() {
		let (factory, created) = counting_factory();
		let registry = SessionRegistry::new(factory);

		let engine = registry.get_or_create("game-1");
		assert!(registry.remove("game-1").await);
		assert!(!registry.remove("game-1").await);
		assert!(engine.is_closed());
		assert!(registry.is_empty());

		// the id can be reused and gets a fresh engine
		let fresh = registry.get_or_create("game-1");
		assert!(!fresh.is_closed());
		assert_eq!(created.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_reap_idle_keeps_recent_sessions() {
		let (factory, _) = counting_factory();
		let registry = SessionRegistry::new(factory);

		let engine = registry.get_or_create("game-1");
		assert_eq!(registry.reap_idle(Duration::from_secs(3600)).await, 0);
		assert!(registry.contains("game-1"));

		assert_eq!(registry.reap_idle(Duration::ZERO).await, 1);
		assert!(registry.is_empty());
		assert!(engine.is_closed());
	}

	#[tokio::test]
	async fn test_reaper_stops_with_registry() {
		let (factory, _) = counting_factory();
		let registry = Arc::new(SessionRegistry::new(factory));
		registry.get_or_create("game-1");

		let reaper = registry.spawn_reaper(Duration::from_millis(10), Duration::ZERO);
		tokio::time::timeout(Duration::from_secs(2), async {
			while !registry.is_empty() {
				tokio::time::sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.unwrap();

		drop(registry);
		tokio::time::timeout(Duration::from_secs(2), reaper).await.unwrap().unwrap();
	}
}
