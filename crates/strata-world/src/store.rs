//! The chunk store: coordinate → chunk map, async load/save, tile edits.
//!
//! Each coordinate is in one of three states. A load request installs a
//! pending placeholder under the map lock and hands the work to a worker
//! thread; the worker loads or generates without holding any lock and then
//! swaps the placeholder for the resident chunk. A second request for a pending
//! or resident coordinate is a no-op, so at most one task per coordinate is
//! ever in flight.
//!
//! Lock order: the map mutex is released before any chunk lock is taken.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use rand::{Rng, RngCore};
use rustc_hash::FxHashMap;
use strata_terrain::ChunkGenerator;
use strata_voxel::{
    CHUNK_HEIGHT, CHUNK_WIDTH, Chunk, ChunkCoord, ChunkData, ListenerId, TileRegistry, TileTypeId, TileWorld,
    WorldListener, split_world,
};

use crate::dirty::DirtyTracker;
use crate::persistence::ChunkPersistence;

/// A resident chunk behind its own lock.
pub type SharedChunk = Arc<RwLock<Chunk>>;

/// Residency of a coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// Never requested, or unloaded.
    Absent,
    /// Load or generation in flight.
    Pending,
    /// Loaded and queryable.
    Resident,
}

/// Handle to a resident chunk, valid after the chunk leaves the store.
#[derive(Clone, Debug)]
pub struct ResidentChunk {
    pub coord: ChunkCoord,
    pub chunk: SharedChunk,
}

impl ResidentChunk {
    pub fn read(&self) -> RwLockReadGuard<'_, Chunk> {
        self.chunk.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Chunk> {
        self.chunk.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counters describing store activity since creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Load tasks handed to the workers.
    pub loads_dispatched: u64,
    /// Chunks created by the generator.
    pub generated: u64,
    /// Chunks read back from persistence.
    pub loaded_from_disk: u64,
    /// Chunk saves that reached persistence successfully.
    pub saves_completed: u64,
    /// Chunk saves that failed (logged and dropped).
    pub save_failures: u64,
    /// Finished loads discarded because the coordinate was unloaded meanwhile.
    pub late_publishes_dropped: u64,
    /// Loads abandoned because generation or persistence panicked.
    pub loads_failed: u64,
    /// Chunks resident when the stats were taken.
    pub resident: usize,
    /// Loads in flight when the stats were taken.
    pub pending: usize,
}

enum Slot {
    Pending,
    Resident(SharedChunk),
}

#[derive(Default)]
struct StoreState {
    slots: FxHashMap<u64, Slot>,
    resident: Vec<ResidentChunk>,
}

enum StoreTask {
    Load(ChunkCoord),
    Save {
        chunks: Vec<(ChunkCoord, ChunkData)>,
        done: Option<Sender<()>>,
    },
}

#[derive(Default)]
struct Counters {
    loads_dispatched: AtomicU64,
    generated: AtomicU64,
    loaded_from_disk: AtomicU64,
    saves_completed: AtomicU64,
    save_failures: AtomicU64,
    late_publishes_dropped: AtomicU64,
    loads_failed: AtomicU64,
}

struct Shared {
    state: Mutex<StoreState>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn WorldListener>)>>,
    next_listener: AtomicU64,
    dirty: DirtyTracker,
    registry: Arc<TileRegistry>,
    generator: Arc<dyn ChunkGenerator>,
    persistence: Arc<dyn ChunkPersistence>,
    counters: Counters,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn chunk(&self, coord: ChunkCoord) -> Option<SharedChunk> {
        match self.lock_state().slots.get(&coord.key()) {
            Some(Slot::Resident(chunk)) => Some(Arc::clone(chunk)),
            _ => None,
        }
    }

    /// Runs `task`, surviving a panicking generator or backend. A load that
    /// panics frees its placeholder so the coordinate can be requested again.
    fn run_task(&self, task: StoreTask) {
        let load = match &task {
            StoreTask::Load(coord) => Some(*coord),
            StoreTask::Save { .. } => None,
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| self.execute(task))) {
            let message = panic_message(panic.as_ref());
            match load {
                Some(coord) => {
                    self.abandon(coord);
                    self.counters.loads_failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Loading chunk {:?} panicked: {}", coord, message);
                }
                None => tracing::warn!("Chunk save panicked: {}", message),
            }
        }
    }

    fn execute(&self, task: StoreTask) {
        match task {
            StoreTask::Load(coord) => self.load_or_generate(coord),
            StoreTask::Save { chunks, done } => {
                for (coord, data) in &chunks {
                    self.save_one(*coord, data);
                }
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
        }
    }

    /// Load failures are treated like missing data and fall through to generation.
    fn load_or_generate(&self, coord: ChunkCoord) {
        let saved = match self.persistence.load(coord) {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!("Loading chunk {:?} failed, regenerating: {}", coord, err);
                None
            }
        };

        match saved {
            Some(data) => {
                if self.publish(coord, Chunk::from_data(coord, data)) {
                    self.counters.loaded_from_disk.fetch_add(1, Ordering::Relaxed);
                    // Neighbor meshes were built against a missing chunk at the seam.
                    for neighbor in coord.horizontal_neighbors() {
                        if let Some(chunk) = self.chunk(neighbor) {
                            let mut chunk = chunk.write().unwrap_or_else(PoisonError::into_inner);
                            self.dirty.mark_dirty(&mut chunk);
                        }
                    }
                    tracing::debug!("Loaded chunk {:?} from disk", coord);
                }
            }
            None => {
                let mut chunk = Chunk::new(coord);
                self.generator.generate(&mut chunk);
                if self.publish(coord, chunk) {
                    self.counters.generated.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Generated chunk {:?}", coord);
                }
            }
        }
    }

    /// Swaps the pending placeholder for `chunk`. Returns `false` (and drops the
    /// chunk) if the placeholder is gone.
    fn publish(&self, coord: ChunkCoord, chunk: Chunk) -> bool {
        let mut state = self.lock_state();
        let StoreState { slots, resident } = &mut *state;
        match slots.get_mut(&coord.key()) {
            Some(slot) if matches!(slot, Slot::Pending) => {
                let chunk = Arc::new(RwLock::new(chunk));
                *slot = Slot::Resident(Arc::clone(&chunk));
                resident.push(ResidentChunk { coord, chunk });
                true
            }
            _ => {
                self.counters.late_publishes_dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Dropping late publish for unloaded chunk {:?}", coord);
                false
            }
        }
    }

    /// Removes the placeholder of a load that will never publish.
    fn abandon(&self, coord: ChunkCoord) {
        let mut state = self.lock_state();
        if matches!(state.slots.get(&coord.key()), Some(Slot::Pending)) {
            state.slots.remove(&coord.key());
        }
    }

    fn save_one(&self, coord: ChunkCoord, data: &ChunkData) {
        match self.persistence.save(coord, data) {
            Ok(()) => {
                self.counters.saves_completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.counters.save_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Saving chunk {:?} failed: {}", coord, err);
            }
        }
    }
}

/// Single source of truth for which chunks are resident.
///
/// All methods take `&self`; the store is shared freely between the game loop
/// and its worker threads. Dropping the store finishes queued work (saves
/// included) and joins the workers.
pub struct ChunkStore {
    shared: Arc<Shared>,
    tasks: Option<Sender<StoreTask>>,
    workers: Vec<JoinHandle<()>>,
}

impl ChunkStore {
    /// Create a store with `worker_threads` background threads (at least one).
    ///
    /// # Errors
    ///
    /// Fails if a worker thread cannot be spawned.
    pub fn new(
        registry: Arc<TileRegistry>,
        generator: Arc<dyn ChunkGenerator>,
        persistence: Arc<dyn ChunkPersistence>,
        worker_threads: usize,
    ) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(StoreState::default()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            dirty: DirtyTracker::new(),
            registry,
            generator,
            persistence,
            counters: Counters::default(),
        });

        let (sender, receiver) = unbounded::<StoreTask>();
        let mut store = Self {
            shared,
            tasks: Some(sender),
            workers: Vec::new(),
        };
        for index in 0..worker_threads.max(1) {
            let handle = spawn_worker(index, receiver.clone(), Arc::clone(&store.shared))?;
            store.workers.push(handle);
        }
        tracing::info!("Chunk store started with {} workers", store.workers.len());
        Ok(store)
    }

    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.shared.registry
    }

    pub fn dirty_tracker(&self) -> &DirtyTracker {
        &self.shared.dirty
    }

    // --- Residency ---

    /// Starts loading `coord` unless it is already pending or resident.
    ///
    /// Returns `true` if a load task was dispatched. Never blocks on I/O.
    pub fn request_load(&self, coord: ChunkCoord) -> bool {
        {
            let mut state = self.shared.lock_state();
            if state.slots.contains_key(&coord.key()) {
                return false;
            }
            state.slots.insert(coord.key(), Slot::Pending);
        }

        if self.dispatch(StoreTask::Load(coord)) {
            self.shared.counters.loads_dispatched.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            let mut state = self.shared.lock_state();
            if matches!(state.slots.get(&coord.key()), Some(Slot::Pending)) {
                state.slots.remove(&coord.key());
            }
            false
        }
    }

    /// State of `coord`.
    pub fn state(&self, coord: ChunkCoord) -> ChunkState {
        match self.shared.lock_state().slots.get(&coord.key()) {
            None => ChunkState::Absent,
            Some(Slot::Pending) => ChunkState::Pending,
            Some(Slot::Resident(_)) => ChunkState::Resident,
        }
    }

    /// The resident chunk at `coord`; `None` while pending or absent.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<SharedChunk> {
        self.shared.chunk(coord)
    }

    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.state(coord) == ChunkState::Resident
    }

    /// Point-in-time copy of the resident list, safe to iterate without locks.
    pub fn resident_chunks(&self) -> Vec<ResidentChunk> {
        self.shared.lock_state().resident.clone()
    }

    pub fn resident_count(&self) -> usize {
        self.shared.lock_state().resident.len()
    }

    /// Snapshot of resident chunks whose meshes are stale.
    pub fn dirty_chunks(&self) -> Vec<ResidentChunk> {
        DirtyTracker::collect_dirty(&self.resident_chunks())
    }

    /// Hands the modified chunks among `coords` to the save workers and removes
    /// `coords` from the store.
    ///
    /// With `blocking`, waits for the saves to finish before removing the
    /// chunks. Without it, the chunks are removed immediately and the save may
    /// still be running (or lost, if the process exits first). Pending
    /// coordinates are dropped as well; their loads finish and are discarded.
    pub fn unload(&self, coords: &[ChunkCoord], blocking: bool) {
        let mut targets: Vec<ResidentChunk> = Vec::with_capacity(coords.len());
        {
            let mut state = self.shared.lock_state();
            for &coord in coords {
                match state.slots.get(&coord.key()) {
                    Some(Slot::Resident(chunk)) => targets.push(ResidentChunk {
                        coord,
                        chunk: Arc::clone(chunk),
                    }),
                    Some(Slot::Pending) => {
                        state.slots.remove(&coord.key());
                    }
                    None => {}
                }
            }
        }
        if targets.is_empty() {
            return;
        }

        let to_save: Vec<(ChunkCoord, ChunkData)> = targets
            .iter()
            .filter_map(|target| {
                let mut chunk = target.write();
                chunk.is_save_dirty().then(|| {
                    chunk.clear_save_dirty();
                    (target.coord, chunk.data().clone())
                })
            })
            .collect();
        let saved = to_save.len();

        if blocking {
            if !to_save.is_empty() {
                let (done_tx, done_rx) = bounded(1);
                if self.dispatch(StoreTask::Save {
                    chunks: to_save,
                    done: Some(done_tx),
                }) && done_rx.recv().is_err()
                {
                    tracing::warn!("Save worker exited before confirming {} chunks", saved);
                }
            }
            self.remove(&targets);
        } else {
            self.remove(&targets);
            if !to_save.is_empty() {
                self.dispatch(StoreTask::Save {
                    chunks: to_save,
                    done: None,
                });
            }
        }
        tracing::debug!("Unloaded {} chunks ({} saved, blocking: {})", targets.len(), saved, blocking);
    }

    /// Unloads everything, pending loads included. Use `blocking` on exit.
    pub fn unload_all(&self, blocking: bool) {
        let coords: Vec<ChunkCoord> = {
            let state = self.shared.lock_state();
            state.slots.keys().map(|&key| ChunkCoord::from_key(key)).collect()
        };
        self.unload(&coords, blocking);
        tracing::info!("Unloaded all chunks ({} coordinates)", coords.len());
    }

    /// Removes `targets` if their slots still hold the same chunk instance.
    fn remove(&self, targets: &[ResidentChunk]) {
        let mut state = self.shared.lock_state();
        for target in targets {
            let key = target.coord.key();
            if let Some(Slot::Resident(chunk)) = state.slots.get(&key)
                && Arc::ptr_eq(chunk, &target.chunk)
            {
                state.slots.remove(&key);
            }
        }
        state
            .resident
            .retain(|resident| !targets.iter().any(|target| Arc::ptr_eq(&resident.chunk, &target.chunk)));
    }

    fn dispatch(&self, task: StoreTask) -> bool {
        let sent = self.tasks.as_ref().is_some_and(|tasks| tasks.send(task).is_ok());
        if !sent {
            tracing::warn!("Chunk workers are gone; task dropped");
        }
        sent
    }

    // --- Tiles ---

    /// Tile at absolute `(x, y, z)`; air if the position is not resident.
    pub fn get_tile(&self, x: i32, y: i32, z: i32) -> TileTypeId {
        let Some((coord, local)) = split_world(x, y, z) else {
            return TileTypeId::AIR;
        };
        match self.shared.chunk(coord) {
            Some(chunk) => chunk
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(local.x as i32, local.y as i32, local.z as i32),
            None => TileTypeId::AIR,
        }
    }

    /// Writes a tile. Returns `true` if the stored value changed.
    ///
    /// A change dirties the home chunk and any resident neighbor sharing the
    /// edited face, then notifies listeners. Writes to non-resident positions
    /// and writes of the current value change nothing.
    pub fn set_tile(&self, x: i32, y: i32, z: i32, tile: TileTypeId) -> bool {
        let Some((coord, local)) = split_world(x, y, z) else {
            return false;
        };
        let Some(chunk) = self.shared.chunk(coord) else {
            return false;
        };

        let changed = chunk
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(local.x as i32, local.y as i32, local.z as i32, tile)
            .is_some_and(|old| old != tile);
        if !changed {
            return false;
        }

        for dirty in DirtyTracker::invalidated_by_edit(coord, local) {
            let target = if dirty == coord {
                Some(Arc::clone(&chunk))
            } else {
                self.shared.chunk(dirty)
            };
            if let Some(target) = target {
                let mut target = target.write().unwrap_or_else(PoisonError::into_inner);
                self.shared.dirty.mark_dirty(&mut target);
            }
        }

        self.notify(x, y, z);
        true
    }

    /// Replaces a non-air tile with air and runs the old tile's destroy hook.
    pub fn destroy_tile(&self, x: i32, y: i32, z: i32) -> bool {
        let old = self.get_tile(x, y, z);
        if old == TileTypeId::AIR || !self.set_tile(x, y, z, TileTypeId::AIR) {
            return false;
        }
        if let Some(behavior) = self.shared.registry.behavior(old) {
            behavior.on_destroy(self, (x, y, z));
        }
        true
    }

    /// Whether the tile at `(x, y, z)` is solid; `false` if not resident.
    pub fn is_solid(&self, x: i32, y: i32, z: i32) -> bool {
        self.shared.registry.is_solid(self.get_tile(x, y, z))
    }

    /// Runs the tick hook of `ticks_per_chunk` random tiles in every resident
    /// chunk. Returns the number of hooks invoked.
    pub fn random_tick<R: RngCore>(&self, rng: &mut R, ticks_per_chunk: u32) -> usize {
        let mut ticked = 0;
        for resident in self.resident_chunks() {
            let (ox, oz) = resident.coord.origin();
            for _ in 0..ticks_per_chunk {
                let lx = rng.random_range(0..CHUNK_WIDTH as i32);
                let y = rng.random_range(0..CHUNK_HEIGHT as i32);
                let lz = rng.random_range(0..CHUNK_WIDTH as i32);
                let tile = resident.read().get(lx, y, lz);
                if tile == TileTypeId::AIR {
                    continue;
                }
                if let Some(behavior) = self.shared.registry.behavior(tile) {
                    behavior.tick(self, (ox + lx, y, oz + lz), &self.shared.registry, rng);
                    ticked += 1;
                }
            }
        }
        ticked
    }

    // --- Listeners ---

    pub fn add_listener(&self, listener: Arc<dyn WorldListener>) -> ListenerId {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    fn notify(&self, x: i32, y: i32, z: i32) {
        let listeners: Vec<Arc<dyn WorldListener>> = self
            .shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_tile_changed(x, y, z);
        }
    }

    pub fn stats(&self) -> StoreStats {
        let counters = &self.shared.counters;
        let (resident, pending) = {
            let state = self.shared.lock_state();
            let pending = state
                .slots
                .values()
                .filter(|slot| matches!(slot, Slot::Pending))
                .count();
            (state.resident.len(), pending)
        };
        StoreStats {
            loads_dispatched: counters.loads_dispatched.load(Ordering::Relaxed),
            generated: counters.generated.load(Ordering::Relaxed),
            loaded_from_disk: counters.loaded_from_disk.load(Ordering::Relaxed),
            saves_completed: counters.saves_completed.load(Ordering::Relaxed),
            save_failures: counters.save_failures.load(Ordering::Relaxed),
            late_publishes_dropped: counters.late_publishes_dropped.load(Ordering::Relaxed),
            loads_failed: counters.loads_failed.load(Ordering::Relaxed),
            resident,
            pending,
        }
    }
}

impl TileWorld for ChunkStore {
    fn tile(&self, x: i32, y: i32, z: i32) -> TileTypeId {
        self.get_tile(x, y, z)
    }

    fn set_tile(&self, x: i32, y: i32, z: i32, tile: TileTypeId) -> bool {
        ChunkStore::set_tile(self, x, y, z, tile)
    }
}

impl Drop for ChunkStore {
    fn drop(&mut self) {
        // Closing the channel lets workers drain queued saves, then exit.
        self.tasks.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("Chunk worker panicked");
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn spawn_worker(index: usize, receiver: Receiver<StoreTask>, shared: Arc<Shared>) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("chunk-worker-{index}"))
        .spawn(move || {
            while let Ok(task) = receiver.recv() {
                shared.run_task(task);
            }
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
