//! Background scheduler thread driving all active players.

use std::{
    sync::{Arc, Weak},
    thread::JoinHandle,
    time::Duration,
};

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use crate::player::PlayerCore;

type PlayerSlot = Weak<Mutex<PlayerCore>>;

struct State {
    players: Vec<PlayerSlot>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    tick: Duration,
    wake: Condvar,
}

/// Registration handle cloned into every player.
///
/// Registration and removal take the scheduler lock and therefore must
/// never happen from within `work()`; they are the owning handle's job,
/// called from application threads only.
#[derive(Clone)]
pub(crate) struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Add a player to the tick set. Duplicate registrations are ignored.
    pub(crate) fn register(&self, player: PlayerSlot) {
        let mut state = self.shared.state.lock();
        if state.players.iter().any(|existing| existing.ptr_eq(&player)) {
            return;
        }
        state.players.push(player);
        trace!(players = state.players.len(), "player registered");
        self.shared.wake.notify_all();
    }

    /// Remove a player from the tick set.
    pub(crate) fn unregister(&self, player: &PlayerSlot) {
        let mut state = self.shared.state.lock();
        state.players.retain(|existing| !existing.ptr_eq(player));
    }
}

/// One background thread per backend, waking every tick interval to call
/// `work()` on each live player and sleeping indefinitely while the set
/// is empty.
///
/// Holds only [`Weak`] handles: the scheduler never keeps a player (or
/// its source) alive. Dead handles are pruned each tick.
pub struct Scheduler {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the scheduler thread.
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                players: Vec::new(),
                shutdown: false,
            }),
            tick,
            wake: Condvar::new(),
        });
        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("aulos-scheduler".to_owned())
            .spawn(move || run(&thread_shared))
            .expect("failed to spawn scheduler thread");
        Self {
            shared,
            thread: Some(thread),
        }
    }

    pub(crate) fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of live players currently registered.
    #[must_use]
    pub fn active_players(&self) -> usize {
        let mut state = self.shared.state.lock();
        state.players.retain(|player| player.strong_count() > 0);
        state.players.len()
    }

    /// Stop the background thread and wait for it to exit. Idempotent.
    pub fn shutdown(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }
        self.shared.wake.notify_all();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("scheduler thread panicked");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: &Shared) {
    trace!("scheduler started");
    loop {
        // Collect live players under the lock, then tick them outside it:
        // work() must never run while the registration lock is held.
        let live: Vec<Arc<Mutex<PlayerCore>>> = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    trace!("scheduler stopped");
                    return;
                }
                state.players.retain(|player| player.strong_count() > 0);
                if !state.players.is_empty() {
                    break;
                }
                // Nothing to drive: sleep until a registration wakes us.
                shared.wake.wait(&mut state);
            }
            state.players.iter().filter_map(Weak::upgrade).collect()
        };

        for player in live {
            player.lock().work();
        }

        let mut state = shared.state.lock();
        if state.shutdown {
            trace!("scheduler stopped");
            return;
        }
        let _ = shared.wake.wait_for(&mut state, shared.tick);
    }
}
