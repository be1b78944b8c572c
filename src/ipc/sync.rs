use std::cell::UnsafeCell;
use std::io;

use crate::chomp::consts::{MAX_PLAYERS, SYNC_SHM_NAME};
use crate::ipc::shm::Segment;
use crate::utils::prelude::*;

/// A process-shared POSIX semaphore living inside a mapped segment.
///
/// Never constructed by value: the memory is part of [`GameSync`], and
/// `init` runs in place exactly once, by the master, before any child is
/// spawned.
#[repr(transparent)]
pub struct Semaphore(UnsafeCell<libc::sem_t>);

unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Semaphore {
    pub fn init(&self, value: u32) -> Result<()> {
        let rc = unsafe { libc::sem_init(self.0.get(), 1, value) };
        if rc == -1 {
            return Err(anyhow!("sem_init: {}", io::Error::last_os_error()));
        }
        Ok(())
    }

    /// P. Retries when interrupted by a signal.
    pub fn wait(&self) -> Result<()> {
        loop {
            let rc = unsafe { libc::sem_wait(self.0.get()) };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(anyhow!("sem_wait: {err}"));
            }
        }
    }

    /// Non-blocking P; reports whether the semaphore was taken.
    pub fn try_wait(&self) -> Result<bool> {
        let rc = unsafe { libc::sem_trywait(self.0.get()) };
        if rc == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) => Ok(false),
            Some(libc::EINTR) => Ok(false),
            _ => Err(anyhow!("sem_trywait: {err}")),
        }
    }

    /// V.
    pub fn post(&self) -> Result<()> {
        let rc = unsafe { libc::sem_post(self.0.get()) };
        if rc == -1 {
            return Err(anyhow!("sem_post: {}", io::Error::last_os_error()));
        }
        Ok(())
    }

    pub fn destroy(&self) {
        unsafe {
            libc::sem_destroy(self.0.get());
        }
    }
}

/// The synchronization segment: every primitive coordinating the master,
/// the players and the view. All semaphores are process-shared; the layout
/// is `repr(C)` with natural alignment only.
#[repr(C)]
pub struct GameSync {
    /// Master -> view: a move was committed (or the game ended), repaint.
    view_update: Semaphore,
    /// View -> master: the repaint is done.
    view_done: Semaphore,
    /// Writer-preference turnstile. A writer waiting here blocks new
    /// readers from entering.
    master_access: Semaphore,
    /// The state writer lock; held by the first reader in on behalf of all
    /// concurrent readers.
    state_lock: Semaphore,
    /// Guards `readers_count`.
    reader_count_lock: Semaphore,
    readers_count: UnsafeCell<u32>,
    /// One turn signal per player slot, authorising that player's next
    /// move submission.
    player_move: [Semaphore; MAX_PLAYERS],
}

unsafe impl Sync for GameSync {}

impl GameSync {
    /// Initialises every primitive in place on a zeroed segment. Each
    /// player's turn signal is posted once so everyone may submit a first
    /// move.
    pub fn init(&self, player_count: usize) -> Result<()> {
        self.view_update.init(0)?;
        self.view_done.init(0)?;
        self.master_access.init(1)?;
        self.state_lock.init(1)?;
        self.reader_count_lock.init(1)?;
        unsafe {
            *self.readers_count.get() = 0;
        }
        for i in 0..player_count {
            self.player_move[i].init(0)?;
            self.player_move[i].post()?;
        }
        Ok(())
    }

    /// Destroys every primitive. Only after all children are reaped.
    pub fn destroy(&self, player_count: usize) {
        self.view_update.destroy();
        self.view_done.destroy();
        self.master_access.destroy();
        self.state_lock.destroy();
        self.reader_count_lock.destroy();
        for i in 0..player_count {
            self.player_move[i].destroy();
        }
    }

    /// Writer acquire: announce intent on the turnstile so no new reader
    /// slips in, take the state lock, then reopen the turnstile.
    pub fn writer_acquire(&self) -> Result<()> {
        self.master_access.wait()?;
        let locked = self.state_lock.wait();
        self.master_access.post()?;
        locked
    }

    pub fn writer_release(&self) -> Result<()> {
        self.state_lock.post()
    }

    /// Reader entry: pass the turnstile (parking behind any waiting
    /// writer), then count in; the first reader takes the state lock on
    /// behalf of all.
    pub fn reader_enter(&self) -> Result<()> {
        self.master_access.wait()?;
        self.master_access.post()?;

        self.reader_count_lock.wait()?;
        let first = unsafe {
            let n = &mut *self.readers_count.get();
            *n += 1;
            *n == 1
        };
        let locked = if first { self.state_lock.wait() } else { Ok(()) };
        self.reader_count_lock.post()?;
        locked
    }

    /// Reader exit: count out; the last reader returns the state lock.
    pub fn reader_exit(&self) -> Result<()> {
        self.reader_count_lock.wait()?;
        let last = unsafe {
            let n = &mut *self.readers_count.get();
            *n -= 1;
            *n == 0
        };
        let released = if last { self.state_lock.post() } else { Ok(()) };
        self.reader_count_lock.post()?;
        released
    }

    pub fn turn_signal(&self, player: usize) -> &Semaphore {
        &self.player_move[player]
    }

    pub fn view_update(&self) -> &Semaphore {
        &self.view_update
    }

    pub fn view_done(&self) -> &Semaphore {
        &self.view_done
    }
}

/// The named shared segment holding a [`GameSync`].
pub struct SyncSegment {
    seg: Segment,
}

impl SyncSegment {
    pub fn create() -> Result<SyncSegment> {
        let seg = Segment::create(SYNC_SHM_NAME, std::mem::size_of::<GameSync>())?;
        Ok(SyncSegment { seg })
    }

    /// Children attach read-write: they must post and wait semaphores.
    pub fn attach() -> Result<SyncSegment> {
        let seg = Segment::attach(SYNC_SHM_NAME, std::mem::size_of::<GameSync>(), true)?;
        Ok(SyncSegment { seg })
    }

    pub fn anonymous() -> Result<SyncSegment> {
        let seg = Segment::anonymous(std::mem::size_of::<GameSync>())?;
        Ok(SyncSegment { seg })
    }

    pub fn sync(&self) -> &GameSync {
        unsafe { &*(self.seg.as_ptr() as *const GameSync) }
    }
}
