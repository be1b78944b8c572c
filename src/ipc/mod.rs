/*
 *  Process-shared plumbing: memory segments, semaphores, move channels.
 */

pub mod channel;
pub mod shm;
pub mod sync;

pub mod prelude {
    pub use super::channel::{ChannelRead, MoveChannel, Readiness, wait_ready};
    pub use super::shm::Segment;
    pub use super::sync::{GameSync, Semaphore, SyncSegment};
}
