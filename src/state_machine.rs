//! Writer/read-only role of a photo-fs instance.
//!
//! Every instance starts read-only. The instance that obtains the index write
//! lock is promoted exactly once by the task that acquired it; request
//! handlers only ever read the role before attempting a write.

use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Role {
    ReadOnly = 0,
    Writer = 1,
}

impl Role {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Role::Writer,
            _ => Role::ReadOnly,
        }
    }
}

#[derive(Debug)]
pub struct WriterState {
    role: AtomicU8,
}

impl Default for WriterState {
    fn default() -> Self {
        Self::new()
    }
}

impl WriterState {
    pub fn new() -> Self {
        Self {
            role: AtomicU8::new(Role::ReadOnly as u8),
        }
    }

    pub fn role(&self) -> Role {
        Role::from_u8(self.role.load(Ordering::Acquire))
    }

    pub fn is_writer(&self) -> bool {
        self.role() == Role::Writer
    }

    /// Transition ReadOnly -> Writer. Returns false if already a writer.
    pub fn promote(&self) -> bool {
        self.role
            .compare_exchange(
                Role::ReadOnly as u8,
                Role::Writer as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Transition Writer -> ReadOnly. Returns false if already read-only.
    pub fn demote(&self) -> bool {
        self.role
            .compare_exchange(
                Role::Writer as u8,
                Role::ReadOnly as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}
