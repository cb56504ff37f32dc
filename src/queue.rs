//! Fixed-capacity ring buffer of pending IR actions.
//!
//! Slots are addressed by monotonically increasing `write` and `read` counters
//! taken modulo [`ACTION_QUEUE_CAPACITY`]: the queue is empty when
//! `write == read` and full when `write - read == capacity`. Whenever the last
//! action is popped both counters go back to zero, so they never drift towards
//! wraparound however long the device runs.
//!
//! Only the enqueue path touches `write`, and only the drain step touches `read`
//! and the per-action code cursor.

use crate::code::{IrAction, IrCode, ToggleFlag};
use crate::consts::ACTION_QUEUE_CAPACITY;
use crate::error::IrError;

/// One queued action and how far through its codes the drain step has got.
#[derive(Clone, Copy, Debug)]
pub struct QueuedIrAction<'a> {
    /// The action being sent.
    pub action: &'a IrAction<'a>,
    /// Toggle state of the device the action belongs to.
    pub toggle: &'a ToggleFlag,
    /// Index of the code currently being sent, `-1` before the first one.
    pub current_code: i16,
}

/// The transmitter's action queue.
#[derive(Debug)]
pub struct ActionQueue<'a> {
    slots: [Option<QueuedIrAction<'a>>; ACTION_QUEUE_CAPACITY],
    write: usize,
    read: usize,
}

impl Default for ActionQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ActionQueue<'a> {
    /// An empty queue.
    pub const fn new() -> Self {
        Self {
            slots: [None; ACTION_QUEUE_CAPACITY],
            write: 0,
            read: 0,
        }
    }

    /// Number of queued actions, including the one being sent.
    pub fn len(&self) -> usize {
        self.write.wrapping_sub(self.read)
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.write == self.read
    }

    /// Whether another action would be rejected.
    pub fn is_full(&self) -> bool {
        self.len() >= ACTION_QUEUE_CAPACITY
    }

    /// Appends an action.
    ///
    /// # Returns
    /// - `Ok(true)` if the queue was empty, meaning nothing is draining it yet
    /// - `Ok(false)` if it joined actions already waiting
    ///
    /// # Errors
    /// [`IrError::QueueFull`] when all slots are taken.
    pub fn push(&mut self, action: &'a IrAction<'a>, toggle: &'a ToggleFlag) -> Result<bool, IrError> {
        if self.is_full() {
            return Err(IrError::QueueFull);
        }
        let was_empty = self.is_empty();
        self.slots[self.write % ACTION_QUEUE_CAPACITY] = Some(QueuedIrAction {
            action,
            toggle,
            current_code: -1,
        });
        self.write = self.write.wrapping_add(1);
        Ok(was_empty)
    }

    /// Moves the head action's cursor to its next code.
    ///
    /// An exhausted action is popped and the following one started, so this
    /// yields codes in enqueue order and, within an action, in list order.
    ///
    /// # Returns
    /// The code to send next with its device's toggle flag, or `None` once the
    /// queue has fully drained.
    pub fn advance(&mut self) -> Option<(IrCode, &'a ToggleFlag)> {
        while !self.is_empty() {
            let index = self.read % ACTION_QUEUE_CAPACITY;
            if let Some(head) = self.slots[index].as_mut() {
                head.current_code += 1;
                if let Some(code) = head.action.codes.get(head.current_code as usize) {
                    return Some((*code, head.toggle));
                }
            }
            self.pop();
        }
        None
    }

    fn pop(&mut self) {
        self.slots[self.read % ACTION_QUEUE_CAPACITY] = None;
        self.read = self.read.wrapping_add(1);
        if self.read == self.write {
            self.read = 0;
            self.write = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CODES: [IrCode; 3] = [
        IrCode::rc6(21, 0x1_000c),
        IrCode::pause_ms(100),
        IrCode::sirc(12, 0x095),
    ];
    static POWER: IrAction<'static> = IrAction::new(&CODES);
    static EMPTY: IrAction<'static> = IrAction::new(&[]);
    static FLAG: ToggleFlag = ToggleFlag::new();

    #[test]
    fn test_fifth_action_is_rejected() {
        let mut queue = ActionQueue::new();
        assert_eq!(queue.push(&POWER, &FLAG), Ok(true));
        for _ in 1..ACTION_QUEUE_CAPACITY {
            assert_eq!(queue.push(&POWER, &FLAG), Ok(false));
        }
        assert!(queue.is_full());
        assert_eq!(queue.push(&POWER, &FLAG), Err(IrError::QueueFull));
        assert_eq!(queue.len(), ACTION_QUEUE_CAPACITY);
    }

    #[test]
    fn test_codes_come_out_in_order() {
        let mut queue = ActionQueue::new();
        let _ = queue.push(&POWER, &FLAG).unwrap();
        let _ = queue.push(&POWER, &FLAG).unwrap();

        for _ in 0..2 {
            for code in CODES.iter() {
                let (next, _) = queue.advance().unwrap();
                assert_eq!(next, *code);
            }
        }
        assert!(queue.advance().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_empty_action_is_skipped() {
        let mut queue = ActionQueue::new();
        let _ = queue.push(&EMPTY, &FLAG).unwrap();
        let _ = queue.push(&POWER, &FLAG).unwrap();
        let (first, _) = queue.advance().unwrap();
        assert_eq!(first, CODES[0]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_counters_reset_after_drain() {
        let mut queue = ActionQueue::new();
        for round in 0..1_000 {
            for _ in 0..(round % ACTION_QUEUE_CAPACITY) + 1 {
                let _ = queue.push(&POWER, &FLAG).unwrap();
            }
            while queue.advance().is_some() {}
            assert_eq!((queue.write, queue.read), (0, 0));
        }
    }

    #[test]
    fn test_interleaved_push_keeps_fifo() {
        let mut queue = ActionQueue::new();
        let _ = queue.push(&POWER, &FLAG).unwrap();
        let _ = queue.advance().unwrap();
        // Queue is still busy with the first action, so this is not a fresh start.
        assert_eq!(queue.push(&POWER, &FLAG), Ok(false));
        let mut sent = 1;
        while queue.advance().is_some() {
            sent += 1;
        }
        assert_eq!(sent, 2 * CODES.len());
    }
}
