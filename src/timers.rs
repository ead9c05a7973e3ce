//timers.rs
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::models::{format_clock, Id};
use crate::store::BlockStore;

/// Minute parsing in the style of `parseInt`: leading digits count,
/// anything else (or nothing) is zero.
fn parse_minutes(text: &str) -> u32 {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

#[derive(Clone, Debug)]
struct ActiveTimer {
    block: Id,
    next_due: DateTime<Utc>,
}

/// Per-category countdown machine. The `active` map holds exactly one
/// entry per running category and doubles as the cancellation registry:
/// removing the entry is cancellation, and both explicit stop and natural
/// completion remove it, so a stopped timer can never tick again.
///
/// Ticking is driven from the UI frame loop with the current wall clock,
/// so everything here runs on one thread.
#[derive(Debug, Default)]
pub struct TimerBank {
    active: HashMap<Id, ActiveTimer>,
}

impl TimerBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self, category: Id) -> bool {
        self.active.contains_key(&category)
    }

    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Drop every handle, e.g. when the whole tree is replaced on import.
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// Idle → Running. Reads the category's timer text as whole minutes.
    /// Zero minutes (including non-numeric text) keeps the category idle;
    /// a category that is already running is left alone.
    pub fn start(&mut self, store: &mut BlockStore, block: Id, category: Id, now: DateTime<Utc>) -> bool {
        if self.active.contains_key(&category) {
            return false;
        }
        let Some(node) = store.category_mut(block, category) else {
            return false;
        };
        let secs = parse_minutes(&node.timer_text).saturating_mul(60);
        if secs == 0 {
            return false;
        }
        node.timer_running = true;
        node.remaining_secs = secs;
        self.active.insert(
            category,
            ActiveTimer {
                block,
                next_due: now + Duration::seconds(1),
            },
        );
        true
    }

    /// Running (or already idle) → Idle. The handle goes away first, then
    /// the countdown fields are cleared.
    pub fn stop(&mut self, store: &mut BlockStore, block: Id, category: Id) -> bool {
        let had_handle = self.active.remove(&category).is_some();
        let Some(node) = store.category_mut(block, category) else {
            return had_handle;
        };
        let changed = had_handle
            || node.timer_running
            || node.remaining_secs != 0
            || !node.timer_text.is_empty();
        node.timer_running = false;
        node.remaining_secs = 0;
        node.timer_text.clear();
        changed
    }

    pub fn toggle(&mut self, store: &mut BlockStore, block: Id, category: Id, now: DateTime<Utc>) -> bool {
        if self.is_running(category) {
            self.stop(store, block, category)
        } else {
            self.start(store, block, category, now)
        }
    }

    /// Apply every whole second that has elapsed on every due timer. Each
    /// tick decrements the remaining time and rewrites the display from
    /// the decremented value; the tick that reaches zero completes the
    /// countdown and cancels its own handle. Returns whether any category
    /// changed, so the caller knows to persist.
    pub fn tick_due(&mut self, store: &mut BlockStore, now: DateTime<Utc>) -> bool {
        let due: Vec<Id> = self
            .active
            .iter()
            .filter(|(_, timer)| timer.next_due <= now)
            .map(|(&id, _)| id)
            .collect();

        let mut changed = false;
        for cat_id in due {
            let Some(timer) = self.active.get_mut(&cat_id) else {
                continue;
            };
            let block_id = timer.block;
            // whole seconds owed, at least the one that just came due
            let mut ticks = ((now - timer.next_due).num_seconds() + 1).max(1) as u32;
            timer.next_due += Duration::seconds(ticks as i64);

            let Some(node) = store.category_mut(block_id, cat_id) else {
                // target deleted mid-countdown, drop the orphaned handle
                self.active.remove(&cat_id);
                continue;
            };
            if node.remaining_secs == 0 {
                node.timer_running = false;
                self.active.remove(&cat_id);
                continue;
            }
            while ticks > 0 && node.remaining_secs > 0 {
                node.remaining_secs -= 1;
                if node.remaining_secs == 0 {
                    node.timer_running = false;
                    node.timer_text.clear();
                    self.active.remove(&cat_id);
                } else {
                    node.timer_text = format_clock(node.remaining_secs);
                }
                changed = true;
                ticks -= 1;
            }
        }
        changed
    }
}
