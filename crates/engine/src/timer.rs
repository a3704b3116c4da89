use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

type Callback = Box<dyn FnMut()>;

struct Timer {
    id: TimerId,
    interval: f32,
    elapsed: f32,
    repeat: bool,
    callback: Callback,
}

#[derive(Default)]
struct Pending {
    added: Vec<Timer>,
    removed: Vec<TimerId>,
}

/// Cloneable handle for adding and removing timers, including from inside
/// a running timer callback.
#[derive(Clone)]
pub struct TimerScheduler {
    pending: Rc<RefCell<Pending>>,
    next_id: Rc<Cell<u64>>,
}

impl TimerScheduler {
    /// Fire `callback` every `interval` seconds (once if `repeat` is false).
    /// Takes effect at the start of the next `tick`.
    pub fn add(&self, interval: f32, repeat: bool, callback: impl FnMut() + 'static) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.pending.borrow_mut().added.push(Timer {
            id,
            interval: interval.max(0.0),
            elapsed: 0.0,
            repeat,
            callback: Box::new(callback),
        });
        id
    }

    pub fn remove(&self, id: TimerId) {
        self.pending.borrow_mut().removed.push(id);
    }
}

/// Interval timers advanced by the engine tick.
///
/// Registration is copy-then-clean: adds and removals are queued and applied
/// around each pass, so a callback may schedule or cancel timers without
/// disturbing the pass in progress. A timer fires at most once per tick.
pub struct TimerManager {
    timers: Vec<Timer>,
    scheduler: TimerScheduler,
}

impl TimerManager {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            scheduler: TimerScheduler {
                pending: Rc::new(RefCell::new(Pending::default())),
                next_id: Rc::new(Cell::new(1)),
            },
        }
    }

    pub fn scheduler(&self) -> TimerScheduler {
        self.scheduler.clone()
    }

    pub fn add(&mut self, interval: f32, repeat: bool, callback: impl FnMut() + 'static) -> TimerId {
        self.scheduler.add(interval, repeat, callback)
    }

    pub fn remove(&mut self, id: TimerId) {
        self.scheduler.remove(id);
    }

    /// Active timers plus those waiting to be registered.
    pub fn len(&self) -> usize {
        let pending = self.scheduler.pending.borrow();
        let live = self
            .timers
            .iter()
            .filter(|t| !pending.removed.contains(&t.id))
            .count();
        live + pending
            .added
            .iter()
            .filter(|t| !pending.removed.contains(&t.id))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.timers.clear();
        let mut pending = self.scheduler.pending.borrow_mut();
        pending.added.clear();
        pending.removed.clear();
    }

    fn apply_pending(&mut self) {
        let Pending { added, removed } = std::mem::take(&mut *self.scheduler.pending.borrow_mut());
        self.timers.extend(added);
        if !removed.is_empty() {
            self.timers.retain(|t| !removed.contains(&t.id));
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.apply_pending();
        let mut finished = Vec::new();
        for timer in &mut self.timers {
            timer.elapsed += dt;
            if timer.elapsed < timer.interval {
                continue;
            }
            (timer.callback)();
            if timer.repeat {
                timer.elapsed = if timer.interval > 0.0 {
                    timer.elapsed % timer.interval
                } else {
                    0.0
                };
            } else {
                finished.push(timer.id);
            }
        }
        self.timers.retain(|t| !finished.contains(&t.id));
        self.apply_pending();
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn repeating_timer_fires_on_interval() {
        let mut timers = TimerManager::new();
        let (count, cb) = counter();
        timers.add(0.5, true, cb);
        timers.tick(0.25);
        assert_eq!(count.get(), 0);
        timers.tick(0.25);
        assert_eq!(count.get(), 1);
        timers.tick(0.5);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn one_shot_timer_is_removed() {
        let mut timers = TimerManager::new();
        let (count, cb) = counter();
        timers.add(0.1, false, cb);
        timers.tick(0.2);
        timers.tick(0.2);
        assert_eq!(count.get(), 1);
        assert!(timers.is_empty());
    }

    #[test]
    fn callback_can_schedule_without_disturbing_pass() {
        let mut timers = TimerManager::new();
        let scheduler = timers.scheduler();
        let (count, cb) = counter();
        let mut cb = Some(cb);
        timers.add(0.0, false, move || {
            if let Some(cb) = cb.take() {
                scheduler.add(0.0, true, cb);
            }
        });
        timers.tick(0.1);
        // Added during the pass; first fires on the next tick.
        assert_eq!(count.get(), 0);
        assert_eq!(timers.len(), 1);
        timers.tick(0.1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn removal_takes_effect_after_pass() {
        let mut timers = TimerManager::new();
        let (count, cb) = counter();
        let id = timers.add(0.0, true, cb);
        timers.tick(0.1);
        timers.remove(id);
        assert_eq!(timers.len(), 0);
        timers.tick(0.1);
        assert_eq!(count.get(), 1);
    }
}
