use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use stripchart::PlotError;
use stripchart::api::{DirtySet, UpdateQueue, UpdateQueueHandle, UpdateTarget};
use stripchart::core::LineId;

#[derive(Default)]
struct CountingTarget {
    calls: AtomicUsize,
    fail_every_other: bool,
    panic_first: bool,
}

impl UpdateTarget for CountingTarget {
    fn process_update(&self) -> stripchart::PlotResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_first && call == 0 {
            panic!("first update blows up");
        }
        if self.fail_every_other && call % 2 == 0 {
            return Err(PlotError::InvalidData("simulated redraw failure".to_owned()));
        }
        Ok(())
    }
}

fn weak_of<T: UpdateTarget + 'static>(target: &Arc<T>) -> Weak<dyn UpdateTarget> {
    let target: Arc<dyn UpdateTarget> = Arc::clone(target) as Arc<dyn UpdateTarget>;
    Arc::downgrade(&target)
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn tokens_from_many_producers_are_all_processed() {
    let queue = UpdateQueue::spawn().expect("queue");
    let target = Arc::new(CountingTarget::default());

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let handle = queue.handle();
            let token = weak_of(&target);
            thread::spawn(move || {
                for _ in 0..250 {
                    handle.post(token.clone()).expect("post");
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer");
    }

    wait_until(|| queue.processed_count() == 1_000);
    assert_eq!(target.calls.load(Ordering::SeqCst), 1_000);
    assert_eq!(queue.failed_count(), 0);
}

#[test]
fn failing_and_panicking_targets_do_not_stop_the_consumer() {
    let queue = UpdateQueue::spawn().expect("queue");
    let failing = Arc::new(CountingTarget {
        fail_every_other: true,
        ..CountingTarget::default()
    });
    let panicking = Arc::new(CountingTarget {
        panic_first: true,
        ..CountingTarget::default()
    });

    queue.post(weak_of(&panicking)).expect("post");
    for _ in 0..10 {
        queue.post(weak_of(&failing)).expect("post");
    }
    queue.post(weak_of(&panicking)).expect("post");

    wait_until(|| queue.processed_count() == 12);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 10);
    assert_eq!(panicking.calls.load(Ordering::SeqCst), 2);
    assert_eq!(queue.failed_count(), 6);
    assert!(queue.is_running());
}

#[test]
fn dropped_targets_are_skipped() {
    let queue = UpdateQueue::spawn().expect("queue");
    let target = Arc::new(CountingTarget::default());
    let token = weak_of(&target);
    drop(target);

    queue.post(token).expect("post");
    wait_until(|| queue.processed_count() == 1);
    assert_eq!(queue.dropped_target_count(), 1);
}

struct GatedTarget {
    entered: AtomicBool,
    gate: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
}

impl UpdateTarget for GatedTarget {
    fn process_update(&self) -> stripchart::PlotResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.store(true, Ordering::SeqCst);
        let gate = self.gate.lock().expect("gate lock");
        let _ = gate.recv_timeout(Duration::from_secs(10));
        Ok(())
    }
}

#[test]
fn interrupt_discards_pending_tokens() {
    let queue = UpdateQueue::spawn().expect("queue");
    let (release, gate) = mpsc::channel();
    let target = Arc::new(GatedTarget {
        entered: AtomicBool::new(false),
        gate: Mutex::new(gate),
        calls: AtomicUsize::new(0),
    });

    for _ in 0..5 {
        queue.post(weak_of(&target)).expect("post");
    }
    wait_until(|| target.entered.load(Ordering::SeqCst));

    queue.interrupt();
    assert!(matches!(queue.post(weak_of(&target)), Err(PlotError::QueueClosed)));
    release.send(()).expect("release");

    wait_until(|| !queue.is_running());
    assert_eq!(queue.processed_count(), 1);
    assert_eq!(target.calls.load(Ordering::SeqCst), 1);
    queue.shutdown();
}

#[derive(Default)]
struct ReentrantTarget {
    queue: OnceLock<UpdateQueueHandle>,
    me: OnceLock<Weak<dyn UpdateTarget>>,
    calls: AtomicUsize,
}

impl UpdateTarget for ReentrantTarget {
    fn process_update(&self) -> stripchart::PlotResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            return Ok(());
        }
        let (Some(queue), Some(me)) = (self.queue.get(), self.me.get()) else {
            return Ok(());
        };
        for _ in 0..5 {
            queue.post(me.clone())?;
        }
        Ok(())
    }
}

#[test]
fn consumer_posting_into_a_full_queue_does_not_block_itself() {
    let queue = UpdateQueue::with_capacity(1).expect("queue");
    let target = Arc::new(ReentrantTarget::default());
    let _ = target.queue.set(queue.handle());
    let _ = target.me.set(weak_of(&target));

    queue.post(weak_of(&target)).expect("post");

    wait_until(|| queue.processed_count() == 2);
    thread::sleep(Duration::from_millis(20));
    assert_eq!(queue.processed_count(), 2);
    assert_eq!(target.calls.load(Ordering::SeqCst), 2);
    assert_eq!(queue.failed_count(), 0);
    assert!(queue.is_running());
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(
        UpdateQueue::with_capacity(0),
        Err(PlotError::InvalidData(_))
    ));
}

#[test]
fn dirty_set_drain_is_idempotent() {
    let dirty = DirtySet::new();
    assert!(dirty.insert(LineId::new(2)));
    assert!(dirty.insert(LineId::new(1)));
    assert!(!dirty.insert(LineId::new(2)));

    assert_eq!(dirty.drain(), vec![LineId::new(2), LineId::new(1)]);
    assert!(dirty.drain().is_empty());
    assert!(dirty.is_empty());
}

#[test]
fn dirty_set_collects_inserts_from_many_threads() {
    let dirty = Arc::new(DirtySet::new());
    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let dirty = Arc::clone(&dirty);
            thread::spawn(move || {
                for round in 0..100 {
                    dirty.insert(LineId::new((worker * 100 + round) % 50));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker");
    }

    let drained = dirty.drain();
    assert_eq!(drained.len(), 50);
    assert!(dirty.drain().is_empty());
}
