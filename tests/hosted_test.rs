/*!
 * Hosted Machine Tests
 * Kernel threads on real OS threads with baton-passing and simulated interrupts
 */

use kernel_sched::monitoring::init_tracing_with;
use kernel_sched::{HostMachine, QueueId, SchedConfig, SchedError, Scheduler, ThreadState};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Log = Arc<Mutex<Vec<String>>>;

fn boot() -> HostMachine {
    HostMachine::boot(SchedConfig::compact()).unwrap()
}

/// Sleep the boot thread on `done` until `count` threads have signalled it
fn wait_for(sched: &Scheduler, done: QueueId, finished: &AtomicUsize, count: usize) {
    while finished.load(Ordering::SeqCst) < count {
        sched.sleep_on(done);
    }
}

#[test]
fn test_spawned_threads_run_in_fifo_order() {
    let machine = boot();
    let log: Log = Arc::default();

    for name in ["a", "b", "c"] {
        let log = log.clone();
        machine
            .spawn(name, move |_| log.lock().push(name.to_string()))
            .unwrap();
    }
    assert!(log.lock().is_empty());

    machine.scheduler().yield_now();

    assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    assert_eq!(machine.scheduler().current(), Some(machine.boot_thread()));
    assert_eq!(machine.shutdown(), 3);
}

#[test]
fn test_device_interrupt_wakes_sleeper() {
    let machine = boot();
    let sched = machine.scheduler().clone();
    let rx = sched.queue_init().unwrap();
    let done = sched.queue_init().unwrap();
    let finished = Arc::new(AtomicUsize::new(0));
    let data_ready = Arc::new(AtomicBool::new(false));

    let reader = {
        let finished = finished.clone();
        let data_ready = data_ready.clone();
        machine
            .spawn("reader", move |sched| {
                while !data_ready.load(Ordering::SeqCst) {
                    sched.sleep_on(rx);
                }
                finished.fetch_add(1, Ordering::SeqCst);
                sched.wakeup_on(done);
            })
            .unwrap()
    };

    let line = machine.interrupt_line();
    let device = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        line.raise(move |sched| {
            data_ready.store(true, Ordering::SeqCst);
            sched.wakeup_on(rx);
        });
    });

    wait_for(&sched, done, &finished, 1);
    device.join().unwrap();

    assert_eq!(sched.state_of(reader), Some(ThreadState::Exited));
    assert!(sched.stats().idle_waits >= 1);
    assert_eq!(sched.check_invariants(), Ok(()));
    assert_eq!(machine.shutdown(), 1);
}

#[test]
fn test_broadcast_resumes_sleepers_in_arrival_order() {
    let machine = boot();
    let sched = machine.scheduler().clone();
    let q = sched.queue_init().unwrap();
    let log: Log = Arc::default();

    for name in ["w0", "w1", "w2"] {
        let log = log.clone();
        machine
            .spawn(name, move |sched| {
                sched.sleep_on(q);
                log.lock().push(name.to_string());
            })
            .unwrap();
    }

    // Every worker runs once and goes to sleep
    sched.yield_now();
    assert_eq!(sched.queue_len(q), 3);
    assert!(log.lock().is_empty());

    assert_eq!(sched.broadcast_on(q), 3);
    sched.yield_now();

    assert_eq!(*log.lock(), vec!["w0", "w1", "w2"]);
    assert_eq!(machine.shutdown(), 3);
}

#[test]
fn test_cancel_only_cuts_cancellable_sleeps_short() {
    let machine = boot();
    let sched = machine.scheduler().clone();
    let q = sched.queue_init().unwrap();
    let results: Arc<Mutex<Vec<(&'static str, Result<(), SchedError>)>>> = Arc::default();

    let cancellable = {
        let results = results.clone();
        machine
            .spawn("cancellable", move |sched| {
                let result = sched.cancellable_sleep_on(q);
                results.lock().push(("cancellable", result));
            })
            .unwrap()
    };
    let plain = {
        let results = results.clone();
        machine
            .spawn("plain", move |sched| {
                sched.sleep_on(q);
                results.lock().push(("plain", Ok(())));
            })
            .unwrap()
    };

    sched.yield_now();
    assert_eq!(sched.queue_waiters(q), vec![cancellable, plain]);

    sched.cancel(cancellable);
    sched.cancel(plain);
    assert_eq!(sched.queue_waiters(q), vec![plain]);

    sched.yield_now();
    assert_eq!(
        *results.lock(),
        vec![("cancellable", Err(SchedError::Interrupted(cancellable)))]
    );

    // The plain sleeper only leaves on its wakeup, flag still set
    assert_eq!(sched.wakeup_on(q), Some(plain));
    assert_eq!(sched.is_cancelled(plain), Some(true));
    sched.yield_now();
    assert_eq!(results.lock().len(), 2);

    assert_eq!(machine.shutdown(), 2);
}

#[test]
fn test_panicking_thread_hands_on_the_processor() {
    let machine = boot();
    let log: Log = Arc::default();

    let bad = machine
        .spawn("bad", |_| panic!("driver fault"))
        .unwrap();
    let good = {
        let log = log.clone();
        machine
            .spawn("good", move |_| log.lock().push("good".to_string()))
            .unwrap()
    };

    machine.scheduler().yield_now();

    let sched = machine.scheduler();
    assert_eq!(sched.state_of(bad), Some(ThreadState::Exited));
    assert_eq!(sched.state_of(good), Some(ThreadState::Exited));
    assert_eq!(*log.lock(), vec!["good"]);
    assert_eq!(sched.current(), Some(machine.boot_thread()));
    assert_eq!(sched.check_invariants(), Ok(()));
    assert_eq!(machine.shutdown(), 2);
}

#[test]
fn test_shutdown_leaves_sleepers_parked() {
    let machine = boot();
    let sched = machine.scheduler().clone();
    let never = sched.queue_init().unwrap();

    let sleeper = machine
        .spawn("sleeper", move |sched| sched.sleep_on(never))
        .unwrap();
    machine.spawn("quick", |_| {}).unwrap();
    sched.yield_now();

    assert_eq!(sched.state_of(sleeper), Some(ThreadState::Sleep));
    assert_eq!(machine.live_threads(), 2);
    assert_eq!(machine.shutdown(), 1);
    assert_eq!(sched.state_of(sleeper), Some(ThreadState::Sleep));
}

#[test]
#[serial]
fn test_producer_consumer_with_tracing() {
    init_tracing_with(false);

    let machine = boot();
    let sched = machine.scheduler().clone();
    let items = sched.queue_init().unwrap();
    let done = sched.queue_init().unwrap();
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let consumed: Log = Arc::default();
    let finished = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicBool::new(false));

    {
        let buffer = buffer.clone();
        let consumed = consumed.clone();
        let finished = finished.clone();
        let closed = closed.clone();
        machine
            .spawn("consumer", move |sched| {
                loop {
                    let item = buffer.lock().pop();
                    match item {
                        Some(item) => consumed.lock().push(item),
                        None if closed.load(Ordering::SeqCst) => break,
                        None => sched.sleep_on(items),
                    }
                }
                finished.fetch_add(1, Ordering::SeqCst);
                sched.wakeup_on(done);
            })
            .unwrap();
    }
    {
        let finished = finished.clone();
        machine
            .spawn("producer", move |sched| {
                for i in 0..4 {
                    buffer.lock().insert(0, format!("item-{}", i));
                    sched.wakeup_on(items);
                    sched.yield_now();
                }
                closed.store(true, Ordering::SeqCst);
                sched.broadcast_on(items);
                finished.fetch_add(1, Ordering::SeqCst);
                sched.wakeup_on(done);
            })
            .unwrap();
    }

    wait_for(&sched, done, &finished, 2);

    assert_eq!(*consumed.lock(), vec!["item-0", "item-1", "item-2", "item-3"]);
    assert_eq!(sched.check_invariants(), Ok(()));
    assert_eq!(machine.shutdown(), 2);
}
