/*!
 * Scheduler Demo - Main Entry Point
 *
 * Boots a hosted machine and runs a few kernel threads against it:
 * - A producer and a consumer sharing a wait queue
 * - A driver waiting for a simulated device interrupt
 * - A watchdog in a cancellable sleep that the boot thread cancels
 *
 * Prints the scheduler's info dump once everything has exited.
 */

use anyhow::{Context, Result};
use kernel_sched::monitoring::init_tracing_with;
use kernel_sched::{HostMachine, SchedConfig, ThreadState};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const ITEMS: u32 = 5;
const WORKERS: usize = 4;

fn main() -> Result<()> {
    let config = SchedConfig::from_env().context("invalid scheduler configuration")?;
    init_tracing_with(config.trace_json);

    info!("Scheduler demo starting...");
    let machine = HostMachine::boot(config).context("failed to boot hosted machine")?;
    let sched = machine.scheduler().clone();

    let items = sched.queue_init()?;
    let irq = sched.queue_init()?;
    let done = sched.queue_init()?;
    let never = sched.queue_init()?;

    let buffer = Arc::new(Mutex::new(VecDeque::new()));
    let produced_all = Arc::new(AtomicBool::new(false));
    let irq_fired = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicUsize::new(0));

    {
        let buffer = buffer.clone();
        let produced_all = produced_all.clone();
        let finished = finished.clone();
        machine.spawn("producer", move |sched| {
            for item in 0..ITEMS {
                buffer.lock().push_back(item);
                info!(item, "produced");
                sched.wakeup_on(items);
                sched.yield_now();
            }
            produced_all.store(true, Ordering::SeqCst);
            sched.broadcast_on(items);

            finished.fetch_add(1, Ordering::SeqCst);
            sched.wakeup_on(done);
        })?;
    }

    {
        let buffer = buffer.clone();
        let produced_all = produced_all.clone();
        let finished = finished.clone();
        machine.spawn("consumer", move |sched| {
            let mut consumed = 0;
            loop {
                let next = buffer.lock().pop_front();
                match next {
                    Some(item) => {
                        consumed += 1;
                        info!(item, "consumed");
                    }
                    None if produced_all.load(Ordering::SeqCst) => break,
                    None => sched.sleep_on(items),
                }
            }
            info!(consumed, "consumer drained the buffer");

            finished.fetch_add(1, Ordering::SeqCst);
            sched.wakeup_on(done);
        })?;
    }

    {
        let irq_fired = irq_fired.clone();
        let finished = finished.clone();
        machine.spawn("driver", move |sched| {
            while !irq_fired.load(Ordering::SeqCst) {
                sched.sleep_on(irq);
            }
            info!("driver saw device interrupt");

            finished.fetch_add(1, Ordering::SeqCst);
            sched.wakeup_on(done);
        })?;
    }

    let watchdog = {
        let finished = finished.clone();
        machine.spawn("watchdog", move |sched| {
            match sched.cancellable_sleep_on(never) {
                Err(err) => info!(errno = ?err.errno(), "watchdog: {}", err),
                Ok(()) => warn!("watchdog woken without cancellation"),
            }

            finished.fetch_add(1, Ordering::SeqCst);
            sched.wakeup_on(done);
        })?
    };

    // Device raising its interrupt from outside the machine
    let line = machine.interrupt_line();
    let device = thread::Builder::new()
        .name("device".to_string())
        .spawn(move || {
            thread::sleep(Duration::from_millis(20));
            line.raise(move |sched| {
                irq_fired.store(true, Ordering::SeqCst);
                sched.wakeup_on(irq);
            });
        })
        .context("failed to start device thread")?;

    // Let the watchdog reach its sleep before cancelling it
    while sched.state_of(watchdog) != Some(ThreadState::SleepCancellable) {
        sched.yield_now();
    }
    sched.cancel(watchdog);

    while finished.load(Ordering::SeqCst) < WORKERS {
        sched.sleep_on(done);
    }

    if device.join().is_err() {
        warn!("device thread panicked");
    }

    sched
        .check_invariants()
        .context("scheduler invariants violated")?;
    println!("{}", sched.snapshot());

    let joined = machine.shutdown();
    info!(joined, "Scheduler demo finished");
    Ok(())
}
