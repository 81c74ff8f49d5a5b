// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Concurrency tests for the ledger.
//!
//! These tests hammer a shared [`Ledger`] from many threads and check that
//! same-user debits are serialized (no double spend), that different users
//! proceed independently, and that the locking never deadlocks. Deadlocks
//! are caught by parking_lot's detector (the `deadlock_detection` feature is
//! enabled for tests).

use market_ledger::{
    Catalog, Ledger, LedgerError, LedgerStore, MemoryStore, ProductId, SqliteStore, UserId,
};
use parking_lot::deadlock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// === Deadlock Detection Infrastructure ===

struct DeadlockDetector {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Starts a background thread that checks for deadlocks every 100ms.
fn start_deadlock_detector() -> DeadlockDetector {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    let handle = thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    DeadlockDetector { running, handle }
}

/// Stops the detector and fails the test if it saw a deadlock.
fn stop_deadlock_detector(detector: DeadlockDetector) {
    detector.running.store(false, Ordering::SeqCst);
    detector.handle.join().expect("Deadlock detector panicked");
}

/// Runs `threads` copies of `op` released at the same instant and returns
/// their results.
fn race<S, T, F>(ledger: &Arc<Ledger<S>>, threads: usize, op: F) -> Vec<T>
where
    S: LedgerStore + 'static,
    T: Send + 'static,
    F: Fn(&Ledger<S>) -> T + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(threads));
    let op = Arc::new(op);

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ledger = Arc::clone(ledger);
            let barrier = Arc::clone(&barrier);
            let op = Arc::clone(&op);
            thread::spawn(move || {
                barrier.wait();
                op(ledger.as_ref())
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect()
}

fn assert_single_spend<S: LedgerStore + 'static>(ledger: Ledger<S>) {
    const NUM_THREADS: usize = 16;

    let ledger = Arc::new(ledger);
    ledger.deposit(UserId(1), dec!(100)).unwrap();

    let results = race(&ledger, NUM_THREADS, |ledger| {
        ledger.withdraw(UserId(1), dec!(100))
    });

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| **r == Err(LedgerError::InsufficientFunds))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(rejected, NUM_THREADS - 1);
    assert_eq!(ledger.get_balance(UserId(1)), Ok(Decimal::ZERO));
    assert_eq!(ledger.history(UserId(1)).unwrap().len(), 2);
}

// === Double Spend ===

#[test]
fn concurrent_withdrawals_spend_once_memory() {
    assert_single_spend(Ledger::in_memory());
}

#[test]
fn concurrent_withdrawals_spend_once_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::open(dir.path().join("market.db")).unwrap();
    assert_single_spend(ledger);
}

#[test]
fn concurrent_purchases_spend_once() {
    const NUM_THREADS: usize = 12;

    let ledger = Arc::new(Ledger::in_memory());
    ledger.seed_catalog(&Catalog::uniform(1, dec!(10))).unwrap();
    ledger.deposit(UserId(1), dec!(25)).unwrap();

    let results = race(&ledger, NUM_THREADS, |ledger| {
        ledger.purchase(UserId(1), ProductId(1))
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert_eq!(ledger.get_balance(UserId(1)), Ok(dec!(5)));
}

#[test]
fn concurrent_deposits_are_all_recorded() {
    const NUM_THREADS: usize = 20;

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::new(
        SqliteStore::open(dir.path().join("market.db")).unwrap(),
    ));

    let results = race(&ledger, NUM_THREADS, |ledger| {
        ledger.deposit(UserId(1), dec!(1.25))
    });

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(ledger.get_balance(UserId(1)), Ok(dec!(25)));
    assert_eq!(ledger.history(UserId(1)).unwrap().len(), NUM_THREADS);
}

// === Independent Users ===

#[test]
fn different_users_progress_in_parallel() {
    const NUM_USERS: i64 = 20;
    const OPS_PER_USER: usize = 100;

    let ledger = Arc::new(Ledger::new(MemoryStore::new()));

    let handles: Vec<_> = (1..=NUM_USERS)
        .map(|user| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for _ in 0..OPS_PER_USER {
                    ledger.deposit(UserId(user), dec!(2)).unwrap();
                    ledger.withdraw(UserId(user), dec!(1)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    for user in 1..=NUM_USERS {
        assert_eq!(ledger.get_balance(UserId(user)), Ok(dec!(100)));
    }
    assert_eq!(
        ledger.store().transaction_count(),
        NUM_USERS as usize * OPS_PER_USER * 2
    );
}

// === Deadlock Freedom ===

/// Test high contention on a single user with many threads.
#[test]
fn no_deadlock_high_contention_single_user() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(Ledger::in_memory());
    ledger.seed_catalog(&Catalog::uniform(3, dec!(1))).unwrap();

    const NUM_THREADS: usize = 50;
    const OPS_PER_THREAD: usize = 100;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for _ in 0..NUM_THREADS {
        let ledger = ledger.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                match i % 4 {
                    0 => {
                        ledger.deposit(UserId(1), dec!(10.00)).unwrap();
                    }
                    1 => {
                        let _ = ledger.withdraw(UserId(1), dec!(1.00));
                    }
                    2 => {
                        let _ = ledger.purchase(UserId(1), ProductId(2));
                    }
                    _ => {
                        let _ = ledger.get_balance(UserId(1));
                        let _ = ledger.list_products();
                    }
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    let balance = ledger.get_balance(UserId(1)).unwrap();
    let journal_sum: Decimal = ledger
        .history(UserId(1))
        .unwrap()
        .iter()
        .map(|tx| tx.amount)
        .sum();
    assert!(balance >= Decimal::ZERO);
    assert_eq!(balance, journal_sum);
}

/// Test operations across many users while seeding and reading the catalog.
#[test]
fn no_deadlock_cross_user_operations() {
    let detector = start_deadlock_detector();
    let ledger = Arc::new(Ledger::in_memory());

    const NUM_THREADS: usize = 20;
    const NUM_USERS: usize = 10;
    const OPS_PER_THREAD: usize = 50;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for thread_id in 0..NUM_THREADS {
        let ledger = ledger.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                // Each thread cycles through users
                let user = UserId(((thread_id + i) % NUM_USERS) as i64 + 1);

                if i % 2 == 0 {
                    ledger.deposit(user, dec!(5.00)).unwrap();
                } else {
                    let _ = ledger.withdraw(user, dec!(1.00));
                }

                // Reseeding is idempotent and takes the catalog write lock
                if i % 10 == 0 {
                    ledger.seed_catalog(&Catalog::uniform(5, dec!(2))).unwrap();
                }

                let other = UserId(((thread_id + i + 1) % NUM_USERS) as i64 + 1);
                let _ = ledger.get_balance(other);
                let _ = ledger.purchase(other, ProductId(1));
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    for user in 1..=NUM_USERS as i64 {
        let balance = ledger.get_balance(UserId(user)).unwrap();
        let journal_sum: Decimal = ledger
            .history(UserId(user))
            .unwrap()
            .iter()
            .map(|tx| tx.amount)
            .sum();
        assert_eq!(balance, journal_sum);
    }
}
