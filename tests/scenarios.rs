//! Black-box scenarios for the subscription runtime: delivery ordering,
//! fan-out, subscriber death, delayed tasks, the inline dispatcher, and
//! reentrancy.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::time::sleep;

use lanebus::{
    create_subscriber, Config, Dispatch, Subscriber, SubscriptionManager, SyncDispatcher,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Key {
    A,
    B,
    C,
    X,
    Timer,
}

async fn wait_for(mut pred: impl FnMut() -> bool) {
    for _ in 0..500 {
        if pred() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// S1: one subscriber on lane 0 over keys A, B, C sees publishes in order
/// with the key and value intact.
#[tokio::test]
async fn echo_preserves_publish_order_and_values() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();

    let subscriber = Subscriber::new(Arc::clone(&engine), Vec::<(Key, i32)>::new());
    subscriber.set_callback(|_set_id, log, key, value| log.push((key, value)));
    for key in [Key::A, Key::B, Key::C] {
        subscriber.subscribe(0, 0, key);
    }

    engine.notify(Key::A, 1);
    engine.notify(Key::B, 2);
    engine.notify(Key::A, 3);

    wait_for(|| subscriber.with_state(Vec::len) == 3).await;
    subscriber.with_state(|log| {
        assert_eq!(log, &[(Key::A, 1), (Key::B, 2), (Key::A, 3)]);
    });
    manager.dispose().await;
}

/// S2: two subscribers on different lanes both receive one fan-out copy.
#[tokio::test]
async fn fanout_reaches_every_lane_once() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, String>();

    let first = create_subscriber(&manager, Key::X, 0, Vec::<String>::new(), |log, s| {
        log.push(s)
    });
    let second = create_subscriber(&manager, Key::X, 1, Vec::<String>::new(), |log, s| {
        log.push(s)
    });
    assert_eq!(engine.size_of(Key::X), 2);

    engine.notify(Key::X, "hi".to_string());

    wait_for(|| first.with_state(Vec::len) == 1 && second.with_state(Vec::len) == 1).await;
    first.with_state(|log| assert_eq!(log, &["hi"]));
    second.with_state(|log| assert_eq!(log, &["hi"]));
    manager.dispose().await;
}

/// S3: dropping the last strong reference clears the registry eagerly and
/// no callback ever fires afterwards.
#[tokio::test]
async fn dropped_subscriber_is_cleaned_up_and_never_called() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();

    let hits = Arc::new(AtomicU32::new(0));
    let hits_clone = Arc::clone(&hits);
    let subscriber = create_subscriber(&manager, Key::A, 0, (), move |_state, _value: i32| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(engine.size_of(Key::A), 1);

    drop(subscriber);
    assert_eq!(engine.size_of(Key::A), 0);

    engine.notify(Key::A, 1);
    sleep(Duration::from_millis(50)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    manager.dispose().await;
}

/// No-leak invariant: record counts return to their pre-subscribe value
/// across every key the subscriber touched.
#[tokio::test]
async fn record_count_returns_to_baseline_after_drop() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();
    assert_eq!(engine.size(), 0);

    let subscriber = Subscriber::new(Arc::clone(&engine), ());
    subscriber.set_callback(|_, _, _, _| {});
    subscriber.subscribe(0, 0, Key::A);
    subscriber.subscribe(1, 0, Key::B);
    subscriber.subscribe(2, 1, Key::A);
    assert_eq!(engine.size(), 3);

    drop(subscriber);
    assert_eq!(engine.size(), 0);
    manager.dispose().await;
}

/// S4: a delayed submission runs no earlier than its delay.
#[tokio::test]
async fn delayed_notify_respects_the_lower_bound() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();
    let timer_tid = 3;

    let fired_at = Arc::new(Mutex::new(None::<Instant>));
    let fired_clone = Arc::clone(&fired_at);
    let _timer = create_subscriber(&manager, Key::Timer, timer_tid, (), move |_state, _value: i32| {
        *fired_clone.lock().unwrap() = Some(Instant::now());
    });

    let submitted = Instant::now();
    let engine_for_task = Arc::clone(&engine);
    manager.dispatcher().add_delayed(
        timer_tid,
        Duration::from_millis(50),
        Box::new(move || engine_for_task.notify(Key::Timer, 0)),
    );

    wait_for(|| fired_at.lock().unwrap().is_some()).await;
    let fired = fired_at.lock().unwrap().unwrap();
    assert!(fired.duration_since(submitted) >= Duration::from_millis(50));
    manager.dispose().await;
}

/// S5: with the inline dispatcher the callback has completed by the time
/// `notify` returns; no worker is involved.
#[tokio::test]
async fn sync_dispatcher_delivers_before_notify_returns() {
    let manager = SubscriptionManager::with_dispatcher(Arc::new(SyncDispatcher::default()));
    let engine = manager.engine::<Key, i32>();

    let subscriber = create_subscriber(&manager, Key::A, 0, Vec::<i32>::new(), |log, value| {
        log.push(value)
    });

    engine.notify(Key::A, 9);
    subscriber.with_state(|log| assert_eq!(log, &[9]));
    manager.dispose().await;
}

/// S6: publishing from inside a callback is delivered after the current
/// callback returns, on the lane the inner key was subscribed on.
#[tokio::test]
async fn notify_from_a_callback_runs_after_the_current_one() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();
    let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let log_b = Arc::clone(&log);
    let _on_b = create_subscriber(&manager, Key::B, 0, (), move |_state, _value: i32| {
        log_b.lock().unwrap().push("b");
    });

    let log_a = Arc::clone(&log);
    let engine_a = Arc::clone(&engine);
    let _on_a = create_subscriber(&manager, Key::A, 0, (), move |_state, _value: i32| {
        log_a.lock().unwrap().push("a-begin");
        engine_a.notify(Key::B, 0);
        log_a.lock().unwrap().push("a-end");
    });

    engine.notify(Key::A, 0);

    wait_for(|| log.lock().unwrap().len() == 3).await;
    assert_eq!(*log.lock().unwrap(), ["a-begin", "a-end", "b"]);
    manager.dispose().await;
}

/// Per-lane FIFO invariant: a burst published from one thread to one lane
/// arrives in publish order.
#[tokio::test]
async fn one_lane_delivers_a_burst_in_publish_order() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();

    let subscriber = create_subscriber(&manager, Key::A, 2, Vec::<i32>::new(), |log, value| {
        log.push(value)
    });

    for i in 0..100 {
        engine.notify(Key::A, i);
    }

    wait_for(|| subscriber.with_state(Vec::len) == 100).await;
    subscriber.with_state(|log| assert_eq!(log, &(0..100).collect::<Vec<_>>()));
    manager.dispose().await;
}

/// Payload fidelity invariant: a structured payload tuple arrives intact.
#[tokio::test]
async fn payload_tuples_arrive_structurally_equal() {
    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Block {
        height: u64,
        hash: String,
    }

    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, (u64, Block)>();

    let seen = Arc::new(Mutex::new(None));
    let seen_clone = Arc::clone(&seen);
    let _subscriber = create_subscriber(&manager, Key::X, 1, (), move |_state, payload| {
        *seen_clone.lock().unwrap() = Some(payload);
    });

    let block = Block {
        height: 7,
        hash: "0xabc".to_string(),
    };
    engine.notify(Key::X, (7, block.clone()));

    wait_for(|| seen.lock().unwrap().is_some()).await;
    assert_eq!(*seen.lock().unwrap(), Some((7, block)));
    manager.dispose().await;
}

/// Set-id echo invariant: the callback observes the set id chosen at
/// subscribe time, letting one subscriber tell its registrations apart.
#[tokio::test]
async fn set_ids_distinguish_registrations() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();

    let subscriber = Subscriber::new(Arc::clone(&engine), Vec::<(u32, Key)>::new());
    subscriber.set_callback(|set_id, log, key, _value| log.push((set_id, key)));
    subscriber.subscribe(0, 10, Key::A);
    subscriber.subscribe(0, 20, Key::B);

    engine.notify(Key::A, 0);
    engine.notify(Key::B, 0);

    wait_for(|| subscriber.with_state(Vec::len) == 2).await;
    subscriber.with_state(|log| assert_eq!(log, &[(10, Key::A), (20, Key::B)]));
    manager.dispose().await;
}

/// Unsubscribe idempotence: repeating an unsubscribe is a no-op and leaves
/// the other registrations untouched.
#[tokio::test]
async fn repeated_unsubscribe_is_a_no_op() {
    let manager = SubscriptionManager::new(Config::default());
    let engine = manager.engine::<Key, i32>();

    let keeper = create_subscriber(&manager, Key::A, 0, Vec::<i32>::new(), |log, value| {
        log.push(value)
    });
    let leaver = create_subscriber(&manager, Key::A, 0, Vec::<i32>::new(), |log, value| {
        log.push(value)
    });
    assert_eq!(engine.size_of(Key::A), 2);

    leaver.unsubscribe(Key::A);
    leaver.unsubscribe(Key::A);
    assert_eq!(engine.size_of(Key::A), 1);

    engine.notify(Key::A, 4);
    wait_for(|| keeper.with_state(Vec::len) == 1).await;
    keeper.with_state(|log| assert_eq!(log, &[4]));
    leaver.with_state(|log| assert!(log.is_empty()));
    manager.dispose().await;
}
