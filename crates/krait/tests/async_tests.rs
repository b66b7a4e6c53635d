//! Async/await, promises, timers, and run-loop ordering.

use krait::{Engine, HostValue};

fn run(src: &str) -> HostValue {
    Engine::new().run(src).unwrap()
}

#[test]
fn async_control_flow_ordering() {
    // S2.
    let src = "
        let log = [];
        async function f(){ log.push('a'); await Promise.resolve(); log.push('b'); }
        f(); log.push('c');
        Promise.resolve().then(() => log.push('d'));
        log
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    let log = engine.evaluate("log.join(',')").unwrap();
    assert_eq!(log, HostValue::String("a,c,b,d".to_owned()));
}

#[test]
fn timer_and_promise_ordering() {
    // S6: sync first, then the microtask, then the timer.
    let src = "
        let log = [];
        setTimeout(() => log.push('t'), 0);
        Promise.resolve().then(() => log.push('p'));
        log.push('s');
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    let log = engine.evaluate("log.join(',')").unwrap();
    assert_eq!(log, HostValue::String("s,p,t".to_owned()));
}

#[test]
fn timers_fire_by_delay_then_insertion_order() {
    let src = "
        let log = [];
        setTimeout(() => log.push('late'), 10);
        setTimeout(() => log.push('early'), 1);
        setTimeout(() => log.push('tied-a'), 5);
        setTimeout(() => log.push('tied-b'), 5);
        log
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    let log = engine.evaluate("log.join(',')").unwrap();
    assert_eq!(log, HostValue::String("early,tied-a,tied-b,late".to_owned()));
}

#[test]
fn clear_timeout_drops_pending_timer() {
    let src = "
        let log = [];
        let id = setTimeout(() => log.push('cancelled'), 1);
        setTimeout(() => log.push('kept'), 2);
        clearTimeout(id);
        log
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    let log = engine.evaluate("log.join(',')").unwrap();
    assert_eq!(log, HostValue::String("kept".to_owned()));
}

#[test]
fn set_interval_reschedules_until_cleared() {
    let src = "
        let count = 0;
        let id = setInterval(() => { count += 1; if (count === 3) clearInterval(id); }, 5);
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("count").unwrap(), HostValue::Int(3));
}

#[test]
fn promise_reactions_run_fifo() {
    let src = "
        let log = [];
        let p = Promise.resolve('v');
        p.then(() => log.push('a'));
        p.then(() => log.push('b'));
        log
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    let log = engine.evaluate("log.join(',')").unwrap();
    assert_eq!(log, HostValue::String("a,b".to_owned()));
}

#[test]
fn microtasks_queued_by_microtasks_run_in_same_drain() {
    let src = "
        let log = [];
        Promise.resolve().then(() => {
          log.push(1);
          Promise.resolve().then(() => log.push(2));
        });
        setTimeout(() => log.push('timer'), 0);
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    let log = engine.evaluate("log.join(',')").unwrap();
    assert_eq!(log, HostValue::String("1,2,timer".to_owned()));
}

#[test]
fn await_unwraps_values_and_rethrows_rejections() {
    let src = "
        let results = [];
        async function f() {
          results.push(await 1);
          results.push(await Promise.resolve(2));
          try { await Promise.reject(new Error('nope')); } catch (e) { results.push(e.message); }
          return 'done';
        }
        let final_;
        f().then(v => { final_ = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(
        engine.evaluate("results.join(',') + '|' + final_").unwrap(),
        HostValue::String("1,2,nope|done".to_owned())
    );
}

#[test]
fn promise_chaining_transforms_values() {
    let src = "
        let out;
        Promise.resolve(2).then(v => v * 3).then(v => v + 1).then(v => { out = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("out").unwrap(), HostValue::Int(7));
}

#[test]
fn promise_resolving_to_promise_adopts_state() {
    let src = "
        let out;
        let inner = new Promise(resolve => setTimeout(() => resolve('inner value'), 1));
        Promise.resolve(inner).then(v => { out = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("out").unwrap(), HostValue::String("inner value".to_owned()));
}

#[test]
fn promise_all_preserves_order() {
    let src = "
        let out;
        let slow = new Promise(resolve => setTimeout(() => resolve('slow'), 5));
        Promise.all([slow, Promise.resolve('fast'), 3]).then(vs => { out = vs.join(','); });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("out").unwrap(), HostValue::String("slow,fast,3".to_owned()));
}

#[test]
fn promise_race_takes_first_settlement() {
    let src = "
        let out;
        let slow = new Promise(resolve => setTimeout(() => resolve('slow'), 5));
        Promise.race([slow, Promise.resolve('fast')]).then(v => { out = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("out").unwrap(), HostValue::String("fast".to_owned()));
}

#[test]
fn promise_finally_passes_value_through() {
    let src = "
        let log = [];
        Promise.resolve('v').finally(() => log.push('cleanup')).then(v => log.push(v));
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(
        engine.evaluate("log.join(',')").unwrap(),
        HostValue::String("cleanup,v".to_owned())
    );
}

#[test]
fn catch_recovers_a_rejection() {
    let src = "
        let out;
        Promise.reject('bad').catch(e => 'recovered:' + e).then(v => { out = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("out").unwrap(), HostValue::String("recovered:bad".to_owned()));
}

#[test]
fn unhandled_rejection_hook_fires_once_idle() {
    let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&seen);
    let mut engine = Engine::new();
    engine.on_unhandled_rejection(move |reason| {
        sink.borrow_mut().push(reason);
    });
    engine.run("Promise.reject('lost');").unwrap();
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0], HostValue::String("lost".to_owned()));
}

#[test]
fn handled_rejection_is_not_reported() {
    let seen = std::rc::Rc::new(std::cell::RefCell::new(0));
    let sink = std::rc::Rc::clone(&seen);
    let mut engine = Engine::new();
    engine.on_unhandled_rejection(move |_| {
        *sink.borrow_mut() += 1;
    });
    engine.run("Promise.reject('x').catch(() => 'fine');").unwrap();
    assert_eq!(*seen.borrow(), 0);
}

#[test]
fn evaluate_abandons_undue_timers() {
    let mut engine = Engine::new();
    engine
        .evaluate("let fired = false; setTimeout(() => { fired = true; }, 1000);")
        .unwrap();
    assert_eq!(engine.evaluate("fired").unwrap(), HostValue::Bool(false));
}

#[test]
fn async_functions_return_promises() {
    let src = "
        async function f() { return 5; }
        let isPromise;
        let value;
        let p = f();
        isPromise = p instanceof Promise;
        p.then(v => { value = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("isPromise").unwrap(), HostValue::Bool(true));
    assert_eq!(engine.evaluate("value").unwrap(), HostValue::Int(5));
}

#[test]
fn async_error_rejects_the_returned_promise() {
    let src = "
        let message;
        async function f() { throw new Error('async boom'); }
        f().catch(e => { message = e.message; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("message").unwrap(), HostValue::String("async boom".to_owned()));
}

#[test]
fn for_await_of_iterates_promises() {
    let src = "
        let out = [];
        async function f() {
          let items = [Promise.resolve(1), 2, Promise.resolve(3)];
          for await (const v of items) out.push(v);
          return out.join(',');
        }
        let result;
        f().then(v => { result = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("result").unwrap(), HostValue::String("1,2,3".to_owned()));
}

#[test]
fn async_generator_yields_through_promises() {
    let src = "
        async function* g() { yield 1; let v = await Promise.resolve(2); yield v; }
        let out = [];
        async function collect() {
          let it = g();
          let r = await it.next();
          while (!r.done) { out.push(r.value); r = await it.next(); }
          return out.join(',');
        }
        let result;
        collect().then(v => { result = v; });
    ";
    let mut engine = Engine::new();
    engine.run(src).unwrap();
    assert_eq!(engine.evaluate("result").unwrap(), HostValue::String("1,2".to_owned()));
}

#[test]
fn run_returns_final_expression_value() {
    assert_eq!(run("40 + 2"), HostValue::Int(42));
}
