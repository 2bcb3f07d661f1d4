use freshet::notifier::{Event, Notifier};
use std::{cell::RefCell, rc::Rc};

#[derive(Debug)]
enum Ping {
    Left(u32),
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Side {
    Left,
    Right,
}

impl Event for Ping {
    type Kind = Side;

    fn kind(&self) -> Side {
        match self {
            Ping::Left(_) => Side::Left,
            Ping::Right => Side::Right,
        }
    }
}

fn log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn emit_reaches_listeners_of_kind() {
    let notifier: Notifier<Ping> = Notifier::new();
    let seen = log();
    let s = seen.clone();
    notifier.subscribe(Side::Left, move |event: &Ping| {
        if let Ping::Left(n) = event {
            s.borrow_mut().push(format!("left {n}"));
        }
    });

    assert!(notifier.emit(&Ping::Left(1)));
    assert!(!notifier.emit(&Ping::Right));
    assert_eq!(*seen.borrow(), ["left 1"]);
    assert_eq!(notifier.listener_count(Side::Left), 1);
    assert_eq!(notifier.listener_count(Side::Right), 0);
}

#[test]
fn once_fires_once() {
    let notifier: Notifier<Ping> = Notifier::new();
    let seen = log();
    let s = seen.clone();
    notifier.subscribe_once(Side::Right, move |_: &Ping| s.borrow_mut().push("once".into()));

    assert!(notifier.emit(&Ping::Right));
    assert!(!notifier.emit(&Ping::Right));
    assert_eq!(*seen.borrow(), ["once"]);
    assert_eq!(notifier.listener_count(Side::Right), 0);
}

#[test]
fn unsubscribe_by_id() {
    let notifier: Notifier<Ping> = Notifier::new();
    let seen = log();
    let s = seen.clone();
    let once = notifier.subscribe_once(Side::Right, move |_: &Ping| s.borrow_mut().push("once".into()));
    let s = seen.clone();
    let always = notifier.subscribe(Side::Right, move |_: &Ping| s.borrow_mut().push("always".into()));

    assert!(notifier.unsubscribe(Side::Right, once));
    assert!(!notifier.unsubscribe(Side::Right, once));
    assert!(!notifier.unsubscribe(Side::Left, always));
    notifier.emit(&Ping::Right);
    assert_eq!(*seen.borrow(), ["always"]);

    assert!(notifier.unsubscribe(Side::Right, always));
    assert!(!notifier.emit(&Ping::Right));
}

#[test]
fn dispatch_uses_snapshot() {
    let notifier = Rc::new(Notifier::<Ping>::new());
    let seen = log();

    let (n, s) = (notifier.clone(), seen.clone());
    notifier.subscribe(Side::Left, move |_: &Ping| {
        s.borrow_mut().push("first".into());
        let s = s.clone();
        // Added during dispatch, so it only sees later events.
        n.subscribe(Side::Left, move |_: &Ping| s.borrow_mut().push("late".into()));
    });

    notifier.emit(&Ping::Left(0));
    assert_eq!(*seen.borrow(), ["first"]);
    assert_eq!(notifier.listener_count(Side::Left), 2);

    seen.borrow_mut().clear();
    notifier.emit(&Ping::Left(0));
    assert_eq!(*seen.borrow(), ["first", "late"]);
}

#[test]
fn reentrant_emit_does_not_refire_once() {
    let notifier = Rc::new(Notifier::<Ping>::new());
    let seen = log();

    let (n, s) = (notifier.clone(), seen.clone());
    notifier.subscribe_once(Side::Left, move |_: &Ping| {
        s.borrow_mut().push("once".into());
        n.emit(&Ping::Left(1));
    });

    notifier.emit(&Ping::Left(0));
    assert_eq!(*seen.borrow(), ["once"]);
}
