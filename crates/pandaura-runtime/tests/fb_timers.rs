use pandaura_runtime::stdlib::fbs::{FTrig, RTrig, Tof, Ton, Tp};

#[test]
fn ton_tof_tp() {
    let mut ton = Ton::new();
    let mut tof = Tof::new();
    let mut tp = Tp::new();

    let pt = 10;
    let delta = 5;

    let out = ton.step(false, pt, delta);
    assert!(!out.q);
    assert_eq!(out.et, 0);

    let out = ton.step(true, pt, delta);
    assert!(!out.q);
    assert_eq!(out.et, 5);

    let out = ton.step(true, pt, delta);
    assert!(out.q);
    assert_eq!(out.et, 10);

    let out = ton.step(false, pt, delta);
    assert!(!out.q);
    assert_eq!(out.et, 0);

    let out = tof.step(true, pt, delta);
    assert!(out.q);
    let out = tof.step(false, pt, delta);
    assert!(out.q);
    assert_eq!(out.et, 5);
    let out = tof.step(false, pt, delta);
    assert!(!out.q);

    let out = tp.step(false, pt, delta);
    assert!(!out.q);
    let out = tp.step(true, pt, delta);
    assert!(out.q);
    let out = tp.step(true, pt, delta);
    assert!(!out.q);
    let out = tp.step(false, pt, delta);
    assert!(!out.q);
    let out = tp.step(true, pt, delta);
    assert!(out.q);
}

#[test]
fn ton_holds_q_while_input_stays_high() {
    let mut ton = Ton::new();
    for _ in 0..3 {
        ton.step(true, 10, 5);
    }
    let out = ton.step(true, 10, 5);
    assert!(out.q);
    assert_eq!(out.et, 10, "ET is capped at PT");
}

#[test]
fn edge_triggers_fire_once() {
    let mut r = RTrig::new();
    assert!(r.step(true));
    assert!(!r.step(true));
    assert!(!r.step(false));
    assert!(r.step(true));

    let mut f = FTrig::new();
    assert!(f.step(false), "initial low counts as a falling edge");
    assert!(!f.step(false));
    assert!(!f.step(true));
    assert!(f.step(false));
}

#[test]
fn negative_pt_is_treated_as_zero() {
    let mut ton = Ton::new();
    let out = ton.step(true, -50, 5);
    assert!(out.q);
    assert_eq!(out.et, 0);
}
