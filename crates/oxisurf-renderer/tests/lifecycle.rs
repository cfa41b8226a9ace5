//! End-to-end renderer lifecycle against the headless backend.

use crossbeam_channel::unbounded;
use oxisurf_gfx::headless::{self, Call, HeadlessConfig, HeadlessDisplay, HeadlessEngine, Op, Probe, count_in};
use oxisurf_renderer::{InitStep, Renderer, RendererConfig, WindowHandle};
use std::ffi::c_void;
use std::ptr::NonNull;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn renderer() -> (Renderer<HeadlessDisplay, HeadlessEngine>, Probe) {
    let (display, engine, probe) = headless::headless(HeadlessConfig {
        present_interval_ms: 1,
        ..HeadlessConfig::new(800, 480)
    });
    (Renderer::new(RendererConfig::default(), display, engine), probe)
}

fn window(addr: usize) -> WindowHandle {
    unsafe { WindowHandle::from_android(NonNull::new(addr as *mut c_void).unwrap()) }
}

/// Frames presented since the most recent initialization attempt began.
fn presents_since_last_init(calls: &[Call]) -> usize {
    let start = calls
        .iter()
        .rposition(|c| c.op() == Op::GetDisplay)
        .unwrap_or(0);
    count_in(&calls[start..], Op::SwapBuffers)
}

fn op_for(step: InitStep) -> Op {
    match step {
        InitStep::GetDisplay => Op::GetDisplay,
        InitStep::InitializeDisplay => Op::InitializeDisplay,
        InitStep::ChooseConfig => Op::ChooseConfig,
        InitStep::GetConfigAttrib => Op::GetConfigAttrib,
        InitStep::SetBuffersGeometry => Op::SetBuffersGeometry,
        InitStep::CreateWindowSurface => Op::CreateWindowSurface,
        InitStep::CreateContext => Op::CreateContext,
        InitStep::MakeCurrent => Op::MakeCurrent,
        InitStep::QuerySurface => Op::QuerySurface,
        InitStep::EngineInit => Op::EngineInit,
    }
}

#[test]
fn test_start_stop_without_window() {
    let (mut renderer, probe) = renderer();

    renderer.start().unwrap();
    renderer.stop().unwrap();

    assert!(probe.calls().is_empty(), "no init and no draw calls expected");
}

#[test]
fn test_window_sets_coalesce() {
    let (mut renderer, probe) = renderer();

    // Both posted before the render thread exists to consume either
    renderer.set_window(window(0x1000));
    renderer.set_window(window(0x2000));
    renderer.start().unwrap();

    assert!(probe.wait_until(TIMEOUT, |c| count_in(c, Op::Frame) >= 1));
    renderer.stop().unwrap();

    let calls = probe.calls();
    assert_eq!(count_in(&calls, Op::GetDisplay), 1);
    assert!(calls.contains(&Call::CreateWindowSurface { window: 0x2000 }));
    assert!(!calls.contains(&Call::CreateWindowSurface { window: 0x1000 }));
}

#[test]
fn test_single_window_scenario() {
    let (mut renderer, probe) = renderer();
    renderer.start().unwrap();

    renderer.set_window(window(0x1000));
    assert!(probe.wait_until(TIMEOUT, |c| count_in(c, Op::SwapBuffers) >= 1));
    renderer.stop().unwrap();

    let calls = probe.calls();
    let first_draw = calls
        .iter()
        .position(|c| c.op() == Op::SetViewRect)
        .unwrap();

    // Init completes, then the same iteration draws and presents
    assert_eq!(calls[first_draw - 1].op(), Op::SetViewClear);
    assert_eq!(
        calls[first_draw],
        Call::SetViewRect {
            view: 0,
            x: 0,
            y: 0,
            width: 800,
            height: 480,
        }
    );
    assert_eq!(calls[first_draw + 1], Call::Submit(0));
    let present = calls[first_draw..]
        .iter()
        .position(|c| c.op() == Op::SwapBuffers)
        .unwrap();
    assert_eq!(calls[first_draw + present - 1], Call::Frame);

    // Exactly one teardown sequence, and nothing drawn after it
    assert_eq!(count_in(&calls, Op::EngineShutdown), 1);
    assert_eq!(count_in(&calls, Op::TerminateDisplay), 1);
    assert_eq!(calls.last(), Some(&Call::TerminateDisplay));
}

#[test]
fn test_teardown_matches_init() {
    let (mut renderer, probe) = renderer();
    renderer.start().unwrap();

    for addr in [0x1000, 0x2000, 0x3000] {
        renderer.set_window(window(addr));
        assert!(probe.wait_until(TIMEOUT, |c| {
            c.contains(&Call::CreateWindowSurface { window: addr }) && presents_since_last_init(c) >= 1
        }));
    }
    renderer.stop().unwrap();

    assert_eq!(probe.count(Op::GetDisplay), probe.count(Op::TerminateDisplay));
    assert_eq!(probe.count(Op::CreateContext), probe.count(Op::DestroyContext));
    assert_eq!(probe.count(Op::CreateWindowSurface), probe.count(Op::DestroySurface));
    assert_eq!(probe.count(Op::EngineInit), probe.count(Op::EngineShutdown));
}

#[test]
fn test_failure_at_each_step_then_recovery() {
    for step in InitStep::ALL {
        let (mut renderer, probe) = renderer();
        let op = op_for(step);
        probe.fail_once(op);

        renderer.start().unwrap();
        renderer.set_window(window(0x1000));
        assert!(probe.wait_until(TIMEOUT, |c| count_in(c, op) >= 1), "{step}");

        // Loop still answers a fresh window
        renderer.set_window(window(0x2000));
        assert!(probe.wait_until(TIMEOUT, |c| count_in(c, Op::Frame) >= 1), "{step}");
        renderer.stop().unwrap();

        let calls = probe.calls();
        let retry = calls
            .iter()
            .rposition(|c| c.op() == Op::GetDisplay)
            .unwrap();
        assert!(
            calls[..retry].iter().all(|c| c.op() != Op::SetViewRect),
            "drew after failed {step}"
        );

        let acquired = count_in(&calls, Op::GetDisplay) - usize::from(step == InitStep::GetDisplay);
        assert_eq!(count_in(&calls, Op::TerminateDisplay), acquired, "{step}");
        assert_eq!(count_in(&calls, Op::EngineShutdown), 1, "{step}");
    }
}

#[test]
fn test_clear_window_then_reattach() {
    let (mut renderer, probe) = renderer();
    renderer.start().unwrap();

    renderer.set_window(window(0x1000));
    assert!(probe.wait_until(TIMEOUT, |c| count_in(c, Op::Frame) >= 1));

    renderer.clear_window();
    assert_eq!(probe.count(Op::TerminateDisplay), 1);

    renderer.set_window(window(0x1000));
    assert!(probe.wait_until(TIMEOUT, |c| {
        count_in(c, Op::GetDisplay) == 2 && presents_since_last_init(c) >= 1
    }));

    renderer.stop().unwrap();
    assert_eq!(probe.count(Op::TerminateDisplay), 2);
}

#[test]
fn test_clear_window_returns_after_release() {
    let (mut renderer, probe) = renderer();
    renderer.start().unwrap();

    renderer.set_window(window(0x1000));
    assert!(probe.wait_until(TIMEOUT, |c| count_in(c, Op::SwapBuffers) >= 2));

    renderer.clear_window();
    let calls = probe.calls();

    // Everything touching the window happened before the call returned
    assert_eq!(count_in(&calls, Op::DestroySurface), 1);
    assert_eq!(count_in(&calls, Op::TerminateDisplay), 1);
    let released = calls.iter().rposition(|c| c.op() == Op::DestroySurface).unwrap();
    assert!(calls[released..].iter().all(|c| c.op() != Op::SwapBuffers));

    thread::sleep(Duration::from_millis(20));
    assert_eq!(probe.calls().len(), calls.len());
    renderer.stop().unwrap();
}

#[test]
fn test_clear_window_after_replacement_releases_both() {
    let (mut renderer, probe) = renderer();
    renderer.start().unwrap();

    renderer.set_window(window(0x1000));
    renderer.set_window(window(0x2000));
    renderer.clear_window();

    assert_eq!(probe.count(Op::CreateWindowSurface), probe.count(Op::DestroySurface));
    renderer.stop().unwrap();
}

#[test]
fn test_posting_from_surface_provider_thread() {
    #[derive(Debug)]
    enum SurfaceEvent {
        Attached(usize),
        Detached,
    }

    let (mut renderer, probe) = renderer();
    renderer.start().unwrap();

    let (tx, rx) = unbounded();
    let handle = renderer.handle();
    let control = thread::spawn(move || {
        for event in rx {
            match event {
                SurfaceEvent::Attached(addr) => handle.set_window(window(addr)),
                SurfaceEvent::Detached => handle.clear_window(),
            }
        }
    });

    tx.send(SurfaceEvent::Attached(0x1000)).unwrap();
    assert!(probe.wait_until(TIMEOUT, |c| count_in(c, Op::Frame) >= 1));
    tx.send(SurfaceEvent::Detached).unwrap();
    drop(tx);
    control.join().unwrap();

    // The control thread's clear returned only after the release
    assert_eq!(probe.count(Op::DestroySurface), 1);

    renderer.stop().unwrap();
    assert_eq!(probe.count(Op::GetDisplay), 1);
    assert_eq!(probe.count(Op::TerminateDisplay), 1);
}
