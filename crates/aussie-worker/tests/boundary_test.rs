use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use aussie_abi::test_utils::{OnInterpret, ScriptedRuntime, Stream};
use aussie_abi::{RuntimeAbi, RuntimeFactory};
use aussie_proto::OutputEvent;
use aussie_worker::{BoundaryError, ExecutionBoundary};

/// Factory handing out a runtime the test keeps a handle on.
fn shared(rt: Arc<ScriptedRuntime>) -> RuntimeFactory {
    Box::new(move |sink| {
        rt.set_sink(sink);
        Ok(Box::new(rt.clone()) as Box<dyn RuntimeAbi>)
    })
}

async fn wait_until_busy(boundary: &ExecutionBoundary) {
    for _ in 0..500 {
        if boundary.is_busy() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("boundary never became busy");
}

#[tokio::test]
async fn run_streams_output_in_emission_order() {
    let rt = Arc::new(ScriptedRuntime::new().on_interpret(OnInterpret::Emit(vec![
        (Stream::Stdout, "fair".to_owned()),
        (Stream::Stderr, "oi".to_owned()),
        (Stream::Stdout, "dinkum".to_owned()),
        (Stream::Stderr, "mate".to_owned()),
    ])));
    let boundary = ExecutionBoundary::with_factory(shared(rt.clone()));
    boundary.initialize().await.unwrap();

    let mut events = boundary.subscribe();
    boundary.run("GIMME \"g'day\";", false).await.unwrap();

    // Events were broadcast before the entry point returned, so once the
    // call resolved they are all waiting in the channel.
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    while let Some(event) = events.try_recv() {
        match event {
            OutputEvent::Stdout(text) => stdout.push(text),
            OutputEvent::Stderr(text) => stderr.push(text),
        }
    }
    assert_eq!(stdout, vec!["fair", "dinkum"]);
    assert_eq!(stderr, vec!["oi", "mate"]);
    assert_eq!(rt.live_allocations(), 0);
}

#[tokio::test]
async fn run_with_no_output_resolves() {
    let rt = Arc::new(ScriptedRuntime::new());
    let boundary = ExecutionBoundary::with_factory(shared(rt.clone()));
    boundary.initialize().await.unwrap();

    let mut events = boundary.subscribe();
    boundary
        .run("G'DAY MATE! ... GOT IT?", false)
        .await
        .unwrap();

    assert!(events.try_recv().is_none());
    assert_eq!(
        rt.interpreted(),
        vec![("G'DAY MATE! ... GOT IT?".to_owned(), false)]
    );
}

#[tokio::test]
async fn calls_before_initialize_are_rejected() {
    let boundary = ExecutionBoundary::with_factory(shared(Arc::new(ScriptedRuntime::new())));

    assert!(matches!(
        boundary.run("GIMME 42;", false).await,
        Err(BoundaryError::NotReady)
    ));
    assert!(matches!(
        boundary.flip("abc", true).await,
        Err(BoundaryError::NotReady)
    ));
}

#[tokio::test]
async fn second_call_while_busy_is_rejected() {
    let (release_tx, release_rx) = mpsc::channel();
    let rt = Arc::new(
        ScriptedRuntime::new().on_interpret(OnInterpret::Block(Mutex::new(release_rx))),
    );
    let boundary = Arc::new(ExecutionBoundary::with_factory(shared(rt)));
    boundary.initialize().await.unwrap();

    let running = {
        let boundary = boundary.clone();
        tokio::spawn(async move { boundary.run("BLOCK FOREVER", false).await })
    };
    wait_until_busy(&boundary).await;

    // Neither operation may interleave with the outstanding run.
    assert!(matches!(
        boundary.flip("abc", true).await,
        Err(BoundaryError::Busy)
    ));
    assert!(matches!(
        boundary.run("GIMME 42;", false).await,
        Err(BoundaryError::Busy)
    ));

    release_tx.send(()).unwrap();
    running.await.unwrap().unwrap();

    // Resolved, so the boundary serves requests again.
    assert_eq!(boundary.flip("abc", true).await.unwrap(), "ɔqɐ");
}

#[tokio::test]
async fn initialize_is_idempotent_and_retryable_after_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let factory: RuntimeFactory = Box::new(move |sink| {
        if counted.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(aussie_abi::AbiError::AllocFailed { len: 64 })
        } else {
            Ok(Box::new(ScriptedRuntime::new().with_sink(sink)) as Box<dyn RuntimeAbi>)
        }
    });
    let boundary = ExecutionBoundary::with_factory(factory);

    assert!(matches!(
        boundary.initialize().await,
        Err(BoundaryError::InitFailed(_))
    ));
    boundary.initialize().await.unwrap();
    boundary.initialize().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn initialize_while_initializing_is_rejected() {
    let (release_tx, release_rx) = mpsc::channel();
    let gate = Mutex::new(Some(release_rx));
    let factory: RuntimeFactory = Box::new(move |sink| {
        if let Some(gate) = gate.lock().unwrap().take() {
            let _ = gate.recv();
        }
        Ok(Box::new(ScriptedRuntime::new().with_sink(sink)) as Box<dyn RuntimeAbi>)
    });
    let boundary = Arc::new(ExecutionBoundary::with_factory(factory));

    let initializing = {
        let boundary = boundary.clone();
        tokio::spawn(async move { boundary.initialize().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(matches!(
        boundary.initialize().await,
        Err(BoundaryError::Initializing)
    ));

    release_tx.send(()).unwrap();
    initializing.await.unwrap().unwrap();
    boundary.initialize().await.unwrap();
}

#[tokio::test]
async fn flip_round_trips_through_the_boundary() {
    let boundary = ExecutionBoundary::with_factory(shared(Arc::new(ScriptedRuntime::new())));
    boundary.initialize().await.unwrap();

    let flipped = boundary.flip("abc", true).await.unwrap();
    assert_eq!(flipped, "ɔqɐ");
    assert_eq!(boundary.flip(flipped, false).await.unwrap(), "abc");
}

#[tokio::test]
async fn failed_run_keeps_streamed_output_and_recovers() {
    let rt = Arc::new(ScriptedRuntime::new().on_interpret(OnInterpret::EmitThenFail(
        vec![(Stream::Stdout, "partial".to_owned())],
        2,
    )));
    let boundary = ExecutionBoundary::with_factory(shared(rt.clone()));
    boundary.initialize().await.unwrap();

    let mut events = boundary.subscribe();
    let err = boundary.run("CARK IT", false).await.unwrap_err();
    assert!(matches!(err, BoundaryError::Execution(_)));

    // Output emitted before the failure is not rolled back.
    assert_eq!(events.try_recv(), Some(OutputEvent::stdout("partial")));
    assert!(events.try_recv().is_none());

    // The boundary is ready again, not wedged busy.
    assert!(matches!(
        boundary.run("CARK IT", false).await,
        Err(BoundaryError::Execution(_))
    ));
    assert_eq!(rt.live_allocations(), 0);
}
