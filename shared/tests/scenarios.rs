mod common;

use std::time::Duration;

use common::{
    FakeCamera, RecordingSleeper, ScriptedTransport, client, edited_image, png_file,
    reply_with_image,
};
use futures::executor::block_on;
use shared::{
    CameraError, CaptureEvent, CaptureState, CaptureStateMachine, ContainerBounds,
    EDIT_INSTRUCTION, ErrorKind, GenerateResponse, GenerationResult, PointerInput, RetryPolicy,
    SliderState, Transition, generation_for,
};

#[test]
fn camera_capture_to_complete() {
    let camera = FakeCamera::granting(640, 480);
    let transport = ScriptedTransport::new(vec![reply_with_image()]);
    let sleeper = RecordingSleeper::default();
    let mut machine = CaptureStateMachine::new(camera.clone());

    block_on(machine.run_camera_request()).unwrap();
    assert_eq!(machine.state(), CaptureState::Streaming);
    assert_eq!(camera.live.get(), 1);

    machine.capture().unwrap();
    assert_eq!(camera.live.get(), 0);
    let before = machine.session().captured().cloned().unwrap();
    assert_eq!((before.width(), before.height()), (640, 480));

    let transition = block_on(machine.run_generate(&client(&transport, &sleeper))).unwrap();
    assert_eq!(transport.calls(), 1);
    assert!(sleeper.slept.borrow().is_empty());
    assert_eq!(machine.state(), CaptureState::Complete);

    let Transition::Completed(CaptureEvent::Completed { before: sent, after }) = transition else {
        panic!("expected completion, got {transition:?}");
    };
    assert_eq!(sent, before);
    assert_eq!((after.width(), after.height()), (32, 24));
    assert!(machine.completed_pair().is_some());

    let request = &transport.requests.borrow()[0];
    assert_eq!(request.image().unwrap().data, before.to_base64());
    let text = request.contents[0].parts.iter().find_map(|p| p.text.clone());
    assert_eq!(text.as_deref(), Some(EDIT_INSTRUCTION));
}

#[test]
fn denied_camera_then_upload_completes() {
    let camera = FakeCamera::refusing(CameraError::PermissionDenied);
    let transport = ScriptedTransport::new(vec![reply_with_image()]);
    let sleeper = RecordingSleeper::default();
    let mut machine = CaptureStateMachine::new(camera.clone());

    block_on(machine.run_camera_request()).unwrap();
    assert_eq!(machine.state(), CaptureState::Error(ErrorKind::PermissionDenied));
    assert_eq!(camera.live.get(), 0);

    machine.load_from_file(&png_file(800, 600)).unwrap();
    assert_eq!(machine.state(), CaptureState::Captured);

    block_on(machine.run_generate(&client(&transport, &sleeper))).unwrap();
    assert_eq!(machine.state(), CaptureState::Complete);
}

#[test]
fn unavailable_camera_offers_upload() {
    let camera = FakeCamera::refusing(CameraError::Unavailable("no devices".into()));
    let mut machine = CaptureStateMachine::new(camera);

    block_on(machine.run_camera_request()).unwrap();
    assert_eq!(machine.state(), CaptureState::Error(ErrorKind::DeviceUnavailable));
    assert!(machine.load_from_file(&png_file(10, 10)).is_ok());
}

#[test]
fn overloaded_service_exhausts_retries() {
    let transport = ScriptedTransport::new(vec![
        Err(ErrorKind::ServiceUnavailable),
        Err(ErrorKind::ServiceUnavailable),
        Err(ErrorKind::ServiceUnavailable),
    ]);
    let sleeper = RecordingSleeper::default();
    let mut machine = CaptureStateMachine::new(FakeCamera::granting(640, 480));
    machine.load_from_file(&png_file(64, 64)).unwrap();

    block_on(machine.run_generate(&client(&transport, &sleeper))).unwrap();

    assert_eq!(transport.calls(), 3);
    assert_eq!(
        *sleeper.slept.borrow(),
        vec![Duration::from_secs(2), Duration::from_secs(4)]
    );
    assert_eq!(
        machine.state(),
        CaptureState::Error(ErrorKind::ServiceUnavailable)
    );
    assert!(machine.session().captured().is_some());
}

#[test]
fn one_retry_then_success() {
    let transport =
        ScriptedTransport::new(vec![Err(ErrorKind::ServiceUnavailable), reply_with_image()]);
    let sleeper = RecordingSleeper::default();
    let mut machine = CaptureStateMachine::new(FakeCamera::granting(640, 480));
    machine.load_from_file(&png_file(64, 64)).unwrap();

    block_on(machine.run_generate(&client(&transport, &sleeper))).unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(*sleeper.slept.borrow(), vec![Duration::from_secs(2)]);
    assert_eq!(machine.state(), CaptureState::Complete);

    // Both attempts carried the same photo.
    let requests = transport.requests.borrow();
    assert_eq!(requests[0], requests[1]);
}

#[test]
fn terminal_failures_are_not_retried() {
    for kind in [
        ErrorKind::MissingCredential,
        ErrorKind::RateLimited,
        ErrorKind::UnknownFailure,
    ] {
        let transport = ScriptedTransport::new(vec![Err(kind), reply_with_image()]);
        let sleeper = RecordingSleeper::default();
        let result = block_on(client(&transport, &sleeper).generate(edited_image(), "edit"));

        assert_eq!(result, GenerationResult::Failure { kind });
        assert_eq!(transport.calls(), 1, "{kind}");
        assert!(sleeper.slept.borrow().is_empty());
    }
}

#[test]
fn answer_without_image_is_empty_result() {
    let transport = ScriptedTransport::new(vec![Ok(GenerateResponse::default())]);
    let sleeper = RecordingSleeper::default();
    let mut machine = CaptureStateMachine::new(FakeCamera::granting(640, 480));
    machine.load_from_file(&png_file(64, 64)).unwrap();

    block_on(machine.run_generate(&client(&transport, &sleeper))).unwrap();
    assert_eq!(machine.state(), CaptureState::Error(ErrorKind::EmptyResult));
    assert_eq!(transport.calls(), 1);
}

#[test]
fn large_upload_is_bounded() {
    let mut machine = CaptureStateMachine::new(FakeCamera::granting(640, 480));
    machine.load_from_file(&png_file(3000, 2000)).unwrap();

    let captured = machine.session().captured().unwrap();
    assert_eq!((captured.width(), captured.height()), (1024, 683));
}

/// Drives a fresh machine into the named state.
fn drive_to(state: &str, machine: &mut CaptureStateMachine<FakeCamera>) {
    let idle = RecordingSleeper::default();
    match state {
        "awaiting" => {}
        "streaming" => {
            block_on(machine.run_camera_request()).unwrap();
        }
        "captured" => {
            block_on(machine.run_camera_request()).unwrap();
            machine.capture().unwrap();
        }
        "generating" => {
            machine.load_from_file(&png_file(16, 16)).unwrap();
            machine.begin_generate(RetryPolicy::default()).unwrap();
        }
        "complete" => {
            let transport = ScriptedTransport::new(vec![reply_with_image()]);
            machine.load_from_file(&png_file(16, 16)).unwrap();
            block_on(machine.run_generate(&client(&transport, &idle))).unwrap();
        }
        "error" => {
            let transport = ScriptedTransport::new(vec![Err(ErrorKind::RateLimited)]);
            machine.load_from_file(&png_file(16, 16)).unwrap();
            block_on(machine.run_generate(&client(&transport, &idle))).unwrap();
        }
        other => panic!("unknown state {other}"),
    }
}

#[test]
fn retake_from_any_state_leaves_one_stream_and_no_photo() {
    for name in [
        "awaiting",
        "streaming",
        "captured",
        "generating",
        "complete",
        "error",
    ] {
        let camera = FakeCamera::granting(320, 240);
        let mut machine = CaptureStateMachine::new(camera.clone());
        drive_to(name, &mut machine);

        block_on(machine.run_retake());

        assert!(camera.live.get() <= 1, "{name}: {} live streams", camera.live.get());
        assert!(machine.session().captured().is_none(), "{name}");
        assert!(machine.session().result().is_none(), "{name}");
        assert_eq!(machine.state(), CaptureState::Streaming, "{name}");
    }
}

#[test]
fn stale_generation_cannot_overwrite_new_session() {
    let transport = ScriptedTransport::new(vec![reply_with_image()]);
    let sleeper = RecordingSleeper::default();
    let inference = client(&transport, &sleeper);
    let mut machine = CaptureStateMachine::new(FakeCamera::granting(640, 480));
    machine.load_from_file(&png_file(16, 16)).unwrap();

    let ticket = machine.begin_generate(RetryPolicy::default()).unwrap();
    let pending = generation_for(&ticket, &inference);
    block_on(machine.run_retake());

    let result = block_on(pending);
    assert!(result.is_success());
    assert_eq!(machine.finish_generate(ticket, result), Transition::Discarded);
    assert_eq!(machine.state(), CaptureState::Streaming);
    assert!(machine.completed_pair().is_none());
}

#[test]
fn drag_across_container_is_monotonic() {
    let bounds = ContainerBounds {
        left: 40.0,
        width: 360.0,
    };
    let mut slider = SliderState::default();

    slider.handle(PointerInput::Down { x: bounds.left }, bounds);
    let mut trace = vec![slider.position()];
    let mut x = bounds.left;
    while x < bounds.left + bounds.width {
        x += 7.5;
        slider.handle(PointerInput::Move { x }, bounds);
        trace.push(slider.position());
    }
    slider.handle(PointerInput::Up, bounds);

    assert_eq!(trace.first(), Some(&0.0));
    assert_eq!(trace.last(), Some(&100.0));
    assert!(trace.windows(2).all(|pair| pair[0] <= pair[1]), "{trace:?}");
    assert!(!slider.is_dragging());
}
