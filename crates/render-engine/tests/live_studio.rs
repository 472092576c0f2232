use std::time::Duration;

use weever_capture_engine::{CaptureRequest, SessionState, SyntheticCaptureProvider};
use weever_common::config::{RenderSettings, ScrollSettings};
use weever_layer_model::{ScrollDirection, TextBanner};
use weever_render_engine::{LiveStudio, Studio};

fn settings() -> (RenderSettings, ScrollSettings) {
    let render = RenderSettings {
        refresh_hz: 200,
        placeholder_width: 64,
        placeholder_height: 36,
        ..RenderSettings::default()
    };
    let scroll = ScrollSettings { tick_interval_ms: 5 };
    (render, scroll)
}

fn live() -> LiveStudio {
    let (render, scroll) = settings();
    LiveStudio::start(Studio::with_font(&render, None), &render, &scroll)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(80)).await;
}

#[tokio::test]
async fn placeholder_renders_before_capture() {
    let live = live();
    settle().await;
    let presented = live.with_studio(|s| s.surface().frames_presented());
    assert!(presented > 0);
    assert!(live.is_rendering());
    live.shutdown().await;
}

#[tokio::test]
async fn no_frames_are_drawn_after_stop() {
    let live = live();
    let mut provider = SyntheticCaptureProvider::granting(320, 180);
    live.start_capture(&mut provider, &CaptureRequest::default()).unwrap();
    settle().await;
    assert_eq!(live.with_studio(|s| s.surface().dimensions()), (320, 180));

    let stats = live.stop_capture();
    assert!(stats.is_some_and(|s| s.frames_received > 0));
    let at_stop = live.with_studio(|s| s.surface().frames_presented());

    settle().await;
    assert_eq!(live.with_studio(|s| s.surface().frames_presented()), at_stop);
    assert!(!live.is_rendering());
    assert_eq!(
        live.with_studio(|s| s.session_status().state),
        SessionState::Idle
    );

    // Capture can be restarted and the loop resumes.
    live.start_capture(&mut provider, &CaptureRequest::default()).unwrap();
    settle().await;
    assert!(live.is_rendering());
    assert!(live.with_studio(|s| s.surface().frames_presented()) > at_stop);
    live.shutdown().await;
}

#[tokio::test]
async fn host_ending_the_source_stops_the_loop() {
    let live = live();
    let mut provider = SyntheticCaptureProvider::granting(320, 180);
    let revocation = provider.revocation();
    live.start_capture(&mut provider, &CaptureRequest::default()).unwrap();
    settle().await;

    revocation.revoke();
    settle().await;
    assert!(!live.is_rendering());
    assert!(!live.with_studio(|s| s.is_capturing()));

    let at_end = live.with_studio(|s| s.surface().frames_presented());
    settle().await;
    assert_eq!(live.with_studio(|s| s.surface().frames_presented()), at_end);
    live.shutdown().await;
}

#[tokio::test]
async fn scroll_animator_runs_independently() {
    let live = live();
    let id = live.with_studio(|s| {
        s.add_text(TextBanner::new("BREAKING").with_scroll(ScrollDirection::Horizontal, 3))
    });
    settle().await;
    let offset = live.with_studio(|s| s.model().get(id).unwrap().text_banner().unwrap().scroll.offset);
    assert!(offset < 0.0);

    // Removing the layer also removes its animation state.
    live.with_studio(|s| s.remove_layer(id));
    settle().await;
    assert!(live.with_studio(|s| s.model().is_empty()));
    live.shutdown().await;
}
