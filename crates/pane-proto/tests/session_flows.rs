//! Integration test: protocol handler flows over both dispatchers.

use std::sync::Arc;

use pane_core::{Arg, ClientEvent, ClientId, HandleError, Message, SegmentId, ServerEvent};
use pane_pool::Reaper;
use pane_proto::{
    client_dispatcher, server_dispatcher, ClientConnection, ClientSession, Clipboard,
    SessionConfig,
};
use pane_test_utils::{assert_pool_consistent, MemoryClipboard, RecordingBroadcaster};

fn segment_update(id: i32, pixels: Vec<u32>) -> Message<ServerEvent> {
    Message::new(
        ServerEvent::ScreenSegmentUpdate,
        vec![Arg::Int(id), Arg::Pixels(pixels)],
    )
}

#[test]
fn full_screen_refresh_reuses_one_buffer_per_segment_size() {
    // 10x6 screen, 4x4 segments: a 3x2 grid clipped on the right and bottom.
    let config = SessionConfig::new(10, 6, 4, 4);
    let reaper = Reaper::spawn().unwrap();
    let mut session = ClientSession::with_reaper(
        &config,
        Arc::new(Clipboard::new(MemoryClipboard::new())),
        reaper.handle(),
    )
    .unwrap();
    let dispatcher = client_dispatcher();

    for _refresh in 0..3 {
        for id in 0..session.framebuffer().segment_count() as i32 {
            let len = session.framebuffer().segment_len(SegmentId(id)).unwrap();
            let pixels = vec![id as u32 + 1; len];
            dispatcher
                .dispatch(&mut session, &segment_update(id, pixels))
                .unwrap();
        }
    }

    // Segment sizes are 16, 16, 8 / 8, 8, 4: one buffer per distinct size.
    let stats = session.pool_stats();
    assert_eq!(stats.created, 3);
    assert_eq!(stats.created + stats.reused, 18);
    assert_pool_consistent(session.pixel_pool());

    let fb = session.framebuffer();
    assert_eq!(fb.pixels()[0], 1);
    assert_eq!(fb.pixels()[9], 3);
    assert_eq!(fb.pixels()[59], 6);

    dispatcher
        .dispatch(&mut session, &Message::bare(ServerEvent::ConnectionClosed))
        .unwrap();
    reaper.handle().sync().unwrap();
    assert!(session.pixel_pool().is_empty());
    assert_eq!(session.pool_stats().reaped, 3);
    reaper.shutdown().unwrap();
}

#[test]
fn clipboard_round_trip_between_client_and_server() {
    let peers = Arc::new(RecordingBroadcaster::new());
    let server_host = MemoryClipboard::new();
    let server_clipboard = Arc::new(Clipboard::new(server_host.clone()));
    let mut conn = ClientConnection::new(
        ClientId(42),
        Arc::clone(&server_clipboard),
        peers.clone(),
        true,
    );

    let payload = vec![
        Arg::Text("text/plain".into()),
        Arg::Bytes(b"shared".to_vec()),
    ];
    server_dispatcher()
        .dispatch(
            &mut conn,
            &Message::new(ClientEvent::SetClipboard, payload.clone()),
        )
        .unwrap();

    assert_eq!(server_host.set_count(), 1);
    assert_eq!(server_host.contents().get("text/plain"), Some(&b"shared"[..]));
    let sent = peers.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ClientId(42));
    assert_eq!(sent[0].1, Message::bare(ServerEvent::ClipboardChanged));

    // Another client receives the contents and applies them locally.
    let mut config = SessionConfig::new(8, 8, 8, 8);
    config.synchronize_clipboard = true;
    let client_host = MemoryClipboard::new();
    let mut session =
        ClientSession::new(&config, Arc::new(Clipboard::new(client_host.clone()))).unwrap();
    client_dispatcher()
        .dispatch(&mut session, &Message::new(ServerEvent::SetClipboard, payload))
        .unwrap();
    assert_eq!(client_host.contents(), server_host.contents());
    assert!(session.clipboard().monitor().is_enabled());
}

#[test]
fn unregistered_events_are_unhandled() {
    let config = SessionConfig::new(4, 4, 2, 2);
    let mut session =
        ClientSession::new(&config, Arc::new(Clipboard::new(MemoryClipboard::new()))).unwrap();
    let err = client_dispatcher()
        .dispatch(&mut session, &Message::bare(ServerEvent::CursorGone))
        .unwrap_err();
    assert_eq!(err, HandleError::Unhandled { event: "CURSOR_GONE" });
}
