// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Session lifecycle driven through a headless window and the software renderer.

use vesta_core::input::{ControllerInfo, GamepadKind, MouseButton};
use vesta_core::platform::WindowFlags;
use vesta_core::renderer::{ClearCommand, Color, RenderError, Renderer, RendererDeviceType};
use vesta_core::{PlatformEvent, SessionState, StartupDescriptor};
use vesta_infra::startup_headless;

fn descriptor() -> StartupDescriptor {
    StartupDescriptor {
        window_title: "Lifecycle".to_string(),
        application_name: "vesta-lifecycle-test".to_string(),
        width: 32,
        height: 16,
        renderer: Renderer::Software,
        ..StartupDescriptor::default()
    }
}

fn collect(session: &mut vesta_core::Session) -> Vec<PlatformEvent> {
    let mut events = Vec::new();
    session.poll_events(|event| events.push(event.clone()));
    events
}

#[test]
fn frames_run_until_exit_is_requested() {
    let (mut session, injector) = startup_headless(descriptor()).unwrap();
    assert_eq!(session.state(), SessionState::Running);
    assert!(session.is_running());
    assert_eq!(session.device_ref().adapter_info().device_type, RendererDeviceType::Cpu);
    assert_eq!(session.device_ref().backbuffer_size(), (32, 16));

    for frame in 1..=3u64 {
        session.begin_frame().unwrap();
        session.clear(&ClearCommand::color(Color::BLUE)).unwrap();
        assert!(collect(&mut session).is_empty());
        let stats = session.end_frame().unwrap();
        assert_eq!(stats.frame_number, frame);
        assert_eq!(stats.clear_calls, 1);
    }

    injector.request_exit();
    session.begin_frame().unwrap();
    assert_eq!(collect(&mut session), vec![PlatformEvent::ExitRequested]);
    session.end_frame().unwrap();

    assert!(!session.is_running());
    assert_eq!(session.frame_count(), 4);
    assert_eq!(session.shutdown(), SessionState::Uninitialized);
}

#[test]
fn misordered_frame_calls_are_rejected() {
    let (mut session, _injector) = startup_headless(descriptor()).unwrap();

    assert!(matches!(session.end_frame(), Err(RenderError::InvalidState { .. })));
    assert!(matches!(
        session.clear(&ClearCommand::color(Color::RED)),
        Err(RenderError::InvalidState { .. })
    ));

    session.begin_frame().unwrap();
    assert!(matches!(session.begin_frame(), Err(RenderError::InvalidState { .. })));
    session.end_frame().unwrap();
}

#[test]
fn events_are_delivered_in_arrival_order() {
    let (mut session, injector) = startup_headless(descriptor()).unwrap();
    let pad = ControllerInfo {
        index: 0,
        name: "Wireless Controller".to_string(),
        button_count: 15,
        axis_count: 6,
        is_gamepad: true,
        vendor: 0x054C,
        product: 0x0CE6,
        version: 0x8111,
    };

    injector.push(PlatformEvent::ControllerConnected(pad.clone()));
    injector.push(PlatformEvent::ControllerAxis {
        index: 0,
        axis: 1,
        value: -0.5,
    });
    injector.push(PlatformEvent::MouseButton {
        button: MouseButton::Left,
        pressed: true,
    });
    injector.push(PlatformEvent::ControllerDisconnected { index: 0 });

    let events = collect(&mut session);
    assert_eq!(events.len(), 4);
    match &events[0] {
        PlatformEvent::ControllerConnected(info) => {
            assert_eq!(info.gamepad_kind(), Some(GamepadKind::DualShock5));
        }
        other => panic!("unexpected first event {other:?}"),
    }
    assert_eq!(events[3], PlatformEvent::ControllerDisconnected { index: 0 });
    assert!(session.is_running());
}

#[test]
fn resizing_the_window_resizes_the_backbuffer() {
    let (mut session, _injector) = startup_headless(descriptor()).unwrap();

    session.set_size(64, 48);
    let events = collect(&mut session);

    assert_eq!(
        events,
        vec![PlatformEvent::WindowResized {
            width: 64,
            height: 48
        }]
    );
    assert_eq!(session.size_in_pixels(), (64, 48));
    assert_eq!(session.device_ref().backbuffer_size(), (64, 48));
}

#[test]
fn window_properties_pass_through() {
    let (mut session, _injector) = startup_headless(descriptor()).unwrap();
    assert_eq!(session.title(), "Lifecycle");

    session.set_title("Renamed");
    session.set_flags(WindowFlags::FULLSCREEN);
    session.set_clipboard("clip");

    assert_eq!(session.title(), "Renamed");
    assert_eq!(session.flags(), WindowFlags::FULLSCREEN);
    assert_eq!(session.clipboard().as_deref(), Some("clip"));
}
