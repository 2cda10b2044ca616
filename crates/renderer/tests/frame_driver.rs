//! Integration tests for the acquire, record, submit, present loop.

mod common;

use std::sync::Arc;

use ash::vk;

use vkchain_platform::PresentWindow;
use vkchain_renderer::frame_sync::FrameSyncRegistry;
use vkchain_renderer::{FrameDriver, FramePhase, FrameStatus, MAX_FRAMES_IN_FLIGHT};
use vkchain_rhi::RhiError;

use common::{Event, Kind, MockDevice, MockRecorder, MockSurface, MockWindow};

type TestDriver = FrameDriver<MockDevice, MockSurface, MockRecorder>;

fn new_driver(device: &Arc<MockDevice>, window: &mut MockWindow) -> TestDriver {
    FrameDriver::new(
        device.clone(),
        MockSurface::new(),
        MockRecorder::default(),
        common::command_buffers(),
        window,
    )
    .unwrap()
}

fn presented(slot: usize, image_index: u32, recreated: bool) -> FrameStatus {
    FrameStatus::Presented {
        slot,
        image_index,
        recreated,
    }
}

#[test]
fn test_slots_rotate_without_unfenced_reuse() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    let statuses: Vec<_> = (0..4)
        .map(|_| driver.render_frame(&mut window).unwrap())
        .collect();

    assert_eq!(
        statuses,
        vec![
            presented(0, 0, false),
            presented(1, 1, false),
            presented(0, 2, false),
            presented(1, 0, false),
        ]
    );
    assert_eq!(driver.frame_counter(), 4);
    assert_eq!(driver.current_slot(), 0);
    assert_eq!(driver.phase(), FramePhase::Idle);
    assert_eq!(driver.recreations(), 0);

    let submissions = device.submissions();
    let command_buffers = common::command_buffers();
    assert_eq!(submissions.len(), 4);
    for (frame, submission) in submissions.iter().enumerate() {
        let slot = frame % MAX_FRAMES_IN_FLIGHT;
        assert_eq!(submission.command_buffer, command_buffers[slot]);
        assert_eq!(submission.fence, submissions[slot].fence);
    }
    assert_ne!(submissions[0].fence, submissions[1].fence);

    assert!(device.violations().is_empty(), "{:?}", device.violations());
}

#[test]
fn test_submission_orders_semaphores() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    driver.render_frame(&mut window).unwrap();
    driver.render_frame(&mut window).unwrap();

    let submissions = device.submissions();
    for submission in &submissions {
        assert_eq!(
            submission.wait_stage,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        );
        assert_ne!(submission.wait_semaphore, submission.signal_semaphore);
    }
    // each slot has its own pair
    assert_ne!(submissions[0].wait_semaphore, submissions[1].wait_semaphore);
    assert_ne!(submissions[0].signal_semaphore, submissions[1].signal_semaphore);

    let events = device.events();
    let order: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::Acquire | Event::Submit | Event::Present))
        .copied()
        .collect();
    assert_eq!(
        order,
        vec![
            Event::Acquire,
            Event::Submit,
            Event::Present,
            Event::Acquire,
            Event::Submit,
            Event::Present,
        ]
    );
}

#[test]
fn test_recorder_receives_matching_framebuffer() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    driver.render_frame(&mut window).unwrap();
    driver.render_frame(&mut window).unwrap();

    let state = driver.swapchain_state().unwrap();
    let targets = &driver.recorder().targets;
    assert_eq!(targets.len(), 2);
    for target in targets {
        assert_eq!(target.framebuffer, state.framebuffer(target.image_index).unwrap());
        assert_eq!(target.extent, vk::Extent2D { width: 800, height: 600 });
    }
    assert_eq!(targets[1].slot, 1);
}

#[test]
fn test_acquire_out_of_date_skips_frame() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    device.script_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
    let status = driver.render_frame(&mut window).unwrap();

    assert_eq!(status, FrameStatus::Skipped);
    assert_eq!(driver.frame_counter(), 0);
    assert_eq!(driver.recreations(), 1);
    assert_eq!(device.count_events(Event::Submit), 0);
    assert_eq!(device.count_events(Event::Present), 0);

    // the slot's fence was never reset, so the retry does not block
    let status = driver.render_frame(&mut window).unwrap();
    assert_eq!(status, presented(0, 0, false));
    assert!(device.violations().is_empty(), "{:?}", device.violations());
}

#[test]
fn test_suboptimal_acquire_recreates_after_present() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    device.script_acquire(Ok((1, true)));
    let status = driver.render_frame(&mut window).unwrap();

    assert_eq!(status, presented(0, 1, true));
    assert_eq!(driver.frame_counter(), 1);
    assert_eq!(driver.recreations(), 1);
    assert_eq!(device.count_events(Event::Present), 1);
}

#[test]
fn test_present_out_of_date_recreates() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    device.script_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
    let status = driver.render_frame(&mut window).unwrap();

    assert_eq!(status, presented(0, 0, true));
    assert_eq!(driver.frame_counter(), 1);
    assert_eq!(driver.recreations(), 1);
}

#[test]
fn test_present_suboptimal_recreates() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    device.script_present(Ok(true));
    let status = driver.render_frame(&mut window).unwrap();

    assert_eq!(status, presented(0, 0, true));
    assert_eq!(driver.recreations(), 1);
}

#[test]
fn test_notify_resized_recreates_at_new_size() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    window.resize(1024, 768);
    assert!(window.take_resized());
    driver.notify_resized();
    let status = driver.render_frame(&mut window).unwrap();

    assert_eq!(status, presented(0, 0, true));
    assert_eq!(driver.extent(), Some(vk::Extent2D { width: 1024, height: 768 }));

    // the flag is consumed
    let status = driver.render_frame(&mut window).unwrap();
    assert_eq!(status, presented(1, 0, false));
    assert_eq!(driver.recreations(), 1);
}

#[test]
fn test_sync_objects_survive_recreation() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);
    let baseline = device.live_swapchain_objects();

    for size in [(1024, 768), (640, 480), (1920, 1080)] {
        window.resize(size.0, size.1);
        driver.notify_resized();
        driver.render_frame(&mut window).unwrap();
        assert_eq!(device.live_swapchain_objects(), baseline);
    }

    assert_eq!(driver.recreations(), 3);
    assert_eq!(device.created(Kind::Semaphore), 2 * MAX_FRAMES_IN_FLIGHT);
    assert_eq!(device.created(Kind::Fence), MAX_FRAMES_IN_FLIGHT);
    assert_eq!(device.live(Kind::Semaphore), 2 * MAX_FRAMES_IN_FLIGHT);
    assert_eq!(device.live(Kind::Fence), MAX_FRAMES_IN_FLIGHT);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
}

#[test]
fn test_minimized_window_stalls_recreation() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600).then(0, 600).then(0, 600).then(640, 480);
    let mut driver = new_driver(&device, &mut window);

    window.poll_events();
    assert!(!window.has_area());
    assert!(window.take_resized());
    driver.notify_resized();
    driver.render_frame(&mut window).unwrap();

    assert_eq!(window.waits, 2);
    let extents: Vec<_> = device
        .swapchain_requests()
        .iter()
        .map(|r| r.extent)
        .collect();
    assert_eq!(
        extents,
        vec![
            vk::Extent2D { width: 800, height: 600 },
            vk::Extent2D { width: 640, height: 480 },
        ]
    );
}

#[test]
fn test_zero_surface_extent_does_not_lose_swapchain() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    driver.surface().lag((0, 0));
    driver.notify_resized();
    let status = driver.render_frame(&mut window).unwrap();

    assert_eq!(status, presented(0, 0, true));
    assert_eq!(window.waits, 1);
    assert_eq!(driver.extent(), Some(vk::Extent2D { width: 800, height: 600 }));
    assert!(
        device
            .swapchain_requests()
            .iter()
            .all(|r| r.extent.width > 0 && r.extent.height > 0)
    );

    let status = driver.render_frame(&mut window).unwrap();
    assert_eq!(status, presented(1, 0, false));
}

#[test]
fn test_fatal_acquire_error_propagates() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    device.script_acquire(Err(vk::Result::ERROR_DEVICE_LOST));
    let result = driver.render_frame(&mut window);

    assert!(matches!(
        result,
        Err(RhiError::VulkanCallError {
            call: "vkAcquireNextImageKHR",
            ..
        })
    ));
    assert_eq!(driver.phase(), FramePhase::Idle);
    assert_eq!(driver.frame_counter(), 0);
}

#[test]
fn test_failed_recreation_leaves_driver_unavailable() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    driver.surface().set_formats(Vec::new());
    driver.notify_resized();
    let result = driver.render_frame(&mut window);
    assert!(matches!(result, Err(RhiError::ConfigurationError(_))));
    assert!(driver.extent().is_none());
    assert_eq!(device.live_swapchain_objects(), 0);

    let result = driver.render_frame(&mut window);
    assert!(matches!(result, Err(RhiError::SwapchainUnavailable)));
}

#[test]
fn test_recording_failure_leaves_fence_signaled() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let recorder = MockRecorder {
        fail: true,
        ..Default::default()
    };
    let mut driver = FrameDriver::new(
        device.clone(),
        MockSurface::new(),
        recorder,
        common::command_buffers(),
        &mut window,
    )
    .unwrap();

    assert!(driver.render_frame(&mut window).is_err());
    assert!(driver.render_frame(&mut window).is_err());

    assert_eq!(device.count_events(Event::Submit), 0);
    assert!(device.violations().is_empty(), "{:?}", device.violations());
}

#[test]
fn test_registry_wraps_at_slot_count() {
    let device = MockDevice::new();
    let sync = FrameSyncRegistry::new(&device, 3).unwrap();

    assert_eq!(sync.slot_count(), 3);
    let slots: Vec<_> = (0..7).map(|frame| sync.slot(frame)).collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
    assert!(sync.get(2).is_some());
    assert!(sync.get(sync.slot_count()).is_none());

    assert!(matches!(
        FrameSyncRegistry::new(&device, 0),
        Err(RhiError::InvalidArgument(_))
    ));
}

#[test]
fn test_command_buffer_count_must_match_slots() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut command_buffers = common::command_buffers();
    command_buffers.pop();

    let result = FrameDriver::new(
        device.clone(),
        MockSurface::new(),
        MockRecorder::default(),
        command_buffers,
        &mut window,
    );

    assert!(matches!(result, Err(RhiError::InvalidArgument(_))));
    assert_eq!(device.created(Kind::Fence), 0);
    assert_eq!(device.created(Kind::Swapchain), 0);
}

#[test]
fn test_drop_waits_idle_and_releases_everything() {
    let device = MockDevice::new();
    let mut window = MockWindow::new(800, 600);
    let mut driver = new_driver(&device, &mut window);

    driver.render_frame(&mut window).unwrap();
    driver.render_frame(&mut window).unwrap();
    drop(driver);

    assert_eq!(device.wait_idle_calls(), 1);
    assert_eq!(device.live_swapchain_objects(), 0);
    assert_eq!(device.live(Kind::Semaphore), 0);
    assert_eq!(device.live(Kind::Fence), 0);
    // pending fences were completed by the idle wait before destruction
    assert!(device.violations().is_empty(), "{:?}", device.violations());
}
