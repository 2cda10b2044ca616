//! Counting mock device, surface, window and recorder for lifecycle tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;
use ash::vk::Handle;

use vkchain_platform::PresentWindow;
use vkchain_renderer::{FrameRecorder, RecordTarget};
use vkchain_rhi::physical_device::QueueFamilyIndices;
use vkchain_rhi::surface::PresentSurface;
use vkchain_rhi::swapchain::SwapchainSupportDetails;
use vkchain_rhi::{FrameSubmission, GpuDevice, RhiError, RhiResult};

/// Kind of object tracked by [`MockDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Semaphore,
    Fence,
    Image,
    Memory,
    ImageView,
    Framebuffer,
    Swapchain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Created(Kind, u64),
    Destroyed(Kind, u64),
    WaitIdle,
    Acquire,
    Submit,
    Present,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Signaled,
    Unsignaled,
    Pending,
}

/// What the driver passed to `create_swapchain`.
#[derive(Debug, Clone)]
pub struct SwapchainRequest {
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub min_image_count: u32,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
    pub old_swapchain: vk::SwapchainKHR,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    live: HashMap<Kind, usize>,
    created: HashMap<Kind, usize>,
    events: Vec<Event>,
    fences: HashMap<u64, FenceState>,
    // command buffer -> fence armed by its last submission
    armed_by: HashMap<u64, u64>,
    swapchain_images: HashMap<u64, u32>,
    swapchain_requests: Vec<SwapchainRequest>,
    next_image: u32,
    acquire_script: VecDeque<Result<(u32, bool), vk::Result>>,
    present_script: VecDeque<Result<bool, vk::Result>>,
    submissions: Vec<FrameSubmission>,
    violations: Vec<String>,
    wait_idle_calls: usize,
}

impl Inner {
    fn create(&mut self, kind: Kind) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        *self.live.entry(kind).or_default() += 1;
        *self.created.entry(kind).or_default() += 1;
        self.events.push(Event::Created(kind, id));
        id
    }

    fn destroy(&mut self, kind: Kind, id: u64) {
        let live = self.live.entry(kind).or_default();
        if *live == 0 {
            self.violations
                .push(format!("{:?} {} destroyed with none live", kind, id));
        } else {
            *live -= 1;
        }
        self.events.push(Event::Destroyed(kind, id));
    }
}

/// A [`GpuDevice`] that hands out sequential handles and records every call.
///
/// Fences are simulated: a submission leaves its fence pending until the
/// next wait on it (or a device-wide wait idle) completes it.
pub struct MockDevice {
    inner: Mutex<Inner>,
    families: QueueFamilyIndices,
    extra_images: u32,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Self::with_families(QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        })
    }

    pub fn with_families(families: QueueFamilyIndices) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            families,
            extra_images: 0,
        })
    }

    /// Device whose swapchains hold `extra` images more than requested.
    pub fn with_extra_images(extra: u32) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            families: QueueFamilyIndices {
                graphics_family: Some(0),
                present_family: Some(0),
            },
            extra_images: extra,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn script_acquire(&self, result: Result<(u32, bool), vk::Result>) {
        self.lock().acquire_script.push_back(result);
    }

    pub fn script_present(&self, result: Result<bool, vk::Result>) {
        self.lock().present_script.push_back(result);
    }

    pub fn live(&self, kind: Kind) -> usize {
        self.lock().live.get(&kind).copied().unwrap_or(0)
    }

    pub fn created(&self, kind: Kind) -> usize {
        self.lock().created.get(&kind).copied().unwrap_or(0)
    }

    pub fn events(&self) -> Vec<Event> {
        self.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    pub fn swapchain_requests(&self) -> Vec<SwapchainRequest> {
        self.lock().swapchain_requests.clone()
    }

    pub fn submissions(&self) -> Vec<FrameSubmission> {
        self.lock().submissions.clone()
    }

    pub fn violations(&self) -> Vec<String> {
        self.lock().violations.clone()
    }

    pub fn wait_idle_calls(&self) -> usize {
        self.lock().wait_idle_calls
    }

    /// Kinds of every destroyed object, in destruction order.
    pub fn destroyed_kinds(&self) -> Vec<Kind> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Destroyed(kind, _) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn count_events(&self, wanted: Event) -> usize {
        self.lock().events.iter().filter(|e| **e == wanted).count()
    }

    /// Live swapchain-dependent objects: swapchains, color and depth views,
    /// depth images and memory, framebuffers.
    pub fn live_swapchain_objects(&self) -> usize {
        [
            Kind::Swapchain,
            Kind::ImageView,
            Kind::Framebuffer,
            Kind::Image,
            Kind::Memory,
        ]
        .iter()
        .map(|kind| self.live(*kind))
        .sum()
    }
}

impl GpuDevice for MockDevice {
    type Memory = u64;

    fn physical_device(&self) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(0x1)
    }

    fn queue_families(&self) -> QueueFamilyIndices {
        self.families
    }

    fn wait_idle(&self) -> RhiResult<()> {
        let mut inner = self.lock();
        inner.wait_idle_calls += 1;
        inner.events.push(Event::WaitIdle);
        for state in inner.fences.values_mut() {
            if *state == FenceState::Pending {
                *state = FenceState::Signaled;
            }
        }
        Ok(())
    }

    fn create_semaphore(&self) -> RhiResult<vk::Semaphore> {
        Ok(vk::Semaphore::from_raw(self.lock().create(Kind::Semaphore)))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.lock().destroy(Kind::Semaphore, semaphore.as_raw());
    }

    fn create_fence(&self, signaled: bool) -> RhiResult<vk::Fence> {
        let mut inner = self.lock();
        let id = inner.create(Kind::Fence);
        let state = if signaled {
            FenceState::Signaled
        } else {
            FenceState::Unsignaled
        };
        inner.fences.insert(id, state);
        Ok(vk::Fence::from_raw(id))
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut inner = self.lock();
        if inner.fences.remove(&fence.as_raw()) == Some(FenceState::Pending) {
            inner
                .violations
                .push(format!("fence {} destroyed while pending", fence.as_raw()));
        }
        inner.destroy(Kind::Fence, fence.as_raw());
    }

    fn wait_for_fence(&self, fence: vk::Fence, _timeout: u64) -> RhiResult<()> {
        let mut inner = self.lock();
        match inner.fences.get(&fence.as_raw()).copied() {
            Some(FenceState::Signaled) => Ok(()),
            Some(FenceState::Pending) => {
                inner.fences.insert(fence.as_raw(), FenceState::Signaled);
                Ok(())
            }
            Some(FenceState::Unsignaled) => {
                inner
                    .violations
                    .push(format!("wait on unsubmitted fence {}", fence.as_raw()));
                Err(RhiError::from_call("vkWaitForFences", vk::Result::TIMEOUT))
            }
            None => Err(RhiError::InvalidArgument("unknown fence".to_string())),
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> RhiResult<()> {
        let mut inner = self.lock();
        if inner.fences.get(&fence.as_raw()) == Some(&FenceState::Pending) {
            inner
                .violations
                .push(format!("reset of pending fence {}", fence.as_raw()));
        }
        inner.fences.insert(fence.as_raw(), FenceState::Unsignaled);
        Ok(())
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        let optimal_tiling_features = if format == vk::Format::D32_SFLOAT {
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::FormatFeatureFlags::empty()
        };
        vk::FormatProperties {
            optimal_tiling_features,
            ..Default::default()
        }
    }

    fn create_image(&self, _info: &vk::ImageCreateInfo<'_>) -> RhiResult<vk::Image> {
        Ok(vk::Image::from_raw(self.lock().create(Kind::Image)))
    }

    fn allocate_image_memory(&self, _image: vk::Image, _name: &str) -> RhiResult<u64> {
        Ok(self.lock().create(Kind::Memory))
    }

    fn destroy_image(&self, image: vk::Image) {
        self.lock().destroy(Kind::Image, image.as_raw());
    }

    fn free_memory(&self, memory: u64) {
        self.lock().destroy(Kind::Memory, memory);
    }

    fn create_image_view(
        &self,
        _image: vk::Image,
        _format: vk::Format,
        _aspect: vk::ImageAspectFlags,
    ) -> RhiResult<vk::ImageView> {
        Ok(vk::ImageView::from_raw(self.lock().create(Kind::ImageView)))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.lock().destroy(Kind::ImageView, view.as_raw());
    }

    fn transition_image_layout(
        &self,
        _image: vk::Image,
        _aspect: vk::ImageAspectFlags,
        _old_layout: vk::ImageLayout,
        _new_layout: vk::ImageLayout,
    ) -> RhiResult<()> {
        Ok(())
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        _extent: vk::Extent2D,
    ) -> RhiResult<vk::Framebuffer> {
        let mut inner = self.lock();
        if attachments.len() != 2 {
            inner
                .violations
                .push(format!("framebuffer with {} attachments", attachments.len()));
        }
        Ok(vk::Framebuffer::from_raw(inner.create(Kind::Framebuffer)))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.lock().destroy(Kind::Framebuffer, framebuffer.as_raw());
    }

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR<'_>) -> RhiResult<vk::SwapchainKHR> {
        let queue_family_indices = if info.queue_family_index_count == 0 {
            Vec::new()
        } else {
            // SAFETY: the builder set both pointer and count from one slice
            // that outlives this call.
            unsafe {
                std::slice::from_raw_parts(
                    info.p_queue_family_indices,
                    info.queue_family_index_count as usize,
                )
            }
            .to_vec()
        };

        let mut inner = self.lock();
        let id = inner.create(Kind::Swapchain);
        inner
            .swapchain_images
            .insert(id, info.min_image_count + self.extra_images);
        inner.swapchain_requests.push(SwapchainRequest {
            extent: info.image_extent,
            format: info.image_format,
            min_image_count: info.min_image_count,
            sharing_mode: info.image_sharing_mode,
            queue_family_indices,
            old_swapchain: info.old_swapchain,
        });
        inner.next_image = 0;
        Ok(vk::SwapchainKHR::from_raw(id))
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> RhiResult<Vec<vk::Image>> {
        let inner = self.lock();
        let count = inner
            .swapchain_images
            .get(&swapchain.as_raw())
            .copied()
            .ok_or_else(|| RhiError::InvalidArgument("unknown swapchain".to_string()))?;
        // presentable images are owned by the swapchain, not tracked as Image
        Ok((0..count)
            .map(|i| vk::Image::from_raw(0xF000_0000 + swapchain.as_raw() * 16 + u64::from(i)))
            .collect())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut inner = self.lock();
        inner.swapchain_images.remove(&swapchain.as_raw());
        inner.destroy(Kind::Swapchain, swapchain.as_raw());
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout: u64,
        _semaphore: vk::Semaphore,
    ) -> Result<(u32, bool), vk::Result> {
        let mut inner = self.lock();
        inner.events.push(Event::Acquire);
        if let Some(result) = inner.acquire_script.pop_front() {
            return result;
        }
        let count = inner
            .swapchain_images
            .get(&swapchain.as_raw())
            .copied()
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)?;
        let index = inner.next_image % count;
        inner.next_image += 1;
        Ok((index, false))
    }

    fn queue_present(
        &self,
        _swapchain: vk::SwapchainKHR,
        _image_index: u32,
        _wait_semaphore: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let mut inner = self.lock();
        inner.events.push(Event::Present);
        inner.present_script.pop_front().unwrap_or(Ok(false))
    }

    fn reset_command_buffer(&self, command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        let mut inner = self.lock();
        if let Some(fence) = inner.armed_by.get(&command_buffer.as_raw()).copied()
            && inner.fences.get(&fence) == Some(&FenceState::Pending)
        {
            inner.violations.push(format!(
                "command buffer {} reset while fence {} pending",
                command_buffer.as_raw(),
                fence
            ));
        }
        Ok(())
    }

    fn begin_command_buffer(&self, _command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        Ok(())
    }

    fn end_command_buffer(&self, _command_buffer: vk::CommandBuffer) -> RhiResult<()> {
        Ok(())
    }

    fn submit_graphics(&self, submission: &FrameSubmission) -> RhiResult<()> {
        let mut inner = self.lock();
        let fence = submission.fence.as_raw();
        if inner.fences.get(&fence) != Some(&FenceState::Unsignaled) {
            inner
                .violations
                .push(format!("submit with fence {} not reset", fence));
        }
        inner.fences.insert(fence, FenceState::Pending);
        inner
            .armed_by
            .insert(submission.command_buffer.as_raw(), fence);
        inner.events.push(Event::Submit);
        inner.submissions.push(*submission);
        Ok(())
    }
}

pub fn surface_capabilities(current: (u32, u32)) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: 2,
        max_image_count: 8,
        current_extent: vk::Extent2D {
            width: current.0,
            height: current.1,
        },
        min_image_extent: vk::Extent2D {
            width: 1,
            height: 1,
        },
        max_image_extent: vk::Extent2D {
            width: 4096,
            height: 4096,
        },
        current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        ..Default::default()
    }
}

/// A surface whose capabilities follow the window size by default.
pub struct MockSurface {
    support: Mutex<SwapchainSupportDetails>,
    // fixed extents reported by the next queries, with no lower bound
    lagging: Mutex<VecDeque<(u32, u32)>>,
    queries: Mutex<usize>,
}

impl MockSurface {
    /// Surface that defers its extent to the window.
    pub fn new() -> Self {
        Self::with_current_extent((u32::MAX, u32::MAX))
    }

    pub fn with_current_extent(current: (u32, u32)) -> Self {
        Self {
            support: Mutex::new(SwapchainSupportDetails {
                capabilities: surface_capabilities(current),
                formats: vec![vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                }],
                present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            }),
            lagging: Mutex::new(VecDeque::new()),
            queries: Mutex::new(0),
        }
    }

    pub fn set_formats(&self, formats: Vec<vk::SurfaceFormatKHR>) {
        self.support.lock().unwrap().formats = formats;
    }

    /// Makes the next query report `current` as a fixed extent with a zero
    /// minimum, as a surface still catching up with its window does.
    pub fn lag(&self, current: (u32, u32)) {
        self.lagging.lock().unwrap().push_back(current);
    }

    pub fn queries(&self) -> usize {
        *self.queries.lock().unwrap()
    }
}

impl PresentSurface for MockSurface {
    fn handle(&self) -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(0x5)
    }

    fn query_support(&self, _physical_device: vk::PhysicalDevice) -> RhiResult<SwapchainSupportDetails> {
        *self.queries.lock().unwrap() += 1;
        let mut support = self.support.lock().unwrap().clone();
        if let Some((width, height)) = self.lagging.lock().unwrap().pop_front() {
            support.capabilities.current_extent = vk::Extent2D { width, height };
            support.capabilities.min_image_extent = vk::Extent2D::default();
        }
        Ok(support)
    }
}

/// A window whose size changes on each `wait_events`/`poll_events` call.
///
/// Once the scripted sizes run out the size stays put; waiting on a window
/// that still has no area then requests close instead of blocking forever.
pub struct MockWindow {
    size: (u32, u32),
    pending: VecDeque<(u32, u32)>,
    close_requested: bool,
    resized: bool,
    pub waits: usize,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            pending: VecDeque::new(),
            close_requested: false,
            resized: false,
            waits: 0,
        }
    }

    /// Queues sizes delivered one per event pump.
    pub fn then(mut self, width: u32, height: u32) -> Self {
        self.pending.push_back((width, height));
        self
    }

    /// Changes the size immediately, as a resize event would.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resized = true;
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    fn advance(&mut self) {
        if let Some(size) = self.pending.pop_front() {
            self.size = size;
            self.resized = true;
        } else if !self.has_area() {
            self.close_requested = true;
        }
    }
}

impl PresentWindow for MockWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn close_requested(&self) -> bool {
        self.close_requested
    }

    fn wait_events(&mut self) {
        self.waits += 1;
        self.advance();
    }

    fn poll_events(&mut self) {
        self.advance();
    }

    fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }
}

/// Records the targets it is handed.
#[derive(Default)]
pub struct MockRecorder {
    pub targets: Vec<RecordTarget>,
    pub fail: bool,
}

impl FrameRecorder<MockDevice> for MockRecorder {
    fn render_pass(&self) -> vk::RenderPass {
        vk::RenderPass::from_raw(0xABC)
    }

    fn record(&mut self, _device: &MockDevice, target: &RecordTarget) -> RhiResult<()> {
        if self.fail {
            return Err(RhiError::InvalidArgument("recording failed".to_string()));
        }
        self.targets.push(*target);
        Ok(())
    }
}

/// One command buffer handle per frame slot.
pub fn command_buffers() -> Vec<vk::CommandBuffer> {
    (0..vkchain_renderer::MAX_FRAMES_IN_FLIGHT as u64)
        .map(|i| vk::CommandBuffer::from_raw(0xC000 + i))
        .collect()
}
