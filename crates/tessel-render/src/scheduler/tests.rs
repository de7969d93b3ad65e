// SPDX-License-Identifier: CEPL-1.0
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use super::*;
use crate::{
    choose_extent, choose_image_count, ManualClock, ResizeFlag, SurfaceLimits, UNDEFINED_EXTENT,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Call {
    CreateSlots(usize),
    Build(RenderSize),
    Destroy,
    Record,
    /// `blocked` is true when the fence still guarded unwaited work.
    Wait { slot: usize, blocked: bool },
    Reset(usize),
    Acquire(usize),
    Write(usize),
    Submit { slot: usize, image: usize },
    Present { slot: usize, image: usize },
    WaitIdle,
}

enum Presented {
    Status(PresentStatus),
    DeviceLost,
}

/// A device call that fails the first time it is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fault {
    Acquire,
    Submit,
    FenceWait,
}

/// Backend that simulates fences and chain generations and asserts the
/// ordering rules a real device would punish.
struct MockBackend {
    limits: SurfaceLimits,
    calls: Vec<Call>,
    slot_count: usize,
    pending: HashSet<usize>,
    max_pending: usize,
    chain: Option<ChainInfo>,
    generation: u64,
    recorded_for: Option<u64>,
    acquires: VecDeque<Acquire>,
    presents: VecDeque<Presented>,
    fault: Option<Fault>,
    next_image: usize,
    uniforms: Vec<(usize, FrameUniform)>,
}

impl MockBackend {
    fn new(limits: SurfaceLimits) -> Self {
        Self {
            limits,
            calls: Vec::new(),
            slot_count: 0,
            pending: HashSet::new(),
            max_pending: 0,
            chain: None,
            generation: 0,
            recorded_for: None,
            acquires: VecDeque::new(),
            presents: VecDeque::new(),
            fault: None,
            next_image: 0,
            uniforms: Vec::new(),
        }
    }

    fn with_images(min: u32, max: u32) -> Self {
        Self::new(SurfaceLimits::from_raw(
            min,
            max,
            RenderSize::new(800, 600),
            RenderSize::new(1, 1),
            RenderSize::new(4096, 4096),
        ))
    }

    fn script_acquires(mut self, acquires: impl IntoIterator<Item = Acquire>) -> Self {
        self.acquires.extend(acquires);
        self
    }

    fn script_presents(mut self, presents: impl IntoIterator<Item = Presented>) -> Self {
        self.presents.extend(presents);
        self
    }

    fn fail_on(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    fn trip(&mut self, fault: Fault) -> bool {
        if self.fault == Some(fault) {
            self.fault = None;
            return true;
        }
        false
    }

    fn count(&self, wanted: Call) -> usize {
        self.calls.iter().filter(|&&c| c == wanted).count()
    }

    fn position(&self, wanted: Call) -> Option<usize> {
        self.calls.iter().position(|&c| c == wanted)
    }
}

impl RenderBackend for MockBackend {
    fn create_frame_slots(&mut self, count: usize) -> Result<(), RenderError> {
        self.calls.push(Call::CreateSlots(count));
        self.slot_count = count;
        Ok(())
    }

    fn build_chain(&mut self, size: RenderSize) -> Result<ChainInfo, RenderError> {
        assert!(self.chain.is_none(), "build over a live chain");
        self.calls.push(Call::Build(size));
        self.generation += 1;
        let info = ChainInfo {
            image_count: choose_image_count(&self.limits) as usize,
            extent: choose_extent(&self.limits, size),
            generation: self.generation,
        };
        self.chain = Some(info);
        self.next_image = 0;
        Ok(info)
    }

    fn destroy_chain(&mut self) {
        assert!(
            self.pending.is_empty(),
            "chain destroyed while slots {:?} still had work",
            self.pending
        );
        self.calls.push(Call::Destroy);
        self.chain = None;
        self.recorded_for = None;
    }

    fn record_commands(&mut self) -> Result<(), RenderError> {
        let chain = self.chain.expect("record without a chain");
        self.calls.push(Call::Record);
        self.recorded_for = Some(chain.generation);
        Ok(())
    }

    fn wait_for_slot(&mut self, slot: usize) -> Result<(), RenderError> {
        assert!(slot < self.slot_count);
        if self.trip(Fault::FenceWait) {
            return Err(RenderError::FenceWait("device lost".into()));
        }
        let blocked = self.pending.remove(&slot);
        self.calls.push(Call::Wait { slot, blocked });
        Ok(())
    }

    fn reset_slot(&mut self, slot: usize) -> Result<(), RenderError> {
        assert!(
            !self.pending.contains(&slot),
            "reset of slot {slot} while its fence guards work"
        );
        self.calls.push(Call::Reset(slot));
        Ok(())
    }

    fn acquire_image(&mut self, slot: usize) -> Result<Acquire, RenderError> {
        self.calls.push(Call::Acquire(slot));
        if self.trip(Fault::Acquire) {
            return Err(RenderError::Acquire("surface lost".into()));
        }
        if let Some(scripted) = self.acquires.pop_front() {
            return Ok(scripted);
        }
        let count = self.chain.expect("acquire without a chain").image_count;
        let index = self.next_image % count;
        self.next_image += 1;
        Ok(Acquire::Image {
            index,
            suboptimal: false,
        })
    }

    fn write_uniform(&mut self, image: usize, uniform: &FrameUniform) -> Result<(), RenderError> {
        self.calls.push(Call::Write(image));
        self.uniforms.push((image, *uniform));
        Ok(())
    }

    fn submit(&mut self, slot: usize, image: usize) -> Result<(), RenderError> {
        let chain = self.chain.expect("submit without a chain");
        assert_eq!(
            self.recorded_for,
            Some(chain.generation),
            "submitted commands recorded for another generation"
        );
        assert!(image < chain.image_count);
        if self.trip(Fault::Submit) {
            return Err(RenderError::Submit("device lost".into()));
        }
        self.calls.push(Call::Submit { slot, image });
        self.pending.insert(slot);
        self.max_pending = self.max_pending.max(self.pending.len());
        Ok(())
    }

    fn present(&mut self, slot: usize, image: usize) -> Result<PresentStatus, RenderError> {
        self.calls.push(Call::Present { slot, image });
        match self.presents.pop_front() {
            None => Ok(PresentStatus::Optimal),
            Some(Presented::Status(status)) => Ok(status),
            Some(Presented::DeviceLost) => Err(RenderError::Present("device lost".into())),
        }
    }

    fn wait_idle(&mut self) -> Result<(), RenderError> {
        self.calls.push(Call::WaitIdle);
        self.pending.clear();
        Ok(())
    }
}

struct MockHost {
    size: RenderSize,
    // Sizes revealed one per `wait_events`.
    upcoming: VecDeque<RenderSize>,
    waits: usize,
    pumps: usize,
    closed: bool,
    resized: ResizeFlag,
    // Raise the resize flag whenever `wait_events` reveals a drawable size,
    // as a windowing system does when a minimized window is restored.
    flag_on_restore: bool,
}

impl MockHost {
    fn new(size: RenderSize) -> Self {
        Self {
            size,
            upcoming: VecDeque::new(),
            waits: 0,
            pumps: 0,
            closed: false,
            resized: ResizeFlag::new(),
            flag_on_restore: false,
        }
    }

    fn resize(&mut self, size: RenderSize) {
        self.size = size;
        self.resized.set();
    }
}

impl WindowHost for MockHost {
    fn framebuffer_size(&self) -> RenderSize {
        self.size
    }

    fn pump_events(&mut self) {
        self.pumps += 1;
    }

    fn wait_events(&mut self) {
        self.waits += 1;
        match self.upcoming.pop_front() {
            Some(size) => {
                self.size = size;
                if self.flag_on_restore && !size.is_empty() {
                    self.resized.set();
                }
            }
            None => self.closed = true,
        }
    }

    fn close_requested(&self) -> bool {
        self.closed
    }

    fn resize_flag(&self) -> &ResizeFlag {
        &self.resized
    }
}

fn scheduler(
    backend: MockBackend,
    frames_in_flight: usize,
    host: &mut MockHost,
) -> FrameScheduler<MockBackend, ManualClock> {
    FrameScheduler::new(backend, ManualClock::new(), frames_in_flight, host)
        .expect("scheduler construction")
}

fn run_frames<C: Clock>(
    s: &mut FrameScheduler<MockBackend, C>,
    host: &mut MockHost,
    frames: usize,
) {
    for _ in 0..frames {
        s.draw_frame(host).expect("frame");
    }
}

// Small deterministic generator for acquire orders.
fn lcg(seed: &mut u64) -> usize {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*seed >> 33) as usize
}

#[test]
fn construction_builds_first_generation() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);

    assert_eq!(
        s.backend().calls,
        vec![
            Call::CreateSlots(2),
            Call::Build(RenderSize::new(800, 600)),
            Call::Record
        ]
    );
    assert_eq!(s.chain().image_count, 3);
    assert_eq!(s.chain().generation, 1);
    assert_eq!(s.frames_in_flight(), 2);
    assert_eq!(s.state(), FrameState::Idle);
}

#[test]
fn zero_frames_in_flight_is_rejected() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let err = FrameScheduler::new(MockBackend::with_images(2, 3), ManualClock::new(), 0, &mut host)
        .err()
        .expect("must fail");
    assert!(matches!(err, RenderError::InvalidConfig(_)));
}

#[test]
fn steady_state_cycle_runs_in_order() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);
    let start = s.backend().calls.len();

    let outcome = s.draw_frame(&mut host).expect("frame");

    assert_eq!(outcome, FrameOutcome::Presented { image: 0 });
    assert_eq!(
        s.backend().calls[start..],
        [
            Call::Wait {
                slot: 0,
                blocked: false
            },
            Call::Acquire(0),
            Call::Write(0),
            Call::Reset(0),
            Call::Submit { slot: 0, image: 0 },
            Call::Present { slot: 0, image: 0 },
        ]
    );
    assert_eq!(s.frame_slot(), 1);
    assert_eq!(s.state(), FrameState::Idle);
    assert_eq!(s.frames_submitted(), 1);
}

#[test]
fn outstanding_frames_never_exceed_slot_count() {
    for images in 1..=4u32 {
        for frames_in_flight in 1..=images as usize {
            let mut seed = u64::from(images) * 31 + frames_in_flight as u64;
            let acquires: Vec<Acquire> = (0..200)
                .map(|_| Acquire::Image {
                    index: lcg(&mut seed) % images as usize,
                    suboptimal: false,
                })
                .collect();
            let backend = MockBackend::with_images(images.saturating_sub(1), images)
                .script_acquires(acquires);
            let mut host = MockHost::new(RenderSize::new(640, 480));
            let mut s = scheduler(backend, frames_in_flight, &mut host);
            assert_eq!(s.chain().image_count, images as usize);

            run_frames(&mut s, &mut host, 200);

            let max = s.backend().max_pending;
            assert!(
                max <= frames_in_flight,
                "N={images} F={frames_in_flight}: {max} frames outstanding"
            );
            assert!(max >= 1);
        }
    }
}

#[test]
fn round_robin_fills_every_slot() {
    let mut host = MockHost::new(RenderSize::new(640, 480));
    let mut s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);
    run_frames(&mut s, &mut host, 12);
    assert_eq!(s.backend().max_pending, 2);
}

#[test]
fn reacquiring_an_image_waits_for_its_previous_frame() {
    let backend = MockBackend::with_images(2, 3).script_acquires([
        Acquire::Image {
            index: 0,
            suboptimal: false,
        },
        Acquire::Image {
            index: 0,
            suboptimal: false,
        },
    ]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    s.draw_frame(&mut host).expect("first frame");
    let second = s.backend().calls.len();
    s.draw_frame(&mut host).expect("second frame");

    // Slot 1 is fresh, but image 0 is still owned by slot 0's unwaited frame.
    assert_eq!(
        s.backend().calls[second..],
        [
            Call::Wait {
                slot: 1,
                blocked: false
            },
            Call::Acquire(1),
            Call::Wait {
                slot: 0,
                blocked: true
            },
            Call::Write(0),
            Call::Reset(1),
            Call::Submit { slot: 1, image: 0 },
            Call::Present { slot: 1, image: 0 },
        ]
    );
}

#[test]
fn uniform_write_follows_guard_and_precedes_submit() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let backend = MockBackend::with_images(1, 2);
    let mut s = scheduler(backend, 2, &mut host);
    run_frames(&mut s, &mut host, 6);

    let calls = &s.backend().calls;
    for (i, call) in calls.iter().enumerate() {
        if let Call::Write(_) = call {
            assert!(matches!(calls[i - 1], Call::Wait { .. } | Call::Acquire(_)));
            assert!(matches!(calls[i + 1], Call::Reset(_)));
        }
        if let Call::Submit { slot, .. } = call {
            assert_eq!(calls[i - 1], Call::Reset(*slot));
        }
    }
}

#[test]
fn clock_drives_the_frame_uniform() {
    let clock = ManualClock::new();
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = FrameScheduler::new(MockBackend::with_images(2, 3), &clock, 2, &mut host)
        .expect("scheduler");

    s.draw_frame(&mut host).expect("frame");
    clock.advance(Duration::from_secs(1));
    s.draw_frame(&mut host).expect("frame");

    let extent = s.chain().extent;
    let written = &s.backend().uniforms;
    assert_eq!(written[0].1, FrameUniform::at(Duration::ZERO, extent));
    assert_eq!(written[1].1, FrameUniform::at(Duration::from_secs(1), extent));
}

#[test]
fn out_of_date_present_rebuilds_instead_of_failing() {
    let backend = MockBackend::with_images(2, 3)
        .script_presents([Presented::Status(PresentStatus::OutOfDate)]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    let outcome = s.draw_frame(&mut host).expect("out-of-date is not fatal");

    assert_eq!(outcome, FrameOutcome::Rebuilt(RebuildReason::OUT_OF_DATE));
    assert_eq!(s.state(), FrameState::AcquireImage);
    assert_eq!(s.chain().generation, 2);
    assert_eq!(
        s.draw_frame(&mut host).expect("next frame"),
        FrameOutcome::Presented { image: 0 }
    );
}

#[test]
fn suboptimal_present_rebuilds() {
    let backend = MockBackend::with_images(2, 3)
        .script_presents([Presented::Status(PresentStatus::Suboptimal)]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    assert_eq!(
        s.draw_frame(&mut host).expect("frame"),
        FrameOutcome::Rebuilt(RebuildReason::SUBOPTIMAL)
    );
}

#[test]
fn out_of_date_acquire_restarts_without_submitting() {
    let backend = MockBackend::with_images(2, 3).script_acquires([Acquire::OutOfDate]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);
    let start = s.backend().calls.len();

    let outcome = s.draw_frame(&mut host).expect("frame");

    assert_eq!(outcome, FrameOutcome::Rebuilt(RebuildReason::OUT_OF_DATE));
    assert_eq!(
        s.backend().calls[start..],
        [
            Call::Wait {
                slot: 0,
                blocked: false
            },
            Call::Acquire(0),
            Call::WaitIdle,
            Call::Destroy,
            Call::Build(RenderSize::new(800, 600)),
            Call::Record,
        ]
    );
    // The cycle restarts on the same slot.
    assert_eq!(s.frame_slot(), 0);
    assert_eq!(s.frames_submitted(), 0);
}

#[test]
fn suboptimal_acquire_renders_then_rebuilds() {
    let backend = MockBackend::with_images(2, 3).script_acquires([Acquire::Image {
        index: 1,
        suboptimal: true,
    }]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    assert_eq!(
        s.draw_frame(&mut host).expect("frame"),
        FrameOutcome::Rebuilt(RebuildReason::SUBOPTIMAL)
    );
    let b = s.backend();
    assert_eq!(b.count(Call::Submit { slot: 0, image: 1 }), 1);
    assert_eq!(b.count(Call::Present { slot: 0, image: 1 }), 1);
    assert_eq!(b.count(Call::Destroy), 1);
    assert!(b.position(Call::Present { slot: 0, image: 1 }) < b.position(Call::Destroy));
    assert_eq!(s.chain().generation, 2);

    assert!(matches!(
        s.draw_frame(&mut host).expect("frame"),
        FrameOutcome::Presented { .. }
    ));
    assert_eq!(s.backend().count(Call::Destroy), 1);
}

#[test]
fn suboptimal_acquire_and_present_rebuild_once() {
    let backend = MockBackend::with_images(2, 3)
        .script_acquires([Acquire::Image {
            index: 0,
            suboptimal: true,
        }])
        .script_presents([Presented::Status(PresentStatus::Suboptimal)]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    assert_eq!(
        s.draw_frame(&mut host).expect("frame"),
        FrameOutcome::Rebuilt(RebuildReason::SUBOPTIMAL)
    );
    assert_eq!(s.backend().count(Call::Destroy), 1);
}

#[test]
fn every_rebuild_is_preceded_by_device_idle() {
    let backend = MockBackend::with_images(2, 3).script_presents([
        Presented::Status(PresentStatus::Optimal),
        Presented::Status(PresentStatus::OutOfDate),
        Presented::Status(PresentStatus::Optimal),
        Presented::Status(PresentStatus::Suboptimal),
    ]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);
    run_frames(&mut s, &mut host, 3);
    host.resize(RenderSize::new(1024, 768));
    run_frames(&mut s, &mut host, 4);

    let calls = &s.backend().calls;
    let destroys: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Call::Destroy)
        .map(|(i, _)| i)
        .collect();
    // Frame 2 went out of date; frame 4 was suboptimal and resized at once.
    assert_eq!(destroys.len(), 2);
    for i in destroys {
        assert_eq!(calls[i - 1], Call::WaitIdle);
        assert!(matches!(calls[i + 1], Call::Build(_)));
        assert_eq!(calls[i + 2], Call::Record);
    }
    assert_eq!(s.chain().generation, 3);
}

#[test]
fn each_resize_is_consumed_by_exactly_one_rebuild() {
    let limits = SurfaceLimits::from_raw(
        2,
        3,
        RenderSize::new(UNDEFINED_EXTENT, UNDEFINED_EXTENT),
        RenderSize::new(1, 1),
        RenderSize::new(4096, 4096),
    );
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(MockBackend::new(limits), 2, &mut host);

    for size in [
        RenderSize::new(1024, 768),
        RenderSize::new(300, 200),
        RenderSize::new(1920, 1080),
    ] {
        host.resize(size);
        assert_eq!(
            s.draw_frame(&mut host).expect("frame"),
            FrameOutcome::Rebuilt(RebuildReason::RESIZED)
        );
        assert_eq!(s.chain().extent, size);
        assert!(matches!(
            s.draw_frame(&mut host).expect("frame"),
            FrameOutcome::Presented { .. }
        ));
    }
    assert_eq!(s.backend().count(Call::Destroy), 3);
}

#[test]
fn rebuild_on_unchanged_surface_keeps_shape() {
    let backend = MockBackend::with_images(2, 3)
        .script_presents([Presented::Status(PresentStatus::OutOfDate)]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);
    let first = s.chain();

    s.draw_frame(&mut host).expect("frame");
    let second = s.chain();

    assert_eq!(first.image_count, second.image_count);
    assert_eq!(first.extent, second.extent);
    assert_eq!(second.generation, first.generation + 1);
}

#[test]
fn surface_with_two_to_three_images_gets_three() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);
    assert_eq!(s.chain().image_count, 3);
}

#[test]
fn undefined_surface_extent_follows_clamped_window() {
    let limits = SurfaceLimits::from_raw(
        2,
        3,
        RenderSize::new(UNDEFINED_EXTENT, UNDEFINED_EXTENT),
        RenderSize::new(100, 100),
        RenderSize::new(2048, 2048),
    );
    let mut host = MockHost::new(RenderSize::new(5000, 10));
    let s = scheduler(MockBackend::new(limits), 2, &mut host);
    assert_eq!(s.chain().extent, RenderSize::new(2048, 100));
}

#[test]
fn minimized_window_blocks_rebuild_until_restored() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);

    host.resize(RenderSize::new(0, 0));
    host.upcoming
        .extend([RenderSize::new(0, 0), RenderSize::new(640, 0), RenderSize::new(640, 480)]);

    let outcome = s.draw_frame(&mut host).expect("frame");

    assert_eq!(outcome, FrameOutcome::Rebuilt(RebuildReason::RESIZED));
    assert_eq!(host.waits, 3);
    assert_eq!(s.backend().count(Call::Build(RenderSize::new(640, 480))), 1);
    assert!(!s
        .backend()
        .calls
        .iter()
        .any(|c| matches!(c, Call::Build(size) if size.is_empty())));
}

#[test]
fn restore_during_rebuild_does_not_rebuild_again() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    host.flag_on_restore = true;
    let mut s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);

    host.resize(RenderSize::new(0, 0));
    host.upcoming.push_back(RenderSize::new(640, 480));

    assert_eq!(
        s.draw_frame(&mut host).expect("frame"),
        FrameOutcome::Rebuilt(RebuildReason::RESIZED)
    );
    assert!(!host.resized.is_set());
    assert!(matches!(
        s.draw_frame(&mut host).expect("frame"),
        FrameOutcome::Presented { .. }
    ));

    let builds = s
        .backend()
        .calls
        .iter()
        .filter(|c| matches!(c, Call::Build(_)))
        .count();
    assert_eq!(builds, 2);
    assert_eq!(s.backend().count(Call::Build(RenderSize::new(640, 480))), 1);
}

#[test]
fn closing_while_minimized_leaves_chain_alone() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);

    host.resize(RenderSize::new(0, 0));
    let outcome = s.draw_frame(&mut host).expect("frame");

    assert_eq!(outcome, FrameOutcome::Closing);
    assert!(host.close_requested());
    assert_eq!(s.backend().count(Call::Destroy), 0);
    s.finish().expect("finish");
    assert_eq!(s.backend().calls.last(), Some(&Call::WaitIdle));
}

#[test]
fn minimized_at_startup_waits_before_first_build() {
    let mut host = MockHost::new(RenderSize::new(0, 0));
    host.upcoming.push_back(RenderSize::new(320, 240));
    let s = scheduler(MockBackend::with_images(2, 3), 2, &mut host);

    assert_eq!(host.waits, 1);
    assert_eq!(s.backend().calls[1], Call::Build(RenderSize::new(320, 240)));
    assert!(!host.resized.is_set());
}

#[test]
fn present_failure_is_fatal() {
    let backend = MockBackend::with_images(2, 3).script_presents([Presented::DeviceLost]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    let err = s.draw_frame(&mut host).expect_err("device loss is fatal");
    assert!(matches!(err, RenderError::Present(_)));
    assert_eq!(err.exit_code(), 42);
    assert_eq!(s.backend().count(Call::Destroy), 0);
}

#[test]
fn acquire_failure_is_fatal() {
    let backend = MockBackend::with_images(2, 3).fail_on(Fault::Acquire);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    let err = s.draw_frame(&mut host).expect_err("acquire error is fatal");
    assert!(matches!(err, RenderError::Acquire(_)));
    assert_eq!(err.exit_code(), 40);
    assert_eq!(s.backend().count(Call::Destroy), 0);
    assert!(!s.backend().calls.iter().any(|c| matches!(c, Call::Submit { .. })));
}

#[test]
fn submit_failure_is_fatal() {
    let backend = MockBackend::with_images(2, 3).fail_on(Fault::Submit);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    let err = s.draw_frame(&mut host).expect_err("submit error is fatal");
    assert!(matches!(err, RenderError::Submit(_)));
    assert_eq!(err.exit_code(), 41);
    assert_eq!(s.backend().count(Call::Destroy), 0);
    assert!(!s.backend().calls.iter().any(|c| matches!(c, Call::Present { .. })));
    assert_eq!(s.frames_submitted(), 0);
}

#[test]
fn fence_wait_failure_is_fatal() {
    let backend = MockBackend::with_images(2, 3).fail_on(Fault::FenceWait);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);

    let err = s.draw_frame(&mut host).expect_err("fence wait error is fatal");
    assert!(matches!(err, RenderError::FenceWait(_)));
    assert_eq!(err.exit_code(), 43);
    assert_eq!(s.backend().count(Call::Destroy), 0);
    assert!(!s.backend().calls.iter().any(|c| matches!(c, Call::Acquire(_))));
}

#[test]
fn out_of_range_image_index_is_fatal() {
    let backend = MockBackend::with_images(2, 3).script_acquires([Acquire::Image {
        index: 7,
        suboptimal: false,
    }]);
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(backend, 2, &mut host);
    assert!(matches!(
        s.draw_frame(&mut host),
        Err(RenderError::Acquire(_))
    ));
}

#[test]
fn slot_index_wraps_around() {
    let mut host = MockHost::new(RenderSize::new(800, 600));
    let mut s = scheduler(MockBackend::with_images(2, 3), 3, &mut host);
    let mut seen = Vec::new();
    for _ in 0..7 {
        seen.push(s.frame_slot());
        s.draw_frame(&mut host).expect("frame");
    }
    assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(host.pumps, 0);
}
