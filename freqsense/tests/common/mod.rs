//! Simulated hardware shared by the integration tests.
//!
//! The peripherals are `static`s, so every test holds the lock returned by [`setup`] for its
//! whole duration.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use cassette::Cassette;
use parking_lot::{Mutex, MutexGuard};

use freqsense::capture::CaptureChannel;
use freqsense::config::{CaptureConfig, EdgeSourceConfig, EventRouteConfig, EventUser, FreqMeterConfig};
use freqsense::edge::{EventChannel, EventSystem};
use freqsense::{
    CaptureBackend, CaptureState, CaptureTimer, EdgeEventSource, FreqMeter, FreqMeterBackend,
    FreqMeterReading, FreqMeterState, Orchestrator,
};
use rtic_time::monotonic::TimerQueueBasedMonotonic;
use rtic_time::timer_queue::{TimerQueue, TimerQueueBackend};

static SERIAL: Mutex<()> = Mutex::new(());

/// Serialize the test and put the simulated hardware in its reset state.
pub fn setup() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();

    TestMono::init();
    SimCapture::reset();
    SimFreqMeter::reset();

    guard
}

// ---------------------------------------------------------------------------------------------
// Monotonic

static NOW: AtomicU64 = AtomicU64::new(0);
static COMPARE: Mutex<Option<u64>> = Mutex::new(None);
static TIMER_QUEUE: TimerQueue<TestBackend> = TimerQueue::new();

pub struct TestBackend;

impl TimerQueueBackend for TestBackend {
    type Ticks = u64;

    fn now() -> Self::Ticks {
        NOW.load(Ordering::SeqCst)
    }

    fn set_compare(instant: Self::Ticks) {
        *COMPARE.lock() = Some(instant);
    }

    fn clear_compare_flag() {}

    fn pend_interrupt() {
        unsafe { TIMER_QUEUE.on_monotonic_interrupt() };
    }

    fn timer_queue() -> &'static TimerQueue<Self> {
        &TIMER_QUEUE
    }
}

pub struct TestMono;

pub type Duration = fugit::Duration<u64, 1, 1000>;

impl TimerQueueBasedMonotonic for TestMono {
    type Backend = TestBackend;
    type Instant = fugit::Instant<u64, 1, 1000>;
    type Duration = Duration;
}

impl TestMono {
    pub fn init() {
        TIMER_QUEUE.initialize(TestBackend);
    }

    /// Advance the clock by one tick, running the timer interrupt if the compare is reached.
    pub fn tick() {
        let now = NOW.fetch_add(1, Ordering::SeqCst) + 1;
        let compare = *COMPARE.lock();

        if compare.is_some_and(|c| now >= c) {
            unsafe { TIMER_QUEUE.on_monotonic_interrupt() };
        }
    }
}

pub fn ticks(n: u64) -> Duration {
    Duration::from_ticks(n)
}

/// Poll `fut` once per simulated tick, calling `hardware` with the elapsed tick count before
/// each clock advance. Returns the output and the ticks it took.
pub fn drive<F: Future>(fut: F, max_ticks: u64, mut hardware: impl FnMut(u64)) -> (F::Output, u64) {
    let fut = std::pin::pin!(fut);
    let mut fut = Cassette::new(fut);

    for elapsed in 0..=max_ticks {
        if let Some(out) = fut.poll_on() {
            return (out, elapsed);
        }
        hardware(elapsed);
        TestMono::tick();
    }

    panic!("future did not finish within {max_ticks} ticks");
}

// ---------------------------------------------------------------------------------------------
// Capture timer

static CAPTURE_STATE: CaptureState = CaptureState::new();
static CC: Mutex<[u16; 2]> = Mutex::new([0; 2]);
static CAPTURE_IRQ: AtomicBool = AtomicBool::new(false);
static CAPTURE_CONFIG: Mutex<Option<CaptureConfig>> = Mutex::new(None);

/// A timer in pulse-width/period mode, stimulated by the test.
pub struct SimCapture;

impl CaptureBackend for SimCapture {
    fn configure(config: &CaptureConfig) {
        *CAPTURE_CONFIG.lock() = Some(*config);
    }

    fn read_channel(channel: CaptureChannel) -> u16 {
        let cc = *CC.lock();
        match channel {
            CaptureChannel::Cc0 => cc[0],
            CaptureChannel::Cc1 => cc[1],
        }
    }

    fn enable_interrupt() {
        CAPTURE_IRQ.store(true, Ordering::SeqCst);
    }

    fn disable_interrupt() {
        CAPTURE_IRQ.store(false, Ordering::SeqCst);
    }

    fn state() -> &'static CaptureState {
        &CAPTURE_STATE
    }
}

impl SimCapture {
    pub fn reset() {
        *CC.lock() = [0; 2];
        *CAPTURE_CONFIG.lock() = None;
        CAPTURE_IRQ.store(false, Ordering::SeqCst);
        CAPTURE_STATE.handoff().clear();
    }

    /// One qualifying event with the given channel contents, raising the interrupt if enabled.
    pub fn event(cc0: u16, cc1: u16) {
        *CC.lock() = [cc0, cc1];
        if CAPTURE_IRQ.load(Ordering::SeqCst) {
            unsafe { CAPTURE_STATE.on_interrupt::<SimCapture>() };
        }
    }

    /// A full measurement cycle: the reset event, then channel 0, then channel 1 latching.
    pub fn cycle(cc0: u16, cc1: u16) {
        let [stale0, stale1] = *CC.lock();
        Self::event(stale0, stale1);
        Self::event(cc0, stale1);
        Self::event(cc0, cc1);
    }

    pub fn irq_enabled() -> bool {
        CAPTURE_IRQ.load(Ordering::SeqCst)
    }

    pub fn configured() -> Option<CaptureConfig> {
        *CAPTURE_CONFIG.lock()
    }

    pub fn state() -> &'static CaptureState {
        &CAPTURE_STATE
    }
}

// ---------------------------------------------------------------------------------------------
// Frequency meter

static FREQM_STATE: FreqMeterState = FreqMeterState::new();
static CLOCK_PRESENT: AtomicBool = AtomicBool::new(true);
static FREQM_IRQ: AtomicBool = AtomicBool::new(false);
static FREQM_ENABLED: AtomicBool = AtomicBool::new(false);
static FREQM_STARTS: AtomicUsize = AtomicUsize::new(0);
static FREQM_READING: Mutex<FreqMeterReading> = Mutex::new(FreqMeterReading {
    value: 0,
    overflow: false,
});
static FREQM_CONFIG: Mutex<Option<FreqMeterConfig>> = Mutex::new(None);

pub struct SimFreqMeter;

impl FreqMeterBackend for SimFreqMeter {
    fn configure(config: &FreqMeterConfig) {
        *FREQM_CONFIG.lock() = Some(*config);
    }

    fn is_syncing() -> bool {
        !CLOCK_PRESENT.load(Ordering::SeqCst)
    }

    fn enable() {
        FREQM_ENABLED.store(true, Ordering::SeqCst);
    }

    fn start() {
        FREQM_STARTS.fetch_add(1, Ordering::SeqCst);
    }

    fn read() -> FreqMeterReading {
        let mut reading = FREQM_READING.lock();
        let out = *reading;
        reading.overflow = false;
        out
    }

    fn enable_interrupt() {
        FREQM_IRQ.store(true, Ordering::SeqCst);
    }

    fn disable_interrupt() {
        FREQM_IRQ.store(false, Ordering::SeqCst);
    }

    fn state() -> &'static FreqMeterState {
        &FREQM_STATE
    }
}

impl SimFreqMeter {
    pub fn reset() {
        CLOCK_PRESENT.store(true, Ordering::SeqCst);
        FREQM_IRQ.store(false, Ordering::SeqCst);
        FREQM_ENABLED.store(false, Ordering::SeqCst);
        FREQM_STARTS.store(0, Ordering::SeqCst);
        *FREQM_READING.lock() = FreqMeterReading::default();
        *FREQM_CONFIG.lock() = None;
        FREQM_STATE.handoff().clear();
    }

    pub fn set_clock_present(present: bool) {
        CLOCK_PRESENT.store(present, Ordering::SeqCst);
    }

    /// Finish a measurement with `value` counted, raising the interrupt if enabled.
    pub fn complete(value: u32, overflow: bool) {
        *FREQM_READING.lock() = FreqMeterReading { value, overflow };
        if FREQM_IRQ.load(Ordering::SeqCst) {
            unsafe { FREQM_STATE.on_interrupt() };
        }
    }

    pub fn starts() -> usize {
        FREQM_STARTS.load(Ordering::SeqCst)
    }

    pub fn enabled() -> bool {
        FREQM_ENABLED.load(Ordering::SeqCst)
    }

    pub fn irq_enabled() -> bool {
        FREQM_IRQ.load(Ordering::SeqCst)
    }

    pub fn configured() -> Option<FreqMeterConfig> {
        *FREQM_CONFIG.lock()
    }

    pub fn state_claimed() -> bool {
        FREQM_STATE.handoff().is_claimed()
    }
}

// ---------------------------------------------------------------------------------------------
// Event system

/// What the event system was asked to do, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCall {
    Allocate(EventRouteConfig),
    Attach(EventChannel, EventUser),
    ConfigureLine(EdgeSourceConfig),
    EnableLineEvent(u8),
}

pub struct SimEvents {
    free: u8,
    next: u8,
    pub calls: Vec<EventCall>,
}

impl SimEvents {
    pub fn new(free: u8) -> Self {
        Self {
            free,
            next: 0,
            calls: Vec::new(),
        }
    }
}

impl EventSystem for SimEvents {
    fn allocate_channel(&mut self, route: &EventRouteConfig) -> Option<EventChannel> {
        self.calls.push(EventCall::Allocate(*route));
        if self.free == 0 {
            return None;
        }
        self.free -= 1;
        let channel = EventChannel(self.next);
        self.next += 1;
        Some(channel)
    }

    fn attach_user(&mut self, channel: EventChannel, user: EventUser) {
        self.calls.push(EventCall::Attach(channel, user));
    }

    fn configure_line(&mut self, config: &EdgeSourceConfig) {
        self.calls.push(EventCall::ConfigureLine(*config));
    }

    fn enable_line_event(&mut self, line: u8) {
        self.calls.push(EventCall::EnableLineEvent(line));
    }
}

// ---------------------------------------------------------------------------------------------
// Assembled paths

pub fn edge_source() -> EdgeEventSource {
    let mut events = SimEvents::new(12);
    EdgeEventSource::route_default(&mut events, EdgeSourceConfig::default()).unwrap()
}

pub fn capture_timer() -> CaptureTimer<SimCapture> {
    CaptureTimer::new(CaptureConfig::default(), edge_source()).unwrap()
}

pub fn freq_meter() -> FreqMeter<SimFreqMeter> {
    let (meter, _) = drive(
        FreqMeter::<SimFreqMeter>::new::<TestMono>(FreqMeterConfig::default(), ticks(10)),
        20,
        |_| {},
    );
    meter.unwrap()
}

pub fn orchestrator() -> Orchestrator<TestMono, SimCapture, SimFreqMeter> {
    Orchestrator::new(capture_timer(), freq_meter())
}
