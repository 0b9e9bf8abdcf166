//! End-to-end driver behaviour through the `DebugUart` dispatcher.

use std::sync::Mutex;

use kdserial_core::log::{self, LogLevel};
use kdserial_drivers::geni::GENI_QUIESCE_RETRIES;
use kdserial_drivers::{AccessMode, DebugUart, DriverKind, PortDescriptor, PortFlags, UartDriver, UartError};
use kdserial_sim::SimBus;

const ALL_KINDS: [DriverKind; 5] = [
    DriverKind::MiniUart,
    DriverKind::LpssRev1,
    DriverKind::LpssRev2,
    DriverKind::GeniV1,
    DriverKind::GeniV2,
];

// LPSS layout.
const LPSS_RBR: usize = 0x00;
const LPSS_DLL: usize = 0x00;
const LPSS_LCR: usize = 0x0C;
const LPSS_LSR: usize = 0x14;
const LPSS_CLOCK_PARAMS: usize = 0x200;
const LPSS_COMMAND: usize = 0x1004;
const LPSS_PMCSR: usize = 0x1084;

// GENI layout, relative to the serial engine window.
const GENI_STATUS: usize = 0x040;
const GENI_M_CLK_CFG: usize = 0x048;
const GENI_RX_FIFO: usize = 0x780;
const GENI_RX_FIFO_STATUS: usize = 0x804;

fn se_base(kind: DriverKind) -> usize {
    if kind == DriverKind::GeniV2 { 0x4000 } else { 0 }
}

fn reset_register(kind: DriverKind) -> (usize, u32) {
    match kind {
        DriverKind::LpssRev1 => (0x804, 0x3),
        _ => (0x204, 0x7),
    }
}

fn bring_up(sim: &SimBus, kind: DriverKind, baud: u32) -> (DebugUart, PortDescriptor<&SimBus>) {
    let mut uart = DebugUart::new(kind);
    let mut port = PortDescriptor::new(sim, baud);
    uart.initialize(None, &mut port, AccessMode::MMIO32)
        .unwrap_or_else(|e| panic!("{kind:?} failed to initialize: {e}"));
    sim.clear_log();
    (uart, port)
}

/// Makes exactly one byte, `b'Z'`, available to the family's receiver.
fn feed_one_byte(sim: &SimBus, kind: DriverKind) {
    match kind {
        DriverKind::MiniUart => {
            sim.poke_u32(0x64, 0x1);
            sim.poke_u32(0x40, u32::from(b'Z'));
        }
        DriverKind::LpssRev1 | DriverKind::LpssRev2 => {
            sim.poke_u32(LPSS_LSR, 0x1);
            sim.poke_u32(LPSS_RBR, u32::from(b'Z'));
        }
        DriverKind::GeniV1 | DriverKind::GeniV2 => {
            let base = se_base(kind);
            sim.queue_reads(base + GENI_RX_FIFO_STATUS, [1 | (1 << 28)]);
            sim.queue_reads(base + GENI_RX_FIFO, [u64::from(b'Z')]);
        }
    }
}

#[test]
fn rx_ready_implies_get_byte() {
    for kind in ALL_KINDS {
        let sim = SimBus::new();
        let (mut uart, mut port) = bring_up(&sim, kind, 115_200);

        assert!(!uart.rx_ready(&mut port), "{kind:?} idle receiver");
        assert_eq!(uart.get_byte(&mut port), Err(UartError::NoData), "{kind:?}");

        feed_one_byte(&sim, kind);
        assert!(uart.rx_ready(&mut port), "{kind:?}");
        assert_eq!(uart.get_byte(&mut port), Ok(b'Z'), "{kind:?}");
    }
}

#[test]
fn set_baud_is_idempotent() {
    for kind in ALL_KINDS {
        let sim = SimBus::new();
        let (mut uart, mut port) = bring_up(&sim, kind, 115_200);

        uart.set_baud(&mut port, 57_600).unwrap();
        let once = (port.baud_rate, sim.peek_u32(0x0), sim.peek_u32(LPSS_LCR), sim.peek_u32(se_base(kind) + GENI_M_CLK_CFG));
        uart.set_baud(&mut port, 57_600).unwrap();
        let twice = (port.baud_rate, sim.peek_u32(0x0), sim.peek_u32(LPSS_LCR), sim.peek_u32(se_base(kind) + GENI_M_CLK_CFG));

        assert_eq!(once, twice, "{kind:?}");
    }
}

#[test]
fn unknown_rates_fall_back_to_slowest() {
    let expectations = [
        (DriverKind::LpssRev1, 16),
        (DriverKind::LpssRev2, 16),
        (DriverKind::GeniV1, (64 << 4) | 1),
        (DriverKind::GeniV2, (32 << 4) | 1),
    ];
    for (kind, programmed) in expectations {
        let sim = SimBus::new();
        let (mut uart, mut port) = bring_up(&sim, kind, 115_200);

        uart.set_baud(&mut port, 12_345).unwrap();
        assert_eq!(port.baud_rate, 7_200, "{kind:?}");
        let written = match kind {
            DriverKind::LpssRev1 | DriverKind::LpssRev2 => sim.writes_to(LPSS_DLL),
            _ => sim.writes_to(se_base(kind) + GENI_M_CLK_CFG),
        };
        assert_eq!(written, vec![programmed], "{kind:?}");
    }
}

#[test]
fn mini_uart_forces_eight_bit_lcr() {
    let sim = SimBus::new();
    sim.poke_u32(0x4C, 0x1);
    let (mut uart, mut port) = bring_up(&sim, DriverKind::MiniUart, 115_200);
    assert_eq!(sim.peek_u32(0x4C), 0x3);

    uart.set_baud(&mut port, 9_600).unwrap();
    assert_eq!(sim.peek_u32(0x4C), 0x3);
    assert_eq!(port.baud_rate, 115_200);
}

#[test]
fn lpss_power_cycle_restores_state() {
    for kind in [DriverKind::LpssRev1, DriverKind::LpssRev2] {
        let sim = SimBus::new();
        let (reset, deasserted) = reset_register(kind);
        sim.poke_u32(reset, deasserted | 0x100);
        sim.poke_u16(LPSS_COMMAND, 0x0006);
        sim.poke_u32(LPSS_CLOCK_PARAMS, 0x0000_A5A1);

        let (mut uart, mut port) = bring_up(&sim, kind, 9_600);
        let before = (
            sim.peek_u16(LPSS_COMMAND),
            sim.peek_u32(reset),
            sim.peek_u32(LPSS_CLOCK_PARAMS),
        );

        uart.set_power_d3(&mut port).unwrap();
        assert!(port.flags.contains(PortFlags::POWERED_DOWN), "{kind:?}");
        assert_eq!(sim.peek_u16(LPSS_PMCSR) & 0x3, 3, "{kind:?}");
        assert_eq!(sim.peek_u32(reset) & deasserted, 0, "{kind:?}");
        assert_eq!(uart.get_byte(&mut port), Err(UartError::NotReady));

        uart.set_power_d0(&mut port).unwrap();
        let after = (
            sim.peek_u16(LPSS_COMMAND),
            sim.peek_u32(reset),
            sim.peek_u32(LPSS_CLOCK_PARAMS),
        );

        assert_eq!(before, after, "{kind:?}");
        assert_eq!(sim.peek_u16(LPSS_PMCSR) & 0x3, 0, "{kind:?}");
        assert!(port.flags.is_empty(), "{kind:?}");
        assert_eq!(port.baud_rate, 9_600);
        assert_eq!(sim.writes_to(LPSS_DLL).last().copied(), Some(12), "{kind:?} baud restored");

        feed_one_byte(&sim, kind);
        assert_eq!(uart.get_byte(&mut port), Ok(b'Z'));
    }
}

#[test]
fn geni_unpacks_whole_and_partial_words() {
    let sim = SimBus::new();
    let (mut uart, mut port) = bring_up(&sim, DriverKind::GeniV1, 115_200);

    // Two words, the second holding one valid byte.
    sim.queue_reads(GENI_RX_FIFO_STATUS, [2 | (1 << 28)]);
    sim.queue_reads(GENI_RX_FIFO, [0x6463_6261, 0xFFFF_FF65]);

    let mut received = Vec::new();
    for _ in 0..5 {
        received.push(uart.get_byte(&mut port).unwrap());
    }
    assert_eq!(received, b"abcde");
    assert_eq!(sim.read_count(GENI_RX_FIFO_STATUS), 1);
    assert_eq!(sim.read_count(GENI_RX_FIFO), 2);

    assert_eq!(uart.get_byte(&mut port), Err(UartError::NoData));
    assert_eq!(sim.read_count(GENI_RX_FIFO_STATUS), 2);
    assert_eq!(port.baud_rate, 115_200);
}

#[test]
fn geni_full_last_word_errata() {
    let sim = SimBus::new();
    let (mut uart, mut port) = bring_up(&sim, DriverKind::GeniV2, 115_200);
    let base = se_base(DriverKind::GeniV2);

    sim.queue_reads(base + GENI_RX_FIFO_STATUS, [1 | (4 << 28)]);
    sim.queue_reads(base + GENI_RX_FIFO, [0x3433_3231]);

    let received: Vec<u8> = (0..4).map(|_| uart.get_byte(&mut port).unwrap()).collect();
    assert_eq!(received, b"1234");
    assert_eq!(uart.get_byte(&mut port), Err(UartError::NoData));
}

#[test]
fn geni_quiesce_gives_up_after_budget() {
    let sim = SimBus::new();
    sim.poke_u32(GENI_STATUS, 0x1);
    let mut uart = DebugUart::new(DriverKind::GeniV1);
    let mut port = PortDescriptor::new(&sim, 115_200);

    let err = uart
        .initialize(None, &mut port, AccessMode::MMIO32)
        .unwrap_err();

    assert_eq!(
        err,
        UartError::RetryExhausted {
            retries: GENI_QUIESCE_RETRIES
        }
    );
    assert_eq!(sim.read_count(GENI_STATUS), GENI_QUIESCE_RETRIES as usize);
    assert!(sim.writes().is_empty());
}

static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn capture(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if let Ok(mut lines) = CAPTURED.lock() {
        lines.push(format!("[{level}] {args}"));
    }
}

#[test]
fn verification_failures_reach_the_log_hook() {
    // SAFETY: `capture` only appends to a mutex-guarded vector.
    unsafe { log::set_log_fn(capture) };

    let sim = SimBus::new();
    let (mut uart, mut port) = bring_up(&sim, DriverKind::LpssRev2, 115_200);
    // Reset field reads asserted, so D3 must refuse.
    let err = uart.set_power_d3(&mut port).unwrap_err();
    assert!(!err.is_transient());

    let lines = CAPTURED.lock().map(|l| l.clone()).unwrap_or_default();
    assert!(
        lines.iter().any(|l| l.starts_with("[WARN]") && l.contains("refusing D3")),
        "{lines:?}"
    );
}
