//! GENI serial-engine register map.
//!
//! The serial engine window is split into four blocks. Offsets below are
//! relative to the start of their block; [`GeniRegs`] positions the blocks
//! for a given revision.

use bitflags::bitflags;
use kdserial_mmio::{RegisterBus, Window, register_block};

/// `GENI4_CFG` block offset inside the serial engine window.
pub const GENI4_CFG: usize = 0x000;
/// `GENI4_IMAGE_REGS` block offset.
pub const GENI4_IMAGE_REGS: usize = 0x100;
/// `GENI4_DATA` block offset.
pub const GENI4_DATA: usize = 0x600;
/// `QUPV3_SE_DMA` block offset.
pub const QUPV3_SE_DMA: usize = 0xC00;

bitflags! {
    /// `SE_GENI_STATUS` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GeniStatus: u32 {
        /// The main sequencer is executing a command.
        const M_GENI_CMD_ACTIVE = 1 << 0;
        /// The secondary sequencer is executing a command.
        const S_GENI_CMD_ACTIVE = 1 << 12;
    }
}

bitflags! {
    /// `SE_IRQ_EN` bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SeIrqEn: u32 {
        /// DMA receive interrupt.
        const DMA_RX_IRQ_EN = 1 << 0;
        /// DMA transmit interrupt.
        const DMA_TX_IRQ_EN = 1 << 1;
        /// Main sequencer interrupt.
        const GENI_M_IRQ_EN = 1 << 2;
        /// Secondary sequencer interrupt.
        const GENI_S_IRQ_EN = 1 << 3;
    }
}

bitflags! {
    /// `SE_GENI_M_IRQ_*` bits the driver enables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MIrq: u32 {
        /// Command finished.
        const M_CMD_DONE = 1 << 0;
        /// TX FIFO below watermark.
        const M_TX_FIFO_WATERMARK = 1 << 30;
    }
}

bitflags! {
    /// `SE_GENI_S_IRQ_*` bits the driver enables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SIrq: u32 {
        /// Command finished.
        const S_CMD_DONE = 1 << 0;
        /// RX FIFO above watermark.
        const S_RX_FIFO_WATERMARK = 1 << 26;
        /// Last RX word arrived.
        const S_RX_FIFO_LAST = 1 << 27;
    }
}

register_block! {
    /// `GENI4_CFG`: clocking and pad control.
    pub GeniCfgRegs {
        /// GENI_FORCE_DEFAULT_REG.
        [0x20; u32; rw] force_default,
        /// GENI_OUTPUT_CTRL.
        [0x24; u32; rw] output_ctrl,
        /// GENI_CGC_CTRL.
        [0x28; u32; rw] cgc_ctrl,
        /// SE_GENI_STATUS.
        [0x40; u32; ro] status => GeniStatus,
        /// GENI_SER_M_CLK_CFG.
        [0x48; u32; rw] ser_m_clk_cfg,
        /// GENI_SER_S_CLK_CFG.
        [0x4C; u32; rw] ser_s_clk_cfg,
    }
}

register_block! {
    /// `GENI4_IMAGE_REGS`: protocol image configuration.
    pub GeniImageRegs {
        /// GENI_DMA_MODE_EN.
        [0x158; u32; rw] dma_mode_en,
        /// SE_UART_TX_TRANS_CFG.
        [0x15C; u32; rw] tx_trans_cfg,
        /// SE_GENI_TX_PACKING_CFG0.
        [0x160; u32; rw] tx_packing_cfg0,
        /// SE_GENI_TX_PACKING_CFG1.
        [0x164; u32; rw] tx_packing_cfg1,
        /// SE_UART_TX_WORD_LEN.
        [0x168; u32; rw] tx_word_len,
        /// SE_UART_TX_STOP_BIT_LEN.
        [0x16C; u32; rw] tx_stop_bit_len,
        /// SE_UART_TX_TRANS_LEN.
        [0x170; u32; rw] tx_trans_len,
        /// SE_UART_RX_TRANS_CFG.
        [0x180; u32; rw] rx_trans_cfg,
        /// SE_GENI_RX_PACKING_CFG0.
        [0x184; u32; rw] rx_packing_cfg0,
        /// SE_GENI_RX_PACKING_CFG1.
        [0x188; u32; rw] rx_packing_cfg1,
        /// SE_UART_RX_WORD_LEN.
        [0x18C; u32; rw] rx_word_len,
        /// SE_UART_RX_STALE_CNT.
        [0x194; u32; rw] rx_stale_cnt,
        /// SE_UART_TX_PARITY_CFG.
        [0x1A4; u32; rw] tx_parity_cfg,
        /// SE_UART_RX_PARITY_CFG.
        [0x1A8; u32; rw] rx_parity_cfg,
    }
}

register_block! {
    /// `GENI4_DATA`: sequencer commands, interrupts and FIFOs.
    pub GeniDataRegs {
        /// SE_GENI_M_CMD0.
        [0x000; u32; rw] m_cmd0,
        /// SE_GENI_M_IRQ_STATUS.
        [0x010; u32; ro] m_irq_status => MIrq,
        /// SE_GENI_M_IRQ_EN.
        [0x014; u32; rw] m_irq_en => MIrq,
        /// SE_GENI_M_IRQ_CLEAR.
        [0x018; u32; wo] m_irq_clear => MIrq,
        /// SE_GENI_S_CMD0.
        [0x030; u32; rw] s_cmd0,
        /// SE_GENI_S_IRQ_STATUS.
        [0x040; u32; ro] s_irq_status => SIrq,
        /// SE_GENI_S_IRQ_EN.
        [0x044; u32; rw] s_irq_en => SIrq,
        /// SE_GENI_S_IRQ_CLEAR.
        [0x048; u32; wo] s_irq_clear => SIrq,
        /// SE_GENI_TX_FIFOn.
        [0x100; u32; wo] tx_fifo,
        /// SE_GENI_RX_FIFOn.
        [0x180; u32; ro] rx_fifo,
        /// SE_GENI_TX_FIFO_STATUS.
        [0x200; u32; ro] tx_fifo_status,
        /// SE_GENI_RX_FIFO_STATUS.
        [0x204; u32; ro] rx_fifo_status,
        /// SE_GENI_TX_WATERMARK_REG.
        [0x20C; u32; rw] tx_watermark,
        /// SE_GENI_RX_WATERMARK_REG.
        [0x210; u32; rw] rx_watermark,
        /// SE_GENI_RX_RFR_WATERMARK_REG.
        [0x214; u32; rw] rx_rfr_watermark,
    }
}

register_block! {
    /// `QUPV3_SE_DMA`: DMA and event routing.
    pub SeDmaRegs {
        /// SE_GSI_EVENT_EN.
        [0x218; u32; rw] gsi_event_en,
        /// SE_IRQ_EN.
        [0x21C; u32; rw] irq_en => SeIrqEn,
        /// SE_HW_PARAM_1.
        [0x228; u32; ro] hw_param_1,
        /// SE_DMA_GENERAL_CFG.
        [0x230; u32; rw] dma_general_cfg,
    }
}

/// The four register blocks of one serial engine.
#[derive(Debug, Clone, Copy)]
pub struct GeniRegs<B> {
    /// `GENI4_CFG`.
    pub cfg: GeniCfgRegs<Window<B>>,
    /// `GENI4_IMAGE_REGS`.
    pub image: GeniImageRegs<Window<B>>,
    /// `GENI4_DATA`.
    pub data: GeniDataRegs<Window<B>>,
    /// `QUPV3_SE_DMA`.
    pub dma: SeDmaRegs<Window<B>>,
}

impl<B: RegisterBus + Copy> GeniRegs<B> {
    /// Positions the blocks for a serial engine window at `se_base`.
    #[must_use]
    pub const fn new(bus: B, se_base: usize) -> Self {
        Self {
            cfg: GeniCfgRegs::new(Window::new(bus, se_base + GENI4_CFG)),
            image: GeniImageRegs::new(Window::new(bus, se_base + GENI4_IMAGE_REGS)),
            data: GeniDataRegs::new(Window::new(bus, se_base + GENI4_DATA)),
            dma: SeDmaRegs::new(Window::new(bus, se_base + QUPV3_SE_DMA)),
        }
    }
}
