// Physical address map: memory regions and the RCP register blocks.

/// Declares a register block: the inclusive window it decodes and every
/// register in it as an offset from the window base.
macro_rules! register_block {
    ($start:ident ..= $end:ident = $base:expr, $last:expr;
     $($name:ident @ $offset:expr),+ $(,)?) => {
        pub const $start: u32 = $base;
        pub const $end: u32 = $last;
        $(pub const $name: u32 = $base + $offset;)+
    };
}

// Segments

pub const KSEG0_START: u32 = 0x8000_0000;
pub const KSEG1_START: u32 = 0xa000_0000;

// Memories

pub const RDRAM_SIZE:  usize = 8 << 20;
pub const RDRAM_START: u32 = 0x0000_0000;
pub const RDRAM_END:   u32 = RDRAM_START + RDRAM_SIZE as u32 - 1;

pub const SP_MEM_SIZE:   usize = 4 << 10;
pub const SP_DMEM_START: u32 = 0x0400_0000;
pub const SP_DMEM_END:   u32 = SP_DMEM_START + SP_MEM_SIZE as u32 - 1;
pub const SP_IMEM_START: u32 = 0x0400_1000;
pub const SP_IMEM_END:   u32 = SP_IMEM_START + SP_MEM_SIZE as u32 - 1;

pub const CART_ROM_MAX_SIZE: usize = 0x0fc0_0000;
pub const CART_ROM_START:    u32 = 0x1000_0000;
pub const CART_ROM_END:      u32 = CART_ROM_START + CART_ROM_MAX_SIZE as u32 - 1;

// PIF RAM shows up at the start of the PIF window and again at its
// hardware location behind the boot ROM.
pub const PIF_RAM_SIZE:     usize = 64;
pub const PIF_RAM_START:    u32 = 0x1fc0_0000;
pub const PIF_RAM_END:      u32 = PIF_RAM_START + PIF_RAM_SIZE as u32 - 1;
pub const PIF_RAM_HW_START: u32 = 0x1fc0_07c0;
pub const PIF_RAM_HW_END:   u32 = PIF_RAM_HW_START + PIF_RAM_SIZE as u32 - 1;

// Signal processor.  The window is much wider than its registers and PC
// sits in a second page.
register_block!(SP_REG_START ..= SP_REG_END = 0x0404_0000, 0x040f_ffff;
    SP_REG_MEM_ADDR   @ 0x00,
    SP_REG_DRAM_ADDR  @ 0x04,
    SP_REG_RD_LEN     @ 0x08,
    SP_REG_WR_LEN     @ 0x0c,
    SP_REG_STATUS     @ 0x10,
    SP_REG_DMA_FULL   @ 0x14,
    SP_REG_DMA_BUSY   @ 0x18,
    SP_REG_SEMAPHORE  @ 0x1c,
    SP_REG_PC         @ 0x4_0000,
    SP_REG_IBIST      @ 0x4_0004,
);

// Display processor command interface.
register_block!(DP_REG_START ..= DP_REG_END = 0x0410_0000, 0x041f_ffff;
    DPC_REG_START     @ 0x00,
    DPC_REG_END       @ 0x04,
    DPC_REG_CURRENT   @ 0x08,
    DPC_REG_STATUS    @ 0x0c,
    DPC_REG_CLOCK     @ 0x10,
    DPC_REG_BUFBUSY   @ 0x14,
    DPC_REG_PIPEBUSY  @ 0x18,
    DPC_REG_TMEM      @ 0x1c,
);

register_block!(MI_REG_START ..= MI_REG_END = 0x0430_0000, 0x0430_000f;
    MI_REG_MODE       @ 0x00,
    MI_REG_VERSION    @ 0x04,
    MI_REG_INTR       @ 0x08,
    MI_REG_INTR_MASK  @ 0x0c,
);

register_block!(VI_REG_START ..= VI_REG_END = 0x0440_0000, 0x0440_0037;
    VI_REG_STATUS     @ 0x00,
    VI_REG_ORIGIN     @ 0x04,
    VI_REG_H_WIDTH    @ 0x08,
    VI_REG_V_INTR     @ 0x0c,
    VI_REG_CURRENT    @ 0x10,
    VI_REG_BURST      @ 0x14,
    VI_REG_V_SYNC     @ 0x18,
    VI_REG_H_SYNC     @ 0x1c,
    VI_REG_LEAP       @ 0x20,
    VI_REG_H_START    @ 0x24,
    VI_REG_V_START    @ 0x28,
    VI_REG_V_BURST    @ 0x2c,
    VI_REG_X_SCALE    @ 0x30,
    VI_REG_Y_SCALE    @ 0x34,
);

register_block!(AI_REG_START ..= AI_REG_END = 0x0450_0000, 0x0450_0017;
    AI_REG_DRAM_ADDR  @ 0x00,
    AI_REG_LEN        @ 0x04,
    AI_REG_CONTROL    @ 0x08,
    AI_REG_STATUS     @ 0x0c,
    AI_REG_DACRATE    @ 0x10,
    AI_REG_BITRATE    @ 0x14,
);

// Cartridge DMA plus the bus timing of both domains.
register_block!(PI_REG_START ..= PI_REG_END = 0x0460_0000, 0x0460_0033;
    PI_REG_DRAM_ADDR     @ 0x00,
    PI_REG_CART_ADDR     @ 0x04,
    PI_REG_RD_LEN        @ 0x08,
    PI_REG_WR_LEN        @ 0x0c,
    PI_REG_STATUS        @ 0x10,
    PI_REG_BSD_DOM1_LAT  @ 0x14,
    PI_REG_BSD_DOM1_PWD  @ 0x18,
    PI_REG_BSD_DOM1_PGS  @ 0x1c,
    PI_REG_BSD_DOM1_RLS  @ 0x20,
    PI_REG_BSD_DOM2_LAT  @ 0x24,
    PI_REG_BSD_DOM2_PWD  @ 0x28,
    PI_REG_BSD_DOM2_PGS  @ 0x2c,
    PI_REG_BSD_DOM2_RLS  @ 0x30,
);

register_block!(SI_REG_START ..= SI_REG_END = 0x0480_0000, 0x0480_001b;
    SI_REG_DRAM_ADDR       @ 0x00,
    SI_REG_PIF_ADDR_RD64B  @ 0x04,
    SI_REG_PIF_ADDR_WR64B  @ 0x10,
    SI_REG_STATUS          @ 0x18,
);
