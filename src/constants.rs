/// System-wide constants to avoid magic numbers

/// VGA text mode constants
pub mod vga {
    /// VGA text buffer physical address
    pub const BUFFER_ADDR: usize = 0xb8000;

    /// VGA text mode dimensions
    pub const BUFFER_HEIGHT: usize = 25;
    pub const BUFFER_WIDTH: usize = 80;
    pub const BUFFER_CELLS: usize = BUFFER_WIDTH * BUFFER_HEIGHT;

    /// Light grey on black
    pub const DEFAULT_ATTRIBUTE: u8 = 0x07;
}

/// CRT controller (cursor) registers
pub mod crtc {
    pub const INDEX_PORT: u16 = 0x3D4;
    pub const DATA_PORT: u16 = 0x3D5;

    pub const CURSOR_START_REG: u8 = 0x0A;
    pub const CURSOR_END_REG: u8 = 0x0B;
    pub const CURSOR_LOCATION_HIGH: u8 = 0x0E;
    pub const CURSOR_LOCATION_LOW: u8 = 0x0F;

    /// Underline-style cursor scanlines
    pub const CURSOR_SCANLINE_START: u8 = 14;
    pub const CURSOR_SCANLINE_END: u8 = 15;
}

/// PS/2 Keyboard controller constants
pub mod keyboard {
    /// PS/2 keyboard data port
    pub const DATA_PORT: u16 = 0x60;

    /// PS/2 keyboard status/command port
    pub const STATUS_COMMAND_PORT: u16 = 0x64;

    /// Status register bit flags
    pub const STATUS_OUTPUT_BUFFER_FULL: u8 = 0x01;
    pub const STATUS_INPUT_BUFFER_FULL: u8 = 0x02;

    /// Command to reset CPU via keyboard controller
    pub const CMD_RESET_CPU: u8 = 0xFE;

    /// Upper bound on status polls during controller bring-up
    pub const STATUS_POLL_LIMIT: usize = 10_000;

    /// Decoded character queue capacity
    pub const BUFFER_SIZE: usize = 256;

    /// Minimum TSC distance between two accepted keystrokes
    /// (about 2ms on a 2.5GHz part).
    pub const DEBOUNCE_WINDOW_TICKS: u64 = 5_000_000;
}

/// Interrupt constants
pub mod interrupts {
    /// PIC (Programmable Interrupt Controller) offset
    /// We remap PIC interrupts to start at 32 to avoid conflicts with CPU exceptions
    pub const PIC_1_OFFSET: u8 = 32;
    pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

    /// Number of lines on the cascaded pair
    pub const PIC_LINES: u8 = 16;

    /// Line the secondary controller is wired to on the primary
    pub const CASCADE_IRQ: u8 = 2;
    pub const KEYBOARD_IRQ: u8 = 1;

    /// POST diagnostic port, written to for a short I/O delay
    pub const IO_WAIT_PORT: u16 = 0x80;

    pub const VECTOR_COUNT: usize = 256;
}

/// Serial console used as the log sink
pub mod serial {
    pub const COM1: u16 = 0x3F8;

    pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
}
