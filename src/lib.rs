#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_os = "none", feature(abi_x86_interrupt))]

pub mod console;
pub mod constants;
pub mod idt;
pub mod interrupts;
pub mod isr;
pub mod keyboard;
pub mod logger;
pub mod platform;
pub mod serial;
pub mod vga_buffer;
pub mod x86;

#[cfg(test)]
mod testing;

use log::{info, warn};

/// Boot order: serial + logger, screen, then interrupts (enables them).
pub fn init() {
    serial::init();
    if logger::init().is_err() {
        crate::serial_println!("logger already installed");
    }

    {
        let mut screen = vga_buffer::WRITER.lock();
        screen.initialize();
        screen.display_mut().crtc().enable_cursor(
            constants::crtc::CURSOR_SCANLINE_START,
            constants::crtc::CURSOR_SCANLINE_END,
        );
    }
    info!("screen ready");

    interrupts::init();
    if !x86_64::instructions::interrupts::are_enabled() {
        warn!("interrupts still disabled after init");
    }
}

pub fn hlt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}
