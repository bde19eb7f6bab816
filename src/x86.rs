use pic8259::ChainedPics;
use x86_64::instructions::interrupts;
use x86_64::instructions::port::Port;

use crate::constants::interrupts::{PIC_1_OFFSET, PIC_2_OFFSET};
use crate::platform::{Cpu, InterruptController, PortIo};

/// Primary and secondary 8259 data (mask) ports
const PIC_1_DATA: u16 = 0x21;
const PIC_2_DATA: u16 = 0xA1;

/// Direct `in`/`out` instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwarePorts;

impl PortIo for HardwarePorts {
    unsafe fn read_u8(&mut self, port: u16) -> u8 {
        let mut port: Port<u8> = Port::new(port);
        unsafe { port.read() }
    }

    unsafe fn write_u8(&mut self, port: u16, value: u8) {
        let mut port: Port<u8> = Port::new(port);
        unsafe { port.write(value) }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct X86Cpu;

impl Cpu for X86Cpu {
    fn enable_interrupts(&self) {
        interrupts::enable();
    }

    fn disable_interrupts(&self) {
        interrupts::disable();
    }

    fn interrupts_enabled(&self) -> bool {
        interrupts::are_enabled()
    }

    fn enable_and_halt(&self) {
        interrupts::enable_and_hlt();
    }

    /// Time stamp counter
    fn ticks(&self) -> u64 {
        unsafe { core::arch::x86_64::_rdtsc() }
    }
}

/// The 8259 pair. Remap and EOI go through `pic8259`; masks are written
/// straight to the data ports.
pub struct Pic8259 {
    pics: ChainedPics,
    ports: HardwarePorts,
}

impl Pic8259 {
    /// # Safety
    /// The offsets must not overlap the CPU exception vectors.
    pub const unsafe fn new(primary_offset: u8, secondary_offset: u8) -> Self {
        Pic8259 {
            pics: unsafe { ChainedPics::new(primary_offset, secondary_offset) },
            ports: HardwarePorts,
        }
    }

    /// The standard layout: IRQ 0-15 on vectors 32-47.
    pub const fn remapped() -> Self {
        unsafe { Self::new(PIC_1_OFFSET, PIC_2_OFFSET) }
    }
}

impl InterruptController for Pic8259 {
    unsafe fn remap(&mut self) {
        unsafe { self.pics.initialize() }
    }

    unsafe fn set_masks(&mut self, primary: u8, secondary: u8) {
        unsafe {
            self.ports.write_u8(PIC_1_DATA, primary);
            self.ports.io_wait();
            self.ports.write_u8(PIC_2_DATA, secondary);
            self.ports.io_wait();
        }
    }

    unsafe fn end_of_interrupt(&mut self, vector: u8) {
        unsafe { self.pics.notify_end_of_interrupt(vector) }
    }
}
