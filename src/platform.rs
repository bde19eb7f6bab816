use crate::constants::interrupts::IO_WAIT_PORT;

/// Single-byte access to the x86 I/O address space.
pub trait PortIo {
    /// # Safety
    /// Reading a device port can have side effects on the device.
    unsafe fn read_u8(&mut self, port: u16) -> u8;

    /// # Safety
    /// Writing a device port reconfigures hardware.
    unsafe fn write_u8(&mut self, port: u16, value: u8);

    /// # Safety
    /// Writes to the POST diagnostic port.
    unsafe fn io_wait(&mut self) {
        unsafe { self.write_u8(IO_WAIT_PORT, 0) }
    }
}

/// Interrupt flag, halting and time of the one CPU.
pub trait Cpu {
    fn enable_interrupts(&self);
    fn disable_interrupts(&self);
    fn interrupts_enabled(&self) -> bool;

    /// `sti; hlt`, no window between the two.
    fn enable_and_halt(&self);

    /// Monotonic tick counter.
    fn ticks(&self) -> u64;
}

/// The cascaded interrupt controller pair.
pub trait InterruptController {
    /// # Safety
    /// Must run with interrupts disabled.
    unsafe fn remap(&mut self);

    /// # Safety
    /// A cleared bit lets that line reach the CPU.
    unsafe fn set_masks(&mut self, primary: u8, secondary: u8);

    /// # Safety
    /// Acknowledging a line that was not raised may swallow a later interrupt.
    unsafe fn end_of_interrupt(&mut self, vector: u8);
}
