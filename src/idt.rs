use log::debug;
use spin::Mutex;
use x86_64::structures::idt::InterruptDescriptorTable;
use x86_64::VirtAddr;

use crate::constants::interrupts::{CASCADE_IRQ, PIC_LINES};
use crate::isr;
use crate::platform::{Cpu, InterruptController};

/// A table `initialize` can rebuild and hand to the CPU.
pub trait VectorTable {
    /// Mark every vector not present.
    fn clear(&mut self);

    /// # Safety
    /// `handler` must be the address of an interrupt entry point.
    unsafe fn install(&mut self, vector: u8, handler: u64);

    /// # Safety
    /// The table must stay where it is for as long as the CPU uses it.
    unsafe fn activate(&self);
}

impl VectorTable for InterruptDescriptorTable {
    fn clear(&mut self) {
        *self = InterruptDescriptorTable::new();
    }

    unsafe fn install(&mut self, vector: u8, handler: u64) {
        unsafe {
            self[vector].set_handler_addr(VirtAddr::new(handler));
        }
    }

    unsafe fn activate(&self) {
        unsafe { self.load_unsafe() }
    }
}

/// A trampoline to install: vector number and entry address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub vector: u8,
    pub handler: u64,
}

/// Mask bytes for the (primary, secondary) controllers with only `lines`
/// let through. A secondary line also opens the cascade line.
pub fn irq_masks(lines: &[u8]) -> (u8, u8) {
    let mut primary = 0xFFu8;
    let mut secondary = 0xFFu8;
    for &line in lines.iter().filter(|&&line| line < PIC_LINES) {
        if line < 8 {
            primary &= !(1 << line);
        } else {
            secondary &= !(1 << (line - 8));
            primary &= !(1 << CASCADE_IRQ);
        }
    }
    (primary, secondary)
}

/// Remap, load `table` with only `gates`, unmask `lines`, then `sti`.
///
/// # Safety
/// `table` must be a static and every gate a valid entry point.
pub unsafe fn initialize<T, P, C>(
    table: &Mutex<T>,
    gates: &[Gate],
    lines: &[u8],
    pics: &Mutex<P>,
    cpu: &C,
) where
    T: VectorTable,
    P: InterruptController,
    C: Cpu + ?Sized,
{
    isr::disable(cpu);
    {
        let mut pics = pics.lock();
        unsafe { pics.remap() };

        let mut table = table.lock();
        table.clear();
        for gate in gates {
            unsafe { table.install(gate.vector, gate.handler) };
        }
        unsafe { table.activate() };
        debug!("vector table loaded, {} gates", gates.len());

        let (primary, secondary) = irq_masks(lines);
        unsafe { pics.set_masks(primary, secondary) };
        debug!("PIC masks {:#04x}/{:#04x}", primary, secondary);
    }
    isr::enable(cpu);
}
