use spin::Mutex;

use crate::constants::interrupts::{PIC_1_OFFSET, PIC_LINES, VECTOR_COUNT};
use crate::platform::{Cpu, InterruptController};

/// Interrupt service routine callback.
pub type Isr = fn();

/// Vector number -> registered callback.
pub struct IsrRegistry {
    handlers: [Option<Isr>; VECTOR_COUNT],
}

impl IsrRegistry {
    pub const fn new() -> Self {
        IsrRegistry {
            handlers: [None; VECTOR_COUNT],
        }
    }

    /// Last registration wins; the displaced callback is handed back.
    pub fn register(&mut self, vector: u8, handler: Isr) -> Option<Isr> {
        self.handlers[usize::from(vector)].replace(handler)
    }

    pub fn handler(&self, vector: u8) -> Option<Isr> {
        self.handlers[usize::from(vector)]
    }
}

impl Default for IsrRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The lock is only held with interrupts off.
pub fn register<C: Cpu + ?Sized>(
    registry: &Mutex<IsrRegistry>,
    cpu: &C,
    vector: u8,
    handler: Isr,
) -> Option<Isr> {
    without_interrupts(cpu, || registry.lock().register(vector, handler))
}

/// Trampoline body. No lock is held while the callback runs.
pub fn dispatch<P: InterruptController>(
    registry: &Mutex<IsrRegistry>,
    vector: u8,
    pics: &Mutex<P>,
) -> bool {
    let handler = registry.lock().handler(vector);
    if let Some(handler) = handler {
        handler();
    }

    if is_hardware_vector(vector) {
        unsafe { pics.lock().end_of_interrupt(vector) };
    }

    handler.is_some()
}

/// Vectors 32-47, where the remapped IRQ lines land.
pub fn is_hardware_vector(vector: u8) -> bool {
    (PIC_1_OFFSET..PIC_1_OFFSET + PIC_LINES).contains(&vector)
}

/// `sti`
pub fn enable<C: Cpu + ?Sized>(cpu: &C) {
    cpu.enable_interrupts();
}

/// `cli`. Blocks every vector, so keep the span short.
pub fn disable<C: Cpu + ?Sized>(cpu: &C) {
    cpu.disable_interrupts();
}

/// Interrupts stay off while this is alive; the previous state comes back
/// when it is dropped.
pub struct CriticalSection<'a, C: Cpu + ?Sized> {
    cpu: &'a C,
    was_enabled: bool,
}

impl<'a, C: Cpu + ?Sized> CriticalSection<'a, C> {
    pub fn enter(cpu: &'a C) -> Self {
        let was_enabled = cpu.interrupts_enabled();
        cpu.disable_interrupts();
        CriticalSection { cpu, was_enabled }
    }

    pub fn was_enabled(&self) -> bool {
        self.was_enabled
    }

    /// Leave by enabling interrupts and halting in one step.
    pub fn wait_for_interrupt(self) {
        let cpu = self.cpu;
        core::mem::forget(self);
        cpu.enable_and_halt();
    }
}

impl<C: Cpu + ?Sized> Drop for CriticalSection<'_, C> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.cpu.enable_interrupts();
        }
    }
}

pub fn without_interrupts<C, F, R>(cpu: &C, f: F) -> R
where
    C: Cpu + ?Sized,
    F: FnOnce() -> R,
{
    let _section = CriticalSection::enter(cpu);
    f()
}
