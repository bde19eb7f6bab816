use lazy_static::lazy_static;
use log::{info, warn};
use spin::Mutex;
use x86_64::structures::idt::InterruptDescriptorTable;

use crate::constants::interrupts::{KEYBOARD_IRQ, PIC_1_OFFSET, PIC_2_OFFSET, PIC_LINES};
use crate::constants::keyboard::DEBOUNCE_WINDOW_TICKS;
use crate::idt::{self, Gate};
use crate::isr::{self, IsrRegistry};
use crate::keyboard::{self, Keyboard};
use crate::x86::{HardwarePorts, Pic8259, X86Cpu};

/// Hardware interrupt numbers (after remapping)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC_1_OFFSET,
    Keyboard,
    // PIC 1 (master) IRQs 2-7
    Cascade,
    COM2,
    COM1,
    LPT2,
    FloppyDisk,
    LPT1,
    // PIC 2 (slave) IRQs 8-15
    RTC = PIC_2_OFFSET,
    ACPI,
    Available1,
    Available2,
    Mouse,
    CoProcessor,
    PrimaryATA,
    SecondaryATA,
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn irq(self) -> u8 {
        self.as_u8() - PIC_1_OFFSET
    }
}

pub static PICS: Mutex<Pic8259> = Mutex::new(Pic8259::remapped());
pub static REGISTRY: Mutex<IsrRegistry> = Mutex::new(IsrRegistry::new());
pub static KEYBOARD: Mutex<Keyboard> = Mutex::new(Keyboard::new(DEBOUNCE_WINDOW_TICKS));
pub static CPU: X86Cpu = X86Cpu;

lazy_static! {
    static ref IDT: Mutex<InterruptDescriptorTable> = Mutex::new(InterruptDescriptorTable::new());
}

#[cfg(target_os = "none")]
macro_rules! irq_trampoline {
    ($name:ident, $irq:expr) => {
        extern "x86-interrupt" fn $name(_frame: InterruptStackFrame) {
            isr::dispatch(&REGISTRY, PIC_1_OFFSET + $irq, &PICS);
        }
    };
}

#[cfg(target_os = "none")]
mod trampolines {
    use x86_64::structures::idt::InterruptStackFrame;

    use super::{isr, PICS, PIC_1_OFFSET, REGISTRY};

    irq_trampoline!(irq_0, 0);
    irq_trampoline!(irq_1, 1);
    irq_trampoline!(irq_2, 2);
    irq_trampoline!(irq_3, 3);
    irq_trampoline!(irq_4, 4);
    irq_trampoline!(irq_5, 5);
    irq_trampoline!(irq_6, 6);
    irq_trampoline!(irq_7, 7);
    irq_trampoline!(irq_8, 8);
    irq_trampoline!(irq_9, 9);
    irq_trampoline!(irq_10, 10);
    irq_trampoline!(irq_11, 11);
    irq_trampoline!(irq_12, 12);
    irq_trampoline!(irq_13, 13);
    irq_trampoline!(irq_14, 14);
    irq_trampoline!(irq_15, 15);

    pub const IRQ_STUBS: [extern "x86-interrupt" fn(InterruptStackFrame); 16] = [
        irq_0, irq_1, irq_2, irq_3, irq_4, irq_5, irq_6, irq_7,
        irq_8, irq_9, irq_10, irq_11, irq_12, irq_13, irq_14, irq_15,
    ];
}

/// Entry addresses for vectors 32-47.
#[cfg(target_os = "none")]
fn irq_gates() -> [Gate; PIC_LINES as usize] {
    let mut gates = [Gate { vector: 0, handler: 0 }; PIC_LINES as usize];
    for (irq, (gate, stub)) in gates.iter_mut().zip(trampolines::IRQ_STUBS).enumerate() {
        *gate = Gate {
            vector: PIC_1_OFFSET + irq as u8,
            handler: stub as usize as u64,
        };
    }
    gates
}

#[cfg(not(target_os = "none"))]
fn irq_gates() -> [Gate; 0] {
    []
}

fn keyboard_isr() {
    keyboard::service_keyboard(&KEYBOARD, &mut HardwarePorts, &CPU);
}

/// Register handlers, quiet the keyboard controller, build and load the
/// vector table, unmask the keyboard and enable interrupts.
pub fn init() {
    let previous = isr::register(
        &REGISTRY,
        &CPU,
        InterruptIndex::Keyboard.as_u8(),
        keyboard_isr,
    );
    if previous.is_some() {
        warn!("keyboard handler registered twice");
    }

    let drained = unsafe { keyboard::init_controller(&mut HardwarePorts) };
    info!("keyboard controller ready, {} stale bytes dropped", drained);

    let gates = irq_gates();
    unsafe {
        idt::initialize(&*IDT, &gates, &[KEYBOARD_IRQ], &PICS, &CPU);
    }
    info!(
        "interrupts enabled, IRQ {} on vector {}, {} lines",
        InterruptIndex::Keyboard.irq(),
        InterruptIndex::Keyboard.as_u8(),
        PIC_LINES
    );
}
