use spin::Mutex;

use crate::constants::keyboard::{
    BUFFER_SIZE, CMD_RESET_CPU, DATA_PORT, STATUS_COMMAND_PORT, STATUS_INPUT_BUFFER_FULL,
    STATUS_OUTPUT_BUFFER_FULL, STATUS_POLL_LIMIT,
};
use crate::isr::CriticalSection;
use crate::platform::{Cpu, PortIo};

/// Break codes are make codes with this bit set
const RELEASE: u8 = 0x80;

const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;
const CTRL: u8 = 0x1D;
const ALT: u8 = 0x38;
const CAPS_LOCK: u8 = 0x3A;
const NUM_LOCK: u8 = 0x45;
const SCROLL_LOCK: u8 = 0x46;
const DELETE: u8 = 0x53;

/// Scan code set 1, US layout, make codes 0x00-0x39. 0 = nothing printable.
const SCANCODE_ASCII: [u8; 58] = [
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08,
    b'\t', b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n',
    0, b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`',
    0, b'\\', b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0,
    b'*', 0, b' ',
];

const SCANCODE_ASCII_SHIFTED: [u8; 58] = [
    0, 0x1B, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08,
    b'\t', b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n',
    0, b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~',
    0, b'|', b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0,
    b'*', 0, b' ',
];

/// Fixed-capacity ring. A full queue hands the byte back.
pub struct CharQueue<const N: usize> {
    buffer: [u8; N],
    start: usize,
    end: usize,
    count: usize,
}

impl<const N: usize> CharQueue<N> {
    pub const fn new() -> Self {
        CharQueue {
            buffer: [0; N],
            start: 0,
            end: 0,
            count: 0,
        }
    }

    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        if self.count >= N {
            return Err(byte);
        }
        self.buffer[self.end] = byte;
        self.end = (self.end + 1) % N;
        self.count += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.count == 0 {
            return None;
        }
        let byte = self.buffer[self.start];
        self.start = (self.start + 1) % N;
        self.count -= 1;
        Some(byte)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<const N: usize> Default for CharQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Modifier keys. Shift, ctrl and alt follow the key; the locks toggle on press.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    pub left_shift: bool,
    pub right_shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub caps_lock: bool,
    pub num_lock: bool,
    pub scroll_lock: bool,
}

impl Modifiers {
    pub const fn new() -> Self {
        Modifiers {
            left_shift: false,
            right_shift: false,
            ctrl: false,
            alt: false,
            caps_lock: false,
            num_lock: false,
            scroll_lock: false,
        }
    }

    pub fn shift(&self) -> bool {
        self.left_shift || self.right_shift
    }

    /// Returns false when `scancode` is not a modifier key.
    fn apply(&mut self, scancode: u8) -> bool {
        let pressed = scancode & RELEASE == 0;
        match scancode & !RELEASE {
            LEFT_SHIFT => self.left_shift = pressed,
            RIGHT_SHIFT => self.right_shift = pressed,
            CTRL => self.ctrl = pressed,
            ALT => self.alt = pressed,
            CAPS_LOCK => self.caps_lock ^= pressed,
            NUM_LOCK => self.num_lock ^= pressed,
            SCROLL_LOCK => self.scroll_lock ^= pressed,
            _ => return false,
        }
        true
    }
}

/// Map a scancode to ASCII under the given modifiers. Break codes and codes
/// past the end of the table decode to nothing.
pub fn decode(scancode: u8, modifiers: &Modifiers) -> Option<u8> {
    if scancode & RELEASE != 0 {
        return None;
    }
    let index = usize::from(scancode);
    let base = *SCANCODE_ASCII.get(index)?;
    let byte = if base.is_ascii_lowercase() {
        if modifiers.shift() != modifiers.caps_lock {
            base.to_ascii_uppercase()
        } else {
            base
        }
    } else if modifiers.shift() {
        SCANCODE_ASCII_SHIFTED[index]
    } else {
        base
    };
    (byte != 0).then_some(byte)
}

/// Suppresses a keystroke that lands too soon after the last accepted one.
#[derive(Debug, Clone, Copy)]
pub struct Debounce {
    window: u64,
    last: Option<u64>,
}

impl Debounce {
    pub const fn new(window: u64) -> Self {
        Debounce { window, last: None }
    }

    pub fn suppresses(&self, now: u64) -> bool {
        match self.last {
            Some(last) => now.wrapping_sub(last) < self.window,
            None => false,
        }
    }

    pub fn accept(&mut self, now: u64) {
        self.last = Some(now);
    }
}

/// What one scancode did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Modifier,
    Debounced,
    Overflow,
    /// Break code or no printable mapping
    Unmapped,
    Queued(u8),
    /// Ctrl+Alt+Delete
    Reboot,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardStats {
    pub queued: u64,
    pub debounced: u64,
    pub overflowed: u64,
    pub unmapped: u64,
}

/// Keyboard state shared between the interrupt handler and the console.
pub struct Keyboard<const N: usize = BUFFER_SIZE> {
    queue: CharQueue<N>,
    modifiers: Modifiers,
    debounce: Debounce,
    echo: bool,
    stats: KeyboardStats,
}

impl<const N: usize> Keyboard<N> {
    pub const fn new(debounce_window: u64) -> Self {
        Keyboard {
            queue: CharQueue::new(),
            modifiers: Modifiers::new(),
            debounce: Debounce::new(debounce_window),
            echo: true,
            stats: KeyboardStats {
                queued: 0,
                debounced: 0,
                overflowed: 0,
                unmapped: 0,
            },
        }
    }

    pub fn handle_scancode(&mut self, scancode: u8, now: u64) -> ScanOutcome {
        if self.modifiers.apply(scancode) {
            return ScanOutcome::Modifier;
        }
        if scancode == DELETE && self.modifiers.ctrl && self.modifiers.alt {
            return ScanOutcome::Reboot;
        }
        if self.debounce.suppresses(now) {
            self.stats.debounced += 1;
            return ScanOutcome::Debounced;
        }
        let Some(byte) = decode(scancode, &self.modifiers) else {
            self.stats.unmapped += 1;
            return ScanOutcome::Unmapped;
        };
        match self.queue.push(byte) {
            Ok(()) => {
                self.debounce.accept(now);
                self.stats.queued += 1;
                ScanOutcome::Queued(byte)
            }
            Err(_) => {
                self.stats.overflowed += 1;
                ScanOutcome::Overflow
            }
        }
    }

    pub fn available(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn stats(&self) -> KeyboardStats {
        self.stats
    }

    pub fn set_echo(&mut self, enable: bool) {
        self.echo = enable;
    }

    pub fn echo_enabled(&self) -> bool {
        self.echo
    }
}

pub fn available<C, const N: usize>(keyboard: &Mutex<Keyboard<N>>, cpu: &C) -> bool
where
    C: Cpu + ?Sized,
{
    let _section = CriticalSection::enter(cpu);
    keyboard.lock().available()
}

/// Pop one character if there is one, never halts.
pub fn try_getchar<C, const N: usize>(keyboard: &Mutex<Keyboard<N>>, cpu: &C) -> Option<u8>
where
    C: Cpu + ?Sized,
{
    let _section = CriticalSection::enter(cpu);
    keyboard.lock().pop()
}

/// Halt until a character is queued. Returns false without halting when
/// interrupts are off, since nothing could ever wake the CPU.
pub fn wait_for_input<C, const N: usize>(keyboard: &Mutex<Keyboard<N>>, cpu: &C) -> bool
where
    C: Cpu + ?Sized,
{
    let section = CriticalSection::enter(cpu);
    if keyboard.lock().available() {
        return true;
    }
    if !section.was_enabled() {
        return false;
    }
    section.wait_for_interrupt();
    true
}

/// Blocking read. `None` if interrupts are off and nothing is queued.
pub fn getchar<C, const N: usize>(keyboard: &Mutex<Keyboard<N>>, cpu: &C) -> Option<u8>
where
    C: Cpu + ?Sized,
{
    loop {
        let section = CriticalSection::enter(cpu);
        if let Some(byte) = keyboard.lock().pop() {
            return Some(byte);
        }
        if !section.was_enabled() {
            return None;
        }
        section.wait_for_interrupt();
    }
}

/// Read a NUL-terminated line into `buf`, without the newline.
pub fn readline<C, const N: usize>(keyboard: &Mutex<Keyboard<N>>, cpu: &C, buf: &mut [u8]) -> usize
where
    C: Cpu + ?Sized,
{
    let Some(limit) = buf.len().checked_sub(1) else {
        return 0;
    };
    let mut count = 0;
    while count < limit {
        match getchar(keyboard, cpu) {
            Some(b'\n') | None => break,
            Some(0x08) => count = count.saturating_sub(1),
            Some(byte) => {
                buf[count] = byte;
                count += 1;
            }
        }
    }
    buf[count] = 0;
    count
}

/// # Safety
/// The read consumes the byte.
pub unsafe fn read_scancode<P: PortIo + ?Sized>(ports: &mut P) -> u8 {
    unsafe { ports.read_u8(DATA_PORT) }
}

/// Drain stale output. Returns the number of bytes dropped.
///
/// # Safety
/// Run with the keyboard line masked.
pub unsafe fn init_controller<P: PortIo + ?Sized>(ports: &mut P) -> usize {
    unsafe {
        for _ in 0..STATUS_POLL_LIMIT {
            if ports.read_u8(STATUS_COMMAND_PORT) & STATUS_INPUT_BUFFER_FULL == 0 {
                break;
            }
        }

        let mut drained = 0;
        while drained < STATUS_POLL_LIMIT
            && ports.read_u8(STATUS_COMMAND_PORT) & STATUS_OUTPUT_BUFFER_FULL != 0
        {
            ports.read_u8(DATA_PORT);
            drained += 1;
        }
        drained
    }
}

/// Keyboard interrupt body
pub fn service_keyboard<P, C, const N: usize>(
    keyboard: &Mutex<Keyboard<N>>,
    ports: &mut P,
    cpu: &C,
) -> ScanOutcome
where
    P: PortIo + ?Sized,
    C: Cpu + ?Sized,
{
    let scancode = unsafe { read_scancode(ports) };
    let outcome = keyboard.lock().handle_scancode(scancode, cpu.ticks());
    if outcome == ScanOutcome::Reboot {
        reset_cpu(ports, cpu);
    }
    outcome
}

/// Send reset command to keyboard controller (for reboot)
pub fn reset_cpu<P, C>(ports: &mut P, cpu: &C) -> !
where
    P: PortIo + ?Sized,
    C: Cpu + ?Sized,
{
    unsafe {
        ports.write_u8(STATUS_COMMAND_PORT, CMD_RESET_CPU);
    }

    loop {
        cpu.enable_and_halt();
    }
}
