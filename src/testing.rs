use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::constants::vga::BUFFER_CELLS;
use crate::idt::VectorTable;
use crate::platform::{Cpu, InterruptController, PortIo};
use crate::vga_buffer::{ScreenChar, TextDisplay};

/// Ports with scripted reads and a log of every write.
#[derive(Default)]
pub struct MockPorts {
    reads: HashMap<u16, VecDeque<u8>>,
    idle: HashMap<u16, u8>,
    pub writes: Vec<(u16, u8)>,
}

impl MockPorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue values returned by successive reads of `port`.
    pub fn script(&mut self, port: u16, values: &[u8]) {
        self.reads.entry(port).or_default().extend(values.iter().copied());
    }

    /// Value returned once the script for `port` runs dry.
    pub fn idle_value(&mut self, port: u16, value: u8) {
        self.idle.insert(port, value);
    }

    pub fn writes_to(&self, port: u16) -> Vec<u8> {
        self.writes
            .iter()
            .filter(|(p, _)| *p == port)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl PortIo for MockPorts {
    unsafe fn read_u8(&mut self, port: u16) -> u8 {
        match self.reads.get_mut(&port).and_then(|q| q.pop_front()) {
            Some(value) => value,
            None => self.idle.get(&port).copied().unwrap_or(0),
        }
    }

    unsafe fn write_u8(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
    }
}

/// A CPU whose halt runs a hook, standing in for the interrupt that wakes it.
pub struct MockCpu<'a> {
    enabled: Cell<bool>,
    tick: Cell<u64>,
    pub halts: Cell<usize>,
    pub events: RefCell<Vec<&'static str>>,
    on_halt: RefCell<Option<Box<dyn FnMut(u64) + 'a>>>,
}

impl<'a> MockCpu<'a> {
    pub fn new(enabled: bool) -> Self {
        MockCpu {
            enabled: Cell::new(enabled),
            tick: Cell::new(0),
            halts: Cell::new(0),
            events: RefCell::new(Vec::new()),
            on_halt: RefCell::new(None),
        }
    }

    /// Install the "interrupt" delivered on every halt. It receives the tick.
    pub fn on_halt(&self, hook: impl FnMut(u64) + 'a) {
        *self.on_halt.borrow_mut() = Some(Box::new(hook));
    }
}

impl Cpu for MockCpu<'_> {
    fn enable_interrupts(&self) {
        self.enabled.set(true);
        self.events.borrow_mut().push("sti");
    }

    fn disable_interrupts(&self) {
        self.enabled.set(false);
        self.events.borrow_mut().push("cli");
    }

    fn interrupts_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn enable_and_halt(&self) {
        self.enabled.set(true);
        self.events.borrow_mut().push("sti;hlt");
        let halts = self.halts.get() + 1;
        self.halts.set(halts);
        assert!(halts < 10_000, "halted forever");
        self.tick.set(self.tick.get() + 1_000_000_000);
        let tick = self.tick.get();
        if let Some(hook) = self.on_halt.borrow_mut().as_mut() {
            hook(tick);
        }
    }

    fn ticks(&self) -> u64 {
        self.tick.get()
    }
}

/// Vector table that remembers installed gates. Loading it can be logged
/// into a `MockCpu`'s event list to check ordering.
#[derive(Default)]
pub struct MockTable<'a> {
    pub gates: Vec<(u8, u64)>,
    pub loads: Cell<usize>,
    log: Option<&'a RefCell<Vec<&'static str>>>,
}

impl<'a> MockTable<'a> {
    pub fn logging_to(log: &'a RefCell<Vec<&'static str>>) -> Self {
        MockTable {
            log: Some(log),
            ..Default::default()
        }
    }
}

impl VectorTable for MockTable<'_> {
    fn clear(&mut self) {
        self.gates.clear();
    }

    unsafe fn install(&mut self, vector: u8, handler: u64) {
        self.gates.retain(|&(v, _)| v != vector);
        self.gates.push((vector, handler));
    }

    unsafe fn activate(&self) {
        self.loads.set(self.loads.get() + 1);
        if let Some(log) = self.log {
            log.borrow_mut().push("lidt");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PicEvent {
    Remap,
    Masks(u8, u8),
    Eoi(u8),
}

#[derive(Default)]
pub struct MockPics {
    pub events: Vec<PicEvent>,
}

impl InterruptController for MockPics {
    unsafe fn remap(&mut self) {
        self.events.push(PicEvent::Remap);
    }

    unsafe fn set_masks(&mut self, primary: u8, secondary: u8) {
        self.events.push(PicEvent::Masks(primary, secondary));
    }

    unsafe fn end_of_interrupt(&mut self, vector: u8) {
        self.events.push(PicEvent::Eoi(vector));
    }
}

/// Frame buffer that counts every hardware write.
pub struct RecordingDisplay {
    pub cells: Vec<Option<ScreenChar>>,
    pub writes: usize,
    pub per_cell: Vec<usize>,
    pub cursor: Option<u16>,
    pub cursor_updates: usize,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        RecordingDisplay {
            cells: vec![None; BUFFER_CELLS],
            writes: 0,
            per_cell: vec![0; BUFFER_CELLS],
            cursor: None,
            cursor_updates: 0,
        }
    }
}

impl TextDisplay for RecordingDisplay {
    fn write_cell(&mut self, index: usize, cell: ScreenChar) {
        self.cells[index] = Some(cell);
        self.per_cell[index] += 1;
        self.writes += 1;
    }

    fn set_cursor(&mut self, offset: u16) {
        self.cursor = Some(offset);
        self.cursor_updates += 1;
    }
}
