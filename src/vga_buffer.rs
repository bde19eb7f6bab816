use core::fmt;

use lazy_static::lazy_static;
use spin::Mutex;
use volatile::Volatile;

use crate::constants::crtc::{
    CURSOR_END_REG, CURSOR_LOCATION_HIGH, CURSOR_LOCATION_LOW, CURSOR_START_REG, DATA_PORT,
    INDEX_PORT,
};
use crate::constants::vga::{
    BUFFER_ADDR, BUFFER_CELLS, BUFFER_HEIGHT, BUFFER_WIDTH, DEFAULT_ATTRIBUTE,
};
use crate::isr;
use crate::platform::PortIo;
use crate::x86::{HardwarePorts, X86Cpu};

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

/// Attribute byte: background in the high nibble, foreground in the low one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    pub const fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((background as u8) << 4 | (foreground as u8))
    }

    pub const fn from_attribute(attribute: u8) -> ColorCode {
        ColorCode(attribute)
    }

    pub const fn attribute(self) -> u8 {
        self.0
    }
}

impl Default for ColorCode {
    fn default() -> Self {
        ColorCode(DEFAULT_ATTRIBUTE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ScreenChar {
    pub ascii_character: u8,
    pub color_code: ColorCode,
}

impl ScreenChar {
    pub const fn blank(color_code: ColorCode) -> ScreenChar {
        ScreenChar {
            ascii_character: b' ',
            color_code,
        }
    }
}

/// Where flushed cells end up.
pub trait TextDisplay {
    /// `index` is `row * BUFFER_WIDTH + column`.
    fn write_cell(&mut self, index: usize, cell: ScreenChar);
    fn set_cursor(&mut self, offset: u16);
}

/// CRT controller cursor registers.
pub struct Crtc<P: PortIo> {
    ports: P,
}

impl<P: PortIo> Crtc<P> {
    pub const fn new(ports: P) -> Self {
        Crtc { ports }
    }

    fn read_register(&mut self, register: u8) -> u8 {
        unsafe {
            self.ports.write_u8(INDEX_PORT, register);
            self.ports.read_u8(DATA_PORT)
        }
    }

    fn write_register(&mut self, register: u8, value: u8) {
        unsafe {
            self.ports.write_u8(INDEX_PORT, register);
            self.ports.write_u8(DATA_PORT, value);
        }
    }

    pub fn set_cursor(&mut self, offset: u16) {
        self.write_register(CURSOR_LOCATION_LOW, offset as u8);
        self.write_register(CURSOR_LOCATION_HIGH, (offset >> 8) as u8);
    }

    /// Show the cursor between scanlines `start` and `end` (0-15).
    pub fn enable_cursor(&mut self, start: u8, end: u8) {
        let current = self.read_register(CURSOR_START_REG);
        self.write_register(CURSOR_START_REG, (current & 0xC0) | (start & 0x1F));
        let current = self.read_register(CURSOR_END_REG);
        self.write_register(CURSOR_END_REG, (current & 0xE0) | (end & 0x1F));
    }
}

#[repr(transparent)]
struct Buffer {
    chars: [Volatile<ScreenChar>; BUFFER_CELLS],
}

/// The memory-mapped text frame buffer plus its cursor.
pub struct VgaText<P: PortIo> {
    buffer: &'static mut Buffer,
    crtc: Crtc<P>,
}

impl<P: PortIo> VgaText<P> {
    /// # Safety
    /// `address` must map a `BUFFER_CELLS`-cell text frame buffer that
    /// nothing else writes to.
    pub unsafe fn new(address: usize, ports: P) -> Self {
        VgaText {
            buffer: unsafe { &mut *(address as *mut Buffer) },
            crtc: Crtc::new(ports),
        }
    }

    pub fn crtc(&mut self) -> &mut Crtc<P> {
        &mut self.crtc
    }
}

impl<P: PortIo> TextDisplay for VgaText<P> {
    fn write_cell(&mut self, index: usize, cell: ScreenChar) {
        self.buffer.chars[index].write(cell);
    }

    fn set_cursor(&mut self, offset: u16) {
        self.crtc.set_cursor(offset);
    }
}

pub struct Renderer<D: TextDisplay> {
    back: [ScreenChar; BUFFER_CELLS],
    shadow: [ScreenChar; BUFFER_CELLS],
    /// Shadow no longer matches the hardware, next flush writes every cell
    stale: bool,
    column: usize,
    row: usize,
    color_code: ColorCode,
    display: D,
}

impl<D: TextDisplay> Renderer<D> {
    pub fn new(display: D) -> Self {
        let blank = ScreenChar::blank(ColorCode::default());
        Renderer {
            back: [blank; BUFFER_CELLS],
            shadow: [blank; BUFFER_CELLS],
            stale: true,
            column: 0,
            row: 0,
            color_code: ColorCode::default(),
            display,
        }
    }

    /// Default color, blank screen, cursor home, and every cell pushed out.
    pub fn initialize(&mut self) {
        self.color_code = ColorCode::default();
        self.clear();
        self.stale = true;
        self.flush();
    }

    pub fn putchar(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            0x08 => self.column = self.column.saturating_sub(1),
            byte => {
                self.back[self.row * BUFFER_WIDTH + self.column] = ScreenChar {
                    ascii_character: byte,
                    color_code: self.color_code,
                };
                self.column += 1;
                if self.column >= BUFFER_WIDTH {
                    self.new_line();
                }
            }
        }
    }

    /// One cell back. From column 0 this is the last column of the row above.
    pub fn move_back(&mut self) {
        if self.column > 0 {
            self.column -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.column = BUFFER_WIDTH - 1;
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.putchar(byte);
        }
    }

    /// Writes up to the first NUL.
    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes().take_while(|&byte| byte != 0) {
            self.putchar(byte);
        }
    }

    pub fn set_color(&mut self, color_code: ColorCode) {
        self.color_code = color_code;
    }

    pub fn color(&self) -> ColorCode {
        self.color_code
    }

    /// Blank the back buffer and home the cursor. Nothing reaches the
    /// hardware until the next flush.
    pub fn clear(&mut self) {
        self.back = [ScreenChar::blank(self.color_code); BUFFER_CELLS];
        self.column = 0;
        self.row = 0;
    }

    /// Push changed cells to the display, then the cursor. Returns the
    /// number of cells written.
    pub fn flush(&mut self) -> usize {
        let mut written = 0;
        for (index, (cell, shown)) in self.back.iter().zip(self.shadow.iter_mut()).enumerate() {
            if self.stale || *cell != *shown {
                self.display.write_cell(index, *cell);
                *shown = *cell;
                written += 1;
            }
        }
        self.stale = false;
        self.display
            .set_cursor((self.row * BUFFER_WIDTH + self.column) as u16);
        written
    }

    /// (column, row)
    pub fn cursor(&self) -> (usize, usize) {
        (self.column, self.row)
    }

    pub fn cell(&self, column: usize, row: usize) -> ScreenChar {
        self.back[row * BUFFER_WIDTH + column]
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    fn new_line(&mut self) {
        self.column = 0;
        if self.row < BUFFER_HEIGHT - 1 {
            self.row += 1;
        } else {
            self.scroll();
        }
    }

    fn scroll(&mut self) {
        self.back.copy_within(BUFFER_WIDTH.., 0);
        let blank = ScreenChar::blank(self.color_code);
        self.back[(BUFFER_HEIGHT - 1) * BUFFER_WIDTH..].fill(blank);
    }
}

impl<D: TextDisplay> fmt::Write for Renderer<D> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | 0x08 => self.putchar(byte),
                _ => self.putchar(0xfe),
            }
        }
        Ok(())
    }
}

lazy_static! {
    pub static ref WRITER: Mutex<Renderer<VgaText<HardwarePorts>>> =
        Mutex::new(Renderer::new(unsafe { VgaText::new(BUFFER_ADDR, HardwarePorts) }));
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::vga_buffer::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;
    isr::without_interrupts(&X86Cpu, || {
        let mut writer = WRITER.lock();
        let _ = writer.write_fmt(args);
        writer.flush();
    });
}

/// Single character sink for already formatted text.
pub fn putc(byte: u8) {
    isr::without_interrupts(&X86Cpu, || {
        let mut writer = WRITER.lock();
        writer.putchar(byte);
        writer.flush();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPorts, RecordingDisplay};
    use core::fmt::Write;

    fn screen() -> Renderer<RecordingDisplay> {
        let mut renderer = Renderer::new(RecordingDisplay::new());
        renderer.initialize();
        renderer
    }

    fn row_text(renderer: &Renderer<RecordingDisplay>, row: usize) -> Vec<u8> {
        (0..BUFFER_WIDTH)
            .map(|column| renderer.cell(column, row).ascii_character)
            .collect()
    }

    #[test]
    fn first_flush_writes_every_cell_once() {
        let renderer = screen();
        let display = renderer.display();
        assert_eq!(display.writes, BUFFER_CELLS);
        assert!(display.per_cell.iter().all(|&count| count == 1));
        assert_eq!(
            display.cells[0],
            Some(ScreenChar::blank(ColorCode::from_attribute(0x07)))
        );
        assert_eq!(display.cursor, Some(0));
    }

    #[test]
    fn flush_without_changes_writes_nothing_but_moves_cursor() {
        let mut renderer = screen();
        assert_eq!(renderer.flush(), 0);
        assert_eq!(renderer.display().writes, BUFFER_CELLS);
        assert_eq!(renderer.display().cursor_updates, 2);

        renderer.putchar(b'x');
        renderer.putchar(0x08);
        renderer.putchar(0x08);
        assert_eq!(renderer.flush(), 1);
        renderer.putchar(b'\n');
        assert_eq!(renderer.flush(), 0);
        assert_eq!(renderer.display().cursor, Some(BUFFER_WIDTH as u16));
    }

    #[test]
    fn hi_newline_lands_on_the_second_row() {
        let mut renderer = screen();
        renderer.set_color(ColorCode::new(Color::Yellow, Color::Blue));
        renderer.write(b"Hi\n");

        assert_eq!(renderer.cursor(), (0, 1));
        let active = ColorCode::from_attribute(0x1E);
        assert_eq!(
            renderer.cell(0, 0),
            ScreenChar {
                ascii_character: b'H',
                color_code: active
            }
        );
        assert_eq!(renderer.cell(1, 0).ascii_character, b'i');
        assert_eq!(renderer.cell(1, 0).color_code, active);
        assert_eq!(
            renderer.cell(2, 0),
            ScreenChar::blank(ColorCode::from_attribute(0x07))
        );

        assert_eq!(renderer.flush(), 2);
        assert_eq!(renderer.display().cursor, Some(80));
    }

    #[test]
    fn full_width_line_wraps_without_newline() {
        let mut renderer = screen();
        renderer.write(&[b'w'; BUFFER_WIDTH]);
        assert_eq!(renderer.cursor(), (0, 1));
        assert_eq!(renderer.cell(BUFFER_WIDTH - 1, 0).ascii_character, b'w');
        assert_eq!(renderer.cell(0, 1).ascii_character, b' ');
    }

    #[test]
    fn writing_past_the_last_row_scrolls() {
        let mut renderer = screen();
        for row in 0..BUFFER_HEIGHT {
            if row > 0 {
                renderer.putchar(b'\n');
            }
            renderer.putchar(b'A' + row as u8);
        }
        assert_eq!(renderer.cursor(), (1, BUFFER_HEIGHT - 1));

        let scroll_color = ColorCode::new(Color::White, Color::Red);
        renderer.set_color(scroll_color);
        renderer.putchar(b'\n');

        assert_eq!(renderer.cursor(), (0, BUFFER_HEIGHT - 1));
        for row in 0..BUFFER_HEIGHT - 1 {
            assert_eq!(renderer.cell(0, row).ascii_character, b'B' + row as u8);
        }
        assert_eq!(row_text(&renderer, BUFFER_HEIGHT - 1), vec![b' '; BUFFER_WIDTH]);
        assert_eq!(renderer.cell(5, BUFFER_HEIGHT - 1).color_code, scroll_color);
        assert_eq!(
            renderer.cell(5, 0).color_code,
            ColorCode::from_attribute(0x07)
        );
    }

    #[test]
    fn set_color_leaves_existing_cells_alone() {
        let mut renderer = screen();
        renderer.putchar(b'a');
        renderer.set_color(ColorCode::new(Color::Green, Color::Black));
        renderer.putchar(b'b');
        assert_eq!(renderer.cell(0, 0).color_code.attribute(), 0x07);
        assert_eq!(renderer.cell(1, 0).color_code.attribute(), 0x02);
        assert_eq!(renderer.color().attribute(), 0x02);
    }

    #[test]
    fn backspace_moves_without_erasing() {
        let mut renderer = screen();
        renderer.write(b"ab\x08");
        assert_eq!(renderer.cursor(), (1, 0));
        assert_eq!(renderer.cell(1, 0).ascii_character, b'b');

        renderer.write(b"\x08\x08\x08");
        assert_eq!(renderer.cursor(), (0, 0));
    }

    #[test]
    fn clear_does_not_touch_hardware() {
        let mut renderer = screen();
        renderer.write(b"junk");
        renderer.flush();
        let writes = renderer.display().writes;

        renderer.clear();
        assert_eq!(renderer.display().writes, writes);
        assert_eq!(renderer.cursor(), (0, 0));
        assert_eq!(renderer.cell(0, 0).ascii_character, b' ');
        assert_eq!(renderer.flush(), 4);
    }

    #[test]
    fn write_string_stops_at_nul() {
        let mut renderer = screen();
        renderer.write_string("ok\0ignored");
        assert_eq!(renderer.cursor(), (2, 0));
        assert_eq!(row_text(&renderer, 0)[..3], *b"ok ");
    }

    #[test]
    fn formatted_output_replaces_unprintable_bytes() {
        let mut renderer = screen();
        write!(renderer, "{}é", 42).unwrap();
        assert_eq!(row_text(&renderer, 0)[..5], [b'4', b'2', 0xfe, 0xfe, b' ']);
    }

    #[test]
    fn screen_char_is_one_word() {
        assert_eq!(core::mem::size_of::<ScreenChar>(), 2);
    }

    #[test]
    fn move_back_crosses_to_the_previous_row() {
        let mut renderer = screen();
        renderer.write(&[b'x'; BUFFER_WIDTH + 1]);
        assert_eq!(renderer.cursor(), (1, 1));
        renderer.move_back();
        renderer.move_back();
        assert_eq!(renderer.cursor(), (BUFFER_WIDTH - 1, 0));

        renderer.clear();
        renderer.move_back();
        assert_eq!(renderer.cursor(), (0, 0));
    }

    #[test]
    fn crtc_programs_cursor_location() {
        let mut crtc = Crtc::new(MockPorts::new());
        crtc.set_cursor(0x0123);
        assert_eq!(
            crtc.ports.writes,
            vec![(0x3D4, 0x0F), (0x3D5, 0x23), (0x3D4, 0x0E), (0x3D5, 0x01)]
        );
    }

    #[test]
    fn crtc_cursor_shape_keeps_reserved_bits() {
        let mut ports = MockPorts::new();
        ports.script(0x3D5, &[0xC5, 0xE3]);
        let mut crtc = Crtc::new(ports);
        crtc.enable_cursor(14, 15);
        assert_eq!(crtc.ports.writes_to(0x3D5), vec![0xCE, 0xEF]);
        assert_eq!(crtc.ports.writes_to(0x3D4), vec![0x0A, 0x0A, 0x0B, 0x0B]);
    }
}
